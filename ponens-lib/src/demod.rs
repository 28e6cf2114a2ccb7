// Copyright 2022 University College London

// This file is part of Ponens.

// Ponens is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// Ponens is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with Ponens.  If not, see <https://www.gnu.org/licenses/>.

//! Demodulation: rewriting with oriented (and lex-dependent) unit
//! equalities.
//!
//! A demodulator rewrites left-to-right; an oriented one is guaranteed
//! decreasing because reduction orders are closed under substitution, a
//! lex-dependent one must pass the ordering check per instance.  Every
//! rewrite step lands in the clause justification as (demodulator id,
//! position in the target, position of the used side in the demodulator).

use std::collections::HashSet;

use crate::clause::{Clause, ClauseId};
use crate::discrim::DiscrimTree;
use crate::error::FatalError;
use crate::fpa::FpaIndex;
use crate::just::Step;
use crate::options::{Options, Parm};
use crate::order::{self, OrderResult, TermOrder};
use crate::term::{Position, Term};
use crate::unify::{match_terms, unify, Bindings};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DemodKind {
    Oriented,
    LexDepLr,
    LexDepRl,
    LexDepBoth,
}

/// Classify a clause as a demodulator, or not.  The clause must be a unit
/// positive equality; an unorientable equation is only admitted when
/// lex-dependent demodulation is enabled and the variable-subset property
/// holds for the direction(s) in question.
pub fn demodulator_type(
    c: &Clause,
    lex_dep_lim: i64,
    lex_dep_sane: bool,
    lex_dep_enabled: bool,
) -> Option<DemodKind> {
    if !c.is_unit() || !c.literals[0].sign || !c.literals[0].is_equality() {
        return None;
    }
    let lit = &c.literals[0];
    let (l, r) = lit.eq_sides()?;
    if lit.oriented {
        return Some(DemodKind::Oriented);
    }
    if !lex_dep_enabled {
        return None;
    }
    if lex_dep_lim != -1 && (l.symbol_count() + r.symbol_count()) as i64 > lex_dep_lim {
        return None;
    }
    if lex_dep_sane && l.symbol_count() != r.symbol_count() {
        return None;
    }
    let lv = l.variables();
    let rv = r.variables();
    let lr = rv.is_subset(&lv);
    let rl = lv.is_subset(&rv);
    match (lr, rl) {
        (true, true) => Some(DemodKind::LexDepBoth),
        (true, false) => Some(DemodKind::LexDepLr),
        (false, true) => Some(DemodKind::LexDepRl),
        (false, false) => None,
    }
}

/// Input demodulators bypass orientation, so they must at least satisfy
/// the variable-subset property or rewriting would not terminate.
pub fn check_input_demodulator(c: &Clause) -> Result<(), FatalError> {
    let bad = || FatalError::NonTerminatingDemodulator(c.to_string());
    if !c.is_unit() || !c.literals[0].sign || !c.literals[0].is_equality() {
        return Err(bad());
    }
    let (l, r) = c.literals[0].eq_sides().ok_or_else(bad)?;
    if r.variables().is_subset(&l.variables()) {
        Ok(())
    } else {
        Err(bad())
    }
}

#[derive(Clone, Debug, PartialEq)]
struct StoredDemod {
    id: ClauseId,
    rhs: Term,
    /// index of the lhs within the demodulator equality (0 or 1)
    side: usize,
    oriented: bool,
}

/// Match-retrieval index of active demodulators, keyed by their left
/// sides (both sides for lex_dep_both).
#[derive(Clone, Default)]
pub struct DemodIndex {
    tree: DiscrimTree<StoredDemod>,
}

fn directions(c: &Clause, kind: DemodKind) -> Vec<(Term, Term, usize, bool)> {
    let (l, r) = c.literals[0].eq_sides().expect("demodulator is an equality");
    match kind {
        DemodKind::Oriented => vec![(l.clone(), r.clone(), 0, true)],
        DemodKind::LexDepLr => vec![(l.clone(), r.clone(), 0, false)],
        DemodKind::LexDepRl => vec![(r.clone(), l.clone(), 1, false)],
        DemodKind::LexDepBoth => vec![
            (l.clone(), r.clone(), 0, false),
            (r.clone(), l.clone(), 1, false),
        ],
    }
}

impl DemodIndex {
    pub fn new() -> DemodIndex {
        DemodIndex {
            tree: DiscrimTree::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn insert(&mut self, c: &Clause, kind: DemodKind) {
        for (lhs, rhs, side, oriented) in directions(c, kind) {
            self.tree.insert(
                lhs,
                StoredDemod {
                    id: c.id,
                    rhs,
                    side,
                    oriented,
                },
            );
        }
    }

    pub fn remove(&mut self, c: &Clause, kind: DemodKind) -> Result<(), FatalError> {
        for (lhs, rhs, side, oriented) in directions(c, kind) {
            if !self.tree.remove(
                &lhs,
                &StoredDemod {
                    id: c.id,
                    rhs,
                    side,
                    oriented,
                },
            ) {
                return Err(FatalError::IndexInvariant(format!(
                    "unindexing missing demodulator {}",
                    c.id
                )));
            }
        }
        Ok(())
    }
}

/// Counters reported back to the search statistics.
#[derive(Default, Debug)]
pub struct DemodOutcome {
    pub attempts: u32,
    pub rewrites: u32,
}

struct Rewriter<'a> {
    idx: &'a DemodIndex,
    ord: TermOrder,
    lex_order_vars: bool,
    step_limit: i64,
    size_limit: i64,
    steps: Vec<(ClauseId, Position, Position)>,
    outcome: DemodOutcome,
}

impl<'a> Rewriter<'a> {
    fn limit_hit(&self) -> bool {
        self.step_limit != -1 && (self.outcome.rewrites as i64) >= self.step_limit
    }

    /// Rewrite `t` to normal form, innermost first.  `pos` is the position
    /// of `t` within the clause (literal index first).
    fn normalize(&mut self, t: &Term, pos: &mut Position, original_size: usize) -> Term {
        let mut current = match t {
            Term::Variable(_) => t.clone(),
            Term::Application { symbol, args } => {
                let mut new_args = Vec::with_capacity(args.len());
                for (i, a) in args.iter().enumerate() {
                    pos.push(i);
                    new_args.push(self.normalize(a, pos, original_size));
                    pos.pop();
                }
                Term::app(*symbol, new_args)
            }
        };
        // then the root; a root rewrite can uncover fresh redexes below,
        // so renormalize the replacement in full
        if self.limit_hit() {
            return current;
        }
        if let Some(next) = self.rewrite_root(&current, pos) {
            if self.size_limit == -1
                || next.symbol_count() as i64 <= original_size as i64 + self.size_limit
            {
                current = self.normalize(&next, pos, original_size);
            }
        }
        current
    }

    fn rewrite_root(&mut self, t: &Term, pos: &Position) -> Option<Term> {
        if t.is_variable() {
            return None;
        }
        self.outcome.attempts += 1;
        let candidates: Vec<(Term, StoredDemod)> = self
            .idx
            .tree
            .generalizations(t)
            .into_iter()
            .map(|(lhs, stored)| (lhs.clone(), stored.clone()))
            .collect();
        for (lhs, stored) in candidates {
            let mut b = Bindings::new();
            if !match_terms(&lhs, t, &mut b) {
                continue;
            }
            let replacement = b.resolve(&stored.rhs);
            if !stored.oriented {
                // per-instance ordering check for lex-dependent rules
                let decreasing = if self.lex_order_vars {
                    order::greater_vars_as_constants(t, &replacement)
                } else {
                    order::compare(t, &replacement, self.ord) == OrderResult::Greater
                };
                if !decreasing {
                    continue;
                }
            }
            self.outcome.rewrites += 1;
            self.steps
                .push((stored.id, pos.clone(), vec![stored.side]));
            return Some(replacement);
        }
        None
    }
}

/// Rewrite every atom of the clause to normal form under the demodulator
/// index.  Appends a single rewrite step list to the justification when
/// anything changed, and returns the counters.
pub fn demodulate_clause(c: &mut Clause, idx: &DemodIndex, opts: &Options, ord: TermOrder) -> DemodOutcome {
    if idx.is_empty() {
        return DemodOutcome::default();
    }
    let mut rw = Rewriter {
        idx,
        ord,
        lex_order_vars: opts.flag(crate::options::Flag::LexOrderVars),
        step_limit: opts.parm(Parm::DemodStepLimit),
        size_limit: opts.parm(Parm::DemodIncreaseLimit),
        steps: Vec::new(),
        outcome: DemodOutcome::default(),
    };
    for i in 0..c.literals.len() {
        let original_size = c.literals[i].atom.symbol_count();
        let atom = c.literals[i].atom.clone();
        let rewritten = match &atom {
            Term::Variable(_) => atom.clone(),
            Term::Application { symbol, args } => {
                // rewrite the arguments of the atom, not the predicate
                let mut new_args = Vec::with_capacity(args.len());
                for (j, a) in args.iter().enumerate() {
                    let mut pos = vec![i, j];
                    new_args.push(rw.normalize(a, &mut pos, original_size));
                }
                Term::app(*symbol, new_args)
            }
        };
        if rewritten != atom {
            c.literals[i].atom = rewritten;
            c.normal_vars = false;
        }
    }
    if !rw.steps.is_empty() {
        c.justification.push(Step::Demod(std::mem::take(&mut rw.steps)));
    }
    rw.outcome
}

/// Index every non-variable proper subterm of the clause's atoms for
/// back-demodulation retrieval.
pub fn index_back_demod(
    c: &Clause,
    idx: &mut FpaIndex<(ClauseId, usize, Position)>,
    insert: bool,
) -> Result<(), FatalError> {
    for (i, lit) in c.literals.iter().enumerate() {
        for (j, arg) in lit.atom.args().iter().enumerate() {
            for (path, sub) in arg.subterms() {
                if sub.is_variable() {
                    continue;
                }
                let mut pos = vec![i, j];
                pos.extend(path);
                if insert {
                    idx.insert(sub.clone(), (c.id, i, pos));
                } else if !idx.remove(sub, &(c.id, i, pos.clone())) {
                    return Err(FatalError::IndexInvariant(format!(
                        "unindexing missing back-demod entry for clause {}",
                        c.id
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Ids of clauses with a subterm unifiable with a rewriting side of the
/// new demodulator — the clauses the demodulator can now simplify.
pub fn back_demodulatable(
    demod: &Clause,
    kind: DemodKind,
    idx: &FpaIndex<(ClauseId, usize, Position)>,
) -> Vec<ClauseId> {
    let mut out: Vec<ClauseId> = Vec::new();
    let mut seen: HashSet<ClauseId> = HashSet::new();
    for (lhs, _, _, _) in directions(demod, kind) {
        let offset = demod.max_var().map(|v| v + 1).unwrap_or(0);
        for (stored, (id, _, _)) in idx.unifiable(&lhs) {
            if *id == demod.id || seen.contains(id) {
                continue;
            }
            let mut b = Bindings::new();
            if unify(&stored.shift_vars(offset), &lhs, &mut b) {
                seen.insert(*id);
                out.push(*id);
            }
        }
    }
    out.sort_unstable();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::symbols;
    use serial_test::serial;

    fn clause(s: &str) -> Clause {
        s.parse().unwrap()
    }

    fn oriented_demod(s: &str, id: ClauseId) -> Clause {
        let mut c = clause(s);
        c.id = id;
        order::orient_equalities(&mut c.literals, TermOrder::Lpo);
        c
    }

    fn setup() {
        symbols::reset_table();
    }

    #[test]
    #[serial]
    fn classify_demodulators() {
        setup();
        let c = oriented_demod("f(x,e) = x.", 1);
        assert_eq!(
            demodulator_type(&c, 11, true, true),
            Some(DemodKind::Oriented)
        );
        let comm = oriented_demod("f(x,y) = f(y,x).", 2);
        assert_eq!(
            demodulator_type(&comm, 11, true, true),
            Some(DemodKind::LexDepBoth)
        );
        assert_eq!(demodulator_type(&comm, 11, true, false), None);
        let nonunit = clause("f(x,y) = x | p(x).");
        assert_eq!(demodulator_type(&nonunit, 11, true, true), None);
    }

    #[test]
    #[serial]
    fn variable_subset_safety() {
        setup();
        assert!(check_input_demodulator(&clause("f(x,e) = x.")).is_ok());
        // y appears only on the reduced side
        assert!(check_input_demodulator(&clause("g(x) = f(x,y).")).is_err());
    }

    #[test]
    #[serial]
    fn rewrite_chain_reaches_normal_form() {
        setup();
        let opts = Options::new();
        // recursive addition over successor arithmetic
        let mut d1 = clause("f(x,0) = x.");
        let mut d2 = clause("f(x,s(y)) = s(f(x,y)).");
        // make f heavy so the recursion unfolds left-to-right
        symbols::set_precedence(symbols::lookup("f", 2).unwrap(), 100);
        d1.id = 1;
        d2.id = 2;
        let mut idx = DemodIndex::new();
        for d in [&mut d1, &mut d2] {
            order::orient_equalities(&mut d.literals, TermOrder::Lpo);
            let kind = demodulator_type(d, 11, true, true).unwrap();
            assert_eq!(kind, DemodKind::Oriented);
            idx.insert(d, kind);
        }
        let mut c = clause("p(f(s(s(0)),s(s(0)))).");
        let out = demodulate_clause(&mut c, &idx, &opts, TermOrder::Lpo);
        assert!(out.rewrites >= 3);
        assert_eq!(c.literals[0].atom.to_string(), "p(s(s(s(s(0)))))");
        // normal forms are stable
        let before = c.literals[0].atom.clone();
        demodulate_clause(&mut c, &idx, &opts, TermOrder::Lpo);
        assert_eq!(c.literals[0].atom, before);
    }

    #[test]
    #[serial]
    fn rewrites_are_recorded_in_justification() {
        setup();
        let opts = Options::new();
        let d = oriented_demod("f(x,e) = x.", 3);
        let mut idx = DemodIndex::new();
        idx.insert(&d, DemodKind::Oriented);
        let mut c = clause("p(f(a,e)).");
        demodulate_clause(&mut c, &idx, &opts, TermOrder::Lpo);
        assert_eq!(c.literals[0].atom.to_string(), "p(a)");
        match c.justification.0.last() {
            Some(Step::Demod(steps)) => {
                assert_eq!(steps.len(), 1);
                assert_eq!(steps[0].0, 3);
                assert_eq!(steps[0].1, vec![0, 0]);
            }
            other => panic!("expected a rewrite step, got {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn lex_dep_rewrites_only_downhill() {
        setup();
        let opts = Options::new();
        let comm = oriented_demod("f(x,y) = f(y,x).", 4);
        let mut idx = DemodIndex::new();
        idx.insert(&comm, DemodKind::LexDepBoth);
        let mut c = clause("p(f(b,a)).");
        // fix precedence a < b so f(b,a) -> f(a,b) is the downhill step
        symbols::set_precedence(symbols::lookup("a", 0).unwrap(), 1);
        symbols::set_precedence(symbols::lookup("b", 0).unwrap(), 2);
        let out = demodulate_clause(&mut c, &idx, &opts, TermOrder::Lpo);
        assert_eq!(out.rewrites, 1);
        assert_eq!(c.literals[0].atom.to_string(), "p(f(a,b))");
        // and the result is stable: no rewrite back uphill
        let before = c.literals[0].atom.clone();
        let out2 = demodulate_clause(&mut c, &idx, &opts, TermOrder::Lpo);
        assert_eq!(out2.rewrites, 0);
        assert_eq!(c.literals[0].atom, before);
    }

    #[test]
    #[serial]
    fn back_demod_retrieval() {
        setup();
        let mut idx: FpaIndex<(ClauseId, usize, Position)> = FpaIndex::new();
        let mut c1 = clause("p(f(a,e)).");
        c1.id = 10;
        let mut c2 = clause("q(g(b)).");
        c2.id = 11;
        index_back_demod(&c1, &mut idx, true).unwrap();
        index_back_demod(&c2, &mut idx, true).unwrap();
        let d = oriented_demod("f(x,e) = x.", 12);
        let hits = back_demodulatable(&d, DemodKind::Oriented, &idx);
        assert_eq!(hits, vec![10]);
        index_back_demod(&c1, &mut idx, false).unwrap();
        assert!(back_demodulatable(&d, DemodKind::Oriented, &idx).is_empty());
    }
}
