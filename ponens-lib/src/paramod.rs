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

//! Paramodulation.
//!
//! Unify a side of a positive equality in the `from` clause with a
//! non-variable subterm of the `into` clause and replace that subterm by
//! the other side.  Ordered mode paramodulates from the bigger side only
//! (`para_from_small` inverts that for oriented equations); the basic
//! restriction refuses positions that were introduced by an earlier
//! substitution, tracked per clause as nonbasic position prefixes.

use crate::clause::{Clause, Literal};
use crate::just::{Justification, Step};
use crate::options::{Flag, Options};
use crate::order::{self, OrderResult, TermOrder};
use crate::term::{Position, Term};
use crate::unify::{unify, Bindings};

/// Counters reported to the search statistics.
#[derive(Default, Debug)]
pub struct ParaOutcome {
    pub instance_prunes: u32,
    pub basic_prunes: u32,
}

fn nonbasic_blocked(c: &Clause, lit: usize, pos: &[usize]) -> bool {
    c.nonbasic.iter().any(|(l, prefix)| {
        *l == lit && pos.len() >= prefix.len() && pos[..prefix.len()] == prefix[..]
    })
}

/// Which (alpha, beta, side-index) pairs may rewrite out of an equality
/// literal.
fn from_sides<'a>(
    lit: &'a Literal,
    opts: &Options,
) -> Vec<(&'a Term, &'a Term, usize)> {
    let (l, r) = match lit.eq_sides() {
        Some(s) => s,
        None => return vec![],
    };
    let ordered = opts.flag(Flag::OrderedPara);
    let from_small = opts.flag(Flag::ParaFromSmall);
    if !ordered {
        return vec![(l, r, 0), (r, l, 1)];
    }
    if lit.oriented {
        if from_small {
            vec![(l, r, 0), (r, l, 1)]
        } else {
            vec![(l, r, 0)]
        }
    } else {
        // unorientable: both sides, instances checked after unification
        vec![(l, r, 0), (r, l, 1)]
    }
}

/// All paramodulants from positive equalities of `from` into subterms of
/// `into`.  The callers have already renamed nothing: this function
/// shifts `into` apart itself.
pub fn para_from_into(
    from: &Clause,
    into: &Clause,
    opts: &Options,
    ord: TermOrder,
    emit: &mut dyn FnMut(Clause),
) -> ParaOutcome {
    let mut outcome = ParaOutcome::default();
    if opts.flag(Flag::ParaUnitsOnly) && !(from.is_unit() && into.is_unit()) {
        return outcome;
    }
    let ordered = opts.flag(Flag::OrderedPara);
    let basic = opts.flag(Flag::BasicParamodulation);
    let offset = from.max_var().map(|v| v + 1).unwrap_or(0);

    for (fi, flit) in from.literals.iter().enumerate() {
        if !flit.sign || !flit.is_equality() {
            continue;
        }
        if ordered && !flit.maximal {
            continue;
        }
        for (alpha, beta, side) in from_sides(flit, opts) {
            if alpha.is_variable() && !opts.flag(Flag::ParaFromVars) {
                continue;
            }
            for (ii, ilit) in into.literals.iter().enumerate() {
                let shifted_atom = ilit.atom.shift_vars(offset);
                for (path, sub) in shifted_atom.subterms() {
                    if path.is_empty() {
                        continue; // the predicate itself is not a term
                    }
                    if sub.is_variable() && !opts.flag(Flag::ParaIntoVars) {
                        continue;
                    }
                    if basic && nonbasic_blocked(into, ii, &path) {
                        outcome.basic_prunes += 1;
                        continue;
                    }
                    let mut b = Bindings::new();
                    if !unify(alpha, sub, &mut b) {
                        continue;
                    }
                    // unorientable equations paramodulate only when the
                    // instantiated from-side is not the smaller one
                    if ordered && !flit.oriented {
                        let a_inst = b.resolve(alpha);
                        let b_inst = b.resolve(beta);
                        if order::compare(&a_inst, &b_inst, ord) == OrderResult::Less {
                            outcome.instance_prunes += 1;
                            continue;
                        }
                    }
                    if opts.flag(Flag::CheckParaInstances) && ordered {
                        // the instantiated equality must still be maximal
                        let mut inst: Vec<Literal> = from
                            .literals
                            .iter()
                            .map(|l| Literal::new(l.sign, b.resolve(&l.atom)))
                            .collect();
                        order::mark_maximal_literals(&mut inst, ord);
                        if !inst[fi].maximal {
                            outcome.instance_prunes += 1;
                            continue;
                        }
                    }

                    let replacement = b.resolve(beta);
                    let new_atom = shifted_atom.replace_at(&path, replacement);
                    let mut lits: Vec<Literal> = from
                        .literals
                        .iter()
                        .enumerate()
                        .filter(|(k, _)| *k != fi)
                        .map(|(_, l)| Literal::new(l.sign, b.resolve(&l.atom)))
                        .collect();
                    let from_len = lits.len();
                    for (k, l) in into.literals.iter().enumerate() {
                        let atom = if k == ii {
                            b.resolve(&new_atom)
                        } else {
                            b.resolve(&l.atom.shift_vars(offset))
                        };
                        lits.push(Literal::new(l.sign, atom));
                    }

                    let mut into_pos: Position = vec![ii];
                    into_pos.extend(path.iter().cloned());
                    let just = Justification::new(Step::Paramod {
                        from: from.id,
                        from_pos: vec![fi, side],
                        into: into.id,
                        into_pos,
                    });
                    let mut child = Clause::new(lits, just);
                    if basic {
                        // the replaced subtree came in by substitution
                        let mut marked: Position = vec![];
                        marked.extend(path.iter().cloned());
                        child.nonbasic.push((from_len + ii, marked));
                        // inherit the into clause's own nonbasic marks
                        for (l, p) in &into.nonbasic {
                            child.nonbasic.push((from_len + l, p.clone()));
                        }
                    }
                    emit(child);
                }
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols;
    use serial_test::serial;

    fn clause(s: &str) -> Clause {
        s.parse().unwrap()
    }

    fn oriented(s: &str, id: u32) -> Clause {
        let mut c: Clause = s.parse().unwrap();
        c.id = id;
        order::orient_equalities(&mut c.literals, TermOrder::Lpo);
        order::mark_maximal_literals(&mut c.literals, TermOrder::Lpo);
        c
    }

    #[test]
    #[serial]
    fn paramodulates_into_subterm() {
        symbols::reset_table();
        let from = oriented("f(e,x) = x.", 1);
        let mut into = clause("p(g(f(e,a))).");
        into.id = 2;
        let opts = Options::new();
        let mut out = Vec::new();
        para_from_into(&from, &into, &opts, TermOrder::Lpo, &mut |c| out.push(c));
        assert!(out.iter().any(|c| c.to_string() == "p(g(a))."));
        let hit = out.iter().find(|c| c.to_string() == "p(g(a)).").unwrap();
        match hit.justification.primary() {
            Some(Step::Paramod {
                from: 1,
                from_pos,
                into: 2,
                into_pos,
            }) => {
                assert_eq!(from_pos, &vec![0, 0]);
                assert_eq!(into_pos, &vec![0, 0, 0]);
            }
            other => panic!("unexpected justification {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn oriented_equations_rewrite_from_big_side_only() {
        symbols::reset_table();
        let from = oriented("f(e,x) = x.", 1);
        // an oriented equation must not paramodulate from its small side:
        // the only way to hit q(b) would be from the variable side
        let mut into = clause("q(b).");
        into.id = 2;
        let opts = Options::new();
        let mut out = Vec::new();
        para_from_into(&from, &into, &opts, TermOrder::Lpo, &mut |c| out.push(c));
        assert!(out.is_empty());
    }

    #[test]
    #[serial]
    fn unorientable_equations_rewrite_downhill_instances() {
        symbols::reset_table();
        let from = oriented("f(x,y) = f(y,x).", 1);
        let mut into = clause("p(f(b,a)).");
        into.id = 2;
        // fix a < b so commuting f(b,a) to f(a,b) is the downhill step
        symbols::set_precedence(symbols::lookup("a", 0).unwrap(), 1);
        symbols::set_precedence(symbols::lookup("b", 0).unwrap(), 2);
        let opts = Options::new();
        let mut out = Vec::new();
        let outcome = para_from_into(&from, &into, &opts, TermOrder::Lpo, &mut |c| out.push(c));
        // the commuted instance appears once, the uphill direction is pruned
        assert!(out.iter().any(|c| c.to_string() == "p(f(a,b))."));
        assert!(outcome.instance_prunes > 0);
    }

    #[test]
    #[serial]
    fn units_only_restriction() {
        symbols::reset_table();
        let from = oriented("f(e,x) = x | p(x).", 1);
        let mut into = clause("q(f(e,a)).");
        into.id = 2;
        let mut opts = Options::new();
        opts.change_flag("para_units_only", true).unwrap();
        let mut out = Vec::new();
        para_from_into(&from, &into, &opts, TermOrder::Lpo, &mut |c| out.push(c));
        assert!(out.is_empty());
    }

    #[test]
    #[serial]
    fn basic_restriction_blocks_marked_positions() {
        symbols::reset_table();
        let from = oriented("f(e,x) = x.", 1);
        let mut into = clause("p(g(f(e,a))).");
        into.id = 2;
        // mark the whole argument of p as substitution-introduced
        into.nonbasic.push((0, vec![0]));
        let mut opts = Options::new();
        opts.change_flag("basic_paramodulation", true).unwrap();
        let mut out = Vec::new();
        let outcome = para_from_into(&from, &into, &opts, TermOrder::Lpo, &mut |c| out.push(c));
        assert!(out.is_empty());
        assert!(outcome.basic_prunes > 0);
    }
}
