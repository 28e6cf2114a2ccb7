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

//! Term orderings: LPO, RPO, and KBO.
//!
//! The active ordering orients equalities for demodulation, restricts
//! paramodulation to the bigger side, marks maximal literals for ordered
//! resolution, and decides lex-dependent rewriting.  All three orderings
//! share symbol precedence from the table; LPO compares arguments
//! lexicographically, RPO consults the per-symbol status, and KBO adds
//! non-negative symbol weights with the variable-count condition.

use std::collections::HashMap;

use crate::clause::Literal;
use crate::symbols::{self, LrpoStatus};
use crate::term::{Term, VarId};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OrderResult {
    Greater,
    Less,
    Equal,
    NotComparable,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TermOrder {
    Lpo,
    Rpo,
    Kbo,
}

impl TermOrder {
    pub fn from_name(s: &str) -> Option<TermOrder> {
        match s {
            "lpo" => Some(TermOrder::Lpo),
            "rpo" => Some(TermOrder::Rpo),
            "kbo" => Some(TermOrder::Kbo),
            _ => None,
        }
    }
}

/// Compare two terms under the given ordering.
pub fn compare(s: &Term, t: &Term, ord: TermOrder) -> OrderResult {
    if s == t {
        OrderResult::Equal
    } else if greater(s, t, ord) {
        OrderResult::Greater
    } else if greater(t, s, ord) {
        OrderResult::Less
    } else {
        OrderResult::NotComparable
    }
}

pub fn greater(s: &Term, t: &Term, ord: TermOrder) -> bool {
    match ord {
        TermOrder::Lpo | TermOrder::Rpo => path_greater(s, t, ord),
        TermOrder::Kbo => kbo_greater(s, t),
    }
}

fn status(sym: usize, ord: TermOrder) -> LrpoStatus {
    match ord {
        TermOrder::Lpo => LrpoStatus::LrLex,
        _ => symbols::status(sym),
    }
}

fn path_greater(s: &Term, t: &Term, ord: TermOrder) -> bool {
    match (s, t) {
        (_, Term::Variable(v)) => !s.is_variable() && s.var_occurrences(*v) > 0,
        (Term::Variable(_), _) => false,
        (
            Term::Application { symbol: f, args: sa },
            Term::Application { symbol: g, args: ta },
        ) => {
            // case 1: some argument of s dominates t
            if sa.iter().any(|si| si == t || path_greater(si, t, ord)) {
                return true;
            }
            if f == g {
                match status(*f, ord) {
                    LrpoStatus::LrLex => {
                        lex_greater(sa, ta, ord) && ta.iter().all(|ti| path_greater(s, ti, ord))
                    }
                    LrpoStatus::Multiset => multiset_greater(sa, ta, ord),
                }
            } else if symbols::precedence(*f) > symbols::precedence(*g) {
                ta.iter().all(|ti| path_greater(s, ti, ord))
            } else {
                false
            }
        }
    }
}

fn lex_greater(sa: &[Term], ta: &[Term], ord: TermOrder) -> bool {
    for (si, ti) in sa.iter().zip(ta.iter()) {
        if si == ti {
            continue;
        }
        return path_greater(si, ti, ord);
    }
    sa.len() > ta.len()
}

fn multiset_greater(sa: &[Term], ta: &[Term], ord: TermOrder) -> bool {
    // remove common elements, then every remaining t must be dominated
    let mut s_rest: Vec<&Term> = sa.iter().collect();
    let mut t_rest: Vec<&Term> = ta.iter().collect();
    let mut i = 0;
    while i < s_rest.len() {
        if let Some(j) = t_rest.iter().position(|t| *t == s_rest[i]) {
            s_rest.remove(i);
            t_rest.remove(j);
        } else {
            i += 1;
        }
    }
    !s_rest.is_empty()
        && t_rest
            .iter()
            .all(|t| s_rest.iter().any(|s| path_greater(s, t, ord)))
}

fn kbo_weight(t: &Term) -> i64 {
    match t {
        Term::Variable(_) => 1,
        Term::Application { symbol, args } => {
            symbols::kb_weight(*symbol) + args.iter().map(kbo_weight).sum::<i64>()
        }
    }
}

fn var_counts(t: &Term, counts: &mut HashMap<VarId, i64>) {
    match t {
        Term::Variable(v) => *counts.entry(*v).or_insert(0) += 1,
        Term::Application { args, .. } => {
            for a in args {
                var_counts(a, counts);
            }
        }
    }
}

/// The variable condition: every variable occurs in s at least as often as
/// in t.
fn var_condition(s: &Term, t: &Term) -> bool {
    let mut sc = HashMap::new();
    let mut tc = HashMap::new();
    var_counts(s, &mut sc);
    var_counts(t, &mut tc);
    tc.iter().all(|(v, n)| sc.get(v).copied().unwrap_or(0) >= *n)
}

fn kbo_greater(s: &Term, t: &Term) -> bool {
    if !var_condition(s, t) {
        return false;
    }
    let ws = kbo_weight(s);
    let wt = kbo_weight(t);
    if ws > wt {
        return true;
    }
    if ws < wt {
        return false;
    }
    match (s, t) {
        // equal weight: f^n(x) > x for a unary zero-weight f
        (_, Term::Variable(v)) => !s.is_variable() && s.var_occurrences(*v) > 0,
        (Term::Variable(_), _) => false,
        (
            Term::Application { symbol: f, args: sa },
            Term::Application { symbol: g, args: ta },
        ) => {
            if f == g {
                for (si, ti) in sa.iter().zip(ta.iter()) {
                    if si == ti {
                        continue;
                    }
                    return kbo_greater(si, ti);
                }
                false
            } else {
                symbols::precedence(*f) > symbols::precedence(*g)
            }
        }
    }
}

/// Comparison used by `lex_order_vars`: variables act as constants,
/// ordered among themselves by index and below every real symbol.  Lets
/// lex-dependent demodulators rewrite instances like f(y,x) -> f(x,y).
pub fn greater_vars_as_constants(s: &Term, t: &Term) -> bool {
    match (s, t) {
        (Term::Variable(u), Term::Variable(v)) => u > v,
        (Term::Application { .. }, Term::Variable(_)) => true,
        (Term::Variable(_), Term::Application { .. }) => false,
        (
            Term::Application { symbol: f, args: sa },
            Term::Application { symbol: g, args: ta },
        ) => {
            if sa.iter().any(|si| si == t || greater_vars_as_constants(si, t)) {
                return true;
            }
            if f == g {
                for (si, ti) in sa.iter().zip(ta.iter()) {
                    if si == ti {
                        continue;
                    }
                    return greater_vars_as_constants(si, ti)
                        && ta.iter().all(|x| x == s || greater_vars_as_constants(s, x));
                }
                false
            } else if symbols::precedence(*f) > symbols::precedence(*g) {
                ta.iter().all(|ti| greater_vars_as_constants(s, ti))
            } else {
                false
            }
        }
    }
}

/// KBO requires non-negative weights and at most one zero-weight symbol,
/// which must be unary and maximal in precedence.  Returns an error string
/// naming the offender.
pub fn check_kbo_weights() -> Result<(), String> {
    let mut zero: Option<usize> = None;
    for id in 0..symbols::count() {
        if !symbols::is_function(id) {
            continue;
        }
        let w = symbols::kb_weight(id);
        if w < 0 {
            return Err(format!("negative kbo weight for {}", symbols::name(id)));
        }
        if w == 0 {
            if symbols::arity(id) != 1 {
                return Err(format!(
                    "zero kbo weight on non-unary symbol {}",
                    symbols::name(id)
                ));
            }
            if zero.is_some() {
                return Err("more than one zero-weight kbo symbol".to_string());
            }
            zero = Some(id);
        }
    }
    Ok(())
}

/// Compare atoms of literals.  Negative literals dominate positive ones
/// with the same atom, so resolution prefers to work negative literals off
/// first.
fn literal_greater(a: &Literal, b: &Literal, ord: TermOrder) -> bool {
    if a.atom == b.atom {
        !a.sign && b.sign
    } else {
        greater(&a.atom, &b.atom, ord)
    }
}

/// Mark each literal that is not strictly dominated by another literal of
/// the clause.
pub fn mark_maximal_literals(lits: &mut [Literal], ord: TermOrder) {
    let snapshot: Vec<Literal> = lits.to_vec();
    for (i, l) in lits.iter_mut().enumerate() {
        l.maximal = !snapshot
            .iter()
            .enumerate()
            .any(|(j, m)| j != i && literal_greater(m, l, ord));
    }
}

/// Mark literals eligible for resolution according to the
/// `literal_selection` stringparm.  The default (`max_negative`) selects
/// the literals maximal among the negative ones; in a positive clause it
/// falls back to the maximal literals.
pub fn mark_selected_literals(lits: &mut [Literal], selection: &str, ord: TermOrder) {
    match selection {
        "all" => {
            for l in lits.iter_mut() {
                l.selected = true;
            }
        }
        "none" => {
            for l in lits.iter_mut() {
                l.selected = false;
            }
        }
        "maximal" => {
            for l in lits.iter_mut() {
                l.selected = l.maximal;
            }
        }
        _ => {
            let negatives: Vec<Literal> =
                lits.iter().filter(|l| !l.sign).cloned().collect();
            if negatives.is_empty() {
                for l in lits.iter_mut() {
                    l.selected = l.maximal;
                }
            } else {
                for l in lits.iter_mut() {
                    l.selected = !l.sign
                        && !negatives.iter().any(|m| literal_greater(m, l, ord));
                }
            }
        }
    }
}

/// Put the bigger side of each equality first and set the oriented mark.
/// Returns the indices of literals that were flipped.
pub fn orient_equalities(lits: &mut [Literal], ord: TermOrder) -> Vec<usize> {
    let mut flipped = Vec::new();
    for (i, l) in lits.iter_mut().enumerate() {
        if let Some((a, b)) = l.eq_sides() {
            match compare(a, b, ord) {
                OrderResult::Greater => l.oriented = true,
                OrderResult::Equal | OrderResult::NotComparable => l.oriented = false,
                OrderResult::Less => {
                    if let Some(f) = l.flipped() {
                        *l = f;
                        l.oriented = true;
                        flipped.push(i);
                    }
                }
            }
        }
    }
    flipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{self, SymbolKind};
    use serial_test::serial;

    fn t(s: &str) -> Term {
        s.parse().unwrap()
    }

    fn setup() {
        symbols::reset_table();
        // fix a precedence: a < b < g < f
        for (i, (name, arity)) in [("a", 0), ("b", 0), ("g", 1), ("f", 2)].iter().enumerate() {
            let id = symbols::intern(name, *arity);
            symbols::set_kind(id, SymbolKind::Function);
            symbols::set_precedence(id, i + 10);
        }
    }

    #[test]
    #[serial]
    fn lpo_basics() {
        setup();
        assert!(greater(&t("f(x,y)"), &t("x"), TermOrder::Lpo));
        assert!(!greater(&t("x"), &t("f(x,y)"), TermOrder::Lpo));
        assert!(greater(&t("f(a,b)"), &t("g(a)"), TermOrder::Lpo));
        assert!(greater(&t("g(g(a))"), &t("g(a)"), TermOrder::Lpo));
        // variables unrelated to the left side are not dominated
        assert_eq!(
            compare(&t("f(x,x)"), &t("g(y)"), TermOrder::Lpo),
            OrderResult::NotComparable
        );
    }

    #[test]
    #[serial]
    fn commutativity_is_unorientable() {
        setup();
        let l = t("f(x,y)");
        let r = {
            // parse in one clause so variables are shared
            let c: crate::clause::Clause = "f(x,y) = f(y,x).".parse().unwrap();
            c.literals[0].atom.args()[1].clone()
        };
        assert_eq!(compare(&l, &r, TermOrder::Lpo), OrderResult::NotComparable);
        assert_eq!(compare(&l, &r, TermOrder::Kbo), OrderResult::NotComparable);
    }

    #[test]
    #[serial]
    fn kbo_weight_dominates() {
        setup();
        assert!(greater(&t("f(a,b)"), &t("g(a)"), TermOrder::Kbo));
        assert!(greater(&t("g(g(x))"), &t("g(x)"), TermOrder::Kbo));
        // variable condition: f(x,x) vs g(y) is not comparable
        assert_eq!(
            compare(&t("f(x,x)"), &t("g(y)"), TermOrder::Kbo),
            OrderResult::NotComparable
        );
    }

    #[test]
    #[serial]
    fn orientation_flips_smaller_left_sides(){
        setup();
        let mut c: crate::clause::Clause = "a = f(a,b).".parse().unwrap();
        let flipped = orient_equalities(&mut c.literals, TermOrder::Lpo);
        assert_eq!(flipped, vec![0]);
        assert!(c.literals[0].oriented);
        assert_eq!(c.to_string(), "f(a,b) = a.");
    }

    #[test]
    #[serial]
    fn maximal_literal_marking() {
        setup();
        let mut c: crate::clause::Clause = "p(a) | q(f(a,b)).".parse().unwrap();
        let p = symbols::lookup("p", 1).unwrap();
        let q = symbols::lookup("q", 1).unwrap();
        symbols::set_precedence(p, 1);
        symbols::set_precedence(q, 2);
        mark_maximal_literals(&mut c.literals, TermOrder::Lpo);
        assert!(!c.literals[0].maximal);
        assert!(c.literals[1].maximal);
    }
}
