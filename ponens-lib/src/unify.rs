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

//! Unification and matching.
//!
//! A `Bindings` frame maps variable indices to terms and records every
//! binding on a trail.  `mark`/`undo_to` give O(trail depth) undo, so
//! callers can compose several unifications and roll back any failed
//! branch.  Terms from two clauses are expected to have been renamed apart
//! (see `Term::shift_vars`) before unification.

use crate::symbols;
use crate::term::{Term, VarId};

#[derive(Clone, Debug, Default)]
pub struct Bindings {
    map: Vec<Option<Term>>,
    trail: Vec<VarId>,
}

/// A point on the trail to undo back to.
pub type Mark = usize;

impl Bindings {
    pub fn new() -> Bindings {
        Bindings::default()
    }

    pub fn mark(&self) -> Mark {
        self.trail.len()
    }

    /// Remove every binding made since `m`.
    pub fn undo_to(&mut self, m: Mark) {
        while self.trail.len() > m {
            let v = self.trail.pop().unwrap();
            self.map[v] = None;
        }
    }

    pub fn bind(&mut self, v: VarId, t: Term) {
        if self.map.len() <= v {
            self.map.resize(v + 1, None);
        }
        debug_assert!(self.map[v].is_none(), "rebinding variable {}", v);
        self.map[v] = Some(t);
        self.trail.push(v);
    }

    pub fn lookup(&self, v: VarId) -> Option<&Term> {
        self.map.get(v).and_then(|t| t.as_ref())
    }

    /// Chase top-level variable bindings.
    pub fn dereference<'a>(&'a self, mut t: &'a Term) -> &'a Term {
        while let Term::Variable(v) = t {
            match self.lookup(*v) {
                Some(bound) => t = bound,
                None => break,
            }
        }
        t
    }

    /// Apply the bindings all the way down, producing a new term.
    pub fn resolve(&self, t: &Term) -> Term {
        let t = self.dereference(t);
        match t {
            Term::Variable(_) => t.clone(),
            Term::Application { symbol, args } => Term::Application {
                symbol: *symbol,
                args: args.iter().map(|a| self.resolve(a)).collect(),
            },
        }
    }

    fn occurs(&self, v: VarId, t: &Term) -> bool {
        let t = self.dereference(t);
        match t {
            Term::Variable(u) => *u == v,
            Term::Application { args, .. } => args.iter().any(|a| self.occurs(v, a)),
        }
    }
}

/// Syntactic unification.  On success the bindings are extended; on failure
/// they are restored to their state at entry.
pub fn unify(s: &Term, t: &Term, b: &mut Bindings) -> bool {
    let m = b.mark();
    if unify_rec(s, t, b) {
        true
    } else {
        b.undo_to(m);
        false
    }
}

fn unify_rec(s: &Term, t: &Term, b: &mut Bindings) -> bool {
    let s = b.dereference(s).clone();
    let t = b.dereference(t).clone();
    match (&s, &t) {
        (Term::Variable(v), Term::Variable(u)) if v == u => true,
        (Term::Variable(v), _) => {
            if b.occurs(*v, &t) {
                false
            } else {
                b.bind(*v, t);
                true
            }
        }
        (_, Term::Variable(u)) => {
            if b.occurs(*u, &s) {
                false
            } else {
                b.bind(*u, s);
                true
            }
        }
        (
            Term::Application { symbol: f, args: a },
            Term::Application { symbol: g, args: c },
        ) => f == g && a.iter().zip(c.iter()).all(|(x, y)| unify_rec(x, y, b)),
    }
}

/// One-sided matching: only variables of `pattern` may be bound; the
/// subject is taken as ground with respect to the frame.  Restores the
/// frame on failure.
pub fn match_terms(pattern: &Term, subject: &Term, b: &mut Bindings) -> bool {
    let m = b.mark();
    if match_rec(pattern, subject, b) {
        true
    } else {
        b.undo_to(m);
        false
    }
}

fn match_rec(pattern: &Term, subject: &Term, b: &mut Bindings) -> bool {
    match pattern {
        Term::Variable(v) => match b.lookup(*v) {
            Some(bound) => bound == subject,
            None => {
                b.bind(*v, subject.clone());
                true
            }
        },
        Term::Application { symbol: f, args: a } => match subject {
            Term::Application { symbol: g, args: c } if f == g => {
                a.iter().zip(c.iter()).all(|(x, y)| match_rec(x, y, b))
            }
            _ => false,
        },
    }
}

/// True if the two terms are equal up to variable renaming.
pub fn variant(s: &Term, t: &Term) -> bool {
    let mut fwd = Bindings::new();
    let mut bwd = Bindings::new();
    match_terms(s, t, &mut fwd) && match_terms(t, s, &mut bwd)
}

/// All unifiers of `s` and `t` when commutative symbols are involved, as
/// complete binding frames.  For symbols with the empty theory this yields
/// at most one frame; for commutative (and AC, treated argument-wise)
/// symbols it backtracks over the argument swap at each node.  Dropping the
/// iterator cancels the enumeration.
pub fn unify_commutative(s: &Term, t: &Term) -> impl Iterator<Item = Bindings> {
    let mut solutions = Vec::new();
    let mut b = Bindings::new();
    unify_c_rec(&[(s.clone(), t.clone())], &mut b, &mut solutions);
    solutions.into_iter()
}

fn unify_c_rec(goals: &[(Term, Term)], b: &mut Bindings, out: &mut Vec<Bindings>) {
    match goals.split_first() {
        None => out.push(b.clone()),
        Some(((s, t), rest)) => {
            let s = b.dereference(s).clone();
            let t = b.dereference(t).clone();
            match (&s, &t) {
                (Term::Variable(v), Term::Variable(u)) if v == u => unify_c_rec(rest, b, out),
                (Term::Variable(v), _) => {
                    if !b.occurs(*v, &t) {
                        let m = b.mark();
                        b.bind(*v, t);
                        unify_c_rec(rest, b, out);
                        b.undo_to(m);
                    }
                }
                (_, Term::Variable(u)) => {
                    if !b.occurs(*u, &s) {
                        let m = b.mark();
                        b.bind(*u, s);
                        unify_c_rec(rest, b, out);
                        b.undo_to(m);
                    }
                }
                (
                    Term::Application { symbol: f, args: a },
                    Term::Application { symbol: g, args: c },
                ) => {
                    if f != g {
                        return;
                    }
                    let straight: Vec<(Term, Term)> = a
                        .iter()
                        .cloned()
                        .zip(c.iter().cloned())
                        .chain(rest.iter().cloned())
                        .collect();
                    unify_c_rec(&straight, b, out);
                    if symbols::is_commutative(*f) && a.len() == 2 {
                        let swapped: Vec<(Term, Term)> = vec![
                            (a[0].clone(), c[1].clone()),
                            (a[1].clone(), c[0].clone()),
                        ]
                        .into_iter()
                        .chain(rest.iter().cloned())
                        .collect();
                        unify_c_rec(&swapped, b, out);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols;
    use serial_test::serial;

    fn t(s: &str) -> Term {
        s.parse().unwrap()
    }

    #[test]
    #[serial]
    fn unify_and_undo_restores_bindings() {
        symbols::reset_table();
        let s = t("f(x,g(y))");
        let u = t("f(g(z),g(g(z)))").shift_vars(2);
        let mut b = Bindings::new();
        let m = b.mark();
        assert!(unify(&s, &u, &mut b));
        assert!(b.lookup(0).is_some());
        b.undo_to(m);
        assert!(b.lookup(0).is_none());
        assert!(b.lookup(1).is_none());
    }

    #[test]
    #[serial]
    fn occurs_check() {
        symbols::reset_table();
        let s = t("x");
        let u = t("f(x,y)");
        let mut b = Bindings::new();
        assert!(!unify(&s, &u, &mut b));
        assert!(b.lookup(0).is_none());
    }

    #[test]
    #[serial]
    fn failed_unify_leaves_no_bindings() {
        symbols::reset_table();
        let s = t("f(x,a)");
        let u = t("f(b,b)");
        let mut b = Bindings::new();
        assert!(!unify(&s, &u, &mut b));
        assert!(b.lookup(0).is_none());
    }

    #[test]
    #[serial]
    fn matching_is_one_sided() {
        symbols::reset_table();
        let pat = t("f(x,x)");
        let sub = t("f(g(a),g(a))");
        let mut b = Bindings::new();
        assert!(match_terms(&pat, &sub, &mut b));
        // the subject is not matched by an incompatible pattern
        let pat2 = t("f(x,x)");
        let sub2 = t("f(a,b)");
        let mut b2 = Bindings::new();
        assert!(!match_terms(&pat2, &sub2, &mut b2));
        // matching never binds subject variables
        let pat3 = t("a");
        let sub3 = t("x");
        let mut b3 = Bindings::new();
        assert!(!match_terms(&pat3, &sub3, &mut b3));
    }

    #[test]
    #[serial]
    fn commutative_unifiers_are_enumerated() {
        symbols::reset_table();
        let s = t("f(x,a)");
        let u = t("f(a,y)").shift_vars(1);
        // without a theory there is one unifier
        assert_eq!(unify_commutative(&s, &u).count(), 1);
        let f = symbols::intern("f", 2);
        symbols::set_theory(f, symbols::UnifTheory::Commutative);
        // with commutativity the swap also unifies: {x->a, y->a} and {x->y}
        assert_eq!(unify_commutative(&s, &u).count(), 2);
    }

    #[test]
    #[serial]
    fn variant_terms() {
        symbols::reset_table();
        assert!(variant(&t("f(x,y)"), &t("f(y,x)")));
        assert!(!variant(&t("f(x,x)"), &t("f(x,y)")));
    }
}
