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

//! Clausification of first-order formulas: negation normal form,
//! Skolemisation, and distribution to CNF.  Good enough for the input
//! language's `formulas(...)` lists; no miniscoping or definitional CNF.

use std::collections::HashMap;
use std::fmt;

use crate::clause::{Clause, Literal};
use crate::just::Justification;
use crate::symbols;
use crate::term::{Term, VarId};

#[derive(Clone, Debug, PartialEq)]
pub enum Formula {
    Atom(Term),
    Not(Box<Formula>),
    And(Box<Formula>, Box<Formula>),
    Or(Box<Formula>, Box<Formula>),
    Imp(Box<Formula>, Box<Formula>),
    Iff(Box<Formula>, Box<Formula>),
    All(VarId, Box<Formula>),
    Exists(VarId, Box<Formula>),
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::Atom(t) => write!(f, "{}", t),
            Formula::Not(x) => write!(f, "-({})", x),
            Formula::And(a, b) => write!(f, "({} & {})", a, b),
            Formula::Or(a, b) => write!(f, "({} | {})", a, b),
            Formula::Imp(a, b) => write!(f, "({} -> {})", a, b),
            Formula::Iff(a, b) => write!(f, "({} <-> {})", a, b),
            Formula::All(v, x) => write!(f, "(all {} {})", crate::term::variable_name(*v), x),
            Formula::Exists(v, x) => {
                write!(f, "(exists {} {})", crate::term::variable_name(*v), x)
            }
        }
    }
}

/// Negation normal form with implications expanded.
#[derive(Clone, Debug)]
enum Nnf {
    Lit(bool, Term),
    And(Box<Nnf>, Box<Nnf>),
    Or(Box<Nnf>, Box<Nnf>),
    All(VarId, Box<Nnf>),
    Exists(VarId, Box<Nnf>),
}

fn nnf(f: &Formula, positive: bool) -> Nnf {
    match f {
        Formula::Atom(t) => Nnf::Lit(positive, t.clone()),
        Formula::Not(x) => nnf(x, !positive),
        Formula::And(a, b) => {
            let (l, r) = (Box::new(nnf(a, positive)), Box::new(nnf(b, positive)));
            if positive {
                Nnf::And(l, r)
            } else {
                Nnf::Or(l, r)
            }
        }
        Formula::Or(a, b) => {
            let (l, r) = (Box::new(nnf(a, positive)), Box::new(nnf(b, positive)));
            if positive {
                Nnf::Or(l, r)
            } else {
                Nnf::And(l, r)
            }
        }
        Formula::Imp(a, b) => nnf(
            &Formula::Or(Box::new(Formula::Not(a.clone())), b.clone()),
            positive,
        ),
        Formula::Iff(a, b) => nnf(
            &Formula::And(
                Box::new(Formula::Imp(a.clone(), b.clone())),
                Box::new(Formula::Imp(b.clone(), a.clone())),
            ),
            positive,
        ),
        Formula::All(v, x) => {
            if positive {
                Nnf::All(*v, Box::new(nnf(x, true)))
            } else {
                Nnf::Exists(*v, Box::new(nnf(x, false)))
            }
        }
        Formula::Exists(v, x) => {
            if positive {
                Nnf::Exists(*v, Box::new(nnf(x, true)))
            } else {
                Nnf::All(*v, Box::new(nnf(x, false)))
            }
        }
    }
}

fn substitute(t: &Term, map: &HashMap<VarId, Term>) -> Term {
    match t {
        Term::Variable(v) => map.get(v).cloned().unwrap_or_else(|| t.clone()),
        Term::Application { symbol, args } => Term::Application {
            symbol: *symbol,
            args: args.iter().map(|a| substitute(a, map)).collect(),
        },
    }
}

/// Replace existential variables with Skolem terms over the universals in
/// scope, and drop the quantifiers.
fn skolemize(f: &Nnf, universals: &mut Vec<VarId>, map: &mut HashMap<VarId, Term>) -> Nnf {
    match f {
        Nnf::Lit(sign, t) => Nnf::Lit(*sign, substitute(t, map)),
        Nnf::And(a, b) => Nnf::And(
            Box::new(skolemize(a, universals, map)),
            Box::new(skolemize(b, universals, map)),
        ),
        Nnf::Or(a, b) => Nnf::Or(
            Box::new(skolemize(a, universals, map)),
            Box::new(skolemize(b, universals, map)),
        ),
        Nnf::All(v, x) => {
            universals.push(*v);
            let r = skolemize(x, universals, map);
            universals.pop();
            r
        }
        Nnf::Exists(v, x) => {
            let sk = symbols::fresh_skolem(universals.len());
            let args: Vec<Term> = universals.iter().map(|u| Term::Variable(*u)).collect();
            map.insert(*v, Term::app(sk, args));
            let r = skolemize(x, universals, map);
            map.remove(v);
            r
        }
    }
}

/// Distribute Or over And: the result is a list of literal lists.
fn cnf(f: &Nnf) -> Vec<Vec<(bool, Term)>> {
    match f {
        Nnf::Lit(sign, t) => vec![vec![(*sign, t.clone())]],
        Nnf::And(a, b) => {
            let mut out = cnf(a);
            out.extend(cnf(b));
            out
        }
        Nnf::Or(a, b) => {
            let ca = cnf(a);
            let cb = cnf(b);
            let mut out = Vec::with_capacity(ca.len() * cb.len());
            for x in &ca {
                for y in &cb {
                    let mut lits = x.clone();
                    lits.extend(y.iter().cloned());
                    out.push(lits);
                }
            }
            out
        }
        Nnf::All(_, x) | Nnf::Exists(_, x) => cnf(x),
    }
}

/// Clausify a formula.  Free variables are taken as universally
/// quantified.  The caller supplies the justification for each clause
/// (normally `clausify(<formula id>)`).
pub fn clausify(f: &Formula, justify: &dyn Fn() -> Justification) -> Vec<Clause> {
    let n = nnf(f, true);
    let s = skolemize(&n, &mut Vec::new(), &mut HashMap::new());
    cnf(&s)
        .into_iter()
        .map(|lits| {
            let mut c = Clause::new(
                lits.into_iter()
                    .map(|(sign, atom)| Literal::new(sign, atom))
                    .collect(),
                justify(),
            );
            c.renumber_variables();
            c
        })
        .collect()
}

/// The negation of a formula (used for goals: prove F by refuting -F).
pub fn negate(f: &Formula) -> Formula {
    Formula::Not(Box::new(f.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn atom(s: &str) -> Formula {
        Formula::Atom(s.parse().unwrap())
    }

    #[test]
    #[serial]
    fn implication_becomes_disjunction() {
        symbols::reset_table();
        let f = Formula::Imp(Box::new(atom("p(x)")), Box::new(atom("q(x)")));
        let clauses = clausify(&f, &Justification::default);
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].to_string(), "-p(x) | q(x).");
    }

    #[test]
    #[serial]
    fn iff_becomes_two_clauses() {
        symbols::reset_table();
        let f = Formula::Iff(Box::new(atom("p(x)")), Box::new(atom("q(x)")));
        let clauses = clausify(&f, &Justification::default);
        assert_eq!(clauses.len(), 2);
    }

    #[test]
    #[serial]
    fn existential_is_skolemized_over_universals() {
        symbols::reset_table();
        // all x exists y p(x,y) — y becomes f(x)
        let p = atom("p(x,y)");
        let (x, y) = (0, 1);
        let f = Formula::All(x, Box::new(Formula::Exists(y, Box::new(p))));
        let clauses = clausify(&f, &Justification::default);
        assert_eq!(clauses.len(), 1);
        let lit = &clauses[0].literals[0];
        // second argument is a 1-ary skolem application of the first
        let arg = &lit.atom.args()[1];
        assert!(!arg.is_variable());
        assert_eq!(arg.args().len(), 1);
        assert!(symbols::is_skolem(arg.symbol().unwrap()));
    }

    #[test]
    #[serial]
    fn negated_universal_gives_skolem_constant() {
        symbols::reset_table();
        // -(all x p(x)) == exists x -p(x)
        let f = Formula::Not(Box::new(Formula::All(0, Box::new(atom("p(x)")))));
        let clauses = clausify(&f, &Justification::default);
        assert_eq!(clauses.len(), 1);
        let lit = &clauses[0].literals[0];
        assert!(!lit.sign);
        assert!(lit.atom.args()[0].is_constant());
    }

    #[test]
    #[serial]
    fn distribution() {
        symbols::reset_table();
        // p & (q | r) -> two clauses; (p & q) | r -> two clauses with r
        let f = Formula::Or(
            Box::new(Formula::And(Box::new(atom("p")), Box::new(atom("q")))),
            Box::new(atom("r")),
        );
        let clauses = clausify(&f, &Justification::default);
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].to_string(), "p | r.");
        assert_eq!(clauses[1].to_string(), "q | r.");
    }
}
