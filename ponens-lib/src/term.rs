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

//! First-order terms.
//!
//! Terms are immutable; a variable is a numeric index normalised per
//! clause, an application is a symbol id plus ordered arguments.  All
//! destructive operations (binding, rewriting) build new terms — undo in
//! the unifier is then just truncating its trail, and the indexes can hold
//! plain copies without back-pointer repair.

use std::collections::HashSet;
use std::fmt;

use crate::symbols::{self, SymbolId};

pub type VarId = usize;

/// A position is the path of argument indices from the root of a term.
pub type Position = Vec<usize>;

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Term {
    Variable(VarId),
    Application { symbol: SymbolId, args: Vec<Term> },
}

impl Term {
    pub fn var(n: VarId) -> Term {
        Term::Variable(n)
    }

    pub fn app(symbol: SymbolId, args: Vec<Term>) -> Term {
        Term::Application { symbol, args }
    }

    pub fn constant(symbol: SymbolId) -> Term {
        Term::Application {
            symbol,
            args: Vec::new(),
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Term::Application { args, .. } if args.is_empty())
    }

    pub fn symbol(&self) -> Option<SymbolId> {
        match self {
            Term::Variable(_) => None,
            Term::Application { symbol, .. } => Some(*symbol),
        }
    }

    pub fn args(&self) -> &[Term] {
        match self {
            Term::Variable(_) => &[],
            Term::Application { args, .. } => args,
        }
    }

    pub fn subterm_at(&self, pos: &[usize]) -> Option<&Term> {
        let mut t = self;
        for &i in pos {
            t = t.args().get(i)?;
        }
        Some(t)
    }

    /// A copy of `self` with the subterm at `pos` replaced.
    pub fn replace_at(&self, pos: &[usize], replacement: Term) -> Term {
        match pos.split_first() {
            None => replacement,
            Some((&i, rest)) => match self {
                Term::Variable(_) => self.clone(),
                Term::Application { symbol, args } => {
                    let mut args = args.clone();
                    args[i] = args[i].replace_at(rest, replacement);
                    Term::Application {
                        symbol: *symbol,
                        args,
                    }
                }
            },
        }
    }

    /// Every (position, subterm) pair in left-to-right preorder, the root
    /// included.
    pub fn subterms(&self) -> Vec<(Position, &Term)> {
        fn walk<'a>(t: &'a Term, pos: &mut Position, out: &mut Vec<(Position, &'a Term)>) {
            out.push((pos.clone(), t));
            for (i, a) in t.args().iter().enumerate() {
                pos.push(i);
                walk(a, pos, out);
                pos.pop();
            }
        }
        let mut out = Vec::new();
        walk(self, &mut Vec::new(), &mut out);
        out
    }

    pub fn collect_variables(&self, out: &mut HashSet<VarId>) {
        match self {
            Term::Variable(v) => {
                out.insert(*v);
            }
            Term::Application { args, .. } => {
                for a in args {
                    a.collect_variables(out);
                }
            }
        }
    }

    pub fn variables(&self) -> HashSet<VarId> {
        let mut set = HashSet::new();
        self.collect_variables(&mut set);
        set
    }

    pub fn is_ground(&self) -> bool {
        match self {
            Term::Variable(_) => false,
            Term::Application { args, .. } => args.iter().all(|a| a.is_ground()),
        }
    }

    /// Number of variable occurrences of `v`.
    pub fn var_occurrences(&self, v: VarId) -> usize {
        match self {
            Term::Variable(u) => (*u == v) as usize,
            Term::Application { args, .. } => args.iter().map(|a| a.var_occurrences(v)).sum(),
        }
    }

    pub fn symbol_count(&self) -> usize {
        match self {
            Term::Variable(_) => 1,
            Term::Application { args, .. } => {
                1 + args.iter().map(|a| a.symbol_count()).sum::<usize>()
            }
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Term::Variable(_) => 0,
            Term::Application { args, .. } => {
                1 + args.iter().map(|a| a.depth()).max().unwrap_or(0)
            }
        }
    }

    pub fn max_var(&self) -> Option<VarId> {
        match self {
            Term::Variable(v) => Some(*v),
            Term::Application { args, .. } => args.iter().filter_map(|a| a.max_var()).max(),
        }
    }

    /// A copy with every variable index shifted by `offset`; used to rename
    /// two clauses apart before unification.
    pub fn shift_vars(&self, offset: usize) -> Term {
        match self {
            Term::Variable(v) => Term::Variable(v + offset),
            Term::Application { symbol, args } => Term::Application {
                symbol: *symbol,
                args: args.iter().map(|a| a.shift_vars(offset)).collect(),
            },
        }
    }

    /// A copy with variables renamed through `map`.
    pub fn map_vars(&self, map: &dyn Fn(VarId) -> VarId) -> Term {
        match self {
            Term::Variable(v) => Term::Variable(map(*v)),
            Term::Application { symbol, args } => Term::Application {
                symbol: *symbol,
                args: args.iter().map(|a| a.map_vars(map)).collect(),
            },
        }
    }
}

/// Canonical form modulo the unification theories of the symbols:
/// AC symbols are flattened and their arguments sorted, commutative
/// symbols have their two arguments sorted.  Two terms are equal modulo
/// C/AC iff their canonical forms are syntactically equal.
pub fn ac_canonical(t: &Term) -> Term {
    match t {
        Term::Variable(_) => t.clone(),
        Term::Application { symbol, args } => {
            let mut canon: Vec<Term> = args.iter().map(ac_canonical).collect();
            if symbols::is_ac(*symbol) {
                // flatten nested applications of the same symbol
                let mut flat = Vec::new();
                for a in canon {
                    match a {
                        Term::Application { symbol: s, args: inner } if s == *symbol => {
                            flat.extend(inner)
                        }
                        other => flat.push(other),
                    }
                }
                flat.sort_by(term_key_cmp);
                // rebuild right-associated
                let mut it = flat.into_iter().rev();
                let mut acc = it.next().expect("ac symbol has arguments");
                for a in it {
                    acc = Term::Application {
                        symbol: *symbol,
                        args: vec![a, acc],
                    };
                }
                return acc;
            }
            if symbols::is_commutative(*symbol) && canon.len() == 2 {
                canon.sort_by(term_key_cmp);
            }
            Term::Application {
                symbol: *symbol,
                args: canon,
            }
        }
    }
}

fn term_key_cmp(a: &Term, b: &Term) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Term::Variable(u), Term::Variable(v)) => u.cmp(v),
        (Term::Variable(_), Term::Application { .. }) => Ordering::Less,
        (Term::Application { .. }, Term::Variable(_)) => Ordering::Greater,
        (
            Term::Application { symbol: f, args: x },
            Term::Application { symbol: g, args: y },
        ) => f.cmp(g).then_with(|| {
            for (a, b) in x.iter().zip(y.iter()) {
                let c = term_key_cmp(a, b);
                if c != Ordering::Equal {
                    return c;
                }
            }
            x.len().cmp(&y.len())
        }),
    }
}

/// Print names for the first few variable indices, v<n> beyond.
pub fn variable_name(v: VarId) -> String {
    match v {
        0 => "x".to_string(),
        1 => "y".to_string(),
        2 => "z".to_string(),
        3 => "u".to_string(),
        4 => "w".to_string(),
        5 => "v".to_string(),
        n => format!("v{}", n),
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(v) => write!(f, "{}", variable_name(*v)),
            Term::Application { symbol, args } => {
                let name = symbols::name(*symbol);
                if args.is_empty() {
                    write!(f, "{}", name)
                } else if args.len() == 2
                    && matches!(
                        symbols::fixity(*symbol),
                        symbols::Fixity::Infix
                            | symbols::Fixity::InfixLeft
                            | symbols::Fixity::InfixRight
                    )
                {
                    write!(f, "{} {} {}", args[0], name, args[1])
                } else {
                    write!(
                        f,
                        "{}({})",
                        name,
                        args.iter()
                            .map(|a| a.to_string())
                            .collect::<Vec<String>>()
                            .join(",")
                    )
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

    fn f(args: Vec<Term>) -> Term {
        Term::app(symbols::intern("f", args.len()), args)
    }

    #[test]
    #[serial]
    fn positions_round_trip() {
        symbols::reset_table();
        let t = f(vec![Term::var(0), f(vec![Term::var(1), Term::var(0)])]);
        assert_eq!(t.subterm_at(&[1, 0]), Some(&Term::var(1)));
        let r = t.replace_at(&[1, 0], Term::var(2));
        assert_eq!(r.subterm_at(&[1, 0]), Some(&Term::var(2)));
        // the original is untouched
        assert_eq!(t.subterm_at(&[1, 0]), Some(&Term::var(1)));
    }

    #[test]
    #[serial]
    fn subterms_preorder() {
        symbols::reset_table();
        let t = f(vec![Term::var(0), Term::var(1)]);
        let subs = t.subterms();
        assert_eq!(subs.len(), 3);
        assert_eq!(subs[0].0, Vec::<usize>::new());
        assert_eq!(subs[1].0, vec![0]);
        assert_eq!(subs[2].0, vec![1]);
    }

    #[test]
    #[serial]
    fn counting() {
        symbols::reset_table();
        let t = f(vec![Term::var(0), f(vec![Term::var(0), Term::var(1)])]);
        assert_eq!(t.symbol_count(), 5);
        assert_eq!(t.depth(), 2);
        assert_eq!(t.var_occurrences(0), 2);
        assert_eq!(t.max_var(), Some(1));
        assert!(!t.is_ground());
    }
}
