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

//! Path index for unification-compatible retrieval.
//!
//! Terms are fingerprinted by what sits at a fixed set of sample paths:
//! a concrete symbol, a variable, a position below a variable, or nothing
//! at all.  The index is a trie over those labels, and retrieval walks
//! every branch whose label is compatible with the query under the wanted
//! relation (unifiable / instance / generalization).  The result is a
//! candidate superset; callers confirm with real unification or matching.

use std::collections::HashMap;

use crate::symbols::SymbolId;
use crate::term::Term;

/// Sample paths, shallow first.  Two levels is enough discrimination for
/// clause atoms; deeper structure is confirmed by the caller anyway.
const PATHS: [&[usize]; 7] = [&[], &[0], &[1], &[0, 0], &[0, 1], &[1, 0], &[1, 1]];

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum Label {
    Sym(SymbolId),
    Var,
    /// The path passes through a variable.
    Below,
    /// The path does not exist in the term.
    Nothing,
}

fn label_at(t: &Term, path: &[usize]) -> Label {
    match path.split_first() {
        None => match t {
            Term::Variable(_) => Label::Var,
            Term::Application { symbol, .. } => Label::Sym(*symbol),
        },
        Some((&i, rest)) => match t {
            Term::Variable(_) => Label::Below,
            Term::Application { args, .. } => match args.get(i) {
                Some(a) => label_at(a, rest),
                None => Label::Nothing,
            },
        },
    }
}

fn fingerprint(t: &Term) -> Vec<Label> {
    PATHS.iter().map(|p| label_at(t, p)).collect()
}

#[derive(Clone, Copy)]
enum Mode {
    Unify,
    /// Stored terms that some substitution maps onto the query.
    Generalization,
    /// Stored terms that are instances of the query.
    Instance,
}

fn compatible(stored: Label, query: Label, mode: Mode) -> bool {
    use Label::*;
    match mode {
        Mode::Unify => match (stored, query) {
            (Sym(a), Sym(b)) => a == b,
            (Sym(_), Nothing) | (Nothing, Sym(_)) => false,
            (Var, Nothing) | (Nothing, Var) => false,
            _ => true,
        },
        Mode::Generalization => match (stored, query) {
            (Sym(a), Sym(b)) => a == b,
            (Var, Sym(_)) | (Var, Var) | (Var, Below) => true,
            (Below, _) => true,
            (Nothing, Nothing) => true,
            _ => false,
        },
        Mode::Instance => match (stored, query) {
            (Sym(a), Sym(b)) => a == b,
            (Sym(_), Var) | (Var, Var) | (Below, Var) => true,
            (_, Below) => true,
            (Nothing, Nothing) => true,
            _ => false,
        },
    }
}

#[derive(Clone)]
struct FpNode<T> {
    children: HashMap<Label, FpNode<T>>,
    entries: Vec<(Term, T)>,
}

impl<T> FpNode<T> {
    fn new() -> FpNode<T> {
        FpNode {
            children: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

/// The index proper.  `T` is whatever the caller wants back — typically a
/// (clause id, literal index) pair, never a reference into the arena.
#[derive(Clone)]
pub struct FpaIndex<T> {
    root: FpNode<T>,
    len: usize,
}

impl<T: PartialEq + Clone> Default for FpaIndex<T> {
    fn default() -> Self {
        FpaIndex::new()
    }
}

impl<T: PartialEq + Clone> FpaIndex<T> {
    pub fn new() -> FpaIndex<T> {
        FpaIndex {
            root: FpNode::new(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, term: Term, value: T) {
        let fp = fingerprint(&term);
        let mut node = &mut self.root;
        for label in fp {
            node = node.children.entry(label).or_insert_with(FpNode::new);
        }
        node.entries.push((term, value));
        self.len += 1;
    }

    /// Remove one (term, value) entry.  Removing an entry that was never
    /// inserted is an index-invariant violation the caller must rule out.
    pub fn remove(&mut self, term: &Term, value: &T) -> bool {
        let fp = fingerprint(term);
        let mut node = &mut self.root;
        for label in fp {
            match node.children.get_mut(&label) {
                Some(n) => node = n,
                None => return false,
            }
        }
        match node
            .entries
            .iter()
            .position(|(t, v)| t == term && v == value)
        {
            Some(i) => {
                node.entries.remove(i);
                self.len -= 1;
                true
            }
            None => false,
        }
    }

    fn retrieve(&self, query: &Term, mode: Mode) -> Vec<(&Term, &T)> {
        let fp = fingerprint(query);
        let mut out = Vec::new();
        let mut stack: Vec<(&FpNode<T>, usize)> = vec![(&self.root, 0)];
        while let Some((node, depth)) = stack.pop() {
            if depth == fp.len() {
                out.extend(node.entries.iter().map(|(t, v)| (t, v)));
                continue;
            }
            for (&label, child) in &node.children {
                if compatible(label, fp[depth], mode) {
                    stack.push((child, depth + 1));
                }
            }
        }
        out
    }

    /// Candidate stored terms unifiable with the query.
    pub fn unifiable(&self, query: &Term) -> Vec<(&Term, &T)> {
        self.retrieve(query, Mode::Unify)
    }

    /// Candidate stored terms that match onto (generalize) the query.
    pub fn generalizations(&self, query: &Term) -> Vec<(&Term, &T)> {
        self.retrieve(query, Mode::Generalization)
    }

    /// Candidate stored terms that the query matches onto.
    pub fn instances(&self, query: &Term) -> Vec<(&Term, &T)> {
        self.retrieve(query, Mode::Instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols;
    use crate::unify::{match_terms, unify, Bindings};
    use serial_test::serial;

    fn t(s: &str) -> Term {
        s.parse().unwrap()
    }

    #[test]
    #[serial]
    fn retrieval_modes() {
        symbols::reset_table();
        let mut idx: FpaIndex<u32> = FpaIndex::new();
        idx.insert(t("f(a,b)"), 1);
        idx.insert(t("f(x,b)"), 2);
        idx.insert(t("g(a)"), 3);
        idx.insert(t("f(g(x),y)"), 4);

        // unifiable with f(y,b): all three f-terms
        let hits: Vec<u32> = idx.unifiable(&t("f(y,b)")).iter().map(|(_, v)| **v).collect();
        assert_eq!(hits.len(), 3);
        assert!(!hits.contains(&3));

        // generalizations of f(a,b): f(a,b) and f(x,b)
        let mut gens: Vec<u32> = idx
            .generalizations(&t("f(a,b)"))
            .iter()
            .map(|(_, v)| **v)
            .collect();
        gens.sort_unstable();
        assert_eq!(gens, vec![1, 2]);

        // instances of f(x,y): every f-term
        let inst = idx.instances(&t("f(x,y)"));
        assert_eq!(inst.len(), 3);
    }

    #[test]
    #[serial]
    fn candidates_cover_every_true_unifier() {
        symbols::reset_table();
        let stored = ["f(a,b)", "f(b,a)", "f(x,x)", "h(f(a,a))", "g(a)"];
        let mut idx: FpaIndex<u32> = FpaIndex::new();
        for (i, s) in stored.iter().enumerate() {
            idx.insert(t(s), i as u32);
        }
        let query = t("f(a,y)").shift_vars(10);
        let candidates: Vec<u32> = idx.unifiable(&query).iter().map(|(_, v)| **v).collect();
        for (i, s) in stored.iter().enumerate() {
            let mut b = Bindings::new();
            if unify(&t(s), &query, &mut b) {
                // no true unifier may be filtered out
                assert!(candidates.contains(&(i as u32)), "missed {}", s);
            }
        }
        // an impossible query yields no candidates
        assert!(idx.generalizations(&t("k(a)")).is_empty());
    }

    #[test]
    #[serial]
    fn remove_entries() {
        symbols::reset_table();
        let mut idx: FpaIndex<u32> = FpaIndex::new();
        idx.insert(t("f(a,b)"), 7);
        assert_eq!(idx.len(), 1);
        assert!(idx.remove(&t("f(a,b)"), &7));
        assert!(!idx.remove(&t("f(a,b)"), &7));
        assert!(idx.is_empty());
        assert!(idx.unifiable(&t("f(x,y)")).is_empty());
    }

    #[test]
    #[serial]
    fn generalization_retrieval_feeds_matching() {
        symbols::reset_table();
        let mut idx: FpaIndex<u32> = FpaIndex::new();
        idx.insert(t("f(x,g(y))"), 1);
        let query = t("f(a,g(b))");
        let hits = idx.generalizations(&query);
        assert_eq!(hits.len(), 1);
        let mut b = Bindings::new();
        assert!(match_terms(hits[0].0, &query, &mut b));
    }
}
