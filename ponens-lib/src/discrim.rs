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

//! Discrimination tree.
//!
//! A trie over the preorder symbol string of stored patterns, with a
//! single wildcard standing for every variable.  Retrieval finds stored
//! patterns that may match onto (generalize) the query term: at a wildcard
//! edge the walk skips one whole query subterm.  Distinct variables
//! collapse to the same wildcard, so hits must be confirmed with real
//! matching — the tree only prunes.  Used for demodulators and the unit
//! literal index.

use std::collections::HashMap;

use crate::symbols::SymbolId;
use crate::term::Term;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum Key {
    Sym(SymbolId),
    Star,
}

fn flatten(t: &Term, out: &mut Vec<Key>) {
    match t {
        Term::Variable(_) => out.push(Key::Star),
        Term::Application { symbol, args } => {
            out.push(Key::Sym(*symbol));
            for a in args {
                flatten(a, out);
            }
        }
    }
}

#[derive(Clone)]
struct DNode<T> {
    children: HashMap<Key, DNode<T>>,
    entries: Vec<(Term, T)>,
}

impl<T> DNode<T> {
    fn new() -> DNode<T> {
        DNode {
            children: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct DiscrimTree<T> {
    root: DNode<T>,
    len: usize,
}

impl<T: PartialEq + Clone> Default for DiscrimTree<T> {
    fn default() -> Self {
        DiscrimTree::new()
    }
}

impl<T: PartialEq + Clone> DiscrimTree<T> {
    pub fn new() -> DiscrimTree<T> {
        DiscrimTree {
            root: DNode::new(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, pattern: Term, value: T) {
        let mut keys = Vec::new();
        flatten(&pattern, &mut keys);
        let mut node = &mut self.root;
        for k in keys {
            node = node.children.entry(k).or_insert_with(DNode::new);
        }
        node.entries.push((pattern, value));
        self.len += 1;
    }

    pub fn remove(&mut self, pattern: &Term, value: &T) -> bool {
        let mut keys = Vec::new();
        flatten(pattern, &mut keys);
        let mut node = &mut self.root;
        for k in keys {
            match node.children.get_mut(&k) {
                Some(n) => node = n,
                None => return false,
            }
        }
        match node
            .entries
            .iter()
            .position(|(p, v)| p == pattern && v == value)
        {
            Some(i) => {
                node.entries.remove(i);
                self.len -= 1;
                true
            }
            None => false,
        }
    }

    /// Stored patterns that may generalize the query.
    pub fn generalizations(&self, query: &Term) -> Vec<(&Term, &T)> {
        let mut out = Vec::new();
        walk(&self.root, &mut vec![query], &mut out);
        out
    }
}

fn walk<'a, T>(
    node: &'a DNode<T>,
    stack: &mut Vec<&Term>,
    out: &mut Vec<(&'a Term, &'a T)>,
) {
    let q = match stack.pop() {
        None => {
            out.extend(node.entries.iter().map(|(p, v)| (p, v)));
            return;
        }
        Some(q) => q,
    };
    if let Some(child) = node.children.get(&Key::Star) {
        // wildcard consumes the whole subterm
        walk(child, stack, out);
    }
    if let Term::Application { symbol, args } = q {
        if let Some(child) = node.children.get(&Key::Sym(*symbol)) {
            for a in args.iter().rev() {
                stack.push(a);
            }
            walk(child, stack, out);
            for _ in args {
                stack.pop();
            }
        }
    }
    stack.push(q);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols;
    use crate::unify::{match_terms, Bindings};
    use serial_test::serial;

    fn t(s: &str) -> Term {
        s.parse().unwrap()
    }

    #[test]
    #[serial]
    fn finds_generalizations_only() {
        symbols::reset_table();
        let mut tree: DiscrimTree<u32> = DiscrimTree::new();
        tree.insert(t("f(x,b)"), 1);
        tree.insert(t("f(a,b)"), 2);
        tree.insert(t("f(b,b)"), 3);
        tree.insert(t("g(x)"), 4);

        let mut hits: Vec<u32> = tree
            .generalizations(&t("f(a,b)"))
            .iter()
            .map(|(_, v)| **v)
            .collect();
        hits.sort_unstable();
        assert_eq!(hits, vec![1, 2]);

        assert!(tree.generalizations(&t("h(a)")).is_empty());
    }

    #[test]
    #[serial]
    fn nonlinear_patterns_need_confirmation() {
        symbols::reset_table();
        let mut tree: DiscrimTree<u32> = DiscrimTree::new();
        tree.insert(t("f(x,x)"), 1);
        // the tree cannot distinguish f(x,x) from f(x,y), so this hit
        // must be rejected by the matcher
        let query = t("f(a,b)");
        let hits = tree.generalizations(&query);
        assert_eq!(hits.len(), 1);
        let mut b = Bindings::new();
        assert!(!match_terms(hits[0].0, &query, &mut b));
    }

    #[test]
    #[serial]
    fn insert_remove_round_trip() {
        symbols::reset_table();
        let mut tree: DiscrimTree<u32> = DiscrimTree::new();
        tree.insert(t("f(x,g(y))"), 9);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.generalizations(&t("f(a,g(b))")).len(), 1);
        assert!(tree.remove(&t("f(x,g(y))"), &9));
        assert!(tree.is_empty());
        assert!(tree.generalizations(&t("f(a,g(b))")).is_empty());
    }

    #[test]
    #[serial]
    fn wildcard_skips_whole_subterms() {
        symbols::reset_table();
        let mut tree: DiscrimTree<u32> = DiscrimTree::new();
        tree.insert(t("f(x,b)"), 1);
        // x must swallow g(g(a)) entirely
        let hits = tree.generalizations(&t("f(g(g(a)),b)"));
        assert_eq!(hits.len(), 1);
        let mut b = Bindings::new();
        assert!(match_terms(hits[0].0, &t("f(g(g(a)),b)"), &mut b));
    }
}
