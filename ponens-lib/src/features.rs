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

//! Clause feature vectors and the feature-vector tree.
//!
//! The vector of a clause counts positive and negative literals, then per
//! featured symbol the positive/negative occurrences, and for function
//! symbols the maximal positive/negative depth.  Subsumption can only hold
//! from a clause whose vector is pointwise ≤ the candidate's, which makes
//! the tree a cheap pre-filter for non-unit subsumption both ways.
//! Symbols interned after the tree was set up are ignored: discrimination
//! drops a little, no answers are lost.

use std::collections::BTreeMap;

use crate::clause::Literal;
use crate::symbols::{self, SymbolId, SymbolKind};
use crate::term::Term;

/// The featured symbols, frozen when the search starts.
#[derive(Clone, Debug, Default)]
pub struct FeatureSpec {
    symbols: Vec<(SymbolId, bool)>, // (id, is_function)
}

impl FeatureSpec {
    /// Feature every predicate and function symbol known right now,
    /// relation symbols first.
    pub fn from_symbol_table() -> FeatureSpec {
        let mut syms = Vec::new();
        for id in 0..symbols::count() {
            if symbols::kind(id) == SymbolKind::Predicate {
                syms.push((id, false));
            }
        }
        for id in 0..symbols::count() {
            if symbols::kind(id) == SymbolKind::Function {
                syms.push((id, true));
            }
        }
        FeatureSpec { symbols: syms }
    }

    pub fn vector_length(&self) -> usize {
        2 + self
            .symbols
            .iter()
            .map(|(_, f)| if *f { 4 } else { 2 })
            .sum::<usize>()
    }

    /// Build the feature vector of a literal list.
    pub fn features(&self, lits: &[Literal]) -> Vec<i32> {
        let n = symbols::count();
        let mut pos_occ = vec![0i32; n];
        let mut neg_occ = vec![0i32; n];
        let mut pos_depth = vec![0i32; n];
        let mut neg_depth = vec![0i32; n];

        fn fill(
            t: &Term,
            sign: bool,
            depth: i32,
            pos_occ: &mut [i32],
            neg_occ: &mut [i32],
            pos_depth: &mut [i32],
            neg_depth: &mut [i32],
        ) {
            if let Term::Application { symbol, args } = t {
                if *symbol < pos_occ.len() {
                    if sign {
                        pos_occ[*symbol] += 1;
                        pos_depth[*symbol] = pos_depth[*symbol].max(depth);
                    } else {
                        neg_occ[*symbol] += 1;
                        neg_depth[*symbol] = neg_depth[*symbol].max(depth);
                    }
                }
                for a in args {
                    fill(a, sign, depth + 1, pos_occ, neg_occ, pos_depth, neg_depth);
                }
            }
        }

        for l in lits {
            fill(
                &l.atom,
                l.sign,
                0,
                &mut pos_occ,
                &mut neg_occ,
                &mut pos_depth,
                &mut neg_depth,
            );
        }

        let mut v = Vec::with_capacity(self.vector_length());
        v.push(lits.iter().filter(|l| l.sign).count() as i32);
        v.push(lits.iter().filter(|l| !l.sign).count() as i32);
        for (id, is_function) in &self.symbols {
            v.push(pos_occ[*id]);
            v.push(neg_occ[*id]);
            if *is_function {
                v.push(pos_depth[*id]);
                v.push(neg_depth[*id]);
            }
        }
        v
    }
}

/// True if `a` and `b` have the same length and `a` is pointwise ≤ `b`.
pub fn features_leq(a: &[i32], b: &[i32]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x <= y)
}

#[derive(Clone)]
struct FNode<T> {
    kids: BTreeMap<i32, FNode<T>>,
    data: Vec<T>,
}

impl<T> FNode<T> {
    fn new() -> FNode<T> {
        FNode {
            kids: BTreeMap::new(),
            data: Vec::new(),
        }
    }
}

/// Integer-vector discrimination tree keyed by feature vectors.
#[derive(Clone)]
pub struct FeatureTree<T> {
    root: FNode<T>,
    len: usize,
}

impl<T: PartialEq + Clone> Default for FeatureTree<T> {
    fn default() -> Self {
        FeatureTree::new()
    }
}

impl<T: PartialEq + Clone> FeatureTree<T> {
    pub fn new() -> FeatureTree<T> {
        FeatureTree {
            root: FNode::new(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, vec: &[i32], value: T) {
        let mut node = &mut self.root;
        for &x in vec {
            node = node.kids.entry(x).or_insert_with(FNode::new);
        }
        node.data.push(value);
        self.len += 1;
    }

    pub fn remove(&mut self, vec: &[i32], value: &T) -> bool {
        let mut node = &mut self.root;
        for &x in vec {
            match node.kids.get_mut(&x) {
                Some(n) => node = n,
                None => return false,
            }
        }
        match node.data.iter().position(|v| v == value) {
            Some(i) => {
                node.data.remove(i);
                self.len -= 1;
                true
            }
            None => false,
        }
    }

    /// Every stored value whose vector is pointwise ≤ the query
    /// (candidates for subsuming the query clause).
    pub fn retrieve_leq(&self, query: &[i32]) -> Vec<&T> {
        let mut out = Vec::new();
        fn go<'a, T>(node: &'a FNode<T>, query: &[i32], out: &mut Vec<&'a T>) {
            match query.split_first() {
                None => out.extend(node.data.iter()),
                Some((&q, rest)) => {
                    for (_, child) in node.kids.range(..=q) {
                        go(child, rest, out);
                    }
                }
            }
        }
        go(&self.root, query, &mut out);
        out
    }

    /// Every stored value whose vector is pointwise ≥ the query
    /// (candidates for being subsumed by the query clause).
    pub fn retrieve_geq(&self, query: &[i32]) -> Vec<&T> {
        let mut out = Vec::new();
        fn go<'a, T>(node: &'a FNode<T>, query: &[i32], out: &mut Vec<&'a T>) {
            match query.split_first() {
                None => out.extend(node.data.iter()),
                Some((&q, rest)) => {
                    for (_, child) in node.kids.range(q..) {
                        go(child, rest, out);
                    }
                }
            }
        }
        go(&self.root, query, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::Clause;
    use serial_test::serial;

    fn lits(s: &str) -> Vec<Literal> {
        s.parse::<Clause>().unwrap().literals
    }

    #[test]
    #[serial]
    fn vector_shape() {
        symbols::reset_table();
        let c = lits("p(f(a)) | -p(x).");
        let spec = FeatureSpec::from_symbol_table();
        let v = spec.features(&c);
        assert_eq!(v.len(), spec.vector_length());
        // one positive, one negative literal
        assert_eq!(v[0], 1);
        assert_eq!(v[1], 1);
        // recomputing gives the identical vector
        assert_eq!(v, spec.features(&c));
    }

    #[test]
    #[serial]
    fn subsumption_prefilter_is_sound() {
        symbols::reset_table();
        let a = lits("p(x).");
        let b = lits("p(f(a)) | q(x).");
        let spec = FeatureSpec::from_symbol_table();
        // p(x) subsumes the longer clause, so its vector must be leq
        assert!(features_leq(&spec.features(&a), &spec.features(&b)));
        assert!(!features_leq(&spec.features(&b), &spec.features(&a)));
    }

    #[test]
    #[serial]
    fn tree_retrieval_both_ways() {
        symbols::reset_table();
        let spec_clauses = ["p(x).", "p(f(a)) | q(x).", "q(a) | q(b)."];
        // intern everything before freezing the feature symbols
        let parsed: Vec<Vec<Literal>> = spec_clauses.iter().map(|s| lits(s)).collect();
        let spec = FeatureSpec::from_symbol_table();
        let mut tree: FeatureTree<usize> = FeatureTree::new();
        for (i, c) in parsed.iter().enumerate() {
            tree.insert(&spec.features(c), i);
        }
        assert_eq!(tree.len(), 3);

        let query = spec.features(&parsed[1]);
        let leq: Vec<usize> = tree.retrieve_leq(&query).into_iter().copied().collect();
        assert!(leq.contains(&0)); // p(x) can subsume it
        assert!(leq.contains(&1)); // itself
        assert!(!leq.contains(&2));

        let small = spec.features(&parsed[0]);
        let geq: Vec<usize> = tree.retrieve_geq(&small).into_iter().copied().collect();
        assert!(geq.contains(&1)); // the long clause may be subsumed by p(x)

        assert!(tree.remove(&query, &1));
        assert_eq!(tree.len(), 2);
    }
}
