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

//! Subsumption, unit conflict, and unit deletion.
//!
//! Units go through a discrimination tree; non-units are pre-filtered by
//! feature vectors and then checked with backtracking literal-wise
//! matching.  Subsumption only ever holds from a clause no longer than the
//! candidate, which keeps the stored-entry invariant "if A subsumes B then
//! |A| ≤ |B|" by construction.

use crate::clause::{Clause, ClauseId, Literal};
use crate::discrim::DiscrimTree;
use crate::error::FatalError;
use crate::features::{FeatureSpec, FeatureTree};
use crate::fpa::FpaIndex;
use crate::unify::{match_terms, unify, Bindings};

/// Does `a` subsume `b`: is there a substitution σ with aσ ⊆ b?
/// Backtracks over the literal assignment; σ binds only variables of `a`.
pub fn subsumes(a: &[Literal], b: &[Literal]) -> bool {
    if a.len() > b.len() {
        return false;
    }
    let mut bnd = Bindings::new();
    subsume_rec(a, 0, b, &mut bnd)
}

fn subsume_rec(a: &[Literal], i: usize, b: &[Literal], bnd: &mut Bindings) -> bool {
    if i == a.len() {
        return true;
    }
    for lb in b {
        if lb.sign != a[i].sign {
            continue;
        }
        let m = bnd.mark();
        if match_terms(&a[i].atom, &lb.atom, bnd) && subsume_rec(a, i + 1, b, bnd) {
            return true;
        }
        bnd.undo_to(m);
    }
    false
}

/// The literal index: every kept clause is registered here so unit
/// conflict, forward/back subsumption, and unit deletion can retrieve it.
#[derive(Clone)]
pub struct LiteralIndex {
    spec: FeatureSpec,
    pos_atoms: FpaIndex<(ClauseId, usize)>,
    neg_atoms: FpaIndex<(ClauseId, usize)>,
    pos_units: DiscrimTree<ClauseId>,
    neg_units: DiscrimTree<ClauseId>,
    nonunits: FeatureTree<ClauseId>,
}

impl LiteralIndex {
    pub fn new(spec: FeatureSpec) -> LiteralIndex {
        LiteralIndex {
            spec,
            pos_atoms: FpaIndex::new(),
            neg_atoms: FpaIndex::new(),
            pos_units: DiscrimTree::new(),
            neg_units: DiscrimTree::new(),
            nonunits: FeatureTree::new(),
        }
    }

    pub fn features_of(&self, lits: &[Literal]) -> Vec<i32> {
        self.spec.features(lits)
    }

    pub fn insert(&mut self, c: &Clause) {
        debug_assert_ne!(c.id, 0, "indexing a clause without an id");
        for (i, l) in c.literals.iter().enumerate() {
            if l.sign {
                self.pos_atoms.insert(l.atom.clone(), (c.id, i));
            } else {
                self.neg_atoms.insert(l.atom.clone(), (c.id, i));
            }
        }
        if c.is_unit() {
            let l = &c.literals[0];
            if l.sign {
                self.pos_units.insert(l.atom.clone(), c.id);
            } else {
                self.neg_units.insert(l.atom.clone(), c.id);
            }
        } else {
            self.nonunits.insert(&self.spec.features(&c.literals), c.id);
        }
    }

    pub fn remove(&mut self, c: &Clause) -> Result<(), FatalError> {
        let missing = |what: &str| {
            FatalError::IndexInvariant(format!("unindexing missing {} for clause {}", what, c.id))
        };
        for (i, l) in c.literals.iter().enumerate() {
            let ok = if l.sign {
                self.pos_atoms.remove(&l.atom, &(c.id, i))
            } else {
                self.neg_atoms.remove(&l.atom, &(c.id, i))
            };
            if !ok {
                return Err(missing("literal entry"));
            }
        }
        if c.is_unit() {
            let l = &c.literals[0];
            let ok = if l.sign {
                self.pos_units.remove(&l.atom, &c.id)
            } else {
                self.neg_units.remove(&l.atom, &c.id)
            };
            if !ok {
                return Err(missing("unit entry"));
            }
        } else if !self
            .nonunits
            .remove(&self.spec.features(&c.literals), &c.id)
        {
            return Err(missing("feature entry"));
        }
        Ok(())
    }

    /// The id of a stored clause subsuming `lits`, if any.  Units first —
    /// they subsume anything they generalize — then the feature-vector
    /// candidates.  `lookup` resolves ids to stored literal lists.
    pub fn forward_subsumer<'a, F>(&self, lits: &[Literal], lookup: F) -> Option<ClauseId>
    where
        F: Fn(ClauseId) -> &'a [Literal],
    {
        for l in lits {
            let tree = if l.sign { &self.pos_units } else { &self.neg_units };
            for (pattern, id) in tree.generalizations(&l.atom) {
                let mut b = Bindings::new();
                if match_terms(pattern, &l.atom, &mut b) {
                    return Some(*id);
                }
            }
        }
        let query = self.spec.features(lits);
        for id in self.nonunits.retrieve_leq(&query) {
            let stored = lookup(*id);
            if subsumes(stored, lits) {
                return Some(*id);
            }
        }
        None
    }

    /// Ids of stored clauses subsumed by `c`.
    pub fn back_subsumed<'a, F>(&self, c: &Clause, lookup: F) -> Vec<ClauseId>
    where
        F: Fn(ClauseId) -> &'a [Literal],
    {
        let mut out: Vec<ClauseId> = Vec::new();
        if c.is_unit() {
            let l = &c.literals[0];
            let fpa = if l.sign { &self.pos_atoms } else { &self.neg_atoms };
            for (_, (id, _)) in fpa.instances(&l.atom) {
                if *id != c.id && !out.contains(id) && subsumes(&c.literals, lookup(*id)) {
                    out.push(*id);
                }
            }
        } else {
            let query = self.spec.features(&c.literals);
            for id in self.nonunits.retrieve_geq(&query) {
                if *id != c.id && !out.contains(id) && subsumes(&c.literals, lookup(*id)) {
                    out.push(*id);
                }
            }
        }
        out.sort_unstable();
        out
    }

    /// Stored unit clauses whose literal is opposite in sign and
    /// unifiable with the single literal of `c`.
    pub fn unit_conflicts<'a, F>(&self, c: &Clause, lookup: F) -> Vec<ClauseId>
    where
        F: Fn(ClauseId) -> &'a [Literal],
    {
        let mut out = Vec::new();
        if !c.is_unit() {
            return out;
        }
        let l = &c.literals[0];
        let fpa = if l.sign { &self.neg_atoms } else { &self.pos_atoms };
        let offset = c.max_var().map(|v| v + 1).unwrap_or(0);
        for (_, (id, i)) in fpa.unifiable(&l.atom) {
            let stored = lookup(*id);
            if stored.len() != 1 || out.contains(id) {
                continue;
            }
            let atom = stored[*i].atom.shift_vars(offset);
            let mut b = Bindings::new();
            if unify(&l.atom, &atom, &mut b) {
                out.push(*id);
            }
        }
        out.sort_unstable();
        out
    }

    /// Remove literals of `c` generalized by an opposite-sign unit.
    /// Equality literals are also tried flipped.  Returns the deletions as
    /// (unit id, literal index at deletion time), already applied.
    pub fn unit_delete(&self, c: &mut Clause) -> Vec<(ClauseId, usize)> {
        let mut deleted = Vec::new();
        let mut i = 0;
        while i < c.literals.len() {
            if c.literals.len() == 1 {
                break; // never delete the last literal this way
            }
            let l = &c.literals[i];
            let tree = if l.sign { &self.neg_units } else { &self.pos_units };
            let mut hit: Option<ClauseId> = None;
            let mut atoms = vec![l.atom.clone()];
            if let Some(f) = l.flipped() {
                atoms.push(f.atom);
            }
            'outer: for atom in &atoms {
                for (pattern, id) in tree.generalizations(atom) {
                    let mut b = Bindings::new();
                    if match_terms(pattern, atom, &mut b) {
                        hit = Some(*id);
                        break 'outer;
                    }
                }
            }
            match hit {
                Some(id) => {
                    c.literals.remove(i);
                    deleted.push((id, i));
                }
                None => i += 1,
            }
        }
        deleted
    }

    /// Stored non-unit clauses with a literal that is an instance of the
    /// opposite sign of the unit's literal — candidates for back unit
    /// deletion.
    pub fn back_unit_deletable<'a, F>(&self, unit: &Clause, lookup: F) -> Vec<ClauseId>
    where
        F: Fn(ClauseId) -> &'a [Literal],
    {
        let mut out: Vec<ClauseId> = Vec::new();
        if !unit.is_unit() {
            return out;
        }
        let l = &unit.literals[0];
        let fpa = if l.sign { &self.neg_atoms } else { &self.pos_atoms };
        let mut atoms = vec![l.atom.clone()];
        if let Some(f) = l.flipped() {
            atoms.push(f.atom);
        }
        for atom in &atoms {
            for (_, (id, i)) in fpa.instances(atom) {
                if *id == unit.id || out.contains(id) {
                    continue;
                }
                let stored = lookup(*id);
                if stored.len() < 2 {
                    continue;
                }
                let mut b = Bindings::new();
                if match_terms(atom, &stored[*i].atom, &mut b) {
                    out.push(*id);
                }
            }
        }
        out.sort_unstable();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::Clause;
    use crate::symbols;
    use serial_test::serial;

    fn clause(s: &str) -> Clause {
        s.parse().unwrap()
    }

    fn index_with(clauses: &mut Vec<Clause>) -> LiteralIndex {
        let spec = FeatureSpec::from_symbol_table();
        let mut idx = LiteralIndex::new(spec);
        for (i, c) in clauses.iter_mut().enumerate() {
            c.id = (i + 1) as ClauseId;
            idx.insert(c);
        }
        idx
    }

    #[test]
    #[serial]
    fn subsumption_basics() {
        symbols::reset_table();
        let a = clause("p(x).");
        let b = clause("p(f(a)) | q(b).");
        assert!(subsumes(&a.literals, &b.literals));
        assert!(!subsumes(&b.literals, &a.literals));
        // sign matters
        let n = clause("-p(x).");
        assert!(!subsumes(&n.literals, &b.literals));
        // a non-unit never subsumes a strictly shorter clause
        let long = clause("p(x) | p(y).");
        let short = clause("p(a).");
        assert!(!subsumes(&long.literals, &short.literals));
    }

    #[test]
    #[serial]
    fn forward_subsumption_through_index() {
        symbols::reset_table();
        let mut stored = vec![clause("p(x)."), clause("q(x) | r(x).")];
        let idx = index_with(&mut stored);
        let lookup = |id: ClauseId| stored[(id - 1) as usize].literals.as_slice();

        // subsumed by the unit
        let c1 = clause("p(f(a)) | s(a).");
        assert_eq!(idx.forward_subsumer(&c1.literals, lookup), Some(1));
        // subsumed by the non-unit via features
        let c2 = clause("q(a) | r(a) | s(a).");
        assert_eq!(idx.forward_subsumer(&c2.literals, lookup), Some(2));
        // not subsumed
        let c3 = clause("s(a) | t(a).");
        assert_eq!(idx.forward_subsumer(&c3.literals, lookup), None);
    }

    #[test]
    #[serial]
    fn back_subsumption_through_index() {
        symbols::reset_table();
        let mut stored = vec![clause("p(f(a)) | q(a)."), clause("r(b).")];
        let idx = index_with(&mut stored);
        let lookup = |id: ClauseId| stored[(id - 1) as usize].literals.as_slice();

        let mut unit = clause("p(x).");
        unit.id = 99;
        assert_eq!(idx.back_subsumed(&unit, lookup), vec![1]);

        let mut nothing = clause("s(x).");
        nothing.id = 98;
        assert!(idx.back_subsumed(&nothing, lookup).is_empty());
    }

    #[test]
    #[serial]
    fn unit_conflict_detection() {
        symbols::reset_table();
        let mut stored = vec![clause("p(a)."), clause("q(a).")];
        let idx = index_with(&mut stored);
        let lookup = |id: ClauseId| stored[(id - 1) as usize].literals.as_slice();

        let mut denial = clause("-p(x).");
        denial.id = 50;
        assert_eq!(idx.unit_conflicts(&denial, lookup), vec![1]);
        let mut no_conflict = clause("-r(x).");
        no_conflict.id = 51;
        assert!(idx.unit_conflicts(&no_conflict, lookup).is_empty());
    }

    #[test]
    #[serial]
    fn unit_deletion_removes_literals() {
        symbols::reset_table();
        let mut stored = vec![clause("-q(x).")];
        let idx = index_with(&mut stored);
        let mut c = clause("p(a) | q(f(a)).");
        let deleted = idx.unit_delete(&mut c);
        assert_eq!(deleted, vec![(1, 1)]);
        assert_eq!(c.to_string(), "p(a).");
    }

    #[test]
    #[serial]
    fn unit_deletion_tries_flipped_equalities() {
        symbols::reset_table();
        let mut stored = vec![clause("a != x.")];
        let idx = index_with(&mut stored);
        // b = a only matches the unit after flipping
        let mut c = clause("p(a) | b = a.");
        let deleted = idx.unit_delete(&mut c);
        assert_eq!(deleted.len(), 1);
        assert_eq!(c.to_string(), "p(a).");
    }

    #[test]
    #[serial]
    fn back_unit_deletion_candidates() {
        symbols::reset_table();
        let mut stored = vec![clause("p(a) | q(f(b))."), clause("q(x).")];
        let idx = index_with(&mut stored);
        let lookup = |id: ClauseId| stored[(id - 1) as usize].literals.as_slice();
        let mut unit = clause("-q(y).");
        unit.id = 70;
        assert_eq!(idx.back_unit_deletable(&unit, lookup), vec![1]);
    }
}
