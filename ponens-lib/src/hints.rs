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

//! Hints: user-supplied clauses that steer the search.
//!
//! A generated clause matches a hint when it subsumes it.  Matching
//! clauses get the hint's `bsub_hint_wt` as their weight (when present),
//! are flagged so the `hint` selector picks them up, and are exempt from
//! SOS displacement.  With `degrade_hints`, every further matcher of the
//! same hint weighs a little more than the one before.

use crate::clause::Clause;
use crate::demod::{demodulate_clause, DemodIndex};
use crate::features::{FeatureSpec, FeatureTree};
use crate::options::{Flag, Options};
use crate::order::TermOrder;
use crate::subsume::subsumes;

pub struct HintEntry {
    pub clause: Clause,
    pub wt: Option<f64>,
    /// How many kept clauses have matched this hint.
    pub matched: u32,
}

pub struct HintsIndex {
    spec: FeatureSpec,
    entries: Vec<HintEntry>,
    tree: FeatureTree<usize>,
}

impl HintsIndex {
    pub fn new(spec: FeatureSpec, hints: Vec<Clause>) -> HintsIndex {
        let mut idx = HintsIndex {
            spec,
            entries: Vec::new(),
            tree: FeatureTree::new(),
        };
        for h in hints {
            idx.push_entry(h);
        }
        idx
    }

    fn push_entry(&mut self, h: Clause) {
        let i = self.entries.len();
        self.tree.insert(&self.spec.features(&h.literals), i);
        let wt = h.bsub_hint_wt();
        self.entries.push(HintEntry {
            clause: h,
            wt,
            matched: 0,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, i: usize) -> &HintEntry {
        &self.entries[i]
    }

    /// Find the first hint this clause subsumes, if any.
    pub fn find_match(&self, c: &Clause) -> Option<usize> {
        let query = self.spec.features(&c.literals);
        let mut hits: Vec<usize> = self
            .tree
            .retrieve_geq(&query)
            .into_iter()
            .copied()
            .collect();
        hits.sort_unstable();
        hits.into_iter()
            .find(|&i| subsumes(&c.literals, &self.entries[i].clause.literals))
    }

    /// Adjust the weight of a freshly weighed clause; marks the clause if
    /// it matches a hint.
    pub fn adjust_weight(&self, c: &mut Clause, opts: &Options) {
        if let Some(i) = self.find_match(c) {
            c.matching_hint = Some(i);
            let e = &self.entries[i];
            if let Some(w) = e.wt {
                c.weight = w;
            }
            if opts.flag(Flag::BreadthFirstHints) {
                c.weight = 0.0;
            }
            if opts.flag(Flag::DegradeHints) {
                c.weight += e.matched as f64;
            }
        }
    }

    /// A matcher of hint `i` was kept; later matchers degrade.
    pub fn keep_matcher(&mut self, i: usize) {
        self.entries[i].matched += 1;
    }

    /// Rewrite the hints with a new demodulator set so matching keeps
    /// working against normal forms (back_demod_hints).
    pub fn back_demodulate(&mut self, demods: &DemodIndex, opts: &Options, ord: TermOrder) {
        for i in 0..self.entries.len() {
            let mut c = self.entries[i].clause.clone();
            let before = c.literals.clone();
            demodulate_clause(&mut c, demods, opts, ord);
            if c.literals != before {
                self.tree.remove(&self.spec.features(&before), &i);
                self.tree.insert(&self.spec.features(&c.literals), i);
                self.entries[i].clause = c;
            }
        }
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

    fn build(hints: &[&str]) -> HintsIndex {
        let parsed: Vec<Clause> = hints.iter().map(|s| s.parse().unwrap()).collect();
        let spec = FeatureSpec::from_symbol_table();
        HintsIndex::new(spec, parsed)
    }

    #[test]
    #[serial]
    fn matching_is_subsumption_of_the_hint() {
        symbols::reset_table();
        let idx = build(&["p(f(a)) | q(a)."]);
        let c = clause("p(x).");
        assert_eq!(idx.find_match(&c), Some(0));
        let d = clause("r(x).");
        assert_eq!(idx.find_match(&d), None);
    }

    #[test]
    #[serial]
    fn weight_adjustment_and_degrade() {
        symbols::reset_table();
        let mut idx = build(&["p(f(a)) # bsub_hint_wt(2.5)."]);
        let mut opts = Options::new();
        opts.change_flag("degrade_hints", true).unwrap();

        let mut c = clause("p(x).");
        c.weight = 10.0;
        idx.adjust_weight(&mut c, &opts);
        assert_eq!(c.matching_hint, Some(0));
        assert_eq!(c.weight, 2.5);

        idx.keep_matcher(0);
        let mut d = clause("p(x).");
        d.weight = 10.0;
        idx.adjust_weight(&mut d, &opts);
        // the second matcher degrades
        assert_eq!(d.weight, 3.5);
    }

    #[test]
    #[serial]
    fn no_adjustment_without_match() {
        symbols::reset_table();
        let idx = build(&["p(f(a))."]);
        let mut c = clause("q(x).");
        c.weight = 7.0;
        idx.adjust_weight(&mut c, &Options::new());
        assert_eq!(c.weight, 7.0);
        assert_eq!(c.matching_hint, None);
    }
}
