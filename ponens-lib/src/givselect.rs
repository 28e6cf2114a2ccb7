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

//! Given-clause selection.
//!
//! SOS is viewed through a set of selectors `part(name, priority, order,
//! property) = n`.  High-priority selectors are exhausted before low ones;
//! within a priority the selectors rotate, each taking `part` picks per
//! cycle.  Every selector keeps its own order-statistic tree, so the
//! SOS-limit policy can estimate how many selections a clause would wait
//! for, discard hopeless newcomers, and displace the worst clause on
//! overflow.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::avl::AvlTree;
use crate::clause::{Clause, ClauseId, Semantics};
use crate::options::{Flag, Options, Parm};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SelOrder {
    Weight,
    Age,
    Random,
}

impl SelOrder {
    pub fn from_name(s: &str) -> Option<SelOrder> {
        match s {
            "weight" => Some(SelOrder::Weight),
            "age" => Some(SelOrder::Age),
            "random" => Some(SelOrder::Random),
            _ => None,
        }
    }
}

/// Compiled clause property of a selector rule.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClauseProp {
    All,
    Initial,
    False,
    True,
    Hint,
}

impl ClauseProp {
    pub fn from_name(s: &str) -> Option<ClauseProp> {
        match s {
            "all" => Some(ClauseProp::All),
            "initial" => Some(ClauseProp::Initial),
            "false" => Some(ClauseProp::False),
            "true" => Some(ClauseProp::True),
            "hint" => Some(ClauseProp::Hint),
            _ => None,
        }
    }

    pub fn eval(self, c: &Clause) -> bool {
        match self {
            ClauseProp::All => true,
            ClauseProp::Initial => c.initial,
            ClauseProp::False => c.semantics == Semantics::False,
            ClauseProp::True => c.semantics == Semantics::True,
            ClauseProp::Hint => c.matching_hint.is_some(),
        }
    }

    /// Properties that require the semantics field to be evaluated.
    pub fn needs_semantics(self) -> bool {
        matches!(self, ClauseProp::False | ClauseProp::True)
    }
}

#[derive(Clone, Debug)]
pub struct SelectorRule {
    pub name: String,
    pub high: bool,
    pub order: SelOrder,
    pub prop: ClauseProp,
    pub part: u64,
}

/// The default selector set, synthesised from the ratio parms.
pub fn rules_from_options(opts: &Options) -> Vec<SelectorRule> {
    let mut rules = Vec::new();
    if opts.flag(Flag::InputSosFirst) {
        rules.push(SelectorRule {
            name: "I".to_string(),
            high: true,
            order: SelOrder::Age,
            prop: ClauseProp::Initial,
            part: u64::MAX,
        });
    }
    let hints_part = opts.parm(Parm::HintsPart);
    if hints_part == i64::MAX {
        rules.push(SelectorRule {
            name: "H".to_string(),
            high: true,
            order: SelOrder::Weight,
            prop: ClauseProp::Hint,
            part: 1,
        });
    } else if hints_part > 0 {
        rules.push(SelectorRule {
            name: "H".to_string(),
            high: false,
            order: SelOrder::Weight,
            prop: ClauseProp::Hint,
            part: hints_part as u64,
        });
    }
    for (name, parm, order, prop) in [
        ("A", Parm::AgePart, SelOrder::Age, ClauseProp::All),
        ("F", Parm::FalsePart, SelOrder::Weight, ClauseProp::False),
        ("T", Parm::TruePart, SelOrder::Weight, ClauseProp::True),
        ("W", Parm::WeightPart, SelOrder::Weight, ClauseProp::All),
        ("R", Parm::RandomPart, SelOrder::Random, ClauseProp::All),
    ] {
        let part = opts.parm(parm);
        if part > 0 {
            rules.push(SelectorRule {
                name: name.to_string(),
                high: false,
                order,
                prop,
                part: part as u64,
            });
        }
    }
    rules
}

/// Tree key: weight-major for weight order, id-major otherwise.
#[derive(Clone, Copy, Debug)]
struct Key {
    weight: f64,
    id: ClauseId,
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.weight.total_cmp(&other.weight).is_eq()
    }
}
impl Eq for Key {}
impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Key {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.weight
            .total_cmp(&other.weight)
            .then(self.id.cmp(&other.id))
    }
}

struct Selector {
    rule: SelectorRule,
    selected: u64,
    idx: AvlTree<Key>,
}

impl Selector {
    fn key_for(&self, c: &Clause) -> Key {
        match self.rule.order {
            SelOrder::Weight => Key {
                weight: c.weight,
                id: c.id,
            },
            SelOrder::Age | SelOrder::Random => Key {
                weight: 0.0,
                id: c.id,
            },
        }
    }
}

struct PriorityState {
    selectors: Vec<Selector>,
    current: usize,
    count: u64,
    occurrences: u64,
}

impl PriorityState {
    fn new(rules: Vec<SelectorRule>) -> PriorityState {
        PriorityState {
            selectors: rules
                .into_iter()
                .map(|rule| Selector {
                    rule,
                    selected: 0,
                    idx: AvlTree::new(),
                })
                .collect(),
            current: 0,
            count: 0,
            occurrences: 0,
        }
    }

    fn cycle_size(&self) -> u64 {
        self.selectors
            .iter()
            .filter(|s| !s.idx.is_empty())
            .map(|s| s.rule.part)
            .fold(0u64, |a, b| a.saturating_add(b))
    }

    /// Rotate to the next selector with clauses available, honouring the
    /// ratio counts.
    fn next_selector(&mut self) -> Option<usize> {
        if self.selectors.is_empty() {
            return None;
        }
        let start = self.current;
        loop {
            let sel = &self.selectors[self.current];
            if !sel.idx.is_empty() && self.count < sel.rule.part {
                self.count += 1;
                return Some(self.current);
            }
            self.current = (self.current + 1) % self.selectors.len();
            self.count = 0;
            if self.current == start {
                // full cycle: everything in between was empty
                let sel = &self.selectors[self.current];
                if sel.idx.is_empty() {
                    return None;
                }
                self.count = 1;
                return Some(self.current);
            }
        }
    }
}

pub struct GivSelect {
    high: PriorityState,
    low: PriorityState,
    sos_size: usize,
    rng: StdRng,
    pub needs_semantics: bool,
    pub sos_deleted: u32,
    pub sos_displaced: u32,
    low_water_keep: f64,
    low_water_displace: f64,
    unmatched_warned: bool,
}

impl GivSelect {
    pub fn new(rules: Vec<SelectorRule>, seed: u64) -> GivSelect {
        let needs_semantics = rules.iter().any(|r| r.prop.needs_semantics());
        let (high, low): (Vec<SelectorRule>, Vec<SelectorRule>) =
            rules.into_iter().partition(|r| r.high);
        GivSelect {
            high: PriorityState::new(high),
            low: PriorityState::new(low),
            sos_size: 0,
            rng: StdRng::seed_from_u64(seed),
            needs_semantics,
            sos_deleted: 0,
            sos_displaced: 0,
            low_water_keep: f64::MAX,
            low_water_displace: f64::MAX,
            unmatched_warned: false,
        }
    }

    pub fn sos_size(&self) -> usize {
        self.sos_size
    }

    pub fn available(&self) -> bool {
        self.high.occurrences > 0 || self.low.occurrences > 0
    }

    /// Register a clause entering SOS.  Returns false (once) when the
    /// clause matched no selector at all, so the caller can warn.
    pub fn insert(&mut self, c: &Clause) -> bool {
        self.sos_size += 1;
        let mut matched = false;
        for s in &mut self.high.selectors {
            if s.rule.prop.eval(c) {
                matched = true;
                s.idx.insert(s.key_for(c));
                self.high.occurrences += 1;
            }
        }
        // a high-priority clause is not also indexed low
        if !matched {
            for s in &mut self.low.selectors {
                if s.rule.prop.eval(c) {
                    matched = true;
                    s.idx.insert(s.key_for(c));
                    self.low.occurrences += 1;
                }
            }
        }
        if !matched && !self.unmatched_warned {
            self.unmatched_warned = true;
            return false;
        }
        true
    }

    pub fn remove(&mut self, c: &Clause) {
        self.sos_size -= 1;
        let mut matched = false;
        for s in &mut self.high.selectors {
            if s.rule.prop.eval(c) && s.idx.remove(&s.key_for(c)) {
                matched = true;
                self.high.occurrences -= 1;
            }
        }
        if !matched {
            for s in &mut self.low.selectors {
                if s.rule.prop.eval(c) && s.idx.remove(&s.key_for(c)) {
                    self.low.occurrences -= 1;
                }
            }
        }
    }

    /// Pick the next given clause: id plus the selector name.
    pub fn next_given(&mut self) -> Option<(ClauseId, String)> {
        let (state, i) = match self.high.next_selector() {
            Some(i) => (&mut self.high, i),
            None => {
                let i = self.low.next_selector()?;
                (&mut self.low, i)
            }
        };
        let sel = &mut state.selectors[i];
        let key = match sel.rule.order {
            SelOrder::Random => {
                let n = sel.idx.len();
                let pick = self.rng.gen_range(0..n) + 1;
                *sel.idx.nth(pick)?
            }
            _ => *sel.idx.smallest()?,
        };
        sel.selected += 1;
        Some((key.id, sel.rule.name.clone()))
    }

    fn iterations_to_selection(
        part: u64,
        n: usize,
        cycle_size: u64,
        occurrences: u64,
        sos_size: usize,
    ) -> f64 {
        // approximates the number of given-selections until the n-th
        // clause of the selector is picked
        if occurrences == 0 || sos_size == 0 || part == 0 {
            return f64::MAX;
        }
        let x = n as f64 * (cycle_size as f64 / part as f64);
        x / (occurrences as f64 / sos_size as f64)
    }

    fn least_iters(&self, c: &Clause, ignore: Option<usize>) -> f64 {
        let state = &self.low;
        let mut least = f64::MAX;
        for (j, s) in state.selectors.iter().enumerate() {
            if Some(j) == ignore || !s.rule.prop.eval(c) {
                continue;
            }
            let n = if s.rule.order == SelOrder::Age && c.id == 0 {
                s.idx.len() + 1
            } else {
                s.idx.position(&s.key_for(c))
            };
            let x = Self::iterations_to_selection(
                s.rule.part,
                n,
                state.cycle_size(),
                state.occurrences,
                self.sos_size,
            );
            least = least.min(x);
        }
        least
    }

    /// The soft SOS-limit keep test: discard clauses that would not be
    /// selected for a long time anyway.  Returns (keep, low-water mark to
    /// report).
    pub fn sos_keep(&mut self, c: &Clause, opts: &Options) -> (bool, Option<f64>) {
        let keep_factor = opts.parm(Parm::SosKeepFactor).max(1);
        let sos_limit = match opts.parm(Parm::SosLimit) {
            -1 => return (true, None),
            n => n,
        };
        if (self.sos_size as i64) < sos_limit / keep_factor {
            return (true, None);
        }
        let iters = self.least_iters(c, None);
        if iters < (sos_limit / keep_factor) as f64 {
            (true, None)
        } else {
            self.sos_deleted += 1;
            let mark = if c.weight < self.low_water_keep {
                self.low_water_keep = c.weight;
                Some(c.weight)
            } else {
                None
            };
            (false, mark)
        }
    }

    /// The clause to evict when SOS overflows: the one with the most
    /// iterations to selection among low-priority selectors.  Hint
    /// matchers are never displaced.
    pub fn worst_clause<F>(&self, is_hint_matcher: F) -> Option<ClauseId>
    where
        F: Fn(ClauseId) -> bool,
    {
        let state = &self.low;
        let mut worst: Option<ClauseId> = None;
        let mut max = 0.0f64;
        for s in &state.selectors {
            if s.rule.prop == ClauseProp::Hint {
                continue;
            }
            // walk back from the end past any hint matchers
            let mut n = s.idx.len();
            let key = loop {
                if n == 0 {
                    break None;
                }
                let k = *s.idx.nth(n).expect("rank within tree size");
                if is_hint_matcher(k.id) {
                    n -= 1;
                } else {
                    break Some(k);
                }
            };
            let key = match key {
                Some(k) => k,
                None => continue,
            };
            let x = Self::iterations_to_selection(
                s.rule.part,
                n,
                state.cycle_size(),
                state.occurrences,
                self.sos_size,
            );
            if x > max {
                max = x;
                worst = Some(key.id);
            }
        }
        worst
    }

    pub fn note_displaced(&mut self, weight: f64) -> Option<f64> {
        self.sos_displaced += 1;
        if weight < self.low_water_displace {
            self.low_water_displace = weight;
            Some(weight)
        } else {
            None
        }
    }

    /// One row per selector: (name, part, priority, order, size, selected).
    pub fn report(&self) -> Vec<(String, u64, &'static str, &'static str, usize, u64)> {
        let mut rows = Vec::new();
        for (state, pri) in [(&self.high, "high"), (&self.low, "low")] {
            for s in &state.selectors {
                let order = match s.rule.order {
                    SelOrder::Weight => "weight",
                    SelOrder::Age => "age",
                    SelOrder::Random => "random",
                };
                rows.push((
                    s.rule.name.clone(),
                    s.rule.part,
                    pri,
                    order,
                    s.idx.len(),
                    s.selected,
                ));
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::Clause;
    use crate::symbols;
    use serial_test::serial;

    fn clause_with(id: ClauseId, weight: f64, s: &str) -> Clause {
        let mut c: Clause = s.parse().unwrap();
        c.id = id;
        c.weight = weight;
        c
    }

    fn age_weight_rules() -> Vec<SelectorRule> {
        vec![
            SelectorRule {
                name: "A".to_string(),
                high: false,
                order: SelOrder::Age,
                prop: ClauseProp::All,
                part: 1,
            },
            SelectorRule {
                name: "W".to_string(),
                high: false,
                order: SelOrder::Weight,
                prop: ClauseProp::All,
                part: 2,
            },
        ]
    }

    #[test]
    #[serial]
    fn ratio_rotation() {
        symbols::reset_table();
        let mut sel = GivSelect::new(age_weight_rules(), 0);
        // old heavy clause, young light clause
        for (id, w) in [(1, 9.0), (2, 1.0), (3, 5.0)] {
            sel.insert(&clause_with(id, w, "p(a)."));
        }
        // A takes 1 (oldest: id 1), then W takes 2 (lightest: 2, then 3)
        let picks: Vec<(ClauseId, String)> = (0..3)
            .map(|_| {
                let (id, name) = sel.next_given().unwrap();
                let c = clause_with(id, [0.0, 9.0, 1.0, 5.0][id as usize], "p(a).");
                sel.remove(&c);
                (id, name)
            })
            .collect();
        assert_eq!(picks[0], (1, "A".to_string()));
        assert_eq!(picks[1], (2, "W".to_string()));
        assert_eq!(picks[2], (3, "W".to_string()));
        assert!(!sel.available());
    }

    #[test]
    #[serial]
    fn high_priority_exhausted_first() {
        symbols::reset_table();
        let mut rules = age_weight_rules();
        rules.push(SelectorRule {
            name: "I".to_string(),
            high: true,
            order: SelOrder::Age,
            prop: ClauseProp::Initial,
            part: u64::MAX,
        });
        let mut sel = GivSelect::new(rules, 0);
        let mut init = clause_with(7, 100.0, "p(a).");
        init.initial = true;
        sel.insert(&init);
        sel.insert(&clause_with(1, 1.0, "p(a)."));
        let (id, name) = sel.next_given().unwrap();
        assert_eq!((id, name.as_str()), (7, "I"));
        sel.remove(&init);
        let (id, _) = sel.next_given().unwrap();
        assert_eq!(id, 1);
    }

    #[test]
    #[serial]
    fn default_rules_follow_ratio_parms() {
        symbols::reset_table();
        let opts = Options::new();
        let rules = rules_from_options(&opts);
        // I (input_sos_first), H (hints_part = INF), A:1, F:4, T:4
        let names: Vec<&str> = rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["I", "H", "A", "F", "T"]);
        let a = rules.iter().find(|r| r.name == "A").unwrap();
        let f = rules.iter().find(|r| r.name == "F").unwrap();
        let t = rules.iter().find(|r| r.name == "T").unwrap();
        assert_eq!((a.part, f.part, t.part), (1, 4, 4));
    }

    #[test]
    #[serial]
    fn worst_clause_skips_hint_matchers() {
        symbols::reset_table();
        let mut sel = GivSelect::new(age_weight_rules(), 0);
        let heavy = clause_with(1, 50.0, "p(a).");
        let mut hinted = clause_with(2, 90.0, "p(b).");
        hinted.matching_hint = Some(0);
        sel.insert(&heavy);
        sel.insert(&hinted);
        let worst = sel.worst_clause(|id| id == 2);
        assert_eq!(worst, Some(1));
    }

    #[test]
    #[serial]
    fn sos_keep_discards_hopeless_clauses() {
        symbols::reset_table();
        let mut opts = Options::new();
        opts.assign_by_name("sos_limit", "6").unwrap();
        opts.assign_by_name("sos_keep_factor", "2").unwrap();
        let mut sel = GivSelect::new(
            vec![SelectorRule {
                name: "W".to_string(),
                high: false,
                order: SelOrder::Weight,
                prop: ClauseProp::All,
                part: 1,
            }],
            0,
        );
        for id in 1..=5 {
            sel.insert(&clause_with(id, id as f64, "p(a)."));
        }
        // a light clause lands near the front: keep
        let light = clause_with(0, 0.5, "p(a).");
        assert!(sel.sos_keep(&light, &opts).0);
        // a very heavy clause would wait forever: discard
        let heavy = clause_with(0, 99.0, "p(a).");
        assert!(!sel.sos_keep(&heavy, &opts).0);
        assert_eq!(sel.sos_deleted, 1);
    }
}
