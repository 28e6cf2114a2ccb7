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

//! Clause weighing.
//!
//! The weight of a clause is the symbol-weighted size of its literals plus
//! the structural penalties, with user weight rules applied outermost
//! first: when a subterm matches a rule pattern, the rule value replaces
//! that subterm's computed weight entirely.

use crate::clause::Literal;
use crate::options::{Options, Parm};
use crate::symbols;
use crate::term::Term;
use crate::unify::{match_terms, Bindings};

/// A user rule `weight(pattern) = value`.
#[derive(Clone, Debug)]
pub struct WeightRule {
    pub pattern: Term,
    pub value: f64,
}

#[derive(Clone, Debug, Default)]
pub struct WeightRules {
    pub rules: Vec<WeightRule>,
}

impl WeightRules {
    fn matching(&self, t: &Term) -> Option<f64> {
        self.rules.iter().find_map(|r| {
            let mut b = Bindings::new();
            if match_terms(&r.pattern, t, &mut b) {
                Some(r.value)
            } else {
                None
            }
        })
    }
}

fn term_weight(t: &Term, rules: &WeightRules, opts: &Options, depth: i64) -> f64 {
    if let Some(w) = rules.matching(t) {
        return w;
    }
    let depth_part = (opts.parm(Parm::DepthPenalty) * depth) as f64;
    match t {
        Term::Variable(_) => opts.parm(Parm::VariableWeight) as f64 + depth_part,
        Term::Application { symbol, args } => {
            let base = if args.is_empty() {
                if symbols::is_skolem(*symbol) {
                    opts.parm(Parm::SkConstantWeight) as f64
                } else {
                    opts.parm(Parm::ConstantWeight) as f64
                }
            } else {
                1.0
            };
            let nest = if opts.parm(Parm::NestPenalty) != 0 {
                args.iter()
                    .filter(|a| a.symbol() == Some(*symbol))
                    .count() as f64
                    * opts.parm(Parm::NestPenalty) as f64
            } else {
                0.0
            };
            base + depth_part
                + nest
                + args
                    .iter()
                    .map(|a| term_weight(a, rules, opts, depth + 1))
                    .sum::<f64>()
        }
    }
}

fn atom_weight(l: &Literal, rules: &WeightRules, opts: &Options) -> f64 {
    // propositional atoms weigh a parm of their own
    if l.atom.args().is_empty() && rules.matching(&l.atom).is_none() {
        return opts.parm(Parm::PropAtomWeight) as f64;
    }
    term_weight(&l.atom, rules, opts, 0)
}

/// Weigh the literal list.  Does not apply hint adjustments; those happen
/// in the hints module after this base weight is known.
pub fn clause_weight(lits: &[Literal], rules: &WeightRules, opts: &Options) -> f64 {
    let mut w = 0.0;
    for l in lits {
        w += atom_weight(l, rules, opts);
        if !l.sign {
            w += opts.parm(Parm::NotWeight) as f64;
        }
    }
    if lits.len() > 1 {
        w += (lits.len() - 1) as f64 * opts.parm(Parm::OrWeight) as f64;
    }
    if opts.parm(Parm::VarPenalty) != 0 {
        let mut vars = std::collections::HashSet::new();
        for l in lits {
            l.atom.collect_variables(&mut vars);
        }
        w += vars.len() as f64 * opts.parm(Parm::VarPenalty) as f64;
    }
    w
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::Clause;
    use crate::options::Options;
    use serial_test::serial;

    fn lits(s: &str) -> Vec<Literal> {
        s.parse::<Clause>().unwrap().literals
    }

    #[test]
    #[serial]
    fn symbol_count_by_default() {
        symbols::reset_table();
        let opts = Options::new();
        let rules = WeightRules::default();
        // p(f(x,a)): p + f + x + a = 4
        assert_eq!(clause_weight(&lits("p(f(x,a))."), &rules, &opts), 4.0);
        // two literals, no or_weight by default
        assert_eq!(
            clause_weight(&lits("p(a) | q(a)."), &rules, &opts),
            4.0
        );
    }

    #[test]
    #[serial]
    fn user_rule_overrides_subterm() {
        symbols::reset_table();
        let opts = Options::new();
        let rules = WeightRules {
            rules: vec![WeightRule {
                pattern: "f(x,y)".parse().unwrap(),
                value: 0.0,
            }],
        };
        // the f-subterm counts 0 regardless of its size
        assert_eq!(clause_weight(&lits("p(f(g(a),g(b)))."), &rules, &opts), 1.0);
    }

    #[test]
    #[serial]
    fn penalties() {
        symbols::reset_table();
        let mut opts = Options::new();
        opts.assign_by_name("not_weight", "2").unwrap();
        opts.assign_by_name("or_weight", "3").unwrap();
        let rules = WeightRules::default();
        // p(a)=2, -q(a)=2(+2 not), or_weight 3
        assert_eq!(
            clause_weight(&lits("p(a) | -q(a)."), &rules, &opts),
            2.0 + 2.0 + 2.0 + 3.0
        );
    }

    #[test]
    #[serial]
    fn propositional_atom_weight() {
        symbols::reset_table();
        let mut opts = Options::new();
        opts.assign_by_name("prop_atom_weight", "5").unwrap();
        let rules = WeightRules::default();
        assert_eq!(clause_weight(&lits("p."), &rules, &opts), 5.0);
    }
}
