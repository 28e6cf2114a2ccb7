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

//! Action rules: `given = N -> <operation>` and friends.
//!
//! Rules are parsed once into a tagged form and fire when the watched
//! statistic reaches the trigger value.  Only whitelisted options may be
//! changed mid-run; anything else is refused at parse time.  Clauses can
//! also carry `action2` attributes, which run when the clause lands in a
//! printed proof.

use crate::clause::Clause;
use crate::symbols;
use crate::term::Term;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Watched {
    Given,
    Generated,
    Kept,
    Level,
}

impl Watched {
    pub fn from_name(s: &str) -> Option<Watched> {
        match s {
            "given" => Some(Watched::Given),
            "generated" => Some(Watched::Generated),
            "kept" => Some(Watched::Kept),
            "level" => Some(Watched::Level),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ActionOp {
    SetFlag(String),
    ClearFlag(String),
    Assign(String, String),
    Assert(Clause),
    Exit,
}

#[derive(Clone, Debug)]
pub struct ActionRule {
    pub watched: Watched,
    pub trigger: i64,
    pub op: ActionOp,
    fired: bool,
}

impl ActionRule {
    pub fn new(watched: Watched, trigger: i64, op: ActionOp) -> ActionRule {
        ActionRule {
            watched,
            trigger,
            op,
            fired: false,
        }
    }
}

/// Flags that actions may flip mid-run.
const CHANGEABLE_FLAGS: &[&str] = &[
    "print_gen",
    "print_kept",
    "print_given",
    "back_subsume",
    "unit_deletion",
    "factor",
];

/// Parms (and floatparms) that actions may reassign mid-run.
const CHANGEABLE_PARMS: &[&str] = &[
    "demod_step_limit",
    "new_constants",
    "para_lit_limit",
    "max_given",
    "max_kept",
    "max_weight",
    "max_depth",
    "max_vars",
    "max_proofs",
    "max_literals",
    "max_seconds",
    "sos_limit",
];

pub fn changeable_flag(name: &str) -> bool {
    CHANGEABLE_FLAGS.contains(&name)
}

pub fn changeable_parm(name: &str) -> bool {
    CHANGEABLE_PARMS.contains(&name)
}

/// Is this operation allowed in an action rule?
pub fn op_allowed(op: &ActionOp) -> bool {
    match op {
        ActionOp::SetFlag(n) | ActionOp::ClearFlag(n) => changeable_flag(n),
        ActionOp::Assign(n, _) => changeable_parm(n),
        ActionOp::Assert(_) | ActionOp::Exit => true,
    }
}

#[derive(Default)]
pub struct Actions {
    rules: Vec<ActionRule>,
}

impl Actions {
    pub fn new(rules: Vec<ActionRule>) -> Actions {
        Actions { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Operations of every rule watching `stat` whose trigger equals `n`.
    /// Each rule fires at most once.
    pub fn fire(&mut self, stat: Watched, n: i64) -> Vec<ActionOp> {
        let mut ops = Vec::new();
        for r in &mut self.rules {
            if !r.fired && r.watched == stat && r.trigger == n {
                r.fired = true;
                ops.push(r.op.clone());
            }
        }
        ops
    }
}

/// Interpret an `action2` attribute term as an operation:
/// set(flag), clear(flag), assign(parm, value), exit.
pub fn op_from_term(t: &Term) -> Option<ActionOp> {
    let sym = t.symbol()?;
    let name = symbols::name(sym);
    let arg_name = |i: usize| -> Option<String> {
        t.args().get(i).and_then(|a| a.symbol()).map(symbols::name)
    };
    match (name.as_str(), t.args().len()) {
        ("exit", 0) => Some(ActionOp::Exit),
        ("set", 1) => Some(ActionOp::SetFlag(arg_name(0)?)),
        ("clear", 1) => Some(ActionOp::ClearFlag(arg_name(0)?)),
        ("assign", 2) => Some(ActionOp::Assign(arg_name(0)?, arg_name(1)?)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn rules_fire_once_at_the_trigger() {
        let mut acts = Actions::new(vec![
            ActionRule::new(
                Watched::Given,
                3,
                ActionOp::Assign("max_weight".to_string(), "25".to_string()),
            ),
            ActionRule::new(Watched::Kept, 10, ActionOp::Exit),
        ]);
        assert!(acts.fire(Watched::Given, 2).is_empty());
        let ops = acts.fire(Watched::Given, 3);
        assert_eq!(ops.len(), 1);
        // the same rule does not fire again
        assert!(acts.fire(Watched::Given, 3).is_empty());
        assert_eq!(acts.fire(Watched::Kept, 10), vec![ActionOp::Exit]);
    }

    #[test]
    fn whitelist_is_enforced() {
        assert!(op_allowed(&ActionOp::SetFlag("print_kept".to_string())));
        assert!(!op_allowed(&ActionOp::SetFlag("paramodulation".to_string())));
        assert!(op_allowed(&ActionOp::Assign(
            "max_weight".to_string(),
            "10".to_string()
        )));
        assert!(!op_allowed(&ActionOp::Assign(
            "sos_keep_factor".to_string(),
            "5".to_string()
        )));
        assert!(op_allowed(&ActionOp::Exit));
    }

    #[test]
    #[serial]
    fn action2_terms_parse() {
        crate::symbols::reset_table();
        let t: Term = "exit".parse().unwrap();
        assert_eq!(op_from_term(&t), Some(ActionOp::Exit));
        let t: Term = "set(print_kept)".parse().unwrap();
        assert_eq!(
            op_from_term(&t),
            Some(ActionOp::SetFlag("print_kept".to_string()))
        );
        let t: Term = "assign(max_given, 100)".parse().unwrap();
        assert_eq!(
            op_from_term(&t),
            Some(ActionOp::Assign("max_given".to_string(), "100".to_string()))
        );
    }
}
