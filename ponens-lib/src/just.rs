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

//! Clause justifications.
//!
//! Every kept clause carries an ordered list of steps: the first is the
//! primary inference that produced it, the rest record simplification
//! applied afterwards.  Steps refer to parents by clause id, so the
//! transitive closure over a justification reconstructs the proof DAG
//! without holding references into the arena.

use std::fmt;

use itertools::Itertools;

use crate::clause::ClauseId;
use crate::term::Position;

#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    Input,
    Goal,
    /// Negation of a goal during input processing.
    Deny(ClauseId),
    Clausify(ClauseId),
    Copy(ClauseId),
    /// Equality of the parent flipped during orientation.
    Flip(ClauseId, usize),
    NewSymbol(ClauseId),
    BackDemod(ClauseId),
    BackUnitDel(ClauseId),
    /// (parent id, literal position) for each parent.
    BinaryRes(Vec<(ClauseId, usize)>),
    /// First entry is the nucleus, the rest are satellites with the
    /// clashed nucleus literal.
    HyperRes(Vec<(ClauseId, usize)>),
    UrRes(Vec<(ClauseId, usize)>),
    Factor(ClauseId, usize, usize),
    Paramod {
        from: ClauseId,
        /// literal index then path within the equality side used
        from_pos: Position,
        into: ClauseId,
        /// literal index then path to the replaced subterm
        into_pos: Position,
    },
    /// Rewrite steps: (demodulator id, position in target, position in
    /// demodulator).
    Demod(Vec<(ClauseId, Position, Position)>),
    UnitDel(ClauseId, usize),
    /// Duplicate literal merged away (index of removed literal).
    Merge(usize),
    /// Literal of the form t != t removed (index).
    Xx(usize),
}

impl Step {
    pub fn parents(&self) -> Vec<ClauseId> {
        match self {
            Step::Input | Step::Goal | Step::Merge(_) | Step::Xx(_) => vec![],
            Step::Deny(id)
            | Step::Clausify(id)
            | Step::Copy(id)
            | Step::Flip(id, _)
            | Step::NewSymbol(id)
            | Step::BackDemod(id)
            | Step::BackUnitDel(id)
            | Step::Factor(id, _, _)
            | Step::UnitDel(id, _) => vec![*id],
            Step::BinaryRes(ps) | Step::HyperRes(ps) | Step::UrRes(ps) => {
                ps.iter().map(|(id, _)| *id).collect()
            }
            Step::Paramod { from, into, .. } => vec![*from, *into],
            Step::Demod(steps) => steps.iter().map(|(id, _, _)| *id).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct Justification(pub Vec<Step>);

impl Justification {
    pub fn new(primary: Step) -> Justification {
        Justification(vec![primary])
    }

    pub fn push(&mut self, step: Step) {
        self.0.push(step);
    }

    pub fn primary(&self) -> Option<&Step> {
        self.0.first()
    }

    pub fn is_input(&self) -> bool {
        matches!(self.primary(), Some(Step::Input) | Some(Step::Goal))
    }

    pub fn has_copy(&self) -> bool {
        matches!(self.primary(), Some(Step::Copy(_)))
    }

    /// All distinct parent ids, nonzero only.
    pub fn parents(&self) -> Vec<ClauseId> {
        let mut out: Vec<ClauseId> = Vec::new();
        for step in &self.0 {
            for id in step.parents() {
                if id != 0 && !out.contains(&id) {
                    out.push(id);
                }
            }
        }
        out
    }
}

fn lit_letter(i: usize) -> String {
    // literal positions print as a, b, c, ...
    if i < 26 {
        ((b'a' + i as u8) as char).to_string()
    } else {
        format!("l{}", i)
    }
}

fn pos_string(p: &Position) -> String {
    let mut s = lit_letter(*p.first().unwrap_or(&0));
    for x in &p[1..] {
        s.push_str(&format!(",{}", x + 1));
    }
    s
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Input => write!(f, "assumption"),
            Step::Goal => write!(f, "goal"),
            Step::Deny(id) => write!(f, "deny({})", id),
            Step::Clausify(id) => write!(f, "clausify({})", id),
            Step::Copy(id) => write!(f, "copy({})", id),
            Step::Flip(id, i) => write!(f, "flip({},{})", id, lit_letter(*i)),
            Step::NewSymbol(id) => write!(f, "new_symbol({})", id),
            Step::BackDemod(id) => write!(f, "back_demod({})", id),
            Step::BackUnitDel(id) => write!(f, "back_unit_del({})", id),
            Step::BinaryRes(ps) => {
                let parts = ps
                    .iter()
                    .map(|(id, i)| format!("{},{}", id, lit_letter(*i)))
                    .join(",");
                write!(f, "resolve({})", parts)
            }
            Step::HyperRes(ps) => {
                let parts = ps
                    .iter()
                    .map(|(id, i)| format!("{},{}", id, lit_letter(*i)))
                    .join(",");
                write!(f, "hyper({})", parts)
            }
            Step::UrRes(ps) => {
                let parts = ps
                    .iter()
                    .map(|(id, i)| format!("{},{}", id, lit_letter(*i)))
                    .join(",");
                write!(f, "ur({})", parts)
            }
            Step::Factor(id, i, j) => {
                write!(f, "factor({},{},{})", id, lit_letter(*i), lit_letter(*j))
            }
            Step::Paramod {
                from,
                from_pos,
                into,
                into_pos,
            } => write!(
                f,
                "para({}({}),{}({}))",
                from,
                pos_string(from_pos),
                into,
                pos_string(into_pos)
            ),
            Step::Demod(steps) => {
                let parts = steps
                    .iter()
                    .map(|(id, tp, _)| format!("{}({})", id, pos_string(tp)))
                    .join(",");
                write!(f, "rewrite([{}])", parts)
            }
            Step::UnitDel(id, i) => write!(f, "unit_del({},{})", id, lit_letter(*i)),
            Step::Merge(i) => write!(f, "merge({})", lit_letter(*i)),
            Step::Xx(i) => write!(f, "xx({})", lit_letter(*i)),
        }
    }
}

impl fmt::Display for Justification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.iter().map(|s| s.to_string()).join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parents_are_deduplicated() {
        let mut j = Justification::new(Step::BinaryRes(vec![(3, 0), (5, 1)]));
        j.push(Step::Demod(vec![(3, vec![0], vec![0]), (7, vec![1], vec![0])]));
        assert_eq!(j.parents(), vec![3, 5, 7]);
    }

    #[test]
    fn unassigned_ids_are_skipped() {
        let j = Justification::new(Step::Copy(0));
        assert!(j.parents().is_empty());
    }

    #[test]
    fn display_format() {
        let j = Justification::new(Step::BinaryRes(vec![(3, 0), (5, 1)]));
        assert_eq!(j.to_string(), "[resolve(3,a,5,b)]");
        let p = Justification::new(Step::Paramod {
            from: 8,
            from_pos: vec![0, 0],
            into: 2,
            into_pos: vec![0, 1, 0],
        });
        assert_eq!(p.to_string(), "[para(8(a,1),2(a,2,1))]");
    }
}
