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

//! Proof extraction and printing.
//!
//! A proof is the ancestry of an empty clause: the transitive closure of
//! the justification parents, listed in id order.  Ids are preserved in
//! the printed block so a parent process can re-link clauses after a
//! forked search.

use std::collections::{HashMap, HashSet};

use colored::Colorize;

use crate::clause::{ClauseArena, ClauseId};

/// The transitive justification ancestry of `id`, itself included,
/// in ascending id order.
pub fn ancestors(arena: &ClauseArena, id: ClauseId) -> Vec<ClauseId> {
    let mut seen: HashSet<ClauseId> = HashSet::new();
    let mut stack = vec![id];
    while let Some(x) = stack.pop() {
        if !seen.insert(x) {
            continue;
        }
        if let Some(c) = arena.try_get(x) {
            for p in c.justification.parents() {
                if !seen.contains(&p) {
                    stack.push(p);
                }
            }
        }
    }
    let mut out: Vec<ClauseId> = seen.into_iter().collect();
    out.sort_unstable();
    out
}

/// Derivation depth of each proof clause: input clauses are level 0, every
/// other clause is one more than its deepest parent.
pub fn levels(arena: &ClauseArena, proof: &[ClauseId]) -> HashMap<ClauseId, u32> {
    let mut levels: HashMap<ClauseId, u32> = HashMap::new();
    for &id in proof {
        // proof is in id order and parents have smaller ids
        let parents = arena.get(id).justification.parents();
        let level = parents
            .iter()
            .filter_map(|p| levels.get(p))
            .max()
            .map(|m| m + 1)
            .unwrap_or(0);
        levels.insert(id, level);
    }
    levels
}

pub fn proof_length(proof: &[ClauseId]) -> usize {
    proof.len()
}

pub fn max_weight(arena: &ClauseArena, proof: &[ClauseId]) -> f64 {
    proof
        .iter()
        .map(|&id| arena.get(id).weight)
        .fold(0.0, f64::max)
}

/// Print one separator-delimited proof block with the ancestry in id
/// order and machine-readable justifications.
pub fn print_proof(arena: &ClauseArena, proof: &[ClauseId], number: u32, seconds: f64) {
    let lv = levels(arena, proof);
    let max_level = lv.values().max().copied().unwrap_or(0);
    println!(
        "\n{}",
        "============================== PROOF =================================".bold()
    );
    println!(
        "\n% Proof {} at {:.2} seconds: length {} level {} maxweight {:.3}.",
        number,
        seconds,
        proof_length(proof),
        max_level,
        max_weight(arena, proof)
    );
    println!();
    for &id in proof {
        let c = arena.get(id);
        println!("{} {}  {}.", id, c, c.justification);
    }
    println!(
        "\n{}",
        "============================== end of proof ==========================".bold()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::Clause;
    use crate::just::{Justification, Step};
    use crate::symbols;
    use serial_test::serial;

    fn input_clause(arena: &mut ClauseArena, s: &str) -> ClauseId {
        let mut c: Clause = s.parse().unwrap();
        c.justification = Justification::new(Step::Input);
        arena.insert(c)
    }

    #[test]
    #[serial]
    fn ancestry_is_transitive_and_ordered() {
        symbols::reset_table();
        let mut arena = ClauseArena::new();
        let a = input_clause(&mut arena, "p(a).");
        let b = input_clause(&mut arena, "-p(x) | q(x).");
        let mut c: Clause = "q(a).".parse().unwrap();
        c.justification = Justification::new(Step::BinaryRes(vec![(a, 0), (b, 0)]));
        let c = arena.insert(c);
        let mut d: Clause = "$F.".parse().unwrap();
        d.justification = Justification::new(Step::BinaryRes(vec![(c, 0), (a, 0)]));
        let d = arena.insert(d);

        let proof = ancestors(&arena, d);
        assert_eq!(proof, vec![a, b, c, d]);

        let lv = levels(&arena, &proof);
        assert_eq!(lv[&a], 0);
        assert_eq!(lv[&b], 0);
        assert_eq!(lv[&c], 1);
        assert_eq!(lv[&d], 2);
    }

    #[test]
    #[serial]
    fn ancestry_ignores_unrelated_clauses() {
        symbols::reset_table();
        let mut arena = ClauseArena::new();
        let a = input_clause(&mut arena, "p(a).");
        let _noise = input_clause(&mut arena, "r(a).");
        let mut c: Clause = "$F.".parse().unwrap();
        c.justification = Justification::new(Step::Copy(a));
        let c = arena.insert(c);
        assert_eq!(ancestors(&arena, c), vec![a, c]);
    }
}
