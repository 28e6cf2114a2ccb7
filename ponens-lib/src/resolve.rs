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

//! Resolution inference rules: binary, hyper, UR, and factoring.
//!
//! Partners come from the clashable index, which holds exactly the Usable
//! clauses (the given clause is indexed before inference, so it can clash
//! with itself).  Inference never mutates its inputs; children are handed
//! to the caller raw — merging, demodulation and deletion checks happen in
//! the processing pipeline.

use crate::clause::{Clause, ClauseId, Literal};
use crate::error::FatalError;
use crate::fpa::FpaIndex;
use crate::just::{Justification, Step};
use crate::options::{Flag, Options, Parm};
use crate::order::{self, TermOrder};
use crate::unify::{unify, Bindings};

/// Which literals of the given clause may clash.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ResVariant {
    Any,
    Pos,
    Neg,
}

/// The clashable index: (clause id, literal index) under each literal
/// atom, split by sign.
#[derive(Clone, Default)]
pub struct ClashIndex {
    pos: FpaIndex<(ClauseId, usize)>,
    neg: FpaIndex<(ClauseId, usize)>,
}

impl ClashIndex {
    pub fn new() -> ClashIndex {
        ClashIndex {
            pos: FpaIndex::new(),
            neg: FpaIndex::new(),
        }
    }

    pub fn insert(&mut self, c: &Clause) {
        for (i, l) in c.literals.iter().enumerate() {
            if l.sign {
                self.pos.insert(l.atom.clone(), (c.id, i));
            } else {
                self.neg.insert(l.atom.clone(), (c.id, i));
            }
        }
    }

    pub fn remove(&mut self, c: &Clause) -> Result<(), FatalError> {
        for (i, l) in c.literals.iter().enumerate() {
            let ok = if l.sign {
                self.pos.remove(&l.atom, &(c.id, i))
            } else {
                self.neg.remove(&l.atom, &(c.id, i))
            };
            if !ok {
                return Err(FatalError::IndexInvariant(format!(
                    "unindexing missing clashable entry for clause {}",
                    c.id
                )));
            }
        }
        Ok(())
    }

    fn with_sign(&self, sign: bool) -> &FpaIndex<(ClauseId, usize)> {
        if sign {
            &self.pos
        } else {
            &self.neg
        }
    }
}

fn instantiate_skipping(lits: &[Literal], skip: usize, b: &Bindings) -> Vec<Literal> {
    lits.iter()
        .enumerate()
        .filter(|(i, _)| *i != skip)
        .map(|(_, l)| Literal::new(l.sign, b.resolve(&l.atom)))
        .collect()
}

/// Is the literal eligible to clash under ordered resolution?
fn eligible(l: &Literal, ordered: bool) -> bool {
    !ordered || l.selected
}

/// After instantiation, is the clashed literal still maximal in its
/// instantiated parent?  Used by check_res_instances.
fn instance_still_maximal(parent: &[Literal], idx: usize, b: &Bindings, ord: TermOrder) -> bool {
    let mut inst: Vec<Literal> = parent
        .iter()
        .map(|l| Literal::new(l.sign, b.resolve(&l.atom)))
        .collect();
    order::mark_maximal_literals(&mut inst, ord);
    inst[idx].maximal
}

/// Binary resolution of the given clause against the clashable index.
/// Children go to `emit`; returns the number of instance prunes.
pub fn binary_resolution(
    given: &Clause,
    variant: ResVariant,
    idx: &ClashIndex,
    lookup: &dyn Fn(ClauseId) -> Clause,
    opts: &Options,
    ord: TermOrder,
    emit: &mut dyn FnMut(Clause),
) -> u32 {
    let ordered = opts.flag(Flag::OrderedRes);
    let check_instances = opts.flag(Flag::CheckResInstances);
    let mut prunes = 0;
    for (i, l) in given.literals.iter().enumerate() {
        match variant {
            ResVariant::Any => {}
            ResVariant::Pos if !l.sign => continue,
            ResVariant::Neg if l.sign => continue,
            _ => {}
        }
        if !eligible(l, ordered) {
            continue;
        }
        let offset = given.max_var().map(|v| v + 1).unwrap_or(0);
        for (_, &(other_id, j)) in idx.with_sign(!l.sign).unifiable(&l.atom) {
            let other = lookup(other_id);
            if !eligible(&other.literals[j], ordered) {
                continue;
            }
            let other_atom = other.literals[j].atom.shift_vars(offset);
            let mut b = Bindings::new();
            if !unify(&l.atom, &other_atom, &mut b) {
                continue;
            }
            if check_instances
                && ordered
                && !instance_still_maximal(&given.literals, i, &b, ord)
            {
                prunes += 1;
                continue;
            }
            let mut lits = instantiate_skipping(&given.literals, i, &b);
            let shifted: Vec<Literal> = other
                .literals
                .iter()
                .map(|m| Literal::new(m.sign, m.atom.shift_vars(offset)))
                .collect();
            lits.extend(instantiate_skipping(&shifted, j, &b));
            let just = Justification::new(Step::BinaryRes(vec![(given.id, i), (other_id, j)]));
            emit(Clause::new(lits, just));
        }
    }
    prunes
}

/// Hyper-resolution: clash every satellite-sign literal of a nucleus in
/// one step.  For the positive variant, satellites are positive clauses
/// and the clashed nucleus literals are negative; the negative variant is
/// the mirror image.
pub fn hyper_resolution(
    given: &Clause,
    variant: ResVariant,
    idx: &ClashIndex,
    lookup: &dyn Fn(ClauseId) -> Clause,
    emit: &mut dyn FnMut(Clause),
) {
    let sat_sign = variant != ResVariant::Neg; // satellites' clashed sign
    let all_sat = |c: &Clause| c.literals.iter().all(|l| l.sign == sat_sign);

    if !all_sat(given) {
        // the given clause is a nucleus
        clash_nucleus(given, sat_sign, idx, lookup, None, emit);
    }
    if all_sat(given) {
        // the given clause is a satellite: find nuclei it clashes into
        let mut nuclei: Vec<ClauseId> = Vec::new();
        for l in &given.literals {
            for (_, &(id, _)) in idx.with_sign(!sat_sign).unifiable(&l.atom) {
                if id != given.id && !nuclei.contains(&id) {
                    nuclei.push(id);
                }
            }
        }
        for id in nuclei {
            let nucleus = lookup(id);
            if all_sat(&nucleus) {
                continue;
            }
            clash_nucleus(&nucleus, sat_sign, idx, lookup, Some(given.id), emit);
        }
    }
}

/// Resolve away every `!sat_sign` literal of the nucleus with clauses from
/// the index whose literals all have `sat_sign`.  When `require` is set,
/// at least one satellite must be that clause (so each resolvent is
/// generated exactly once: when its last participant becomes given).
fn clash_nucleus(
    nucleus: &Clause,
    sat_sign: bool,
    idx: &ClashIndex,
    lookup: &dyn Fn(ClauseId) -> Clause,
    require: Option<ClauseId>,
    emit: &mut dyn FnMut(Clause),
) {
    let targets: Vec<usize> = nucleus
        .literals
        .iter()
        .enumerate()
        .filter(|(_, l)| l.sign != sat_sign)
        .map(|(i, _)| i)
        .collect();

    struct State<'a> {
        nucleus: &'a Clause,
        sat_sign: bool,
        idx: &'a ClashIndex,
        lookup: &'a dyn Fn(ClauseId) -> Clause,
        require: Option<ClauseId>,
        emit: &'a mut dyn FnMut(Clause),
    }

    fn rec(
        st: &mut State,
        targets: &[usize],
        b: &mut Bindings,
        next_offset: usize,
        sats: &mut Vec<(ClauseId, usize, Vec<Literal>, usize)>,
    ) {
        match targets.split_first() {
            None => {
                if let Some(req) = st.require {
                    if !sats.iter().any(|(id, _, _, _)| *id == req) {
                        return;
                    }
                }
                let mut lits: Vec<Literal> = st
                    .nucleus
                    .literals
                    .iter()
                    .filter(|l| l.sign == st.sat_sign)
                    .map(|l| Literal::new(l.sign, b.resolve(&l.atom)))
                    .collect();
                for (_, skip, sat_lits, _) in sats.iter() {
                    lits.extend(instantiate_skipping(sat_lits, *skip, b));
                }
                let mut parents = vec![(st.nucleus.id, 0)];
                parents.extend(sats.iter().map(|(id, _, _, t)| (*id, *t)));
                (st.emit)(Clause::new(lits, Justification::new(Step::HyperRes(parents))));
            }
            Some((&t, rest)) => {
                let atom = b.resolve(&st.nucleus.literals[t].atom);
                let candidates: Vec<(ClauseId, usize)> = st
                    .idx
                    .with_sign(st.sat_sign)
                    .unifiable(&atom)
                    .iter()
                    .map(|(_, &(id, j))| (id, j))
                    .collect();
                for (id, j) in candidates {
                    let sat = (st.lookup)(id);
                    if !sat.literals.iter().all(|l| l.sign == st.sat_sign) {
                        continue;
                    }
                    let shifted: Vec<Literal> = sat
                        .literals
                        .iter()
                        .map(|l| Literal::new(l.sign, l.atom.shift_vars(next_offset)))
                        .collect();
                    let m = b.mark();
                    if unify(&atom, &shifted[j].atom, b) {
                        let new_offset =
                            next_offset + sat.max_var().map(|v| v + 1).unwrap_or(0);
                        sats.push((id, j, shifted, t));
                        rec(st, rest, b, new_offset, sats);
                        sats.pop();
                    }
                    b.undo_to(m);
                }
            }
        }
    }

    let mut st = State {
        nucleus,
        sat_sign,
        idx,
        lookup,
        require,
        emit,
    };
    let mut b = Bindings::new();
    let base = nucleus.max_var().map(|v| v + 1).unwrap_or(0);
    rec(&mut st, &targets, &mut b, base, &mut Vec::new());
}

/// Unit-resulting resolution: clash all but one literal of a non-unit
/// nucleus with unit satellites, leaving a unit resolvent.
pub fn ur_resolution(
    given: &Clause,
    variant: ResVariant,
    idx: &ClashIndex,
    lookup: &dyn Fn(ClauseId) -> Clause,
    opts: &Options,
    emit: &mut dyn FnMut(Clause),
) {
    let sat_sign = variant != ResVariant::Neg;
    let limit = opts.parm(Parm::UrNucleusLimit);

    if !given.is_unit() {
        // given is the nucleus
        if limit == -1 || (given.literals.len() as i64) <= limit {
            ur_with_nucleus(given, sat_sign, idx, lookup, None, emit);
        }
    } else if given.literals[0].sign == sat_sign {
        // given is a satellite; find nuclei containing a clashable literal
        let mut nuclei: Vec<ClauseId> = Vec::new();
        for (_, &(id, _)) in idx
            .with_sign(!given.literals[0].sign)
            .unifiable(&given.literals[0].atom)
        {
            if id != given.id && !nuclei.contains(&id) {
                nuclei.push(id);
            }
        }
        for id in nuclei {
            let nucleus = lookup(id);
            if nucleus.is_unit() {
                continue;
            }
            if limit != -1 && (nucleus.literals.len() as i64) > limit {
                continue;
            }
            ur_with_nucleus(&nucleus, sat_sign, idx, lookup, Some(given.id), emit);
        }
    }
}

fn ur_with_nucleus(
    nucleus: &Clause,
    sat_sign: bool,
    idx: &ClashIndex,
    lookup: &dyn Fn(ClauseId) -> Clause,
    require: Option<ClauseId>,
    emit: &mut dyn FnMut(Clause),
) {
    let n = nucleus.literals.len();
    for target in 0..n {
        // clash every literal except `target` with a unit of opposite sign
        let clash_positions: Vec<usize> = (0..n).filter(|&i| i != target).collect();
        // each clashed nucleus literal must be opposite to the satellite
        if !clash_positions
            .iter()
            .all(|&i| nucleus.literals[i].sign != sat_sign)
        {
            continue;
        }
        rec_ur(
            nucleus,
            target,
            &clash_positions,
            sat_sign,
            idx,
            lookup,
            require,
            &mut Bindings::new(),
            nucleus.max_var().map(|v| v + 1).unwrap_or(0),
            &mut Vec::new(),
            emit,
        );
    }
}

#[allow(clippy::too_many_arguments)]
fn rec_ur(
    nucleus: &Clause,
    target: usize,
    remaining: &[usize],
    sat_sign: bool,
    idx: &ClashIndex,
    lookup: &dyn Fn(ClauseId) -> Clause,
    require: Option<ClauseId>,
    b: &mut Bindings,
    next_offset: usize,
    sats: &mut Vec<(ClauseId, usize)>,
    emit: &mut dyn FnMut(Clause),
) {
    match remaining.split_first() {
        None => {
            if let Some(req) = require {
                if !sats.iter().any(|(id, _)| *id == req) {
                    return;
                }
            }
            let l = &nucleus.literals[target];
            let lits = vec![Literal::new(l.sign, b.resolve(&l.atom))];
            let mut parents = vec![(nucleus.id, target)];
            parents.extend(sats.iter().cloned());
            emit(Clause::new(lits, Justification::new(Step::UrRes(parents))));
        }
        Some((&t, rest)) => {
            let atom = b.resolve(&nucleus.literals[t].atom);
            let candidates: Vec<(ClauseId, usize)> = idx
                .with_sign(sat_sign)
                .unifiable(&atom)
                .iter()
                .map(|(_, &(id, j))| (id, j))
                .collect();
            for (id, j) in candidates {
                let sat = lookup(id);
                if !sat.is_unit() {
                    continue;
                }
                let sat_atom = sat.literals[j].atom.shift_vars(next_offset);
                let m = b.mark();
                if unify(&atom, &sat_atom, b) {
                    let new_offset = next_offset + sat.max_var().map(|v| v + 1).unwrap_or(0);
                    sats.push((id, t));
                    rec_ur(
                        nucleus, target, rest, sat_sign, idx, lookup, require, b, new_offset,
                        sats, emit,
                    );
                    sats.pop();
                }
                b.undo_to(m);
            }
        }
    }
}

/// Binary factoring: merge unifiable same-sign literal pairs.
pub fn binary_factors(c: &Clause, emit: &mut dyn FnMut(Clause)) {
    for i in 0..c.literals.len() {
        for j in (i + 1)..c.literals.len() {
            if c.literals[i].sign != c.literals[j].sign {
                continue;
            }
            let mut b = Bindings::new();
            if unify(&c.literals[i].atom, &c.literals[j].atom, &mut b) {
                let lits = instantiate_skipping(&c.literals, j, &b);
                let just = Justification::new(Step::Factor(c.id, i, j));
                emit(Clause::new(lits, just));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::ClauseArena;
    use crate::symbols;
    use serial_test::serial;

    fn clause(s: &str) -> Clause {
        s.parse().unwrap()
    }

    fn setup_arena(sources: &[&str]) -> (ClauseArena, ClashIndex) {
        let mut arena = ClauseArena::new();
        let mut idx = ClashIndex::new();
        for s in sources {
            let mut c: Clause = s.parse().unwrap();
            // everything is eligible in these tests
            for l in &mut c.literals {
                l.selected = true;
                l.maximal = true;
            }
            let id = arena.insert(c);
            idx.insert(arena.get(id));
        }
        (arena, idx)
    }

    #[test]
    #[serial]
    fn binary_resolution_produces_resolvent() {
        symbols::reset_table();
        let (arena, idx) = setup_arena(&["p(a) | q(a)."]);
        let mut given = clause("-p(x) | r(x).");
        for l in &mut given.literals {
            l.selected = true;
        }
        given.id = 99;
        let mut out = Vec::new();
        let lookup = |id: ClauseId| arena.get(id).clone();
        let mut opts = Options::new();
        opts.change_flag("ordered_res", false).unwrap();
        binary_resolution(
            &given,
            ResVariant::Any,
            &idx,
            &lookup,
            &opts,
            TermOrder::Lpo,
            &mut |c| out.push(c),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to_string(), "r(a) | q(a).");
        match out[0].justification.primary() {
            Some(Step::BinaryRes(ps)) => assert_eq!(ps, &vec![(99, 0), (1, 0)]),
            other => panic!("unexpected justification {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn neg_variant_only_clashes_negative_literals() {
        symbols::reset_table();
        let (arena, idx) = setup_arena(&["-p(a).", "r(b)."]);
        let mut given = clause("p(x) | -r(x).");
        for l in &mut given.literals {
            l.selected = true;
        }
        given.id = 99;
        let lookup = |id: ClauseId| arena.get(id).clone();
        let opts = Options::new();
        let mut out = Vec::new();
        binary_resolution(
            &given,
            ResVariant::Neg,
            &idx,
            &lookup,
            &opts,
            TermOrder::Lpo,
            &mut |c| out.push(c),
        );
        // only -r(x) may clash, resolving with r(b)
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to_string(), "p(b).");
    }

    #[test]
    #[serial]
    fn hyper_resolution_clashes_all_negatives() {
        symbols::reset_table();
        let (arena, idx) = setup_arena(&["p(a).", "q(a)."]);
        let mut given = clause("-p(x) | -q(x) | r(x).");
        given.id = 99;
        let lookup = |id: ClauseId| arena.get(id).clone();
        let mut out = Vec::new();
        hyper_resolution(&given, ResVariant::Pos, &idx, &lookup, &mut |c| out.push(c));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to_string(), "r(a).");
        match out[0].justification.primary() {
            Some(Step::HyperRes(ps)) => {
                assert_eq!(ps[0], (99, 0));
                assert_eq!(ps.len(), 3);
            }
            other => panic!("unexpected justification {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn hyper_as_satellite_requires_given() {
        symbols::reset_table();
        // nucleus in usable, satellite arrives as given
        let (arena, idx) = setup_arena(&["-p(x) | r(x).", "other(c)."]);
        let mut given = clause("p(b).");
        given.id = 99;
        // the given must also be retrievable as a satellite
        let mut idx = idx;
        idx.insert(&given);
        let lookup = |id: ClauseId| {
            if id == 99 {
                given.clone()
            } else {
                arena.get(id).clone()
            }
        };
        let mut out = Vec::new();
        hyper_resolution(&given, ResVariant::Pos, &idx, &lookup, &mut |c| out.push(c));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to_string(), "r(b).");
    }

    #[test]
    #[serial]
    fn ur_resolution_leaves_one_literal() {
        symbols::reset_table();
        let (arena, idx) = setup_arena(&["p(a).", "q(a)."]);
        let mut given = clause("-p(x) | -q(x) | s(x).");
        given.id = 99;
        let lookup = |id: ClauseId| arena.get(id).clone();
        let opts = Options::new();
        let mut out = Vec::new();
        ur_resolution(&given, ResVariant::Pos, &idx, &lookup, &opts, &mut |c| {
            out.push(c)
        });
        // target s(x): resolvent s(a); targets -p/-q impossible (s(x) not clashable)
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to_string(), "s(a).");
    }

    #[test]
    #[serial]
    fn factoring_merges_unifiable_literals() {
        symbols::reset_table();
        let mut c = clause("p(x) | p(f(y)) | q(x).");
        c.id = 5;
        let mut out = Vec::new();
        binary_factors(&c, &mut |f| out.push(f));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to_string(), "p(f(y)) | q(f(y)).");
        match out[0].justification.primary() {
            Some(Step::Factor(5, 0, 1)) => {}
            other => panic!("unexpected justification {:?}", other),
        }
    }
}
