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

//! The child-to-parent wire format: a length-prefixed sequence of 32-bit
//! signed integers.
//!
//! A serialised term uses negative ints for variables and positive ints
//! for symbol numbers, each followed by its children (the arity comes
//! from the symbol table).  The stream carries the symbols interned after
//! the mark, the proofs, the statistics, the clock readings and the exit
//! code; the parent re-interns the new symbols before deserialising any
//! clause.

use std::convert::TryInto;

use crate::clause::{Clause, ClauseId, Container, Literal};
use crate::error::FatalError;
use crate::just::{Justification, Step};
use crate::search::{ProverResults, Stats};
use crate::symbols::{self, SymbolId, SymbolKind};
use crate::term::{Position, Term};

/// Flat integer buffer with a read cursor.
#[derive(Clone, Debug, Default)]
pub struct IntBuf {
    ints: Vec<i32>,
    pos: usize,
}

impl IntBuf {
    pub fn new() -> IntBuf {
        IntBuf::default()
    }

    pub fn from_ints(ints: Vec<i32>) -> IntBuf {
        IntBuf { ints, pos: 0 }
    }

    pub fn write(&mut self, x: i32) {
        self.ints.push(x);
    }

    pub fn read(&mut self) -> Result<i32, FatalError> {
        let x = self
            .ints
            .get(self.pos)
            .copied()
            .ok_or_else(|| FatalError::BadWireData("unexpected end of stream".to_string()))?;
        self.pos += 1;
        Ok(x)
    }

    pub fn len(&self) -> usize {
        self.ints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ints.is_empty()
    }

    /// Little-endian bytes with the int count prefixed.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 * (self.ints.len() + 1));
        out.extend((self.ints.len() as i32).to_le_bytes());
        for x in &self.ints {
            out.extend(x.to_le_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<IntBuf, FatalError> {
        let short = || FatalError::BadWireData("short byte stream".to_string());
        if bytes.len() < 4 {
            return Err(short());
        }
        let n = i32::from_le_bytes(bytes[0..4].try_into().unwrap());
        if n < 0 {
            return Err(FatalError::BadWireData("negative length prefix".to_string()));
        }
        let n = n as usize;
        if bytes.len() < 4 * (n + 1) {
            return Err(short());
        }
        let mut ints = Vec::with_capacity(n);
        for i in 0..n {
            let off = 4 * (i + 1);
            ints.push(i32::from_le_bytes(bytes[off..off + 4].try_into().unwrap()));
        }
        Ok(IntBuf { ints, pos: 0 })
    }
}

/// Child symbol number -> parent symbol id for symbols interned after the
/// mark.  Pre-mark symbols are assumed identical in both processes (the
/// child parsed the same input).
#[derive(Clone, Debug, Default)]
pub struct SymMap {
    base: usize,
    mapped: Vec<SymbolId>,
}

impl SymMap {
    pub fn identity() -> SymMap {
        SymMap {
            base: usize::MAX,
            mapped: Vec::new(),
        }
    }

    /// Re-intern the child's new symbols into this process.  Since the
    /// wire carries only (symnum, arity), unknown symbols get fabricated
    /// names derived from the child's symbol number.
    pub fn re_intern(new_symbols: &[(i32, i32)]) -> SymMap {
        let base = new_symbols
            .iter()
            .map(|(sn, _)| *sn as usize)
            .min()
            .unwrap_or(usize::MAX);
        let mut mapped = Vec::new();
        for (sn, arity) in new_symbols {
            let id = symbols::intern(&format!("k{}", sn), *arity as usize);
            symbols::set_kind(id, SymbolKind::Function);
            mapped.push(id);
        }
        SymMap { base, mapped }
    }

    fn resolve(&self, child_symnum: usize) -> SymbolId {
        if child_symnum >= self.base {
            let i = child_symnum - self.base;
            if i < self.mapped.len() {
                return self.mapped[i];
            }
        }
        child_symnum
    }
}

fn put_term(buf: &mut IntBuf, t: &Term) {
    match t {
        Term::Variable(v) => buf.write(-((*v as i32) + 1)),
        Term::Application { symbol, args } => {
            buf.write((*symbol as i32) + 1);
            for a in args {
                put_term(buf, a);
            }
        }
    }
}

fn get_term(buf: &mut IntBuf, map: &SymMap) -> Result<Term, FatalError> {
    let x = buf.read()?;
    if x < 0 {
        Ok(Term::Variable((-x - 1) as usize))
    } else if x == 0 {
        Err(FatalError::BadWireData("zero symbol code".to_string()))
    } else {
        let symbol = map.resolve((x - 1) as usize);
        if symbol >= symbols::count() {
            return Err(FatalError::BadWireData(format!(
                "unknown symbol number {}",
                symbol
            )));
        }
        let arity = symbols::arity(symbol);
        let mut args = Vec::with_capacity(arity);
        for _ in 0..arity {
            args.push(get_term(buf, map)?);
        }
        Ok(Term::Application { symbol, args })
    }
}

fn put_position(buf: &mut IntBuf, p: &Position) {
    buf.write(p.len() as i32);
    for &x in p {
        buf.write(x as i32);
    }
}

fn get_position(buf: &mut IntBuf) -> Result<Position, FatalError> {
    let n = buf.read()?;
    let mut p = Vec::with_capacity(n.max(0) as usize);
    for _ in 0..n {
        p.push(buf.read()? as usize);
    }
    Ok(p)
}

fn put_parent_list(buf: &mut IntBuf, ps: &[(ClauseId, usize)]) {
    buf.write(ps.len() as i32);
    for (id, i) in ps {
        buf.write(*id as i32);
        buf.write(*i as i32);
    }
}

fn get_parent_list(buf: &mut IntBuf) -> Result<Vec<(ClauseId, usize)>, FatalError> {
    let n = buf.read()?;
    let mut ps = Vec::with_capacity(n.max(0) as usize);
    for _ in 0..n {
        let id = buf.read()? as ClauseId;
        let i = buf.read()? as usize;
        ps.push((id, i));
    }
    Ok(ps)
}

fn put_step(buf: &mut IntBuf, s: &Step) {
    match s {
        Step::Input => buf.write(1),
        Step::Goal => buf.write(2),
        Step::Deny(id) => {
            buf.write(3);
            buf.write(*id as i32);
        }
        Step::Clausify(id) => {
            buf.write(4);
            buf.write(*id as i32);
        }
        Step::Copy(id) => {
            buf.write(5);
            buf.write(*id as i32);
        }
        Step::Flip(id, i) => {
            buf.write(6);
            buf.write(*id as i32);
            buf.write(*i as i32);
        }
        Step::NewSymbol(id) => {
            buf.write(7);
            buf.write(*id as i32);
        }
        Step::BackDemod(id) => {
            buf.write(8);
            buf.write(*id as i32);
        }
        Step::BackUnitDel(id) => {
            buf.write(9);
            buf.write(*id as i32);
        }
        Step::BinaryRes(ps) => {
            buf.write(10);
            put_parent_list(buf, ps);
        }
        Step::HyperRes(ps) => {
            buf.write(11);
            put_parent_list(buf, ps);
        }
        Step::UrRes(ps) => {
            buf.write(12);
            put_parent_list(buf, ps);
        }
        Step::Factor(id, i, j) => {
            buf.write(13);
            buf.write(*id as i32);
            buf.write(*i as i32);
            buf.write(*j as i32);
        }
        Step::Paramod {
            from,
            from_pos,
            into,
            into_pos,
        } => {
            buf.write(14);
            buf.write(*from as i32);
            put_position(buf, from_pos);
            buf.write(*into as i32);
            put_position(buf, into_pos);
        }
        Step::Demod(steps) => {
            buf.write(15);
            buf.write(steps.len() as i32);
            for (id, tp, dp) in steps {
                buf.write(*id as i32);
                put_position(buf, tp);
                put_position(buf, dp);
            }
        }
        Step::UnitDel(id, i) => {
            buf.write(16);
            buf.write(*id as i32);
            buf.write(*i as i32);
        }
        Step::Merge(i) => {
            buf.write(17);
            buf.write(*i as i32);
        }
        Step::Xx(i) => {
            buf.write(18);
            buf.write(*i as i32);
        }
    }
}

fn get_step(buf: &mut IntBuf) -> Result<Step, FatalError> {
    let code = buf.read()?;
    let step = match code {
        1 => Step::Input,
        2 => Step::Goal,
        3 => Step::Deny(buf.read()? as ClauseId),
        4 => Step::Clausify(buf.read()? as ClauseId),
        5 => Step::Copy(buf.read()? as ClauseId),
        6 => Step::Flip(buf.read()? as ClauseId, buf.read()? as usize),
        7 => Step::NewSymbol(buf.read()? as ClauseId),
        8 => Step::BackDemod(buf.read()? as ClauseId),
        9 => Step::BackUnitDel(buf.read()? as ClauseId),
        10 => Step::BinaryRes(get_parent_list(buf)?),
        11 => Step::HyperRes(get_parent_list(buf)?),
        12 => Step::UrRes(get_parent_list(buf)?),
        13 => Step::Factor(
            buf.read()? as ClauseId,
            buf.read()? as usize,
            buf.read()? as usize,
        ),
        14 => {
            let from = buf.read()? as ClauseId;
            let from_pos = get_position(buf)?;
            let into = buf.read()? as ClauseId;
            let into_pos = get_position(buf)?;
            Step::Paramod {
                from,
                from_pos,
                into,
                into_pos,
            }
        }
        15 => {
            let n = buf.read()?;
            let mut steps = Vec::with_capacity(n.max(0) as usize);
            for _ in 0..n {
                let id = buf.read()? as ClauseId;
                let tp = get_position(buf)?;
                let dp = get_position(buf)?;
                steps.push((id, tp, dp));
            }
            Step::Demod(steps)
        }
        16 => Step::UnitDel(buf.read()? as ClauseId, buf.read()? as usize),
        17 => Step::Merge(buf.read()? as usize),
        18 => Step::Xx(buf.read()? as usize),
        other => {
            return Err(FatalError::BadWireData(format!(
                "unknown justification code {}",
                other
            )))
        }
    };
    Ok(step)
}

/// Serialise a clause: id, formula flag, weight (milli), justification,
/// literal count, then each literal as sign, term, and ordering flags.
pub fn put_clause(buf: &mut IntBuf, c: &Clause) {
    buf.write(c.id as i32);
    buf.write(c.is_formula as i32);
    buf.write((c.weight * 1000.0).round() as i32);
    buf.write(c.justification.0.len() as i32);
    for s in &c.justification.0 {
        put_step(buf, s);
    }
    buf.write(c.literals.len() as i32);
    for l in &c.literals {
        buf.write(l.sign as i32);
        put_term(buf, &l.atom);
        let flags = (l.maximal as i32) | ((l.oriented as i32) << 1) | ((l.selected as i32) << 2);
        buf.write(flags);
    }
}

pub fn get_clause(buf: &mut IntBuf, map: &SymMap) -> Result<Clause, FatalError> {
    let id = buf.read()? as ClauseId;
    let is_formula = buf.read()? != 0;
    let weight = buf.read()? as f64 / 1000.0;
    let n_steps = buf.read()?;
    let mut just = Justification::default();
    for _ in 0..n_steps {
        just.push(get_step(buf)?);
    }
    let n_lits = buf.read()?;
    let mut literals = Vec::with_capacity(n_lits.max(0) as usize);
    for _ in 0..n_lits {
        let sign = buf.read()? != 0;
        let atom = get_term(buf, map)?;
        let flags = buf.read()?;
        let mut l = Literal::new(sign, atom);
        l.maximal = flags & 1 != 0;
        l.oriented = flags & 2 != 0;
        l.selected = flags & 4 != 0;
        literals.push(l);
    }
    let mut c = Clause::new(literals, just);
    c.id = id;
    c.is_formula = is_formula;
    c.weight = weight;
    c.normal_vars = true;
    c.container = Container::None;
    Ok(c)
}

/// Child side: pack results plus the post-mark symbol additions.
pub fn encode_results(results: &ProverResults, new_symbols: &[(SymbolId, usize)]) -> IntBuf {
    let mut buf = IntBuf::new();
    buf.write(new_symbols.len() as i32);
    for (sn, arity) in new_symbols {
        buf.write(*sn as i32);
        buf.write(*arity as i32);
    }
    buf.write(results.proofs.len() as i32);
    for proof in &results.proofs {
        buf.write(proof.len() as i32);
        for c in proof {
            put_clause(&mut buf, c);
        }
    }
    // xproofs: none beyond the ordinary proofs
    buf.write(0);
    for x in results.stats.to_ints() {
        buf.write(x);
    }
    buf.write((results.user_seconds * 1000.0) as i32);
    buf.write((results.system_seconds * 1000.0) as i32);
    buf.write(results.return_code);
    buf
}

/// Parent side: re-intern the child's new symbols, then rebuild results.
pub fn decode_results(mut buf: IntBuf) -> Result<ProverResults, FatalError> {
    let n_syms = buf.read()?;
    let mut new_symbols = Vec::with_capacity(n_syms.max(0) as usize);
    for _ in 0..n_syms {
        let sn = buf.read()?;
        let arity = buf.read()?;
        new_symbols.push((sn, arity));
    }
    let map = if new_symbols.is_empty() {
        SymMap::identity()
    } else {
        SymMap::re_intern(&new_symbols)
    };

    let n_proofs = buf.read()?;
    let mut proofs = Vec::with_capacity(n_proofs.max(0) as usize);
    for _ in 0..n_proofs {
        let n_steps = buf.read()?;
        let mut proof = Vec::with_capacity(n_steps.max(0) as usize);
        for _ in 0..n_steps {
            proof.push(get_clause(&mut buf, &map)?);
        }
        proofs.push(proof);
    }
    let n_xproofs = buf.read()?;
    for _ in 0..n_xproofs {
        let n_steps = buf.read()?;
        for _ in 0..n_steps {
            let _ = get_clause(&mut buf, &map)?;
        }
    }
    let mut stat_ints = Vec::with_capacity(Stats::WIRE_LEN);
    for _ in 0..Stats::WIRE_LEN {
        stat_ints.push(buf.read()?);
    }
    let stats = Stats::from_ints(&stat_ints)
        .ok_or_else(|| FatalError::BadWireData("bad stats block".to_string()))?;
    let user_ms = buf.read()?;
    let system_ms = buf.read()?;
    let return_code = buf.read()?;
    Ok(ProverResults {
        proofs,
        stats,
        user_seconds: user_ms as f64 / 1000.0,
        system_seconds: system_ms as f64 / 1000.0,
        return_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::just::{Justification, Step};
    use serial_test::serial;

    fn clause(s: &str) -> Clause {
        s.parse().unwrap()
    }

    #[test]
    #[serial]
    fn term_encoding_uses_negative_ints_for_variables() {
        symbols::reset_table();
        let t: Term = "f(x,g(y))".parse().unwrap();
        let mut buf = IntBuf::new();
        put_term(&mut buf, &t);
        // first int is the symbol code for f, positive
        let first = buf.ints[0];
        assert!(first > 0);
        // second is variable x -> -1
        assert_eq!(buf.ints[1], -1);
        let back = get_term(&mut buf, &SymMap::identity()).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    #[serial]
    fn clause_round_trip() {
        symbols::reset_table();
        let mut c = clause("p(f(x,a)) | -q(x).");
        c.id = 42;
        c.weight = 5.25;
        c.justification = Justification::new(Step::BinaryRes(vec![(3, 0), (7, 1)]));
        c.justification.push(Step::Demod(vec![(9, vec![0, 0], vec![0])]));
        c.literals[0].maximal = true;
        c.literals[1].oriented = false;
        c.literals[1].selected = true;

        let mut buf = IntBuf::new();
        put_clause(&mut buf, &c);
        let back = get_clause(&mut buf, &SymMap::identity()).unwrap();
        assert_eq!(back.id, 42);
        assert_eq!(back.weight, 5.25);
        assert_eq!(back.literals, c.literals);
        assert_eq!(back.justification, c.justification);
        assert_eq!(back.literals[0].maximal, true);
        assert_eq!(back.literals[1].selected, true);
    }

    #[test]
    #[serial]
    fn byte_stream_round_trip() {
        symbols::reset_table();
        let mut buf = IntBuf::new();
        for x in [-5, 0, 7, i32::MAX, i32::MIN] {
            buf.write(x);
        }
        let bytes = buf.to_bytes();
        let back = IntBuf::from_bytes(&bytes).unwrap();
        assert_eq!(back.ints, buf.ints);
        // truncated streams are rejected, not misread
        assert!(IntBuf::from_bytes(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    #[serial]
    fn results_round_trip() {
        symbols::reset_table();
        let mut c = clause("p(a).");
        c.id = 1;
        c.justification = Justification::new(Step::Input);
        let mut e = clause("$F.");
        e.id = 3;
        e.justification = Justification::new(Step::BinaryRes(vec![(1, 0), (2, 0)]));
        let mut stats = Stats::default();
        stats.given = 4;
        stats.kept = 9;
        let results = ProverResults {
            proofs: vec![vec![c, e]],
            stats: stats.clone(),
            user_seconds: 1.5,
            system_seconds: 0.25,
            return_code: 0,
        };
        let buf = encode_results(&results, &[]);
        let bytes = buf.to_bytes();
        let back = decode_results(IntBuf::from_bytes(&bytes).unwrap()).unwrap();
        assert_eq!(back.return_code, 0);
        assert_eq!(back.stats, stats);
        assert_eq!(back.proofs.len(), 1);
        assert_eq!(back.proofs[0].len(), 2);
        assert_eq!(back.proofs[0][1].id, 3);
        assert!((back.user_seconds - 1.5).abs() < 1e-9);
    }

    #[test]
    #[serial]
    fn new_symbols_are_re_interned() {
        symbols::reset_table();
        let before = symbols::count();
        let map = SymMap::re_intern(&[(100, 2), (101, 0)]);
        assert_eq!(symbols::count(), before + 2);
        // child symnum 100 resolves to the first fabricated symbol
        let id = map.resolve(100);
        assert_eq!(symbols::arity(id), 2);
    }
}
