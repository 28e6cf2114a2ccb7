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

//! The process-wide symbol table.
//!
//! A symbol is identified by its (name, arity) pair and flyweighted to a
//! small integer id.  The table is initialised once per process and only
//! grows; ids handed out are stable for the life of the run.  New symbols
//! (Skolem functions, auto-introduced constants) may be appended mid-run,
//! and the additions after a `mark_for_new_symbols` call can be replayed
//! into another process (see the `wire` module).

use std::collections::HashMap;
use std::sync::RwLock;

use lazy_static::lazy_static;

pub type SymbolId = usize;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SymbolKind {
    Unspecified,
    Function,
    Predicate,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UnifTheory {
    Empty,
    Commutative,
    AssocCommutative,
}

/// Lexicographic or multiset argument comparison under LPO/RPO.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LrpoStatus {
    LrLex,
    Multiset,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Fixity {
    Ordinary,
    Infix,
    InfixLeft,
    InfixRight,
    Prefix,
    Postfix,
}

#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: String,
    pub arity: usize,
    pub kind: SymbolKind,
    /// Lex value used by the path orderings; assigned on intern, may be
    /// overridden by `function_order`/`predicate_order`.
    pub precedence: usize,
    pub kb_weight: i64,
    pub status: LrpoStatus,
    pub theory: UnifTheory,
    pub skolem: bool,
    pub auxiliary: bool,
    pub fixity: Fixity,
}

pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_name: HashMap<(String, usize), SymbolId>,
    mark: usize,
    fresh_count: usize,
}

impl SymbolTable {
    fn bootstrap() -> SymbolTable {
        let mut t = SymbolTable {
            symbols: Vec::new(),
            by_name: HashMap::new(),
            mark: 0,
            fresh_count: 0,
        };
        // Equality is always present and always a predicate.
        let eq = t.intern("=", 2);
        t.symbols[eq].kind = SymbolKind::Predicate;
        t.symbols[eq].fixity = Fixity::Infix;
        t
    }

    fn intern(&mut self, name: &str, arity: usize) -> SymbolId {
        if let Some(&id) = self.by_name.get(&(name.to_string(), arity)) {
            return id;
        }
        let id = self.symbols.len();
        self.symbols.push(Symbol {
            name: name.to_string(),
            arity,
            kind: SymbolKind::Unspecified,
            precedence: id,
            kb_weight: 1,
            status: LrpoStatus::LrLex,
            theory: UnifTheory::Empty,
            skolem: false,
            auxiliary: false,
            fixity: Fixity::Ordinary,
        });
        self.by_name.insert((name.to_string(), arity), id);
        id
    }
}

lazy_static! {
    static ref TABLE: RwLock<SymbolTable> = RwLock::new(SymbolTable::bootstrap());
}

/// Intern (name, arity) and return its stable id.
pub fn intern(name: &str, arity: usize) -> SymbolId {
    TABLE.write().unwrap().intern(name, arity)
}

pub fn lookup(name: &str, arity: usize) -> Option<SymbolId> {
    TABLE
        .read()
        .unwrap()
        .by_name
        .get(&(name.to_string(), arity))
        .copied()
}

/// The id of the built-in equality predicate.
pub fn eq_symbol() -> SymbolId {
    lookup("=", 2).expect("equality symbol missing from table")
}

pub fn name(id: SymbolId) -> String {
    TABLE.read().unwrap().symbols[id].name.clone()
}

pub fn arity(id: SymbolId) -> usize {
    TABLE.read().unwrap().symbols[id].arity
}

pub fn kind(id: SymbolId) -> SymbolKind {
    TABLE.read().unwrap().symbols[id].kind
}

pub fn set_kind(id: SymbolId, kind: SymbolKind) {
    TABLE.write().unwrap().symbols[id].kind = kind;
}

pub fn is_function(id: SymbolId) -> bool {
    kind(id) == SymbolKind::Function
}

pub fn precedence(id: SymbolId) -> usize {
    TABLE.read().unwrap().symbols[id].precedence
}

pub fn set_precedence(id: SymbolId, prec: usize) {
    TABLE.write().unwrap().symbols[id].precedence = prec;
}

pub fn kb_weight(id: SymbolId) -> i64 {
    TABLE.read().unwrap().symbols[id].kb_weight
}

pub fn set_kb_weight(id: SymbolId, w: i64) {
    TABLE.write().unwrap().symbols[id].kb_weight = w;
}

pub fn status(id: SymbolId) -> LrpoStatus {
    TABLE.read().unwrap().symbols[id].status
}

pub fn set_status(id: SymbolId, s: LrpoStatus) {
    TABLE.write().unwrap().symbols[id].status = s;
}

pub fn theory(id: SymbolId) -> UnifTheory {
    TABLE.read().unwrap().symbols[id].theory
}

pub fn set_theory(id: SymbolId, th: UnifTheory) {
    TABLE.write().unwrap().symbols[id].theory = th;
}

pub fn is_commutative(id: SymbolId) -> bool {
    matches!(
        theory(id),
        UnifTheory::Commutative | UnifTheory::AssocCommutative
    )
}

pub fn is_ac(id: SymbolId) -> bool {
    theory(id) == UnifTheory::AssocCommutative
}

pub fn is_skolem(id: SymbolId) -> bool {
    TABLE.read().unwrap().symbols[id].skolem
}

pub fn set_skolem(id: SymbolId) {
    TABLE.write().unwrap().symbols[id].skolem = true;
}

pub fn set_fixity(id: SymbolId, f: Fixity) {
    TABLE.write().unwrap().symbols[id].fixity = f;
}

pub fn fixity(id: SymbolId) -> Fixity {
    TABLE.read().unwrap().symbols[id].fixity
}

/// Total number of interned symbols; ids are 0..count.
pub fn count() -> usize {
    TABLE.read().unwrap().symbols.len()
}

/// Generate a fresh Skolem symbol of the given arity.  The returned id was
/// not previously interned.
pub fn fresh_skolem(arity: usize) -> SymbolId {
    let mut t = TABLE.write().unwrap();
    loop {
        t.fresh_count += 1;
        let name = if arity == 0 {
            format!("c{}", t.fresh_count)
        } else {
            format!("f{}", t.fresh_count)
        };
        if !t.by_name.contains_key(&(name.clone(), arity)) {
            let id = t.intern(&name, arity);
            t.symbols[id].kind = SymbolKind::Function;
            t.symbols[id].skolem = true;
            return id;
        }
    }
}

/// Generate a fresh ordinary constant (used by the new-constant rule).
pub fn fresh_constant() -> SymbolId {
    let mut t = TABLE.write().unwrap();
    loop {
        t.fresh_count += 1;
        let name = format!("a{}", t.fresh_count);
        if !t.by_name.contains_key(&(name.clone(), 0)) {
            let id = t.intern(&name, 0);
            t.symbols[id].kind = SymbolKind::Function;
            return id;
        }
    }
}

/// Remember the current table size so additions can later be replayed in a
/// parent process.
pub fn mark_for_new_symbols() {
    let mut t = TABLE.write().unwrap();
    t.mark = t.symbols.len();
}

/// (id, name, arity) of every symbol interned since the last mark.
pub fn new_symbols_since_mark() -> Vec<(SymbolId, String, usize)> {
    let t = TABLE.read().unwrap();
    t.symbols[t.mark..]
        .iter()
        .enumerate()
        .map(|(i, s)| (t.mark + i, s.name.clone(), s.arity))
        .collect()
}

/// Every id interned under this name, at any arity.
pub fn ids_with_name(name: &str) -> Vec<SymbolId> {
    let t = TABLE.read().unwrap();
    t.symbols
        .iter()
        .enumerate()
        .filter(|(_, s)| s.name == name)
        .map(|(id, _)| id)
        .collect()
}

/// Apply a user-supplied `function_order` or `predicate_order` list.  The
/// listed symbols receive increasing precedence starting above all existing
/// precedences; an arity of usize::MAX matches every arity of the name.
/// Symbols in the table but missing from the list are reported back so the
/// caller can warn.
pub fn assign_precedence(ordered: &[(String, usize)], functions: bool) -> Vec<String> {
    let mut t = TABLE.write().unwrap();
    let base = t.symbols.len();
    let mut seen: Vec<SymbolId> = Vec::new();
    for (i, (name, arity)) in ordered.iter().enumerate() {
        if *arity == usize::MAX {
            for id in 0..t.symbols.len() {
                if t.symbols[id].name == *name {
                    t.symbols[id].precedence = base + i;
                    seen.push(id);
                }
            }
        } else if let Some(&id) = t.by_name.get(&(name.clone(), *arity)) {
            t.symbols[id].precedence = base + i;
            seen.push(id);
        }
    }
    let want = if functions {
        SymbolKind::Function
    } else {
        SymbolKind::Predicate
    };
    t.symbols
        .iter()
        .enumerate()
        .filter(|(id, s)| s.kind == want && !seen.contains(id))
        .map(|(_, s)| s.name.clone())
        .collect()
}

/// Wipe the table back to its bootstrap state.  Tests only: the table is a
/// process-wide singleton, so tests that touch it must run serially.
#[doc(hidden)]
pub fn reset_table() {
    let mut t = TABLE.write().unwrap();
    *t = SymbolTable::bootstrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn intern_is_stable() {
        reset_table();
        let f = intern("f", 2);
        let g = intern("g", 1);
        assert_eq!(f, intern("f", 2));
        assert_ne!(f, g);
        // same name, different arity is a different symbol
        assert_ne!(f, intern("f", 3));
        assert_eq!(arity(f), 2);
        assert_eq!(name(g), "g");
    }

    #[test]
    #[serial]
    fn fresh_symbols_avoid_collisions() {
        reset_table();
        intern("c1", 0);
        let sk = fresh_skolem(0);
        assert_ne!(name(sk), "c1");
        assert!(is_skolem(sk));
    }

    #[test]
    #[serial]
    fn mark_and_replay() {
        reset_table();
        intern("old", 0);
        mark_for_new_symbols();
        let a = intern("new1", 1);
        let b = fresh_skolem(0);
        let added = new_symbols_since_mark();
        let ids: Vec<SymbolId> = added.iter().map(|(id, _, _)| *id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    #[serial]
    fn precedence_assignment_reports_missing() {
        reset_table();
        let f = intern("f", 2);
        set_kind(f, SymbolKind::Function);
        let g = intern("g", 1);
        set_kind(g, SymbolKind::Function);
        let missing = assign_precedence(&[("f".to_string(), 2)], true);
        assert_eq!(missing, vec!["g".to_string()]);
        assert!(precedence(f) > precedence(g));
    }
}
