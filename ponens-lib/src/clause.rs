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

//! Clauses, literals, clause lists, and the clause arena.
//!
//! A clause owns its literals exclusively; every index holds (id, position)
//! pairs instead of references.  A clause is a member of exactly one of
//! {Usable, Sos, Limbo, Disabled} — recorded in its `container` field —
//! and may orthogonally be a demodulator.  Disabled clauses keep their id
//! and justification so proofs can still be reconstructed.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str;

use crate::just::Justification;
use crate::symbols::{self, SymbolKind};
use crate::term::{Position, Term, VarId};

/// Monotonically assigned; 0 means not yet assigned.
pub type ClauseId = u32;

#[derive(Clone, Debug)]
pub struct Literal {
    pub sign: bool,
    pub atom: Term,
    /// Maximal in its clause under the active term order.
    pub maximal: bool,
    /// Selected for resolution by the literal-selection rule.
    pub selected: bool,
    /// For equality literals: left side greater under the term order.
    pub oriented: bool,
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        // the ordering marks are derived state, not identity
        self.sign == other.sign && self.atom == other.atom
    }
}

impl Eq for Literal {}

impl Literal {
    pub fn new(sign: bool, atom: Term) -> Literal {
        Literal {
            sign,
            atom,
            maximal: false,
            selected: false,
            oriented: false,
        }
    }

    pub fn is_equality(&self) -> bool {
        self.atom.symbol() == Some(symbols::eq_symbol())
    }

    pub fn eq_sides(&self) -> Option<(&Term, &Term)> {
        if self.is_equality() {
            Some((&self.atom.args()[0], &self.atom.args()[1]))
        } else {
            None
        }
    }

    /// The same literal with the equality arguments swapped.
    pub fn flipped(&self) -> Option<Literal> {
        let (l, r) = self.eq_sides()?;
        Some(Literal::new(
            self.sign,
            Term::app(symbols::eq_symbol(), vec![r.clone(), l.clone()]),
        ))
    }

    pub fn variables(&self) -> HashSet<VarId> {
        self.atom.variables()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Container {
    None,
    Usable,
    Sos,
    Limbo,
    Disabled,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Semantics {
    NotEvaluated,
    NotEvaluable,
    True,
    False,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Attribute {
    Label(String),
    Answer(Term),
    BsubHintWt(f64),
    Action(Term),
    Action2(Term),
    Properties(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Clause {
    pub id: ClauseId,
    pub literals: Vec<Literal>,
    pub weight: f64,
    pub justification: Justification,
    pub attributes: Vec<Attribute>,
    pub used: bool,
    pub initial: bool,
    pub subsumer: bool,
    pub normal_vars: bool,
    pub is_formula: bool,
    pub semantics: Semantics,
    /// Index into the hints list of the hint this clause matched.
    pub matching_hint: Option<usize>,
    /// Positions barred from paramodulation under the basic restriction:
    /// (literal index, path).  A path that is a prefix of a position bars
    /// that position.
    pub nonbasic: Vec<(usize, Position)>,
    pub container: Container,
    pub is_demodulator: bool,
}

impl Clause {
    pub fn new(literals: Vec<Literal>, justification: Justification) -> Clause {
        Clause {
            id: 0,
            literals,
            weight: 0.0,
            justification,
            attributes: Vec::new(),
            used: false,
            initial: false,
            subsumer: false,
            normal_vars: false,
            is_formula: false,
            semantics: Semantics::NotEvaluated,
            matching_hint: None,
            nonbasic: Vec::new(),
            container: Container::None,
            is_demodulator: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn is_unit(&self) -> bool {
        self.literals.len() == 1
    }

    pub fn is_positive(&self) -> bool {
        self.literals.iter().all(|l| l.sign)
    }

    pub fn is_negative(&self) -> bool {
        self.literals.iter().all(|l| !l.sign)
    }

    pub fn is_horn(&self) -> bool {
        self.literals.iter().filter(|l| l.sign).count() <= 1
    }

    pub fn variables(&self) -> HashSet<VarId> {
        let mut set = HashSet::new();
        for l in &self.literals {
            l.atom.collect_variables(&mut set);
        }
        set
    }

    pub fn max_var(&self) -> Option<VarId> {
        self.literals.iter().filter_map(|l| l.atom.max_var()).max()
    }

    pub fn symbol_count(&self) -> usize {
        self.literals.iter().map(|l| l.atom.symbol_count() + 1).sum()
    }

    pub fn depth(&self) -> usize {
        self.literals.iter().map(|l| l.atom.depth()).max().unwrap_or(0)
    }

    /// Renumber variables in order of first occurrence; sets `normal_vars`.
    pub fn renumber_variables(&mut self) {
        let mut map: HashMap<VarId, VarId> = HashMap::new();
        let mut next = 0;
        for l in &self.literals {
            for (_, sub) in l.atom.subterms() {
                if let Term::Variable(v) = sub {
                    map.entry(*v).or_insert_with(|| {
                        let n = next;
                        next += 1;
                        n
                    });
                }
            }
        }
        for l in &mut self.literals {
            l.atom = l.atom.map_vars(&|v| map[&v]);
        }
        self.normal_vars = true;
    }

    /// A copy with variables shifted so the clause shares none with a
    /// partner whose maximum variable is `below`.
    pub fn rename_apart(&self, below: Option<VarId>) -> Clause {
        let offset = below.map(|v| v + 1).unwrap_or(0);
        let mut c = self.clone();
        for l in &mut c.literals {
            l.atom = l.atom.shift_vars(offset);
        }
        c
    }

    /// True literal (an instance of x = x or the constant $T) or a
    /// complementary pair makes the clause a tautology.
    pub fn is_tautology(&self) -> bool {
        for l in &self.literals {
            if l.sign {
                if let Some((a, b)) = l.eq_sides() {
                    if a == b {
                        return true;
                    }
                }
                if l.atom.symbol().map(symbols::name).as_deref() == Some("$T") {
                    return true;
                }
            }
        }
        self.literals.iter().any(|l| {
            l.sign
                && self
                    .literals
                    .iter()
                    .any(|m| !m.sign && m.atom == l.atom)
        })
    }

    pub fn label(&self) -> Option<&str> {
        self.attributes.iter().find_map(|a| match a {
            Attribute::Label(s) => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn bsub_hint_wt(&self) -> Option<f64> {
        self.attributes.iter().find_map(|a| match a {
            Attribute::BsubHintWt(w) => Some(*w),
            _ => None,
        })
    }

    pub fn action2_terms(&self) -> Vec<&Term> {
        self.attributes
            .iter()
            .filter_map(|a| match a {
                Attribute::Action2(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    /// Rough live-byte estimate used for the max_megs accounting.
    pub fn byte_estimate(&self) -> usize {
        std::mem::size_of::<Clause>() + self.symbol_count() * std::mem::size_of::<Term>()
    }
}

/// Literal-list identity (ignores ids, weights, marks).
pub fn clause_ident(a: &Clause, b: &Clause) -> bool {
    a.literals == b.literals
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sign {
            write!(f, "{}", self.atom)
        } else if let Some((l, r)) = self.eq_sides() {
            write!(f, "{} != {}", l, r)
        } else {
            write!(f, "-{}", self.atom)
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.literals.is_empty() {
            write!(f, "$F")?;
        } else {
            let lits: Vec<String> = self.literals.iter().map(|l| l.to_string()).collect();
            write!(f, "{}", lits.join(" | "))?;
        }
        for a in &self.attributes {
            match a {
                Attribute::Label(s) => write!(f, " # label({})", s)?,
                Attribute::Answer(t) => write!(f, " # answer({})", t)?,
                Attribute::BsubHintWt(w) => write!(f, " # bsub_hint_wt({})", w)?,
                Attribute::Action(t) => write!(f, " # action({})", t)?,
                Attribute::Action2(t) => write!(f, " # action2({})", t)?,
                Attribute::Properties(s) => write!(f, " # props({})", s)?,
            }
        }
        write!(f, ".")
    }
}

/// A named, ordered bag of clause ids.  Membership of the exclusive
/// containers is tracked on the clause itself; the list keeps the order
/// (Limbo is a queue, proofs print in id order).
#[derive(Clone, Debug)]
pub struct Clist {
    pub name: &'static str,
    ids: Vec<ClauseId>,
}

impl Clist {
    pub fn new(name: &'static str) -> Clist {
        Clist {
            name,
            ids: Vec::new(),
        }
    }

    pub fn append(&mut self, id: ClauseId) {
        self.ids.push(id);
    }

    pub fn remove(&mut self, id: ClauseId) -> bool {
        match self.ids.iter().position(|&x| x == id) {
            Some(i) => {
                self.ids.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn first(&self) -> Option<ClauseId> {
        self.ids.first().copied()
    }

    pub fn contains(&self, id: ClauseId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ClauseId> + '_ {
        self.ids.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<ClauseId> {
        self.ids.clone()
    }
}

/// Owner of every kept clause, keyed by id.  Ids are assigned here and are
/// strictly increasing in keep order.
#[derive(Clone, Debug, Default)]
pub struct ClauseArena {
    map: HashMap<ClauseId, Clause>,
    next_id: ClauseId,
}

impl ClauseArena {
    pub fn new() -> ClauseArena {
        ClauseArena {
            map: HashMap::new(),
            next_id: 1,
        }
    }

    /// Assign the next id to `c` and take ownership.
    pub fn insert(&mut self, mut c: Clause) -> ClauseId {
        debug_assert_eq!(c.id, 0, "clause already has an id");
        c.id = self.next_id;
        self.next_id += 1;
        let id = c.id;
        self.map.insert(id, c);
        id
    }

    /// Insert a clause that already carries an id (wire decode), or
    /// refresh the stored copy of a registered clause.
    pub fn insert_with_id(&mut self, c: Clause) {
        self.next_id = self.next_id.max(c.id + 1);
        self.map.insert(c.id, c);
    }

    /// Hand out the next id without storing anything yet.
    pub fn allocate_id(&mut self) -> ClauseId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn get(&self, id: ClauseId) -> &Clause {
        &self.map[&id]
    }

    pub fn get_mut(&mut self, id: ClauseId) -> &mut Clause {
        self.map.get_mut(&id).expect("clause id not in arena")
    }

    pub fn try_get(&self, id: ClauseId) -> Option<&Clause> {
        self.map.get(&id)
    }

    pub fn ids_assigned(&self) -> ClauseId {
        self.next_id - 1
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl str::FromStr for Term {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let span = parser::Span::new(s);
        let mut vars = parser::VarMap::default();
        match parser::term(span, &mut vars) {
            Ok((_, t)) => Ok(t),
            Err(e) => Err(format!("{}", e)),
        }
    }
}

impl str::FromStr for Literal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let span = parser::Span::new(s);
        let mut vars = parser::VarMap::default();
        match parser::literal(span, &mut vars) {
            Ok((_, l)) => Ok(l),
            Err(e) => Err(format!("{}", e)),
        }
    }
}

impl str::FromStr for Clause {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parser::clause(parser::Span::new(s)) {
            Ok((_, c)) => Ok(c),
            Err(e) => Err(format!("{}", e)),
        }
    }
}

/// Parser for terms, literals and clauses in the standard first-order
/// syntax.  Variables are names starting with u..z; everything else is a
/// function or predicate symbol.  The surrounding input language lives in
/// the `input` module and builds on these.
pub mod parser {
    use super::*;

    use nom::{
        branch::alt,
        bytes::complete::tag,
        character::complete::{alpha1, alphanumeric1, digit1, space0},
        combinator::{map, opt, recognize},
        error::VerboseError,
        multi::{many0, separated_list1},
        sequence::{delimited, pair, preceded, terminated},
    };
    use nom_locate::LocatedSpan;

    pub type Span<'a> = LocatedSpan<&'a str>;

    /// Redeclaration that uses VerboseError instead of the default nom::Error.
    pub type IResult<T, O> = nom::IResult<T, O, VerboseError<T>>;

    /// Maps variable names to indices in order of first occurrence, so
    /// each clause gets normalised variable numbering on parse.
    #[derive(Default)]
    pub struct VarMap {
        names: Vec<String>,
    }

    impl VarMap {
        pub fn index(&mut self, name: &str) -> VarId {
            match self.names.iter().position(|n| n == name) {
                Some(i) => i,
                None => {
                    self.names.push(name.to_string());
                    self.names.len() - 1
                }
            }
        }
    }

    fn ws<'a, F: 'a, O>(inner: F) -> impl FnMut(Span<'a>) -> IResult<Span<'a>, O>
    where
        F: FnMut(Span<'a>) -> IResult<Span<'a>, O>,
    {
        delimited(space0, inner, space0)
    }

    pub fn identifier(i: Span) -> IResult<Span, Span> {
        recognize(pair(
            alt((alpha1, tag("$"), tag("_"))),
            many0(alt((alphanumeric1, tag("_")))),
        ))(i)
    }

    /// With prolog_style_variables, variables start with an uppercase
    /// letter instead of u..z.  Parse state, like the symbol table.
    static PROLOG_VARS: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

    pub fn set_prolog_variables(on: bool) {
        PROLOG_VARS.store(on, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn is_variable_name(name: &str) -> bool {
        let first = match name.chars().next() {
            Some(c) => c,
            None => return false,
        };
        if PROLOG_VARS.load(std::sync::atomic::Ordering::SeqCst) {
            first.is_ascii_uppercase() || first == '_'
        } else {
            ('u'..='z').contains(&first)
        }
    }

    pub fn term<'a>(i: Span<'a>, vars: &mut VarMap) -> IResult<Span<'a>, Term> {
        let (i, _) = space0(i)?;
        if let Ok((i, num)) = digit1::<Span<'a>, VerboseError<Span<'a>>>(i) {
            let sym = symbols::intern(num.fragment(), 0);
            if symbols::kind(sym) == SymbolKind::Unspecified {
                symbols::set_kind(sym, SymbolKind::Function);
            }
            return Ok((i, Term::constant(sym)));
        }
        let (i, name) = identifier(i)?;
        let (i, args) = opt(delimited(
            ws(tag("(")),
            separated_list1(ws(tag(",")), |x| term(x, vars)),
            ws(tag(")")),
        ))(i)?;
        let t = match args {
            None if is_variable_name(name.fragment()) => Term::var(vars.index(name.fragment())),
            None => {
                let sym = symbols::intern(name.fragment(), 0);
                if symbols::kind(sym) == SymbolKind::Unspecified {
                    symbols::set_kind(sym, SymbolKind::Function);
                }
                Term::constant(sym)
            }
            Some(args) => {
                let sym = symbols::intern(name.fragment(), args.len());
                if symbols::kind(sym) == SymbolKind::Unspecified {
                    symbols::set_kind(sym, SymbolKind::Function);
                }
                Term::app(sym, args)
            }
        };
        Ok((i, t))
    }

    /// A literal: an atom, a negated atom, or an (in)equality.
    pub fn literal<'a>(i: Span<'a>, vars: &mut VarMap) -> IResult<Span<'a>, Literal> {
        let (i, _) = space0(i)?;
        let (i, neg) = opt(tag("-"))(i)?;
        let (i, lhs) = term(i, vars)?;
        let (i, eq) = opt(pair(ws(alt((tag("!="), tag("=")))), |x| term(x, vars)))(i)?;
        let lit = match eq {
            Some((op, rhs)) => {
                let atom = Term::app(symbols::eq_symbol(), vec![lhs, rhs]);
                let positive = *op.fragment() == "=";
                Literal::new(positive != neg.is_some(), atom)
            }
            None => {
                // whatever heads the atom is a predicate symbol
                if let Some(sym) = lhs.symbol() {
                    symbols::set_kind(sym, SymbolKind::Predicate);
                }
                Literal::new(neg.is_none(), lhs)
            }
        };
        Ok((i, lit))
    }

    fn quoted_or_ident(i: Span) -> IResult<Span, String> {
        alt((
            map(
                delimited(tag("\""), nom::bytes::complete::is_not("\""), tag("\"")),
                |s: Span| s.fragment().to_string(),
            ),
            map(identifier, |s: Span| s.fragment().to_string()),
        ))(i)
    }

    fn float(i: Span) -> IResult<Span, f64> {
        map(
            recognize(pair(
                opt(tag("-")),
                pair(digit1, opt(pair(tag("."), digit1))),
            )),
            |s: Span| s.fragment().parse().unwrap(),
        )(i)
    }

    fn attribute<'a>(i: Span<'a>, vars: &mut VarMap) -> IResult<Span<'a>, Attribute> {
        let (i, _) = ws(tag("#"))(i)?;
        let (i, name) = identifier(i)?;
        match *name.fragment() {
            "label" => map(
                delimited(ws(tag("(")), quoted_or_ident, ws(tag(")"))),
                Attribute::Label,
            )(i),
            "bsub_hint_wt" => map(
                delimited(ws(tag("(")), float, ws(tag(")"))),
                Attribute::BsubHintWt,
            )(i),
            "answer" => {
                let (i, t) = delimited(ws(tag("(")), |x| term(x, vars), ws(tag(")")))(i)?;
                Ok((i, Attribute::Answer(t)))
            }
            "action" => {
                let (i, t) = delimited(ws(tag("(")), |x| term(x, vars), ws(tag(")")))(i)?;
                Ok((i, Attribute::Action(t)))
            }
            "action2" => {
                let (i, t) = delimited(ws(tag("(")), |x| term(x, vars), ws(tag(")")))(i)?;
                Ok((i, Attribute::Action2(t)))
            }
            _ => Err(nom::Err::Error(nom::error::VerboseError {
                errors: vec![(i, nom::error::VerboseErrorKind::Context("attribute"))],
            })),
        }
    }

    pub fn clause(i: Span) -> IResult<Span, Clause> {
        let mut vars = VarMap::default();
        let (i, lits) = separated_list1(ws(tag("|")), |x| literal(x, &mut vars))(i)?;
        let (i, attrs) = many0(|x| attribute(x, &mut vars))(i)?;
        let (i, _) = opt(preceded(space0, tag(".")))(i)?;
        // `$F` alone denotes the empty clause
        let lits = if lits.len() == 1
            && lits[0].sign
            && lits[0].atom.symbol().map(symbols::name).as_deref() == Some("$F")
        {
            Vec::new()
        } else {
            lits
        };
        let mut c = Clause::new(lits, Justification::default());
        c.attributes = attrs;
        c.normal_vars = true;
        Ok((i, c))
    }

    /// Convenience used by tests and the input module.
    pub fn parse_clause_str(s: &str) -> Result<Clause, String> {
        match terminated(clause, space0)(Span::new(s)) {
            Ok((_, c)) => Ok(c),
            Err(e) => Err(format!("{}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn parse_and_display_clause() {
        symbols::reset_table();
        let c: Clause = "p(x) | -q(x,a).".parse().unwrap();
        assert_eq!(c.literals.len(), 2);
        assert!(c.literals[0].sign);
        assert!(!c.literals[1].sign);
        assert_eq!(c.to_string(), "p(x) | -q(x,a).");
    }

    #[test]
    #[serial]
    fn parse_equalities() {
        symbols::reset_table();
        let c: Clause = "f(x,y) = f(y,x).".parse().unwrap();
        assert!(c.literals[0].is_equality());
        assert!(c.literals[0].sign);
        let d: Clause = "a != b.".parse().unwrap();
        assert!(!d.literals[0].sign);
        assert!(d.literals[0].is_equality());
        assert_eq!(d.to_string(), "a != b.");
    }

    #[test]
    #[serial]
    fn parse_attributes() {
        symbols::reset_table();
        let c: Clause = "p(a) # label(lemma_one) # bsub_hint_wt(3.5).".parse().unwrap();
        assert_eq!(c.label(), Some("lemma_one"));
        assert_eq!(c.bsub_hint_wt(), Some(3.5));
    }

    #[test]
    #[serial]
    fn renumbering_normalises() {
        symbols::reset_table();
        let mut c: Clause = "p(z,y) | q(y,x).".parse().unwrap();
        // force odd numbering, then renumber
        for l in &mut c.literals {
            l.atom = l.atom.shift_vars(7);
        }
        c.renumber_variables();
        assert_eq!(c.max_var(), Some(2));
        assert_eq!(c.to_string(), "p(x,y) | q(y,z).");
    }

    #[test]
    #[serial]
    fn tautology_detection() {
        symbols::reset_table();
        let c: Clause = "p(x) | -p(x).".parse().unwrap();
        assert!(c.is_tautology());
        let d: Clause = "f(x) = f(x).".parse().unwrap();
        assert!(d.is_tautology());
        let e: Clause = "p(x) | -p(a).".parse().unwrap();
        assert!(!e.is_tautology());
    }

    #[test]
    #[serial]
    fn arena_ids_are_monotone() {
        symbols::reset_table();
        let mut arena = ClauseArena::new();
        let a = arena.insert("p(a).".parse().unwrap());
        let b = arena.insert("q(a).".parse().unwrap());
        assert!(a < b);
        assert_eq!(arena.ids_assigned(), b);
        assert_eq!(arena.get(a).to_string(), "p(a).");
    }

    #[test]
    #[serial]
    fn empty_clause_parses_and_prints() {
        symbols::reset_table();
        let c: Clause = "$F.".parse().unwrap();
        assert!(c.is_empty());
        assert_eq!(c.to_string(), "$F.");
    }
}
