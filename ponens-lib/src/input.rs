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

//! The declarative input language.
//!
//! A file is a sequence of directives — `set(flag).`, `clear(flag).`,
//! `assign(parm, value).`, `op(prec, fixity, sym).`,
//! `function_order([...]).`, `predicate_order([...]).` — and named lists
//! `formulas(label). ... end_of_list.` / `clauses(label). ... end_of_list.`
//! with labels usable, sos (or assumptions), demodulators, goals, hints,
//! actions, weights, kbo_weights, interpretations, given_selection,
//! keep_rules and delete_rules.  `%` starts a comment.  Option directives
//! apply in file order, so `set(prolog_style_variables)` changes how the
//! rest of the file is read.

use codespan_reporting::diagnostic::{Diagnostic, Label};
use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{digit1, multispace1},
    combinator::{map, opt, recognize},
    error::VerboseError,
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, pair, tuple},
};

use crate::actions::{ActionOp, ActionRule, Watched};
use crate::clause::parser::{self as cparser, identifier, IResult, Span, VarMap};
use crate::clause::{Attribute, Clause, Literal};
use crate::clausify::{clausify, Formula};
use crate::givselect::{ClauseProp, SelOrder, SelectorRule};
use crate::interp::Interp;
use crate::just::{Justification, Step};
use crate::search::{EvalRule, ProverInput};
use crate::symbols::{self, Fixity, SymbolKind};
use crate::weight::WeightRule;

fn comment(i: Span) -> IResult<Span, Span> {
    recognize(pair(tag("%"), opt(is_not("\n"))))(i)
}

/// Whitespace and comments.
fn sp(i: Span) -> IResult<Span, Span> {
    recognize(many0(alt((multispace1, comment))))(i)
}

fn token<'a, F, O>(mut inner: F) -> impl FnMut(Span<'a>) -> IResult<Span<'a>, O>
where
    F: FnMut(Span<'a>) -> IResult<Span<'a>, O>,
{
    move |i| {
        let (i, _) = sp(i)?;
        inner(i)
    }
}

fn sym(s: &'static str) -> impl FnMut(Span) -> IResult<Span, Span> {
    move |i| token(tag(s))(i)
}

fn period(i: Span) -> IResult<Span, Span> {
    sym(".")(i)
}

fn integer(i: Span) -> IResult<Span, i64> {
    map(
        token(recognize(pair(opt(tag("-")), digit1))),
        |s: Span| s.fragment().parse().unwrap(),
    )(i)
}

fn float(i: Span) -> IResult<Span, f64> {
    map(
        token(recognize(tuple((
            opt(tag("-")),
            digit1,
            opt(pair(tag("."), digit1)),
        )))),
        |s: Span| s.fragment().parse().unwrap(),
    )(i)
}

fn name(i: Span) -> IResult<Span, String> {
    map(token(identifier), |s: Span| s.fragment().to_string())(i)
}

// ----- formulas -----------------------------------------------------------

fn atom<'a>(i: Span<'a>, vars: &mut VarMap) -> IResult<Span<'a>, Formula> {
    let (i, _) = sp(i)?;
    let (i, lit) = cparser::literal(i, vars)?;
    let Literal { sign, atom, .. } = lit;
    let f = Formula::Atom(atom);
    Ok((i, if sign { f } else { Formula::Not(Box::new(f)) }))
}

fn unary<'a>(i: Span<'a>, vars: &mut VarMap) -> IResult<Span<'a>, Formula> {
    let (i, _) = sp(i)?;
    if let Ok((i, _)) = tag::<_, _, VerboseError<Span<'a>>>("-(")(i) {
        let (i, f) = formula(i, vars)?;
        let (i, _) = sym(")")(i)?;
        return Ok((i, Formula::Not(Box::new(f))));
    }
    if let Ok((rest, word)) = identifier(i) {
        match *word.fragment() {
            "all" | "exists" => {
                let (rest, v) = name(rest)?;
                let idx = vars.index(&v);
                let (rest, body) = unary(rest, vars)?;
                let f = if *word.fragment() == "all" {
                    Formula::All(idx, Box::new(body))
                } else {
                    Formula::Exists(idx, Box::new(body))
                };
                return Ok((rest, f));
            }
            _ => {}
        }
    }
    if let Ok((i, _)) = tag::<_, _, VerboseError<Span<'a>>>("(")(i) {
        let (i, f) = formula(i, vars)?;
        let (i, _) = sym(")")(i)?;
        return Ok((i, f));
    }
    atom(i, vars)
}

fn conj<'a>(i: Span<'a>, vars: &mut VarMap) -> IResult<Span<'a>, Formula> {
    let (mut i, mut f) = unary(i, vars)?;
    loop {
        let (rest, _) = sp(i)?;
        if let Ok((rest, _)) = tag::<_, _, VerboseError<Span<'a>>>("&")(rest) {
            let (rest, g) = unary(rest, vars)?;
            f = Formula::And(Box::new(f), Box::new(g));
            i = rest;
        } else {
            return Ok((i, f));
        }
    }
}

fn disj<'a>(i: Span<'a>, vars: &mut VarMap) -> IResult<Span<'a>, Formula> {
    let (mut i, mut f) = conj(i, vars)?;
    loop {
        let (rest, _) = sp(i)?;
        if let Ok((rest, _)) = tag::<_, _, VerboseError<Span<'a>>>("|")(rest) {
            let (rest, g) = conj(rest, vars)?;
            f = Formula::Or(Box::new(f), Box::new(g));
            i = rest;
        } else {
            return Ok((i, f));
        }
    }
}

fn imp<'a>(i: Span<'a>, vars: &mut VarMap) -> IResult<Span<'a>, Formula> {
    let (i, f) = disj(i, vars)?;
    let (rest, _) = sp(i)?;
    if let Ok((rest, _)) = tag::<_, _, VerboseError<Span<'a>>>("<->")(rest) {
        let (rest, g) = imp(rest, vars)?;
        return Ok((rest, Formula::Iff(Box::new(f), Box::new(g))));
    }
    if let Ok((rest, _)) = tag::<_, _, VerboseError<Span<'a>>>("->")(rest) {
        let (rest, g) = imp(rest, vars)?;
        return Ok((rest, Formula::Imp(Box::new(f), Box::new(g))));
    }
    Ok((i, f))
}

pub fn formula<'a>(i: Span<'a>, vars: &mut VarMap) -> IResult<Span<'a>, Formula> {
    imp(i, vars)
}

fn attributes<'a>(i: Span<'a>, vars: &mut VarMap) -> IResult<Span<'a>, Vec<Attribute>> {
    let mut attrs = Vec::new();
    let mut i = i;
    loop {
        let (rest, _) = sp(i)?;
        if !rest.fragment().starts_with('#') {
            return Ok((i, attrs));
        }
        let (rest, _) = tag::<_, _, VerboseError<Span<'a>>>("#")(rest)?;
        let (rest, aname) = token(identifier)(rest)?;
        let (rest, _) = sym("(")(rest)?;
        let (rest, attr) = match *aname.fragment() {
            "label" => {
                let (r, v) = name(rest)?;
                (r, Attribute::Label(v))
            }
            "bsub_hint_wt" => {
                let (r, v) = float(rest)?;
                (r, Attribute::BsubHintWt(v))
            }
            "answer" => {
                let (r, t) = cparser::term(rest, vars)?;
                (r, Attribute::Answer(t))
            }
            "action" => {
                let (r, t) = cparser::term(rest, vars)?;
                (r, Attribute::Action(t))
            }
            "action2" => {
                let (r, t) = cparser::term(rest, vars)?;
                (r, Attribute::Action2(t))
            }
            _ => {
                return Err(nom::Err::Error(VerboseError {
                    errors: vec![(rest, nom::error::VerboseErrorKind::Context("attribute"))],
                }))
            }
        };
        let (rest, _) = sym(")")(rest)?;
        attrs.push(attr);
        i = rest;
    }
}

/// Convert a parsed formula item into clauses, skolemizing if necessary.
fn formula_to_clauses(f: &Formula, attrs: &[Attribute]) -> Vec<Clause> {
    let mut out = clausify(f, &|| Justification::new(Step::Input));
    for c in &mut out {
        c.attributes = attrs.to_vec();
    }
    out
}

// ----- special list items -------------------------------------------------

fn weight_item(i: Span) -> IResult<Span, WeightRule> {
    let mut vars = VarMap::default();
    let (i, _) = sym("weight")(i)?;
    let (i, _) = sym("(")(i)?;
    let (i, pattern) = cparser::term(i, &mut vars)?;
    let (i, _) = sym(")")(i)?;
    let (i, _) = sym("=")(i)?;
    let (i, value) = float(i)?;
    let (i, _) = period(i)?;
    Ok((i, WeightRule { pattern, value }))
}

fn kbo_weight_item(i: Span) -> IResult<Span, (String, usize, i64)> {
    let (i, n) = name(i)?;
    let (i, _) = sym("=")(i)?;
    let (i, w) = integer(i)?;
    let (i, _) = period(i)?;
    Ok((i, (n, usize::MAX, w)))
}

fn selector_item(i: Span) -> IResult<Span, Result<SelectorRule, String>> {
    let (i, _) = sym("part")(i)?;
    let (i, _) = sym("(")(i)?;
    let (i, sel_name) = name(i)?;
    let (i, _) = sym(",")(i)?;
    let (i, pri) = name(i)?;
    let (i, _) = sym(",")(i)?;
    let (i, ord) = name(i)?;
    let (i, _) = sym(",")(i)?;
    let (i, prop) = name(i)?;
    let (i, _) = sym(")")(i)?;
    let (i, _) = sym("=")(i)?;
    let (i, n) = integer(i)?;
    let (i, _) = period(i)?;
    let rule = (|| {
        let high = match pri.as_str() {
            "high" => true,
            "low" => false,
            _ => return Err("given selection priority must be high or low".to_string()),
        };
        let order = SelOrder::from_name(&ord)
            .ok_or_else(|| "given selection order must be weight, age, or random".to_string())?;
        let prop = ClauseProp::from_name(&prop)
            .ok_or_else(|| "bad clause-property in given selection rule".to_string())?;
        if n <= 0 {
            return Err("given selection part must be positive".to_string());
        }
        Ok(SelectorRule {
            name: sel_name,
            high,
            order,
            prop,
            part: n as u64,
        })
    })();
    Ok((i, rule))
}

fn action_item(i: Span) -> IResult<Span, Result<ActionRule, String>> {
    let (i, watched) = name(i)?;
    let (i, _) = sym("=")(i)?;
    let (i, n) = integer(i)?;
    let (i, _) = sym("->")(i)?;
    let (i, opname) = name(i)?;
    let (i, op) = match opname.as_str() {
        "exit" => (i, Ok(ActionOp::Exit)),
        "set" | "clear" => {
            let (i, _) = sym("(")(i)?;
            let (i, flag) = name(i)?;
            let (i, _) = sym(")")(i)?;
            let op = if opname == "set" {
                ActionOp::SetFlag(flag)
            } else {
                ActionOp::ClearFlag(flag)
            };
            (i, Ok(op))
        }
        "assign" => {
            let (i, _) = sym("(")(i)?;
            let (i, parm) = name(i)?;
            let (i, _) = sym(",")(i)?;
            let (i, value) = token(recognize(tuple((
                opt(tag("-")),
                digit1,
                opt(pair(tag("."), digit1)),
            ))))(i)?;
            let (i, _) = sym(")")(i)?;
            (i, Ok(ActionOp::Assign(parm, value.fragment().to_string())))
        }
        "assert" => {
            let (i, _) = sym("(")(i)?;
            let (i, _) = sp(i)?;
            let (i, c) = cparser::clause(i)?;
            let (i, _) = sym(")")(i)?;
            (i, Ok(ActionOp::Assert(c)))
        }
        other => (i, Err(format!("unknown action operation {}", other))),
    };
    let (i, _) = period(i)?;
    let rule = op.and_then(|op| {
        let w = Watched::from_name(&watched)
            .ok_or_else(|| format!("unknown action statistic {}", watched))?;
        Ok(ActionRule::new(w, n, op))
    });
    Ok((i, rule))
}

fn eval_rule_item(i: Span) -> IResult<Span, Result<EvalRule, String>> {
    fn one(i: Span) -> IResult<Span, Result<EvalRule, String>> {
        let (i, what) = name(i)?;
        let (i, _) = sym(">")(i)?;
        let (i, n) = integer(i)?;
        let rule = match what.as_str() {
            "weight" => Ok(EvalRule::WeightGt(n as f64)),
            "literals" => Ok(EvalRule::LiteralsGt(n)),
            "depth" => Ok(EvalRule::DepthGt(n)),
            "vars" | "variables" => Ok(EvalRule::VarsGt(n)),
            other => Err(format!("unknown clause measure {}", other)),
        };
        Ok((i, rule))
    }
    let (mut i, mut rule) = one(i)?;
    loop {
        let (rest, _) = sp(i)?;
        if let Ok((rest, _)) = tag::<_, _, VerboseError<Span>>("&")(rest) {
            let (rest, r) = one(rest)?;
            rule = match (rule, r) {
                (Ok(a), Ok(b)) => Ok(EvalRule::And(Box::new(a), Box::new(b))),
                (Err(e), _) | (_, Err(e)) => Err(e),
            };
            i = rest;
        } else {
            break;
        }
    }
    let (i, _) = period(i)?;
    Ok((i, rule))
}

fn interp_item(i: Span) -> IResult<Span, Result<Interp, String>> {
    let (i, _) = sym("interpretation")(i)?;
    let (i, _) = sym("(")(i)?;
    let (i, size) = integer(i)?;
    let (i, _) = sym(",")(i)?;
    // the second argument (comments) is ignored
    let (i, _) = sym("[")(i)?;
    let (i, _) = opt(token(is_not("]")))(i)?;
    let (i, _) = sym("]")(i)?;
    let (i, _) = sym(",")(i)?;
    let (i, _) = sym("[")(i)?;
    let (i, entries) = separated_list0(sym(","), interp_entry)(i)?;
    let (i, _) = sym("]")(i)?;
    let (i, _) = sym(")")(i)?;
    let (i, _) = period(i)?;

    let interp = (|| {
        if size <= 0 {
            return Err("interpretation size must be positive".to_string());
        }
        let mut interp = Interp::new(size as usize);
        for (is_function, fname, arity, values) in entries {
            let expected = (size as usize).pow(arity as u32);
            if values.len() != expected {
                return Err(format!(
                    "{} needs {} table entries, got {}",
                    fname,
                    expected,
                    values.len()
                ));
            }
            let id = symbols::intern(&fname, arity);
            if is_function {
                if symbols::kind(id) == SymbolKind::Unspecified {
                    symbols::set_kind(id, SymbolKind::Function);
                }
                let table: Result<Vec<usize>, String> = values
                    .iter()
                    .map(|&v| {
                        if v >= 0 && v < size {
                            Ok(v as usize)
                        } else {
                            Err(format!("value {} outside domain of {}", v, fname))
                        }
                    })
                    .collect();
                interp.functions.insert(id, table?);
            } else {
                if symbols::kind(id) == SymbolKind::Unspecified {
                    symbols::set_kind(id, SymbolKind::Predicate);
                }
                interp
                    .relations
                    .insert(id, values.iter().map(|&v| v != 0).collect());
            }
        }
        Ok(interp)
    })();
    Ok((i, interp))
}

type InterpEntry = (bool, String, usize, Vec<i64>);

fn interp_entry(i: Span) -> IResult<Span, InterpEntry> {
    let (i, kind) = alt((sym("function"), sym("relation")))(i)?;
    let (i, _) = sym("(")(i)?;
    let (i, fname) = name(i)?;
    // the template arguments are underscores giving the arity
    let (i, arity) = map(
        opt(delimited(
            sym("("),
            separated_list1(sym(","), sym("_")),
            sym(")"),
        )),
        |args| args.map(|a| a.len()).unwrap_or(0),
    )(i)?;
    let (i, _) = sym(",")(i)?;
    let (i, values) = delimited(sym("["), separated_list0(sym(","), integer), sym("]"))(i)?;
    let (i, _) = sym(")")(i)?;
    Ok((i, (*kind.fragment() == "function", fname, arity, values)))
}

// ----- the driver ---------------------------------------------------------

fn diagnostic_at(source: &str, offset: usize, message: &str) -> Diagnostic<()> {
    let end = (offset + 1).min(source.len());
    Diagnostic::error()
        .with_message(message.to_string())
        .with_labels(vec![Label::primary((), offset..end)])
}

fn err_offset(e: &nom::Err<VerboseError<Span>>) -> usize {
    match e {
        nom::Err::Error(v) | nom::Err::Failure(v) => v
            .errors
            .first()
            .map(|(s, _)| s.location_offset())
            .unwrap_or(0),
        nom::Err::Incomplete(_) => 0,
    }
}

/// Parse a whole input file into a `ProverInput`.  Option directives are
/// applied in order; errors are reported as diagnostics against the
/// source.
pub fn parse_input(source: &str) -> Result<ProverInput, Vec<Diagnostic<()>>> {
    let mut input = ProverInput::default();
    let mut diags = Vec::new();
    let mut i = Span::new(source);

    cparser::set_prolog_variables(false);

    loop {
        let (rest, _) = sp(i).expect("sp never fails");
        if rest.fragment().is_empty() {
            break;
        }
        i = match parse_item(rest, &mut input, source, &mut diags) {
            Ok(next) => next,
            Err(offset) => {
                if diags.is_empty() {
                    diags.push(diagnostic_at(source, offset, "syntax error"));
                }
                break;
            }
        };
        if !diags.is_empty() {
            break;
        }
    }

    if diags.is_empty() {
        Ok(input)
    } else {
        Err(diags)
    }
}

fn parse_item<'a>(
    i: Span<'a>,
    input: &mut ProverInput,
    source: &str,
    diags: &mut Vec<Diagnostic<()>>,
) -> Result<Span<'a>, usize> {
    let bad = |e: &nom::Err<VerboseError<Span>>| err_offset(e);

    let (rest, word) = identifier(i).map_err(|e| bad(&e))?;
    match *word.fragment() {
        "set" | "clear" => {
            let (rest, _) = sym("(")(rest).map_err(|e| bad(&e))?;
            let (rest, flag) = name(rest).map_err(|e| bad(&e))?;
            let (rest, _) = sym(")")(rest).map_err(|e| bad(&e))?;
            let (rest, _) = period(rest).map_err(|e| bad(&e))?;
            let on = *word.fragment() == "set";
            if let Err(e) = input.options.change_flag(&flag, on) {
                diags.push(diagnostic_at(source, i.location_offset(), &e.to_string()));
            }
            if flag == "prolog_style_variables" {
                cparser::set_prolog_variables(on);
            }
            Ok(rest)
        }
        "assign" => {
            let (rest, _) = sym("(")(rest).map_err(|e| bad(&e))?;
            let (rest, parm) = name(rest).map_err(|e| bad(&e))?;
            let (rest, _) = sym(",")(rest).map_err(|e| bad(&e))?;
            let (rest, value) = token(recognize(tuple((
                opt(tag("-")),
                alt((digit1, identifier)),
                opt(pair(tag("."), digit1)),
            ))))(rest)
            .map_err(|e| bad(&e))?;
            let (rest, _) = sym(")")(rest).map_err(|e| bad(&e))?;
            let (rest, _) = period(rest).map_err(|e| bad(&e))?;
            if let Err(e) = input
                .options
                .assign_by_name(&parm, value.fragment())
            {
                diags.push(diagnostic_at(source, i.location_offset(), &e.to_string()));
            }
            Ok(rest)
        }
        "op" => {
            let (rest, _) = sym("(")(rest).map_err(|e| bad(&e))?;
            let (rest, _prec) = integer(rest).map_err(|e| bad(&e))?;
            let (rest, _) = sym(",")(rest).map_err(|e| bad(&e))?;
            let (rest, fixity) = name(rest).map_err(|e| bad(&e))?;
            let (rest, _) = sym(",")(rest).map_err(|e| bad(&e))?;
            let (rest, opname) = name(rest).map_err(|e| bad(&e))?;
            let (rest, _) = sym(")")(rest).map_err(|e| bad(&e))?;
            let (rest, _) = period(rest).map_err(|e| bad(&e))?;
            let f = match fixity.as_str() {
                "infix" => Fixity::Infix,
                "infix_left" => Fixity::InfixLeft,
                "infix_right" => Fixity::InfixRight,
                "prefix" => Fixity::Prefix,
                "postfix" => Fixity::Postfix,
                _ => Fixity::Ordinary,
            };
            for id in symbols::ids_with_name(&opname) {
                symbols::set_fixity(id, f);
            }
            Ok(rest)
        }
        "function_order" | "predicate_order" => {
            let (rest, _) = sym("(")(rest).map_err(|e| bad(&e))?;
            let (rest, names) = delimited(
                sym("["),
                separated_list0(sym(","), name),
                sym("]"),
            )(rest)
            .map_err(|e| bad(&e))?;
            let (rest, _) = sym(")")(rest).map_err(|e| bad(&e))?;
            let (rest, _) = period(rest).map_err(|e| bad(&e))?;
            let list = names.into_iter().map(|n| (n, usize::MAX)).collect();
            if *word.fragment() == "function_order" {
                input.function_order = list;
            } else {
                input.predicate_order = list;
            }
            Ok(rest)
        }
        "formulas" | "clauses" => {
            let (rest, _) = sym("(")(rest).map_err(|e| bad(&e))?;
            let (rest, label) = name(rest).map_err(|e| bad(&e))?;
            let (rest, _) = sym(")")(rest).map_err(|e| bad(&e))?;
            let (rest, _) = period(rest).map_err(|e| bad(&e))?;
            parse_list(rest, &label, input, source, diags)
        }
        _ => Err(i.location_offset()),
    }
}

fn at_end_of_list(i: Span) -> Option<Span> {
    let (rest, _) = sp(i).ok()?;
    let (rest, _) = tag::<_, _, VerboseError<Span>>("end_of_list")(rest).ok()?;
    let (rest, _) = period(rest).ok()?;
    Some(rest)
}

fn parse_list<'a>(
    mut i: Span<'a>,
    label: &str,
    input: &mut ProverInput,
    source: &str,
    diags: &mut Vec<Diagnostic<()>>,
) -> Result<Span<'a>, usize> {
    loop {
        if let Some(rest) = at_end_of_list(i) {
            return Ok(rest);
        }
        let (rest, _) = sp(i).map_err(|e| err_offset(&e))?;
        if rest.fragment().is_empty() {
            return Err(rest.location_offset());
        }
        let offset = rest.location_offset();
        i = match label {
            "usable" | "sos" | "assumptions" | "demodulators" | "hints" => {
                let mut vars = VarMap::default();
                let (rest, f) = formula(rest, &mut vars).map_err(|e| err_offset(&e))?;
                let (rest, attrs) = attributes(rest, &mut vars).map_err(|e| err_offset(&e))?;
                let (rest, _) = period(rest).map_err(|e| err_offset(&e))?;
                let clauses = formula_to_clauses(&f, &attrs);
                match label {
                    "usable" => input.usable.extend(clauses),
                    "sos" | "assumptions" => input.sos.extend(clauses),
                    "demodulators" => input.demods.extend(clauses),
                    "hints" => input.hints.extend(clauses),
                    _ => unreachable!(),
                }
                rest
            }
            "goals" => {
                let mut vars = VarMap::default();
                let (rest, f) = formula(rest, &mut vars).map_err(|e| err_offset(&e))?;
                let (rest, _attrs) = attributes(rest, &mut vars).map_err(|e| err_offset(&e))?;
                let (rest, _) = period(rest).map_err(|e| err_offset(&e))?;
                input.goals.push(f);
                rest
            }
            "weights" => {
                let (rest, rule) = weight_item(rest).map_err(|e| err_offset(&e))?;
                input.weights.rules.push(rule);
                rest
            }
            "kbo_weights" => {
                let (rest, w) = kbo_weight_item(rest).map_err(|e| err_offset(&e))?;
                input.kbo_weights.push(w);
                rest
            }
            "given_selection" => {
                let (rest, rule) = selector_item(rest).map_err(|e| err_offset(&e))?;
                match rule {
                    Ok(r) => input.given_selection.push(r),
                    Err(msg) => diags.push(diagnostic_at(source, offset, &msg)),
                }
                rest
            }
            "actions" => {
                let (rest, rule) = action_item(rest).map_err(|e| err_offset(&e))?;
                match rule {
                    Ok(r) => input.actions.push(r),
                    Err(msg) => diags.push(diagnostic_at(source, offset, &msg)),
                }
                rest
            }
            "keep_rules" | "delete_rules" => {
                let (rest, rule) = eval_rule_item(rest).map_err(|e| err_offset(&e))?;
                match rule {
                    Ok(r) => {
                        if label == "keep_rules" {
                            input.keep_rules.push(r);
                        } else {
                            input.delete_rules.push(r);
                        }
                    }
                    Err(msg) => diags.push(diagnostic_at(source, offset, &msg)),
                }
                rest
            }
            "interpretations" => {
                let (rest, interp) = interp_item(rest).map_err(|e| err_offset(&e))?;
                match interp {
                    Ok(x) => input.interps.push(x),
                    Err(msg) => diags.push(diagnostic_at(source, offset, &msg)),
                }
                rest
            }
            _ => {
                diags.push(diagnostic_at(
                    source,
                    offset,
                    &format!("unknown list label {}", label),
                ));
                return Err(offset);
            }
        };
        if !diags.is_empty() {
            return Err(offset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{Flag, Parm};
    use serial_test::serial;

    #[test]
    #[serial]
    fn directives_and_clause_lists() {
        symbols::reset_table();
        let src = r#"
            % a small problem
            set(print_kept).
            clear(back_subsume).
            assign(max_given, 100).

            clauses(usable).
              p(a).
              -p(x) | q(x).
            end_of_list.

            clauses(sos).
              -q(a).
            end_of_list.
        "#;
        let input = parse_input(src).unwrap();
        assert!(input.options.flag(Flag::PrintKept));
        assert!(!input.options.flag(Flag::BackSubsume));
        assert_eq!(input.options.parm(Parm::MaxGiven), 100);
        assert_eq!(input.usable.len(), 2);
        assert_eq!(input.sos.len(), 1);
        assert_eq!(input.usable[1].to_string(), "-p(x) | q(x).");
    }

    #[test]
    #[serial]
    fn formulas_are_clausified() {
        symbols::reset_table();
        let src = r#"
            formulas(sos).
              p(x) -> q(x).
              all x exists y r(x,y).
            end_of_list.
        "#;
        let input = parse_input(src).unwrap();
        assert_eq!(input.sos.len(), 2);
        assert_eq!(input.sos[0].to_string(), "-p(x) | q(x).");
        // the existential became a skolem function of x
        let r = &input.sos[1].literals[0];
        assert!(!r.atom.args()[1].is_variable());
    }

    #[test]
    #[serial]
    fn goals_are_collected_as_formulas() {
        symbols::reset_table();
        let src = r#"
            formulas(goals).
              p(a) & q(a).
            end_of_list.
        "#;
        let input = parse_input(src).unwrap();
        assert_eq!(input.goals.len(), 1);
        assert!(matches!(input.goals[0], Formula::And(_, _)));
    }

    #[test]
    #[serial]
    fn demodulator_list() {
        symbols::reset_table();
        let src = r#"
            clauses(demodulators).
              f(x,e) = x.
            end_of_list.
        "#;
        let input = parse_input(src).unwrap();
        assert_eq!(input.demods.len(), 1);
        assert_eq!(input.demods[0].to_string(), "f(x,e) = x.");
    }

    #[test]
    #[serial]
    fn weight_and_selection_lists() {
        symbols::reset_table();
        let src = r#"
            clauses(weights).
              weight(f(x,y)) = 7.
            end_of_list.

            clauses(given_selection).
              part(A, low, age, all) = 2.
              part(F, low, weight, false) = 3.
            end_of_list.

            clauses(delete_rules).
              weight > 50 & vars > 6.
            end_of_list.

            clauses(actions).
              given = 30 -> assign(max_weight, 25).
              kept = 100 -> exit.
            end_of_list.
        "#;
        let input = parse_input(src).unwrap();
        assert_eq!(input.weights.rules.len(), 1);
        assert_eq!(input.weights.rules[0].value, 7.0);
        assert_eq!(input.given_selection.len(), 2);
        assert_eq!(input.given_selection[0].part, 2);
        assert_eq!(input.delete_rules.len(), 1);
        assert_eq!(input.actions.len(), 2);
    }

    #[test]
    #[serial]
    fn interpretations_list() {
        symbols::reset_table();
        let src = r#"
            clauses(interpretations).
              interpretation(2, [], [
                function(f(_,_), [0,1,1,0]),
                relation(z(_), [1,0])
              ]).
            end_of_list.
        "#;
        let input = parse_input(src).unwrap();
        assert_eq!(input.interps.len(), 1);
        assert_eq!(input.interps[0].size, 2);
    }

    #[test]
    #[serial]
    fn prolog_style_variables_toggle_mid_file() {
        symbols::reset_table();
        let src = r#"
            set(prolog_style_variables).
            clauses(sos).
              p(X, a).
            end_of_list.
        "#;
        let input = parse_input(src).unwrap();
        cparser::set_prolog_variables(false);
        assert_eq!(input.sos.len(), 1);
        // X parsed as a variable
        assert!(input.sos[0].literals[0].atom.args()[0].is_variable());
    }

    #[test]
    #[serial]
    fn syntax_errors_are_diagnostics() {
        symbols::reset_table();
        let src = "clauses(sos). p(a. end_of_list.";
        assert!(parse_input(src).is_err());
    }

    #[test]
    #[serial]
    fn unknown_option_is_reported() {
        symbols::reset_table();
        let src = "set(no_such_flag).";
        assert!(parse_input(src).is_err());
    }
}
