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

//! Finite interpretations and semantic clause evaluation.
//!
//! An interpretation assigns tables over a finite domain to function and
//! relation symbols.  A clause evaluates to true when it holds under every
//! assignment of domain elements to its variables; evaluation is skipped
//! (not evaluable) when a symbol is uninterpreted or the assignment space
//! exceeds the evaluation limit.  With no interpretations at all, the
//! default interpretation makes positive literals true.

use std::collections::{HashMap, HashSet};

use crate::clause::{Clause, Literal, Semantics};
use crate::options::{Options, Parm, StringParm};
use crate::symbols::{self, SymbolId};
use crate::term::Term;

#[derive(Clone, Debug)]
pub struct Interp {
    pub size: usize,
    /// Row-major tables: a symbol of arity k has size^k entries.
    pub functions: HashMap<SymbolId, Vec<usize>>,
    pub relations: HashMap<SymbolId, Vec<bool>>,
}

impl Interp {
    pub fn new(size: usize) -> Interp {
        Interp {
            size,
            functions: HashMap::new(),
            relations: HashMap::new(),
        }
    }

    fn table_index(&self, args: &[usize]) -> usize {
        let mut i = 0;
        for &a in args {
            i = i * self.size + a;
        }
        i
    }

    fn eval_term(&self, t: &Term, assignment: &HashMap<usize, usize>) -> Option<usize> {
        match t {
            Term::Variable(v) => assignment.get(v).copied(),
            Term::Application { symbol, args } => {
                let mut vals = Vec::with_capacity(args.len());
                for a in args {
                    vals.push(self.eval_term(a, assignment)?);
                }
                let table = self.functions.get(symbol)?;
                table.get(self.table_index(&vals)).copied()
            }
        }
    }

    fn eval_literal(&self, l: &Literal, assignment: &HashMap<usize, usize>) -> Option<bool> {
        let truth = if l.is_equality() {
            let (a, b) = l.eq_sides().unwrap();
            self.eval_term(a, assignment)? == self.eval_term(b, assignment)?
        } else {
            match &l.atom {
                Term::Application { symbol, args } => {
                    let mut vals = Vec::with_capacity(args.len());
                    for a in args {
                        vals.push(self.eval_term(a, assignment)?);
                    }
                    let table = self.relations.get(symbol)?;
                    *table.get(self.table_index(&vals))?
                }
                Term::Variable(_) => return None,
            }
        };
        Some(if l.sign { truth } else { !truth })
    }

    /// True iff the clause holds under every variable assignment.
    /// None when a symbol is uninterpreted.
    pub fn eval_clause(&self, lits: &[Literal]) -> Option<bool> {
        let mut vars: HashSet<usize> = HashSet::new();
        for l in lits {
            l.atom.collect_variables(&mut vars);
        }
        let vars: Vec<usize> = vars.into_iter().collect();
        let mut assignment: HashMap<usize, usize> = HashMap::new();

        fn go(
            interp: &Interp,
            lits: &[Literal],
            vars: &[usize],
            i: usize,
            assignment: &mut HashMap<usize, usize>,
        ) -> Option<bool> {
            if i == vars.len() {
                for l in lits {
                    if interp.eval_literal(l, assignment)? {
                        return Some(true);
                    }
                }
                return Some(false);
            }
            for d in 0..interp.size {
                assignment.insert(vars[i], d);
                match go(interp, lits, vars, i + 1, assignment) {
                    Some(true) => {}
                    other => {
                        assignment.remove(&vars[i]);
                        return other;
                    }
                }
            }
            assignment.remove(&vars[i]);
            Some(true)
        }

        go(self, lits, &vars, 0, &mut assignment)
    }

    /// A new constant gets some fixed value so evaluation keeps working.
    pub fn extend_with_constant(&mut self, sym: SymbolId) {
        self.functions.entry(sym).or_insert_with(|| vec![0]);
    }
}

fn evals_allowed(interp: &Interp, nvars: usize, opts: &Options) -> bool {
    // eval_var_limit bounds the variable count directly and overrides the
    // assignment-count limit
    let var_limit = opts.parm(Parm::EvalVarLimit);
    if var_limit != -1 {
        return nvars as i64 <= var_limit;
    }
    let limit = opts.parm(Parm::EvalLimit);
    if limit == -1 {
        return true;
    }
    let mut required: i64 = 1;
    for _ in 0..nvars {
        required = match required.checked_mul(interp.size as i64) {
            Some(x) => x,
            None => return false,
        };
    }
    required <= limit
}

/// Evaluate the clause in the compiled interpretations and set its
/// semantics field.
pub fn set_semantics(c: &mut Clause, interps: &[Interp], opts: &Options) {
    if c.semantics != Semantics::NotEvaluated {
        return;
    }
    if interps.is_empty() {
        c.semantics = if c.is_negative() && !c.literals.is_empty() {
            Semantics::False
        } else {
            Semantics::True
        };
        return;
    }
    let nvars = c.variables().len();
    let false_in_all = opts.stringparm(StringParm::MultipleInterps) == "false_in_all";

    let mut any_true = false;
    let mut any_false = false;
    let mut any_unknown = false;
    for interp in interps {
        let value = if evals_allowed(interp, nvars, opts) {
            interp.eval_clause(&c.literals)
        } else {
            None
        };
        match value {
            Some(true) => any_true = true,
            Some(false) => any_false = true,
            None => any_unknown = true,
        }
    }
    c.semantics = if false_in_all {
        if any_false && !any_true && !any_unknown {
            Semantics::False
        } else if any_true {
            Semantics::True
        } else {
            Semantics::NotEvaluable
        }
    } else if any_false {
        Semantics::False
    } else if any_unknown {
        Semantics::NotEvaluable
    } else {
        Semantics::True
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::Clause;
    use serial_test::serial;

    fn clause(s: &str) -> Clause {
        s.parse().unwrap()
    }

    /// Z2 with addition and a "is zero" relation.
    fn z2() -> Interp {
        let mut i = Interp::new(2);
        let plus = symbols::intern("f", 2);
        i.functions.insert(plus, vec![0, 1, 1, 0]);
        let zero = symbols::intern("0", 0);
        i.functions.insert(zero, vec![0]);
        let z = symbols::intern("z", 1);
        i.relations.insert(z, vec![true, false]);
        i
    }

    #[test]
    #[serial]
    fn ground_evaluation() {
        symbols::reset_table();
        let i = z2();
        let c = clause("z(f(0,0)).");
        assert_eq!(i.eval_clause(&c.literals), Some(true));
        let d = clause("-z(0).");
        assert_eq!(i.eval_clause(&d.literals), Some(false));
    }

    #[test]
    #[serial]
    fn universal_evaluation() {
        symbols::reset_table();
        let i = z2();
        // x + x = 0 holds in Z2
        let c = clause("z(f(x,x)).");
        assert_eq!(i.eval_clause(&c.literals), Some(true));
        // x + 0 is not always 1
        let d = clause("-z(f(x,0)).");
        assert_eq!(i.eval_clause(&d.literals), Some(false));
    }

    #[test]
    #[serial]
    fn uninterpreted_symbols_are_not_evaluable() {
        symbols::reset_table();
        let i = z2();
        let c = clause("p(x).");
        assert_eq!(i.eval_clause(&c.literals), None);
    }

    #[test]
    #[serial]
    fn equality_is_interpreted() {
        symbols::reset_table();
        let i = z2();
        let c = clause("f(x,x) = 0.");
        assert_eq!(i.eval_clause(&c.literals), Some(true));
    }

    #[test]
    #[serial]
    fn semantics_field_with_and_without_interps() {
        symbols::reset_table();
        let opts = Options::new();
        // default interpretation: negative clauses are false
        let mut c = clause("-p(a).");
        set_semantics(&mut c, &[], &opts);
        assert_eq!(c.semantics, Semantics::False);
        let mut d = clause("p(a) | -q(a).");
        set_semantics(&mut d, &[], &opts);
        assert_eq!(d.semantics, Semantics::True);

        let i = z2();
        let mut e = clause("-z(f(0,0)).");
        set_semantics(&mut e, &[i], &opts);
        assert_eq!(e.semantics, Semantics::False);
    }
}
