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

//! The given-clause search loop.
//!
//! Each iteration picks a given clause from SOS, moves it to Usable,
//! applies the enabled inference rules against the clashable index, and
//! funnels every child through the processing pipeline: demodulate,
//! simplify, delete-or-keep.  Kept clauses wait in Limbo until the
//! back-simplification pass (back subsumption, back demodulation, back
//! unit deletion) has run, then settle into SOS.  Resource limits and
//! interrupts are polled at loop boundaries and on every processed
//! clause; they unwind as an `Outcome` instead of an error.

use std::collections::HashMap;
use std::time::Instant;

use serde::Serialize;

use crate::actions::{self, ActionOp, ActionRule, Actions, Watched};
use crate::clause::{Attribute, Clause, ClauseArena, ClauseId, Clist, Container, Literal};
use crate::clausify::Formula;
use crate::demod::{
    back_demodulatable, check_input_demodulator, demodulate_clause, demodulator_type,
    index_back_demod, DemodIndex, DemodKind,
};
use crate::error::{FatalError, Outcome};
use crate::features::FeatureSpec;
use crate::fpa::FpaIndex;
use crate::givselect::{rules_from_options, GivSelect, SelectorRule};
use crate::hints::HintsIndex;
use crate::interp::{set_semantics, Interp};
use crate::interrupt;
use crate::just::{Justification, Step};
use crate::options::{Change, Flag, FloatParm, Options, Parm, StringParm};
use crate::order::{
    self, check_kbo_weights, mark_maximal_literals, mark_selected_literals, orient_equalities,
    TermOrder,
};
use crate::paramod::para_from_into;
use crate::proofs;
use crate::resolve::{
    binary_factors, binary_resolution, hyper_resolution, ur_resolution, ClashIndex, ResVariant,
};
use crate::subsume::LiteralIndex;
use crate::symbols::{self, UnifTheory};
use crate::term::{self, Position, Term};
use crate::unify::{unify, Bindings};
use crate::weight::{clause_weight, WeightRules};

/// A compiled keep/delete rule over clauses.
#[derive(Clone, Debug)]
pub enum EvalRule {
    WeightGt(f64),
    LiteralsGt(i64),
    DepthGt(i64),
    VarsGt(i64),
    And(Box<EvalRule>, Box<EvalRule>),
}

impl EvalRule {
    pub fn eval(&self, c: &Clause) -> bool {
        match self {
            EvalRule::WeightGt(w) => c.weight > *w,
            EvalRule::LiteralsGt(n) => c.literals.len() as i64 > *n,
            EvalRule::DepthGt(n) => c.depth() as i64 > *n,
            EvalRule::VarsGt(n) => c.variables().len() as i64 > *n,
            EvalRule::And(a, b) => a.eval(c) && b.eval(c),
        }
    }
}

/// Everything the core needs to run one search.
pub struct ProverInput {
    pub usable: Vec<Clause>,
    pub sos: Vec<Clause>,
    pub demods: Vec<Clause>,
    pub goals: Vec<Formula>,
    pub hints: Vec<Clause>,
    pub weights: WeightRules,
    pub kbo_weights: Vec<(String, usize, i64)>,
    pub function_order: Vec<(String, usize)>,
    pub predicate_order: Vec<(String, usize)>,
    pub actions: Vec<ActionRule>,
    pub interps: Vec<Interp>,
    pub given_selection: Vec<SelectorRule>,
    pub keep_rules: Vec<EvalRule>,
    pub delete_rules: Vec<EvalRule>,
    pub options: Options,
    pub xproofs: bool,
}

impl Default for ProverInput {
    fn default() -> Self {
        ProverInput {
            usable: Vec::new(),
            sos: Vec::new(),
            demods: Vec::new(),
            goals: Vec::new(),
            hints: Vec::new(),
            weights: WeightRules::default(),
            kbo_weights: Vec::new(),
            function_order: Vec::new(),
            predicate_order: Vec::new(),
            actions: Vec::new(),
            interps: Vec::new(),
            given_selection: Vec::new(),
            keep_rules: Vec::new(),
            delete_rules: Vec::new(),
            options: Options::new(),
            xproofs: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Stats {
    pub given: u32,
    pub generated: u32,
    pub kept: u32,
    pub proofs: u32,
    pub kept_by_rule: u32,
    pub deleted_by_rule: u32,
    pub subsumed: u32,
    pub back_subsumed: u32,
    pub sos_limit_deleted: u32,
    pub sos_displaced: u32,
    pub sos_removed: u32,
    pub new_demodulators: u32,
    pub new_lex_demods: u32,
    pub back_demodulated: u32,
    pub back_unit_deleted: u32,
    pub demod_attempts: u32,
    pub demod_rewrites: u32,
    pub res_instance_prunes: u32,
    pub para_instance_prunes: u32,
    pub basic_para_prunes: u32,
    pub nonunit_fsub: u32,
    pub nonunit_bsub: u32,
    pub usable_size: u32,
    pub sos_size: u32,
    pub demodulators_size: u32,
    pub disabled_size: u32,
    pub hints_size: u32,
    pub limbo_size: u32,
    pub kbyte_usage: u32,
    pub new_constants: u32,
}

impl Stats {
    /// The fixed order used on the child-to-parent wire.
    pub fn to_ints(&self) -> Vec<i32> {
        vec![
            self.given as i32,
            self.generated as i32,
            self.kept as i32,
            self.proofs as i32,
            self.kept_by_rule as i32,
            self.deleted_by_rule as i32,
            self.subsumed as i32,
            self.back_subsumed as i32,
            self.sos_limit_deleted as i32,
            self.sos_displaced as i32,
            self.sos_removed as i32,
            self.new_demodulators as i32,
            self.new_lex_demods as i32,
            self.back_demodulated as i32,
            self.back_unit_deleted as i32,
            self.demod_attempts as i32,
            self.demod_rewrites as i32,
            self.res_instance_prunes as i32,
            self.para_instance_prunes as i32,
            self.basic_para_prunes as i32,
            self.nonunit_fsub as i32,
            self.nonunit_bsub as i32,
            self.usable_size as i32,
            self.sos_size as i32,
            self.demodulators_size as i32,
            self.disabled_size as i32,
            self.hints_size as i32,
            self.limbo_size as i32,
            self.kbyte_usage as i32,
            self.new_constants as i32,
        ]
    }

    pub const WIRE_LEN: usize = 30;

    pub fn from_ints(v: &[i32]) -> Option<Stats> {
        if v.len() != Self::WIRE_LEN {
            return None;
        }
        let g = |i: usize| v[i] as u32;
        Some(Stats {
            given: g(0),
            generated: g(1),
            kept: g(2),
            proofs: g(3),
            kept_by_rule: g(4),
            deleted_by_rule: g(5),
            subsumed: g(6),
            back_subsumed: g(7),
            sos_limit_deleted: g(8),
            sos_displaced: g(9),
            sos_removed: g(10),
            new_demodulators: g(11),
            new_lex_demods: g(12),
            back_demodulated: g(13),
            back_unit_deleted: g(14),
            demod_attempts: g(15),
            demod_rewrites: g(16),
            res_instance_prunes: g(17),
            para_instance_prunes: g(18),
            basic_para_prunes: g(19),
            nonunit_fsub: g(20),
            nonunit_bsub: g(21),
            usable_size: g(22),
            sos_size: g(23),
            demodulators_size: g(24),
            disabled_size: g(25),
            hints_size: g(26),
            limbo_size: g(27),
            kbyte_usage: g(28),
            new_constants: g(29),
        })
    }

    /// Print the statistics block at the requested detail level.
    pub fn print(&self, level: &str) {
        if level == "none" {
            return;
        }
        println!("\n============================== STATISTICS ============================\n");
        println!("Given={}. Generated={}. Kept={}. proofs={}.", self.given, self.generated, self.kept, self.proofs);
        println!(
            "Usable={}. Sos={}. Demods={}. Limbo={}, Disabled={}.",
            self.usable_size, self.sos_size, self.demodulators_size, self.limbo_size, self.disabled_size
        );
        if level == "some" {
            println!("\n============================ end of statistics =======================");
            return;
        }
        println!(
            "Kept_by_rule={}, Deleted_by_rule={}.",
            self.kept_by_rule, self.deleted_by_rule
        );
        println!(
            "Forward_subsumed={}. Back_subsumed={}.",
            self.subsumed, self.back_subsumed
        );
        println!(
            "Sos_limit_deleted={}. Sos_displaced={}. Sos_removed={}.",
            self.sos_limit_deleted, self.sos_displaced, self.sos_removed
        );
        println!(
            "New_demodulators={} ({} lex), Back_demodulated={}. Back_unit_deleted={}.",
            self.new_demodulators, self.new_lex_demods, self.back_demodulated, self.back_unit_deleted
        );
        println!(
            "Demod_attempts={}. Demod_rewrites={}.",
            self.demod_attempts, self.demod_rewrites
        );
        println!(
            "Res_instance_prunes={}. Para_instance_prunes={}. Basic_paramod_prunes={}.",
            self.res_instance_prunes, self.para_instance_prunes, self.basic_para_prunes
        );
        println!(
            "Nonunit_fsub_tests={}. Nonunit_bsub_tests={}.",
            self.nonunit_fsub, self.nonunit_bsub
        );
        if level == "all" || level == "lots" {
            println!("Megabytes={:.2}.", self.kbyte_usage as f64 / 1024.0);
        }
        println!("\n============================ end of statistics =======================");
    }
}

pub struct ProverResults {
    pub proofs: Vec<Vec<Clause>>,
    pub stats: Stats,
    pub user_seconds: f64,
    pub system_seconds: f64,
    pub return_code: i32,
}

type Flow<T> = Result<T, Outcome>;

struct Search {
    arena: ClauseArena,
    usable: Clist,
    sos: Clist,
    demods: Clist,
    limbo: Clist,
    disabled: Clist,
    lit_index: LiteralIndex,
    clash_index: ClashIndex,
    demod_index: DemodIndex,
    demod_kinds: HashMap<ClauseId, DemodKind>,
    back_demod_index: FpaIndex<(ClauseId, usize, Position)>,
    givsel: GivSelect,
    hints: HintsIndex,
    weights: WeightRules,
    interps: Vec<Interp>,
    actions: Actions,
    keep_rules: Vec<EvalRule>,
    delete_rules: Vec<EvalRule>,
    opts: Options,
    ord: TermOrder,
    stats: Stats,
    empties: Vec<ClauseId>,
    proof_lists: Vec<Vec<ClauseId>>,
    cac_clauses: Vec<ClauseId>,
    start: Instant,
    bytes: usize,
    level: u32,
    last_of_level: ClauseId,
    last_report: f64,
    searching: bool,
    pending_usable: Vec<Clause>,
    pending_sos: Vec<Clause>,
    pending_demods: Vec<Clause>,
    pending_goals: Vec<Formula>,
}

impl Search {
    fn quiet(&self) -> bool {
        self.opts.flag(Flag::Quiet)
    }

    fn register(&mut self, c: &mut Clause) {
        if c.id == 0 {
            c.id = self.arena.allocate_id();
        }
        self.arena.insert_with_id(c.clone());
    }

    fn store(&mut self, c: &Clause) {
        self.arena.insert_with_id(c.clone());
    }

    fn check_limits(&mut self) -> Flow<()> {
        if let Some(code) = interrupt::check() {
            return Err(Outcome::from_exit_code(code));
        }
        let max_seconds = self.opts.parm(Parm::MaxSeconds);
        if max_seconds != -1 && self.start.elapsed().as_secs() as i64 >= max_seconds {
            return Err(Outcome::MaxSeconds);
        }
        let max_megs = self.opts.parm(Parm::MaxMegs);
        if max_megs != -1 && (self.bytes as i64) > max_megs * 1024 * 1024 {
            return Err(Outcome::MaxMegs);
        }
        if self.opts.over_limit(self.stats.kept as i64, Parm::MaxKept) {
            return Err(Outcome::MaxKept);
        }
        Ok(())
    }

    fn fire_actions(&mut self, watched: Watched, n: i64) -> Flow<()> {
        if self.actions.is_empty() {
            return Ok(());
        }
        let ops = self.actions.fire(watched, n);
        self.apply_action_ops(ops)
    }

    fn apply_action_ops(&mut self, ops: Vec<ActionOp>) -> Flow<()> {
        for op in ops {
            if !actions::op_allowed(&op) {
                eprintln!("\x07WARNING: action not permitted: {:?}", op);
                continue;
            }
            match op {
                ActionOp::Exit => return Err(Outcome::ActionExit),
                ActionOp::SetFlag(name) => self
                    .opts
                    .change_flag(&name, true)
                    .map_err(Outcome::Fatal)?,
                ActionOp::ClearFlag(name) => self
                    .opts
                    .change_flag(&name, false)
                    .map_err(Outcome::Fatal)?,
                ActionOp::Assign(name, value) => self
                    .opts
                    .assign_by_name(&name, &value)
                    .map_err(Outcome::Fatal)?,
                ActionOp::Assert(c) => {
                    let mut asserted = c;
                    asserted.justification = Justification::new(Step::Input);
                    self.cl_process(asserted)?;
                }
            }
        }
        Ok(())
    }

    fn restricted_denial(&self, c: &Clause) -> bool {
        self.opts.flag(Flag::RestrictDenials) && c.is_negative() && !c.literals.is_empty()
    }

    /// Print the periodic statistics block when the report interval has
    /// elapsed.
    fn possible_report(&mut self) {
        let interval = self.opts.parm(Parm::Report);
        if interval <= 0 || self.quiet() {
            return;
        }
        let elapsed = self.start.elapsed().as_secs_f64();
        if elapsed - self.last_report >= interval as f64 {
            self.last_report = elapsed;
            let level = self.opts.stringparm(StringParm::Stats).to_string();
            println!("\n%% Report at {:.2} seconds.", elapsed);
            self.stats.print(&level);
        }
    }

    // ----- simplification -------------------------------------------------

    /// Remove literals resolvable by x = x (t != t) and false atoms.
    fn simplify_literals(c: &mut Clause) {
        let mut i = 0;
        while i < c.literals.len() {
            let l = &c.literals[i];
            let drop = if let Some((a, b)) = l.eq_sides() {
                !l.sign && a == b
            } else {
                l.sign && l.atom.symbol().map(symbols::name).as_deref() == Some("$F")
            };
            if drop {
                c.literals.remove(i);
                c.justification.push(Step::Xx(i));
            } else {
                i += 1;
            }
        }
    }

    /// Merge duplicate literals, keeping the first occurrence.
    fn merge_literals(c: &mut Clause) {
        let mut i = 0;
        while i < c.literals.len() {
            if c.literals[..i].contains(&c.literals[i]) {
                c.literals.remove(i);
                c.justification.push(Step::Merge(i));
            } else {
                i += 1;
            }
        }
    }

    fn is_commutativity(l: &Term, r: &Term) -> bool {
        if let (
            Term::Application { symbol: f, args: a },
            Term::Application { symbol: g, args: b },
        ) = (l, r)
        {
            if f == g && a.len() == 2 {
                if let (
                    Term::Variable(x1),
                    Term::Variable(y1),
                    Term::Variable(x2),
                    Term::Variable(y2),
                ) = (&a[0], &a[1], &b[0], &b[1])
                {
                    return x1 != y1 && x1 == y2 && y1 == x2;
                }
            }
        }
        false
    }

    fn is_associativity(l: &Term, r: &Term) -> bool {
        // f(f(x,y),z) = f(x,f(y,z)) with x, y, z distinct variables
        let f = match l.symbol() {
            Some(f) => f,
            None => return false,
        };
        if r.symbol() != Some(f) || l.args().len() != 2 || r.args().len() != 2 {
            return false;
        }
        let (inner_l, z) = (&l.args()[0], &l.args()[1]);
        let (x2, inner_r) = (&r.args()[0], &r.args()[1]);
        if inner_l.symbol() != Some(f) || inner_r.symbol() != Some(f) {
            return false;
        }
        let (x1, y1) = (&inner_l.args()[0], &inner_l.args()[1]);
        let (y2, z2) = (&inner_r.args()[0], &inner_r.args()[1]);
        matches!((x1, y1, z), (Term::Variable(a), Term::Variable(b), Term::Variable(c))
            if a != b && b != c && a != c)
            && x1 == x2
            && y1 == y2
            && z == z2
    }

    /// Note commutativity / associativity of a kept equality for the C/AC
    /// redundancy machinery.  Returns true when the clause establishes a
    /// theory.
    fn cac_note(&mut self, c: &Clause) -> bool {
        if !c.is_unit() || !c.literals[0].sign {
            return false;
        }
        let (l, r) = match c.literals[0].eq_sides() {
            Some(s) => s,
            None => return false,
        };
        let f = match l.symbol() {
            Some(f) => f,
            None => return false,
        };
        if Self::is_commutativity(l, r) {
            if symbols::theory(f) == UnifTheory::Empty {
                symbols::set_theory(f, UnifTheory::Commutative);
                if !self.quiet() {
                    println!("\nNOTE: {} is commutative.", symbols::name(f));
                }
            }
            return true;
        }
        if Self::is_associativity(l, r) && symbols::is_commutative(f) && !symbols::is_ac(f) {
            symbols::set_theory(f, UnifTheory::AssocCommutative);
            if !self.quiet() {
                println!("\nNOTE: {} is associative-commutative.", symbols::name(f));
            }
            return true;
        }
        false
    }

    /// A positive equality literal whose sides agree modulo C/AC makes the
    /// clause redundant.
    fn cac_tautology(lits: &[Literal]) -> bool {
        lits.iter().any(|l| {
            l.sign
                && l.eq_sides()
                    .map(|(a, b)| term::ac_canonical(a) == term::ac_canonical(b))
                    .unwrap_or(false)
        })
    }

    fn cl_process_simplify(&mut self, c: &mut Clause) {
        if !self.demod_index.is_empty() {
            let out = demodulate_clause(c, &self.demod_index, &self.opts, self.ord);
            self.stats.demod_attempts += out.attempts;
            self.stats.demod_rewrites += out.rewrites;
        }
        orient_equalities(&mut c.literals, self.ord);
        Self::simplify_literals(c);
        Self::merge_literals(c);
        if self.opts.flag(Flag::UnitDeletion) {
            for (unit_id, lit) in self.lit_index.unit_delete(c) {
                c.justification.push(Step::UnitDel(unit_id, lit));
            }
        }
    }

    // ----- deletion checks ------------------------------------------------

    fn weigh_clause(&mut self, c: &mut Clause) {
        c.weight = clause_weight(&c.literals, &self.weights, &self.opts);
        if !self.hints.is_empty() {
            if !c.normal_vars {
                c.renumber_variables();
            }
            self.hints.adjust_weight(c, &self.opts);
        }
        let default_weight = self.opts.floatparm(FloatParm::DefaultWeight);
        if default_weight >= 0.0
            && c.weight > default_weight
            && c.weight <= self.opts.floatparm(FloatParm::MaxWeight)
        {
            c.weight = default_weight;
        }
    }

    fn skip_black_white_tests(&self, c: &Clause) -> bool {
        !self.searching
            || c.used
            || self.restricted_denial(c)
            || (c.matching_hint.is_some() && !self.opts.flag(Flag::LimitHintMatchers))
    }

    fn black_tests(&self, c: &Clause) -> bool {
        if c.weight > self.opts.floatparm(FloatParm::MaxWeight) {
            return true;
        }
        let over = |parm: Parm, n: i64| {
            let lim = self.opts.parm(parm);
            lim != -1 && n > lim
        };
        if over(Parm::MaxLiterals, c.literals.len() as i64)
            || over(Parm::MaxVars, c.variables().len() as i64)
            || over(Parm::MaxDepth, c.depth() as i64)
        {
            return true;
        }
        self.delete_rules.iter().any(|r| r.eval(c))
    }

    fn white_tests(&self, c: &Clause) -> bool {
        self.keep_rules.iter().any(|r| r.eval(c))
    }

    /// True when the clause should be discarded.
    fn cl_process_delete(&mut self, c: &mut Clause) -> bool {
        if c.is_tautology()
            || (self.opts.flag(Flag::CacRedundancy) && Self::cac_tautology(&c.literals))
        {
            self.stats.subsumed += 1;
            return true;
        }

        self.weigh_clause(c);

        if !self.skip_black_white_tests(c) {
            if self.white_tests(c) {
                self.stats.kept_by_rule += 1;
            } else if self.black_tests(c) {
                self.stats.deleted_by_rule += 1;
                return true;
            } else {
                if self.givsel.needs_semantics {
                    set_semantics(c, &self.interps, &self.opts);
                }
                let (keep, low_water) = self.givsel.sos_keep(c, &self.opts);
                if let Some(w) = low_water {
                    if !self.quiet() {
                        println!("\nLow Water (keep): wt={:.3}", w);
                    }
                }
                if !keep {
                    self.stats.sos_limit_deleted += 1;
                    return true;
                }
            }
        }

        let subsumer = {
            let arena = &self.arena;
            self.lit_index
                .forward_subsumer(&c.literals, |id| arena.get(id).literals.as_slice())
        };
        if let Some(id) = subsumer {
            if !c.used {
                if c.literals.len() > 1 {
                    self.stats.nonunit_fsub += 1;
                }
                self.stats.subsumed += 1;
                if self.opts.flag(Flag::PrintGen) {
                    println!("subsumed by {}.", id);
                }
                return true;
            }
        }
        false
    }

    // ----- keeping --------------------------------------------------------

    fn cl_process_keep(&mut self, c: &mut Clause) {
        self.stats.kept += 1;
        if !c.normal_vars {
            c.renumber_variables();
        }
        if c.id == 0 {
            c.id = self.arena.allocate_id();
        }
        // parents of a kept clause take part in the search
        for pid in c.justification.parents() {
            if self.arena.try_get(pid).is_some() {
                self.arena.get_mut(pid).used = true;
            }
        }
        mark_maximal_literals(&mut c.literals, self.ord);
        mark_selected_literals(
            &mut c.literals,
            self.opts.stringparm(StringParm::LiteralSelection),
            self.ord,
        );
        if let Some(h) = c.matching_hint {
            self.hints.keep_matcher(h);
        }
        if self.opts.flag(Flag::PrintKept)
            || self.opts.flag(Flag::PrintGen)
            || (!self.searching && self.opts.flag(Flag::PrintInitialClauses) && !self.quiet())
        {
            println!("kept:      {} {}  {}.", c.id, c, c.justification);
        } else if self.opts.flag(Flag::PrintLabeled) && c.label().is_some() {
            println!("\nkept:      {} {}  {}.", c.id, c, c.justification);
        }
    }

    fn cl_process_conflict(&mut self, c: &mut Clause) -> Flow<()> {
        if !c.is_unit() {
            return Ok(());
        }
        if !c.normal_vars {
            c.renumber_variables();
        }
        // resolution against the implicit x = x
        if !c.literals[0].sign {
            let unifies = match c.literals[0].eq_sides() {
                Some((a, b)) => {
                    let mut bnd = Bindings::new();
                    unify(a, b, &mut bnd)
                }
                None => false,
            };
            if unifies {
                self.register(c);
                let mut just = Justification::new(Step::Copy(c.id));
                just.push(Step::Xx(0));
                let empty = Clause::new(Vec::new(), just);
                return self.handle_proof(empty);
            }
        }
        let conflicts = {
            let arena = &self.arena;
            self.lit_index
                .unit_conflicts(c, |id| arena.get(id).literals.as_slice())
        };
        for other in conflicts {
            self.register(c);
            let empty = Clause::new(
                Vec::new(),
                Justification::new(Step::BinaryRes(vec![(c.id, 0), (other, 0)])),
            );
            self.handle_proof(empty)?;
        }
        Ok(())
    }

    fn cl_process_new_demod(&mut self, c: &mut Clause) {
        if !self.opts.flag(Flag::BackDemod) {
            return;
        }
        let kind = demodulator_type(
            c,
            self.opts.parm(Parm::LexDepDemodLim),
            self.opts.flag(Flag::LexDepDemodSane),
            self.opts.flag(Flag::LexDepDemod),
        );
        if let Some(kind) = kind {
            if self.opts.flag(Flag::PrintKept) {
                let s = match kind {
                    DemodKind::Oriented => "",
                    DemodKind::LexDepLr => " (lex_dep_lr)",
                    DemodKind::LexDepRl => " (lex_dep_rl)",
                    DemodKind::LexDepBoth => " (lex_dep_both)",
                };
                println!("    new demodulator{}: {}.", s, c.id);
            }
            c.is_demodulator = true;
            self.demods.append(c.id);
            self.demod_index.insert(c, kind);
            self.demod_kinds.insert(c.id, kind);
            self.stats.new_demodulators += 1;
            if kind != DemodKind::Oriented {
                self.stats.new_lex_demods += 1;
            }
            if self.opts.flag(Flag::BackDemodHints) && !self.hints.is_empty() {
                self.hints
                    .back_demodulate(&self.demod_index, &self.opts, self.ord);
            }
        }
    }

    // ----- the pipeline ---------------------------------------------------

    fn cl_process(&mut self, mut c: Clause) -> Flow<()> {
        self.check_limits()?;
        self.possible_report();

        self.stats.generated += 1;
        self.fire_actions(Watched::Generated, self.stats.generated as i64)?;
        if self.opts.flag(Flag::PrintGen) {
            println!("\ngenerated: {}", c);
        }

        self.cl_process_simplify(&mut c);

        if c.is_empty() {
            return self.handle_proof(c);
        }

        // safe mode finds conflicts before any deletion can hide them
        if self.opts.flag(Flag::SafeUnitConflict) {
            self.cl_process_conflict(&mut c)?;
        }

        if self.cl_process_delete(&mut c) {
            if c.id != 0 {
                // registered by unit conflict; keep it for the proof record
                c.container = Container::Disabled;
                self.disabled.append(c.id);
                self.store(&c);
            }
            return Ok(());
        }

        self.cl_process_keep(&mut c);
        if !self.opts.flag(Flag::SafeUnitConflict) {
            self.cl_process_conflict(&mut c)?;
        }
        self.cl_process_new_demod(&mut c);
        if self.opts.flag(Flag::CacRedundancy) && self.cac_note(&c) {
            self.cac_clauses.push(c.id);
        }
        self.lit_index.insert(&c);
        c.container = Container::Limbo;
        self.bytes += c.byte_estimate();
        self.limbo.append(c.id);
        self.store(&c);
        self.fire_actions(Watched::Kept, self.stats.kept as i64)?;
        Ok(())
    }

    // ----- proofs ---------------------------------------------------------

    fn handle_proof(&mut self, mut empty: Clause) -> Flow<()> {
        self.register(&mut empty);
        empty.container = Container::Disabled;
        self.disabled.append(empty.id);
        self.store(&empty);

        let proof = proofs::ancestors(&self.arena, empty.id);
        for &id in &proof {
            self.arena.get_mut(id).used = true;
        }
        self.stats.proofs += 1;
        if self.opts.flag(Flag::PrintProofs) && !self.quiet() {
            let seconds = self.start.elapsed().as_secs_f64();
            proofs::print_proof(&self.arena, &proof, self.stats.proofs, seconds);
            if self.opts.flag(Flag::Bell) {
                eprint!("\x07");
            }
        }
        self.empties.push(empty.id);
        self.proof_lists.push(proof.clone());

        // action2 attributes on proof clauses run now
        let mut ops = Vec::new();
        for &id in &proof {
            for t in self.arena.get(id).action2_terms() {
                if let Some(op) = actions::op_from_term(t) {
                    ops.push(op);
                }
            }
        }
        self.apply_action_ops(ops)?;

        if self
            .opts
            .over_limit(self.stats.proofs as i64, Parm::MaxProofs)
        {
            return Err(Outcome::MaxProofs);
        }
        Ok(())
    }

    // ----- disabling ------------------------------------------------------

    fn disable_clause(&mut self, id: ClauseId) -> Flow<()> {
        let c = self.arena.get(id).clone();
        match c.container {
            Container::Disabled => return Ok(()),
            Container::Usable => {
                self.usable.remove(id);
                self.clash_index.remove(&c).map_err(Outcome::Fatal)?;
                self.lit_index.remove(&c).map_err(Outcome::Fatal)?;
                index_back_demod(&c, &mut self.back_demod_index, false).map_err(Outcome::Fatal)?;
            }
            Container::Sos => {
                self.sos.remove(id);
                self.givsel.remove(&c);
                self.lit_index.remove(&c).map_err(Outcome::Fatal)?;
                index_back_demod(&c, &mut self.back_demod_index, false).map_err(Outcome::Fatal)?;
                self.stats.sos_removed += 1;
            }
            Container::Limbo => {
                self.limbo.remove(id);
                self.lit_index.remove(&c).map_err(Outcome::Fatal)?;
            }
            Container::None => {}
        }
        if c.is_demodulator {
            let kind = self
                .demod_kinds
                .remove(&id)
                .unwrap_or(DemodKind::Oriented);
            self.demod_index.remove(&c, kind).map_err(Outcome::Fatal)?;
            self.demods.remove(id);
        }
        self.bytes = self.bytes.saturating_sub(c.byte_estimate());
        let cm = self.arena.get_mut(id);
        cm.container = Container::Disabled;
        cm.is_demodulator = false;
        self.disabled.append(id);
        Ok(())
    }

    // ----- back simplification -------------------------------------------

    fn back_demod(&mut self, demod_id: ClauseId) -> Flow<()> {
        let demod = self.arena.get(demod_id).clone();
        let kind = match self.demod_kinds.get(&demod_id) {
            Some(k) => *k,
            None => return Ok(()),
        };
        let hits = back_demodulatable(&demod, kind, &self.back_demod_index);
        for old_id in hits {
            let old = self.arena.get(old_id).clone();
            if old.container == Container::Disabled {
                continue;
            }
            self.stats.back_demodulated += 1;
            if self.opts.flag(Flag::PrintKept) {
                println!("        {} back demodulating {}.", demod_id, old_id);
            }
            let mut copy = Clause::new(
                old.literals.clone(),
                Justification::new(Step::BackDemod(old_id)),
            );
            copy.attributes = old
                .attributes
                .iter()
                .filter(|a| matches!(a, Attribute::Answer(_) | Attribute::Label(_)))
                .cloned()
                .collect();
            if self.opts.flag(Flag::BasicParamodulation) {
                for i in 0..copy.literals.len() {
                    copy.nonbasic.push((i, Vec::new()));
                }
            }
            self.disable_clause(old_id)?;
            self.cl_process(copy)?;
        }
        Ok(())
    }

    fn back_unit_deletion(&mut self, unit_id: ClauseId) -> Flow<()> {
        let unit = self.arena.get(unit_id).clone();
        let hits = {
            let arena = &self.arena;
            self.lit_index
                .back_unit_deletable(&unit, |id| arena.get(id).literals.as_slice())
        };
        for old_id in hits {
            let old = self.arena.get(old_id).clone();
            if old.container == Container::Disabled {
                continue;
            }
            self.stats.back_unit_deleted += 1;
            let mut copy = Clause::new(
                old.literals.clone(),
                Justification::new(Step::BackUnitDel(old_id)),
            );
            copy.attributes = old.attributes.clone();
            self.disable_clause(old_id)?;
            self.cl_process(copy)?;
        }
        Ok(())
    }

    fn back_cac_simplify(&mut self) -> Flow<()> {
        let mut to_disable = Vec::new();
        for id in self
            .sos
            .iter()
            .chain(self.usable.iter())
            .chain(self.limbo.iter())
        {
            if Self::cac_tautology(&self.arena.get(id).literals) {
                to_disable.push(id);
            }
        }
        for id in to_disable {
            if !self.quiet() {
                println!("%% back CAC tautology: {}", self.arena.get(id));
            }
            self.disable_clause(id)?;
        }
        Ok(())
    }

    /// Introduce a fresh name for the right side of a ground unit equality
    /// (the new_constants rule).
    fn try_new_constant(&mut self, c: &Clause) -> Option<Clause> {
        let limit = self.opts.parm(Parm::NewConstants);
        if limit == 0 || self.opts.over_limit(self.stats.new_constants as i64, Parm::NewConstants)
        {
            return None;
        }
        if !c.is_unit() || !c.literals[0].sign {
            return None;
        }
        let (l, r) = c.literals[0].eq_sides()?;
        if !l.is_ground() || !r.is_ground() || r.is_constant() || l.is_constant() {
            return None;
        }
        let k = symbols::fresh_constant();
        self.stats.new_constants += 1;
        for interp in &mut self.interps {
            interp.extend_with_constant(k);
        }
        let atom = Term::app(symbols::eq_symbol(), vec![r.clone(), Term::constant(k)]);
        let new = Clause::new(
            vec![Literal::new(true, atom)],
            Justification::new(Step::NewSymbol(c.id)),
        );
        if !self.quiet() {
            println!("\nNOTE: New constant: {}", new);
        }
        Some(new)
    }

    fn limbo_process(&mut self, pre_search: bool) -> Flow<()> {
        while let Some(id) = self.limbo.first() {
            let c = self.arena.get(id).clone();

            if self.opts.flag(Flag::Factor) {
                let mut children = Vec::new();
                binary_factors(&c, &mut |f| children.push(f));
                for child in children {
                    self.cl_process(child)?;
                }
            }

            if let Some(new) = self.try_new_constant(&c) {
                self.cl_process(new)?;
            }

            if self.opts.flag(Flag::BackSubsume) {
                let subsumees = {
                    let arena = &self.arena;
                    self.lit_index
                        .back_subsumed(&c, |cid| arena.get(cid).literals.as_slice())
                };
                if !subsumees.is_empty() {
                    self.arena.get_mut(id).subsumer = true;
                }
                for d in subsumees {
                    if self.limbo.contains(d) {
                        // limbo clauses are unstable; see cl_process
                        return Err(Outcome::Fatal(FatalError::BackSubsumeLimbo(d)));
                    }
                    self.stats.back_subsumed += 1;
                    if self.arena.get(d).literals.len() > 1 {
                        self.stats.nonunit_bsub += 1;
                    }
                    if self.opts.flag(Flag::PrintKept) {
                        println!("    {} back subsumes {}.", id, d);
                    }
                    self.disable_clause(d)?;
                }
            }

            if self.arena.get(id).is_demodulator {
                if self.opts.flag(Flag::PrintKept) {
                    println!("    starting back demodulation with {}.", id);
                }
                self.back_demod(id)?;
            }

            if self.opts.flag(Flag::UnitDeletion) && c.is_unit() {
                self.back_unit_deletion(id)?;
            }

            if self.cac_clauses.contains(&id) {
                self.back_cac_simplify()?;
            }

            // the clause may have been disabled while it sat in limbo
            if self.arena.get(id).container != Container::Limbo {
                continue;
            }
            self.limbo.remove(id);

            let c = self.arena.get(id).clone();
            if self.restricted_denial(&c) {
                {
                    let cm = self.arena.get_mut(id);
                    cm.container = Container::Usable;
                    cm.initial = pre_search;
                }
                self.usable.append(id);
                index_back_demod(&c, &mut self.back_demod_index, true).map_err(Outcome::Fatal)?;
            } else {
                let sos_limit = self.opts.parm(Parm::SosLimit);
                if sos_limit != -1 && self.sos.len() as i64 >= sos_limit {
                    let worst = {
                        let arena = &self.arena;
                        self.givsel
                            .worst_clause(|wid| arena.get(wid).matching_hint.is_some())
                    };
                    match worst {
                        Some(wid) => {
                            let w = self.arena.get(wid).weight;
                            if let Some(mark) = self.givsel.note_displaced(w) {
                                if !self.quiet() {
                                    println!("\nLow Water (displace): id={}, wt={:.3}", wid, mark);
                                }
                            }
                            self.stats.sos_displaced += 1;
                            self.disable_clause(wid)?;
                        }
                        None => {
                            return Err(Outcome::Fatal(FatalError::Other(
                                "sos_displace: cannot find worst clause".to_string(),
                            )))
                        }
                    }
                }
                {
                    let cm = self.arena.get_mut(id);
                    cm.container = Container::Sos;
                    cm.initial = pre_search;
                }
                if self.givsel.needs_semantics {
                    let mut cs = self.arena.get(id).clone();
                    set_semantics(&mut cs, &self.interps, &self.opts);
                    let sem = cs.semantics;
                    self.arena.get_mut(id).semantics = sem;
                }
                let c = self.arena.get(id).clone();
                if !self.givsel.insert(&c) && !self.quiet() {
                    eprintln!(
                        "\nWARNING: kept clause matches no given_selection rule: {}",
                        c
                    );
                }
                self.sos.append(id);
                index_back_demod(&c, &mut self.back_demod_index, true).map_err(Outcome::Fatal)?;
            }
        }
        Ok(())
    }

    // ----- inference ------------------------------------------------------

    fn given_infer(&mut self, given_id: ClauseId) -> Flow<()> {
        let mut children: Vec<Clause> = Vec::new();
        let mut res_prunes = 0u32;
        let mut para_prunes = 0u32;
        let mut basic_prunes = 0u32;
        {
            let given = self.arena.get(given_id).clone();
            let arena = &self.arena;
            let lookup = |id: ClauseId| arena.get(id).clone();
            let opts = &self.opts;
            let ord = self.ord;

            if opts.flag(Flag::BinaryResolution) {
                res_prunes += binary_resolution(
                    &given,
                    ResVariant::Any,
                    &self.clash_index,
                    &lookup,
                    opts,
                    ord,
                    &mut |c| children.push(c),
                );
            }
            if opts.flag(Flag::NegBinaryResolution) {
                res_prunes += binary_resolution(
                    &given,
                    ResVariant::Neg,
                    &self.clash_index,
                    &lookup,
                    opts,
                    ord,
                    &mut |c| children.push(c),
                );
            }
            if opts.flag(Flag::PosHyperResolution) {
                hyper_resolution(&given, ResVariant::Pos, &self.clash_index, &lookup, &mut |c| {
                    children.push(c)
                });
            }
            if opts.flag(Flag::NegHyperResolution) {
                hyper_resolution(&given, ResVariant::Neg, &self.clash_index, &lookup, &mut |c| {
                    children.push(c)
                });
            }
            if opts.flag(Flag::PosUrResolution) {
                ur_resolution(
                    &given,
                    ResVariant::Pos,
                    &self.clash_index,
                    &lookup,
                    opts,
                    &mut |c| children.push(c),
                );
            }
            if opts.flag(Flag::NegUrResolution) {
                ur_resolution(
                    &given,
                    ResVariant::Neg,
                    &self.clash_index,
                    &lookup,
                    opts,
                    &mut |c| children.push(c),
                );
            }
            if opts.flag(Flag::Paramodulation) {
                let lit_limit = opts.parm(Parm::ParaLitLimit);
                let within =
                    |c: &Clause| lit_limit == -1 || (c.literals.len() as i64) <= lit_limit;
                if within(&given) {
                    // this paramodulation does not use indexing
                    for p_id in self.usable.iter() {
                        let p = arena.get(p_id);
                        if self.restricted_denial(p) || !within(p) {
                            continue;
                        }
                        let out =
                            para_from_into(&given, p, opts, ord, &mut |c| children.push(c));
                        para_prunes += out.instance_prunes;
                        basic_prunes += out.basic_prunes;
                        if p_id != given_id {
                            let out =
                                para_from_into(p, &given, opts, ord, &mut |c| children.push(c));
                            para_prunes += out.instance_prunes;
                            basic_prunes += out.basic_prunes;
                        }
                    }
                }
            }
        }
        self.stats.res_instance_prunes += res_prunes;
        self.stats.para_instance_prunes += para_prunes;
        self.stats.basic_para_prunes += basic_prunes;

        for child in children {
            self.cl_process(child)?;
        }
        Ok(())
    }

    fn make_inferences(&mut self) -> Flow<()> {
        let (given_id, sel_name) = match self.givsel.next_given() {
            Some(x) => x,
            None => return Err(Outcome::SosEmpty),
        };
        {
            let c = self.arena.get(given_id).clone();
            self.givsel.remove(&c);
            self.sos.remove(given_id);
        }

        // level bookkeeping for breadth-first runs
        if self.opts.flag(Flag::BreadthFirst)
            && self.opts.parm(Parm::TruePart) == 0
            && self.opts.parm(Parm::FalsePart) == 0
            && self.opts.parm(Parm::WeightPart) == 0
            && self.opts.parm(Parm::RandomPart) == 0
            && sel_name == "A"
            && given_id > self.last_of_level
        {
            self.level += 1;
            self.last_of_level = self.arena.ids_assigned();
            if !self.quiet() {
                println!(
                    "\nNOTE: Starting on level {}, last clause of level {} is {}.",
                    self.level,
                    self.level - 1,
                    self.last_of_level
                );
            }
            self.fire_actions(Watched::Level, self.level as i64)?;
        }

        self.stats.given += 1;
        if self
            .opts
            .over_limit(self.stats.given as i64 - 1, Parm::MaxGiven)
        {
            return Err(Outcome::MaxGiven);
        }

        // maybe disable back subsumption if it has been useless so far
        if self.stats.given as i64 == self.opts.parm(Parm::BacksubCheck) {
            let ratio = if self.stats.back_subsumed == 0 {
                i64::MAX
            } else {
                (self.stats.kept / self.stats.back_subsumed) as i64
            };
            if ratio > 20 && self.opts.flag(Flag::BackSubsume) {
                self.opts
                    .change_flag("back_subsume", false)
                    .map_err(Outcome::Fatal)?;
                if !self.quiet() {
                    println!(
                        "\nNOTE: Back_subsumption disabled, kept to back_subsumed ratio is {}.",
                        ratio
                    );
                }
            }
        }

        if self.opts.flag(Flag::PrintGiven) && !self.quiet() {
            let c = self.arena.get(given_id);
            println!(
                "\ngiven #{} ({},wt={:.3}): {} {}",
                self.stats.given, sel_name, c.weight, c.id, c
            );
        }
        self.fire_actions(Watched::Given, self.stats.given as i64)?;

        self.arena.get_mut(given_id).container = Container::Usable;
        self.usable.append(given_id);
        let c = self.arena.get(given_id).clone();
        self.clash_index.insert(&c);

        self.given_infer(given_id)
    }

    // ----- initialisation -------------------------------------------------

    fn auto_inference(&mut self) {
        if !self.opts.flag(Flag::AutoInference) {
            return;
        }
        let any_rule_set = self.opts.flag(Flag::BinaryResolution)
            || self.opts.flag(Flag::NegBinaryResolution)
            || self.opts.flag(Flag::PosHyperResolution)
            || self.opts.flag(Flag::NegHyperResolution)
            || self.opts.flag(Flag::PosUrResolution)
            || self.opts.flag(Flag::NegUrResolution)
            || self.opts.flag(Flag::Paramodulation);
        if any_rule_set {
            return;
        }
        let has_equality = self
            .pending_usable
            .iter()
            .chain(self.pending_sos.iter())
            .any(|c| c.literals.iter().any(|l| l.is_equality()))
            || !self.pending_demods.is_empty();
        let non_horn = self
            .pending_usable
            .iter()
            .chain(self.pending_sos.iter())
            .any(|c| !c.is_horn());
        let _ = self.opts.apply(Change::Set(Flag::BinaryResolution));
        if has_equality {
            let _ = self.opts.apply(Change::Set(Flag::Paramodulation));
        }
        if non_horn {
            let _ = self.opts.apply(Change::Set(Flag::Factor));
        }
        if !self.quiet() {
            println!(
                "\n%% Auto-inference: binary_resolution{}{}.",
                if self.opts.flag(Flag::Paramodulation) {
                    ", paramodulation"
                } else {
                    ""
                },
                if self.opts.flag(Flag::Factor) {
                    ", factor"
                } else {
                    ""
                }
            );
        }
    }

    /// Index a usable input clause without sending it through the
    /// processing pipeline.
    fn admit_usable(&mut self, mut c: Clause) -> Flow<()> {
        if !self.opts.flag(Flag::DontFlipInput) {
            for i in orient_equalities(&mut c.literals, self.ord) {
                c.justification.push(Step::Flip(0, i));
            }
        }
        self.weigh_clause(&mut c);
        mark_maximal_literals(&mut c.literals, self.ord);
        mark_selected_literals(
            &mut c.literals,
            self.opts.stringparm(StringParm::LiteralSelection),
            self.ord,
        );
        c.renumber_variables();
        self.register(&mut c);
        c.container = Container::Usable;
        c.initial = true;
        self.usable.append(c.id);
        self.bytes += c.byte_estimate();
        self.lit_index.insert(&c);
        self.clash_index.insert(&c);
        index_back_demod(&c, &mut self.back_demod_index, true).map_err(Outcome::Fatal)?;
        self.store(&c);
        if self.opts.flag(Flag::PrintInitialClauses) && !self.quiet() {
            println!("{} {}  {}.", c.id, c, c.justification);
        }
        Ok(())
    }

    fn admit_demodulator(&mut self, mut c: Clause) -> Flow<()> {
        check_input_demodulator(&c).map_err(Outcome::Fatal)?;
        let (l, r) = {
            let lit = &c.literals[0];
            let (l, r) = lit.eq_sides().expect("input demodulator is an equality");
            (l.clone(), r.clone())
        };
        match order::compare(&l, &r, self.ord) {
            order::OrderResult::Greater => c.literals[0].oriented = true,
            _ => {
                eprintln!(
                    "\x07WARNING: input demodulator not orientable, used anyway: {}",
                    c
                );
                c.literals[0].oriented = true;
            }
        }
        c.renumber_variables();
        self.register(&mut c);
        c.is_demodulator = true;
        self.demods.append(c.id);
        self.demod_index.insert(&c, DemodKind::Oriented);
        self.demod_kinds.insert(c.id, DemodKind::Oriented);
        self.bytes += c.byte_estimate();
        self.store(&c);
        if self.opts.flag(Flag::PrintInitialClauses) && !self.quiet() {
            println!("{} {}  {}.", c.id, c, c.justification);
        }
        Ok(())
    }

    fn process_initial(&mut self, sos_input: Vec<Clause>, goal_denials: Vec<Clause>) -> Flow<()> {
        for c in sos_input.into_iter().chain(goal_denials) {
            let mut c = c;
            if !self.opts.flag(Flag::DontFlipInput) {
                let flipped = orient_equalities(&mut c.literals, self.ord);
                for i in flipped {
                    c.justification.push(Step::Flip(0, i));
                }
            }
            if self.opts.flag(Flag::ProcessInitialSos) {
                self.cl_process(c)?;
            } else {
                // minimal handling: weigh, keep, straight through limbo
                self.weigh_clause(&mut c);
                self.cl_process_keep(&mut c);
                self.lit_index.insert(&c);
                c.container = Container::Limbo;
                self.limbo.append(c.id);
                self.store(&c);
            }
            self.limbo_process(true)?;
        }
        Ok(())
    }

    fn intake(&mut self) -> Flow<()> {
        self.auto_inference();

        let usable = std::mem::take(&mut self.pending_usable);
        for c in usable {
            self.admit_usable(c)?;
        }
        let demods = std::mem::take(&mut self.pending_demods);
        for c in demods {
            self.admit_demodulator(c)?;
        }
        let goals = std::mem::take(&mut self.pending_goals);
        let denials = deny_goals(&goals, &mut self.arena, &mut self.disabled);
        let sos = std::mem::take(&mut self.pending_sos);
        self.process_initial(sos, denials)
    }
}

/// Turn goal formulas into denial clauses (refutation of the negation).
fn deny_goals(goals: &[Formula], arena: &mut ClauseArena, disabled: &mut Clist) -> Vec<Clause> {
    let mut denials = Vec::new();
    for g in goals {
        // record the goal itself so the denial has an ancestor
        let mut goal_clause = Clause::new(Vec::new(), Justification::new(Step::Goal));
        goal_clause.is_formula = true;
        goal_clause.attributes.push(Attribute::Label(g.to_string()));
        goal_clause.id = arena.allocate_id();
        goal_clause.container = Container::Disabled;
        arena.insert_with_id(goal_clause.clone());
        disabled.append(goal_clause.id);

        let negated = crate::clausify::negate(g);
        for c in crate::clausify::clausify(&negated, &|| {
            Justification::new(Step::Deny(goal_clause.id))
        }) {
            denials.push(c);
        }
    }
    denials
}

/// Run the search to completion and report the results.  This is the
/// library's main entry point.
pub fn search(input: ProverInput) -> ProverResults {
    let start = Instant::now();
    let stats_level = input
        .options
        .stringparm(StringParm::Stats)
        .to_string();
    let quiet = input.options.flag(Flag::Quiet);
    let mut state = match init_search(input, start) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("\x07Fatal error: {}", e);
            return ProverResults {
                proofs: Vec::new(),
                stats: Stats::default(),
                user_seconds: start.elapsed().as_secs_f64(),
                system_seconds: 0.0,
                return_code: Outcome::Fatal(e).exit_code(),
            };
        }
    };

    let outcome = match run_search(&mut state) {
        Ok(()) => Outcome::SosEmpty,
        Err(o) => o,
    };
    if let Outcome::Fatal(e) = &outcome {
        eprintln!("\x07Fatal error: {}", e);
    }

    state.stats.usable_size = state.usable.len() as u32;
    state.stats.sos_size = state.sos.len() as u32;
    state.stats.demodulators_size = state.demods.len() as u32;
    state.stats.disabled_size = state.disabled.len() as u32;
    state.stats.limbo_size = state.limbo.len() as u32;
    state.stats.hints_size = state.hints.len() as u32;
    state.stats.kbyte_usage = (state.bytes / 1024) as u32;

    debug_assert_eq!(state.empties.len(), state.proof_lists.len());

    if !quiet {
        state.stats.print(&stats_level);
        if stats_level == "all" {
            println!("\n============================== SELECTOR REPORT =======================");
            println!(
                "{:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
                "SELECTOR", "PART", "PRIORITY", "ORDER", "SIZE", "SELECTED"
            );
            for (name, part, pri, order, size, selected) in state.givsel.report() {
                println!(
                    "{:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
                    name, part, pri, order, size, selected
                );
            }
            println!("============================ end of selector report ==================");
        }
        println!(
            "\n============================== end of search =========================="
        );
    }

    let proofs_out: Vec<Vec<Clause>> = state
        .proof_lists
        .iter()
        .map(|proof| proof.iter().map(|&id| state.arena.get(id).clone()).collect())
        .collect();

    ProverResults {
        proofs: proofs_out,
        stats: state.stats.clone(),
        user_seconds: start.elapsed().as_secs_f64(),
        system_seconds: 0.0,
        return_code: outcome.exit_code(),
    }
}

fn init_search(input: ProverInput, start: Instant) -> Result<Search, FatalError> {
    let opts = input.options;

    // term ordering and symbol precedence
    let ord = TermOrder::from_name(opts.stringparm(StringParm::Order))
        .expect("order stringparm is validated");
    for m in symbols::assign_precedence(&input.function_order, true) {
        eprintln!("\x07WARNING: function_order omits symbol {}", m);
    }
    for m in symbols::assign_precedence(&input.predicate_order, false) {
        eprintln!("\x07WARNING: predicate_order omits symbol {}", m);
    }
    for (name, arity, w) in &input.kbo_weights {
        let ids: Vec<_> = if *arity == usize::MAX {
            symbols::ids_with_name(name)
        } else {
            symbols::lookup(name, *arity).into_iter().collect()
        };
        if ids.is_empty() {
            eprintln!("\x07WARNING: kbo_weights names unknown symbol {}", name);
        }
        for id in ids {
            symbols::set_kb_weight(id, *w);
        }
    }
    if ord == TermOrder::Kbo {
        check_kbo_weights().map_err(FatalError::BadKboWeights)?;
    }

    let selector_rules = if input.given_selection.is_empty() {
        rules_from_options(&opts)
    } else {
        input.given_selection.clone()
    };
    let seed = opts.parm(Parm::RandomSeed) as u64;
    let givsel = GivSelect::new(selector_rules, seed);

    let mut sos_input = input.sos;
    if opts.flag(Flag::SortInitialSos) && sos_input.len() <= 100 {
        sos_input.sort_by_key(|c| c.symbol_count());
    }

    Ok(Search {
        arena: ClauseArena::new(),
        usable: Clist::new("usable"),
        sos: Clist::new("sos"),
        demods: Clist::new("demodulators"),
        limbo: Clist::new("limbo"),
        disabled: Clist::new("disabled"),
        lit_index: LiteralIndex::new(FeatureSpec::from_symbol_table()),
        clash_index: ClashIndex::new(),
        demod_index: DemodIndex::new(),
        demod_kinds: HashMap::new(),
        back_demod_index: FpaIndex::new(),
        givsel,
        hints: HintsIndex::new(FeatureSpec::from_symbol_table(), input.hints),
        weights: input.weights,
        interps: input.interps,
        actions: Actions::new(input.actions),
        keep_rules: input.keep_rules,
        delete_rules: input.delete_rules,
        opts,
        ord,
        stats: Stats::default(),
        empties: Vec::new(),
        proof_lists: Vec::new(),
        cac_clauses: Vec::new(),
        start,
        bytes: 0,
        level: 0,
        last_of_level: 0,
        last_report: 0.0,
        searching: false,
        pending_usable: input.usable,
        pending_sos: sos_input,
        pending_demods: input.demods,
        pending_goals: input.goals,
    })
}

fn run_search(state: &mut Search) -> Result<(), Outcome> {
    state.intake()?;
    state.searching = true;
    if !state.quiet() {
        println!(
            "\n%% Starting search at {:.2} seconds.",
            state.start.elapsed().as_secs_f64()
        );
    }
    loop {
        state.check_limits()?;
        if !state.givsel.available() {
            return Err(Outcome::SosEmpty);
        }
        state.make_inferences()?;
        state.limbo_process(false)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clause(s: &str) -> Clause {
        let mut c: Clause = s.parse().unwrap();
        c.justification = Justification::new(Step::Input);
        c
    }

    fn quiet_options() -> Options {
        let mut o = Options::new();
        o.change_flag("quiet", true).unwrap();
        o.change_flag("print_given", false).unwrap();
        o.change_flag("print_initial_clauses", false).unwrap();
        o.change_flag("bell", false).unwrap();
        o
    }

    fn run(usable: &[&str], sos: &[&str], demods: &[&str], tweak: impl FnOnce(&mut ProverInput)) -> ProverResults {
        crate::interrupt::clear();
        let mut input = ProverInput::default();
        input.options = quiet_options();
        input.usable = usable.iter().map(|s| clause(s)).collect();
        input.sos = sos.iter().map(|s| clause(s)).collect();
        input.demods = demods.iter().map(|s| clause(s)).collect();
        tweak(&mut input);
        search(input)
    }

    #[test]
    #[serial]
    fn propositional_unit_conflict() {
        symbols::reset_table();
        let r = run(&["p."], &["-p."], &[], |_| {});
        assert_eq!(r.return_code, 0);
        assert_eq!(r.stats.proofs, 1);
        assert_eq!(r.proofs.len(), 1);
        // p, -p, and the empty clause
        assert_eq!(r.proofs[0].len(), 3);
        assert!(r.proofs[0].last().unwrap().is_empty());
    }

    #[test]
    #[serial]
    fn saturation_without_proof_exits_sos_empty() {
        symbols::reset_table();
        let r = run(&["p(a)."], &["q(a)."], &[], |_| {});
        assert_eq!(r.return_code, 2);
        assert_eq!(r.stats.proofs, 0);
        assert!(r.proofs.is_empty());
        assert_eq!(r.stats.given, 1);
    }

    #[test]
    #[serial]
    fn empty_sos_at_start_exits_sos_empty() {
        symbols::reset_table();
        let r = run(&["p(a)."], &[], &[], |_| {});
        assert_eq!(r.return_code, 2);
        assert_eq!(r.stats.given, 0);
    }

    #[test]
    #[serial]
    fn demodulation_rewrite_chain_closes_the_goal() {
        symbols::reset_table();
        let r = run(
            &[],
            &["f(s(s(0)),s(s(0))) != s(s(s(s(0))))."],
            &["f(x,0) = x.", "f(x,s(y)) = s(f(x,y))."],
            |_| {},
        );
        assert_eq!(r.return_code, 0);
        assert_eq!(r.stats.proofs, 1);
        let proof = &r.proofs[0];
        assert!(proof.last().unwrap().is_empty());
        // the rewrite steps are recorded in the ancestry
        assert!(proof.iter().any(|c| c
            .justification
            .0
            .iter()
            .any(|s| matches!(s, Step::Demod(_)))));
    }

    #[test]
    #[serial]
    fn equality_proof_via_demod_and_conflict() {
        symbols::reset_table();
        let r = run(&["p(a)."], &["a = b.", "-p(b)."], &[], |_| {});
        assert_eq!(r.return_code, 0);
        assert_eq!(r.stats.proofs, 1);
    }

    #[test]
    #[serial]
    fn max_weight_prunes_heavy_clauses() {
        symbols::reset_table();
        let r = run(
            &["-p(x) | p(f(x))."],
            &["p(a)."],
            &[],
            |input| {
                input
                    .options
                    .apply(Change::AssignFloat(FloatParm::MaxWeight, 4.0))
                    .unwrap();
            },
        );
        assert_eq!(r.return_code, 2);
        assert!(r.stats.deleted_by_rule > 0);
        assert_eq!(r.stats.proofs, 0);
    }

    #[test]
    #[serial]
    fn max_given_limit() {
        symbols::reset_table();
        let r = run(
            &["-p(x) | p(f(x))."],
            &["p(a)."],
            &[],
            |input| {
                input
                    .options
                    .apply(Change::Assign(Parm::MaxGiven, 3))
                    .unwrap();
            },
        );
        assert_eq!(r.return_code, 5);
        assert_eq!(r.stats.given, 4);
    }

    #[test]
    #[serial]
    fn unorientable_equation_is_not_a_demodulator() {
        symbols::reset_table();
        let r = run(
            &["-p(x) | p(f(x,y))."],
            &["f(x,y) = f(y,x).", "p(a)."],
            &[],
            |input| {
                input
                    .options
                    .apply(Change::Assign(Parm::MaxGiven, 5))
                    .unwrap();
            },
        );
        // the commutativity equation is kept as an ordinary clause;
        // the lex-dep machinery may index it but nothing is oriented
        assert!(r.stats.new_demodulators <= 1);
        assert_eq!(r.stats.new_demodulators, r.stats.new_lex_demods);
    }

    #[test]
    #[serial]
    fn clause_ids_are_unique_and_monotone_in_proofs() {
        symbols::reset_table();
        let r = run(&["p."], &["-p."], &[], |_| {});
        let proof = &r.proofs[0];
        let mut prev = 0;
        for c in proof {
            assert!(c.id > prev, "ids must be strictly increasing in a proof");
            prev = c.id;
        }
    }

    #[test]
    #[serial]
    fn ancestors_of_empties_are_marked_used() {
        symbols::reset_table();
        let r = run(&["p."], &["-p."], &[], |_| {});
        for c in &r.proofs[0] {
            assert!(c.used, "clause {} in proof must be marked used", c.id);
        }
    }

    #[test]
    #[serial]
    fn action_exit_fires() {
        symbols::reset_table();
        let r = run(
            &["-p(x) | p(f(x))."],
            &["p(a)."],
            &[],
            |input| {
                input
                    .actions
                    .push(ActionRule::new(Watched::Given, 2, ActionOp::Exit));
            },
        );
        assert_eq!(r.return_code, 7);
    }

    #[test]
    #[serial]
    fn binary_resolution_chain_with_factoring_finds_proof() {
        symbols::reset_table();
        // {p(x) | p(y)} and {-p(x) | -p(y)} need factoring for a refutation
        let r = run(&["p(x) | p(y)."], &["-p(x) | -p(y)."], &[], |input| {
            input.options.change_flag("factor", true).unwrap();
            input
                .options
                .apply(Change::Assign(Parm::MaxGiven, 20))
                .unwrap();
        });
        assert_eq!(r.return_code, 0);
    }

    #[test]
    #[serial]
    fn commutativity_is_detected_for_cac() {
        symbols::reset_table();
        let r = run(
            &["-p(x) | p(f(x,a))."],
            &["f(x,y) = f(y,x).", "p(a)."],
            &[],
            |input| {
                input
                    .options
                    .apply(Change::Assign(Parm::MaxGiven, 4))
                    .unwrap();
            },
        );
        let f = symbols::lookup("f", 2).unwrap();
        assert!(symbols::is_commutative(f));
        let _ = r;
    }

    #[test]
    #[serial]
    fn back_subsumption_disables_weaker_clauses() {
        symbols::reset_table();
        // q(f(a)) enters sos first; the derived q(x)... instead check that
        // a unit derived later back subsumes a longer stored clause
        let r = run(
            &["-p(x) | q(x)."],
            &["p(x).", "q(f(a)) | r(a)."],
            &[],
            |input| {
                input
                    .options
                    .apply(Change::Assign(Parm::MaxGiven, 10))
                    .unwrap();
            },
        );
        // resolving p(x) with -p(x)|q(x) gives q(x), which back subsumes
        // q(f(a)) | r(a)
        assert!(r.stats.back_subsumed >= 1);
    }
}
