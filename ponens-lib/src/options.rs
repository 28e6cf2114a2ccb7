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

//! The options runtime: flags, parms, floatparms and stringparms.
//!
//! Every option has a name for the input language, a default, and (for
//! parms) a range.  Setting an option can trigger further changes through
//! the dependency table; `ignore_option_dependencies` turns that off.
//! Options may legally change mid-run — the search reads them fresh each
//! loop iteration.

use crate::error::FatalError;

macro_rules! flags {
    ($(($variant:ident, $name:expr, $default:expr)),* $(,)?) => {
        #[derive(Clone, Copy, PartialEq, Eq, Debug)]
        pub enum Flag { $($variant),* }

        pub const ALL_FLAGS: &[Flag] = &[$(Flag::$variant),*];

        impl Flag {
            pub fn name(self) -> &'static str {
                match self { $(Flag::$variant => $name),* }
            }
            pub fn default(self) -> bool {
                match self { $(Flag::$variant => $default),* }
            }
            pub fn from_name(s: &str) -> Option<Flag> {
                match s { $($name => Some(Flag::$variant),)* _ => None }
            }
        }
    }
}

flags! {
    // inference rules
    (BinaryResolution, "binary_resolution", false),
    (NegBinaryResolution, "neg_binary_resolution", false),
    (PosHyperResolution, "pos_hyper_resolution", false),
    (NegHyperResolution, "neg_hyper_resolution", false),
    (PosUrResolution, "pos_ur_resolution", false),
    (NegUrResolution, "neg_ur_resolution", false),
    (Paramodulation, "paramodulation", false),
    (Factor, "factor", false),
    // restrictions on inference rules
    (OrderedRes, "ordered_res", true),
    (OrderedPara, "ordered_para", true),
    (CheckResInstances, "check_res_instances", false),
    (CheckParaInstances, "check_para_instances", false),
    (ParaUnitsOnly, "para_units_only", false),
    (ParaFromVars, "para_from_vars", false),
    (ParaIntoVars, "para_into_vars", false),
    (ParaFromSmall, "para_from_small", false),
    (BasicParamodulation, "basic_paramodulation", false),
    // processing generated clauses
    (ProcessInitialSos, "process_initial_sos", true),
    (BackDemod, "back_demod", true),
    (LexDepDemod, "lex_dep_demod", false),
    (LexDepDemodSane, "lex_dep_demod_sane", true),
    (SafeUnitConflict, "safe_unit_conflict", false),
    (BackSubsume, "back_subsume", true),
    (UnitDeletion, "unit_deletion", false),
    (CacRedundancy, "cac_redundancy", true),
    (DegradeHints, "degrade_hints", true),
    (LimitHintMatchers, "limit_hint_matchers", false),
    (BackDemodHints, "back_demod_hints", true),
    (DontFlipInput, "dont_flip_input", false),
    // output
    (EchoInput, "echo_input", true),
    (Bell, "bell", true),
    (Quiet, "quiet", false),
    (PrintInitialClauses, "print_initial_clauses", true),
    (PrintGiven, "print_given", true),
    (PrintGen, "print_gen", false),
    (PrintKept, "print_kept", false),
    (PrintLabeled, "print_labeled", false),
    (PrintProofs, "print_proofs", true),
    (PrintClauseProperties, "print_clause_properties", false),
    // input processing
    (RestrictDenials, "restrict_denials", false),
    (SortInitialSos, "sort_initial_sos", false),
    (PrologStyleVariables, "prolog_style_variables", false),
    // selecting the given clause
    (InputSosFirst, "input_sos_first", true),
    (BreadthFirst, "breadth_first", false),
    (LightestFirst, "lightest_first", false),
    (DefaultParts, "default_parts", true),
    (RandomGiven, "random_given", false),
    (BreadthFirstHints, "breadth_first_hints", false),
    // auto modes
    (Automatic, "auto", true),
    (AutoInference, "auto_inference", true),
    (AutoLimits, "auto_limits", true),
    (AutoDenials, "auto_denials", true),
    (Raw, "raw", false),
    (Production, "production", false),
    // others
    (LexOrderVars, "lex_order_vars", false),
    (IgnoreOptionDependencies, "ignore_option_dependencies", false),
}

macro_rules! parms {
    ($(($variant:ident, $name:expr, $default:expr, $min:expr, $max:expr)),* $(,)?) => {
        #[derive(Clone, Copy, PartialEq, Eq, Debug)]
        pub enum Parm { $($variant),* }

        pub const ALL_PARMS: &[Parm] = &[$(Parm::$variant),*];

        impl Parm {
            pub fn name(self) -> &'static str {
                match self { $(Parm::$variant => $name),* }
            }
            pub fn default(self) -> i64 {
                match self { $(Parm::$variant => $default),* }
            }
            pub fn range(self) -> (i64, i64) {
                match self { $(Parm::$variant => ($min, $max)),* }
            }
            pub fn from_name(s: &str) -> Option<Parm> {
                match s { $($name => Some(Parm::$variant),)* _ => None }
            }
        }
    }
}

const INF: i64 = i64::MAX;

parms! {
    // search limits; -1 means no limit
    (MaxGiven, "max_given", -1, -1, INF),
    (MaxKept, "max_kept", -1, -1, INF),
    (MaxProofs, "max_proofs", 1, -1, INF),
    (MaxMegs, "max_megs", 200, -1, INF),
    (MaxSeconds, "max_seconds", -1, -1, INF),
    // inference
    (NewConstants, "new_constants", 0, 0, INF),
    (ParaLitLimit, "para_lit_limit", -1, -1, INF),
    (UrNucleusLimit, "ur_nucleus_limit", -1, -1, INF),
    // select given clause
    (HintsPart, "hints_part", INF, 0, INF),
    (AgePart, "age_part", 1, 0, INF),
    (WeightPart, "weight_part", 0, 0, INF),
    (TruePart, "true_part", 4, 0, INF),
    (FalsePart, "false_part", 4, 0, INF),
    (RandomPart, "random_part", 0, 0, INF),
    (RandomSeed, "random_seed", 0, 0, INF),
    (EvalLimit, "eval_limit", 1024, -1, INF),
    (EvalVarLimit, "eval_var_limit", -1, -1, INF),
    // processing generated clauses
    (MaxDepth, "max_depth", -1, -1, INF),
    (MaxLiterals, "max_literals", -1, -1, INF),
    (MaxVars, "max_vars", -1, -1, INF),
    (LexDepDemodLim, "lex_dep_demod_lim", 11, -1, INF),
    (DemodStepLimit, "demod_step_limit", 1000, -1, INF),
    (DemodIncreaseLimit, "demod_increase_limit", 1000, -1, INF),
    (BacksubCheck, "backsub_check", 500, 0, INF),
    // weighting
    (VariableWeight, "variable_weight", 1, -INF, INF),
    (ConstantWeight, "constant_weight", 1, -INF, INF),
    (NotWeight, "not_weight", 0, -INF, INF),
    (OrWeight, "or_weight", 0, -INF, INF),
    (SkConstantWeight, "sk_constant_weight", 1, -INF, INF),
    (PropAtomWeight, "prop_atom_weight", 1, -INF, INF),
    (NestPenalty, "nest_penalty", 0, 0, INF),
    (DepthPenalty, "depth_penalty", 0, -INF, INF),
    (VarPenalty, "var_penalty", 0, -INF, INF),
    // control size of SOS
    (SosLimit, "sos_limit", 20000, -1, INF),
    (SosKeepFactor, "sos_keep_factor", 3, 2, 10),
    (MinSosLimit, "min_sos_limit", 0, 0, INF),
    // reporting
    (Report, "report", -1, -1, INF),
}

macro_rules! floatparms {
    ($(($variant:ident, $name:expr, $default:expr)),* $(,)?) => {
        #[derive(Clone, Copy, PartialEq, Eq, Debug)]
        pub enum FloatParm { $($variant),* }

        pub const ALL_FLOATPARMS: &[FloatParm] = &[$(FloatParm::$variant),*];

        impl FloatParm {
            pub fn name(self) -> &'static str {
                match self { $(FloatParm::$variant => $name),* }
            }
            pub fn default(self) -> f64 {
                match self { $(FloatParm::$variant => $default),* }
            }
            pub fn from_name(s: &str) -> Option<FloatParm> {
                match s { $($name => Some(FloatParm::$variant),)* _ => None }
            }
        }
    }
}

floatparms! {
    (MaxWeight, "max_weight", 1.0e9),
    (DefaultWeight, "default_weight", -1.0),
}

macro_rules! stringparms {
    ($(($variant:ident, $name:expr, $default:expr, $allowed:expr)),* $(,)?) => {
        #[derive(Clone, Copy, PartialEq, Eq, Debug)]
        pub enum StringParm { $($variant),* }

        pub const ALL_STRINGPARMS: &[StringParm] = &[$(StringParm::$variant),*];

        impl StringParm {
            pub fn name(self) -> &'static str {
                match self { $(StringParm::$variant => $name),* }
            }
            pub fn default(self) -> &'static str {
                match self { $(StringParm::$variant => $default),* }
            }
            pub fn allowed(self) -> &'static [&'static str] {
                match self { $(StringParm::$variant => $allowed),* }
            }
            pub fn from_name(s: &str) -> Option<StringParm> {
                match s { $($name => Some(StringParm::$variant),)* _ => None }
            }
        }
    }
}

stringparms! {
    (Order, "order", "lpo", &["lpo", "rpo", "kbo"]),
    (LiteralSelection, "literal_selection", "max_negative",
     &["max_negative", "maximal", "all", "none"]),
    (Stats, "stats", "lots", &["none", "some", "lots", "all"]),
    (MultipleInterps, "multiple_interps", "false_in_all",
     &["false_in_all", "false_in_some"]),
}

/// One option change, as written in the input or fired by a dependency.
#[derive(Clone, Debug, PartialEq)]
pub enum Change {
    Set(Flag),
    Clear(Flag),
    Assign(Parm, i64),
    AssignFloat(FloatParm, f64),
    AssignString(StringParm, String),
}

#[derive(Clone, Debug)]
pub struct Options {
    flags: Vec<bool>,
    parms: Vec<i64>,
    floats: Vec<f64>,
    strings: Vec<String>,
}

impl Default for Options {
    fn default() -> Self {
        Options::new()
    }
}

impl Options {
    pub fn new() -> Options {
        Options {
            flags: ALL_FLAGS.iter().map(|f| f.default()).collect(),
            parms: ALL_PARMS.iter().map(|p| p.default()).collect(),
            floats: ALL_FLOATPARMS.iter().map(|p| p.default()).collect(),
            strings: ALL_STRINGPARMS
                .iter()
                .map(|p| p.default().to_string())
                .collect(),
        }
    }

    pub fn flag(&self, f: Flag) -> bool {
        self.flags[f as usize]
    }

    pub fn parm(&self, p: Parm) -> i64 {
        self.parms[p as usize]
    }

    /// True when the parm limits and `n` has reached it (-1 disables).
    pub fn over_limit(&self, n: i64, p: Parm) -> bool {
        let lim = self.parm(p);
        lim != -1 && n >= lim
    }

    pub fn floatparm(&self, p: FloatParm) -> f64 {
        self.floats[p as usize]
    }

    pub fn stringparm(&self, p: StringParm) -> &str {
        &self.strings[p as usize]
    }

    /// Apply one change plus its dependency closure.
    pub fn apply(&mut self, change: Change) -> Result<(), FatalError> {
        let ignore = self.flag(Flag::IgnoreOptionDependencies);
        let mut queue = vec![change];
        // fixed point; the dependency table is acyclic in practice but a
        // visited set keeps pathological tables from looping
        let mut fired: Vec<Change> = Vec::new();
        while let Some(ch) = queue.pop() {
            if fired.contains(&ch) {
                continue;
            }
            self.apply_one(&ch)?;
            if !ignore {
                queue.extend(dependencies(&ch));
            }
            fired.push(ch);
        }
        Ok(())
    }

    fn apply_one(&mut self, change: &Change) -> Result<(), FatalError> {
        match change {
            Change::Set(f) => self.flags[*f as usize] = true,
            Change::Clear(f) => self.flags[*f as usize] = false,
            Change::Assign(p, v) => {
                let (min, max) = p.range();
                if *v < min || *v > max {
                    return Err(FatalError::OptionRange(format!(
                        "{} = {} (range {}..{})",
                        p.name(),
                        v,
                        min,
                        max
                    )));
                }
                self.parms[*p as usize] = *v;
            }
            Change::AssignFloat(p, v) => self.floats[*p as usize] = *v,
            Change::AssignString(p, v) => {
                if !p.allowed().contains(&v.as_str()) {
                    return Err(FatalError::OptionRange(format!(
                        "{} = {} (allowed: {})",
                        p.name(),
                        v,
                        p.allowed().join("|")
                    )));
                }
                self.strings[*p as usize] = v.clone();
            }
        }
        Ok(())
    }

    /// Resolve a `set(name)` / `clear(name)` from the input language.
    pub fn change_flag(&mut self, name: &str, value: bool) -> Result<(), FatalError> {
        let f = Flag::from_name(name).ok_or_else(|| FatalError::UnknownOption(name.to_string()))?;
        self.apply(if value { Change::Set(f) } else { Change::Clear(f) })
    }

    /// Resolve an `assign(name, value)` from the input language.
    pub fn assign_by_name(&mut self, name: &str, value: &str) -> Result<(), FatalError> {
        if let Some(p) = Parm::from_name(name) {
            let v: i64 = value
                .parse()
                .map_err(|_| FatalError::OptionRange(format!("{} = {}", name, value)))?;
            return self.apply(Change::Assign(p, v));
        }
        if let Some(p) = FloatParm::from_name(name) {
            let v: f64 = value
                .parse()
                .map_err(|_| FatalError::OptionRange(format!("{} = {}", name, value)))?;
            return self.apply(Change::AssignFloat(p, v));
        }
        if let Some(p) = StringParm::from_name(name) {
            return self.apply(Change::AssignString(p, value.to_string()));
        }
        Err(FatalError::UnknownOption(name.to_string()))
    }
}

/// The dependency table: applying the trigger also applies the effects.
/// Not idempotent by design — the raw/production bundles overwrite
/// whatever is in place when they fire.
fn dependencies(change: &Change) -> Vec<Change> {
    match change {
        Change::Set(Flag::BreadthFirst) => vec![
            Change::Assign(Parm::AgePart, 1),
            Change::Assign(Parm::WeightPart, 0),
            Change::Assign(Parm::TruePart, 0),
            Change::Assign(Parm::FalsePart, 0),
            Change::Assign(Parm::RandomPart, 0),
        ],
        Change::Set(Flag::LightestFirst) => vec![
            Change::Assign(Parm::AgePart, 0),
            Change::Assign(Parm::WeightPart, 1),
            Change::Assign(Parm::TruePart, 0),
            Change::Assign(Parm::FalsePart, 0),
            Change::Assign(Parm::RandomPart, 0),
        ],
        Change::Set(Flag::RandomGiven) => vec![
            Change::Assign(Parm::AgePart, 0),
            Change::Assign(Parm::WeightPart, 0),
            Change::Assign(Parm::TruePart, 0),
            Change::Assign(Parm::FalsePart, 0),
            Change::Assign(Parm::RandomPart, 1),
        ],
        Change::Set(Flag::Raw) => vec![
            Change::Clear(Flag::OrderedRes),
            Change::Clear(Flag::OrderedPara),
            Change::Clear(Flag::BackSubsume),
            Change::Clear(Flag::BackDemod),
            Change::Clear(Flag::CacRedundancy),
            Change::Clear(Flag::Automatic),
            Change::Clear(Flag::AutoInference),
            Change::Clear(Flag::AutoLimits),
        ],
        Change::Set(Flag::Production) => vec![
            Change::Set(Flag::PosHyperResolution),
            Change::Clear(Flag::OrderedRes),
            Change::Clear(Flag::Automatic),
            Change::Clear(Flag::AutoInference),
        ],
        Change::Clear(Flag::Automatic) => vec![
            Change::Clear(Flag::AutoInference),
            Change::Clear(Flag::AutoLimits),
            Change::Clear(Flag::AutoDenials),
        ],
        Change::Set(Flag::ParaFromSmall) => vec![Change::Set(Flag::Paramodulation)],
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_in_range() {
        let o = Options::new();
        for p in ALL_PARMS {
            let (min, max) = p.range();
            assert!(p.default() >= min && p.default() <= max, "{}", p.name());
        }
        assert_eq!(o.parm(Parm::MaxProofs), 1);
        assert!(o.flag(Flag::OrderedRes));
        assert_eq!(o.stringparm(StringParm::Order), "lpo");
    }

    #[test]
    fn name_lookup_round_trips() {
        for f in ALL_FLAGS {
            assert_eq!(Flag::from_name(f.name()), Some(*f));
        }
        for p in ALL_PARMS {
            assert_eq!(Parm::from_name(p.name()), Some(*p));
        }
        assert_eq!(Flag::from_name("no_such_flag"), None);
    }

    #[test]
    fn range_checking() {
        let mut o = Options::new();
        assert!(o.apply(Change::Assign(Parm::SosKeepFactor, 1)).is_err());
        assert!(o.apply(Change::Assign(Parm::SosKeepFactor, 5)).is_ok());
        assert_eq!(o.parm(Parm::SosKeepFactor), 5);
        assert!(o
            .assign_by_name("literal_selection", "bogus")
            .is_err());
        assert!(o.assign_by_name("literal_selection", "all").is_ok());
    }

    #[test]
    fn dependencies_fire_to_fixed_point() {
        let mut o = Options::new();
        o.change_flag("breadth_first", true).unwrap();
        assert_eq!(o.parm(Parm::AgePart), 1);
        assert_eq!(o.parm(Parm::FalsePart), 0);
        assert_eq!(o.parm(Parm::TruePart), 0);
    }

    #[test]
    fn ignore_option_dependencies() {
        let mut o = Options::new();
        o.change_flag("ignore_option_dependencies", true).unwrap();
        o.change_flag("breadth_first", true).unwrap();
        // parts keep their defaults since the table did not fire
        assert_eq!(o.parm(Parm::FalsePart), 4);
    }

    #[test]
    fn over_limit_respects_disabled() {
        let mut o = Options::new();
        assert!(!o.over_limit(1_000_000, Parm::MaxGiven));
        o.apply(Change::Assign(Parm::MaxGiven, 10)).unwrap();
        assert!(o.over_limit(10, Parm::MaxGiven));
        assert!(!o.over_limit(9, Parm::MaxGiven));
    }
}
