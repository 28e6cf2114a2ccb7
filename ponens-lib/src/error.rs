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

//! Error and termination types.
//!
//! Fatal errors abort the search and map to exit code 1; they are never
//! recovered from inside simplification or inference.  Everything else
//! that ends a search — a proof, an exhausted SOS, a resource limit, an
//! action, an interrupt — is an ordinary outcome, not an error.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FatalError {
    #[error("unknown option: {0}")]
    UnknownOption(String),
    #[error("option value out of range: {0}")]
    OptionRange(String),
    #[error("index invariant violated: {0}")]
    IndexInvariant(String),
    #[error("back subsume limbo clause {0}")]
    BackSubsumeLimbo(u32),
    #[error("demodulator fails the variable-subset test: {0}")]
    NonTerminatingDemodulator(String),
    #[error("bad kbo weights: {0}")]
    BadKboWeights(String),
    #[error("bad input: {0}")]
    Input(String),
    #[error("short write on child pipe")]
    ShortPipeWrite,
    #[error("malformed child stream: {0}")]
    BadWireData(String),
    #[error("{0}")]
    Other(String),
}

/// Why the search stopped.  Ordered here to match the documented exit
/// codes.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    MaxProofs,
    Fatal(FatalError),
    SosEmpty,
    MaxMegs,
    MaxSeconds,
    MaxGiven,
    MaxKept,
    ActionExit,
    Interrupt,
    Crashed,
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::MaxProofs => 0,
            Outcome::Fatal(_) => 1,
            Outcome::SosEmpty => 2,
            Outcome::MaxMegs => 3,
            Outcome::MaxSeconds => 4,
            Outcome::MaxGiven => 5,
            Outcome::MaxKept => 6,
            Outcome::ActionExit => 7,
            Outcome::Interrupt => 101,
            Outcome::Crashed => 102,
        }
    }

    pub fn from_exit_code(code: i32) -> Outcome {
        match code {
            0 => Outcome::MaxProofs,
            2 => Outcome::SosEmpty,
            3 => Outcome::MaxMegs,
            4 => Outcome::MaxSeconds,
            5 => Outcome::MaxGiven,
            6 => Outcome::MaxKept,
            7 => Outcome::ActionExit,
            101 => Outcome::Interrupt,
            102 => Outcome::Crashed,
            _ => Outcome::Fatal(FatalError::Other(format!("exit code {}", code))),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Outcome::MaxProofs => "max_proofs",
            Outcome::Fatal(_) => "fatal",
            Outcome::SosEmpty => "sos_empty",
            Outcome::MaxMegs => "max_megs",
            Outcome::MaxSeconds => "max_seconds",
            Outcome::MaxGiven => "max_given",
            Outcome::MaxKept => "max_kept",
            Outcome::ActionExit => "action",
            Outcome::Interrupt => "interrupt",
            Outcome::Crashed => "crashed",
        }
    }
}

impl From<FatalError> for Outcome {
    fn from(e: FatalError) -> Outcome {
        Outcome::Fatal(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_round_trip() {
        for o in [
            Outcome::MaxProofs,
            Outcome::SosEmpty,
            Outcome::MaxMegs,
            Outcome::MaxSeconds,
            Outcome::MaxGiven,
            Outcome::MaxKept,
            Outcome::ActionExit,
            Outcome::Interrupt,
            Outcome::Crashed,
        ] {
            assert_eq!(Outcome::from_exit_code(o.exit_code()), o);
        }
        assert_eq!(
            Outcome::Fatal(FatalError::ShortPipeWrite).exit_code(),
            1
        );
    }
}
