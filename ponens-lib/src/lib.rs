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

//! Ponens is a saturation-based theorem prover for first-order logic with
//! equality.  The library is organised bottom-up: the symbol table and term
//! store, unification and term orderings, the retrieval indexes, the
//! inference and simplification engine, and finally the given-clause search
//! loop that ties them together.

pub mod actions;
pub mod avl;
pub mod clause;
pub mod clausify;
pub mod demod;
pub mod discrim;
pub mod error;
pub mod features;
pub mod fpa;
#[cfg(feature = "fork")]
pub mod fork;
pub mod givselect;
pub mod hints;
pub mod input;
pub mod interp;
pub mod interrupt;
pub mod just;
pub mod options;
pub mod order;
pub mod paramod;
pub mod proofs;
pub mod resolve;
pub mod search;
pub mod subsume;
pub mod symbols;
pub mod term;
pub mod unify;
pub mod weight;
pub mod wire;
