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

//! Cooperative interruption.
//!
//! Signal handlers (installed by the binary) only store a flag here; the
//! search polls it at loop boundaries and at every clause-processing
//! entry, then unwinds in an orderly way with the recorded exit code.

use std::sync::atomic::{AtomicI32, Ordering};

static REQUESTED: AtomicI32 = AtomicI32::new(0);

/// Ask the search to stop with this exit code at the next safe point.
pub fn request(code: i32) {
    REQUESTED.store(code, Ordering::SeqCst);
}

/// The pending exit code, if an interrupt was requested.
pub fn check() -> Option<i32> {
    match REQUESTED.load(Ordering::SeqCst) {
        0 => None,
        code => Some(code),
    }
}

pub fn clear() {
    REQUESTED.store(0, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn request_and_clear() {
        clear();
        assert_eq!(check(), None);
        request(101);
        assert_eq!(check(), Some(101));
        clear();
        assert_eq!(check(), None);
    }
}
