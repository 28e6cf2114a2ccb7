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

//! Process-isolated search.
//!
//! `forking_search` runs the search in a child process so the parent
//! survives crashes and unbounded memory growth.  It spawns the current
//! executable with a marker in the environment; the child re-parses the
//! same input from stdin, searches quietly, and writes the results on
//! stdout as the length-prefixed int stream from the `wire` module.  The
//! parent re-interns any symbols the child introduced, rebuilds the
//! results, and reports them as if the search had run locally.

use std::io::{Read, Write};
use std::process::{Command, Stdio};

use crate::error::{FatalError, Outcome};
use crate::input::parse_input;
use crate::options::{Change, Flag, StringParm};
use crate::search::{search, ProverResults, Stats};
use crate::symbols;
use crate::wire;

/// Environment marker that switches the binary into child-search mode.
pub const CHILD_ENV: &str = "PONENS_CHILD_SEARCH";

/// Run the search in a child process.  `source` is the full input text,
/// exactly as the parent read it.
pub fn forking_search(source: &str) -> Result<ProverResults, FatalError> {
    let exe = std::env::current_exe()
        .map_err(|e| FatalError::Other(format!("cannot locate own executable: {}", e)))?;
    let mut child = Command::new(exe)
        .env(CHILD_ENV, "1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| FatalError::Other(format!("spawn failed: {}", e)))?;

    child
        .stdin
        .take()
        .expect("child stdin is piped")
        .write_all(source.as_bytes())
        .map_err(|_| FatalError::ShortPipeWrite)?;

    let mut bytes = Vec::new();
    child
        .stdout
        .take()
        .expect("child stdout is piped")
        .read_to_end(&mut bytes)
        .map_err(|e| FatalError::Other(format!("read from child failed: {}", e)))?;
    let status = child
        .wait()
        .map_err(|e| FatalError::Other(format!("wait for child failed: {}", e)))?;

    match wire::IntBuf::from_bytes(&bytes).and_then(wire::decode_results) {
        Ok(results) => Ok(results),
        Err(_) if !status.success() => {
            // the child died without a result block
            Ok(ProverResults {
                proofs: Vec::new(),
                stats: Stats::default(),
                user_seconds: 0.0,
                system_seconds: 0.0,
                return_code: Outcome::Crashed.exit_code(),
            })
        }
        Err(e) => Err(e),
    }
}

/// The child half: parse stdin, search without printing, stream the
/// results on stdout.  Returns the process exit code.  Called by the
/// binary when the environment marker is present.
pub fn child_search_main() -> i32 {
    let mut source = String::new();
    if std::io::stdin().read_to_string(&mut source).is_err() {
        return 1;
    }
    let mut input = match parse_input(&source) {
        Ok(i) => i,
        Err(_) => return 1,
    };
    // the parent prints; the child's stdout carries only the wire stream
    let _ = input.options.apply(Change::Set(Flag::Quiet));
    let _ = input
        .options
        .apply(Change::AssignString(StringParm::Stats, "none".to_string()));

    symbols::mark_for_new_symbols();
    let results = search(input);
    let new_symbols: Vec<(usize, usize)> = symbols::new_symbols_since_mark()
        .into_iter()
        .map(|(id, _, arity)| (id, arity))
        .collect();

    let buf = wire::encode_results(&results, &new_symbols);
    let bytes = buf.to_bytes();
    let mut out = std::io::stdout();
    if out.write_all(&bytes).is_err() || out.flush().is_err() {
        eprintln!("\x07Fatal error: {}", FatalError::ShortPipeWrite);
        return 1;
    }
    results.return_code
}

/// True when this process was spawned as a search child.
pub fn is_child() -> bool {
    std::env::var(CHILD_ENV).is_ok()
}
