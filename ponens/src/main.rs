// Ponens, a saturation-based theorem prover for first-order logic
// Copyright (C) 2022 University College London

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::io::Read;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{arg, crate_version, Arg, Command};
use codespan_reporting::{
    diagnostic::Diagnostic,
    files::SimpleFile,
    term::{
        self,
        termcolor::{ColorChoice, StandardStream, WriteColor},
        Config,
    },
};
use colored::Colorize;

use ponens_lib::error::Outcome;
use ponens_lib::input::parse_input;
use ponens_lib::interrupt;
use ponens_lib::options::Flag;
use ponens_lib::search::{search, ProverResults};

fn print_diagnostics<'files, F: codespan_reporting::files::Files<'files, FileId = ()>>(
    diags: &[Diagnostic<()>],
    writer: &mut dyn WriteColor,
    config: &Config,
    files: &'files F,
) {
    for diagnostic in diags {
        term::emit(writer, config, files, diagnostic).expect("Error when printing to term.")
    }
}

fn read_source(path: Option<&str>) -> (String, String) {
    match path {
        Some(p) => {
            let file_name = Path::new(p)
                .file_name()
                .map(|o| o.to_string_lossy().to_string())
                .unwrap_or_else(|| p.to_string());
            match std::fs::read_to_string(p) {
                Ok(content) => (file_name, content),
                Err(err) => {
                    eprintln!("Error reading {}: {}", p, err);
                    std::process::exit(1);
                }
            }
        }
        None => {
            let mut content = String::new();
            if let Err(err) = std::io::stdin().read_to_string(&mut content) {
                eprintln!("Error reading stdin: {}", err);
                std::process::exit(1);
            }
            ("stdin".to_string(), content)
        }
    }
}

fn banner() {
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
    let epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    println!(
        "{}",
        "============================== Ponens ================================".bold()
    );
    println!("Ponens ({}) started by {} on {},", crate_version!(), user, host);
    println!("process {} at epoch {}.", std::process::id(), epoch);
    println!(
        "{}",
        "============================== end of head ==========================="
    );
}

fn exit_message(results: &ProverResults) {
    let outcome = Outcome::from_exit_code(results.return_code);
    println!(
        "\nExiting with {} proof{} ({}), after {:.2} seconds.",
        results.stats.proofs,
        if results.stats.proofs == 1 { "" } else { "s" },
        outcome.describe(),
        results.user_seconds
    );
}

fn write_json_stats(results: &ProverResults, target: Option<&str>) {
    let doc = serde_json::json!({
        "return_code": results.return_code,
        "user_seconds": results.user_seconds,
        "system_seconds": results.system_seconds,
        "proofs": results.stats.proofs,
        "stats": results.stats.clone(),
    });
    let rendered = serde_json::to_string_pretty(&doc).expect("stats serialize");
    match target {
        Some(path) if path != "-" => {
            if let Err(e) = std::fs::write(path, rendered) {
                eprintln!("Unable to write {}: {}", path, e);
            }
        }
        _ => println!("{}", rendered),
    }
}

fn main() {
    #[cfg(feature = "fork")]
    {
        if ponens_lib::fork::is_child() {
            std::process::exit(ponens_lib::fork::child_search_main());
        }
    }

    let matches = Command::new("ponens")
        .version(crate_version!())
        .about("A saturation-based theorem prover for first-order logic with equality")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("prove")
                .about("Search for a refutation of the input problem.")
                .arg(
                    Arg::new("FILE")
                        .required(false)
                        .help("Input file; stdin when omitted")
                        .index(1),
                )
                .arg(
                    Arg::new("JSON_STATS")
                        .long("json-stats")
                        .value_name("FILE")
                        .required(false)
                        .min_values(0)
                        .max_values(1)
                        .require_equals(true)
                        .help("Write final statistics as JSON")
                        .long_help(
                            "Write final statistics as JSON\n\
                             If this flag is given without a file name, the JSON goes to stdout.",
                        ),
                )
                .arg(arg!(-f --fork "Run the search in a child process."))
                .arg(arg!(-q --quiet "Suppress all non-essential output.")),
        )
        .get_matches();

    let err_writer = StandardStream::stderr(ColorChoice::Auto);
    let config = Config::default();

    match matches.subcommand().unwrap() {
        ("prove", sub) => {
            let (file_name, source) = read_source(sub.value_of("FILE"));
            let file = SimpleFile::new(file_name.as_str(), source.clone());

            let mut input = match parse_input(&source) {
                Ok(i) => i,
                Err(diags) => {
                    eprintln!("{} Did not parse the input successfully.", "error:".red());
                    print_diagnostics(&diags, &mut err_writer.lock(), &config, &file);
                    std::process::exit(1);
                }
            };
            if sub.is_present("quiet") {
                let _ = input.options.change_flag("quiet", true);
            }

            let quiet = input.options.flag(Flag::Quiet);
            if !quiet {
                banner();
                if input.options.flag(Flag::EchoInput) {
                    println!("\n{}", source.trim_end());
                    println!(
                        "\n{}",
                        "============================== end of input =========================="
                    );
                }
            }

            interrupt::clear();
            let interrupt_code = Outcome::Interrupt.exit_code();
            if let Err(e) = ctrlc::set_handler(move || interrupt::request(interrupt_code)) {
                eprintln!("WARNING: cannot install interrupt handler: {}", e);
            }

            let results = if sub.is_present("fork") {
                // the child re-parses the source; the local parse above
                // already validated it
                drop(input);
                run_forking(&source)
            } else {
                search(input)
            };

            if !quiet {
                exit_message(&results);
            }
            if sub.is_present("JSON_STATS") {
                write_json_stats(&results, sub.value_of("JSON_STATS"));
            }
            std::process::exit(results.return_code);
        }
        _ => (),
    }
}

#[cfg(feature = "fork")]
fn run_forking(source: &str) -> ProverResults {
    match ponens_lib::fork::forking_search(source) {
        Ok(results) => {
            // the child searched quietly; show its proofs here
            for (i, proof) in results.proofs.iter().enumerate() {
                println!(
                    "\n{}",
                    "============================== PROOF ================================="
                        .bold()
                );
                println!("\n% Proof {} (from child process) length {}.", i + 1, proof.len());
                println!();
                for c in proof {
                    println!("{} {}  {}.", c.id, c, c.justification);
                }
                println!(
                    "\n{}",
                    "============================== end of proof =========================="
                        .bold()
                );
            }
            results
        }
        Err(e) => {
            eprintln!("\x07Fatal error: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(not(feature = "fork"))]
fn run_forking(_source: &str) -> ProverResults {
    eprintln!("\x07Fatal error: this build does not include the fork feature");
    std::process::exit(1);
}
