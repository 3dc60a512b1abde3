//! `niddb` — lint and query NID database sources offline.
//!
//! ```text
//! niddb check db/*.txt
//! niddb lookup --module SceNet --symbol sceNetInit db/*.txt
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "niddb", about = "Offline NID database tooling", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse database sources and report modules, symbols, and warnings.
    Check {
        /// Database source files, merged in order.
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Exit non-zero if the sources produce any warning.
        #[arg(long)]
        strict: bool,
    },

    /// Print the NID recorded for one symbol.
    Lookup {
        /// Module name as registered in the database.
        #[arg(long)]
        module: String,

        /// Exported symbol name.
        #[arg(long)]
        symbol: String,

        /// Database source files, merged in order.
        #[arg(required = true)]
        sources: Vec<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("niddb: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<ExitCode, vitadl_harness::HarnessError> {
    match command {
        Command::Check { sources, strict } => {
            let report = vitadl_harness::check(&sources)?;
            println!("{}", to_json(&report));
            if strict && !vitadl_harness::is_clean(&report) {
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Lookup {
            module,
            symbol,
            sources,
        } => {
            let report = vitadl_harness::lookup(&sources, &module, &symbol)?;
            println!("{}", to_json(&report));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn to_json(value: &impl serde::Serialize) -> String {
    serde_json::to_string_pretty(value).expect("report serialization cannot fail")
}
