// SPDX-FileCopyrightText: 2025 stfnw
// SPDX-License-Identifier: MIT

use bitlambda::format::named;
use bitlambda::{eval, MachineConfig, Outcome};

use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Run a bitwise-I/O lambda calculus program on stdin and stdout.
///
/// Stdout carries only the program's output bytes (and trace lines with
/// `--trace`). Everything else, including the "Parsing success!" message,
/// goes to stderr as log output; set `RUST_LOG=info` to see it.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Program source file.
    file: PathBuf,

    /// Print every operation reaching the head of the term to stdout.
    #[arg(long)]
    trace: bool,

    /// Stop after this many reduction steps.
    #[arg(long, value_name = "N")]
    max_steps: Option<u64>,
}

fn run(cli: &Cli) -> anyhow::Result<Outcome> {
    let source = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("Failed to open file {}", cli.file.display()))?;
    let term = named::decode(&cli.file.display().to_string(), &source)?;
    info!("Parsing success!");

    let config = MachineConfig {
        trace: cli.trace,
        max_steps: cli.max_steps,
    };
    let output = BufWriter::new(io::stdout().lock());
    let outcome = eval(term, io::stdin().lock(), output, config)?;
    Ok(outcome)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(Outcome::StepLimitExceeded { stats }) => {
            warn!(steps = stats.steps(), "step limit exceeded");
            ExitCode::from(2)
        }
        Ok(outcome) => {
            info!(stats = ?outcome.stats(), "done");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
