//! # Grader
//!
//! Entry point for the grading server binary.
//!
//! Parses the command line, installs the log subscriber, serves one session
//! and prints the result. Exits non-zero when the session ended in an error.

use anyhow::{bail, Result};
use clap::Parser;
use dispatch::Outcome;
use grader::{app, cli::Cli};
use tracing::Level;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let outcome = app::run(&cli)?;
    let report = app::report(&outcome);
    if matches!(outcome, Outcome::Finished(_)) && outcome.mean_reward().is_none() {
        bail!(report);
    }
    println!("{report}");
    Ok(())
}

/// `--verbose` switches from INFO to DEBUG, which adds a line per command,
/// per response and the running score.
fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();
}
