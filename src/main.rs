//! Corebank CLI
//!
//! Command-line interface for replaying banking scenario files.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- scenario.csv > balances.csv
//! cargo run -- --oracle flag-over=1000 scenario.csv > balances.csv
//! cargo run -- --daily-cap 500 --oracle-timeout-ms 250 scenario.csv > balances.csv
//! ```
//!
//! The program assembles a fresh bank with the configured fraud oracle,
//! replays every step of the scenario file against it, and writes the
//! final account balances to stdout. Step failures are logged to stderr
//! and do not stop the replay.
//!
//! Set `RUST_LOG` to control log verbosity (e.g. `RUST_LOG=debug`).
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (bad oracle spec, invalid configuration, unreadable
//!   scenario file, etc.)

use std::process;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use corebank::bank::Bank;
use corebank::cli;
use corebank::io::replay;

#[tokio::main]
async fn main() {
    // Logs go to stderr so the balance report on stdout stays clean.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = cli::parse_args();

    let oracle = match cli::build_oracle(&args.oracle) {
        Ok(oracle) => oracle,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let bank = match Bank::new(args.to_config(), oracle) {
        Ok(bank) => bank,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let mut output = std::io::stdout();
    match replay::run_scenario(&bank, &args.scenario_file, &mut output).await {
        Ok(summary) => {
            info!(
                applied = summary.applied,
                failed = summary.failed,
                "replay complete"
            );
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
