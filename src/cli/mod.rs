// Command-line surface of the scenario replay binary

mod args;

pub use args::{build_oracle, CliArgs};

use clap::Parser;

/// Parse the replay binary's command line
///
/// On invalid or missing arguments (or `--help`) clap prints its
/// message and exits the process; callers only ever see parsed args.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
