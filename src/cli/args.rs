use crate::config::BankConfig;
use crate::core::oracle::{FraudOracle, StaticOracle, ThresholdOracle, UnreachableOracle};
use clap::Parser;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Replay a banking scenario file and report final balances
#[derive(Parser, Debug)]
#[command(name = "corebank")]
#[command(about = "Replay a banking scenario and report final balances", long_about = None)]
pub struct CliArgs {
    /// Input CSV scenario file
    #[arg(value_name = "SCENARIO", help = "Path to the scenario CSV file")]
    pub scenario_file: PathBuf,

    /// Fraud oracle behavior
    #[arg(
        long = "oracle",
        value_name = "ORACLE",
        default_value = "approve",
        help = "Oracle behavior: 'approve', 'flag-all', 'flag-over=<amount>', or 'fail'"
    )]
    pub oracle: String,

    /// Per-account daily transfer cap
    #[arg(
        long = "daily-cap",
        value_name = "AMOUNT",
        help = "Daily outgoing transfer cap per account (default: 50000.00)"
    )]
    pub daily_cap: Option<Decimal>,

    /// Fraud oracle timeout in milliseconds
    #[arg(
        long = "oracle-timeout-ms",
        value_name = "MILLIS",
        help = "How long to wait for a fraud verdict before parking the transfer (default: 5000)"
    )]
    pub oracle_timeout_ms: Option<u64>,

    /// Annual loan interest rate in percent
    #[arg(
        long = "loan-rate",
        value_name = "PERCENT",
        help = "Annual interest rate applied to approved loans (default: 10.5)"
    )]
    pub loan_rate: Option<Decimal>,
}

impl CliArgs {
    /// Build a [`BankConfig`] from the CLI overrides
    ///
    /// Fields not given on the command line keep their defaults. The
    /// result is not validated here; [`crate::Bank`] validates at
    /// assembly.
    pub fn to_config(&self) -> BankConfig {
        let mut config = BankConfig::default();
        if let Some(cap) = self.daily_cap {
            config.daily_transfer_cap = cap;
        }
        if let Some(millis) = self.oracle_timeout_ms {
            config.oracle_timeout = Duration::from_millis(millis);
        }
        if let Some(rate) = self.loan_rate {
            config.annual_loan_rate = rate;
        }
        config
    }
}

/// Build a fraud oracle from its CLI spec
///
/// Accepted specs:
/// - `approve` - clears every transfer
/// - `flag-all` - flags every transfer
/// - `flag-over=<amount>` - flags transfers above the amount
/// - `fail` - reports an outage on every call
pub fn build_oracle(spec: &str) -> Result<Arc<dyn FraudOracle>, String> {
    match spec {
        "approve" => Ok(Arc::new(StaticOracle::approve_all())),
        "flag-all" => Ok(Arc::new(StaticOracle::flag_all("flagged by policy"))),
        "fail" => Ok(Arc::new(UnreachableOracle)),
        other => match other.strip_prefix("flag-over=") {
            Some(raw) => {
                let threshold = Decimal::from_str(raw)
                    .map_err(|_| format!("invalid oracle threshold '{}'", raw))?;
                Ok(Arc::new(ThresholdOracle::new(threshold)))
            }
            None => Err(format!(
                "unknown oracle spec '{}': expected approve, flag-all, flag-over=<amount>, or fail",
                other
            )),
        },
    }
}
