//! Runtime configuration
//!
//! All tunable policy values live in [`BankConfig`]. Defaults match the
//! production policy; the CLI and tests override individual fields.

use std::time::Duration;

use rust_decimal::Decimal;

use crate::types::BankError;

/// Tunable policy values for the banking core
#[derive(Clone, Debug)]
pub struct BankConfig {
    /// Maximum outgoing transfer volume per account per UTC day
    pub daily_transfer_cap: Decimal,

    /// How long the engine waits for a fraud verdict before parking the
    /// transaction
    pub oracle_timeout: Duration,

    /// Annual interest rate (percent) applied to approved loans
    pub annual_loan_rate: Decimal,

    /// Default number of entries returned by audit queries
    pub audit_query_limit: usize,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            // 50,000.00 per account per UTC day
            daily_transfer_cap: Decimal::new(5_000_000, 2),
            oracle_timeout: Duration::from_secs(5),
            // 10.5% per annum
            annual_loan_rate: Decimal::new(105, 1),
            audit_query_limit: 100,
        }
    }
}

impl BankConfig {
    /// Check the configuration for nonsensical values
    ///
    /// # Errors
    ///
    /// Returns `BankError::InvalidConfig` naming the first offending
    /// field.
    pub fn validate(&self) -> Result<(), BankError> {
        if self.daily_transfer_cap <= Decimal::ZERO {
            return Err(BankError::invalid_config(
                "daily_transfer_cap",
                "must be positive",
            ));
        }
        if self.oracle_timeout.is_zero() {
            return Err(BankError::invalid_config(
                "oracle_timeout",
                "must be non-zero",
            ));
        }
        if self.annual_loan_rate < Decimal::ZERO {
            return Err(BankError::invalid_config(
                "annual_loan_rate",
                "must not be negative",
            ));
        }
        if self.audit_query_limit == 0 {
            return Err(BankError::invalid_config(
                "audit_query_limit",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_config_is_valid() {
        assert!(BankConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_cap_value() {
        let config = BankConfig::default();
        assert_eq!(config.daily_transfer_cap, Decimal::new(5_000_000, 2));
    }

    #[rstest]
    #[case::zero_cap(
        BankConfig { daily_transfer_cap: Decimal::ZERO, ..BankConfig::default() },
        "daily_transfer_cap"
    )]
    #[case::zero_timeout(
        BankConfig { oracle_timeout: Duration::ZERO, ..BankConfig::default() },
        "oracle_timeout"
    )]
    #[case::negative_rate(
        BankConfig { annual_loan_rate: Decimal::NEGATIVE_ONE, ..BankConfig::default() },
        "annual_loan_rate"
    )]
    #[case::zero_audit_limit(
        BankConfig { audit_query_limit: 0, ..BankConfig::default() },
        "audit_query_limit"
    )]
    fn test_validate_rejects_bad_fields(#[case] config: BankConfig, #[case] field: &str) {
        match config.validate() {
            Err(BankError::InvalidConfig { field: f, .. }) => assert_eq!(f, field),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }
}
