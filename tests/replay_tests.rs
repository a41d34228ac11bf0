//! Scenario replay integration tests
//!
//! These tests validate the complete replay pipeline using predefined
//! CSV fixtures. Each test:
//! 1. Reads input.csv from a fixture directory
//! 2. Replays every step against a fresh bank
//! 3. Compares the balance report with expected.csv
//!
//! Fixtures live in tests/fixtures/ and cover the happy path, refusals
//! (insufficient funds, daily cap, KYC gate), the fraud review flow,
//! and the loan lifecycle. The oracle and config for each fixture are
//! part of the case table.

#[cfg(test)]
mod tests {
    use corebank::bank::Bank;
    use corebank::cli::build_oracle;
    use corebank::config::BankConfig;
    use corebank::io::replay::run_scenario;
    use rstest::rstest;
    use rust_decimal::Decimal;
    use std::fs;
    use std::path::Path;

    /// Replay a fixture's input.csv and compare with its expected.csv
    ///
    /// # Panics
    ///
    /// Panics if the fixture files cannot be read, the replay fails
    /// fatally, the step counts differ, or the report does not match.
    async fn run_test_fixture(
        fixture_name: &str,
        oracle_spec: &str,
        config: BankConfig,
        expected_applied: usize,
        expected_failed: usize,
    ) {
        let fixture_dir = format!("tests/fixtures/{}", fixture_name);
        let input_path = format!("{}/input.csv", fixture_dir);
        let expected_path = format!("{}/expected.csv", fixture_dir);

        assert!(
            Path::new(&input_path).exists(),
            "Input file not found: {}",
            input_path
        );
        assert!(
            Path::new(&expected_path).exists(),
            "Expected file not found: {}",
            expected_path
        );

        let oracle = build_oracle(oracle_spec)
            .unwrap_or_else(|e| panic!("Bad oracle spec for fixture {}: {}", fixture_name, e));
        let bank = Bank::new(config, oracle)
            .unwrap_or_else(|e| panic!("Failed to assemble bank for {}: {}", fixture_name, e));

        let mut output = Vec::new();
        let summary = run_scenario(&bank, Path::new(&input_path), &mut output)
            .await
            .unwrap_or_else(|e| panic!("Replay failed for fixture {}: {}", fixture_name, e));

        assert_eq!(
            (summary.applied, summary.failed),
            (expected_applied, expected_failed),
            "Step counts mismatch for fixture: {}",
            fixture_name
        );

        let actual_output = String::from_utf8(output).expect("report is valid UTF-8");
        let expected_output = fs::read_to_string(&expected_path)
            .unwrap_or_else(|e| panic!("Failed to read expected file {}: {}", expected_path, e));

        assert_eq!(
            actual_output, expected_output,
            "\n\nOutput mismatch for fixture: {}\n\nActual output:\n{}\n\nExpected output:\n{}\n",
            fixture_name, actual_output, expected_output
        );
    }

    fn capped(daily_cap: Decimal) -> BankConfig {
        BankConfig {
            daily_transfer_cap: daily_cap,
            ..BankConfig::default()
        }
    }

    #[rstest]
    #[case::clean_transfer("clean_transfer", "approve", BankConfig::default(), 5, 0)]
    #[case::insufficient_funds("insufficient_funds", "approve", BankConfig::default(), 4, 1)]
    #[case::flagged_and_reversed(
        "flagged_and_reversed",
        "flag-over=250",
        BankConfig::default(),
        6,
        0
    )]
    #[case::daily_limit("daily_limit", "approve", capped(Decimal::new(50000, 2)), 5, 1)]
    #[case::loan_lifecycle("loan_lifecycle", "approve", BankConfig::default(), 5, 0)]
    #[case::kyc_gate("kyc_gate", "approve", BankConfig::default(), 5, 2)]
    #[tokio::test]
    async fn test_fixtures(
        #[case] fixture: &str,
        #[case] oracle_spec: &str,
        #[case] config: BankConfig,
        #[case] expected_applied: usize,
        #[case] expected_failed: usize,
    ) {
        run_test_fixture(fixture, oracle_spec, config, expected_applied, expected_failed).await;
    }
}
