//! Balance report output
//!
//! After a scenario replay the final account states are written as
//! CSV with columns: account, type, balance, active, daily_spent.
//! Amounts use two decimal places. The function is pure (writer in,
//! no other I/O) for easy testing.

use crate::types::Account;
use std::io::Write;

/// Write account states to CSV
///
/// Accounts are sorted by account number for deterministic output.
///
/// # Errors
///
/// Returns a message describing the failed write.
pub fn write_balance_report(accounts: &[Account], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["account", "type", "balance", "active", "daily_spent"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted_accounts = accounts.to_vec();
    sorted_accounts.sort_by(|a, b| a.number.cmp(&b.number));

    for account in sorted_accounts {
        writer
            .write_record(&[
                account.number.clone(),
                account.account_type.to_string(),
                format!("{:.2}", account.balance),
                account.active.to_string(),
                format!("{:.2}", account.daily_spent),
            ])
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AccountType;
    use rstest::rstest;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn account(number: &str, balance: Decimal, daily_spent: Decimal, active: bool) -> Account {
        Account {
            id: Uuid::new_v4(),
            number: number.to_string(),
            owner: Uuid::new_v4(),
            account_type: AccountType::Saving,
            balance,
            active,
            daily_spent,
            daily_count: 0,
        }
    }

    #[rstest]
    #[case::single_account(
        vec![account("ACC-1", Decimal::new(10000, 2), Decimal::ZERO, true)],
        "account,type,balance,active,daily_spent\nACC-1,saving,100.00,true,0.00\n"
    )]
    #[case::sorted_by_number(
        vec![
            account("ACC-3", Decimal::ZERO, Decimal::ZERO, true),
            account("ACC-1", Decimal::ZERO, Decimal::ZERO, true),
            account("ACC-2", Decimal::ZERO, Decimal::ZERO, true),
        ],
        "account,type,balance,active,daily_spent\n\
         ACC-1,saving,0.00,true,0.00\n\
         ACC-2,saving,0.00,true,0.00\n\
         ACC-3,saving,0.00,true,0.00\n"
    )]
    #[case::deactivated_account(
        vec![account("ACC-1", Decimal::new(550, 2), Decimal::ZERO, false)],
        "account,type,balance,active,daily_spent\nACC-1,saving,5.50,false,0.00\n"
    )]
    #[case::daily_spend_shown(
        vec![account("ACC-1", Decimal::new(70000, 2), Decimal::new(30000, 2), true)],
        "account,type,balance,active,daily_spent\nACC-1,saving,700.00,true,300.00\n"
    )]
    #[case::empty_accounts(
        vec![],
        "account,type,balance,active,daily_spent\n"
    )]
    fn test_write_balance_report(#[case] accounts: Vec<Account>, #[case] expected_output: &str) {
        let mut output = Vec::new();
        let result = write_balance_report(&accounts, &mut output);
        assert!(result.is_ok());

        let output_str = String::from_utf8(output).unwrap();
        assert_eq!(output_str, expected_output);
    }

    #[test]
    fn test_amounts_rendered_with_two_decimals() {
        let accounts = vec![account(
            "ACC-1",
            Decimal::new(1, 0),
            Decimal::new(12345, 4),
            true,
        )];
        let mut output = Vec::new();
        write_balance_report(&accounts, &mut output).unwrap();

        let output_str = String::from_utf8(output).unwrap();
        assert!(output_str.contains("1.00"));
        assert!(output_str.contains("1.23"));
    }

    #[test]
    fn test_account_type_labels() {
        let mut current = account("ACC-1", Decimal::ZERO, Decimal::ZERO, true);
        current.account_type = AccountType::Current;
        let mut deposit = account("ACC-2", Decimal::ZERO, Decimal::ZERO, true);
        deposit.account_type = AccountType::Deposit;

        let mut output = Vec::new();
        write_balance_report(&[current, deposit], &mut output).unwrap();

        let output_str = String::from_utf8(output).unwrap();
        assert!(output_str.contains("ACC-1,current"));
        assert!(output_str.contains("ACC-2,deposit"));
    }
}
