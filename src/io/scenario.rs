//! Scenario file format
//!
//! A scenario file is a CSV script of banking operations, replayed in
//! order against a fresh [`crate::Bank`]. This module centralizes the
//! format concerns:
//! - `ScenarioRecord` structure for deserialization
//! - Conversion from raw records to [`ScenarioOp`] steps
//! - A streaming reader with an iterator interface
//!
//! # Format
//!
//! Columns: `op,user,account,to,amount,months,text,decision`. Every
//! column except `op` is optional; which ones an op consumes is listed
//! below. `user` is a free-form handle the replay driver maps to a
//! stable customer identity.
//!
//! | op           | consumes                                               |
//! |--------------|--------------------------------------------------------|
//! | `open`       | user, account, amount (deposit), text (type, default saving) |
//! | `submit_kyc` | user, text (full name)                                 |
//! | `decide_kyc` | user, decision                                         |
//! | `transfer`   | user, account (source), to, amount, text (description) |
//! | `apply_loan` | user, amount (principal), months, text (type, default personal) |
//! | `decide_loan`| user, decision                                         |
//! | `review_flag`| account (source of the flagged transfer), decision     |
//! | `reevaluate` | nothing                                                |
//!
//! `decision` is `approve`, or `reject` / `revert` for a refusal.

use crate::types::AccountType;
use csv::{ReaderBuilder, Trim};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

/// Raw CSV row of a scenario file
///
/// All columns after `op` are optional so that ops can leave the
/// fields they do not use empty (or omit trailing columns entirely,
/// which the flexible reader accepts).
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ScenarioRecord {
    pub op: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub months: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub decision: Option<String>,
}

/// One validated step of a scenario
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioOp {
    /// Open an account for `user`
    Open {
        user: String,
        number: String,
        account_type: AccountType,
        deposit: Decimal,
    },
    /// Submit KYC details for `user`
    SubmitKyc { user: String, full_name: String },
    /// Admin decision on `user`'s KYC submission
    DecideKyc { user: String, approve: bool },
    /// Transfer between two accounts on behalf of `user`
    Transfer {
        user: String,
        source: String,
        destination: String,
        amount: Decimal,
        description: Option<String>,
    },
    /// Loan application by `user`
    ApplyLoan {
        user: String,
        loan_type: String,
        principal: Decimal,
        tenure_months: u32,
    },
    /// Admin decision on `user`'s oldest pending loan
    DecideLoan { user: String, approve: bool },
    /// Admin decision on the oldest unreviewed flag raised against a
    /// transfer out of `source`
    ReviewFlag { source: String, approve: bool },
    /// Admin retry of every transfer parked on an oracle outage
    Reevaluate,
}

fn require(field: Option<String>, name: &str) -> Result<String, String> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(format!("missing required field '{}'", name)),
    }
}

fn optional(field: Option<String>) -> Option<String> {
    field
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_amount(field: Option<String>, name: &str) -> Result<Decimal, String> {
    let raw = require(field, name)?;
    Decimal::from_str(&raw).map_err(|_| format!("invalid amount '{}' in field '{}'", raw, name))
}

fn parse_months(field: Option<String>) -> Result<u32, String> {
    let raw = require(field, "months")?;
    raw.parse::<u32>()
        .map_err(|_| format!("invalid month count '{}'", raw))
}

fn parse_decision(field: Option<String>) -> Result<bool, String> {
    let raw = require(field, "decision")?;
    match raw.to_lowercase().as_str() {
        "approve" => Ok(true),
        "reject" | "revert" => Ok(false),
        other => Err(format!(
            "invalid decision '{}': expected approve, reject, or revert",
            other
        )),
    }
}

/// Convert a raw record into a validated scenario step
///
/// Checks that the fields the op consumes are present and parseable.
/// Fields an op does not consume are ignored, so a scenario can keep a
/// visually aligned grid of columns.
pub fn convert_scenario_record(record: ScenarioRecord) -> Result<ScenarioOp, String> {
    match record.op.to_lowercase().as_str() {
        "open" => {
            let account_type = match optional(record.text) {
                Some(label) => AccountType::from_str(&label)?,
                None => AccountType::Saving,
            };
            Ok(ScenarioOp::Open {
                user: require(record.user, "user")?,
                number: require(record.account, "account")?,
                account_type,
                deposit: parse_amount(record.amount, "amount")?,
            })
        }
        "submit_kyc" => Ok(ScenarioOp::SubmitKyc {
            user: require(record.user, "user")?,
            full_name: require(record.text, "text")?,
        }),
        "decide_kyc" => Ok(ScenarioOp::DecideKyc {
            user: require(record.user, "user")?,
            approve: parse_decision(record.decision)?,
        }),
        "transfer" => Ok(ScenarioOp::Transfer {
            user: require(record.user, "user")?,
            source: require(record.account, "account")?,
            destination: require(record.to, "to")?,
            amount: parse_amount(record.amount, "amount")?,
            description: optional(record.text),
        }),
        "apply_loan" => Ok(ScenarioOp::ApplyLoan {
            user: require(record.user, "user")?,
            loan_type: optional(record.text).unwrap_or_else(|| "personal".to_string()),
            principal: parse_amount(record.amount, "amount")?,
            tenure_months: parse_months(record.months)?,
        }),
        "decide_loan" => Ok(ScenarioOp::DecideLoan {
            user: require(record.user, "user")?,
            approve: parse_decision(record.decision)?,
        }),
        "review_flag" => Ok(ScenarioOp::ReviewFlag {
            source: require(record.account, "account")?,
            approve: parse_decision(record.decision)?,
        }),
        "reevaluate" => Ok(ScenarioOp::Reevaluate),
        other => Err(format!("unknown op '{}'", other)),
    }
}

/// Streaming scenario reader
///
/// Reads one CSV row at a time and yields validated steps through the
/// `Iterator` trait, so replay never holds more than one row in
/// memory. Row-level problems are yielded as `Err` items with the line
/// number; only failing to open the file is fatal.
#[derive(Debug)]
pub struct ScenarioReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl ScenarioReader {
    /// Open a scenario file for streaming iteration
    ///
    /// The CSV reader trims whitespace from all fields and accepts
    /// rows with fewer columns than the header, so trailing unused
    /// fields can be omitted.
    pub fn new(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 0,
        })
    }
}

impl Iterator for ScenarioReader {
    type Item = Result<ScenarioOp, String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<ScenarioRecord>();

        match deserializer.next()? {
            Ok(record) => {
                self.line_num += 1;
                // Line numbers count the header, matching what an
                // editor shows.
                Some(
                    convert_scenario_record(record)
                        .map_err(|e| format!("Line {}: {}", self.line_num + 1, e)),
                )
            }
            Err(e) => {
                self.line_num += 1;
                Some(Err(format!(
                    "Line {}: CSV parse error: {}",
                    self.line_num + 1,
                    e
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "op,user,account,to,amount,months,text,decision\n";

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn record(fields: [&str; 8]) -> ScenarioRecord {
        let opt = |s: &str| {
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        };
        ScenarioRecord {
            op: fields[0].to_string(),
            user: opt(fields[1]),
            account: opt(fields[2]),
            to: opt(fields[3]),
            amount: opt(fields[4]),
            months: opt(fields[5]),
            text: opt(fields[6]),
            decision: opt(fields[7]),
        }
    }

    #[test]
    fn test_convert_open_defaults_to_saving() {
        let op = convert_scenario_record(record(["open", "alice", "ACC-1", "", "250.00", "", "", ""]))
            .unwrap();
        assert_eq!(
            op,
            ScenarioOp::Open {
                user: "alice".to_string(),
                number: "ACC-1".to_string(),
                account_type: AccountType::Saving,
                deposit: Decimal::new(25000, 2),
            }
        );
    }

    #[test]
    fn test_convert_open_honors_explicit_type() {
        let op = convert_scenario_record(record([
            "open", "bob", "ACC-2", "", "0", "", "current", "",
        ]))
        .unwrap();
        assert!(matches!(
            op,
            ScenarioOp::Open {
                account_type: AccountType::Current,
                ..
            }
        ));
    }

    #[test]
    fn test_convert_transfer_with_optional_description() {
        let with = convert_scenario_record(record([
            "transfer", "alice", "ACC-1", "ACC-2", "10.50", "", "rent", "",
        ]))
        .unwrap();
        assert_eq!(
            with,
            ScenarioOp::Transfer {
                user: "alice".to_string(),
                source: "ACC-1".to_string(),
                destination: "ACC-2".to_string(),
                amount: Decimal::new(1050, 2),
                description: Some("rent".to_string()),
            }
        );

        let without = convert_scenario_record(record([
            "transfer", "alice", "ACC-1", "ACC-2", "10.50", "", "", "",
        ]))
        .unwrap();
        assert!(matches!(
            without,
            ScenarioOp::Transfer {
                description: None,
                ..
            }
        ));
    }

    #[rstest]
    #[case::approve("approve", true)]
    #[case::reject("reject", false)]
    #[case::revert("revert", false)]
    #[case::uppercase("APPROVE", true)]
    fn test_convert_decision_values(#[case] decision: &str, #[case] expected: bool) {
        let op = convert_scenario_record(record([
            "decide_kyc",
            "alice",
            "",
            "",
            "",
            "",
            "",
            decision,
        ]))
        .unwrap();
        assert_eq!(
            op,
            ScenarioOp::DecideKyc {
                user: "alice".to_string(),
                approve: expected,
            }
        );
    }

    #[test]
    fn test_convert_apply_loan_defaults_type_to_personal() {
        let op = convert_scenario_record(record([
            "apply_loan",
            "alice",
            "",
            "",
            "12000",
            "24",
            "",
            "",
        ]))
        .unwrap();
        assert_eq!(
            op,
            ScenarioOp::ApplyLoan {
                user: "alice".to_string(),
                loan_type: "personal".to_string(),
                principal: Decimal::new(12000, 0),
                tenure_months: 24,
            }
        );
    }

    #[test]
    fn test_convert_reevaluate_ignores_other_fields() {
        let op =
            convert_scenario_record(record(["reevaluate", "", "", "", "", "", "", ""])).unwrap();
        assert_eq!(op, ScenarioOp::Reevaluate);
    }

    #[rstest]
    #[case::unknown_op(["teleport", "a", "", "", "", "", "", ""], "unknown op")]
    #[case::open_missing_user(["open", "", "ACC-1", "", "10", "", "", ""], "missing required field 'user'")]
    #[case::open_missing_deposit(["open", "a", "ACC-1", "", "", "", "", ""], "missing required field 'amount'")]
    #[case::open_bad_type(["open", "a", "ACC-1", "", "10", "", "offshore", ""], "unknown account type")]
    #[case::transfer_missing_destination(["transfer", "a", "ACC-1", "", "10", "", "", ""], "missing required field 'to'")]
    #[case::transfer_bad_amount(["transfer", "a", "ACC-1", "ACC-2", "ten", "", "", ""], "invalid amount")]
    #[case::loan_bad_months(["apply_loan", "a", "", "", "10", "two", "", ""], "invalid month count")]
    #[case::bad_decision(["decide_loan", "a", "", "", "", "", "", "maybe"], "invalid decision")]
    #[case::kyc_missing_name(["submit_kyc", "a", "", "", "", "", "", ""], "missing required field 'text'")]
    fn test_convert_errors(#[case] fields: [&str; 8], #[case] expected_error: &str) {
        let result = convert_scenario_record(record(fields));
        assert!(result.is_err());
        assert!(result.unwrap_err().contains(expected_error));
    }

    #[test]
    fn test_reader_new_fails_on_missing_file() {
        let result = ScenarioReader::new(Path::new("nonexistent.csv"));
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_reader_iterates_in_order() {
        let content = format!(
            "{}open,alice,ACC-1,,100.00,,,\ntransfer,alice,ACC-1,ACC-2,25.00,,,\n",
            HEADER
        );
        let file = create_temp_csv(&content);

        let ops: Vec<_> = ScenarioReader::new(file.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[0], ScenarioOp::Open { .. }));
        assert!(matches!(ops[1], ScenarioOp::Transfer { .. }));
    }

    #[test]
    fn test_reader_accepts_short_rows() {
        // Ops with no trailing fields can omit the columns entirely.
        let content = format!("{}reevaluate\n", HEADER);
        let file = create_temp_csv(&content);

        let ops: Vec<_> = ScenarioReader::new(file.path()).unwrap().collect();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0], Ok(ScenarioOp::Reevaluate));
    }

    #[test]
    fn test_reader_includes_line_numbers_in_errors() {
        let content = format!(
            "{}open,alice,ACC-1,,100.00,,,\nopen,bob,ACC-2,,brick,,,\nreevaluate,,,,,,,\n",
            HEADER
        );
        let file = create_temp_csv(&content);

        let results: Vec<_> = ScenarioReader::new(file.path()).unwrap().collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[2].is_ok());

        let error = results[1].as_ref().unwrap_err();
        assert!(error.contains("Line 3"));
        assert!(error.contains("invalid amount"));
    }

    #[test]
    fn test_reader_continues_after_error() {
        let content = format!(
            "{}open,alice,ACC-1,,100.00,,,\nteleport,alice,,,,,,\ntransfer,alice,ACC-1,ACC-2,5.00,,,\n",
            HEADER
        );
        let file = create_temp_csv(&content);

        let results: Vec<_> = ScenarioReader::new(file.path()).unwrap().collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_reader_trims_whitespace_and_ignores_case() {
        let content = format!("{}  OPEN  ,  carol  ,  ACC-9  ,,  42.00  ,,,\n", HEADER);
        let file = create_temp_csv(&content);

        let ops: Vec<_> = ScenarioReader::new(file.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(
            ops[0],
            ScenarioOp::Open {
                user: "carol".to_string(),
                number: "ACC-9".to_string(),
                account_type: AccountType::Saving,
                deposit: Decimal::new(4200, 2),
            }
        );
    }

    #[test]
    fn test_reader_handles_empty_file_after_header() {
        let file = create_temp_csv(HEADER);
        let results: Vec<_> = ScenarioReader::new(file.path()).unwrap().collect();
        assert!(results.is_empty());
    }
}
