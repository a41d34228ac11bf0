//! Account-related types
//!
//! This module defines the externally visible account snapshot and the
//! identifiers used to address accounts.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::actor::UserId;

/// Stable internal account identifier
pub type AccountId = Uuid;

/// Externally visible account number
///
/// Assigned at open time and unique across the ledger. All request-level
/// addressing (transfers, balance queries) uses the number; internal
/// records reference the id.
pub type AccountNumber = String;

/// Product type of an account
///
/// The type does not change engine behavior; it is carried for reporting
/// and product bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Standard interest-bearing savings account
    Saving,

    /// Fixed-term deposit account
    Deposit,

    /// Checking-style current account
    Current,
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountType::Saving => write!(f, "saving"),
            AccountType::Deposit => write!(f, "deposit"),
            AccountType::Current => write!(f, "current"),
        }
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "saving" => Ok(AccountType::Saving),
            "deposit" => Ok(AccountType::Deposit),
            "current" => Ok(AccountType::Current),
            other => Err(format!("unknown account type '{}'", other)),
        }
    }
}

/// Point-in-time view of an account
///
/// Snapshots are produced by the ledger under the account lock, so the
/// balance and the daily usage figures are mutually consistent. The daily
/// figures cover the current UTC day only; a snapshot taken after midnight
/// reports zero usage even if the stored window has not rolled yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// Stable internal id
    pub id: AccountId,

    /// Externally visible account number
    pub number: AccountNumber,

    /// Owning customer
    pub owner: UserId,

    /// Product type
    pub account_type: AccountType,

    /// Current balance
    pub balance: Decimal,

    /// Whether the account accepts transfers
    ///
    /// Deactivated accounts reject both debits and credits but keep their
    /// balance and history.
    pub active: bool,

    /// Sum of outgoing transfers so far this UTC day
    pub daily_spent: Decimal,

    /// Count of outgoing transfers so far this UTC day
    pub daily_count: u32,
}
