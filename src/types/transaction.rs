//! Transaction-related types
//!
//! This module defines the immutable transaction record, its monotonic
//! status lifecycle, and the request/receipt pair used by the transfer
//! operation.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::{AccountId, AccountNumber};

/// Transaction identifier
pub type TransactionId = Uuid;

/// Maximum accepted length of a transfer description
pub const MAX_DESCRIPTION_LEN: usize = 255;

/// Kind of ledger movement a transaction records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Customer-initiated transfer between two accounts
    Transfer,

    /// System-issued compensating transfer that undoes a rejected
    /// flagged transaction
    Reversal,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Transfer => write!(f, "transfer"),
            TransactionKind::Reversal => write!(f, "reversal"),
        }
    }
}

/// Lifecycle status of a transaction
///
/// Statuses move forward only: `Created` is the in-memory starting point,
/// `FraudCheckPending` means the funds have moved and the fraud verdict is
/// outstanding, and the remaining three are terminal. A terminal record is
/// never mutated again; remediation happens through new compensating
/// records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Record constructed but not yet evaluated
    Created,

    /// Funds moved, fraud verdict outstanding
    FraudCheckPending,

    /// Fraud check passed; the transfer stands
    Cleared,

    /// Fraud oracle returned a fraud verdict; awaiting admin review
    Flagged,

    /// Refused before funds moved (insufficient balance)
    Rejected,
}

impl TransactionStatus {
    /// Whether this status admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Cleared | TransactionStatus::Flagged | TransactionStatus::Rejected
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Created => write!(f, "created"),
            TransactionStatus::FraudCheckPending => write!(f, "fraud_check_pending"),
            TransactionStatus::Cleared => write!(f, "cleared"),
            TransactionStatus::Flagged => write!(f, "flagged"),
            TransactionStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Transfer request as received from the caller
///
/// Both endpoints are addressed by account number. The description is
/// optional and capped at [`MAX_DESCRIPTION_LEN`] characters.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    /// Account to debit; must be owned by the calling customer
    pub source: AccountNumber,

    /// Account to credit
    pub destination: AccountNumber,

    /// Amount to move; must be strictly positive
    pub amount: Decimal,

    /// Free-text memo carried into the record and the fraud check
    pub description: Option<String>,
}

impl TransferRequest {
    /// Create a request with no description
    pub fn new(source: &str, destination: &str, amount: Decimal) -> Self {
        TransferRequest {
            source: source.to_string(),
            destination: destination.to_string(),
            amount,
            description: None,
        }
    }
}

/// Immutable record of a ledger movement
///
/// Stored once per accepted transfer (and per compensating reversal) and
/// mutated only through the status transition table.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Unique transaction id
    pub id: TransactionId,

    /// Transfer or reversal
    pub kind: TransactionKind,

    /// Debited account
    pub source: AccountId,

    /// Credited account
    pub destination: AccountId,

    /// Amount moved (or refused, for `Rejected` records)
    pub amount: Decimal,

    /// Caller-supplied memo
    pub description: Option<String>,

    /// Current lifecycle status
    pub status: TransactionStatus,

    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a record in `Created` status with a fresh id
    pub fn new(
        kind: TransactionKind,
        source: AccountId,
        destination: AccountId,
        amount: Decimal,
        description: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Transaction {
            id: Uuid::new_v4(),
            kind,
            source,
            destination,
            amount,
            description,
            status: TransactionStatus::Created,
            created_at,
        }
    }
}

/// Outcome handed back to the caller of a transfer
///
/// `status` is the status at return time; a `FraudCheckPending` receipt
/// means the oracle did not answer in time and the caller may poll the
/// transaction until re-evaluation settles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReceipt {
    /// Id of the recorded transaction
    pub transaction: TransactionId,

    /// Status at the time the call returned
    pub status: TransactionStatus,
}
