//! Fraud-check and fraud-review types
//!
//! The engine consults an external oracle with a context snapshot for
//! every transfer. A fraud verdict creates a [`FraudFlag`], which an admin
//! later resolves to either let the transfer stand or compensate it.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::AccountId;
use super::actor::UserId;
use super::transaction::TransactionId;

/// Context snapshot sent to the fraud oracle
///
/// The recent-activity figures cover the source account's outgoing
/// transfers earlier in the same UTC day, captured atomically with the
/// transfer itself.
#[derive(Debug, Clone, PartialEq)]
pub struct FraudCheckRequest {
    /// Account being debited
    pub account: AccountId,

    /// Amount of the transfer under evaluation
    pub amount: Decimal,

    /// Outgoing transfers earlier today, count
    pub recent_txn_count: u32,

    /// Outgoing transfers earlier today, total volume
    pub recent_txn_volume: Decimal,

    /// Caller-supplied memo, when present
    pub description: Option<String>,
}

/// Binary oracle decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Fraud,
    NotFraud,
}

/// Oracle answer: a decision plus a human-readable reason
#[derive(Debug, Clone, PartialEq)]
pub struct FraudVerdict {
    pub verdict: Verdict,
    pub reason: String,
}

impl FraudVerdict {
    /// Build a fraud verdict with the given reason
    pub fn fraud(reason: &str) -> Self {
        FraudVerdict {
            verdict: Verdict::Fraud,
            reason: reason.to_string(),
        }
    }

    /// Build a clean verdict
    pub fn not_fraud() -> Self {
        FraudVerdict {
            verdict: Verdict::NotFraud,
            reason: "no indicators".to_string(),
        }
    }
}

/// Admin review outcome attached to a fraud flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcome {
    /// Awaiting admin review
    Unreviewed,

    /// Admin let the transfer stand
    Approved,

    /// Admin rejected the transfer; a compensating reversal was issued
    Rejected,
}

impl fmt::Display for ReviewOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewOutcome::Unreviewed => write!(f, "unreviewed"),
            ReviewOutcome::Approved => write!(f, "approved"),
            ReviewOutcome::Rejected => write!(f, "rejected"),
        }
    }
}

/// Record of a fraud verdict awaiting (or past) admin review
///
/// At most one flag exists per transaction; the review outcome transitions
/// away from `Unreviewed` at most once.
#[derive(Debug, Clone, PartialEq)]
pub struct FraudFlag {
    /// The flagged transaction
    pub transaction: TransactionId,

    /// Reason reported by the oracle
    pub reason: String,

    /// When the flag was raised
    pub flagged_at: DateTime<Utc>,

    /// Current review state
    pub outcome: ReviewOutcome,

    /// Admin who made the decision
    pub reviewed_by: Option<UserId>,

    /// When the decision was made
    pub reviewed_at: Option<DateTime<Utc>>,

    /// Compensating reversal issued on rejection
    pub compensation: Option<TransactionId>,
}

impl FraudFlag {
    /// Create an unreviewed flag
    pub fn new(transaction: TransactionId, reason: &str, flagged_at: DateTime<Utc>) -> Self {
        FraudFlag {
            transaction,
            reason: reason.to_string(),
            flagged_at,
            outcome: ReviewOutcome::Unreviewed,
            reviewed_by: None,
            reviewed_at: None,
            compensation: None,
        }
    }
}
