//! Audit trail types
//!
//! Every state-changing operation appends exactly one entry. Entries are
//! immutable once written and ordered by a per-process sequence number
//! that observers can rely on.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::actor::UserId;

/// Operation category an audit entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    AccountOpened,
    AccountDeactivated,
    Transfer,
    KycSubmitted,
    KycDecided,
    LoanApplied,
    LoanDecided,
    FraudReviewed,
    Reevaluated,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditAction::AccountOpened => write!(f, "account_opened"),
            AuditAction::AccountDeactivated => write!(f, "account_deactivated"),
            AuditAction::Transfer => write!(f, "transfer"),
            AuditAction::KycSubmitted => write!(f, "kyc_submitted"),
            AuditAction::KycDecided => write!(f, "kyc_decided"),
            AuditAction::LoanApplied => write!(f, "loan_applied"),
            AuditAction::LoanDecided => write!(f, "loan_decided"),
            AuditAction::FraudReviewed => write!(f, "fraud_reviewed"),
            AuditAction::Reevaluated => write!(f, "reevaluated"),
        }
    }
}

/// How the recorded operation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// The operation completed and its state change is in place
    Succeeded,

    /// A business rule refused the operation
    Failed,

    /// The operation parked state awaiting an external dependency
    Pending,
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditOutcome::Succeeded => write!(f, "succeeded"),
            AuditOutcome::Failed => write!(f, "failed"),
            AuditOutcome::Pending => write!(f, "pending"),
        }
    }
}

/// One immutable line of the audit trail
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditLogEntry {
    /// Monotonic sequence number, assigned at append time
    pub seq: u64,

    /// User the operation was performed by (or on behalf of)
    pub actor: UserId,

    /// Operation category
    pub action: AuditAction,

    /// How the operation ended
    pub outcome: AuditOutcome,

    /// Related record id (transaction, loan, customer), when one exists
    pub correlation: Option<Uuid>,

    /// Append time
    pub at: DateTime<Utc>,

    /// Structured operation details
    pub details: serde_json::Value,
}
