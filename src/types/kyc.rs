//! KYC (know-your-customer) workflow types
//!
//! A customer record exists from the moment the first account is opened.
//! Its status walks a small state machine: `Pending` until details are
//! submitted, `InProgress` while an admin decision is outstanding, then
//! `Approved` or `Reverted`. A reverted applicant may resubmit, which
//! moves the record back to `InProgress`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::actor::UserId;

/// KYC workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    /// No details submitted yet
    Pending,

    /// Details submitted, admin decision outstanding
    InProgress,

    /// Admin approved; transfers are unlocked
    Approved,

    /// Admin sent back; resubmission reopens the workflow
    Reverted,
}

impl fmt::Display for KycStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KycStatus::Pending => write!(f, "pending"),
            KycStatus::InProgress => write!(f, "in_progress"),
            KycStatus::Approved => write!(f, "approved"),
            KycStatus::Reverted => write!(f, "reverted"),
        }
    }
}

/// Identity details a customer submits for verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycProfile {
    pub full_name: String,
    pub phone: String,
    pub address: String,
}

impl KycProfile {
    pub fn new(full_name: &str, phone: &str, address: &str) -> Self {
        KycProfile {
            full_name: full_name.to_string(),
            phone: phone.to_string(),
            address: address.to_string(),
        }
    }
}

/// Customer record tracked by the KYC registry
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    /// The user this record belongs to
    pub id: UserId,

    /// Current workflow status
    pub status: KycStatus,

    /// Most recently submitted details, if any
    pub profile: Option<KycProfile>,

    /// When the current details were submitted
    pub submitted_at: Option<DateTime<Utc>>,

    /// When the most recent admin decision was made
    pub decided_at: Option<DateTime<Utc>>,
}

impl Customer {
    /// Create a fresh record in `Pending` status
    pub fn new(id: UserId) -> Self {
        Customer {
            id,
            status: KycStatus::Pending,
            profile: None,
            submitted_at: None,
            decided_at: None,
        }
    }
}
