//! Loan workflow types
//!
//! Loans carry a principal, a tenure in months, and a status that moves
//! from `Pending` to exactly one of `Approved` or `Rejected`. Approval
//! fixes the monthly installment and disburses the principal.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::actor::UserId;

/// Loan identifier
pub type LoanId = Uuid;

/// Loan workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    /// Application received, admin decision outstanding
    Pending,

    /// Approved and disbursed
    Approved,

    /// Refused; terminal
    Rejected,
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoanStatus::Pending => write!(f, "pending"),
            LoanStatus::Approved => write!(f, "approved"),
            LoanStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Application submitted by a customer
#[derive(Debug, Clone, PartialEq)]
pub struct LoanApplication {
    /// Product label, e.g. "personal" or "home"
    pub loan_type: String,

    /// Requested principal
    pub principal: Decimal,

    /// Repayment tenure in months
    pub tenure_months: u32,
}

impl LoanApplication {
    pub fn new(loan_type: &str, principal: Decimal, tenure_months: u32) -> Self {
        LoanApplication {
            loan_type: loan_type.to_string(),
            principal,
            tenure_months,
        }
    }
}

/// Loan record tracked by the loan book
#[derive(Debug, Clone, PartialEq)]
pub struct Loan {
    /// Unique loan id
    pub id: LoanId,

    /// Applying customer
    pub customer: UserId,

    /// Product label from the application
    pub loan_type: String,

    /// Principal amount
    pub principal: Decimal,

    /// Repayment tenure in months
    pub tenure_months: u32,

    /// Current workflow status
    pub status: LoanStatus,

    /// Fixed monthly installment; set on approval
    pub monthly_installment: Option<Decimal>,

    /// When the application was received
    pub applied_at: DateTime<Utc>,

    /// When the admin decision was made
    pub decided_at: Option<DateTime<Utc>>,
}

impl Loan {
    /// Create a pending loan with a fresh id
    pub fn new(customer: UserId, application: LoanApplication, applied_at: DateTime<Utc>) -> Self {
        Loan {
            id: Uuid::new_v4(),
            customer,
            loan_type: application.loan_type,
            principal: application.principal,
            tenure_months: application.tenure_months,
            status: LoanStatus::Pending,
            monthly_installment: None,
            applied_at,
            decided_at: None,
        }
    }
}

/// Repayment figures for a prospective loan
///
/// Produced by the EMI calculator without creating a loan record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmiQuote {
    /// Fixed monthly installment, rounded to 2 decimal places
    pub monthly_installment: Decimal,

    /// Interest paid over the full tenure
    pub total_interest: Decimal,

    /// Principal plus total interest
    pub total_payment: Decimal,
}
