//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `actor`: caller identity and roles
//! - `account`: account snapshot and identifiers
//! - `transaction`: transaction records, statuses, requests, receipts
//! - `kyc`: KYC workflow records
//! - `loan`: loan workflow records and EMI quotes
//! - `fraud`: fraud-check requests, verdicts, and flags
//! - `audit`: audit trail entries
//! - `error`: the error type and its classification

pub mod account;
pub mod actor;
pub mod audit;
pub mod error;
pub mod fraud;
pub mod kyc;
pub mod loan;
pub mod transaction;

pub use account::{Account, AccountId, AccountNumber, AccountType};
pub use actor::{Actor, Role, UserId};
pub use audit::{AuditAction, AuditLogEntry, AuditOutcome};
pub use error::{BankError, ErrorKind};
pub use fraud::{FraudCheckRequest, FraudFlag, FraudVerdict, ReviewOutcome, Verdict};
pub use kyc::{Customer, KycProfile, KycStatus};
pub use loan::{EmiQuote, Loan, LoanApplication, LoanId, LoanStatus};
pub use transaction::{
    Transaction, TransactionId, TransactionKind, TransactionStatus, TransferReceipt,
    TransferRequest, MAX_DESCRIPTION_LEN,
};
