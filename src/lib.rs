//! Corebank Library
//! # Overview
//!
//! This library provides an in-process banking core: role-gated account
//! operations, atomic transfers with a synchronous fraud check, and
//! linear approval workflows for KYC, loans, and flagged transactions.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, Transaction, errors, etc.)
//! - [`bank`] - The [`Bank`] facade wiring the components together
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Business logic components:
//!   - [`core::ledger`] - Account state and the atomic transfer primitive
//!   - [`core::engine`] - Transfer orchestration and fraud evaluation
//!   - [`core::transactions`] - Transaction records and status transitions
//!   - [`core::kyc`] - Customer verification workflow
//!   - [`core::loans`] - Loan applications and EMI quoting
//!   - [`core::review`] - Fraud flags and the manual review desk
//!   - [`core::audit`] - The append-only audit trail
//! - [`io`] - Scenario file parsing and balance report output
//!
//! # Roles
//!
//! Every operation is invoked by an [`types::Actor`] holding one role:
//!
//! - **Customer**: opens accounts, transfers funds, submits KYC, applies
//!   for loans
//! - **Admin**: decides KYC, loans, and fraud reviews; deactivates
//!   accounts; retries parked fraud checks
//! - **Auditor**: reads the audit trail
//!
//! # Transfer Outcomes
//!
//! A transfer that passes validation and the balance/daily-cap checks
//! moves funds atomically and then consults the fraud oracle:
//!
//! - **Cleared**: the oracle saw nothing suspicious
//! - **Flagged**: the oracle raised a verdict; funds stay moved until an
//!   admin review approves or reverses the transaction
//! - **FraudCheckPending**: the oracle was unreachable; an admin retries
//!   later via reevaluation

// Module declarations
pub mod bank;
pub mod cli;
pub mod clock;
pub mod config;
pub mod core;
pub mod io;
pub mod types;

pub use bank::Bank;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::BankConfig;
pub use core::{
    AuditSink, FraudFlagStore, FraudOracle, KycRegistry, LedgerStore, LoanBook, ReviewDesk,
    TransactionEngine, TransactionStore,
};
pub use types::{
    Account, AccountType, Actor, BankError, ErrorKind, FraudFlag, KycProfile, KycStatus, Loan,
    LoanApplication, Role, Transaction, TransactionId, TransactionStatus, TransferReceipt,
    TransferRequest, UserId,
};
