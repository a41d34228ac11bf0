//! Core business logic module
//!
//! This module contains the banking core's components:
//! - `ledger` - Account balances and the atomic two-account transfer
//! - `limits` - Daily-cap arithmetic
//! - `transactions` - Transaction records and their status transitions
//! - `oracle` - Fraud oracle abstraction and deterministic adapters
//! - `engine` - The transfer flow (validation, cap, ledger, oracle)
//! - `review` - Fraud flags and their admin review
//! - `kyc` - Customer verification state machine
//! - `loans` - Loan applications, decisions, and EMI arithmetic
//! - `audit` - Append-only audit trail

pub mod audit;
pub mod engine;
pub mod kyc;
pub mod ledger;
pub mod limits;
pub mod loans;
pub mod oracle;
pub mod review;
pub mod transactions;

pub use audit::AuditSink;
pub use engine::TransactionEngine;
pub use kyc::KycRegistry;
pub use ledger::{AppliedTransfer, LedgerStore};
pub use limits::LimitCheck;
pub use loans::{emi_quote, LoanBook, MAX_TENURE_MONTHS};
pub use oracle::{
    FraudOracle, OracleError, StalledOracle, StaticOracle, ThresholdOracle, UnreachableOracle,
};
pub use review::{FraudFlagStore, ReviewDesk};
pub use transactions::TransactionStore;
