//! Error types for the banking core
//!
//! This module defines all errors the core can return. Every variant is
//! classified into one of four kinds via [`BankError::kind`]:
//!
//! - **Validation**: malformed or out-of-range input, wrong role, unknown
//!   ids. Surfaced immediately with no side effects.
//! - **BusinessRule**: well-formed request refused by policy (insufficient
//!   funds, daily cap, KYC gate). No side effects beyond an audit entry.
//! - **Dependency**: an external collaborator (the fraud oracle) failed or
//!   timed out. Retryable.
//! - **Invariant**: an attempt to break internal consistency, such as
//!   mutating a terminal record. Treated as a bug and logged at error
//!   level by the caller.

use rust_decimal::Decimal;
use thiserror::Error;

use super::account::{AccountId, AccountNumber};
use super::actor::{Role, UserId};
use super::fraud::ReviewOutcome;
use super::kyc::KycStatus;
use super::loan::{LoanId, LoanStatus};
use super::transaction::{TransactionId, TransactionStatus};

/// Classification of a [`BankError`]
///
/// Callers branch on the kind, not on individual variants, when deciding
/// how to report or retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    BusinessRule,
    Dependency,
    Invariant,
}

/// Main error type for the banking core
///
/// Each variant carries the context needed to report the failure without
/// another lookup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BankError {
    /// Caller's role does not permit the operation
    #[error("Operation requires {required} role, caller is {actual}")]
    UnauthorizedRole {
        /// Role the operation is gated on
        required: Role,
        /// Role the caller actually holds
        actual: Role,
    },

    /// Amount is zero or negative
    #[error("Amount must be positive, got {amount}")]
    NonPositiveAmount {
        /// The offending amount
        amount: Decimal,
    },

    /// Transfer description exceeds the accepted length
    #[error("Description is {length} characters, maximum is {max}")]
    DescriptionTooLong {
        /// Actual length
        length: usize,
        /// Accepted maximum
        max: usize,
    },

    /// Loan tenure outside the accepted range
    #[error("Loan tenure of {months} months is out of range (1..={max})")]
    InvalidTenure {
        /// Requested tenure
        months: u32,
        /// Accepted maximum
        max: u32,
    },

    /// Loan type label is empty
    #[error("Loan type must not be empty")]
    EmptyLoanType,

    /// EMI arithmetic exceeds the representable decimal range
    #[error("EMI computation overflows for principal {principal} over {months} months")]
    EmiOverflow {
        /// Requested principal
        principal: Decimal,
        /// Requested tenure
        months: u32,
    },

    /// No account with the given number
    #[error("Account {number} not found")]
    AccountNotFound {
        /// The unknown account number
        number: AccountNumber,
    },

    /// Transfer names the same account on both ends
    #[error("Source and destination are the same account {number}")]
    SameAccount {
        /// The repeated account number
        number: AccountNumber,
    },

    /// Account number already assigned
    #[error("Account number {number} is already in use")]
    DuplicateAccountNumber {
        /// The colliding number
        number: AccountNumber,
    },

    /// Caller does not own the account being debited
    #[error("Account {number} is not owned by user {user}")]
    NotAccountOwner {
        /// The account in question
        number: AccountNumber,
        /// The calling user
        user: UserId,
    },

    /// No customer record for the given user
    #[error("No customer record for user {user}")]
    UnknownCustomer {
        /// The unknown user
        user: UserId,
    },

    /// No transaction with the given id
    #[error("Transaction {transaction} not found")]
    UnknownTransaction {
        /// The unknown transaction id
        transaction: TransactionId,
    },

    /// No loan with the given id
    #[error("Loan {loan} not found")]
    UnknownLoan {
        /// The unknown loan id
        loan: LoanId,
    },

    /// No fraud flag recorded for the given transaction
    #[error("No fraud flag for transaction {transaction}")]
    UnknownFlag {
        /// The transaction without a flag
        transaction: TransactionId,
    },

    /// Re-evaluation requested for a transaction that is not parked
    #[error("Transaction {transaction} is {status}, not awaiting fraud evaluation")]
    NotAwaitingVerdict {
        /// The transaction
        transaction: TransactionId,
        /// Its actual status
        status: TransactionStatus,
    },

    /// Compensation requested for a transaction that is not flagged
    #[error("Transaction {transaction} is {status}; only flagged transactions can be reversed")]
    NotFlagged {
        /// The transaction
        transaction: TransactionId,
        /// Its actual status
        status: TransactionStatus,
    },

    /// Configuration value fails validation
    #[error("Invalid config value for {field}: {reason}")]
    InvalidConfig {
        /// Field name
        field: String,
        /// What is wrong with it
        reason: String,
    },

    /// Balance too low for the requested debit
    #[error("Insufficient funds in account {number}: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Debited account
        number: AccountNumber,
        /// Balance at check time
        available: Decimal,
        /// Requested amount
        requested: Decimal,
    },

    /// The transfer would push today's outgoing volume past the cap
    #[error("Daily limit exceeded for account {number}: spent {spent_today} today, requested {requested}, cap {cap}")]
    DailyLimitExceeded {
        /// Debited account
        number: AccountNumber,
        /// Outgoing volume already spent this UTC day
        spent_today: Decimal,
        /// Requested amount
        requested: Decimal,
        /// Configured daily cap
        cap: Decimal,
    },

    /// Customer is not KYC-approved
    #[error("KYC for user {user} is {status}; transfers require approval")]
    KycNotApproved {
        /// The gated customer
        user: UserId,
        /// KYC status at check time
        status: KycStatus,
    },

    /// Account refuses debits and credits
    #[error("Account {number} is inactive")]
    AccountInactive {
        /// The deactivated account
        number: AccountNumber,
    },

    /// Submission attempted after approval
    #[error("KYC for user {user} is already approved")]
    KycAlreadyApproved {
        /// The approved customer
        user: UserId,
    },

    /// Decision attempted before any submission
    #[error("KYC details for user {user} have not been submitted")]
    KycNotSubmitted {
        /// The customer without details
        user: UserId,
    },

    /// Customer has no active account to receive a disbursement
    #[error("User {user} has no active account for disbursement")]
    NoActiveAccount {
        /// The customer
        user: UserId,
    },

    /// Fraud oracle reported a failure
    #[error("Fraud oracle unavailable for transaction {transaction}: {reason}")]
    OracleUnavailable {
        /// Transaction awaiting a verdict
        transaction: TransactionId,
        /// Failure description from the adapter
        reason: String,
    },

    /// Fraud oracle did not answer within the configured bound
    #[error("Fraud oracle timed out after {waited_ms} ms for transaction {transaction}")]
    OracleTimeout {
        /// Transaction awaiting a verdict
        transaction: TransactionId,
        /// How long the engine waited
        waited_ms: u64,
    },

    /// Status change not present in the transition table
    #[error("Illegal status transition for transaction {transaction}: {from} -> {to}")]
    IllegalStatusTransition {
        /// The transaction
        transaction: TransactionId,
        /// Status on record
        from: TransactionStatus,
        /// Status the caller tried to set
        to: TransactionStatus,
    },

    /// Second review attempted on a decided flag
    #[error("Fraud flag for transaction {transaction} was already reviewed ({outcome})")]
    FlagAlreadyReviewed {
        /// The flagged transaction
        transaction: TransactionId,
        /// Outcome on record
        outcome: ReviewOutcome,
    },

    /// Second decision attempted on a decided loan
    #[error("Loan {loan} was already decided ({status})")]
    LoanAlreadyDecided {
        /// The loan
        loan: LoanId,
        /// Status on record
        status: LoanStatus,
    },

    /// Balance arithmetic would overflow
    #[error("Arithmetic overflow in {operation} for account {number}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Affected account
        number: AccountNumber,
    },

    /// Internal index references an account the ledger does not hold
    #[error("Ledger state missing for account id {account}")]
    MissingLedgerState {
        /// The dangling id
        account: AccountId,
    },
}

impl BankError {
    /// Classify this error
    ///
    /// # Returns
    ///
    /// The [`ErrorKind`] callers use to decide reporting and retry
    /// behavior.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BankError::UnauthorizedRole { .. }
            | BankError::NonPositiveAmount { .. }
            | BankError::DescriptionTooLong { .. }
            | BankError::InvalidTenure { .. }
            | BankError::EmptyLoanType
            | BankError::EmiOverflow { .. }
            | BankError::AccountNotFound { .. }
            | BankError::SameAccount { .. }
            | BankError::DuplicateAccountNumber { .. }
            | BankError::NotAccountOwner { .. }
            | BankError::UnknownCustomer { .. }
            | BankError::UnknownTransaction { .. }
            | BankError::UnknownLoan { .. }
            | BankError::UnknownFlag { .. }
            | BankError::InvalidConfig { .. } => ErrorKind::Validation,

            BankError::InsufficientFunds { .. }
            | BankError::DailyLimitExceeded { .. }
            | BankError::KycNotApproved { .. }
            | BankError::AccountInactive { .. }
            | BankError::KycAlreadyApproved { .. }
            | BankError::KycNotSubmitted { .. }
            | BankError::NoActiveAccount { .. } => ErrorKind::BusinessRule,

            BankError::OracleUnavailable { .. } | BankError::OracleTimeout { .. } => {
                ErrorKind::Dependency
            }

            BankError::NotAwaitingVerdict { .. }
            | BankError::NotFlagged { .. }
            | BankError::IllegalStatusTransition { .. }
            | BankError::FlagAlreadyReviewed { .. }
            | BankError::LoanAlreadyDecided { .. }
            | BankError::ArithmeticOverflow { .. }
            | BankError::MissingLedgerState { .. } => ErrorKind::Invariant,
        }
    }
}

// Helper functions for creating common errors

impl BankError {
    /// Create an InsufficientFunds error
    pub fn insufficient_funds(number: &str, available: Decimal, requested: Decimal) -> Self {
        BankError::InsufficientFunds {
            number: number.to_string(),
            available,
            requested,
        }
    }

    /// Create a DailyLimitExceeded error
    pub fn daily_limit_exceeded(
        number: &str,
        spent_today: Decimal,
        requested: Decimal,
        cap: Decimal,
    ) -> Self {
        BankError::DailyLimitExceeded {
            number: number.to_string(),
            spent_today,
            requested,
            cap,
        }
    }

    /// Create a KycNotApproved error
    pub fn kyc_not_approved(user: UserId, status: KycStatus) -> Self {
        BankError::KycNotApproved { user, status }
    }

    /// Create an AccountNotFound error
    pub fn account_not_found(number: &str) -> Self {
        BankError::AccountNotFound {
            number: number.to_string(),
        }
    }

    /// Create an AccountInactive error
    pub fn account_inactive(number: &str) -> Self {
        BankError::AccountInactive {
            number: number.to_string(),
        }
    }

    /// Create a NotAccountOwner error
    pub fn not_account_owner(number: &str, user: UserId) -> Self {
        BankError::NotAccountOwner {
            number: number.to_string(),
            user,
        }
    }

    /// Create an IllegalStatusTransition error
    pub fn illegal_transition(
        transaction: TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> Self {
        BankError::IllegalStatusTransition {
            transaction,
            from,
            to,
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, number: &str) -> Self {
        BankError::ArithmeticOverflow {
            operation: operation.to_string(),
            number: number.to_string(),
        }
    }

    /// Create an OracleUnavailable error
    pub fn oracle_unavailable(transaction: TransactionId, reason: &str) -> Self {
        BankError::OracleUnavailable {
            transaction,
            reason: reason.to_string(),
        }
    }

    /// Create an OracleTimeout error
    pub fn oracle_timeout(transaction: TransactionId, waited_ms: u64) -> Self {
        BankError::OracleTimeout {
            transaction,
            waited_ms,
        }
    }

    /// Create an InvalidConfig error
    pub fn invalid_config(field: &str, reason: &str) -> Self {
        BankError::InvalidConfig {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}
