//! Fraud flags and their admin review
//!
//! A fraud verdict raises at most one [`FraudFlag`] per transaction;
//! creation is first-writer-wins, so a second concurrent evaluator is a
//! no-op. The [`ReviewDesk`] resolves flags: approval lets the transfer
//! stand, rejection issues a compensating reversal through the engine.
//!
//! Rejection claims the flag before compensating. Two racing reviewers
//! therefore cannot both reverse; if the reversal itself fails (the
//! recipient already spent the funds), the claim is released and the
//! flag becomes reviewable again.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::json;
use tracing::{error, info};

use crate::clock::Clock;
use crate::core::audit::AuditSink;
use crate::core::engine::TransactionEngine;
use crate::types::{
    Actor, AuditAction, AuditOutcome, BankError, FraudFlag, ReviewOutcome, Role, TransactionId,
    UserId,
};

/// Thread-safe store of fraud flags, keyed by transaction
pub struct FraudFlagStore {
    flags: DashMap<TransactionId, FraudFlag>,
    clock: Arc<dyn Clock>,
}

impl FraudFlagStore {
    /// Create an empty store
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        FraudFlagStore {
            flags: DashMap::new(),
            clock,
        }
    }

    /// Raise a flag for a transaction, idempotently
    ///
    /// The first writer wins; a repeated call returns the existing flag
    /// unchanged, whatever reason it carries.
    pub fn raise(&self, transaction: TransactionId, reason: &str) -> FraudFlag {
        let entry = self
            .flags
            .entry(transaction)
            .or_insert_with(|| FraudFlag::new(transaction, reason, self.clock.now()));
        entry.value().clone()
    }

    /// Get the flag for a transaction
    pub fn get(&self, transaction: TransactionId) -> Option<FraudFlag> {
        self.flags
            .get(&transaction)
            .map(|entry| entry.value().clone())
    }

    /// Flags still awaiting review, oldest first
    pub fn unreviewed(&self) -> Vec<FraudFlag> {
        let mut open: Vec<FraudFlag> = self
            .flags
            .iter()
            .filter(|entry| entry.value().outcome == ReviewOutcome::Unreviewed)
            .map(|entry| entry.value().clone())
            .collect();
        open.sort_by_key(|flag| (flag.flagged_at, flag.transaction));
        open
    }

    /// Number of flags ever raised
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Whether no flag was ever raised
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Atomically move an unreviewed flag to a decided outcome
    fn claim(
        &self,
        transaction: TransactionId,
        outcome: ReviewOutcome,
        reviewer: UserId,
        at: DateTime<Utc>,
    ) -> Result<FraudFlag, BankError> {
        let mut entry = self
            .flags
            .get_mut(&transaction)
            .ok_or(BankError::UnknownFlag { transaction })?;
        let flag = entry.value_mut();
        if flag.outcome != ReviewOutcome::Unreviewed {
            error!(transaction = %transaction, outcome = %flag.outcome, "second review refused");
            return Err(BankError::FlagAlreadyReviewed {
                transaction,
                outcome: flag.outcome,
            });
        }
        flag.outcome = outcome;
        flag.reviewed_by = Some(reviewer);
        flag.reviewed_at = Some(at);
        Ok(flag.clone())
    }

    /// Undo a claim whose compensation failed
    fn release(&self, transaction: TransactionId) {
        if let Some(mut entry) = self.flags.get_mut(&transaction) {
            let flag = entry.value_mut();
            flag.outcome = ReviewOutcome::Unreviewed;
            flag.reviewed_by = None;
            flag.reviewed_at = None;
        }
    }

    /// Record the reversal issued for a rejected flag
    fn attach_compensation(
        &self,
        transaction: TransactionId,
        compensation: TransactionId,
    ) -> Option<FraudFlag> {
        self.flags.get_mut(&transaction).map(|mut entry| {
            let flag = entry.value_mut();
            flag.compensation = Some(compensation);
            flag.clone()
        })
    }
}

/// Admin surface for resolving fraud flags
pub struct ReviewDesk {
    flags: Arc<FraudFlagStore>,
    engine: Arc<TransactionEngine>,
    audit: Arc<AuditSink>,
    clock: Arc<dyn Clock>,
}

impl ReviewDesk {
    /// Create a desk over the given flag store and engine
    pub fn new(
        flags: Arc<FraudFlagStore>,
        engine: Arc<TransactionEngine>,
        audit: Arc<AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        ReviewDesk {
            flags,
            engine,
            audit,
            clock,
        }
    }

    /// Decide a flag
    ///
    /// Approval records the decision and leaves the transfer in place.
    /// Rejection claims the flag, issues a compensating reversal via the
    /// engine, and records the reversal's id on the flag. A failed
    /// reversal releases the claim so the flag can be reviewed again
    /// later.
    ///
    /// # Errors
    ///
    /// `UnknownFlag` or `UnknownTransaction` for a flag or record that
    /// does not exist, `FlagAlreadyReviewed` for a second decision, or a
    /// ledger error when the compensation cannot be applied.
    pub fn decide(
        &self,
        admin: &Actor,
        transaction: TransactionId,
        approve: bool,
    ) -> Result<FraudFlag, BankError> {
        admin.require(Role::Admin)?;

        if approve {
            let flag = self.flags.claim(
                transaction,
                ReviewOutcome::Approved,
                admin.user,
                self.clock.now(),
            )?;
            info!(transaction = %transaction, "flagged transfer allowed to stand");
            self.audit.append(
                admin.user,
                AuditAction::FraudReviewed,
                AuditOutcome::Succeeded,
                Some(transaction),
                json!({ "outcome": flag.outcome.to_string() }),
            );
            return Ok(flag);
        }

        let original = self
            .engine
            .transaction(transaction)
            .ok_or(BankError::UnknownTransaction { transaction })?;
        self.flags.claim(
            transaction,
            ReviewOutcome::Rejected,
            admin.user,
            self.clock.now(),
        )?;

        match self.engine.reverse(&original) {
            Ok(reversal) => {
                let flag = self
                    .flags
                    .attach_compensation(transaction, reversal.id)
                    .ok_or(BankError::UnknownFlag { transaction })?;
                info!(
                    transaction = %transaction,
                    reversal = %reversal.id,
                    "flagged transfer rejected and compensated"
                );
                self.audit.append(
                    admin.user,
                    AuditAction::FraudReviewed,
                    AuditOutcome::Succeeded,
                    Some(transaction),
                    json!({
                        "outcome": flag.outcome.to_string(),
                        "compensation": reversal.id,
                    }),
                );
                Ok(flag)
            }
            Err(err) => {
                self.flags.release(transaction);
                error!(transaction = %transaction, error = %err, "compensation failed, flag reopened");
                self.audit.append(
                    admin.user,
                    AuditAction::FraudReviewed,
                    AuditOutcome::Failed,
                    Some(transaction),
                    json!({ "reason": err.to_string() }),
                );
                Err(err)
            }
        }
    }

    /// Flags still awaiting review, oldest first
    pub fn queue(&self) -> Vec<FraudFlag> {
        self.flags.unreviewed()
    }
}
