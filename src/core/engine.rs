//! Transfer engine
//!
//! [`TransactionEngine`] runs the customer-facing transfer flow end to
//! end: validation, the daily-cap pre-check, the atomic balance
//! movement, and the bounded fraud-oracle call. The ordering is the
//! contract:
//!
//! 1. Validation failures abort with no side effects.
//! 2. A cap refusal aborts before any record exists; it leaves one
//!    audit entry and nothing else.
//! 3. An insufficient balance aborts after the transfer was accepted,
//!    so it leaves a `Rejected` transaction record plus the audit
//!    entry.
//! 4. Once funds move, the transaction is persisted as
//!    `FraudCheckPending` *before* the oracle is consulted. An oracle
//!    outage can therefore never lose a record: the transfer stays
//!    pending and is settled later through re-evaluation.
//! 5. The oracle call is bounded by the configured timeout. A fraud
//!    verdict flags the transaction (funds stay moved); a clean verdict
//!    clears it.
//! 6. Every accepted transfer ends with exactly one audit entry.
//!
//! The engine also carries the retry path for parked transactions and
//! the compensating-reversal path used when an admin rejects a flagged
//! transfer.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::config::BankConfig;
use crate::core::audit::AuditSink;
use crate::core::kyc::KycRegistry;
use crate::core::ledger::LedgerStore;
use crate::core::limits::{self, LimitCheck};
use crate::core::oracle::FraudOracle;
use crate::core::review::FraudFlagStore;
use crate::core::transactions::TransactionStore;
use crate::types::{
    Actor, AuditAction, AuditOutcome, BankError, FraudCheckRequest, KycStatus, Role, Transaction,
    TransactionId, TransactionKind, TransactionStatus, TransferReceipt, TransferRequest, Verdict,
    MAX_DESCRIPTION_LEN,
};

/// Orchestrates transfers across the ledger, the transaction store, the
/// fraud oracle, and the audit sink
///
/// All component handles are shared; the engine itself holds no state
/// beyond configuration, so it is freely shareable across tasks.
pub struct TransactionEngine {
    ledger: Arc<LedgerStore>,
    transactions: Arc<TransactionStore>,
    flags: Arc<FraudFlagStore>,
    kyc: Arc<KycRegistry>,
    oracle: Arc<dyn FraudOracle>,
    audit: Arc<AuditSink>,
    config: BankConfig,
    clock: Arc<dyn Clock>,
}

impl TransactionEngine {
    /// Create an engine over the given components
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledger: Arc<LedgerStore>,
        transactions: Arc<TransactionStore>,
        flags: Arc<FraudFlagStore>,
        kyc: Arc<KycRegistry>,
        oracle: Arc<dyn FraudOracle>,
        audit: Arc<AuditSink>,
        config: BankConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        TransactionEngine {
            ledger,
            transactions,
            flags,
            kyc,
            oracle,
            audit,
            config,
            clock,
        }
    }

    /// Execute a customer transfer
    ///
    /// # Arguments
    ///
    /// * `actor` - The calling customer; must own the source account
    /// * `request` - Endpoints by account number, amount, optional memo
    ///
    /// # Returns
    ///
    /// A [`TransferReceipt`] whose status is `Cleared`, `Flagged`, or
    /// `FraudCheckPending`. A pending receipt means the funds moved but
    /// the oracle did not answer in time; the caller can poll
    /// [`TransactionEngine::transaction_status`] until a re-evaluation
    /// settles the record.
    ///
    /// # Errors
    ///
    /// Validation errors (`UnauthorizedRole`, `NonPositiveAmount`,
    /// `DescriptionTooLong`, `AccountNotFound`, `SameAccount`,
    /// `NotAccountOwner`, `UnknownCustomer`) leave no trace. Business
    /// refusals (`KycNotApproved`, `DailyLimitExceeded`,
    /// `InsufficientFunds`, `AccountInactive`) leave one audit entry;
    /// of these only `InsufficientFunds` also leaves a transaction
    /// record, in terminal status `Rejected`.
    pub async fn transfer(
        &self,
        actor: &Actor,
        request: TransferRequest,
    ) -> Result<TransferReceipt, BankError> {
        actor.require(Role::Customer)?;
        if request.amount <= Decimal::ZERO {
            return Err(BankError::NonPositiveAmount {
                amount: request.amount,
            });
        }
        if let Some(description) = &request.description {
            let length = description.chars().count();
            if length > MAX_DESCRIPTION_LEN {
                return Err(BankError::DescriptionTooLong {
                    length,
                    max: MAX_DESCRIPTION_LEN,
                });
            }
        }
        let source = self.ledger.account(&request.source)?;
        let destination = self.ledger.resolve(&request.destination)?;
        if source.id == destination {
            return Err(BankError::SameAccount {
                number: request.source.clone(),
            });
        }
        if source.owner != actor.user {
            return Err(BankError::not_account_owner(&request.source, actor.user));
        }

        let kyc_status = self.kyc.status(actor.user)?;
        if kyc_status != KycStatus::Approved {
            let err = BankError::kyc_not_approved(actor.user, kyc_status);
            warn!(user = %actor.user, status = %kyc_status, "transfer refused by kyc gate");
            self.audit_refusal(actor, &request, None, &err);
            return Err(err);
        }

        // Fast-fail on a snapshot before taking any account lock. The
        // authoritative check runs again inside the ledger's critical
        // section.
        let cap = self.config.daily_transfer_cap;
        if limits::check(source.daily_spent, request.amount, cap) == LimitCheck::Exceeded {
            let err = BankError::daily_limit_exceeded(
                &source.number,
                source.daily_spent,
                request.amount,
                cap,
            );
            warn!(
                account = %source.number,
                spent_today = %source.daily_spent,
                requested = %request.amount,
                "transfer refused by daily cap"
            );
            self.audit_refusal(actor, &request, None, &err);
            return Err(err);
        }

        let applied = match self
            .ledger
            .transfer(source.id, destination, request.amount, Some(cap))
        {
            Ok(applied) => applied,
            Err(err @ BankError::InsufficientFunds { .. }) => {
                let rejected = Transaction::new(
                    TransactionKind::Transfer,
                    source.id,
                    destination,
                    request.amount,
                    request.description.clone(),
                    self.clock.now(),
                );
                let id = rejected.id;
                self.transactions.record(rejected);
                self.transactions
                    .transition(id, TransactionStatus::Rejected)?;
                warn!(transaction = %id, account = %source.number, "transfer rejected: insufficient funds");
                self.audit_refusal(actor, &request, Some(id), &err);
                return Err(err);
            }
            Err(err) => {
                // In-lock cap refusal, an endpoint deactivated since
                // validation, or a balance overflow.
                warn!(account = %source.number, error = %err, "transfer refused by ledger");
                self.audit_refusal(actor, &request, None, &err);
                return Err(err);
            }
        };

        // Funds are moved; the record must exist before the oracle is
        // consulted so a crash or timeout leaves a pending transaction
        // rather than an untracked movement.
        let transaction = Transaction::new(
            TransactionKind::Transfer,
            source.id,
            destination,
            request.amount,
            request.description.clone(),
            self.clock.now(),
        );
        let id = transaction.id;
        self.transactions.record(transaction);
        self.transactions
            .transition(id, TransactionStatus::FraudCheckPending)?;
        info!(
            transaction = %id,
            source = %applied.source_number,
            destination = %applied.destination_number,
            amount = %request.amount,
            "funds moved, awaiting fraud verdict"
        );

        let snapshot = FraudCheckRequest {
            account: source.id,
            amount: request.amount,
            recent_txn_count: applied.prior_daily_count,
            recent_txn_volume: applied.prior_daily_volume,
            description: request.description.clone(),
        };
        let status = match self.settle_with_oracle(id, &snapshot).await {
            Ok(status) => status,
            // Funds stay moved; the record stays pending until a
            // re-evaluation reaches the oracle.
            Err(_outage) => TransactionStatus::FraudCheckPending,
        };

        let outcome = if status == TransactionStatus::FraudCheckPending {
            AuditOutcome::Pending
        } else {
            AuditOutcome::Succeeded
        };
        self.audit.append(
            actor.user,
            AuditAction::Transfer,
            outcome,
            Some(id),
            json!({
                "source": applied.source_number,
                "destination": applied.destination_number,
                "amount": request.amount,
                "status": status.to_string(),
            }),
        );
        Ok(TransferReceipt {
            transaction: id,
            status,
        })
    }

    /// Retry the fraud evaluation of one parked transaction
    ///
    /// The context snapshot of the original attempt is gone, so the
    /// oracle sees the source account's current day window.
    ///
    /// # Errors
    ///
    /// `UnknownTransaction` for an unknown id, `NotAwaitingVerdict` when
    /// the record has already settled, or a `Dependency` error when the
    /// oracle is still unreachable (the record stays pending; nothing is
    /// audited because nothing changed).
    pub async fn reevaluate(
        &self,
        admin: &Actor,
        id: TransactionId,
    ) -> Result<TransferReceipt, BankError> {
        admin.require(Role::Admin)?;
        let transaction = self
            .transactions
            .get(id)
            .ok_or(BankError::UnknownTransaction { transaction: id })?;
        if transaction.status != TransactionStatus::FraudCheckPending {
            return Err(BankError::NotAwaitingVerdict {
                transaction: id,
                status: transaction.status,
            });
        }

        let source = self.ledger.account_by_id(transaction.source)?;
        let snapshot = FraudCheckRequest {
            account: transaction.source,
            amount: transaction.amount,
            recent_txn_count: source.daily_count,
            recent_txn_volume: source.daily_spent,
            description: transaction.description.clone(),
        };
        let status = self.settle_with_oracle(id, &snapshot).await?;
        info!(transaction = %id, status = %status, "parked transaction settled");
        self.audit.append(
            admin.user,
            AuditAction::Reevaluated,
            AuditOutcome::Succeeded,
            Some(id),
            json!({ "status": status.to_string() }),
        );
        Ok(TransferReceipt {
            transaction: id,
            status,
        })
    }

    /// Retry every parked transaction concurrently
    ///
    /// Transactions that still cannot be settled (oracle down, or a
    /// racing caller settled them first) are reported with their current
    /// recorded status rather than failing the sweep.
    pub async fn reevaluate_pending(
        &self,
        admin: &Actor,
    ) -> Result<Vec<TransferReceipt>, BankError> {
        admin.require(Role::Admin)?;
        let pending = self.transactions.pending();
        let attempts =
            futures::future::join_all(pending.iter().map(|id| self.reevaluate(admin, *id))).await;

        let mut receipts = Vec::with_capacity(pending.len());
        for (id, attempt) in pending.into_iter().zip(attempts) {
            match attempt {
                Ok(receipt) => receipts.push(receipt),
                Err(_) => receipts.push(TransferReceipt {
                    transaction: id,
                    status: self.transactions.status(id)?,
                }),
            }
        }
        Ok(receipts)
    }

    /// Current status of a transaction
    ///
    /// The polling surface for callers holding a pending receipt.
    pub fn transaction_status(&self, id: TransactionId) -> Result<TransactionStatus, BankError> {
        self.transactions.status(id)
    }

    /// Full record of a transaction
    pub fn transaction(&self, id: TransactionId) -> Option<Transaction> {
        self.transactions.get(id)
    }

    /// Issue a compensating reversal for a flagged transfer
    ///
    /// Used by the fraud-review rejection path. The reversal is a brand
    /// new transaction moving the amount back from the original
    /// destination to the original source. It is balance-checked but
    /// skips the KYC gate, the daily cap, and the oracle, and it does
    /// not count toward anyone's daily window. The original record is
    /// terminal and stays `Flagged`.
    ///
    /// # Errors
    ///
    /// `NotFlagged` when the transaction is not in `Flagged` status, or
    /// a ledger error when the destination no longer covers the amount.
    pub(crate) fn reverse(&self, original: &Transaction) -> Result<Transaction, BankError> {
        let status = self.transactions.status(original.id)?;
        if status != TransactionStatus::Flagged {
            error!(transaction = %original.id, status = %status, "reversal requested for a non-flagged transaction");
            return Err(BankError::NotFlagged {
                transaction: original.id,
                status,
            });
        }

        self.ledger
            .transfer(original.destination, original.source, original.amount, None)?;
        let reversal = Transaction::new(
            TransactionKind::Reversal,
            original.destination,
            original.source,
            original.amount,
            Some(format!("reversal of {}", original.id)),
            self.clock.now(),
        );
        let id = reversal.id;
        self.transactions.record(reversal);
        let settled = self
            .transactions
            .transition(id, TransactionStatus::Cleared)?;
        info!(
            transaction = %id,
            compensates = %original.id,
            amount = %original.amount,
            "compensating reversal applied"
        );
        Ok(settled)
    }

    /// Consult the oracle within the configured bound and settle the
    /// record accordingly
    async fn settle_with_oracle(
        &self,
        id: TransactionId,
        snapshot: &FraudCheckRequest,
    ) -> Result<TransactionStatus, BankError> {
        let bound = self.config.oracle_timeout;
        match tokio::time::timeout(bound, self.oracle.evaluate(snapshot)).await {
            Ok(Ok(verdict)) => {
                let target = match verdict.verdict {
                    Verdict::NotFraud => TransactionStatus::Cleared,
                    Verdict::Fraud => {
                        // Flag first, then status: a reader seeing
                        // `Flagged` must always find the flag.
                        self.flags.raise(id, &verdict.reason);
                        TransactionStatus::Flagged
                    }
                };
                match self.transactions.transition(id, target) {
                    Ok(settled) => {
                        if target == TransactionStatus::Flagged {
                            warn!(transaction = %id, reason = %verdict.reason, "transaction flagged for review");
                        } else {
                            info!(transaction = %id, "transaction cleared");
                        }
                        Ok(settled.status)
                    }
                    Err(refused) => {
                        // A concurrent evaluation settled the record
                        // first; its verdict stands.
                        match self.transactions.status(id) {
                            Ok(status) if status.is_terminal() => Ok(status),
                            _ => Err(refused),
                        }
                    }
                }
            }
            Ok(Err(outage)) => {
                error!(transaction = %id, error = %outage, "fraud oracle unavailable");
                Err(BankError::oracle_unavailable(id, &outage.to_string()))
            }
            Err(_elapsed) => {
                let waited_ms = bound.as_millis() as u64;
                error!(transaction = %id, waited_ms, "fraud oracle timed out");
                Err(BankError::oracle_timeout(id, waited_ms))
            }
        }
    }

    /// One audit entry for a refused transfer
    fn audit_refusal(
        &self,
        actor: &Actor,
        request: &TransferRequest,
        transaction: Option<TransactionId>,
        error: &BankError,
    ) {
        self.audit.append(
            actor.user,
            AuditAction::Transfer,
            AuditOutcome::Failed,
            transaction,
            json!({
                "source": request.source,
                "destination": request.destination,
                "amount": request.amount,
                "reason": error.to_string(),
            }),
        );
    }
}
