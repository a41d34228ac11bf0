//! Bank facade
//!
//! [`Bank`] wires the core components together and exposes the
//! role-gated operations as one surface: account opening, transfers,
//! KYC, loans, fraud review, and audit retrieval. Identity is assumed
//! to be verified upstream; an [`Actor`] names an already-authenticated
//! user and the role they hold, and each operation enforces its own
//! role gate.
//!
//! Mutations and the audit trail are gated. Plain reads (account
//! snapshots for reporting, transaction lookups, review queues) are
//! open through the component accessors, which the replay tooling and
//! tests use directly.

use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::config::BankConfig;
use crate::core::audit::AuditSink;
use crate::core::engine::TransactionEngine;
use crate::core::kyc::KycRegistry;
use crate::core::ledger::LedgerStore;
use crate::core::loans::LoanBook;
use crate::core::oracle::FraudOracle;
use crate::core::review::{FraudFlagStore, ReviewDesk};
use crate::core::transactions::TransactionStore;
use crate::types::{
    Account, AccountType, Actor, AuditAction, AuditLogEntry, AuditOutcome, BankError, Customer,
    FraudFlag, KycProfile, KycStatus, Loan, LoanApplication, LoanId, Role, TransactionId,
    TransactionStatus, TransferReceipt, TransferRequest, UserId,
};

/// The assembled banking core
pub struct Bank {
    config: BankConfig,
    audit: Arc<AuditSink>,
    ledger: Arc<LedgerStore>,
    transactions: Arc<TransactionStore>,
    flags: Arc<FraudFlagStore>,
    kyc: Arc<KycRegistry>,
    loans: Arc<LoanBook>,
    engine: Arc<TransactionEngine>,
    review: ReviewDesk,
}

impl Bank {
    /// Assemble a bank on the system clock
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when the configuration fails validation.
    pub fn new(config: BankConfig, oracle: Arc<dyn FraudOracle>) -> Result<Self, BankError> {
        Self::with_clock(config, oracle, Arc::new(SystemClock))
    }

    /// Assemble a bank on an explicit clock
    ///
    /// Tests use this with a fixed clock to place operations on exact
    /// UTC days.
    pub fn with_clock(
        config: BankConfig,
        oracle: Arc<dyn FraudOracle>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BankError> {
        config.validate()?;
        let audit = Arc::new(AuditSink::new(Arc::clone(&clock)));
        let ledger = Arc::new(LedgerStore::new(Arc::clone(&clock)));
        let transactions = Arc::new(TransactionStore::new());
        let flags = Arc::new(FraudFlagStore::new(Arc::clone(&clock)));
        let kyc = Arc::new(KycRegistry::new(Arc::clone(&audit), Arc::clone(&clock)));
        let loans = Arc::new(LoanBook::new(
            Arc::clone(&ledger),
            Arc::clone(&kyc),
            Arc::clone(&audit),
            config.annual_loan_rate,
            Arc::clone(&clock),
        ));
        let engine = Arc::new(TransactionEngine::new(
            Arc::clone(&ledger),
            Arc::clone(&transactions),
            Arc::clone(&flags),
            Arc::clone(&kyc),
            oracle,
            Arc::clone(&audit),
            config.clone(),
            Arc::clone(&clock),
        ));
        let review = ReviewDesk::new(
            Arc::clone(&flags),
            Arc::clone(&engine),
            Arc::clone(&audit),
            clock,
        );

        Ok(Bank {
            config,
            audit,
            ledger,
            transactions,
            flags,
            kyc,
            loans,
            engine,
            review,
        })
    }

    /// Open an account for the calling customer
    ///
    /// Registers the customer with the KYC registry on first contact
    /// (their verification starts `Pending`) and seeds the balance with
    /// the initial deposit.
    ///
    /// # Errors
    ///
    /// `UnauthorizedRole`, `DuplicateAccountNumber`, or
    /// `NonPositiveAmount` for a negative deposit. Failures leave no
    /// trace.
    pub fn open_account(
        &self,
        actor: &Actor,
        number: &str,
        account_type: AccountType,
        initial_deposit: Decimal,
    ) -> Result<Account, BankError> {
        actor.require(Role::Customer)?;
        let account = self
            .ledger
            .open_account(actor.user, number, account_type, initial_deposit)?;
        self.kyc.ensure_registered(actor.user);
        info!(account = %account.number, owner = %actor.user, "account opened");
        self.audit.append(
            actor.user,
            AuditAction::AccountOpened,
            AuditOutcome::Succeeded,
            Some(account.id),
            json!({
                "number": account.number,
                "account_type": account.account_type.to_string(),
                "initial_deposit": initial_deposit,
            }),
        );
        Ok(account)
    }

    /// Deactivate an account
    ///
    /// Accounts are never deleted; a deactivated account refuses debits
    /// and credits but keeps its history. Idempotent.
    pub fn deactivate_account(&self, actor: &Actor, number: &str) -> Result<Account, BankError> {
        actor.require(Role::Admin)?;
        let account = self.ledger.deactivate(number)?;
        info!(account = %account.number, "account deactivated");
        self.audit.append(
            actor.user,
            AuditAction::AccountDeactivated,
            AuditOutcome::Succeeded,
            Some(account.id),
            json!({ "number": account.number }),
        );
        Ok(account)
    }

    /// Balance and daily usage of an account
    ///
    /// Customers see their own accounts; admins see any.
    pub fn balance(&self, actor: &Actor, number: &str) -> Result<Account, BankError> {
        let account = self.ledger.account(number)?;
        match actor.role {
            Role::Admin => Ok(account),
            Role::Customer if account.owner == actor.user => Ok(account),
            Role::Customer => Err(BankError::not_account_owner(number, actor.user)),
            Role::Auditor => Err(BankError::UnauthorizedRole {
                required: Role::Customer,
                actual: Role::Auditor,
            }),
        }
    }

    /// Execute a customer transfer
    pub async fn transfer(
        &self,
        actor: &Actor,
        request: TransferRequest,
    ) -> Result<TransferReceipt, BankError> {
        self.engine.transfer(actor, request).await
    }

    /// Retry the fraud evaluation of one parked transaction
    pub async fn reevaluate(
        &self,
        actor: &Actor,
        transaction: TransactionId,
    ) -> Result<TransferReceipt, BankError> {
        self.engine.reevaluate(actor, transaction).await
    }

    /// Retry every parked transaction concurrently
    pub async fn reevaluate_pending(
        &self,
        actor: &Actor,
    ) -> Result<Vec<TransferReceipt>, BankError> {
        self.engine.reevaluate_pending(actor).await
    }

    /// Current status of a transaction
    pub fn transaction_status(&self, id: TransactionId) -> Result<TransactionStatus, BankError> {
        self.engine.transaction_status(id)
    }

    /// Submit KYC details for the calling customer
    pub fn submit_kyc(&self, actor: &Actor, profile: KycProfile) -> Result<KycStatus, BankError> {
        self.kyc.submit(actor, profile)
    }

    /// Decide a customer's KYC verification
    pub fn decide_kyc(
        &self,
        actor: &Actor,
        user: UserId,
        approve: bool,
    ) -> Result<Customer, BankError> {
        self.kyc.decide(actor, user, approve)
    }

    /// Apply for a loan
    pub fn apply_loan(
        &self,
        actor: &Actor,
        application: LoanApplication,
    ) -> Result<Loan, BankError> {
        self.loans.apply(actor, application)
    }

    /// Decide a pending loan
    pub fn decide_loan(&self, actor: &Actor, loan: LoanId, approve: bool) -> Result<Loan, BankError> {
        self.loans.decide(actor, loan, approve)
    }

    /// Decide a fraud flag
    pub fn review_flag(
        &self,
        actor: &Actor,
        transaction: TransactionId,
        approve: bool,
    ) -> Result<FraudFlag, BankError> {
        self.review.decide(actor, transaction, approve)
    }

    /// Most recent audit entries, newest first
    ///
    /// Auditor-only. `limit` defaults to the configured query limit.
    pub fn recent_audit(
        &self,
        actor: &Actor,
        limit: Option<usize>,
    ) -> Result<Vec<AuditLogEntry>, BankError> {
        actor.require(Role::Auditor)?;
        Ok(self
            .audit
            .recent(limit.unwrap_or(self.config.audit_query_limit)))
    }

    /// The ledger component
    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    /// The transaction store
    pub fn transactions(&self) -> &TransactionStore {
        &self.transactions
    }

    /// The fraud flag store
    pub fn flags(&self) -> &FraudFlagStore {
        &self.flags
    }

    /// The KYC registry
    pub fn kyc(&self) -> &KycRegistry {
        &self.kyc
    }

    /// The loan book
    pub fn loans(&self) -> &LoanBook {
        &self.loans
    }

    /// The audit sink
    pub fn audit(&self) -> &AuditSink {
        &self.audit
    }
}

impl fmt::Debug for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bank")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::oracle::StaticOracle;
    use uuid::Uuid;

    fn dec(value: i64) -> Decimal {
        Decimal::new(value * 100, 2)
    }

    fn bank() -> Bank {
        Bank::new(BankConfig::default(), Arc::new(StaticOracle::approve_all())).unwrap()
    }

    #[test]
    fn test_invalid_config_is_refused_at_assembly() {
        let config = BankConfig {
            daily_transfer_cap: Decimal::ZERO,
            ..BankConfig::default()
        };
        let err = Bank::new(config, Arc::new(StaticOracle::approve_all())).unwrap_err();
        assert!(matches!(err, BankError::InvalidConfig { .. }));
    }

    #[test]
    fn test_open_account_registers_customer_and_audits() {
        let bank = bank();
        let actor = Actor::customer(Uuid::new_v4());

        let account = bank
            .open_account(&actor, "ACC-1", AccountType::Saving, dec(500))
            .unwrap();

        assert_eq!(account.balance, dec(500));
        assert_eq!(bank.kyc().status(actor.user).unwrap(), KycStatus::Pending);
        assert_eq!(bank.audit().len(), 1);

        // A duplicate number leaves no additional trace.
        let err = bank
            .open_account(&actor, "ACC-1", AccountType::Current, dec(0))
            .unwrap_err();
        assert!(matches!(err, BankError::DuplicateAccountNumber { .. }));
        assert_eq!(bank.audit().len(), 1);
    }

    #[test]
    fn test_open_account_requires_customer_role() {
        let bank = bank();
        let err = bank
            .open_account(
                &Actor::admin(Uuid::new_v4()),
                "ACC-1",
                AccountType::Saving,
                dec(0),
            )
            .unwrap_err();
        assert!(matches!(err, BankError::UnauthorizedRole { .. }));
    }

    #[test]
    fn test_deactivation_is_admin_only_and_audited() {
        let bank = bank();
        let customer = Actor::customer(Uuid::new_v4());
        bank.open_account(&customer, "ACC-1", AccountType::Saving, dec(0))
            .unwrap();

        let err = bank.deactivate_account(&customer, "ACC-1").unwrap_err();
        assert!(matches!(err, BankError::UnauthorizedRole { .. }));

        let account = bank
            .deactivate_account(&Actor::admin(Uuid::new_v4()), "ACC-1")
            .unwrap();
        assert!(!account.active);
        assert_eq!(bank.audit().len(), 2);
    }

    #[test]
    fn test_balance_visibility_by_role() {
        let bank = bank();
        let owner = Actor::customer(Uuid::new_v4());
        bank.open_account(&owner, "ACC-1", AccountType::Saving, dec(75))
            .unwrap();

        assert_eq!(bank.balance(&owner, "ACC-1").unwrap().balance, dec(75));
        assert_eq!(
            bank.balance(&Actor::admin(Uuid::new_v4()), "ACC-1")
                .unwrap()
                .balance,
            dec(75)
        );

        let stranger = bank
            .balance(&Actor::customer(Uuid::new_v4()), "ACC-1")
            .unwrap_err();
        assert!(matches!(stranger, BankError::NotAccountOwner { .. }));

        let auditor = bank
            .balance(&Actor::auditor(Uuid::new_v4()), "ACC-1")
            .unwrap_err();
        assert!(matches!(auditor, BankError::UnauthorizedRole { .. }));
    }

    #[test]
    fn test_audit_retrieval_is_auditor_gated_with_default_limit() {
        let bank = bank();
        let customer = Actor::customer(Uuid::new_v4());
        bank.open_account(&customer, "ACC-1", AccountType::Saving, dec(0))
            .unwrap();

        let err = bank.recent_audit(&customer, None).unwrap_err();
        assert!(matches!(err, BankError::UnauthorizedRole { .. }));

        let entries = bank
            .recent_audit(&Actor::auditor(Uuid::new_v4()), None)
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::AccountOpened);

        let none = bank
            .recent_audit(&Actor::auditor(Uuid::new_v4()), Some(0))
            .unwrap();
        assert!(none.is_empty());
    }
}
