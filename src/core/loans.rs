//! Loan book and EMI arithmetic
//!
//! Customers apply for loans; admins decide them. A loan moves from
//! `Pending` to exactly one of `Approved` or `Rejected` and never again.
//! Approval fixes the equated monthly installment (EMI) at the configured
//! annual rate and disburses the principal to the customer's oldest
//! active account in the same operation.
//!
//! EMI uses the standard reducing-balance formula
//!
//! ```text
//! E = P * r * (1 + r)^n / ((1 + r)^n - 1)      r = annual rate / 1200
//! ```
//!
//! with a zero rate degenerating to `P / n`. All published figures are
//! rounded to 2 decimal places, half away from zero.

use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::json;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::core::audit::AuditSink;
use crate::core::kyc::KycRegistry;
use crate::core::ledger::LedgerStore;
use crate::types::{
    Actor, AuditAction, AuditOutcome, BankError, EmiQuote, KycStatus, Loan, LoanApplication,
    LoanId, LoanStatus, Role, UserId,
};

/// Longest tenure the EMI arithmetic accepts
pub const MAX_TENURE_MONTHS: u32 = 600;

/// Compute repayment figures for a prospective loan
///
/// # Arguments
///
/// * `principal` - Loan amount; must be positive
/// * `annual_rate` - Annual interest rate in percent; zero is allowed
/// * `tenure_months` - Repayment period, `1..=MAX_TENURE_MONTHS`
///
/// # Returns
///
/// An [`EmiQuote`] with the monthly installment, the total interest, and
/// the total payment, each rounded to 2 decimal places. The totals are
/// derived from the unrounded installment, so `total_payment` can differ
/// from `monthly_installment * tenure_months` by a few cents.
///
/// # Errors
///
/// `NonPositiveAmount`, `InvalidTenure`, or `EmiOverflow` when the
/// rate/tenure combination exceeds the representable decimal range.
pub fn emi_quote(
    principal: Decimal,
    annual_rate: Decimal,
    tenure_months: u32,
) -> Result<EmiQuote, BankError> {
    if principal <= Decimal::ZERO {
        return Err(BankError::NonPositiveAmount { amount: principal });
    }
    if tenure_months == 0 || tenure_months > MAX_TENURE_MONTHS {
        return Err(BankError::InvalidTenure {
            months: tenure_months,
            max: MAX_TENURE_MONTHS,
        });
    }

    let months = Decimal::from(tenure_months);
    let overflow = || BankError::EmiOverflow {
        principal,
        months: tenure_months,
    };

    let monthly_rate = annual_rate
        .checked_div(Decimal::new(1200, 0))
        .ok_or_else(overflow)?;

    let raw_installment = if monthly_rate.is_zero() {
        principal.checked_div(months).ok_or_else(overflow)?
    } else {
        let growth = Decimal::ONE + monthly_rate;
        let mut factor = Decimal::ONE;
        for _ in 0..tenure_months {
            factor = factor.checked_mul(growth).ok_or_else(overflow)?;
        }
        let numerator = principal
            .checked_mul(monthly_rate)
            .and_then(|value| value.checked_mul(factor))
            .ok_or_else(overflow)?;
        let denominator = factor - Decimal::ONE;
        numerator.checked_div(denominator).ok_or_else(overflow)?
    };

    let total_payment_raw = raw_installment.checked_mul(months).ok_or_else(overflow)?;
    let total_interest = (total_payment_raw - principal)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    Ok(EmiQuote {
        monthly_installment: raw_installment
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        total_interest,
        total_payment: principal.checked_add(total_interest).ok_or_else(overflow)?,
    })
}

/// Thread-safe store of loan applications and decisions
pub struct LoanBook {
    loans: DashMap<LoanId, Loan>,
    ledger: Arc<LedgerStore>,
    kyc: Arc<KycRegistry>,
    audit: Arc<AuditSink>,
    annual_rate: Decimal,
    clock: Arc<dyn Clock>,
}

impl LoanBook {
    /// Create an empty loan book
    ///
    /// # Arguments
    ///
    /// * `ledger` - Ledger used for disbursements
    /// * `kyc` - Registry consulted by the application gate
    /// * `audit` - Audit sink for application and decision entries
    /// * `annual_rate` - Annual interest rate (percent) fixed at approval
    /// * `clock` - Timestamp source
    pub fn new(
        ledger: Arc<LedgerStore>,
        kyc: Arc<KycRegistry>,
        audit: Arc<AuditSink>,
        annual_rate: Decimal,
        clock: Arc<dyn Clock>,
    ) -> Self {
        LoanBook {
            loans: DashMap::new(),
            ledger,
            kyc,
            audit,
            annual_rate,
            clock,
        }
    }

    /// Submit a loan application
    ///
    /// Applications are open to KYC-approved customers only; the gate is
    /// checked after input validation so malformed requests never reach
    /// the audit trail.
    ///
    /// # Errors
    ///
    /// `UnauthorizedRole` for non-customers; `EmptyLoanType`,
    /// `NonPositiveAmount`, or `InvalidTenure` for malformed
    /// applications; `UnknownCustomer` or `KycNotApproved` from the
    /// gate. Validation failures leave no trace, a refused gate leaves
    /// one audit entry.
    pub fn apply(&self, actor: &Actor, application: LoanApplication) -> Result<Loan, BankError> {
        actor.require(Role::Customer)?;
        if application.loan_type.trim().is_empty() {
            return Err(BankError::EmptyLoanType);
        }
        if application.principal <= Decimal::ZERO {
            return Err(BankError::NonPositiveAmount {
                amount: application.principal,
            });
        }
        if application.tenure_months == 0 || application.tenure_months > MAX_TENURE_MONTHS {
            return Err(BankError::InvalidTenure {
                months: application.tenure_months,
                max: MAX_TENURE_MONTHS,
            });
        }

        let kyc_status = self.kyc.status(actor.user)?;
        if kyc_status != KycStatus::Approved {
            let err = BankError::kyc_not_approved(actor.user, kyc_status);
            warn!(customer = %actor.user, status = %kyc_status, "loan application refused by kyc gate");
            self.audit.append(
                actor.user,
                AuditAction::LoanApplied,
                AuditOutcome::Failed,
                None,
                json!({
                    "loan_type": application.loan_type,
                    "principal": application.principal,
                    "reason": err.to_string(),
                }),
            );
            return Err(err);
        }

        let loan = Loan::new(actor.user, application, self.clock.now());
        self.loans.insert(loan.id, loan.clone());
        info!(loan = %loan.id, customer = %actor.user, principal = %loan.principal, "loan application received");
        self.audit.append(
            actor.user,
            AuditAction::LoanApplied,
            AuditOutcome::Succeeded,
            Some(loan.id),
            json!({
                "loan_type": loan.loan_type,
                "principal": loan.principal,
                "tenure_months": loan.tenure_months,
            }),
        );
        Ok(loan)
    }

    /// Decide a pending loan
    ///
    /// Rejection only moves the status. Approval fixes the EMI, credits
    /// the principal to the customer's oldest active account, and records
    /// the figures in the audit entry. The decision claims the loan
    /// before disbursing, so two racing admins cannot both disburse; if
    /// the disbursement itself fails, the claim is released and the loan
    /// is decidable again.
    ///
    /// # Errors
    ///
    /// `UnknownLoan`, `LoanAlreadyDecided`, `NoActiveAccount`, or a
    /// ledger error from the disbursement.
    pub fn decide(&self, admin: &Actor, loan_id: LoanId, approve: bool) -> Result<Loan, BankError> {
        admin.require(Role::Admin)?;

        if !approve {
            let rejected = self.claim(loan_id, LoanStatus::Rejected, None)?;
            info!(loan = %loan_id, "loan rejected");
            self.audit.append(
                admin.user,
                AuditAction::LoanDecided,
                AuditOutcome::Succeeded,
                Some(loan_id),
                json!({ "status": LoanStatus::Rejected.to_string() }),
            );
            return Ok(rejected);
        }

        let snapshot = self
            .loans
            .get(&loan_id)
            .map(|entry| entry.value().clone())
            .ok_or(BankError::UnknownLoan { loan: loan_id })?;

        let quote = emi_quote(snapshot.principal, self.annual_rate, snapshot.tenure_months)?;
        let account = match self.ledger.first_active_account(snapshot.customer) {
            Some(account) => account,
            None => {
                let err = BankError::NoActiveAccount {
                    user: snapshot.customer,
                };
                self.audit.append(
                    admin.user,
                    AuditAction::LoanDecided,
                    AuditOutcome::Failed,
                    Some(loan_id),
                    json!({ "reason": err.to_string() }),
                );
                return Err(err);
            }
        };

        let approved = self.claim(loan_id, LoanStatus::Approved, Some(quote.monthly_installment))?;

        if let Err(disburse_err) = self.ledger.credit(account, approved.principal) {
            // Claim released; the loan can be decided again once the
            // account situation is fixed.
            self.release(loan_id);
            error!(loan = %loan_id, error = %disburse_err, "disbursement failed, decision rolled back");
            self.audit.append(
                admin.user,
                AuditAction::LoanDecided,
                AuditOutcome::Failed,
                Some(loan_id),
                json!({ "reason": disburse_err.to_string() }),
            );
            return Err(disburse_err);
        }

        info!(
            loan = %loan_id,
            customer = %approved.customer,
            emi = %quote.monthly_installment,
            "loan approved and disbursed"
        );
        self.audit.append(
            admin.user,
            AuditAction::LoanDecided,
            AuditOutcome::Succeeded,
            Some(loan_id),
            json!({
                "status": LoanStatus::Approved.to_string(),
                "principal": approved.principal,
                "monthly_installment": quote.monthly_installment,
                "total_interest": quote.total_interest,
            }),
        );
        Ok(approved)
    }

    /// Get a loan by id
    pub fn get(&self, loan_id: LoanId) -> Option<Loan> {
        self.loans.get(&loan_id).map(|entry| entry.value().clone())
    }

    /// Pending applications, oldest first
    pub fn pending(&self) -> Vec<Loan> {
        let mut pending: Vec<Loan> = self
            .loans
            .iter()
            .filter(|entry| entry.value().status == LoanStatus::Pending)
            .map(|entry| entry.value().clone())
            .collect();
        pending.sort_by_key(|loan| (loan.applied_at, loan.id));
        pending
    }

    /// All loans of one customer, oldest first
    pub fn for_customer(&self, customer: UserId) -> Vec<Loan> {
        let mut loans: Vec<Loan> = self
            .loans
            .iter()
            .filter(|entry| entry.value().customer == customer)
            .map(|entry| entry.value().clone())
            .collect();
        loans.sort_by_key(|loan| (loan.applied_at, loan.id));
        loans
    }

    /// Atomically move a pending loan to a terminal status
    fn claim(
        &self,
        loan_id: LoanId,
        status: LoanStatus,
        installment: Option<Decimal>,
    ) -> Result<Loan, BankError> {
        let mut entry = self
            .loans
            .get_mut(&loan_id)
            .ok_or(BankError::UnknownLoan { loan: loan_id })?;
        let loan = entry.value_mut();
        if loan.status != LoanStatus::Pending {
            error!(loan = %loan_id, status = %loan.status, "loan decision on settled loan refused");
            return Err(BankError::LoanAlreadyDecided {
                loan: loan_id,
                status: loan.status,
            });
        }
        loan.status = status;
        loan.monthly_installment = installment;
        loan.decided_at = Some(self.clock.now());
        Ok(loan.clone())
    }

    /// Undo a claim whose follow-up work failed
    fn release(&self, loan_id: LoanId) {
        if let Some(mut entry) = self.loans.get_mut(&loan_id) {
            let loan = entry.value_mut();
            loan.status = LoanStatus::Pending;
            loan.monthly_installment = None;
            loan.decided_at = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::types::{AccountType, KycProfile};
    use rstest::rstest;
    use uuid::Uuid;

    fn dec(value: i64) -> Decimal {
        Decimal::new(value * 100, 2)
    }

    // The registry gets its own sink so audit assertions below count
    // loan entries only.
    fn book_with_rate(annual_rate: Decimal) -> (LoanBook, Arc<LedgerStore>, Arc<KycRegistry>) {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let ledger = Arc::new(LedgerStore::new(Arc::clone(&clock)));
        let audit = Arc::new(AuditSink::new(Arc::clone(&clock)));
        let kyc_audit = Arc::new(AuditSink::new(Arc::clone(&clock)));
        let kyc = Arc::new(KycRegistry::new(kyc_audit, Arc::clone(&clock)));
        let book = LoanBook::new(
            Arc::clone(&ledger),
            Arc::clone(&kyc),
            audit,
            annual_rate,
            clock,
        );
        (book, ledger, kyc)
    }

    fn approved_customer(kyc: &KycRegistry) -> UserId {
        let customer = Uuid::new_v4();
        kyc.ensure_registered(customer);
        kyc.submit(
            &Actor::customer(customer),
            KycProfile::new("Test Customer", "555-0100", "1 Bank St"),
        )
        .unwrap();
        kyc.decide(&Actor::admin(Uuid::new_v4()), customer, true)
            .unwrap();
        customer
    }

    #[test]
    fn test_emi_zero_rate_is_simple_division() {
        let quote = emi_quote(dec(12_000), Decimal::ZERO, 12).unwrap();
        assert_eq!(quote.monthly_installment, dec(1_000));
        assert_eq!(quote.total_interest, Decimal::ZERO);
        assert_eq!(quote.total_payment, dec(12_000));
    }

    #[test]
    fn test_emi_textbook_case() {
        // 100,000.00 at 12% per annum over 12 months.
        let quote = emi_quote(dec(100_000), Decimal::new(12, 0), 12).unwrap();
        assert_eq!(quote.monthly_installment, Decimal::new(8_884_88, 2));
        assert_eq!(quote.total_interest, Decimal::new(6_618_55, 2));
        assert_eq!(quote.total_payment, Decimal::new(106_618_55, 2));
    }

    #[rstest]
    #[case::zero_principal(Decimal::ZERO, Decimal::new(10, 0), 12)]
    #[case::negative_principal(dec(-100), Decimal::new(10, 0), 12)]
    #[case::zero_tenure(dec(1_000), Decimal::new(10, 0), 0)]
    #[case::tenure_over_max(dec(1_000), Decimal::new(10, 0), MAX_TENURE_MONTHS + 1)]
    fn test_emi_rejects_bad_input(
        #[case] principal: Decimal,
        #[case] rate: Decimal,
        #[case] months: u32,
    ) {
        assert!(emi_quote(principal, rate, months).is_err());
    }

    #[test]
    fn test_emi_longer_tenure_lowers_installment() {
        let short = emi_quote(dec(50_000), Decimal::new(105, 1), 12).unwrap();
        let long = emi_quote(dec(50_000), Decimal::new(105, 1), 60).unwrap();
        assert!(long.monthly_installment < short.monthly_installment);
        assert!(long.total_interest > short.total_interest);
    }

    #[test]
    fn test_apply_records_pending_loan_and_audits() {
        let (book, _ledger, kyc) = book_with_rate(Decimal::new(105, 1));
        let customer = approved_customer(&kyc);
        let loan = book
            .apply(
                &Actor::customer(customer),
                LoanApplication::new("personal", dec(25_000), 24),
            )
            .unwrap();

        assert_eq!(loan.status, LoanStatus::Pending);
        assert_eq!(loan.customer, customer);
        assert!(loan.monthly_installment.is_none());
        assert_eq!(book.audit.len(), 1);
        assert_eq!(book.pending().len(), 1);
    }

    #[rstest]
    #[case::empty_type(LoanApplication::new("  ", Decimal::ONE, 12))]
    #[case::zero_principal(LoanApplication::new("personal", Decimal::ZERO, 12))]
    #[case::zero_tenure(LoanApplication::new("personal", Decimal::ONE, 0))]
    fn test_apply_rejects_invalid_applications(#[case] application: LoanApplication) {
        let (book, _ledger, _kyc) = book_with_rate(Decimal::new(105, 1));
        let err = book.apply(&Actor::customer(Uuid::new_v4()), application);
        assert!(err.is_err());
        assert!(book.audit.is_empty());
    }

    #[test]
    fn test_apply_requires_customer_role() {
        let (book, _ledger, _kyc) = book_with_rate(Decimal::new(105, 1));
        let err = book
            .apply(
                &Actor::admin(Uuid::new_v4()),
                LoanApplication::new("personal", dec(1_000), 12),
            )
            .unwrap_err();
        assert!(matches!(err, BankError::UnauthorizedRole { .. }));
    }

    #[test]
    fn test_apply_requires_kyc_approval() {
        let (book, _ledger, kyc) = book_with_rate(Decimal::new(105, 1));
        let customer = Uuid::new_v4();
        kyc.ensure_registered(customer);

        let err = book
            .apply(
                &Actor::customer(customer),
                LoanApplication::new("personal", dec(5_000), 12),
            )
            .unwrap_err();

        assert_eq!(
            err,
            BankError::kyc_not_approved(customer, KycStatus::Pending)
        );
        assert!(book.pending().is_empty());
        // The refused gate is the one audited event.
        assert_eq!(book.audit.len(), 1);
    }

    #[test]
    fn test_approval_disburses_to_oldest_active_account() {
        let (book, ledger, kyc) = book_with_rate(Decimal::ZERO);
        let customer = approved_customer(&kyc);
        ledger
            .open_account(customer, "ACC-1", AccountType::Saving, dec(100))
            .unwrap();

        let loan = book
            .apply(
                &Actor::customer(customer),
                LoanApplication::new("personal", dec(12_000), 12),
            )
            .unwrap();
        let approved = book
            .decide(&Actor::admin(Uuid::new_v4()), loan.id, true)
            .unwrap();

        assert_eq!(approved.status, LoanStatus::Approved);
        assert_eq!(approved.monthly_installment, Some(dec(1_000)));
        assert_eq!(ledger.account("ACC-1").unwrap().balance, dec(12_100));
    }

    #[test]
    fn test_rejection_moves_status_without_disbursing() {
        let (book, ledger, kyc) = book_with_rate(Decimal::new(105, 1));
        let customer = approved_customer(&kyc);
        ledger
            .open_account(customer, "ACC-1", AccountType::Saving, dec(100))
            .unwrap();
        let loan = book
            .apply(
                &Actor::customer(customer),
                LoanApplication::new("personal", dec(5_000), 12),
            )
            .unwrap();

        let rejected = book
            .decide(&Actor::admin(Uuid::new_v4()), loan.id, false)
            .unwrap();
        assert_eq!(rejected.status, LoanStatus::Rejected);
        assert!(rejected.monthly_installment.is_none());
        assert_eq!(ledger.account("ACC-1").unwrap().balance, dec(100));
    }

    #[test]
    fn test_for_customer_lists_own_loans_oldest_first() {
        let (book, ledger, kyc) = book_with_rate(Decimal::ZERO);
        let customer = approved_customer(&kyc);
        let other = approved_customer(&kyc);
        ledger
            .open_account(customer, "ACC-1", AccountType::Saving, dec(0))
            .unwrap();

        let first = book
            .apply(
                &Actor::customer(customer),
                LoanApplication::new("personal", dec(1_000), 12),
            )
            .unwrap();
        let second = book
            .apply(
                &Actor::customer(customer),
                LoanApplication::new("home", dec(9_000), 120),
            )
            .unwrap();
        book.apply(
            &Actor::customer(other),
            LoanApplication::new("personal", dec(500), 6),
        )
        .unwrap();
        book.decide(&Actor::admin(Uuid::new_v4()), first.id, true)
            .unwrap();

        // Decided loans stay in the listing; callers filter by status.
        let mine = book.for_customer(customer);
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].id, first.id);
        assert_eq!(mine[0].status, LoanStatus::Approved);
        assert_eq!(mine[1].id, second.id);
        assert_eq!(mine[1].status, LoanStatus::Pending);
    }

    #[test]
    fn test_double_decision_is_refused() {
        let (book, ledger, kyc) = book_with_rate(Decimal::new(105, 1));
        let customer = approved_customer(&kyc);
        ledger
            .open_account(customer, "ACC-1", AccountType::Saving, dec(0))
            .unwrap();
        let loan = book
            .apply(
                &Actor::customer(customer),
                LoanApplication::new("personal", dec(5_000), 12),
            )
            .unwrap();
        let admin = Actor::admin(Uuid::new_v4());
        book.decide(&admin, loan.id, false).unwrap();

        let err = book.decide(&admin, loan.id, true).unwrap_err();
        assert_eq!(
            err,
            BankError::LoanAlreadyDecided {
                loan: loan.id,
                status: LoanStatus::Rejected,
            }
        );
    }

    #[test]
    fn test_approval_without_account_fails_and_stays_pending() {
        let (book, _ledger, kyc) = book_with_rate(Decimal::new(105, 1));
        let customer = approved_customer(&kyc);
        let loan = book
            .apply(
                &Actor::customer(customer),
                LoanApplication::new("personal", dec(5_000), 12),
            )
            .unwrap();

        let err = book
            .decide(&Actor::admin(Uuid::new_v4()), loan.id, true)
            .unwrap_err();
        assert_eq!(err, BankError::NoActiveAccount { user: customer });
        assert_eq!(book.get(loan.id).unwrap().status, LoanStatus::Pending);
    }

    #[test]
    fn test_failed_disbursement_releases_the_claim() {
        let (book, ledger, kyc) = book_with_rate(Decimal::ZERO);
        let customer = approved_customer(&kyc);
        // A balance at the decimal ceiling makes the disbursement credit
        // overflow after the loan has been claimed.
        ledger
            .open_account(customer, "ACC-1", AccountType::Saving, Decimal::MAX)
            .unwrap();
        let loan = book
            .apply(
                &Actor::customer(customer),
                LoanApplication::new("personal", dec(5_000), 12),
            )
            .unwrap();

        let err = book
            .decide(&Actor::admin(Uuid::new_v4()), loan.id, true)
            .unwrap_err();
        assert!(matches!(err, BankError::ArithmeticOverflow { .. }));
        let loan = book.get(loan.id).unwrap();
        assert_eq!(loan.status, LoanStatus::Pending);
        assert!(loan.monthly_installment.is_none());
    }
}
