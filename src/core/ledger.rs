//! Thread-safe account ledger
//!
//! [`LedgerStore`] owns every account. Each account's mutable state sits
//! behind its own `Mutex`, with a concurrent map from id to state and a
//! second map from the externally visible account number to the id.
//!
//! # Concurrency
//!
//! A transfer must hold both endpoint accounts at once, so the store
//! clones the two `Arc<Mutex<_>>` handles out of the map and locks them
//! in ascending id order. Since every multi-account operation acquires in
//! the same order, lock cycles cannot form. Balance check, daily-cap
//! check, debit, and credit all happen inside that critical section: no
//! interleaving can drive a balance negative or let concurrent transfers
//! slip past the cap together.
//!
//! Mutations never perform I/O or await while holding a lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use crate::clock::Clock;
use crate::core::limits::{self, LimitCheck};
use crate::types::{Account, AccountId, AccountNumber, AccountType, BankError, UserId};

/// Rolling per-UTC-day outgoing usage
#[derive(Debug, Clone, Copy)]
struct DayWindow {
    day: NaiveDate,
    spent: Decimal,
    count: u32,
}

impl DayWindow {
    fn new(day: NaiveDate) -> Self {
        DayWindow {
            day,
            spent: Decimal::ZERO,
            count: 0,
        }
    }

    /// View of this window as of `today`, without mutating it
    fn as_of(&self, today: NaiveDate) -> DayWindow {
        if self.day == today {
            *self
        } else {
            DayWindow::new(today)
        }
    }

    /// Reset the window if the day has changed
    fn roll(&mut self, today: NaiveDate) {
        if self.day != today {
            *self = DayWindow::new(today);
        }
    }
}

/// Mutable account state guarded by the account's own mutex
#[derive(Debug)]
struct AccountState {
    id: AccountId,
    number: AccountNumber,
    owner: UserId,
    account_type: AccountType,
    balance: Decimal,
    active: bool,
    window: DayWindow,
    opened_seq: u64,
}

impl AccountState {
    fn snapshot(&self, today: NaiveDate) -> Account {
        let window = self.window.as_of(today);
        Account {
            id: self.id,
            number: self.number.clone(),
            owner: self.owner,
            account_type: self.account_type,
            balance: self.balance,
            active: self.active,
            daily_spent: window.spent,
            daily_count: window.count,
        }
    }
}

/// Result of an applied two-account transfer
///
/// Captured inside the critical section, so the prior-usage figures and
/// the new balances are consistent with each other and with the transfer
/// itself.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedTransfer {
    /// Number of the debited account
    pub source_number: AccountNumber,

    /// Number of the credited account
    pub destination_number: AccountNumber,

    /// Source balance after the debit
    pub source_balance: Decimal,

    /// Destination balance after the credit
    pub destination_balance: Decimal,

    /// Outgoing transfers the source had made earlier today, count
    pub prior_daily_count: u32,

    /// Outgoing transfers the source had made earlier today, volume
    pub prior_daily_volume: Decimal,
}

/// Thread-safe store of all accounts
pub struct LedgerStore {
    accounts: DashMap<AccountId, Arc<Mutex<AccountState>>>,
    numbers: DashMap<AccountNumber, AccountId>,
    open_seq: AtomicU64,
    clock: Arc<dyn Clock>,
}

fn lock(state: &Mutex<AccountState>) -> MutexGuard<'_, AccountState> {
    // A panic inside the critical section cannot leave state half-applied
    // (all writes are plain assignments after the checks), so a poisoned
    // guard is still consistent.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl LedgerStore {
    /// Create an empty ledger
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        LedgerStore {
            accounts: DashMap::new(),
            numbers: DashMap::new(),
            open_seq: AtomicU64::new(0),
            clock,
        }
    }

    /// Open an account with a caller-assigned number and a seed balance
    ///
    /// # Arguments
    ///
    /// * `owner` - Owning customer
    /// * `number` - Externally visible account number; must be unused
    /// * `account_type` - Product type
    /// * `initial_deposit` - Seed balance; zero is allowed
    ///
    /// # Errors
    ///
    /// `DuplicateAccountNumber` if the number is taken,
    /// `NonPositiveAmount` if the seed balance is negative.
    pub fn open_account(
        &self,
        owner: UserId,
        number: &str,
        account_type: AccountType,
        initial_deposit: Decimal,
    ) -> Result<Account, BankError> {
        if initial_deposit < Decimal::ZERO {
            return Err(BankError::NonPositiveAmount {
                amount: initial_deposit,
            });
        }

        let id: AccountId = Uuid::new_v4();
        let today = self.clock.today();
        let state = AccountState {
            id,
            number: number.to_string(),
            owner,
            account_type,
            balance: initial_deposit,
            active: true,
            window: DayWindow::new(today),
            opened_seq: self.open_seq.fetch_add(1, Ordering::Relaxed),
        };
        let snapshot = state.snapshot(today);

        // The fresh id is unreachable until the number index points at it,
        // so insert the state first and only then claim the number. The
        // entry either inserts our id or hands back the holder's; first
        // writer wins.
        self.accounts.insert(id, Arc::new(Mutex::new(state)));
        let claimed = *self.numbers.entry(number.to_string()).or_insert(id);
        if claimed != id {
            self.accounts.remove(&id);
            return Err(BankError::DuplicateAccountNumber {
                number: number.to_string(),
            });
        }

        debug!(account = %number, owner = %owner, "account opened");
        Ok(snapshot)
    }

    /// Resolve an account number to its stable id
    ///
    /// # Errors
    ///
    /// `AccountNotFound` if no account carries the number.
    pub fn resolve(&self, number: &str) -> Result<AccountId, BankError> {
        self.numbers
            .get(number)
            .map(|entry| *entry.value())
            .ok_or_else(|| BankError::account_not_found(number))
    }

    /// Snapshot an account by number
    pub fn account(&self, number: &str) -> Result<Account, BankError> {
        let id = self.resolve(number)?;
        self.account_by_id(id)
    }

    /// Snapshot an account by id
    ///
    /// # Errors
    ///
    /// `MissingLedgerState` if the id is not held by the store.
    pub fn account_by_id(&self, id: AccountId) -> Result<Account, BankError> {
        let state = self.state(id)?;
        let guard = lock(&state);
        Ok(guard.snapshot(self.clock.today()))
    }

    /// Atomically move funds between two accounts
    ///
    /// Locks both accounts in ascending id order and performs every check
    /// and both balance writes inside the critical section. When `cap` is
    /// given, today's outgoing usage of the source is checked against it
    /// and accumulated; when it is `None` (system-issued movements such
    /// as compensating reversals) the cap is skipped and the usage window
    /// is left untouched.
    ///
    /// # Errors
    ///
    /// `SameAccount`, `AccountInactive`, `InsufficientFunds`,
    /// `DailyLimitExceeded`, `NonPositiveAmount`, or `ArithmeticOverflow`.
    /// On any error, neither balance changes.
    pub fn transfer(
        &self,
        source: AccountId,
        destination: AccountId,
        amount: Decimal,
        cap: Option<Decimal>,
    ) -> Result<AppliedTransfer, BankError> {
        if amount <= Decimal::ZERO {
            return Err(BankError::NonPositiveAmount { amount });
        }
        if source == destination {
            let state = self.state(source)?;
            let guard = lock(&state);
            return Err(BankError::SameAccount {
                number: guard.number.clone(),
            });
        }

        let source_state = self.state(source)?;
        let destination_state = self.state(destination)?;

        // Ascending id order; every two-account operation does the same.
        let (mut src, mut dst) = if source < destination {
            let src = lock(&source_state);
            let dst = lock(&destination_state);
            (src, dst)
        } else {
            let dst = lock(&destination_state);
            let src = lock(&source_state);
            (src, dst)
        };

        if !src.active {
            return Err(BankError::account_inactive(&src.number));
        }
        if !dst.active {
            return Err(BankError::account_inactive(&dst.number));
        }
        if src.balance < amount {
            return Err(BankError::insufficient_funds(
                &src.number,
                src.balance,
                amount,
            ));
        }

        let today = self.clock.today();
        src.window.roll(today);
        if let Some(cap) = cap {
            if limits::check(src.window.spent, amount, cap) == LimitCheck::Exceeded {
                return Err(BankError::daily_limit_exceeded(
                    &src.number,
                    src.window.spent,
                    amount,
                    cap,
                ));
            }
        }

        let new_source_balance = src
            .balance
            .checked_sub(amount)
            .ok_or_else(|| BankError::arithmetic_overflow("debit", &src.number))?;
        let new_destination_balance = dst
            .balance
            .checked_add(amount)
            .ok_or_else(|| BankError::arithmetic_overflow("credit", &dst.number))?;

        let prior_daily_count = src.window.count;
        let prior_daily_volume = src.window.spent;

        src.balance = new_source_balance;
        dst.balance = new_destination_balance;
        if cap.is_some() {
            src.window.spent += amount;
            src.window.count += 1;
        }

        debug!(
            source = %src.number,
            destination = %dst.number,
            amount = %amount,
            "transfer applied"
        );

        Ok(AppliedTransfer {
            source_number: src.number.clone(),
            destination_number: dst.number.clone(),
            source_balance: src.balance,
            destination_balance: dst.balance,
            prior_daily_count,
            prior_daily_volume,
        })
    }

    /// Credit an account outside the transfer path (loan disbursement)
    ///
    /// # Errors
    ///
    /// `NonPositiveAmount`, `AccountInactive`, or `ArithmeticOverflow`.
    pub fn credit(&self, id: AccountId, amount: Decimal) -> Result<Account, BankError> {
        if amount <= Decimal::ZERO {
            return Err(BankError::NonPositiveAmount { amount });
        }
        let state = self.state(id)?;
        let mut guard = lock(&state);
        if !guard.active {
            return Err(BankError::account_inactive(&guard.number));
        }
        guard.balance = guard
            .balance
            .checked_add(amount)
            .ok_or_else(|| BankError::arithmetic_overflow("credit", &guard.number))?;
        Ok(guard.snapshot(self.clock.today()))
    }

    /// Deactivate an account
    ///
    /// Deactivated accounts refuse debits and credits but keep their
    /// balance and remain queryable. Deactivating twice is a no-op.
    pub fn deactivate(&self, number: &str) -> Result<Account, BankError> {
        let id = self.resolve(number)?;
        let state = self.state(id)?;
        let mut guard = lock(&state);
        guard.active = false;
        Ok(guard.snapshot(self.clock.today()))
    }

    /// Oldest active account owned by the given customer
    ///
    /// Used as the disbursement target for approved loans.
    pub fn first_active_account(&self, owner: UserId) -> Option<AccountId> {
        let mut best: Option<(u64, AccountId)> = None;
        for entry in self.accounts.iter() {
            let guard = lock(entry.value());
            if guard.owner == owner && guard.active {
                match best {
                    Some((seq, _)) if seq <= guard.opened_seq => {}
                    _ => best = Some((guard.opened_seq, guard.id)),
                }
            }
        }
        best.map(|(_, id)| id)
    }

    /// Snapshot every account, ordered by account number
    pub fn accounts_sorted(&self) -> Vec<Account> {
        let today = self.clock.today();
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .map(|entry| lock(entry.value()).snapshot(today))
            .collect();
        accounts.sort_by(|a, b| a.number.cmp(&b.number));
        accounts
    }

    /// Number of accounts on the ledger
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether the ledger holds no accounts
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn state(&self, id: AccountId) -> Result<Arc<Mutex<AccountState>>, BankError> {
        self.accounts
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(BankError::MissingLedgerState { account: id })
    }
}
