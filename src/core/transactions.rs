//! Thread-safe transaction record store
//!
//! Every accepted transfer (and every compensating reversal) is recorded
//! here once and then only ever moves forward through the status table:
//!
//! ```text
//! Created ----------> FraudCheckPending ----> Cleared
//!    |  \______________________________/----> Flagged
//!    |   (reversals skip evaluation)
//!    +-------------> Rejected
//! ```
//!
//! `Cleared`, `Flagged`, and `Rejected` are terminal. [`TransactionStore::transition`]
//! is the single choke point for status changes; an attempt to leave a
//! terminal status (or to take an edge not in the table) is refused as an
//! invariant violation, and the record keeps its status. Remediation of a
//! settled transaction happens through a new compensating record, never
//! by editing history.

use dashmap::DashMap;
use tracing::warn;

use crate::types::{BankError, Transaction, TransactionId, TransactionStatus};

/// Whether the status table contains the edge `from -> to`
fn allowed(from: TransactionStatus, to: TransactionStatus) -> bool {
    use TransactionStatus::*;
    matches!(
        (from, to),
        (Created, FraudCheckPending)
            | (Created, Rejected)
            | (Created, Cleared)
            | (FraudCheckPending, Cleared)
            | (FraudCheckPending, Flagged)
    )
}

/// Thread-safe store of transaction records
///
/// Backed by `DashMap` so lookups and transitions on different
/// transactions never contend. Records are value types; queries hand out
/// clones.
#[derive(Debug)]
pub struct TransactionStore {
    transactions: DashMap<TransactionId, Transaction>,
}

impl TransactionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            transactions: DashMap::new(),
        }
    }

    /// Record a freshly created transaction
    ///
    /// First occurrence wins; recording the same id twice leaves the
    /// original untouched.
    pub fn record(&self, transaction: Transaction) {
        self.transactions
            .entry(transaction.id)
            .or_insert(transaction);
    }

    /// Get a transaction by id
    pub fn get(&self, id: TransactionId) -> Option<Transaction> {
        self.transactions.get(&id).map(|entry| entry.value().clone())
    }

    /// Current status of a transaction
    ///
    /// # Errors
    ///
    /// `UnknownTransaction` if the id was never recorded.
    pub fn status(&self, id: TransactionId) -> Result<TransactionStatus, BankError> {
        self.transactions
            .get(&id)
            .map(|entry| entry.value().status)
            .ok_or(BankError::UnknownTransaction { transaction: id })
    }

    /// Move a transaction along one edge of the status table
    ///
    /// The check and the write happen under the record's map guard, so
    /// two racing transitions serialize and the loser gets the refusal.
    ///
    /// # Errors
    ///
    /// `UnknownTransaction` if the id was never recorded;
    /// `IllegalStatusTransition` if the edge is not in the table. The
    /// latter is an invariant violation and is logged at warn level here
    /// because some callers legitimately race (two re-evaluations of the
    /// same pending transaction).
    pub fn transition(
        &self,
        id: TransactionId,
        to: TransactionStatus,
    ) -> Result<Transaction, BankError> {
        match self.transactions.get_mut(&id) {
            Some(mut entry) => {
                let record = entry.value_mut();
                if !allowed(record.status, to) {
                    warn!(
                        transaction = %id,
                        from = %record.status,
                        to = %to,
                        "refused status transition"
                    );
                    return Err(BankError::illegal_transition(id, record.status, to));
                }
                record.status = to;
                Ok(record.clone())
            }
            None => Err(BankError::UnknownTransaction { transaction: id }),
        }
    }

    /// Ids of all transactions still awaiting a fraud verdict
    pub fn pending(&self) -> Vec<TransactionId> {
        self.transactions
            .iter()
            .filter(|entry| entry.value().status == TransactionStatus::FraudCheckPending)
            .map(|entry| *entry.key())
            .collect()
    }

    /// Number of recorded transactions
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

impl Default for TransactionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionKind;
    use chrono::Utc;
    use rstest::rstest;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn transaction() -> Transaction {
        Transaction::new(
            TransactionKind::Transfer,
            Uuid::new_v4(),
            Uuid::new_v4(),
            Decimal::new(10000, 2),
            None,
            Utc::now(),
        )
    }

    #[rstest]
    #[case::created_to_pending(
        TransactionStatus::Created,
        TransactionStatus::FraudCheckPending,
        true
    )]
    #[case::created_to_rejected(TransactionStatus::Created, TransactionStatus::Rejected, true)]
    #[case::created_to_cleared(TransactionStatus::Created, TransactionStatus::Cleared, true)]
    #[case::pending_to_cleared(
        TransactionStatus::FraudCheckPending,
        TransactionStatus::Cleared,
        true
    )]
    #[case::pending_to_flagged(
        TransactionStatus::FraudCheckPending,
        TransactionStatus::Flagged,
        true
    )]
    #[case::created_to_flagged(TransactionStatus::Created, TransactionStatus::Flagged, false)]
    #[case::pending_to_rejected(
        TransactionStatus::FraudCheckPending,
        TransactionStatus::Rejected,
        false
    )]
    #[case::cleared_to_flagged(TransactionStatus::Cleared, TransactionStatus::Flagged, false)]
    #[case::flagged_to_cleared(TransactionStatus::Flagged, TransactionStatus::Cleared, false)]
    #[case::rejected_to_pending(
        TransactionStatus::Rejected,
        TransactionStatus::FraudCheckPending,
        false
    )]
    #[case::backwards(TransactionStatus::FraudCheckPending, TransactionStatus::Created, false)]
    fn test_transition_table(
        #[case] from: TransactionStatus,
        #[case] to: TransactionStatus,
        #[case] legal: bool,
    ) {
        assert_eq!(allowed(from, to), legal);
    }

    #[test]
    fn test_record_and_transition() {
        let store = TransactionStore::new();
        let tx = transaction();
        let id = tx.id;
        store.record(tx);

        let pending = store
            .transition(id, TransactionStatus::FraudCheckPending)
            .unwrap();
        assert_eq!(pending.status, TransactionStatus::FraudCheckPending);
        assert_eq!(store.status(id).unwrap(), TransactionStatus::FraudCheckPending);

        let cleared = store.transition(id, TransactionStatus::Cleared).unwrap();
        assert_eq!(cleared.status, TransactionStatus::Cleared);
    }

    #[test]
    fn test_terminal_status_is_immutable() {
        let store = TransactionStore::new();
        let tx = transaction();
        let id = tx.id;
        store.record(tx);
        store
            .transition(id, TransactionStatus::FraudCheckPending)
            .unwrap();
        store.transition(id, TransactionStatus::Cleared).unwrap();

        let err = store
            .transition(id, TransactionStatus::Flagged)
            .unwrap_err();
        assert_eq!(
            err,
            BankError::illegal_transition(id, TransactionStatus::Cleared, TransactionStatus::Flagged)
        );
        assert_eq!(store.status(id).unwrap(), TransactionStatus::Cleared);
    }

    #[test]
    fn test_record_is_first_writer_wins() {
        let store = TransactionStore::new();
        let tx = transaction();
        let id = tx.id;
        let amount = tx.amount;
        store.record(tx.clone());

        let mut imposter = tx;
        imposter.amount = Decimal::ONE;
        store.record(imposter);

        assert_eq!(store.get(id).unwrap().amount, amount);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unknown_transaction_errors() {
        let store = TransactionStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            store.status(id),
            Err(BankError::UnknownTransaction { .. })
        ));
        assert!(matches!(
            store.transition(id, TransactionStatus::Cleared),
            Err(BankError::UnknownTransaction { .. })
        ));
    }

    #[test]
    fn test_pending_lists_only_pending() {
        let store = TransactionStore::new();
        let a = transaction();
        let b = transaction();
        let (a_id, b_id) = (a.id, b.id);
        store.record(a);
        store.record(b);
        store
            .transition(a_id, TransactionStatus::FraudCheckPending)
            .unwrap();
        store
            .transition(b_id, TransactionStatus::FraudCheckPending)
            .unwrap();
        store.transition(b_id, TransactionStatus::Cleared).unwrap();

        assert_eq!(store.pending(), vec![a_id]);
    }

    #[test]
    fn test_racing_transitions_settle_exactly_once() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(TransactionStore::new());
        let tx = transaction();
        let id = tx.id;
        store.record(tx);
        store
            .transition(id, TransactionStatus::FraudCheckPending)
            .unwrap();

        let mut handles = Vec::new();
        for target in [TransactionStatus::Cleared, TransactionStatus::Flagged] {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || store.transition(id, target).is_ok()));
        }
        let wins: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(wins.iter().filter(|w| **w).count(), 1);
        assert!(store.status(id).unwrap().is_terminal());
    }
}
