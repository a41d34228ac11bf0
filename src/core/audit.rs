//! Append-only audit trail
//!
//! [`AuditSink`] collects one entry per state-changing operation. Entries
//! are appended under a single lock, which also hands out the sequence
//! number, so observers never see a gap or a reordering: if operation A
//! completed before operation B started, A's entry has the lower `seq`.

use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::clock::Clock;
use crate::types::{AuditAction, AuditLogEntry, AuditOutcome, UserId};

/// Append-only, process-local audit trail
pub struct AuditSink {
    entries: Mutex<Vec<AuditLogEntry>>,
    clock: Arc<dyn Clock>,
}

impl AuditSink {
    /// Create an empty sink stamping entries with the given clock
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        AuditSink {
            entries: Mutex::new(Vec::new()),
            clock,
        }
    }

    /// Append one entry and return its sequence number
    ///
    /// Callers invoke this after their state change is in place (or after
    /// a business rule refused the operation); a failed mutation appends
    /// nothing.
    pub fn append(
        &self,
        actor: UserId,
        action: AuditAction,
        outcome: AuditOutcome,
        correlation: Option<Uuid>,
        details: serde_json::Value,
    ) -> u64 {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let seq = entries.len() as u64 + 1;
        entries.push(AuditLogEntry {
            seq,
            actor,
            action,
            outcome,
            correlation,
            at: self.clock.now(),
            details,
        });
        seq
    }

    /// Most recent entries, newest first
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum number of entries to return
    pub fn recent(&self, limit: usize) -> Vec<AuditLogEntry> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.iter().rev().take(limit).cloned().collect()
    }

    /// Number of entries appended so far
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Whether nothing has been appended yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
