//! Transaction-log sink.
//!
//! A fire-and-forget audit hook called once per successful apply. Failures
//! inside the sink are the sink's own problem; the persistence engine never
//! fails a commit over logging.

use std::fmt::Debug;

use chrono::NaiveDateTime;

/// One recorded audit entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionLogEntry {
    /// The object's identity string.
    pub object_id: String,
    /// The mapped class name.
    pub class_name: String,
    /// What the apply did.
    pub action: TransactionAction,
    /// The committing user.
    pub user_name: String,
    /// When the entry was recorded.
    pub logged_at: NaiveDateTime,
}

/// The kind of change an apply performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionAction {
    Created,
    Updated,
    Deleted,
}

/// Audit sink consumed by the persistence engine.
pub trait TransactionLog: Debug {
    /// Record one successful apply.
    fn record(&mut self, entry: TransactionLogEntry);
}

/// Test/diagnostic sink keeping entries in memory.
#[derive(Debug, Default)]
pub struct InMemoryTransactionLog {
    entries: Vec<TransactionLogEntry>,
}

impl InMemoryTransactionLog {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries recorded so far, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[TransactionLogEntry] {
        &self.entries
    }
}

impl TransactionLog for InMemoryTransactionLog {
    fn record(&mut self, entry: TransactionLogEntry) {
        tracing::debug!(
            object_id = %entry.object_id,
            action = ?entry.action,
            user = %entry.user_name,
            "transaction logged"
        );
        self.entries.push(entry);
    }
}
