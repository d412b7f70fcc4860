//! Operation counters for the ledger engine.

use std::sync::atomic::{AtomicU64, Ordering};

use bankledger_common::ErrorKind;

/// Ledger metrics.
#[derive(Debug, Default)]
pub struct LedgerMetrics {
    /// Operations started.
    pub operations_total: AtomicU64,
    /// Operations that returned a result.
    pub operations_succeeded: AtomicU64,
    /// Balance writes committed to the store.
    pub mutations_committed: AtomicU64,
    /// Rejected: id already taken.
    pub rejected_already_exists: AtomicU64,
    /// Rejected: id unknown.
    pub rejected_not_found: AtomicU64,
    /// Rejected: bad amount, rate or id.
    pub rejected_invalid_argument: AtomicU64,
    /// Rejected: insufficient funds.
    pub rejected_failed_precondition: AtomicU64,
    /// Store failures and corrupted records.
    pub internal_errors: AtomicU64,
}

/// Point-in-time copy of [`LedgerMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub operations_total: u64,
    pub operations_succeeded: u64,
    pub mutations_committed: u64,
    pub rejected_already_exists: u64,
    pub rejected_not_found: u64,
    pub rejected_invalid_argument: u64,
    pub rejected_failed_precondition: u64,
    pub internal_errors: u64,
}

impl MetricsSnapshot {
    /// Operations that ended in an error of any kind.
    pub fn operations_failed(&self) -> u64 {
        self.rejected_already_exists
            + self.rejected_not_found
            + self.rejected_invalid_argument
            + self.rejected_failed_precondition
            + self.internal_errors
    }
}

impl LedgerMetrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment operations started.
    pub fn operation_started(&self) {
        self.operations_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful operation.
    pub fn operation_succeeded(&self) {
        self.operations_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a committed balance write.
    pub fn mutation_committed(&self) {
        self.mutations_committed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed operation by taxonomy entry.
    pub fn operation_failed(&self, kind: ErrorKind) {
        let counter = match kind {
            ErrorKind::AlreadyExists => &self.rejected_already_exists,
            ErrorKind::NotFound => &self.rejected_not_found,
            ErrorKind::InvalidArgument => &self.rejected_invalid_argument,
            ErrorKind::FailedPrecondition => &self.rejected_failed_precondition,
            ErrorKind::Internal => &self.internal_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            operations_total: self.operations_total.load(Ordering::Relaxed),
            operations_succeeded: self.operations_succeeded.load(Ordering::Relaxed),
            mutations_committed: self.mutations_committed.load(Ordering::Relaxed),
            rejected_already_exists: self.rejected_already_exists.load(Ordering::Relaxed),
            rejected_not_found: self.rejected_not_found.load(Ordering::Relaxed),
            rejected_invalid_argument: self.rejected_invalid_argument.load(Ordering::Relaxed),
            rejected_failed_precondition: self
                .rejected_failed_precondition
                .load(Ordering::Relaxed),
            internal_errors: self.internal_errors.load(Ordering::Relaxed),
        }
    }
}
