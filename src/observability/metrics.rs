//! Store metrics
//!
//! - Counters only
//! - Monotonic increase
//! - Thread-safe, lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters of one store instance
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Successful mutations
    mutations_applied: AtomicU64,
    /// Mutations refused with a structural error
    mutations_rejected: AtomicU64,
    /// Individual field checks performed
    fields_validated: AtomicU64,
    /// Snapshots published
    snapshots_published: AtomicU64,
    /// Listener invocations
    notifications_sent: AtomicU64,
    /// Ingestion items reported as unreadable
    invalid_items: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment successful mutations
    pub fn increment_mutations_applied(&self) {
        self.mutations_applied.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment rejected mutations
    pub fn increment_mutations_rejected(&self) {
        self.mutations_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Add field checks
    pub fn add_fields_validated(&self, count: u64) {
        self.fields_validated.fetch_add(count, Ordering::Relaxed);
    }

    /// Increment published snapshots
    pub fn increment_snapshots_published(&self) {
        self.snapshots_published.fetch_add(1, Ordering::Relaxed);
    }

    /// Add listener invocations
    pub fn add_notifications(&self, count: u64) {
        self.notifications_sent.fetch_add(count, Ordering::Relaxed);
    }

    /// Add unreadable ingestion items
    pub fn add_invalid_items(&self, count: u64) {
        self.invalid_items.fetch_add(count, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            mutations_applied: self.mutations_applied.load(Ordering::Relaxed),
            mutations_rejected: self.mutations_rejected.load(Ordering::Relaxed),
            fields_validated: self.fields_validated.load(Ordering::Relaxed),
            snapshots_published: self.snapshots_published.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            invalid_items: self.invalid_items.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub mutations_applied: u64,
    pub mutations_rejected: u64,
    pub fields_validated: u64,
    pub snapshots_published: u64,
    pub notifications_sent: u64,
    pub invalid_items: u64,
}
