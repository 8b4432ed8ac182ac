//! Persistence counters shared between producers and the writer.
//!
//! Sustained backend failure loses data silently from the producers' point
//! of view; these counters and the log lines built from them are how an
//! operator reconstructs what was dropped.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free pipeline counters.
#[derive(Debug, Default)]
pub struct PersistStats {
    submitted: AtomicU64,
    persisted: AtomicU64,
    attempts: AtomicU64,
    failed_attempts: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of [`PersistStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Records accepted into the queue.
    pub submitted: u64,
    /// Records acknowledged by the backend.
    pub persisted: u64,
    /// Backend write calls, including retries.
    pub attempts: u64,
    /// Backend write calls that failed.
    pub failed_attempts: u64,
    /// Records given up on after exhausting retries.
    pub dropped: u64,
}

impl PersistStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_persisted(&self) {
        self.persisted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_failed_attempt(&self) {
        self.failed_attempts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            persisted: self.persisted.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            failed_attempts: self.failed_attempts.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Submitted records not yet persisted or dropped.
    pub fn in_flight(&self) -> u64 {
        self.submitted.saturating_sub(self.persisted + self.dropped)
    }
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "submitted={} persisted={} dropped={} attempts={} failed_attempts={}",
            self.submitted, self.persisted, self.dropped, self.attempts, self.failed_attempts
        )
    }
}
