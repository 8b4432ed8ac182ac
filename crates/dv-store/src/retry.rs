//! Fixed-delay bounded retry for backend writes.
//!
//! One initial attempt, then up to `max_retries` more, each preceded by the
//! same `delay`. No backoff. The sleep blocks the writer thread, so every
//! request queued behind a failing one waits out its retries too.

use std::time::{Duration, Instant};

use dv_core::config::StoreConfig;
use dv_core::latency::LatencyCollector;
use dv_core::{DvError, SnapshotRecord};
use tracing::{debug, warn};

use crate::client::CollectionHandle;
use crate::stats::PersistStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first failure.
    pub max_retries: u32,
    /// Sleep before each retry.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, delay: Duration::from_secs(1) }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &StoreConfig) -> Self {
        Self { max_retries: config.max_retries, delay: config.retry_delay() }
    }

    /// Upper bound on backend calls for one record.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Write `record` to `target`, retrying per `policy`.
///
/// Returns the number of attempts used on success, or
/// [`DvError::ExhaustedRetries`] once every attempt has failed. Errors that
/// are not retryable end the sequence immediately.
pub fn write_with_retry(
    target: &CollectionHandle,
    record: &SnapshotRecord,
    policy: &RetryPolicy,
    stats: &PersistStats,
    latency: &mut LatencyCollector,
) -> Result<u32, DvError> {
    let ns = target.namespace();
    let max_attempts = policy.max_attempts();
    let mut attempt = 1;

    loop {
        let started = Instant::now();
        stats.record_attempt();

        let err = match target.insert(record) {
            Ok(()) => {
                latency.record(started.elapsed());
                if attempt > 1 {
                    debug!("[{ns}] {record} persisted on attempt {attempt}");
                }
                return Ok(attempt);
            }
            Err(e) => e,
        };

        stats.record_failed_attempt();
        warn!("[{ns}] write attempt {attempt}/{max_attempts} failed for {record}: {err}");

        if attempt >= max_attempts || !err.is_retryable() {
            return Err(DvError::ExhaustedRetries {
                namespace: ns.to_string(),
                attempts: attempt,
                last_error: err.to_string(),
            });
        }

        std::thread::sleep(policy.delay);
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::StoreClient;
    use crate::testing::ScriptedStore;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy { max_retries: 3, delay: Duration::from_millis(1) }
    }

    fn rec(pair: &str) -> SnapshotRecord {
        SnapshotRecord::new("binance", pair, 0, vec![], vec![]).unwrap()
    }

    fn run(store: &ScriptedStore, pair: &str) -> Result<u32, DvError> {
        let target = store.collection("OrderBooks", "orderbooks");
        let stats = PersistStats::new();
        let mut latency = LatencyCollector::new();
        write_with_retry(&target, &rec(pair), &fast_policy(), &stats, &mut latency)
    }

    #[test]
    fn default_policy_is_three_retries_one_second() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_retries, 3);
        assert_eq!(p.max_attempts(), 4);
        assert_eq!(p.delay, Duration::from_secs(1));
    }

    #[test]
    fn immediate_success_is_one_attempt() {
        let store = ScriptedStore::new();
        assert_eq!(run(&store, "A").unwrap(), 1);
        assert_eq!(store.calls(), ["A"]);
        assert_eq!(store.persisted(), ["A"]);
    }

    #[test]
    fn k_failures_then_success_is_k_plus_one_attempts() {
        for k in 0..=3 {
            let store = ScriptedStore::new().fail_times("B", k);
            assert_eq!(run(&store, "B").unwrap(), k + 1);
            assert_eq!(store.calls().len(), k as usize + 1);
            assert_eq!(store.persisted(), ["B"]);
        }
    }

    #[test]
    fn four_failures_exhaust() {
        let store = ScriptedStore::new().fail_always("C");
        match run(&store, "C") {
            Err(DvError::ExhaustedRetries { namespace, attempts, .. }) => {
                assert_eq!(namespace, "OrderBooks.orderbooks");
                assert_eq!(attempts, 4);
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(store.calls().len(), 4);
        assert!(store.persisted().is_empty());
    }

    #[test]
    fn counters_track_attempts() {
        let store = ScriptedStore::new().fail_times("B", 2);
        let target = store.collection("OrderBooks", "orderbooks");
        let stats = PersistStats::new();
        let mut latency = LatencyCollector::new();
        write_with_retry(&target, &rec("B"), &fast_policy(), &stats, &mut latency).unwrap();

        let snap = stats.snapshot();
        assert_eq!(snap.attempts, 3);
        assert_eq!(snap.failed_attempts, 2);
        assert_eq!(latency.count(), 1);
    }

    #[test]
    fn zero_retries_means_single_attempt() {
        let store = ScriptedStore::new().fail_always("C");
        let target = store.collection("OrderBooks", "orderbooks");
        let policy = RetryPolicy { max_retries: 0, delay: Duration::from_millis(1) };
        let err = write_with_retry(&target, &rec("C"), &policy, &PersistStats::new(), &mut LatencyCollector::new())
            .unwrap_err();
        assert!(matches!(err, DvError::ExhaustedRetries { attempts: 1, .. }));
    }

    #[test]
    fn retry_sleeps_between_attempts() {
        let store = ScriptedStore::new().fail_times("B", 2);
        let target = store.collection("OrderBooks", "orderbooks");
        let policy = RetryPolicy { max_retries: 3, delay: Duration::from_millis(20) };
        let started = Instant::now();
        write_with_retry(&target, &rec("B"), &policy, &PersistStats::new(), &mut LatencyCollector::new()).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(40));
    }
}
