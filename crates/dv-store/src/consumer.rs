//! The persistence writer: a single thread draining the write queue.
//!
//! ```text
//!   Running ──(queue closed observed)──► Draining ──(queue empty)──► Stopped
//! ```
//!
//! Each request gets [`write_with_retry`]; an exhausted request is logged,
//! counted and dropped, and the loop moves on. Nothing is re-enqueued and
//! nothing is reported back to producers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::JoinHandle;

use anyhow::{Result, anyhow};
use dv_core::latency::{LatencyCollector, LatencyStats};
use tracing::{error, info};

use crate::queue::QueueReceiver;
use crate::retry::{RetryPolicy, write_with_retry};
use crate::stats::PersistStats;

/// Lifecycle of the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConsumerState {
    /// Draining and writing; the queue is open.
    Running = 0,
    /// The queue is closed; finishing what is buffered.
    Draining = 1,
    /// The queue is closed and empty; the thread has exited or is exiting.
    Stopped = 2,
}

impl ConsumerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Running,
            1 => Self::Draining,
            _ => Self::Stopped,
        }
    }
}

impl std::fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Draining => write!(f, "draining"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Shared, atomically updated [`ConsumerState`].
#[derive(Debug, Clone)]
pub struct StateCell(Arc<AtomicU8>);

impl StateCell {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(ConsumerState::Running as u8)))
    }

    pub fn get(&self) -> ConsumerState {
        ConsumerState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: ConsumerState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Writer settings.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Log prefix and thread name stem.
    pub label: String,
    pub policy: RetryPolicy,
    /// Log a summary every N persisted records; 0 disables periodic summaries.
    pub stats_interval: u64,
    /// CPU core to pin the writer thread to.
    pub cpu_core: Option<i32>,
}

/// Handle to the running writer thread.
pub struct ConsumerHandle {
    state: StateCell,
    thread: JoinHandle<Option<LatencyStats>>,
}

impl ConsumerHandle {
    pub fn state(&self) -> ConsumerState {
        self.state.get()
    }

    /// Block until the writer reaches [`ConsumerState::Stopped`] and its
    /// thread has exited. Returns the final write-latency summary.
    pub fn join(self) -> Result<Option<LatencyStats>> {
        self.thread
            .join()
            .map_err(|_| anyhow!("persistence writer thread panicked"))
    }
}

/// Start the writer on a dedicated, named OS thread.
pub fn spawn_consumer(
    config: ConsumerConfig,
    rx: QueueReceiver,
    stats: Arc<PersistStats>,
) -> Result<ConsumerHandle> {
    let state = StateCell::new();
    let thread_state = state.clone();
    let thread = std::thread::Builder::new()
        .name(format!("{}-writer", config.label))
        .spawn(move || {
            dv_core::cpu_affinity::maybe_bind(config.cpu_core);
            run_consumer_loop(&config, rx, &stats, &thread_state)
        })?;
    Ok(ConsumerHandle { state, thread })
}

/// Run the writer loop on the calling thread until the queue is closed and
/// drained.
pub fn run_consumer_loop(
    config: &ConsumerConfig,
    mut rx: QueueReceiver,
    stats: &PersistStats,
    state: &StateCell,
) -> Option<LatencyStats> {
    let label = &config.label;
    let mut latency = LatencyCollector::new();

    info!(
        "[{label}] writer started (max_attempts={}, retry_delay={:?})",
        config.policy.max_attempts(),
        config.policy.delay
    );

    while let Some(request) = rx.recv() {
        if rx.is_closing() && state.get() == ConsumerState::Running {
            state.set(ConsumerState::Draining);
            info!("[{label}] queue closed, draining {} buffered request(s)", rx.len() + 1);
        }

        match write_with_retry(&request.target, &request.record, &config.policy, stats, &mut latency) {
            Ok(_) => {
                stats.record_persisted();
                let persisted = stats.snapshot().persisted;
                if config.stats_interval > 0 && persisted % config.stats_interval == 0 {
                    log_summary(label, stats, &latency);
                }
            }
            Err(e) => {
                stats.record_dropped();
                error!("[{label}] dropping {}: {e}", request.record);
            }
        }
    }

    if state.get() == ConsumerState::Running {
        state.set(ConsumerState::Draining);
    }
    log_summary(label, stats, &latency);
    state.set(ConsumerState::Stopped);
    info!("[{label}] writer stopped");

    latency.stats()
}

fn log_summary(label: &str, stats: &PersistStats, latency: &LatencyCollector) {
    match latency.stats() {
        Some(lat) => info!("[{label}] {} | {lat}", stats.snapshot()),
        None => info!("[{label}] {}", stats.snapshot()),
    }
}
