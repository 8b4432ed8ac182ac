//! Pipeline lifecycle: startup wiring, the producer-facing sink, and the
//! ordered shutdown.
//!
//! # Architecture
//!
//! ```text
//! Pipeline::start()    ──► collection handle + write queue + writer thread
//! Pipeline::sink()     ──► SnapshotSink (clone per producer)
//! Pipeline::shutdown() ──► close queue ──► join writer ──► close store client
//! ```

use std::sync::Arc;

use anyhow::Result;
use dv_core::config::{AppConfig, StoreConfig};
use dv_core::latency::LatencyStats;
use dv_core::{DvError, PriceLevel, SnapshotRecord};
use tracing::{error, info, warn};

use crate::client::{CollectionHandle, StoreClient};
use crate::consumer::{ConsumerConfig, ConsumerHandle, ConsumerState, spawn_consumer};
use crate::queue::{WriteQueue, WriteRequest, write_queue};
use crate::retry::RetryPolicy;
use crate::stats::{PersistStats, StatsSnapshot};

// ---------------------------------------------------------------------------
// PipelineContext: explicit startup context
// ---------------------------------------------------------------------------

/// Everything the pipeline needs from process configuration, built once at
/// startup and passed in by reference.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    /// Instance name, used as the log label.
    pub name: String,
    pub store: StoreConfig,
}

impl PipelineContext {
    pub fn from_config(config: &AppConfig) -> Self {
        Self { name: config.name.clone(), store: config.store.clone() }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_config(&self.store)
    }
}

// ---------------------------------------------------------------------------
// SnapshotSink: what producers hold
// ---------------------------------------------------------------------------

/// Producer-facing submission handle.
///
/// Submission is fire-and-forget: `Ok` means the record was queued, not that
/// it was stored. Blocks while the queue is full.
#[derive(Clone)]
pub struct SnapshotSink {
    queue: WriteQueue,
    target: CollectionHandle,
    stats: Arc<PersistStats>,
}

impl SnapshotSink {
    /// Build a record from its parts and submit it.
    pub fn submit(
        &self,
        exchange_name: &str,
        pair: &str,
        observed_at_us: u64,
        asks: Vec<PriceLevel>,
        bids: Vec<PriceLevel>,
    ) -> Result<(), DvError> {
        let record = SnapshotRecord::new(exchange_name, pair, observed_at_us, asks, bids)?;
        self.submit_record(record)
    }

    /// Submit a prebuilt record.
    pub fn submit_record(&self, record: SnapshotRecord) -> Result<(), DvError> {
        let request = WriteRequest { target: self.target.clone(), record };
        match self.queue.submit(request) {
            Ok(()) => {
                self.stats.record_submitted();
                Ok(())
            }
            Err(e) => {
                error!("[{}] submit after shutdown began: {e}", self.target.namespace());
                Err(e)
            }
        }
    }

}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Final accounting returned by [`Pipeline::shutdown`].
#[derive(Debug, Clone, Copy)]
pub struct PersistReport {
    pub stats: StatsSnapshot,
    pub latency: Option<LatencyStats>,
}

/// The running persistence pipeline.
pub struct Pipeline {
    name: String,
    client: Box<dyn StoreClient>,
    target: CollectionHandle,
    queue: WriteQueue,
    consumer: ConsumerHandle,
    stats: Arc<PersistStats>,
}

impl Pipeline {
    /// Wire the queue and start the writer against `client`.
    pub fn start(ctx: &PipelineContext, client: Box<dyn StoreClient>) -> Result<Self> {
        if ctx.store.queue_capacity == 0 {
            return Err(DvError::Config("store.queue_capacity must be at least 1".into()).into());
        }
        let target = client.collection(&ctx.store.database, &ctx.store.collection);
        let (queue, rx) = write_queue(ctx.store.queue_capacity);
        let stats = Arc::new(PersistStats::new());

        let consumer = spawn_consumer(
            ConsumerConfig {
                label: ctx.name.clone(),
                policy: ctx.retry_policy(),
                stats_interval: ctx.store.stats_interval,
                cpu_core: ctx.store.cpu_affinity,
            },
            rx,
            stats.clone(),
        )?;

        info!(
            "[{}] pipeline started, backend={} target={} capacity={}",
            ctx.name,
            client.name(),
            target.namespace(),
            queue.capacity()
        );

        Ok(Self { name: ctx.name.clone(), client, target, queue, consumer, stats })
    }

    /// A submission handle for one producer.
    pub fn sink(&self) -> SnapshotSink {
        SnapshotSink { queue: self.queue.clone(), target: self.target.clone(), stats: self.stats.clone() }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn consumer_state(&self) -> ConsumerState {
        self.consumer.state()
    }

    /// Flush and tear down.
    ///
    /// Callers must have stopped every producer first. The queue is closed,
    /// the writer is joined once it has drained every buffered request, and
    /// only then is the store client closed, so no buffered write can fail
    /// against a closed connection.
    pub fn shutdown(self) -> Result<PersistReport> {
        let Self { name, client, target, queue, consumer, stats } = self;

        let backlog = queue.len();
        let in_flight = stats.snapshot().in_flight();
        if let Err(e) = queue.close() {
            warn!("[{name}] write queue already closed: {e}");
        }
        info!("[{name}] queue closed with {backlog} buffered request(s), {in_flight} in flight, waiting for writer");

        let joined = consumer.join();
        // The writer is gone either way; the connection is ours to release.
        drop(target);
        client.close();
        let latency = joined?;

        let stats = stats.snapshot();
        info!("[{name}] pipeline shut down, {stats}");
        Ok(PersistReport { stats, latency })
    }
}
