//! # dv-store
//!
//! Asynchronous persistence pipeline for order book snapshots.
//!
//! ## Architecture
//!
//! Producers hold a [`pipeline::SnapshotSink`] and submit records into a
//! bounded [`queue`]. A single writer thread ([`consumer`]) drains it in FIFO
//! order and writes each record through a [`client::StoreClient`] backend,
//! retrying failed writes per [`retry`]. [`pipeline::Pipeline`] owns the
//! startup wiring and the ordered shutdown.
//!
//! ## Modules
//!
//! - [`client`]: store client / collection traits
//! - [`mongo`] / [`memory`]: backends
//! - [`codec`]: snapshot → BSON document encoder
//! - [`queue`]: bounded write queue
//! - [`consumer`]: the writer loop and its state machine
//! - [`retry`]: fixed-delay bounded retry
//! - [`stats`]: persistence counters
//! - [`pipeline`]: lifecycle owner and producer sink
//! - [`registry`]: backend factory from config
//! - [`replay`]: JSON-lines file replay producer

pub mod client;
pub mod codec;
pub mod consumer;
pub mod memory;
pub mod mongo;
pub mod pipeline;
pub mod queue;
pub mod registry;
pub mod replay;
pub mod retry;
pub mod stats;

#[cfg(test)]
mod testing;

pub use client::{Collection, CollectionHandle, StoreClient};
pub use pipeline::{PersistReport, Pipeline, PipelineContext, SnapshotSink};
