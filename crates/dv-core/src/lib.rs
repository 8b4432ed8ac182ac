//! # dv-core
//!
//! Core crate for the depthvault order book persistence system, providing:
//!
//! - **Types** (`types`): snapshot records and price levels
//! - **Configuration** (`config`): JSON config load/save/validation
//! - **Error types** (`error`): domain-specific `DvError` via thiserror
//! - **CPU affinity** (`cpu_affinity`): thread-to-core pinning for the writer
//! - **Latency** (`latency`): histogram-based write latency statistics
//! - **Time utilities** (`time_util`): wall-clock timestamps
//! - **Logging** (`logging`): tracing-based structured logging

pub mod config;
pub mod cpu_affinity;
pub mod error;
pub mod latency;
pub mod logging;
pub mod time_util;
pub mod types;

// Re-export types at crate root for convenience.
pub use error::DvError;
pub use types::*;
