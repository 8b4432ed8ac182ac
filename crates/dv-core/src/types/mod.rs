//! Core data types shared by producers and the persistence pipeline.

pub mod snapshot;

pub use snapshot::*;
