//! Scripted backend for exercising retry and shutdown paths.
//!
//! Records are keyed by pair. Each pair can be told to fail a fixed number of
//! times before succeeding, or forever. Every call and every successful write
//! is logged in order; writes after `close` fail. Handles share the store's
//! state, so `close` can count how many are still alive.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use dv_core::{DvError, SnapshotRecord};

use crate::client::{Collection, CollectionHandle, StoreClient};

#[derive(Default)]
struct Script {
    failures: HashMap<String, u32>,
    calls: Vec<String>,
    persisted: Vec<String>,
    closed: bool,
    handles_open_at_close: Option<usize>,
}

#[derive(Clone, Default)]
pub(crate) struct ScriptedStore {
    script: Arc<Mutex<Script>>,
}

impl ScriptedStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fail the first `n` writes of `pair`.
    pub(crate) fn fail_times(self, pair: &str, n: u32) -> Self {
        self.lock().failures.insert(pair.to_string(), n);
        self
    }

    /// Fail every write of `pair`.
    pub(crate) fn fail_always(self, pair: &str) -> Self {
        self.fail_times(pair, u32::MAX)
    }

    /// Pairs in the order writes were attempted.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Pairs in the order writes succeeded.
    pub(crate) fn persisted(&self) -> Vec<String> {
        self.lock().persisted.clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Collection handles still alive when `close` ran, not counting the
    /// test's own clone and the client being closed.
    pub(crate) fn handles_open_at_close(&self) -> Option<usize> {
        self.lock().handles_open_at_close
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }
}

impl StoreClient for ScriptedStore {
    fn name(&self) -> &str {
        "scripted"
    }

    fn collection(&self, database: &str, collection: &str) -> CollectionHandle {
        CollectionHandle::new(database, collection, self.clone())
    }

    fn close(self: Box<Self>) {
        let clones = Arc::strong_count(&self.script);
        let mut script = self.lock();
        script.closed = true;
        script.handles_open_at_close = Some(clones.saturating_sub(2));
    }
}

impl Collection for ScriptedStore {
    fn insert(&self, record: &SnapshotRecord) -> Result<(), DvError> {
        let mut script = self.lock();
        let pair = record.pair().to_string();
        script.calls.push(pair.clone());

        if script.closed {
            return Err(DvError::Write { namespace: "scripted".into(), reason: "client closed".into() });
        }
        if let Some(remaining) = script.failures.get_mut(&pair)
            && *remaining > 0
        {
            if *remaining != u32::MAX {
                *remaining -= 1;
            }
            return Err(DvError::Write { namespace: "scripted".into(), reason: format!("injected failure for {pair}") });
        }
        script.persisted.push(pair);
        Ok(())
    }
}
