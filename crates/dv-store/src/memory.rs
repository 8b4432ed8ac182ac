//! In-process backend.
//!
//! Keeps every inserted record per namespace. Used for `--store memory`
//! deployments where no database is available, and as the backend in tests.
//! Clones share the same storage, so a caller can keep one clone to inspect
//! what was written after the client itself has been closed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ahash::AHashMap;
use dv_core::{DvError, SnapshotRecord};
use tracing::info;

use crate::client::{Collection, CollectionHandle, StoreClient};

type Documents = AHashMap<String, Vec<SnapshotRecord>>;

#[derive(Clone, Default)]
pub struct MemoryStore {
    docs: Arc<Mutex<Documents>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records written to `namespace` (`database.collection`), in write order.
    pub fn documents(&self, namespace: &str) -> Vec<SnapshotRecord> {
        self.lock().get(namespace).cloned().unwrap_or_default()
    }

    /// Total records across all namespaces.
    pub fn total(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }

    fn lock(&self) -> MutexGuard<'_, Documents> {
        self.docs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StoreClient for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn collection(&self, database: &str, collection: &str) -> CollectionHandle {
        let inner = MemoryCollection {
            store: self.clone(),
            namespace: format!("{database}.{collection}"),
        };
        CollectionHandle::new(database, collection, inner)
    }

    fn close(self: Box<Self>) {
        info!("[memory] store closed ({} documents)", self.total());
    }
}

struct MemoryCollection {
    store: MemoryStore,
    namespace: String,
}

impl Collection for MemoryCollection {
    fn insert(&self, record: &SnapshotRecord) -> Result<(), DvError> {
        self.store
            .lock()
            .entry(self.namespace.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }
}
