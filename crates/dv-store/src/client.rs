//! Store client abstraction.
//!
//! A [`StoreClient`] owns the backend connection and hands out
//! [`CollectionHandle`]s. Handles are cheap to clone and travel inside every
//! write request; the single persistence writer is the only caller of
//! [`CollectionHandle::insert`], so backends need no write-side locking of
//! their own beyond what their driver already does.

use std::sync::Arc;

use dv_core::{DvError, SnapshotRecord};

/// One addressable collection on a backend.
pub trait Collection: Send + Sync {
    /// Perform exactly one write attempt for `record`.
    fn insert(&self, record: &SnapshotRecord) -> Result<(), DvError>;
}

/// Trait implemented by every storage backend.
pub trait StoreClient: Send + Sync {
    /// Human-readable backend name.
    fn name(&self) -> &str;

    /// Address a logical collection. Never performs I/O.
    fn collection(&self, database: &str, collection: &str) -> CollectionHandle;

    /// Release the connection.
    ///
    /// Must only be called once the persistence writer has stopped; see
    /// [`crate::pipeline::Pipeline::shutdown`].
    fn close(self: Box<Self>);
}

/// Clonable handle to a [`Collection`], tagged with its `database.collection`
/// namespace for logging.
#[derive(Clone)]
pub struct CollectionHandle {
    namespace: Arc<str>,
    inner: Arc<dyn Collection>,
}

impl CollectionHandle {
    pub fn new(database: &str, collection: &str, inner: impl Collection + 'static) -> Self {
        Self {
            namespace: format!("{database}.{collection}").into(),
            inner: Arc::new(inner),
        }
    }

    /// `database.collection`.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[inline]
    pub fn insert(&self, record: &SnapshotRecord) -> Result<(), DvError> {
        self.inner.insert(record)
    }
}

impl std::fmt::Debug for CollectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CollectionHandle").field(&self.namespace).finish()
    }
}
