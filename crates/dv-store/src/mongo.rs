//! MongoDB backend using the driver's synchronous API.
//!
//! The persistence writer is a plain OS thread, so the blocking driver fits
//! it directly: one `insert_one` per attempt, acknowledged before returning.

use dv_core::{DvError, SnapshotRecord};
use mongodb::bson::{Document, doc};
use mongodb::sync::Client;
use tracing::info;

use crate::client::{Collection, CollectionHandle, StoreClient};
use crate::codec::encode_snapshot;

/// How long the driver may look for a usable server before an operation
/// fails. Bounds both the startup ping and every later write attempt.
const SERVER_SELECTION_TIMEOUT_MS: u64 = 5_000;

/// A connected MongoDB deployment.
pub struct MongoStore {
    client: Client,
    address: String,
}

impl MongoStore {
    /// Connect to `address` (`host:port` or a full `mongodb://` URI) and
    /// verify the server answers a `ping`.
    ///
    /// The driver connects lazily, so the ping is what makes an unreachable
    /// backend fail here instead of on the first write.
    pub fn connect(address: &str) -> Result<Self, DvError> {
        let uri = connection_uri(address);
        let client = Client::with_uri_str(&uri)
            .map_err(|e| DvError::Connection(format!("{address}: {e}")))?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .run()
            .map_err(|e| DvError::Connection(format!("{address}: {e}")))?;

        info!("[mongo] connected to {address}");
        Ok(Self { client, address: address.to_string() })
    }
}

impl StoreClient for MongoStore {
    fn name(&self) -> &str {
        "mongo"
    }

    fn collection(&self, database: &str, collection: &str) -> CollectionHandle {
        let coll = self.client.database(database).collection::<Document>(collection);
        CollectionHandle::new(
            database,
            collection,
            MongoCollection { coll, namespace: format!("{database}.{collection}") },
        )
    }

    /// Shut the driver down: the connection pool and its monitor threads are
    /// released even while collection handles cloned from this client are
    /// still alive.
    fn close(self: Box<Self>) {
        let Self { client, address } = *self;
        client.shutdown().run();
        info!("[mongo] connection to {address} closed");
    }
}

struct MongoCollection {
    coll: mongodb::sync::Collection<Document>,
    namespace: String,
}

impl Collection for MongoCollection {
    fn insert(&self, record: &SnapshotRecord) -> Result<(), DvError> {
        self.coll
            .insert_one(encode_snapshot(record))
            .run()
            .map(|_| ())
            .map_err(|e| DvError::Write { namespace: self.namespace.clone(), reason: e.to_string() })
    }
}

/// Build the driver URI from a configured address.
fn connection_uri(address: &str) -> String {
    if address.starts_with("mongodb://") || address.starts_with("mongodb+srv://") {
        address.to_string()
    } else {
        format!("mongodb://{address}/?serverSelectionTimeoutMS={SERVER_SELECTION_TIMEOUT_MS}")
    }
}
