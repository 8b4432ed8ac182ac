//! Backend registry: factory for store clients from config.

use dv_core::DvError;
use dv_core::config::{BackendKind, StoreConfig};

use crate::client::StoreClient;
use crate::memory::MemoryStore;
use crate::mongo::MongoStore;

/// Connect the backend named by `config.backend`.
///
/// A [`DvError::Connection`] here is fatal: the caller must abort startup
/// rather than run a pipeline with nowhere to write.
pub fn connect_store(config: &StoreConfig) -> Result<Box<dyn StoreClient>, DvError> {
    match config.backend {
        BackendKind::Mongo => Ok(Box::new(MongoStore::connect(&config.address)?)),
        BackendKind::Memory => Ok(Box::new(MemoryStore::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_backend_needs_no_server() {
        let mut cfg = StoreConfig::with_address("");
        cfg.backend = BackendKind::Memory;
        let client = connect_store(&cfg).unwrap();
        assert_eq!(client.name(), "memory");
        client.close();
    }
}
