use super::in_memory::InMemoryStore;
use crate::domain::ports::{IntentStoreBox, OrderStoreBox};
use crate::error::Result;
use std::path::Path;
use std::sync::Arc;

/// The two store handles, backed by the same ledger.
#[derive(Clone)]
pub struct Stores {
    pub intents: IntentStoreBox,
    pub orders: OrderStoreBox,
}

impl Stores {
    pub fn in_memory() -> Self {
        let store = InMemoryStore::new();
        Self {
            intents: Arc::new(store.clone()),
            orders: Arc::new(store),
        }
    }
}

/// Opens the ledger: RocksDB at `db_path` when given, in-memory otherwise.
#[cfg(feature = "storage-rocksdb")]
pub fn open_stores(db_path: Option<&Path>) -> Result<Stores> {
    use super::rocksdb::RocksDBStore;

    match db_path {
        Some(path) => {
            let store = RocksDBStore::open(path)?;
            tracing::info!(path = %path.display(), "Using RocksDB ledger");
            Ok(Stores {
                intents: Arc::new(store.clone()),
                orders: Arc::new(store),
            })
        }
        None => Ok(Stores::in_memory()),
    }
}

/// Opens the ledger: RocksDB at `db_path` when given, in-memory otherwise.
#[cfg(not(feature = "storage-rocksdb"))]
pub fn open_stores(db_path: Option<&Path>) -> Result<Stores> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Stores::in_memory())
}
