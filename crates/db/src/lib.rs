//! # Arbor DB
//!
//! Implementations of the [`Storage`] contract:
//!
//! - [`MemDb`]: in-memory maps, for tests and throwaway servers
//! - [`RedbStore`]: a single redb file, one transaction per call
//!
//! Backends are picked by name through a [`StorageRegistry`].

pub mod codec;
pub mod memdb;
pub mod redb_store;

pub use memdb::MemDb;
pub use redb_store::RedbStore;

use arbor_config::Config;
use arbor_core::{Registry, Result, Storage};
use std::sync::Arc;

/// Constructs a storage backend from configuration
pub type StorageFactory = fn(&Config) -> Result<Arc<dyn Storage>>;

/// Registry of storage backends
pub type StorageRegistry = Registry<StorageFactory>;

/// Registry holding `memory` and `redb`
pub fn default_registry() -> StorageRegistry {
    let mut registry = Registry::new("storage");
    for (name, factory) in [
        ("memory", new_memdb as StorageFactory),
        ("redb", new_redb as StorageFactory),
    ] {
        // Names are distinct; registration into a fresh registry cannot collide
        let _ = registry.register(name, factory);
    }
    registry
}

fn new_memdb(_config: &Config) -> Result<Arc<dyn Storage>> {
    Ok(Arc::new(MemDb::new()))
}

fn new_redb(config: &Config) -> Result<Arc<dyn Storage>> {
    Ok(Arc::new(RedbStore::open(config.db_path()?)?))
}

/// Build the storage backend named in `config`
pub fn open(registry: &StorageRegistry, config: &Config) -> Result<Arc<dyn Storage>> {
    let factory = registry.get(&config.db.backend)?;
    tracing::debug!(backend = %config.db.backend, "Opening storage");
    factory(config)
}
