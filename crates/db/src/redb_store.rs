//! File-backed storage using redb
//!
//! Entities and groups live in two tables keyed by ID / name, with
//! bincode-encoded records as values. Every contract call runs in its own
//! transaction.

use crate::codec::{decode, encode};
use arbor_core::{Entity, Error, Group, Result, Storage};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadTransaction, TableDefinition, TableError,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

type Table = TableDefinition<'static, &'static str, &'static [u8]>;

const ENTITIES: Table = TableDefinition::new("entities");
const GROUPS: Table = TableDefinition::new("groups");

/// Storage in a single redb database file
///
/// `RedbStore` is `Send + Sync`; redb serializes concurrent writers.
pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

// Static assertions to ensure thread safety
const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}

    let _ = assert_send::<RedbStore>;
    let _ = assert_sync::<RedbStore>;
};

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").field("path", &self.path).finish()
    }
}

fn storage_err(what: &str, e: impl std::fmt::Display) -> Error {
    Error::Storage(format!("{what}: {e}"))
}

impl RedbStore {
    /// Create or open the database at `path`, creating parent directories
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path).map_err(|e| storage_err("Failed to create database", e))?;

        // Create both tables up front so readers never see a missing table
        let write_txn = db
            .begin_write()
            .map_err(|e| storage_err("Failed to begin write transaction", e))?;
        write_txn
            .open_table(ENTITIES)
            .map_err(|e| storage_err("Failed to open table", e))?;
        write_txn
            .open_table(GROUPS)
            .map_err(|e| storage_err("Failed to open table", e))?;
        write_txn
            .commit()
            .map_err(|e| storage_err("Failed to commit transaction", e))?;

        tracing::debug!(path = %path.display(), "Opened redb store");
        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    /// Database file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_txn(&self) -> Result<ReadTransaction> {
        self.db
            .begin_read()
            .map_err(|e| storage_err("Failed to begin read transaction", e))
    }

    fn keys(&self, table: Table) -> Result<Vec<String>> {
        let read_txn = self.read_txn()?;
        let table = match read_txn.open_table(table) {
            Ok(t) => t,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(storage_err("Failed to open table", e)),
        };

        let iter = table
            .iter()
            .map_err(|e| storage_err("Failed to iterate table", e))?;

        let mut keys = Vec::new();
        for item in iter {
            let (key, _value) = item.map_err(|e| storage_err("Failed to read item", e))?;
            keys.push(key.value().to_string());
        }
        Ok(keys)
    }

    fn get<T: DeserializeOwned>(&self, table: Table, key: &str) -> Result<Option<T>> {
        let read_txn = self.read_txn()?;
        let table = match read_txn.open_table(table) {
            Ok(t) => t,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(storage_err("Failed to open table", e)),
        };

        match table.get(key) {
            Ok(Some(value)) => decode(value.value()).map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err("Failed to get value", e)),
        }
    }

    fn find<T, P>(&self, table: Table, mut pred: P) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        P: FnMut(&T) -> bool,
    {
        let read_txn = self.read_txn()?;
        let table = match read_txn.open_table(table) {
            Ok(t) => t,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(storage_err("Failed to open table", e)),
        };

        let iter = table
            .iter()
            .map_err(|e| storage_err("Failed to iterate table", e))?;

        for item in iter {
            let (_key, value) = item.map_err(|e| storage_err("Failed to read item", e))?;
            let record: T = decode(value.value())?;
            if pred(&record) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    fn put<T: Serialize>(&self, table: Table, key: &str, record: &T) -> Result<()> {
        let bytes = encode(record)?;
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| storage_err("Failed to begin write transaction", e))?;
        {
            let mut table = write_txn
                .open_table(table)
                .map_err(|e| storage_err("Failed to open table", e))?;
            table
                .insert(key, bytes.as_slice())
                .map_err(|e| storage_err("Failed to insert value", e))?;
        }
        write_txn
            .commit()
            .map_err(|e| storage_err("Failed to commit transaction", e))
    }

    /// Remove `key`; returns whether it was present
    fn remove(&self, table: Table, key: &str) -> Result<bool> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| storage_err("Failed to begin write transaction", e))?;
        let existed = {
            let mut table = write_txn
                .open_table(table)
                .map_err(|e| storage_err("Failed to open table", e))?;
            table
                .remove(key)
                .map_err(|e| storage_err("Failed to remove value", e))?
                .is_some()
        };
        write_txn
            .commit()
            .map_err(|e| storage_err("Failed to commit transaction", e))?;
        Ok(existed)
    }
}

impl Storage for RedbStore {
    fn discover_entity_ids(&self) -> Result<Vec<String>> {
        self.keys(ENTITIES)
    }

    fn load_entity(&self, id: &str) -> Result<Entity> {
        self.get(ENTITIES, id)?
            .ok_or_else(|| Error::UnknownEntity(id.to_string()))
    }

    fn load_entity_number(&self, number: i32) -> Result<Entity> {
        self.find(ENTITIES, |e: &Entity| e.number == number)?
            .ok_or_else(|| Error::UnknownEntity(format!("number {number}")))
    }

    fn save_entity(&self, entity: &Entity) -> Result<()> {
        self.put(ENTITIES, &entity.id, entity)
    }

    fn delete_entity(&self, id: &str) -> Result<()> {
        if self.remove(ENTITIES, id)? {
            Ok(())
        } else {
            Err(Error::UnknownEntity(id.to_string()))
        }
    }

    fn discover_group_names(&self) -> Result<Vec<String>> {
        self.keys(GROUPS)
    }

    fn load_group(&self, name: &str) -> Result<Group> {
        self.get(GROUPS, name)?
            .ok_or_else(|| Error::UnknownGroup(name.to_string()))
    }

    fn load_group_number(&self, number: i32) -> Result<Group> {
        self.find(GROUPS, |g: &Group| g.number == number)?
            .ok_or_else(|| Error::UnknownGroup(format!("number {number}")))
    }

    fn save_group(&self, group: &Group) -> Result<()> {
        self.put(GROUPS, &group.name, group)
    }

    fn delete_group(&self, name: &str) -> Result<()> {
        if self.remove(GROUPS, name)? {
            Ok(())
        } else {
            Err(Error::UnknownGroup(name.to_string()))
        }
    }
}
