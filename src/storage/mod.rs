//! History storage for dialtrack
//!
//! A [`HistoryBackend`] holds the value snapshots of every entity, keyed by
//! `(entity_id, timestamp)` where the timestamp is whole Unix seconds already
//! truncated to snapshot resolution by the caller. One backend exists per
//! storage engine and the engine is picked from [`Config`].

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::MemoryBackend;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;

use crate::config::{BackendKind, Config, EntityId};
use crate::error::{DialError, Result};

/// One stored row of an entity's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredValue {
    /// Unix seconds.
    pub timestamp: i64,
    pub value: i64,
}

impl StoredValue {
    pub fn new(timestamp: i64, value: i64) -> Self {
        Self { timestamp, value }
    }
}

/// Storage of per-entity value snapshots.
///
/// Writes made between [`begin`](HistoryBackend::begin) and
/// [`commit`](HistoryBackend::commit) are undone by
/// [`rollback`](HistoryBackend::rollback). Outside a transaction every write
/// is applied immediately.
pub trait HistoryBackend: Send {
    /// Insert a snapshot or overwrite the value stored under the same key.
    fn upsert(&mut self, entity: EntityId, timestamp: i64, value: i64) -> Result<()>;

    /// Value of the latest snapshot with `timestamp <= at`.
    fn value_at_or_before(&self, entity: EntityId, at: i64) -> Result<Option<i64>>;

    /// Snapshots with `start <= timestamp < end`, ascending.
    fn values_in_range(&self, entity: EntityId, start: i64, end: i64) -> Result<Vec<StoredValue>>;

    /// Every snapshot of an entity, ascending.
    fn values(&self, entity: EntityId) -> Result<Vec<StoredValue>>;

    /// Remove one snapshot, returning the value it held.
    fn remove(&mut self, entity: EntityId, timestamp: i64) -> Result<Option<i64>>;

    /// Remove an entity's whole history, returning the number of rows removed.
    fn delete_entity(&mut self, entity: EntityId) -> Result<usize>;

    fn begin(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    /// Flush pending writes to durable storage.
    fn sync(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;

    fn stats(&self) -> Result<StorageStats>;

    /// Short engine name for logs.
    fn name(&self) -> &'static str;
}

/// Storage backend statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Stored snapshots across all entities
    pub snapshot_count: u64,
    /// Entities with at least one snapshot
    pub entity_count: u64,
    /// Writes performed since open
    pub operations_count: u64,
}

/// Open the backend selected by `config`.
pub fn open_backend(config: &Config) -> Result<Box<dyn HistoryBackend>> {
    let backend: Box<dyn HistoryBackend> = match config.backend {
        BackendKind::Memory => Box::new(MemoryBackend::new()),
        #[cfg(feature = "sqlite")]
        BackendKind::Sqlite => {
            let path = config.sqlite_path.as_ref().ok_or_else(|| {
                DialError::Config("the sqlite backend requires sqlite_path".to_string())
            })?;
            Box::new(SqliteBackend::open(path, config.sqlite_wal)?)
        }
        #[cfg(not(feature = "sqlite"))]
        BackendKind::Sqlite => {
            return Err(DialError::Config(
                "dialtrack was built without the sqlite feature".to_string(),
            ));
        }
    };
    log::debug!("opened {} history backend", backend.name());
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_memory_backend() {
        let backend = open_backend(&Config::default()).unwrap();
        assert_eq!(backend.name(), "memory");
        assert_eq!(backend.stats().unwrap(), StorageStats::default());
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_open_sqlite_backend() {
        let config = Config::default().with_sqlite_path(":memory:");
        let backend = open_backend(&config).unwrap();
        assert_eq!(backend.name(), "sqlite");
    }

    #[test]
    fn test_sqlite_without_path_is_rejected() {
        let config = Config::default().with_backend(BackendKind::Sqlite);
        assert!(open_backend(&config).is_err());
    }
}
