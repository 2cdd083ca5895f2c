use super::{HistoryBackend, StorageStats, StoredValue};
use crate::config::EntityId;
use crate::error::{DialError, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

const SCHEMA_VERSION: i64 = 1;
const IN_MEMORY: &str = ":memory:";

/// History backend over a single SQLite table.
pub struct SqliteBackend {
    conn: Option<Connection>,
    in_transaction: bool,
    operations: u64,
}

impl SqliteBackend {
    /// Open or create the database at `path`. `:memory:` opens a private
    /// in-memory database.
    pub fn open<P: AsRef<Path>>(path: P, wal: bool) -> Result<Self> {
        let path = path.as_ref();
        let file_backed = path != Path::new(IN_MEMORY);
        if file_backed {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        if file_backed && wal {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;",
            )?;
        }
        initialize_schema(&conn)?;
        log::debug!("opened sqlite history at {}", path.display());

        Ok(Self {
            conn: Some(conn),
            in_transaction: false,
            operations: 0,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(IN_MEMORY, false)
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(DialError::DatabaseClosed)
    }
}

fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    let mut version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version < 1 {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS entity_values (
                entity_id INTEGER NOT NULL,
                timestamp INTEGER NOT NULL,
                value     INTEGER NOT NULL,
                PRIMARY KEY (entity_id, timestamp)
            );",
        )?;
        version = 1;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version > SCHEMA_VERSION {
        log::warn!(
            "sqlite history schema version {} is newer than supported version {}",
            version,
            SCHEMA_VERSION
        );
    }

    Ok(())
}

fn entity_key(entity: EntityId) -> Result<i64> {
    i64::try_from(entity.0)
        .map_err(|_| DialError::Storage(format!("entity id {} does not fit sqlite INTEGER", entity)))
}

impl HistoryBackend for SqliteBackend {
    fn upsert(&mut self, entity: EntityId, timestamp: i64, value: i64) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO entity_values (entity_id, timestamp, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(entity_id, timestamp) DO UPDATE SET value = excluded.value",
            params![entity_key(entity)?, timestamp, value],
        )?;
        self.operations += 1;
        Ok(())
    }

    fn value_at_or_before(&self, entity: EntityId, at: i64) -> Result<Option<i64>> {
        let value = self
            .conn()?
            .query_row(
                "SELECT value FROM entity_values
                 WHERE entity_id = ?1 AND timestamp <= ?2
                 ORDER BY timestamp DESC LIMIT 1",
                params![entity_key(entity)?, at],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn values_in_range(&self, entity: EntityId, start: i64, end: i64) -> Result<Vec<StoredValue>> {
        let mut stmt = self.conn()?.prepare_cached(
            "SELECT timestamp, value FROM entity_values
             WHERE entity_id = ?1 AND timestamp >= ?2 AND timestamp < ?3
             ORDER BY timestamp ASC",
        )?;
        let rows = stmt.query_map(params![entity_key(entity)?, start, end], |row| {
            Ok(StoredValue::new(row.get(0)?, row.get(1)?))
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn values(&self, entity: EntityId) -> Result<Vec<StoredValue>> {
        let mut stmt = self.conn()?.prepare_cached(
            "SELECT timestamp, value FROM entity_values
             WHERE entity_id = ?1
             ORDER BY timestamp ASC",
        )?;
        let rows = stmt.query_map(params![entity_key(entity)?], |row| {
            Ok(StoredValue::new(row.get(0)?, row.get(1)?))
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn remove(&mut self, entity: EntityId, timestamp: i64) -> Result<Option<i64>> {
        let key = entity_key(entity)?;
        let conn = self.conn()?;
        let previous = conn
            .query_row(
                "SELECT value FROM entity_values WHERE entity_id = ?1 AND timestamp = ?2",
                params![key, timestamp],
                |row| row.get(0),
            )
            .optional()?;
        if previous.is_some() {
            conn.execute(
                "DELETE FROM entity_values WHERE entity_id = ?1 AND timestamp = ?2",
                params![key, timestamp],
            )?;
            self.operations += 1;
        }
        Ok(previous)
    }

    fn delete_entity(&mut self, entity: EntityId) -> Result<usize> {
        let removed = self.conn()?.execute(
            "DELETE FROM entity_values WHERE entity_id = ?1",
            params![entity_key(entity)?],
        )?;
        self.operations += 1;
        Ok(removed)
    }

    fn begin(&mut self) -> Result<()> {
        if self.in_transaction {
            return Err(DialError::Storage(
                "a transaction is already in progress".to_string(),
            ));
        }
        self.conn()?.execute_batch("BEGIN IMMEDIATE")?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(DialError::Storage("no transaction in progress".to_string()));
        }
        self.conn()?.execute_batch("COMMIT")?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(DialError::Storage("no transaction in progress".to_string()));
        }
        self.in_transaction = false;
        self.conn()?.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        if self.conn.is_some() && !self.in_transaction {
            // Only meaningful in WAL mode; a no-op otherwise.
            self.conn()?
                .query_row("PRAGMA wal_checkpoint(PASSIVE)", [], |_| Ok(()))?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            if self.in_transaction {
                conn.execute_batch("ROLLBACK")?;
                self.in_transaction = false;
            }
            conn.close().map_err(|(_, e)| DialError::from(e))?;
        }
        Ok(())
    }

    fn stats(&self) -> Result<StorageStats> {
        let (snapshots, entities): (i64, i64) = self.conn()?.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT entity_id) FROM entity_values",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(StorageStats {
            snapshot_count: snapshots.max(0) as u64,
            entity_count: entities.max(0) as u64,
            operations_count: self.operations,
        })
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
