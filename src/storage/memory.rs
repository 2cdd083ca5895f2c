use super::{HistoryBackend, StorageStats, StoredValue};
use crate::config::EntityId;
use crate::error::{DialError, Result};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// Reversal of one write, recorded while a transaction is open.
#[derive(Debug)]
enum Undo {
    /// Restore the previous value of a key, or remove the key if it was new.
    Key {
        entity: EntityId,
        timestamp: i64,
        previous: Option<i64>,
    },
    /// Put back a deleted history.
    Series {
        entity: EntityId,
        series: BTreeMap<i64, i64>,
    },
}

/// In-memory history backend: one ordered map per entity.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    series: FxHashMap<EntityId, BTreeMap<i64, i64>>,
    undo: Option<Vec<Undo>>,
    operations: u64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, undo: Undo) {
        if let Some(log) = self.undo.as_mut() {
            log.push(undo);
        }
    }

    fn collect(range: impl Iterator<Item = (i64, i64)>) -> Vec<StoredValue> {
        range.map(|(ts, value)| StoredValue::new(ts, value)).collect()
    }
}

impl HistoryBackend for MemoryBackend {
    fn upsert(&mut self, entity: EntityId, timestamp: i64, value: i64) -> Result<()> {
        let previous = self
            .series
            .entry(entity)
            .or_default()
            .insert(timestamp, value);
        self.record(Undo::Key {
            entity,
            timestamp,
            previous,
        });
        self.operations += 1;
        Ok(())
    }

    fn value_at_or_before(&self, entity: EntityId, at: i64) -> Result<Option<i64>> {
        Ok(self
            .series
            .get(&entity)
            .and_then(|s| s.range(..=at).next_back())
            .map(|(_, &value)| value))
    }

    fn values_in_range(&self, entity: EntityId, start: i64, end: i64) -> Result<Vec<StoredValue>> {
        if start >= end {
            return Ok(Vec::new());
        }
        Ok(self
            .series
            .get(&entity)
            .map(|s| Self::collect(s.range(start..end).map(|(&t, &v)| (t, v))))
            .unwrap_or_default())
    }

    fn values(&self, entity: EntityId) -> Result<Vec<StoredValue>> {
        Ok(self
            .series
            .get(&entity)
            .map(|s| Self::collect(s.iter().map(|(&t, &v)| (t, v))))
            .unwrap_or_default())
    }

    fn remove(&mut self, entity: EntityId, timestamp: i64) -> Result<Option<i64>> {
        let Some(series) = self.series.get_mut(&entity) else {
            return Ok(None);
        };
        let previous = series.remove(&timestamp);
        if series.is_empty() {
            self.series.remove(&entity);
        }
        if previous.is_some() {
            self.record(Undo::Key {
                entity,
                timestamp,
                previous,
            });
            self.operations += 1;
        }
        Ok(previous)
    }

    fn delete_entity(&mut self, entity: EntityId) -> Result<usize> {
        let Some(series) = self.series.remove(&entity) else {
            return Ok(0);
        };
        let removed = series.len();
        self.record(Undo::Series { entity, series });
        self.operations += 1;
        Ok(removed)
    }

    fn begin(&mut self) -> Result<()> {
        if self.undo.is_some() {
            return Err(DialError::Storage(
                "a transaction is already in progress".to_string(),
            ));
        }
        self.undo = Some(Vec::new());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.undo
            .take()
            .map(|_| ())
            .ok_or_else(|| DialError::Storage("no transaction in progress".to_string()))
    }

    fn rollback(&mut self) -> Result<()> {
        let log = self
            .undo
            .take()
            .ok_or_else(|| DialError::Storage("no transaction in progress".to_string()))?;

        for undo in log.into_iter().rev() {
            match undo {
                Undo::Key {
                    entity,
                    timestamp,
                    previous,
                } => {
                    let series = self.series.entry(entity).or_default();
                    match previous {
                        Some(value) => {
                            series.insert(timestamp, value);
                        }
                        None => {
                            series.remove(&timestamp);
                        }
                    }
                    if series.is_empty() {
                        self.series.remove(&entity);
                    }
                }
                Undo::Series { entity, series } => {
                    self.series.insert(entity, series);
                }
            }
        }
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.series.clear();
        self.undo = None;
        Ok(())
    }

    fn stats(&self) -> Result<StorageStats> {
        Ok(StorageStats {
            snapshot_count: self.series.values().map(|s| s.len() as u64).sum(),
            entity_count: self.series.values().filter(|s| !s.is_empty()).count() as u64,
            operations_count: self.operations,
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
