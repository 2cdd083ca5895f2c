//! Transactional unit of work.

use super::DBInner;
use crate::compute::temporal::{from_unix_secs, to_unix_secs, to_unix_secs_ceil, truncate_to_minute};
use crate::config::{Contribution, EntityId, Event, UserId, ValueSnapshot};
use crate::error::{DialError, ErrorKind, Result, ResultExt};
use crate::storage::{HistoryBackend, StoredValue};
use parking_lot::MutexGuard;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime};

/// Cancellation signal shared between a caller and running operations.
///
/// Clones observe the same flag. A deadline, when set, cancels with
/// `DeadlineExceeded` once it has passed.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// `Err(Cancelled)` or `Err(DeadlineExceeded)` once the signal fired.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(DialError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(DialError::DeadlineExceeded);
        }
        Ok(())
    }
}

/// One unit of work against a [`DB`](super::DB).
///
/// A `Tx` holds exclusive access to the history backend for its whole life
/// and carries a fixed `now`, truncated to whole seconds. Entity values and
/// contributions written through it are staged and only reach the directory
/// on [`commit`](Tx::commit), together with the events they produced.
/// Dropping a `Tx` without committing rolls everything back.
///
/// The backend lock is not reentrant. A thread holding a `Tx` must finish it
/// before calling [`DB::begin`](super::DB::begin) or
/// [`DB::close`](super::DB::close) again, or it blocks forever.
pub struct Tx<'a> {
    pub(super) db: &'a DBInner,
    backend: MutexGuard<'a, Box<dyn HistoryBackend>>,
    caller: Option<UserId>,
    now: SystemTime,
    cancel: Option<CancelToken>,
    pub(super) staged_values: FxHashMap<EntityId, i64>,
    pub(super) staged_contributions: FxHashMap<(EntityId, UserId), i64>,
    pub(super) staged_events: Vec<(Vec<UserId>, Event)>,
    /// Minute key of each staged aggregate snapshot and the value it replaced.
    staged_snapshots: FxHashMap<EntityId, (i64, Option<i64>)>,
    finished: bool,
}

impl<'a> Tx<'a> {
    pub(super) fn new(
        db: &'a DBInner,
        backend: MutexGuard<'a, Box<dyn HistoryBackend>>,
        caller: Option<UserId>,
        now: SystemTime,
    ) -> Self {
        Self {
            db,
            backend,
            caller,
            now,
            cancel: None,
            staged_values: FxHashMap::default(),
            staged_contributions: FxHashMap::default(),
            staged_events: Vec::new(),
            staged_snapshots: FxHashMap::default(),
            finished: false,
        }
    }

    /// Observe `token` in every operation of this unit of work.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn now(&self) -> SystemTime {
        self.now
    }

    pub fn caller(&self) -> Option<UserId> {
        self.caller
    }

    pub(super) fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(token) => token.check(),
            None => Ok(()),
        }
    }

    /// Store `value` for the minute containing `timestamp`, replacing any
    /// value already stored for that minute.
    pub fn upsert_snapshot(&mut self, entity: EntityId, timestamp: SystemTime, value: i64) -> Result<()> {
        self.check_cancelled()?;
        let minute = to_unix_secs(truncate_to_minute(timestamp)?);
        self.backend
            .upsert(entity, minute, value)
            .with_context(|| format!("upsert snapshot for entity {}", entity))
    }

    /// Write the aggregate snapshot of `entity`, remembering what it replaced
    /// so commit can take it back if the entity is gone by then.
    pub(super) fn stage_snapshot(&mut self, entity: EntityId, timestamp: SystemTime, value: i64) -> Result<()> {
        let minute = to_unix_secs(truncate_to_minute(timestamp)?);
        if !self.staged_snapshots.contains_key(&entity) {
            let previous = self
                .backend
                .values_in_range(entity, minute, minute + 1)
                .with_context(|| format!("read snapshot of entity {}", entity))?
                .first()
                .map(|row| row.value);
            self.staged_snapshots.insert(entity, (minute, previous));
        }
        self.upsert_snapshot(entity, timestamp, value)
    }

    /// Value in force at `timestamp`, or 0 when the entity has no earlier
    /// snapshot.
    pub fn value_at_or_before(&self, entity: EntityId, timestamp: SystemTime) -> Result<i64> {
        self.check_cancelled()?;
        let value = self
            .backend
            .value_at_or_before(entity, to_unix_secs(timestamp))
            .with_context(|| format!("read value of entity {}", entity))?;
        Ok(value.unwrap_or(0))
    }

    /// Snapshots with `start <= timestamp < end`, oldest first.
    pub fn values_in_range(
        &self,
        entity: EntityId,
        start: SystemTime,
        end: SystemTime,
    ) -> Result<Vec<ValueSnapshot>> {
        self.check_cancelled()?;
        let rows = self
            .backend
            .values_in_range(entity, to_unix_secs_ceil(start), to_unix_secs_ceil(end))
            .with_context(|| format!("read history range of entity {}", entity))?;
        to_snapshots(entity, rows)
    }

    /// Every stored value of an entity, oldest first.
    pub fn history_of(&self, entity: EntityId) -> Result<Vec<i64>> {
        Ok(self.snapshots_of(entity)?.into_iter().map(|s| s.value).collect())
    }

    pub fn snapshots_of(&self, entity: EntityId) -> Result<Vec<ValueSnapshot>> {
        self.check_cancelled()?;
        let rows = self
            .backend
            .values(entity)
            .with_context(|| format!("read history of entity {}", entity))?;
        to_snapshots(entity, rows)
    }

    /// Delete the whole history of an entity. Call when the entity itself is
    /// deleted.
    pub fn purge_history(&mut self, entity: EntityId) -> Result<usize> {
        self.check_cancelled()?;
        let removed = self
            .backend
            .delete_entity(entity)
            .with_context(|| format!("purge history of entity {}", entity))?;
        log::debug!("purged {} snapshots of entity {}", removed, entity);
        Ok(removed)
    }

    /// Stored aggregate of an entity as seen by this unit of work.
    pub(super) fn entity_value(&self, entity: EntityId) -> Result<Option<i64>> {
        let stored = self.db.directory.entity_value(entity)?;
        Ok(stored.map(|v| self.staged_values.get(&entity).copied().unwrap_or(v)))
    }

    /// Current contributions of an entity as seen by this unit of work.
    pub(super) fn contributions(&self, entity: EntityId) -> Result<Vec<Contribution>> {
        let mut contributions = self.db.directory.contributions(entity)?;
        for c in contributions.iter_mut() {
            if let Some(&staged) = self.staged_contributions.get(&(entity, c.user_id)) {
                c.value = staged;
            }
        }
        Ok(contributions)
    }

    /// Apply staged directory writes, make history durable, then publish
    /// events.
    ///
    /// An entity deleted from the directory while this unit of work was open
    /// is skipped: its aggregate snapshot is taken back and its events are
    /// dropped. Any other directory failure aborts before the backend commits
    /// and the history writes roll back.
    pub fn commit(mut self) -> Result<()> {
        let vanished = self.apply_directory_writes()?;
        for &entity in &vanished {
            self.unstage_snapshot(entity)?;
        }

        self.backend.commit()?;
        self.finished = true;

        for (recipients, event) in std::mem::take(&mut self.staged_events) {
            if vanished.contains(&event.entity_id()) {
                continue;
            }
            for recipient in recipients {
                self.db.events.publish(recipient, &event);
            }
        }
        Ok(())
    }

    fn apply_directory_writes(&mut self) -> Result<FxHashSet<EntityId>> {
        let directory = &self.db.directory;
        let mut vanished = FxHashSet::default();

        for ((entity, user), value) in std::mem::take(&mut self.staged_contributions) {
            match directory.set_contribution(entity, user, value) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    log::debug!("contribution of user {} to entity {} vanished before commit", user, entity);
                    vanished.insert(entity);
                }
                Err(e) => {
                    return Err(DialError::Context {
                        context: format!("apply contribution of user {} to entity {}", user, entity),
                        source: Box::new(e),
                    });
                }
            }
        }

        for (entity, value) in std::mem::take(&mut self.staged_values) {
            if vanished.contains(&entity) {
                continue;
            }
            match directory.set_entity_value(entity, value, self.now) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    log::debug!("entity {} vanished before commit", entity);
                    vanished.insert(entity);
                }
                Err(e) => {
                    return Err(DialError::Context {
                        context: format!("apply value of entity {}", entity),
                        source: Box::new(e),
                    });
                }
            }
        }
        Ok(vanished)
    }

    fn unstage_snapshot(&mut self, entity: EntityId) -> Result<()> {
        let Some((minute, previous)) = self.staged_snapshots.remove(&entity) else {
            return Ok(());
        };
        let restored = match previous {
            Some(value) => self.backend.upsert(entity, minute, value),
            None => self.backend.remove(entity, minute).map(|_| ()),
        };
        restored.with_context(|| format!("take back snapshot of entity {}", entity))
    }

    /// Discard every write of this unit of work.
    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.backend.rollback()
    }
}

impl Drop for Tx<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.backend.rollback() {
            log::warn!("failed to roll back unfinished unit of work: {}", e);
        }
    }
}

fn to_snapshots(entity: EntityId, rows: Vec<StoredValue>) -> Result<Vec<ValueSnapshot>> {
    rows.into_iter()
        .map(|row| -> Result<ValueSnapshot> {
            Ok(ValueSnapshot::new(
                entity,
                from_unix_secs(row.timestamp)?,
                row.value,
            ))
        })
        .collect()
}
