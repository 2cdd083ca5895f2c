//! Core database implementation for dialtrack.
//!
//! This module defines the `DB` handle that ties a history backend to the
//! collaborators it works with (clock, entity directory, event sink) and the
//! `Tx` unit of work every operation runs in.

use crate::clock::Clock;
use crate::compute::temporal::truncate;
use crate::config::{Config, DbStats, EntityId, UserId, ValueReport};
use crate::directory::EntityDirectory;
use crate::error::{DialError, Result};
use crate::events::EventSink;
use crate::storage::HistoryBackend;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

mod monitor;
mod recompute;
mod report;
mod tx;

pub use monitor::StatsMonitor;
pub use recompute::Recompute;
pub use tx::{CancelToken, Tx};

/// How long [`DB::stats`] waits for an open unit of work to finish.
const STATS_LOCK_TIMEOUT: Duration = Duration::from_secs(1);

/// Handle to a dialtrack engine.
///
/// Cloning is cheap; clones share the same backend and collaborators. Units
/// of work are serialised: [`DB::begin`] blocks while another [`Tx`] is open.
///
/// # Examples
///
/// ```rust
/// use dialtrack::{DBBuilder, EntityId, MemoryDirectory, TrackedEntity, UserId};
/// use std::sync::Arc;
/// use std::time::{Duration, SystemTime};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let directory = Arc::new(MemoryDirectory::new());
/// directory.insert_entity(TrackedEntity::new(EntityId(1), UserId(1), "team", SystemTime::now()));
///
/// let db = DBBuilder::new().directory(directory).build()?;
/// db.record_initial_value(EntityId(1), 0, SystemTime::now())?;
/// db.set_contribution(UserId(1), EntityId(1), 4)?;
///
/// let end = SystemTime::now() + Duration::from_secs(60);
/// let report = db.build_report(UserId(1), end - Duration::from_secs(600), end, Duration::from_secs(60))?;
/// assert_eq!(report.len(), 10);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DB {
    pub(crate) inner: Arc<DBInner>,
}

pub(crate) struct DBInner {
    pub backend: Mutex<Box<dyn HistoryBackend>>,
    pub directory: Arc<dyn EntityDirectory>,
    pub events: Arc<dyn EventSink>,
    pub clock: Arc<dyn Clock>,
    pub config: Config,
    pub closed: AtomicBool,
}

impl DB {
    pub(crate) fn from_parts(
        backend: Box<dyn HistoryBackend>,
        directory: Arc<dyn EntityDirectory>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
        config: Config,
    ) -> Self {
        Self {
            inner: Arc::new(DBInner {
                backend: Mutex::new(backend),
                directory,
                events,
                clock,
                config,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// In-memory engine with default collaborators.
    pub fn memory() -> Result<Self> {
        crate::DBBuilder::new().in_memory().build()
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn directory(&self) -> &Arc<dyn EntityDirectory> {
        &self.inner.directory
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(DialError::DatabaseClosed);
        }
        Ok(())
    }

    /// Start a unit of work with no acting user.
    ///
    /// Blocks until any other open [`Tx`] finishes. Calling it, or
    /// [`DB::close`], from a thread that still holds a `Tx` never returns.
    pub fn begin(&self) -> Result<Tx<'_>> {
        self.begin_with(None)
    }

    /// Start a unit of work on behalf of `caller`.
    pub fn begin_as(&self, caller: UserId) -> Result<Tx<'_>> {
        self.begin_with(Some(caller))
    }

    fn begin_with(&self, caller: Option<UserId>) -> Result<Tx<'_>> {
        self.ensure_open()?;
        let mut backend = self.inner.backend.lock();
        // close() may have won the race for the lock
        self.ensure_open()?;
        let now = truncate(self.inner.clock.now(), Duration::from_secs(1))?;
        backend.begin()?;
        Ok(Tx::new(&self.inner, backend, caller, now))
    }

    /// Recompute an entity's aggregate in its own unit of work.
    pub fn recompute_aggregate(&self, entity: EntityId) -> Result<Recompute> {
        let mut tx = self.begin()?;
        let outcome = tx.recompute_aggregate(entity)?;
        tx.commit()?;
        Ok(outcome)
    }

    /// Record the first snapshot of a newly created entity.
    pub fn record_initial_value(
        &self,
        entity: EntityId,
        value: i64,
        timestamp: SystemTime,
    ) -> Result<()> {
        let mut tx = self.begin()?;
        tx.record_initial_value(entity, value, timestamp)?;
        tx.commit()
    }

    /// Change `caller`'s contribution to `entity` and recompute the aggregate.
    pub fn set_contribution(&self, caller: UserId, entity: EntityId, value: i64) -> Result<Recompute> {
        let mut tx = self.begin_as(caller)?;
        let outcome = tx.set_contribution(entity, value)?;
        tx.commit()?;
        Ok(outcome)
    }

    /// Report over every entity visible to `caller`.
    pub fn build_report(
        &self,
        caller: UserId,
        start: SystemTime,
        end: SystemTime,
        interval: Duration,
    ) -> Result<ValueReport> {
        let tx = self.begin_as(caller)?;
        let report = tx.build_report(start, end, interval)?;
        tx.commit()?;
        Ok(report)
    }

    /// Raw stored values of an entity, oldest first.
    pub fn history_of(&self, entity: EntityId) -> Result<Vec<i64>> {
        let tx = self.begin()?;
        let history = tx.history_of(entity)?;
        tx.commit()?;
        Ok(history)
    }

    /// Sample row counts from the backend and the directory.
    ///
    /// Fails with `Storage` if a unit of work keeps the backend busy for
    /// longer than a second.
    pub fn stats(&self) -> Result<DbStats> {
        self.ensure_open()?;
        let storage = self
            .inner
            .backend
            .try_lock_for(STATS_LOCK_TIMEOUT)
            .ok_or_else(|| DialError::Storage("history backend busy".to_string()))?
            .stats()?;
        let counts = self.inner.directory.counts()?;
        Ok(DbStats {
            entity_count: counts.entities,
            contribution_count: counts.contributions,
            snapshot_count: storage.snapshot_count,
            history_entity_count: storage.entity_count,
            operations_count: storage.operations_count,
            sampled_at: Some(self.inner.clock.now()),
        })
    }

    /// Spawn a background thread sampling [`DB::stats`] every
    /// `stats_interval_secs`.
    pub fn start_monitor(&self) -> Result<StatsMonitor> {
        self.ensure_open()?;
        StatsMonitor::spawn(self.clone(), self.inner.config.stats_interval())
    }

    /// Sync and close the backend. Every later call on this handle or its
    /// clones fails with `DatabaseClosed`. Waits for an open [`Tx`] to finish.
    pub fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Err(DialError::DatabaseClosed);
        }
        let mut backend = self.inner.backend.lock();
        backend.sync()?;
        backend.close()?;
        log::debug!("closed {} history backend", backend.name());
        Ok(())
    }
}

impl std::fmt::Debug for DB {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DB")
            .field("config", &self.inner.config)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
