//! Database builder for flexible configuration
//!
//! This module provides a builder for wiring a [`DB`] to its history backend
//! and collaborators. Anything not set falls back to a default: the system
//! clock, an empty [`MemoryDirectory`] and a [`NopEventSink`].

use crate::clock::{Clock, SystemClock};
use crate::config::{BackendKind, Config};
use crate::db::DB;
use crate::directory::{EntityDirectory, MemoryDirectory};
use crate::error::{DialError, Result};
use crate::events::{EventSink, NopEventSink};
use crate::storage::open_backend;
#[cfg(feature = "sqlite")]
use std::path::PathBuf;
use std::sync::Arc;

/// Builder for an engine and its collaborators.
pub struct DBBuilder {
    config: Config,
    clock: Option<Arc<dyn Clock>>,
    directory: Option<Arc<dyn EntityDirectory>>,
    events: Option<Arc<dyn EventSink>>,
}

impl DBBuilder {
    /// Create a new builder with default in-memory configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            clock: None,
            directory: None,
            events: None,
        }
    }

    /// Keep history in process memory.
    pub fn in_memory(mut self) -> Self {
        self.config.backend = BackendKind::Memory;
        self.config.sqlite_path = None;
        self
    }

    /// Keep history in the SQLite database at `path`.
    #[cfg(feature = "sqlite")]
    pub fn sqlite_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config = self.config.with_sqlite_path(path);
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn clock<C: Clock + 'static>(mut self, clock: Arc<C>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn directory<D: EntityDirectory + 'static>(mut self, directory: Arc<D>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn events<S: EventSink + 'static>(mut self, events: Arc<S>) -> Self {
        self.events = Some(events);
        self
    }

    /// Validate the configuration and open the history backend.
    pub fn build(self) -> Result<DB> {
        self.config.validate().map_err(DialError::Config)?;
        let backend = open_backend(&self.config)?;

        let directory = self
            .directory
            .unwrap_or_else(|| Arc::new(MemoryDirectory::new()) as Arc<dyn EntityDirectory>);
        let events = self
            .events
            .unwrap_or_else(|| Arc::new(NopEventSink) as Arc<dyn EventSink>);
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        Ok(DB::from_parts(backend, directory, events, clock, self.config))
    }
}

impl Default for DBBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DBBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DBBuilder")
            .field("config", &self.config)
            .field("custom_clock", &self.clock.is_some())
            .field("custom_directory", &self.directory.is_some())
            .field("custom_events", &self.events.is_some())
            .finish()
    }
}
