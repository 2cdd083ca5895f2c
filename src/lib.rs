//! Embedded time-series engine for dial values: aggregate recomputation,
//! minute-resolution history, gap-filling reconstruction and interval reports.
//!
//! ```rust
//! use dialtrack::{DBBuilder, EntityId, MemoryDirectory, TrackedEntity, UserId};
//! use std::sync::Arc;
//! use std::time::{Duration, SystemTime};
//!
//! let directory = Arc::new(MemoryDirectory::new());
//! directory.insert_entity(TrackedEntity::new(EntityId(1), UserId(1), "ops", SystemTime::now()));
//! directory.add_member(EntityId(1), UserId(2), 3)?;
//!
//! let db = DBBuilder::new().directory(directory).build()?;
//! db.record_initial_value(EntityId(1), 0, SystemTime::now() - Duration::from_secs(600))?;
//! db.recompute_aggregate(EntityId(1))?;
//! assert_eq!(db.history_of(EntityId(1))?, vec![0, 2]);
//!
//! let end = SystemTime::now();
//! let report = db.build_report(UserId(2), end - Duration::from_secs(3600), end, Duration::from_secs(300))?;
//! assert_eq!(report.len(), 12);
//! # Ok::<(), dialtrack::DialError>(())
//! ```

pub mod builder;
pub mod clock;
pub mod compute;
pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod events;
pub mod storage;

pub use builder::DBBuilder;
pub use db::{CancelToken, DB, Recompute, StatsMonitor, Tx};
pub use error::{DialError, ErrorKind, Result, ResultExt};

pub type Dialtrack = DB;

pub use clock::{Clock, ManualClock, SystemClock};
pub use compute::temporal::Window;
pub use config::{
    BackendKind, Config, Contribution, DbStats, EntityId, Event, TrackedEntity, UserId,
    ValueReport, ValueReportRecord, ValueSnapshot,
};
pub use directory::{DirectoryCounts, EntityDirectory, MemoryDirectory};
pub use events::{EventSink, MemoryEventSink, NopEventSink};

pub use storage::{HistoryBackend, MemoryBackend, StorageStats, StoredValue};

#[cfg(feature = "sqlite")]
pub use storage::SqliteBackend;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{DBBuilder, DialError, Dialtrack, Result};

    pub use crate::{Config, EntityId, UserId, ValueReport, Window};

    pub use crate::{EntityDirectory, EventSink, MemoryDirectory};

    pub use std::time::{Duration, SystemTime};
}
