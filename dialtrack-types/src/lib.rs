//! # dialtrack-types
//!
//! Core data types for the dialtrack engine.
//!
//! - **Identity**: `EntityId`, `UserId`
//! - **Entities**: `TrackedEntity`, `Contribution`
//! - **History**: `ValueSnapshot`, `ValueReportRecord`, `ValueReport`
//! - **Notifications**: `Event`
//! - **Statistics**: `DbStats`
//!
//! All types are serializable with Serde.
//!
//! ## Examples
//!
//! ```rust
//! use dialtrack_types::entity::EntityId;
//! use dialtrack_types::series::ValueSnapshot;
//! use std::time::SystemTime;
//!
//! let snapshot = ValueSnapshot::new(EntityId(7), SystemTime::now(), 42);
//! assert_eq!(snapshot.value, 42);
//! ```

pub mod entity;
pub mod event;
pub mod series;
pub mod stats;
