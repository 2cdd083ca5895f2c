//! Compute layer for history reconstruction and aggregation.
//!
//! This module separates the numeric algorithms from storage concerns:
//! - `temporal`: time truncation and interval-aligned report windows
//! - `slots`: sparse-to-dense reconstruction of a value history
//! - `aggregate`: the single rounding rule used for every mean
//!
//! Nothing in here performs I/O; callers feed it rows read from a backend.

pub mod aggregate;
pub mod slots;
pub mod temporal;
