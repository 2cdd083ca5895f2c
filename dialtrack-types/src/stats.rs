use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Database statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbStats {
    /// Number of tracked entities known to the directory
    pub entity_count: u64,
    /// Number of contributions across all entities
    pub contribution_count: u64,
    /// Number of stored history snapshots
    pub snapshot_count: u64,
    /// Number of entities with at least one snapshot
    pub history_entity_count: u64,
    /// Total number of backend write operations performed
    pub operations_count: u64,
    /// When these numbers were sampled
    pub sampled_at: Option<SystemTime>,
}

impl DbStats {
    pub fn new() -> Self {
        Self::default()
    }
}
