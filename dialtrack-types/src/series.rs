use crate::entity::EntityId;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// One stored history row: the aggregate value of an entity from `timestamp`
/// onwards, until the next snapshot.
///
/// Timestamps written by the engine are truncated to whole minutes, so an
/// entity has at most one snapshot per minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSnapshot {
    pub entity_id: EntityId,
    pub timestamp: SystemTime,
    pub value: i64,
}

impl ValueSnapshot {
    pub fn new(entity_id: EntityId, timestamp: SystemTime, value: i64) -> Self {
        Self {
            entity_id,
            timestamp,
            value,
        }
    }
}

/// Averaged value for one report slot starting at `timestamp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueReportRecord {
    pub timestamp: SystemTime,
    pub value: i64,
}

/// Interval-aggregated report over a set of entities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueReport {
    pub records: Vec<ValueReportRecord>,
}

impl ValueReport {
    pub fn new(records: Vec<ValueReportRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Slot values in order, without timestamps.
    pub fn values(&self) -> Vec<i64> {
        self.records.iter().map(|r| r.value).collect()
    }
}

impl IntoIterator for ValueReport {
    type Item = ValueReportRecord;
    type IntoIter = std::vec::IntoIter<ValueReportRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_report_values() {
        let report = ValueReport::new(vec![
            ValueReportRecord {
                timestamp: UNIX_EPOCH,
                value: 3,
            },
            ValueReportRecord {
                timestamp: UNIX_EPOCH + Duration::from_secs(60),
                value: 5,
            },
        ]);

        assert_eq!(report.len(), 2);
        assert_eq!(report.values(), vec![3, 5]);
    }
}
