//! Aggregate recomputation.
//!
//! An entity's aggregate is the rounded mean of its members' contributions.
//! Recomputing is a no-op unless the value actually changes; a change updates
//! the entity, appends a snapshot at the unit of work's `now` and notifies
//! every member.

use super::Tx;
use crate::compute::aggregate::rounded_mean;
use crate::config::{EntityId, Event, UserId};
use crate::error::{DialError, Result};
use std::time::SystemTime;

/// Outcome of [`Tx::recompute_aggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recompute {
    /// The entity no longer exists. Nothing was written.
    EntityMissing,
    /// The aggregate already had this value. Nothing was written.
    Unchanged(i64),
    Changed { old: i64, new: i64 },
}

impl Recompute {
    pub fn is_changed(&self) -> bool {
        matches!(self, Recompute::Changed { .. })
    }

    /// Aggregate after recomputation, if the entity exists.
    pub fn value(&self) -> Option<i64> {
        match *self {
            Recompute::EntityMissing => None,
            Recompute::Unchanged(value) => Some(value),
            Recompute::Changed { new, .. } => Some(new),
        }
    }
}

impl Tx<'_> {
    /// Bring the stored aggregate of `entity` in line with its contributions.
    pub fn recompute_aggregate(&mut self, entity: EntityId) -> Result<Recompute> {
        self.check_cancelled()?;

        let Some(old) = self.entity_value(entity)? else {
            log::debug!("entity {} vanished before recompute", entity);
            return Ok(Recompute::EntityMissing);
        };

        let contributions = self.contributions(entity)?;
        let new = rounded_mean(contributions.iter().map(|c| c.value));
        if new == old {
            log::debug!("entity {} unchanged at {}", entity, old);
            return Ok(Recompute::Unchanged(old));
        }

        let now = self.now();
        self.stage_snapshot(entity, now, new)?;
        self.staged_values.insert(entity, new);

        let mut recipients: Vec<UserId> = contributions.iter().map(|c| c.user_id).collect();
        recipients.sort_unstable();
        recipients.dedup();
        self.staged_events
            .push((recipients, Event::value_changed(entity, new)));

        log::debug!("entity {} changed from {} to {}", entity, old, new);
        Ok(Recompute::Changed { old, new })
    }

    /// Write the first snapshot of a newly created entity.
    pub fn record_initial_value(
        &mut self,
        entity: EntityId,
        value: i64,
        timestamp: SystemTime,
    ) -> Result<()> {
        self.upsert_snapshot(entity, timestamp, value)
    }

    /// Set the acting user's contribution to `entity`, then recompute.
    pub fn set_contribution(&mut self, entity: EntityId, value: i64) -> Result<Recompute> {
        self.check_cancelled()?;

        let caller = self
            .caller()
            .ok_or_else(|| DialError::unauthorized("no acting user"))?;
        if !self.db.directory.can_mutate(caller, entity)? {
            return Err(DialError::unauthorized(format!(
                "user {} may not change dial {}",
                caller, entity
            )));
        }
        if !self
            .contributions(entity)?
            .iter()
            .any(|c| c.user_id == caller)
        {
            return Err(DialError::not_found("User is not a member of this dial."));
        }

        self.staged_contributions.insert((entity, caller), value);
        self.recompute_aggregate(entity)
    }
}
