//! Entity directory: the records the engine reads but does not own.
//!
//! Entity rows, memberships and authorization live with whoever manages
//! users and entities. The engine only needs the narrow view captured by
//! [`EntityDirectory`]: the stored aggregate column, the current
//! contributions, visibility and a mutate permission check.

use crate::config::{Contribution, EntityId, TrackedEntity, UserId};
use crate::error::{DialError, Result};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::time::SystemTime;

/// Row counts reported by a directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectoryCounts {
    pub entities: u64,
    pub contributions: u64,
}

/// Read/write view over entity records and memberships.
pub trait EntityDirectory: Send + Sync {
    /// Current stored aggregate of an entity, or `None` if it does not exist.
    fn entity_value(&self, entity: EntityId) -> Result<Option<i64>>;

    /// Overwrite the stored aggregate of an entity.
    fn set_entity_value(&self, entity: EntityId, value: i64, updated_at: SystemTime)
    -> Result<()>;

    /// All current contributions to an entity, one per member.
    fn contributions(&self, entity: EntityId) -> Result<Vec<Contribution>>;

    /// Overwrite the value of an existing contribution.
    fn set_contribution(&self, entity: EntityId, user: UserId, value: i64) -> Result<()>;

    /// Entities the caller owns or is a member of, in ascending id order.
    fn visible_entities(&self, caller: UserId) -> Result<Vec<EntityId>>;

    /// Whether `caller` may change values of `entity`.
    fn can_mutate(&self, caller: UserId, entity: EntityId) -> Result<bool>;

    fn counts(&self) -> Result<DirectoryCounts>;
}

#[derive(Debug, Clone)]
struct EntityRecord {
    entity: TrackedEntity,
    members: BTreeMap<UserId, i64>,
}

/// Thread-safe in-process directory.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    records: RwLock<FxHashMap<EntityId, EntityRecord>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entity. The owner becomes a member contributing 0
    /// unless already a member.
    pub fn insert_entity(&self, entity: TrackedEntity) {
        let mut records = self.records.write();
        let owner = entity.owner_id;
        let record = records.entry(entity.id).or_insert_with(|| EntityRecord {
            entity: entity.clone(),
            members: BTreeMap::new(),
        });
        record.entity = entity;
        record.members.entry(owner).or_insert(0);
    }

    /// Remove an entity and its memberships. Returns the removed entity.
    pub fn remove_entity(&self, entity: EntityId) -> Option<TrackedEntity> {
        self.records.write().remove(&entity).map(|r| r.entity)
    }

    pub fn entity(&self, entity: EntityId) -> Option<TrackedEntity> {
        self.records.read().get(&entity).map(|r| r.entity.clone())
    }

    /// Add a member with an initial contribution, replacing any previous value.
    pub fn add_member(&self, entity: EntityId, user: UserId, value: i64) -> Result<()> {
        let mut records = self.records.write();
        let record = records
            .get_mut(&entity)
            .ok_or_else(|| DialError::not_found(format!("Dial {} not found.", entity)))?;
        record.members.insert(user, value);
        Ok(())
    }

    pub fn remove_member(&self, entity: EntityId, user: UserId) -> bool {
        let mut records = self.records.write();
        records
            .get_mut(&entity)
            .is_some_and(|r| r.members.remove(&user).is_some())
    }
}

impl EntityDirectory for MemoryDirectory {
    fn entity_value(&self, entity: EntityId) -> Result<Option<i64>> {
        Ok(self.records.read().get(&entity).map(|r| r.entity.value))
    }

    fn set_entity_value(
        &self,
        entity: EntityId,
        value: i64,
        updated_at: SystemTime,
    ) -> Result<()> {
        let mut records = self.records.write();
        let record = records
            .get_mut(&entity)
            .ok_or_else(|| DialError::not_found(format!("Dial {} not found.", entity)))?;
        record.entity.value = value;
        record.entity.updated_at = updated_at;
        Ok(())
    }

    fn contributions(&self, entity: EntityId) -> Result<Vec<Contribution>> {
        Ok(self
            .records
            .read()
            .get(&entity)
            .map(|r| {
                r.members
                    .iter()
                    .map(|(&user, &value)| Contribution::new(user, value))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn set_contribution(&self, entity: EntityId, user: UserId, value: i64) -> Result<()> {
        let mut records = self.records.write();
        let slot = records
            .get_mut(&entity)
            .and_then(|r| r.members.get_mut(&user))
            .ok_or_else(|| DialError::not_found("User is not a member of this dial."))?;
        *slot = value;
        Ok(())
    }

    fn visible_entities(&self, caller: UserId) -> Result<Vec<EntityId>> {
        let mut ids: Vec<EntityId> = self
            .records
            .read()
            .values()
            .filter(|r| r.entity.owner_id == caller || r.members.contains_key(&caller))
            .map(|r| r.entity.id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn can_mutate(&self, caller: UserId, entity: EntityId) -> Result<bool> {
        Ok(self
            .records
            .read()
            .get(&entity)
            .is_some_and(|r| r.entity.owner_id == caller || r.members.contains_key(&caller)))
    }

    fn counts(&self) -> Result<DirectoryCounts> {
        let records = self.records.read();
        Ok(DirectoryCounts {
            entities: records.len() as u64,
            contributions: records.values().map(|r| r.members.len() as u64).sum(),
        })
    }
}
