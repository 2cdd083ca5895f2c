use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Identifier of a tracked entity (a dial).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

/// Identifier of a user contributing to, owning, or watching an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A group whose aggregate value is tracked over time.
///
/// `value` is maintained by the engine as the rounded mean of the current
/// contributions. Name and ownership belong to whoever manages entity records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedEntity {
    pub id: EntityId,
    pub owner_id: UserId,
    pub name: String,
    pub value: i64,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl TrackedEntity {
    /// Create an entity with a zero value, created and updated at `now`.
    pub fn new(id: EntityId, owner_id: UserId, name: impl Into<String>, now: SystemTime) -> Self {
        Self {
            id,
            owner_id,
            name: name.into(),
            value: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_value(mut self, value: i64) -> Self {
        self.value = value;
        self
    }
}

/// One member's current input to an entity's aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub user_id: UserId,
    pub value: i64,
}

impl Contribution {
    pub fn new(user_id: UserId, value: i64) -> Self {
        Self { user_id, value }
    }
}
