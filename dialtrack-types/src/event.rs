use crate::entity::EntityId;
use serde::{Deserialize, Serialize};

/// Notification published to the members of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    /// The aggregate value of an entity changed.
    #[serde(rename = "dial:value_changed")]
    ValueChanged { id: EntityId, value: i64 },
}

impl Event {
    pub fn value_changed(id: EntityId, value: i64) -> Self {
        Event::ValueChanged { id, value }
    }

    /// The entity this event refers to.
    pub fn entity_id(&self) -> EntityId {
        match self {
            Event::ValueChanged { id, .. } => *id,
        }
    }
}
