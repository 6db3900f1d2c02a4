//! Change notifications from the source-of-record.

use crate::{error::Result, ChangeType, EntityId, Error};
use serde::{Deserialize, Serialize};

/// Entity name of the records this service synchronizes.
pub const EVENT_ENTITY_NAME: &str = "Event";

/// A change notification: "something happened to this record".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSignal {
    pub entity_name: String,
    pub record_id: EntityId,
    pub change_type: ChangeType,
}

impl ChangeSignal {
    pub fn new(
        entity_name: impl Into<String>,
        record_id: impl Into<EntityId>,
        change_type: ChangeType,
    ) -> Self {
        Self {
            entity_name: entity_name.into(),
            record_id: record_id.into(),
            change_type,
        }
    }

    /// Whether this signal concerns an event. Other entities are ignored.
    pub fn is_event(&self) -> bool {
        self.entity_name == EVENT_ENTITY_NAME
    }

    /// Reject signals that cannot name a record.
    pub fn validate(&self) -> Result<()> {
        if self.record_id.trim().is_empty() {
            return Err(Error::InvalidSignal("recordId is empty".into()));
        }
        Ok(())
    }
}
