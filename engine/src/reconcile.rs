//! Reconciliation decisions for one event.
//!
//! This is the state machine of the synchronizer. The change type carried by
//! a CRM notification is only a hint: notifications arrive late, duplicated
//! and out of order, so the decision is always re-derived from the source
//! entity as fetched right now and the item currently in the CMS.
//!
//! # Transitions
//!
//! | change type     | source              | target  | action              |
//! |-----------------|---------------------|---------|---------------------|
//! | Delete          | any                 | present | delete the item     |
//! | Delete          | any                 | absent  | no-op               |
//! | anything else   | absent/unpublished  | present | unpublish to draft  |
//! | anything else   | absent/unpublished  | absent  | no-op               |
//! | anything else   | published           | present | update + publish    |
//! | anything else   | published           | absent  | locked create       |
//!
//! Unpublishing keeps the item (and whatever history hangs off its id);
//! only an explicit delete signal removes it.

use crate::{FieldData, ItemId, ItemState, SourceEntity, TargetItem};
use serde::{Deserialize, Serialize};

/// The change type a notification claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChangeType {
    Create,
    Update,
    Delete,
    /// Any other value; handled like an update
    Other(String),
}

impl From<String> for ChangeType {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "create" => ChangeType::Create,
            "update" => ChangeType::Update,
            "delete" => ChangeType::Delete,
            _ => ChangeType::Other(value),
        }
    }
}

impl From<ChangeType> for String {
    fn from(value: ChangeType) -> Self {
        value.to_string()
    }
}

impl From<&str> for ChangeType {
    fn from(value: &str) -> Self {
        ChangeType::from(value.to_string())
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeType::Create => write!(f, "Create"),
            ChangeType::Update => write!(f, "Update"),
            ChangeType::Delete => write!(f, "Delete"),
            ChangeType::Other(other) => write!(f, "{other}"),
        }
    }
}

/// Where an event stands in the CMS relative to its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TargetState {
    Absent,
    DraftOrArchived,
    /// Live, and every desired field already holds the desired value
    PublishedCurrent,
    /// Live, with at least one field differing
    PublishedStale,
}

impl TargetState {
    /// Classify an existing item against the field data the source maps to.
    ///
    /// Keys the CMS adds on its own are ignored; a desired key missing from
    /// the item counts as `null`.
    pub fn classify(existing: Option<&TargetItem>, desired: &FieldData) -> Self {
        let Some(item) = existing else {
            return TargetState::Absent;
        };
        if item.state() != ItemState::Published {
            return TargetState::DraftOrArchived;
        }

        let current = desired.iter().all(|(key, value)| {
            item.field_data
                .get(key)
                .unwrap_or(&serde_json::Value::Null)
                == value
        });
        if current {
            TargetState::PublishedCurrent
        } else {
            TargetState::PublishedStale
        }
    }
}

/// Why reconciliation decided to do nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoopReason {
    /// Delete signal for an event the CMS does not have
    NothingToDelete,
    /// Event unpublished in the source and absent from the CMS
    NothingToUnpublish,
}

/// The single action that converges one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Action {
    /// Remove the item outright
    #[serde(rename_all = "camelCase")]
    Delete { item_id: ItemId },
    /// Move the item to draft; `live` when it must also be pulled from the live site
    #[serde(rename_all = "camelCase")]
    Unpublish { item_id: ItemId, live: bool },
    /// Replace the item's field data and publish it
    #[serde(rename_all = "camelCase")]
    Update { item_id: ItemId },
    /// Create and publish a new item, under the create-lock
    Create,
    Noop { reason: NoopReason },
}

impl Action {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Delete { .. } => "delete",
            Action::Unpublish { .. } => "unpublish",
            Action::Update { .. } => "update",
            Action::Create => "create",
            Action::Noop { .. } => "noop",
        }
    }
}

/// Decide what to do for one event.
///
/// `source` is the entity as returned by the source-of-record query, `None`
/// when the query did not return it. `existing` is the CMS item carrying the
/// event's identity, if any.
pub fn plan(
    change: ChangeType,
    source: Option<&SourceEntity>,
    existing: Option<&TargetItem>,
) -> Action {
    if change == ChangeType::Delete {
        return match existing {
            Some(item) => Action::Delete {
                item_id: item.id.clone(),
            },
            None => Action::Noop {
                reason: NoopReason::NothingToDelete,
            },
        };
    }

    let published = source.is_some_and(|entity| entity.is_published);
    match (published, existing) {
        (true, Some(item)) => Action::Update {
            item_id: item.id.clone(),
        },
        (true, None) => Action::Create,
        (false, Some(item)) => Action::Unpublish {
            item_id: item.id.clone(),
            live: item.state() == ItemState::Published,
        },
        (false, None) => Action::Noop {
            reason: NoopReason::NothingToUnpublish,
        },
    }
}
