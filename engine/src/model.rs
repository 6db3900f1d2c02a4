//! Source-of-record entities and target-store items.

use crate::{EntityId, FieldData, ItemId};
use serde::{Deserialize, Serialize};

/// A location referenced by an event (0 or 1 per event).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl Location {
    /// Create a location with no descriptive fields.
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            city: None,
            country: None,
        }
    }
}

/// A category an event is filed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: EntityId,
    pub name: String,
}

impl Category {
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A departure airport offered for an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Airport {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub iata_code: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Airport {
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            iata_code: None,
            city: None,
            country: None,
            notes: None,
        }
    }
}

/// The authoritative event as reported by the source-of-record.
///
/// Only ever read by the engine. Absent collections deserialize as empty, and
/// every optional scalar as `None`, so a sparse CRM payload still maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceEntity {
    /// Stable identity, stored in the target item's `eventid` field
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub starting_price: Option<f64>,
    #[serde(default)]
    pub driving_days: Option<i64>,
    #[serde(default)]
    pub available_vehicles: Option<i64>,
    #[serde(default)]
    pub booking_status_code: Option<i64>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub is_fully_booked: bool,
    #[serde(default)]
    pub is_flight_included: bool,
    #[serde(default)]
    pub is_accommodation_included: bool,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub airports: Vec<Airport>,
}

impl SourceEntity {
    /// A published event with only identity and name set.
    pub fn published(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            start_date: None,
            end_date: None,
            starting_price: None,
            driving_days: None,
            available_vehicles: None,
            booking_status_code: None,
            is_published: true,
            is_fully_booked: false,
            is_flight_included: false,
            is_accommodation_included: false,
            location: None,
            categories: Vec::new(),
            airports: Vec::new(),
        }
    }
}

/// The kinds of sub-entity an event references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubEntityKind {
    Location,
    Category,
    Airport,
}

impl SubEntityKind {
    pub const ALL: [SubEntityKind; 3] = [
        SubEntityKind::Location,
        SubEntityKind::Category,
        SubEntityKind::Airport,
    ];

    /// The CMS field holding the source id of this kind of item.
    pub fn id_field(self) -> &'static str {
        match self {
            SubEntityKind::Location => "locationid",
            SubEntityKind::Category => "categoryid",
            SubEntityKind::Airport => "airportid",
        }
    }
}

impl std::fmt::Display for SubEntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubEntityKind::Location => write!(f, "location"),
            SubEntityKind::Category => write!(f, "category"),
            SubEntityKind::Airport => write!(f, "airport"),
        }
    }
}

/// Publish state of a target item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    Published,
    Draft,
    Archived,
}

/// An item in a CMS collection.
///
/// `id` and `fieldData` are required; a listing without them is malformed and
/// fails to deserialize instead of yielding a half-empty item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetItem {
    pub id: ItemId,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub is_archived: bool,
    pub field_data: FieldData,
}

impl TargetItem {
    pub fn new(id: impl Into<ItemId>, field_data: FieldData) -> Self {
        Self {
            id: id.into(),
            is_draft: false,
            is_archived: false,
            field_data,
        }
    }

    /// Archived wins over draft.
    pub fn state(&self) -> ItemState {
        if self.is_archived {
            ItemState::Archived
        } else if self.is_draft {
            ItemState::Draft
        } else {
            ItemState::Published
        }
    }

    /// The source identity stored under `id_field`, if it is a non-empty string.
    pub fn identity(&self, id_field: &str) -> Option<&str> {
        self.field_data
            .get(id_field)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }
}
