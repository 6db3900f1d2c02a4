//! Mapping from source-of-record entities to CMS field data.
//!
//! Field keys follow [`FieldTable::event`](crate::FieldTable::event) and
//! [`FieldTable::sub_entity`](crate::FieldTable::sub_entity) exactly; the CMS
//! schema predates this service and its key names are kept verbatim.

use crate::{
    slug::slugify, Airport, Category, EntityId, FieldData, ItemId, Location, SourceEntity,
    SubEntityKind,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;

/// CMS item ids resolved for an event's references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRefs {
    pub location: Option<ItemId>,
    pub categories: Vec<ItemId>,
    pub airports: Vec<ItemId>,
}

/// Text projection of a boolean, for CMS fields typed as plain text.
pub fn bool_text(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Build the complete field data for an event.
///
/// Every key in the event table is emitted, absent optionals as `null`, so a
/// PATCH with this map replaces the whole item state rather than merging.
pub fn map_event(entity: &SourceEntity, refs: &ResolvedRefs) -> FieldData {
    let mut data = FieldData::new();
    data.insert("name".into(), json!(entity.name));
    data.insert("slug".into(), json!(slugify(&entity.name)));
    data.insert("eventid".into(), json!(entity.id));
    data.insert("startdate".into(), json!(entity.start_date));
    data.insert("enddate".into(), json!(entity.end_date));
    data.insert("startingamount".into(), json!(entity.starting_price));
    data.insert("drivingdays".into(), json!(entity.driving_days));
    data.insert(
        "eventbookingstatuscode".into(),
        json!(entity.booking_status_code),
    );
    data.insert("isflightincluded".into(), json!(entity.is_flight_included));
    data.insert("iseventpublished".into(), json!(entity.is_published));
    data.insert(
        "isaccommodationandcateringincluded".into(),
        json!(entity.is_accommodation_included),
    );
    data.insert("isfullybooked".into(), json!(entity.is_fully_booked));
    data.insert(
        "isfullybookedboleantext".into(),
        json!(bool_text(entity.is_fully_booked)),
    );
    data.insert("availablevehicles".into(), json!(entity.available_vehicles));
    data.insert("categorie".into(), json!(refs.categories));
    data.insert("airport".into(), json!(refs.airports));
    data.insert(
        "location".into(),
        json!(refs.location.iter().collect::<Vec<_>>()),
    );
    data
}

/// A sub-entity as the resolver needs it: identity, name and descriptive fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SubEntityRef {
    pub kind: SubEntityKind,
    pub source_id: EntityId,
    pub name: String,
    /// Descriptive fields beyond name, slug and identity
    pub extra: FieldData,
}

impl SubEntityRef {
    pub fn location(location: &Location) -> Self {
        let mut extra = FieldData::new();
        extra.insert("city".into(), json!(location.city));
        extra.insert("country".into(), json!(location.country));
        Self {
            kind: SubEntityKind::Location,
            source_id: location.id.clone(),
            name: location.name.clone(),
            extra,
        }
    }

    pub fn category(category: &Category) -> Self {
        Self {
            kind: SubEntityKind::Category,
            source_id: category.id.clone(),
            name: category.name.clone(),
            extra: FieldData::new(),
        }
    }

    pub fn airport(airport: &Airport) -> Self {
        let mut extra = FieldData::new();
        extra.insert("iatacode".into(), json!(airport.iata_code));
        extra.insert("city".into(), json!(airport.city));
        extra.insert("country".into(), json!(airport.country));
        extra.insert("notes".into(), json!(airport.notes));
        Self {
            kind: SubEntityKind::Airport,
            source_id: airport.id.clone(),
            name: airport.name.clone(),
            extra,
        }
    }

    /// Field data for a refresh of an existing item. The slug is left as created.
    pub fn update_fields(&self) -> FieldData {
        let mut data = self.extra.clone();
        data.insert("name".into(), Value::String(self.name.clone()));
        data.insert(
            self.kind.id_field().into(),
            Value::String(self.source_id.clone()),
        );
        data
    }

    /// Field data for a brand-new item.
    pub fn create_fields(&self) -> FieldData {
        let mut data = self.update_fields();
        data.insert("slug".into(), Value::String(slugify(&self.name)));
        data
    }
}

/// Every sub-entity an event references, location first, in source order.
/// A sub-entity listed more than once appears at its first position only.
pub fn references_of(entity: &SourceEntity) -> Vec<SubEntityRef> {
    let mut seen = HashSet::new();
    entity
        .location
        .iter()
        .map(SubEntityRef::location)
        .chain(entity.categories.iter().map(SubEntityRef::category))
        .chain(entity.airports.iter().map(SubEntityRef::airport))
        .filter(|reference| seen.insert((reference.kind, reference.source_id.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldTable;

    fn full_event() -> SourceEntity {
        SourceEntity {
            start_date: Some("2025-04-01".into()),
            end_date: Some("2025-04-05".into()),
            starting_price: Some(2490.0),
            driving_days: Some(4),
            available_vehicles: Some(12),
            booking_status_code: Some(1),
            is_fully_booked: true,
            is_flight_included: true,
            location: Some(Location::new("L1", "Alps")),
            categories: vec![Category::new("C1", "Rally"), Category::new("C2", "Snow")],
            airports: vec![Airport::new("A1", "Vienna")],
            ..SourceEntity::published("E1", "Spring Rally")
        }
    }

    #[test]
    fn maps_every_event_field() {
        let refs = ResolvedRefs {
            location: Some("cms-l1".into()),
            categories: vec!["cms-c1".into(), "cms-c2".into()],
            airports: vec!["cms-a1".into()],
        };
        let data = map_event(&full_event(), &refs);

        assert_eq!(data["name"], "Spring Rally");
        assert_eq!(data["slug"], "spring-rally");
        assert_eq!(data["eventid"], "E1");
        assert_eq!(data["startdate"], "2025-04-01");
        assert_eq!(data["startingamount"], 2490.0);
        assert_eq!(data["drivingdays"], 4);
        assert_eq!(data["availablevehicles"], 12);
        assert_eq!(data["iseventpublished"], true);
        assert_eq!(data["isfullybooked"], true);
        assert_eq!(data["isfullybookedboleantext"], "true");
        assert_eq!(data["isaccommodationandcateringincluded"], false);
        assert_eq!(data["location"], json!(["cms-l1"]));
        assert_eq!(data["categorie"], json!(["cms-c1", "cms-c2"]));
        assert_eq!(data["airport"], json!(["cms-a1"]));

        assert!(FieldTable::event().validate(&data).is_ok());
    }

    #[test]
    fn missing_references_map_to_empty_lists() {
        let entity = SourceEntity::published("E2", "Bare");
        let data = map_event(&entity, &ResolvedRefs::default());

        assert_eq!(data["location"], json!([]));
        assert_eq!(data["categorie"], json!([]));
        assert_eq!(data["airport"], json!([]));
        assert_eq!(data["startdate"], Value::Null);
        assert_eq!(data["isfullybookedboleantext"], "false");
        assert!(FieldTable::event().validate(&data).is_ok());
    }

    #[test]
    fn mapping_is_deterministic() {
        let refs = ResolvedRefs::default();
        assert_eq!(map_event(&full_event(), &refs), map_event(&full_event(), &refs));
    }

    #[test]
    fn sub_entity_fields() {
        let airport = Airport {
            iata_code: Some("VIE".into()),
            ..Airport::new("A1", "Vienna International")
        };
        let reference = SubEntityRef::airport(&airport);

        let create = reference.create_fields();
        assert_eq!(create["slug"], "vienna-international");
        assert_eq!(create["airportid"], "A1");
        assert_eq!(create["iatacode"], "VIE");
        assert!(FieldTable::sub_entity(SubEntityKind::Airport)
            .validate(&create)
            .is_ok());

        let update = reference.update_fields();
        assert!(!update.contains_key("slug"));
        assert_eq!(update["name"], "Vienna International");
    }

    #[test]
    fn references_in_order() {
        let refs = references_of(&full_event());
        let ids: Vec<_> = refs.iter().map(|r| r.source_id.as_str()).collect();
        assert_eq!(ids, vec!["L1", "C1", "C2", "A1"]);
        assert_eq!(refs[0].kind, SubEntityKind::Location);
        assert_eq!(refs[3].kind, SubEntityKind::Airport);
    }

    #[test]
    fn repeated_references_are_listed_once() {
        let entity = SourceEntity {
            categories: vec![
                Category::new("C1", "Rally"),
                Category::new("C2", "Snow"),
                Category::new("C1", "Rally"),
            ],
            airports: vec![Airport::new("C1", "Same id, other kind")],
            ..SourceEntity::published("E1", "Spring Rally")
        };

        let refs = references_of(&entity);
        let keys: Vec<_> = refs
            .iter()
            .map(|r| (r.kind, r.source_id.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (SubEntityKind::Category, "C1"),
                (SubEntityKind::Category, "C2"),
                (SubEntityKind::Airport, "C1"),
            ]
        );
    }

    #[test]
    fn bool_projection() {
        assert_eq!(bool_text(true), "true");
        assert_eq!(bool_text(false), "false");
    }
}
