//! Versioned field tables for the CMS collections.
//!
//! A table names every field key the synchronizer writes into a collection
//! and the kind of value the CMS expects there. Mapped field data is checked
//! against its table before any write leaves the process, so a mapping bug
//! surfaces as a typed error rather than as a CMS validation response.

use crate::{error::Result, Error, FieldData, SubEntityKind, TableVersion};
use serde::{Deserialize, Serialize};

/// Version of the field-name tables below. Bump when a key is renamed.
pub const FIELD_TABLE_VERSION: TableVersion = 1;

/// Value kinds the CMS schema uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Plain text; booleans projected to `"true"`/`"false"` also land here
    Text,
    Number,
    Bool,
    /// ISO-8601 date string
    Date,
    /// List of CMS item ids
    References,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::Text => write!(f, "Text"),
            FieldKind::Number => write!(f, "Number"),
            FieldKind::Bool => write!(f, "Bool"),
            FieldKind::Date => write!(f, "Date"),
            FieldKind::References => write!(f, "References"),
        }
    }
}

/// Definition of a field in a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    /// CMS field key
    pub name: String,
    pub kind: FieldKind,
    /// Whether a value must be present and non-null
    pub required: bool,
}

impl FieldDef {
    /// Create a new required field definition.
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
        }
    }

    /// Create a new optional field definition.
    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }

    /// Validate a JSON value against this field definition.
    pub fn validate(&self, value: Option<&serde_json::Value>) -> Result<()> {
        match value {
            None if self.required => Err(Error::MissingRequiredField(self.name.clone())),
            None => Ok(()),
            Some(serde_json::Value::Null) if self.required => {
                Err(Error::MissingRequiredField(self.name.clone()))
            }
            Some(serde_json::Value::Null) => Ok(()),
            Some(v) => self.validate_kind(v),
        }
    }

    fn validate_kind(&self, value: &serde_json::Value) -> Result<()> {
        let valid = match self.kind {
            FieldKind::Text | FieldKind::Date => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Bool => value.is_boolean(),
            FieldKind::References => value
                .as_array()
                .is_some_and(|ids| ids.iter().all(|id| id.is_string())),
        };

        if valid {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                field: self.name.clone(),
                expected: self.kind.to_string(),
                got: json_type_name(value).to_string(),
            })
        }
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "Null",
        serde_json::Value::Bool(_) => "Bool",
        serde_json::Value::Number(_) => "Number",
        serde_json::Value::String(_) => "String",
        serde_json::Value::Array(_) => "Array",
        serde_json::Value::Object(_) => "Object",
    }
}

/// The field table of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldTable {
    pub version: TableVersion,
    pub fields: Vec<FieldDef>,
}

impl FieldTable {
    pub fn new(fields: Vec<FieldDef>) -> Self {
        Self {
            version: FIELD_TABLE_VERSION,
            fields,
        }
    }

    /// The events collection.
    pub fn event() -> Self {
        use FieldKind::*;
        Self::new(vec![
            FieldDef::required("name", Text),
            FieldDef::required("slug", Text),
            FieldDef::required("eventid", Text),
            FieldDef::optional("startdate", Date),
            FieldDef::optional("enddate", Date),
            FieldDef::optional("startingamount", Number),
            FieldDef::optional("drivingdays", Number),
            FieldDef::optional("eventbookingstatuscode", Number),
            FieldDef::required("isflightincluded", Bool),
            FieldDef::required("iseventpublished", Bool),
            FieldDef::required("isaccommodationandcateringincluded", Bool),
            FieldDef::required("isfullybooked", Bool),
            FieldDef::required("isfullybookedboleantext", Text),
            FieldDef::optional("availablevehicles", Number),
            FieldDef::required("categorie", References),
            FieldDef::required("airport", References),
            FieldDef::required("location", References),
        ])
    }

    /// The collection holding one kind of sub-entity.
    pub fn sub_entity(kind: SubEntityKind) -> Self {
        use FieldKind::*;
        let mut fields = vec![
            FieldDef::required("name", Text),
            // Updates leave the slug alone, so it is optional here.
            FieldDef::optional("slug", Text),
            FieldDef::required(kind.id_field(), Text),
        ];
        match kind {
            SubEntityKind::Location => {
                fields.push(FieldDef::optional("city", Text));
                fields.push(FieldDef::optional("country", Text));
            }
            SubEntityKind::Category => {}
            SubEntityKind::Airport => {
                fields.push(FieldDef::optional("iatacode", Text));
                fields.push(FieldDef::optional("city", Text));
                fields.push(FieldDef::optional("country", Text));
                fields.push(FieldDef::optional("notes", Text));
            }
        }
        Self::new(fields)
    }

    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate field data against this table.
    ///
    /// Keys outside the table are rejected: the CMS would reject them too, and
    /// a stray key usually means a renamed field the table has not caught up with.
    pub fn validate(&self, data: &FieldData) -> Result<()> {
        for key in data.keys() {
            if self.get(key).is_none() {
                return Err(Error::UnknownField {
                    field: key.clone(),
                    version: self.version,
                });
            }
        }

        for field in &self.fields {
            field.validate(data.get(&field.name))?;
        }

        Ok(())
    }
}
