//! # Catalog Sync Engine
//!
//! The deterministic core of the catalog synchronizer.
//!
//! This crate decides what must happen to a content-management catalog (the
//! target store) when a business record (an event in the CRM, the
//! source-of-record) changes. It holds no connections and performs no IO: the
//! server crate fetches state, feeds it in here, and executes whatever this
//! crate decides.
//!
//! ## Design Principles
//!
//! - **No IO**: Engine has no knowledge of HTTP, databases, or clocks
//! - **Deterministic**: Same inputs always produce same outputs
//! - **Testable**: Pure logic, no mocks needed
//!
//! ## Core Concepts
//!
//! ### Source entities and target items
//!
//! A [`SourceEntity`] is the authoritative event as the CRM reports it, with
//! nested [`Location`], [`Category`] and [`Airport`] references. A
//! [`TargetItem`] is the CMS representation of either an event or one of
//! those sub-entities, identified in the CMS by an opaque item id and linked to
//! the source by an identity field inside its field data.
//!
//! ### Field mapping
//!
//! [`mapper::map_event`] turns a source entity plus the item ids of its
//! resolved references into CMS field data, following the versioned
//! [`FieldTable`]. [`slug::slugify`] derives the deterministic slugs the CMS
//! uses for uniqueness.
//!
//! ### Reconciliation
//!
//! [`reconcile::plan`] is the state machine. Given the change-type hint, the
//! freshly fetched source entity (if the CRM still reports it as published)
//! and the existing target item (if any), it returns the single [`Action`]
//! that converges the catalog.
//!
//! ### Transport policy
//!
//! [`RetryPolicy`] decides when a throttled call is retried and for how long
//! to wait, and [`PageCursor`] drives paginated collection reads. Both are
//! pure so the server can test its client with a fake clock.
//!
//! ## Quick Start
//!
//! ```rust
//! use catalog_sync_engine::{
//!     mapper, reconcile, Action, ChangeType, Location, ResolvedRefs, SourceEntity,
//! };
//!
//! let event = SourceEntity {
//!     location: Some(Location::new("L1", "Alps")),
//!     ..SourceEntity::published("E1", "Spring Rally")
//! };
//!
//! // Nothing in the catalog yet: the event must be created.
//! let action = reconcile::plan(ChangeType::Update, Some(&event), None);
//! assert_eq!(action, Action::Create);
//!
//! let refs = ResolvedRefs {
//!     location: Some("cms-l1".to_string()),
//!     ..ResolvedRefs::default()
//! };
//! let fields = mapper::map_event(&event, &refs);
//! assert_eq!(fields["slug"], "spring-rally");
//! assert_eq!(fields["location"], serde_json::json!(["cms-l1"]));
//! ```

pub mod cache;
pub mod error;
pub mod mapper;
pub mod model;
pub mod page;
pub mod reconcile;
pub mod retry;
pub mod schema;
pub mod signal;
pub mod slug;

// Re-export main types at crate root
pub use cache::ReferenceCache;
pub use error::Error;
pub use mapper::{ResolvedRefs, SubEntityRef};
pub use model::{
    Airport, Category, ItemState, Location, SourceEntity, SubEntityKind, TargetItem,
};
pub use page::{PageCursor, Pagination, DEFAULT_PAGE_SIZE};
pub use reconcile::{Action, ChangeType, NoopReason, TargetState};
pub use retry::RetryPolicy;
pub use schema::{FieldDef, FieldKind, FieldTable, FIELD_TABLE_VERSION};
pub use signal::{ChangeSignal, EVENT_ENTITY_NAME};
pub use slug::slugify;

/// Type aliases for clarity
pub type EntityId = String;
pub type ItemId = String;
pub type CollectionId = String;
pub type TableVersion = u32;

/// CMS field data: field key to JSON value.
pub type FieldData = serde_json::Map<String, serde_json::Value>;
