//! Per-run index from source sub-entity ids to CMS item ids.

use crate::{EntityId, ItemId, TargetItem};
use std::collections::HashMap;

/// Maps source ids to CMS item ids for one collection.
///
/// Built from a full read of the collection at the start of a run and
/// discarded when the run ends. Nothing outlives the run, so staleness is
/// bounded by one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceCache {
    entries: HashMap<EntityId, ItemId>,
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index items by the source id stored under `id_field`.
    ///
    /// Items without an identity are skipped. If two items claim the same
    /// identity the first one in listing order wins.
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a TargetItem>, id_field: &str) -> Self {
        let mut entries = HashMap::new();
        for item in items {
            if let Some(source_id) = item.identity(id_field) {
                entries
                    .entry(source_id.to_string())
                    .or_insert_with(|| item.id.clone());
            }
        }
        Self { entries }
    }

    pub fn get(&self, source_id: &str) -> Option<&ItemId> {
        self.entries.get(source_id)
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.entries.contains_key(source_id)
    }

    pub fn insert(&mut self, source_id: impl Into<EntityId>, item_id: impl Into<ItemId>) {
        self.entries.insert(source_id.into(), item_id.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
