//! Create-or-update of referenced sub-entities.

use super::{ApiError, CmsApi, Sleeper, Transport};
use catalog_sync_engine::{ItemId, ReferenceCache, SubEntityRef};
use tracing::debug;

/// Make sure `reference` exists and is live in `collection`, returning its item id.
///
/// A cached reference is refreshed in place (its slug is left alone) and
/// republished. An unknown one is created with a slug derived from its name,
/// recorded in `cache` and published. A reference without a source id resolves
/// to `None` without touching the CMS.
///
/// No lock is taken: two runs may both create the same sub-entity. The cache
/// picks the first such item on the next read.
pub async fn upsert<T: Transport, S: Sleeper>(
    api: &CmsApi<T, S>,
    cache: &mut ReferenceCache,
    collection: &str,
    reference: &SubEntityRef,
) -> Result<Option<ItemId>, ApiError> {
    if reference.source_id.is_empty() {
        return Ok(None);
    }

    let item_id = match cache.get(&reference.source_id) {
        Some(existing) => {
            let existing = existing.clone();
            debug!(
                kind = %reference.kind,
                source_id = %reference.source_id,
                item_id = %existing,
                "refreshing reference"
            );
            api.update_item(collection, &existing, &reference.update_fields())
                .await?;
            existing
        }
        None => {
            let created = api
                .create_item(collection, &reference.create_fields())
                .await?;
            debug!(
                kind = %reference.kind,
                source_id = %reference.source_id,
                item_id = %created.id,
                "created reference"
            );
            cache.insert(reference.source_id.clone(), created.id.clone());
            created.id
        }
    };

    api.publish(collection, std::slice::from_ref(&item_id)).await?;
    Ok(Some(item_id))
}
