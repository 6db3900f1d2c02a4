//! Full reads of a collection.

use super::{ApiError, CmsApi, Sleeper, Transport};
use catalog_sync_engine::{PageCursor, TargetItem, DEFAULT_PAGE_SIZE};

/// Read every item of `collection`, from offset 0, in listing order.
///
/// Pages are concatenated as they arrive; nothing is deduplicated.
pub async fn read_all<T: Transport, S: Sleeper>(
    api: &CmsApi<T, S>,
    collection: &str,
) -> Result<Vec<TargetItem>, ApiError> {
    let mut cursor = PageCursor::new(DEFAULT_PAGE_SIZE);
    let mut items = Vec::new();

    while let Some((limit, offset)) = cursor.next_page() {
        let page = api.list_page(collection, limit, offset).await?;
        cursor.advance(page.items.len(), page.pagination.total);
        items.extend(page.items);
    }

    tracing::debug!(collection, count = items.len(), "read collection");
    Ok(items)
}
