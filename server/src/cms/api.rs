//! Typed collection endpoints.

use super::{ApiError, ApiRequest, RateLimitedClient, Sleeper, TokioSleeper, Transport};
use catalog_sync_engine::{FieldData, ItemId, Pagination, TargetItem};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// One page of a collection listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemList {
    pub items: Vec<TargetItem>,
    pub pagination: Pagination,
}

/// Response of the bulk publish endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub published_item_ids: Vec<ItemId>,
}

/// The CMS collection API over a rate-limited client.
#[derive(Debug, Clone)]
pub struct CmsApi<T, S = TokioSleeper> {
    client: RateLimitedClient<T, S>,
}

impl<T: Transport, S: Sleeper> CmsApi<T, S> {
    pub fn new(client: RateLimitedClient<T, S>) -> Self {
        Self { client }
    }

    /// `GET /collections/{collection}/items`
    pub async fn list_page(
        &self,
        collection: &str,
        limit: u32,
        offset: u32,
    ) -> Result<ItemList, ApiError> {
        let request = ApiRequest::new(Method::GET, items_path(collection))
            .with_query("limit", limit)
            .with_query("offset", offset);
        self.client.call_json(&request).await
    }

    /// Create a live (non-draft) item. Publishing is a separate call.
    pub async fn create_item(
        &self,
        collection: &str,
        field_data: &FieldData,
    ) -> Result<TargetItem, ApiError> {
        let request = ApiRequest::new(Method::POST, items_path(collection)).with_body(json!({
            "isArchived": false,
            "isDraft": false,
            "fieldData": field_data,
        }));
        self.client.call_json(&request).await
    }

    /// Replace an item's field data and clear its draft and archived flags.
    pub async fn update_item(
        &self,
        collection: &str,
        item_id: &str,
        field_data: &FieldData,
    ) -> Result<TargetItem, ApiError> {
        let request = ApiRequest::new(Method::PATCH, item_path(collection, item_id)).with_body(
            json!({
                "isArchived": false,
                "isDraft": false,
                "fieldData": field_data,
            }),
        );
        self.client.call_json(&request).await
    }

    /// Move an item to draft without touching its fields.
    pub async fn set_draft(&self, collection: &str, item_id: &str) -> Result<TargetItem, ApiError> {
        let request = ApiRequest::new(Method::PATCH, item_path(collection, item_id))
            .with_body(json!({ "isDraft": true }));
        self.client.call_json(&request).await
    }

    /// Publish items to the live site.
    ///
    /// Fails with [`ApiError::Parse`] when the response does not list the
    /// published ids.
    pub async fn publish(
        &self,
        collection: &str,
        item_ids: &[ItemId],
    ) -> Result<PublishResponse, ApiError> {
        let request = ApiRequest::new(Method::POST, format!("{}/publish", items_path(collection)))
            .with_body(json!({ "itemIds": item_ids }));
        self.client.call_json(&request).await
    }

    /// Remove an item from the live site only; it stays in the collection.
    pub async fn unpublish_live(&self, collection: &str, item_id: &str) -> Result<(), ApiError> {
        let request = ApiRequest::new(
            Method::DELETE,
            format!("{}/live", item_path(collection, item_id)),
        );
        self.client.call(&request).await.map(|_| ())
    }

    /// Remove an item outright.
    pub async fn delete_item(&self, collection: &str, item_id: &str) -> Result<(), ApiError> {
        let request = ApiRequest::new(Method::DELETE, item_path(collection, item_id));
        self.client.call(&request).await.map(|_| ())
    }
}

fn items_path(collection: &str) -> String {
    format!("/collections/{collection}/items")
}

fn item_path(collection: &str, item_id: &str) -> String {
    format!("/collections/{collection}/items/{item_id}")
}
