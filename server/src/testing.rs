//! In-memory stand-ins for the CMS, the CRM and the clock.

use crate::cms::{
    ApiRequest, ApiResponse, CmsApi, RateLimitedClient, Sleeper, Transport, TransportError,
};
use crate::config::{CmsConfig, Config, CrmConfig};
use crate::crm::{SourceError, SourceOfRecord};
use catalog_sync_engine::{EntityId, FieldData, ItemId, RetryPolicy, SourceEntity, TargetItem};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Field data from string pairs.
pub fn fields(pairs: &[(&str, &str)]) -> FieldData {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect()
}

/// A CMS API over `cms` with no pacing and the default retry policy.
pub fn fake_api(cms: &FakeCms) -> CmsApi<FakeCms, RecordingSleeper> {
    CmsApi::new(RateLimitedClient::new(
        cms.clone(),
        RecordingSleeper::new(),
        RetryPolicy::default(),
        Duration::ZERO,
    ))
}

pub fn test_config(webhook_secret: Option<&str>) -> Config {
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        database_url: None,
        webhook_secret: webhook_secret.map(str::to_string),
        cms: CmsConfig {
            base_url: "http://cms.test".into(),
            api_token: "cms-token".into(),
            events_collection_id: "events".into(),
            locations_collection_id: "locations".into(),
            categories_collection_id: "categories".into(),
            airports_collection_id: "airports".into(),
            request_delay: Duration::ZERO,
            timeout: Duration::from_secs(5),
            max_attempts: 5,
        },
        crm: CrmConfig {
            base_url: "http://crm.test".into(),
            api_token: "crm-token".into(),
            timeout: Duration::from_secs(5),
        },
        create_lock_ttl: Duration::from_secs(30),
    }
}

enum Forced {
    Respond(ApiResponse),
    Timeout,
}

#[derive(Default)]
struct CmsState {
    collections: HashMap<String, Vec<TargetItem>>,
    live: HashSet<(String, ItemId)>,
    forced: VecDeque<Forced>,
    rejected_creates: HashMap<String, ApiResponse>,
    requests: usize,
    writes: Vec<String>,
    next_id: u64,
}

/// An in-memory CMS speaking the collection endpoints at the transport seam.
///
/// Queued responses (`respond_next`, `throttle_next`, `time_out_next`) are
/// served before any routing, one per request. Every write is recorded as
/// `"<VERB> <collection>"` in [`write_log`](Self::write_log).
#[derive(Clone, Default)]
pub struct FakeCms {
    state: Arc<Mutex<CmsState>>,
}

impl FakeCms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_next(&self, status: u16, body: &str) {
        self.force(Forced::Respond(ApiResponse {
            status,
            retry_after: None,
            body: body.to_string(),
        }));
    }

    pub fn throttle_next(&self, retry_after: Option<Duration>) {
        self.force(Forced::Respond(ApiResponse {
            status: 429,
            retry_after,
            body: r#"{"message":"Too Many Requests"}"#.to_string(),
        }));
    }

    pub fn time_out_next(&self) {
        self.force(Forced::Timeout);
    }

    fn force(&self, forced: Forced) {
        self.state.lock().unwrap().forced.push_back(forced);
    }

    /// Answer every create in `collection` with `status` and `body`.
    pub fn reject_creates(&self, collection: &str, status: u16, body: &str) {
        self.state.lock().unwrap().rejected_creates.insert(
            collection.to_string(),
            ApiResponse {
                status,
                retry_after: None,
                body: body.to_string(),
            },
        );
    }

    /// Insert a live, non-draft item.
    pub fn seed(&self, collection: &str, field_data: FieldData) -> ItemId {
        let mut state = self.state.lock().unwrap();
        let id = state.insert(collection, false, field_data);
        state.live.insert((collection.to_string(), id.clone()));
        id
    }

    /// Insert a draft item that is not live.
    pub fn seed_draft(&self, collection: &str, field_data: FieldData) -> ItemId {
        self.state
            .lock()
            .unwrap()
            .insert(collection, true, field_data)
    }

    pub fn items(&self, collection: &str) -> Vec<TargetItem> {
        self.state
            .lock()
            .unwrap()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn item(&self, collection: &str, id: &str) -> Option<TargetItem> {
        self.items(collection).into_iter().find(|item| item.id == id)
    }

    pub fn is_live(&self, collection: &str, id: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .live
            .contains(&(collection.to_string(), id.to_string()))
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests
    }

    pub fn write_log(&self) -> Vec<String> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn clear_write_log(&self) {
        self.state.lock().unwrap().writes.clear();
    }
}

impl Transport for FakeCms {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        // Let concurrent runs interleave at every call, as real IO would.
        tokio::task::yield_now().await;

        let mut state = self.state.lock().unwrap();
        state.requests += 1;
        match state.forced.pop_front() {
            Some(Forced::Respond(response)) => Ok(response),
            Some(Forced::Timeout) => Err(TransportError::Timeout),
            None => Ok(state.route(request)),
        }
    }
}

fn respond(status: u16, body: Value) -> ApiResponse {
    ApiResponse {
        status,
        retry_after: None,
        body: if body.is_null() {
            String::new()
        } else {
            body.to_string()
        },
    }
}

fn not_found() -> ApiResponse {
    respond(404, json!({ "message": "Requested resource not found" }))
}

fn flag(body: Option<&Value>, name: &str) -> Option<bool> {
    body.and_then(|b| b.get(name)).and_then(Value::as_bool)
}

impl CmsState {
    fn insert(&mut self, collection: &str, is_draft: bool, field_data: FieldData) -> ItemId {
        self.next_id += 1;
        let item = TargetItem {
            is_draft,
            ..TargetItem::new(format!("cms-{}", self.next_id), field_data)
        };
        let id = item.id.clone();
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(item);
        id
    }

    fn find_mut(&mut self, collection: &str, id: &str) -> Option<&mut TargetItem> {
        self.collections
            .get_mut(collection)?
            .iter_mut()
            .find(|item| item.id == id)
    }

    fn route(&mut self, request: &ApiRequest) -> ApiResponse {
        let segments: Vec<&str> = request.path.trim_start_matches('/').split('/').collect();
        let body = request.body.as_ref();

        match (request.method.as_str(), segments.as_slice()) {
            ("GET", ["collections", cid, "items"]) => self.list(cid, &request.query),
            ("POST", ["collections", cid, "items"]) => self.create(cid, body),
            ("POST", ["collections", cid, "items", "publish"]) => self.publish(cid, body),
            ("PATCH", ["collections", cid, "items", iid]) => self.update(cid, iid, body),
            ("DELETE", ["collections", cid, "items", iid, "live"]) => self.unpublish(cid, iid),
            ("DELETE", ["collections", cid, "items", iid]) => self.delete(cid, iid),
            _ => respond(404, json!({ "message": "Route not found" })),
        }
    }

    fn list(&self, collection: &str, query: &[(String, String)]) -> ApiResponse {
        let param = |name: &str, default: usize| {
            query
                .iter()
                .find(|(key, _)| key == name)
                .and_then(|(_, value)| value.parse().ok())
                .unwrap_or(default)
        };
        let limit = param("limit", 100);
        let offset = param("offset", 0);

        let items = self.collections.get(collection).cloned().unwrap_or_default();
        let total = items.len();
        let page: Vec<TargetItem> = items.into_iter().skip(offset).take(limit).collect();

        respond(
            200,
            json!({
                "items": page,
                "pagination": { "limit": limit, "offset": offset, "total": total },
            }),
        )
    }

    fn create(&mut self, collection: &str, body: Option<&Value>) -> ApiResponse {
        if let Some(rejection) = self.rejected_creates.get(collection) {
            return rejection.clone();
        }
        let Some(field_data) = body
            .and_then(|b| b.get("fieldData"))
            .and_then(Value::as_object)
            .cloned()
        else {
            return respond(400, json!({ "message": "fieldData is required" }));
        };

        let id = self.insert(collection, flag(body, "isDraft").unwrap_or(false), field_data);
        self.writes.push(format!("POST {collection}"));
        match self.find_mut(collection, &id) {
            Some(item) => respond(202, json!(item)),
            None => not_found(),
        }
    }

    fn update(&mut self, collection: &str, id: &str, body: Option<&Value>) -> ApiResponse {
        let Some(item) = self.find_mut(collection, id) else {
            return not_found();
        };

        if let Some(data) = body
            .and_then(|b| b.get("fieldData"))
            .and_then(Value::as_object)
        {
            for (key, value) in data {
                item.field_data.insert(key.clone(), value.clone());
            }
        }
        if let Some(is_draft) = flag(body, "isDraft") {
            item.is_draft = is_draft;
        }
        if let Some(is_archived) = flag(body, "isArchived") {
            item.is_archived = is_archived;
        }

        let response = respond(200, json!(item));
        self.writes.push(format!("PATCH {collection}"));
        response
    }

    fn publish(&mut self, collection: &str, body: Option<&Value>) -> ApiResponse {
        let ids: Vec<String> = body
            .and_then(|b| b.get("itemIds"))
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        for id in &ids {
            match self.find_mut(collection, id) {
                Some(item) => item.is_draft = false,
                None => return not_found(),
            }
            self.live.insert((collection.to_string(), id.clone()));
        }

        self.writes.push(format!("PUBLISH {collection}"));
        respond(202, json!({ "publishedItemIds": ids }))
    }

    fn unpublish(&mut self, collection: &str, id: &str) -> ApiResponse {
        if self.find_mut(collection, id).is_none() {
            return not_found();
        }
        self.live.remove(&(collection.to_string(), id.to_string()));
        self.writes.push(format!("UNPUBLISH {collection}"));
        respond(204, Value::Null)
    }

    fn delete(&mut self, collection: &str, id: &str) -> ApiResponse {
        let Some(items) = self.collections.get_mut(collection) else {
            return not_found();
        };
        let before = items.len();
        items.retain(|item| item.id != id);
        if items.len() == before {
            return not_found();
        }
        self.live.remove(&(collection.to_string(), id.to_string()));
        self.writes.push(format!("DELETE {collection}"));
        respond(204, Value::Null)
    }
}

/// Records every requested sleep and returns at once.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}

#[derive(Default)]
struct SourceState {
    entities: HashMap<EntityId, SourceEntity>,
    failure: Option<SourceError>,
    calls: usize,
}

/// A CRM that reports whatever was published into it.
#[derive(Clone, Default)]
pub struct FakeSource {
    state: Arc<Mutex<SourceState>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, entity: SourceEntity) {
        self.state
            .lock()
            .unwrap()
            .entities
            .insert(entity.id.clone(), entity);
    }

    pub fn withdraw(&self, id: &str) {
        self.state.lock().unwrap().entities.remove(id);
    }

    pub fn fail_next(&self, err: SourceError) {
        self.state.lock().unwrap().failure = Some(err);
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }
}

impl SourceOfRecord for FakeSource {
    async fn fetch_published(&self, ids: &[EntityId]) -> Result<Vec<SourceEntity>, SourceError> {
        tokio::task::yield_now().await;

        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if let Some(err) = state.failure.take() {
            return Err(err);
        }
        Ok(ids
            .iter()
            .filter_map(|id| state.entities.get(id).cloned())
            .collect())
    }
}
