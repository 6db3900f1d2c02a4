//! One reconciliation run: fetch, plan, execute.

use super::{ReconcileOutcome, SyncError};
use crate::cms::{read_all, upsert, CmsApi, Sleeper, Transport};
use crate::config::CmsConfig;
use crate::crm::SourceOfRecord;
use crate::lock::{event_create_key, CreateLock};
use catalog_sync_engine::{
    mapper, reconcile, Action, ChangeType, CollectionId, FieldData, FieldTable, ReferenceCache,
    ResolvedRefs, SourceEntity, SubEntityKind, TargetItem, TargetState,
};
use std::collections::{hash_map::Entry, HashMap};
use std::time::Duration;
use tracing::{debug, info, warn};

/// CMS collection ids for events and each referenced kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collections {
    pub events: CollectionId,
    pub locations: CollectionId,
    pub categories: CollectionId,
    pub airports: CollectionId,
}

impl Collections {
    pub fn for_kind(&self, kind: SubEntityKind) -> &str {
        match kind {
            SubEntityKind::Location => &self.locations,
            SubEntityKind::Category => &self.categories,
            SubEntityKind::Airport => &self.airports,
        }
    }
}

impl From<&CmsConfig> for Collections {
    fn from(config: &CmsConfig) -> Self {
        Self {
            events: config.events_collection_id.clone(),
            locations: config.locations_collection_id.clone(),
            categories: config.categories_collection_id.clone(),
            airports: config.airports_collection_id.clone(),
        }
    }
}

/// Converges one event at a time.
///
/// Holds no per-run state: every run reads the source and the CMS afresh and
/// builds its own reference caches, so any number of runs may share one
/// reconciler.
pub struct Reconciler<T, S, C, L> {
    api: CmsApi<T, S>,
    source: C,
    lock: L,
    collections: Collections,
    lock_ttl: Duration,
    event_table: FieldTable,
}

impl<T, S, C, L> Reconciler<T, S, C, L>
where
    T: Transport,
    S: Sleeper,
    C: SourceOfRecord,
    L: CreateLock,
{
    pub fn new(
        api: CmsApi<T, S>,
        source: C,
        lock: L,
        collections: Collections,
        lock_ttl: Duration,
    ) -> Self {
        Self {
            api,
            source,
            lock,
            collections,
            lock_ttl,
            event_table: FieldTable::event(),
        }
    }

    /// Bring the CMS in line with the source for `event_id`.
    ///
    /// `change` only matters when it is a delete; otherwise the decision
    /// comes from what the source reports now.
    pub async fn run(
        &self,
        event_id: &str,
        change: ChangeType,
    ) -> Result<ReconcileOutcome, SyncError> {
        info!(event_id, change = %change, "reconciling");
        let source = if change == ChangeType::Delete {
            None
        } else {
            self.fetch_source(event_id).await?
        };
        let existing = self.find_event(event_id).await?;

        let action = reconcile::plan(change, source.as_ref(), existing.as_ref());
        debug!(event_id, action = action.name(), "planned");

        let events = &self.collections.events;
        let outcome = match action {
            Action::Delete { item_id } => {
                self.api
                    .delete_item(events, &item_id)
                    .await
                    .map_err(SyncError::api("delete event"))?;
                ReconcileOutcome::Deleted { item_id }
            }
            Action::Unpublish { item_id, live } => {
                if live {
                    self.api
                        .unpublish_live(events, &item_id)
                        .await
                        .map_err(SyncError::api("unpublish event"))?;
                }
                self.api
                    .set_draft(events, &item_id)
                    .await
                    .map_err(SyncError::api("draft event"))?;
                ReconcileOutcome::Unpublished { item_id }
            }
            Action::Noop { reason } => ReconcileOutcome::Skipped { reason },
            Action::Update { item_id } => {
                let entity = source.ok_or_else(|| SyncError::MissingSource(event_id.into()))?;
                let data = self.prepare(&entity).await?;
                debug!(
                    event_id,
                    state = ?TargetState::classify(existing.as_ref(), &data),
                    "updating event"
                );
                self.write_update(&item_id, &data).await?;
                ReconcileOutcome::Updated { item_id }
            }
            Action::Create => {
                let entity = source.ok_or_else(|| SyncError::MissingSource(event_id.into()))?;
                let data = self.prepare(&entity).await?;
                self.create_locked(event_id, &data).await?
            }
        };

        Ok(outcome)
    }

    /// The entity if the source reports it; `None` means not published.
    async fn fetch_source(&self, event_id: &str) -> Result<Option<SourceEntity>, SyncError> {
        let entities = self
            .source
            .fetch_published(&[event_id.to_string()])
            .await?;
        Ok(entities.into_iter().find(|entity| entity.id == event_id))
    }

    async fn find_event(&self, event_id: &str) -> Result<Option<TargetItem>, SyncError> {
        let items = read_all(&self.api, &self.collections.events)
            .await
            .map_err(SyncError::api("read events"))?;
        Ok(items
            .into_iter()
            .find(|item| item.identity("eventid") == Some(event_id)))
    }

    /// Resolve references, then map and validate the event's field data.
    async fn prepare(&self, entity: &SourceEntity) -> Result<FieldData, SyncError> {
        let refs = self.resolve_references(entity).await?;
        let data = mapper::map_event(entity, &refs);
        self.event_table.validate(&data)?;
        Ok(data)
    }

    /// Upsert every referenced sub-entity, one after another.
    ///
    /// A kind's cache is built from a full read of its collection the first
    /// time the event references that kind, and dropped with the run.
    async fn resolve_references(&self, entity: &SourceEntity) -> Result<ResolvedRefs, SyncError> {
        let mut caches: HashMap<SubEntityKind, ReferenceCache> = HashMap::new();
        let mut refs = ResolvedRefs::default();

        for reference in mapper::references_of(entity) {
            let kind = reference.kind;
            FieldTable::sub_entity(kind).validate(&reference.create_fields())?;

            let collection = self.collections.for_kind(kind);
            let cache = match caches.entry(kind) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let items = read_all(&self.api, collection)
                        .await
                        .map_err(SyncError::api(format!("read {kind} collection")))?;
                    entry.insert(ReferenceCache::from_items(&items, kind.id_field()))
                }
            };

            let resolved = upsert(&self.api, cache, collection, &reference)
                .await
                .map_err(SyncError::api(format!("upsert {kind} {}", reference.source_id)))?;

            if let Some(item_id) = resolved {
                match kind {
                    SubEntityKind::Location => refs.location = Some(item_id),
                    SubEntityKind::Category => refs.categories.push(item_id),
                    SubEntityKind::Airport => refs.airports.push(item_id),
                }
            }
        }

        Ok(refs)
    }

    async fn write_update(&self, item_id: &str, data: &FieldData) -> Result<(), SyncError> {
        let events = &self.collections.events;
        self.api
            .update_item(events, item_id, data)
            .await
            .map_err(SyncError::api("update event"))?;
        self.api
            .publish(events, &[item_id.to_string()])
            .await
            .map_err(SyncError::api("publish event"))?;
        Ok(())
    }

    /// Create the event under the create-lock. The lock is released whatever
    /// the create attempt returns.
    async fn create_locked(
        &self,
        event_id: &str,
        data: &FieldData,
    ) -> Result<ReconcileOutcome, SyncError> {
        let key = event_create_key(event_id);
        let Some(token) = self.lock.try_acquire(&key, self.lock_ttl).await? else {
            warn!(event_id, "create-lock held by another run, leaving creation to it");
            return Ok(ReconcileOutcome::LockContended);
        };

        let result = self.create_holding_lock(event_id, data).await;

        if let Err(err) = self.lock.release(&key, &token).await {
            warn!(event_id, error = %err, "failed to release create-lock");
        }
        result
    }

    async fn create_holding_lock(
        &self,
        event_id: &str,
        data: &FieldData,
    ) -> Result<ReconcileOutcome, SyncError> {
        // Another run may have created it between our read and the acquire.
        if let Some(item) = self.find_event(event_id).await? {
            debug!(event_id, item_id = %item.id, "event created concurrently, updating instead");
            self.write_update(&item.id, data).await?;
            return Ok(ReconcileOutcome::Updated { item_id: item.id });
        }

        let events = &self.collections.events;
        let created = self
            .api
            .create_item(events, data)
            .await
            .map_err(SyncError::api("create event"))?;
        self.api
            .publish(events, std::slice::from_ref(&created.id))
            .await
            .map_err(SyncError::api("publish event"))?;

        Ok(ReconcileOutcome::Created {
            item_id: created.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crm::SourceError;
    use crate::lock::MemoryCreateLock;
    use crate::testing::{fake_api, fields, test_config, FakeCms, FakeSource, RecordingSleeper};
    use catalog_sync_engine::{Airport, Category, Location, NoopReason};
    use serde_json::json;

    const TTL: Duration = Duration::from_secs(30);

    struct Harness {
        cms: FakeCms,
        source: FakeSource,
        lock: MemoryCreateLock,
        reconciler: Reconciler<FakeCms, RecordingSleeper, FakeSource, MemoryCreateLock>,
    }

    fn harness() -> Harness {
        let cms = FakeCms::new();
        let source = FakeSource::new();
        let lock = MemoryCreateLock::new();
        let reconciler = Reconciler::new(
            fake_api(&cms),
            source.clone(),
            lock.clone(),
            Collections::from(&test_config(None).cms),
            TTL,
        );
        Harness {
            cms,
            source,
            lock,
            reconciler,
        }
    }

    fn spring_rally() -> SourceEntity {
        SourceEntity {
            location: Some(Location::new("L1", "Alps")),
            ..SourceEntity::published("E1", "Spring Rally")
        }
    }

    #[tokio::test]
    async fn new_event_creates_location_then_event() {
        let h = harness();
        h.source.publish(spring_rally());

        let outcome = h.reconciler.run("E1", ChangeType::Create).await.unwrap();

        let ReconcileOutcome::Created { item_id } = outcome else {
            panic!("expected a create, got {outcome:?}");
        };
        assert_eq!(
            h.cms.write_log(),
            vec![
                "POST locations",
                "PUBLISH locations",
                "POST events",
                "PUBLISH events"
            ]
        );

        let locations = h.cms.items("locations");
        assert_eq!(locations.len(), 1);
        let location_id = locations[0].id.clone();
        assert_eq!(locations[0].field_data["slug"], "alps");
        assert!(h.cms.is_live("locations", &location_id));

        let event = h.cms.item("events", &item_id).unwrap();
        assert_eq!(event.field_data["eventid"], "E1");
        assert_eq!(event.field_data["slug"], "spring-rally");
        assert_eq!(event.field_data["location"], json!([location_id]));
        assert!(h.cms.is_live("events", &item_id));
        assert!(!h.lock.is_held("create:event:E1"));
    }

    #[tokio::test]
    async fn rerun_with_unchanged_source_is_idempotent() {
        let h = harness();
        h.source.publish(spring_rally());

        let first = h.reconciler.run("E1", ChangeType::Update).await.unwrap();
        let after_first = h.cms.items("events");
        h.cms.clear_write_log();

        let second = h.reconciler.run("E1", ChangeType::Update).await.unwrap();
        let after_second = h.cms.items("events");

        assert_eq!(
            second,
            ReconcileOutcome::Updated {
                item_id: first.item_id().unwrap().to_string()
            }
        );
        assert_eq!(after_first, after_second);
        assert_eq!(h.cms.items("locations").len(), 1);
        assert_eq!(
            h.cms.write_log(),
            vec![
                "PATCH locations",
                "PUBLISH locations",
                "PATCH events",
                "PUBLISH events"
            ]
        );
    }

    #[tokio::test]
    async fn concurrent_runs_create_exactly_one_item() {
        let h = harness();
        h.source.publish(spring_rally());

        let runs = (0..8).map(|_| h.reconciler.run("E1", ChangeType::Create));
        let outcomes = futures::future::join_all(runs).await;

        let outcomes: Vec<ReconcileOutcome> =
            outcomes.into_iter().map(|r| r.unwrap()).collect();
        let created = outcomes
            .iter()
            .filter(|o| matches!(o, ReconcileOutcome::Created { .. }))
            .count();
        assert_eq!(created, 1);
        assert!(outcomes.iter().all(|o| matches!(
            o,
            ReconcileOutcome::Created { .. }
                | ReconcileOutcome::Updated { .. }
                | ReconcileOutcome::LockContended
        )));
        assert_eq!(h.cms.items("events").len(), 1);
        assert!(!h.lock.is_held("create:event:E1"));
    }

    #[tokio::test]
    async fn withdrawn_event_is_unpublished_not_deleted() {
        let h = harness();
        h.source.publish(spring_rally());
        let created = h.reconciler.run("E1", ChangeType::Create).await.unwrap();
        let item_id = created.item_id().unwrap().to_string();
        h.cms.clear_write_log();

        h.source.withdraw("E1");
        let outcome = h.reconciler.run("E1", ChangeType::Update).await.unwrap();

        assert_eq!(
            outcome,
            ReconcileOutcome::Unpublished {
                item_id: item_id.clone()
            }
        );
        assert_eq!(h.cms.write_log(), vec!["UNPUBLISH events", "PATCH events"]);
        let item = h.cms.item("events", &item_id).unwrap();
        assert!(item.is_draft);
        assert!(!h.cms.is_live("events", &item_id));
    }

    #[tokio::test]
    async fn unpublished_flag_in_source_also_unpublishes() {
        let h = harness();
        let item_id = h
            .cms
            .seed("events", fields(&[("eventid", "E1"), ("name", "Spring Rally")]));
        h.source.publish(SourceEntity {
            is_published: false,
            ..spring_rally()
        });

        let outcome = h.reconciler.run("E1", ChangeType::Update).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Unpublished { item_id });
        assert!(h.cms.items("locations").is_empty());
    }

    #[tokio::test]
    async fn draft_item_is_only_redrafted() {
        let h = harness();
        h.cms.seed_draft("events", fields(&[("eventid", "E1")]));

        let outcome = h.reconciler.run("E1", ChangeType::Update).await.unwrap();

        assert!(matches!(outcome, ReconcileOutcome::Unpublished { .. }));
        assert_eq!(h.cms.write_log(), vec!["PATCH events"]);
    }

    #[tokio::test]
    async fn absent_everywhere_is_a_no_op() {
        let h = harness();

        let outcome = h.reconciler.run("E404", ChangeType::Update).await.unwrap();

        assert_eq!(
            outcome,
            ReconcileOutcome::Skipped {
                reason: NoopReason::NothingToUnpublish
            }
        );
        assert!(h.cms.write_log().is_empty());
    }

    #[tokio::test]
    async fn delete_is_terminal() {
        let h = harness();
        h.source.publish(spring_rally());
        let created = h.reconciler.run("E1", ChangeType::Create).await.unwrap();
        let calls_before_delete = h.source.calls();

        let deleted = h.reconciler.run("E1", ChangeType::Delete).await.unwrap();
        assert_eq!(
            deleted,
            ReconcileOutcome::Deleted {
                item_id: created.item_id().unwrap().to_string()
            }
        );
        assert_eq!(h.source.calls(), calls_before_delete);
        assert!(h.cms.items("events").is_empty());

        h.source.withdraw("E1");
        let later = h.reconciler.run("E1", ChangeType::Update).await.unwrap();
        assert_eq!(
            later,
            ReconcileOutcome::Skipped {
                reason: NoopReason::NothingToUnpublish
            }
        );

        let again = h.reconciler.run("E1", ChangeType::Delete).await.unwrap();
        assert_eq!(
            again,
            ReconcileOutcome::Skipped {
                reason: NoopReason::NothingToDelete
            }
        );
        assert!(h.cms.items("events").is_empty());
    }

    #[tokio::test]
    async fn held_lock_means_no_create() {
        let h = harness();
        h.source.publish(SourceEntity::published("E1", "Spring Rally"));
        assert!(h.lock.try_acquire("create:event:E1", TTL).await.unwrap().is_some());

        let outcome = h.reconciler.run("E1", ChangeType::Create).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::LockContended);
        assert!(h.cms.items("events").is_empty());
        assert!(h.lock.is_held("create:event:E1"));
    }

    #[tokio::test]
    async fn item_created_while_waiting_for_lock_is_updated() {
        let h = harness();
        let existing = h.cms.seed("events", fields(&[("eventid", "E1")]));
        let data = mapper::map_event(&spring_rally(), &ResolvedRefs::default());

        let outcome = h.reconciler.create_locked("E1", &data).await.unwrap();

        assert_eq!(
            outcome,
            ReconcileOutcome::Updated {
                item_id: existing.clone()
            }
        );
        assert_eq!(h.cms.items("events").len(), 1);
        assert_eq!(
            h.cms.item("events", &existing).unwrap().field_data["name"],
            "Spring Rally"
        );
        assert!(!h.lock.is_held("create:event:E1"));
    }

    #[tokio::test]
    async fn failed_create_propagates_and_releases_lock() {
        let h = harness();
        h.source.publish(SourceEntity::published("E1", "Spring Rally"));
        h.cms
            .reject_creates("events", 400, r#"{"message":"Validation Error"}"#);

        let err = h
            .reconciler
            .run("E1", ChangeType::Create)
            .await
            .unwrap_err();

        assert_eq!(err.action(), "create event");
        assert!(err.to_string().contains("Validation Error"));
        assert!(!h.lock.is_held("create:event:E1"));
        assert!(h.cms.items("events").is_empty());
    }

    #[tokio::test]
    async fn read_failure_stops_the_run() {
        let h = harness();
        h.source.publish(spring_rally());
        h.cms.respond_next(500, "upstream exploded");

        let err = h
            .reconciler
            .run("E1", ChangeType::Update)
            .await
            .unwrap_err();

        assert_eq!(err.action(), "read events");
        assert!(h.cms.write_log().is_empty());
    }

    #[tokio::test]
    async fn source_failure_stops_before_any_cms_call() {
        let h = harness();
        h.source.fail_next(SourceError::Timeout);

        let err = h
            .reconciler
            .run("E1", ChangeType::Update)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Source(SourceError::Timeout)));
        assert_eq!(h.cms.request_count(), 0);
    }

    #[tokio::test]
    async fn existing_references_are_reused_and_ordered() {
        let h = harness();
        let rally = h.cms.seed(
            "categories",
            fields(&[("categoryid", "C1"), ("name", "Rally"), ("slug", "rally")]),
        );
        h.source.publish(SourceEntity {
            categories: vec![Category::new("C1", "Rally"), Category::new("C2", "Snow")],
            airports: vec![Airport::new("A1", "Vienna")],
            ..SourceEntity::published("E1", "Spring Rally")
        });

        let outcome = h.reconciler.run("E1", ChangeType::Update).await.unwrap();

        let item_id = outcome.item_id().unwrap().to_string();
        let categories = h.cms.items("categories");
        assert_eq!(categories.len(), 2);
        let snow = categories[1].id.clone();
        let airport = h.cms.items("airports")[0].id.clone();

        let event = h.cms.item("events", &item_id).unwrap();
        assert_eq!(event.field_data["categorie"], json!([rally, snow]));
        assert_eq!(event.field_data["airport"], json!([airport]));
        assert_eq!(event.field_data["location"], json!([]));
    }

    #[tokio::test]
    async fn repeated_reference_is_written_once() {
        let h = harness();
        h.source.publish(SourceEntity {
            categories: vec![Category::new("C1", "Rally"), Category::new("C1", "Rally")],
            ..SourceEntity::published("E1", "Spring Rally")
        });

        let outcome = h.reconciler.run("E1", ChangeType::Create).await.unwrap();

        assert_eq!(
            h.cms.write_log(),
            vec![
                "POST categories",
                "PUBLISH categories",
                "POST events",
                "PUBLISH events"
            ]
        );
        let rally = h.cms.items("categories")[0].id.clone();
        let event = h.cms.item("events", outcome.item_id().unwrap()).unwrap();
        assert_eq!(event.field_data["categorie"], json!([rally]));
    }

    #[tokio::test]
    async fn unknown_change_type_is_treated_as_update() {
        let h = harness();
        h.source.publish(spring_rally());

        let outcome = h
            .reconciler
            .run("E1", ChangeType::from("Touched"))
            .await
            .unwrap();

        assert!(matches!(outcome, ReconcileOutcome::Created { .. }));
    }

    #[tokio::test]
    async fn throttled_writes_are_retried_transparently() {
        let h = harness();
        h.source.publish(SourceEntity::published("E1", "Spring Rally"));
        h.cms.throttle_next(None);
        h.cms.throttle_next(Some(Duration::from_secs(2)));

        let outcome = h.reconciler.run("E1", ChangeType::Create).await.unwrap();

        assert!(matches!(outcome, ReconcileOutcome::Created { .. }));
        assert_eq!(h.cms.items("events").len(), 1);
    }
}
