//! Record store lifecycle tests against the in-memory executor

use super::*;
use crate::associations::{Associations, DependentRecords, JoinTableCleanup};
use crate::entity::{is_truthy, Entity, Record, Row};
use crate::executor::MemoryExecutor;
use crate::options::DeleteOptions;
use crate::query_builder::SortOrder;
use crate::rules::{RuleSet, RulesChecker};
use serde_json::json;
use signal_system::{DatabaseEvent, EventResult, EventType, SignalManager};
use std::sync::Mutex;

fn row(value: Value) -> Row {
    value.as_object().cloned().unwrap()
}

fn article(id: i64, active: i64) -> Record {
    Record::persisted(row(json!({"id": id, "title": format!("Article {id}"), "active": active})))
}

/// `articles` with `{id=1, active=1}` and `{id=2, active=0}`
fn setup() -> (Arc<MemoryExecutor>, RecordStore) {
    let db = Arc::new(MemoryExecutor::new());
    db.create_table("articles", &["id", "title", "active"]);
    db.insert("articles", article(1, 1).into_fields()).unwrap();
    db.insert("articles", article(2, 0).into_fields()).unwrap();

    let store = RecordStore::new("articles", &["id"], db.clone(), db.clone()).unwrap();
    (db, store)
}

fn recorded_events(signals: &SignalManager) -> Arc<Mutex<Vec<DatabaseEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    signals.add_callback(move |event| {
        sink.lock().unwrap().push(event.clone());
        EventResult::Continue
    });
    events
}

async fn stored(store: &RecordStore, id: i64) -> Option<Row> {
    let query = store
        .query()
        .await
        .unwrap()
        .with_inactive()
        .filter(QueryFilter::eq("id", id));
    store.find_one(query).await.unwrap()
}

// ========================================
// Field resolution
// ========================================

#[tokio::test]
async fn test_field_resolution() {
    let (_, store) = setup();
    assert_eq!(store.soft_delete_field().await.unwrap().as_str(), "active");

    let misconfigured = store.clone().with_field("deleted");
    let err = misconfigured.soft_delete_field().await.unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(
        err.to_string(),
        "Configured field `deleted` is missing from the table `articles`."
    );

    // Surfaces from every operation, before anything is written
    let mut entity = article(1, 1);
    let err = misconfigured
        .soft_delete(&mut entity, &DeleteOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingColumn { .. }));
    assert!(misconfigured.exists(vec![]).await.is_err());
}

// ========================================
// Soft delete
// ========================================

#[tokio::test]
async fn test_soft_delete_hides_row_from_default_reads() {
    let (_, store) = setup();
    let mut entity = article(1, 1);

    assert!(store
        .soft_delete(&mut entity, &DeleteOptions::default())
        .await
        .unwrap());
    assert_eq!(entity.get("active"), Some(&json!(false)));

    assert_eq!(store.get(&[json!(1)]).await.unwrap(), None);
    let row = stored(&store, 1).await.unwrap();
    assert_eq!(row["active"], json!(false));
}

#[tokio::test]
async fn test_soft_delete_of_inactive_entity_skips_update() {
    let (db, store) = setup();
    let mut entity = article(2, 0);

    let outcome = store
        .soft_delete_detailed(&mut entity, &DeleteOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome, DeleteOutcome::AlreadyInactive);
    assert!(outcome.succeeded());
    assert_eq!(db.count_operations("update"), 0);
}

#[tokio::test]
async fn test_soft_delete_with_unloaded_field_issues_update() {
    let (db, store) = setup();
    let mut entity = Record::persisted(row(json!({"id": 1})));

    let outcome = store
        .soft_delete_detailed(&mut entity, &DeleteOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome, DeleteOutcome::Updated { rows: 1 });
    assert_eq!(db.count_operations("update"), 1);
}

#[tokio::test]
async fn test_soft_delete_of_new_entity() {
    let (db, store) = setup();
    let signals = Arc::new(SignalManager::new());
    let events = recorded_events(&signals);
    let store = store.with_events(signals);

    let mut entity = Record::new().with("id", 3).with("active", true);
    assert!(!store
        .soft_delete(&mut entity, &DeleteOptions::default())
        .await
        .unwrap());
    assert!(events.lock().unwrap().is_empty());
    assert!(db.history().is_empty());

    // Once saved it deletes like any loaded record
    db.insert("articles", entity.fields().clone()).unwrap();
    entity.mark_persisted();
    assert!(store
        .soft_delete(&mut entity, &DeleteOptions::default())
        .await
        .unwrap());
    assert_eq!(events.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_soft_delete_requires_primary_key() {
    let (db, store) = setup();
    let mut entity = Record::persisted(row(json!({"title": "No id", "active": 1})));

    let err = store
        .soft_delete(&mut entity, &DeleteOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidArgument(_)));
    assert!(db.history().is_empty());
}

#[tokio::test]
async fn test_soft_delete_of_missing_row() {
    let (db, store) = setup();
    let signals = Arc::new(SignalManager::new());
    let events = recorded_events(&signals);
    let store = store.with_events(signals);

    let mut entity = article(42, 1);
    let outcome = store
        .soft_delete_detailed(&mut entity, &DeleteOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome, DeleteOutcome::NoRowsAffected);
    assert_eq!(db.count_operations("update"), 1);

    // In-memory state untouched and no after-delete
    assert_eq!(entity.get("active"), Some(&json!(1)));
    let names: Vec<_> = events.lock().unwrap().iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["Model.beforeDelete"]);
}

// ========================================
// Events and rules
// ========================================

#[tokio::test]
async fn test_before_delete_stop_short_circuits() {
    let (db, store) = setup();
    let signals = Arc::new(SignalManager::new());
    signals.on(EventType::BeforeDelete, |_| EventResult::stop(false));
    let store = store.with_events(signals);

    let mut entity = article(1, 1);
    let outcome = store
        .soft_delete_detailed(&mut entity, &DeleteOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome, DeleteOutcome::Vetoed(false));
    assert!(!outcome.succeeded());

    assert_eq!(db.count_operations("update"), 0);
    assert_eq!(stored(&store, 1).await.unwrap()["active"], json!(1));
}

#[tokio::test]
async fn test_before_delete_stop_with_truthy_result() {
    let (db, store) = setup();
    let signals = Arc::new(SignalManager::new());
    signals.on(EventType::BeforeDelete, |_| EventResult::stop(true));
    let store = store.with_events(signals);

    let mut entity = article(1, 1);
    assert!(store
        .soft_delete(&mut entity, &DeleteOptions::default())
        .await
        .unwrap());
    assert_eq!(db.count_operations("update"), 0);
}

#[tokio::test]
async fn test_events_carry_entity_and_options() {
    let (_, store) = setup();
    let signals = Arc::new(SignalManager::new());
    let events = recorded_events(&signals);
    let store = store.with_events(signals);

    let mut entity = article(1, 1);
    let options = DeleteOptions::default().with("reason", "spam");
    store.soft_delete(&mut entity, &options).await.unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 2);

    let before = &events[0];
    assert_eq!(before.event_type, EventType::BeforeDelete);
    assert_eq!(before.table_name, "articles");
    assert_eq!(before.record_id.as_deref(), Some("1"));
    assert_eq!(before.entity().unwrap()["active"], json!(1));
    assert_eq!(before.options().unwrap()["reason"], json!("spam"));
    assert_eq!(before.options().unwrap()["_primary"], json!(true));

    let after = &events[1];
    assert_eq!(after.event_type, EventType::AfterDelete);
    assert_eq!(after.entity().unwrap()["active"], json!(false));
}

#[tokio::test]
async fn test_failing_after_delete_handler_propagates() {
    let (_, store) = setup();
    let signals = Arc::new(SignalManager::new());
    signals.add_async_callback(Some(EventType::AfterDelete), |_| {
        Box::pin(async { Err::<EventResult, _>(anyhow::anyhow!("audit log unavailable")) })
    });
    let store = store.with_events(signals);

    let mut entity = article(1, 1);
    let err = store
        .soft_delete(&mut entity, &DeleteOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Collaborator(_)));
    assert_eq!(err.to_string(), "audit log unavailable");
}

#[tokio::test]
async fn test_delete_rules() {
    let (db, store) = setup();
    let rules = Arc::new(RulesChecker::new());
    rules.add(RuleSet::Delete, "never", |_, _| Ok(false));
    let store = store.with_rules(rules);

    let mut entity = article(1, 1);
    let outcome = store
        .soft_delete_detailed(&mut entity, &DeleteOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome, DeleteOutcome::RulesFailed);
    assert_eq!(db.count_operations("update"), 0);

    // Rules are skipped on request
    assert!(store
        .soft_delete(&mut entity, &DeleteOptions::new().check_rules(false))
        .await
        .unwrap());
}

// ========================================
// Hard delete and restore
// ========================================

#[tokio::test]
async fn test_hard_delete_removes_row() {
    let (_, store) = setup();
    let mut entity = article(1, 1);

    assert!(store
        .hard_delete(&mut entity, &DeleteOptions::default())
        .await
        .unwrap());
    assert_eq!(stored(&store, 1).await, None);
    assert!(!store.exists(vec![QueryFilter::eq("id", 1)]).await.unwrap());
}

#[tokio::test]
async fn test_hard_delete_stops_when_soft_delete_fails() {
    let (db, store) = setup();
    let signals = Arc::new(SignalManager::new());
    signals.on(EventType::BeforeDelete, |_| EventResult::stop(false));
    let store = store.with_events(signals);

    let mut entity = article(1, 1);
    assert!(!store
        .hard_delete(&mut entity, &DeleteOptions::default())
        .await
        .unwrap());
    assert_eq!(db.count_operations("delete"), 0);
    assert!(stored(&store, 1).await.is_some());
}

#[tokio::test]
async fn test_soft_delete_then_restore() {
    let (_, store) = setup();
    let mut entity = article(1, 1);

    store
        .soft_delete(&mut entity, &DeleteOptions::default())
        .await
        .unwrap();
    assert!(store.restore(&mut entity).await.unwrap());
    assert_eq!(entity.get("active"), Some(&json!(true)));

    let row = store.get(&[json!(1)]).await.unwrap().unwrap();
    assert_eq!(row["active"], json!(true));
}

#[tokio::test]
async fn test_restore_of_missing_row() {
    let (_, store) = setup();

    let mut entity = article(42, 0);
    let outcome = store.restore_detailed(&mut entity).await.unwrap();
    assert_eq!(outcome.rows_affected, 0);
    assert_eq!(entity.get("active"), Some(&json!(0)));

    let legacy = store.with_config(
        &SoftDeleteConfig::default().with_restore_mutates_on_failure(true),
    );
    assert!(!legacy.restore(&mut entity).await.unwrap());
    assert_eq!(entity.get("active"), Some(&json!(true)));
}

// ========================================
// Bulk operations
// ========================================

#[tokio::test]
async fn test_bulk_soft_delete_scenario() {
    let (db, store) = setup();

    assert_eq!(store.bulk_soft_delete(vec![]).await.unwrap(), 1);
    assert!(db
        .rows("articles")
        .iter()
        .all(|row| !is_truthy(&row["active"])));

    assert!(store.find(store.query().await.unwrap()).await.unwrap().is_empty());
    let everything = store.query().await.unwrap().with_inactive();
    assert_eq!(store.find(everything).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_bulk_soft_delete_without_active_guard() {
    let (_, store) = setup();
    let store = store.with_config(&SoftDeleteConfig::default().with_bulk_active_only(false));

    assert_eq!(store.bulk_soft_delete(vec![]).await.unwrap(), 2);
}

#[tokio::test]
async fn test_bulk_skips_lifecycle_hooks() {
    let (_, store) = setup();
    let signals = Arc::new(SignalManager::new());
    let events = recorded_events(&signals);
    let store = store.with_events(signals);

    store
        .bulk_soft_delete(vec![QueryFilter::eq("id", 1)])
        .await
        .unwrap();
    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_bulk_restore_and_purge() {
    let (db, store) = setup();

    assert_eq!(store.bulk_restore(vec![]).await.unwrap(), 1);
    assert_eq!(store.count(store.query().await.unwrap()).await.unwrap(), 2);

    store
        .bulk_soft_delete(vec![QueryFilter::eq("id", 2)])
        .await
        .unwrap();
    assert_eq!(store.purge_inactive(vec![]).await.unwrap(), 1);
    assert_eq!(db.rows("articles").len(), 1);
    assert!(!store.exists(vec![QueryFilter::eq("id", 2)]).await.unwrap());
}

// ========================================
// Reads
// ========================================

#[tokio::test]
async fn test_exists_ignores_active_state() {
    let (_, store) = setup();
    assert!(store.exists(vec![QueryFilter::eq("id", 2)]).await.unwrap());
    assert!(store.exists(vec![QueryFilter::eq("id", 1)]).await.unwrap());
    assert!(!store.exists(vec![QueryFilter::eq("id", 9)]).await.unwrap());
}

#[tokio::test]
async fn test_reads_apply_active_filter() {
    let (_, store) = setup();
    let query = store.query().await.unwrap();

    assert_eq!(store.count(query.clone()).await.unwrap(), 1);
    assert_eq!(store.get(&[json!(2)]).await.unwrap(), None);

    let inactive = store.find(query.only_inactive()).await.unwrap();
    assert_eq!(inactive.len(), 1);
    assert_eq!(inactive[0]["id"], json!(2));
}

#[tokio::test]
async fn test_reads_reject_foreign_queries() {
    let (db, store) = setup();
    db.create_table("tags", &["id", "active"]);
    let tags = RecordStore::new("tags", &["id"], db.clone(), db.clone()).unwrap();

    let err = store.find(tags.query().await.unwrap()).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidArgument(_)));

    let err = store.get(&[json!(1), json!(2)]).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_reads_reject_queries_on_another_field() {
    let (db, store) = setup();

    // Same table, but filtering on `title` would let inactive rows through
    let by_title = store.clone().with_field("title").query().await.unwrap();
    let err = store.find(by_title.clone()).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidArgument(_)));
    assert!(store.count(by_title).await.is_err());

    db.create_table("flags", &["id", "active", "is_enabled"]);
    for (id, active, is_enabled) in [(1, true, true), (2, true, false)] {
        db.insert(
            "flags",
            row(json!({"id": id, "active": active, "is_enabled": is_enabled})),
        )
        .unwrap();
    }
    let flags = RecordStore::new("flags", &["id"], db.clone(), db.clone())
        .unwrap()
        .with_field("is_enabled");
    let defaults = flags.clone().with_field("active").query().await.unwrap();
    assert!(flags.find(defaults).await.is_err());

    let visible = flags.find(flags.query().await.unwrap()).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0]["id"], json!(1));
}

#[tokio::test]
async fn test_expression_column_names_are_rejected() {
    let (db, store) = setup();
    let hostile = || vec![QueryFilter::eq("id = 1 OR 1", 1)];

    let query = store.query().await.unwrap().filters(hostile());
    let err = store.find(query).await.unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert!(err.is_configuration());

    let sorted = store
        .query()
        .await
        .unwrap()
        .order_by("id; DROP TABLE articles; --", SortOrder::Asc);
    assert!(matches!(
        store.find(sorted).await.unwrap_err(),
        StoreError::Validation(_)
    ));

    assert!(store.exists(hostile()).await.is_err());
    assert!(store.bulk_soft_delete(hostile()).await.is_err());
    assert!(store.bulk_restore(hostile()).await.is_err());
    assert!(store.purge_inactive(hostile()).await.is_err());

    // Nothing reached the executor and the inactive row is still hidden
    assert!(db.history().is_empty());
    assert_eq!(store.count(store.query().await.unwrap()).await.unwrap(), 1);
}

// ========================================
// Composite primary keys
// ========================================

/// `memberships` keyed by `(tenant_id, id)`, two tenants sharing `id = 1`
fn memberships(db: &Arc<MemoryExecutor>) -> RecordStore {
    db.create_table("memberships", &["tenant_id", "id", "active"]);
    for tenant_id in [7, 8] {
        db.insert(
            "memberships",
            row(json!({"tenant_id": tenant_id, "id": 1, "active": true})),
        )
        .unwrap();
    }
    RecordStore::new("memberships", &["tenant_id", "id"], db.clone(), db.clone()).unwrap()
}

fn membership(tenant_id: i64, id: i64) -> Record {
    Record::persisted(row(json!({"tenant_id": tenant_id, "id": id, "active": true})))
}

#[tokio::test]
async fn test_composite_key_lifecycle() {
    let db = Arc::new(MemoryExecutor::new());
    let signals = Arc::new(SignalManager::new());
    let events = recorded_events(&signals);
    let store = memberships(&db).with_events(signals);
    let key = vec![QueryFilter::eq("tenant_id", 7), QueryFilter::eq("id", 1)];

    let mut first = membership(7, 1);
    assert!(store
        .soft_delete(&mut first, &DeleteOptions::default())
        .await
        .unwrap());

    let history = db.history();
    let update = history.last().unwrap();
    assert_eq!(update.operation(), "update");
    assert_eq!(update.conditions(), key.as_slice());

    let record_ids: Vec<_> = events
        .lock()
        .unwrap()
        .iter()
        .map(|e| e.record_id.clone())
        .collect();
    assert_eq!(record_ids, vec![Some("7,1".to_string()); 2]);

    // The other tenant's row with the same id is untouched
    assert_eq!(store.get(&[json!(7), json!(1)]).await.unwrap(), None);
    assert!(store.get(&[json!(8), json!(1)]).await.unwrap().is_some());

    assert!(store.restore(&mut first).await.unwrap());
    assert_eq!(db.history().last().unwrap().conditions(), key.as_slice());
    assert!(store.get(&[json!(7), json!(1)]).await.unwrap().is_some());

    let mut second = membership(8, 1);
    assert!(store
        .hard_delete(&mut second, &DeleteOptions::default())
        .await
        .unwrap());
    let history = db.history();
    let delete = history.last().unwrap();
    assert_eq!(delete.operation(), "delete");
    assert_eq!(
        delete.conditions(),
        &[QueryFilter::eq("tenant_id", 8), QueryFilter::eq("id", 1)]
    );
    assert_eq!(db.rows("memberships").len(), 1);
}

#[tokio::test]
async fn test_composite_key_requires_every_column() {
    let db = Arc::new(MemoryExecutor::new());
    let store = memberships(&db);
    let partial = || Record::persisted(row(json!({"id": 1, "active": true})));

    for err in [
        store
            .soft_delete(&mut partial(), &DeleteOptions::default())
            .await
            .unwrap_err(),
        store
            .hard_delete(&mut partial(), &DeleteOptions::default())
            .await
            .unwrap_err(),
        store.restore(&mut partial()).await.unwrap_err(),
    ] {
        assert!(matches!(err, StoreError::InvalidArgument(_)));
        assert!(err.to_string().contains("tenant_id, id"));
    }

    assert!(db.history().is_empty());
    assert!(db.rows("memberships").iter().all(|r| r["active"] == json!(true)));
}

// ========================================
// Cascades
// ========================================

fn with_comments(db: &Arc<MemoryExecutor>) -> Arc<RecordStore> {
    db.create_table("comments", &["id", "article_id", "active"]);
    for (id, article_id, active) in [(10, 1, true), (11, 1, true), (12, 2, true), (13, 1, false)] {
        db.insert(
            "comments",
            row(json!({"id": id, "article_id": article_id, "active": active})),
        )
        .unwrap();
    }
    Arc::new(RecordStore::new("comments", &["id"], db.clone(), db.clone()).unwrap())
}

#[tokio::test]
async fn test_dependent_records_cascade() {
    let (db, store) = setup();
    let comments = with_comments(&db);
    let associations = Associations::new()
        .add(DependentRecords::new("Comments", comments.clone(), "article_id", "id").unwrap());
    let store = store.with_associations(Arc::new(associations));

    let mut entity = article(1, 1);
    store
        .soft_delete(&mut entity, &DeleteOptions::default())
        .await
        .unwrap();

    let active = comments.find(comments.query().await.unwrap()).await.unwrap();
    let ids: Vec<_> = active.iter().map(|r| r["id"].clone()).collect();
    assert_eq!(ids, vec![json!(12)]);
}

#[tokio::test]
async fn test_cascade_callbacks_mark_children_non_primary() {
    let (db, store) = setup();
    let signals = Arc::new(SignalManager::new());
    let events = recorded_events(&signals);

    let comments = Arc::new(
        RecordStore::clone(&with_comments(&db)).with_events(signals),
    );
    let associations = Associations::new().add(
        DependentRecords::new("Comments", comments, "article_id", "id")
            .unwrap()
            .cascade_callbacks(true),
    );
    let store = store.with_associations(Arc::new(associations));

    let mut entity = article(1, 1);
    store
        .soft_delete(&mut entity, &DeleteOptions::default())
        .await
        .unwrap();

    let events = events.lock().unwrap();
    // Comments 10 and 11; 13 was already inactive and is not loaded
    let before: Vec<_> = events
        .iter()
        .filter(|e| e.event_type == EventType::BeforeDelete)
        .collect();
    assert_eq!(before.len(), 2);
    assert!(before
        .iter()
        .all(|e| e.options().unwrap()["_primary"] == json!(false)));
}

#[tokio::test]
async fn test_cascade_runs_for_already_inactive_parent() {
    let (db, store) = setup();
    db.create_table("article_tags", &["article_id", "tag_id"]);
    db.insert("article_tags", row(json!({"article_id": 2, "tag_id": 5})))
        .unwrap();
    db.insert("article_tags", row(json!({"article_id": 1, "tag_id": 5})))
        .unwrap();

    let cleanup = JoinTableCleanup::new("article_tags", "article_id", "id", db.clone()).unwrap();
    let store = store.with_associations(Arc::new(Associations::new().add(cleanup)));

    let mut entity = article(2, 0);
    assert!(store
        .soft_delete(&mut entity, &DeleteOptions::default())
        .await
        .unwrap());

    let remaining = db.rows("article_tags");
    assert_eq!(remaining, vec![row(json!({"article_id": 1, "tag_id": 5}))]);
}
