//! End-to-end firing behavior in fast mode against an in-memory store.
//!
//! Fast mode collapses every cadence to ~1 s, so each test observes
//! real firings within a couple of seconds of wall time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use tempo_scheduler::Scheduler;
use tempo_store::{FeedEvent, FeedMethod, ObjectStore, SearchIndex, StoreError};

/// In-memory object store + search index standing in for the durable
/// backend.
#[derive(Default)]
struct MemStore {
    objects: Mutex<HashMap<String, Value>>,
    seq: AtomicU64,
}

impl MemStore {
    fn seed(&self, id: &str, mut object: Value) {
        object["id"] = json!(id);
        self.objects
            .lock()
            .unwrap()
            .insert(id.to_string(), object);
    }

    fn contains(&self, id: &str) -> bool {
        self.objects.lock().unwrap().contains_key(id)
    }

    /// Every persisted `schedule_event`, in creation order.
    fn events(&self) -> Vec<Value> {
        let objects = self.objects.lock().unwrap();
        let mut events: Vec<(String, Value)> = objects
            .iter()
            .filter(|(_, o)| o["object_type"] == json!("schedule_event"))
            .map(|(id, o)| (id.clone(), o.clone()))
            .collect();
        events.sort_by(|a, b| a.0.cmp(&b.0));
        events.into_iter().map(|(_, o)| o).collect()
    }
}

#[async_trait]
impl ObjectStore for MemStore {
    async fn create_object(&self, mut object: Value) -> tempo_store::Result<Value> {
        let id = format!("obj-{:06}", self.seq.fetch_add(1, Ordering::Relaxed));
        object["id"] = json!(id);
        self.objects
            .lock()
            .unwrap()
            .insert(id, object.clone());
        Ok(object)
    }

    async fn get_object(&self, id: &str) -> tempo_store::Result<Value> {
        self.objects
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    async fn delete_object(&self, id: &str) -> tempo_store::Result<()> {
        self.objects
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }
}

#[async_trait]
impl SearchIndex for MemStore {
    async fn search(
        &self,
        object: &str,
        count: usize,
        after: Option<&str>,
    ) -> tempo_store::Result<Vec<String>> {
        let objects = self.objects.lock().unwrap();
        let mut ids: Vec<String> = objects
            .iter()
            .filter(|(_, o)| o["object_type"] == json!(object))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        if let Some(after) = after {
            ids.retain(|id| id.as_str() > after);
        }
        ids.truncate(count);
        Ok(ids)
    }
}

fn fast_scheduler(store: &Arc<MemStore>) -> Scheduler {
    let store_dyn: Arc<dyn ObjectStore> = Arc::clone(store) as Arc<dyn ObjectStore>;
    let search_dyn: Arc<dyn SearchIndex> = Arc::clone(store) as Arc<dyn SearchIndex>;
    Scheduler::new(store_dyn, search_dyn, true)
}

fn post_event(object: Value) -> FeedEvent {
    FeedEvent {
        method: FeedMethod::Post,
        current: Some(object),
        previous: None,
    }
}

fn delete_event(object: Value) -> FeedEvent {
    FeedEvent {
        method: FeedMethod::Delete,
        current: None,
        previous: Some(object),
    }
}

fn one_shot(id: &str) -> Value {
    json!({
        "id": id,
        "object_type": "schedule",
        "listener": "L",
        "time": {"hour": 10, "minute": 0, "second": 0},
        "date": {"year": 2030, "month": 0, "day": 1},
    })
}

fn weekly(id: &str) -> Value {
    json!({
        "id": id,
        "object_type": "schedule",
        "listener": "L",
        "schedule_code": "C1",
        "repeat": "weekly",
        "time": {"hour": 9, "minute": 30, "second": 0},
        "date": {"day_of_week": 3},
    })
}

#[tokio::test]
async fn one_shot_fires_exactly_once_and_retires() {
    let store = Arc::new(MemStore::default());
    store.seed("sched-1", one_shot("sched-1"));
    let scheduler = fast_scheduler(&store);

    scheduler.handle_event(&post_event(one_shot("sched-1")));
    assert!(scheduler.registry().contains("sched-1"));

    tokio::time::sleep(Duration::from_millis(1600)).await;

    let events = store.events();
    assert_eq!(events.len(), 1, "exactly one event per one-shot fire");
    assert_eq!(events[0]["schedule"], json!("sched-1"));
    assert_eq!(events[0]["listener"], json!("L"));
    assert!(events[0].get("schedule_code").is_none());

    // The schedule retired itself: gone from the store and the registry.
    assert!(!store.contains("sched-1"));
    assert!(!scheduler.registry().contains("sched-1"));

    // No further firings inside the observation window.
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(store.events().len(), 1);

    scheduler.clear();
}

#[tokio::test]
async fn recurring_fires_repeatedly_with_identical_payload() {
    let store = Arc::new(MemStore::default());
    store.seed("sched-w", weekly("sched-w"));
    let scheduler = fast_scheduler(&store);

    scheduler.handle_event(&post_event(weekly("sched-w")));

    tokio::time::sleep(Duration::from_millis(2600)).await;

    let events = store.events();
    assert!(events.len() >= 2, "expected >=2 fires, got {}", events.len());
    for event in &events {
        assert_eq!(event["schedule"], json!("sched-w"));
        assert_eq!(event["listener"], json!("L"));
        assert_eq!(event["schedule_code"], json!("C1"));
    }

    // Recurring schedules never retire themselves.
    assert!(store.contains("sched-w"));
    assert!(scheduler.registry().contains("sched-w"));

    scheduler.clear();
}

#[tokio::test]
async fn delete_stops_a_pending_trigger() {
    let store = Arc::new(MemStore::default());
    store.seed("sched-d", weekly("sched-d"));
    let scheduler = fast_scheduler(&store);

    scheduler.handle_event(&post_event(weekly("sched-d")));
    tokio::time::sleep(Duration::from_millis(200)).await;

    scheduler.handle_event(&delete_event(weekly("sched-d")));
    assert!(!scheduler.registry().contains("sched-d"));
    let fired_before = store.events().len();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(
        store.events().len(),
        fired_before,
        "no fire may land after a successful delete"
    );

    scheduler.clear();
}

#[tokio::test]
async fn invalid_schedules_never_fire() {
    let store = Arc::new(MemStore::default());
    let scheduler = fast_scheduler(&store);

    // day 40 is outside [1,31] — rejected by validation.
    scheduler.handle_event(&post_event(json!({
        "id": "sched-bad",
        "object_type": "schedule",
        "listener": "L",
        "repeat": "monthly",
        "time": {"hour": 0, "minute": 0, "second": 0},
        "date": {"day": 40},
    })));

    assert!(scheduler.registry().is_empty());
    tokio::time::sleep(Duration::from_millis(1300)).await;
    assert!(store.events().is_empty());
}

#[tokio::test]
async fn non_schedule_events_fall_through() {
    let store = Arc::new(MemStore::default());
    let scheduler = fast_scheduler(&store);

    // The emitter's own writes come back through the feed as
    // schedule_event objects; the bridge must ignore them.
    scheduler.handle_event(&post_event(json!({
        "id": "ev-1",
        "object_type": "schedule_event",
        "schedule": "sched-1",
        "listener": "L",
    })));
    assert!(scheduler.registry().is_empty());

    // A delete of a non-schedule object is equally irrelevant.
    scheduler.handle_event(&delete_event(json!({
        "id": "ev-1",
        "object_type": "schedule_event",
    })));
    assert!(scheduler.registry().is_empty());
}

#[tokio::test]
async fn reconciliation_registers_stored_schedules_and_is_idempotent() {
    let store = Arc::new(MemStore::default());
    store.seed("sched-a", weekly("sched-a"));
    store.seed("sched-b", one_shot("sched-b"));
    // Stored invalid data is dead, not fatal.
    store.seed(
        "sched-c",
        json!({
            "object_type": "schedule",
            "listener": "L",
            "repeat": "monthly",
            "time": {"hour": 0, "minute": 0, "second": 0},
            "date": {"day": 40},
        }),
    );
    let scheduler = fast_scheduler(&store);

    scheduler.reconcile_all().await;
    assert_eq!(scheduler.registry().len(), 2);
    assert!(scheduler.registry().contains("sched-a"));
    assert!(scheduler.registry().contains("sched-b"));
    assert!(!scheduler.registry().contains("sched-c"));

    // Running again over the same stored set changes nothing.
    scheduler.reconcile_all().await;
    assert_eq!(scheduler.registry().len(), 2);

    scheduler.clear();
    assert!(scheduler.registry().is_empty());
}

#[tokio::test]
async fn update_by_replace_keeps_a_single_trigger() {
    let store = Arc::new(MemStore::default());
    store.seed("sched-u", weekly("sched-u"));
    let scheduler = fast_scheduler(&store);

    scheduler.handle_event(&post_event(weekly("sched-u")));
    // The authoring side saves again — same id, new revision.
    let mut updated = weekly("sched-u");
    updated["schedule_code"] = json!("C2");
    scheduler.handle_event(&post_event(updated));

    assert_eq!(scheduler.registry().len(), 1);

    tokio::time::sleep(Duration::from_millis(1600)).await;
    let events = store.events();
    assert!(!events.is_empty());
    for event in &events {
        assert_eq!(event["schedule_code"], json!("C2"));
    }

    scheduler.clear();
}
