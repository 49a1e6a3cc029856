use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use tempo_core::config::SEARCH_PAGE_SIZE;
use tempo_store::{FeedEvent, FeedMethod, ObjectStore, SearchIndex};

use crate::emitter::EventEmitter;
use crate::recurrence::FirePolicy;
use crate::registry::TriggerRegistry;
use crate::types::{Schedule, OBJECT_TYPE_SCHEDULE};
use crate::validator;

/// The scheduling service.
///
/// Owns the trigger registry and the single validate → compile →
/// register pipeline shared by the change-feed bridge and startup
/// reconciliation, so the two paths can never diverge.
pub struct Scheduler {
    registry: TriggerRegistry,
    store: Arc<dyn ObjectStore>,
    search: Arc<dyn SearchIndex>,
    fast_mode: bool,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        search: Arc<dyn SearchIndex>,
        fast_mode: bool,
    ) -> Self {
        Self {
            registry: TriggerRegistry::new(),
            store,
            search,
            fast_mode,
        }
    }

    pub fn registry(&self) -> &TriggerRegistry {
        &self.registry
    }

    /// Validate a schedule object and start its trigger.
    ///
    /// Returns true when a trigger was started. `log_invalid` selects
    /// the change-feed behavior (operators get the full report) over
    /// the reconciliation one (stored invalid data is silently dead).
    pub fn record(&self, object: &Value, log_invalid: bool) -> bool {
        if let Err(report) = validator::validate(object) {
            if log_invalid {
                error!(payload = %object, "{report}");
            }
            return false;
        }

        let schedule: Schedule = match serde_json::from_value(object.clone()) {
            Ok(schedule) => schedule,
            Err(e) => {
                // Shape passed validation but the typed parse did not
                // (e.g. no id). Dead data, same as failing validation.
                warn!(payload = %object, error = %e, "schedule not usable — skipped");
                return false;
            }
        };

        let Some(policy) = FirePolicy::compile(&schedule, self.fast_mode) else {
            warn!(schedule_id = %schedule.id, "schedule does not resolve to a real instant — skipped");
            return false;
        };

        // Exclusive id ownership: update-by-replace and reconcile
        // re-runs drop the live trigger before starting the new one.
        if self.registry.contains(&schedule.id) {
            self.registry.unregister(&schedule.id);
        }
        self.registry
            .register(&schedule, policy, EventEmitter::new(Arc::clone(&self.store)));
        debug!(schedule_id = %schedule.id, listener = %schedule.listener, "schedule recorded");
        true
    }

    /// Stop the trigger for a deleted schedule object.
    pub fn remove(&self, object: &Value) {
        match object.get("id").and_then(Value::as_str) {
            Some(id) => {
                self.registry.unregister(id);
            }
            None => warn!(payload = %object, "delete event carries no schedule id"),
        }
    }

    /// Change-feed bridge: translate one object mutation into a
    /// registry operation.
    ///
    /// Only `schedule`-typed snapshots matter; everything else —
    /// including the `schedule_event` objects this service writes
    /// itself — falls through untouched.
    pub fn handle_event(&self, event: &FeedEvent) {
        match event.method {
            FeedMethod::Post => {
                if let Some(current) = event.current.as_ref().filter(|o| is_schedule(o)) {
                    self.record(current, true);
                }
            }
            FeedMethod::Delete => {
                if let Some(previous) = event.previous.as_ref().filter(|o| is_schedule(o)) {
                    self.remove(previous);
                }
            }
        }
    }

    /// Drive the bridge from the feed channel until it closes.
    ///
    /// Events are applied strictly in arrival order, which serializes
    /// register/unregister per schedule id.
    pub async fn run_bridge(&self, mut rx: mpsc::Receiver<FeedEvent>) {
        while let Some(event) = rx.recv().await {
            self.handle_event(&event);
        }
        warn!("change feed channel closed — bridge stopped");
    }

    /// Startup reconciliation: rebuild the registry from stored state.
    ///
    /// Pages the search index with the last-seen id as cursor, fetches
    /// each object, and records the ones that still validate. Per-item
    /// failures are logged and skipped; only a failing search query
    /// ends the pass early. Idempotent — re-running yields the same
    /// registry contents.
    pub async fn reconcile_all(&self) {
        let mut after: Option<String> = None;
        loop {
            let ids = match self
                .search
                .search(OBJECT_TYPE_SCHEDULE, SEARCH_PAGE_SIZE, after.as_deref())
                .await
            {
                Ok(ids) => ids,
                Err(e) => {
                    error!(error = %e, "schedule search failed — reconciliation stopped");
                    return;
                }
            };
            if ids.is_empty() {
                break;
            }
            debug!(count = ids.len(), "schedule ids from search index");

            for id in &ids {
                match self.store.get_object(id).await {
                    Ok(object) => {
                        self.record(&object, false);
                    }
                    Err(e) => error!(schedule_id = %id, error = %e, "schedule fetch failed — skipped"),
                }
            }

            if ids.len() < SEARCH_PAGE_SIZE {
                break;
            }
            after = ids.last().cloned();
        }
        info!(active = self.registry.len(), "reconciliation complete");
    }

    /// Stop every trigger. Shutdown and test teardown only.
    pub fn clear(&self) {
        self.registry.clear();
    }
}

fn is_schedule(object: &Value) -> bool {
    object.get("object_type").and_then(Value::as_str) == Some(OBJECT_TYPE_SCHEDULE)
}
