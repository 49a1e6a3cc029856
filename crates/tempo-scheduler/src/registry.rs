use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::emitter::EventEmitter;
use crate::recurrence::FirePolicy;
use crate::types::Schedule;

/// One live trigger: the timer task plus the policy it runs.
pub struct TriggerEntry {
    handle: JoinHandle<()>,
    pub policy: FirePolicy,
}

/// In-memory map of schedule id → active timer task.
///
/// Cloning is cheap; every clone views the same registry. Timer tasks
/// hold a reference to the map so one-shot entries can remove
/// themselves before their fire is emitted.
#[derive(Clone, Default)]
pub struct TriggerRegistry {
    entries: Arc<DashMap<String, TriggerEntry>>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a timer for `schedule` under its id.
    ///
    /// Id ownership is exclusive: callers unregister an existing entry
    /// first. If one is still present it is stopped and replaced, with
    /// a warning, rather than left to double-fire.
    pub fn register(&self, schedule: &Schedule, policy: FirePolicy, emitter: EventEmitter) {
        let id = schedule.id.clone();
        let handle = tokio::spawn(run_trigger(
            Arc::clone(&self.entries),
            schedule.clone(),
            policy,
            emitter,
        ));
        if let Some(old) = self.entries.insert(id.clone(), TriggerEntry { handle, policy }) {
            warn!(schedule_id = %id, "replaced a trigger that was never unregistered");
            old.handle.abort();
        }
        debug!(schedule_id = %id, ?policy, "trigger registered");
    }

    /// Stop and drop the trigger for `id`.
    ///
    /// Returns false when nothing was registered under `id`; that is a
    /// logged, non-fatal condition (the trigger may have already
    /// retired itself).
    pub fn unregister(&self, id: &str) -> bool {
        match self.entries.remove(id) {
            Some((_, entry)) => {
                entry.handle.abort();
                debug!(schedule_id = %id, "trigger removed");
                true
            }
            None => {
                warn!(schedule_id = %id, "trigger not removed (not found)");
                false
            }
        }
    }

    /// Stop every trigger. Shutdown and test teardown only.
    pub fn clear(&self) {
        for entry in self.entries.iter() {
            entry.handle.abort();
        }
        self.entries.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Timer loop for one registered schedule.
///
/// Sleeps until the policy's next occurrence, emits, and repeats for
/// recurring cadences. One-shots remove their own registry entry
/// BEFORE emitting, so an external delete racing the fire either finds
/// nothing left to remove or aborts this task while it still sleeps —
/// a fire never lands after a successful delete.
async fn run_trigger(
    entries: Arc<DashMap<String, TriggerEntry>>,
    schedule: Schedule,
    policy: FirePolicy,
    emitter: EventEmitter,
) {
    loop {
        let now = Utc::now();
        let Some(next) = policy.next_fire(now) else {
            debug!(schedule_id = %schedule.id, "fire policy exhausted");
            break;
        };
        let delay = (next - now).to_std().unwrap_or_default();
        tokio::time::sleep(delay).await;

        if schedule.is_one_shot() {
            entries.remove(&schedule.id);
        }
        emitter.fire(&schedule).await;
        if schedule.is_one_shot() {
            break;
        }
    }
}
