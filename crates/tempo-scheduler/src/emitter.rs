use std::sync::Arc;

use tracing::{debug, error};

use tempo_store::ObjectStore;

use crate::types::{Schedule, ScheduleEvent};

/// Persists one `schedule_event` per fire and retires one-shot schedules.
///
/// Delivery is at-most-once, best-effort: a failed create is logged and
/// the occurrence is lost. There is deliberately no retry and no
/// dead-letter; a missed fire while the store is down is an accepted
/// limitation of the service.
#[derive(Clone)]
pub struct EventEmitter {
    store: Arc<dyn ObjectStore>,
}

impl EventEmitter {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Fire once: persist the event record, then delete the source
    /// schedule if it was a one-shot. Failures on either step are
    /// logged and never propagate into the timer loop.
    pub async fn fire(&self, schedule: &Schedule) {
        let event = ScheduleEvent::from_schedule(schedule);
        match serde_json::to_value(&event) {
            Ok(payload) => match self.store.create_object(payload).await {
                Ok(_) => {
                    debug!(
                        schedule_id = %schedule.id,
                        listener = %schedule.listener,
                        "schedule event emitted"
                    );
                }
                Err(e) => {
                    error!(
                        schedule_id = %schedule.id,
                        listener = %schedule.listener,
                        error = %e,
                        "schedule event not emitted"
                    );
                }
            },
            Err(e) => {
                error!(schedule_id = %schedule.id, error = %e, "schedule event not serializable");
            }
        }

        if schedule.is_one_shot() {
            if let Err(e) = self.store.delete_object(&schedule.id).await {
                error!(
                    schedule_id = %schedule.id,
                    error = %e,
                    "one-shot schedule not deleted"
                );
            }
        }
    }
}
