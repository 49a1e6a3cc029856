//! `tempo-scheduler` — validation, trigger registry, and reconciliation
//! for change-feed-driven schedules.
//!
//! # Overview
//!
//! Schedule objects are authored externally and live in the durable
//! object store. This crate turns them into live timers: the
//! [`validator`] checks shape, [`recurrence::FirePolicy`] compiles the
//! time/date/repeat fields into a concrete fire-time policy, and the
//! [`registry::TriggerRegistry`] runs one tokio task per active
//! schedule. Each fire persists a `schedule_event` object through the
//! [`emitter::EventEmitter`]; one-shot schedules retire themselves and
//! their stored object afterwards.
//!
//! [`service::Scheduler`] ties it together: both the change-feed bridge
//! and startup reconciliation go through the same
//! validate → compile → register pipeline so behavior never diverges.
//!
//! # Cadences
//!
//! | `repeat`  | Behaviour                                        |
//! |-----------|--------------------------------------------------|
//! | absent    | Single fire at `date` + `time`, then self-retire |
//! | `daily`   | Every day at `time`                              |
//! | `weekly`  | Every week on `date.day_of_week` (0 = Sunday)    |
//! | `monthly` | Every month on `date.day`                        |
//! | `yearly`  | Every year on `date.month`/`date.day`            |

pub mod emitter;
pub mod recurrence;
pub mod registry;
pub mod service;
pub mod types;
pub mod validator;

pub use emitter::EventEmitter;
pub use recurrence::FirePolicy;
pub use registry::TriggerRegistry;
pub use service::Scheduler;
pub use types::{Repeat, Schedule, ScheduleEvent};
pub use validator::{validate, ValidationReport};
