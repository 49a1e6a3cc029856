use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};

use crate::types::{Repeat, Schedule};

/// Fast-mode cadence: every recurring schedule fires once per second.
const FAST_INTERVAL_SECS: u64 = 1;
/// Fast-mode one-shot delay from now, in seconds.
const FAST_ONE_SHOT_SECS: i64 = 1;

/// A concrete fire-time policy compiled from a validated schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirePolicy {
    /// Single fire at an absolute UTC instant.
    Once { at: DateTime<Utc> },
    /// Fixed interval; only produced in fast mode.
    Interval { every_secs: u64 },
    /// Every day at the given UTC time.
    Daily { hour: u32, minute: u32, second: u32 },
    /// Every week on `day_of_week` (0 = Sunday).
    Weekly {
        day_of_week: u32,
        hour: u32,
        minute: u32,
        second: u32,
    },
    /// Every month on `day`; months without that day are skipped.
    Monthly {
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    },
    /// Every year on `month` (0 = January) / `day`.
    Yearly {
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    },
}

impl FirePolicy {
    /// Compile a validated schedule into a policy.
    ///
    /// In fast mode recurring cadences collapse to one fire per second
    /// and one-shots to one second from now, so integration tests run
    /// in seconds instead of waiting for calendar alignment.
    ///
    /// Returns `None` when the fields do not resolve to a real instant;
    /// validation makes that unreachable for accepted schedules, but
    /// callers skip rather than panic.
    pub fn compile(schedule: &Schedule, fast_mode: bool) -> Option<FirePolicy> {
        let time = schedule.time;
        let date = schedule.date.unwrap_or_default();

        let policy = match schedule.repeat {
            Some(Repeat::Daily) => FirePolicy::Daily {
                hour: time.hour,
                minute: time.minute,
                second: time.second,
            },
            Some(Repeat::Weekly) => FirePolicy::Weekly {
                day_of_week: date.day_of_week?,
                hour: time.hour,
                minute: time.minute,
                second: time.second,
            },
            Some(Repeat::Monthly) => FirePolicy::Monthly {
                day: date.day?,
                hour: time.hour,
                minute: time.minute,
                second: time.second,
            },
            Some(Repeat::Yearly) => FirePolicy::Yearly {
                month: date.month?,
                day: date.day?,
                hour: time.hour,
                minute: time.minute,
                second: time.second,
            },
            None => {
                if fast_mode {
                    return Some(FirePolicy::Once {
                        at: Utc::now() + Duration::seconds(FAST_ONE_SHOT_SECS),
                    });
                }
                let at = Utc
                    .with_ymd_and_hms(
                        date.year?,
                        date.month? + 1,
                        date.day?,
                        time.hour,
                        time.minute,
                        time.second,
                    )
                    .single()?;
                return Some(FirePolicy::Once { at });
            }
        };

        if fast_mode {
            Some(FirePolicy::Interval {
                every_secs: FAST_INTERVAL_SECS,
            })
        } else {
            Some(policy)
        }
    }

    /// Compute the next occurrence strictly after `from`.
    ///
    /// Returns `None` when the policy is exhausted (a `Once` whose
    /// instant has passed).
    pub fn next_fire(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match *self {
            FirePolicy::Once { at } => (at > from).then_some(at),

            FirePolicy::Interval { every_secs } => Some(from + Duration::seconds(every_secs as i64)),

            FirePolicy::Daily {
                hour,
                minute,
                second,
            } => {
                let candidate = Utc
                    .with_ymd_and_hms(from.year(), from.month(), from.day(), hour, minute, second)
                    .single()?;
                if candidate > from {
                    Some(candidate)
                } else {
                    // Today's window has passed — advance to tomorrow.
                    Some(candidate + Duration::days(1))
                }
            }

            FirePolicy::Weekly {
                day_of_week,
                hour,
                minute,
                second,
            } => {
                let today = from.weekday().num_days_from_sunday();
                let days_ahead = (day_of_week + 7 - today) % 7;
                let day = from + Duration::days(days_ahead as i64);
                let candidate = Utc
                    .with_ymd_and_hms(day.year(), day.month(), day.day(), hour, minute, second)
                    .single()?;
                if candidate > from {
                    Some(candidate)
                } else {
                    Some(candidate + Duration::days(7))
                }
            }

            FirePolicy::Monthly {
                day,
                hour,
                minute,
                second,
            } => {
                // Walk forward month by month until `day` exists and the
                // instant is ahead. Day 31 only matches 31-day months.
                let mut year = from.year();
                let mut month = from.month();
                for _ in 0..48 {
                    if let Some(candidate) = Utc
                        .with_ymd_and_hms(year, month, day, hour, minute, second)
                        .single()
                    {
                        if candidate > from {
                            return Some(candidate);
                        }
                    }
                    month += 1;
                    if month > 12 {
                        month = 1;
                        year += 1;
                    }
                }
                None
            }

            FirePolicy::Yearly {
                month,
                day,
                hour,
                minute,
                second,
            } => {
                // Feb 29 recurs at most every 8 years.
                for offset in 0..=8 {
                    if let Some(candidate) = Utc
                        .with_ymd_and_hms(from.year() + offset, month + 1, day, hour, minute, second)
                        .single()
                    {
                        if candidate > from {
                            return Some(candidate);
                        }
                    }
                }
                None
            }
        }
    }
}
