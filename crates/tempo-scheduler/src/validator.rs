//! Structural validation of schedule objects.
//!
//! Runs every rule and accumulates all violations instead of failing
//! fast, so an operator sees everything wrong with a schedule at once.
//! Validation never aborts a caller: the change-feed bridge logs the
//! report, reconciliation discards it.

use std::fmt;

use chrono::NaiveDate;
use serde_json::Value;

/// Every problem found in one schedule object.
///
/// `Display` renders the multi-line report that gets logged when a
/// change-feed schedule is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    problems: Vec<String>,
}

impl ValidationReport {
    pub fn problems(&self) -> &[String] {
        &self.problems
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schedule is invalid:")?;
        for problem in &self.problems {
            write!(f, "\n{problem}")?;
        }
        Ok(())
    }
}

/// Check a schedule object against every rule, accumulating violations.
///
/// Rules (all checked independently):
/// 1. `listener` must exist and be a non-empty string.
/// 2. `schedule_code`, if present, must be a string.
/// 3. `time` must exist and form a valid time-of-day.
/// 4. A recurring `repeat` other than `daily` requires a `date` with
///    the subfields its cadence needs; unrecognized kinds are invalid.
/// 5. Without `repeat`, `date` must form a real calendar date; missing
///    both is its own violation.
pub fn validate(schedule: &Value) -> Result<(), ValidationReport> {
    let mut problems = Vec::new();

    match schedule.get("listener") {
        None | Some(Value::Null) => problems.push("no listener".to_string()),
        Some(Value::String(s)) if s.is_empty() => problems.push("no listener".to_string()),
        Some(Value::String(_)) => {}
        Some(other) => problems.push(format!("listener is not a string: {other}")),
    }

    if let Some(code) = schedule.get("schedule_code") {
        if !code.is_null() && !code.is_string() {
            problems.push(format!("schedule_code is not a string: {code}"));
        }
    }

    match schedule.get("time") {
        None | Some(Value::Null) => problems.push("no time".to_string()),
        Some(time) => {
            let valid = int_in_range(time.get("hour"), 0, 23)
                && int_in_range(time.get("minute"), 0, 59)
                && int_in_range(time.get("second"), 0, 59);
            if !valid {
                problems.push(format!("invalid time: {time}"));
            }
        }
    }

    let repeat = schedule.get("repeat");
    if repeat_is_set(repeat) {
        check_recurring(schedule, repeat.unwrap_or(&Value::Null), &mut problems);
    } else {
        check_one_shot(schedule, &mut problems);
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ValidationReport { problems })
    }
}

/// Rule 4: recurring cadences. `daily` never needs a date; every other
/// recognized kind needs the date subfields it fires on.
fn check_recurring(schedule: &Value, repeat: &Value, problems: &mut Vec<String>) {
    let kind = repeat.as_str();
    if kind == Some("daily") {
        return;
    }

    let date = schedule.get("date").filter(|d| !d.is_null());
    let Some(date) = date else {
        problems.push("no date".to_string());
        return;
    };

    match kind {
        Some("weekly") => {
            if !int_in_range(date.get("day_of_week"), 0, 6) {
                problems.push(format!(
                    "invalid day_of_week: {}",
                    date.get("day_of_week").unwrap_or(&Value::Null)
                ));
            }
        }
        Some("monthly") => {
            if !int_in_range(date.get("day"), 1, 31) {
                problems.push(format!(
                    "invalid day: {}",
                    date.get("day").unwrap_or(&Value::Null)
                ));
            }
        }
        Some("yearly") => {
            if !int_in_range(date.get("day"), 1, 31) {
                problems.push(format!(
                    "invalid day: {}",
                    date.get("day").unwrap_or(&Value::Null)
                ));
            }
            if !int_in_range(date.get("month"), 0, 11) {
                problems.push(format!(
                    "invalid month: {}",
                    date.get("month").unwrap_or(&Value::Null)
                ));
            }
        }
        _ => problems.push(format!("invalid repeat: {repeat}")),
    }
}

/// Rule 5: one-shot. `date` must name a real calendar day; the 0-based
/// month convention of the stored objects applies.
fn check_one_shot(schedule: &Value, problems: &mut Vec<String>) {
    let date = schedule.get("date").filter(|d| !d.is_null());
    let Some(date) = date else {
        problems.push("no date and no repeat".to_string());
        return;
    };

    let year = date.get("year").and_then(Value::as_i64);
    let month = date.get("month").and_then(Value::as_i64);
    let day = date.get("day").and_then(Value::as_i64);
    let valid = match (year, month, day) {
        (Some(y), Some(m), Some(d)) => {
            (0..=11).contains(&m)
                && (1..=31).contains(&d)
                && i32::try_from(y).is_ok_and(|y| {
                    NaiveDate::from_ymd_opt(y, (m + 1) as u32, d as u32).is_some()
                })
        }
        _ => false,
    };
    if !valid {
        problems.push(format!("invalid date: {date}"));
    }
}

/// Absent, null, `""`, `false` and `0` all mean "no repeat" — the
/// stored objects are loose about this, so the check is too.
fn repeat_is_set(repeat: Option<&Value>) -> bool {
    match repeat {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        Some(_) => true,
    }
}

fn int_in_range(value: Option<&Value>, lo: i64, hi: i64) -> bool {
    value
        .and_then(Value::as_i64)
        .is_some_and(|n| (lo..=hi).contains(&n))
}
