use serde::{Deserialize, Deserializer, Serialize};

/// `object_type` of externally authored schedule objects.
pub const OBJECT_TYPE_SCHEDULE: &str = "schedule";
/// `object_type` of the records emitted on each fire.
pub const OBJECT_TYPE_SCHEDULE_EVENT: &str = "schedule_event";

/// Recurrence cadence keywords as stored on schedule objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Repeat {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Wall-clock time of day (UTC).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

/// Calendar fields. Which ones are required depends on the cadence:
/// one-shot needs year/month/day, weekly needs day_of_week, monthly
/// needs day, yearly needs month and day.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DateSpec {
    pub year: Option<i32>,
    /// 0–11, January = 0 (wire convention of the stored objects).
    pub month: Option<u32>,
    /// 1–31.
    pub day: Option<u32>,
    /// 0–6, Sunday = 0.
    pub day_of_week: Option<u32>,
}

/// A schedule object after validation.
///
/// Parsed from the loose JSON form only once [`crate::validate`] has
/// accepted it; the typed fields here mirror the wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    pub listener: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_code: Option<String>,
    pub time: TimeOfDay,
    #[serde(default, deserialize_with = "de_repeat")]
    pub repeat: Option<Repeat>,
    #[serde(default)]
    pub date: Option<DateSpec>,
}

impl Schedule {
    /// One-shot schedules fire once and retire themselves.
    pub fn is_one_shot(&self) -> bool {
        self.repeat.is_none()
    }
}

/// Stored objects use the empty string interchangeably with a missing
/// `repeat`; both mean one-shot.
fn de_repeat<'de, D>(deserializer: D) -> Result<Option<Repeat>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some("daily") => Ok(Some(Repeat::Daily)),
        Some("weekly") => Ok(Some(Repeat::Weekly)),
        Some("monthly") => Ok(Some(Repeat::Monthly)),
        Some("yearly") => Ok(Some(Repeat::Yearly)),
        Some(other) => Err(serde::de::Error::custom(format!(
            "unknown repeat kind: {other}"
        ))),
    }
}

/// The immutable record persisted once per fire.
///
/// `listener` and `schedule_code` are copied verbatim from the source
/// schedule at fire time; the record is never mutated or deleted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEvent {
    pub object_type: String,
    /// Id of the originating schedule.
    pub schedule: String,
    pub listener: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_code: Option<String>,
}

impl ScheduleEvent {
    pub fn from_schedule(schedule: &Schedule) -> Self {
        Self {
            object_type: OBJECT_TYPE_SCHEDULE_EVENT.to_string(),
            schedule: schedule.id.clone(),
            listener: schedule.listener.clone(),
            schedule_code: schedule.schedule_code.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_minimal_one_shot() {
        let schedule: Schedule = serde_json::from_value(json!({
            "id": "s1",
            "listener": "L",
            "time": {"hour": 10, "minute": 0, "second": 0},
            "date": {"year": 2030, "month": 0, "day": 1},
        }))
        .unwrap();
        assert!(schedule.is_one_shot());
        assert_eq!(schedule.date.unwrap().month, Some(0));
    }

    #[test]
    fn empty_repeat_means_one_shot() {
        let schedule: Schedule = serde_json::from_value(json!({
            "id": "s1",
            "listener": "L",
            "repeat": "",
            "time": {"hour": 0, "minute": 0, "second": 0},
            "date": {"year": 2030, "month": 0, "day": 1},
        }))
        .unwrap();
        assert!(schedule.is_one_shot());
    }

    #[test]
    fn unknown_repeat_fails_to_parse() {
        let result: Result<Schedule, _> = serde_json::from_value(json!({
            "id": "s1",
            "listener": "L",
            "repeat": "hourly",
            "time": {"hour": 0, "minute": 0, "second": 0},
        }));
        assert!(result.is_err());
    }

    #[test]
    fn event_omits_absent_schedule_code() {
        let schedule: Schedule = serde_json::from_value(json!({
            "id": "s1",
            "listener": "L",
            "repeat": "daily",
            "time": {"hour": 9, "minute": 30, "second": 0},
        }))
        .unwrap();
        let value = serde_json::to_value(ScheduleEvent::from_schedule(&schedule)).unwrap();
        assert_eq!(value["object_type"], json!("schedule_event"));
        assert_eq!(value["schedule"], json!("s1"));
        assert!(value.get("schedule_code").is_none());
    }
}
