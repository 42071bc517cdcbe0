//! Task model.
//!
//! Tasks live on an Eisenhower board: each one sits in a quadrant, carries an
//! energy cost (1-5) and a duration in minutes, and moves between
//! `pending`, `completed`, and `missed`.

use std::cmp::Ordering;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::record::{CollectionSchema, Entity, TASKS};
use crate::error::{Error, Result};

/// Eisenhower quadrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quadrant {
    #[serde(rename = "Q1_DO")]
    Do,
    #[serde(rename = "Q2_SCHEDULE")]
    Schedule,
    #[serde(rename = "Q3_DELEGATE")]
    Delegate,
    #[serde(rename = "Q4_ELIMINATE")]
    Eliminate,
}

impl Quadrant {
    pub const ALL: [Self; 4] = [Self::Do, Self::Schedule, Self::Delegate, Self::Eliminate];

    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Do => "Q1_DO",
            Self::Schedule => "Q2_SCHEDULE",
            Self::Delegate => "Q3_DELEGATE",
            Self::Eliminate => "Q4_ELIMINATE",
        }
    }

    /// Parse from the canonical storage string.
    #[must_use]
    pub fn from_canonical(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|q| q.as_str() == s)
    }
}

impl std::fmt::Display for Quadrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task status values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
    Missed,
}

impl TaskStatus {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Missed => "missed",
        }
    }

    /// Parse from the canonical storage string.
    #[must_use]
    pub fn from_canonical(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "missed" => Some(Self::Missed),
            _ => None,
        }
    }

    /// Status after a completion toggle.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Completed => Self::Pending,
            Self::Pending | Self::Missed => Self::Completed,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Client-generated UUID
    pub id: String,

    /// Owner
    pub user_id: String,

    pub title: String,

    pub quadrant: Quadrant,

    /// Energy cost, 1-5
    pub energy: u8,

    /// Estimated duration in minutes
    pub duration: u32,

    #[serde(default)]
    pub status: TaskStatus,

    /// Free-form due date ("Feb 4, 2025 at 10:30 AM", "Tomorrow", ...)
    #[serde(default, deserialize_with = "null_as_empty")]
    pub due: String,

    #[serde(default)]
    pub created_at: String,

    #[serde(default)]
    pub updated_at: String,
}

/// Fields supplied when creating a task.
#[derive(Debug, Clone, Serialize)]
pub struct NewTask {
    pub title: String,
    pub quadrant: Quadrant,
    pub energy: u8,
    pub duration: u32,
    pub status: TaskStatus,
    pub due: String,
}

/// Partial update for a task. Unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quadrant: Option<Quadrant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
}

impl TaskPatch {
    /// True when the patch would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.quadrant.is_none()
            && self.energy.is_none()
            && self.duration.is_none()
            && self.status.is_none()
            && self.due.is_none()
    }
}

impl Entity for Task {
    const SCHEMA: &'static CollectionSchema = &TASKS;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::invalid_record(TASKS.name, "title must not be empty"));
        }
        if !(1..=5).contains(&self.energy) {
            return Err(Error::invalid_record(
                TASKS.name,
                format!("energy must be 1-5, got {}", self.energy),
            ));
        }
        if self.duration == 0 {
            return Err(Error::invalid_record(
                TASKS.name,
                "duration must be a positive number of minutes",
            ));
        }
        Ok(())
    }

    fn ordering(a: &Self, b: &Self) -> Ordering {
        let now = Local::now().naive_local();
        due_sort_key(&a.due, now).cmp(&due_sort_key(&b.due, now))
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Due date parsing ─────────────────────────────────────────

const DATE_TIME_FORMATS: &[&str] = &[
    "%b %d, %Y at %I:%M %p",
    "%B %d, %Y at %I:%M %p",
    "%b %d %Y at %I:%M %p",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: &[&str] = &["%b %d, %Y", "%B %d, %Y", "%b %d %Y", "%Y-%m-%d"];

/// Parse a free-form due string relative to `now`.
///
/// Returns `None` for empty or unrecognized input.
#[must_use]
pub fn parse_due(due: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let due = due.trim();
    if due.is_empty() {
        return None;
    }

    if let Some(rest) = strip_prefix_ci(due, "today") {
        return Some(relative_day(now, 0, rest));
    }
    if let Some(rest) = strip_prefix_ci(due, "tomorrow") {
        return Some(relative_day(now, 1, rest));
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(due) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    for fmt in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(due, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(due, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Sort key for ascending due order; unparseable dates sort last.
#[must_use]
pub fn due_sort_key(due: &str, now: NaiveDateTime) -> NaiveDateTime {
    parse_due(due, now).unwrap_or(NaiveDateTime::MAX)
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &s[prefix.len()..])
}

/// "Today", "Tomorrow at 9:00 AM", ...
fn relative_day(now: NaiveDateTime, days: i64, rest: &str) -> NaiveDateTime {
    let date = now.date() + Duration::days(days);
    let rest = rest.trim();
    let time = rest
        .strip_prefix("at ")
        .and_then(|t| NaiveTime::parse_from_str(t.trim(), "%I:%M %p").ok());
    match time {
        Some(t) => date.and_time(t),
        None => date.and_time(now.time()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 2, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn task(due: &str) -> Task {
        Task {
            id: "t1".into(),
            user_id: "u1".into(),
            title: "Write report".into(),
            quadrant: Quadrant::Do,
            energy: 3,
            duration: 30,
            status: TaskStatus::Pending,
            due: due.into(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_parse_due_formats() {
        let at = parse_due("Feb 4, 2025 at 10:30 AM", now()).unwrap();
        assert_eq!(at.to_string(), "2025-02-04 10:30:00");

        let pm = parse_due("Feb 4, 2025 at 12:15 PM", now()).unwrap();
        assert_eq!(pm.to_string(), "2025-02-04 12:15:00");

        let date_only = parse_due("Feb 4, 2025", now()).unwrap();
        assert_eq!(date_only.to_string(), "2025-02-04 00:00:00");

        let iso = parse_due("2025-03-01", now()).unwrap();
        assert_eq!(iso.to_string(), "2025-03-01 00:00:00");

        assert!(parse_due("2025-03-01T09:00:00Z", now()).is_some());
        assert!(parse_due("", now()).is_none());
        assert!(parse_due("someday", now()).is_none());
    }

    #[test]
    fn test_parse_due_relative() {
        assert_eq!(parse_due("Today", now()), Some(now()));
        assert_eq!(
            parse_due("tomorrow", now()).unwrap().date(),
            NaiveDate::from_ymd_opt(2025, 2, 2).unwrap()
        );
        assert_eq!(
            parse_due("Tomorrow at 9:00 AM", now()).unwrap().to_string(),
            "2025-02-02 09:00:00"
        );
    }

    #[test]
    fn test_unparseable_due_sorts_last() {
        let n = now();
        assert!(due_sort_key("Feb 4, 2025", n) < due_sort_key("", n));
        assert!(due_sort_key("Today", n) < due_sort_key("whenever", n));
        assert!(due_sort_key("Today", n) < due_sort_key("Tomorrow", n));
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        assert!(task("").validate().is_ok());

        let mut t = task("");
        t.title = "   ".into();
        assert!(t.validate().is_err());

        let mut t = task("");
        t.energy = 6;
        let err = t.validate().unwrap_err();
        assert!(err.to_string().contains("energy"));

        let mut t = task("");
        t.duration = 0;
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_deserialize_remote_row() {
        let row = json!({
            "id": "t1",
            "user_id": "u1",
            "title": "Call Sam",
            "quadrant": "Q3_DELEGATE",
            "energy": 2,
            "duration": 15,
            "status": "missed",
            "due": null,
            "created_at": "2025-02-01T08:00:00.000Z",
            "updated_at": "2025-02-01T08:00:00.000Z"
        });
        let t: Task = serde_json::from_value(row).unwrap();
        assert_eq!(t.quadrant, Quadrant::Delegate);
        assert_eq!(t.status, TaskStatus::Missed);
        assert_eq!(t.due, "");
    }

    #[test]
    fn test_patch_serializes_only_set_fields() {
        let patch = TaskPatch {
            status: Some(TaskStatus::Completed),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({"status": "completed"}));
        assert!(TaskPatch::default().is_empty());
    }

    #[test]
    fn test_toggle() {
        assert_eq!(TaskStatus::Pending.toggled(), TaskStatus::Completed);
        assert_eq!(TaskStatus::Completed.toggled(), TaskStatus::Pending);
        assert_eq!(TaskStatus::Missed.toggled(), TaskStatus::Completed);
    }
}
