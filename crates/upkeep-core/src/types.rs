use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{CoreError, Result};

/// Default cadence applied when a create request omits `frequency_days`.
pub const DEFAULT_FREQUENCY_DAYS: u32 = 7;

/// Longest accepted cadence: one hundred years.
pub const MAX_FREQUENCY_DAYS: u32 = 36_500;

/// Latest calendar year a due date may fall in.
pub const MAX_DUE_YEAR: i32 = 9999;

/// Opaque task identifier (UUIDv7, so ids sort by creation time).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A recurring maintenance item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    /// Cadence in whole days, always >= 1.
    pub frequency_days: u32,
    /// Calendar date, serialised as `YYYY-MM-DD`.
    pub next_due_date: NaiveDate,
    pub is_active: bool,
    /// RFC 3339 timestamps.
    pub created_at: String,
    pub updated_at: String,
}

/// Record that a task was performed. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionLog {
    pub id: String,
    pub task_id: TaskId,
    pub completed_by: String,
    pub notes: Option<String>,
    /// Assigned by the store at insert time.
    pub completed_at: String,
}

/// A completion log joined with its task's title, as returned by `GET /api/logs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(flatten)]
    pub log: CompletionLog,
    pub task_title: String,
}

/// One overdue email per task per UTC day.
///
/// The row is written when a run claims the day's slot, before the email is
/// handed to the provider, and removed again if the send fails. `sent_at` is
/// therefore the evaluation time of the run that sent it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderRecord {
    pub id: String,
    pub task_id: TaskId,
    pub recipient_email: String,
    pub days_overdue: i64,
    pub sent_at: String,
}

/// Validated input for task creation. Defaults are already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub frequency_days: u32,
    pub next_due_date: NaiveDate,
    pub is_active: bool,
}

impl NewTask {
    /// Validate raw request fields and fill in defaults
    /// (`frequency_days = 7`, `next_due_date = today`, `is_active = true`).
    pub fn build(
        title: Option<String>,
        description: Option<String>,
        frequency_days: Option<i64>,
        next_due_date: Option<NaiveDate>,
        is_active: Option<bool>,
        today: NaiveDate,
    ) -> Result<Self> {
        let title = match title.map(|t| t.trim().to_string()) {
            Some(t) if !t.is_empty() => t,
            _ => return Err(CoreError::validation("title", "Title is required")),
        };
        let frequency_days = match frequency_days {
            Some(days) => validate_frequency(days)?,
            None => DEFAULT_FREQUENCY_DAYS,
        };
        Ok(Self {
            title,
            description,
            frequency_days,
            next_due_date: validate_due_date(next_due_date.unwrap_or(today))?,
            is_active: is_active.unwrap_or(true),
        })
    }
}

/// Whitelisted partial update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub frequency_days: Option<u32>,
    pub next_due_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.frequency_days.is_none()
            && self.next_due_date.is_none()
            && self.is_active.is_none()
    }

    /// Reject blank titles and non-positive frequencies.
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(CoreError::validation("title", "Title cannot be empty"));
            }
        }
        if let Some(days) = self.frequency_days {
            validate_frequency(i64::from(days))?;
        }
        if let Some(due) = self.next_due_date {
            validate_due_date(due)?;
        }
        Ok(())
    }
}

/// Convert a client-supplied frequency into the stored representation.
pub fn validate_frequency(days: i64) -> Result<u32> {
    if !(1..=i64::from(MAX_FREQUENCY_DAYS)).contains(&days) {
        return Err(CoreError::InvalidFrequency { days });
    }
    u32::try_from(days).map_err(|_| CoreError::InvalidFrequency { days })
}

/// Due dates must fall in years 0001 to 9999.
pub fn validate_due_date(date: NaiveDate) -> Result<NaiveDate> {
    if !(1..=MAX_DUE_YEAR).contains(&date.year()) {
        return Err(CoreError::DateOutOfRange(format!(
            "{date} is outside years 0001-{MAX_DUE_YEAR}"
        )));
    }
    Ok(date)
}
