//! Task lifecycle derivation.
//!
//! All functions take `today` explicitly so callers decide which clock
//! (and which timezone) defines "today". Dates carry no time component,
//! so the day difference is always exact.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Task;

/// Mutually exclusive derived state of a task relative to `today`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Inactive,
    Overdue,
    DueToday,
    Upcoming,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Inactive => "inactive",
            TaskStatus::Overdue => "overdue",
            TaskStatus::DueToday => "due-today",
            TaskStatus::Upcoming => "upcoming",
        };
        write!(f, "{s}")
    }
}

/// The current calendar day in UTC, the reference "today" for server-side checks.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Derive the status of `task` as of `today`.
///
/// Inactive tasks are always [`TaskStatus::Inactive`]; otherwise the sign of
/// `next_due_date - today` decides.
pub fn status(task: &Task, today: NaiveDate) -> TaskStatus {
    classify(task.is_active, task.next_due_date, today)
}

/// Same as [`status`] but on raw fields.
pub fn classify(is_active: bool, due: NaiveDate, today: NaiveDate) -> TaskStatus {
    if !is_active {
        return TaskStatus::Inactive;
    }
    match due.cmp(&today) {
        std::cmp::Ordering::Less => TaskStatus::Overdue,
        std::cmp::Ordering::Equal => TaskStatus::DueToday,
        std::cmp::Ordering::Greater => TaskStatus::Upcoming,
    }
}

/// Whole days from `today` until the task is due. Negative when overdue.
pub fn days_until_due(task: &Task, today: NaiveDate) -> i64 {
    (task.next_due_date - today).num_days()
}

/// Whole days the task is past due; zero or negative when it is not overdue.
pub fn days_overdue(task: &Task, today: NaiveDate) -> i64 {
    -days_until_due(task, today)
}

/// Per-status counts for a dashboard header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub overdue: usize,
    pub due_today: usize,
    pub upcoming: usize,
    pub inactive: usize,
}

impl StatusSummary {
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>, today: NaiveDate) -> Self {
        let mut summary = Self::default();
        for task in tasks {
            match status(task, today) {
                TaskStatus::Overdue => summary.overdue += 1,
                TaskStatus::DueToday => summary.due_today += 1,
                TaskStatus::Upcoming => summary.upcoming += 1,
                TaskStatus::Inactive => summary.inactive += 1,
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskId;

    fn day(s: &str) -> NaiveDate {
        s.parse().expect("valid date")
    }

    fn task(due: &str, active: bool) -> Task {
        Task {
            id: TaskId::from("t-1"),
            title: "Check extinguishers".into(),
            description: None,
            frequency_days: 7,
            next_due_date: day(due),
            is_active: active,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn inactive_wins_over_any_date() {
        let today = day("2024-01-10");
        for due in ["2023-01-01", "2024-01-10", "2030-06-01"] {
            assert_eq!(status(&task(due, false), today), TaskStatus::Inactive);
        }
    }

    #[test]
    fn active_status_follows_sign_of_difference() {
        let today = day("2024-01-10");
        assert_eq!(status(&task("2024-01-09", true), today), TaskStatus::Overdue);
        assert_eq!(status(&task("2024-01-10", true), today), TaskStatus::DueToday);
        assert_eq!(status(&task("2024-01-11", true), today), TaskStatus::Upcoming);

        for offset in -40i64..=40 {
            let due = today + chrono::Duration::days(offset);
            let expected = match offset {
                o if o < 0 => TaskStatus::Overdue,
                0 => TaskStatus::DueToday,
                _ => TaskStatus::Upcoming,
            };
            assert_eq!(classify(true, due, today), expected, "offset {offset}");
        }
    }

    #[test]
    fn overdue_scenario_reports_nine_days() {
        let t = task("2024-01-01", true);
        let today = day("2024-01-10");
        assert_eq!(status(&t, today), TaskStatus::Overdue);
        assert_eq!(days_overdue(&t, today), 9);
        assert_eq!(days_until_due(&t, today), -9);
    }

    #[test]
    fn days_until_due_crosses_month_and_leap_day() {
        let t = task("2024-03-01", true);
        assert_eq!(days_until_due(&t, day("2024-02-28")), 2);
    }

    #[test]
    fn status_serialises_kebab_case() {
        let json = serde_json::to_string(&TaskStatus::DueToday).unwrap();
        assert_eq!(json, "\"due-today\"");
        assert_eq!(TaskStatus::DueToday.to_string(), "due-today");
    }

    #[test]
    fn summary_counts_each_bucket() {
        let today = day("2024-01-10");
        let tasks = vec![
            task("2024-01-01", true),
            task("2024-01-05", true),
            task("2024-01-10", true),
            task("2024-02-01", true),
            task("2024-01-01", false),
        ];
        let summary = StatusSummary::from_tasks(&tasks, today);
        assert_eq!(
            summary,
            StatusSummary {
                overdue: 2,
                due_today: 1,
                upcoming: 1,
                inactive: 1,
            }
        );
    }
}
