use chrono::{DateTime, NaiveDate, Utc};
use upkeep_core::{CompletionLog, LogEntry, NewTask, ReminderRecord, Task, TaskId, TaskPatch};

use crate::error::Result;

/// Input for an atomic completion: one log row plus the schedule advance.
#[derive(Debug, Clone)]
pub struct Completion {
    pub completed_by: String,
    pub notes: Option<String>,
    pub next_due_date: NaiveDate,
}

/// Rows removed by a cascading task delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteSummary {
    pub logs_removed: usize,
    pub reminders_removed: usize,
}

impl DeleteSummary {
    /// Total rows removed, including the task itself.
    pub fn total_rows(&self) -> usize {
        1 + self.logs_removed + self.reminders_removed
    }
}

/// A request to occupy the reminder ledger slot for `(task_id, sent_at day)`.
#[derive(Debug, Clone)]
pub struct ReminderClaim {
    pub task_id: TaskId,
    pub recipient_email: String,
    pub days_overdue: i64,
    pub sent_at: DateTime<Utc>,
}

/// Query/command capability over tasks, completion logs and the reminder ledger.
///
/// Implementations must make [`complete_task`](TaskStore::complete_task) and
/// [`claim_reminder`](TaskStore::claim_reminder) atomic; everything else is
/// last-write-wins.
pub trait TaskStore: Send + Sync {
    /// All tasks (or only active ones), ordered by due date ascending.
    fn list_tasks(&self, active_only: bool) -> Result<Vec<Task>>;

    fn get_task(&self, id: &TaskId) -> Result<Option<Task>>;

    fn create_task(&self, new: NewTask) -> Result<Task>;

    /// Apply a partial update. `NotFound` when the id is unknown.
    fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task>;

    /// Delete a task together with its logs and reminder records.
    fn delete_task(&self, id: &TaskId) -> Result<DeleteSummary>;

    /// Append a completion log and move `next_due_date`, both or neither.
    fn complete_task(
        &self,
        id: &TaskId,
        completion: &Completion,
    ) -> Result<(Task, CompletionLog)>;

    /// Most recent completion logs joined with their task title, newest first.
    fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>>;

    /// Active tasks due strictly before `today`, most overdue first.
    fn overdue_tasks(&self, today: NaiveDate) -> Result<Vec<Task>>;

    /// Atomically insert a ledger row unless one already exists for the same
    /// task and UTC day. Returns `None` when the slot was already taken.
    fn claim_reminder(&self, claim: &ReminderClaim) -> Result<Option<ReminderRecord>>;

    /// Remove a claimed ledger row whose email could not be delivered.
    fn release_reminder(&self, id: &str) -> Result<()>;

    /// Ledger rows for one task, oldest first.
    fn reminders_for_task(&self, task_id: &TaskId) -> Result<Vec<ReminderRecord>>;
}
