//! `upkeep-core`: domain types and pure date logic for the maintenance tracker.
//!
//! Nothing in this crate touches the database or the network. The store,
//! notifier, scheduler and gateway crates all build on these types.

pub mod config;
pub mod error;
pub mod recurrence;
pub mod status;
pub mod types;

pub use error::{CoreError, Result};
pub use recurrence::next_due;
pub use status::{days_overdue, days_until_due, status, today_utc, StatusSummary, TaskStatus};
pub use types::{CompletionLog, LogEntry, NewTask, ReminderRecord, Task, TaskId, TaskPatch};
