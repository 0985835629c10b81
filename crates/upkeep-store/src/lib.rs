//! `upkeep-store`: the Task Store.
//!
//! [`TaskStore`] is the capability the rest of the system programs against;
//! [`SqliteTaskStore`] implements it on a single SQLite file with three
//! tables:
//!
//! | Table               | Contents                                         |
//! |---------------------|--------------------------------------------------|
//! | `maintenance_tasks` | Recurring tasks                                  |
//! | `maintenance_logs`  | Completion logs, `ON DELETE CASCADE` to tasks    |
//! | `email_reminders`   | Reminder ledger, unique per `(task_id, sent_on)` |

pub mod db;
pub mod error;
pub mod sqlite;
pub mod store;

pub use error::{Result, StoreError};
pub use sqlite::SqliteTaskStore;
pub use store::{Completion, DeleteSummary, ReminderClaim, TaskStore};
