//! `upkeep-scheduler`: overdue reminder pipeline and its daily timer.
//!
//! # Overview
//!
//! [`pipeline::ReminderPipeline`] finds active tasks due before today, claims
//! a `(task, day)` slot in the reminder ledger, and sends one email per
//! claimed slot. A failed send releases its slot so the next trigger retries.
//!
//! [`engine::ReminderScheduler`] runs the pipeline on a cron schedule. It is
//! either `Stopped` or `Running`; starting a running scheduler is a no-op.
//! Fires missed while the process was down are not replayed.

pub mod engine;
pub mod error;
pub mod pipeline;
pub mod schedule;

pub use engine::ReminderScheduler;
pub use error::{Result, SchedulerError};
pub use pipeline::{ReminderPipeline, ReminderReport};
pub use schedule::ReminderSchedule;
