use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use upkeep_core::days_overdue;
use upkeep_notify::{Notifier, OverdueReminder};
use upkeep_store::{ReminderClaim, TaskStore};

use crate::error::{Result, SchedulerError};

/// Outcome of one reminder run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderReport {
    /// UTC day the run was evaluated against.
    pub run_date: NaiveDate,
    /// Active tasks due before `run_date`.
    pub candidates: usize,
    pub reminders_sent: usize,
    /// Candidates skipped because today's reminder already went out.
    pub already_sent: usize,
    /// Candidates whose send failed; they stay eligible for a retry today.
    pub failed: usize,
}

/// Overdue scan → ledger claim → notify, shared by the timer and the manual trigger.
pub struct ReminderPipeline {
    store: Arc<dyn TaskStore>,
    notifier: Arc<dyn Notifier>,
}

impl ReminderPipeline {
    pub fn new(store: Arc<dyn TaskStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Run the pipeline once as of `now`, emailing `recipient`.
    ///
    /// Store errors abort the run. A notifier error only affects its own task.
    pub async fn run(&self, recipient: &str, now: DateTime<Utc>) -> Result<ReminderReport> {
        let recipient = recipient.trim();
        if recipient.is_empty() {
            return Err(SchedulerError::InvalidRecipient(
                "recipient email cannot be empty".to_string(),
            ));
        }

        let today = now.date_naive();
        let overdue = self.store.overdue_tasks(today)?;
        info!(count = overdue.len(), %today, "overdue tasks found");

        let mut report = ReminderReport {
            run_date: today,
            candidates: overdue.len(),
            reminders_sent: 0,
            already_sent: 0,
            failed: 0,
        };

        for task in &overdue {
            let days = days_overdue(task, today);
            let claim = ReminderClaim {
                task_id: task.id.clone(),
                recipient_email: recipient.to_string(),
                days_overdue: days,
                sent_at: now,
            };

            // The claim is the dedup check and the ledger write in one step.
            let Some(record) = self.store.claim_reminder(&claim)? else {
                debug!(task_id = %task.id, title = %task.title, "reminder already sent today");
                report.already_sent += 1;
                continue;
            };

            let reminder = OverdueReminder {
                recipient: recipient.to_string(),
                task_title: task.title.clone(),
                days_overdue: days,
            };
            match self.notifier.send_overdue(&reminder).await {
                Ok(()) => {
                    info!(
                        task_id = %task.id,
                        title = %task.title,
                        days_overdue = days,
                        "reminder sent"
                    );
                    report.reminders_sent += 1;
                }
                Err(e) => {
                    warn!(
                        task_id = %task.id,
                        notifier = self.notifier.name(),
                        error = %e,
                        "reminder send failed, releasing ledger slot"
                    );
                    self.store.release_reminder(&record.id)?;
                    report.failed += 1;
                }
            }
        }

        info!(
            candidates = report.candidates,
            sent = report.reminders_sent,
            skipped = report.already_sent,
            failed = report.failed,
            "reminder run complete"
        );
        Ok(report)
    }
}
