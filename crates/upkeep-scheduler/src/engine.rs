use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::pipeline::ReminderPipeline;
use crate::schedule::ReminderSchedule;

enum SchedulerState {
    Stopped,
    Running {
        shutdown: watch::Sender<bool>,
        handle: JoinHandle<()>,
    },
}

/// Process-wide reminder timer. Construct once at startup and share it.
pub struct ReminderScheduler {
    pipeline: Arc<ReminderPipeline>,
    schedule: ReminderSchedule,
    /// Address used for timer fires; `None` turns each fire into a warning.
    recipient: Option<String>,
    state: Mutex<SchedulerState>,
}

impl ReminderScheduler {
    pub fn new(
        pipeline: Arc<ReminderPipeline>,
        schedule: ReminderSchedule,
        recipient: Option<String>,
    ) -> Self {
        Self {
            pipeline,
            schedule,
            recipient,
            state: Mutex::new(SchedulerState::Stopped),
        }
    }

    /// Stopped → Running. Returns `false` (and does nothing) if already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> bool {
        let mut state = self.state();
        if let SchedulerState::Running { handle, .. } = &*state {
            if !handle.is_finished() {
                info!("reminder scheduler is already running");
                return false;
            }
        }

        if self.recipient.is_none() {
            warn!("no reminder recipient configured; timer fires will not send email");
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.pipeline),
            self.schedule.clone(),
            self.recipient.clone(),
            shutdown_rx,
        ));
        *state = SchedulerState::Running {
            shutdown: shutdown_tx,
            handle,
        };
        info!(cron = %self.schedule.expression(), "reminder scheduler started");
        true
    }

    /// Running → Stopped. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        let mut state = self.state();
        match std::mem::replace(&mut *state, SchedulerState::Stopped) {
            SchedulerState::Running { shutdown, .. } => {
                let _ = shutdown.send(true);
                info!("reminder scheduler stopped");
                true
            }
            SchedulerState::Stopped => false,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(&*self.state(), SchedulerState::Running { handle, .. } if !handle.is_finished())
    }

    pub fn schedule(&self) -> &ReminderSchedule {
        &self.schedule
    }

    fn state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Sleep until the next cron fire, run the pipeline, repeat until `shutdown` flips.
async fn run_loop(
    pipeline: Arc<ReminderPipeline>,
    schedule: ReminderSchedule,
    recipient: Option<String>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let now = Utc::now();
        let Some(next) = schedule.next_after(now) else {
            warn!(cron = %schedule.expression(), "schedule has no upcoming fire time");
            break;
        };
        let wait = (next - now).to_std().unwrap_or_default();

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                fire(&pipeline, recipient.as_deref(), Utc::now()).await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("reminder loop shutting down");
                    break;
                }
            }
        }
    }
}

/// One timer tick evaluated as of `now`.
async fn fire(pipeline: &ReminderPipeline, recipient: Option<&str>, now: DateTime<Utc>) {
    let Some(recipient) = recipient else {
        warn!("reminder timer fired but no recipient is configured");
        return;
    };
    info!("running scheduled reminder check");
    match pipeline.run(recipient, now).await {
        Ok(report) => info!(
            sent = report.reminders_sent,
            candidates = report.candidates,
            "scheduled reminder check finished"
        ),
        Err(e) => error!("scheduled reminder check failed: {e}"),
    }
}
