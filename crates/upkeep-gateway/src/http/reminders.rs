//! Manual reminder trigger: POST /api/tasks/send-reminders
//!
//! Runs the same pipeline (and ledger) as the daily timer, synchronously.
//!
//! Request:  `{"email": "owner@example.com"}`
//! Response: `{"runDate": "...", "candidates": 2, "remindersSent": 1, "alreadySent": 1, "failed": 0}`

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use upkeep_scheduler::ReminderReport;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct SendRemindersRequest {
    pub email: Option<String>,
}

/// POST /api/tasks/send-reminders
pub async fn send_reminders(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SendRemindersRequest>, JsonRejection>,
) -> Result<Json<ReminderReport>, ApiError> {
    let Json(req) = body?;
    let email = req
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("email is required".to_string()))?;

    info!("manual reminder trigger");
    let report = state.pipeline.run(&email, Utc::now()).await?;
    Ok(Json(report))
}

#[derive(Serialize)]
pub struct SchedulerStatus {
    pub enabled: bool,
    pub running: bool,
    pub cron: String,
}

/// GET /api/scheduler: whether the daily timer is running and on what schedule.
pub async fn scheduler_status(State(state): State<Arc<AppState>>) -> Json<SchedulerStatus> {
    Json(SchedulerStatus {
        enabled: state.config.reminders.enabled,
        running: state.scheduler.is_running(),
        cron: state.scheduler.schedule().expression().to_string(),
    })
}
