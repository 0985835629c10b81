use std::sync::Arc;

use axum::{extract::State, Json};
use upkeep_core::LogEntry;

use crate::app::AppState;
use crate::error::ApiError;

/// Page size for the completion history.
const RECENT_LOG_LIMIT: usize = 100;

/// GET /api/logs: the 100 most recent completions with their task title.
pub async fn recent_logs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LogEntry>>, ApiError> {
    Ok(Json(state.store.recent_logs(RECENT_LOG_LIMIT)?))
}
