use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use upkeep_core::config::UpkeepConfig;
use upkeep_scheduler::{ReminderPipeline, ReminderScheduler};
use upkeep_store::TaskStore;

use crate::http::{health, logs, reminders, tasks};

/// Handler state, shared as `Arc<AppState>`.
pub struct AppState {
    pub config: UpkeepConfig,
    pub store: Arc<dyn TaskStore>,
    /// Same pipeline instance the timer uses, so both paths share one ledger.
    pub pipeline: Arc<ReminderPipeline>,
    pub scheduler: Arc<ReminderScheduler>,
}

impl AppState {
    pub fn new(
        config: UpkeepConfig,
        store: Arc<dyn TaskStore>,
        pipeline: Arc<ReminderPipeline>,
        scheduler: Arc<ReminderScheduler>,
    ) -> Self {
        Self {
            config,
            store,
            pipeline,
            scheduler,
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/api/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route("/api/tasks/overdue", get(tasks::overdue_tasks))
        .route("/api/tasks/summary", get(tasks::status_summary))
        .route("/api/tasks/complete", post(tasks::complete_task))
        .route("/api/tasks/send-reminders", post(reminders::send_reminders))
        .route(
            "/api/tasks/{id}",
            put(tasks::update_task).delete(tasks::delete_task),
        )
        .route("/api/tasks/{id}/complete", post(tasks::complete_task_by_id))
        .route("/api/logs", get(logs::recent_logs))
        .route("/api/scheduler", get(reminders::scheduler_status))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            crate::auth::require_token,
        ));

    Router::new()
        .route("/health", get(health::health_handler))
        .merge(api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
