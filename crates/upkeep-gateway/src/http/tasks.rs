//! Task CRUD and completion endpoints under `/api/tasks`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use tracing::info;
use upkeep_core::{
    days_overdue, next_due, today_utc,
    types::{validate_due_date, validate_frequency},
    CompletionLog, NewTask, StatusSummary, Task, TaskId, TaskPatch,
};
use upkeep_store::Completion;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub active: bool,
}

/// GET /api/tasks[?active=true]: ordered by due date ascending.
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    Ok(Json(state.store.list_tasks(query.active)?))
}

#[derive(Deserialize)]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub frequency_days: Option<i64>,
    pub next_due_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

/// POST /api/tasks
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let Json(req) = body?;
    let new = NewTask::build(
        req.title,
        req.description,
        req.frequency_days,
        req.next_due_date,
        req.is_active,
        today_utc(),
    )?;
    let task = state.store.create_task(new)?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Whitelisted fields for PUT; anything else in the body is ignored.
#[derive(Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub description: Option<Option<String>>,
    pub frequency_days: Option<i64>,
    pub next_due_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

/// Distinguishes `"description": null` (clear) from an absent key (keep).
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UpdateTaskRequest {
    fn into_patch(self) -> Result<TaskPatch, ApiError> {
        let patch = TaskPatch {
            title: self.title.map(|t| t.trim().to_string()),
            description: self.description,
            frequency_days: self.frequency_days.map(validate_frequency).transpose()?,
            next_due_date: self.next_due_date,
            is_active: self.is_active,
        };
        patch.validate()?;
        Ok(patch)
    }
}

/// PUT /api/tasks/{id}
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let Json(req) = body?;
    let patch = req.into_patch()?;
    if patch.is_empty() {
        return Err(ApiError::Validation("No valid fields to update".to_string()));
    }
    Ok(Json(state.store.update_task(&TaskId::from(id), &patch)?))
}

/// DELETE /api/tasks/{id}: removes the task with its logs and reminder records.
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let summary = state.store.delete_task(&TaskId::from(id.as_str()))?;
    Ok(Json(json!({
        "success": true,
        "deletedId": id,
        "logsRemoved": summary.logs_removed,
        "remindersRemoved": summary.reminders_removed,
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTaskRequest {
    pub task_id: Option<String>,
    pub completed_by: Option<String>,
    pub notes: Option<String>,
    /// When absent the server computes `today + frequency_days`.
    pub new_due_date: Option<NaiveDate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteByIdRequest {
    pub completed_by: Option<String>,
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct CompletionResponse {
    pub task: Task,
    pub log: CompletionLog,
}

/// POST /api/tasks/complete
pub async fn complete_task(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CompleteTaskRequest>, JsonRejection>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let Json(req) = body?;
    let (Some(task_id), Some(completed_by)) = (non_blank(req.task_id), non_blank(req.completed_by))
    else {
        return Err(ApiError::Validation(
            "taskId and completedBy are required".to_string(),
        ));
    };
    complete(&state, TaskId::from(task_id), completed_by, req.notes, req.new_due_date).map(Json)
}

/// POST /api/tasks/{id}/complete
pub async fn complete_task_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<CompleteByIdRequest>, JsonRejection>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let Json(req) = body?;
    let completed_by = non_blank(req.completed_by)
        .ok_or_else(|| ApiError::Validation("completedBy is required".to_string()))?;
    complete(&state, TaskId::from(id), completed_by, req.notes, None).map(Json)
}

fn complete(
    state: &AppState,
    id: TaskId,
    completed_by: String,
    notes: Option<String>,
    new_due_date: Option<NaiveDate>,
) -> Result<CompletionResponse, ApiError> {
    let next_due_date = match new_due_date {
        Some(date) => validate_due_date(date)?,
        None => {
            let task = state
                .store
                .get_task(&id)?
                .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;
            next_due(today_utc(), task.frequency_days)?
        }
    };
    let completion = Completion {
        completed_by,
        notes: notes.filter(|n| !n.trim().is_empty()),
        next_due_date,
    };
    let (task, log) = state.store.complete_task(&id, &completion)?;
    info!(task_id = %task.id, next_due = %task.next_due_date, "completion recorded");
    Ok(CompletionResponse { task, log })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Serialize)]
pub struct OverdueTask {
    #[serde(flatten)]
    pub task: Task,
    pub days_overdue: i64,
}

/// GET /api/tasks/overdue: active tasks due before today, most overdue first.
pub async fn overdue_tasks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<OverdueTask>>, ApiError> {
    let today = today_utc();
    let tasks = state
        .store
        .overdue_tasks(today)?
        .into_iter()
        .map(|task| OverdueTask {
            days_overdue: days_overdue(&task, today),
            task,
        })
        .collect();
    Ok(Json(tasks))
}

/// GET /api/tasks/summary: per-status counts as of today (UTC).
pub async fn status_summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusSummary>, ApiError> {
    let tasks = state.store.list_tasks(false)?;
    Ok(Json(StatusSummary::from_tasks(&tasks, today_utc())))
}
