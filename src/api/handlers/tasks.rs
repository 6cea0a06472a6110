//! Task endpoints.
//!
//! Every task mutation ends with a project status recompute, keeping the
//! aggregate in step with the task set. Recomputation is idempotent, so
//! racing mutations settle on whatever the final task set implies.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::auth::{session::require_auth, AuthState};
use super::projects::status::{self, TaskStatus};
use super::projects::storage as project_storage;
use crate::api::error::{ApiError, ForbiddenReason};

pub(crate) mod storage;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTaskStatusRequest {
    pub status: TaskStatus,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub is_archived: bool,
    pub created_at: String,
}

#[utoipa::path(
    post,
    path = "/projects/{project_id}/tasks",
    request_body = CreateTaskRequest,
    params(("project_id" = String, Path, description = "Project id")),
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 400, description = "Invalid input", body = String),
        (status = 403, description = "Caller is not a project member"),
        (status = 404, description = "Project not found")
    ),
    tag = "tasks"
)]
pub async fn create_task(
    Path(project_id): Path<Uuid>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<CreateTaskRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_auth(&headers, &pool, &auth_state).await?;

    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };

    let title = request.title.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("Task title is required".to_string()));
    }

    if project_storage::fetch_project(&pool, project_id)
        .await?
        .is_none()
    {
        return Err(ApiError::NotFound("Project not found"));
    }
    if !project_storage::is_project_member(&pool, project_id, principal.account_id).await? {
        return Err(ApiError::Forbidden(ForbiddenReason::ProjectMembership));
    }

    let description = request
        .description
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let task_status = request.status.unwrap_or(TaskStatus::NotStarted);

    let task = storage::insert_task(&pool, project_id, title, description, task_status).await?;
    status::recompute(&pool, project_id).await?;

    Ok((StatusCode::CREATED, Json(task.to_response())))
}

#[utoipa::path(
    put,
    path = "/tasks/{task_id}/status",
    request_body = UpdateTaskStatusRequest,
    params(("task_id" = String, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task status updated", body = TaskResponse),
        (status = 403, description = "Caller is not a project member"),
        (status = 404, description = "Task not found")
    ),
    tag = "tasks"
)]
pub async fn update_task_status(
    Path(task_id): Path<Uuid>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<UpdateTaskStatusRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_auth(&headers, &pool, &auth_state).await?;

    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };

    let task = storage::fetch_task(&pool, task_id)
        .await?
        .ok_or(ApiError::NotFound("Task not found"))?;

    if !project_storage::is_project_member(&pool, task.project_id, principal.account_id).await? {
        return Err(ApiError::Forbidden(ForbiddenReason::ProjectMembership));
    }

    let updated = storage::update_task_status(&pool, task_id, request.status).await?;
    status::recompute(&pool, task.project_id).await?;

    Ok(Json(updated.to_response()))
}

#[utoipa::path(
    post,
    path = "/tasks/{task_id}/archive",
    params(("task_id" = String, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task archived", body = TaskResponse),
        (status = 403, description = "Caller is not a project member"),
        (status = 404, description = "Task not found")
    ),
    tag = "tasks"
)]
pub async fn archive_task(
    Path(task_id): Path<Uuid>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_auth(&headers, &pool, &auth_state).await?;

    let task = storage::fetch_task(&pool, task_id)
        .await?
        .ok_or(ApiError::NotFound("Task not found"))?;

    if !project_storage::is_project_member(&pool, task.project_id, principal.account_id).await? {
        return Err(ApiError::Forbidden(ForbiddenReason::ProjectMembership));
    }

    let archived = storage::archive_task(&pool, task_id).await?;
    // Archived tasks drop out of the aggregate.
    status::recompute(&pool, task.project_id).await?;

    Ok(Json(archived.to_response()))
}
