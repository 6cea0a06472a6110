//! Project endpoints.
//!
//! A project belongs to exactly one workspace and carries its own member
//! list, snapshotted from the workspace roster in the transaction that
//! creates it. The snapshot is a deliberate denormalization: later
//! roster changes do not flow into existing projects until the operator
//! repair pass (`members::repair_all`) is run.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use utoipa::ToSchema;
use uuid::Uuid;

use super::auth::{session::require_auth, AuthState};
use super::tasks::{self, TaskResponse};
use super::workspaces::storage as workspace_storage;
use crate::api::error::{ApiError, ForbiddenReason};

pub(crate) mod members;
pub(crate) mod status;
pub(crate) mod storage;

use self::status::ProjectStatus;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<String>,
    pub due_date: Option<String>,
    /// Comma-separated tag list, split server-side.
    pub tags: Option<String>,
}

/// Member seat with the account fields embedded, so clients never need
/// a second lookup to render a roster.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: String,
    pub workspace_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub start_date: Option<String>,
    pub due_date: Option<String>,
    pub tags: Vec<String>,
    pub created_by: String,
    pub created_at: String,
    pub members: Vec<MemberResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectTasksResponse {
    pub project: ProjectResponse,
    pub tasks: Vec<TaskResponse>,
}

#[utoipa::path(
    post,
    path = "/workspaces/{workspace_id}/projects",
    request_body = CreateProjectRequest,
    params(("workspace_id" = String, Path, description = "Workspace id")),
    responses(
        (status = 201, description = "Project created with the roster snapshot", body = ProjectResponse),
        (status = 400, description = "Invalid input", body = String),
        (status = 403, description = "Caller is not a workspace member"),
        (status = 404, description = "Workspace not found")
    ),
    tag = "projects"
)]
pub async fn create_project(
    Path(workspace_id): Path<Uuid>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<CreateProjectRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_auth(&headers, &pool, &auth_state).await?;

    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };

    let title = request.title.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("Project title is required".to_string()));
    }

    if workspace_storage::fetch_workspace(&pool, workspace_id)
        .await?
        .is_none()
    {
        return Err(ApiError::NotFound("Workspace not found"));
    }

    if !workspace_storage::is_workspace_member(&pool, workspace_id, principal.account_id).await? {
        return Err(ApiError::Forbidden(ForbiddenReason::WorkspaceMembership));
    }

    let new_project = storage::NewProject {
        title,
        description: request
            .description
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty()),
        status: request.status.unwrap_or(ProjectStatus::InProgress),
        start_date: parse_date(request.start_date.as_deref(), "start")?,
        due_date: parse_date(request.due_date.as_deref(), "due")?,
        tags: split_tags(request.tags.as_deref()),
    };

    // Project row and roster snapshot land in the same transaction, so
    // the members equal the workspace roster at this instant.
    let project = storage::insert_project_with_members(
        &pool,
        workspace_id,
        principal.account_id,
        &new_project,
    )
    .await?;
    let members = storage::fetch_project_members(&pool, project.id).await?;

    Ok((StatusCode::CREATED, Json(project.to_response(members))))
}

#[utoipa::path(
    get,
    path = "/projects/{project_id}",
    params(("project_id" = String, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project detail with members populated", body = ProjectResponse),
        (status = 403, description = "Caller is not a project member"),
        (status = 404, description = "Project not found")
    ),
    tag = "projects"
)]
pub async fn get_project(
    Path(project_id): Path<Uuid>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_auth(&headers, &pool, &auth_state).await?;

    let project = storage::fetch_project(&pool, project_id)
        .await?
        .ok_or(ApiError::NotFound("Project not found"))?;

    let members = storage::fetch_project_members(&pool, project.id).await?;
    if !members
        .iter()
        .any(|member| member.account_id == principal.account_id)
    {
        return Err(ApiError::Forbidden(ForbiddenReason::ProjectMembership));
    }

    Ok(Json(project.to_response(members)))
}

#[utoipa::path(
    get,
    path = "/projects/{project_id}/tasks",
    params(("project_id" = String, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project and its non-archived tasks, newest first", body = ProjectTasksResponse),
        (status = 403, description = "Caller is not a project member"),
        (status = 404, description = "Project not found")
    ),
    tag = "projects"
)]
pub async fn get_project_tasks(
    Path(project_id): Path<Uuid>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_auth(&headers, &pool, &auth_state).await?;

    let project = storage::fetch_project(&pool, project_id)
        .await?
        .ok_or(ApiError::NotFound("Project not found"))?;

    let members = storage::fetch_project_members(&pool, project.id).await?;
    if !members
        .iter()
        .any(|member| member.account_id == principal.account_id)
    {
        return Err(ApiError::Forbidden(ForbiddenReason::ProjectMembership));
    }

    let tasks = tasks::storage::fetch_tasks_for_project(&pool, project.id).await?;
    let response = ProjectTasksResponse {
        project: project.to_response(members),
        tasks: tasks.iter().map(tasks::storage::TaskRow::to_response).collect(),
    };

    Ok(Json(response))
}

fn parse_date(value: Option<&str>, field: &'static str) -> Result<Option<OffsetDateTime>, ApiError> {
    let Some(raw) = value.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    OffsetDateTime::parse(raw, &Rfc3339)
        .map(Some)
        .map_err(|_| ApiError::Validation(format!("Invalid {field} date")))
}

fn split_tags(tags: Option<&str>) -> Vec<String> {
    tags.map(|tags| {
        tags.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
