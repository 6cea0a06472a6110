//! Workspace endpoints.
//!
//! Workspaces are the collaboration boundary: they own projects and the
//! member roster that project membership is snapshotted from. Handlers
//! authenticate via the session token, then run membership-scoped
//! queries.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use utoipa::ToSchema;

use super::auth::{session::require_auth, AuthState};
use crate::api::error::ApiError;

pub(crate) mod storage;

pub(crate) const ROLE_OWNER: &str = "owner";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateWorkspaceRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
}

#[utoipa::path(
    post,
    path = "/workspaces",
    request_body = CreateWorkspaceRequest,
    responses(
        (status = 201, description = "Workspace created", body = WorkspaceResponse),
        (status = 400, description = "Invalid input", body = String),
        (status = 403, description = "Missing or invalid session token")
    ),
    tag = "workspaces"
)]
pub async fn create_workspace(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<CreateWorkspaceRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_auth(&headers, &pool, &auth_state).await?;

    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };

    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("Workspace name is required".to_string()));
    }
    let description = request
        .description
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let workspace =
        storage::create_workspace_with_owner(&pool, principal.account_id, name, description)
            .await?;

    Ok((StatusCode::CREATED, Json(workspace.to_response())))
}

#[utoipa::path(
    get,
    path = "/workspaces",
    responses(
        (status = 200, description = "Workspaces the caller belongs to", body = [WorkspaceResponse]),
        (status = 403, description = "Missing or invalid session token")
    ),
    tag = "workspaces"
)]
pub async fn list_workspaces(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_auth(&headers, &pool, &auth_state).await?;

    let workspaces = storage::fetch_workspaces_for_account(&pool, principal.account_id).await?;
    let response: Vec<WorkspaceResponse> = workspaces
        .iter()
        .map(storage::WorkspaceRow::to_response)
        .collect();

    Ok(Json(response))
}
