//! Project status aggregation over task state.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use utoipa::ToSchema;
use uuid::Uuid;

/// Status of a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum TaskStatus {
    #[serde(rename = "Not Started")]
    NotStarted,
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

impl TaskStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Not Started" => Some(Self::NotStarted),
            "Pending" => Some(Self::Pending),
            "In Progress" => Some(Self::InProgress),
            "Completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Status of a project. Clients may set any variant at creation; the
/// aggregator only ever writes the four task-derived ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ProjectStatus {
    Planning,
    #[serde(rename = "Not Started")]
    NotStarted,
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "On Hold")]
    OnHold,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "Planning",
            Self::NotStarted => "Not Started",
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::OnHold => "On Hold",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Planning" => Some(Self::Planning),
            "Not Started" => Some(Self::NotStarted),
            "Pending" => Some(Self::Pending),
            "In Progress" => Some(Self::InProgress),
            "On Hold" => Some(Self::OnHold),
            "Completed" => Some(Self::Completed),
            "Cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Derive a project's status from its non-archived task statuses.
/// First match wins: empty, all completed, any in progress, mixed.
#[must_use]
pub(crate) fn aggregate(statuses: &[TaskStatus]) -> ProjectStatus {
    if statuses.is_empty() {
        return ProjectStatus::NotStarted;
    }
    if statuses.iter().all(|status| *status == TaskStatus::Completed) {
        return ProjectStatus::Completed;
    }
    if statuses.iter().any(|status| *status == TaskStatus::InProgress) {
        return ProjectStatus::InProgress;
    }
    ProjectStatus::Pending
}

/// Recompute and persist a project's status from its current task set.
/// Idempotent: the same task set always yields the same status.
pub(crate) async fn recompute(pool: &PgPool, project_id: Uuid) -> Result<ProjectStatus> {
    let query = r"
        SELECT status
        FROM tasks
        WHERE project_id = $1
          AND archived = FALSE
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(project_id)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to load task statuses")?;

    let statuses: Vec<TaskStatus> = rows
        .iter()
        .filter_map(|row| TaskStatus::parse(row.get("status")))
        .collect();
    let status = aggregate(&statuses);

    let query = r"
        UPDATE projects
        SET status = $2,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(project_id)
        .bind(status.as_str())
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update project status")?;

    Ok(status)
}
