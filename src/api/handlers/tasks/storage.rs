//! SQL storage helpers for tasks.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use tracing::Instrument;
use uuid::Uuid;

use super::super::projects::status::TaskStatus;
use super::super::projects::storage::format_timestamp;
use super::TaskResponse;

#[derive(Debug)]
pub(crate) struct TaskRow {
    pub(crate) id: Uuid,
    pub(crate) project_id: Uuid,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) status: String,
    pub(crate) archived: bool,
    pub(crate) created_at: OffsetDateTime,
}

impl TaskRow {
    pub(crate) fn to_response(&self) -> TaskResponse {
        TaskResponse {
            id: self.id.to_string(),
            project_id: self.project_id.to_string(),
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status.clone(),
            is_archived: self.archived,
            created_at: format_timestamp(self.created_at),
        }
    }
}

fn task_from_row(row: &sqlx::postgres::PgRow) -> TaskRow {
    TaskRow {
        id: row.get("id"),
        project_id: row.get("project_id"),
        title: row.get("title"),
        description: row.get("description"),
        status: row.get("status"),
        archived: row.get("archived"),
        created_at: row.get("created_at"),
    }
}

pub(super) async fn insert_task(
    pool: &PgPool,
    project_id: Uuid,
    title: &str,
    description: Option<&str>,
    status: TaskStatus,
) -> Result<TaskRow> {
    let query = r"
        INSERT INTO tasks (project_id, title, description, status)
        VALUES ($1, $2, $3, $4)
        RETURNING id, project_id, title, description, status, archived, created_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(project_id)
        .bind(title)
        .bind(description)
        .bind(status.as_str())
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to insert task")?;

    Ok(task_from_row(&row))
}

pub(crate) async fn fetch_task(pool: &PgPool, task_id: Uuid) -> Result<Option<TaskRow>> {
    let query = r"
        SELECT id, project_id, title, description, status, archived, created_at
        FROM tasks
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(task_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch task")?;

    Ok(row.map(|row| task_from_row(&row)))
}

/// Non-archived tasks of a project, newest first.
pub(crate) async fn fetch_tasks_for_project(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<Vec<TaskRow>> {
    let query = r"
        SELECT id, project_id, title, description, status, archived, created_at
        FROM tasks
        WHERE project_id = $1
          AND archived = FALSE
        ORDER BY created_at DESC
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
        .context("failed to list project tasks")?;

    Ok(rows.iter().map(task_from_row).collect())
}

pub(super) async fn update_task_status(
    pool: &PgPool,
    task_id: Uuid,
    status: TaskStatus,
) -> Result<TaskRow> {
    let query = r"
        UPDATE tasks
        SET status = $2,
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, project_id, title, description, status, archived, created_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(task_id)
        .bind(status.as_str())
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to update task status")?;

    Ok(task_from_row(&row))
}

pub(super) async fn archive_task(pool: &PgPool, task_id: Uuid) -> Result<TaskRow> {
    let query = r"
        UPDATE tasks
        SET archived = TRUE,
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, project_id, title, description, status, archived, created_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(task_id)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to archive task")?;

    Ok(task_from_row(&row))
}

#[cfg(test)]
mod tests {
    use super::TaskRow;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[test]
    fn task_row_maps_to_response() {
        let row = TaskRow {
            id: Uuid::nil(),
            project_id: Uuid::nil(),
            title: "Write docs".to_string(),
            description: Some("API docs".to_string()),
            status: "Pending".to_string(),
            archived: false,
            created_at: OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("timestamp"),
        };
        let response = row.to_response();
        assert_eq!(response.title, "Write docs");
        assert_eq!(response.status, "Pending");
        assert!(!response.is_archived);
    }
}
