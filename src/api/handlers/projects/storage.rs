//! SQL storage helpers for projects and their member snapshots.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::Instrument;
use uuid::Uuid;

use super::status::ProjectStatus;
use super::{MemberResponse, ProjectResponse};

/// Fields for a new project before insertion.
#[derive(Debug)]
pub(super) struct NewProject<'a> {
    pub(super) title: &'a str,
    pub(super) description: Option<&'a str>,
    pub(super) status: ProjectStatus,
    pub(super) start_date: Option<OffsetDateTime>,
    pub(super) due_date: Option<OffsetDateTime>,
    pub(super) tags: Vec<String>,
}

#[derive(Debug)]
pub(crate) struct ProjectRow {
    pub(crate) id: Uuid,
    pub(crate) workspace_id: Uuid,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) status: String,
    pub(crate) start_date: Option<OffsetDateTime>,
    pub(crate) due_date: Option<OffsetDateTime>,
    pub(crate) tags: Vec<String>,
    pub(crate) created_by: Uuid,
    pub(crate) created_at: OffsetDateTime,
}

/// One seat on a project's member list, with the account fields joined
/// in so responses never need a second lookup.
#[derive(Debug)]
pub(crate) struct MemberRow {
    pub(crate) account_id: Uuid,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) role: String,
}

impl ProjectRow {
    pub(crate) fn to_response(&self, members: Vec<MemberRow>) -> ProjectResponse {
        ProjectResponse {
            id: self.id.to_string(),
            workspace_id: self.workspace_id.to_string(),
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status.clone(),
            start_date: self.start_date.map(format_timestamp),
            due_date: self.due_date.map(format_timestamp),
            tags: self.tags.clone(),
            created_by: self.created_by.to_string(),
            created_at: format_timestamp(self.created_at),
            members: members
                .into_iter()
                .map(|member| MemberResponse {
                    user_id: member.account_id.to_string(),
                    name: member.name,
                    email: member.email,
                    role: member.role,
                })
                .collect(),
        }
    }
}

pub(crate) fn format_timestamp(value: OffsetDateTime) -> String {
    value
        .format(&Rfc3339)
        .unwrap_or_else(|_| value.to_string())
}

fn project_from_row(row: &sqlx::postgres::PgRow) -> ProjectRow {
    ProjectRow {
        id: row.get("id"),
        workspace_id: row.get("workspace_id"),
        title: row.get("title"),
        description: row.get("description"),
        status: row.get("status"),
        start_date: row.get("start_date"),
        due_date: row.get("due_date"),
        tags: row.get("tags"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
    }
}

/// Insert a project and copy the workspace roster into its member list
/// in one transaction.
pub(super) async fn insert_project_with_members(
    pool: &PgPool,
    workspace_id: Uuid,
    created_by: Uuid,
    project: &NewProject<'_>,
) -> Result<ProjectRow> {
    let mut tx = pool.begin().await.context("begin project transaction")?;

    let query = r"
        INSERT INTO projects
            (workspace_id, title, description, status, start_date, due_date, tags, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, workspace_id, title, description, status, start_date, due_date,
                  tags, created_by, created_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(workspace_id)
        .bind(project.title)
        .bind(project.description)
        .bind(project.status.as_str())
        .bind(project.start_date)
        .bind(project.due_date)
        .bind(&project.tags)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert project")?;

    let inserted = project_from_row(&row);

    let query = r"
        INSERT INTO project_members (project_id, account_id, role)
        SELECT $1, account_id, role
        FROM workspace_members
        WHERE workspace_id = $2
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(inserted.id)
        .bind(workspace_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to snapshot project members")?;

    tx.commit().await.context("commit project transaction")?;

    Ok(inserted)
}

pub(crate) async fn fetch_project(pool: &PgPool, project_id: Uuid) -> Result<Option<ProjectRow>> {
    let query = r"
        SELECT id, workspace_id, title, description, status, start_date, due_date,
               tags, created_by, created_at
        FROM projects
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(project_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch project")?;

    Ok(row.map(|row| project_from_row(&row)))
}

pub(crate) async fn fetch_project_members(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<Vec<MemberRow>> {
    let query = r"
        SELECT project_members.account_id, project_members.role,
               accounts.name, accounts.email
        FROM project_members
        JOIN accounts ON accounts.id = project_members.account_id
        WHERE project_members.project_id = $1
        ORDER BY accounts.name ASC
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
        .context("failed to fetch project members")?;

    Ok(rows
        .iter()
        .map(|row| MemberRow {
            account_id: row.get("account_id"),
            name: row.get("name"),
            email: row.get("email"),
            role: row.get("role"),
        })
        .collect())
}

pub(crate) async fn is_project_member(
    pool: &PgPool,
    project_id: Uuid,
    account_id: Uuid,
) -> Result<bool> {
    let query = r"
        SELECT 1 AS present
        FROM project_members
        WHERE project_id = $1
          AND account_id = $2
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(project_id)
        .bind(account_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to check project membership")?;

    Ok(row.is_some())
}
