//! SQL storage helpers for workspaces and their member rosters.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::Instrument;
use uuid::Uuid;

use super::{WorkspaceResponse, ROLE_OWNER};

#[derive(Debug)]
pub(crate) struct WorkspaceRow {
    pub(crate) id: Uuid,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) created_at: OffsetDateTime,
}

impl WorkspaceRow {
    pub(crate) fn to_response(&self) -> WorkspaceResponse {
        WorkspaceResponse {
            id: self.id.to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            created_at: self
                .created_at
                .format(&Rfc3339)
                .unwrap_or_else(|_| self.created_at.to_string()),
        }
    }
}

fn workspace_from_row(row: &sqlx::postgres::PgRow) -> WorkspaceRow {
    WorkspaceRow {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        created_at: row.get("created_at"),
    }
}

/// Create a workspace and seat the creator as its owner in one
/// transaction, so a workspace can never exist without a roster.
pub(super) async fn create_workspace_with_owner(
    pool: &PgPool,
    owner_id: Uuid,
    name: &str,
    description: Option<&str>,
) -> Result<WorkspaceRow> {
    let mut tx = pool.begin().await.context("begin workspace transaction")?;

    let query = r"
        INSERT INTO workspaces (name, description, owner_id)
        VALUES ($1, $2, $3)
        RETURNING id, name, description, created_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(name)
        .bind(description)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert workspace")?;

    let workspace = workspace_from_row(&row);

    let query = r"
        INSERT INTO workspace_members (workspace_id, account_id, role)
        VALUES ($1, $2, $3)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(workspace.id)
        .bind(owner_id)
        .bind(ROLE_OWNER)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert workspace owner membership")?;

    tx.commit().await.context("commit workspace transaction")?;

    Ok(workspace)
}

pub(super) async fn fetch_workspaces_for_account(
    pool: &PgPool,
    account_id: Uuid,
) -> Result<Vec<WorkspaceRow>> {
    let query = r"
        SELECT workspaces.id, workspaces.name, workspaces.description, workspaces.created_at
        FROM workspaces
        JOIN workspace_members ON workspace_members.workspace_id = workspaces.id
        WHERE workspace_members.account_id = $1
        ORDER BY workspaces.created_at DESC
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(account_id)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list workspaces")?;

    Ok(rows.iter().map(workspace_from_row).collect())
}

pub(crate) async fn fetch_workspace(
    pool: &PgPool,
    workspace_id: Uuid,
) -> Result<Option<WorkspaceRow>> {
    let query = r"
        SELECT id, name, description, created_at
        FROM workspaces
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(workspace_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch workspace")?;

    Ok(row.map(|row| workspace_from_row(&row)))
}

pub(crate) async fn is_workspace_member(
    pool: &PgPool,
    workspace_id: Uuid,
    account_id: Uuid,
) -> Result<bool> {
    let query = r"
        SELECT 1 AS present
        FROM workspace_members
        WHERE workspace_id = $1
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
        .bind(workspace_id)
        .bind(account_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to check workspace membership")?;

    Ok(row.is_some())
}

#[cfg(test)]
mod tests {
    use super::WorkspaceRow;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[test]
    fn workspace_row_formats_rfc3339() {
        let row = WorkspaceRow {
            id: Uuid::nil(),
            name: "Team".to_string(),
            description: None,
            created_at: OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("timestamp"),
        };
        let response = row.to_response();
        assert_eq!(response.created_at, "2023-11-14T22:13:20Z");
        assert_eq!(response.name, "Team");
    }
}
