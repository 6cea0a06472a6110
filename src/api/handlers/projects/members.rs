//! Membership repair: resynchronize project member snapshots.
//!
//! Project member lists are snapshots taken at creation time, so roster
//! changes after that point leave them stale until an operator runs this
//! pass. The pass is bulk and non-transactional across projects: each
//! project is rewritten in its own transaction, failures are reported
//! and skipped, and the rest of the run continues.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::{info, warn, Instrument};
use uuid::Uuid;

/// A project the repair pass could not rewrite.
#[derive(Debug)]
pub struct RepairFailure {
    pub project_id: Uuid,
    pub error: String,
}

/// Summary of one repair pass.
#[derive(Debug, Default)]
pub struct RepairReport {
    pub workspaces: usize,
    pub projects_repaired: usize,
    pub failures: Vec<RepairFailure>,
}

/// Overwrite every project's member list with its workspace's current
/// roster, sequentially over workspaces.
///
/// # Errors
///
/// Returns an error only when the workspace/project listing itself
/// fails; per-project failures are collected in the report instead.
pub async fn repair_all(pool: &PgPool) -> Result<RepairReport> {
    let mut report = RepairReport::default();

    let workspace_ids = fetch_workspace_ids(pool).await?;
    report.workspaces = workspace_ids.len();

    for workspace_id in workspace_ids {
        let project_ids = fetch_project_ids(pool, workspace_id).await?;

        for project_id in project_ids {
            match repair_project(pool, workspace_id, project_id).await {
                Ok(member_count) => {
                    info!(
                        project_id = %project_id,
                        members = member_count,
                        "project member list rewritten"
                    );
                    report.projects_repaired += 1;
                }
                Err(err) => {
                    warn!(
                        project_id = %project_id,
                        error = %format!("{err:#}"),
                        "failed to rewrite project member list"
                    );
                    report.failures.push(RepairFailure {
                        project_id,
                        error: format!("{err:#}"),
                    });
                }
            }
        }
    }

    Ok(report)
}

async fn fetch_workspace_ids(pool: &PgPool) -> Result<Vec<Uuid>> {
    let query = "SELECT id FROM workspaces ORDER BY created_at ASC";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list workspaces for repair")?;

    Ok(rows.iter().map(|row| row.get("id")).collect())
}

async fn fetch_project_ids(pool: &PgPool, workspace_id: Uuid) -> Result<Vec<Uuid>> {
    let query = "SELECT id FROM projects WHERE workspace_id = $1 ORDER BY created_at ASC";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(workspace_id)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list projects for repair")?;

    Ok(rows.iter().map(|row| row.get("id")).collect())
}

/// Rewrite one project's member list inside its own transaction.
async fn repair_project(pool: &PgPool, workspace_id: Uuid, project_id: Uuid) -> Result<u64> {
    let mut tx = pool.begin().await.context("begin repair transaction")?;

    let query = "DELETE FROM project_members WHERE project_id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(project_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to clear project members")?;

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
    let result = sqlx::query(query)
        .bind(project_id)
        .bind(workspace_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to copy workspace roster")?;

    tx.commit().await.context("commit repair transaction")?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::{RepairFailure, RepairReport};
    use uuid::Uuid;

    #[test]
    fn report_default_is_empty() {
        let report = RepairReport::default();
        assert_eq!(report.workspaces, 0);
        assert_eq!(report.projects_repaired, 0);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn failures_carry_project_and_cause() {
        let failure = RepairFailure {
            project_id: Uuid::nil(),
            error: "connection reset".to_string(),
        };
        assert_eq!(failure.project_id, Uuid::nil());
        assert!(failure.error.contains("reset"));
    }
}
