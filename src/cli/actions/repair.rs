use crate::api::handlers::projects::members;
use crate::cli::actions::Action;
use anyhow::{anyhow, Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing::{info, warn};

/// Handle the repair-members action: one sequential pass over all
/// workspaces, rewriting each project's member list from the roster.
pub async fn handle(action: Action) -> Result<()> {
    let Action::RepairMembers { dsn } = action else {
        return Err(anyhow!("unexpected action for repair handler"));
    };

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(2)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let report = members::repair_all(&pool).await?;

    for failure in &report.failures {
        warn!(
            project_id = %failure.project_id,
            error = %failure.error,
            "project left unrepaired"
        );
    }

    info!(
        workspaces = report.workspaces,
        projects_repaired = report.projects_repaired,
        failures = report.failures.len(),
        "member repair pass complete"
    );

    Ok(())
}
