//! Pipeline run repository
//!
//! Handles all database operations related to pipeline runs.

use convoy_core::domain::artifact::ArtifactRef;
use convoy_core::domain::run::{PipelineRun, RunStatus};
use sqlx::PgPool;
use uuid::Uuid;

/// Create a new pipeline run
pub async fn create(pool: &PgPool, artifact: &ArtifactRef) -> Result<PipelineRun, sqlx::Error> {
    let now = chrono::Utc::now();
    let run = PipelineRun {
        id: Uuid::new_v4(),
        artifact: artifact.clone(),
        status: RunStatus::Pending,
        abort_requested: false,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO pipeline_runs (id, artifact, status, abort_requested, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(run.id)
    .bind(run.artifact.as_str())
    .bind(status_to_str(run.status))
    .bind(run.abort_requested)
    .bind(run.created_at)
    .bind(run.updated_at)
    .execute(pool)
    .await?;

    Ok(run)
}

/// Find a run by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<PipelineRun>, sqlx::Error> {
    let row = sqlx::query_as::<_, RunRow>(
        r#"
        SELECT id, artifact, status, abort_requested, created_at, updated_at
        FROM pipeline_runs
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// List runs that can still make progress (Pending or Running)
pub async fn list_active(pool: &PgPool) -> Result<Vec<PipelineRun>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RunRow>(
        r#"
        SELECT id, artifact, status, abort_requested, created_at, updated_at
        FROM pipeline_runs
        WHERE status IN ('Pending', 'Running')
        ORDER BY created_at ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// List all runs, newest first
pub async fn list_all(pool: &PgPool) -> Result<Vec<PipelineRun>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RunRow>(
        r#"
        SELECT id, artifact, status, abort_requested, created_at, updated_at
        FROM pipeline_runs
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Update a run's status
pub async fn update_status(
    pool: &PgPool,
    id: Uuid,
    status: RunStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE pipeline_runs
        SET status = $1, updated_at = $2
        WHERE id = $3
        "#,
    )
    .bind(status_to_str(status))
    .bind(chrono::Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Set the operator abort flag
pub async fn set_abort_requested(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE pipeline_runs
        SET abort_requested = TRUE, updated_at = $1
        WHERE id = $2
        "#,
    )
    .bind(chrono::Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct RunRow {
    id: Uuid,
    artifact: String,
    status: String,
    abort_requested: bool,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<RunRow> for PipelineRun {
    fn from(row: RunRow) -> Self {
        PipelineRun {
            id: row.id,
            artifact: ArtifactRef::new(row.artifact),
            status: status_from_str(&row.status),
            abort_requested: row.abort_requested,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn status_to_str(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Pending => "Pending",
        RunStatus::Running => "Running",
        RunStatus::Succeeded => "Succeeded",
        RunStatus::Failed => "Failed",
        RunStatus::RolledBack => "RolledBack",
        RunStatus::Quarantined => "Quarantined",
    }
}

fn status_from_str(s: &str) -> RunStatus {
    match s {
        "Pending" => RunStatus::Pending,
        "Running" => RunStatus::Running,
        "Succeeded" => RunStatus::Succeeded,
        "Failed" => RunStatus::Failed,
        "RolledBack" => RunStatus::RolledBack,
        _ => RunStatus::Quarantined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            RunStatus::Pending,
            RunStatus::Running,
            RunStatus::Succeeded,
            RunStatus::Failed,
            RunStatus::RolledBack,
            RunStatus::Quarantined,
        ] {
            assert_eq!(status_from_str(status_to_str(status)), status);
        }
    }
}
