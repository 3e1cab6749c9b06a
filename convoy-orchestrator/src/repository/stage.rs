//! Stage execution repository
//!
//! Handles all database operations related to stage executions. The gate
//! verdict, approval record, and rollout state are JSONB columns so every
//! stage write is one atomic row update.

use convoy_core::domain::stage::{StageExecution, StageStatus};
use sqlx::PgPool;
use uuid::Uuid;

/// Insert a freshly created stage execution
pub async fn create(pool: &PgPool, stage: &StageExecution) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO stage_executions (
            id, run_id, name, environment, sequence, requires_approval,
            status, deploy_attempted, gate_verdict, approval, rollout,
            failure_reason, started_at, ended_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(stage.id)
    .bind(stage.run_id)
    .bind(&stage.name)
    .bind(&stage.environment)
    .bind(stage.sequence as i32)
    .bind(stage.requires_approval)
    .bind(status_to_str(stage.status))
    .bind(stage.deploy_attempted)
    .bind(to_json(&stage.gate_verdict)?)
    .bind(to_json(&stage.approval)?)
    .bind(to_json(&stage.rollout)?)
    .bind(&stage.failure_reason)
    .bind(stage.started_at)
    .bind(stage.ended_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Persist the mutable part of a stage execution
///
/// Writes every mutable column in one statement; this is the durability
/// point that must land before any external deploy call.
pub async fn update(pool: &PgPool, stage: &StageExecution) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE stage_executions
        SET status = $1, deploy_attempted = $2, gate_verdict = $3, approval = $4,
            rollout = $5, failure_reason = $6, started_at = $7, ended_at = $8
        WHERE id = $9
        "#,
    )
    .bind(status_to_str(stage.status))
    .bind(stage.deploy_attempted)
    .bind(to_json(&stage.gate_verdict)?)
    .bind(to_json(&stage.approval)?)
    .bind(to_json(&stage.rollout)?)
    .bind(&stage.failure_reason)
    .bind(stage.started_at)
    .bind(stage.ended_at)
    .bind(stage.id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Find a stage execution by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<StageExecution>, sqlx::Error> {
    let row = sqlx::query_as::<_, StageRow>(
        r#"
        SELECT id, run_id, name, environment, sequence, requires_approval,
               status, deploy_attempted, gate_verdict, approval, rollout,
               failure_reason, started_at, ended_at
        FROM stage_executions
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// List a run's stage executions in declared order
pub async fn find_by_run(pool: &PgPool, run_id: Uuid) -> Result<Vec<StageExecution>, sqlx::Error> {
    let rows = sqlx::query_as::<_, StageRow>(
        r#"
        SELECT id, run_id, name, environment, sequence, requires_approval,
               status, deploy_attempted, gate_verdict, approval, rollout,
               failure_reason, started_at, ended_at
        FROM stage_executions
        WHERE run_id = $1
        ORDER BY sequence ASC
        "#,
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Count stages of other runs currently deploying into an environment
///
/// Backs the per-environment serialization rule: a stage may not enter
/// Deploying while another run's stage is mid-deploy in the same
/// environment.
pub async fn count_active_in_environment(
    pool: &PgPool,
    environment: &str,
    exclude_run: Uuid,
) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM stage_executions
        WHERE environment = $1
          AND run_id <> $2
          AND status IN ('Deploying', 'Canarying')
        "#,
    )
    .bind(environment)
    .bind(exclude_run)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct StageRow {
    id: Uuid,
    run_id: Uuid,
    name: String,
    environment: String,
    sequence: i32,
    requires_approval: bool,
    status: String,
    deploy_attempted: bool,
    gate_verdict: Option<serde_json::Value>,
    approval: Option<serde_json::Value>,
    rollout: Option<serde_json::Value>,
    failure_reason: Option<String>,
    started_at: Option<chrono::DateTime<chrono::Utc>>,
    ended_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<StageRow> for StageExecution {
    fn from(row: StageRow) -> Self {
        StageExecution {
            id: row.id,
            run_id: row.run_id,
            name: row.name,
            environment: row.environment,
            sequence: row.sequence as u32,
            requires_approval: row.requires_approval,
            status: status_from_str(&row.status),
            deploy_attempted: row.deploy_attempted,
            gate_verdict: row.gate_verdict.and_then(from_json),
            approval: row.approval.and_then(from_json),
            rollout: row.rollout.and_then(from_json),
            failure_reason: row.failure_reason,
            started_at: row.started_at,
            ended_at: row.ended_at,
        }
    }
}

fn to_json<T: serde::Serialize>(
    value: &Option<T>,
) -> Result<Option<serde_json::Value>, sqlx::Error> {
    value
        .as_ref()
        .map(|v| serde_json::to_value(v).map_err(|e| sqlx::Error::Encode(Box::new(e))))
        .transpose()
}

fn from_json<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Option<T> {
    serde_json::from_value(value).ok()
}

fn status_to_str(status: StageStatus) -> &'static str {
    match status {
        StageStatus::Pending => "Pending",
        StageStatus::AwaitingGate => "AwaitingGate",
        StageStatus::AwaitingApproval => "AwaitingApproval",
        StageStatus::Deploying => "Deploying",
        StageStatus::Canarying => "Canarying",
        StageStatus::Succeeded => "Succeeded",
        StageStatus::Failed => "Failed",
        StageStatus::RolledBack => "RolledBack",
    }
}

fn status_from_str(s: &str) -> StageStatus {
    match s {
        "Pending" => StageStatus::Pending,
        "AwaitingGate" => StageStatus::AwaitingGate,
        "AwaitingApproval" => StageStatus::AwaitingApproval,
        "Deploying" => StageStatus::Deploying,
        "Canarying" => StageStatus::Canarying,
        "Succeeded" => StageStatus::Succeeded,
        "RolledBack" => StageStatus::RolledBack,
        _ => StageStatus::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            StageStatus::Pending,
            StageStatus::AwaitingGate,
            StageStatus::AwaitingApproval,
            StageStatus::Deploying,
            StageStatus::Canarying,
            StageStatus::Succeeded,
            StageStatus::Failed,
            StageStatus::RolledBack,
        ] {
            assert_eq!(status_from_str(status_to_str(status)), status);
        }
    }
}
