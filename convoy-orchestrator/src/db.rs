use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create pipeline runs table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipeline_runs (
            id UUID PRIMARY KEY,
            artifact VARCHAR(512) NOT NULL,
            status VARCHAR(50) NOT NULL,
            abort_requested BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create stage executions table
    //
    // Gate verdict, approval record, and rollout state live in JSONB
    // columns so every stage mutation is a single atomic row write.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stage_executions (
            id UUID PRIMARY KEY,
            run_id UUID NOT NULL REFERENCES pipeline_runs(id) ON DELETE CASCADE,
            name VARCHAR(255) NOT NULL,
            environment VARCHAR(255) NOT NULL,
            sequence INTEGER NOT NULL,
            requires_approval BOOLEAN NOT NULL,
            status VARCHAR(50) NOT NULL,
            deploy_attempted BOOLEAN NOT NULL DEFAULT FALSE,
            gate_verdict JSONB,
            approval JSONB,
            rollout JSONB,
            failure_reason TEXT,
            started_at TIMESTAMPTZ,
            ended_at TIMESTAMPTZ,
            UNIQUE (run_id, sequence)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create last-known-good table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS last_known_good (
            environment VARCHAR(255) PRIMARY KEY,
            artifact VARCHAR(512) NOT NULL,
            recorded_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for poller and API queries
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_runs_status ON pipeline_runs(status)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_runs_created_at ON pipeline_runs(created_at DESC)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_stages_run_id ON stage_executions(run_id, sequence)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_stages_status ON stage_executions(status)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_stages_environment ON stage_executions(environment, status)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
