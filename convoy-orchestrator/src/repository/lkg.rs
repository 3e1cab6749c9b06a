//! Last-known-good repository
//!
//! Per-environment pointer to the most recent fully rolled-out artifact.

use convoy_core::domain::artifact::ArtifactRef;
use convoy_core::domain::lkg::LastKnownGood;
use sqlx::PgPool;

/// Record a new last-known-good artifact for an environment
///
/// Last-write-wins upsert; only a fully Succeeded rollout may call this.
pub async fn record(
    pool: &PgPool,
    environment: &str,
    artifact: &ArtifactRef,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO last_known_good (environment, artifact, recorded_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (environment)
        DO UPDATE SET artifact = EXCLUDED.artifact, recorded_at = EXCLUDED.recorded_at
        "#,
    )
    .bind(environment)
    .bind(artifact.as_str())
    .bind(chrono::Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Find the last-known-good artifact for an environment
pub async fn find_by_environment(
    pool: &PgPool,
    environment: &str,
) -> Result<Option<LastKnownGood>, sqlx::Error> {
    let row = sqlx::query_as::<_, LkgRow>(
        r#"
        SELECT environment, artifact, recorded_at
        FROM last_known_good
        WHERE environment = $1
        "#,
    )
    .bind(environment)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct LkgRow {
    environment: String,
    artifact: String,
    recorded_at: chrono::DateTime<chrono::Utc>,
}

impl From<LkgRow> for LastKnownGood {
    fn from(row: LkgRow) -> Self {
        LastKnownGood {
            environment: row.environment,
            artifact: ArtifactRef::new(row.artifact),
            recorded_at: row.recorded_at,
        }
    }
}
