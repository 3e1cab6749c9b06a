//! Last-known-good tracking

use serde::{Deserialize, Serialize};

use crate::domain::artifact::ArtifactRef;

/// Per-environment pointer to the most recent artifact that completed a
/// full successful rollout
///
/// Updated only when a stage execution for the environment reaches
/// Succeeded; read by the rollback manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastKnownGood {
    pub environment: String,
    pub artifact: ArtifactRef,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}
