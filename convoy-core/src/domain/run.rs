//! Pipeline run domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::artifact::ArtifactRef;

/// One execution of the full pipeline for a given artifact
///
/// Structure shared between the orchestrator (persists) and clients (read).
/// Mutated only by the orchestrator; stage executions are stored separately
/// and joined in `dto::run::RunDetails`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: Uuid,
    pub artifact: ArtifactRef,
    pub status: RunStatus,
    /// Operator cancellation flag, honored between stage transitions only.
    pub abort_requested: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Overall run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    RolledBack,
    /// Frozen after a detected invariant violation. Never auto-resolved;
    /// requires manual intervention.
    Quarantined,
}

impl RunStatus {
    /// Whether the run can still make progress
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunStatus::Pending | RunStatus::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!RunStatus::Pending.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Succeeded.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::RolledBack.is_terminal());
        assert!(RunStatus::Quarantined.is_terminal());
    }
}
