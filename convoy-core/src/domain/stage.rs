//! Stage execution domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::approval::ApprovalRecord;
use crate::domain::gate::GateVerdict;
use crate::domain::rollout::RolloutState;

/// One environment-scoped attempt within a pipeline run (e.g. "staging deploy")
///
/// Created by the orchestrator when its predecessor succeeds; mutated by the
/// gate evaluator, approval coordinator, and rollout controller; immutable
/// once terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageExecution {
    pub id: Uuid,
    pub run_id: Uuid,
    pub name: String,
    pub environment: String,
    /// Position in the declared stage order. At most one stage per run is
    /// non-terminal at any time.
    pub sequence: u32,
    pub requires_approval: bool,
    pub status: StageStatus,
    /// Set when the stage enters Deploying, before any traffic call is
    /// issued. Survives the transition to Failed, where it decides
    /// whether rollback must run: only a stage that touched the cluster
    /// is rolled back.
    pub deploy_attempted: bool,
    pub gate_verdict: Option<GateVerdict>,
    pub approval: Option<ApprovalRecord>,
    pub rollout: Option<RolloutState>,
    pub failure_reason: Option<String>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Stage execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageStatus {
    Pending,
    AwaitingGate,
    AwaitingApproval,
    Deploying,
    Canarying,
    Succeeded,
    Failed,
    RolledBack,
}

impl StageStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StageStatus::Succeeded | StageStatus::Failed | StageStatus::RolledBack
        )
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StageStatus::Pending => "Pending",
            StageStatus::AwaitingGate => "AwaitingGate",
            StageStatus::AwaitingApproval => "AwaitingApproval",
            StageStatus::Deploying => "Deploying",
            StageStatus::Canarying => "Canarying",
            StageStatus::Succeeded => "Succeeded",
            StageStatus::Failed => "Failed",
            StageStatus::RolledBack => "RolledBack",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(StageStatus::Succeeded.is_terminal());
        assert!(StageStatus::Failed.is_terminal());
        assert!(StageStatus::RolledBack.is_terminal());
        assert!(!StageStatus::Pending.is_terminal());
        assert!(!StageStatus::AwaitingGate.is_terminal());
        assert!(!StageStatus::AwaitingApproval.is_terminal());
        assert!(!StageStatus::Deploying.is_terminal());
        assert!(!StageStatus::Canarying.is_terminal());
    }
}
