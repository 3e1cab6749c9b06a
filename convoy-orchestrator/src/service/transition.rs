//! Stage status transition table
//!
//! The single source of truth for which stage transitions are legal. The
//! orchestrator refuses any edge not listed here; an illegal edge at
//! runtime is an invariant violation, never guessed forward.

use convoy_core::domain::stage::StageStatus;

/// Whether a stage may move from `from` to `to`
pub fn is_legal(from: StageStatus, to: StageStatus) -> bool {
    use StageStatus::*;

    matches!(
        (from, to),
        (Pending, AwaitingGate)
            | (Pending, Failed)
            | (AwaitingGate, AwaitingApproval)
            | (AwaitingGate, Deploying)
            | (AwaitingGate, Failed)
            | (AwaitingApproval, Deploying)
            | (AwaitingApproval, Failed)
            | (Deploying, Canarying)
            | (Deploying, Succeeded)
            | (Deploying, Failed)
            | (Canarying, Succeeded)
            | (Canarying, Failed)
            | (Failed, RolledBack)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use StageStatus::*;

    #[test]
    fn test_happy_path_without_approval() {
        assert!(is_legal(Pending, AwaitingGate));
        assert!(is_legal(AwaitingGate, Deploying));
        assert!(is_legal(Deploying, Succeeded));
    }

    #[test]
    fn test_happy_path_with_approval_and_canary() {
        assert!(is_legal(AwaitingGate, AwaitingApproval));
        assert!(is_legal(AwaitingApproval, Deploying));
        assert!(is_legal(Deploying, Canarying));
        assert!(is_legal(Canarying, Succeeded));
    }

    #[test]
    fn test_gate_failure_blocks_deploy_and_approval() {
        // A failed gate goes straight to Failed; there is no edge from
        // AwaitingGate that bypasses the verdict.
        assert!(is_legal(AwaitingGate, Failed));
        assert!(!is_legal(Failed, Deploying));
        assert!(!is_legal(Failed, AwaitingApproval));
        assert!(!is_legal(Failed, Canarying));
    }

    #[test]
    fn test_approval_cannot_be_skipped_backwards() {
        assert!(!is_legal(AwaitingApproval, AwaitingGate));
        assert!(!is_legal(Deploying, AwaitingApproval));
        assert!(!is_legal(Canarying, Deploying));
    }

    #[test]
    fn test_rollback_only_from_failed() {
        assert!(is_legal(Failed, RolledBack));
        assert!(!is_legal(Succeeded, RolledBack));
        assert!(!is_legal(Canarying, RolledBack));
    }

    #[test]
    fn test_terminal_states_are_terminal() {
        for terminal in [Succeeded, RolledBack] {
            for target in [
                Pending,
                AwaitingGate,
                AwaitingApproval,
                Deploying,
                Canarying,
                Succeeded,
                Failed,
                RolledBack,
            ] {
                assert!(!is_legal(terminal, target));
            }
        }
    }
}
