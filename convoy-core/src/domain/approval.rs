//! Approval domain types

use serde::{Deserialize, Serialize};

/// Human decision gating promotion of a stage
///
/// The deadline is fixed at creation; once Approved, Rejected, or Expired
/// the record is immutable (first decision wins).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub requested_at: chrono::DateTime<chrono::Utc>,
    pub deadline: chrono::DateTime<chrono::Utc>,
    pub decision: ApprovalDecision,
    /// Identity of the deciding actor; None until decided.
    pub actor: Option<String>,
    pub decided_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl ApprovalRecord {
    pub fn is_resolved(&self) -> bool {
        self.decision != ApprovalDecision::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalDecision {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl std::fmt::Display for ApprovalDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ApprovalDecision::Pending => "Pending",
            ApprovalDecision::Approved => "Approved",
            ApprovalDecision::Rejected => "Rejected",
            ApprovalDecision::Expired => "Expired",
        };
        write!(f, "{}", s)
    }
}
