//! Approval DTOs for inter-service communication

use serde::{Deserialize, Serialize};

/// Request to approve or reject a stage awaiting approval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRequest {
    /// Identity of the deciding actor.
    pub actor: String,
}
