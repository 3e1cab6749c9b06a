//! Approval API handlers
//!
//! HTTP endpoints for resolving stage approvals. The stage itself
//! transitions on the orchestrator's next poll; these endpoints only
//! record the human decision.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use convoy_core::domain::approval::ApprovalDecision;
use convoy_core::domain::stage::StageExecution;
use convoy_core::dto::approval::DecisionRequest;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::service::orchestrator::Orchestrator;

/// POST /stage/{id}/approve
/// Approve a stage awaiting approval
pub async fn approve_stage(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(id): Path<Uuid>,
    Json(req): Json<DecisionRequest>,
) -> ApiResult<Json<StageExecution>> {
    decide(orchestrator, id, req, ApprovalDecision::Approved).await
}

/// POST /stage/{id}/reject
/// Reject a stage awaiting approval
pub async fn reject_stage(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(id): Path<Uuid>,
    Json(req): Json<DecisionRequest>,
) -> ApiResult<Json<StageExecution>> {
    decide(orchestrator, id, req, ApprovalDecision::Rejected).await
}

async fn decide(
    orchestrator: Arc<Orchestrator>,
    id: Uuid,
    req: DecisionRequest,
    decision: ApprovalDecision,
) -> ApiResult<Json<StageExecution>> {
    if req.actor.trim().is_empty() {
        return Err(ApiError::BadRequest("actor must not be empty".to_string()));
    }

    tracing::info!("Stage {} decision {} by {}", id, decision, req.actor);

    let stage = orchestrator.decide_stage(id, &req.actor, decision).await?;

    Ok(Json(stage))
}
