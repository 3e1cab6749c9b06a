//! Run API handlers
//!
//! HTTP endpoints for run lifecycle management.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use convoy_core::domain::run::PipelineRun;
use convoy_core::dto::run::{RunDetails, SubmitRun};
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::service::orchestrator::Orchestrator;

/// POST /run/submit
/// Accept a new artifact into the pipeline
pub async fn submit_run(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(req): Json<SubmitRun>,
) -> ApiResult<(StatusCode, Json<PipelineRun>)> {
    tracing::info!("Submitting artifact: {}", req.artifact_ref);

    let run = orchestrator.submit(&req.artifact_ref).await?;

    Ok((StatusCode::CREATED, Json(run)))
}

/// GET /run/{id}
/// Get a run with its stage executions
pub async fn get_run(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RunDetails>> {
    tracing::debug!("Getting run: {}", id);

    let details = orchestrator.run_details(id).await?;

    Ok(Json(details))
}

/// GET /run/list
/// List all runs, newest first
pub async fn list_runs(
    State(orchestrator): State<Arc<Orchestrator>>,
) -> ApiResult<Json<Vec<PipelineRun>>> {
    tracing::debug!("Listing runs");

    let runs = orchestrator.list_runs().await?;

    Ok(Json(runs))
}

/// POST /run/{id}/abort
/// Request operator cancellation of a run
pub async fn abort_run(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    tracing::info!("Abort requested for run: {}", id);

    orchestrator.abort(id).await?;

    Ok(StatusCode::ACCEPTED)
}
