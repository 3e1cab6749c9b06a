//! API module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod approval;
pub mod error;
pub mod health;
pub mod run;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::service::orchestrator::Orchestrator;

/// Create the main API router with all endpoints
pub fn create_router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Run endpoints
        .route("/run/submit", post(run::submit_run))
        .route("/run/list", get(run::list_runs))
        .route("/run/{id}", get(run::get_run))
        .route("/run/{id}/abort", post(run::abort_run))
        // Approval endpoints
        .route("/stage/{id}/approve", post(approval::approve_stage))
        .route("/stage/{id}/reject", post(approval::reject_stage))
        // Add state and middleware
        .with_state(orchestrator)
        .layer(TraceLayer::new_for_http())
}
