//! API error handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::service::orchestrator::OrchestratorError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    /// The targeted record is already terminal (first decision wins).
    Conflict(String),
    DatabaseError(sqlx::Error),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::DatabaseError(err) => {
                tracing::error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::RunNotFound(id) => {
                ApiError::NotFound(format!("Run {} not found", id))
            }
            OrchestratorError::StageNotFound(id) => {
                ApiError::NotFound(format!("Stage {} not found", id))
            }
            OrchestratorError::UnknownArtifact(reference) => {
                ApiError::BadRequest(format!("Artifact `{}` not found", reference))
            }
            OrchestratorError::AlreadyTerminal(id) => {
                ApiError::Conflict(format!("Run {} is already terminal", id))
            }
            OrchestratorError::NotAwaitingApproval(id) => {
                ApiError::Conflict(format!("Stage {} is not awaiting approval", id))
            }
            OrchestratorError::Approval(e) => ApiError::Conflict(e.to_string()),
            OrchestratorError::Database(e) => ApiError::DatabaseError(e),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::DatabaseError(err)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
