//! Run DTOs for inter-service communication

use serde::{Deserialize, Serialize};

use crate::domain::run::PipelineRun;
use crate::domain::stage::StageExecution;

/// Request to submit a new artifact into the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRun {
    pub artifact_ref: String,
}

/// A run together with its stage executions, in declared order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDetails {
    pub run: PipelineRun,
    pub stages: Vec<StageExecution>,
}
