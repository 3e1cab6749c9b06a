//! Run-related API endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use convoy_core::domain::run::PipelineRun;
use convoy_core::dto::run::{RunDetails, SubmitRun};
use uuid::Uuid;

impl OrchestratorClient {
    /// Submit an artifact into the pipeline
    ///
    /// # Arguments
    /// * `artifact_ref` - Content-addressed artifact reference
    ///
    /// # Returns
    /// The created run
    pub async fn submit_run(&self, artifact_ref: impl Into<String>) -> Result<PipelineRun> {
        let url = format!("{}/run/submit", self.base_url);
        let req = SubmitRun {
            artifact_ref: artifact_ref.into(),
        };
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// Get a run and its stage executions
    ///
    /// # Arguments
    /// * `run_id` - The run UUID
    pub async fn get_run(&self, run_id: Uuid) -> Result<RunDetails> {
        let url = format!("{}/run/{}", self.base_url, run_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// List all runs, newest first
    pub async fn list_runs(&self) -> Result<Vec<PipelineRun>> {
        let url = format!("{}/run/list", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Request operator cancellation of a run
    ///
    /// # Arguments
    /// * `run_id` - The run UUID
    pub async fn abort_run(&self, run_id: Uuid) -> Result<()> {
        let url = format!("{}/run/{}/abort", self.base_url, run_id);
        let response = self.client.post(&url).send().await?;

        self.handle_empty_response(response).await
    }
}
