//! Approval-related API endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use convoy_core::domain::stage::StageExecution;
use convoy_core::dto::approval::DecisionRequest;
use uuid::Uuid;

impl OrchestratorClient {
    /// Approve a stage awaiting approval
    ///
    /// # Arguments
    /// * `stage_id` - The stage UUID
    /// * `actor` - Identity of the approving actor
    pub async fn approve_stage(
        &self,
        stage_id: Uuid,
        actor: impl Into<String>,
    ) -> Result<StageExecution> {
        let url = format!("{}/stage/{}/approve", self.base_url, stage_id);
        let req = DecisionRequest {
            actor: actor.into(),
        };
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// Reject a stage awaiting approval
    ///
    /// # Arguments
    /// * `stage_id` - The stage UUID
    /// * `actor` - Identity of the rejecting actor
    pub async fn reject_stage(
        &self,
        stage_id: Uuid,
        actor: impl Into<String>,
    ) -> Result<StageExecution> {
        let url = format!("{}/stage/{}/reject", self.base_url, stage_id);
        let req = DecisionRequest {
            actor: actor.into(),
        };
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }
}
