//! Cluster control plane collaborator
//!
//! The single polymorphic deploy seam: the orchestrator drives every
//! forward rollout and every rollback through `set_traffic_weight`, and
//! samples health through `get_health_metrics`. The control plane
//! guarantees idempotency under retried calls with identical parameters.

use std::time::Duration;

use async_trait::async_trait;
use convoy_core::domain::artifact::ArtifactRef;
use convoy_core::domain::rollout::HealthSample;
use serde::Serialize;

use super::CollabError;

#[async_trait]
pub trait Deployer: Send + Sync {
    /// Shift traffic for an environment to the given artifact at the given
    /// weight (percent). Weight 0 removes the artifact from service;
    /// weight 100 is a full deploy.
    async fn set_traffic_weight(
        &self,
        environment: &str,
        artifact: &ArtifactRef,
        weight: u32,
    ) -> Result<(), CollabError>;

    /// Sample health metrics for an environment over the given window
    async fn get_health_metrics(
        &self,
        environment: &str,
        window: Duration,
    ) -> Result<HealthSample, CollabError>;
}

/// HTTP implementation against the cluster control plane API
pub struct HttpDeployer {
    base_url: String,
    client: reqwest::Client,
}

impl HttpDeployer {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct TrafficWeightRequest<'a> {
    artifact: &'a str,
    weight: u32,
}

#[async_trait]
impl Deployer for HttpDeployer {
    async fn set_traffic_weight(
        &self,
        environment: &str,
        artifact: &ArtifactRef,
        weight: u32,
    ) -> Result<(), CollabError> {
        let url = format!("{}/environments/{}/traffic", self.base_url, environment);
        let response = self
            .client
            .put(&url)
            .json(&TrafficWeightRequest {
                artifact: artifact.as_str(),
                weight,
            })
            .send()
            .await
            .map_err(|e| CollabError::RequestFailed {
                collaborator: "cluster",
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CollabError::ApiError {
                collaborator: "cluster",
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }

    async fn get_health_metrics(
        &self,
        environment: &str,
        window: Duration,
    ) -> Result<HealthSample, CollabError> {
        let url = format!(
            "{}/environments/{}/metrics?window={}",
            self.base_url,
            environment,
            window.as_secs()
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CollabError::RequestFailed {
                collaborator: "cluster",
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CollabError::ApiError {
                collaborator: "cluster",
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| CollabError::ParseError {
                collaborator: "cluster",
                message: e.to_string(),
            })
    }
}
