//! Scanner collaborator
//!
//! Fetches normalized findings (SAST, SCA, container) for an artifact.
//! A missing report is distinguishable from an empty one: the scanners may
//! still be running, or a tool may have crashed without producing output.

use async_trait::async_trait;
use convoy_core::domain::artifact::ArtifactRef;
use convoy_core::domain::gate::{Finding, FindingsReport};
use serde::Deserialize;

use super::CollabError;

#[async_trait]
pub trait ScannerHub: Send + Sync {
    /// Fetch the aggregated findings report for an artifact
    async fn get_findings(&self, artifact: &ArtifactRef) -> Result<FindingsReport, CollabError>;
}

/// HTTP implementation against the scanner aggregation API
pub struct HttpScannerHub {
    base_url: String,
    client: reqwest::Client,
}

impl HttpScannerHub {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct FindingsResponse {
    findings: Vec<Finding>,
}

#[async_trait]
impl ScannerHub for HttpScannerHub {
    async fn get_findings(&self, artifact: &ArtifactRef) -> Result<FindingsReport, CollabError> {
        let url = format!("{}/findings/{}", self.base_url, artifact);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CollabError::RequestFailed {
                collaborator: "scanner",
                source: e,
            })?;

        // 404 means no report exists for this artifact, which is a
        // distinct input state the gate policy decides on.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(FindingsReport::Missing);
        }

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CollabError::ApiError {
                collaborator: "scanner",
                status: status.as_u16(),
                message,
            });
        }

        let body: FindingsResponse =
            response.json().await.map_err(|e| CollabError::ParseError {
                collaborator: "scanner",
                message: e.to_string(),
            })?;

        Ok(FindingsReport::Available(body.findings))
    }
}
