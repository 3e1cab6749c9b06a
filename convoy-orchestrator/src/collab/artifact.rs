//! Artifact builder collaborator
//!
//! Resolves artifact references to stable content digests. Two runs with
//! equal digests deploy identical content.

use async_trait::async_trait;
use convoy_core::domain::artifact::ArtifactInfo;

use super::CollabError;

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Resolve an artifact reference
    async fn get_artifact(&self, reference: &str) -> Result<ArtifactInfo, CollabError>;
}

/// HTTP implementation against the artifact builder/registry API
pub struct HttpArtifactStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpArtifactStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ArtifactStore for HttpArtifactStore {
    async fn get_artifact(&self, reference: &str) -> Result<ArtifactInfo, CollabError> {
        let url = format!("{}/artifacts/{}", self.base_url, reference);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CollabError::RequestFailed {
                collaborator: "artifact store",
                source: e,
            })?;

        // An unknown reference is a well-formed answer, not an error.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(ArtifactInfo {
                exists: false,
                digest: None,
            });
        }

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CollabError::ApiError {
                collaborator: "artifact store",
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| CollabError::ParseError {
                collaborator: "artifact store",
                message: e.to_string(),
            })
    }
}
