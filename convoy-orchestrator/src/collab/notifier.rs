//! Notification sink collaborator
//!
//! Best-effort event delivery: notifications never affect pipeline state,
//! so sends are spawned fire-and-forget and failures are only logged.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CollabError;

/// Events emitted to the notification sink
///
/// This doubles as the operational alert channel; FatalOperationalAlert
/// and quarantine events are the escalation path for conditions that
/// require manual intervention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NotificationEvent {
    ApprovalRequested {
        stage_id: Uuid,
        stage_name: String,
        artifact: String,
        deadline: chrono::DateTime<chrono::Utc>,
    },
    RolloutAborted {
        environment: String,
        artifact: String,
        reason: String,
    },
    RollbackCompleted {
        environment: String,
        restored_artifact: String,
    },
    /// The environment has no last-known-good and is now undeployed.
    EnvironmentUndeployed { environment: String },
    /// Retries exhausted on a critical operation; manual intervention
    /// required.
    FatalOperationalAlert { environment: String, reason: String },
    RunQuarantined { run_id: Uuid, reason: String },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: NotificationEvent) -> Result<(), CollabError>;
}

/// Send a notification without blocking or failing the caller
pub fn notify_best_effort(notifier: Arc<dyn Notifier>, event: NotificationEvent) {
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(event).await {
            tracing::warn!("Notification delivery failed: {}", e);
        }
    });
}

/// HTTP implementation against the notification sink API
pub struct HttpNotifier {
    base_url: String,
    client: reqwest::Client,
}

impl HttpNotifier {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, event: NotificationEvent) -> Result<(), CollabError> {
        let url = format!("{}/events", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&event)
            .send()
            .await
            .map_err(|e| CollabError::RequestFailed {
                collaborator: "notification sink",
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CollabError::ApiError {
                collaborator: "notification sink",
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}
