//! Collaborator seams
//!
//! The orchestrator consumes its collaborators (artifact builder, scanners,
//! cluster control plane, notification sink) only through these traits.
//! Each has a reqwest-backed HTTP implementation; tests substitute
//! in-memory fakes.

pub mod artifact;
pub mod deployer;
pub mod notifier;
pub mod scanner;

pub use artifact::ArtifactStore;
pub use deployer::Deployer;
pub use notifier::{NotificationEvent, Notifier};
pub use scanner::ScannerHub;

use std::time::Duration;
use thiserror::Error;

/// Errors from collaborator calls
#[derive(Debug, Error)]
pub enum CollabError {
    /// HTTP request failed before producing a response
    #[error("request to {collaborator} failed: {source}")]
    RequestFailed {
        collaborator: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Collaborator returned an error status code
    #[error("{collaborator} returned status {status}: {message}")]
    ApiError {
        collaborator: &'static str,
        status: u16,
        message: String,
    },

    /// Response body could not be parsed
    #[error("failed to parse {collaborator} response: {message}")]
    ParseError {
        collaborator: &'static str,
        message: String,
    },
}

impl CollabError {
    /// Whether retrying the same call may succeed
    ///
    /// Connection failures, timeouts, and 5xx responses are transient;
    /// 4xx responses and parse failures are not.
    pub fn is_transient(&self) -> bool {
        match self {
            CollabError::RequestFailed { .. } => true,
            CollabError::ApiError { status, .. } => *status >= 500,
            CollabError::ParseError { .. } => false,
        }
    }
}

/// Retry a collaborator call with bounded exponential backoff
///
/// Non-transient errors short-circuit; transient errors are retried up to
/// `max_attempts` with doubling delay capped at `MAX_DELAY_MS`.
pub async fn with_retry<T, F, Fut>(
    op: &'static str,
    max_attempts: u32,
    mut call: F,
) -> Result<T, CollabError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CollabError>>,
{
    const INITIAL_DELAY_MS: u64 = 500;
    const MAX_DELAY_MS: u64 = 10_000;

    let mut attempt = 0;
    let mut delay_ms = INITIAL_DELAY_MS;

    loop {
        attempt += 1;

        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                tracing::warn!(
                    "{} failed (attempt {}/{}), retrying in {} ms: {}",
                    op,
                    attempt,
                    max_attempts,
                    delay_ms,
                    e
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                delay_ms = (delay_ms * 2).min(MAX_DELAY_MS);
            }
            Err(e) => {
                tracing::error!("{} failed after {} attempt(s): {}", op, attempt, e);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> CollabError {
        CollabError::ApiError {
            collaborator: "cluster",
            status: 503,
            message: "unavailable".to_string(),
        }
    }

    fn permanent() -> CollabError {
        CollabError::ApiError {
            collaborator: "cluster",
            status: 404,
            message: "no such environment".to_string(),
        }
    }

    #[test]
    fn test_transient_classification() {
        assert!(transient().is_transient());
        assert!(!permanent().is_transient());
        assert!(
            !CollabError::ParseError {
                collaborator: "scanner",
                message: "bad json".to_string(),
            }
            .is_transient()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_from_transient_errors() {
        let calls = AtomicU32::new(0);

        let result = with_retry("test op", 3, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(transient())
                } else {
                    Ok(42u32)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausts_budget() {
        let calls = AtomicU32::new(0);

        let result: Result<u32, _> = with_retry("test op", 3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(transient()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_short_circuit() {
        let calls = AtomicU32::new(0);

        let result: Result<u32, _> = with_retry("test op", 3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(permanent()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
