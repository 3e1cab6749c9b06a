//! Run poller
//!
//! Drives every active pipeline run on a fixed interval. Each cycle loads
//! the non-terminal runs and calls `advance` once per run; `advance` may
//! return without progressing (still awaiting a gate, an approval, or an
//! observation window), which is a suspension point, not an error.
//!
//! Polling rather than event callbacks means a lost external signal is
//! eventually reconciled by re-querying collaborator state.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::time::{self, Duration};
use tracing::{debug, error, info};

use crate::repository::run_repository;
use crate::service::orchestrator::Orchestrator;

/// Poller that continuously advances active runs
pub struct RunPoller {
    orchestrator: Arc<Orchestrator>,
    interval: Duration,
}

impl RunPoller {
    pub fn new(orchestrator: Arc<Orchestrator>, interval: Duration) -> Self {
        Self {
            orchestrator,
            interval,
        }
    }

    /// Starts the polling loop
    pub async fn run(&self) -> Result<()> {
        info!("Starting run poller (interval: {:?})", self.interval);

        let mut interval = time::interval(self.interval);

        loop {
            interval.tick().await;

            debug!("Polling active runs");

            match self.poll_once().await {
                Ok(advanced) => {
                    if advanced > 0 {
                        debug!("Advanced {} run(s) this cycle", advanced);
                    }
                }
                Err(e) => {
                    error!("Error during poll cycle: {:#}", e);
                }
            }
        }
    }

    /// Performs a single poll cycle
    ///
    /// Runs are advanced sequentially; per-run failures are logged and do
    /// not stop the cycle.
    pub async fn poll_once(&self) -> Result<usize> {
        let runs = run_repository::list_active(self.orchestrator.pool())
            .await
            .context("Failed to list active runs")?;

        if runs.is_empty() {
            return Ok(0);
        }

        let mut advanced = 0;
        for run in runs {
            match self.orchestrator.advance(run.id).await {
                Ok(()) => advanced += 1,
                Err(e) => {
                    error!("Failed to advance run {}: {:#}", run.id, e);
                }
            }
        }

        Ok(advanced)
    }
}
