//! Canary rollout domain types

use serde::{Deserialize, Serialize};

/// Progressive traffic-shift bookkeeping for a canary stage
///
/// The current step index only increases; an Abort decision transitions the
/// owning stage to Failed and triggers rollback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutState {
    pub steps: Vec<RolloutStep>,
    pub current_step: usize,
    /// Pre-rollout error rate, sampled before the first traffic shift.
    /// Reference point for the relative-regression check.
    pub baseline_error_rate: f64,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

/// One traffic-weight step of a rollout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutStep {
    /// Traffic weight in percent (e.g. 10, 50, 100).
    pub weight: u32,
    /// Health samples observed at this weight, one per polling interval.
    pub samples: Vec<HealthSample>,
    pub decision: Option<StepDecision>,
}

/// One health observation from the cluster control plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthSample {
    /// Failed requests / total requests within the observation window,
    /// not a cumulative counter.
    pub error_rate: f64,
    pub latency_ms: f64,
    pub sample_count: u64,
}

/// Per-step rollout decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepDecision {
    /// Move to the next weight step (or complete, at the final step).
    Advance,
    /// Observation window not yet conclusive; keep sampling.
    Hold,
    /// Regression detected; revert traffic and hand off to rollback.
    Abort,
}

impl RolloutState {
    pub fn new(
        weights: &[u32],
        baseline_error_rate: f64,
        started_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Self {
            steps: weights
                .iter()
                .map(|&weight| RolloutStep {
                    weight,
                    samples: Vec::new(),
                    decision: None,
                })
                .collect(),
            current_step: 0,
            baseline_error_rate,
            started_at,
        }
    }

    /// Traffic weight of the step currently being observed
    pub fn current_weight(&self) -> Option<u32> {
        self.steps.get(self.current_step).map(|s| s.weight)
    }

    /// The rollout is complete once the final step has advanced
    pub fn is_complete(&self) -> bool {
        self.steps
            .last()
            .is_some_and(|s| s.decision == Some(StepDecision::Advance))
    }

    pub fn is_aborted(&self) -> bool {
        self.steps
            .iter()
            .any(|s| s.decision == Some(StepDecision::Abort))
    }
}
