//! Declarative pipeline specification
//!
//! The explicit replacement for ad-hoc per-stage parameter maps: every knob
//! a stage needs is a named, typed field.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::gate::GatePolicy;

/// Ordered list of stages an artifact is promoted through
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub stages: Vec<StageSpec>,
}

/// Configuration for one stage of the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSpec {
    pub name: String,
    pub environment: String,
    #[serde(default)]
    pub requires_approval: bool,
    /// Seconds from approval request to automatic expiry.
    #[serde(default = "default_approval_deadline_secs")]
    pub approval_deadline_secs: u64,
    pub gate_policy: GatePolicy,
    /// Seconds a stage may wait in AwaitingGate before a missing scan
    /// report is handed to the policy's missing-report action.
    #[serde(default = "default_gate_timeout_secs")]
    pub gate_timeout_secs: u64,
    /// Traffic-weight steps for a canary rollout; empty means a plain
    /// full-traffic deploy.
    #[serde(default)]
    pub canary_steps: Vec<u32>,
    #[serde(default)]
    pub observation: ObservationWindow,
    #[serde(default)]
    pub thresholds: RolloutThresholds,
}

impl StageSpec {
    pub fn is_canary(&self) -> bool {
        !self.canary_steps.is_empty()
    }
}

/// How many health samples a canary step needs before a decision
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ObservationWindow {
    /// Consecutive polling intervals that must produce a qualifying sample.
    pub intervals: u32,
    /// Samples with fewer requests than this extend the window instead of
    /// feeding a decision.
    pub min_sample_count: u64,
}

impl Default for ObservationWindow {
    fn default() -> Self {
        Self {
            intervals: 3,
            min_sample_count: 20,
        }
    }
}

/// Abort thresholds for a canary step
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RolloutThresholds {
    /// Absolute windowed error-rate ceiling (0.0..=1.0).
    pub max_error_rate: f64,
    /// Abort when the windowed error rate exceeds this multiple of the
    /// pre-rollout baseline.
    pub relative_multiplier: f64,
}

impl Default for RolloutThresholds {
    fn default() -> Self {
        Self {
            max_error_rate: 0.05,
            relative_multiplier: 5.0,
        }
    }
}

/// Pipeline spec validation error
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("pipeline spec has no stages")]
    Empty,
    #[error("stage `{0}` has an empty name or environment")]
    UnnamedStage(String),
    #[error("duplicate stage name `{0}`")]
    DuplicateStage(String),
    #[error("stage `{stage}`: canary steps must be ascending and end at 100, got {steps:?}")]
    InvalidCanarySteps { stage: String, steps: Vec<u32> },
    #[error("stage `{stage}`: {field} must be greater than 0")]
    ZeroField { stage: String, field: &'static str },
}

impl PipelineSpec {
    /// Validates structural invariants of the spec
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.stages.is_empty() {
            return Err(SpecError::Empty);
        }

        let mut seen = std::collections::HashSet::new();
        for stage in &self.stages {
            if stage.name.is_empty() || stage.environment.is_empty() {
                return Err(SpecError::UnnamedStage(stage.name.clone()));
            }
            if !seen.insert(stage.name.clone()) {
                return Err(SpecError::DuplicateStage(stage.name.clone()));
            }
            if stage.requires_approval && stage.approval_deadline_secs == 0 {
                return Err(SpecError::ZeroField {
                    stage: stage.name.clone(),
                    field: "approval_deadline_secs",
                });
            }
            if stage.gate_timeout_secs == 0 {
                return Err(SpecError::ZeroField {
                    stage: stage.name.clone(),
                    field: "gate_timeout_secs",
                });
            }
            if stage.is_canary() {
                let steps = &stage.canary_steps;
                let ascending = steps.windows(2).all(|w| w[0] < w[1]);
                if !ascending || steps.last() != Some(&100) {
                    return Err(SpecError::InvalidCanarySteps {
                        stage: stage.name.clone(),
                        steps: steps.clone(),
                    });
                }
                if stage.observation.intervals == 0 {
                    return Err(SpecError::ZeroField {
                        stage: stage.name.clone(),
                        field: "observation.intervals",
                    });
                }
            }
        }

        Ok(())
    }

    /// Stage spec at a given sequence position
    pub fn stage(&self, sequence: u32) -> Option<&StageSpec> {
        self.stages.get(sequence as usize)
    }
}

impl Default for PipelineSpec {
    /// The standard dev -> staging -> production promotion path
    fn default() -> Self {
        Self {
            stages: vec![
                StageSpec {
                    name: "dev-deploy".to_string(),
                    environment: "dev".to_string(),
                    requires_approval: false,
                    approval_deadline_secs: default_approval_deadline_secs(),
                    gate_policy: GatePolicy::strict("dev-gate"),
                    gate_timeout_secs: default_gate_timeout_secs(),
                    canary_steps: Vec::new(),
                    observation: ObservationWindow::default(),
                    thresholds: RolloutThresholds::default(),
                },
                StageSpec {
                    name: "staging-deploy".to_string(),
                    environment: "staging".to_string(),
                    requires_approval: true,
                    approval_deadline_secs: default_approval_deadline_secs(),
                    gate_policy: GatePolicy::strict("staging-gate"),
                    gate_timeout_secs: default_gate_timeout_secs(),
                    canary_steps: Vec::new(),
                    observation: ObservationWindow::default(),
                    thresholds: RolloutThresholds::default(),
                },
                StageSpec {
                    name: "production-deploy".to_string(),
                    environment: "production".to_string(),
                    requires_approval: true,
                    approval_deadline_secs: default_approval_deadline_secs(),
                    gate_policy: GatePolicy::strict("production-gate"),
                    gate_timeout_secs: default_gate_timeout_secs(),
                    canary_steps: vec![10, 50, 100],
                    observation: ObservationWindow::default(),
                    thresholds: RolloutThresholds::default(),
                },
            ],
        }
    }
}

fn default_approval_deadline_secs() -> u64 {
    3600
}

fn default_gate_timeout_secs() -> u64 {
    900
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_spec_is_valid() {
        let spec = PipelineSpec::default();
        assert!(spec.validate().is_ok());
        assert_eq!(spec.stages.len(), 3);
        assert!(spec.stages[2].is_canary());
    }

    #[test]
    fn test_empty_spec_rejected() {
        let spec = PipelineSpec { stages: Vec::new() };
        assert!(matches!(spec.validate(), Err(SpecError::Empty)));
    }

    #[test]
    fn test_canary_steps_must_end_at_full_traffic() {
        let mut spec = PipelineSpec::default();
        spec.stages[2].canary_steps = vec![10, 50];
        assert!(matches!(
            spec.validate(),
            Err(SpecError::InvalidCanarySteps { .. })
        ));

        spec.stages[2].canary_steps = vec![50, 10, 100];
        assert!(matches!(
            spec.validate(),
            Err(SpecError::InvalidCanarySteps { .. })
        ));
    }

    #[test]
    fn test_duplicate_stage_names_rejected() {
        let mut spec = PipelineSpec::default();
        spec.stages[1].name = spec.stages[0].name.clone();
        assert!(matches!(
            spec.validate(),
            Err(SpecError::DuplicateStage(_))
        ));
    }
}
