//! Rollout controller
//!
//! Drives a canary traffic-shift sequence: at each weight step, health
//! samples accumulate over an observation window and produce an Advance,
//! Hold, or Abort decision. Decision logic is pure over the rollout state;
//! the orchestrator issues the actual traffic-shift calls.

use convoy_core::domain::rollout::{HealthSample, RolloutState, StepDecision};
use convoy_core::domain::spec::{ObservationWindow, RolloutThresholds};

/// Record a health sample for the current step and decide what to do
///
/// Decision rule per step:
/// - Abort when the windowed error rate exceeds the absolute threshold, or
///   exceeds the relative multiple of the pre-rollout baseline.
/// - Hold while the window lacks enough qualifying samples; samples below
///   the minimum request count extend the window instead of feeding a
///   decision.
/// - Advance otherwise, moving to the next weight step. Advance at the
///   final (100%) step completes the rollout.
///
/// The current step index never decreases; an Abort never advances it.
pub fn tick(
    state: &mut RolloutState,
    sample: HealthSample,
    window: &ObservationWindow,
    thresholds: &RolloutThresholds,
) -> StepDecision {
    let baseline = state.baseline_error_rate;
    let step_index = state.current_step;

    let Some(step) = state.steps.get_mut(step_index) else {
        // Past the last step: the rollout is already complete.
        return StepDecision::Advance;
    };

    step.samples.push(sample);

    let qualifying: Vec<&HealthSample> = step
        .samples
        .iter()
        .filter(|s| s.sample_count >= window.min_sample_count)
        .collect();

    if (qualifying.len() as u32) < window.intervals {
        step.decision = Some(StepDecision::Hold);
        return StepDecision::Hold;
    }

    // Windowed error rate over the qualifying samples, weighted by request
    // count so a large interval is not drowned out by small ones.
    let total_requests: u64 = qualifying.iter().map(|s| s.sample_count).sum();
    let failed_requests: f64 = qualifying
        .iter()
        .map(|s| s.error_rate * s.sample_count as f64)
        .sum();
    let error_rate = failed_requests / total_requests as f64;

    let absolute_breach = error_rate > thresholds.max_error_rate;
    // A zero baseline would abort on any nonzero sample; the absolute
    // threshold alone governs in that case.
    let relative_breach =
        baseline > 0.0 && error_rate > baseline * thresholds.relative_multiplier;

    let decision = if absolute_breach || relative_breach {
        StepDecision::Abort
    } else {
        StepDecision::Advance
    };

    step.decision = Some(decision);

    if decision == StepDecision::Advance && state.current_step + 1 < state.steps.len() {
        state.current_step += 1;
    }

    decision
}

/// What a tick decision means for the owning stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDecisionOutcome {
    /// Keep observing (Hold, or Advance to a further step).
    Continue,
    /// The final step advanced: the rollout is done.
    Complete,
    /// Regression: revert traffic and hand off to rollback.
    Aborted,
}

/// Classify a tick decision against the rollout state
pub fn outcome(state: &RolloutState, decision: StepDecision) -> StepDecisionOutcome {
    match decision {
        StepDecision::Hold => StepDecisionOutcome::Continue,
        StepDecision::Advance if state.is_complete() => StepDecisionOutcome::Complete,
        StepDecision::Advance => StepDecisionOutcome::Continue,
        StepDecision::Abort => StepDecisionOutcome::Aborted,
    }
}

/// Record an externally forced abort (operator cancellation mid-rollout)
/// on the current step
pub fn force_abort(state: &mut RolloutState) {
    let index = state.current_step;
    if let Some(step) = state.steps.get_mut(index) {
        step.decision = Some(StepDecision::Abort);
    }
}

/// Failure reason for an aborted rollout
pub fn abort_reason(state: &RolloutState, thresholds: &RolloutThresholds) -> String {
    let weight = state.current_weight().unwrap_or(0);
    format!(
        "canary aborted at weight {}%: error rate exceeded threshold (max {:.2}%, {}x baseline {:.2}%)",
        weight,
        thresholds.max_error_rate * 100.0,
        thresholds.relative_multiplier,
        state.baseline_error_rate * 100.0
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(weights: &[u32], baseline: f64) -> RolloutState {
        RolloutState::new(weights, baseline, "2024-01-01T00:00:00Z".parse().unwrap())
    }

    fn sample(error_rate: f64, count: u64) -> HealthSample {
        HealthSample {
            error_rate,
            latency_ms: 40.0,
            sample_count: count,
        }
    }

    fn window() -> ObservationWindow {
        ObservationWindow {
            intervals: 3,
            min_sample_count: 20,
        }
    }

    fn thresholds() -> RolloutThresholds {
        RolloutThresholds {
            max_error_rate: 0.05,
            relative_multiplier: 5.0,
        }
    }

    #[test]
    fn test_holds_until_window_filled() {
        let mut state = state(&[10, 50, 100], 0.01);

        assert_eq!(
            tick(&mut state, sample(0.01, 100), &window(), &thresholds()),
            StepDecision::Hold
        );
        assert_eq!(
            tick(&mut state, sample(0.01, 100), &window(), &thresholds()),
            StepDecision::Hold
        );
        assert_eq!(state.current_step, 0);

        assert_eq!(
            tick(&mut state, sample(0.01, 100), &window(), &thresholds()),
            StepDecision::Advance
        );
        assert_eq!(state.current_step, 1);
    }

    #[test]
    fn test_low_traffic_samples_extend_window() {
        let mut state = state(&[10, 100], 0.01);
        let w = window();
        let t = thresholds();

        // Three samples below the minimum request count never qualify.
        for _ in 0..3 {
            assert_eq!(
                tick(&mut state, sample(0.9, 5), &w, &t),
                StepDecision::Hold
            );
        }
        assert_eq!(state.current_step, 0);
    }

    #[test]
    fn test_absolute_threshold_aborts() {
        let mut state = state(&[10, 100], 0.0);
        let w = window();
        let t = thresholds();

        tick(&mut state, sample(0.08, 100), &w, &t);
        tick(&mut state, sample(0.08, 100), &w, &t);
        let decision = tick(&mut state, sample(0.08, 100), &w, &t);

        assert_eq!(decision, StepDecision::Abort);
        assert_eq!(state.current_step, 0);
        assert!(state.is_aborted());
    }

    #[test]
    fn test_relative_regression_aborts() {
        // 4% stays under the 5% absolute ceiling but is 8x the 0.5%
        // baseline, past the 5x relative threshold.
        let mut state = state(&[50, 100], 0.005);
        let w = window();
        let t = thresholds();

        tick(&mut state, sample(0.04, 200), &w, &t);
        tick(&mut state, sample(0.04, 200), &w, &t);
        let decision = tick(&mut state, sample(0.04, 200), &w, &t);

        assert_eq!(decision, StepDecision::Abort);
    }

    #[test]
    fn test_zero_baseline_disables_relative_check() {
        let mut state = state(&[100], 0.0);
        let w = window();
        let t = thresholds();

        tick(&mut state, sample(0.01, 100), &w, &t);
        tick(&mut state, sample(0.01, 100), &w, &t);
        let decision = tick(&mut state, sample(0.01, 100), &w, &t);

        assert_eq!(decision, StepDecision::Advance);
        assert!(state.is_complete());
    }

    #[test]
    fn test_completes_at_full_weight() {
        let mut state = state(&[10, 50, 100], 0.01);
        let w = window();
        let t = thresholds();

        for expected_step in [1, 2] {
            for _ in 0..2 {
                tick(&mut state, sample(0.01, 100), &w, &t);
            }
            tick(&mut state, sample(0.01, 100), &w, &t);
            assert_eq!(state.current_step, expected_step);
        }

        assert!(!state.is_complete());
        for _ in 0..2 {
            tick(&mut state, sample(0.01, 100), &w, &t);
        }
        assert_eq!(
            tick(&mut state, sample(0.01, 100), &w, &t),
            StepDecision::Advance
        );
        assert!(state.is_complete());
        assert_eq!(state.current_step, 2);
    }

    #[test]
    fn test_step_index_is_monotone() {
        let mut state = state(&[10, 50, 100], 0.01);
        let w = window();
        let t = thresholds();
        let mut last_index = 0;

        // Advance one step, then force an abort; the index never moves
        // backwards and an abort never increases it.
        for _ in 0..3 {
            tick(&mut state, sample(0.01, 100), &w, &t);
            assert!(state.current_step >= last_index);
            last_index = state.current_step;
        }
        assert_eq!(state.current_step, 1);

        for _ in 0..3 {
            tick(&mut state, sample(0.5, 100), &w, &t);
            assert!(state.current_step >= last_index);
            last_index = state.current_step;
        }
        assert_eq!(state.current_step, 1);
        assert!(state.is_aborted());
    }

    #[test]
    fn test_outcome_classification() {
        let mut s = state(&[10, 100], 0.01);
        assert_eq!(
            outcome(&s, StepDecision::Hold),
            StepDecisionOutcome::Continue
        );
        assert_eq!(
            outcome(&s, StepDecision::Advance),
            StepDecisionOutcome::Continue
        );
        assert_eq!(
            outcome(&s, StepDecision::Abort),
            StepDecisionOutcome::Aborted
        );

        s.current_step = 1;
        s.steps[1].decision = Some(StepDecision::Advance);
        assert_eq!(
            outcome(&s, StepDecision::Advance),
            StepDecisionOutcome::Complete
        );
    }

    #[test]
    fn test_force_abort_marks_current_step() {
        let mut s = state(&[10, 50, 100], 0.01);
        s.current_step = 1;
        force_abort(&mut s);
        assert!(s.is_aborted());
        assert_eq!(s.steps[1].decision, Some(StepDecision::Abort));
        assert_eq!(s.current_step, 1);
    }

    #[test]
    fn test_windowed_rate_ignores_earlier_steps() {
        // A bad blip at step 0 must not poison step 1's window: rates are
        // computed per step, not cumulatively.
        let mut state = state(&[10, 100], 0.01);
        let w = ObservationWindow {
            intervals: 1,
            min_sample_count: 20,
        };
        let t = thresholds();

        // Error-free step 0 advances.
        assert_eq!(
            tick(&mut state, sample(0.01, 100), &w, &t),
            StepDecision::Advance
        );
        assert_eq!(state.current_step, 1);

        // Step 1 decides on its own samples only.
        assert_eq!(
            tick(&mut state, sample(0.02, 100), &w, &t),
            StepDecision::Advance
        );
        assert!(state.is_complete());
    }
}
