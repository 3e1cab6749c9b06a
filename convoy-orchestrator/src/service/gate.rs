//! Gate evaluator
//!
//! Applies a per-stage pass/fail policy to scan findings. Evaluation is a
//! pure function of (findings, policy, timestamp): no hidden state, no
//! clock reads, so it is fully unit-testable without mocks.

use std::collections::BTreeMap;

use convoy_core::domain::gate::{
    FindingsReport, GatePolicy, GateVerdict, MissingReportAction, Severity, Verdict, Violation,
};

/// Evaluate a findings report against a stage's gate policy
///
/// The verdict is Fail when any severity's finding count exceeds its
/// configured maximum. A missing report is routed through the policy's
/// missing-report action rather than treated as zero findings.
pub fn evaluate(
    policy: &GatePolicy,
    report: &FindingsReport,
    now: chrono::DateTime<chrono::Utc>,
) -> GateVerdict {
    let findings = match report {
        FindingsReport::Available(findings) => findings,
        FindingsReport::Missing => {
            let verdict = match policy.on_missing_report {
                MissingReportAction::Fail => Verdict::Fail,
                MissingReportAction::Pass => Verdict::Pass,
            };
            return GateVerdict {
                verdict,
                violations: Vec::new(),
                policy: policy.name.clone(),
                evaluated_at: now,
            };
        }
    };

    let mut counts: BTreeMap<Severity, u32> = BTreeMap::new();
    for finding in findings {
        *counts.entry(finding.severity).or_insert(0) += 1;
    }

    let violations: Vec<Violation> = policy
        .max_counts
        .iter()
        .filter_map(|(&severity, &allowed)| {
            let count = counts.get(&severity).copied().unwrap_or(0);
            (count > allowed).then_some(Violation {
                severity,
                count,
                allowed,
            })
        })
        .collect();

    GateVerdict {
        verdict: if violations.is_empty() {
            Verdict::Pass
        } else {
            Verdict::Fail
        },
        violations,
        policy: policy.name.clone(),
        evaluated_at: now,
    }
}

/// Human-readable summary of a failed verdict, used as the stage failure
/// reason
pub fn failure_reason(verdict: &GateVerdict) -> String {
    if verdict.violations.is_empty() {
        return format!("gate `{}` failed: no scan report available", verdict.policy);
    }

    let parts: Vec<String> = verdict
        .violations
        .iter()
        .map(|v| format!("{:?}: {} found, {} allowed", v.severity, v.count, v.allowed))
        .collect();
    format!("gate `{}` failed: {}", verdict.policy, parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use convoy_core::domain::gate::{Finding, FindingSource};

    fn finding(severity: Severity) -> Finding {
        Finding {
            identifier: format!("CVE-{:?}", severity),
            severity,
            source: FindingSource::Sca,
        }
    }

    fn now() -> chrono::DateTime<chrono::Utc> {
        "2024-01-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_single_critical_fails_zero_tolerance_policy() {
        let policy = GatePolicy::strict("prod-gate");
        let report = FindingsReport::Available(vec![finding(Severity::Critical)]);

        let verdict = evaluate(&policy, &report, now());

        assert_eq!(verdict.verdict, Verdict::Fail);
        assert_eq!(verdict.violations.len(), 1);
        assert_eq!(verdict.violations[0].severity, Severity::Critical);
        assert_eq!(verdict.violations[0].count, 1);
        assert_eq!(verdict.violations[0].allowed, 0);
    }

    #[test]
    fn test_counts_within_limits_pass() {
        let mut policy = GatePolicy::strict("gate");
        policy.max_counts.insert(Severity::Medium, 5);

        let report = FindingsReport::Available(vec![
            finding(Severity::Medium),
            finding(Severity::Medium),
            finding(Severity::Low),
        ]);

        let verdict = evaluate(&policy, &report, now());
        assert_eq!(verdict.verdict, Verdict::Pass);
        assert!(verdict.violations.is_empty());
    }

    #[test]
    fn test_unlisted_severity_is_unlimited() {
        // Policy only bounds Critical; a pile of Low findings passes.
        let mut policy = GatePolicy::strict("gate");
        policy.max_counts.remove(&Severity::High);

        let report = FindingsReport::Available(vec![finding(Severity::Low); 50]);

        let verdict = evaluate(&policy, &report, now());
        assert_eq!(verdict.verdict, Verdict::Pass);
    }

    #[test]
    fn test_missing_report_fails_closed_by_default() {
        let policy = GatePolicy::strict("gate");
        let verdict = evaluate(&policy, &FindingsReport::Missing, now());
        assert_eq!(verdict.verdict, Verdict::Fail);
    }

    #[test]
    fn test_missing_report_can_be_configured_open() {
        let mut policy = GatePolicy::strict("gate");
        policy.on_missing_report = MissingReportAction::Pass;

        let verdict = evaluate(&policy, &FindingsReport::Missing, now());
        assert_eq!(verdict.verdict, Verdict::Pass);
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let policy = GatePolicy::strict("gate");
        let report = FindingsReport::Available(vec![
            finding(Severity::Critical),
            finding(Severity::High),
            finding(Severity::Low),
        ]);

        let first = evaluate(&policy, &report, now());
        let second = evaluate(&policy, &report, now());
        assert_eq!(first, second);
    }

    #[test]
    fn test_failure_reason_names_violations() {
        let policy = GatePolicy::strict("prod-gate");
        let report = FindingsReport::Available(vec![finding(Severity::Critical)]);

        let verdict = evaluate(&policy, &report, now());
        let reason = failure_reason(&verdict);
        assert!(reason.contains("prod-gate"));
        assert!(reason.contains("Critical"));
    }
}
