//! Gate domain types
//!
//! Scanner findings, per-stage gate policies, and the verdicts produced by
//! applying one to the other.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Finding severity, ordered from most to least severe
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

/// Which scanner produced a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindingSource {
    Sast,
    Sca,
    Container,
}

/// One normalized scanner finding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub identifier: String,
    pub severity: Severity,
    pub source: FindingSource,
}

/// Scanner output for one artifact
///
/// A missing report (scanner crashed, never ran) is distinct from an empty
/// report with zero findings; the policy decides what a missing report means.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FindingsReport {
    Available(Vec<Finding>),
    Missing,
}

/// What a gate does when no scan report exists for the artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingReportAction {
    /// Fail-closed: no report means no promotion.
    Fail,
    /// Fail-open: treat as zero findings.
    Pass,
}

impl Default for MissingReportAction {
    fn default() -> Self {
        MissingReportAction::Fail
    }
}

/// Per-stage pass/fail policy over scan findings
///
/// Maps each severity to the maximum allowed finding count; a severity with
/// no entry is unlimited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatePolicy {
    pub name: String,
    pub max_counts: BTreeMap<Severity, u32>,
    #[serde(default)]
    pub on_missing_report: MissingReportAction,
}

impl GatePolicy {
    /// A strict default: zero Critical, zero High findings allowed.
    pub fn strict(name: impl Into<String>) -> Self {
        let mut max_counts = BTreeMap::new();
        max_counts.insert(Severity::Critical, 0);
        max_counts.insert(Severity::High, 0);
        Self {
            name: name.into(),
            max_counts,
            on_missing_report: MissingReportAction::Fail,
        }
    }
}

/// Result of applying a policy to scan findings for one stage
///
/// Created once per stage execution; never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateVerdict {
    pub verdict: Verdict,
    /// The (severity, observed, allowed) triples that triggered a Fail.
    pub violations: Vec<Violation>,
    pub policy: String,
    pub evaluated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Pass,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub severity: Severity,
    pub count: u32,
    pub allowed: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical < Severity::High);
        assert!(Severity::High < Severity::Medium);
        assert!(Severity::Medium < Severity::Low);
    }

    #[test]
    fn test_missing_report_defaults_closed() {
        assert_eq!(MissingReportAction::default(), MissingReportAction::Fail);

        let policy: GatePolicy =
            serde_json::from_str(r#"{"name":"default","max_counts":{"Critical":0}}"#).unwrap();
        assert_eq!(policy.on_missing_report, MissingReportAction::Fail);
    }
}
