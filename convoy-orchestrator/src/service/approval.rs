//! Approval coordinator
//!
//! Creates approval records and resolves them. Nothing here blocks a
//! thread waiting for human input: a record is created and returned, and
//! the orchestrator's polling loop checks expiry each cycle. The first
//! decision wins; a late approval arriving after expiry is rejected.

use convoy_core::domain::approval::{ApprovalDecision, ApprovalRecord};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApprovalError {
    /// The record was already Approved, Rejected, or Expired.
    #[error("approval already resolved: {0}")]
    AlreadyResolved(ApprovalDecision),

    /// Only Approved and Rejected are valid human decisions.
    #[error("invalid decision: {0}")]
    InvalidDecision(ApprovalDecision),
}

/// Create a pending approval record with a fixed deadline
pub fn request(
    deadline_secs: u64,
    now: chrono::DateTime<chrono::Utc>,
) -> ApprovalRecord {
    ApprovalRecord {
        requested_at: now,
        deadline: now + chrono::Duration::seconds(deadline_secs as i64),
        decision: ApprovalDecision::Pending,
        actor: None,
        decided_at: None,
    }
}

/// Resolve a pending record with a human decision
///
/// Returns the resolved record; errors if the record is already terminal
/// so a racing decision can never overwrite the first one.
pub fn decide(
    record: &ApprovalRecord,
    actor: &str,
    decision: ApprovalDecision,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<ApprovalRecord, ApprovalError> {
    if record.is_resolved() {
        return Err(ApprovalError::AlreadyResolved(record.decision));
    }

    if !matches!(
        decision,
        ApprovalDecision::Approved | ApprovalDecision::Rejected
    ) {
        return Err(ApprovalError::InvalidDecision(decision));
    }

    Ok(ApprovalRecord {
        decision,
        actor: Some(actor.to_string()),
        decided_at: Some(now),
        ..record.clone()
    })
}

/// Expire a pending record whose deadline has passed
///
/// Returns the expired record, or None when the record is resolved or the
/// deadline has not been reached.
pub fn expire_if_due(
    record: &ApprovalRecord,
    now: chrono::DateTime<chrono::Utc>,
) -> Option<ApprovalRecord> {
    if record.is_resolved() || now <= record.deadline {
        return None;
    }

    Some(ApprovalRecord {
        decision: ApprovalDecision::Expired,
        decided_at: Some(now),
        ..record.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> chrono::DateTime<chrono::Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_request_fixes_deadline() {
        let record = request(3600, at("2024-01-01T00:00:00Z"));
        assert_eq!(record.decision, ApprovalDecision::Pending);
        assert_eq!(record.deadline, at("2024-01-01T01:00:00Z"));
        assert!(record.actor.is_none());
    }

    #[test]
    fn test_first_decision_wins() {
        let record = request(3600, at("2024-01-01T00:00:00Z"));

        let approved = decide(
            &record,
            "alice",
            ApprovalDecision::Approved,
            at("2024-01-01T00:10:00Z"),
        )
        .unwrap();
        assert_eq!(approved.decision, ApprovalDecision::Approved);
        assert_eq!(approved.actor.as_deref(), Some("alice"));

        // A second decision against the resolved record is rejected and
        // the terminal state never changes.
        let second = decide(
            &approved,
            "bob",
            ApprovalDecision::Rejected,
            at("2024-01-01T00:11:00Z"),
        );
        assert!(matches!(
            second,
            Err(ApprovalError::AlreadyResolved(ApprovalDecision::Approved))
        ));
    }

    #[test]
    fn test_expiry_after_deadline() {
        let record = request(3600, at("2024-01-01T00:00:00Z"));

        assert!(expire_if_due(&record, at("2024-01-01T00:59:59Z")).is_none());
        assert!(expire_if_due(&record, at("2024-01-01T01:00:00Z")).is_none());

        let expired = expire_if_due(&record, at("2024-01-01T01:00:01Z")).unwrap();
        assert_eq!(expired.decision, ApprovalDecision::Expired);
    }

    #[test]
    fn test_late_approval_after_expiry_is_rejected() {
        let record = request(3600, at("2024-01-01T00:00:00Z"));
        let expired = expire_if_due(&record, at("2024-01-01T02:00:00Z")).unwrap();

        let late = decide(
            &expired,
            "alice",
            ApprovalDecision::Approved,
            at("2024-01-01T02:00:05Z"),
        );
        assert!(matches!(
            late,
            Err(ApprovalError::AlreadyResolved(ApprovalDecision::Expired))
        ));
    }

    #[test]
    fn test_expiry_never_overwrites_a_decision() {
        let record = request(3600, at("2024-01-01T00:00:00Z"));
        let approved = decide(
            &record,
            "alice",
            ApprovalDecision::Approved,
            at("2024-01-01T00:30:00Z"),
        )
        .unwrap();

        assert!(expire_if_due(&approved, at("2024-01-01T05:00:00Z")).is_none());
    }

    #[test]
    fn test_only_human_decisions_accepted() {
        let record = request(3600, at("2024-01-01T00:00:00Z"));
        let result = decide(
            &record,
            "alice",
            ApprovalDecision::Expired,
            at("2024-01-01T00:30:00Z"),
        );
        assert!(matches!(result, Err(ApprovalError::InvalidDecision(_))));
    }
}
