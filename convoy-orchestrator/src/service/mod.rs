//! Service layer
//!
//! Business logic for the pipeline engine. The gate evaluator, approval
//! coordinator, and rollout controller are pure over domain values; the
//! orchestrator is the single place their results become state transitions.

pub mod approval;
pub mod gate;
pub mod orchestrator;
pub mod rollback;
pub mod rollout;
pub mod transition;
