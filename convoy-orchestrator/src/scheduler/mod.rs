//! Scheduler
//!
//! The polling loop that drives every active run, and the per-environment
//! lease that serializes deploy traffic against a single cluster target.

mod lease;
mod poller;

pub use lease::EnvironmentLeases;
pub use poller::RunPoller;
