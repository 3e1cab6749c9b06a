//! CLI configuration

/// Configuration shared by all commands
pub struct Config {
    /// Base URL of the orchestrator API
    pub orchestrator_url: String,
}
