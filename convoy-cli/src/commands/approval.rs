//! Approval command handlers
//!
//! Approve or reject a stage awaiting approval. First decision wins; a
//! decision against an already-resolved record exits with code 1.

use anyhow::{Context, Result};
use colored::*;
use uuid::Uuid;

use crate::config::Config;
use convoy_client::OrchestratorClient;

/// Record an approval decision for a stage
pub async fn decide(config: &Config, stage_id: &str, actor: &str, approve: bool) -> Result<()> {
    let client = OrchestratorClient::new(&config.orchestrator_url);
    let stage_id = Uuid::parse_str(stage_id)
        .map_err(|_| anyhow::anyhow!("invalid stage ID: `{}`", stage_id))?;

    let result = if approve {
        client.approve_stage(stage_id, actor).await
    } else {
        client.reject_stage(stage_id, actor).await
    };

    match result {
        Ok(stage) => {
            let verb = if approve { "approved" } else { "rejected" };
            println!(
                "{}",
                format!("✓ Stage {} ({}) {}", stage.name, stage_id, verb).green()
            );
            println!(
                "{}",
                "  The stage progresses on the orchestrator's next poll.".dimmed()
            );
            Ok(())
        }
        Err(e) if e.is_conflict() => {
            eprintln!(
                "{}",
                format!("Stage {} approval is already resolved.", stage_id).red()
            );
            std::process::exit(1);
        }
        Err(e) if e.is_not_found() => {
            eprintln!("{}", format!("Stage {} not found.", stage_id).red());
            std::process::exit(1);
        }
        Err(e) => Err(e).context("Failed to record decision"),
    }
}
