//! Run command handlers
//!
//! Handles submitting artifacts, showing run status, listing runs, and
//! aborting runs.

use anyhow::{Context, Result};
use colored::*;
use convoy_core::domain::run::{PipelineRun, RunStatus};
use convoy_core::domain::stage::{StageExecution, StageStatus};
use uuid::Uuid;

use crate::config::Config;
use convoy_client::OrchestratorClient;

/// Submit an artifact into the pipeline
pub async fn submit(config: &Config, artifact_ref: &str) -> Result<()> {
    let client = OrchestratorClient::new(&config.orchestrator_url);

    let run = client
        .submit_run(artifact_ref)
        .await
        .context("Failed to submit artifact")?;

    println!("{}", "✓ Artifact accepted into the pipeline".green());
    println!("  Run ID:   {}", run.id.to_string().cyan());
    println!("  Artifact: {}", run.artifact.to_string().dimmed());
    Ok(())
}

/// Show a run's current stage and state
///
/// Exits with code 2 when the run does not exist.
pub async fn status(config: &Config, run_id: &str) -> Result<()> {
    let client = OrchestratorClient::new(&config.orchestrator_url);
    let run_id = parse_uuid(run_id)?;

    let details = match client.get_run(run_id).await {
        Ok(details) => details,
        Err(e) if e.is_not_found() => {
            eprintln!("{}", format!("Run {} not found.", run_id).red());
            std::process::exit(2);
        }
        Err(e) => return Err(e).context("Failed to fetch run"),
    };

    print_run_details(&details.run, &details.stages);
    Ok(())
}

/// List all runs
pub async fn list(config: &Config) -> Result<()> {
    let client = OrchestratorClient::new(&config.orchestrator_url);

    let runs = client.list_runs().await.context("Failed to list runs")?;

    if runs.is_empty() {
        println!("{}", "No runs found.".yellow());
    } else {
        println!("{}", format!("Found {} run(s):", runs.len()).bold());
        println!();
        for run in runs {
            print_run_summary(&run);
        }
    }

    Ok(())
}

/// Abort a run
///
/// Exits with code 1 when the run is already terminal.
pub async fn abort(config: &Config, run_id: &str) -> Result<()> {
    let client = OrchestratorClient::new(&config.orchestrator_url);
    let run_id = parse_uuid(run_id)?;

    match client.abort_run(run_id).await {
        Ok(()) => {
            println!("{}", format!("✓ Abort accepted for run {}", run_id).green());
            println!(
                "{}",
                "  The run stops at the next stage boundary; a run mid-rollout is rolled back."
                    .dimmed()
            );
            Ok(())
        }
        Err(e) if e.is_conflict() => {
            eprintln!("{}", format!("Run {} is already terminal.", run_id).red());
            std::process::exit(1);
        }
        Err(e) if e.is_not_found() => {
            eprintln!("{}", format!("Run {} not found.", run_id).red());
            std::process::exit(1);
        }
        Err(e) => Err(e).context("Failed to abort run"),
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| anyhow::anyhow!("invalid ID: `{}`", raw))
}

/// Print a run summary line
fn print_run_summary(run: &PipelineRun) {
    println!("  {} Run {}", "▸".cyan(), run.id.to_string().dimmed());
    println!("    Artifact: {}", run.artifact.to_string().dimmed());
    println!("    Status:   {}", colorize_run_status(run.status));
    println!(
        "    Created:  {}",
        run.created_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

/// Print detailed run information with its stages
fn print_run_details(run: &PipelineRun, stages: &[StageExecution]) {
    println!("{}", "Run Details:".bold());
    println!("  ID:       {}", run.id.to_string().cyan());
    println!("  Artifact: {}", run.artifact);
    println!("  Status:   {}", colorize_run_status(run.status));
    println!("  Created:  {}", run.created_at.format("%Y-%m-%d %H:%M:%S"));
    if run.abort_requested && !run.status.is_terminal() {
        println!("  {}", "Abort requested".yellow());
    }

    if stages.is_empty() {
        println!("\n{}", "No stages started yet.".dimmed());
        return;
    }

    println!("\n{}", "Stages:".bold());
    for stage in stages {
        print_stage(stage);
    }
}

fn print_stage(stage: &StageExecution) {
    println!(
        "  {} {} ({})",
        "▸".cyan(),
        stage.name.bold(),
        stage.environment.dimmed()
    );
    println!("    Stage ID: {}", stage.id.to_string().dimmed());
    println!("    Status:   {}", colorize_stage_status(stage.status));

    if let Some(verdict) = &stage.gate_verdict {
        println!("    Gate:     {:?} (policy {})", verdict.verdict, verdict.policy);
    }

    if let Some(approval) = &stage.approval {
        let actor = approval.actor.as_deref().unwrap_or("-");
        println!(
            "    Approval: {} (actor {}, deadline {})",
            approval.decision,
            actor,
            approval.deadline.format("%Y-%m-%d %H:%M:%S")
        );
    }

    if let Some(rollout) = &stage.rollout {
        let weight = rollout.current_weight().unwrap_or(0);
        println!(
            "    Canary:   step {}/{} at weight {}%",
            rollout.current_step + 1,
            rollout.steps.len(),
            weight
        );
    }

    if let Some(reason) = &stage.failure_reason {
        println!("    Reason:   {}", reason.red());
    }
    println!();
}

fn colorize_run_status(status: RunStatus) -> ColoredString {
    match status {
        RunStatus::Pending => "Pending".yellow(),
        RunStatus::Running => "Running".cyan(),
        RunStatus::Succeeded => "Succeeded".green(),
        RunStatus::Failed => "Failed".red(),
        RunStatus::RolledBack => "RolledBack".red().bold(),
        RunStatus::Quarantined => "Quarantined".magenta().bold(),
    }
}

fn colorize_stage_status(status: StageStatus) -> ColoredString {
    match status {
        StageStatus::Pending => "Pending".yellow(),
        StageStatus::AwaitingGate => "AwaitingGate".yellow(),
        StageStatus::AwaitingApproval => "AwaitingApproval".yellow().bold(),
        StageStatus::Deploying => "Deploying".cyan(),
        StageStatus::Canarying => "Canarying".cyan().bold(),
        StageStatus::Succeeded => "Succeeded".green(),
        StageStatus::Failed => "Failed".red(),
        StageStatus::RolledBack => "RolledBack".red().bold(),
    }
}