//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod approval;
mod run;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Submit an artifact into the pipeline
    Submit {
        /// Content-addressed artifact reference (e.g. an image digest)
        artifact_ref: String,
    },
    /// Show a run's current stage and state
    Status {
        /// Run ID
        run_id: String,
    },
    /// List all runs
    List,
    /// Approve a stage awaiting approval
    Approve {
        /// Stage ID
        stage_id: String,

        /// Identity of the approving actor
        #[arg(long)]
        actor: String,
    },
    /// Reject a stage awaiting approval
    Reject {
        /// Stage ID
        stage_id: String,

        /// Identity of the rejecting actor
        #[arg(long)]
        actor: String,
    },
    /// Abort a run
    Abort {
        /// Run ID
        run_id: String,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Submit { artifact_ref } => run::submit(config, &artifact_ref).await,
        Commands::Status { run_id } => run::status(config, &run_id).await,
        Commands::List => run::list(config).await,
        Commands::Approve { stage_id, actor } => {
            approval::decide(config, &stage_id, &actor, true).await
        }
        Commands::Reject { stage_id, actor } => {
            approval::decide(config, &stage_id, &actor, false).await
        }
        Commands::Abort { run_id } => run::abort(config, &run_id).await,
    }
}
