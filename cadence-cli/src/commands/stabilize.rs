//! Stabilize an integration branch for fast-forward

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use cadence_core::{ClaudeSession, Config, PhaseCommitter, PrintSink, StabilizePhaseOptions};
use clap::Args;

/// Arguments for the stabilize command
#[derive(Args, Debug)]
pub struct StabilizeArgs {
    /// Integration branch to stabilize
    pub branch: String,

    /// Branch the integration branch must fast-forward into
    #[arg(long, default_value = "main")]
    pub into: String,

    /// Validation command to run (repeatable)
    #[arg(long = "validate")]
    pub validation_commands: Vec<String>,

    /// Working directory (defaults to current directory)
    #[arg(long)]
    pub cwd: Option<PathBuf>,
}

pub async fn execute(args: StabilizeArgs, config: Config, verbose: bool) -> anyhow::Result<()> {
    let cwd = match args.cwd {
        Some(cwd) => cwd,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };

    let client = Arc::new(ClaudeSession::new().with_path(config.agent.claude_path.clone()));
    let committer = PhaseCommitter::new(client, super::model_resolver(&config));

    let mut sink = PrintSink::new(verbose);
    let outcome = committer
        .run_stabilize_phase(
            &cwd,
            StabilizePhaseOptions {
                integration_branch: args.branch,
                target_branch: args.into,
                validation_commands: args.validation_commands,
            },
            &mut sink,
        )
        .await?;

    println!("\n{}", outcome.result_text);
    Ok(())
}
