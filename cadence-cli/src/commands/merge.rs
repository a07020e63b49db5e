//! Merge completed task branches via the dedicated committer agent

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use cadence_core::{ClaudeSession, Config, MergePhaseOptions, PhaseCommitter, PrintSink};
use clap::Args;

/// Arguments for the merge command
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Branches to merge, in order
    #[arg(required = true)]
    pub branches: Vec<String>,

    /// Branch receiving the merges
    #[arg(long, default_value = "main")]
    pub into: String,

    /// Validation command to run after merging (repeatable)
    #[arg(long = "validate")]
    pub validation_commands: Vec<String>,

    /// Extra context for resolving conflicts
    #[arg(long, default_value = "")]
    pub context: String,

    /// Working directory (defaults to current directory)
    #[arg(long)]
    pub cwd: Option<PathBuf>,
}

pub async fn execute(args: MergeArgs, config: Config, verbose: bool) -> anyhow::Result<()> {
    let cwd = match args.cwd {
        Some(cwd) => cwd,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };

    let client = Arc::new(ClaudeSession::new().with_path(config.agent.claude_path.clone()));
    let committer = PhaseCommitter::new(client, super::model_resolver(&config));

    let mut sink = PrintSink::new(verbose);
    let outcome = committer
        .run_merge_phase(
            &cwd,
            MergePhaseOptions {
                branches: args.branches,
                target_branch: args.into,
                validation_commands: args.validation_commands,
                merge_context: args.context,
            },
            &mut sink,
        )
        .await?;

    println!("\n{}", outcome.result_text);
    Ok(())
}
