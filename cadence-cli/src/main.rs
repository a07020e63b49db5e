//! Cadence CLI - Command line interface for the quality-gated agent pipeline
//!
//! Runs single tasks through the staged pipeline and drives the phase-level
//! merge/stabilize committer flows.

mod commands;

use cadence_core::Config;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{MergeArgs, RunArgs, StabilizeArgs};

/// Cadence: quality-gated agent pipeline for development tasks
#[derive(Parser, Debug)]
#[command(name = "cadence")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to claude executable (overrides config and env)
    #[arg(long, global = true, env = "CADENCE_CLAUDE_PATH")]
    claude_path: Option<String>,

    /// Model to use (overrides config and env)
    #[arg(long, global = true, env = "CADENCE_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Run one task through the staged pipeline
    #[command(visible_alias = "r")]
    Run(RunArgs),

    /// Merge completed task branches via the dedicated committer agent
    Merge(MergeArgs),

    /// Stabilize an integration branch for fast-forward
    Stabilize(StabilizeArgs),

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Load configuration with overrides
    let config = Config::load_with_overrides(cli.claude_path.clone(), cli.model.clone())?;

    if cli.verbose {
        tracing::info!(
            claude_path = %config.agent.claude_path,
            model = ?config.agent.model,
            "Configuration loaded"
        );
    }

    match cli.command {
        Some(Commands::Version) => {
            println!("cadence {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Run(args)) => {
            commands::run::execute(args, config, cli.verbose).await?;
        }
        Some(Commands::Merge(args)) => {
            commands::merge::execute(args, config, cli.verbose).await?;
        }
        Some(Commands::Stabilize(args)) => {
            commands::stabilize::execute(args, config, cli.verbose).await?;
        }
        Some(Commands::Config) => {
            println!("claude_path: {}", config.agent.claude_path);
            println!(
                "model: {}",
                config.agent.model.as_deref().unwrap_or("(default)")
            );
            println!("max_refactor_cycles: {}", config.pipeline.max_refactor_cycles);
            println!("max_turns: {}", config.pipeline.max_turns);
            if let Some(path) = Config::default_config_path() {
                println!("config file: {}", path.display());
            }
        }
        None => {
            println!("cadence {}", env!("CARGO_PKG_VERSION"));
            println!("Run 'cadence --help' for usage.");
        }
    }

    Ok(())
}
