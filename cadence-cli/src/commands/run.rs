//! Run one task through the staged pipeline

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use cadence_core::{
    ClaudeSession, Config, Plan, PrintSink, RepoProbe, RetryContext, RunOptions, Task,
    TaskPipeline,
};
use clap::Args;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Task title (alternative to --task-file)
    pub title: Option<String>,

    /// TOML file describing the task
    #[arg(long, conflicts_with = "title")]
    pub task_file: Option<PathBuf>,

    /// Task description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Working directory (defaults to current directory)
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Dedicated branch for this task; enables the strict head guard
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Error text from a previous failed attempt
    #[arg(long, requires = "retry_count")]
    pub previous_error: Option<String>,

    /// Which retry attempt this is
    #[arg(long)]
    pub retry_count: Option<u32>,
}

pub async fn execute(args: RunArgs, config: Config, verbose: bool) -> anyhow::Result<()> {
    let task = load_task(&args)?;
    let plan = Plan {
        id: "adhoc".to_string(),
        title: task.title.clone(),
        description: String::new(),
    };

    let cwd = match args.cwd {
        Some(cwd) => cwd,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };

    let retry = match (args.retry_count, args.previous_error) {
        (Some(retry_count), Some(previous_error)) => Some(RetryContext {
            retry_count,
            previous_error,
        }),
        _ => None,
    };

    let client = Arc::new(ClaudeSession::new().with_path(config.agent.claude_path.clone()));
    let pipeline = TaskPipeline::new(client, Arc::new(RepoProbe::new()), super::model_resolver(&config))
        .with_max_refactor_cycles(config.pipeline.max_refactor_cycles)
        .with_max_turns(config.pipeline.max_turns);

    let mut sink = PrintSink::new(verbose);
    let options = RunOptions {
        branch: args.branch,
        retry,
    };

    let result = pipeline
        .run_task(&plan, &task, &cwd, options, &mut sink)
        .await?;

    println!("\n{}", result.result_text);
    if let Some(cost) = result.cost_usd {
        tracing::info!(cost_usd = cost, duration_ms = ?result.duration_ms, "Task run finished");
    }

    Ok(())
}

fn load_task(args: &RunArgs) -> anyhow::Result<Task> {
    if let Some(ref path) = args.task_file {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read task file {}", path.display()))?;
        let task: Task = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse task file {}", path.display()))?;
        return Ok(task);
    }

    let Some(ref title) = args.title else {
        bail!("Provide a task title or --task-file");
    };

    let mut task = Task::new(slugify(title), title.clone());
    if let Some(ref description) = args.description {
        task = task.with_description(description.clone());
    }
    Ok(task)
}

fn slugify(title: &str) -> String {
    let slug: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    slug.split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
