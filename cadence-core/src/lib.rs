//! Cadence Core - Quality-gated pipeline for external AI coding agents
//!
//! This crate carries a single task through a fixed sequence of agent
//! stages - implementation, architecture review/refactor, testing, commit -
//! and guarantees that nothing reaches version control without passing the
//! architecture quality gate and the commit hygiene policy.

pub mod commit_policy;
pub mod config;
pub mod error;
pub mod gate;
pub mod git;
pub mod phase;
pub mod pipeline;
pub mod prompts;
pub mod session;
pub mod sink;
pub mod stage;
pub mod task;

pub use config::Config;
pub use error::{Error, Result};
pub use gate::{ArchitectureReview, Finding, ReviewStatus};
pub use git::{GitProbe, RepoProbe};
pub use phase::{MergePhaseOptions, PhaseCommitter, PhaseOutcome, StabilizePhaseOptions};
pub use pipeline::{ModelResolver, PipelineRunResult, RunOptions, TaskPipeline};
pub use session::{ClaudeSession, SessionClient};
pub use sink::{NullSink, PrintSink, RunSink};
pub use stage::{AgentRole, StageKind};
pub use task::{Plan, RetryContext, Task};
