//! Phase-level committer flows
//!
//! Once several task branches are ready, a dedicated committer agent merges
//! them (merge phase) or drives an integration branch to a fast-forward-ready
//! state (stabilize phase). This agent is the only entity permitted to run
//! merge commands, so these flows run without the per-stage command denial;
//! merge-commit hygiene is delegated to the agent's instructions.

use std::path::Path;
use std::sync::Arc;

use crate::pipeline::{ModelResolver, PipelineState};
use crate::prompts;
use crate::session::SessionClient;
use crate::sink::RunSink;
use crate::stage::{StageKind, StageRunner, StageSpec};
use crate::{Error, Result};

/// Inputs for the merge phase
#[derive(Debug, Clone)]
pub struct MergePhaseOptions {
    /// Branches to merge, in order
    pub branches: Vec<String>,
    /// Branch receiving the merges
    pub target_branch: String,
    /// Commands that must pass after the merges
    pub validation_commands: Vec<String>,
    /// Free-form context for resolving conflicts
    pub merge_context: String,
}

/// Inputs for the stabilize phase
#[derive(Debug, Clone)]
pub struct StabilizePhaseOptions {
    /// Integration branch being stabilized
    pub integration_branch: String,
    /// Branch the integration branch must fast-forward into
    pub target_branch: String,
    /// Commands that must pass when stable
    pub validation_commands: Vec<String>,
}

/// Outcome of one phase invocation
#[derive(Debug, Clone)]
pub struct PhaseOutcome {
    pub session_id: Option<String>,
    pub result_text: String,
    pub stop_reason: Option<String>,
}

/// Drives the dedicated committer agent through phase-level operations
pub struct PhaseCommitter {
    client: Arc<dyn SessionClient>,
    resolver: ModelResolver,
    max_turns: u32,
}

impl PhaseCommitter {
    pub fn new(client: Arc<dyn SessionClient>, resolver: ModelResolver) -> Self {
        Self {
            client,
            resolver,
            max_turns: 100,
        }
    }

    /// Set the turn budget for phase invocations
    pub fn with_max_turns(mut self, turns: u32) -> Self {
        self.max_turns = turns;
        self
    }

    /// Merge the given branches into the target, in order
    pub async fn run_merge_phase(
        &self,
        cwd: &Path,
        options: MergePhaseOptions,
        sink: &mut dyn RunSink,
    ) -> Result<PhaseOutcome> {
        if options.branches.is_empty() {
            return Err(Error::Config(
                "Merge phase requires at least one branch".to_string(),
            ));
        }

        tracing::info!(
            branches = options.branches.len(),
            target = %options.target_branch,
            "Starting merge phase"
        );
        let prompt = prompts::merge_phase(
            &options.branches,
            &options.target_branch,
            &options.validation_commands,
            &options.merge_context,
        );
        self.run_committer_session(cwd, prompt, sink).await
    }

    /// Stabilize the integration branch for fast-forward into the target
    pub async fn run_stabilize_phase(
        &self,
        cwd: &Path,
        options: StabilizePhaseOptions,
        sink: &mut dyn RunSink,
    ) -> Result<PhaseOutcome> {
        tracing::info!(
            integration = %options.integration_branch,
            target = %options.target_branch,
            "Starting stabilize phase"
        );
        let prompt = prompts::stabilize_phase(
            &options.integration_branch,
            &options.target_branch,
            &options.validation_commands,
        );
        self.run_committer_session(cwd, prompt, sink).await
    }

    /// One committer-role invocation on a fresh session, without command denial
    async fn run_committer_session(
        &self,
        cwd: &Path,
        prompt: String,
        sink: &mut dyn RunSink,
    ) -> Result<PhaseOutcome> {
        let mut state = PipelineState::new(cwd, false);

        let spec = StageSpec::new(
            StageKind::Committer,
            prompt,
            (self.resolver)(StageKind::Committer.role()),
            self.max_turns,
        )
        .without_policy();

        let runner = StageRunner::new(self.client.as_ref());
        let result = runner.run(&spec, &mut state, sink).await?;

        Ok(PhaseOutcome {
            session_id: state.session_id,
            result_text: result.text,
            stop_reason: result.stop_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::{stage_events, ScriptedSession};
    use crate::sink::NullSink;
    use crate::stage::AgentRole;

    fn resolver() -> ModelResolver {
        Arc::new(|role: AgentRole| format!("model-{}", role))
    }

    fn merge_options() -> MergePhaseOptions {
        MergePhaseOptions {
            branches: vec!["task/a".to_string(), "task/b".to_string()],
            target_branch: "integration".to_string(),
            validation_commands: vec!["cargo test --workspace".to_string()],
            merge_context: "both branches touch the parser".to_string(),
        }
    }

    #[tokio::test]
    async fn test_merge_phase_runs_fresh_committer_session() {
        let client = Arc::new(ScriptedSession::new(vec![stage_events(
            "merge-sess",
            "merged 2 branches, validation green",
        )]));
        let committer = PhaseCommitter::new(client.clone(), resolver());

        let outcome = committer
            .run_merge_phase(Path::new("/tmp"), merge_options(), &mut NullSink)
            .await
            .unwrap();

        assert_eq!(outcome.session_id.as_deref(), Some("merge-sess"));
        assert_eq!(outcome.result_text, "merged 2 branches, validation green");
        assert_eq!(outcome.stop_reason.as_deref(), Some("end_turn"));

        let calls = client.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        // Fresh session, committer model, and no command denial
        assert_eq!(calls[0].resume_session_id, None);
        assert_eq!(calls[0].model, "model-committer");
        assert_eq!(calls[0].tool_policy, None);
        assert!(calls[0].prompt.contains("1. `task/a`"));
        assert!(calls[0].prompt.contains("2. `task/b`"));
        assert!(calls[0].prompt.contains("cargo test --workspace"));
    }

    #[tokio::test]
    async fn test_merge_phase_requires_branches() {
        let client = Arc::new(ScriptedSession::new(vec![]));
        let committer = PhaseCommitter::new(client.clone(), resolver());

        let mut options = merge_options();
        options.branches.clear();
        let err = committer
            .run_merge_phase(Path::new("/tmp"), options, &mut NullSink)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_stabilize_phase() {
        let client = Arc::new(ScriptedSession::new(vec![stage_events(
            "stab-sess",
            "integration is fast-forward ready",
        )]));
        let committer = PhaseCommitter::new(client.clone(), resolver()).with_max_turns(40);

        let outcome = committer
            .run_stabilize_phase(
                Path::new("/tmp"),
                StabilizePhaseOptions {
                    integration_branch: "integration".to_string(),
                    target_branch: "main".to_string(),
                    validation_commands: vec![],
                },
                &mut NullSink,
            )
            .await
            .unwrap();

        assert_eq!(outcome.session_id.as_deref(), Some("stab-sess"));
        let calls = client.calls.lock().unwrap();
        assert!(calls[0].prompt.contains("`integration`"));
        assert!(calls[0].prompt.contains("`main`"));
        assert_eq!(calls[0].tool_policy, None);
    }
}
