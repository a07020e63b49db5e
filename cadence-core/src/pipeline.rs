//! Task pipeline state machine
//!
//! Sequences the stages of one task run:
//!
//! ```text
//! Implementation -> ArchitectureReview <-> ArchitectureRefactor (bounded)
//!     -> Tester -> Committer -> Done
//! ```
//!
//! Between stages the git-head guard verifies that nothing but the committer
//! advanced HEAD; after the committer, the commit range is checked against
//! the commit hygiene policy. Every failure is fatal to the run; retries are
//! expressed by the caller re-invoking `run_task` with a `RetryContext`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::commit_policy;
use crate::gate::{self, ArchitectureReview, ReviewStatus};
use crate::git::GitProbe;
use crate::prompts;
use crate::session::{AgentDefinition, SessionClient};
use crate::sink::RunSink;
use crate::stage::{AgentRole, StageKind, StageRunner, StageSpec};
use crate::task::{Plan, RetryContext, Task};
use crate::{Error, Result};

/// Resolves the model id for an agent role; supplied by the caller
pub type ModelResolver = Arc<dyn Fn(AgentRole) -> String + Send + Sync>;

/// Mutable state threaded through the stages of one run
#[derive(Debug)]
pub struct PipelineState {
    /// Working directory the run operates in
    pub cwd: PathBuf,
    /// Resumable session id; written by the active stage, read by the next
    pub session_id: Option<String>,
    /// Head the guard expects between stages
    pub expected_head: Option<String>,
    /// Whether unexpected head movement is fatal (branch-isolated execution)
    pub strict_head_guard: bool,
    /// Accumulated duration across stages
    pub total_duration_ms: u64,
    /// Accumulated cost across stages
    pub total_cost_usd: f64,
}

impl PipelineState {
    pub fn new(cwd: impl Into<PathBuf>, strict_head_guard: bool) -> Self {
        Self {
            cwd: cwd.into(),
            session_id: None,
            expected_head: None,
            strict_head_guard,
            total_duration_ms: 0,
            total_cost_usd: 0.0,
        }
    }
}

/// Per-run options
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Dedicated branch for this task; enables the strict head guard
    pub branch: Option<String>,
    /// Context from an earlier failed attempt
    pub retry: Option<RetryContext>,
}

/// Terminal output of one `run_task` call
#[derive(Debug, Clone)]
pub struct PipelineRunResult {
    pub session_id: Option<String>,
    pub result_text: String,
    pub stop_reason: Option<String>,
    pub duration_ms: Option<u64>,
    pub cost_usd: Option<f64>,
}

/// The quality-gated task pipeline
pub struct TaskPipeline {
    client: Arc<dyn SessionClient>,
    probe: Arc<dyn GitProbe>,
    resolver: ModelResolver,
    max_refactor_cycles: u32,
    max_turns: u32,
}

impl TaskPipeline {
    /// Create a pipeline with default limits
    pub fn new(
        client: Arc<dyn SessionClient>,
        probe: Arc<dyn GitProbe>,
        resolver: ModelResolver,
    ) -> Self {
        Self {
            client,
            probe,
            resolver,
            max_refactor_cycles: 3,
            max_turns: 50,
        }
    }

    /// Set the refactor cycle budget
    pub fn with_max_refactor_cycles(mut self, cycles: u32) -> Self {
        self.max_refactor_cycles = cycles;
        self
    }

    /// Set the per-stage turn budget
    pub fn with_max_turns(mut self, turns: u32) -> Self {
        self.max_turns = turns;
        self
    }

    fn model_for(&self, kind: StageKind) -> String {
        (self.resolver)(kind.role())
    }

    /// Run one task through the full pipeline
    pub async fn run_task(
        &self,
        plan: &Plan,
        task: &Task,
        cwd: &Path,
        options: RunOptions,
        sink: &mut dyn RunSink,
    ) -> Result<PipelineRunResult> {
        let mut state = PipelineState::new(cwd, options.branch.is_some());
        state.expected_head = self.probe.head_of(cwd)?;
        if state.expected_head.is_none() {
            return Err(Error::Git(format!(
                "Working tree {} has no commits; cannot run a task against it",
                cwd.display()
            )));
        }

        tracing::info!(
            task = %task.id,
            branch = ?options.branch,
            strict = state.strict_head_guard,
            "Starting task run"
        );

        let runner = StageRunner::new(self.client.as_ref());
        let mut sections: Vec<(StageKind, String)> = Vec::new();

        // Implementation
        let spec = StageSpec::new(
            StageKind::Implementation,
            prompts::implementation(plan, task, options.retry.as_ref()),
            self.model_for(StageKind::Implementation),
            self.max_turns,
        )
        .with_sub_agent(
            "implementer",
            AgentDefinition {
                description: "Implements a single, well-scoped piece of the task".to_string(),
                prompt: prompts::IMPLEMENTER_PERSONA.to_string(),
                model: None,
            },
        );
        let result = runner.run(&spec, &mut state, sink).await?;
        let mut last_stop_reason = result.stop_reason.clone();
        sections.push((StageKind::Implementation, result.text));
        self.ensure_no_commit_yet(&mut state, StageKind::Implementation, sink)?;

        // Architecture review / refactor loop, bounded by the cycle budget
        let mut refactor_cycles = 0u32;
        let final_review = loop {
            let spec = StageSpec::new(
                StageKind::ArchitectureReview,
                prompts::architecture_review(task),
                self.model_for(StageKind::ArchitectureReview),
                self.max_turns,
            )
            .with_output_schema(gate::review_schema());
            let result = runner.run(&spec, &mut state, sink).await?;
            last_stop_reason = result.stop_reason.clone();

            let payload = result.structured_payload.ok_or_else(|| {
                Error::Agent("Architecture review produced no structured payload".to_string())
            })?;
            let review: ArchitectureReview = serde_json::from_value(payload).map_err(|e| {
                Error::Agent(format!("Architecture review payload was malformed: {}", e))
            })?;
            let enforced = gate::enforce(&review);
            tracing::info!(
                raw = %review.status,
                enforced = %enforced.status,
                findings = enforced.findings.len(),
                "Architecture gate evaluated"
            );
            sections.push((StageKind::ArchitectureReview, result.text));

            match enforced.status {
                ReviewStatus::Pass => break enforced,
                ReviewStatus::Blocked => {
                    return Err(Error::GateBlocked {
                        summary: format!("{}\n{}", enforced.summary, enforced.findings_text()),
                        findings: enforced.findings,
                    });
                }
                ReviewStatus::PassWithNotes | ReviewStatus::NeedsRefactor => {
                    sink.on_log(&format!(
                        "\n[architecture gate: changes required ({})]\n",
                        enforced.status
                    ));
                    if refactor_cycles >= self.max_refactor_cycles {
                        return Err(Error::GateExhausted {
                            cycles: refactor_cycles,
                            status: enforced.status,
                        });
                    }

                    let spec = StageSpec::new(
                        StageKind::ArchitectureRefactor,
                        prompts::architecture_refactor(task, &enforced),
                        self.model_for(StageKind::ArchitectureRefactor),
                        self.max_turns,
                    );
                    let result = runner.run(&spec, &mut state, sink).await?;
                    last_stop_reason = result.stop_reason.clone();
                    sections.push((StageKind::ArchitectureRefactor, result.text));
                    self.ensure_no_commit_yet(&mut state, StageKind::ArchitectureRefactor, sink)?;
                    refactor_cycles += 1;
                }
            }
        };

        // Tester
        let spec = StageSpec::new(
            StageKind::Tester,
            prompts::tester(task),
            self.model_for(StageKind::Tester),
            self.max_turns,
        );
        let result = runner.run(&spec, &mut state, sink).await?;
        last_stop_reason = result.stop_reason.clone();
        sections.push((StageKind::Tester, result.text));
        self.ensure_no_commit_yet(&mut state, StageKind::Tester, sink)?;

        // Committer
        let head_before = self.probe.head_of(cwd)?.ok_or_else(|| {
            Error::Git("HEAD disappeared before the committer stage".to_string())
        })?;
        let spec = StageSpec::new(
            StageKind::Committer,
            prompts::committer(plan, task),
            self.model_for(StageKind::Committer),
            self.max_turns,
        );
        let result = runner.run(&spec, &mut state, sink).await?;
        last_stop_reason = result.stop_reason.clone();

        let head_after = self.probe.head_of(cwd)?;
        let head_after = match head_after {
            Some(head) if head != head_before => head,
            _ => {
                let message = format!(
                    "Committer stage for task {} produced no commit (HEAD still {})",
                    task.id, head_before
                );
                sink.on_stage_failed(StageKind::Committer, &message);
                return Err(Error::Policy(message));
            }
        };

        commit_policy::validate(
            self.probe.as_ref(),
            cwd,
            &format!("{}..{}", head_before, head_after),
            &format!("task {}", task.id),
        )?;
        state.expected_head = Some(head_after);
        sections.push((StageKind::Committer, result.text));

        // Done
        let mut report = String::new();
        for (kind, text) in &sections {
            if text.trim().is_empty() {
                continue;
            }
            report.push_str(&format!("## {}\n\n{}\n\n", kind, text.trim()));
        }
        report.push_str(&format!("architecture-gate-summary: {}", final_review.status));

        Ok(PipelineRunResult {
            session_id: state.session_id,
            result_text: report,
            stop_reason: last_stop_reason,
            duration_ms: Some(state.total_duration_ms),
            cost_usd: Some(state.total_cost_usd),
        })
    }

    /// Verify HEAD did not move outside the committer stage
    ///
    /// In strict (branch-isolated) mode any movement is fatal. In shared
    /// checkouts another task may legitimately have committed, so the
    /// baseline is rebased forward instead.
    fn ensure_no_commit_yet(
        &self,
        state: &mut PipelineState,
        stage: StageKind,
        sink: &mut dyn RunSink,
    ) -> Result<()> {
        let head = self.probe.head_of(&state.cwd)?;
        if head == state.expected_head {
            return Ok(());
        }

        if state.strict_head_guard {
            return Err(Error::Policy(format!(
                "HEAD moved during stage '{}' on a dedicated branch (expected {}, found {}); \
                 only the committer stage may advance it",
                stage,
                state.expected_head.as_deref().unwrap_or("none"),
                head.as_deref().unwrap_or("none"),
            )));
        }

        tracing::warn!(
            stage = %stage,
            expected = ?state.expected_head,
            found = ?head,
            "HEAD drift in shared checkout; rebasing guard baseline"
        );
        sink.on_log(&format!(
            "\n[head drift after {}: adopting {} as new baseline]\n",
            stage,
            head.as_deref().unwrap_or("none")
        ));
        state.expected_head = head;
        Ok(())
    }
}
