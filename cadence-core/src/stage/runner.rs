//! Stage runner
//!
//! Drives one agent invocation end-to-end: installs the capability policy,
//! consumes the event stream in arrival order, forwards text/todo/sub-agent
//! traffic to the sink, and returns a normalized [`StageResult`]. Whether the
//! pipeline continues afterwards is the caller's decision.

use crate::pipeline::PipelineState;
use crate::session::{SessionClient, SessionEvent, SessionOptions};
use crate::sink::{RunSink, SubAgentEvent, TodoItem};
use crate::stage::{PolicyDecision, StageResult, StageSpec};
use crate::{Error, Result};

/// Runs stages against a session client
pub struct StageRunner<'a> {
    client: &'a dyn SessionClient,
}

impl<'a> StageRunner<'a> {
    pub fn new(client: &'a dyn SessionClient) -> Self {
        Self { client }
    }

    /// Run one stage to completion
    ///
    /// Emits started/completed/failed notifications around the invocation,
    /// threads the resumable session id through `state`, and accumulates
    /// duration and cost.
    pub async fn run(
        &self,
        spec: &StageSpec,
        state: &mut PipelineState,
        sink: &mut dyn RunSink,
    ) -> Result<StageResult> {
        let role = spec.kind.role();
        sink.on_stage_started(spec.kind, role);
        tracing::info!(stage = %spec.kind, role = %role, "Stage started");

        match self.drive(spec, state, sink).await {
            Ok(result) => {
                tracing::info!(
                    stage = %spec.kind,
                    duration_ms = ?result.duration_ms,
                    "Stage completed"
                );
                sink.on_stage_completed(spec.kind, &result);
                Ok(result)
            }
            Err(e) => {
                tracing::warn!(stage = %spec.kind, error = %e, "Stage failed");
                sink.on_stage_failed(spec.kind, &e.to_string());
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        spec: &StageSpec,
        state: &mut PipelineState,
        sink: &mut dyn RunSink,
    ) -> Result<StageResult> {
        let mut options = SessionOptions::new(spec.model.clone(), state.cwd.clone(), spec.max_turns);
        options.resume_session_id = state.session_id.clone();
        options.output_schema = spec.output_schema.clone();
        options.sub_agents = spec.sub_agents.clone();
        options.tool_policy = spec.policy;

        let mut stream = self.client.invoke(&spec.prompt, options).await?;
        sink.on_cancel_handle(stream.handle.clone());

        let mut outcome: Option<StageResult> = None;

        while let Some(event) = stream.events.recv().await {
            match event? {
                SessionEvent::Init { session_id } => {
                    sink.on_session_id(&session_id);
                    state.session_id = Some(session_id);
                }
                SessionEvent::TextDelta { text } => {
                    sink.on_log(&text);
                }
                SessionEvent::ToolUse { name, input } => {
                    self.observe_tool_use(spec, &name, &input, sink);
                }
                SessionEvent::Result {
                    text,
                    stop_reason,
                    duration_ms,
                    cost_usd,
                    structured_payload,
                } => {
                    outcome = Some(StageResult {
                        text,
                        stop_reason,
                        duration_ms,
                        cost_usd,
                        structured_payload,
                    });
                }
            }
        }

        if state.session_id.is_none() {
            return Err(Error::NoSession(spec.kind.name().to_string()));
        }

        let result = outcome.ok_or_else(|| {
            Error::Agent(format!(
                "Stage '{}' stream ended without a result",
                spec.kind
            ))
        })?;

        state.total_duration_ms += result.duration_ms.unwrap_or(0);
        state.total_cost_usd += result.cost_usd.unwrap_or(0.0);

        Ok(result)
    }

    fn observe_tool_use(
        &self,
        spec: &StageSpec,
        name: &str,
        input: &serde_json::Value,
        sink: &mut dyn RunSink,
    ) {
        if let Some(policy) = spec.policy {
            if let PolicyDecision::Deny { reason } = policy.evaluate(name, input) {
                tracing::warn!(stage = %spec.kind, reason = %reason, "Denied tool use");
                sink.on_log(&format!("\n[denied: {}]\n", reason));
                return;
            }
        }

        if is_todo_tool(name) {
            let items: Vec<TodoItem> = input
                .get("todos")
                .cloned()
                .and_then(|todos| serde_json::from_value(todos).ok())
                .unwrap_or_default();
            sink.on_todo_update(&items);
        } else if is_sub_agent_tool(name) {
            let agent_type = input
                .get("subagent_type")
                .and_then(|t| t.as_str())
                .unwrap_or("unknown")
                .to_string();
            tracing::debug!(stage = %spec.kind, agent = %agent_type, "Sub-agent spawned");
            sink.on_sub_agent_event(&SubAgentEvent {
                stage: spec.kind,
                agent_type,
            });
        }
    }
}

fn canonical_tool_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn is_todo_tool(name: &str) -> bool {
    canonical_tool_name(name) == "todowrite"
}

fn is_sub_agent_tool(name: &str) -> bool {
    canonical_tool_name(name) == "task"
}
