//! Caller-facing event sink
//!
//! A sink receives everything observable about a run: streamed agent text,
//! todo updates, session ids, sub-agent spawns, cancel handles, and stage
//! lifecycle notifications. All methods default to no-ops so callers
//! implement only what they surface.

use serde::{Deserialize, Serialize};

use crate::session::SessionHandle;
use crate::stage::{AgentRole, StageKind, StageResult};

/// One todo item streamed by the agent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TodoItem {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub status: String,
}

/// A sub-agent spawn observed during a stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubAgentEvent {
    /// Stage during which the spawn happened
    pub stage: StageKind,
    /// The sub-agent persona type, as reported by the session
    pub agent_type: String,
}

/// Sink for run observability
pub trait RunSink: Send {
    /// A line of streamed agent text
    fn on_log(&mut self, _line: &str) {}

    /// The agent replaced its todo list
    fn on_todo_update(&mut self, _items: &[TodoItem]) {}

    /// A resumable session id was observed
    fn on_session_id(&mut self, _id: &str) {}

    /// The agent spawned a sub-agent
    fn on_sub_agent_event(&mut self, _event: &SubAgentEvent) {}

    /// Handle for interrupting the in-flight invocation
    fn on_cancel_handle(&mut self, _handle: SessionHandle) {}

    /// A stage is about to invoke the agent
    fn on_stage_started(&mut self, _stage: StageKind, _role: AgentRole) {}

    /// A stage finished normally
    fn on_stage_completed(&mut self, _stage: StageKind, _result: &StageResult) {}

    /// A stage failed; emitted before the error propagates
    fn on_stage_failed(&mut self, _stage: StageKind, _error: &str) {}
}

/// Sink that prints agent output to stdout and lifecycle to stderr
#[derive(Debug, Default)]
pub struct PrintSink {
    verbose: bool,
}

impl PrintSink {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl RunSink for PrintSink {
    fn on_log(&mut self, line: &str) {
        print!("{}", line);
    }

    fn on_session_id(&mut self, id: &str) {
        if self.verbose {
            eprintln!("[session: {}]", id);
        }
    }

    fn on_todo_update(&mut self, items: &[TodoItem]) {
        if self.verbose {
            eprintln!("[todos: {} items]", items.len());
        }
    }

    fn on_sub_agent_event(&mut self, event: &SubAgentEvent) {
        if self.verbose {
            eprintln!("[{}: spawned {}]", event.stage, event.agent_type);
        }
    }

    fn on_stage_started(&mut self, stage: StageKind, role: AgentRole) {
        eprintln!("[stage {} started ({})]", stage, role);
    }

    fn on_stage_completed(&mut self, stage: StageKind, result: &StageResult) {
        let duration = result
            .duration_ms
            .map(|d| format!("{}ms", d))
            .unwrap_or_else(|| "?".to_string());
        eprintln!("[stage {} completed in {}]", stage, duration);
    }

    fn on_stage_failed(&mut self, stage: StageKind, error: &str) {
        eprintln!("[stage {} failed: {}]", stage, error);
    }
}

/// No-op sink for callers that only want the final result
#[derive(Debug, Default)]
pub struct NullSink;

impl RunSink for NullSink {}
