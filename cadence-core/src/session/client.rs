//! Session client abstraction
//!
//! A `SessionClient` invokes the external reasoning agent with a prompt and
//! options, returning an ordered event stream plus a cancellable handle. The
//! production implementation spawns the Claude Code CLI; tests substitute a
//! scripted client.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Notify};

use crate::session::SessionEvent;
use crate::stage::CommandPolicy;
use crate::Result;

/// A named sub-agent persona made available to the session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Short description of when the session should delegate to this agent
    pub description: String,
    /// System prompt for the sub-agent
    pub prompt: String,
    /// Model override for the sub-agent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Options for one session invocation
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Model id for the session
    pub model: String,
    /// Working directory the agent operates in
    pub cwd: PathBuf,
    /// Resume an earlier session instead of opening a fresh one
    pub resume_session_id: Option<String>,
    /// Turn budget for the session
    pub max_turns: u32,
    /// JSON schema the final result must conform to
    pub output_schema: Option<serde_json::Value>,
    /// Named sub-agent personas
    pub sub_agents: HashMap<String, AgentDefinition>,
    /// Capability policy evaluated per attempted shell command
    pub tool_policy: Option<CommandPolicy>,
}

impl SessionOptions {
    /// Create options with the required fields and no extras
    pub fn new(model: impl Into<String>, cwd: impl Into<PathBuf>, max_turns: u32) -> Self {
        Self {
            model: model.into(),
            cwd: cwd.into(),
            resume_session_id: None,
            max_turns,
            output_schema: None,
            sub_agents: HashMap::new(),
            tool_policy: None,
        }
    }
}

/// Cancellable handle to a running session
///
/// Cancelling interrupts the underlying session promptly. The handle is
/// surfaced to the caller before streaming begins; timeout policy is the
/// caller's concern.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    cancel: Arc<Notify>,
}

impl SessionHandle {
    /// Create a fresh handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the session
    pub fn cancel(&self) {
        self.cancel.notify_waiters();
    }

    /// Wait until cancellation is requested
    pub async fn cancelled(&self) {
        self.cancel.notified().await;
    }
}

/// An open session: the cancel handle plus the ordered event stream
pub struct SessionStream {
    /// Handle that interrupts the session when cancelled
    pub handle: SessionHandle,
    /// Ordered events; closes after the terminal result event or on failure
    pub events: mpsc::Receiver<Result<SessionEvent>>,
}

/// Trait for agent session transports
#[async_trait]
pub trait SessionClient: Send + Sync {
    /// Invoke the agent with a prompt, returning the event stream
    async fn invoke(&self, prompt: &str, options: SessionOptions) -> Result<SessionStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_new() {
        let options = SessionOptions::new("sonnet", "/tmp", 30);
        assert_eq!(options.model, "sonnet");
        assert_eq!(options.max_turns, 30);
        assert!(options.resume_session_id.is_none());
        assert!(options.sub_agents.is_empty());
        assert!(options.tool_policy.is_none());
    }

    #[tokio::test]
    async fn test_handle_cancel_wakes_waiter() {
        let handle = SessionHandle::new();
        let waiter = handle.clone();

        let task = tokio::spawn(async move {
            waiter.cancelled().await;
        });

        // Give the waiter a chance to register before notifying
        tokio::task::yield_now().await;
        handle.cancel();
        task.await.unwrap();
    }

    #[test]
    fn test_agent_definition_serializes_without_model() {
        let def = AgentDefinition {
            description: "writes code".to_string(),
            prompt: "You implement features.".to_string(),
            model: None,
        };
        let json = serde_json::to_string(&def).unwrap();
        assert!(!json.contains("model"));
    }
}
