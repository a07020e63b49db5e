//! Claude Code session transport
//!
//! Spawns the Claude Code CLI in `--print --output-format stream-json` mode
//! and decodes each output line into a [`SessionEvent`] at the stream
//! boundary. Raw CLI messages never leave this module.

use std::process::Stdio;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::session::{SessionClient, SessionEvent, SessionHandle, SessionOptions, SessionStream};
use crate::{Error, Result};

/// Claude Code CLI transport
#[derive(Debug, Clone)]
pub struct ClaudeSession {
    claude_path: String,
}

impl ClaudeSession {
    /// Create a transport using `claude` from PATH
    pub fn new() -> Self {
        Self {
            claude_path: "claude".to_string(),
        }
    }

    /// Use a custom path to the claude executable
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.claude_path = path.into();
        self
    }

    fn build_command(&self, options: &SessionOptions) -> Command {
        let mut cmd = Command::new(&self.claude_path);
        cmd.arg("--print")
            .arg("--verbose")
            .arg("--output-format")
            .arg("stream-json")
            .arg("--dangerously-skip-permissions")
            .arg("--max-turns")
            .arg(options.max_turns.to_string());

        if !options.model.is_empty() {
            cmd.arg("--model").arg(&options.model);
        }

        if let Some(ref session_id) = options.resume_session_id {
            cmd.arg("--resume").arg(session_id);
        }

        // The capability policy is enforced at the transport: denied command
        // families are registered as disallowed tool patterns.
        if let Some(ref policy) = options.tool_policy {
            for pattern in policy.disallowed_tool_patterns() {
                cmd.arg("--disallowedTools").arg(pattern);
            }
        }

        if !options.sub_agents.is_empty() {
            if let Ok(agents) = serde_json::to_string(&options.sub_agents) {
                cmd.arg("--agents").arg(agents);
            }
        }

        cmd.current_dir(&options.cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        cmd
    }
}

impl Default for ClaudeSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SessionClient for ClaudeSession {
    async fn invoke(&self, prompt: &str, options: SessionOptions) -> Result<SessionStream> {
        if !options.cwd.exists() {
            return Err(Error::Agent(format!(
                "Working directory does not exist: {}",
                options.cwd.display()
            )));
        }

        let expects_payload = options.output_schema.is_some();
        let prompt = match options.output_schema {
            Some(ref schema) => format!(
                "{}\n\nRespond with a single JSON object conforming to this schema:\n```json\n{}\n```",
                prompt, schema
            ),
            None => prompt.to_string(),
        };

        let mut cmd = self.build_command(&options);
        cmd.arg(&prompt);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Agent(format!(
                    "Claude executable not found at '{}'. Is Claude Code installed?",
                    self.claude_path
                ))
            } else {
                Error::Io(e)
            }
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Agent("Failed to capture agent stdout".to_string()))?;
        let stderr = child.stderr.take();

        let handle = SessionHandle::new();
        let cancel = handle.clone();
        let (tx, rx) = mpsc::channel(64);

        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout).lines();
            let mut saw_result = false;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        let _ = child.kill().await;
                        let _ = tx.send(Err(Error::Agent("Session cancelled".to_string()))).await;
                        return;
                    }
                    line = reader.next_line() => {
                        let line = match line {
                            Ok(Some(line)) => line,
                            Ok(None) => break,
                            Err(e) => {
                                let _ = tx.send(Err(Error::Io(e))).await;
                                return;
                            }
                        };

                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }

                        match serde_json::from_str::<RawMessage>(trimmed) {
                            Ok(raw) => {
                                if let Some(event) = normalize(raw, expects_payload) {
                                    saw_result |= event.is_terminal();
                                    if tx.send(Ok(event)).await.is_err() {
                                        let _ = child.kill().await;
                                        return;
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::warn!(line = %trimmed, error = %e, "Skipping unparseable stream line");
                            }
                        }
                    }
                }
            }

            let status = child.wait().await;
            if !saw_result {
                let mut detail = String::new();
                if let Some(mut stderr) = stderr {
                    let _ = stderr.read_to_string(&mut detail).await;
                }
                let status = status
                    .map(|s| s.to_string())
                    .unwrap_or_else(|e| e.to_string());
                let _ = tx
                    .send(Err(Error::Agent(format!(
                        "Agent exited ({}) without a result: {}",
                        status,
                        detail.trim()
                    ))))
                    .await;
            }
        });

        Ok(SessionStream { handle, events: rx })
    }
}

/// Raw line shape from the Claude Code stream-json output
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawMessage {
    System {
        #[serde(default)]
        subtype: Option<String>,
        #[serde(default)]
        session_id: Option<String>,
    },
    Assistant {
        #[serde(default)]
        message: AssistantMessage,
    },
    ToolUse {
        tool: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    ToolResult {
        #[serde(default)]
        output: String,
        #[serde(default)]
        is_error: bool,
    },
    Result {
        #[serde(default)]
        result: String,
        #[serde(default)]
        stop_reason: Option<String>,
        #[serde(default)]
        duration_ms: Option<u64>,
        #[serde(default)]
        total_cost_usd: Option<f64>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: String,
}

fn normalize(raw: RawMessage, expects_payload: bool) -> Option<SessionEvent> {
    match raw {
        RawMessage::System {
            subtype,
            session_id,
        } => match (subtype.as_deref(), session_id) {
            (Some("init"), Some(session_id)) => Some(SessionEvent::Init { session_id }),
            _ => None,
        },
        RawMessage::Assistant { message } => Some(SessionEvent::TextDelta {
            text: message.content,
        }),
        RawMessage::ToolUse { tool, input } => Some(SessionEvent::ToolUse { name: tool, input }),
        RawMessage::ToolResult { .. } => None,
        RawMessage::Result {
            result,
            stop_reason,
            duration_ms,
            total_cost_usd,
        } => {
            let structured_payload = if expects_payload {
                extract_json_payload(&result)
            } else {
                None
            };
            Some(SessionEvent::Result {
                text: result,
                stop_reason,
                duration_ms,
                cost_usd: total_cost_usd,
                structured_payload,
            })
        }
    }
}

/// Pull the outermost JSON object out of a result text
///
/// The agent is instructed to answer with a single JSON object, but models
/// tend to wrap it in prose or a code fence.
fn extract_json_payload(text: &str) -> Option<serde_json::Value> {
    if let Ok(value) = serde_json::from_str(text.trim()) {
        return Some(value);
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}
