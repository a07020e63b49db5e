//! Session event model
//!
//! Events from the agent session are decoded once at the stream boundary into
//! a closed enum, so downstream code pattern-matches exhaustively instead of
//! probing optional fields.

use serde::{Deserialize, Serialize};

/// One event from an agent session, in arrival order.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Session was established; carries the resumable session id
    Init { session_id: String },

    /// A streamed chunk of assistant text
    TextDelta { text: String },

    /// The assistant attempted a tool call
    ToolUse {
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },

    /// Terminal event closing the session
    Result {
        #[serde(default)]
        text: String,
        #[serde(default)]
        stop_reason: Option<String>,
        #[serde(default)]
        duration_ms: Option<u64>,
        #[serde(default)]
        cost_usd: Option<f64>,
        #[serde(default)]
        structured_payload: Option<serde_json::Value>,
    },
}

impl SessionEvent {
    /// True for the terminal result event
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionEvent::Result { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_init() {
        let json = r#"{"type":"init","session_id":"abc123"}"#;
        let event: SessionEvent = serde_json::from_str(json).unwrap();
        match event {
            SessionEvent::Init { session_id } => assert_eq!(session_id, "abc123"),
            _ => panic!("Expected Init event"),
        }
    }

    #[test]
    fn test_parse_tool_use_defaults_input() {
        let json = r#"{"type":"tool_use","name":"Bash"}"#;
        let event: SessionEvent = serde_json::from_str(json).unwrap();
        match event {
            SessionEvent::ToolUse { name, input } => {
                assert_eq!(name, "Bash");
                assert!(input.is_null());
            }
            _ => panic!("Expected ToolUse event"),
        }
    }

    #[test]
    fn test_parse_result() {
        let json = r#"{"type":"result","text":"done","stop_reason":"end_turn","duration_ms":1200,"cost_usd":0.42}"#;
        let event: SessionEvent = serde_json::from_str(json).unwrap();
        assert!(event.is_terminal());
        match event {
            SessionEvent::Result {
                text,
                stop_reason,
                duration_ms,
                cost_usd,
                structured_payload,
            } => {
                assert_eq!(text, "done");
                assert_eq!(stop_reason.as_deref(), Some("end_turn"));
                assert_eq!(duration_ms, Some(1200));
                assert_eq!(cost_usd, Some(0.42));
                assert!(structured_payload.is_none());
            }
            _ => unreachable!(),
        }
    }
}
