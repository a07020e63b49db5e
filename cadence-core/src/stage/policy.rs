//! Stage capability policy for shell commands
//!
//! Non-committer stages must never mutate git state; the committer stage may
//! commit but never merge (merges belong to the dedicated merge flow). The
//! policy is evaluated once per attempted shell command.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Decision for one attempted tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Allow,
    Deny { reason: String },
}

impl PolicyDecision {
    pub fn is_denied(&self) -> bool {
        matches!(self, PolicyDecision::Deny { .. })
    }
}

/// Which command family a stage is forbidden from running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandPolicy {
    /// Deny every state-mutating git command (non-committer stages)
    DenyMutatingGit,
    /// Deny only merge commands (the committer stage)
    DenyMerge,
}

fn mutating_git_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)\bgit\s+(?:-[-\w=.]+\s+)*(commit|merge|rebase|push|cherry-pick|revert|reset\s+--hard|tag\s|branch\s+-[dDM])",
        )
        .expect("mutating git pattern is valid")
    })
}

fn merge_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\bgit\s+(?:-[-\w=.]+\s+)*merge\b").expect("merge pattern is valid")
    })
}

fn is_shell_tool(name: &str) -> bool {
    name.eq_ignore_ascii_case("bash") || name.eq_ignore_ascii_case("shell")
}

impl CommandPolicy {
    /// Evaluate one attempted tool call
    ///
    /// Only shell commands are inspected; other tools are always allowed.
    pub fn evaluate(&self, tool_name: &str, input: &serde_json::Value) -> PolicyDecision {
        if !is_shell_tool(tool_name) {
            return PolicyDecision::Allow;
        }

        let command = match input.get("command").and_then(|c| c.as_str()) {
            Some(command) => command,
            None => return PolicyDecision::Allow,
        };

        match self {
            CommandPolicy::DenyMutatingGit => {
                if mutating_git_pattern().is_match(command) {
                    PolicyDecision::Deny {
                        reason: format!(
                            "Mutating git commands are reserved for the committer stage (attempted: {})",
                            command
                        ),
                    }
                } else {
                    PolicyDecision::Allow
                }
            }
            CommandPolicy::DenyMerge => {
                if merge_pattern().is_match(command) {
                    PolicyDecision::Deny {
                        reason: format!(
                            "Merge commands are reserved for the dedicated merge flow (attempted: {})",
                            command
                        ),
                    }
                } else {
                    PolicyDecision::Allow
                }
            }
        }
    }

    /// Tool patterns for transports that enforce denial up front
    pub fn disallowed_tool_patterns(&self) -> Vec<String> {
        match self {
            CommandPolicy::DenyMutatingGit => [
                "git commit",
                "git merge",
                "git rebase",
                "git push",
                "git cherry-pick",
                "git revert",
                "git reset",
            ]
            .iter()
            .map(|c| format!("Bash({}:*)", c))
            .collect(),
            CommandPolicy::DenyMerge => vec!["Bash(git merge:*)".to_string()],
        }
    }
}
