//! Stage model for the task pipeline
//!
//! A stage is one discrete, single-purpose invocation of the coding agent.
//! Stage kinds form a closed enum; the role each kind runs under is a total
//! function over that enum.

mod policy;
mod runner;

pub use policy::{CommandPolicy, PolicyDecision};
pub use runner::StageRunner;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::session::AgentDefinition;

/// The stages of one task run, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Implementation,
    ArchitectureReview,
    ArchitectureRefactor,
    Tester,
    Committer,
}

/// Which agent persona a stage runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    TaskExecution,
    ArchitectureSpecialist,
    Tester,
    Committer,
}

impl StageKind {
    /// Stable stage name used in logs and report sections
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Implementation => "implementation",
            StageKind::ArchitectureReview => "architecture-review",
            StageKind::ArchitectureRefactor => "architecture-refactor",
            StageKind::Tester => "tester",
            StageKind::Committer => "committer",
        }
    }

    /// Role the stage runs under
    ///
    /// The refactor stage edits code, so it runs as task execution; only the
    /// review itself is specialist work.
    pub fn role(&self) -> AgentRole {
        match self {
            StageKind::Implementation | StageKind::ArchitectureRefactor => {
                AgentRole::TaskExecution
            }
            StageKind::ArchitectureReview => AgentRole::ArchitectureSpecialist,
            StageKind::Tester => AgentRole::Tester,
            StageKind::Committer => AgentRole::Committer,
        }
    }

    /// Capability policy for the stage's shell commands
    ///
    /// Only the committer may mutate git state, and even the committer never
    /// merges.
    pub fn command_policy(&self) -> CommandPolicy {
        match self {
            StageKind::Committer => CommandPolicy::DenyMerge,
            _ => CommandPolicy::DenyMutatingGit,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentRole::TaskExecution => "task_execution",
            AgentRole::ArchitectureSpecialist => "architecture_specialist",
            AgentRole::Tester => "tester",
            AgentRole::Committer => "committer",
        };
        write!(f, "{}", name)
    }
}

/// Specification for one stage invocation; constructed fresh per stage
#[derive(Debug, Clone)]
pub struct StageSpec {
    pub kind: StageKind,
    pub prompt: String,
    pub model: String,
    pub max_turns: u32,
    pub output_schema: Option<serde_json::Value>,
    pub sub_agents: HashMap<String, AgentDefinition>,
    /// None disables command denial entirely (the dedicated merge flow)
    pub policy: Option<CommandPolicy>,
}

impl StageSpec {
    /// Create a spec with the stage's default command policy installed
    pub fn new(
        kind: StageKind,
        prompt: impl Into<String>,
        model: impl Into<String>,
        max_turns: u32,
    ) -> Self {
        Self {
            kind,
            prompt: prompt.into(),
            model: model.into(),
            max_turns,
            output_schema: None,
            sub_agents: HashMap::new(),
            policy: Some(kind.command_policy()),
        }
    }

    /// Require a structured payload conforming to the schema
    pub fn with_output_schema(mut self, schema: serde_json::Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Make a named sub-agent persona available
    pub fn with_sub_agent(mut self, name: impl Into<String>, agent: AgentDefinition) -> Self {
        self.sub_agents.insert(name.into(), agent);
        self
    }

    /// Drop command denial (merge flow only)
    pub fn without_policy(mut self) -> Self {
        self.policy = None;
        self
    }
}

/// Normalized outcome of one stage invocation
#[derive(Debug, Clone, Default)]
pub struct StageResult {
    pub text: String,
    pub stop_reason: Option<String>,
    pub duration_ms: Option<u64>,
    pub cost_usd: Option<f64>,
    pub structured_payload: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(StageKind::Implementation.name(), "implementation");
        assert_eq!(StageKind::ArchitectureReview.name(), "architecture-review");
        assert_eq!(StageKind::Committer.name(), "committer");
    }

    #[test]
    fn test_role_mapping_is_total() {
        assert_eq!(StageKind::Implementation.role(), AgentRole::TaskExecution);
        assert_eq!(
            StageKind::ArchitectureReview.role(),
            AgentRole::ArchitectureSpecialist
        );
        assert_eq!(
            StageKind::ArchitectureRefactor.role(),
            AgentRole::TaskExecution
        );
        assert_eq!(StageKind::Tester.role(), AgentRole::Tester);
        assert_eq!(StageKind::Committer.role(), AgentRole::Committer);
    }

    #[test]
    fn test_default_policies() {
        assert_eq!(
            StageKind::Implementation.command_policy(),
            CommandPolicy::DenyMutatingGit
        );
        assert_eq!(StageKind::Committer.command_policy(), CommandPolicy::DenyMerge);
    }

    #[test]
    fn test_spec_builder() {
        let spec = StageSpec::new(StageKind::ArchitectureReview, "review", "sonnet", 20)
            .with_output_schema(serde_json::json!({"type": "object"}));
        assert_eq!(spec.policy, Some(CommandPolicy::DenyMutatingGit));
        assert!(spec.output_schema.is_some());

        let spec = StageSpec::new(StageKind::Committer, "merge", "sonnet", 20).without_policy();
        assert!(spec.policy.is_none());
    }

    #[test]
    fn test_role_display() {
        assert_eq!(AgentRole::ArchitectureSpecialist.to_string(), "architecture_specialist");
        assert_eq!(AgentRole::TaskExecution.to_string(), "task_execution");
    }
}
