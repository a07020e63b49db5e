//! Configuration management for Cadence
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (CADENCE_*)
//! 3. Config file (~/.config/cadence/config.toml)
//! 4. Default values

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::stage::AgentRole;
use crate::{Error, Result};

/// Model used when neither a role-specific nor a global override is set
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Per-role model overrides
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RoleModels {
    pub task_execution: Option<String>,
    pub architecture_specialist: Option<String>,
    pub tester: Option<String>,
    pub committer: Option<String>,
}

/// Agent-related configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Path to the claude executable
    pub claude_path: String,

    /// Model to use when no role override applies
    pub model: Option<String>,

    /// Role-specific model overrides
    pub models: RoleModels,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            claude_path: "claude".to_string(),
            model: None,
            models: RoleModels::default(),
        }
    }
}

/// Pipeline tuning knobs
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Refactor attempts allowed before the quality gate gives up
    pub max_refactor_cycles: u32,

    /// Turn budget per stage invocation
    pub max_turns: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_refactor_cycles: 3,
            max_turns: 50,
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Agent configuration
    pub agent: AgentConfig,

    /// Pipeline configuration
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if let Some(path) = config_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/cadence/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cadence").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - CADENCE_CLAUDE_PATH: Path to claude executable
    /// - CADENCE_MODEL: Model to use
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(claude_path) = std::env::var("CADENCE_CLAUDE_PATH") {
            self.agent.claude_path = claude_path;
        }

        if let Ok(model) = std::env::var("CADENCE_MODEL") {
            self.agent.model = Some(model);
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(
        mut self,
        claude_path: Option<String>,
        model: Option<String>,
    ) -> Self {
        if let Some(path) = claude_path {
            self.agent.claude_path = path;
        }

        if let Some(m) = model {
            self.agent.model = Some(m);
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(claude_path: Option<String>, model: Option<String>) -> Result<Self> {
        Ok(Self::load()?
            .with_env_overrides()
            .with_cli_overrides(claude_path, model))
    }

    /// Resolve the model for a role: role override, then global, then default
    pub fn model_for(&self, role: AgentRole) -> String {
        let role_model = match role {
            AgentRole::TaskExecution => &self.agent.models.task_execution,
            AgentRole::ArchitectureSpecialist => &self.agent.models.architecture_specialist,
            AgentRole::Tester => &self.agent.models.tester,
            AgentRole::Committer => &self.agent.models.committer,
        };

        role_model
            .clone()
            .or_else(|| self.agent.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }
}
