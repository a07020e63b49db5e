//! Task and plan model
//!
//! Plans and tasks are owned by the caller's plan store; the pipeline treats
//! them as immutable input for the duration of a run.

use serde::{Deserialize, Serialize};

/// Identifier of a task within a plan
pub type TaskId = String;

/// The unit of work a pipeline run belongs to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// One task to carry through the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub technical_notes: String,
}

impl Task {
    /// Create a task with just id and title
    pub fn new(id: impl Into<TaskId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            dependencies: Vec::new(),
            acceptance_criteria: Vec::new(),
            technical_notes: String::new(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the acceptance criteria
    pub fn with_acceptance_criteria(mut self, criteria: Vec<String>) -> Self {
        self.acceptance_criteria = criteria;
        self
    }

    /// Set the technical notes
    pub fn with_technical_notes(mut self, notes: impl Into<String>) -> Self {
        self.technical_notes = notes.into();
        self
    }
}

/// Context from an earlier failed attempt at the same task
///
/// Rendered into the implementation prompt only; the state machine itself is
/// unaffected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryContext {
    pub retry_count: u32,
    pub previous_error: String,
}
