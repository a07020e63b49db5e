//! Prompt templates for the pipeline stages
//!
//! Templates are embedded markdown with `{{VARIABLE}}` placeholders. The
//! functions here own the rendering; the wording itself lives in the
//! `prompts/` files so it can be tuned without touching code.

use crate::gate::ArchitectureReview;
use crate::task::{Plan, RetryContext, Task};

const IMPLEMENTATION: &str = include_str!("prompts/implementation.md");
const ARCHITECTURE_REVIEW: &str = include_str!("prompts/architecture_review.md");
const ARCHITECTURE_REFACTOR: &str = include_str!("prompts/architecture_refactor.md");
const TESTER: &str = include_str!("prompts/tester.md");
const COMMITTER: &str = include_str!("prompts/committer.md");
const MERGE: &str = include_str!("prompts/merge.md");
const STABILIZE: &str = include_str!("prompts/stabilize.md");

/// System prompt for the implementation sub-agent persona
pub const IMPLEMENTER_PERSONA: &str = "You are a focused implementation agent. \
You write the code for exactly the piece of work you are handed, keeping the \
tree compiling. You never run state-mutating git commands and never commit or \
merge; those belong to other stages.";

fn render(template: &str, vars: &[(&str, String)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}

fn bullet_list(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        return empty.to_string();
    }
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn or_placeholder(text: &str, empty: &str) -> String {
    if text.trim().is_empty() {
        empty.to_string()
    } else {
        text.to_string()
    }
}

/// Implementation stage prompt; retry context is rendered here and nowhere else
pub fn implementation(plan: &Plan, task: &Task, retry: Option<&RetryContext>) -> String {
    let retry_notes = match retry {
        Some(retry) => format!(
            "\n## Previous attempt\n\nAttempt {} failed with:\n\n{}\n\nAvoid repeating that failure.\n",
            retry.retry_count, retry.previous_error
        ),
        None => String::new(),
    };

    render(
        IMPLEMENTATION,
        &[
            ("PLAN_TITLE", plan.title.clone()),
            ("TASK_ID", task.id.clone()),
            ("TASK_TITLE", task.title.clone()),
            (
                "TASK_DESCRIPTION",
                or_placeholder(&task.description, "(no further description)"),
            ),
            (
                "ACCEPTANCE_CRITERIA",
                bullet_list(&task.acceptance_criteria, "(none given)"),
            ),
            (
                "TECHNICAL_NOTES",
                or_placeholder(&task.technical_notes, "(none)"),
            ),
            (
                "DEPENDENCIES",
                bullet_list(&task.dependencies, "(no dependencies)"),
            ),
            ("RETRY_NOTES", retry_notes),
        ],
    )
}

/// Architecture review stage prompt
pub fn architecture_review(task: &Task) -> String {
    render(
        ARCHITECTURE_REVIEW,
        &[
            ("TASK_ID", task.id.clone()),
            ("TASK_TITLE", task.title.clone()),
        ],
    )
}

/// Refactor stage prompt, scoped strictly to the latest review
pub fn architecture_refactor(task: &Task, review: &ArchitectureReview) -> String {
    render(
        ARCHITECTURE_REFACTOR,
        &[
            ("TASK_ID", task.id.clone()),
            ("TASK_TITLE", task.title.clone()),
            (
                "FINDINGS",
                or_placeholder(&review.findings_text(), "(no findings listed)"),
            ),
            (
                "RECOMMENDED_ACTIONS",
                bullet_list(&review.recommended_actions, "(none given)"),
            ),
        ],
    )
}

/// Tester stage prompt
pub fn tester(task: &Task) -> String {
    render(
        TESTER,
        &[
            ("TASK_ID", task.id.clone()),
            ("TASK_TITLE", task.title.clone()),
            (
                "ACCEPTANCE_CRITERIA",
                bullet_list(&task.acceptance_criteria, "(none given)"),
            ),
        ],
    )
}

/// Committer stage prompt
pub fn committer(plan: &Plan, task: &Task) -> String {
    render(
        COMMITTER,
        &[
            ("PLAN_TITLE", plan.title.clone()),
            ("TASK_ID", task.id.clone()),
            ("TASK_TITLE", task.title.clone()),
        ],
    )
}

/// Merge phase prompt
pub fn merge_phase(
    branches: &[String],
    target_branch: &str,
    validation_commands: &[String],
    merge_context: &str,
) -> String {
    render(
        MERGE,
        &[
            ("TARGET_BRANCH", target_branch.to_string()),
            (
                "BRANCHES",
                branches
                    .iter()
                    .enumerate()
                    .map(|(i, b)| format!("{}. `{}`", i + 1, b))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            (
                "MERGE_CONTEXT",
                or_placeholder(merge_context, "(no extra context)"),
            ),
            (
                "VALIDATION_COMMANDS",
                bullet_list(validation_commands, "(none; skip validation)"),
            ),
        ],
    )
}

/// Stabilize phase prompt
pub fn stabilize_phase(
    integration_branch: &str,
    target_branch: &str,
    validation_commands: &[String],
) -> String {
    render(
        STABILIZE,
        &[
            ("INTEGRATION_BRANCH", integration_branch.to_string()),
            ("TARGET_BRANCH", target_branch.to_string()),
            (
                "VALIDATION_COMMANDS",
                bullet_list(validation_commands, "(none; skip validation)"),
            ),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{Finding, ReviewStatus, RuleKind, Severity};

    fn plan() -> Plan {
        Plan {
            id: "plan-1".to_string(),
            title: "Widget overhaul".to_string(),
            description: String::new(),
        }
    }

    fn task() -> Task {
        Task::new("task-1", "Add widget")
            .with_description("Build the widget")
            .with_acceptance_criteria(vec!["widget renders".to_string()])
    }

    #[test]
    fn test_implementation_prompt() {
        let prompt = implementation(&plan(), &task(), None);
        assert!(prompt.contains("Widget overhaul"));
        assert!(prompt.contains("task-1"));
        assert!(prompt.contains("- widget renders"));
        assert!(prompt.contains("(no dependencies)"));
        assert!(!prompt.contains("Previous attempt"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_implementation_prompt_with_retry() {
        let retry = RetryContext {
            retry_count: 2,
            previous_error: "tester stage timed out".to_string(),
        };
        let prompt = implementation(&plan(), &task(), Some(&retry));
        assert!(prompt.contains("Attempt 2 failed"));
        assert!(prompt.contains("tester stage timed out"));
    }

    #[test]
    fn test_refactor_prompt_scoped_to_findings() {
        let review = ArchitectureReview {
            status: ReviewStatus::NeedsRefactor,
            summary: "boundary leak".to_string(),
            findings: vec![Finding {
                severity: Severity::High,
                location: "src/widget.rs:40".to_string(),
                rule: RuleKind::Boundary,
                message: "reaches into storage internals".to_string(),
                recommended_action: "go through the repository trait".to_string(),
            }],
            recommended_actions: vec!["go through the repository trait".to_string()],
            confidence: 85,
        };
        let prompt = architecture_refactor(&task(), &review);
        assert!(prompt.contains("src/widget.rs:40"));
        assert!(prompt.contains("- go through the repository trait"));
        assert!(prompt.contains("nothing else"));
    }

    #[test]
    fn test_tester_prompt_prefers_integration() {
        let prompt = tester(&task());
        assert!(prompt.contains("integration"));
        assert!(prompt.contains("widget renders"));
    }

    #[test]
    fn test_committer_prompt_names_rules() {
        let prompt = committer(&plan(), &task());
        assert!(prompt.contains("exactly one commit"));
        assert!(prompt.contains("co-author"));
        assert!(prompt.contains("Never merge"));
    }

    #[test]
    fn test_merge_prompt_orders_branches() {
        let prompt = merge_phase(
            &["task/a".to_string(), "task/b".to_string()],
            "integration",
            &["cargo test".to_string()],
            "both touch the parser",
        );
        let a = prompt.find("1. `task/a`").unwrap();
        let b = prompt.find("2. `task/b`").unwrap();
        assert!(a < b);
        assert!(prompt.contains("non-fast-forward"));
        assert!(prompt.contains("cargo test"));
        assert!(prompt.contains("both touch the parser"));
    }

    #[test]
    fn test_stabilize_prompt() {
        let prompt = stabilize_phase("integration", "main", &[]);
        assert!(prompt.contains("`integration`"));
        assert!(prompt.contains("fast-forward"));
        assert!(prompt.contains("(none; skip validation)"));
    }
}
