//! Architecture quality gate
//!
//! The review agent self-reports a status, but the gate derives its own from
//! the findings and keeps whichever is more restrictive. The model's verdict
//! can be tightened, never loosened.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of an architecture review, ordered least to most restrictive
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Pass,
    PassWithNotes,
    NeedsRefactor,
    Blocked,
}

impl ReviewStatus {
    /// True when the pipeline may proceed without a refactor pass
    pub fn is_pass(&self) -> bool {
        matches!(self, ReviewStatus::Pass)
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReviewStatus::Pass => "pass",
            ReviewStatus::PassWithNotes => "pass-with-notes",
            ReviewStatus::NeedsRefactor => "needs-refactor",
            ReviewStatus::Blocked => "blocked",
        };
        write!(f, "{}", name)
    }
}

/// Severity of a single finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Which structural rule a finding falls under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Boundary,
    Srp,
    Duplication,
    Solid,
    Other,
}

impl RuleKind {
    /// Rules whose medium-severity violations still force a refactor
    fn is_quality_rule(&self) -> bool {
        !matches!(self, RuleKind::Other)
    }
}

/// One finding from the review agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub location: String,
    pub rule: RuleKind,
    pub message: String,
    #[serde(default)]
    pub recommended_action: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:?}/{:?}] {}: {}",
            self.severity, self.rule, self.location, self.message
        )
    }
}

/// A full architecture review payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchitectureReview {
    pub status: ReviewStatus,
    pub summary: String,
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub recommended_actions: Vec<String>,
    #[serde(default)]
    pub confidence: u8,
}

impl ArchitectureReview {
    /// Findings rendered one per line, for error messages and prompts
    pub fn findings_text(&self) -> String {
        self.findings
            .iter()
            .map(|f| format!("- {}", f))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// JSON schema the review agent's structured output must satisfy
pub fn review_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "required": ["status", "summary", "findings", "recommended_actions", "confidence"],
        "properties": {
            "status": { "enum": ["pass", "pass_with_notes", "needs_refactor", "blocked"] },
            "summary": { "type": "string" },
            "findings": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["severity", "location", "rule", "message"],
                    "properties": {
                        "severity": { "enum": ["low", "medium", "high", "critical"] },
                        "location": { "type": "string" },
                        "rule": { "enum": ["boundary", "srp", "duplication", "solid", "other"] },
                        "message": { "type": "string" },
                        "recommended_action": { "type": "string" }
                    }
                }
            },
            "recommended_actions": { "type": "array", "items": { "type": "string" } },
            "confidence": { "type": "integer", "minimum": 0, "maximum": 100 }
        }
    })
}

/// Derive the enforced review from the raw payload
///
/// Pure and deterministic; the raw payload is never mutated. Precedence,
/// most restrictive first:
/// 1. any critical finding: blocked
/// 2. any high finding, any medium finding against a quality rule, or
///    findings with no recommended actions at all: needs-refactor
/// 3. any findings at all: pass-with-notes
/// 4. otherwise: pass
pub fn enforce(review: &ArchitectureReview) -> ArchitectureReview {
    let mut reasons = Vec::new();

    let has_critical = review
        .findings
        .iter()
        .any(|f| f.severity == Severity::Critical);
    let has_high = review.findings.iter().any(|f| f.severity == Severity::High);
    let has_medium_rule_violation = review
        .findings
        .iter()
        .any(|f| f.severity == Severity::Medium && f.rule.is_quality_rule());
    let missing_actions = !review.findings.is_empty() && review.recommended_actions.is_empty();

    let derived = if has_critical {
        reasons.push("critical finding present");
        ReviewStatus::Blocked
    } else if has_high || has_medium_rule_violation || missing_actions {
        if has_high {
            reasons.push("high-severity finding present");
        }
        if has_medium_rule_violation {
            reasons.push("medium quality-rule violation");
        }
        if missing_actions {
            reasons.push("missing recommended actions");
        }
        ReviewStatus::NeedsRefactor
    } else if !review.findings.is_empty() {
        reasons.push("non-critical findings present");
        ReviewStatus::PassWithNotes
    } else {
        ReviewStatus::Pass
    };

    let enforced = derived.max(review.status);
    let summary = if enforced != review.status {
        format!("{} [gate: {}]", review.summary, reasons.join(", "))
    } else {
        review.summary.clone()
    };

    ArchitectureReview {
        status: enforced,
        summary,
        findings: review.findings.clone(),
        recommended_actions: review.recommended_actions.clone(),
        confidence: review.confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(severity: Severity, rule: RuleKind) -> Finding {
        Finding {
            severity,
            location: "src/lib.rs:10".to_string(),
            rule,
            message: "issue".to_string(),
            recommended_action: "fix it".to_string(),
        }
    }

    fn review(status: ReviewStatus, findings: Vec<Finding>) -> ArchitectureReview {
        ArchitectureReview {
            status,
            summary: "summary".to_string(),
            findings,
            recommended_actions: vec!["do the fix".to_string()],
            confidence: 90,
        }
    }

    #[test]
    fn test_critical_always_blocks() {
        for raw in [
            ReviewStatus::Pass,
            ReviewStatus::PassWithNotes,
            ReviewStatus::NeedsRefactor,
        ] {
            let raw_review = review(raw, vec![finding(Severity::Critical, RuleKind::Other)]);
            let enforced = enforce(&raw_review);
            assert_eq!(enforced.status, ReviewStatus::Blocked, "raw: {:?}", raw);
            assert!(enforced.summary.contains("critical finding present"));
        }
    }

    #[test]
    fn test_zero_findings_stays_pass() {
        let raw_review = review(ReviewStatus::Pass, vec![]);
        let enforced = enforce(&raw_review);
        assert_eq!(enforced.status, ReviewStatus::Pass);
        assert_eq!(enforced.summary, "summary");
    }

    #[test]
    fn test_high_finding_forces_refactor() {
        let raw_review = review(ReviewStatus::Pass, vec![finding(Severity::High, RuleKind::Other)]);
        let enforced = enforce(&raw_review);
        assert_eq!(enforced.status, ReviewStatus::NeedsRefactor);
        assert!(enforced.summary.contains("high-severity finding present"));
    }

    #[test]
    fn test_medium_quality_rule_forces_refactor() {
        for rule in [
            RuleKind::Boundary,
            RuleKind::Srp,
            RuleKind::Duplication,
            RuleKind::Solid,
        ] {
            let raw_review = review(ReviewStatus::Pass, vec![finding(Severity::Medium, rule)]);
            assert_eq!(
                enforce(&raw_review).status,
                ReviewStatus::NeedsRefactor,
                "rule: {:?}",
                rule
            );
        }
    }

    #[test]
    fn test_medium_other_rule_is_notes_only() {
        let raw_review = review(ReviewStatus::Pass, vec![finding(Severity::Medium, RuleKind::Other)]);
        let enforced = enforce(&raw_review);
        assert_eq!(enforced.status, ReviewStatus::PassWithNotes);
        assert!(enforced.summary.contains("non-critical findings present"));
    }

    #[test]
    fn test_missing_recommended_actions_forces_refactor() {
        let mut raw_review = review(ReviewStatus::Pass, vec![finding(Severity::Low, RuleKind::Other)]);
        raw_review.recommended_actions.clear();
        let enforced = enforce(&raw_review);
        assert_eq!(enforced.status, ReviewStatus::NeedsRefactor);
        assert!(enforced.summary.contains("missing recommended actions"));
    }

    #[test]
    fn test_raw_status_is_never_loosened() {
        let raw_review = review(ReviewStatus::NeedsRefactor, vec![finding(Severity::Low, RuleKind::Other)]);
        let enforced = enforce(&raw_review);
        assert_eq!(enforced.status, ReviewStatus::NeedsRefactor);
    }

    #[test]
    fn test_unchanged_status_keeps_summary() {
        let raw_review = review(ReviewStatus::PassWithNotes, vec![finding(Severity::Low, RuleKind::Other)]);
        let enforced = enforce(&raw_review);
        assert_eq!(enforced.status, ReviewStatus::PassWithNotes);
        assert_eq!(enforced.summary, "summary");
    }

    #[test]
    fn test_status_ordering() {
        assert!(ReviewStatus::Pass < ReviewStatus::PassWithNotes);
        assert!(ReviewStatus::PassWithNotes < ReviewStatus::NeedsRefactor);
        assert!(ReviewStatus::NeedsRefactor < ReviewStatus::Blocked);
    }

    #[test]
    fn test_review_deserializes_from_agent_payload() {
        let json = r#"{
            "status": "needs_refactor",
            "summary": "boundary leak",
            "findings": [
                {"severity": "high", "location": "src/a.rs", "rule": "boundary", "message": "leak"}
            ],
            "recommended_actions": ["introduce a trait at the seam"],
            "confidence": 80
        }"#;
        let review: ArchitectureReview = serde_json::from_str(json).unwrap();
        assert_eq!(review.status, ReviewStatus::NeedsRefactor);
        assert_eq!(review.findings.len(), 1);
        assert_eq!(review.findings[0].rule, RuleKind::Boundary);
        assert!(review.findings[0].recommended_action.is_empty());
    }
}
