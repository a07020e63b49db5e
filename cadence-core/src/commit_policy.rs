//! Commit hygiene policy
//!
//! Every commit the committer stage produces must carry a conventional-commit
//! header and must not attribute authorship to the agent vendor's automation
//! identity via a co-author trailer.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::git::GitProbe;
use crate::{Error, Result};

/// `type(scope)!: description` with scope and breaking marker optional
fn header_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z][a-z0-9]*(\([^()\s]+\))?!?: \S.*$").expect("header pattern is valid")
    })
}

/// Case-insensitive co-author trailer naming the agent identity
fn forbidden_trailer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)co-authored-by:.*\bclaude\b").expect("trailer pattern is valid")
    })
}

/// Validate every commit in `range` (oldest to newest)
///
/// `context` names the work unit for the error message. An empty range is a
/// caller error: the committer guard should already have established that at
/// least one commit exists.
pub fn validate(probe: &dyn GitProbe, cwd: &Path, range: &str, context: &str) -> Result<()> {
    let commits = probe.log_range(cwd, range)?;

    if commits.is_empty() {
        return Err(Error::Policy(format!(
            "Commit range '{}' for {} contains no commits",
            range, context
        )));
    }

    for commit in &commits {
        if !header_pattern().is_match(&commit.subject) {
            return Err(Error::Policy(format!(
                "Commit {} in {} has a non-conventional subject: '{}'",
                commit.hash, context, commit.subject
            )));
        }

        let full_message = format!("{}\n{}", commit.subject, commit.body);
        if forbidden_trailer_pattern().is_match(&full_message) {
            return Err(Error::Policy(format!(
                "Commit {} in {} carries a forbidden co-author trailer",
                commit.hash, context
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::CommitInfo;

    struct FixedProbe {
        commits: Vec<CommitInfo>,
    }

    impl GitProbe for FixedProbe {
        fn head_of(&self, _cwd: &Path) -> Result<Option<String>> {
            Ok(self.commits.last().map(|c| c.hash.clone()))
        }

        fn log_range(&self, _cwd: &Path, _range: &str) -> Result<Vec<CommitInfo>> {
            Ok(self.commits.clone())
        }
    }

    fn commit(subject: &str, body: &str) -> CommitInfo {
        CommitInfo {
            hash: "a".repeat(40),
            subject: subject.to_string(),
            body: body.to_string(),
        }
    }

    fn check(commits: Vec<CommitInfo>) -> Result<()> {
        let probe = FixedProbe { commits };
        validate(&probe, Path::new("/tmp"), "old..new", "task-1")
    }

    #[test]
    fn test_conventional_subjects_pass() {
        for subject in [
            "feat: add widget",
            "fix(parser): handle empty input",
            "refactor!: split module",
            "chore(deps)!: bump tokio",
        ] {
            assert!(check(vec![commit(subject, "")]).is_ok(), "subject: {}", subject);
        }
    }

    #[test]
    fn test_non_conventional_subject_rejected() {
        for subject in [
            "Add widget",
            "feat add widget",
            "feat:",
            "feat:no space",
            "FEAT: shouting type",
        ] {
            let result = check(vec![commit(subject, "")]);
            assert!(
                matches!(result, Err(Error::Policy(_))),
                "subject: {}",
                subject
            );
        }
    }

    #[test]
    fn test_error_names_offending_commit_and_context() {
        let err = check(vec![commit("bad subject", "")]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains(&"a".repeat(40)));
        assert!(message.contains("task-1"));
    }

    #[test]
    fn test_forbidden_trailer_rejected_despite_good_header() {
        let result = check(vec![commit(
            "feat: add widget",
            "Implements the widget.\n\nCo-authored-by: Claude <noreply@anthropic.com>",
        )]);
        assert!(matches!(result, Err(Error::Policy(_))));
    }

    #[test]
    fn test_trailer_check_is_case_insensitive() {
        let result = check(vec![commit(
            "feat: add widget",
            "CO-AUTHORED-BY: claude <bot>",
        )]);
        assert!(matches!(result, Err(Error::Policy(_))));
    }

    #[test]
    fn test_human_co_author_allowed() {
        let result = check(vec![commit(
            "feat: add widget",
            "Co-authored-by: Jordan <jordan@example.com>",
        )]);
        assert!(result.is_ok());
    }

    #[test]
    fn test_empty_range_is_policy_error() {
        let result = check(vec![]);
        assert!(matches!(result, Err(Error::Policy(_))));
    }

    #[test]
    fn test_every_commit_in_range_is_checked() {
        let result = check(vec![
            commit("feat: good one", ""),
            commit("oops forgot the format", ""),
        ]);
        assert!(matches!(result, Err(Error::Policy(_))));
    }
}
