//! Read-only git probe
//!
//! The pipeline only ever reads git state: the current head between stages
//! and the commit range produced by the committer. Writes happen exclusively
//! through agent tool use. The narrow trait keeps a fake implementation
//! trivial in tests.

use std::path::Path;

use git2::Repository;

use crate::{Error, Result};

/// One commit from a range, oldest to newest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Full commit hash
    pub hash: String,
    /// First line of the commit message
    pub subject: String,
    /// Message body after the subject line
    pub body: String,
}

/// Read-only view of a git working directory
pub trait GitProbe: Send + Sync {
    /// Current HEAD commit hash, or None on an unborn branch
    fn head_of(&self, cwd: &Path) -> Result<Option<String>>;

    /// Commits in `old..new` order, oldest first
    fn log_range(&self, cwd: &Path, range: &str) -> Result<Vec<CommitInfo>>;
}

/// Probe backed by libgit2
#[derive(Debug, Clone, Copy, Default)]
pub struct RepoProbe;

impl RepoProbe {
    pub fn new() -> Self {
        Self
    }

    fn open(cwd: &Path) -> Result<Repository> {
        Repository::discover(cwd).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                Error::Git(format!("Not a git repository: {}", cwd.display()))
            } else {
                Error::Git(format!("Failed to open repository: {}", e))
            }
        })
    }
}

impl GitProbe for RepoProbe {
    fn head_of(&self, cwd: &Path) -> Result<Option<String>> {
        let repo = Self::open(cwd)?;
        let head = match repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(Error::Git(format!("Failed to read HEAD: {}", e))),
        };
        let commit = head
            .peel_to_commit()
            .map_err(|e| Error::Git(format!("Failed to resolve HEAD: {}", e)))?;
        Ok(Some(commit.id().to_string()))
    }

    fn log_range(&self, cwd: &Path, range: &str) -> Result<Vec<CommitInfo>> {
        let (old, new) = range
            .split_once("..")
            .ok_or_else(|| Error::Git(format!("Invalid commit range: '{}'", range)))?;

        let repo = Self::open(cwd)?;
        let mut walk = repo
            .revwalk()
            .map_err(|e| Error::Git(format!("Failed to walk commits: {}", e)))?;

        let new_oid = repo
            .revparse_single(new)
            .map_err(|e| Error::Git(format!("Failed to resolve '{}': {}", new, e)))?
            .id();
        let old_oid = repo
            .revparse_single(old)
            .map_err(|e| Error::Git(format!("Failed to resolve '{}': {}", old, e)))?
            .id();

        walk.push(new_oid)
            .map_err(|e| Error::Git(format!("Failed to walk from '{}': {}", new, e)))?;
        walk.hide(old_oid)
            .map_err(|e| Error::Git(format!("Failed to hide '{}': {}", old, e)))?;

        let mut commits = Vec::new();
        for oid in walk {
            let oid = oid.map_err(|e| Error::Git(format!("Walk failed: {}", e)))?;
            let commit = repo
                .find_commit(oid)
                .map_err(|e| Error::Git(format!("Failed to read commit {}: {}", oid, e)))?;

            let message = commit.message().unwrap_or_default();
            let (subject, body) = match message.split_once('\n') {
                Some((subject, body)) => (subject.trim_end(), body.trim()),
                None => (message.trim_end(), ""),
            };

            commits.push(CommitInfo {
                hash: oid.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        }

        // Revwalk yields newest first
        commits.reverse();
        Ok(commits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;
    use tempfile::TempDir;

    fn commit_file(repo: &Repository, name: &str, message: &str) -> git2::Oid {
        let workdir = repo.workdir().unwrap();
        std::fs::write(workdir.join(name), name).unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();

        let sig = Signature::now("tester", "tester@example.com").unwrap();
        let parents: Vec<git2::Commit> = match repo.head() {
            Ok(head) => vec![head.peel_to_commit().unwrap()],
            Err(_) => vec![],
        };
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap()
    }

    #[test]
    fn test_head_of_unborn_branch() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        let probe = RepoProbe::new();
        assert_eq!(probe.head_of(dir.path()).unwrap(), None);
    }

    #[test]
    fn test_head_of_non_repo() {
        let dir = TempDir::new().unwrap();
        let probe = RepoProbe::new();
        assert!(matches!(probe.head_of(dir.path()), Err(Error::Git(_))));
    }

    #[test]
    fn test_head_tracks_commits() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let probe = RepoProbe::new();

        let first = commit_file(&repo, "a.txt", "feat: first");
        assert_eq!(probe.head_of(dir.path()).unwrap(), Some(first.to_string()));

        let second = commit_file(&repo, "b.txt", "feat: second");
        assert_eq!(probe.head_of(dir.path()).unwrap(), Some(second.to_string()));
    }

    #[test]
    fn test_log_range_oldest_first() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let probe = RepoProbe::new();

        let base = commit_file(&repo, "a.txt", "feat: base");
        commit_file(&repo, "b.txt", "feat: middle\n\nsome body");
        let tip = commit_file(&repo, "c.txt", "fix: tip");

        let range = format!("{}..{}", base, tip);
        let commits = probe.log_range(dir.path(), &range).unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].subject, "feat: middle");
        assert_eq!(commits[0].body, "some body");
        assert_eq!(commits[1].subject, "fix: tip");
        assert_eq!(commits[1].hash, tip.to_string());
    }

    #[test]
    fn test_log_range_rejects_malformed() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        let probe = RepoProbe::new();
        assert!(matches!(
            probe.log_range(dir.path(), "deadbeef"),
            Err(Error::Git(_))
        ));
    }
}
