//! A single repository context: the commits and named branches it owns.
//!
//! A [`Database`](crate::Database) holds one of these for its local
//! repository, plus one per registered remote (its remote-tracking mirror).

use std::collections::HashMap;

use kiln_history::CommitId;
use parking_lot::RwLock;
use thiserror::Error;

use crate::commit::Commit;

#[derive(Debug, Error)]
pub enum Error {
    #[error("commit {0} references parent {1}, which is not present")]
    MissingParent(CommitId, CommitId),
}

/// Commits and branches belonging to one repository context.
///
/// Branch-head updates and commit insertion are each guarded by their own
/// lock, which is sufficient to serialize concurrent writers per §5: two
/// racing updates to the same branch observe each other's effect rather than
/// last-writer-wins silently dropping one.
#[derive(Debug, Default)]
pub struct RepoMetadata {
    commits: RwLock<HashMap<CommitId, Commit>>,
    branches: RwLock<HashMap<String, Option<CommitId>>>,
}

impl RepoMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn branch_head_commit(&self, branch: &str) -> Option<CommitId> {
        self.branches.read().get(branch).copied().flatten()
    }

    /// Atomically point `branch` at `commit`, creating the branch if absent.
    pub fn reset_branch_head(&self, branch: &str, commit: CommitId) {
        self.branches
            .write()
            .insert(branch.to_owned(), Some(commit));
    }

    /// Create `branch` with no head, if it does not already exist.
    pub fn ensure_branch(&self, branch: &str) {
        self.branches
            .write()
            .entry(branch.to_owned())
            .or_insert(None);
    }

    pub fn get_commit(&self, id: CommitId) -> Option<Commit> {
        self.commits.read().get(&id).cloned()
    }

    pub fn has_commit(&self, id: CommitId) -> bool {
        self.commits.read().contains_key(&id)
    }

    /// Every commit this repository knows about, in no particular order.
    /// Used by `kiln-cli` to snapshot local state to disk between
    /// invocations; not needed for the in-memory sync engine itself.
    pub fn all_commits(&self) -> Vec<Commit> {
        self.commits.read().values().cloned().collect()
    }

    /// Every branch name and its current head, including branches with no
    /// commits yet.
    pub fn branches(&self) -> Vec<(String, Option<CommitId>)> {
        self.branches
            .read()
            .iter()
            .map(|(name, head)| (name.clone(), *head))
            .collect()
    }

    /// Insert `commit`, failing if any parent is not already present.
    /// Idempotent: inserting the same commit id twice is a no-op.
    pub fn put_commit(&self, commit: Commit) -> Result<(), Error> {
        let mut commits = self.commits.write();
        if commits.contains_key(&commit.id) {
            return Ok(());
        }
        for parent in &commit.parents {
            if !commits.contains_key(parent) {
                return Err(Error::MissingParent(commit.id, *parent));
            }
        }
        commits.insert(commit.id, commit);
        Ok(())
    }
}

impl kiln_history::CommitGraph for RepoMetadata {
    type Error = std::convert::Infallible;

    fn parents(&self, commit: CommitId) -> Result<Vec<CommitId>, Self::Error> {
        Ok(self
            .commits
            .read()
            .get(&commit)
            .map(|c| c.parents.clone())
            .unwrap_or_default())
    }
}
