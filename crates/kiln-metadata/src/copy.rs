use std::collections::{HashMap, HashSet};

use kiln_history::CommitId;

use crate::{commit::Commit, repo::RepoMetadata, repo::Error};

/// Copy `commit` and its ancestors from `src` to `dst`, stopping at any
/// commit already present in `dst`. Idempotent: copying the same commit
/// twice leaves `dst` unchanged the second time.
///
/// Commits are inserted in topological order (parents before children),
/// since `src` is a DAG and may present ancestors via any traversal order.
pub fn copy_commits(src: &RepoMetadata, dst: &RepoMetadata, commit: CommitId) -> Result<(), Error> {
    let mut needed: HashMap<CommitId, Commit> = HashMap::new();
    let mut stack = vec![commit];
    let mut visited = HashSet::new();

    while let Some(id) = stack.pop() {
        if dst.has_commit(id) || !visited.insert(id) {
            continue;
        }
        if let Some(c) = src.get_commit(id) {
            stack.extend(c.parents.iter().copied());
            needed.insert(id, c);
        }
    }

    let mut pending: Vec<Commit> = needed.into_iter().map(|(_, c)| c).collect();
    while !pending.is_empty() {
        let mut next_round = Vec::new();
        let mut progressed = false;

        for c in pending {
            if c.parents.iter().all(|p| dst.has_commit(*p)) {
                dst.put_commit(c)?;
                progressed = true;
            } else {
                next_round.push(c);
            }
        }

        if !progressed {
            let stuck = next_round.remove(0);
            let missing = stuck
                .parents
                .iter()
                .copied()
                .find(|p| !dst.has_commit(*p))
                .expect("stuck commit must have a missing parent");
            return Err(Error::MissingParent(stuck.id, missing));
        }
        pending = next_round;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(label: &str, parents: Vec<CommitId>) -> Commit {
        Commit {
            id: CommitId::of(label.as_bytes()),
            author: "tester".into(),
            message: label.into(),
            timestamp: 0,
            parents,
            layers: Default::default(),
        }
    }

    #[test]
    fn copies_ancestors_topologically() {
        let src = RepoMetadata::new();
        let root = commit("root", vec![]);
        src.put_commit(root.clone()).unwrap();
        let child = commit("child", vec![root.id]);
        src.put_commit(child.clone()).unwrap();

        let dst = RepoMetadata::new();
        copy_commits(&src, &dst, child.id).unwrap();

        assert!(dst.has_commit(root.id));
        assert!(dst.has_commit(child.id));
    }

    #[test]
    fn stops_at_commits_already_present() {
        let src = RepoMetadata::new();
        let root = commit("root", vec![]);
        src.put_commit(root.clone()).unwrap();
        let child = commit("child", vec![root.id]);
        src.put_commit(child.clone()).unwrap();

        let dst = RepoMetadata::new();
        dst.put_commit(root.clone()).unwrap();
        copy_commits(&src, &dst, child.id).unwrap();

        assert!(dst.has_commit(child.id));
    }

    #[test]
    fn is_idempotent() {
        let src = RepoMetadata::new();
        let root = commit("root", vec![]);
        src.put_commit(root.clone()).unwrap();

        let dst = RepoMetadata::new();
        copy_commits(&src, &dst, root.id).unwrap();
        copy_commits(&src, &dst, root.id).unwrap();

        assert!(dst.has_commit(root.id));
    }
}
