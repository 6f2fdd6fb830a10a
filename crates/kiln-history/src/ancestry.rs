//! Full ancestor closure of a commit.

use std::collections::HashSet;

use crate::{CommitGraph, CommitId};

/// Every ancestor of `head` (inclusive), oldest first.
///
/// A post-order walk of the commit DAG visits a node only after all of its
/// parents, which is exactly the order [`kiln_metadata::RepoMetadata::put_commit`]
/// requires for replaying a fetched history.
pub fn ancestors_oldest_first<G: CommitGraph>(graph: &G, head: CommitId) -> Result<Vec<CommitId>, G::Error> {
    let mut out = Vec::new();
    let mut visited = HashSet::new();
    visit(graph, head, &mut visited, &mut out)?;
    Ok(out)
}

fn visit<G: CommitGraph>(
    graph: &G,
    commit: CommitId,
    visited: &mut HashSet<CommitId>,
    out: &mut Vec<CommitId>,
) -> Result<(), G::Error> {
    if !visited.insert(commit) {
        return Ok(());
    }
    for parent in graph.parents(commit)? {
        visit(graph, parent, visited, out)?;
    }
    out.push(commit);
    Ok(())
}
