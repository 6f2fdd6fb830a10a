//! Most-recent-common-ancestor search over the commit DAG.

use std::collections::HashSet;

use crate::CommitId;

/// Capability to read a commit's parents, scoped to one repository (a local
/// repository or one particular remote-tracking repository). [`mrca`] is
/// generic over this so it never has to know how commit parentage is stored.
pub trait CommitGraph {
    type Error: std::error::Error + Send + Sync + 'static;

    fn parents(&self, commit: CommitId) -> Result<Vec<CommitId>, Self::Error>;
}

/// Result of [`mrca`]: the common ancestor (if any) and, for each side, the
/// commits reachable from that side's head that are not reachable from the
/// other side — i.e. what that side would need to transfer to catch the
/// other up to its head.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Mrca {
    pub common: Option<CommitId>,
    pub path_a: Vec<CommitId>,
    pub path_b: Vec<CommitId>,
}

/// Two-sided breadth-first search for the most recent commit reachable from
/// both `head_a` (via `a`) and `head_b` (via `b`).
///
/// Expands one BFS level on the `a` side, then one level on the `b` side,
/// checking after each expansion whether the frontier just produced has
/// walked into a commit already visited on the other side. This means that
/// when two candidates are equally recent, the one discovered while
/// expanding `a`'s frontier wins the tie, matching the asymmetry of a push:
/// `a` is the pushing side.
pub fn mrca<A, B>(a: &A, head_a: CommitId, b: &B, head_b: CommitId) -> Result<Mrca, A::Error>
where
    A: CommitGraph,
    B: CommitGraph<Error = A::Error>,
{
    if head_a == head_b {
        return Ok(Mrca {
            common: Some(head_a),
            path_a: Vec::new(),
            path_b: Vec::new(),
        });
    }

    let mut visited_a: HashSet<CommitId> = std::iter::once(head_a).collect();
    let mut visited_b: HashSet<CommitId> = std::iter::once(head_b).collect();
    let mut frontier_a = vec![head_a];
    let mut frontier_b = vec![head_b];
    let mut path_a = Vec::new();
    let mut path_b = Vec::new();

    loop {
        if frontier_a.is_empty() && frontier_b.is_empty() {
            return Ok(Mrca {
                common: None,
                path_a,
                path_b,
            });
        }

        if !frontier_a.is_empty() {
            let mut next = Vec::new();
            for commit in std::mem::take(&mut frontier_a) {
                if visited_b.contains(&commit) {
                    return Ok(Mrca {
                        common: Some(commit),
                        path_a,
                        path_b,
                    });
                }
                path_a.push(commit);
                for parent in a.parents(commit)? {
                    if visited_a.insert(parent) {
                        next.push(parent);
                    }
                }
            }
            frontier_a = next;
        }

        if !frontier_b.is_empty() {
            let mut next = Vec::new();
            for commit in std::mem::take(&mut frontier_b) {
                if visited_a.contains(&commit) {
                    return Ok(Mrca {
                        common: Some(commit),
                        path_a,
                        path_b,
                    });
                }
                path_b.push(commit);
                for parent in b.parents(commit)? {
                    if visited_b.insert(parent) {
                        next.push(parent);
                    }
                }
            }
            frontier_b = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, convert::Infallible};

    use super::*;

    struct Graph(HashMap<CommitId, Vec<CommitId>>);

    impl CommitGraph for Graph {
        type Error = Infallible;

        fn parents(&self, commit: CommitId) -> Result<Vec<CommitId>, Self::Error> {
            Ok(self.0.get(&commit).cloned().unwrap_or_default())
        }
    }

    fn commit(label: &str) -> CommitId {
        CommitId::of(label.as_bytes())
    }

    #[test]
    fn identical_heads_have_empty_paths() {
        let c1 = commit("c1");
        let graph = Graph(HashMap::new());
        let got = mrca(&graph, c1, &graph, c1).unwrap();
        assert_eq!(
            got,
            Mrca {
                common: Some(c1),
                path_a: vec![],
                path_b: vec![],
            }
        );
    }

    #[test]
    fn fast_forward_has_empty_remote_path() {
        let c1 = commit("c1");
        let c2 = commit("c2");
        let graph = Graph(HashMap::from([(c2, vec![c1])]));

        let got = mrca(&graph, c2, &graph, c1).unwrap();
        assert_eq!(
            got,
            Mrca {
                common: Some(c1),
                path_a: vec![c2],
                path_b: vec![],
            }
        );
    }

    #[test]
    fn diverged_heads_report_both_paths() {
        let c1 = commit("c1");
        let c2a = commit("c2a");
        let c2b = commit("c2b");
        let graph = Graph(HashMap::from([(c2a, vec![c1]), (c2b, vec![c1])]));

        let got = mrca(&graph, c2a, &graph, c2b).unwrap();
        assert_eq!(got.common, Some(c1));
        assert_eq!(got.path_a, vec![c2a]);
        assert_eq!(got.path_b, vec![c2b]);
    }

    #[test]
    fn unrelated_histories_have_no_common_ancestor() {
        let root_a = commit("root-a");
        let root_b = commit("root-b");
        let graph = Graph(HashMap::new());

        let got = mrca(&graph, root_a, &graph, root_b).unwrap();
        assert_eq!(got.common, None);
        assert_eq!(got.path_a, vec![root_a]);
        assert_eq!(got.path_b, vec![root_b]);
    }

    fn linear_chain(len: usize) -> (Graph, Vec<CommitId>) {
        let ids: Vec<CommitId> = (0..len).map(|i| commit(&format!("c{i}"))).collect();
        let mut parents = HashMap::new();
        for window in ids.windows(2) {
            parents.insert(window[1], vec![window[0]]);
        }
        (Graph(parents), ids)
    }

    proptest::proptest! {
        /// A fast-forward (the remote side sitting anywhere on the local
        /// side's own chain) always reports that ancestor as the common
        /// commit with an empty remote-only path, for any chain length.
        #[test]
        fn fast_forward_along_an_arbitrary_chain_has_empty_remote_path(len in 1usize..20) {
            let (graph, ids) = linear_chain(len);
            let head = *ids.last().unwrap();
            let root = ids[0];

            let got = mrca(&graph, head, &graph, root).unwrap();
            proptest::prop_assert_eq!(got.common, Some(root));
            proptest::prop_assert!(got.path_b.is_empty());
            proptest::prop_assert_eq!(got.path_a.len(), len - 1);
        }
    }
}
