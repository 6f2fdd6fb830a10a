use kiln_layer_store::LayerStore;
use kiln_metadata::{Database, RemoteType};

use crate::{auth::AuthContext, error::Error, pull::PullResult, transport::Transport};

/// Outcome of [`clone`]: the branch the fresh database ended up on.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CloneResult {
    Empty,
    Populated(kiln_history::CommitId),
}

/// `clone(auth, remote_url, fetch_fn) -> Database`, per §4.9: register the
/// remote, fetch once, fast-forward `main` onto whatever came back.
///
/// Per the compensation rule, callers that construct a persistent store
/// before calling this (`kiln-cli`'s `clone` does, for its on-disk
/// `FsStore`) should delete it when the returned error's
/// [`Error::triggers_clone_compensation`] is `true` — this function itself
/// only ever operates on an in-memory [`Database`], so there is nothing
/// here to roll back.
#[tracing::instrument(skip(auth, store, transport))]
pub fn clone<S, T, A>(auth: &A, store: &S, remote_url: &str, transport: &T) -> Result<(Database, CloneResult), Error<S::Error>>
where
    S: LayerStore,
    T: Transport,
    A: AuthContext,
{
    if !auth.can_clone(remote_url) {
        return Err(Error::Unauthorized);
    }

    let db = Database::new();
    db.add_remote("origin", remote_url, RemoteType::Remote)
        .map_err(Error::metadata)?;

    let pulled = crate::pull::pull(auth, &db, store, "main", "origin", "main", transport).map_err(|e| {
        tracing::warn!(remote = remote_url, error = %e, "clone failed");
        e
    })?;

    let result = match pulled {
        PullResult::Unchanged | PullResult::Ahead => CloneResult::Empty,
        PullResult::FastForwarded(applied) => {
            let head = *applied.last().expect("fast-forward always applies at least one commit");
            tracing::info!(remote = remote_url, %head, "clone populated main");
            CloneResult::Populated(head)
        },
        // A fresh database has no local commits, so pull can only diverge
        // or lack common history if the remote's own history is internally
        // inconsistent; treat it the same as the errors compensation covers.
        PullResult::DivergentHistory(_) | PullResult::NoCommonHistory => {
            return Err(Error::Internal("remote history changed shape during clone".into()));
        },
    };

    Ok((db, result))
}

#[cfg(test)]
mod tests {
    use kiln_layer_store::{mem::MemStore, LayerId};
    use kiln_metadata::{Commit, GraphKind};

    use super::*;
    use crate::auth::AllowAll;
    use crate::transport::InMemoryPayloadTransport;

    #[test]
    fn clone_of_empty_remote_is_empty() {
        let store = MemStore::new();
        let transport = InMemoryPayloadTransport::empty();

        let (db, result) = clone(&AllowAll, &store, "terminusdb:///bundle", &transport).unwrap();
        assert_eq!(result, CloneResult::Empty);
        assert!(db.has_remote("origin"));
    }

    #[test]
    fn clone_of_populated_remote_fast_forwards_main() {
        let store = MemStore::new();
        let id = LayerId::of(b"root");
        store
            .put_layer(id, None, bytes::Bytes::from_static(b"root"))
            .unwrap();
        let entry = kiln_pack::PackEntry {
            id,
            parent: None,
            bytes: bytes::Bytes::from_static(b"root"),
        };
        let payload = kiln_pack::Payload::new(id, kiln_pack::build_pack(vec![entry]));

        let mut layers = std::collections::BTreeMap::new();
        layers.insert(GraphKind::Instance, id);
        let root = Commit {
            id: kiln_history::CommitId::of(b"root"),
            author: "tester".into(),
            message: "root".into(),
            timestamp: 0,
            parents: vec![],
            layers,
        };
        let transport = InMemoryPayloadTransport::with_payload_and_commits(payload, vec![root.clone()]);

        let (db, result) = clone(&AllowAll, &store, "terminusdb:///bundle", &transport).unwrap();
        assert_eq!(result, CloneResult::Populated(root.id));
        assert_eq!(db.local.branch_head_commit("main"), Some(root.id));
    }
}
