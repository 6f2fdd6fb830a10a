use std::collections::HashSet;

use bytes::Bytes;
use kiln_layer_store::{LayerId, LayerStore, PutOutcome};

use crate::{
    auth::AuthContext,
    error::Error,
    transport::{PackResponse, Transport},
};

/// `fetch(auth, repo_path, fetch_fn) -> (new_head?, head_advanced)`, per §4.6.
#[tracing::instrument(skip(auth, db, store, transport))]
pub fn fetch<S, T, A>(
    auth: &A,
    db: &kiln_metadata::Database,
    store: &S,
    remote_name: &str,
    transport: &T,
) -> Result<(Option<LayerId>, bool), Error<S::Error>>
where
    S: LayerStore,
    T: Transport,
    A: AuthContext,
{
    if !auth.can_fetch(remote_name) {
        return Err(Error::Unauthorized);
    }

    let remote_url = db.remote_url(remote_name).map_err(Error::metadata)?;
    let cur = db.repository_head(remote_name).map_err(Error::metadata)?;

    let response = transport
        .request_pack(&remote_url, cur)
        .map_err(Error::network)?;

    let payload = match response {
        PackResponse::None => {
            tracing::debug!(remote = remote_name, "remote has nothing newer");
            return Ok((cur, false));
        },
        PackResponse::Some(payload) => payload,
    };

    let (new_head, pack) = payload
        .repository_head_and_pack()
        .map_err(|e| Error::RemotePackUnexpectedFailure(e.to_string()))?;

    unpack(store, pack)?;

    db.update_repository_head(remote_name, new_head)
        .map_err(Error::metadata)?;

    if Some(new_head) == cur {
        Ok((cur, false))
    } else {
        tracing::info!(remote = remote_name, %new_head, "repository head advanced");
        Ok((Some(new_head), true))
    }
}

/// Admit every layer in `pack` into `store`, in the order given. Per §5,
/// a well-formed pack lists parents before their children; entries are
/// rejected if a parent is neither already in `store` nor earlier in this
/// same pack.
///
/// Public so `kiln-api`'s raw `/api/unpack` endpoint can admit a payload's
/// pack into the store without going through a full fetch (no repository
/// head to compare against, no remote to update).
pub fn unpack<S: LayerStore>(store: &S, pack: Bytes) -> Result<(), Error<S::Error>> {
    let mut seen_in_pack = HashSet::new();

    for entry in kiln_pack::pack_iter(pack).map_err(|e| Error::RemotePackUnexpectedFailure(e.to_string()))? {
        let entry = entry.map_err(|e| Error::RemotePackUnexpectedFailure(e.to_string()))?;

        if let Some(parent) = entry.parent {
            if !seen_in_pack.contains(&parent) && !store.exists(&parent) {
                return Err(Error::RemotePackFailedMissingParent(parent));
            }
        }
        seen_in_pack.insert(entry.id);

        if let PutOutcome::Mismatch(id) = store.put_layer(entry.id, entry.parent, entry.bytes).map_err(Error::Store)? {
            return Err(Error::RemotePackFailedChecksumMismatch(id));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use kiln_layer_store::mem::MemStore;
    use kiln_metadata::{Database, RemoteType};

    use super::*;
    use crate::{auth::AllowAll, transport::InMemoryPayloadTransport};

    #[test]
    fn fetch_with_no_updates_is_unchanged() {
        let db = Database::new();
        db.add_remote("origin", "terminusdb:///bundle", RemoteType::Remote)
            .unwrap();
        let store = MemStore::new();
        let transport = InMemoryPayloadTransport::empty();

        let (head, advanced) = fetch(&AllowAll, &db, &store, "origin", &transport).unwrap();
        assert_eq!(head, None);
        assert!(!advanced);
    }

    #[test]
    fn fetch_admits_a_pack_and_advances_head() {
        let db = Database::new();
        db.add_remote("origin", "terminusdb:///bundle", RemoteType::Remote)
            .unwrap();
        let store = MemStore::new();

        let bytes = Bytes::from_static(b"root layer");
        let id = LayerId::of(&bytes);
        let entry = kiln_pack::PackEntry {
            id,
            parent: None,
            bytes,
        };
        let pack = kiln_pack::build_pack(vec![entry]);
        let payload = kiln_pack::Payload::new(id, pack);
        let transport = InMemoryPayloadTransport::with_payload(payload);

        let (head, advanced) = fetch(&AllowAll, &db, &store, "origin", &transport).unwrap();
        assert_eq!(head, Some(id));
        assert!(advanced);
        assert!(store.exists(&id));
        assert_eq!(db.repository_head("origin").unwrap(), Some(id));
    }
}
