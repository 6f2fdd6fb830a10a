//! The eight external operations of spec §4.10, each wrapping a `kiln-sync`
//! engine call into an [`Envelope`].
//!
//! Bundle and unbundle are not a separate codec: per §4.10 they are push and
//! pull against a synthetic, in-process remote (`terminusdb:///bundle`)
//! backed by [`InMemoryPayloadTransport`]. The remote is registered for the
//! duration of the call and torn down afterward.

use kiln_layer_store::LayerStore;
use kiln_metadata::{Database, RemoteType};
use kiln_sync::{AuthContext, Error as SyncError, InMemoryPayloadTransport, PullResult, PushResult, Transport};

use crate::{bundle, envelope::Envelope, error};

const BUNDLE_REMOTE: &str = "terminusdb:///bundle";

/// Owns one repository's local metadata and layer store; the unit the HTTP
/// router keys its per-`{org}/{db}` state on.
pub struct Orchestrator<S, A> {
    pub db: Database,
    pub store: S,
    pub auth: A,
}

impl<S: LayerStore, A: AuthContext> Orchestrator<S, A> {
    pub fn new(store: S, auth: A) -> Self {
        Self {
            db: Database::new(),
            store,
            auth,
        }
    }

    pub fn fetch<T: Transport>(&self, remote_name: &str, transport: &T) -> Result<Envelope, SyncError<S::Error>> {
        let (head, advanced) = kiln_sync::fetch(&self.auth, &self.db, &self.store, remote_name, transport)?;
        Ok(Envelope::success("fetch complete")
            .with("head_has_updated", advanced)
            .with("repository_head", head.map(|h| h.to_string())))
    }

    pub fn push<T: Transport>(
        &self,
        branch: &str,
        remote_name: &str,
        transport: &T,
    ) -> Result<Envelope, SyncError<S::Error>> {
        let result = kiln_sync::push(&self.auth, &self.db, &self.store, branch, remote_name, transport)?;
        let env = match result {
            PushResult::Same(head) => Envelope::success("remote already up to date")
                .with("same", true)
                .with("new", false)
                .with("repository_head", head.map(|h| h.to_string())),
            PushResult::New(head) => Envelope::success("remote advanced")
                .with("same", false)
                .with("new", true)
                .with("repository_head", head.to_string()),
        };
        Ok(env)
    }

    pub fn pull<T: Transport>(
        &self,
        local_branch: &str,
        remote_name: &str,
        remote_branch: &str,
        transport: &T,
    ) -> Result<Envelope, SyncError<S::Error>> {
        let result = kiln_sync::pull(
            &self.auth,
            &self.db,
            &self.store,
            local_branch,
            remote_name,
            remote_branch,
            transport,
        )?;
        Ok(pull_envelope(&result))
    }

    /// Register `remote_url` as a fresh database's `origin` and pull `main`
    /// once onto it, per §4.9.
    pub fn clone_into<T: Transport>(
        auth: A,
        store: S,
        remote_url: &str,
        transport: &T,
    ) -> Result<(Self, Envelope), SyncError<S::Error>> {
        let (db, result) = kiln_sync::clone_repository(&auth, &store, remote_url, transport)?;
        let pulled = match &result {
            kiln_sync::CloneResult::Empty => PullResult::Unchanged,
            kiln_sync::CloneResult::Populated(head) => PullResult::FastForwarded(vec![*head]),
        };
        let env = pull_envelope(&pulled);
        Ok((Self { db, store, auth }, env))
    }

    /// `bundle(branch) -> bytes`: push `branch` to the synthetic bundle
    /// remote, capture what it would have sent, and discard the remote.
    /// `None` means `branch` has no commits — the §6 HTTP handler reports
    /// that as 204, empty.
    pub fn bundle(&self, branch: &str) -> Result<Option<bytes::Bytes>, SyncError<S::Error>> {
        if self.db.local.branch_head_commit(branch).is_none() {
            return Ok(None);
        }

        self.db
            .add_remote(BUNDLE_REMOTE, BUNDLE_REMOTE, RemoteType::Remote)
            .map_err(SyncError::metadata)?;
        self.db
            .update_repository_head(BUNDLE_REMOTE, kiln_layer_store::LayerId::of(b""))
            .map_err(SyncError::metadata)?;

        let transport = InMemoryPayloadTransport::empty();
        let push_result = kiln_sync::push(&self.auth, &self.db, &self.store, branch, BUNDLE_REMOTE, &transport);

        let outcome = push_result.and_then(|_| {
            let payload = transport
                .take_captured()
                .ok_or(SyncError::Internal("bundle push produced no payload".into()))?;
            let head = self.db.local.branch_head_commit(branch);
            let commits = match head {
                Some(head) => {
                    kiln_history::ancestors_oldest_first(&*self.db.local, head).expect("RepoMetadata::parents is infallible")
                },
                None => Vec::new(),
            }
            .into_iter()
            .filter_map(|id| self.db.local.get_commit(id))
            .collect::<Vec<_>>();
            Ok(Some(bundle::encode(&payload, &commits)))
        });

        let _ = self.db.remove_remote(BUNDLE_REMOTE);
        outcome
    }

    /// `unbundle(bytes, branch) -> envelope`: pull `branch` from a synthetic
    /// remote seeded with the bundle's payload and commits.
    pub fn unbundle(&self, bundle_bytes: bytes::Bytes, branch: &str) -> Result<Envelope, SyncError<S::Error>> {
        let (payload, commits) =
            bundle::decode(bundle_bytes).map_err(|e| SyncError::RemotePackUnexpectedFailure(e.to_string()))?;

        self.db
            .add_remote(BUNDLE_REMOTE, BUNDLE_REMOTE, RemoteType::Remote)
            .map_err(SyncError::metadata)?;

        let transport = InMemoryPayloadTransport::with_payload_and_commits(payload, commits);
        let result = kiln_sync::pull(&self.auth, &self.db, &self.store, branch, BUNDLE_REMOTE, branch, &transport);

        let _ = self.db.remove_remote(BUNDLE_REMOTE);
        result.map(|r| pull_envelope(&r))
    }
}

pub(crate) fn pull_envelope(result: &PullResult) -> Envelope {
    match result {
        PullResult::Unchanged => Envelope::success("already up to date")
            .with("pull_status", "unchanged")
            .with("applied_commits", Vec::<String>::new()),
        PullResult::Ahead => Envelope::success("local branch is ahead of the remote")
            .with("pull_status", "ahead")
            .with("applied_commits", Vec::<String>::new()),
        PullResult::FastForwarded(applied) => Envelope::success("fast-forwarded")
            .with("pull_status", "fast_forward")
            .with(
                "applied_commits",
                applied.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
            ),
        PullResult::DivergentHistory(common) => Envelope::failure("local and remote have diverged", "remote_diverged")
            .with("pull_status", "diverged")
            .with("common_ancestor", common.to_string()),
        PullResult::NoCommonHistory => {
            Envelope::failure("no common history between local and remote", "no_common_history")
                .with("pull_status", "no_common")
        },
    }
}

/// Turn any `kiln_sync::Error` into its `(status, envelope)` pair, for the
/// HTTP and CLI boundaries that don't want to match on `kiln_sync::Error`
/// themselves.
pub fn error_envelope<E: std::error::Error + Send + Sync + 'static>(err: &SyncError<E>) -> (u16, Envelope) {
    error::envelope(err)
}
