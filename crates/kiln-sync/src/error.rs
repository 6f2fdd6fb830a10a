use kiln_history::CommitId;
use kiln_layer_store::LayerId;
use thiserror::Error;

/// The error taxonomy of §7: every engine in this crate returns one of
/// these kinds, never a raw adapter error. `S` is the embedder's
/// [`kiln_layer_store::LayerStore`] error type; transport and metadata
/// failures are boxed, since callers only need to match on *kind*, not
/// downcast them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error<S: std::error::Error + Send + Sync + 'static> {
    #[error("unauthorized")]
    Unauthorized,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("push target must be a branch")]
    PushRequiresBranch,

    #[error("push attempted on a non-remote")]
    PushAttemptedOnNonRemote,

    #[error("remote has no recorded repository head; fetch first")]
    PushHasNoRepositoryHead,

    #[error("remote branch is non-empty but local branch is empty")]
    RemoteNotEmptyOnLocalEmpty,

    #[error("remote has diverged, {} commit(s) would be lost", .0.len())]
    RemoteDiverged(Vec<CommitId>),

    #[error("no common history between local and remote")]
    NoCommonHistory,

    #[error("network error")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("remote rejected the pack: missing parent {0}")]
    RemotePackFailedMissingParent(LayerId),

    #[error("remote rejected the pack: checksum mismatch for {0}")]
    RemotePackFailedChecksumMismatch(LayerId),

    #[error("remote pack failed unexpectedly: {0}")]
    RemotePackUnexpectedFailure(String),

    #[error("remote rejected unpack, status {status}")]
    RemoteUnpackFailed { status: u16, body: String },

    #[error("layer store error")]
    Store(#[source] S),

    #[error("metadata error")]
    Metadata(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("internal error: {0}")]
    Internal(String),
}

impl<S: std::error::Error + Send + Sync + 'static> Error<S> {
    /// Whether `CloneEngine` should compensate with `force_delete_db` on
    /// this error. Per §4.9, exactly two kinds qualify; everything else
    /// propagates without cleanup because it happens before the database
    /// becomes observable.
    pub fn triggers_clone_compensation(&self) -> bool {
        matches!(
            self,
            Error::RemotePackFailedMissingParent(_)
                | Error::RemotePackFailedChecksumMismatch(_)
                | Error::RemotePackUnexpectedFailure(_)
        )
    }

    pub fn metadata(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Metadata(Box::new(source))
    }

    pub fn network(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Network(Box::new(source))
    }
}
