//! Mapping `kiln_sync::Error` onto the error taxonomy table of spec §7: an
//! HTTP status, an `api:error_term`, and whether the kind is retryable. The
//! Orchestrator wraps errors into the envelope here and nowhere else —
//! `kiln-sync` itself never knows about HTTP or JSON.

use kiln_sync::Error as SyncError;

use crate::envelope::Envelope;

/// `(http_status, error_term)` for a `kiln_sync::Error`, by kind.
pub fn classify<S: std::error::Error + Send + Sync + 'static>(error: &SyncError<S>) -> (u16, &'static str) {
    match error {
        SyncError::Unauthorized => (401, "unauthorized"),
        SyncError::NotFound(_) => (404, "not_found"),
        SyncError::PushRequiresBranch => (400, "push_requires_branch"),
        SyncError::PushAttemptedOnNonRemote => (400, "push_attempted_on_non_remote"),
        SyncError::PushHasNoRepositoryHead => (400, "push_has_no_repository_head"),
        SyncError::RemoteNotEmptyOnLocalEmpty => (400, "remote_not_empty_on_local_empty"),
        SyncError::RemoteDiverged(_) => (409, "remote_diverged"),
        SyncError::NoCommonHistory => (409, "no_common_history"),
        SyncError::Network(_) => (502, "network_error"),
        SyncError::RemotePackFailedMissingParent(_) => (502, "remote_pack_failed"),
        SyncError::RemotePackFailedChecksumMismatch(_) => (502, "checksum_mismatch"),
        SyncError::RemotePackUnexpectedFailure(_) => (502, "remote_pack_unexpected_failure"),
        SyncError::RemoteUnpackFailed { .. } => (502, "remote_connection_failure"),
        SyncError::Store(_) => (500, "internal_error"),
        SyncError::Metadata(_) => (500, "internal_error"),
        SyncError::Internal(_) => (500, "internal_error"),
        _ => (500, "internal_error"),
    }
}

pub fn envelope<S: std::error::Error + Send + Sync + 'static>(error: &SyncError<S>) -> (u16, Envelope) {
    let (status, term) = classify(error);
    (status, Envelope::failure(error.to_string(), term))
}

/// The CLI's coarser three-way split of the same taxonomy: exit code 1
/// (user error), 2 (remote/protocol), or 3 (internal).
pub fn cli_exit_code<S: std::error::Error + Send + Sync + 'static>(error: &SyncError<S>) -> i32 {
    match error {
        SyncError::Unauthorized
        | SyncError::NotFound(_)
        | SyncError::PushRequiresBranch
        | SyncError::PushAttemptedOnNonRemote
        | SyncError::PushHasNoRepositoryHead
        | SyncError::RemoteNotEmptyOnLocalEmpty => 1,
        SyncError::RemoteDiverged(_)
        | SyncError::NoCommonHistory
        | SyncError::Network(_)
        | SyncError::RemotePackFailedMissingParent(_)
        | SyncError::RemotePackFailedChecksumMismatch(_)
        | SyncError::RemotePackUnexpectedFailure(_)
        | SyncError::RemoteUnpackFailed { .. } => 2,
        _ => 3,
    }
}
