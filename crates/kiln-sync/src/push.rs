use kiln_layer_store::{LayerId, LayerStore};
use kiln_metadata::{Database, RemoteType};

use crate::{
    auth::AuthContext,
    error::Error,
    pack::{commit_head_layer, pack_from_store},
    transport::Transport,
};

/// Outcome of [`push`]: the remote's branch either already matched
/// (`Same`) or was advanced (`New`), each carrying the resulting layer-id.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PushResult {
    Same(Option<LayerId>),
    New(LayerId),
}

/// `push(auth, branch_path, remote_name, push_fn) -> PushResult`, per §4.7.
#[tracing::instrument(skip(auth, db, store, transport))]
pub fn push<S, T, A>(
    auth: &A,
    db: &Database,
    store: &S,
    branch: &str,
    remote_name: &str,
    transport: &T,
) -> Result<PushResult, Error<S::Error>>
where
    S: LayerStore,
    T: Transport,
    A: AuthContext,
{
    if branch.is_empty() {
        return Err(Error::PushRequiresBranch);
    }
    if db.remote_type(remote_name).map_err(Error::metadata)? != RemoteType::Remote {
        return Err(Error::PushAttemptedOnNonRemote);
    }
    if !auth.can_push(branch) {
        return Err(Error::Unauthorized);
    }
    let previous_remote_head = db
        .repository_head(remote_name)
        .map_err(Error::metadata)?
        .ok_or(Error::PushHasNoRepositoryHead)?;

    let remote_tracking = db.remote_tracking(remote_name).map_err(Error::metadata)?;
    let local_head_commit = db.local.branch_head_commit(branch);
    let remote_head_commit = remote_tracking.branch_head_commit(branch);

    let local_head_commit = match (local_head_commit, remote_head_commit) {
        (None, None) => {
            remote_tracking.ensure_branch(branch);
            return Ok(PushResult::Same(Some(previous_remote_head)));
        },
        (None, Some(_)) => return Err(Error::RemoteNotEmptyOnLocalEmpty),
        (Some(head), None) => head,
        (Some(local_head), Some(remote_head)) => {
            let mrca = kiln_history::most_recent_common_ancestor(
                &*db.local,
                local_head,
                &*remote_tracking,
                remote_head,
            )
            .expect("RepoMetadata::parents is infallible");

            if mrca.common.is_none() {
                return Err(Error::NoCommonHistory);
            }
            if !mrca.path_b.is_empty() {
                return Err(Error::RemoteDiverged(mrca.path_b));
            }
            local_head
        },
    };

    kiln_metadata::copy_commits(&db.local, &remote_tracking, local_head_commit)
        .map_err(Error::metadata)?;
    remote_tracking.reset_branch_head(branch, local_head_commit);

    let new_layer = commit_head_layer(&remote_tracking, local_head_commit)
        .ok_or_else(|| Error::Internal("pushed commit has no instance layer".into()))?;

    let payload = pack_from_store(store, new_layer, Some(previous_remote_head))?;

    let payload = match payload {
        None => {
            db.update_repository_head(remote_name, previous_remote_head)
                .map_err(Error::metadata)?;
            return Ok(PushResult::Same(Some(previous_remote_head)));
        },
        Some(payload) => payload,
    };

    let remote_url = db.remote_url(remote_name).map_err(Error::metadata)?;
    transport
        .send_pack(&remote_url, payload)
        .map_err(Error::network)?;

    db.update_repository_head(remote_name, new_layer)
        .map_err(Error::metadata)?;

    tracing::info!(remote = remote_name, %branch, %new_layer, "push advanced remote head");
    Ok(PushResult::New(new_layer))
}
