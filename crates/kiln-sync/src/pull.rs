use kiln_history::CommitId;
use kiln_layer_store::LayerStore;
use kiln_metadata::Database;

use crate::{auth::AuthContext, error::Error, fetch::fetch, transport::Transport};

/// Outcome of [`pull`], per the classification table of §4.8.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PullResult {
    /// Nothing new on either side.
    Unchanged,
    /// Local branch fast-forwarded to the remote; the applied commits,
    /// oldest first.
    FastForwarded(Vec<CommitId>),
    /// Local branch already contains everything reachable from the remote.
    Ahead,
    /// Both sides have commits the other lacks.
    DivergentHistory(CommitId),
    /// The two branches share no ancestor at all.
    NoCommonHistory,
}

/// `pull(auth, local_branch, remote_branch, fetch_fn) -> PullResult`, per
/// §4.8: fetch, then fast-forward the local branch if that is possible
/// without losing local-only commits.
#[tracing::instrument(skip(auth, db, store, transport))]
pub fn pull<S, T, A>(
    auth: &A,
    db: &Database,
    store: &S,
    local_branch: &str,
    remote_name: &str,
    remote_branch: &str,
    transport: &T,
) -> Result<PullResult, Error<S::Error>>
where
    S: LayerStore,
    T: Transport,
    A: AuthContext,
{
    if !auth.can_pull(local_branch) {
        return Err(Error::Unauthorized);
    }

    fetch(auth, db, store, remote_name, transport)?;

    let remote_url = db.remote_url(remote_name).map_err(Error::metadata)?;
    let remote_tracking = db.remote_tracking(remote_name).map_err(Error::metadata)?;
    let fetched_commits = transport
        .remote_commits(&remote_url, remote_branch)
        .map_err(Error::network)?;
    let fetched_head = fetched_commits.last().map(|c| c.id);
    for commit in fetched_commits {
        remote_tracking.put_commit(commit).map_err(Error::metadata)?;
    }
    if let Some(head) = fetched_head {
        remote_tracking.reset_branch_head(remote_branch, head);
    }

    let local_head = db.local.branch_head_commit(local_branch);
    let remote_head = remote_tracking.branch_head_commit(remote_branch);

    match (local_head, remote_head) {
        (None, None) => Ok(PullResult::Unchanged),
        (None, Some(remote_head)) => {
            let applied = kiln_history::ancestors_oldest_first(&*remote_tracking, remote_head)
                .expect("RepoMetadata::parents is infallible");
            kiln_metadata::copy_commits(&remote_tracking, &db.local, remote_head).map_err(Error::metadata)?;
            db.local.reset_branch_head(local_branch, remote_head);
            tracing::info!(remote = remote_name, %local_branch, commits = applied.len(), "pull fast-forwarded from empty");
            Ok(PullResult::FastForwarded(applied))
        },
        (Some(_), None) => Ok(PullResult::Unchanged),
        (Some(local_head), Some(remote_head)) => {
            if local_head == remote_head {
                return Ok(PullResult::Unchanged);
            }

            let mrca = kiln_history::most_recent_common_ancestor(&*db.local, local_head, &*remote_tracking, remote_head)
                .expect("RepoMetadata::parents is infallible");

            let common = match mrca.common {
                None => return Ok(PullResult::NoCommonHistory),
                Some(common) => common,
            };

            if mrca.path_b.is_empty() {
                return Ok(PullResult::Ahead);
            }
            if !mrca.path_a.is_empty() {
                return Ok(PullResult::DivergentHistory(common));
            }

            let mut applied = mrca.path_b;
            applied.reverse();

            kiln_metadata::copy_commits(&remote_tracking, &db.local, remote_head).map_err(Error::metadata)?;
            db.local.reset_branch_head(local_branch, remote_head);
            tracing::info!(remote = remote_name, %local_branch, commits = applied.len(), "pull fast-forwarded");
            Ok(PullResult::FastForwarded(applied))
        },
    }
}
