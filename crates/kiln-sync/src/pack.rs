//! Building a pack payload from a layer store, for transmission.

use kiln_layer_store::{LayerId, LayerStore};
use kiln_pack::{Payload, PackEntry};

use crate::error::Error;

/// The layer-id a commit is addressed by for sync purposes: its instance
/// graph's layer. Schema and inference layers travel as part of the same
/// pack but are not themselves ancestry anchors.
pub fn commit_head_layer(repo: &kiln_metadata::RepoMetadata, commit: kiln_history::CommitId) -> Option<LayerId> {
    repo.get_commit(commit)?
        .layers
        .get(&kiln_metadata::GraphKind::Instance)
        .copied()
}

/// `pack(repo, baseline) -> payload`, per §4.2/§4.3: `None` if `head` equals
/// `baseline` (nothing to send), else a payload containing exactly the
/// layers from `head` down to but excluding `baseline`, oldest first so a
/// receiver can admit parents before children.
pub fn pack_from_store<S: LayerStore>(
    store: &S,
    head: LayerId,
    baseline: Option<LayerId>,
) -> Result<Option<Payload>, Error<S::Error>> {
    if Some(head) == baseline {
        return Ok(None);
    }

    let mut layers = kiln_history::child_until_parents(store, head, baseline).map_err(Error::Store)?;
    if layers.is_empty() {
        return Ok(None);
    }
    layers.reverse();

    let entries: Vec<PackEntry> = layers
        .into_iter()
        .map(|l| PackEntry {
            id: l.id,
            parent: l.parent,
            bytes: l.bytes,
        })
        .collect();
    Ok(Some(Payload::new(head, kiln_pack::build_pack(entries))))
}
