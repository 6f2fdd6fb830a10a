//! Layer-level ancestry: walking the parent chain of a repository's layers.

use kiln_layer_store::{Layer, LayerId, LayerStore};

/// Walk the parent chain starting at `current`, stopping as soon as
/// `baseline` is reached (exclusive) or the chain runs out of parents.
///
/// - `child_until_parents(store, l, Some(l))` is `[]`: a layer is never its
///   own ancestor-in-need-of-transfer.
/// - `child_until_parents(store, base, None)` is `[base]`: with no baseline,
///   the walk stops at the root and includes it.
/// - If `baseline` is given but never found while walking to the root, the
///   walk degrades gracefully to the full chain rather than failing: the
///   caller asked for "everything newer than X" and X turned out to not be
///   an ancestor at all, so "everything" is the honest answer.
pub fn child_until_parents<S: LayerStore>(
    store: &S,
    current: LayerId,
    baseline: Option<LayerId>,
) -> Result<Vec<Layer>, S::Error> {
    let mut out = Vec::new();
    let mut cursor = Some(current);

    while let Some(id) = cursor {
        if Some(id) == baseline {
            break;
        }
        match store.get_layer(&id)? {
            Some(layer) => {
                cursor = layer.parent;
                out.push(layer);
            },
            None => break,
        }
    }

    Ok(out)
}

/// The layer-ids of [`child_until_parents`], in the same order.
pub fn repository_layer_to_layerids<S: LayerStore>(
    store: &S,
    current: LayerId,
    baseline: Option<LayerId>,
) -> Result<Vec<LayerId>, S::Error> {
    Ok(child_until_parents(store, current, baseline)?
        .into_iter()
        .map(|l| l.id)
        .collect())
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use kiln_layer_store::mem::MemStore;

    use super::*;

    fn chain(store: &MemStore, n: usize) -> Vec<LayerId> {
        let mut parent = None;
        let mut ids = Vec::with_capacity(n);
        for i in 0..n {
            let bytes = Bytes::from(format!("layer-{}", i));
            let id = LayerId::of(&bytes);
            store.put_layer(id, parent, bytes).unwrap();
            ids.push(id);
            parent = Some(id);
        }
        ids
    }

    #[test]
    fn same_layer_as_baseline_is_empty() {
        let store = MemStore::new();
        let ids = chain(&store, 3);
        let head = *ids.last().unwrap();
        assert!(child_until_parents(&store, head, Some(head))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn no_baseline_includes_root() {
        let store = MemStore::new();
        let ids = chain(&store, 1);
        let got = repository_layer_to_layerids(&store, ids[0], None).unwrap();
        assert_eq!(got, vec![ids[0]]);
    }

    #[test]
    fn walks_down_to_baseline_exclusive() {
        let store = MemStore::new();
        let ids = chain(&store, 4);
        let got = repository_layer_to_layerids(&store, ids[3], Some(ids[1])).unwrap();
        assert_eq!(got, vec![ids[3], ids[2]]);
    }

    #[test]
    fn unknown_baseline_degrades_to_full_chain() {
        let store = MemStore::new();
        let ids = chain(&store, 3);
        let stray = LayerId::of(b"never committed");
        let got = repository_layer_to_layerids(&store, ids[2], Some(stray)).unwrap();
        assert_eq!(got, vec![ids[2], ids[1], ids[0]]);
    }
}
