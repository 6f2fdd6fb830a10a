//! An in-memory [`LayerStore`], suitable for tests and for
//! [`crate::fs::FsStore`]-less embeddings (e.g. the bundle/unbundle code
//! path, which never touches disk).

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::{Layer, LayerId, LayerStore, PutOutcome};

#[derive(Debug, Default)]
pub struct MemStore {
    layers: RwLock<HashMap<LayerId, (Option<LayerId>, Bytes)>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LayerStore for MemStore {
    type Error = std::convert::Infallible;

    fn put_layer(
        &self,
        id: LayerId,
        parent: Option<LayerId>,
        bytes: Bytes,
    ) -> Result<PutOutcome, Self::Error> {
        let mut layers = self.layers.write();
        match layers.get(&id) {
            Some((existing_parent, _)) if *existing_parent == parent => {
                Ok(PutOutcome::AlreadyPresent)
            },
            Some(_) => Ok(PutOutcome::Mismatch(id)),
            None => {
                layers.insert(id, (parent, bytes));
                Ok(PutOutcome::Inserted)
            },
        }
    }

    fn get_layer(&self, id: &LayerId) -> Result<Option<Layer>, Self::Error> {
        Ok(self.layers.read().get(id).map(|(parent, bytes)| Layer {
            id: *id,
            parent: *parent,
            bytes: bytes.clone(),
        }))
    }

    fn exists(&self, id: &LayerId) -> bool {
        self.layers.read().contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_is_idempotent() {
        let store = MemStore::new();
        let bytes = Bytes::from_static(b"delta");
        let id = LayerId::of(&bytes);

        assert_eq!(
            store.put_layer(id, None, bytes.clone()).unwrap(),
            PutOutcome::Inserted
        );
        assert_eq!(
            store.put_layer(id, None, bytes).unwrap(),
            PutOutcome::AlreadyPresent
        );
    }

    #[test]
    fn detects_parent_mismatch() {
        let store = MemStore::new();
        let bytes = Bytes::from_static(b"delta");
        let id = LayerId::of(&bytes);
        let some_parent = LayerId::of(b"parent");

        store.put_layer(id, None, bytes.clone()).unwrap();
        assert_eq!(
            store.put_layer(id, Some(some_parent), bytes).unwrap(),
            PutOutcome::Mismatch(id)
        );
    }

    #[test]
    fn parent_of_absent_layer_is_none() {
        let store = MemStore::new();
        assert_eq!(store.parent_of(&LayerId::of(b"nope")).unwrap(), None);
    }
}
