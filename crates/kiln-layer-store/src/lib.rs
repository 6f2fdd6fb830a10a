//! Content-addressed storage for repository layers.
//!
//! A [`Layer`] is an immutable blob keyed by the hash of its contents. The
//! [`LayerStore`] trait is the capability an embedder must provide; this
//! crate ships an in-memory reference implementation ([`mem::MemStore`]) and
//! a filesystem-backed one ([`fs::FsStore`]).

mod id;
pub use id::{LayerId, ParseLayerIdError};

pub mod fs;
pub mod mem;

use bytes::Bytes;

pub use fs::FsStore;
pub use mem::MemStore;

/// A single content-addressed layer: its id, optional parent, and payload.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Layer {
    pub id: LayerId,
    pub parent: Option<LayerId>,
    pub bytes: Bytes,
}

impl Layer {
    /// Construct a [`Layer`], computing its id from `bytes`.
    pub fn new(parent: Option<LayerId>, bytes: Bytes) -> Self {
        Self {
            id: LayerId::of(&bytes),
            parent,
            bytes,
        }
    }
}

/// Outcome of [`LayerStore::put_layer`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PutOutcome {
    /// The layer was not previously present and has been stored.
    Inserted,
    /// An identical layer (same id, same parent) was already present.
    AlreadyPresent,
    /// A layer with this id is already present, but its parent differs from
    /// the one given. Since `id` is a content hash this can only happen if
    /// the caller is lying about the parent; the store keeps the original.
    Mismatch(LayerId),
}

/// Capability to store and retrieve content-addressed layers.
///
/// Implementations MUST make `put_layer` idempotent: calling it twice with
/// the same `(id, parent, bytes)` has the same observable effect as calling
/// it once.
pub trait LayerStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn put_layer(
        &self,
        id: LayerId,
        parent: Option<LayerId>,
        bytes: Bytes,
    ) -> Result<PutOutcome, Self::Error>;

    fn get_layer(&self, id: &LayerId) -> Result<Option<Layer>, Self::Error>;

    fn parent_of(&self, id: &LayerId) -> Result<Option<LayerId>, Self::Error> {
        Ok(self.get_layer(id)?.and_then(|l| l.parent))
    }

    fn exists(&self, id: &LayerId) -> bool;
}
