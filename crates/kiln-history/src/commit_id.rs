use std::{fmt, str::FromStr};

use kiln_layer_store::LayerId;

/// Identifies an immutable [`crate::CommitGraph`] node.
///
/// Structurally identical to [`LayerId`] (a 20-byte content hash, 40 hex
/// chars) but kept as a distinct type: a commit id addresses a node in the
/// version DAG, not a layer's bytes, and the two must never be interchanged
/// by accident.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CommitId(LayerId);

impl CommitId {
    pub fn of(bytes: &[u8]) -> Self {
        Self(LayerId::of(bytes))
    }

    pub fn from_layer_id(id: LayerId) -> Self {
        Self(id)
    }
}

impl fmt::Debug for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommitId({})", self.0)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for CommitId {
    type Err = kiln_layer_store::ParseLayerIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}
