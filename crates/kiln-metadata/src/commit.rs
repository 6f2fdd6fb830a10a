use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use kiln_history::CommitId;
use kiln_layer_store::LayerId;

/// Which named graph a commit's layer reference belongs to.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum GraphKind {
    Instance,
    Schema,
    Inference,
}

impl fmt::Display for GraphKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GraphKind::Instance => "instance",
            GraphKind::Schema => "schema",
            GraphKind::Inference => "inference",
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown graph kind '{0}'")]
pub struct UnknownGraphKind(String);

impl FromStr for GraphKind {
    type Err = UnknownGraphKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instance" => Ok(GraphKind::Instance),
            "schema" => Ok(GraphKind::Schema),
            "inference" => Ok(GraphKind::Inference),
            other => Err(UnknownGraphKind(other.to_owned())),
        }
    }
}

/// An immutable node in the version DAG.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Commit {
    pub id: CommitId,
    pub author: String,
    pub message: String,
    pub timestamp: i64,
    pub parents: Vec<CommitId>,
    pub layers: BTreeMap<GraphKind, LayerId>,
}

impl Commit {
    pub fn root(id: CommitId, author: impl Into<String>, message: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id,
            author: author.into(),
            message: message.into(),
            timestamp,
            parents: Vec::new(),
            layers: BTreeMap::new(),
        }
    }
}
