//! The on-disk bundle file produced by `bundle`/consumed by `unbundle`.
//!
//! §4.10 treats bundle/unbundle as push/pull against a virtual remote, which
//! is exactly how [`crate::orchestrator::Orchestrator`] implements them
//! in-process. But the CLI's `bundle`/`unbundle` commands cross a process
//! boundary (the file travels by USB stick, email, whatever), so the bundle
//! has to carry what `InMemoryPayloadTransport` would otherwise hold in
//! memory: the pack payload *and* the commit metadata that names it. The
//! wire pack format itself (`kiln_pack::Payload`) stays byte-exact and
//! untouched; this is a thin JSON envelope around it.

use std::collections::BTreeMap;
use std::str::FromStr;

use kiln_history::CommitId;
use kiln_layer_store::LayerId;
use kiln_metadata::{Commit, GraphKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed bundle: {0}")]
    Malformed(String),
}

#[derive(Serialize, Deserialize)]
struct WireCommit {
    id: String,
    author: String,
    message: String,
    timestamp: i64,
    parents: Vec<String>,
    layers: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize)]
struct WireBundle {
    payload: String,
    commits: Vec<WireCommit>,
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn from_hex(s: &str) -> Result<Vec<u8>, Error> {
    if s.len() % 2 != 0 {
        return Err(Error::Malformed("odd-length hex payload".into()));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|e| Error::Malformed(e.to_string())))
        .collect()
}

/// Serialize a pack payload plus the commits that reference its layers into
/// one self-contained bundle file.
pub fn encode(payload: &kiln_pack::Payload, commits: &[Commit]) -> bytes::Bytes {
    let wire_commits = commits
        .iter()
        .map(|c| WireCommit {
            id: c.id.to_string(),
            author: c.author.clone(),
            message: c.message.clone(),
            timestamp: c.timestamp,
            parents: c.parents.iter().map(|p| p.to_string()).collect(),
            layers: c
                .layers
                .iter()
                .map(|(kind, id)| (kind.to_string(), id.to_string()))
                .collect(),
        })
        .collect();

    let wire = WireBundle {
        payload: to_hex(payload.as_bytes()),
        commits: wire_commits,
    };
    bytes::Bytes::from(serde_json::to_vec(&wire).expect("WireBundle serialization cannot fail"))
}

/// The inverse of [`encode`].
pub fn decode(bundle: bytes::Bytes) -> Result<(kiln_pack::Payload, Vec<Commit>), Error> {
    let wire: WireBundle = serde_json::from_slice(&bundle).map_err(|e| Error::Malformed(e.to_string()))?;
    let payload = kiln_pack::Payload::from(bytes::Bytes::from(from_hex(&wire.payload)?));

    let commits = wire
        .commits
        .into_iter()
        .map(|wc| {
            let id = CommitId::from_str(&wc.id).map_err(|e| Error::Malformed(e.to_string()))?;
            let parents = wc
                .parents
                .iter()
                .map(|p| CommitId::from_str(p).map_err(|e| Error::Malformed(e.to_string())))
                .collect::<Result<Vec<_>, _>>()?;
            let layers = wc
                .layers
                .iter()
                .map(|(kind, id)| {
                    let kind = GraphKind::from_str(kind).map_err(|e| Error::Malformed(e.to_string()))?;
                    let id = LayerId::from_str(id).map_err(|e| Error::Malformed(e.to_string()))?;
                    Ok((kind, id))
                })
                .collect::<Result<BTreeMap<_, _>, Error>>()?;
            Ok(Commit {
                id,
                author: wc.author,
                message: wc.message,
                timestamp: wc.timestamp,
                parents,
                layers,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok((payload, commits))
}
