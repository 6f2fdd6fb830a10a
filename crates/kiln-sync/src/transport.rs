//! The `Transport` capability: how a pack gets to or from a remote.
//!
//! Three recognized implementors, per the design notes this crate is
//! grounded on: an HTTP transport for real remotes, a local-store transport
//! for same-process or filesystem-path remotes, and an in-memory transport
//! used to implement bundle/unbundle as push/pull against a virtual remote.

use kiln_layer_store::LayerId;
use kiln_pack::Payload;
use parking_lot::Mutex;
use thiserror::Error;

/// What a pack request returned.
#[derive(Clone, Debug)]
pub enum PackResponse {
    /// The remote has nothing newer than the baseline offered.
    None,
    Some(Payload),
}

/// Capability to exchange pack payloads with a remote.
///
/// `request_pack` is used by [`crate::fetch`]; `send_pack` by
/// [`crate::push`]. An implementation may refuse one direction (e.g. a
/// read-only mirror) by always erroring from it.
pub trait Transport {
    type Error: std::error::Error + Send + Sync + 'static;

    fn request_pack(&self, url: &str, baseline: Option<LayerId>) -> Result<PackResponse, Self::Error>;

    /// Send `payload` to `url`. Returns `Err` carrying the response body on
    /// a non-2xx reply.
    fn send_pack(&self, url: &str, payload: Payload) -> Result<(), Self::Error>;

    /// The remote's commit/branch metadata for `branch`, oldest-first.
    ///
    /// Layers travel as opaque bytes in `request_pack`'s payload; the commit
    /// DAG that references them lives in the `_meta` graph, which this crate
    /// never parses out of layer content (that's the schema/query engine's
    /// job, out of scope here). Transports that already share process state
    /// with the remote (same-store, in-memory) can answer this directly;
    /// others default to reporting nothing, which simply leaves remote
    /// tracking metadata stale until something else populates it.
    fn remote_commits(&self, _url: &str, _branch: &str) -> Result<Vec<kiln_metadata::Commit>, Self::Error> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("remote rejected the pack: {status}")]
    Rejected { status: u16, body: String },
}

/// A [`Transport`] speaking the `/api/pack` and `/api/unpack` HTTP contract
/// against a real remote, authenticated with a bearer token.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    bearer_token: String,
    protocol_version: String,
}

impl HttpTransport {
    pub fn new(bearer_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            bearer_token: bearer_token.into(),
            protocol_version: "1".to_owned(),
        }
    }

    fn pack_url(base: &str) -> String {
        format!("{}/api/pack", base.trim_end_matches('/'))
    }

    fn unpack_url(base: &str) -> String {
        format!("{}/api/unpack", base.trim_end_matches('/'))
    }
}

impl Transport for HttpTransport {
    type Error = HttpError;

    fn request_pack(&self, url: &str, baseline: Option<LayerId>) -> Result<PackResponse, Self::Error> {
        let body = serde_json::json!({ "repository_head": baseline.map(|id| id.to_string()) });

        let response = self
            .client
            .post(Self::pack_url(url))
            .bearer_auth(&self.bearer_token)
            .header("TerminusDB-Version", &self.protocol_version)
            .json(&body)
            .send()
            .map_err(|source| HttpError::Request {
                url: url.to_owned(),
                source,
            })?;

        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(PackResponse::None);
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(HttpError::Rejected { status, body });
        }

        let bytes = response.bytes().map_err(|source| HttpError::Request {
            url: url.to_owned(),
            source,
        })?;
        Ok(PackResponse::Some(Payload::from(bytes)))
    }

    fn send_pack(&self, url: &str, payload: Payload) -> Result<(), Self::Error> {
        let response = self
            .client
            .post(Self::unpack_url(url))
            .bearer_auth(&self.bearer_token)
            .header("TerminusDB-Version", &self.protocol_version)
            .header("content-type", "application/octets")
            .body(payload.into_bytes())
            .send()
            .map_err(|source| HttpError::Request {
                url: url.to_owned(),
                source,
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(HttpError::Rejected { status, body });
        }
        Ok(())
    }
}

/// A [`Transport`] over a [`kiln_layer_store::LayerStore`] reachable from
/// this process — a `terminusdb://` path remote, or tests.
pub struct LocalStoreTransport<'a, S> {
    pub store: &'a S,
    pub db: &'a kiln_metadata::Database,
    pub branch: &'a str,
}

#[derive(Debug, Error)]
pub enum LocalStoreError<E> {
    #[error(transparent)]
    Store(#[from] E),
}

impl<'a, S: kiln_layer_store::LayerStore> Transport for LocalStoreTransport<'a, S> {
    type Error = LocalStoreError<S::Error>;

    fn request_pack(&self, _url: &str, baseline: Option<LayerId>) -> Result<PackResponse, Self::Error> {
        let head = match self.db.local.branch_head_commit(self.branch) {
            Some(head) => head,
            None => return Ok(PackResponse::None),
        };
        let head_layer = match crate::pack::commit_head_layer(&self.db.local, head) {
            Some(l) => l,
            None => return Ok(PackResponse::None),
        };

        match crate::pack::pack_from_store(self.store, head_layer, baseline) {
            Ok(Some(payload)) => Ok(PackResponse::Some(payload)),
            Ok(None) => Ok(PackResponse::None),
            Err(crate::error::Error::Store(e)) => Err(e.into()),
            Err(_) => unreachable!("pack_from_store over a LayerStore only ever returns Error::Store"),
        }
    }

    fn send_pack(&self, _url: &str, payload: Payload) -> Result<(), Self::Error> {
        let (_head, pack) = payload
            .repository_head_and_pack()
            .expect("payload was constructed by build_pack/Payload::new");
        for entry in kiln_pack::pack_iter(pack).expect("well-formed pack") {
            let entry = entry.expect("well-formed pack entry");
            self.store.put_layer(entry.id, entry.parent, entry.bytes)?;
        }
        Ok(())
    }

    fn remote_commits(&self, _url: &str, branch: &str) -> Result<Vec<kiln_metadata::Commit>, Self::Error> {
        let head = match self.db.local.branch_head_commit(branch) {
            Some(head) => head,
            None => return Ok(Vec::new()),
        };
        let ids = kiln_history::ancestors_oldest_first(&*self.db.local, head)
            .expect("RepoMetadata::parents is infallible");
        Ok(ids
            .into_iter()
            .filter_map(|id| self.db.local.get_commit(id))
            .collect())
    }
}

/// A [`Transport`] that hands back a single, pre-supplied payload once and
/// captures whatever is sent to it. Used to implement `bundle`/`unbundle` as
/// push/pull against a virtual `terminusdb:///bundle` remote.
#[derive(Default)]
pub struct InMemoryPayloadTransport {
    incoming: Mutex<Option<Payload>>,
    incoming_commits: Mutex<Vec<kiln_metadata::Commit>>,
    captured: Mutex<Option<Payload>>,
}

impl InMemoryPayloadTransport {
    pub fn with_payload(payload: Payload) -> Self {
        Self {
            incoming: Mutex::new(Some(payload)),
            incoming_commits: Mutex::new(Vec::new()),
            captured: Mutex::new(None),
        }
    }

    /// Like [`Self::with_payload`], also carrying the commit metadata that
    /// a bundle file packages alongside its layer pack.
    pub fn with_payload_and_commits(payload: Payload, commits: Vec<kiln_metadata::Commit>) -> Self {
        Self {
            incoming: Mutex::new(Some(payload)),
            incoming_commits: Mutex::new(commits),
            captured: Mutex::new(None),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn take_captured(&self) -> Option<Payload> {
        self.captured.lock().take()
    }
}

impl Transport for InMemoryPayloadTransport {
    type Error = std::convert::Infallible;

    fn request_pack(&self, _url: &str, _baseline: Option<LayerId>) -> Result<PackResponse, Self::Error> {
        Ok(match self.incoming.lock().take() {
            Some(payload) => PackResponse::Some(payload),
            None => PackResponse::None,
        })
    }

    fn send_pack(&self, _url: &str, payload: Payload) -> Result<(), Self::Error> {
        *self.captured.lock() = Some(payload);
        Ok(())
    }

    fn remote_commits(&self, _url: &str, _branch: &str) -> Result<Vec<kiln_metadata::Commit>, Self::Error> {
        Ok(self.incoming_commits.lock().clone())
    }
}

