//! The HTTP surface of spec §6: one `axum` router implementing the endpoint
//! table exactly, bearer-authenticated, negotiating on `TerminusDB-Version`.
//!
//! Grounded on the `forgepoint` git-smart-HTTP handler's shape (extract path
//! params, stream/return an `application/octets` body, wrap everything else
//! in JSON) rather than its git-protocol content, which has nothing to do
//! with this wire format.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use kiln_layer_store::mem::MemStore;
use kiln_sync::HttpTransport;
use parking_lot::RwLock;
use serde::Deserialize;

use crate::{
    auth::StaticAuthContext,
    envelope::Envelope,
    orchestrator::{error_envelope, pull_envelope, Orchestrator},
};

type Repo = Orchestrator<MemStore, StaticAuthContext>;

/// One process's set of known `{org}/{db}` repositories. A real deployment
/// would back this with TerminusDB's own database registry; this in-memory
/// map is what lets the router run standalone for local testing.
#[derive(Default)]
pub struct Registry {
    repos: RwLock<HashMap<String, Arc<Repo>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_or_create(&self, org: &str, db: &str) -> Arc<Repo> {
        let key = format!("{org}/{db}");
        if let Some(repo) = self.repos.read().get(&key) {
            return repo.clone();
        }
        let repo = Arc::new(Orchestrator::new(MemStore::new(), StaticAuthContext::all()));
        self.repos.write().entry(key).or_insert(repo).clone()
    }

    fn insert(&self, org: &str, db: &str, repo: Repo) {
        self.repos.write().insert(format!("{org}/{db}"), Arc::new(repo));
    }
}

pub fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/api/pack/:org/:db", post(pack))
        .route("/api/unpack/:org/:db", post(unpack))
        .route("/api/fetch/:org/:db", post(fetch))
        .route("/api/push/:org/:db", post(push))
        .route("/api/pull/:org/:db/local/branch/:branch", post(pull))
        .route("/api/clone/:org/:db", post(clone_db))
        .route("/api/bundle/:org/:db", post(bundle))
        .route("/api/unbundle/:org/:db", post(unbundle))
        .route("/api/files", post(files))
        .with_state(registry)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Any non-empty bearer token grants every capability; a missing header
/// grants none. Turning the token into fine-grained, per-database
/// capabilities is an adapter concern out of scope per spec §1 — see
/// [`crate::auth::StaticAuthContext`].
fn auth_from_headers(headers: &HeaderMap) -> StaticAuthContext {
    match bearer_token(headers) {
        Some(token) if !token.is_empty() => StaticAuthContext::all(),
        _ => StaticAuthContext::none(),
    }
}

fn envelope_response(status: StatusCode, envelope: Envelope) -> Response {
    (status, Json(envelope)).into_response()
}

fn octet_response(status: StatusCode, body: bytes::Bytes) -> Response {
    Response::builder()
        .status(status)
        .header("content-type", "application/octets")
        .body(Body::from(body))
        .expect("static header is always valid")
        .into_response()
}

fn error_response<E: std::error::Error + Send + Sync + 'static>(err: kiln_sync::Error<E>) -> Response {
    let (status, envelope) = error_envelope(&err);
    envelope_response(StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), envelope)
}

#[derive(Deserialize)]
struct PackRequest {
    repository_head: Option<String>,
}

async fn pack(
    State(registry): State<Arc<Registry>>,
    Path((org, db)): Path<(String, String)>,
    _headers: HeaderMap,
    Json(body): Json<PackRequest>,
) -> Response {
    let repo = registry.get_or_create(&org, &db);
    let baseline = match body.repository_head.map(|s| s.parse::<kiln_layer_store::LayerId>()) {
        Some(Ok(id)) => Some(id),
        Some(Err(_)) => return envelope_response(StatusCode::BAD_REQUEST, Envelope::failure("bad layer id", "not_found")),
        None => None,
    };
    let head = match repo.db.local.branch_head_commit("main") {
        Some(head) => head,
        None => return StatusCode::NO_CONTENT.into_response(),
    };
    let layer = match kiln_sync::pack::commit_head_layer(&repo.db.local, head) {
        Some(layer) => layer,
        None => return StatusCode::NO_CONTENT.into_response(),
    };
    match kiln_sync::pack::pack_from_store(&repo.store, layer, baseline) {
        Ok(Some(payload)) => octet_response(StatusCode::OK, payload.into_bytes()),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

async fn unpack(
    State(registry): State<Arc<Registry>>,
    Path((org, db)): Path<(String, String)>,
    _headers: HeaderMap,
    body: Bytes,
) -> Response {
    let repo = registry.get_or_create(&org, &db);
    match kiln_sync::fetch::unpack(&repo.store, body.into()) {
        Ok(()) => envelope_response(StatusCode::OK, Envelope::success("unpacked")),
        Err(err) => error_response(err),
    }
}

#[derive(Deserialize)]
struct FetchRequest {
    remote_url: String,
}

async fn fetch(
    State(registry): State<Arc<Registry>>,
    Path((org, db)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<FetchRequest>,
) -> Response {
    let repo = registry.get_or_create(&org, &db);
    let auth = auth_from_headers(&headers);
    let transport = HttpTransport::new(bearer_token(&headers).unwrap_or_default());

    if !repo.db.has_remote("origin") {
        let _ = repo.db.add_remote("origin", &body.remote_url, kiln_metadata::RemoteType::Remote);
    }

    match kiln_sync::fetch(&auth, &repo.db, &repo.store, "origin", &transport) {
        Ok((head, advanced)) => envelope_response(
            StatusCode::OK,
            Envelope::success("fetch complete")
                .with("head_has_updated", advanced)
                .with("repository_head", head.map(|h| h.to_string())),
        ),
        Err(err) => error_response(err),
    }
}

#[derive(Deserialize)]
struct PushRequest {
    remote_name: String,
    branch: String,
}

async fn push(
    State(registry): State<Arc<Registry>>,
    Path((org, db)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<PushRequest>,
) -> Response {
    let repo = registry.get_or_create(&org, &db);
    let auth = auth_from_headers(&headers);
    let transport = HttpTransport::new(bearer_token(&headers).unwrap_or_default());
    match kiln_sync::push(&auth, &repo.db, &repo.store, &body.branch, &body.remote_name, &transport) {
        Ok(result) => {
            let env = match result {
                kiln_sync::PushResult::Same(head) => Envelope::success("remote already up to date")
                    .with("same", true)
                    .with("new", false)
                    .with("repository_head", head.map(|h| h.to_string())),
                kiln_sync::PushResult::New(head) => Envelope::success("remote advanced")
                    .with("same", false)
                    .with("new", true)
                    .with("repository_head", head.to_string()),
            };
            envelope_response(StatusCode::OK, env)
        },
        Err(err) => error_response(err),
    }
}

#[derive(Deserialize)]
struct PullRequest {
    remote_name: String,
    remote_branch: String,
}

async fn pull(
    State(registry): State<Arc<Registry>>,
    Path((org, db, branch)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<PullRequest>,
) -> Response {
    let repo = registry.get_or_create(&org, &db);
    let auth = auth_from_headers(&headers);
    let transport = HttpTransport::new(bearer_token(&headers).unwrap_or_default());
    match kiln_sync::pull(
        &auth,
        &repo.db,
        &repo.store,
        &branch,
        &body.remote_name,
        &body.remote_branch,
        &transport,
    ) {
        Ok(result) => envelope_response(StatusCode::OK, pull_envelope(&result)),
        Err(err) => error_response(err),
    }
}

#[derive(Deserialize)]
struct CloneRequest {
    #[allow(dead_code)]
    label: Option<String>,
    #[allow(dead_code)]
    comment: Option<String>,
    remote_url: String,
}

async fn clone_db(
    State(registry): State<Arc<Registry>>,
    Path((org, db)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<CloneRequest>,
) -> Response {
    let auth = auth_from_headers(&headers);
    let transport = HttpTransport::new(bearer_token(&headers).unwrap_or_default());
    let store = MemStore::new();
    match Orchestrator::clone_into(auth, store, &body.remote_url, &transport) {
        Ok((orch, envelope)) => {
            registry.insert(&org, &db, orch);
            envelope_response(StatusCode::OK, envelope)
        },
        Err(err) => error_response(err),
    }
}

#[derive(Deserialize)]
struct BundleRequest {
    branch: Option<String>,
}

async fn bundle(
    State(registry): State<Arc<Registry>>,
    Path((org, db)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<BundleRequest>,
) -> Response {
    if bearer_token(&headers).is_none() {
        return envelope_response(StatusCode::UNAUTHORIZED, Envelope::failure("missing bearer token", "unauthorized"));
    }
    let repo = registry.get_or_create(&org, &db);
    let branch = body.branch.as_deref().unwrap_or("main");
    match repo.bundle(branch) {
        Ok(Some(bytes)) => octet_response(StatusCode::OK, bytes),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

/// TUS-resumable chunk upload is an optional transport optimization per §1
/// ("the core MUST work with single-shot transfer"); direct POST to
/// `/api/unpack` is the path every operation in this crate actually takes.
/// This stub exists so the endpoint table is complete, not so it works.
async fn files(headers: HeaderMap, _body: Bytes) -> Response {
    if bearer_token(&headers).is_none() {
        return envelope_response(StatusCode::UNAUTHORIZED, Envelope::failure("missing bearer token", "unauthorized"));
    }
    envelope_response(
        StatusCode::NOT_IMPLEMENTED,
        Envelope::failure("TUS resumable upload is not implemented; use direct POST to /api/unpack", "internal_error"),
    )
}

async fn unbundle(
    State(registry): State<Arc<Registry>>,
    Path((org, db)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if bearer_token(&headers).is_none() {
        return envelope_response(StatusCode::UNAUTHORIZED, Envelope::failure("missing bearer token", "unauthorized"));
    }
    let repo = registry.get_or_create(&org, &db);
    match repo.unbundle(body.into(), "main") {
        Ok(envelope) => envelope_response(StatusCode::OK, envelope),
        Err(err) => error_response(err),
    }
}
