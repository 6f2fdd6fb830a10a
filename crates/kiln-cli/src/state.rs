//! Disk persistence for a [`kiln_metadata::Database`] between separate CLI
//! invocations.
//!
//! `kiln-metadata`'s store is in-memory only; here, process boundary means
//! `Database` itself has to round-trip through a file. The layer bytes
//! already have a real on-disk home in [`kiln_layer_store::fs::FsStore`]; what
//! is missing is the commit graph and branch pointers that reference them, so
//! this module is a JSON sidecar next to the object directory, in the same
//! spirit as `kiln-api`'s bundle format but for the whole database rather
//! than one push's worth of commits.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context};
use kiln_history::CommitId;
use kiln_layer_store::{fs::FsStore, LayerId};
use kiln_metadata::{Commit, Database, GraphKind, RemoteType, RepoMetadata};
use serde::{Deserialize, Serialize};

const METADATA_FILE: &str = "metadata.json";
const OBJECTS_DIR: &str = "objects";

#[derive(Serialize, Deserialize)]
struct WireCommit {
    id: String,
    author: String,
    message: String,
    timestamp: i64,
    parents: Vec<String>,
    layers: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Default)]
struct WireRepo {
    commits: Vec<WireCommit>,
    branches: BTreeMap<String, Option<String>>,
}

#[derive(Serialize, Deserialize)]
struct WireRemote {
    name: String,
    url: String,
    kind: String,
    head: Option<String>,
    tracking: WireRepo,
}

#[derive(Serialize, Deserialize, Default)]
struct WireDatabase {
    local: WireRepo,
    remotes: Vec<WireRemote>,
}

/// One repository open at a filesystem path: its layer store and its
/// metadata, loaded from (and savable back to) `<path>/.kiln/`.
pub struct Repo {
    pub db: Database,
    pub store: FsStore,
    metadata_path: PathBuf,
}

impl Repo {
    /// Wrap an already-open store and a (possibly freshly built, e.g. by
    /// `clone`) database, pointing its sidecar at `path`'s `.kiln/` directory.
    pub fn from_parts(db: Database, store: FsStore, path: &Path) -> Self {
        Self {
            db,
            store,
            metadata_path: path.join(".kiln").join(METADATA_FILE),
        }
    }

    /// Open the repository rooted at `path`, creating `.kiln/` if this is
    /// the first time it has been touched.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let kiln_dir = path.join(".kiln");
        let store = FsStore::open(kiln_dir.join(OBJECTS_DIR)).context("opening layer store")?;
        let metadata_path = kiln_dir.join(METADATA_FILE);

        let db = if metadata_path.exists() {
            let raw = fs::read(&metadata_path).with_context(|| format!("reading {}", metadata_path.display()))?;
            let wire: WireDatabase = serde_json::from_slice(&raw).context("parsing metadata.json")?;
            decode_database(wire)?
        } else {
            Database::new()
        };

        Ok(Self {
            db,
            store,
            metadata_path,
        })
    }

    /// Persist the current state of `db` back to `.kiln/metadata.json`.
    pub fn save(&self) -> anyhow::Result<()> {
        let wire = encode_database(&self.db);
        let raw = serde_json::to_vec_pretty(&wire).context("serializing metadata")?;
        fs::write(&self.metadata_path, raw).with_context(|| format!("writing {}", self.metadata_path.display()))
    }
}

fn encode_repo(repo: &RepoMetadata) -> WireRepo {
    let commits = repo
        .all_commits()
        .into_iter()
        .map(|c| WireCommit {
            id: c.id.to_string(),
            author: c.author,
            message: c.message,
            timestamp: c.timestamp,
            parents: c.parents.iter().map(|p| p.to_string()).collect(),
            layers: c.layers.iter().map(|(kind, id)| (kind.to_string(), id.to_string())).collect(),
        })
        .collect();
    let branches = repo
        .branches()
        .into_iter()
        .map(|(name, head)| (name, head.map(|h| h.to_string())))
        .collect();
    WireRepo { commits, branches }
}

fn encode_database(db: &Database) -> WireDatabase {
    let local = encode_repo(&db.local);
    let remotes = db
        .remotes()
        .into_iter()
        .map(|(name, url, kind, head, tracking)| WireRemote {
            name,
            url,
            kind: match kind {
                RemoteType::Local => "local".to_owned(),
                RemoteType::Remote => "remote".to_owned(),
            },
            head: head.map(|h| h.to_string()),
            tracking: encode_repo(&tracking),
        })
        .collect();
    WireDatabase { local, remotes }
}

/// Insert `commits` into `repo`, retrying until every one that can be
/// admitted has been — commits serialize in no particular order, but
/// `RepoMetadata::put_commit` requires parents to already be present.
/// Mirrors `kiln-sync::fetch::unpack`'s forward-reference handling for the
/// same reason: the source of truth only guarantees the *set* is consistent,
/// not that it is pre-sorted.
fn restore_commits(repo: &RepoMetadata, commits: Vec<Commit>) -> anyhow::Result<()> {
    let mut pending = commits;
    loop {
        let before = pending.len();
        pending.retain(|c| {
            if c.parents.iter().all(|p| repo.has_commit(*p)) {
                repo.put_commit(c.clone()).expect("parents checked above");
                false
            } else {
                true
            }
        });
        if pending.is_empty() {
            return Ok(());
        }
        if pending.len() == before {
            bail!("metadata.json contains commits whose parents are never defined");
        }
    }
}

fn decode_repo(wire: WireRepo) -> anyhow::Result<RepoMetadata> {
    let repo = RepoMetadata::new();
    let commits = wire
        .commits
        .into_iter()
        .map(|wc| {
            let id = CommitId::from_str(&wc.id).map_err(|e| anyhow::anyhow!(e.to_string()))?;
            let parents = wc
                .parents
                .iter()
                .map(|p| CommitId::from_str(p).map_err(|e| anyhow::anyhow!(e.to_string())))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let layers = wc
                .layers
                .iter()
                .map(|(kind, id)| {
                    let kind = GraphKind::from_str(kind).map_err(|e| anyhow::anyhow!(e.to_string()))?;
                    let id = LayerId::from_str(id).map_err(|e| anyhow::anyhow!(e.to_string()))?;
                    Ok((kind, id))
                })
                .collect::<anyhow::Result<BTreeMap<_, _>>>()?;
            Ok(Commit {
                id,
                author: wc.author,
                message: wc.message,
                timestamp: wc.timestamp,
                parents,
                layers,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    restore_commits(&repo, commits)?;

    for (branch, head) in wire.branches {
        repo.ensure_branch(&branch);
        if let Some(head) = head {
            let head = CommitId::from_str(&head).map_err(|e| anyhow::anyhow!(e.to_string()))?;
            repo.reset_branch_head(&branch, head);
        }
    }

    Ok(repo)
}

fn decode_database(wire: WireDatabase) -> anyhow::Result<Database> {
    let db = Database::new();
    let local = decode_repo(wire.local)?;
    for commit in local.all_commits() {
        db.local.put_commit(commit).expect("already validated by decode_repo");
    }
    for (branch, head) in local.branches() {
        db.local.ensure_branch(&branch);
        if let Some(head) = head {
            db.local.reset_branch_head(&branch, head);
        }
    }

    for wire_remote in wire.remotes {
        let kind = match wire_remote.kind.as_str() {
            "local" => RemoteType::Local,
            "remote" => RemoteType::Remote,
            other => bail!("unknown remote kind '{other}'"),
        };
        db.add_remote(&wire_remote.name, &wire_remote.url, kind)
            .context("restoring remote")?;
        if let Some(head) = wire_remote.head {
            let head = LayerId::from_str(&head).map_err(|e| anyhow::anyhow!(e.to_string()))?;
            db.update_repository_head(&wire_remote.name, head)
                .expect("remote was just added");
        }
        let tracking = decode_repo(wire_remote.tracking)?;
        let handle = db.remote_tracking(&wire_remote.name).expect("remote was just added");
        copy_repo_into(&tracking, &handle);
    }

    Ok(db)
}

fn copy_repo_into(from: &RepoMetadata, into: &Arc<RepoMetadata>) {
    for commit in from.all_commits() {
        into.put_commit(commit).expect("already validated by decode_repo");
    }
    for (branch, head) in from.branches() {
        into.ensure_branch(&branch);
        if let Some(head) = head {
            into.reset_branch_head(&branch, head);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;

    #[test]
    fn round_trips_a_database_with_a_remote() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repo::open(dir.path()).unwrap();

        let mut layers = Map::new();
        layers.insert(GraphKind::Instance, LayerId::of(b"root"));
        let root = Commit {
            id: CommitId::of(b"root"),
            author: "tester".into(),
            message: "root".into(),
            timestamp: 0,
            parents: vec![],
            layers,
        };
        repo.db.local.put_commit(root.clone()).unwrap();
        repo.db.local.reset_branch_head("main", root.id);
        repo.db
            .add_remote("origin", "https://example/api", RemoteType::Remote)
            .unwrap();
        repo.db.update_repository_head("origin", LayerId::of(b"root")).unwrap();
        repo.save().unwrap();

        let reopened = Repo::open(dir.path()).unwrap();
        assert_eq!(reopened.db.local.branch_head_commit("main"), Some(root.id));
        assert_eq!(reopened.db.remote_url("origin").unwrap(), "https://example/api");
        assert_eq!(
            reopened.db.repository_head("origin").unwrap(),
            Some(LayerId::of(b"root"))
        );
    }
}
