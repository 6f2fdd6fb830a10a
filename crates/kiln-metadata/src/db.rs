use std::{collections::HashMap, sync::Arc};

use kiln_layer_store::LayerId;
use parking_lot::RwLock;
use thiserror::Error;

use crate::repo::RepoMetadata;

/// Whether a remote is a real network peer or the synthetic, in-process
/// remote used by bundle/unbundle (see `kiln-api`).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RemoteType {
    Local,
    Remote,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("remote '{0}' already exists")]
    RemoteAlreadyExists(String),

    #[error("remote '{0}' not found")]
    RemoteNotFound(String),
}

struct RemoteRecord {
    url: String,
    kind: RemoteType,
    head: Option<LayerId>,
    tracking: Arc<RepoMetadata>,
}

/// A database: one local repository plus zero or more registered remotes,
/// each with its own remote-tracking repository.
#[derive(Default)]
pub struct Database {
    pub local: Arc<RepoMetadata>,
    remotes: RwLock<HashMap<String, RemoteRecord>>,
}

impl Database {
    pub fn new() -> Self {
        Self {
            local: Arc::new(RepoMetadata::new()),
            remotes: RwLock::new(HashMap::new()),
        }
    }

    pub fn add_remote(&self, name: &str, url: &str, kind: RemoteType) -> Result<(), Error> {
        let mut remotes = self.remotes.write();
        if remotes.contains_key(name) {
            return Err(Error::RemoteAlreadyExists(name.to_owned()));
        }
        remotes.insert(
            name.to_owned(),
            RemoteRecord {
                url: url.to_owned(),
                kind,
                head: None,
                tracking: Arc::new(RepoMetadata::new()),
            },
        );
        Ok(())
    }

    /// Register a remote and return its (initially empty) tracking
    /// repository, for the caller to populate via fetch.
    pub fn insert_remote_repository(&self, name: &str, url: &str) -> Result<Arc<RepoMetadata>, Error> {
        self.add_remote(name, url, RemoteType::Remote)?;
        Ok(self.remote_tracking(name)?)
    }

    pub fn remove_remote(&self, name: &str) -> Result<(), Error> {
        self.remotes
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::RemoteNotFound(name.to_owned()))
    }

    pub fn remote_type(&self, name: &str) -> Result<RemoteType, Error> {
        self.remotes
            .read()
            .get(name)
            .map(|r| r.kind)
            .ok_or_else(|| Error::RemoteNotFound(name.to_owned()))
    }

    pub fn remote_url(&self, name: &str) -> Result<String, Error> {
        self.remotes
            .read()
            .get(name)
            .map(|r| r.url.clone())
            .ok_or_else(|| Error::RemoteNotFound(name.to_owned()))
    }

    pub fn repository_head(&self, remote_name: &str) -> Result<Option<LayerId>, Error> {
        self.remotes
            .read()
            .get(remote_name)
            .map(|r| r.head)
            .ok_or_else(|| Error::RemoteNotFound(remote_name.to_owned()))
    }

    pub fn update_repository_head(&self, remote_name: &str, layer_id: LayerId) -> Result<(), Error> {
        self.remotes
            .write()
            .get_mut(remote_name)
            .map(|r| r.head = Some(layer_id))
            .ok_or_else(|| Error::RemoteNotFound(remote_name.to_owned()))
    }

    /// The remote-tracking repository mirroring `remote_name`'s branches.
    pub fn remote_tracking(&self, remote_name: &str) -> Result<Arc<RepoMetadata>, Error> {
        self.remotes
            .read()
            .get(remote_name)
            .map(|r| r.tracking.clone())
            .ok_or_else(|| Error::RemoteNotFound(remote_name.to_owned()))
    }

    pub fn has_remote(&self, name: &str) -> bool {
        self.remotes.read().contains_key(name)
    }

    /// Every registered remote's name, url, kind, head and tracking
    /// repository. Used by `kiln-cli` to snapshot a database to disk.
    pub fn remotes(&self) -> Vec<(String, String, RemoteType, Option<LayerId>, Arc<RepoMetadata>)> {
        self.remotes
            .read()
            .iter()
            .map(|(name, r)| (name.clone(), r.url.clone(), r.kind, r.head, r.tracking.clone()))
            .collect()
    }
}
