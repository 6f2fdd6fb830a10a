//! A filesystem-backed [`LayerStore`].
//!
//! Layers are stored under `<root>/<aa>/<bb>/<rest>`, where `aa`/`bb` are the
//! first two hex-encoded bytes of the [`LayerId`] (the classic git-style
//! sharded object directory, avoiding a single huge directory). Each layer's
//! parent id, if any, is stored alongside it so a restart doesn't need a
//! separate index.

use std::{
    convert::TryFrom,
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use bytes::Bytes;
use thiserror::Error;

use crate::{Layer, LayerId, LayerStore, PutOutcome};

#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt layer record at {0}")]
    Corrupt(PathBuf),
}

pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, id: &LayerId) -> PathBuf {
        let hex = id.to_string();
        self.root.join(&hex[0..2]).join(&hex[2..4]).join(&hex[4..])
    }

    fn io_err(path: &Path, source: io::Error) -> Error {
        Error::Io {
            path: path.to_owned(),
            source,
        }
    }
}

/// On-disk framing: 1 flag byte (bit0 = has-parent), 20-byte parent (if
/// flagged), then the raw layer bytes. Mirrors the wire record shape of the
/// pack codec, which keeps the two formats easy to reason about together.
fn encode_record(parent: Option<LayerId>, bytes: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(1 + 20 * parent.is_some() as usize + bytes.len());
    match parent {
        Some(p) => {
            buf.push(1);
            buf.extend_from_slice(p.as_bytes());
        },
        None => buf.push(0),
    }
    buf.extend_from_slice(bytes);
    buf
}

fn decode_record(path: &Path, data: &[u8]) -> Result<(Option<LayerId>, Bytes), Error> {
    let flag = *data.first().ok_or_else(|| Error::Corrupt(path.to_owned()))?;
    match flag {
        0 => Ok((None, Bytes::copy_from_slice(&data[1..]))),
        1 => {
            if data.len() < 21 {
                return Err(Error::Corrupt(path.to_owned()));
            }
            let parent = LayerId::try_from(&data[1..21]).map_err(|_| Error::Corrupt(path.to_owned()))?;
            Ok((Some(parent), Bytes::copy_from_slice(&data[21..])))
        },
        _ => Err(Error::Corrupt(path.to_owned())),
    }
}

impl LayerStore for FsStore {
    type Error = Error;

    fn put_layer(
        &self,
        id: LayerId,
        parent: Option<LayerId>,
        bytes: Bytes,
    ) -> Result<PutOutcome, Self::Error> {
        let path = self.path_for(&id);

        if let Some(existing) = self.get_layer(&id)? {
            return Ok(if existing.parent == parent {
                PutOutcome::AlreadyPresent
            } else {
                PutOutcome::Mismatch(id)
            });
        }

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| Self::io_err(dir, e))?;
        }

        let mut tmp = tempfile::NamedTempFile::new_in(path.parent().unwrap_or(&self.root))
            .map_err(|e| Self::io_err(&path, e))?;
        tmp.write_all(&encode_record(parent, &bytes))
            .map_err(|e| Self::io_err(&path, e))?;
        tmp.flush().map_err(|e| Self::io_err(&path, e))?;
        tmp.persist(&path)
            .map_err(|e| Self::io_err(&path, e.error))?;

        Ok(PutOutcome::Inserted)
    }

    fn get_layer(&self, id: &LayerId) -> Result<Option<Layer>, Self::Error> {
        let path = self.path_for(id);
        match fs::File::open(&path) {
            Ok(mut f) => {
                let mut data = Vec::new();
                f.read_to_end(&mut data)
                    .map_err(|e| Self::io_err(&path, e))?;
                let (parent, bytes) = decode_record(&path, &data)?;
                Ok(Some(Layer {
                    id: *id,
                    parent,
                    bytes,
                }))
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_err(&path, e)),
        }
    }

    fn exists(&self, id: &LayerId) -> bool {
        self.path_for(id).is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_layer() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::open(dir.path()).unwrap();

        let bytes = Bytes::from_static(b"some delta bytes");
        let id = LayerId::of(&bytes);
        let parent = LayerId::of(b"parent layer");

        assert_eq!(
            store.put_layer(id, Some(parent), bytes.clone()).unwrap(),
            PutOutcome::Inserted
        );
        assert!(store.exists(&id));

        let got = store.get_layer(&id).unwrap().unwrap();
        assert_eq!(got.bytes, bytes);
        assert_eq!(got.parent, Some(parent));
    }

    #[test]
    fn put_is_idempotent_across_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = Bytes::from_static(b"layer");
        let id = LayerId::of(&bytes);

        {
            let store = FsStore::open(dir.path()).unwrap();
            store.put_layer(id, None, bytes.clone()).unwrap();
        }
        let store = FsStore::open(dir.path()).unwrap();
        assert_eq!(
            store.put_layer(id, None, bytes).unwrap(),
            PutOutcome::AlreadyPresent
        );
    }
}
