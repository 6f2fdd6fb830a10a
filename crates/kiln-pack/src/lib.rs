//! The pack wire format: a self-describing container for a set of layers
//! plus their parent-child relationships.
//!
//! Layout (all integers big-endian):
//!
//! ```text
//! magic:   8 bytes, b"KILNPCK1"
//! count:   u32
//! count * {
//!     layer_id:   20 bytes
//!     flags:      1 byte   (bit0 = has-parent)
//!     parent_id:  20 bytes (present iff bit0 set)
//!     len:        u64
//!     payload:    len bytes
//! }
//! ```
//!
//! A [`Payload`] additionally prepends a 20-byte repository-head hint ahead
//! of the pack proper.

use std::convert::{TryFrom, TryInto};

use bytes::{Buf, Bytes};
use thiserror::Error;

use kiln_layer_store::LayerId;

const MAGIC: &[u8; 8] = b"KILNPCK1";
const HAS_PARENT: u8 = 0b0000_0001;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum Error {
    #[error("pack truncated")]
    Truncated,

    #[error("bad pack magic")]
    BadMagic,

    #[error("payload length {0} exceeds addressable memory")]
    LengthOverflow(u64),
}

/// One member of a pack: a layer's id, its parent (if any), and its bytes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PackEntry {
    pub id: LayerId,
    pub parent: Option<LayerId>,
    pub bytes: Bytes,
}

/// Serialize `entries` into a single pack payload.
///
/// `build_pack(pack_iter(p).collect()) == p` for any well-formed `p` (up to
/// entry ordering, which this function preserves as given).
pub fn build_pack<I>(entries: I) -> Bytes
where
    I: IntoIterator<Item = PackEntry>,
    I::IntoIter: ExactSizeIterator,
{
    let entries = entries.into_iter();
    let count = entries.len() as u32;

    let mut buf = Vec::with_capacity(12);
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&count.to_be_bytes());

    for entry in entries {
        buf.extend_from_slice(entry.id.as_bytes());
        match entry.parent {
            Some(p) => {
                buf.push(HAS_PARENT);
                buf.extend_from_slice(p.as_bytes());
            },
            None => buf.push(0),
        }
        buf.extend_from_slice(&(entry.bytes.len() as u64).to_be_bytes());
        buf.extend_from_slice(&entry.bytes);
    }

    Bytes::from(buf)
}

/// Streaming, zero-copy iterator over the entries of a pack.
pub struct PackIter {
    buf: Bytes,
    remaining: u32,
    errored: bool,
}

impl PackIter {
    pub fn new(pack: Bytes) -> Result<Self, Error> {
        if pack.len() < MAGIC.len() + 4 {
            return Err(Error::Truncated);
        }
        if &pack[..MAGIC.len()] != &MAGIC[..] {
            return Err(Error::BadMagic);
        }
        let count = u32::from_be_bytes(pack[MAGIC.len()..MAGIC.len() + 4].try_into().unwrap());
        let mut buf = pack;
        buf.advance(MAGIC.len() + 4);
        Ok(Self {
            buf,
            remaining: count,
            errored: false,
        })
    }
}

impl Iterator for PackIter {
    type Item = Result<PackEntry, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.errored || self.remaining == 0 {
            return None;
        }

        let entry = (|| -> Result<PackEntry, Error> {
            if self.buf.len() < 20 + 1 {
                return Err(Error::Truncated);
            }
            let id = LayerId::try_from(&self.buf[..20]).map_err(|_| Error::Truncated)?;
            self.buf.advance(20);

            let flags = self.buf[0];
            self.buf.advance(1);

            let parent = if flags & HAS_PARENT != 0 {
                if self.buf.len() < 20 {
                    return Err(Error::Truncated);
                }
                let p = LayerId::try_from(&self.buf[..20]).map_err(|_| Error::Truncated)?;
                self.buf.advance(20);
                Some(p)
            } else {
                None
            };

            if self.buf.len() < 8 {
                return Err(Error::Truncated);
            }
            let len = u64::from_be_bytes(self.buf[..8].try_into().unwrap());
            self.buf.advance(8);

            let len = usize::try_from(len).map_err(|_| Error::LengthOverflow(len))?;
            if self.buf.len() < len {
                return Err(Error::Truncated);
            }
            let bytes = self.buf.slice(..len);
            self.buf.advance(len);

            Ok(PackEntry { id, parent, bytes })
        })();

        self.remaining -= 1;
        if entry.is_err() {
            self.errored = true;
        }
        Some(entry)
    }
}

/// Streaming unpack: enumerate `(id, parent, bytes)` without collecting.
pub fn pack_iter(pack: Bytes) -> Result<PackIter, Error> {
    PackIter::new(pack)
}

/// Enumerate membership (id, parent) without materializing any payload
/// bytes, by skipping over them.
pub fn pack_layerids_and_parents(pack: Bytes) -> Result<Vec<(LayerId, Option<LayerId>)>, Error> {
    pack_iter(pack)?
        .map(|r| r.map(|e| (e.id, e.parent)))
        .collect()
}

/// A pack prefixed with a 20-byte repository-head hint.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Payload(Bytes);

impl Payload {
    pub fn new(head: LayerId, pack: Bytes) -> Self {
        let mut buf = Vec::with_capacity(20 + pack.len());
        buf.extend_from_slice(head.as_bytes());
        buf.extend_from_slice(&pack);
        Self(Bytes::from(buf))
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }

    /// Split a payload into the repository-head hint and the contained pack.
    pub fn repository_head_and_pack(self) -> Result<(LayerId, Bytes), Error> {
        if self.0.len() < 20 {
            return Err(Error::Truncated);
        }
        let head = LayerId::try_from(&self.0[..20]).map_err(|_| Error::Truncated)?;
        Ok((head, self.0.slice(20..)))
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(bytes: &'static [u8], parent: Option<LayerId>) -> PackEntry {
        let bytes = Bytes::from_static(bytes);
        PackEntry {
            id: LayerId::of(&bytes),
            parent,
            bytes,
        }
    }

    #[test]
    fn empty_pack_round_trips() {
        let pack = build_pack(Vec::new());
        let entries: Vec<_> = pack_iter(pack).unwrap().collect::<Result<_, _>>().unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn round_trips_a_chain() {
        let base = entry(b"base", None);
        let child = entry(b"child", Some(base.id));

        let pack = build_pack(vec![base.clone(), child.clone()]);
        let entries: Vec<_> = pack_iter(pack).unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(entries, vec![base, child]);
    }

    #[test]
    fn layerids_and_parents_skips_bytes() {
        let base = entry(b"base", None);
        let child = entry(b"a somewhat longer child payload", Some(base.id));
        let pack = build_pack(vec![base.clone(), child.clone()]);

        let ids = pack_layerids_and_parents(pack).unwrap();
        assert_eq!(ids, vec![(base.id, base.parent), (child.id, child.parent)]);
    }

    #[test]
    fn rejects_bad_magic() {
        let err = PackIter::new(Bytes::from_static(b"not a pack")).unwrap_err();
        assert_eq!(err, Error::BadMagic);
    }

    #[test]
    fn rejects_truncated_pack() {
        let mut buf = build_pack(vec![entry(b"x", None)]).to_vec();
        buf.truncate(buf.len() - 1);
        let err: Result<Vec<_>, _> = PackIter::new(Bytes::from(buf)).unwrap().collect();
        assert_eq!(err, Err(Error::Truncated));
    }

    #[test]
    fn payload_round_trips_head_hint() {
        let head = LayerId::of(b"head");
        let pack = build_pack(vec![entry(b"x", None)]);
        let payload = Payload::new(head, pack.clone());

        let (got_head, got_pack) = payload.repository_head_and_pack().unwrap();
        assert_eq!(got_head, head);
        assert_eq!(got_pack, pack);
    }

    proptest::proptest! {
        #[test]
        fn build_then_iter_round_trips_arbitrary_payloads(payloads: Vec<Vec<u8>>) {
            let entries: Vec<PackEntry> = payloads
                .into_iter()
                .scan(None, |parent, bytes| {
                    let bytes = Bytes::from(bytes);
                    let id = LayerId::of(&bytes);
                    let entry = PackEntry { id, parent: *parent, bytes };
                    *parent = Some(id);
                    Some(entry)
                })
                .collect();

            let pack = build_pack(entries.clone());
            let got: Vec<_> = pack_iter(pack).unwrap().collect::<Result<_, _>>().unwrap();
            proptest::prop_assert_eq!(got, entries);
        }
    }
}
