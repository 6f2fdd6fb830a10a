use std::{
    convert::TryFrom,
    fmt::{self, Display},
    str::FromStr,
};

use sha1::{Digest, Sha1};
use thiserror::Error;

/// Content hash of a [`crate::Layer`]'s bytes.
///
/// Displayed and parsed as 40 lowercase hex characters, per the wire format.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct LayerId([u8; 20]);

impl LayerId {
    pub const LEN: usize = 20;

    /// Hash `bytes` to the [`LayerId`] they would be stored under.
    pub fn of(bytes: &[u8]) -> Self {
        let digest = Sha1::digest(bytes);
        let mut buf = [0u8; 20];
        buf.copy_from_slice(&digest);
        Self(buf)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Debug for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerId({})", self)
    }
}

impl Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[derive(Debug, Error)]
#[error("invalid layer id: {0}")]
pub struct ParseLayerIdError(String);

impl FromStr for LayerId {
    type Err = ParseLayerIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| ParseLayerIdError(e.to_string()))?;
        Self::try_from(bytes.as_slice()).map_err(|_| ParseLayerIdError(s.to_owned()))
    }
}

impl TryFrom<&[u8]> for LayerId {
    type Error = std::array::TryFromSliceError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        <[u8; 20]>::try_from(bytes).map(Self)
    }
}

impl From<[u8; 20]> for LayerId {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl From<LayerId> for [u8; 20] {
    fn from(id: LayerId) -> Self {
        id.0
    }
}

impl AsRef<[u8]> for LayerId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(LayerId::of(b"hello"), LayerId::of(b"hello"));
        assert_ne!(LayerId::of(b"hello"), LayerId::of(b"world"));
    }

    #[test]
    fn roundtrips_through_display() {
        let id = LayerId::of(b"round-trip-me");
        let parsed: LayerId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_short_input() {
        assert!("deadbeef".parse::<LayerId>().is_err());
    }

    proptest::proptest! {
        #[test]
        fn of_is_deterministic_over_arbitrary_bytes(bytes: Vec<u8>) {
            proptest::prop_assert_eq!(LayerId::of(&bytes), LayerId::of(&bytes));
        }

        #[test]
        fn display_and_from_str_round_trip(bytes: Vec<u8>) {
            let id = LayerId::of(&bytes);
            let parsed: LayerId = id.to_string().parse().unwrap();
            proptest::prop_assert_eq!(id, parsed);
        }
    }
}
