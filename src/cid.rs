//! Content identifiers for blocks in the store.

use std::fmt;

use thiserror::Error;

/// Error parsing canonical CID bytes.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid cid: empty key")]
pub struct InvalidCid;

/// An opaque, immutable content identifier.
///
/// A `Cid` names a block by (a digest of) its contents. The collector never
/// inspects the bytes; equality and hashing are over the raw byte string.
/// [`Cid::to_bytes`] yields the canonical byte form and [`Cid::from_bytes`]
/// parses it back; the round trip is lossless for every value `to_bytes`
/// can produce.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cid(Box<[u8]>);

impl Cid {
    /// Build a CID from raw bytes. The byte string must be non-empty.
    pub fn new(bytes: impl Into<Box<[u8]>>) -> Self {
        let bytes = bytes.into();
        assert!(!bytes.is_empty(), "cid bytes must be non-empty");
        Self(bytes)
    }

    /// Canonical byte form, suitable as a map key.
    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Parse canonical bytes back into a CID.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InvalidCid> {
        if bytes.is_empty() {
            return Err(InvalidCid);
        }
        Ok(Self(bytes.into()))
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0.iter() {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({self})")
    }
}
