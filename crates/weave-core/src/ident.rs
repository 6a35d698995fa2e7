// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Commit identifiers and the input record the weaver consumes.
use std::fmt;

use blake3::Hasher;
use thiserror::Error;

/// Canonical 256-bit digest width used for commit identifiers.
pub type Hash = [u8; 32];

/// Strongly typed identifier for a commit in the history DAG.
///
/// `CommitId` is an opaque 32-byte value. Object ids coming from a repository
/// are parsed with [`CommitId::from_hex`]; 20-byte (SHA-1) ids are stored
/// zero-padded on the right so both object formats share one key type. Tests
/// and fixtures derive stable ids from labels via [`make_commit_id`]
/// (`blake3("commit:" || label)`).
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommitId(pub Hash);

impl CommitId {
    /// Returns the canonical byte representation of this id.
    #[must_use]
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// Parses a 40-digit (SHA-1) or 64-digit (SHA-256) hex object id.
    pub fn from_hex(text: &str) -> Result<Self, CommitIdError> {
        let text = text.trim();
        if text.len() != 40 && text.len() != 64 {
            return Err(CommitIdError::InvalidLength(text.len()));
        }
        let bytes = hex::decode(text)?;
        let mut id = [0u8; 32];
        id[..bytes.len()].copy_from_slice(&bytes);
        Ok(Self(id))
    }

    /// Abbreviated hex form (first seven bytes), as used in logs.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..7])
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short())
    }
}

impl fmt::Debug for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommitId({})", self.short())
    }
}

/// Error returned when parsing a textual object id fails.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommitIdError {
    /// The text was neither 40 nor 64 hex digits long.
    #[error("object id must be 40 or 64 hex digits, got {0}")]
    InvalidLength(usize),
    /// The text contained a non-hex character.
    #[error("invalid hex in object id: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Produces a stable commit id derived from a label using BLAKE3.
pub fn make_commit_id(label: &str) -> CommitId {
    let mut hasher = Hasher::new();
    hasher.update(b"commit:");
    hasher.update(label.as_bytes());
    CommitId(hasher.finalize().into())
}

/// One commit of the input sequence: its id and its ordered parent ids.
///
/// The first parent is the mainline parent. Sequences are fed child before
/// parent (reverse topological order).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommitRecord {
    /// Id of the commit.
    pub id: CommitId,
    /// Parent ids, first parent first.
    pub parents: Vec<CommitId>,
}

impl CommitRecord {
    /// Creates a record from an id and its parents.
    pub fn new(id: CommitId, parents: Vec<CommitId>) -> Self {
        Self { id, parents }
    }

    /// True for commits without parents.
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn label_ids_are_domain_separated_and_stable() {
        let a = make_commit_id("a1");
        assert_eq!(a, make_commit_id("a1"));
        assert_ne!(a, make_commit_id("a2"));
        let mut raw = Hasher::new();
        raw.update(b"a1");
        assert_ne!(a.0, <[u8; 32]>::from(raw.finalize()));
    }

    #[test]
    fn sha1_hex_is_right_padded() {
        let text = "0123456789abcdef0123456789abcdef01234567";
        let id = CommitId::from_hex(text).unwrap();
        assert_eq!(hex::encode(&id.0[..20]), text);
        assert!(id.0[20..].iter().all(|b| *b == 0));
        assert_eq!(id.to_string(), "0123456789abcd");
    }

    #[test]
    fn sha256_hex_fills_all_bytes() {
        let text = "ff".repeat(32);
        let id = CommitId::from_hex(&text).unwrap();
        assert_eq!(id.0, [0xff; 32]);
    }

    #[test]
    fn malformed_hex_is_rejected() {
        assert_eq!(
            CommitId::from_hex("abc"),
            Err(CommitIdError::InvalidLength(3))
        );
        let bad = "zz".repeat(20);
        assert!(matches!(
            CommitId::from_hex(&bad),
            Err(CommitIdError::InvalidHex(_))
        ));
    }
}
