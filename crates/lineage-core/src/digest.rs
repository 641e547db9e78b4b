//! # Content Digests
//!
//! [`ContentDigest`] identifies the exact content of an overlay filesystem
//! or of a subset of its files. Digests carry their algorithm tag so stored
//! values remain interpretable if the hash function changes.
//!
//! The framing hashes each entry as `len(path) || path || len(data) || data`
//! with lengths as little-endian `u64`, in ascending path order. Two file
//! sets hash equal only if they have identical paths and payloads.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::vfs::VirtualFile;

/// The hash algorithm used to compute a content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-256.
    Sha256,
}

impl DigestAlgorithm {
    /// Algorithm identifier used in digest strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content digest with its algorithm tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    /// The hash algorithm that produced this digest.
    pub algorithm: DigestAlgorithm,
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

impl ContentDigest {
    /// Create a SHA-256 content digest from raw bytes.
    pub fn sha256(bytes: [u8; 32]) -> Self {
        Self {
            algorithm: DigestAlgorithm::Sha256,
            bytes,
        }
    }

    /// Return the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

/// Digest a set of files.
///
/// Files are hashed in ascending path order regardless of the order the
/// iterator yields them.
pub fn digest_files<'a>(files: impl IntoIterator<Item = &'a VirtualFile>) -> ContentDigest {
    let mut sorted: Vec<&VirtualFile> = files.into_iter().collect();
    sorted.sort_by(|a, b| a.path().cmp(b.path()));

    let mut hasher = Sha256::new();
    for file in sorted {
        let path = file.path().as_bytes();
        hasher.update((path.len() as u64).to_le_bytes());
        hasher.update(path);
        hasher.update((file.data().len() as u64).to_le_bytes());
        hasher.update(file.data());
    }
    ContentDigest::sha256(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, data: &[u8]) -> VirtualFile {
        VirtualFile::new(path, data.to_vec())
    }

    #[test]
    fn order_independent() {
        let a = file("a.cue", b"x");
        let b = file("b.cue", b"y");
        assert_eq!(digest_files([&a, &b]), digest_files([&b, &a]));
    }

    #[test]
    fn path_and_payload_boundaries_are_framed() {
        // Same concatenation of path+data, different split.
        let left = file("ab", b"c");
        let right = file("a", b"bc");
        assert_ne!(digest_files([&left]), digest_files([&right]));
    }

    #[test]
    fn empty_set_is_sha256_of_nothing() {
        let digest = digest_files(std::iter::empty());
        assert_eq!(
            digest.to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn display_includes_algorithm() {
        let digest = ContentDigest::sha256([0u8; 32]);
        let shown = digest.to_string();
        assert_eq!(DigestAlgorithm::Sha256.to_string(), "sha256");
        assert_eq!(shown, format!("sha256:{}", "00".repeat(32)));
    }
}
