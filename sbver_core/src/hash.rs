//! Content fingerprints using MD5.
//!
//! The digest only detects change between runs; it is not used for anything
//! security sensitive.

use crate::error::{Error, Result};
use md5::{Digest, Md5};
use serde::{Serialize, Serializer};
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Hash digest size in bytes (MD5 produces 128-bit hashes).
pub const HASH_SIZE: usize = 16;

/// A 16-byte MD5 content digest.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    /// Create a Hash from a hex string (32 hex characters).
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        if hex_str.len() != HASH_SIZE * 2 {
            return Err(Error::invalid_hash(format!(
                "Expected {} hex characters, got {}",
                HASH_SIZE * 2,
                hex_str.len()
            )));
        }

        let bytes =
            hex::decode(hex_str).map_err(|e| Error::invalid_hash(format!("Invalid hex: {}", e)))?;

        let mut hash = [0u8; HASH_SIZE];
        hash.copy_from_slice(&bytes);
        Ok(Hash(hash))
    }

    /// Convert to lowercase hex string (32 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Hash raw bytes.
    pub fn hash_bytes(data: &[u8]) -> Self {
        Self::from_digest(Md5::digest(data).as_slice())
    }

    /// Hash data from a reader.
    pub fn hash_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut hasher = Md5::new();
        std::io::copy(&mut reader, &mut hasher)?;
        Ok(Self::from_digest(hasher.finalize().as_slice()))
    }

    /// Hash a file's full content.
    ///
    /// Any failure to open or read the file is reported as an Access error so
    /// callers can skip the file instead of aborting.
    pub fn hash_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| Error::from_io(path, e))?;
        Self::hash_reader(file).map_err(|e| match e {
            Error::Io { source } => Error::from_io(path, source),
            other => other,
        })
    }

    fn from_digest(digest: &[u8]) -> Self {
        let mut bytes = [0u8; HASH_SIZE];
        bytes.copy_from_slice(digest);
        Hash(bytes)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_hash_empty() {
        let hash = Hash::hash_bytes(b"");
        assert_eq!(hash.to_hex(), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_hash_abc() {
        let hash = Hash::hash_bytes(b"abc");
        assert_eq!(hash.to_hex(), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_hash_file_matches_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("abc.txt");
        std::fs::write(&path, b"abc").unwrap();

        let hash = Hash::hash_file(&path).unwrap();
        assert_eq!(hash, Hash::hash_bytes(b"abc"));
        assert_eq!(hash.to_string(), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_hash_missing_file_is_access_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = Hash::hash_file(&temp_dir.path().join("missing"));
        assert!(matches!(result, Err(Error::Access { .. })));
    }

    #[test]
    fn test_hash_from_hex_roundtrip() {
        let original = Hash::hash_bytes(b"test data");
        let parsed = Hash::from_hex(&original.to_hex()).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_hash_from_hex_invalid() {
        assert!(Hash::from_hex("abcd").is_err());
        assert!(Hash::from_hex("").is_err());
        assert!(Hash::from_hex(&"z".repeat(32)).is_err());
    }

    #[test]
    fn test_hash_serializes_as_hex() {
        let hash = Hash::hash_bytes(b"abc");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, "\"900150983cd24fb0d6963f7d28e17f72\"");
    }

    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            max_shrink_iters: 10000,
            ..ProptestConfig::default()
        })]

        /// Hashing the same data always produces the same hash
        #[test]
        fn prop_hash_deterministic(data: Vec<u8>) {
            let hash1 = Hash::hash_bytes(&data);
            let hash2 = Hash::hash_bytes(&data);
            prop_assert_eq!(hash1, hash2);
        }

        /// Streaming and one-shot hashing agree
        #[test]
        fn prop_reader_matches_bytes(data: Vec<u8>) {
            let streamed = Hash::hash_reader(std::io::Cursor::new(&data))?;
            prop_assert_eq!(streamed, Hash::hash_bytes(&data));
        }

        /// Rendering is always 32 lowercase hex characters
        #[test]
        fn prop_hex_is_lowercase(data: Vec<u8>) {
            let hex = Hash::hash_bytes(&data).to_hex();
            prop_assert_eq!(hex.len(), 32);
            prop_assert!(hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        }
    }
}
