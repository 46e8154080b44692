// git-drs - Large files for Git, backed by data repositories
// Copyright (C) 2025 git-drs Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! Content hash used as the identity of every large object
//!
//! An [`Oid`] is the SHA-256 digest of an object's bytes. It is the sole key
//! for matching local content against remote records, so two objects with the
//! same hash are the same object regardless of path or branch.

use crate::error::{GitError, GitResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Algorithm tag written in pointer files and remote checksums
pub const HASH_ALGORITHM: &str = "sha256";

/// SHA-256 content identifier
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Oid([u8; 32]);

impl Oid {
    /// Hash of the empty byte sequence. `git lfs` never stores it.
    pub const EMPTY: Oid = Oid([
        0xe3, 0xb0, 0xc4, 0x42, 0x98, 0xfc, 0x1c, 0x14, 0x9a, 0xfb, 0xf4, 0xc8, 0x99, 0x6f, 0xb9,
        0x24, 0x27, 0xae, 0x41, 0xe4, 0x64, 0x9b, 0x93, 0x4c, 0xa4, 0x95, 0x99, 0x1b, 0x78, 0x52,
        0xb8, 0x55,
    ]);

    /// Hash a byte slice
    pub fn hash(data: &[u8]) -> Self {
        let mut hasher = ContentHasher::new();
        hasher.update(data);
        hasher.finalize()
    }

    /// Hash a file in 64KB chunks, without loading it into memory
    pub async fn from_file<P: AsRef<Path>>(path: P) -> GitResult<Self> {
        use tokio::io::AsyncReadExt;

        let mut file = tokio::fs::File::open(path.as_ref()).await?;
        let mut hasher = ContentHasher::new();
        let mut buffer = vec![0u8; 64 * 1024];

        loop {
            let bytes_read = file.read(&mut buffer).await?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(hasher.finalize())
    }

    /// Parse a 64-character hex digest
    pub fn from_hex(hex_str: &str) -> GitResult<Self> {
        if hex_str.len() != 64 {
            return Err(GitError::InvalidOid(format!(
                "expected 64 hex characters, got {}: {}",
                hex_str.len(),
                hex_str
            )));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hex_str, &mut bytes)
            .map_err(|e| GitError::InvalidOid(format!("{}: {}", hex_str, e)))?;
        Ok(Oid(bytes))
    }

    /// Lowercase hex digest
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Digest prefixed with its algorithm, as in `sha256:<hex>`
    pub fn tagged(&self) -> String {
        format!("{}:{}", HASH_ALGORITHM, self.to_hex())
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the hash of empty content
    pub fn is_empty_content(&self) -> bool {
        *self == Self::EMPTY
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", &self.to_hex()[..12])
    }
}

impl FromStr for Oid {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digest = s.strip_prefix("sha256:").unwrap_or(s);
        Oid::from_hex(digest)
    }
}

impl Serialize for Oid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Oid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Incremental hasher for content streamed in chunks
#[derive(Clone, Default)]
pub struct ContentHasher {
    inner: Sha256,
    bytes: u64,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
        self.bytes += chunk.len() as u64;
    }

    /// Number of bytes hashed so far
    pub fn bytes_hashed(&self) -> u64 {
        self.bytes
    }

    pub fn finalize(self) -> Oid {
        let digest = self.inner.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Oid(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn test_hash_known_value() {
        assert_eq!(Oid::hash(b"hello").to_hex(), HELLO);
    }

    #[test]
    fn test_empty_constant() {
        assert_eq!(Oid::hash(b""), Oid::EMPTY);
        assert!(Oid::EMPTY.is_empty_content());
    }

    #[test]
    fn test_parse_with_and_without_tag() {
        let plain: Oid = HELLO.parse().unwrap();
        let tagged: Oid = format!("sha256:{}", HELLO).parse().unwrap();
        assert_eq!(plain, tagged);
        assert_eq!(plain.tagged(), format!("sha256:{}", HELLO));
    }

    #[test]
    fn test_parse_uppercase_normalizes() {
        let oid: Oid = HELLO.to_uppercase().parse().unwrap();
        assert_eq!(oid.to_hex(), HELLO);
    }

    #[test]
    fn test_reject_bad_hex() {
        assert!(Oid::from_hex("abc").is_err());
        assert!(Oid::from_hex(&"z".repeat(64)).is_err());
    }

    #[test]
    fn test_incremental_matches_oneshot() {
        let mut hasher = ContentHasher::new();
        hasher.update(b"hel");
        hasher.update(b"lo");
        assert_eq!(hasher.bytes_hashed(), 5);
        assert_eq!(hasher.finalize(), Oid::hash(b"hello"));
    }

    #[test]
    fn test_serde_as_hex_string() {
        let oid = Oid::hash(b"hello");
        let json = serde_json::to_string(&oid).unwrap();
        assert_eq!(json, format!("\"{}\"", HELLO));
        let back: Oid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, oid);
    }

    #[tokio::test]
    async fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"hello").unwrap();
        assert_eq!(Oid::from_file(&path).await.unwrap().to_hex(), HELLO);
    }
}
