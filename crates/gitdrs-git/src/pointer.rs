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

//! Pointer file implementation
//!
//! Pointer files are the small text blobs Git LFS commits in place of large
//! file content. They name the content by hash and size:
//!
//! ## Format Specification
//!
//! ```text
//! version https://git-lfs.github.com/spec/v1
//! oid sha256:4d7a214614ab2935c943f9e0ff69d22eadbb8f32b1258daaa5e2ca24d17e2393
//! size 12345
//! ```
//!
//! Lines with keys other than `version`, `oid` and `size` (extensions) are
//! ignored when reading.

use crate::error::{GitError, GitResult};
use crate::oid::{Oid, HASH_ALGORITHM};
use std::fmt;

/// Git LFS pointer specification version
pub const POINTER_VERSION: &str = "https://git-lfs.github.com/spec/v1";

/// Version URL used by pre-release Git LFS clients
const LEGACY_POINTER_VERSION: &str = "https://hawser.github.com/spec/v1";

/// Blobs larger than this are never treated as pointers
pub const MAX_POINTER_SIZE: usize = 1024;

/// A parsed Git LFS pointer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerFile {
    /// Version URL from the first line
    pub version: String,

    /// Hash of the content the pointer stands for
    pub oid: Oid,

    /// Size of the content in bytes
    pub size: u64,
}

impl PointerFile {
    /// Creates a pointer for content with the given hash and size
    pub fn new(oid: Oid, size: u64) -> Self {
        Self {
            version: POINTER_VERSION.to_string(),
            oid,
            size,
        }
    }

    /// Parses a pointer file from its text representation
    ///
    /// # Errors
    ///
    /// - `InvalidPointerFormat` when the content is too large or does not start
    ///   with a version line
    /// - `MissingPointerField` when the `oid` or `size` line is absent
    /// - `InvalidOid` when the hash is not `sha256:<64 hex>`
    ///
    /// # Example
    ///
    /// ```rust
    /// use gitdrs_git::PointerFile;
    ///
    /// let content = "version https://git-lfs.github.com/spec/v1\noid sha256:4d7a214614ab2935c943f9e0ff69d22eadbb8f32b1258daaa5e2ca24d17e2393\nsize 12345\n";
    /// let pointer = PointerFile::parse(content)?;
    /// assert_eq!(pointer.size, 12345);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn parse(content: &str) -> GitResult<Self> {
        if content.len() > MAX_POINTER_SIZE {
            return Err(GitError::InvalidPointerFormat(
                "Pointer file too large".to_string(),
            ));
        }

        let mut version: Option<String> = None;
        let mut oid: Option<Oid> = None;
        let mut size: Option<u64> = None;

        for line in content.lines() {
            let line = line.trim();
            let Some((key, value)) = line.split_once(' ') else {
                continue;
            };

            match key {
                "version" => version = Some(value.trim().to_string()),
                "oid" => {
                    let (algorithm, digest) = value.trim().split_once(':').ok_or_else(|| {
                        GitError::InvalidOid(format!(
                            "OID must be in format 'sha256:hash', got: {}",
                            value
                        ))
                    })?;
                    if algorithm != HASH_ALGORITHM {
                        return Err(GitError::InvalidOid(format!(
                            "Only sha256 hashing is supported, got: {}",
                            algorithm
                        )));
                    }
                    oid = Some(Oid::from_hex(digest)?);
                }
                "size" => {
                    size = Some(value.trim().parse::<u64>().map_err(|e| {
                        GitError::PointerParse(format!("Invalid size value: {}", e))
                    })?);
                }
                _ => {}
            }
        }

        let version = version.ok_or_else(|| {
            GitError::InvalidPointerFormat("missing version line".to_string())
        })?;
        let oid = oid.ok_or_else(|| GitError::MissingPointerField("oid".to_string()))?;
        let size = size.ok_or_else(|| GitError::MissingPointerField("size".to_string()))?;

        Ok(Self { version, oid, size })
    }

    /// Fast check for pointer-shaped content, without full parsing.
    ///
    /// Anything that passes here but fails [`PointerFile::parse`] is a
    /// malformed pointer rather than ordinary file content.
    pub fn is_pointer(content: &[u8]) -> bool {
        if content.len() > MAX_POINTER_SIZE {
            return false;
        }

        content.starts_with(b"version https://git-lfs.github.com/spec/")
            || content.starts_with(format!("version {}", LEGACY_POINTER_VERSION).as_bytes())
    }

    /// Converts the pointer file to its canonical text representation
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for PointerFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "version {}\noid {}\nsize {}\n",
            self.version,
            self.oid.tagged(),
            self.size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_OID: &str = "4d7a214614ab2935c943f9e0ff69d22eadbb8f32b1258daaa5e2ca24d17e2393";

    fn oid() -> Oid {
        Oid::from_hex(VALID_OID).unwrap()
    }

    #[test]
    fn test_new_pointer() {
        let pointer = PointerFile::new(oid(), 12345);
        assert_eq!(pointer.version, POINTER_VERSION);
        assert_eq!(pointer.oid, oid());
        assert_eq!(pointer.size, 12345);
    }

    #[test]
    fn test_pointer_to_string() {
        let text = PointerFile::new(oid(), 12345).to_string();
        assert_eq!(
            text,
            format!(
                "version https://git-lfs.github.com/spec/v1\noid sha256:{}\nsize 12345\n",
                VALID_OID
            )
        );
    }

    #[test]
    fn test_parse_valid_pointer() {
        let content = format!(
            "version https://git-lfs.github.com/spec/v1\noid sha256:{}\nsize 12345\n",
            VALID_OID
        );

        let pointer = PointerFile::parse(&content).unwrap();
        assert_eq!(pointer.version, POINTER_VERSION);
        assert_eq!(pointer.oid, oid());
        assert_eq!(pointer.size, 12345);
    }

    #[test]
    fn test_parse_ignores_extension_lines() {
        let content = format!(
            "version https://git-lfs.github.com/spec/v1\next-0-foo sha256:{}\n\
             oid sha256:{}\nsize 7\nrandom trailing words\n",
            VALID_OID, VALID_OID
        );
        let pointer = PointerFile::parse(&content).unwrap();
        assert_eq!(pointer.size, 7);
    }

    #[test]
    fn test_parse_with_extra_whitespace() {
        let content = format!(
            "  version https://git-lfs.github.com/spec/v1  \n  oid sha256:{}  \n  size 12345  \n",
            VALID_OID
        );

        let pointer = PointerFile::parse(&content).unwrap();
        assert_eq!(pointer.oid, oid());
    }

    #[test]
    fn test_parse_missing_oid() {
        let content = "version https://git-lfs.github.com/spec/v1\nsize 12345\n";
        let result = PointerFile::parse(content);
        assert!(matches!(result, Err(GitError::MissingPointerField(f)) if f == "oid"));
    }

    #[test]
    fn test_parse_missing_size() {
        let content = format!(
            "version https://git-lfs.github.com/spec/v1\noid sha256:{}\n",
            VALID_OID
        );
        let result = PointerFile::parse(&content);
        assert!(matches!(result, Err(GitError::MissingPointerField(f)) if f == "size"));
    }

    #[test]
    fn test_parse_missing_version() {
        let content = format!("oid sha256:{}\nsize 12345\n", VALID_OID);
        let result = PointerFile::parse(&content);
        assert!(matches!(result, Err(GitError::InvalidPointerFormat(_))));
    }

    #[test]
    fn test_parse_invalid_oid() {
        let content = "version https://git-lfs.github.com/spec/v1\noid invalid\nsize 12345\n";
        assert!(matches!(
            PointerFile::parse(content),
            Err(GitError::InvalidOid(_))
        ));

        let content = "version https://git-lfs.github.com/spec/v1\noid md5:abc\nsize 1\n";
        assert!(matches!(
            PointerFile::parse(content),
            Err(GitError::InvalidOid(_))
        ));
    }

    #[test]
    fn test_parse_invalid_size() {
        let content = format!(
            "version https://git-lfs.github.com/spec/v1\noid sha256:{}\nsize notanumber\n",
            VALID_OID
        );
        let result = PointerFile::parse(&content);
        assert!(matches!(result, Err(GitError::PointerParse(_))));
    }

    #[test]
    fn test_is_pointer() {
        let content = PointerFile::new(oid(), 1).to_bytes();
        assert!(PointerFile::is_pointer(&content));
        assert!(PointerFile::is_pointer(
            b"version https://hawser.github.com/spec/v1\noid sha256:x\nsize 1\n"
        ));
        assert!(!PointerFile::is_pointer(b"This is just regular file content"));
    }

    #[test]
    fn test_is_pointer_too_large() {
        let mut content = b"version https://git-lfs.github.com/spec/v1\n".to_vec();
        content.extend(std::iter::repeat(b'x').take(MAX_POINTER_SIZE));
        assert!(!PointerFile::is_pointer(&content));
    }

    #[test]
    fn test_roundtrip() {
        let original = PointerFile::new(oid(), 12345);
        let parsed = PointerFile::parse(&original.to_string()).unwrap();
        assert_eq!(original, parsed);
    }
}
