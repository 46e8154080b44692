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

//! Local large-object store
//!
//! Git LFS keeps object bytes under `.git/lfs/objects` in a two-level
//! sharded layout:
//!
//! ```text
//! .git/lfs/
//!   objects/
//!     4d/
//!       7a/
//!         4d7a214614ab2935c943f9e0ff69d22eadbb8f32b1258daaa5e2ca24d17e2393
//!   tmp/
//!     4d7a2146...-<uuid>.part
//! ```
//!
//! Incoming bytes are always written under `tmp/` first. [`LfsObjectStore::install`]
//! flushes the temp file to disk and renames it into place, so a reader never
//! observes a partially written object.

use crate::error::{GitError, GitResult};
use crate::oid::Oid;
use git2::Repository;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Sharded object directory of one repository
#[derive(Debug, Clone)]
pub struct LfsObjectStore {
    root: PathBuf,
}

impl LfsObjectStore {
    /// Store rooted at an explicit `lfs` directory
    pub fn new(lfs_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: lfs_dir.into(),
        }
    }

    /// Store for an open repository (`<git dir>/lfs`)
    pub fn for_repository(repo: &Repository) -> Self {
        Self::new(repo.path().join("lfs"))
    }

    /// Discover the repository containing `path` and return its store
    pub fn open(path: impl AsRef<Path>) -> GitResult<Self> {
        let path = path.as_ref();
        let repo = Repository::discover(path).map_err(|e| {
            GitError::RepositoryNotFound(format!("{}: {}", path.display(), e))
        })?;
        Ok(Self::for_repository(&repo))
    }

    /// Root `lfs` directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final location of an object
    pub fn object_path(&self, oid: &Oid) -> PathBuf {
        let hex = oid.to_hex();
        self.root
            .join("objects")
            .join(&hex[0..2])
            .join(&hex[2..4])
            .join(&hex)
    }

    /// Directory for in-flight downloads
    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    /// A fresh, unique temp path for bytes of `oid`. Nothing is created yet.
    pub fn temp_path(&self, oid: &Oid) -> PathBuf {
        self.tmp_dir()
            .join(format!("{}-{}.part", oid.to_hex(), uuid::Uuid::new_v4()))
    }

    /// Whether the object is present with the expected size
    pub fn contains(&self, oid: &Oid, size: u64) -> bool {
        match std::fs::metadata(self.object_path(oid)) {
            Ok(meta) => meta.is_file() && meta.len() == size,
            Err(_) => false,
        }
    }

    /// Durably move a verified temp file into its sharded location.
    ///
    /// The temp file is fsynced before the rename; the returned path is the
    /// object's final location.
    pub async fn install(&self, temp: &Path, oid: &Oid) -> GitResult<PathBuf> {
        let file = fs::OpenOptions::new().read(true).write(true).open(temp).await?;
        file.sync_all().await?;
        drop(file);

        let dest = self.object_path(oid);
        self.ensure_parent_dir(&dest).await?;
        fs::rename(temp, &dest).await?;

        debug!(oid = %oid, path = %dest.display(), "object installed");
        Ok(dest)
    }

    /// Remove a temp file that will not be installed. Missing files are fine.
    pub async fn discard(&self, temp: &Path) {
        match fs::remove_file(temp).await {
            Ok(()) => debug!(path = %temp.display(), "discarded temp artifact"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %temp.display(), "failed to discard temp artifact: {}", e)
            }
        }
    }

    /// Create the temp directory if needed and return it
    pub async fn ensure_tmp_dir(&self) -> GitResult<PathBuf> {
        let dir = self.tmp_dir();
        fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    async fn ensure_parent_dir(&self, path: &Path) -> GitResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}
