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

//! Remote object directory abstraction for git-drs
//!
//! A directory maps content hashes to remote records inside a project
//! scope and hands out download locations for them. Backends:
//! - Registry-backed data commons (indexd + GA4GH DRS, signed-URL bucket)
//! - Plain S3-compatible object stores (records stored next to the data)
//! - Local DRS server without authentication
//!
//! # Architecture
//!
//! The [`ObjectDirectory`] trait is the only surface the reconciler sees.
//! Transport details (HTTP routes, SDK calls, credentials) stay inside
//! each backend. Downloading bytes is a separate concern handled by a
//! [`Fetcher`](fetch::Fetcher), so the same descriptor can be streamed
//! over HTTP or handed to an external download tool.
//!
//! ## Core Concepts
//!
//! - **Scope**: authorization path a record is registered under
//! - **Record**: remote metadata for one content hash (id, size, checksums,
//!   access methods)
//! - **Candidate**: a record proposed by the client during push; the id it
//!   carries is a suggestion and callers must use the id the backend returns
//!
//! # Examples
//!
//! ```no_run
//! use gitdrs_git::Oid;
//! use gitdrs_storage::{mock::MockDirectory, ObjectDirectory, ProjectScope};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let dir = MockDirectory::new(ProjectScope::new("/programs/p/projects/x"), "bucket");
//!     let oid = Oid::hash(b"0123456789");
//!
//!     let candidate = dir.candidate(oid, 10, "data/a.bin");
//!     let record = dir.register(&candidate).await?;
//!
//!     let found = dir.resolve_by_hash(dir.project_scope(), &oid).await?;
//!     assert_eq!(found.map(|r| r.id), Some(record.id));
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod fetch;
pub mod indexd;
pub mod local;
pub mod mock;
pub mod record;
pub mod s3;

pub use error::{DirectoryError, DirectoryResult};
pub use fetch::{CommandFetcher, Fetched, Fetcher, HttpFetcher, ProgressFn};
pub use indexd::IndexdDirectory;
pub use local::LocalDirectory;
pub use record::{
    AccessMethod, AccessUrl, Authorizations, Checksum, FetchDescriptor, ProjectScope,
    RecordCandidate, RemoteRecord,
};
pub use s3::S3Directory;

use async_trait::async_trait;
use gitdrs_config::RemoteConfig;
use gitdrs_git::Oid;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

/// Capability interface over a remote metadata/storage service
///
/// All implementations must be `Send + Sync` so a single client can be
/// shared by concurrent transfers.
#[async_trait]
pub trait ObjectDirectory: Send + Sync + Debug {
    /// Authorization scope records are registered under
    fn project_scope(&self) -> &ProjectScope;

    /// Bucket receiving object bytes
    fn bucket(&self) -> &str;

    /// Storage location for an object with the given record id
    fn storage_url(&self, id: &str, sha256: &Oid) -> String {
        format!("s3://{}/{}/{}", self.bucket(), id, sha256)
    }

    /// Build a registration candidate with a fresh random id
    fn candidate(&self, sha256: Oid, size: u64, name: &str) -> RecordCandidate {
        let proposed_id = uuid::Uuid::new_v4().to_string();
        RecordCandidate {
            storage_url: self.storage_url(&proposed_id, &sha256),
            proposed_id,
            name: name.to_string(),
            size,
            sha256,
            scope: self.project_scope().clone(),
        }
    }

    /// Find the record for `sha256` registered under `scope`
    ///
    /// # Returns
    ///
    /// * `Ok(Some(record))` - A record in scope exists
    /// * `Ok(None)` - No record in scope; records in other scopes are ignored
    /// * `Err` - The directory could not be queried
    async fn resolve_by_hash(
        &self,
        scope: &ProjectScope,
        sha256: &Oid,
    ) -> DirectoryResult<Option<RemoteRecord>>;

    /// Register a candidate record
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::AlreadyExists`] when an equivalent record was
    /// registered concurrently. Callers treat that as success and re-resolve.
    async fn register(&self, candidate: &RecordCandidate) -> DirectoryResult<RemoteRecord>;

    /// Remove a record by id
    ///
    /// Records whose bytes were never uploaded are removable too.
    async fn delete(&self, id: &str) -> DirectoryResult<()>;

    /// Every record registered under `scope`, sorted by id
    async fn list_records(&self, scope: &ProjectScope) -> DirectoryResult<Vec<RemoteRecord>>;

    /// Download location for a record's bytes
    async fn fetch_descriptor(&self, record: &RemoteRecord) -> DirectoryResult<FetchDescriptor>;

    /// Send the bytes at `path` to the record's storage location
    async fn upload(&self, record: &RemoteRecord, path: &Path) -> DirectoryResult<()>;

    /// Whether the record's bytes are already stored remotely
    ///
    /// Backends that cannot tell cheaply report `false`, which makes the
    /// caller upload.
    async fn has_content(&self, _record: &RemoteRecord) -> DirectoryResult<bool> {
        Ok(false)
    }
}

/// Construct the directory client for a configured remote
pub async fn build_directory(remote: &RemoteConfig) -> DirectoryResult<Arc<dyn ObjectDirectory>> {
    let scope = ProjectScope::from_project_id(remote.project_id())?;
    let directory: Arc<dyn ObjectDirectory> = match remote {
        RemoteConfig::Indexd(cfg) => Arc::new(IndexdDirectory::from_config(cfg, scope)?),
        RemoteConfig::S3(cfg) => Arc::new(S3Directory::from_config(cfg, scope).await?),
        RemoteConfig::Local(cfg) => Arc::new(LocalDirectory::from_config(cfg, scope)?),
    };
    tracing::debug!(kind = remote.kind(), ?directory, "directory client ready");
    Ok(directory)
}
