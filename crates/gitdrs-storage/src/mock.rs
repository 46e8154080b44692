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

//! In-memory mock directory for testing
//!
//! [`MockDirectory`] keeps records and content in `Arc<RwLock<HashMap>>`,
//! counts calls per operation and can be told to fail specific objects.
//! [`MockFetcher`] downloads from the same in-memory content through
//! `mock://<id>` descriptors.

use crate::fetch::{write_all_hashed, Fetched, Fetcher, ProgressFn};
use crate::{
    DirectoryError, DirectoryResult, FetchDescriptor, ObjectDirectory, ProjectScope,
    RecordCandidate, RemoteRecord,
};
use async_trait::async_trait;
use gitdrs_git::Oid;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

const MOCK_SCHEME: &str = "mock://";

#[derive(Default)]
struct MockState {
    records: HashMap<String, RemoteRecord>,
    content: HashMap<String, Vec<u8>>,
    fail_resolve: HashSet<Oid>,
    fail_register: HashSet<Oid>,
    fail_upload: HashSet<Oid>,
    conflict_on_register: HashSet<Oid>,
    corrupt: HashSet<Oid>,
}

#[derive(Default)]
struct Counters {
    resolve: AtomicUsize,
    register: AtomicUsize,
    upload: AtomicUsize,
    delete: AtomicUsize,
    fetch: AtomicUsize,
}

/// In-memory directory backend
///
/// Clones share state, so a test can keep a handle while the reconciler
/// owns another.
#[derive(Clone)]
pub struct MockDirectory {
    scope: ProjectScope,
    bucket: String,
    assign_ids: bool,
    state: Arc<RwLock<MockState>>,
    counters: Arc<Counters>,
}

impl MockDirectory {
    pub fn new(scope: ProjectScope, bucket: impl Into<String>) -> Self {
        MockDirectory {
            scope,
            bucket: bucket.into(),
            assign_ids: false,
            state: Arc::new(RwLock::new(MockState::default())),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Replace client-proposed ids with server-assigned ones on register
    pub fn with_assigned_ids(mut self) -> Self {
        self.assign_ids = true;
        self
    }

    /// Seed a registered record with stored content
    pub async fn insert(&self, name: &str, content: &[u8]) -> RemoteRecord {
        self.insert_in_scope(&self.scope.clone(), name, content).await
    }

    /// Seed a record under a different scope
    pub async fn insert_in_scope(
        &self,
        scope: &ProjectScope,
        name: &str,
        content: &[u8],
    ) -> RemoteRecord {
        let oid = Oid::hash(content);
        let mut candidate = self.candidate(oid, content.len() as u64, name);
        candidate.scope = scope.clone();
        let record = RemoteRecord::from_candidate(&candidate);
        let mut state = self.state.write().await;
        state.content.insert(record.id.clone(), content.to_vec());
        state.records.insert(record.id.clone(), record.clone());
        record
    }

    /// Seed a record whose content was never uploaded
    pub async fn insert_record_only(&self, oid: Oid, size: u64, name: &str) -> RemoteRecord {
        let record = RemoteRecord::from_candidate(&self.candidate(oid, size, name));
        self.state
            .write()
            .await
            .records
            .insert(record.id.clone(), record.clone());
        record
    }

    pub async fn fail_resolve(&self, oid: Oid) {
        self.state.write().await.fail_resolve.insert(oid);
    }

    pub async fn fail_register(&self, oid: Oid) {
        self.state.write().await.fail_register.insert(oid);
    }

    pub async fn fail_upload(&self, oid: Oid) {
        self.state.write().await.fail_upload.insert(oid);
    }

    /// Simulate a concurrent pusher: the record appears and register
    /// reports `AlreadyExists`
    pub async fn conflict_on_register(&self, oid: Oid) {
        self.state.write().await.conflict_on_register.insert(oid);
    }

    /// Serve flipped bytes for `oid` from the fetcher
    pub async fn corrupt(&self, oid: Oid) {
        self.state.write().await.corrupt.insert(oid);
    }

    pub fn resolve_calls(&self) -> usize {
        self.counters.resolve.load(Ordering::SeqCst)
    }

    pub fn register_calls(&self) -> usize {
        self.counters.register.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.counters.upload.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.counters.delete.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.counters.fetch.load(Ordering::SeqCst)
    }

    /// All records, sorted by id
    pub async fn records(&self) -> Vec<RemoteRecord> {
        let mut records: Vec<_> = self.state.read().await.records.values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    /// Uploaded content for a record id
    pub async fn content(&self, id: &str) -> Option<Vec<u8>> {
        self.state.read().await.content.get(id).cloned()
    }

    /// Fetcher reading from this directory's content
    pub fn fetcher(&self) -> MockFetcher {
        MockFetcher {
            directory: self.clone(),
        }
    }
}

impl fmt::Debug for MockDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockDirectory")
            .field("scope", &self.scope)
            .field("bucket", &self.bucket)
            .finish()
    }
}

#[async_trait]
impl ObjectDirectory for MockDirectory {
    fn project_scope(&self) -> &ProjectScope {
        &self.scope
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn resolve_by_hash(
        &self,
        scope: &ProjectScope,
        sha256: &Oid,
    ) -> DirectoryResult<Option<RemoteRecord>> {
        self.counters.resolve.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read().await;
        if state.fail_resolve.contains(sha256) {
            return Err(DirectoryError::backend(format!("injected resolve failure for {}", sha256)));
        }
        let mut matches: Vec<_> = state
            .records
            .values()
            .filter(|r| r.sha256().as_ref() == Some(sha256) && r.in_scope(scope))
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches.first().map(|r| (*r).clone()))
    }

    async fn register(&self, candidate: &RecordCandidate) -> DirectoryResult<RemoteRecord> {
        self.counters.register.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.write().await;
        if state.fail_register.contains(&candidate.sha256) {
            return Err(DirectoryError::backend(format!(
                "injected register failure for {}",
                candidate.sha256
            )));
        }

        let mut record = RemoteRecord::from_candidate(candidate);
        if self.assign_ids {
            record.id = format!("dg.MOCK/{}", uuid::Uuid::new_v4());
        }

        if state.conflict_on_register.remove(&candidate.sha256) {
            state.records.insert(record.id.clone(), record);
            return Err(DirectoryError::already_exists(candidate.sha256.to_string()));
        }
        if state.records.contains_key(&record.id) {
            return Err(DirectoryError::already_exists(record.id));
        }
        state.records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn delete(&self, id: &str) -> DirectoryResult<()> {
        self.counters.delete.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.write().await;
        state.content.remove(id);
        state
            .records
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DirectoryError::not_found(id))
    }

    async fn list_records(&self, scope: &ProjectScope) -> DirectoryResult<Vec<RemoteRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<_> = state
            .records
            .values()
            .filter(|r| r.in_scope(scope))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    async fn fetch_descriptor(&self, record: &RemoteRecord) -> DirectoryResult<FetchDescriptor> {
        let state = self.state.read().await;
        if !state.records.contains_key(&record.id) {
            return Err(DirectoryError::not_found(&record.id));
        }
        Ok(FetchDescriptor::new(format!("{}{}", MOCK_SCHEME, record.id)))
    }

    async fn upload(&self, record: &RemoteRecord, path: &Path) -> DirectoryResult<()> {
        self.counters.upload.fetch_add(1, Ordering::SeqCst);
        let data = tokio::fs::read(path).await?;
        let mut state = self.state.write().await;
        if record.sha256().is_some_and(|oid| state.fail_upload.contains(&oid)) {
            return Err(DirectoryError::backend(format!(
                "injected upload failure for {}",
                record.id
            )));
        }
        state.content.insert(record.id.clone(), data);
        Ok(())
    }

    async fn has_content(&self, record: &RemoteRecord) -> DirectoryResult<bool> {
        Ok(self.state.read().await.content.contains_key(&record.id))
    }
}

/// Fetcher serving `mock://<id>` descriptors from a [`MockDirectory`]
#[derive(Debug, Clone)]
pub struct MockFetcher {
    directory: MockDirectory,
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(
        &self,
        descriptor: &FetchDescriptor,
        dest: &Path,
        progress: Option<ProgressFn>,
    ) -> DirectoryResult<Fetched> {
        self.directory.counters.fetch.fetch_add(1, Ordering::SeqCst);
        let id = descriptor
            .url
            .strip_prefix(MOCK_SCHEME)
            .ok_or_else(|| {
                DirectoryError::invalid_response(format!("not a mock url: {}", descriptor.url))
            })?;

        let state = self.directory.state.read().await;
        let mut data = state
            .content
            .get(id)
            .cloned()
            .ok_or_else(|| DirectoryError::not_found(id))?;
        let corrupt = state
            .records
            .get(id)
            .and_then(RemoteRecord::sha256)
            .is_some_and(|oid| state.corrupt.contains(&oid));
        drop(state);

        if corrupt {
            if let Some(first) = data.first_mut() {
                *first ^= 0xff;
            } else {
                data.push(0);
            }
        }
        write_all_hashed(dest, &data, progress).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> ProjectScope {
        ProjectScope::new("/programs/p/projects/x")
    }

    #[tokio::test]
    async fn test_register_then_resolve() {
        let dir = MockDirectory::new(scope(), "b");
        let oid = Oid::hash(b"hello");
        let record = dir.register(&dir.candidate(oid, 5, "hello.txt")).await.unwrap();

        let found = dir.resolve_by_hash(&scope(), &oid).await.unwrap().unwrap();
        assert_eq!(found.id, record.id);
        assert_eq!(dir.register_calls(), 1);
        assert_eq!(dir.resolve_calls(), 1);
    }

    #[tokio::test]
    async fn test_resolve_ignores_other_scopes() {
        let dir = MockDirectory::new(scope(), "b");
        let other = ProjectScope::new("/programs/p/projects/y");
        dir.insert_in_scope(&other, "a", b"abc").await;

        let found = dir.resolve_by_hash(&scope(), &Oid::hash(b"abc")).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_conflict_leaves_record_behind() {
        let dir = MockDirectory::new(scope(), "b");
        let oid = Oid::hash(b"race");
        dir.conflict_on_register(oid).await;

        let err = dir.register(&dir.candidate(oid, 4, "r")).await.unwrap_err();
        assert!(err.is_already_exists());
        assert!(dir.resolve_by_hash(&scope(), &oid).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_assigned_ids_override_proposal() {
        let dir = MockDirectory::new(scope(), "b").with_assigned_ids();
        let candidate = dir.candidate(Oid::hash(b"z"), 1, "z");
        let record = dir.register(&candidate).await.unwrap();
        assert_ne!(record.id, candidate.proposed_id);
        assert!(record.id.starts_with("dg.MOCK/"));
    }

    #[tokio::test]
    async fn test_fetcher_reads_uploaded_content() {
        let dir = MockDirectory::new(scope(), "b");
        let record = dir.insert("f", b"payload").await;
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("out");

        let descriptor = dir.fetch_descriptor(&record).await.unwrap();
        let fetched = dir.fetcher().fetch(&descriptor, &dest, None).await.unwrap();
        assert_eq!(fetched.sha256, Oid::hash(b"payload"));
        assert_eq!(fetched.size, 7);
        assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_list_records_only_in_scope() {
        let dir = MockDirectory::new(scope(), "b");
        let other = ProjectScope::new("/programs/p/projects/y");
        let a = dir.insert("a", b"first").await;
        let b = dir.insert_record_only(Oid::hash(b"second"), 6, "b").await;
        dir.insert_in_scope(&other, "c", b"third").await;

        let listed = dir.list_records(&scope()).await.unwrap();
        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(listed.into_iter().map(|r| r.id).collect::<Vec<_>>(), expected);
    }

    #[tokio::test]
    async fn test_delete_record_without_content() {
        let dir = MockDirectory::new(scope(), "b");
        let oid = Oid::hash(b"never uploaded");
        let record = dir.insert_record_only(oid, 14, "n").await;
        assert!(dir.content(&record.id).await.is_none());

        dir.delete(&record.id).await.unwrap();
        assert!(dir.resolve_by_hash(&scope(), &oid).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_unknown_is_not_found() {
        let dir = MockDirectory::new(scope(), "b");
        assert!(dir.delete("nope").await.unwrap_err().is_not_found());
        assert_eq!(dir.delete_calls(), 1);
    }
}
