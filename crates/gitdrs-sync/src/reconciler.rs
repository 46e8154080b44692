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

//! Push and pull reconciliation keyed by content hash.
//!
//! Matching is by `(scope, sha256)` only, so renames and copies never
//! cause new registrations, and an object reachable from several refs is
//! looked up once. Per-object failures are collected in the reports;
//! only configuration and repository errors abort a run.

use crate::context::SyncContext;
use crate::error::{ObjectError, SyncError, SyncResult};
use crate::plan::{
    DeleteReport, PullOutcome, PullReport, PushReport, SyncPlan, Unresolvable, UploadReport,
    UploadRequest,
};
use futures::stream::{self, StreamExt};
use gitdrs_git::{ContentObject, Inventory, InventoryScanner, Oid};
use gitdrs_storage::{DirectoryResult, ObjectDirectory, ProgressFn, ProjectScope, RemoteRecord};
use glob::Pattern;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Record for an object and whether this call created it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub record: RemoteRecord,
    pub created: bool,
}

/// Remote and local state of one object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    pub oid: Oid,
    pub record: Option<RemoteRecord>,
    pub present: bool,
}

/// Reconciler bound to one remote for its lifetime
#[derive(Debug, Clone)]
pub struct Reconciler {
    ctx: Arc<SyncContext>,
    remote: String,
    directory: Arc<dyn ObjectDirectory>,
}

impl Reconciler {
    /// Resolve the remote (explicit name, else the configured default) and
    /// open its directory client. Configuration errors are fatal here.
    pub async fn connect(ctx: Arc<SyncContext>, remote: Option<&str>) -> SyncResult<Self> {
        let remote = match remote {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => ctx.remotes.default_remote()?,
        };
        let directory = ctx.remotes.remote_client(&remote).await?;
        info!(remote = %remote, scope = %directory.project_scope(), "connected to remote");
        Ok(Reconciler {
            ctx,
            remote,
            directory,
        })
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    pub fn directory(&self) -> &Arc<dyn ObjectDirectory> {
        &self.directory
    }

    pub fn scope(&self) -> &ProjectScope {
        self.directory.project_scope()
    }

    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    fn scan<S: AsRef<str>>(&self, refs: &[S]) -> SyncResult<Inventory> {
        let scanner =
            InventoryScanner::open(&self.ctx.repo_root)?.with_store(self.ctx.store.clone());
        let inventory = scanner.scan(refs)?;
        debug!(
            objects = inventory.len(),
            skipped = inventory.skipped.len(),
            "inventory scanned"
        );
        Ok(inventory)
    }

    async fn lookup(
        &self,
        object: ContentObject,
    ) -> (ContentObject, DirectoryResult<Option<RemoteRecord>>) {
        let result = self.directory.resolve_by_hash(self.scope(), &object.oid).await;
        (object, result)
    }

    async fn lookup_all(
        &self,
        objects: Vec<ContentObject>,
    ) -> Vec<(ContentObject, DirectoryResult<Option<RemoteRecord>>)> {
        stream::iter(objects)
            .map(|object| self.lookup(object))
            .buffer_unordered(self.ctx.concurrency.max(1))
            .collect()
            .await
    }

    /// Decide what a push of `refs` (default `HEAD`) has to register
    pub async fn plan_push<S: AsRef<str>>(&self, refs: &[S]) -> SyncResult<SyncPlan> {
        let inventory = self.scan(refs)?;
        let mut plan = SyncPlan::default();

        for (object, result) in self.lookup_all(inventory.objects).await {
            match result {
                Ok(Some(_)) => plan.already_satisfied.push(object),
                Ok(None) if !object.present => {
                    warn!(
                        oid = %object.oid,
                        path = %object.display_name(),
                        "content not present locally; cannot register"
                    );
                    plan.unresolvable.push(Unresolvable {
                        object,
                        reason: "content not present locally".to_string(),
                    });
                }
                Ok(None) => plan.to_register.push(object),
                Err(e) => {
                    warn!(oid = %object.oid, "lookup failed: {}", e);
                    plan.failed.push((object.oid, e.into()));
                }
            }
        }
        plan.sort();
        Ok(plan)
    }

    /// Register every locally held object that has no record in scope
    ///
    /// Already registered objects cause no writes. Uploads are queued in
    /// the report for newly registered objects only; see
    /// [`upload_pending`](Self::upload_pending).
    pub async fn push<S: AsRef<str>>(&self, refs: &[S]) -> SyncResult<PushReport> {
        let plan = self.plan_push(refs).await?;
        let results: Vec<_> = stream::iter(plan.to_register.iter())
            .map(|object| async move { (object, self.register_object(object).await) })
            .buffer_unordered(self.ctx.concurrency.max(1))
            .collect()
            .await;

        let mut report = PushReport::default();
        for (object, result) in results {
            match result {
                Ok(record) => {
                    report.uploads.push(UploadRequest {
                        oid: object.oid,
                        path: self.ctx.store.object_path(&object.oid),
                        size: object.size,
                        record: record.clone(),
                    });
                    report.registered.push(record);
                }
                Err(e) => {
                    warn!(oid = %object.oid, "registration failed: {}", e);
                    report.failed.push((object.oid, e));
                }
            }
        }
        report.registered.sort_by(|a, b| a.id.cmp(&b.id));
        report.uploads.sort_by_key(|u| u.oid);
        report.failed.sort_by_key(|(oid, _)| *oid);
        report.plan = plan;

        info!(
            remote = %self.remote,
            registered = report.registered.len(),
            satisfied = report.plan.already_satisfied.len(),
            unresolvable = report.plan.unresolvable.len(),
            failed = report.failed.len() + report.plan.failed.len(),
            "push reconciled"
        );
        Ok(report)
    }

    async fn register_object(&self, object: &ContentObject) -> Result<RemoteRecord, ObjectError> {
        let candidate = self
            .directory
            .candidate(object.oid, object.size, &object.display_name());
        self.register_candidate(&candidate).await
    }

    async fn register_candidate(
        &self,
        candidate: &gitdrs_storage::RecordCandidate,
    ) -> Result<RemoteRecord, ObjectError> {
        match self.directory.register(candidate).await {
            Ok(record) => {
                debug!(oid = %candidate.sha256, id = %record.id, "registered");
                Ok(record)
            }
            Err(e) if e.is_already_exists() => {
                debug!(oid = %candidate.sha256, "registered concurrently; re-resolving");
                self.directory
                    .resolve_by_hash(self.scope(), &candidate.sha256)
                    .await?
                    .ok_or_else(|| {
                        ObjectError::remote(format!(
                            "record for {} reported as existing but not found in {}",
                            candidate.sha256,
                            self.scope()
                        ))
                    })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Send the bytes queued by [`push`](Self::push), skipping records the
    /// remote already holds content for
    pub async fn upload_pending(&self, report: &PushReport) -> UploadReport {
        let results: Vec<_> = stream::iter(report.uploads.iter())
            .map(|upload| async move {
                let result = self.upload_record(&upload.record, &upload.path).await;
                (upload.oid, result)
            })
            .buffer_unordered(self.ctx.concurrency.max(1))
            .collect()
            .await;

        let mut out = UploadReport::default();
        for (oid, result) in results {
            match result {
                Ok(true) => out.uploaded.push(oid),
                Ok(false) => out.skipped.push(oid),
                Err(e) => {
                    warn!(oid = %oid, "upload failed: {}", e);
                    out.failed.push((oid, e));
                }
            }
        }
        out.uploaded.sort();
        out.skipped.sort();
        out.failed.sort_by_key(|(oid, _)| *oid);
        out
    }

    /// Upload unless the remote has the bytes; `Ok(true)` when bytes were sent
    async fn upload_record(&self, record: &RemoteRecord, path: &Path) -> Result<bool, ObjectError> {
        if self.directory.has_content(record).await? {
            debug!(id = %record.id, "remote already holds content");
            return Ok(false);
        }
        self.directory.upload(record, path).await?;
        Ok(true)
    }

    /// Make sure a record exists for one object, registering it if needed
    pub async fn ensure_registered(
        &self,
        oid: Oid,
        size: u64,
        name: &str,
    ) -> Result<Registration, ObjectError> {
        if let Some(record) = self.directory.resolve_by_hash(self.scope(), &oid).await? {
            return Ok(Registration {
                record,
                created: false,
            });
        }
        let candidate = self.directory.candidate(oid, size, name);
        let record = self.register_candidate(&candidate).await?;
        Ok(Registration {
            record,
            created: true,
        })
    }

    /// Register bytes already stored at `storage_url` without sending any
    ///
    /// A record already in scope is reused when its size agrees.
    pub async fn register_external(
        &self,
        oid: Oid,
        size: u64,
        name: &str,
        storage_url: &str,
    ) -> Result<Registration, ObjectError> {
        if let Some(record) = self.find_record(&oid).await? {
            if record.size != size {
                return Err(ObjectError::integrity(format!(
                    "record {} already registers {} with {} bytes, not {}",
                    record.id, oid, record.size, size
                )));
            }
            debug!(oid = %oid, id = %record.id, "external object already registered");
            return Ok(Registration {
                record,
                created: false,
            });
        }
        let mut candidate = self.directory.candidate(oid, size, name);
        candidate.storage_url = storage_url.to_string();
        let record = self.register_candidate(&candidate).await?;
        info!(oid = %oid, id = %record.id, url = %storage_url, "registered external object");
        Ok(Registration {
            record,
            created: true,
        })
    }

    /// Register and upload one local object
    ///
    /// `path` must hold exactly `size` bytes.
    pub async fn upload_object(
        &self,
        oid: Oid,
        path: &Path,
        size: u64,
    ) -> Result<Registration, ObjectError> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| ObjectError::local(format!("{}: {}", path.display(), e)))?;
        if meta.len() != size {
            return Err(ObjectError::local(format!(
                "{} holds {} bytes, expected {}",
                path.display(),
                meta.len(),
                size
            )));
        }
        let registration = self.ensure_registered(oid, size, &oid.to_hex()).await?;
        self.upload_record(&registration.record, path).await?;
        Ok(registration)
    }

    /// Decide what a pull has to fetch
    ///
    /// With filters, only objects having at least one tracked path selected
    /// by a filter are considered.
    pub async fn plan_pull<S: AsRef<str>>(
        &self,
        refs: &[S],
        filters: &[Pattern],
    ) -> SyncResult<SyncPlan> {
        let inventory = self.scan(refs)?;
        let mut plan = SyncPlan::default();
        let mut absent = Vec::new();

        for object in inventory.objects {
            if !filters.is_empty() && !object.any_path(|p| path_selected(filters, p)) {
                continue;
            }
            if object.present {
                plan.already_satisfied.push(object);
            } else {
                absent.push(object);
            }
        }

        for (object, result) in self.lookup_all(absent).await {
            match result {
                Ok(Some(record)) => plan.to_fetch.push((object, record)),
                Ok(None) => {
                    warn!(oid = %object.oid, path = %object.display_name(), "no record in scope");
                    let reason = format!("no record for {} in {}", object.oid, self.scope());
                    plan.unresolvable.push(Unresolvable { object, reason });
                }
                Err(e) => {
                    warn!(oid = %object.oid, "lookup failed: {}", e);
                    plan.failed.push((object.oid, e.into()));
                }
            }
        }
        plan.sort();
        Ok(plan)
    }

    /// Materialize every selected object that is absent locally
    pub async fn pull<S: AsRef<str>>(
        &self,
        refs: &[S],
        filters: &[Pattern],
    ) -> SyncResult<PullReport> {
        let plan = self.plan_pull(refs, filters).await?;
        let mut outcomes: Vec<(Oid, PullOutcome)> = Vec::with_capacity(plan.len());

        outcomes.extend(
            plan.already_satisfied
                .iter()
                .map(|o| (o.oid, PullOutcome::AlreadyPresent)),
        );
        outcomes.extend(
            plan.unresolvable
                .iter()
                .map(|u| (u.object.oid, PullOutcome::Unresolvable(u.reason.clone()))),
        );
        outcomes.extend(
            plan.failed
                .iter()
                .map(|(oid, e)| (*oid, PullOutcome::Failed(e.clone()))),
        );

        let fetched: Vec<_> = stream::iter(plan.to_fetch.iter())
            .map(|(object, record)| async move {
                let result = self.fetch_record(object.oid, object.size, record, None).await;
                (object.oid, result)
            })
            .buffer_unordered(self.ctx.concurrency.max(1))
            .collect()
            .await;
        for (oid, result) in fetched {
            let outcome = match result {
                Ok(path) => PullOutcome::Materialized(path),
                Err(e) => {
                    warn!(oid = %oid, "download failed: {}", e);
                    PullOutcome::Failed(e)
                }
            };
            outcomes.push((oid, outcome));
        }
        outcomes.sort_by_key(|(oid, _)| *oid);

        let report = PullReport { outcomes };
        info!(
            remote = %self.remote,
            materialized = report.materialized(),
            present = report.already_present(),
            unresolvable = report.unresolvable(),
            failed = report.failed(),
            "pull reconciled"
        );
        Ok(report)
    }

    /// Make one object present locally, downloading it if needed
    pub async fn materialize(
        &self,
        oid: Oid,
        size: u64,
        progress: Option<ProgressFn>,
    ) -> Result<PathBuf, ObjectError> {
        if self.ctx.store.contains(&oid, size) {
            return Ok(self.ctx.store.object_path(&oid));
        }
        let record = self
            .directory
            .resolve_by_hash(self.scope(), &oid)
            .await?
            .ok_or_else(|| self.missing_record(&oid))?;
        self.fetch_record(oid, size, &record, progress).await
    }

    /// Make `oid` present locally, sized by its record
    pub async fn download(&self, oid: &Oid) -> Result<PathBuf, ObjectError> {
        let record = self
            .find_record(oid)
            .await?
            .ok_or_else(|| self.missing_record(oid))?;
        if self.ctx.store.contains(oid, record.size) {
            return Ok(self.ctx.store.object_path(oid));
        }
        self.fetch_record(*oid, record.size, &record, None).await
    }

    /// Download, verify and install. The temp file is discarded on any
    /// failure and never reaches the object directory unverified.
    async fn fetch_record(
        &self,
        oid: Oid,
        size: u64,
        record: &RemoteRecord,
        progress: Option<ProgressFn>,
    ) -> Result<PathBuf, ObjectError> {
        let store = &self.ctx.store;
        let descriptor = self.directory.fetch_descriptor(record).await?;
        store.ensure_tmp_dir().await?;
        let temp = store.temp_path(&oid);

        let fetched = match self.ctx.fetcher.fetch(&descriptor, &temp, progress).await {
            Ok(fetched) => fetched,
            Err(e) => {
                store.discard(&temp).await;
                return Err(e.into());
            }
        };

        if fetched.sha256 != oid || fetched.size != size {
            store.discard(&temp).await;
            return Err(ObjectError::integrity(format!(
                "downloaded {} bytes hashing to {}, expected {} bytes hashing to {}",
                fetched.size, fetched.sha256, size, oid
            )));
        }

        match store.install(&temp, &oid).await {
            Ok(path) => {
                debug!(oid = %oid, id = %record.id, "materialized");
                Ok(path)
            }
            Err(e) => {
                store.discard(&temp).await;
                Err(e.into())
            }
        }
    }

    /// Delete every record in this remote's scope
    ///
    /// Deletions run concurrently; one failure does not stop the others.
    pub async fn delete_scope(&self) -> Result<DeleteReport, ObjectError> {
        let records = self.list_records().await?;
        let results: Vec<_> = stream::iter(records.iter())
            .map(|record| async move { (&record.id, self.directory.delete(&record.id).await) })
            .buffer_unordered(self.ctx.concurrency.max(1))
            .collect()
            .await;

        let mut report = DeleteReport::default();
        for (id, result) in results {
            match result {
                Ok(()) => report.deleted.push(id.clone()),
                Err(e) => {
                    warn!(id = %id, "delete failed: {}", e);
                    report.failed.push((id.clone(), e.into()));
                }
            }
        }
        report.deleted.sort();
        report.failed.sort_by(|a, b| a.0.cmp(&b.0));
        info!(
            remote = %self.remote,
            scope = %self.scope(),
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "scope cleared"
        );
        Ok(report)
    }

    fn missing_record(&self, oid: &Oid) -> ObjectError {
        ObjectError::not_found(format!("no record for {} in {}", oid, self.scope()))
    }

    /// Record registered for `oid` in this remote's scope
    pub async fn find_record(&self, oid: &Oid) -> Result<Option<RemoteRecord>, ObjectError> {
        Ok(self.directory.resolve_by_hash(self.scope(), oid).await?)
    }

    /// Remote record and local presence of one object
    pub async fn query(&self, oid: &Oid) -> Result<QueryResult, ObjectError> {
        let record = self.find_record(oid).await?;
        let present = self.ctx.store.object_path(oid).is_file();
        Ok(QueryResult {
            oid: *oid,
            record,
            present,
        })
    }

    /// Every record registered in this remote's scope
    pub async fn list_records(&self) -> Result<Vec<RemoteRecord>, ObjectError> {
        let records = self.directory.list_records(self.scope()).await?;
        debug!(remote = %self.remote, count = records.len(), "listed records");
        Ok(records)
    }

    /// Administrative delete of the record for `oid` in this scope
    pub async fn delete(&self, oid: &Oid) -> Result<RemoteRecord, ObjectError> {
        let record = self
            .find_record(oid)
            .await?
            .ok_or_else(|| self.missing_record(oid))?;
        self.directory.delete(&record.id).await?;
        info!(oid = %oid, id = %record.id, "record deleted");
        Ok(record)
    }
}

/// Compile path filters for [`Reconciler::pull`]
pub fn parse_filters<S: AsRef<str>>(patterns: &[S]) -> SyncResult<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p.as_ref()).map_err(|e| SyncError::InvalidFilter {
                pattern: p.as_ref().to_string(),
                reason: e.msg.to_string(),
            })
        })
        .collect()
}

/// A filter selects a path it matches, or any path under a directory it names
fn path_selected(filters: &[Pattern], path: &str) -> bool {
    filters.iter().any(|f| {
        if f.matches(path) {
            return true;
        }
        let dir = f.as_str().trim_end_matches('/');
        !dir.is_empty() && path.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/'))
    })
}
