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

//! Decisions and outcomes of one push or pull run. Nothing here is persisted.

use crate::error::ObjectError;
use gitdrs_git::{ContentObject, Oid};
use gitdrs_storage::RemoteRecord;
use std::path::PathBuf;

/// An object that cannot be acted on, with the reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolvable {
    pub object: ContentObject,
    pub reason: String,
}

/// Per-object decisions for one run
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    /// Present locally, no record in scope: register (push)
    pub to_register: Vec<ContentObject>,

    /// Absent locally, record found: download (pull)
    pub to_fetch: Vec<(ContentObject, RemoteRecord)>,

    /// Nothing to do: already registered (push) or already present (pull)
    pub already_satisfied: Vec<ContentObject>,

    pub unresolvable: Vec<Unresolvable>,

    /// Objects whose remote lookup failed
    pub failed: Vec<(Oid, ObjectError)>,
}

impl SyncPlan {
    /// Number of objects the plan covers
    pub fn len(&self) -> usize {
        self.to_register.len()
            + self.to_fetch.len()
            + self.already_satisfied.len()
            + self.unresolvable.len()
            + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn sort(&mut self) {
        self.to_register.sort_by_key(|o| o.oid);
        self.to_fetch.sort_by_key(|(o, _)| o.oid);
        self.already_satisfied.sort_by_key(|o| o.oid);
        self.unresolvable.sort_by_key(|u| u.object.oid);
        self.failed.sort_by_key(|(oid, _)| *oid);
    }
}

/// Bytes that must be sent after registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub oid: Oid,
    pub path: PathBuf,
    pub size: u64,
    pub record: RemoteRecord,
}

/// Result of [`Reconciler::push`](crate::Reconciler::push)
#[derive(Debug, Clone, Default)]
pub struct PushReport {
    pub plan: SyncPlan,
    pub registered: Vec<RemoteRecord>,
    pub failed: Vec<(Oid, ObjectError)>,
    /// Uploads queued for newly registered objects only
    pub uploads: Vec<UploadRequest>,
}

impl PushReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty() || !self.plan.failed.is_empty()
    }

    /// Every per-object failure, lookup and registration alike
    pub fn failures(&self) -> impl Iterator<Item = &(Oid, ObjectError)> {
        self.plan.failed.iter().chain(self.failed.iter())
    }
}

/// Result of [`Reconciler::upload_pending`](crate::Reconciler::upload_pending)
#[derive(Debug, Clone, Default)]
pub struct UploadReport {
    pub uploaded: Vec<Oid>,
    /// The remote already held the bytes
    pub skipped: Vec<Oid>,
    pub failed: Vec<(Oid, ObjectError)>,
}

/// Result of [`Reconciler::delete_scope`](crate::Reconciler::delete_scope), by record id
#[derive(Debug, Clone, Default)]
pub struct DeleteReport {
    pub deleted: Vec<String>,
    pub failed: Vec<(String, ObjectError)>,
}

/// What happened to one object during pull
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// Downloaded, verified and installed at the path
    Materialized(PathBuf),
    AlreadyPresent,
    Unresolvable(String),
    Failed(ObjectError),
}

/// Result of [`Reconciler::pull`](crate::Reconciler::pull), sorted by oid
#[derive(Debug, Clone, Default)]
pub struct PullReport {
    pub outcomes: Vec<(Oid, PullOutcome)>,
}

impl PullReport {
    pub fn outcome(&self, oid: &Oid) -> Option<&PullOutcome> {
        self.outcomes
            .binary_search_by(|(o, _)| o.cmp(oid))
            .ok()
            .map(|i| &self.outcomes[i].1)
    }

    pub fn materialized(&self) -> usize {
        self.count(|o| matches!(o, PullOutcome::Materialized(_)))
    }

    pub fn already_present(&self) -> usize {
        self.count(|o| matches!(o, PullOutcome::AlreadyPresent))
    }

    pub fn unresolvable(&self) -> usize {
        self.count(|o| matches!(o, PullOutcome::Unresolvable(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, PullOutcome::Failed(_)))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0 || self.unresolvable() > 0
    }

    fn count(&self, f: impl Fn(&PullOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| f(o)).count()
    }
}
