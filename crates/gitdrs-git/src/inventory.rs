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

//! Content inventory
//!
//! Enumerates the large objects referenced by a set of refs by reading
//! pointer blobs straight from the object database. Nothing is checked out
//! and nothing is written.
//!
//! The result is keyed by content hash: a file copied, renamed, or present on
//! several branches yields one [`ContentObject`] carrying every
//! [`TrackedFile`] that points at it.

use crate::error::{GitError, GitResult};
use crate::oid::Oid;
use crate::pointer::{PointerFile, MAX_POINTER_SIZE};
use crate::store::LfsObjectStore;
use git2::{ErrorCode, ObjectType, Repository, TreeWalkMode, TreeWalkResult};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, warn};

/// Ref scanned when the caller names none
pub const DEFAULT_REF: &str = "HEAD";

/// A repository path at a ref, pointing at one content object
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TrackedFile {
    /// Path relative to the repository root, `/`-separated
    pub path: String,

    /// Ref the path was found under, as given by the caller
    pub git_ref: String,
}

/// One large object, identified only by its hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentObject {
    pub oid: Oid,
    pub size: u64,

    /// Bytes exist in the local store (as opposed to only being referenced)
    pub present: bool,

    /// Every path/ref pair pointing at this object, sorted
    pub tracked: Vec<TrackedFile>,
}

impl ContentObject {
    /// File name used when registering the object remotely
    pub fn display_name(&self) -> String {
        self.tracked
            .first()
            .and_then(|t| t.path.rsplit('/').next())
            .map(str::to_string)
            .unwrap_or_else(|| self.oid.to_hex())
    }

    /// Whether any tracked path matches the predicate
    pub fn any_path(&self, mut f: impl FnMut(&str) -> bool) -> bool {
        self.tracked.iter().any(|t| f(&t.path))
    }
}

/// A pointer-shaped blob that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPointer {
    pub path: String,
    pub git_ref: String,
    pub reason: String,
}

/// Result of one scan
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    /// Deduplicated objects, ordered by oid
    pub objects: Vec<ContentObject>,

    /// Malformed pointers, reported and otherwise ignored
    pub skipped: Vec<SkippedPointer>,
}

impl Inventory {
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, oid: &Oid) -> Option<&ContentObject> {
        self.objects
            .binary_search_by(|o| o.oid.cmp(oid))
            .ok()
            .map(|i| &self.objects[i])
    }
}

/// Reads pointer blobs from a repository
pub struct InventoryScanner {
    repo: Repository,
    store: LfsObjectStore,
}

impl InventoryScanner {
    /// Open the repository containing `path`
    pub fn open(path: impl AsRef<Path>) -> GitResult<Self> {
        let path = path.as_ref();
        let repo = Repository::discover(path).map_err(|e| {
            GitError::RepositoryNotFound(format!("{}: {}", path.display(), e))
        })?;
        Ok(Self::from_repository(repo))
    }

    pub fn from_repository(repo: Repository) -> Self {
        let store = LfsObjectStore::for_repository(&repo);
        Self { repo, store }
    }

    /// Override the store used for presence checks
    pub fn with_store(mut self, store: LfsObjectStore) -> Self {
        self.store = store;
        self
    }

    pub fn store(&self) -> &LfsObjectStore {
        &self.store
    }

    /// Scan `refs`, or `HEAD` when empty.
    ///
    /// Branch names are accepted bare (`main`) or qualified (`refs/heads/main`).
    /// A ref that does not resolve is an error; a malformed pointer is not.
    /// An unborn `HEAD` in a fresh repository scans as empty.
    pub fn scan<S: AsRef<str>>(&self, refs: &[S]) -> GitResult<Inventory> {
        let refs: Vec<String> = if refs.is_empty() {
            vec![DEFAULT_REF.to_string()]
        } else {
            refs.iter().map(|r| r.as_ref().to_string()).collect()
        };

        let mut objects: BTreeMap<Oid, ContentObject> = BTreeMap::new();
        let mut skipped = Vec::new();
        // Parsed pointer per blob, shared across refs
        let mut parsed: HashMap<git2::Oid, Option<Result<PointerFile, String>>> = HashMap::new();

        for git_ref in &refs {
            let Some(tree) = self.resolve_tree(git_ref)? else {
                debug!("ref {} is unborn, nothing to scan", git_ref);
                continue;
            };

            for (path, blob_id) in self.collect_blobs(&tree)? {
                let entry = match parsed.get(&blob_id) {
                    Some(entry) => entry.clone(),
                    None => {
                        let entry = self.read_pointer(blob_id)?;
                        parsed.insert(blob_id, entry.clone());
                        entry
                    }
                };

                match entry {
                    None => {}
                    Some(Err(reason)) => {
                        warn!("skipping malformed pointer {} at {}: {}", path, git_ref, reason);
                        skipped.push(SkippedPointer {
                            path,
                            git_ref: git_ref.clone(),
                            reason,
                        });
                    }
                    Some(Ok(pointer)) => {
                        if pointer.oid.is_empty_content() {
                            continue;
                        }
                        let object = objects.entry(pointer.oid).or_insert_with(|| ContentObject {
                            oid: pointer.oid,
                            size: pointer.size,
                            present: false,
                            tracked: Vec::new(),
                        });
                        if object.size != pointer.size {
                            warn!(
                                "pointer {} at {} declares size {} for {} but {} was seen first",
                                path, git_ref, pointer.size, pointer.oid, object.size
                            );
                        }
                        let tracked = TrackedFile {
                            path,
                            git_ref: git_ref.clone(),
                        };
                        if !object.tracked.contains(&tracked) {
                            object.tracked.push(tracked);
                        }
                    }
                }
            }
        }

        let objects = objects
            .into_values()
            .map(|mut object| {
                object.tracked.sort();
                object.present = self.store.contains(&object.oid, object.size);
                object
            })
            .collect();

        Ok(Inventory { objects, skipped })
    }

    /// Resolve a ref name to its root tree. `Ok(None)` for an unborn HEAD.
    fn resolve_tree(&self, git_ref: &str) -> GitResult<Option<git2::Tree<'_>>> {
        let object = match self.repo.revparse_single(git_ref) {
            Ok(object) => object,
            Err(e) if git_ref == DEFAULT_REF && self.head_is_unborn() => {
                debug!("HEAD does not resolve yet: {}", e);
                return Ok(None);
            }
            Err(_) if !git_ref.starts_with("refs/") => self
                .repo
                .revparse_single(&format!("refs/heads/{}", git_ref))
                .map_err(|_| GitError::RefNotFound(git_ref.to_string()))?,
            Err(_) => return Err(GitError::RefNotFound(git_ref.to_string())),
        };

        let commit = object
            .peel_to_commit()
            .map_err(|_| GitError::RefNotFound(git_ref.to_string()))?;
        Ok(Some(commit.tree()?))
    }

    fn head_is_unborn(&self) -> bool {
        matches!(self.repo.head(), Err(e) if e.code() == ErrorCode::UnbornBranch)
    }

    /// Every blob path in a tree, recursively
    fn collect_blobs(&self, tree: &git2::Tree<'_>) -> GitResult<Vec<(String, git2::Oid)>> {
        let mut blobs = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                if let Some(name) = entry.name() {
                    blobs.push((format!("{}{}", root, name), entry.id()));
                }
            }
            TreeWalkResult::Ok
        })?;
        Ok(blobs)
    }

    /// `None` for ordinary content, `Some(Err)` for a malformed pointer
    fn read_pointer(&self, blob_id: git2::Oid) -> GitResult<Option<Result<PointerFile, String>>> {
        let odb = self.repo.odb()?;
        let (size, _) = odb.read_header(blob_id)?;
        if size > MAX_POINTER_SIZE {
            return Ok(None);
        }

        let blob = self.repo.find_blob(blob_id)?;
        let content = blob.content();
        if !PointerFile::is_pointer(content) {
            return Ok(None);
        }

        let parsed = std::str::from_utf8(content)
            .map_err(|e| e.to_string())
            .and_then(|text| PointerFile::parse(text).map_err(|e| e.to_string()));
        Ok(Some(parsed))
    }
}
