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

//! Test repository management.
//!
//! Repositories are created and committed through libgit2, so tests do not
//! depend on a `git` or `git-lfs` binary being installed.

use gitdrs_git::{LfsObjectStore, Oid, PointerFile};
use git2::{BranchType, IndexAddOption, Repository, RepositoryInitOptions, Signature};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary Git repository for integration tests.
///
/// # Example
/// ```ignore
/// use gitdrs_test_utils::TestRepo;
///
/// let repo = TestRepo::new();
/// let oid = repo.track("data/sample.bin", b"0123456789");
/// repo.commit("Add sample");
/// ```
pub struct TestRepo {
    temp_dir: TempDir,
}

impl TestRepo {
    /// Create and initialize an empty repository on branch `main` with a
    /// committer identity.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo =
            Repository::init_opts(temp_dir.path(), &opts).expect("Failed to init repository");
        let mut config = repo.config().expect("Failed to open repository config");
        config
            .set_str("user.name", "Test User")
            .expect("Failed to set user.name");
        config
            .set_str("user.email", "test@example.com")
            .expect("Failed to set user.email");
        Self { temp_dir }
    }

    /// Get the path to the working directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Open a handle on the repository.
    pub fn repo(&self) -> Repository {
        Repository::open(self.path()).expect("Failed to open repository")
    }

    /// The repository's LFS object store.
    pub fn store(&self) -> LfsObjectStore {
        LfsObjectStore::new(self.path().join(".git").join("lfs"))
    }

    /// Write a file to the working directory.
    pub fn write_file(&self, name: &str, content: &[u8]) {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        fs::write(&path, content).expect("Failed to write file");
    }

    /// Write the LFS pointer for `content` at `name` and keep the bytes in
    /// the local object store, as `git lfs` does after a clean filter.
    pub fn track(&self, name: &str, content: &[u8]) -> Oid {
        let oid = self.track_pointer_only(name, content);
        self.store_content(content);
        oid
    }

    /// Write the LFS pointer for `content` at `name` without the bytes.
    pub fn track_pointer_only(&self, name: &str, content: &[u8]) -> Oid {
        let oid = Oid::hash(content);
        let pointer = PointerFile::new(oid, content.len() as u64);
        self.write_file(name, &pointer.to_bytes());
        oid
    }

    /// Put bytes in the local object store.
    pub fn store_content(&self, content: &[u8]) -> PathBuf {
        let oid = Oid::hash(content);
        let path = self.store().object_path(&oid);
        fs::create_dir_all(path.parent().expect("object path has a parent"))
            .expect("Failed to create object directory");
        fs::write(&path, content).expect("Failed to write object");
        path
    }

    /// Rename a file in the working directory.
    pub fn rename(&self, from: &str, to: &str) {
        let target = self.path().join(to);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        fs::rename(self.path().join(from), target).expect("Failed to rename file");
    }

    /// Delete a file from the working directory.
    pub fn delete_file(&self, name: &str) {
        let path = self.path().join(name);
        if path.exists() {
            fs::remove_file(&path).expect("Failed to delete file");
        }
    }

    /// Stage every change in the working directory and commit on HEAD.
    pub fn commit(&self, message: &str) -> git2::Oid {
        let repo = self.repo();
        let mut index = repo.index().expect("Failed to open index");
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .expect("Failed to stage files");
        index
            .update_all(["*"].iter(), None)
            .expect("Failed to stage removals");
        index.write().expect("Failed to write index");

        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = repo.find_tree(tree_id).expect("Failed to find tree");
        let sig =
            Signature::now("Test User", "test@example.com").expect("Failed to build signature");
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to commit")
    }

    /// Create a branch at the current HEAD commit.
    pub fn create_branch(&self, name: &str) {
        let repo = self.repo();
        let head = repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .expect("HEAD has no commit");
        repo.branch(name, &head, false).expect("Failed to create branch");
    }

    /// Point HEAD at a branch. The working directory is left as is.
    pub fn switch_branch(&self, name: &str) {
        let repo = self.repo();
        repo.find_branch(name, BranchType::Local)
            .expect("Branch does not exist");
        repo.set_head(&format!("refs/heads/{}", name))
            .expect("Failed to switch branch");
    }

    /// Commit id a ref currently points at.
    pub fn rev(&self, spec: &str) -> git2::Oid {
        self.repo()
            .revparse_single(spec)
            .and_then(|o| o.peel_to_commit())
            .map(|c| c.id())
            .expect("Failed to resolve revision")
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}
