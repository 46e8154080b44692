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

//! Assertions on repository and object store state.

use crate::repo::TestRepo;
use gitdrs_git::Oid;
use std::fs;

/// Assert that an object is installed with exactly `content`.
pub fn assert_object_installed(repo: &TestRepo, content: &[u8]) {
    let oid = Oid::hash(content);
    let path = repo.store().object_path(&oid);
    let actual = fs::read(&path)
        .unwrap_or_else(|e| panic!("object {} should be installed at {:?}: {}", oid, path, e));
    assert_eq!(actual, content, "installed bytes for {} differ", oid);
}

/// Assert that an object is not installed.
pub fn assert_object_absent(repo: &TestRepo, oid: &Oid) {
    let path = repo.store().object_path(oid);
    assert!(!path.exists(), "object {} should not be installed", oid);
}

/// Assert the LFS temp directory holds no leftover artifacts.
pub fn assert_no_temp_artifacts(repo: &TestRepo) {
    let tmp = repo.store().tmp_dir();
    if let Ok(entries) = fs::read_dir(&tmp) {
        let leftovers: Vec<_> = entries.filter_map(Result::ok).map(|e| e.path()).collect();
        assert!(leftovers.is_empty(), "temp artifacts left behind: {:?}", leftovers);
    }
}
