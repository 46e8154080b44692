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

//! CLI testing helpers.

use assert_cmd::Command;

/// Get a Command for the git-drs binary.
///
/// # Example
/// ```ignore
/// use gitdrs_test_utils::git_drs;
///
/// git_drs()
///     .arg("version")
///     .assert()
///     .success();
/// ```
#[allow(deprecated)] // cargo_bin is deprecated but still works for our use case
pub fn git_drs() -> Command {
    Command::cargo_bin("git-drs").expect("git-drs binary not found")
}
