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

//! # git-drs Test Utilities
//!
//! Shared test utilities for git-drs crates providing:
//! - Git repositories with LFS pointers committed through libgit2
//! - Deterministic content fixtures
//! - CLI command helpers for testing the `git-drs` binary
//! - Assertions on the local object store

pub mod assertions;
pub mod cli;
pub mod fixtures;
pub mod repo;

// Re-export commonly used items at crate root
pub use assertions::*;
pub use cli::git_drs;
pub use fixtures::TestFixtures;
pub use repo::TestRepo;
