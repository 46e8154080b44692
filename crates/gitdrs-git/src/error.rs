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

//! Error types for Git integration

use thiserror::Error;

/// Result type for Git integration operations
pub type GitResult<T> = Result<T, GitError>;

/// Errors that can occur during Git integration operations
#[derive(Error, Debug)]
pub enum GitError {
    /// Error parsing pointer file
    #[error("Failed to parse pointer file: {0}")]
    PointerParse(String),

    /// Invalid pointer file format
    #[error("Invalid pointer file format: {0}")]
    InvalidPointerFormat(String),

    /// Missing required field in pointer file
    #[error("Missing required field in pointer file: {0}")]
    MissingPointerField(String),

    /// Invalid object ID format
    #[error("Invalid object ID: {0}")]
    InvalidOid(String),

    /// Git operation error
    #[error("Git operation failed: {0}")]
    Git2(#[from] git2::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Repository not found
    #[error("Git repository not found: {0}")]
    RepositoryNotFound(String),

    /// A ref named for scanning does not resolve to a commit
    #[error("Cannot resolve ref '{0}'")]
    RefNotFound(String),

    /// Invalid repository state
    #[error("Invalid repository state: {0}")]
    InvalidRepositoryState(String),
}
