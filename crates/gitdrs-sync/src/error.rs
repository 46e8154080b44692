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

//! Error types for reconciliation
//!
//! [`SyncError`] aborts a whole operation (configuration, repository
//! access). [`ObjectError`] is recorded against a single content object
//! and never stops the others.

use gitdrs_config::ConfigError;
use gitdrs_git::GitError;
use gitdrs_storage::DirectoryError;
use std::io;
use thiserror::Error;

pub type SyncResult<T> = Result<T, SyncError>;

/// Failures that abort an operation before or instead of per-object work
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("remote error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("repository error: {0}")]
    Git(#[from] GitError),

    #[error("invalid path filter '{pattern}': {reason}")]
    InvalidFilter { pattern: String, reason: String },

    #[error("malformed pre-push input line: {0:?}")]
    InvalidPrePushLine(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SyncError {
    /// Repository has no DRS configuration or no default remote
    pub fn is_unconfigured(&self) -> bool {
        matches!(
            self,
            SyncError::Config(ConfigError::FileNotFound(_))
                | SyncError::Config(ConfigError::NoDefaultRemote { .. })
        )
    }
}

/// Broad classification of a per-object failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectErrorKind {
    /// No record or no bytes exist for the object
    NotFound,
    /// Downloaded bytes do not match the declared hash or size
    Integrity,
    /// The remote failed or rejected the request
    Remote,
    /// Local filesystem or repository failure
    Local,
}

/// A failure confined to one content object
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ObjectError {
    pub kind: ObjectErrorKind,
    pub message: String,
}

impl ObjectError {
    pub fn new(kind: ObjectErrorKind, message: impl Into<String>) -> Self {
        ObjectError {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ObjectErrorKind::NotFound, message)
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::new(ObjectErrorKind::Integrity, message)
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::new(ObjectErrorKind::Remote, message)
    }

    pub fn local(message: impl Into<String>) -> Self {
        Self::new(ObjectErrorKind::Local, message)
    }

    /// HTTP-style code reported in transfer protocol errors
    pub fn code(&self) -> u16 {
        match self.kind {
            ObjectErrorKind::NotFound => 404,
            ObjectErrorKind::Integrity => 422,
            ObjectErrorKind::Remote => 502,
            ObjectErrorKind::Local => 500,
        }
    }
}

impl From<DirectoryError> for ObjectError {
    fn from(err: DirectoryError) -> Self {
        let kind = match &err {
            DirectoryError::NotFound(_) => ObjectErrorKind::NotFound,
            DirectoryError::Io(_) | DirectoryError::Config(_) => ObjectErrorKind::Local,
            _ => ObjectErrorKind::Remote,
        };
        ObjectError::new(kind, err.to_string())
    }
}

impl From<GitError> for ObjectError {
    fn from(err: GitError) -> Self {
        ObjectError::local(err.to_string())
    }
}

impl From<io::Error> for ObjectError {
    fn from(err: io::Error) -> Self {
        ObjectError::local(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(ObjectError::not_found("x").code(), 404);
        assert_eq!(ObjectError::integrity("x").code(), 422);
        assert_eq!(ObjectError::remote("x").code(), 502);
        assert_eq!(ObjectError::local("x").code(), 500);
    }

    #[test]
    fn test_directory_error_mapping() {
        let err: ObjectError = DirectoryError::not_found("abc").into();
        assert_eq!(err.kind, ObjectErrorKind::NotFound);
        let err: ObjectError = DirectoryError::backend("down").into();
        assert_eq!(err.kind, ObjectErrorKind::Remote);
        assert_eq!(err.message, "directory backend error: down");
    }

    #[test]
    fn test_unconfigured() {
        let err = SyncError::Config(ConfigError::NoDefaultRemote { available: vec![] });
        assert!(err.is_unconfigured());
        let err = SyncError::Config(ConfigError::UnknownRemote {
            name: "x".into(),
            available: vec![],
        });
        assert!(!err.is_unconfigured());
    }
}
