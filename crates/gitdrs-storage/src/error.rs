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

//! Directory error types and utilities

use std::io;
use thiserror::Error;

/// Result type alias for directory operations
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors that can occur while talking to a remote object directory
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// No record or content exists for the requested key
    #[error("not found: {0}")]
    NotFound(String),

    /// A record with the same identity already exists in this scope
    #[error("record already exists: {0}")]
    AlreadyExists(String),

    /// Credentials were rejected or are missing
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Remote responded with an unexpected HTTP status
    #[error("{method} {url} failed with status {status}: {body}")]
    Http {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    /// Transport-level failure (connection refused, TLS, timeout)
    #[error("transport error: {0}")]
    Transport(String),

    /// Remote returned a body we could not interpret
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Backend not available or misconfigured
    #[error("directory backend error: {0}")]
    Backend(String),

    /// Remote configuration could not be turned into a client
    #[error("configuration error: {0}")]
    Config(#[from] gitdrs_config::ConfigError),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Transparent error delegation for wrapped error types
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DirectoryError {
    /// Create a NotFound error with the given key
    pub fn not_found<S: Into<String>>(key: S) -> Self {
        DirectoryError::NotFound(key.into())
    }

    /// Create an AlreadyExists error with the given key
    pub fn already_exists<S: Into<String>>(key: S) -> Self {
        DirectoryError::AlreadyExists(key.into())
    }

    /// Create an Unauthorized error with context
    pub fn unauthorized<S: Into<String>>(msg: S) -> Self {
        DirectoryError::Unauthorized(msg.into())
    }

    /// Create an InvalidResponse error with context
    pub fn invalid_response<S: Into<String>>(msg: S) -> Self {
        DirectoryError::InvalidResponse(msg.into())
    }

    /// Create a Backend error with context
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        DirectoryError::Backend(msg.into())
    }

    /// Map an HTTP status into the matching variant
    pub fn from_status(
        method: &'static str,
        url: impl Into<String>,
        status: u16,
        body: String,
    ) -> Self {
        let url = url.into();
        match status {
            401 | 403 => DirectoryError::Unauthorized(format!("{} {}: {}", method, url, body)),
            404 => DirectoryError::NotFound(url),
            409 => DirectoryError::AlreadyExists(url),
            _ => DirectoryError::Http {
                method,
                url,
                status,
                body,
            },
        }
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, DirectoryError::NotFound(_))
    }

    /// Check if this is an AlreadyExists error
    pub fn is_already_exists(&self) -> bool {
        matches!(self, DirectoryError::AlreadyExists(_))
    }

    /// Check if this is an Unauthorized error
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, DirectoryError::Unauthorized(_))
    }

    /// Whether retrying the same request might succeed
    pub fn is_transient(&self) -> bool {
        match self {
            DirectoryError::Transport(_) => true,
            DirectoryError::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for DirectoryError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => DirectoryError::Http {
                method: "HTTP",
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
                status: status.as_u16(),
                body: err.to_string(),
            },
            None if err.is_decode() => DirectoryError::InvalidResponse(err.to_string()),
            None => DirectoryError::Transport(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for DirectoryError {
    fn from(err: serde_json::Error) -> Self {
        DirectoryError::InvalidResponse(err.to_string())
    }
}
