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

//! Wire messages of the Git LFS custom transfer protocol.
//!
//! Each message is one JSON object on its own line. Field names follow
//! git-lfs exactly, including the camel-cased progress counters.

use serde::{Deserialize, Serialize};

/// Message read from git-lfs, tagged by `event`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum Inbound {
    Init(InitRequest),
    Upload(TransferRequest),
    Download(TransferRequest),
    Terminate,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InitRequest {
    /// `upload` or `download`
    pub operation: String,
    #[serde(default)]
    pub remote: Option<String>,
    #[serde(default)]
    pub concurrent: bool,
    #[serde(default)]
    pub concurrenttransfers: Option<usize>,
}

impl InitRequest {
    /// Worker count for the session: the requested number when
    /// concurrency is enabled, never less than one
    pub fn worker_count(&self) -> usize {
        if self.concurrent {
            self.concurrenttransfers.unwrap_or(1).max(1)
        } else {
            1
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransferRequest {
    pub oid: String,
    #[serde(default)]
    pub size: u64,
    /// Local file to upload; absent on downloads
    #[serde(default)]
    pub path: Option<String>,
    /// Server-provided action from the batch API; unused by this agent
    #[serde(default)]
    pub action: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

/// Empty object acknowledging `init`
#[derive(Debug, Clone, Default, Serialize)]
pub struct InitResponse {}

/// Terminal answer to one transfer request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteResponse {
    pub event: String,
    pub oid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl CompleteResponse {
    pub fn success(oid: impl Into<String>, path: Option<String>) -> Self {
        CompleteResponse {
            event: "complete".to_string(),
            oid: oid.into(),
            path,
            error: None,
        }
    }

    pub fn failure(oid: impl Into<String>, code: u16, message: impl Into<String>) -> Self {
        CompleteResponse {
            event: "complete".to_string(),
            oid: oid.into(),
            path: None,
            error: Some(ErrorBody {
                code,
                message: message.into(),
            }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub event: String,
    pub oid: String,
    #[serde(rename = "bytesSoFar")]
    pub bytes_so_far: u64,
    #[serde(rename = "bytesSinceLast")]
    pub bytes_since_last: u64,
}

impl ProgressResponse {
    pub fn new(oid: impl Into<String>, bytes_so_far: u64, bytes_since_last: u64) -> Self {
        ProgressResponse {
            event: "progress".to_string(),
            oid: oid.into(),
            bytes_so_far,
            bytes_since_last,
        }
    }
}

/// Best-effort `oid` of a line that failed to parse as a request
pub fn salvage_oid(line: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    value.get("oid")?.as_str().map(str::to_string)
}
