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

use std::io;
use thiserror::Error;

pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Failures that end a transfer session
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Input ended before any `init` arrived
    #[error("failed to read initial message: input closed")]
    MissingInit,

    /// First message was not a well-formed `init`
    #[error("expected init message, got: {0}")]
    ExpectedInit(String),

    /// Remote could not be resolved or connected at `init`
    #[error("init failed: {0}")]
    Init(String),

    #[error("I/O error on protocol stream: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}
