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

//! # git-drs transfer agent
//!
//! Implements the Git LFS custom transfer protocol over line-delimited
//! JSON. git-lfs spawns the agent once per upload or download session;
//! stdout carries protocol messages only, so diagnostics go to a log file.
//!
//! ```rust,no_run
//! use gitdrs_sync::SyncContext;
//! use gitdrs_transfer::TransferAgent;
//! use std::sync::Arc;
//! use tokio::io::BufReader;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = Arc::new(SyncContext::load(std::path::Path::new(".")).await?);
//! let summary = TransferAgent::new(ctx)
//!     .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
//!     .await?;
//! eprintln!("{} transferred, {} failed", summary.succeeded, summary.failed);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod handler;
pub mod messages;

pub use error::{ProtocolError, ProtocolResult};
pub use handler::{SessionSummary, TransferAgent};
pub use messages::{
    CompleteResponse, ErrorBody, Inbound, InitRequest, ProgressResponse, TransferRequest,
};
