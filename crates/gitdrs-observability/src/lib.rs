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

//! git-drs observability
//!
//! Structured logging and tracing setup for every git-drs entry point.
//!
//! # Features
//!
//! - **Multiple Output Formats**: Pretty, JSON, and compact output formats
//! - **Environment-based Filtering**: Dynamic log level control via `RUST_LOG`
//! - **File Output**: The transfer agent owns stdout for its wire protocol, so
//!   its diagnostics are appended to a log file instead
//!
//! # Example
//!
//! ```ignore
//! use gitdrs_observability::{init_tracing_with_config, LogConfig, LogOutput};
//!
//! let config = LogConfig::new()
//!     .with_output(LogOutput::File(".git/drs/git-drs.log".into()))
//!     .with_color(false);
//! init_tracing_with_config(config)?;
//! tracing::info!("transfer agent started");
//! ```

pub mod config;
pub mod initialization;

pub use config::{LogConfig, LogError, LogFormat, LogOutput};
pub use initialization::{init_tracing, init_tracing_with_config};

/// Tracing re-exports for convenience
pub use tracing::{debug, error, info, trace, warn, Level};
