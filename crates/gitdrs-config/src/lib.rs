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

//! Configuration for git-drs
//!
//! Remotes, the default remote, and transfer tuning are kept per repository
//! in `.drs/config.yaml`. TOML and JSON files are accepted as well, chosen by
//! extension.
//!
//! # Features
//!
//! - Tagged remote kinds: registry-backed (`indexd`), plain object store (`s3`)
//!   and local unauthenticated DRS servers (`local`)
//! - Environment variable overrides with the `GIT_DRS_` prefix
//! - Validation with errors that name the offending remote and field
//!
//! # Example
//!
//! ```no_run
//! use gitdrs_config::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(".").await?;
//!     let (name, remote) = config.remote_or_default(None)?;
//!     println!("{} -> {} ({})", name, remote.project_id(), remote.kind());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

// Re-export commonly used items
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigFormat, ConfigLoader};
pub use schema::*;
pub use validation::Validator;
