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

//! Fetch one object by content hash, outside any ref.

use super::GlobalArgs;
use crate::output;
use crate::repo;
use anyhow::{Context, Result};
use clap::Args;
use gitdrs_git::Oid;
use std::path::PathBuf;

/// Download the object registered for a content hash into the local store
#[derive(Debug, Args)]
pub struct DownloadCmd {
    /// SHA-256 of the object content
    #[arg(value_name = "OID")]
    pub oid: String,

    /// Also copy the bytes to this path
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// DRS remote name (defaults to the configured default)
    #[arg(short, long)]
    pub remote: Option<String>,
}

impl DownloadCmd {
    pub async fn execute(&self, global: &GlobalArgs) -> Result<()> {
        let oid = Oid::from_hex(&self.oid).context("Invalid object id")?;
        let paths = global.repo()?;
        let reconciler = repo::connect(&paths.root, self.remote.as_deref()).await?;

        let stored = reconciler
            .download(&oid)
            .await
            .with_context(|| format!("Failed to download {}", oid))?;
        let path = match &self.output {
            Some(dest) => {
                tokio::fs::copy(&stored, dest)
                    .await
                    .with_context(|| format!("Failed to write {}", dest.display()))?;
                dest.clone()
            }
            None => stored,
        };
        if !global.quiet {
            output::success(&format!("Downloaded {}", output::short_oid(&oid.to_hex())));
            output::detail("Path", &path.display().to_string());
        }
        Ok(())
    }
}
