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

//! Repository discovery and per-command sync setup.

use anyhow::{Context, Result};
use git2::Repository;
use gitdrs_sync::{Reconciler, SyncContext};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Working tree root and Git directory of the enclosing repository
#[derive(Debug, Clone)]
pub struct RepoPaths {
    pub root: PathBuf,
    pub git_dir: PathBuf,
}

impl RepoPaths {
    /// Log file for modes whose stdout belongs to Git
    pub fn log_file(&self) -> PathBuf {
        self.git_dir.join("drs").join("git-drs.log")
    }
}

/// Find the repository containing `start`, or the current directory.
pub fn find_repo(start: Option<&Path>) -> Result<RepoPaths> {
    let start = match start {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let repo = Repository::discover(&start)
        .with_context(|| format!("Not a git repository: {}", start.display()))?;
    let root = repo.workdir().map(Path::to_path_buf).with_context(|| {
        format!("Bare repositories are not supported: {}", repo.path().display())
    })?;
    Ok(RepoPaths {
        root,
        git_dir: repo.path().to_path_buf(),
    })
}

/// Load `.drs/config.yaml` and build the sync context.
pub async fn load_context(root: &Path) -> Result<Arc<SyncContext>> {
    let ctx = SyncContext::load(root)
        .await
        .context("Failed to load git-drs configuration")?;
    Ok(Arc::new(ctx))
}

/// Connect a reconciler to `remote`, or the default remote.
pub async fn connect(root: &Path, remote: Option<&str>) -> Result<Reconciler> {
    let ctx = load_context(root).await?;
    Reconciler::connect(ctx, remote)
        .await
        .with_context(|| match remote {
            Some(name) => format!("Failed to connect to remote '{}'", name),
            None => "Failed to connect to the default remote".to_string(),
        })
}
