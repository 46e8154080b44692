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

//! Register an object that already sits in a bucket and check in its pointer.
//!
//! No bytes move: the record points at the given URL and only the pointer
//! file is written to the working tree.

use super::GlobalArgs;
use crate::output;
use crate::repo;
use anyhow::{bail, Context, Result};
use clap::Args;
use gitdrs_git::{Oid, PointerFile};
use std::path::{Component, Path, PathBuf};
use tracing::info;

/// Register an existing bucket object and write its Git LFS pointer
#[derive(Debug, Args)]
#[command(after_help = "PATH defaults to the object key of URL, relative to the repository root.
Stage the pointer afterwards with `git add PATH`.")]
pub struct AddUrlCmd {
    /// Location of the stored bytes, e.g. s3://bucket/data/a.bam
    #[arg(value_name = "URL")]
    pub url: String,

    /// Working tree path for the pointer file
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// SHA-256 of the stored bytes (64 hex characters)
    #[arg(long, value_name = "HEX")]
    pub sha256: String,

    /// Size of the stored bytes
    #[arg(long, value_name = "BYTES")]
    pub size: u64,

    /// DRS remote name (defaults to the configured default)
    #[arg(short, long)]
    pub remote: Option<String>,
}

impl AddUrlCmd {
    pub async fn execute(&self, global: &GlobalArgs) -> Result<()> {
        let oid = Oid::from_hex(&self.sha256).context("Invalid --sha256")?;
        let relative = match &self.path {
            Some(path) => path.clone(),
            None => default_path(&self.url)?,
        };
        let paths = global.repo()?;
        let target = pointer_target(&paths.root, &relative)?;

        let reconciler = repo::connect(&paths.root, self.remote.as_deref()).await?;
        let name = relative.to_string_lossy().replace('\\', "/");
        let registration = reconciler
            .register_external(oid, self.size, &name, &self.url)
            .await
            .with_context(|| format!("Failed to register {}", self.url))?;

        write_pointer(&target, &PointerFile::new(oid, self.size))?;
        info!(
            oid = %oid,
            id = %registration.record.id,
            created = registration.created,
            path = %target.display(),
            "external object added"
        );

        if !global.quiet {
            let verb = if registration.created { "Registered" } else { "Reusing" };
            output::success(&format!("{} record {}", verb, registration.record.id));
            output::detail("Pointer", &name);
            output::detail("Remote", reconciler.remote());
            output::info(&format!("Stage it with `git add {}`", name));
        }
        Ok(())
    }
}

/// Object key of `url` (everything after the bucket)
fn default_path(url: &str) -> Result<PathBuf> {
    let (_, rest) = url
        .split_once("://")
        .with_context(|| format!("Not a URL: {}", url))?;
    match rest.split_once('/') {
        Some((_, key)) if !key.trim_matches('/').is_empty() => {
            Ok(PathBuf::from(key.trim_matches('/')))
        }
        _ => bail!("Cannot derive a path from {}; pass PATH explicitly", url),
    }
}

/// Absolute pointer location for a repository-relative path
fn pointer_target(root: &Path, relative: &Path) -> Result<PathBuf> {
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || relative.as_os_str().is_empty() {
        bail!("Path must stay inside the repository: {}", relative.display());
    }
    Ok(root.join(relative))
}

/// Write the pointer, refusing to replace real file content
fn write_pointer(target: &Path, pointer: &PointerFile) -> Result<()> {
    if target.is_dir() {
        bail!("{} is a directory", target.display());
    }
    if let Ok(existing) = std::fs::read(target) {
        if !PointerFile::is_pointer(&existing) {
            bail!("{} exists and is not a pointer file", target.display());
        }
    }
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(target, pointer.to_bytes())
        .with_context(|| format!("Failed to write {}", target.display()))
}
