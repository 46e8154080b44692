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

//! Manage DRS remotes in `.drs/config.yaml`.

use super::GlobalArgs;
use crate::output;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use console::style;
use gitdrs_config::{
    project_to_resource, Config, CredentialRef, IndexdRemote, LocalRemote, RemoteConfig, S3Remote,
    Validator,
};
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct RemoteCmd {
    #[command(subcommand)]
    pub command: RemoteSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum RemoteSubcommand {
    /// Add or replace a remote
    #[command(subcommand)]
    Add(AddRemote),

    /// List configured remotes
    List {
        /// Show endpoints and buckets
        #[arg(short, long)]
        verbose: bool,
    },

    /// Make a remote the default
    SetDefault {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Remove a remote
    Remove {
        #[arg(value_name = "NAME")]
        name: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum AddRemote {
    /// Registry-backed data commons (indexd)
    Indexd {
        #[arg(value_name = "NAME")]
        name: String,
        /// Base URL, e.g. https://data.example.org
        #[arg(long)]
        endpoint: String,
        /// Project id in <program>-<project> form
        #[arg(long)]
        project: String,
        #[arg(long)]
        bucket: String,
        /// Environment variable holding the bearer token
        #[arg(long, value_name = "VAR", conflicts_with = "token_file")]
        token_env: Option<String>,
        /// File holding the bearer token
        #[arg(long, value_name = "PATH")]
        token_file: Option<PathBuf>,
    },

    /// S3-compatible bucket holding both records and bytes
    S3 {
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(long)]
        bucket: String,
        #[arg(long)]
        project: String,
        #[arg(long)]
        region: Option<String>,
        /// Custom endpoint for S3-compatible services
        #[arg(long)]
        endpoint: Option<String>,
        /// Key prefix for everything written
        #[arg(long, default_value = "")]
        prefix: String,
        #[arg(long)]
        path_style: bool,
    },

    /// Local DRS server without authentication
    Local {
        #[arg(value_name = "NAME")]
        name: String,
        /// Server base URL
        #[arg(long)]
        url: String,
        #[arg(long)]
        project: String,
        /// Data root: absolute path or file:// URL for on-disk storage
        #[arg(long, default_value = "")]
        bucket: String,
    },
}

impl AddRemote {
    fn into_entry(self) -> (String, RemoteConfig) {
        match self {
            AddRemote::Indexd {
                name,
                endpoint,
                project,
                bucket,
                token_env,
                token_file,
            } => {
                let credential = token_env
                    .map(CredentialRef::Env)
                    .or(token_file.map(CredentialRef::File));
                (
                    name,
                    RemoteConfig::Indexd(IndexdRemote {
                        endpoint,
                        project_id: project,
                        bucket,
                        credential,
                    }),
                )
            }
            AddRemote::S3 {
                name,
                bucket,
                project,
                region,
                endpoint,
                prefix,
                path_style,
            } => (
                name,
                RemoteConfig::S3(S3Remote {
                    bucket,
                    project_id: project,
                    region,
                    endpoint,
                    prefix,
                    force_path_style: path_style,
                }),
            ),
            AddRemote::Local {
                name,
                url,
                project,
                bucket,
            } => (
                name,
                RemoteConfig::Local(LocalRemote {
                    base_url: url,
                    project_id: project,
                    bucket,
                }),
            ),
        }
    }
}

impl RemoteCmd {
    pub async fn execute(self, global: &GlobalArgs) -> Result<()> {
        let paths = global.repo()?;
        let root = paths.root.as_path();
        match self.command {
            RemoteSubcommand::Add(add) => add_remote(root, add, global.quiet).await,
            RemoteSubcommand::List { verbose } => list_remotes(root, verbose).await,
            RemoteSubcommand::SetDefault { name } => {
                let mut config = load_or_default(root).await?;
                config.set_default_remote(&name)?;
                config.save(root).await?;
                if !global.quiet {
                    output::success(&format!("Default remote is now '{}'", name));
                }
                Ok(())
            }
            RemoteSubcommand::Remove { name } => {
                let mut config = load_or_default(root).await?;
                if config.remove_remote(&name).is_none() {
                    anyhow::bail!("No such remote '{}'", name);
                }
                config.save(root).await?;
                if !global.quiet {
                    output::success(&format!("Removed remote '{}'", name));
                }
                Ok(())
            }
        }
    }
}

/// Existing configuration, or an empty one when the file does not exist yet
async fn load_or_default(root: &Path) -> Result<Config> {
    match Config::load(root).await {
        Ok(config) => Ok(config),
        Err(e) if e.is_not_found() => Ok(Config::default()),
        Err(e) => Err(e).context("Failed to load .drs/config.yaml"),
    }
}

async fn add_remote(root: &Path, add: AddRemote, quiet: bool) -> Result<()> {
    let (name, remote) = add.into_entry();
    if name.trim().is_empty() {
        anyhow::bail!("Remote name cannot be empty");
    }
    remote
        .validate()
        .with_context(|| format!("Invalid remote '{}'", name))?;
    let scope = project_to_resource(remote.project_id())?;

    let mut config = load_or_default(root).await?;
    let replaced = config.remotes.contains_key(&name);
    config.set_remote(name.clone(), remote);
    config.save(root).await?;

    if !quiet {
        let verb = if replaced { "Updated" } else { "Added" };
        output::success(&format!("{} remote '{}'", verb, name));
        output::detail("Scope", &scope);
        if config.default_remote.as_deref() == Some(name.as_str()) {
            output::detail("Default", "yes");
        }
    }
    Ok(())
}

async fn list_remotes(root: &Path, verbose: bool) -> Result<()> {
    let config = load_or_default(root).await?;
    let default = config.default_remote.as_deref();
    for (name, remote) in &config.remotes {
        let marker = if Some(name.as_str()) == default { "*" } else { " " };
        if verbose {
            println!(
                "{} {}\t{}\t{}\t{}",
                marker,
                style(name).bold(),
                remote.kind(),
                remote.endpoint().unwrap_or("-"),
                remote.bucket()
            );
        } else {
            println!("{} {}", marker, name);
        }
    }
    Ok(())
}
