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

//! Explicitly constructed dependencies shared by the reconciler and the
//! transfer agent.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use gitdrs_config::Config;
use gitdrs_git::LfsObjectStore;
use gitdrs_storage::{build_directory, CommandFetcher, Fetcher, HttpFetcher, ObjectDirectory};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Source of remote directory clients
#[async_trait]
pub trait RemoteProvider: Send + Sync + Debug {
    /// Name of the remote used when none is given
    fn default_remote(&self) -> SyncResult<String>;

    /// Whether `name` is a configured remote
    fn has_remote(&self, name: &str) -> bool;

    /// Client for a named remote
    async fn remote_client(&self, name: &str) -> SyncResult<Arc<dyn ObjectDirectory>>;
}

/// Remotes from `.drs/config.yaml`
#[derive(Debug, Clone)]
pub struct ConfiguredRemotes {
    config: Config,
}

impl ConfiguredRemotes {
    pub fn new(config: Config) -> Self {
        ConfiguredRemotes { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[async_trait]
impl RemoteProvider for ConfiguredRemotes {
    fn default_remote(&self) -> SyncResult<String> {
        Ok(self.config.get_default_remote()?.to_string())
    }

    fn has_remote(&self, name: &str) -> bool {
        self.config.remotes.contains_key(name)
    }

    async fn remote_client(&self, name: &str) -> SyncResult<Arc<dyn ObjectDirectory>> {
        let remote = self.config.get_remote(name)?;
        Ok(build_directory(remote).await?)
    }
}

/// A single pre-built remote; used by tests and embedders
#[derive(Debug, Clone)]
pub struct SingleRemote {
    name: String,
    directory: Arc<dyn ObjectDirectory>,
}

impl SingleRemote {
    pub fn new(name: impl Into<String>, directory: Arc<dyn ObjectDirectory>) -> Self {
        SingleRemote {
            name: name.into(),
            directory,
        }
    }
}

#[async_trait]
impl RemoteProvider for SingleRemote {
    fn default_remote(&self) -> SyncResult<String> {
        Ok(self.name.clone())
    }

    fn has_remote(&self, name: &str) -> bool {
        name == self.name
    }

    async fn remote_client(&self, name: &str) -> SyncResult<Arc<dyn ObjectDirectory>> {
        if name == self.name {
            Ok(Arc::clone(&self.directory))
        } else {
            Err(SyncError::Config(gitdrs_config::ConfigError::UnknownRemote {
                name: name.to_string(),
                available: vec![self.name.clone()],
            }))
        }
    }
}

/// Everything a sync operation needs, passed in rather than looked up globally
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub repo_root: PathBuf,
    pub store: LfsObjectStore,
    pub remotes: Arc<dyn RemoteProvider>,
    pub fetcher: Arc<dyn Fetcher>,
    /// Upper bound on simultaneous network operations; at least 1
    pub concurrency: usize,
}

impl SyncContext {
    pub fn new(
        repo_root: impl Into<PathBuf>,
        store: LfsObjectStore,
        remotes: Arc<dyn RemoteProvider>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        SyncContext {
            repo_root: repo_root.into(),
            store,
            remotes,
            fetcher,
            concurrency: 1,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Build from a repository working tree and its loaded configuration
    pub fn from_config(repo_root: &Path, config: Config) -> SyncResult<Self> {
        let store = LfsObjectStore::open(repo_root)?;
        let fetcher: Arc<dyn Fetcher> = match &config.transfer.fetch_command {
            Some(cmd) => Arc::new(CommandFetcher::new(&cmd.program, cmd.args.clone())),
            None => Arc::new(HttpFetcher::new()),
        };
        let concurrency = config.transfer.concurrency;
        debug!(root = %repo_root.display(), concurrency, "sync context ready");
        Ok(Self::new(
            repo_root,
            store,
            Arc::new(ConfiguredRemotes::new(config)),
            fetcher,
        )
        .with_concurrency(concurrency))
    }

    /// Load `.drs/config.yaml` under `repo_root` and build the context
    pub async fn load(repo_root: &Path) -> SyncResult<Self> {
        let config = Config::load(repo_root).await?;
        Self::from_config(repo_root, config)
    }
}
