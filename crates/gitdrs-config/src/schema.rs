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

//! Configuration schema.
//!
//! A repository keeps its configuration in `.drs/config.yaml`:
//!
//! ```yaml
//! default_remote: production
//! remotes:
//!   production:
//!     kind: indexd
//!     endpoint: https://data.example.org
//!     project_id: cbds-demo
//!     bucket: cbds-data
//!     credential:
//!       env: GEN3_ACCESS_TOKEN
//!   scratch:
//!     kind: s3
//!     bucket: scratch-objects
//!     project_id: cbds-demo
//! transfer:
//!   concurrency: 8
//! ```

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Directory holding repository-level configuration
pub const CONFIG_DIR: &str = ".drs";

/// Configuration file name inside [`CONFIG_DIR`]
pub const CONFIG_FILE: &str = "config.yaml";

/// Path of the configuration file for a repository root
pub fn config_path(repo_root: impl AsRef<Path>) -> PathBuf {
    repo_root.as_ref().join(CONFIG_DIR).join(CONFIG_FILE)
}

/// Top-level configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Remote used when a command or the transfer protocol names none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_remote: Option<String>,

    /// Named remotes
    pub remotes: BTreeMap<String, RemoteConfig>,

    /// Transfer tuning
    pub transfer: TransferConfig,

    /// Logging overrides
    pub logging: LoggingConfig,
}

impl Config {
    /// Name of the configured default remote.
    ///
    /// Fails when no default is set or when it names a remote that does not
    /// exist; both errors list the available remotes.
    pub fn get_default_remote(&self) -> ConfigResult<&str> {
        let name = self
            .default_remote
            .as_deref()
            .ok_or_else(|| ConfigError::NoDefaultRemote {
                available: self.list_remotes(),
            })?;
        self.get_remote(name)?;
        Ok(name)
    }

    /// Look up a remote by name
    pub fn get_remote(&self, name: &str) -> ConfigResult<&RemoteConfig> {
        self.remotes
            .get(name)
            .ok_or_else(|| ConfigError::UnknownRemote {
                name: name.to_string(),
                available: self.list_remotes(),
            })
    }

    /// Resolve an explicit remote name, falling back to the default
    pub fn remote_or_default(&self, name: Option<&str>) -> ConfigResult<(String, &RemoteConfig)> {
        let name = match name {
            Some(name) if !name.is_empty() => name,
            _ => self.get_default_remote()?,
        };
        Ok((name.to_string(), self.get_remote(name)?))
    }

    /// Add or replace a remote. The first remote added becomes the default.
    pub fn set_remote(&mut self, name: impl Into<String>, remote: RemoteConfig) {
        let name = name.into();
        if self.default_remote.is_none() {
            self.default_remote = Some(name.clone());
        }
        self.remotes.insert(name, remote);
    }

    /// Remove a remote, clearing the default if it pointed there
    pub fn remove_remote(&mut self, name: &str) -> Option<RemoteConfig> {
        if self.default_remote.as_deref() == Some(name) {
            self.default_remote = None;
        }
        self.remotes.remove(name)
    }

    /// Make an existing remote the default
    pub fn set_default_remote(&mut self, name: &str) -> ConfigResult<()> {
        self.get_remote(name)?;
        self.default_remote = Some(name.to_string());
        Ok(())
    }

    /// List all remote names, sorted
    pub fn list_remotes(&self) -> Vec<String> {
        self.remotes.keys().cloned().collect()
    }

    /// Load config from repository root, applying environment overrides
    pub async fn load(repo_root: impl AsRef<Path>) -> ConfigResult<Self> {
        use crate::ConfigLoader;
        ConfigLoader::new()
            .load_with_overrides(config_path(repo_root))
            .await
    }

    /// Write config to `<repo_root>/.drs/config.yaml`
    pub async fn save(&self, repo_root: impl AsRef<Path>) -> ConfigResult<()> {
        let path = config_path(repo_root);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;
        let tmp = path.with_extension("yaml.tmp");
        tokio::fs::write(&tmp, yaml).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::debug!("Saved configuration to {}", path.display());
        Ok(())
    }
}

/// A named remote, tagged by backend kind
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RemoteConfig {
    /// Registry-backed store (indexd + DRS service with a signed-URL bucket)
    Indexd(IndexdRemote),

    /// Plain S3-compatible object store; records live next to the data
    S3(S3Remote),

    /// Local DRS server without authentication
    Local(LocalRemote),
}

impl RemoteConfig {
    /// Backend kind as written in configuration
    pub fn kind(&self) -> &'static str {
        match self {
            RemoteConfig::Indexd(_) => "indexd",
            RemoteConfig::S3(_) => "s3",
            RemoteConfig::Local(_) => "local",
        }
    }

    /// Project identifier in `<program>-<project>` form
    pub fn project_id(&self) -> &str {
        match self {
            RemoteConfig::Indexd(r) => &r.project_id,
            RemoteConfig::S3(r) => &r.project_id,
            RemoteConfig::Local(r) => &r.project_id,
        }
    }

    /// Bucket receiving object bytes
    pub fn bucket(&self) -> &str {
        match self {
            RemoteConfig::Indexd(r) => &r.bucket,
            RemoteConfig::S3(r) => &r.bucket,
            RemoteConfig::Local(r) => &r.bucket,
        }
    }

    /// Service endpoint, if the backend has one
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            RemoteConfig::Indexd(r) => Some(&r.endpoint),
            RemoteConfig::S3(r) => r.endpoint.as_deref(),
            RemoteConfig::Local(r) => Some(&r.base_url),
        }
    }

    /// Authorization scope derived from the project id
    pub fn authz_scope(&self) -> ConfigResult<String> {
        project_to_resource(self.project_id())
    }
}

/// Map `<program>-<project>` to `/programs/<program>/projects/<project>`.
///
/// Splits on the first `-`, so project names may themselves contain dashes.
pub fn project_to_resource(project_id: &str) -> ConfigResult<String> {
    match project_id.split_once('-') {
        Some((program, project)) if !program.is_empty() && !project.is_empty() => {
            Ok(format!("/programs/{}/projects/{}", program, project))
        }
        _ => Err(ConfigError::invalid_value(
            "project_id",
            format!("'{}' must look like <program>-<project>", project_id),
        )),
    }
}

/// Registry-backed remote
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexdRemote {
    /// Base URL of the data commons, e.g. `https://data.example.org`
    pub endpoint: String,
    pub project_id: String,
    pub bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<CredentialRef>,
}

/// Plain object store remote. Credentials come from the AWS default chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct S3Remote {
    pub bucket: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services (MinIO, Ceph)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Key prefix for every object and record written
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prefix: String,
    #[serde(default)]
    pub force_path_style: bool,
}

/// Local, unauthenticated DRS server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalRemote {
    pub base_url: String,
    pub project_id: String,
    #[serde(default)]
    pub bucket: String,
}

/// Where to find a bearer token. Acquisition and refresh happen elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum CredentialRef {
    /// Environment variable holding the token
    Env(String),
    /// File whose trimmed contents are the token
    File(PathBuf),
}

impl CredentialRef {
    /// Read the token
    pub fn resolve(&self) -> ConfigResult<String> {
        let token = match self {
            CredentialRef::Env(var) => std::env::var(var).map_err(|_| {
                ConfigError::MissingCredential(format!("environment variable {} is not set", var))
            })?,
            CredentialRef::File(path) => std::fs::read_to_string(path).map_err(|e| {
                ConfigError::MissingCredential(format!("{}: {}", path.display(), e))
            })?,
        };
        let token = token.trim().to_string();
        if token.is_empty() {
            return Err(ConfigError::MissingCredential("token is empty".to_string()));
        }
        Ok(token)
    }
}

/// Transfer tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransferConfig {
    /// Upper bound on simultaneous object transfers (minimum 1)
    pub concurrency: usize,

    /// External tool used to fetch bytes instead of the built-in HTTP client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_command: Option<FetchCommand>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        TransferConfig {
            concurrency: 4,
            fetch_command: None,
        }
    }
}

/// External fetch tool invocation.
///
/// The tool is called as `<program> <args...> <manifest.json> <dest_dir>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct LoggingConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}
