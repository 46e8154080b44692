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

//! Byte transport for fetch descriptors.
//!
//! A [`Fetcher`] writes the bytes behind a descriptor to a destination
//! file, hashing while it writes, and fsyncs before returning. Hash and
//! size verification against the expected values is left to the caller.

use crate::{DirectoryError, DirectoryResult, FetchDescriptor};
use async_trait::async_trait;
use futures::StreamExt;
use gitdrs_git::{ContentHasher, Oid};
use serde::Serialize;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

const CHUNK_SIZE: usize = 64 * 1024;

/// Progress callback: `(bytes_so_far, bytes_since_last)`
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Result of a completed download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fetched {
    pub sha256: Oid,
    pub size: u64,
}

#[async_trait]
pub trait Fetcher: Send + Sync + Debug {
    /// Download `descriptor` into `dest`, replacing any existing file
    async fn fetch(
        &self,
        descriptor: &FetchDescriptor,
        dest: &Path,
        progress: Option<ProgressFn>,
    ) -> DirectoryResult<Fetched>;
}

/// Streams `http(s)://` descriptors with reqwest and copies `file://` ones
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        HttpFetcher { client }
    }

    async fn fetch_http(
        &self,
        descriptor: &FetchDescriptor,
        dest: &Path,
        progress: Option<ProgressFn>,
    ) -> DirectoryResult<Fetched> {
        let mut request = self.client.get(&descriptor.url);
        for (name, value) in &descriptor.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DirectoryError::from_status(
                "GET",
                redact(&descriptor.url),
                status.as_u16(),
                body,
            ));
        }

        let mut file = File::create(dest).await?;
        let mut hasher = ContentHasher::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            hasher.update(&chunk);
            if let Some(report) = &progress {
                report(hasher.bytes_hashed(), chunk.len() as u64);
            }
        }
        file.sync_all().await?;

        let size = hasher.bytes_hashed();
        Ok(Fetched {
            sha256: hasher.finalize(),
            size,
        })
    }

    async fn fetch_file(
        &self,
        source: &Path,
        dest: &Path,
        progress: Option<ProgressFn>,
    ) -> DirectoryResult<Fetched> {
        let mut input = File::open(source).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DirectoryError::not_found(source.display().to_string())
            } else {
                e.into()
            }
        })?;
        let mut output = File::create(dest).await?;
        let mut hasher = ContentHasher::new();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = input.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            output.write_all(&buf[..n]).await?;
            hasher.update(&buf[..n]);
            if let Some(report) = &progress {
                report(hasher.bytes_hashed(), n as u64);
            }
        }
        output.sync_all().await?;

        let size = hasher.bytes_hashed();
        Ok(Fetched {
            sha256: hasher.finalize(),
            size,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        descriptor: &FetchDescriptor,
        dest: &Path,
        progress: Option<ProgressFn>,
    ) -> DirectoryResult<Fetched> {
        debug!(url = %redact(&descriptor.url), dest = %dest.display(), "fetching");
        if descriptor.url.starts_with("file://") {
            let source = file_url_to_path(&descriptor.url)?;
            self.fetch_file(&source, dest, progress).await
        } else {
            self.fetch_http(descriptor, dest, progress).await
        }
    }
}

/// Delegates downloads to an external tool
///
/// Arguments may contain `{url}`, `{dest}` and `{manifest}` placeholders.
/// The manifest is a JSON file describing the download (url, headers,
/// destination) for tools that take their input from a file. The tool
/// must leave the complete content at `{dest}`.
#[derive(Debug, Clone)]
pub struct CommandFetcher {
    program: String,
    args: Vec<String>,
}

#[derive(Serialize)]
struct Manifest<'a> {
    url: &'a str,
    headers: &'a [(String, String)],
    dest: &'a Path,
}

impl CommandFetcher {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        CommandFetcher {
            program: program.into(),
            args,
        }
    }

    fn expand(&self, url: &str, dest: &Path, manifest: &Path) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{url}", url)
                    .replace("{dest}", &dest.to_string_lossy())
                    .replace("{manifest}", &manifest.to_string_lossy())
            })
            .collect()
    }
}

#[async_trait]
impl Fetcher for CommandFetcher {
    async fn fetch(
        &self,
        descriptor: &FetchDescriptor,
        dest: &Path,
        progress: Option<ProgressFn>,
    ) -> DirectoryResult<Fetched> {
        let manifest_path = sibling(dest, "manifest.json");
        let manifest = Manifest {
            url: &descriptor.url,
            headers: &descriptor.headers,
            dest,
        };
        tokio::fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?).await?;

        let args = self.expand(&descriptor.url, dest, &manifest_path);
        debug!(program = %self.program, dest = %dest.display(), "running external fetcher");
        let output = tokio::process::Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;
        let _ = tokio::fs::remove_file(&manifest_path).await;
        let output = output.map_err(|e| {
            DirectoryError::backend(format!("failed to run {}: {}", self.program, e))
        })?;

        if !output.status.success() {
            return Err(DirectoryError::backend(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let fetched = hash_file(dest).await?;
        if let Some(report) = &progress {
            report(fetched.size, fetched.size);
        }
        Ok(fetched)
    }
}

/// Hash and fsync a file produced by someone else
pub async fn hash_file(path: &Path) -> DirectoryResult<Fetched> {
    let mut file = File::open(path).await?;
    let mut hasher = ContentHasher::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    file.sync_all().await?;
    let size = hasher.bytes_hashed();
    Ok(Fetched {
        sha256: hasher.finalize(),
        size,
    })
}

pub(crate) async fn write_all_hashed(
    dest: &Path,
    data: &[u8],
    progress: Option<ProgressFn>,
) -> DirectoryResult<Fetched> {
    let mut file = File::create(dest).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    if let Some(report) = &progress {
        report(data.len() as u64, data.len() as u64);
    }
    Ok(Fetched {
        sha256: Oid::hash(data),
        size: data.len() as u64,
    })
}

/// Local path behind a `file://` URL
pub fn file_url_to_path(url: &str) -> DirectoryResult<PathBuf> {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.to_file_path().ok())
        .ok_or_else(|| DirectoryError::invalid_response(format!("invalid file url: {}", url)))
}

/// URL without its query string, which carries signatures on signed URLs
pub(crate) fn redact(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
