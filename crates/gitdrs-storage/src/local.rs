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

//! Local DRS server without authentication.
//!
//! Speaks the GA4GH DRS routes of a development server and keeps object
//! bytes on a shared filesystem when the configured bucket is a directory
//! (absolute path or `file://` URL). Records then carry `file://` access
//! URLs that downloads copy directly.

use crate::fetch::{file_url_to_path, redact};
use crate::{
    DirectoryError, DirectoryResult, FetchDescriptor, ObjectDirectory, ProjectScope,
    RecordCandidate, RemoteRecord,
};
use async_trait::async_trait;
use gitdrs_config::LocalRemote;
use gitdrs_git::Oid;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DRS_OBJECTS: &str = "ga4gh/drs/v1/objects";

#[derive(Clone)]
pub struct LocalDirectory {
    client: reqwest::Client,
    base_url: String,
    scope: ProjectScope,
    bucket: String,
    /// Directory holding object bytes, when the bucket is a local path
    data_root: Option<PathBuf>,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    candidates: Vec<&'a RemoteRecord>,
}

#[derive(Deserialize)]
struct AccessResponse {
    url: String,
    #[serde(default)]
    headers: Vec<String>,
}

impl LocalDirectory {
    pub fn new(
        base_url: impl Into<String>,
        scope: ProjectScope,
        bucket: impl Into<String>,
    ) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let bucket = bucket.into();
        LocalDirectory {
            client: reqwest::Client::new(),
            base_url,
            scope,
            data_root: data_root(&bucket),
            bucket,
        }
    }

    pub fn from_config(cfg: &LocalRemote, scope: ProjectScope) -> DirectoryResult<Self> {
        Ok(Self::new(&cfg.base_url, scope, &cfg.bucket))
    }

    pub fn data_root(&self) -> Option<&Path> {
        self.data_root.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: &'static str,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> DirectoryResult<T> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DirectoryError::from_status(method, url, status.as_u16(), body));
        }
        Ok(response.json::<T>().await?)
    }

    fn object_path(&self, root: &Path, id: &str, sha256: &Oid) -> PathBuf {
        root.join(id).join(sha256.to_hex())
    }
}

impl fmt::Debug for LocalDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalDirectory")
            .field("base_url", &self.base_url)
            .field("scope", &self.scope)
            .field("bucket", &self.bucket)
            .finish()
    }
}

#[async_trait]
impl ObjectDirectory for LocalDirectory {
    fn project_scope(&self) -> &ProjectScope {
        &self.scope
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn storage_url(&self, id: &str, sha256: &Oid) -> String {
        match &self.data_root {
            Some(root) => reqwest::Url::from_file_path(self.object_path(root, id, sha256))
                .map(|u| u.to_string())
                .unwrap_or_else(|_| format!("file://{}/{}/{}", root.display(), id, sha256)),
            None => format!("s3://{}/{}/{}", self.bucket, id, sha256),
        }
    }

    async fn resolve_by_hash(
        &self,
        scope: &ProjectScope,
        sha256: &Oid,
    ) -> DirectoryResult<Option<RemoteRecord>> {
        let url = self.url(&format!("{}/checksum/{}", DRS_OBJECTS, sha256));
        let request = self.client.get(&url);
        let records: Vec<RemoteRecord> = match self.send_json("GET", request, &url).await {
            Ok(records) => records,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e),
        };
        let chosen = earliest_in_scope(records, scope);
        debug!(oid = %sha256, found = chosen.is_some(), "resolved by hash");
        Ok(chosen)
    }

    async fn register(&self, candidate: &RecordCandidate) -> DirectoryResult<RemoteRecord> {
        let url = self.url(&format!("{}/register", DRS_OBJECTS));
        let record = RemoteRecord::from_candidate(candidate);
        let body = RegisterRequest {
            candidates: vec![&record],
        };
        let mut registered: Vec<RemoteRecord> = self
            .send_json("POST", self.client.post(&url).json(&body), &url)
            .await?;
        if registered.is_empty() {
            return Err(DirectoryError::invalid_response("server returned no registered objects"));
        }
        let mut created = registered.swap_remove(0);
        if created.authz.is_empty() {
            created.authz = record.authz;
        }
        info!(id = %created.id, oid = %candidate.sha256, "registered record");
        Ok(created)
    }

    async fn delete(&self, id: &str) -> DirectoryResult<()> {
        let url = self.url(&format!("{}/{}", DRS_OBJECTS, id));
        let response = self.client.delete(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DirectoryError::from_status("DELETE", url, status.as_u16(), body));
        }
        info!(id, "deleted record");
        Ok(())
    }

    async fn list_records(&self, scope: &ProjectScope) -> DirectoryResult<Vec<RemoteRecord>> {
        let url = self.url(DRS_OBJECTS);
        let request = self.client.get(&url).query(&[("authz", scope.as_str())]);
        let records: Vec<RemoteRecord> = match self.send_json("GET", request, &url).await {
            Ok(records) => records,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e),
        };
        let mut records: Vec<_> = records.into_iter().filter(|r| r.in_scope(scope)).collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        debug!(scope = %scope, count = records.len(), "listed records");
        Ok(records)
    }

    async fn fetch_descriptor(&self, record: &RemoteRecord) -> DirectoryResult<FetchDescriptor> {
        if let Some(url) = record
            .access_methods
            .iter()
            .filter_map(|m| m.url())
            .find(|u| u.starts_with("file://"))
        {
            return Ok(FetchDescriptor::new(url));
        }

        let method = record.primary_access().ok_or_else(|| {
            DirectoryError::not_found(format!("record {} has no access method", record.id))
        })?;
        match (&method.access_id, &method.access_url) {
            (Some(access_id), _) => {
                let url = self.url(&format!("{}/{}/access/{}", DRS_OBJECTS, record.id, access_id));
                let access: AccessResponse =
                    self.send_json("GET", self.client.get(&url), &url).await?;
                Ok(FetchDescriptor::with_header_lines(access.url, &access.headers))
            }
            (None, Some(access_url)) => Ok(FetchDescriptor::with_header_lines(
                access_url.url.clone(),
                &access_url.headers,
            )),
            (None, None) => Err(DirectoryError::not_found(format!(
                "record {} has no usable access method",
                record.id
            ))),
        }
    }

    async fn upload(&self, record: &RemoteRecord, path: &Path) -> DirectoryResult<()> {
        let target = record
            .storage_url()
            .filter(|u| u.starts_with("file://"))
            .ok_or_else(|| {
                DirectoryError::backend(format!(
                    "local remote cannot upload to {}",
                    record.storage_url().map(redact).unwrap_or("<none>")
                ))
            })?;
        let dest = file_url_to_path(target)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let partial = dest.with_extension("part");
        tokio::fs::copy(path, &partial).await?;
        tokio::fs::File::open(&partial).await?.sync_all().await?;
        tokio::fs::rename(&partial, &dest).await?;
        info!(id = %record.id, dest = %dest.display(), "stored object");
        Ok(())
    }

    async fn has_content(&self, record: &RemoteRecord) -> DirectoryResult<bool> {
        let Some(url) = record.storage_url().filter(|u| u.starts_with("file://")) else {
            return Ok(false);
        };
        let path = file_url_to_path(url)?;
        Ok(tokio::fs::metadata(&path)
            .await
            .map(|m| m.len() == record.size)
            .unwrap_or(false))
    }
}

fn data_root(bucket: &str) -> Option<PathBuf> {
    if bucket.starts_with("file://") {
        return file_url_to_path(bucket).ok();
    }
    let path = Path::new(bucket);
    path.is_absolute().then(|| path.to_path_buf())
}

/// Earliest created record under `scope`; undated records rank last
fn earliest_in_scope(records: Vec<RemoteRecord>, scope: &ProjectScope) -> Option<RemoteRecord> {
    records
        .into_iter()
        .filter(|r| r.in_scope(scope))
        .min_by(|a, b| {
            (a.created_time.is_none(), &a.created_time, &a.id).cmp(&(
                b.created_time.is_none(),
                &b.created_time,
                &b.id,
            ))
        })
}
