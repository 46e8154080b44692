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

//! Registry-backed directory: indexd records plus GA4GH DRS access.
//!
//! Records live in indexd (`index/index`), downloads go through the DRS
//! access endpoint, and uploads use a signed URL handed out by the data
//! commons (`user/data/upload`). Authentication is a bearer token.

use crate::fetch::redact;
use crate::record::url_scheme;
use crate::{
    AccessMethod, Checksum, DirectoryError, DirectoryResult, FetchDescriptor, ObjectDirectory,
    ProjectScope, RecordCandidate, RemoteRecord,
};
use async_trait::async_trait;
use gitdrs_config::IndexdRemote;
use gitdrs_git::Oid;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

/// Retry policy for idempotent requests
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            initial_delay_ms: 200,
        }
    }
}

/// Records requested per `index/index` listing page
const LIST_PAGE_SIZE: usize = 50;

/// Client for an indexd-backed data commons
#[derive(Clone)]
pub struct IndexdDirectory {
    client: reqwest::Client,
    base_url: String,
    scope: ProjectScope,
    bucket: String,
    token: Option<String>,
    retry: RetryPolicy,
}

/// indexd record as returned by `GET index/index`
#[derive(Debug, Clone, Deserialize)]
struct IndexdRecord {
    did: String,
    #[serde(default)]
    rev: Option<String>,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    urls: Vec<String>,
    #[serde(default)]
    authz: Vec<String>,
    #[serde(default)]
    hashes: BTreeMap<String, String>,
    #[serde(default)]
    created_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndexdList {
    #[serde(default)]
    records: Vec<IndexdRecord>,
}

#[derive(Debug, Serialize)]
struct IndexdRegistration<'a> {
    did: &'a str,
    file_name: &'a str,
    urls: Vec<&'a str>,
    size: u64,
    authz: Vec<&'a str>,
    hashes: BTreeMap<&'static str, String>,
    form: &'static str,
}

#[derive(Debug, Deserialize)]
struct IndexdCreated {
    did: String,
}

#[derive(Debug, Deserialize)]
struct SignedUrl {
    url: String,
    #[serde(default)]
    headers: Vec<String>,
}

impl IndexdRecord {
    fn into_remote(self) -> RemoteRecord {
        let checksums = self
            .hashes
            .iter()
            .map(|(kind, value)| Checksum {
                kind: kind.clone(),
                checksum: value.clone(),
            })
            .collect();
        let access_methods = self
            .urls
            .iter()
            .map(|url| AccessMethod::for_url(url, None))
            .collect();
        RemoteRecord {
            id: self.did,
            name: self.file_name,
            size: self.size,
            checksums,
            access_methods,
            authz: self.authz,
            created_time: self.created_date,
        }
    }
}

impl IndexdDirectory {
    /// Create a client for `base_url` (e.g. `https://data.example.org`)
    pub fn new(
        base_url: impl Into<String>,
        scope: ProjectScope,
        bucket: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        IndexdDirectory {
            client: reqwest::Client::new(),
            base_url,
            scope,
            bucket: bucket.into(),
            token,
            retry: RetryPolicy::default(),
        }
    }

    /// Build from remote configuration, resolving the credential
    pub fn from_config(cfg: &IndexdRemote, scope: ProjectScope) -> DirectoryResult<Self> {
        let token = cfg.credential.as_ref().map(|c| c.resolve()).transpose()?;
        if token.is_none() {
            warn!(
                endpoint = %cfg.endpoint,
                "no credential configured; requests are unauthenticated"
            );
        }
        Ok(Self::new(&cfg.endpoint, scope, &cfg.bucket, token))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(
        method: &'static str,
        url: &str,
        response: reqwest::Response,
    ) -> DirectoryResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(DirectoryError::from_status(method, redact(url), status.as_u16(), body))
    }

    /// GET and decode JSON, retrying transient failures with exponential backoff
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> DirectoryResult<T> {
        let mut attempt = 0;
        let mut delay_ms = self.retry.initial_delay_ms;
        loop {
            let result = async {
                let response = self.authorized(self.client.get(url)).send().await?;
                let response = Self::check("GET", url, response).await?;
                Ok::<T, DirectoryError>(response.json::<T>().await?)
            }
            .await;

            match result {
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    warn!(
                        "GET {} failed (attempt {}/{}), retrying in {}ms: {}",
                        redact(url),
                        attempt,
                        self.retry.max_retries,
                        delay_ms,
                        e
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    delay_ms = (delay_ms * 2).min(10_000);
                }
                other => return other,
            }
        }
    }

    fn resolve_url(sha256: &Oid) -> String {
        format!("index/index?hash=sha256:{}", sha256)
    }

    fn list_page_url(&self, scope: &ProjectScope, page: usize) -> DirectoryResult<String> {
        let url = self.url("index/index");
        let limit = LIST_PAGE_SIZE.to_string();
        let page = page.to_string();
        let params = [
            ("authz", scope.as_str()),
            ("limit", limit.as_str()),
            ("page", page.as_str()),
        ];
        reqwest::Url::parse_with_params(&url, &params)
            .map(|u| u.to_string())
            .map_err(|e| DirectoryError::backend(format!("invalid list url {}: {}", url, e)))
    }
}

impl fmt::Debug for IndexdDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexdDirectory")
            .field("base_url", &self.base_url)
            .field("scope", &self.scope)
            .field("bucket", &self.bucket)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

#[async_trait]
impl ObjectDirectory for IndexdDirectory {
    fn project_scope(&self) -> &ProjectScope {
        &self.scope
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn resolve_by_hash(
        &self,
        scope: &ProjectScope,
        sha256: &Oid,
    ) -> DirectoryResult<Option<RemoteRecord>> {
        let url = self.url(&Self::resolve_url(sha256));
        let list: IndexdList = self.get_json(&url).await?;
        let total = list.records.len();
        let record = select_in_scope(list.records, scope);
        debug!(oid = %sha256, total, found = record.is_some(), "resolved by hash");
        Ok(record.map(IndexdRecord::into_remote))
    }

    async fn register(&self, candidate: &RecordCandidate) -> DirectoryResult<RemoteRecord> {
        let url = self.url("index/index");
        let body = IndexdRegistration {
            did: &candidate.proposed_id,
            file_name: &candidate.name,
            urls: vec![&candidate.storage_url],
            size: candidate.size,
            authz: vec![candidate.scope.as_str()],
            hashes: BTreeMap::from([("sha256", candidate.sha256.to_hex())]),
            form: "object",
        };
        let response = self
            .authorized(self.client.post(&url))
            .json(&body)
            .send()
            .await?;
        let created: IndexdCreated = Self::check("POST", &url, response).await?.json().await?;

        let mut record = RemoteRecord::from_candidate(candidate);
        record.id = created.did;
        info!(id = %record.id, oid = %candidate.sha256, "registered record");
        Ok(record)
    }

    async fn delete(&self, id: &str) -> DirectoryResult<()> {
        let record_url = self.url(&format!("index/index/{}", id));
        let existing: IndexdRecord = self.get_json(&record_url).await?;
        let rev = existing
            .rev
            .ok_or_else(|| DirectoryError::invalid_response(format!("record {} has no rev", id)))?;

        let response = self
            .authorized(self.client.delete(&record_url).query(&[("rev", rev.as_str())]))
            .send()
            .await?;
        Self::check("DELETE", &record_url, response).await?;
        info!(id, "deleted record");
        Ok(())
    }

    async fn list_records(&self, scope: &ProjectScope) -> DirectoryResult<Vec<RemoteRecord>> {
        let mut records = Vec::new();
        for page in 0.. {
            let url = self.list_page_url(scope, page)?;
            let list: IndexdList = self.get_json(&url).await?;
            let count = list.records.len();
            records.extend(
                list.records
                    .into_iter()
                    .filter(|r| r.authz.iter().any(|a| a == scope.as_str()))
                    .map(IndexdRecord::into_remote),
            );
            if count < LIST_PAGE_SIZE {
                break;
            }
        }
        records.sort_by(|a, b| a.id.cmp(&b.id));
        debug!(scope = %scope, count = records.len(), "listed records");
        Ok(records)
    }

    async fn fetch_descriptor(&self, record: &RemoteRecord) -> DirectoryResult<FetchDescriptor> {
        let access_id = record
            .primary_access()
            .and_then(|m| {
                m.access_id
                    .clone()
                    .or_else(|| m.url().and_then(url_scheme).map(str::to_string))
            })
            .ok_or_else(|| {
                DirectoryError::not_found(format!("record {} has no access method", record.id))
            })?;
        let url = self.url(&format!("ga4gh/drs/v1/objects/{}/access/{}", record.id, access_id));
        let signed: SignedUrl = self.get_json(&url).await?;
        Ok(FetchDescriptor::with_header_lines(signed.url, &signed.headers))
    }

    async fn upload(&self, record: &RemoteRecord, path: &Path) -> DirectoryResult<()> {
        let file_name = record
            .storage_url()
            .and_then(|u| u.rsplit('/').next())
            .unwrap_or(&record.id);
        let url = self.url(&format!("user/data/upload/{}", record.id));
        let request_url = reqwest::Url::parse_with_params(
            &url,
            &[("bucket", self.bucket.as_str()), ("file_name", file_name)],
        )
        .map_err(|e| DirectoryError::backend(format!("invalid upload url {}: {}", url, e)))?;
        let signed: SignedUrl = self.get_json(request_url.as_str()).await?;

        let file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len();
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let response = self
            .client
            .put(&signed.url)
            .header(reqwest::header::CONTENT_LENGTH, size)
            .body(body)
            .send()
            .await?;
        Self::check("PUT", &signed.url, response).await?;
        info!(id = %record.id, size, "uploaded object");
        Ok(())
    }

    async fn has_content(&self, record: &RemoteRecord) -> DirectoryResult<bool> {
        let descriptor = match self.fetch_descriptor(record).await {
            Ok(d) => d,
            Err(e) if e.is_not_found() => return Ok(false),
            Err(e) => return Err(e),
        };
        let mut request = self
            .client
            .get(&descriptor.url)
            .header(reqwest::header::RANGE, "bytes=0-0");
        for (name, value) in &descriptor.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let status = request.send().await?.status();
        debug!(id = %record.id, status = status.as_u16(), "content check");
        match status.as_u16() {
            200 | 206 => Ok(true),
            404 | 403 => Ok(false),
            code => Err(DirectoryError::from_status(
                "GET",
                redact(&descriptor.url),
                code,
                String::new(),
            )),
        }
    }
}

/// Pick the record registered under `scope`. Among several, the earliest
/// created wins so every client resolves the same one; undated records
/// rank after every dated one.
fn select_in_scope(records: Vec<IndexdRecord>, scope: &ProjectScope) -> Option<IndexdRecord> {
    records
        .into_iter()
        .filter(|r| r.authz.iter().any(|a| a == scope.as_str()))
        .min_by(|a, b| {
            (a.created_date.is_none(), &a.created_date, &a.did).cmp(&(
                b.created_date.is_none(),
                &b.created_date,
                &b.did,
            ))
        })
}
