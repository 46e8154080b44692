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

//! Plain S3-compatible object store used as a directory.
//!
//! There is no metadata service, so records are JSON documents stored
//! beside the data:
//!
//! - records: `<prefix>drs-records/<scope>/<sha256>.json`
//! - bytes: `<prefix><id>/<sha256>`
//!
//! Record creation is a conditional put (`If-None-Match: *`); a losing
//! racer gets [`DirectoryError::AlreadyExists`]. Downloads use presigned
//! GET URLs so the regular HTTP fetcher can stream them.

use crate::{
    DirectoryError, DirectoryResult, FetchDescriptor, ObjectDirectory, ProjectScope,
    RecordCandidate, RemoteRecord,
};
use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use gitdrs_config::S3Remote;
use gitdrs_git::Oid;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

const RECORDS_DIR: &str = "drs-records";
const PRESIGN_TTL: Duration = Duration::from_secs(3600);

#[derive(Clone)]
pub struct S3Directory {
    client: Client,
    bucket: String,
    prefix: String,
    scope: ProjectScope,
}

impl S3Directory {
    /// Wrap an existing client
    pub fn new(
        client: Client,
        bucket: impl Into<String>,
        prefix: &str,
        scope: ProjectScope,
    ) -> Self {
        S3Directory {
            client,
            bucket: bucket.into(),
            prefix: normalize_prefix(prefix),
            scope,
        }
    }

    /// Build a client from the ambient AWS configuration plus remote overrides
    pub async fn from_config(cfg: &S3Remote, scope: ProjectScope) -> DirectoryResult<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &cfg.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &cfg.endpoint {
            debug!("Using custom S3 endpoint: {}", endpoint);
            builder = builder.endpoint_url(endpoint.clone());
        }
        if cfg.force_path_style {
            builder = builder.force_path_style(true);
        }
        let client = Client::from_conf(builder.build());

        debug!(
            bucket = %cfg.bucket,
            region = ?sdk_config.region(),
            "S3 directory client ready"
        );
        Ok(Self::new(client, &cfg.bucket, &cfg.prefix, scope))
    }

    fn record_key(&self, scope: &ProjectScope, sha256: &Oid) -> String {
        record_key(&self.prefix, scope, sha256)
    }

    fn data_key(&self, id: &str, sha256: &Oid) -> String {
        format!("{}{}/{}", self.prefix, id, sha256)
    }

    /// Object key behind a record, from its `s3://` URL when it points
    /// into this bucket
    fn content_key(&self, record: &RemoteRecord) -> DirectoryResult<String> {
        if let Some((bucket, key)) = record.storage_url().and_then(parse_s3_url) {
            if bucket == self.bucket {
                return Ok(key.to_string());
            }
        }
        let sha = record.sha256().ok_or_else(|| {
            DirectoryError::invalid_response(format!("record {} has no sha256", record.id))
        })?;
        Ok(self.data_key(&record.id, &sha))
    }

    /// Every key under `prefix`, following continuation tokens
    async fn list_keys(&self, prefix: &str) -> DirectoryResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;
        loop {
            let mut request = self.client.list_objects_v2().bucket(&self.bucket).prefix(prefix);
            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }
            let response = request
                .send()
                .await
                .map_err(|e| map_sdk_error("LIST", prefix, e))?;
            keys.extend(response.contents().iter().filter_map(|o| o.key()).map(str::to_string));

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token().map(str::to_string);
            } else {
                break;
            }
        }
        debug!(prefix, count = keys.len(), "listed keys");
        Ok(keys)
    }

    /// Record document stored at `key`, `None` when absent
    async fn read_record(&self, key: &str) -> DirectoryResult<Option<RemoteRecord>> {
        let response = match self.client.get_object().bucket(&self.bucket).key(key).send().await {
            Ok(response) => response,
            Err(e) => {
                let err = map_sdk_error("GET", key, e);
                if err.is_not_found() {
                    return Ok(None);
                }
                return Err(err);
            }
        };
        let body = response
            .body
            .collect()
            .await
            .map_err(|e| DirectoryError::Transport(format!("reading {}: {}", key, e)))?;
        Ok(Some(serde_json::from_slice(&body.into_bytes())?))
    }

    /// All record documents under `scope` with their keys
    ///
    /// Unreadable documents are skipped with a warning so one bad entry
    /// does not hide the rest.
    async fn records_in(
        &self,
        scope: &ProjectScope,
    ) -> DirectoryResult<Vec<(String, RemoteRecord)>> {
        let prefix = records_prefix(&self.prefix, scope);
        let mut records = Vec::new();
        for key in self.list_keys(&prefix).await? {
            if !key.ends_with(".json") {
                continue;
            }
            match self.read_record(&key).await {
                Ok(Some(record)) => records.push((key, record)),
                Ok(None) => {}
                Err(e @ DirectoryError::InvalidResponse(_)) => {
                    warn!(key = %key, "skipping unreadable record: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }

    async fn delete_key(&self, key: &str) -> DirectoryResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error("DELETE", key, e))?;
        Ok(())
    }

    async fn presign_get(&self, key: &str) -> DirectoryResult<String> {
        let presigning = PresigningConfig::expires_in(PRESIGN_TTL)
            .map_err(|e| DirectoryError::backend(format!("presigning config: {}", e)))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| map_sdk_error("PRESIGN", key, e))?;
        Ok(request.uri().to_string())
    }
}

impl fmt::Debug for S3Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Directory")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .field("scope", &self.scope)
            .finish()
    }
}

#[async_trait]
impl ObjectDirectory for S3Directory {
    fn project_scope(&self) -> &ProjectScope {
        &self.scope
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn storage_url(&self, id: &str, sha256: &Oid) -> String {
        format!("s3://{}/{}", self.bucket, self.data_key(id, sha256))
    }

    async fn resolve_by_hash(
        &self,
        scope: &ProjectScope,
        sha256: &Oid,
    ) -> DirectoryResult<Option<RemoteRecord>> {
        let key = self.record_key(scope, sha256);
        let Some(record) = self.read_record(&key).await? else {
            debug!(oid = %sha256, "no record");
            return Ok(None);
        };
        if record.sha256().as_ref() != Some(sha256) {
            warn!(key = %key, "record checksum does not match its key; ignoring");
            return Ok(None);
        }
        Ok(Some(record))
    }

    async fn register(&self, candidate: &RecordCandidate) -> DirectoryResult<RemoteRecord> {
        let record = RemoteRecord::from_candidate(candidate);
        let key = self.record_key(&candidate.scope, &candidate.sha256);
        let body = serde_json::to_vec_pretty(&record)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .if_none_match("*")
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| map_sdk_error("PUT", &key, e))?;
        info!(id = %record.id, oid = %candidate.sha256, "registered record");
        Ok(record)
    }

    async fn delete(&self, id: &str) -> DirectoryResult<()> {
        let (record_key, _) = self
            .records_in(&self.scope)
            .await?
            .into_iter()
            .find(|(_, record)| record.id == id)
            .ok_or_else(|| DirectoryError::not_found(id))?;
        self.delete_key(&record_key).await?;

        // Bytes may never have been uploaded; the record goes either way
        let data_prefix = format!("{}{}/", self.prefix, id);
        for key in self.list_keys(&data_prefix).await? {
            self.delete_key(&key).await?;
        }
        info!(id, "deleted record");
        Ok(())
    }

    async fn list_records(&self, scope: &ProjectScope) -> DirectoryResult<Vec<RemoteRecord>> {
        let mut records: Vec<RemoteRecord> = self
            .records_in(scope)
            .await?
            .into_iter()
            .map(|(_, record)| record)
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    async fn fetch_descriptor(&self, record: &RemoteRecord) -> DirectoryResult<FetchDescriptor> {
        let key = self.content_key(record)?;
        Ok(FetchDescriptor::new(self.presign_get(&key).await?))
    }

    async fn upload(&self, record: &RemoteRecord, path: &Path) -> DirectoryResult<()> {
        let key = self.content_key(record)?;
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| DirectoryError::backend(format!("reading {}: {}", path.display(), e)))?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(body)
            .send()
            .await
            .map_err(|e| map_sdk_error("PUT", &key, e))?;
        info!(id = %record.id, key = %key, "uploaded object");
        Ok(())
    }

    async fn has_content(&self, record: &RemoteRecord) -> DirectoryResult<bool> {
        let key = self.content_key(record)?;
        match self.client.head_object().bucket(&self.bucket).key(&key).send().await {
            Ok(head) => Ok(head.content_length().is_some_and(|len| len as u64 == record.size)),
            Err(e) => {
                let err = map_sdk_error("HEAD", &key, e);
                if err.is_not_found() {
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }
}

fn map_sdk_error<E>(method: &'static str, key: &str, err: SdkError<E>) -> DirectoryError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let detail = DisplayErrorContext(&err).to_string();
    match status {
        Some(404) => DirectoryError::not_found(key),
        Some(409) | Some(412) => DirectoryError::already_exists(key),
        Some(401) | Some(403) => {
            DirectoryError::unauthorized(format!("{} {}: {}", method, key, detail))
        }
        Some(status) => DirectoryError::Http {
            method,
            url: key.to_string(),
            status,
            body: detail,
        },
        None => DirectoryError::Transport(detail),
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

fn records_prefix(prefix: &str, scope: &ProjectScope) -> String {
    format!("{}{}/{}/", prefix, RECORDS_DIR, scope.key())
}

fn record_key(prefix: &str, scope: &ProjectScope, sha256: &Oid) -> String {
    format!("{}{}.json", records_prefix(prefix, scope), sha256)
}

/// Split `s3://bucket/key` into its parts
fn parse_s3_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("s3://")?;
    let (bucket, key) = rest.split_once('/')?;
    (!bucket.is_empty() && !key.is_empty()).then_some((bucket, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_directory(prefix: &str) -> S3Directory {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();
        S3Directory::new(
            Client::from_conf(config),
            "bucket",
            prefix,
            ProjectScope::new("/programs/p/projects/x"),
        )
    }

    #[test]
    fn test_prefix_normalization() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix("data"), "data/");
        assert_eq!(normalize_prefix("/data/lfs/"), "data/lfs/");
    }

    #[test]
    fn test_record_key_layout() {
        let oid = Oid::hash(b"x");
        let scope = ProjectScope::new("/programs/p/projects/x");
        assert_eq!(
            record_key("pre/", &scope, &oid),
            format!("pre/drs-records/programs/p/projects/x/{}.json", oid)
        );
    }

    #[test]
    fn test_records_of_a_scope_share_one_prefix() {
        let scope = ProjectScope::new("/programs/p/projects/x");
        let other = ProjectScope::new("/programs/p/projects/xy");
        let prefix = records_prefix("pre/", &scope);
        assert_eq!(prefix, "pre/drs-records/programs/p/projects/x/");
        assert!(record_key("pre/", &scope, &Oid::hash(b"a")).starts_with(&prefix));
        assert!(!record_key("pre/", &other, &Oid::hash(b"a")).starts_with(&prefix));
    }

    #[test]
    fn test_parse_s3_url() {
        assert_eq!(parse_s3_url("s3://b/k/sha"), Some(("b", "k/sha")));
        assert_eq!(parse_s3_url("s3://b"), None);
        assert_eq!(parse_s3_url("gs://b/k"), None);
    }

    #[test]
    fn test_storage_url_and_content_key_agree() {
        let dir = offline_directory("lfs");
        let oid = Oid::hash(b"content");
        let candidate = dir.candidate(oid, 7, "c.bin");
        assert_eq!(
            candidate.storage_url,
            format!("s3://bucket/lfs/{}/{}", candidate.proposed_id, oid)
        );

        let record = RemoteRecord::from_candidate(&candidate);
        assert_eq!(
            dir.content_key(&record).unwrap(),
            format!("lfs/{}/{}", candidate.proposed_id, oid)
        );
    }

    #[test]
    fn test_content_key_for_foreign_bucket_falls_back() {
        let dir = offline_directory("");
        let oid = Oid::hash(b"content");
        let mut record = RemoteRecord::from_candidate(&dir.candidate(oid, 7, "c.bin"));
        record.access_methods[0].access_url.as_mut().unwrap().url = "s3://other/elsewhere".into();
        assert_eq!(dir.content_key(&record).unwrap(), format!("{}/{}", record.id, oid));
    }
}
