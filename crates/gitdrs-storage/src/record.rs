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

//! Record types shared by every directory backend.
//!
//! [`RemoteRecord`] serializes as a GA4GH DRS object so the local DRS
//! server and the S3 record files use the same JSON shape.

use gitdrs_git::Oid;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Checksum type recorded for content hashes
pub const SHA256: &str = "sha256";

/// Authorization path a record is registered under,
/// e.g. `/programs/prog/projects/proj`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectScope(String);

impl ProjectScope {
    /// Wrap an already formatted authorization path
    pub fn new(path: impl Into<String>) -> Self {
        ProjectScope(path.into())
    }

    /// Derive the scope from a `<program>-<project>` identifier
    pub fn from_project_id(project_id: &str) -> gitdrs_config::ConfigResult<Self> {
        gitdrs_config::project_to_resource(project_id).map(ProjectScope)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Scope as a relative object-key fragment (`programs/prog/projects/proj`)
    pub fn key(&self) -> &str {
        self.0.trim_matches('/')
    }
}

impl fmt::Display for ProjectScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum {
    #[serde(rename = "type")]
    pub kind: String,
    pub checksum: String,
}

impl Checksum {
    pub fn sha256(oid: &Oid) -> Self {
        Checksum {
            kind: SHA256.to_string(),
            checksum: oid.to_hex(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessUrl {
    pub url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorizations {
    pub value: String,
}

/// One way of reaching a record's bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessMethod {
    /// URL scheme of the storage location (`s3`, `gs`, `https`, `file`)
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_url: Option<AccessUrl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(
        rename = "Authorizations",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub authorizations: Option<Authorizations>,
}

impl AccessMethod {
    /// Access method pointing at a storage URL, keyed by its scheme
    pub fn for_url(url: &str, scope: Option<&ProjectScope>) -> Self {
        let scheme = url_scheme(url).unwrap_or("https").to_string();
        AccessMethod {
            kind: scheme.clone(),
            access_url: Some(AccessUrl {
                url: url.to_string(),
                headers: Vec::new(),
            }),
            access_id: Some(scheme),
            region: None,
            authorizations: scope.map(|s| Authorizations {
                value: s.as_str().to_string(),
            }),
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.access_url.as_ref().map(|u| u.url.as_str())
    }
}

/// Remote metadata entry for one piece of content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub size: u64,
    #[serde(default)]
    pub checksums: Vec<Checksum>,
    #[serde(default)]
    pub access_methods: Vec<AccessMethod>,
    /// Authorization paths; indexd carries these directly, DRS objects
    /// carry them per access method
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authz: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
}

impl RemoteRecord {
    /// Record a backend would store for `candidate`
    pub fn from_candidate(candidate: &RecordCandidate) -> Self {
        RemoteRecord {
            id: candidate.proposed_id.clone(),
            name: Some(candidate.name.clone()),
            size: candidate.size,
            checksums: vec![Checksum::sha256(&candidate.sha256)],
            access_methods: vec![AccessMethod::for_url(
                &candidate.storage_url,
                Some(&candidate.scope),
            )],
            authz: vec![candidate.scope.as_str().to_string()],
            created_time: None,
        }
    }

    /// SHA-256 checksum, if the record carries a well-formed one
    pub fn sha256(&self) -> Option<Oid> {
        self.checksums
            .iter()
            .find(|c| c.kind.eq_ignore_ascii_case(SHA256))
            .and_then(|c| Oid::from_hex(&c.checksum).ok())
    }

    /// Whether the record is registered under `scope`
    pub fn in_scope(&self, scope: &ProjectScope) -> bool {
        self.authz.iter().any(|a| a == scope.as_str())
            || self.access_methods.iter().any(|m| {
                m.authorizations
                    .as_ref()
                    .is_some_and(|a| a.value == scope.as_str())
            })
    }

    /// First access method, which backends use for downloads
    pub fn primary_access(&self) -> Option<&AccessMethod> {
        self.access_methods.first()
    }

    /// Storage URL of the primary access method
    pub fn storage_url(&self) -> Option<&str> {
        self.primary_access().and_then(AccessMethod::url)
    }
}

/// Registration request built by the reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordCandidate {
    /// Client-proposed identifier; the backend may assign another
    pub proposed_id: String,
    pub name: String,
    pub size: u64,
    pub sha256: Oid,
    pub scope: ProjectScope,
    pub storage_url: String,
}

/// Where and how to download a record's bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchDescriptor {
    pub url: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

impl FetchDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        FetchDescriptor {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Build from DRS `"Name: value"` header strings, dropping malformed ones
    pub fn with_header_lines(url: impl Into<String>, lines: &[String]) -> Self {
        let headers = lines
            .iter()
            .filter_map(|line| {
                let (name, value) = line.split_once(':')?;
                let name = name.trim();
                (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
            })
            .collect();
        FetchDescriptor {
            url: url.into(),
            headers,
        }
    }
}

/// Lower-cased scheme of `url`, if it has one
pub fn url_scheme(url: &str) -> Option<&str> {
    let (scheme, _) = url.split_once("://")?;
    let valid = !scheme.is_empty()
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> RecordCandidate {
        RecordCandidate {
            proposed_id: "0b5e6a52-0000-4000-8000-000000000001".into(),
            name: "data/a.bin".into(),
            size: 10,
            sha256: Oid::hash(b"0123456789"),
            scope: ProjectScope::new("/programs/p/projects/x"),
            storage_url: "s3://bucket/0b5e6a52-0000-4000-8000-000000000001/abc".into(),
        }
    }

    #[test]
    fn test_scope_from_project_id() {
        let scope = ProjectScope::from_project_id("prog-my-proj").unwrap();
        assert_eq!(scope.as_str(), "/programs/prog/projects/my-proj");
        assert_eq!(scope.key(), "programs/prog/projects/my-proj");
        assert!(ProjectScope::from_project_id("nodash").is_err());
    }

    #[test]
    fn test_record_from_candidate() {
        let c = candidate();
        let record = RemoteRecord::from_candidate(&c);
        assert_eq!(record.id, c.proposed_id);
        assert_eq!(record.sha256(), Some(c.sha256));
        assert!(record.in_scope(&c.scope));
        assert!(!record.in_scope(&ProjectScope::new("/programs/p/projects/y")));

        let access = record.primary_access().unwrap();
        assert_eq!(access.kind, "s3");
        assert_eq!(access.access_id.as_deref(), Some("s3"));
    }

    #[test]
    fn test_drs_json_shape() {
        let record = RemoteRecord::from_candidate(&candidate());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["checksums"][0]["type"], "sha256");
        assert_eq!(json["access_methods"][0]["Authorizations"]["value"], "/programs/p/projects/x");
        assert_eq!(json["access_methods"][0]["access_url"]["url"], record.storage_url().unwrap());
    }

    #[test]
    fn test_parse_drs_object_without_authz() {
        let json = r#"{
            "id": "abc",
            "name": "f",
            "size": 3,
            "checksums": [{"type": "SHA256", "checksum": "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"}],
            "access_methods": [{"type": "file", "access_url": {"url": "file:///tmp/x"}}]
        }"#;
        let record: RemoteRecord = serde_json::from_str(json).unwrap();
        assert!(record.authz.is_empty());
        assert_eq!(
            record.sha256().unwrap().to_hex(),
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
        assert_eq!(record.storage_url(), Some("file:///tmp/x"));
    }

    #[test]
    fn test_header_lines() {
        let d = FetchDescriptor::with_header_lines(
            "https://x",
            &["Authorization: Bearer t".to_string(), "junk".to_string()],
        );
        assert_eq!(d.headers, vec![("Authorization".to_string(), "Bearer t".to_string())]);
    }

    #[test]
    fn test_url_scheme() {
        assert_eq!(url_scheme("s3://b/k"), Some("s3"));
        assert_eq!(url_scheme("file:///tmp"), Some("file"));
        assert_eq!(url_scheme("/tmp/x"), None);
    }
}
