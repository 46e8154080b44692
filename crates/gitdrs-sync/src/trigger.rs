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

//! Registration run from Git's `pre-push` hook.
//!
//! Git writes one line per ref being pushed on the hook's stdin:
//! `<local ref> <local sha> <remote ref> <remote sha>`. Every pushed ref
//! is scanned and its objects registered before `git lfs pre-push`
//! transfers the bytes.

use crate::context::SyncContext;
use crate::error::{SyncError, SyncResult};
use crate::plan::PushReport;
use crate::reconciler::Reconciler;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// One `pre-push` input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefUpdate {
    pub local_ref: String,
    pub local_sha: String,
    pub remote_ref: String,
    pub remote_sha: String,
}

impl RefUpdate {
    /// The push deletes the remote ref
    pub fn is_delete(&self) -> bool {
        !self.local_sha.is_empty() && self.local_sha.bytes().all(|b| b == b'0')
    }

    /// Revision to scan: the ref name when qualified, else the pushed commit
    pub fn revision(&self) -> &str {
        if self.local_ref.starts_with("refs/") {
            &self.local_ref
        } else {
            &self.local_sha
        }
    }
}

/// What the trigger did
#[derive(Debug)]
pub enum TriggerOutcome {
    /// Only deletions or empty input
    NothingToPush,
    /// Repository has no DRS configuration; the push continues unregistered
    Unconfigured(String),
    Pushed(PushReport),
}

/// Parse `pre-push` stdin. Blank lines are ignored; anything else that is
/// not four fields is an error.
pub fn parse_ref_updates<R: BufRead>(input: R) -> SyncResult<Vec<RefUpdate>> {
    let mut updates = Vec::new();
    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let [local_ref, local_sha, remote_ref, remote_sha] = fields.as_slice() else {
            return Err(SyncError::InvalidPrePushLine(line.clone()));
        };
        updates.push(RefUpdate {
            local_ref: local_ref.to_string(),
            local_sha: local_sha.to_string(),
            remote_ref: remote_ref.to_string(),
            remote_sha: remote_sha.to_string(),
        });
    }
    Ok(updates)
}

/// Revisions to scan, deletions dropped, first occurrence kept
pub fn pushed_revisions(updates: &[RefUpdate]) -> Vec<String> {
    let mut revisions: Vec<String> = Vec::new();
    for update in updates.iter().filter(|u| !u.is_delete()) {
        let revision = update.revision();
        if !revisions.iter().any(|r| r == revision) {
            revisions.push(revision.to_string());
        }
    }
    revisions
}

/// Register the objects of every ref in `input` with the DRS remote
///
/// A repository without `.drs/config.yaml` or without a default remote is
/// not an error: the push proceeds without registration. Other
/// configuration errors are.
pub async fn run_pre_push<R: BufRead>(
    repo_root: &Path,
    remote: Option<&str>,
    input: R,
) -> SyncResult<TriggerOutcome> {
    let updates = parse_ref_updates(input)?;
    let revisions = pushed_revisions(&updates);
    if revisions.is_empty() {
        info!("no refs to register");
        return Ok(TriggerOutcome::NothingToPush);
    }

    let reconciler = match connect(repo_root, remote).await {
        Ok(reconciler) => reconciler,
        Err(e) if e.is_unconfigured() => {
            warn!("skipping DRS registration: {}", e);
            return Ok(TriggerOutcome::Unconfigured(e.to_string()));
        }
        Err(e) => return Err(e),
    };

    info!(refs = ?revisions, remote = %reconciler.remote(), "registering pushed objects");
    let report = reconciler.push(&revisions).await?;
    Ok(TriggerOutcome::Pushed(report))
}

async fn connect(repo_root: &Path, remote: Option<&str>) -> SyncResult<Reconciler> {
    let ctx = SyncContext::load(repo_root).await?;
    Reconciler::connect(Arc::new(ctx), remote).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO: &str = "0000000000000000000000000000000000000000";
    const SHA: &str = "1111111111111111111111111111111111111111";

    #[test]
    fn test_parse_lines() {
        let input = format!(
            "refs/heads/main {} refs/heads/main {}\n\nrefs/heads/old {} refs/heads/old {}\n",
            SHA, ZERO, ZERO, SHA
        );
        let updates = parse_ref_updates(input.as_bytes()).unwrap();
        assert_eq!(updates.len(), 2);
        assert!(!updates[0].is_delete());
        assert!(updates[1].is_delete());
        assert_eq!(pushed_revisions(&updates), vec!["refs/heads/main".to_string()]);
    }

    #[test]
    fn test_malformed_line() {
        let err = parse_ref_updates("refs/heads/main abc\n".as_bytes()).unwrap_err();
        assert!(matches!(err, SyncError::InvalidPrePushLine(_)));
    }

    #[test]
    fn test_revisions_deduplicated_in_order() {
        let line = |r: &str| format!("{} {} refs/heads/x {}\n", r, SHA, ZERO);
        let input = [line("refs/heads/b"), line("refs/heads/a"), line("refs/heads/b")].concat();
        let updates = parse_ref_updates(input.as_bytes()).unwrap();
        assert_eq!(
            pushed_revisions(&updates),
            vec!["refs/heads/b".to_string(), "refs/heads/a".to_string()]
        );
    }

    #[test]
    fn test_unqualified_local_ref_uses_sha() {
        let input = format!("HEAD {} refs/heads/main {}\n", SHA, ZERO);
        let updates = parse_ref_updates(input.as_bytes()).unwrap();
        assert_eq!(pushed_revisions(&updates), vec![SHA.to_string()]);
    }

    #[tokio::test]
    async fn test_empty_input_does_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let outcome = run_pre_push(tmp.path(), None, "".as_bytes()).await.unwrap();
        assert!(matches!(outcome, TriggerOutcome::NothingToPush));
    }
}
