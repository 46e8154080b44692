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

//! Reconciler behavior against a libgit2 test repository and an in-memory directory

use gitdrs_git::Oid;
use gitdrs_storage::mock::MockDirectory;
use gitdrs_storage::ProjectScope;
use gitdrs_sync::{
    parse_filters, ObjectErrorKind, PullOutcome, Reconciler, SingleRemote, SyncContext, SyncError,
};
use gitdrs_test_utils::{
    assert_no_temp_artifacts, assert_object_absent, assert_object_installed, TestFixtures,
    TestRepo,
};
use std::sync::Arc;

const NO_REFS: &[&str] = &[];

fn mock() -> MockDirectory {
    MockDirectory::new(ProjectScope::new("/programs/prog/projects/proj"), "bucket")
}

fn context(repo: &TestRepo, mock: &MockDirectory) -> Arc<SyncContext> {
    let remotes = Arc::new(SingleRemote::new("origin", Arc::new(mock.clone())));
    Arc::new(
        SyncContext::new(repo.path(), repo.store(), remotes, Arc::new(mock.fetcher()))
            .with_concurrency(4),
    )
}

async fn reconciler(repo: &TestRepo, mock: &MockDirectory) -> Reconciler {
    Reconciler::connect(context(repo, mock), None).await.unwrap()
}

#[tokio::test]
async fn test_push_registers_once_then_is_idempotent() {
    let repo = TestRepo::new();
    let content = TestFixtures::ten_bytes();
    let h1 = repo.track("data/a.bin", &content);
    repo.commit("add a");
    let dir = mock();
    let r = reconciler(&repo, &dir).await;

    let report = r.push(NO_REFS).await.unwrap();
    assert_eq!(dir.register_calls(), 1);
    assert_eq!(report.registered.len(), 1);
    assert_eq!(report.registered[0].size, 10);
    assert_eq!(report.registered[0].sha256(), Some(h1));
    assert_eq!(report.uploads.len(), 1);
    assert_eq!(report.uploads[0].path, repo.store().object_path(&h1));

    let uploads = r.upload_pending(&report).await;
    assert_eq!(uploads.uploaded, vec![h1]);
    assert_eq!(dir.upload_calls(), 1);
    assert_eq!(dir.content(&report.registered[0].id).await.unwrap(), content);

    let again = r.push(NO_REFS).await.unwrap();
    assert!(again.registered.is_empty());
    assert!(again.uploads.is_empty());
    assert_eq!(again.plan.already_satisfied.len(), 1);
    assert_eq!(dir.register_calls(), 1);
    assert_eq!(dir.upload_calls(), 1);
}

#[tokio::test]
async fn test_rename_does_not_register_again() {
    let repo = TestRepo::new();
    repo.track("old/name.bin", b"stable content");
    repo.commit("add");
    let dir = mock();
    let r = reconciler(&repo, &dir).await;
    r.push(NO_REFS).await.unwrap();

    repo.rename("old/name.bin", "new/name.bin");
    repo.commit("rename");
    let report = r.push(NO_REFS).await.unwrap();

    assert!(report.registered.is_empty());
    assert_eq!(dir.register_calls(), 1);
    assert_eq!(dir.records().await.len(), 1);
}

#[tokio::test]
async fn test_absent_content_is_unresolvable_not_fatal() {
    let repo = TestRepo::new();
    let missing = repo.track_pointer_only("remote-only.bin", b"not here");
    let held = repo.track("held.bin", b"held here");
    repo.commit("mixed");
    let dir = mock();
    let r = reconciler(&repo, &dir).await;

    let report = r.push(NO_REFS).await.unwrap();
    assert_eq!(report.plan.unresolvable.len(), 1);
    assert_eq!(report.plan.unresolvable[0].object.oid, missing);
    assert_eq!(report.registered.len(), 1);
    assert_eq!(report.registered[0].sha256(), Some(held));
}

#[tokio::test]
async fn test_concurrent_registration_counts_as_success() {
    let repo = TestRepo::new();
    let oid = repo.track("race.bin", b"raced");
    repo.commit("race");
    let dir = mock();
    dir.conflict_on_register(oid).await;
    let r = reconciler(&repo, &dir).await;

    let report = r.push(NO_REFS).await.unwrap();
    assert!(!report.has_failures());
    assert_eq!(report.registered.len(), 1);
    assert_eq!(report.uploads.len(), 1);
}

#[tokio::test]
async fn test_registration_failure_is_isolated() {
    let repo = TestRepo::new();
    let bad = repo.track("bad.bin", b"bad");
    let good = repo.track("good.bin", b"good");
    repo.commit("two");
    let dir = mock();
    dir.fail_register(bad).await;
    let r = reconciler(&repo, &dir).await;

    let report = r.push(NO_REFS).await.unwrap();
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, bad);
    assert_eq!(report.failed[0].1.kind, ObjectErrorKind::Remote);
    assert_eq!(report.registered.len(), 1);
    assert_eq!(report.registered[0].sha256(), Some(good));
}

#[tokio::test]
async fn test_hash_seen_on_two_refs_is_resolved_once() {
    let repo = TestRepo::new();
    repo.track("shared.bin", b"shared");
    repo.commit("main");
    repo.create_branch("feature");
    repo.switch_branch("feature");
    repo.track("copy/shared.bin", b"shared");
    repo.commit("feature copy");
    let dir = mock();
    let r = reconciler(&repo, &dir).await;

    let report = r.push(&["main", "feature"]).await.unwrap();
    assert_eq!(dir.resolve_calls(), 1);
    assert_eq!(dir.register_calls(), 1);
    assert_eq!(report.registered.len(), 1);
}

#[tokio::test]
async fn test_server_assigned_ids_flow_into_uploads() {
    let repo = TestRepo::new();
    repo.track("a.bin", b"abc");
    repo.commit("a");
    let dir = mock().with_assigned_ids();
    let r = reconciler(&repo, &dir).await;

    let report = r.push(NO_REFS).await.unwrap();
    let id = &report.registered[0].id;
    assert!(id.starts_with("dg.MOCK/"));
    assert_eq!(&report.uploads[0].record.id, id);
    r.upload_pending(&report).await;
    assert!(dir.content(id).await.is_some());
}

#[tokio::test]
async fn test_upload_skips_content_already_remote() {
    let repo = TestRepo::new();
    repo.track("a.bin", b"abc");
    repo.commit("a");
    let dir = mock();
    let r = reconciler(&repo, &dir).await;

    let report = r.push(NO_REFS).await.unwrap();
    r.upload_pending(&report).await;
    let second = r.upload_pending(&report).await;
    assert_eq!(second.skipped.len(), 1);
    assert_eq!(dir.upload_calls(), 1);
}

#[tokio::test]
async fn test_pull_isolates_failures() {
    let repo = TestRepo::new();
    let local = repo.track("local.bin", b"already here");
    let wanted = repo.track_pointer_only("wanted.bin", b"fetch me");
    let corrupt = repo.track_pointer_only("corrupt.bin", b"will be corrupted");
    let orphan = repo.track_pointer_only("orphan.bin", b"no record anywhere");
    repo.commit("pointers");

    let dir = mock();
    dir.insert("wanted.bin", b"fetch me").await;
    dir.insert("corrupt.bin", b"will be corrupted").await;
    dir.corrupt(corrupt).await;
    let r = reconciler(&repo, &dir).await;

    let report = r.pull(NO_REFS, &[]).await.unwrap();
    assert_eq!(report.outcome(&local), Some(&PullOutcome::AlreadyPresent));
    assert!(matches!(report.outcome(&wanted), Some(PullOutcome::Materialized(_))));
    assert!(matches!(report.outcome(&orphan), Some(PullOutcome::Unresolvable(_))));
    match report.outcome(&corrupt) {
        Some(PullOutcome::Failed(e)) => assert_eq!(e.kind, ObjectErrorKind::Integrity),
        other => panic!("expected integrity failure, got {:?}", other),
    }

    assert_object_installed(&repo, b"fetch me");
    assert_object_absent(&repo, &corrupt);
    assert_no_temp_artifacts(&repo);
    assert!(report.has_failures());
}

#[tokio::test]
async fn test_pull_respects_filters() {
    let repo = TestRepo::new();
    let wanted = repo.track_pointer_only("data/raw/a.bam", b"aaa");
    let ignored = repo.track_pointer_only("docs/b.pdf", b"bbb");
    repo.commit("pointers");
    let dir = mock();
    dir.insert("a.bam", b"aaa").await;
    dir.insert("b.pdf", b"bbb").await;
    let r = reconciler(&repo, &dir).await;

    let filters = parse_filters(&["data/raw"]).unwrap();
    let report = r.pull(NO_REFS, &filters).await.unwrap();
    assert_eq!(report.outcomes.len(), 1);
    assert!(matches!(report.outcome(&wanted), Some(PullOutcome::Materialized(_))));
    assert_object_absent(&repo, &ignored);
}

#[tokio::test]
async fn test_materialize_single_object() {
    let repo = TestRepo::new();
    let dir = mock();
    let record = dir.insert("x.bin", b"single").await;
    let r = reconciler(&repo, &dir).await;
    let oid = Oid::hash(b"single");

    let path = r.materialize(oid, 6, None).await.unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"single");
    assert_eq!(dir.fetch_calls(), 1);

    r.materialize(oid, 6, None).await.unwrap();
    assert_eq!(dir.fetch_calls(), 1, "present objects are not fetched again");

    let err = r.materialize(Oid::hash(b"unknown"), 7, None).await.unwrap_err();
    assert_eq!(err.code(), 404);
    assert!(r.find_record(&oid).await.unwrap().is_some_and(|f| f.id == record.id));
}

#[tokio::test]
async fn test_size_mismatch_is_integrity_error() {
    let repo = TestRepo::new();
    let dir = mock();
    dir.insert("x.bin", b"twelve bytes").await;
    let r = reconciler(&repo, &dir).await;

    let err = r.materialize(Oid::hash(b"twelve bytes"), 99, None).await.unwrap_err();
    assert_eq!(err.kind, ObjectErrorKind::Integrity);
    assert_no_temp_artifacts(&repo);
}

#[tokio::test]
async fn test_upload_object_registers_and_sends() {
    let repo = TestRepo::new();
    let path = repo.store_content(b"single upload");
    let oid = Oid::hash(b"single upload");
    let dir = mock();
    let r = reconciler(&repo, &dir).await;

    let registration = r.upload_object(oid, &path, 13).await.unwrap();
    assert!(registration.created);
    assert_eq!(dir.upload_calls(), 1);

    let again = r.upload_object(oid, &path, 13).await.unwrap();
    assert!(!again.created);
    assert_eq!(dir.register_calls(), 1);
    assert_eq!(dir.upload_calls(), 1);

    let err = r.upload_object(oid, &path, 5).await.unwrap_err();
    assert_eq!(err.code(), 500);
}

#[tokio::test]
async fn test_query_and_delete() {
    let repo = TestRepo::new();
    let dir = mock();
    dir.insert("x.bin", b"to delete").await;
    let r = reconciler(&repo, &dir).await;
    let oid = Oid::hash(b"to delete");

    let query = r.query(&oid).await.unwrap();
    assert!(query.record.is_some());
    assert!(!query.present);

    r.delete(&oid).await.unwrap();
    assert!(r.find_record(&oid).await.unwrap().is_none());
    assert_eq!(r.delete(&oid).await.unwrap_err().code(), 404);
}

#[tokio::test]
async fn test_delete_record_never_uploaded() {
    let repo = TestRepo::new();
    let dir = mock();
    let oid = Oid::hash(b"registered only");
    dir.insert_record_only(oid, 15, "r.bin").await;
    let r = reconciler(&repo, &dir).await;

    let deleted = r.delete(&oid).await.unwrap();
    assert_eq!(deleted.sha256(), Some(oid));
    assert!(dir.records().await.is_empty());
}

#[tokio::test]
async fn test_list_records_in_scope() {
    let repo = TestRepo::new();
    let dir = mock();
    dir.insert("a.bin", b"alpha").await;
    dir.insert_in_scope(&ProjectScope::new("/programs/prog/projects/other"), "b.bin", b"beta")
        .await;
    let r = reconciler(&repo, &dir).await;

    let records = r.list_records().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].sha256(), Some(Oid::hash(b"alpha")));
}

#[tokio::test]
async fn test_register_external_keeps_given_url() {
    let repo = TestRepo::new();
    let dir = mock();
    let r = reconciler(&repo, &dir).await;
    let oid = Oid::hash(b"already in the bucket");

    let first = r
        .register_external(oid, 21, "data/x.bin", "s3://bucket/existing/x.bin")
        .await
        .unwrap();
    assert!(first.created);
    assert_eq!(first.record.storage_url(), Some("s3://bucket/existing/x.bin"));
    assert_eq!(dir.upload_calls(), 0);

    let again = r
        .register_external(oid, 21, "data/x.bin", "s3://bucket/existing/x.bin")
        .await
        .unwrap();
    assert!(!again.created);
    assert_eq!(again.record.id, first.record.id);
    assert_eq!(dir.register_calls(), 1);

    let err = r
        .register_external(oid, 22, "data/x.bin", "s3://bucket/existing/x.bin")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ObjectErrorKind::Integrity);
}

#[tokio::test]
async fn test_download_by_oid_uses_record_size() {
    let repo = TestRepo::new();
    let dir = mock();
    dir.insert("d.bin", b"download me").await;
    let r = reconciler(&repo, &dir).await;
    let oid = Oid::hash(b"download me");

    let path = r.download(&oid).await.unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"download me");
    assert_object_installed(&repo, b"download me");

    r.download(&oid).await.unwrap();
    assert_eq!(dir.fetch_calls(), 1);
    let missing = Oid::hash(b"nowhere");
    assert_eq!(r.download(&missing).await.unwrap_err().code(), 404);
}

#[tokio::test]
async fn test_delete_scope_leaves_other_projects() {
    let repo = TestRepo::new();
    let dir = mock();
    let other = ProjectScope::new("/programs/prog/projects/other");
    dir.insert("a.bin", b"one").await;
    dir.insert_record_only(Oid::hash(b"two"), 3, "b.bin").await;
    let kept = dir.insert_in_scope(&other, "c.bin", b"three").await;
    let r = reconciler(&repo, &dir).await;

    let report = r.delete_scope().await.unwrap();
    assert_eq!(report.deleted.len(), 2);
    assert!(report.failed.is_empty());
    assert_eq!(dir.records().await, vec![kept]);
}

#[tokio::test]
async fn test_unknown_remote_is_fatal() {
    let repo = TestRepo::new();
    let err = Reconciler::connect(context(&repo, &mock()), Some("elsewhere"))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Config(_)));
}

#[tokio::test]
async fn test_unknown_ref_is_fatal() {
    let repo = TestRepo::new();
    repo.track("a.bin", b"a");
    repo.commit("a");
    let r = reconciler(&repo, &mock()).await;
    assert!(matches!(r.push(&["no-such-branch"]).await, Err(SyncError::Git(_))));
}
