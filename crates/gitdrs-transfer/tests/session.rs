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

//! End-to-end transfer sessions over in-memory pipes

use gitdrs_git::Oid;
use gitdrs_storage::mock::MockDirectory;
use gitdrs_storage::ProjectScope;
use gitdrs_sync::{SingleRemote, SyncContext};
use gitdrs_test_utils::{assert_no_temp_artifacts, assert_object_installed, TestRepo};
use gitdrs_transfer::{ProtocolError, SessionSummary, TransferAgent};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::AsyncReadExt;

fn mock() -> MockDirectory {
    MockDirectory::new(ProjectScope::new("/programs/prog/projects/proj"), "bucket")
}

fn context(repo: &TestRepo, dir: &MockDirectory) -> Arc<SyncContext> {
    let remotes = Arc::new(SingleRemote::new("origin", Arc::new(dir.clone())));
    Arc::new(SyncContext::new(
        repo.path(),
        repo.store(),
        remotes,
        Arc::new(dir.fetcher()),
    ))
}

fn script(messages: &[Value]) -> String {
    messages
        .iter()
        .map(|m| format!("{}\n", m))
        .collect()
}

/// Run a session and return its result plus every line written back
async fn session(
    ctx: Arc<SyncContext>,
    input: String,
) -> (Result<SessionSummary, ProtocolError>, Vec<Value>) {
    let (writer, mut reader) = tokio::io::duplex(1 << 20);
    let result = TransferAgent::new(ctx).run(input.as_bytes(), writer).await;
    let mut out = String::new();
    reader.read_to_string(&mut out).await.unwrap();
    let lines = out
        .lines()
        .map(|l| serde_json::from_str(l).expect("each response is one JSON line"))
        .collect();
    (result, lines)
}

fn init(operation: &str) -> Value {
    json!({"event": "init", "operation": operation, "remote": "origin",
           "concurrent": true, "concurrenttransfers": 3})
}

fn download(oid: &str, size: u64) -> Value {
    json!({"event": "download", "oid": oid, "size": size, "action": null})
}

fn completes_for<'a>(lines: &'a [Value], oid: &str) -> Vec<&'a Value> {
    lines
        .iter()
        .filter(|l| l["event"] == "complete" && l["oid"] == oid)
        .collect()
}

#[tokio::test]
async fn test_init_is_acknowledged_with_empty_object() {
    let repo = TestRepo::new();
    let dir = mock();
    let input = script(&[init("download"), json!({"event": "terminate"})]);

    let (result, lines) = session(context(&repo, &dir), input).await;
    let summary = result.unwrap();
    assert_eq!(lines, vec![json!({})]);
    assert_eq!(summary.operation, "download");
    assert_eq!(summary.remote, "origin");
    assert_eq!(summary.succeeded + summary.failed, 0);
}

#[tokio::test]
async fn test_malformed_init_fails_without_contacting_remote() {
    let repo = TestRepo::new();
    let dir = mock();
    let input = script(&[download(&"a".repeat(64), 1)]);

    let (result, lines) = session(context(&repo, &dir), input).await;
    assert!(matches!(result, Err(ProtocolError::ExpectedInit(_))));
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["event"], "complete");
    assert_eq!(lines[0]["oid"], "");
    assert_eq!(lines[0]["error"]["code"], 400);
    assert_eq!(dir.resolve_calls(), 0);
}

#[tokio::test]
async fn test_unsupported_operation_fails_init() {
    let repo = TestRepo::new();
    let dir = mock();
    let input = script(&[json!({"event": "init", "operation": "verify", "remote": "origin"})]);

    let (result, lines) = session(context(&repo, &dir), input).await;
    assert!(matches!(result, Err(ProtocolError::Init(_))));
    assert_eq!(lines[0]["oid"], "");
    assert_eq!(lines[0]["error"]["code"], 400);
}

#[tokio::test]
async fn test_git_remote_name_falls_back_to_default_drs_remote() {
    let repo = TestRepo::new();
    let dir = mock();
    let record = dir.insert("data.bin", b"calypr bytes").await;
    let oid = record.sha256().unwrap().to_hex();
    let remotes = Arc::new(SingleRemote::new("calypr", Arc::new(dir.clone())));
    let ctx = Arc::new(SyncContext::new(
        repo.path(),
        repo.store(),
        remotes,
        Arc::new(dir.fetcher()),
    ));
    // git-lfs always names the git remote here, never the DRS one
    let input = script(&[
        init("download"),
        download(&oid, 12),
        json!({"event": "terminate"}),
    ]);

    let (result, lines) = session(ctx, input).await;
    let summary = result.unwrap();
    assert_eq!(lines[0], json!({}));
    assert_eq!(summary.remote, "calypr");
    assert_eq!(summary.succeeded, 1);
    let complete = completes_for(&lines, &oid);
    assert_eq!(complete.len(), 1);
    assert!(complete[0].get("error").is_none());
}

#[tokio::test]
async fn test_input_closed_before_init_is_an_error() {
    let repo = TestRepo::new();
    let dir = mock();
    let (result, lines) = session(context(&repo, &dir), String::new()).await;
    assert!(matches!(result, Err(ProtocolError::MissingInit)));
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["event"], "complete");
    assert_eq!(lines[0]["oid"], "");
    assert_eq!(lines[0]["error"]["code"], 400);
    assert_eq!(dir.resolve_calls(), 0);
}

#[tokio::test]
async fn test_download_of_invalid_oid_errors_and_session_continues() {
    let repo = TestRepo::new();
    let dir = mock();
    let record = dir.insert("good.bin", b"good bytes").await;
    let good = record.sha256().unwrap().to_hex();
    let input = script(&[
        init("download"),
        download("missing", 5),
        download(&good, 10),
        json!({"event": "terminate"}),
    ]);

    let (result, lines) = session(context(&repo, &dir), input).await;
    let summary = result.unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 1);

    let missing = completes_for(&lines, "missing");
    assert_eq!(missing.len(), 1);
    assert!(missing[0]["error"]["code"].as_u64().is_some());

    let ok = completes_for(&lines, &good);
    assert_eq!(ok.len(), 1);
    assert!(ok[0].get("error").is_none());
    assert_object_installed(&repo, b"good bytes");
}

#[tokio::test]
async fn test_one_failure_does_not_affect_another_download() {
    let repo = TestRepo::new();
    let dir = mock();
    let bad = dir.insert("a.bin", b"object a").await.sha256().unwrap();
    let good = dir.insert("b.bin", b"object b").await.sha256().unwrap();
    dir.corrupt(bad).await;
    let input = script(&[
        init("download"),
        download(&bad.to_hex(), 8),
        download(&good.to_hex(), 8),
        json!({"event": "terminate"}),
    ]);

    let (result, lines) = session(context(&repo, &dir), input).await;
    result.unwrap();

    let failed = completes_for(&lines, &bad.to_hex());
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["error"]["code"], 422);

    let ok = completes_for(&lines, &good.to_hex());
    assert_eq!(ok.len(), 1);
    let path = ok[0]["path"].as_str().unwrap();
    assert_eq!(std::fs::read(path).unwrap(), b"object b");
    assert_no_temp_artifacts(&repo);
}

#[tokio::test]
async fn test_download_of_unregistered_object_is_not_found() {
    let repo = TestRepo::new();
    let dir = mock();
    let oid = Oid::hash(b"nobody registered this");
    let input = script(&[init("download"), download(&oid.to_hex(), 22)]);

    let (result, lines) = session(context(&repo, &dir), input).await;
    assert_eq!(result.unwrap().failed, 1);
    assert_eq!(completes_for(&lines, &oid.to_hex())[0]["error"]["code"], 404);
}

#[tokio::test]
async fn test_progress_precedes_complete_for_download() {
    let repo = TestRepo::new();
    let dir = mock();
    let oid = dir.insert("p.bin", b"progress").await.sha256().unwrap().to_hex();
    let input = script(&[init("download"), download(&oid, 8)]);

    let (_, lines) = session(context(&repo, &dir), input).await;
    let events: Vec<_> = lines
        .iter()
        .filter(|l| l["oid"] == oid.as_str())
        .map(|l| l["event"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(events, vec!["progress", "complete"]);
    let progress = lines.iter().find(|l| l["event"] == "progress").unwrap();
    assert_eq!(progress["bytesSoFar"], 8);
    assert_eq!(progress["bytesSinceLast"], 8);
}

#[tokio::test]
async fn test_upload_registers_and_stores_content() {
    let repo = TestRepo::new();
    let content = b"upload me please";
    let path = repo.store_content(content);
    let oid = Oid::hash(content);
    let dir = mock();
    let input = script(&[
        init("upload"),
        json!({"event": "upload", "oid": oid.to_hex(), "size": content.len(),
               "path": path.to_string_lossy(), "action": null}),
        json!({"event": "terminate"}),
    ]);

    let (result, lines) = session(context(&repo, &dir), input).await;
    assert_eq!(result.unwrap().succeeded, 1);
    let done = completes_for(&lines, &oid.to_hex());
    assert_eq!(done.len(), 1);
    assert!(done[0].get("error").is_none());

    let records = dir.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(dir.content(&records[0].id).await.unwrap(), content);
}

#[tokio::test]
async fn test_upload_without_path_is_rejected() {
    let repo = TestRepo::new();
    let dir = mock();
    let oid = Oid::hash(b"x").to_hex();
    let input = script(&[
        init("upload"),
        json!({"event": "upload", "oid": oid, "size": 1}),
    ]);

    let (_, lines) = session(context(&repo, &dir), input).await;
    assert_eq!(completes_for(&lines, &oid)[0]["error"]["code"], 400);
    assert_eq!(dir.register_calls(), 0);
}

#[tokio::test]
async fn test_every_request_gets_exactly_one_complete() {
    let repo = TestRepo::new();
    let dir = mock();
    let mut oids = Vec::new();
    for i in 0..12u8 {
        let content = vec![i; 64 + i as usize];
        let record = dir.insert(&format!("f{}.bin", i), &content).await;
        oids.push((record.sha256().unwrap().to_hex(), content.len() as u64));
    }
    let mut messages = vec![init("download")];
    messages.extend(oids.iter().map(|(oid, size)| download(oid, *size)));
    messages.push(json!({"event": "terminate"}));

    let (result, lines) = session(context(&repo, &dir), script(&messages)).await;
    assert_eq!(result.unwrap().succeeded, oids.len());
    for (oid, _) in &oids {
        assert_eq!(completes_for(&lines, oid).len(), 1, "oid {}", oid);
    }
}

#[tokio::test]
async fn test_messages_after_terminate_are_ignored() {
    let repo = TestRepo::new();
    let dir = mock();
    let oid = dir.insert("late.bin", b"late").await.sha256().unwrap().to_hex();
    let input = script(&[init("download"), json!({"event": "terminate"}), download(&oid, 4)]);

    let (result, lines) = session(context(&repo, &dir), input).await;
    assert_eq!(result.unwrap().succeeded, 0);
    assert_eq!(lines, vec![json!({})]);
    assert_eq!(dir.fetch_calls(), 0);
}
