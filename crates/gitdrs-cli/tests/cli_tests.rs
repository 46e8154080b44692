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

//! End-to-end tests of the `git-drs` binary

use gitdrs_git::Oid;
use gitdrs_test_utils::{git_drs, TestRepo};
use predicates::prelude::*;
use serde_json::Value;

const ZERO_SHA: &str = "0000000000000000000000000000000000000000";

fn add_local_remote(repo: &TestRepo, name: &str) {
    git_drs()
        .current_dir(repo.path())
        .args(["remote", "add", "local", name])
        .args(["--url", "http://127.0.0.1:9/", "--project", "prog-proj"])
        .assert()
        .success();
}

fn stdout_lines(output: &std::process::Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| serde_json::from_str(l).expect("stdout carries only JSON lines"))
        .collect()
}

#[test]
fn test_help_lists_commands() {
    git_drs()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("transfer"))
        .stdout(predicate::str::contains("pre-push-prepare"))
        .stdout(predicate::str::contains("ls-files"))
        .stdout(predicate::str::contains("add-url"));
}

#[test]
fn test_version() {
    git_drs()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("git-drs"));
}

#[test]
fn test_completions() {
    git_drs()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("git-drs"));
}

#[test]
fn test_outside_repository_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    git_drs()
        .current_dir(dir.path())
        .arg("ls-files")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not a git repository"));
}

#[test]
fn test_install_configures_agent_and_hook() {
    let repo = TestRepo::new();
    git_drs()
        .current_dir(repo.path())
        .arg("install")
        .assert()
        .success();

    let config = repo.repo().config().unwrap();
    assert_eq!(config.get_string("lfs.standalonetransferagent").unwrap(), "drs");
    assert_eq!(config.get_string("lfs.customtransfer.drs.args").unwrap(), "transfer");
    let hook = std::fs::read_to_string(repo.path().join(".git/hooks/pre-push")).unwrap();
    assert!(hook.contains("pre-push-prepare"));
}

#[test]
fn test_remote_add_list_and_set_default() {
    let repo = TestRepo::new();
    add_local_remote(&repo, "dev");
    git_drs()
        .current_dir(repo.path())
        .args(["remote", "add", "s3", "archive", "--bucket", "cold", "--project", "prog-archive"])
        .assert()
        .success();
    assert!(repo.path().join(".drs/config.yaml").exists());

    git_drs()
        .current_dir(repo.path())
        .args(["remote", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("* dev"))
        .stdout(predicate::str::contains("  archive"));

    git_drs()
        .current_dir(repo.path())
        .args(["remote", "set-default", "archive"])
        .assert()
        .success();
    git_drs()
        .current_dir(repo.path())
        .args(["remote", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("* archive"));
}

#[test]
fn test_remote_add_rejects_bad_project_id() {
    let repo = TestRepo::new();
    git_drs()
        .current_dir(repo.path())
        .args(["remote", "add", "local", "dev"])
        .args(["--url", "http://127.0.0.1:9/", "--project", "noproject"])
        .assert()
        .failure();
    assert!(!repo.path().join(".drs/config.yaml").exists());
}

#[test]
fn test_set_default_unknown_remote_fails() {
    let repo = TestRepo::new();
    add_local_remote(&repo, "dev");
    git_drs()
        .current_dir(repo.path())
        .args(["remote", "set-default", "nowhere"])
        .assert()
        .failure();
}

#[test]
fn test_ls_files_marks_presence() {
    let repo = TestRepo::new();
    let held = repo.track("data/held.bin", b"held content");
    let missing = repo.track_pointer_only("data/missing.bin", b"missing content");
    repo.commit("two pointers");

    let held_line = format!("{} * data/held.bin", &held.to_hex()[..12]);
    let missing_line = format!("{} - data/missing.bin", &missing.to_hex()[..12]);
    git_drs()
        .current_dir(repo.path())
        .arg("ls-files")
        .assert()
        .success()
        .stdout(predicate::str::contains(held_line))
        .stdout(predicate::str::contains(missing_line));
}

#[test]
fn test_ls_files_json() {
    let repo = TestRepo::new();
    let oid = repo.track("a.bin", b"0123456789");
    repo.commit("one");

    let output = git_drs()
        .current_dir(repo.path())
        .args(["ls-files", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let objects: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0]["oid"], oid.to_hex());
    assert_eq!(objects[0]["size"], 10);
    assert_eq!(objects[0]["present"], true);
    assert_eq!(objects[0]["paths"][0], "a.bin");
}

#[test]
fn test_pre_push_without_config_warns_and_succeeds() {
    let repo = TestRepo::new();
    repo.track("a.bin", b"abc");
    let head = repo.commit("one");
    let line = format!("refs/heads/main {} refs/heads/main {}\n", head, ZERO_SHA);

    git_drs()
        .current_dir(repo.path())
        .args(["pre-push-prepare", "origin", "https://example.org/repo.git"])
        .write_stdin(line)
        .assert()
        .success()
        .stderr(predicate::str::contains("not configured"));
}

#[test]
fn test_pre_push_with_no_refs_succeeds() {
    let repo = TestRepo::new();
    git_drs()
        .current_dir(repo.path())
        .arg("pre-push-prepare")
        .write_stdin("")
        .assert()
        .success();
}

#[test]
fn test_pre_push_rejects_malformed_input() {
    let repo = TestRepo::new();
    git_drs()
        .current_dir(repo.path())
        .arg("pre-push-prepare")
        .write_stdin("refs/heads/main only-two\n")
        .assert()
        .failure();
}

#[test]
fn test_transfer_without_config_rejects_init() {
    let repo = TestRepo::new();
    let output = git_drs()
        .current_dir(repo.path())
        .arg("transfer")
        .write_stdin(
            "{\"event\":\"init\",\"operation\":\"download\",\
             \"concurrent\":true,\"concurrenttransfers\":2}\n",
        )
        .output()
        .unwrap();

    assert!(!output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["event"], "complete");
    assert_eq!(lines[0]["oid"], "");
    assert_eq!(lines[0]["error"]["code"], 400);
}

#[test]
fn test_transfer_session_init_and_terminate() {
    let repo = TestRepo::new();
    add_local_remote(&repo, "dev");
    let output = git_drs()
        .current_dir(repo.path())
        .arg("transfer")
        .write_stdin(
            "{\"event\":\"init\",\"operation\":\"upload\",\"remote\":\"origin\"}\n\
             {\"event\":\"terminate\"}\n",
        )
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(stdout_lines(&output), vec![serde_json::json!({})]);
    assert!(repo.path().join(".git/drs/git-drs.log").exists());
}

#[test]
fn test_transfer_with_no_init_exits_nonzero() {
    let repo = TestRepo::new();
    add_local_remote(&repo, "dev");
    let output = git_drs()
        .current_dir(repo.path())
        .arg("transfer")
        .write_stdin("")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["oid"], "");
    assert_eq!(lines[0]["error"]["code"], 400);
}

#[test]
fn test_transfer_malformed_init_exits_nonzero() {
    let repo = TestRepo::new();
    add_local_remote(&repo, "dev");
    let oid = Oid::hash(b"anything").to_hex();
    let output = git_drs()
        .current_dir(repo.path())
        .arg("transfer")
        .write_stdin(format!("{{\"event\":\"download\",\"oid\":\"{}\",\"size\":8}}\n", oid))
        .output()
        .unwrap();

    assert!(!output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["oid"], "");
    assert_eq!(lines[0]["error"]["code"], 400);
}

#[test]
fn test_list_without_config_fails() {
    let repo = TestRepo::new();
    git_drs()
        .current_dir(repo.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration"));
}

#[test]
fn test_download_rejects_invalid_oid() {
    let repo = TestRepo::new();
    git_drs()
        .current_dir(repo.path())
        .args(["download", "not-a-hash"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid object id"));
}

#[test]
fn test_delete_project_without_config_fails() {
    let repo = TestRepo::new();
    git_drs()
        .current_dir(repo.path())
        .args(["delete-project", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration"));
}

#[test]
fn test_add_url_rejects_invalid_checksum() {
    let repo = TestRepo::new();
    git_drs()
        .current_dir(repo.path())
        .args(["add-url", "s3://bucket/data/a.bin", "--sha256", "xyz", "--size", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --sha256"));
}

#[test]
fn test_add_url_rejects_path_outside_repository() {
    let repo = TestRepo::new();
    add_local_remote(&repo, "dev");
    let oid = Oid::hash(b"abc").to_hex();
    git_drs()
        .current_dir(repo.path())
        .args(["add-url", "s3://bucket/a.bin", "../a.bin"])
        .args(["--sha256", oid.as_str(), "--size", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("inside the repository"));
}

#[test]
fn test_add_url_writes_no_pointer_when_registration_fails() {
    let repo = TestRepo::new();
    add_local_remote(&repo, "dev");
    let oid = Oid::hash(b"abc").to_hex();
    git_drs()
        .current_dir(repo.path())
        .args(["add-url", "s3://bucket/data/a.bin", "--sha256", oid.as_str(), "--size", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to register"));
    assert!(!repo.path().join("data/a.bin").exists());
}

#[test]
fn test_query_rejects_invalid_oid() {
    let repo = TestRepo::new();
    git_drs()
        .current_dir(repo.path())
        .args(["query", "not-a-hash"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid object id"));
}

#[test]
fn test_push_without_remote_config_fails() {
    let repo = TestRepo::new();
    repo.track("a.bin", b"abc");
    repo.commit("one");
    git_drs()
        .current_dir(repo.path())
        .arg("push")
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration"));
}
