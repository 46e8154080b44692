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

//! Environment overrides run in their own test binary so no other test
//! observes the variables.

use gitdrs_config::{Config, CredentialRef, IndexdRemote, LocalRemote, RemoteConfig};
use tempfile::TempDir;

#[tokio::test]
async fn test_env_overrides() {
    let temp = TempDir::new().unwrap();
    let mut config = Config::default();
    config.set_remote(
        "production",
        RemoteConfig::Indexd(IndexdRemote {
            endpoint: "https://data.example.org".to_string(),
            project_id: "cbds-demo".to_string(),
            bucket: "cbds-data".to_string(),
            credential: Some(CredentialRef::Env("GEN3_TOKEN".to_string())),
        }),
    );
    config.set_remote(
        "dev",
        RemoteConfig::Local(LocalRemote {
            base_url: "http://localhost:8080".to_string(),
            project_id: "test-local".to_string(),
            bucket: String::new(),
        }),
    );
    config.save(temp.path()).await.unwrap();

    std::env::set_var("GIT_DRS_DEFAULT_REMOTE", "dev");
    std::env::set_var("GIT_DRS_CONCURRENCY", "16");
    let loaded = Config::load(temp.path()).await;
    std::env::remove_var("GIT_DRS_DEFAULT_REMOTE");
    std::env::remove_var("GIT_DRS_CONCURRENCY");

    let loaded = loaded.unwrap();
    assert_eq!(loaded.get_default_remote().unwrap(), "dev");
    assert_eq!(loaded.transfer.concurrency, 16);
}

