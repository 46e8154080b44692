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

use gitdrs_config::{
    config_path, Config, ConfigError, ConfigLoader, CredentialRef, IndexdRemote, RemoteConfig,
    S3Remote,
};
use std::fs;
use tempfile::TempDir;

fn sample_config() -> Config {
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
        "scratch",
        RemoteConfig::S3(S3Remote {
            bucket: "scratch-objects".to_string(),
            project_id: "cbds-demo".to_string(),
            region: Some("us-west-2".to_string()),
            endpoint: None,
            prefix: "repo-a/".to_string(),
            force_path_style: false,
        }),
    );
    config
}

#[tokio::test]
async fn test_save_then_load_from_repo_root() {
    let temp = TempDir::new().unwrap();
    let config = sample_config();
    config.save(temp.path()).await.unwrap();

    assert!(config_path(temp.path()).exists());
    let loaded = Config::load(temp.path()).await.unwrap();
    assert_eq!(loaded.remotes, config.remotes);
    assert_eq!(loaded.default_remote.as_deref(), Some("production"));
}

#[tokio::test]
async fn test_missing_config_is_not_found() {
    let temp = TempDir::new().unwrap();
    let err = Config::load(temp.path()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_invalid_yaml_on_disk() {
    let temp = TempDir::new().unwrap();
    let path = config_path(temp.path());
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "remotes: [not, a, map]\n").unwrap();

    let err = ConfigLoader::new().load_file(&path).await.unwrap_err();
    assert!(matches!(err, ConfigError::YamlParseError(_)));
}

#[test]
fn test_credential_from_file() {
    let temp = TempDir::new().unwrap();
    let token_path = temp.path().join("token");
    fs::write(&token_path, "abc.def.ghi\n").unwrap();

    let cred = CredentialRef::File(token_path);
    assert_eq!(cred.resolve().unwrap(), "abc.def.ghi");
}
