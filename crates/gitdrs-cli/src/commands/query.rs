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

//! Show the remote record registered for an object.

use super::GlobalArgs;
use crate::repo;
use anyhow::{Context, Result};
use clap::Args;
use gitdrs_git::Oid;
use serde_json::json;

/// Look up the record for a content hash
#[derive(Debug, Args)]
pub struct QueryCmd {
    /// SHA-256 of the object content (64 hex characters)
    #[arg(value_name = "OID")]
    pub oid: String,

    /// DRS remote name (defaults to the configured default)
    #[arg(short, long)]
    pub remote: Option<String>,
}

impl QueryCmd {
    pub async fn execute(&self, global: &GlobalArgs) -> Result<()> {
        let oid = Oid::from_hex(&self.oid).context("Invalid object id")?;
        let paths = global.repo()?;
        let reconciler = repo::connect(&paths.root, self.remote.as_deref()).await?;

        let result = reconciler.query(&oid).await?;
        let Some(record) = result.record else {
            anyhow::bail!("No record for {} in {}", oid, reconciler.scope());
        };
        let out = json!({
            "remote": reconciler.remote(),
            "present_locally": result.present,
            "record": record,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        Ok(())
    }
}
