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

//! Administrative removal of a remote record.

use super::GlobalArgs;
use crate::output;
use crate::repo;
use anyhow::{Context, Result};
use clap::Args;
use dialoguer::Confirm;
use gitdrs_git::Oid;
use tracing::info;

/// Delete the record registered for a content hash
///
/// The local object store is not touched.
#[derive(Debug, Args)]
pub struct DeleteCmd {
    /// SHA-256 of the object content
    #[arg(value_name = "OID")]
    pub oid: String,

    /// DRS remote name (defaults to the configured default)
    #[arg(short, long)]
    pub remote: Option<String>,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

impl DeleteCmd {
    pub async fn execute(&self, global: &GlobalArgs) -> Result<()> {
        let oid = Oid::from_hex(&self.oid).context("Invalid object id")?;
        let paths = global.repo()?;
        let reconciler = repo::connect(&paths.root, self.remote.as_deref()).await?;

        let record = reconciler
            .find_record(&oid)
            .await?
            .with_context(|| format!("No record for {} in {}", oid, reconciler.scope()))?;

        if !self.yes {
            let prompt = format!(
                "Delete record {} ({}) from remote '{}'?",
                record.id,
                record.name.as_deref().unwrap_or("unnamed"),
                reconciler.remote()
            );
            let confirmed = Confirm::new()
                .with_prompt(prompt)
                .default(false)
                .interact()
                .context("Confirmation required; pass --yes to skip")?;
            if !confirmed {
                output::info("Aborted");
                return Ok(());
            }
        }

        let deleted = reconciler.delete(&oid).await?;
        info!(oid = %oid, id = %deleted.id, "record deleted");
        if !global.quiet {
            output::success(&format!("Deleted record {}", deleted.id));
        }
        Ok(())
    }
}
