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

//! Remove every record registered under a remote's project.

use super::GlobalArgs;
use crate::output;
use crate::repo;
use anyhow::{bail, Context, Result};
use clap::Args;
use dialoguer::Confirm;

/// Delete all records in the remote's project scope
///
/// Stored bytes under record ids go with them where the backend owns
/// them; local objects are untouched.
#[derive(Debug, Args)]
pub struct DeleteProjectCmd {
    /// DRS remote name (defaults to the configured default)
    #[arg(short, long)]
    pub remote: Option<String>,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

impl DeleteProjectCmd {
    pub async fn execute(&self, global: &GlobalArgs) -> Result<()> {
        let paths = global.repo()?;
        let reconciler = repo::connect(&paths.root, self.remote.as_deref()).await?;

        if !self.yes {
            let count = reconciler.list_records().await?.len();
            if count == 0 {
                output::info(&format!("No records in {}", reconciler.scope()));
                return Ok(());
            }
            let prompt = format!(
                "Delete all {} records in {} from remote '{}'?",
                count,
                reconciler.scope(),
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

        let report = reconciler.delete_scope().await?;
        for (id, e) in &report.failed {
            output::error(&format!("{}: {}", id, e));
        }
        if !report.failed.is_empty() {
            bail!(
                "{} of {} records could not be deleted",
                report.failed.len(),
                report.failed.len() + report.deleted.len()
            );
        }
        if !global.quiet {
            output::success(&format!(
                "Deleted {} records from {}",
                report.deleted.len(),
                reconciler.scope()
            ));
        }
        Ok(())
    }
}
