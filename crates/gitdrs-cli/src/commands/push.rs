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

//! Register local objects with a remote and upload their bytes.

use super::GlobalArgs;
use crate::output;
use crate::progress::ProgressTracker;
use crate::repo;
use anyhow::Result;
use clap::Args;
use console::style;

/// Register and upload large objects reachable from refs
#[derive(Debug, Args)]
#[command(after_help = "EXAMPLES:
    # Register and upload everything reachable from HEAD
    git drs push

    # Push objects from two branches to a named remote
    git drs push --remote production main feature

    # Show what would be registered
    git drs push --dry-run")]
pub struct PushCmd {
    /// Refs to scan (defaults to HEAD)
    #[arg(value_name = "REF")]
    pub refs: Vec<String>,

    /// DRS remote name (defaults to the configured default)
    #[arg(short, long)]
    pub remote: Option<String>,

    /// Only register records, leave byte upload to Git LFS
    #[arg(long)]
    pub register_only: bool,

    /// Plan without contacting the remote for writes
    #[arg(long)]
    pub dry_run: bool,
}

impl PushCmd {
    pub async fn execute(&self, global: &GlobalArgs) -> Result<()> {
        let paths = global.repo()?;
        let reconciler = repo::connect(&paths.root, self.remote.as_deref()).await?;
        let tracker = ProgressTracker::new(global.quiet);

        if !global.quiet {
            println!(
                "{} Pushing to {} ({})",
                style("↑").cyan().bold(),
                style(reconciler.remote()).yellow(),
                reconciler.scope()
            );
        }

        if self.dry_run {
            let spinner = tracker.spinner("Resolving objects...");
            let plan = reconciler.plan_push(&self.refs).await?;
            spinner.finish_and_clear();
            output::detail("To register", &plan.to_register.len().to_string());
            output::detail("Already registered", &plan.already_satisfied.len().to_string());
            output::detail("Not present locally", &plan.unresolvable.len().to_string());
            for object in &plan.to_register {
                println!("  {} {}", output::short_oid(&object.oid.to_hex()), object.display_name());
            }
            for (oid, err) in &plan.failed {
                output::object_failure(&oid.to_hex(), &err.to_string());
            }
            return Ok(());
        }

        let spinner = tracker.spinner("Registering objects...");
        let report = reconciler.push(&self.refs).await?;
        spinner.finish_and_clear();

        let mut failures = 0;
        for (oid, err) in report.failures() {
            output::object_failure(&oid.to_hex(), &err.to_string());
            failures += 1;
        }
        for missing in &report.plan.unresolvable {
            output::warning(&format!(
                "{} not present locally: {}",
                output::short_oid(&missing.object.oid.to_hex()),
                missing.reason
            ));
        }

        let mut uploaded = 0;
        let mut skipped = 0;
        if !self.register_only && !report.uploads.is_empty() {
            let bar = tracker.object_bar("Uploading", report.uploads.len() as u64);
            let uploads = reconciler.upload_pending(&report).await;
            bar.finish_and_clear();
            for (oid, err) in &uploads.failed {
                output::object_failure(&oid.to_hex(), &err.to_string());
            }
            failures += uploads.failed.len();
            uploaded = uploads.uploaded.len();
            skipped = uploads.skipped.len();
        }

        if !global.quiet {
            output::detail("Registered", &report.registered.len().to_string());
            output::detail("Already registered", &report.plan.already_satisfied.len().to_string());
            if !self.register_only {
                output::detail("Uploaded", &uploaded.to_string());
                output::detail("Already uploaded", &skipped.to_string());
            }
        }

        if failures > 0 {
            anyhow::bail!("{} object(s) failed to push", failures);
        }
        if !global.quiet {
            output::success("Push complete");
        }
        Ok(())
    }
}
