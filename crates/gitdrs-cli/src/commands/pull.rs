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

//! Materialize missing objects from a remote.

use super::GlobalArgs;
use crate::output;
use crate::progress::ProgressTracker;
use crate::repo;
use anyhow::Result;
use clap::Args;
use console::style;
use gitdrs_sync::{parse_filters, PullOutcome};

/// Download objects referenced by pointers but missing locally
#[derive(Debug, Args)]
#[command(after_help = "EXAMPLES:
    # Fetch everything reachable from HEAD
    git drs pull

    # Only files under data/ or ending in .bam
    git drs pull -I 'data/' -I '*.bam'")]
pub struct PullCmd {
    /// Refs to scan (defaults to HEAD)
    #[arg(value_name = "REF")]
    pub refs: Vec<String>,

    /// DRS remote name (defaults to the configured default)
    #[arg(short, long)]
    pub remote: Option<String>,

    /// Only fetch paths matching this glob or directory prefix (repeatable)
    #[arg(short = 'I', long = "include", value_name = "PATTERN")]
    pub include: Vec<String>,

    /// List what would be fetched
    #[arg(long)]
    pub dry_run: bool,
}

impl PullCmd {
    pub async fn execute(&self, global: &GlobalArgs) -> Result<()> {
        let filters = parse_filters(&self.include)?;
        let paths = global.repo()?;
        let reconciler = repo::connect(&paths.root, self.remote.as_deref()).await?;
        let tracker = ProgressTracker::new(global.quiet);

        if !global.quiet {
            println!(
                "{} Pulling from {} ({})",
                style("↓").cyan().bold(),
                style(reconciler.remote()).yellow(),
                reconciler.scope()
            );
        }

        if self.dry_run {
            let spinner = tracker.spinner("Resolving objects...");
            let plan = reconciler.plan_pull(&self.refs, &filters).await?;
            spinner.finish_and_clear();
            for (object, record) in &plan.to_fetch {
                println!(
                    "  {} {} ({})",
                    output::short_oid(&object.oid.to_hex()),
                    object.display_name(),
                    record.id
                );
            }
            output::detail("To fetch", &plan.to_fetch.len().to_string());
            output::detail("Already present", &plan.already_satisfied.len().to_string());
            output::detail("Not registered", &plan.unresolvable.len().to_string());
            return Ok(());
        }

        let spinner = tracker.spinner("Fetching objects...");
        let report = reconciler.pull(&self.refs, &filters).await?;
        spinner.finish_and_clear();

        for (oid, outcome) in &report.outcomes {
            match outcome {
                PullOutcome::Failed(err) => output::object_failure(&oid.to_hex(), &err.to_string()),
                PullOutcome::Unresolvable(reason) => output::object_failure(&oid.to_hex(), reason),
                PullOutcome::Materialized(_) | PullOutcome::AlreadyPresent => {}
            }
        }

        if !global.quiet {
            output::detail("Downloaded", &report.materialized().to_string());
            output::detail("Already present", &report.already_present().to_string());
        }
        if report.has_failures() {
            anyhow::bail!(
                "{} object(s) could not be fetched, {} not registered",
                report.failed(),
                report.unresolvable()
            );
        }
        if !global.quiet {
            output::success("Pull complete");
        }
        Ok(())
    }
}
