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

//! Pre-push hook body: register objects before Git LFS uploads bytes.

use super::GlobalArgs;
use crate::output;
use anyhow::{Context, Result};
use clap::Args;
use gitdrs_sync::{run_pre_push, TriggerOutcome};
use tracing::{info, warn};

/// Register objects reachable from the refs Git is about to push.
///
/// Reads `<local ref> <local sha> <remote ref> <remote sha>` lines on stdin,
/// as Git passes them to the pre-push hook.
#[derive(Debug, Args)]
pub struct PrePushCmd {
    /// Name of the Git remote being pushed to (ignored for DRS lookups)
    #[arg(value_name = "REMOTE")]
    pub git_remote: Option<String>,

    /// URL of the Git remote being pushed to
    #[arg(value_name = "URL")]
    pub url: Option<String>,

    /// DRS remote to register with instead of the default
    #[arg(long, value_name = "NAME")]
    pub drs_remote: Option<String>,
}

impl PrePushCmd {
    pub async fn execute(&self, global: &GlobalArgs) -> Result<()> {
        let paths = global.repo()?;
        info!(git_remote = ?self.git_remote, url = ?self.url, "pre-push hook started");

        let input = std::io::stdin().lock();
        let outcome = run_pre_push(&paths.root, self.drs_remote.as_deref(), input)
            .await
            .context("DRS registration failed")?;

        match outcome {
            TriggerOutcome::NothingToPush => Ok(()),
            TriggerOutcome::Unconfigured(reason) => {
                if !global.quiet {
                    output::warning(&format!(
                        "git-drs is not configured, skipping registration: {}",
                        reason
                    ));
                }
                Ok(())
            }
            TriggerOutcome::Pushed(report) => {
                for (oid, err) in report.failures() {
                    warn!(oid = %oid, code = err.code(), "registration failed: {}", err);
                    output::object_failure(&oid.to_hex(), &err.to_string());
                }
                if report.has_failures() {
                    anyhow::bail!(
                        "{} object(s) could not be registered; push aborted",
                        report.failures().count()
                    );
                }
                if !global.quiet && !report.registered.is_empty() {
                    eprintln!("git-drs: registered {} object(s)", report.registered.len());
                }
                for missing in &report.plan.unresolvable {
                    warn!(oid = %missing.object.oid, "not registered: {}", missing.reason);
                }
                Ok(())
            }
        }
    }
}
