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

//! Configure Git LFS to use git-drs in the current repository.

use super::GlobalArgs;
use crate::output;
use anyhow::{Context, Result};
use clap::Args;
use console::style;
use gitdrs_git::{install_agent, InstallOptions, AGENT_NAME};

/// Register the custom transfer agent and the pre-push hook
#[derive(Debug, Args)]
pub struct InstallCmd {
    /// Program Git LFS should spawn (defaults to `git-drs` on PATH)
    #[arg(long, value_name = "PATH")]
    pub program: Option<String>,

    /// Replace an existing pre-push hook not written by git-drs
    #[arg(short, long)]
    pub force: bool,

    /// Disable concurrent transfers in the agent configuration
    #[arg(long)]
    pub no_concurrent: bool,
}

impl InstallCmd {
    pub async fn execute(&self, global: &GlobalArgs) -> Result<()> {
        let paths = global.repo()?;
        let mut options = InstallOptions {
            concurrent: !self.no_concurrent,
            force_hook: self.force,
            ..InstallOptions::default()
        };
        if let Some(program) = &self.program {
            options.program = program.clone();
        }

        let report = install_agent(&paths.root, &options)
            .with_context(|| format!("Failed to install git-drs in {}", paths.root.display()))?;

        if global.quiet {
            return Ok(());
        }
        output::success(&format!(
            "Transfer agent '{}' configured ({} transfer)",
            AGENT_NAME, options.program
        ));
        if report.hook_written {
            output::detail("pre-push hook", &report.hook_path.display().to_string());
        } else {
            output::warning(&format!(
                "Existing pre-push hook left untouched: {}\n  Re-run with {} to replace it",
                report.hook_path.display(),
                style("--force").bold()
            ));
        }
        Ok(())
    }
}
