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

//! List large objects referenced from refs.

use super::GlobalArgs;
use crate::output;
use crate::progress::format_bytes;
use anyhow::{Context, Result};
use clap::Args;
use gitdrs_git::InventoryScanner;
use serde_json::json;

/// Show pointer files reachable from refs and whether their bytes are local
#[derive(Debug, Args)]
#[command(after_help = "Each line is `<oid> <*|-> <path>`: `*` when the bytes are in
.git/lfs/objects, `-` when only the pointer is checked in.")]
pub struct LsFilesCmd {
    /// Refs to scan (defaults to HEAD)
    #[arg(value_name = "REF")]
    pub refs: Vec<String>,

    /// Print full object ids and sizes
    #[arg(short, long)]
    pub long: bool,

    /// Machine-readable output
    #[arg(long, conflicts_with = "long")]
    pub json: bool,
}

impl LsFilesCmd {
    pub async fn execute(&self, global: &GlobalArgs) -> Result<()> {
        let paths = global.repo()?;
        let inventory = InventoryScanner::open(&paths.root)
            .and_then(|scanner| scanner.scan(&self.refs))
            .context("Failed to scan repository")?;

        if self.json {
            let objects: Vec<_> = inventory
                .objects
                .iter()
                .map(|object| {
                    json!({
                        "oid": object.oid.to_hex(),
                        "size": object.size,
                        "present": object.present,
                        "paths": object.tracked.iter().map(|t| &t.path).collect::<Vec<_>>(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&objects)?);
            return Ok(());
        }

        for object in &inventory.objects {
            let hex = object.oid.to_hex();
            let oid = if self.long { hex.as_str() } else { output::short_oid(&hex) };
            let marker = if object.present { "*" } else { "-" };
            for tracked in &object.tracked {
                if self.long {
                    println!("{} {} {} ({})", oid, marker, tracked.path, format_bytes(object.size));
                } else {
                    println!("{} {} {}", oid, marker, tracked.path);
                }
            }
        }
        if !global.quiet {
            for skipped in &inventory.skipped {
                output::warning(&format!("{}: {}", skipped.path, skipped.reason));
            }
        }
        Ok(())
    }
}
