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

//! List the records registered in a remote's project scope.

use super::GlobalArgs;
use crate::output;
use crate::repo;
use anyhow::Result;
use clap::Args;
use gitdrs_sync::RemoteRecord;

/// Checksum types in display order of preference
const CHECKSUM_PREFERENCE: [&str; 3] = ["sha256", "md5", "etag"];

/// Show every record registered under the remote's project
#[derive(Debug, Args)]
#[command(after_help = "Each line is `<id> <size> <type:checksum> <name>`, tab separated.")]
pub struct ListCmd {
    /// DRS remote name (defaults to the configured default)
    #[arg(short, long)]
    pub remote: Option<String>,

    /// One JSON record per line
    #[arg(short, long)]
    pub json: bool,
}

impl ListCmd {
    pub async fn execute(&self, global: &GlobalArgs) -> Result<()> {
        let paths = global.repo()?;
        let reconciler = repo::connect(&paths.root, self.remote.as_deref()).await?;
        let records = reconciler.list_records().await?;

        for record in &records {
            if self.json {
                println!("{}", serde_json::to_string(record)?);
            } else {
                println!("{}", format_line(record));
            }
        }
        if records.is_empty() && !global.quiet && !self.json {
            output::info(&format!("No records in {}", reconciler.scope()));
        }
        Ok(())
    }
}

fn format_line(record: &RemoteRecord) -> String {
    format!(
        "{}\t{:>15}\t{:<45}\t{}",
        record.id,
        record.size,
        preferred_checksum(record).unwrap_or_default(),
        record.name.as_deref().unwrap_or("")
    )
}

/// Most preferred checksum as `type:value`
fn preferred_checksum(record: &RemoteRecord) -> Option<String> {
    record
        .checksums
        .iter()
        .filter_map(|c| {
            let rank = CHECKSUM_PREFERENCE
                .iter()
                .position(|p| c.kind.eq_ignore_ascii_case(p))?;
            Some((rank, c))
        })
        .min_by_key(|(rank, _)| *rank)
        .map(|(_, c)| format!("{}:{}", c.kind.to_ascii_lowercase(), c.checksum))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(checksums: serde_json::Value) -> RemoteRecord {
        serde_json::from_value(serde_json::json!({
            "id": "did-1",
            "name": "data/a.bin",
            "size": 42,
            "checksums": checksums,
        }))
        .unwrap()
    }

    #[test]
    fn test_sha256_preferred_over_md5() {
        let r = record(serde_json::json!([
            {"type": "md5", "checksum": "m"},
            {"type": "sha256", "checksum": "s"},
        ]));
        assert_eq!(preferred_checksum(&r).as_deref(), Some("sha256:s"));
    }

    #[test]
    fn test_unknown_checksum_types_are_ignored() {
        let r = record(serde_json::json!([{"type": "crc32c", "checksum": "c"}]));
        assert_eq!(preferred_checksum(&r), None);
        assert_eq!(format_line(&r).split('\t').nth(3), Some("data/a.bin"));
    }
}
