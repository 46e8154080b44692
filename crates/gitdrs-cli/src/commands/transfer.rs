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

//! Git LFS custom transfer agent entry point.
//!
//! Git LFS spawns `git-drs transfer` and talks to it over stdin/stdout.
//! Nothing but protocol messages may reach stdout; diagnostics go to
//! `.git/drs/git-drs.log`.

use super::GlobalArgs;
use crate::repo;
use anyhow::{Context, Result};
use clap::Args;
use gitdrs_transfer::{CompleteResponse, TransferAgent};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{error, info};

#[derive(Debug, Args)]
#[command(after_help = "This command is started by Git LFS. Configure it with:
    git-drs install")]
pub struct TransferCmd {}

impl TransferCmd {
    pub async fn execute(&self, global: &GlobalArgs) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();

        let ctx = match global.repo() {
            Ok(paths) => repo::load_context(&paths.root).await,
            Err(e) => Err(e),
        };
        let ctx = match ctx {
            Ok(ctx) => ctx,
            Err(e) => {
                error!("cannot start transfer session: {:#}", e);
                reject_session(stdin, stdout, &format!("{:#}", e)).await?;
                return Err(e);
            }
        };

        let summary = TransferAgent::new(ctx)
            .run(stdin, stdout)
            .await
            .context("Transfer session failed")?;
        info!(
            operation = %summary.operation,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "transfer agent exiting"
        );
        Ok(())
    }
}

/// Answer the `init` message with an error when no context can be built.
///
/// The failure is written even when input ends before `init` arrives.
async fn reject_session<R, W>(mut reader: R, mut writer: W, message: &str) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();
    reader.read_line(&mut line).await?;
    let mut out = serde_json::to_vec(&CompleteResponse::failure("", 400, message))?;
    out.push(b'\n');
    writer.write_all(&out).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reject_session_answers_init_once() {
        let input: &[u8] = b"{\"event\":\"init\",\"operation\":\"download\"}\n";
        let mut out = Vec::new();
        reject_session(input, &mut out, "no config").await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(value["oid"], "");
        assert_eq!(value["error"]["code"], 400);
        assert_eq!(value["error"]["message"], "no config");
    }

    #[tokio::test]
    async fn test_reject_session_on_empty_input_still_answers() {
        let mut out = Vec::new();
        reject_session(&b""[..], &mut out, "no config").await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(value["oid"], "");
        assert_eq!(value["error"]["code"], 400);
    }
}
