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

mod commands;
mod output;
mod progress;
mod repo;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use commands::*;
use gitdrs_config::Config;
use gitdrs_observability::{
    init_tracing, init_tracing_with_config, LogConfig, LogFormat, LogOutput,
};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "git-drs")]
#[command(version, about = "Large files for Git, backed by data repositories")]
#[command(
    long_about = "git-drs registers Git LFS objects with a data repository (indexd, S3, or a
local DRS server) and moves their bytes as a Git LFS custom transfer agent."
)]
#[command(propagate_version = true)]
#[command(author = "git-drs Contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Colored output (always|auto|never)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Run as if started in PATH
    #[arg(short = 'C', long, global = true, value_name = "PATH")]
    repository: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Git LFS custom transfer agent (spawned by git-lfs)
    Transfer(TransferCmd),

    /// Register objects for refs read from pre-push hook input
    #[command(name = "pre-push-prepare")]
    PrePushPrepare(PrePushCmd),

    /// Register and upload objects reachable from refs
    Push(PushCmd),

    /// Download objects missing from the local store
    Pull(PullCmd),

    /// List large objects referenced from refs
    #[command(name = "ls-files")]
    LsFiles(LsFilesCmd),

    /// Show the remote record for an object
    Query(QueryCmd),

    /// List records registered under the remote's project
    List(ListCmd),

    /// Register an object already in a bucket and write its pointer
    #[command(name = "add-url")]
    AddUrl(AddUrlCmd),

    /// Delete the remote record for an object
    Delete(DeleteCmd),

    /// Delete every record in the remote's project
    #[command(name = "delete-project", hide = true)]
    DeleteProject(DeleteProjectCmd),

    /// Download one object by content hash
    Download(DownloadCmd),

    /// Configure the transfer agent and pre-push hook
    Install(InstallCmd),

    /// Manage DRS remotes
    Remote(RemoteCmd),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Commands {
    /// Modes whose stdout or stderr belongs to Git
    fn logs_to_file(&self) -> bool {
        matches!(self, Commands::Transfer(_) | Commands::PrePushPrepare(_))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.color.as_str() {
        "never" => console::set_colors_enabled(false),
        "always" => console::set_colors_enabled(true),
        "auto" => {}
        _ => {
            eprintln!("Invalid color option: {}", cli.color);
            std::process::exit(2);
        }
    }

    let global = GlobalArgs {
        repository: cli.repository,
        quiet: cli.quiet,
        verbose: cli.verbose,
    };
    init_logging(&cli.command, &global).await;
    let logs_to_file = cli.command.logs_to_file();

    let result = match cli.command {
        Commands::Transfer(cmd) => cmd.execute(&global).await,
        Commands::PrePushPrepare(cmd) => cmd.execute(&global).await,
        Commands::Push(cmd) => cmd.execute(&global).await,
        Commands::Pull(cmd) => cmd.execute(&global).await,
        Commands::LsFiles(cmd) => cmd.execute(&global).await,
        Commands::Query(cmd) => cmd.execute(&global).await,
        Commands::List(cmd) => cmd.execute(&global).await,
        Commands::AddUrl(cmd) => cmd.execute(&global).await,
        Commands::Delete(cmd) => cmd.execute(&global).await,
        Commands::DeleteProject(cmd) => cmd.execute(&global).await,
        Commands::Download(cmd) => cmd.execute(&global).await,
        Commands::Install(cmd) => cmd.execute(&global).await,
        Commands::Remote(cmd) => cmd.execute(&global).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "git-drs", &mut io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        if logs_to_file {
            tracing::error!("{:#}", e);
        }
        output::error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

/// Transfer and hook modes log to `.git/drs/git-drs.log`, honoring the
/// `logging` section of `.drs/config.yaml`; everything else logs to stderr
/// unless quiet.
async fn init_logging(command: &Commands, global: &GlobalArgs) {
    if command.logs_to_file() {
        if let Ok(paths) = global.repo() {
            let logging = Config::load(&paths.root)
                .await
                .map(|config| config.logging)
                .unwrap_or_default();
            let format = logging
                .format
                .as_deref()
                .and_then(|f| f.parse().ok())
                .unwrap_or(LogFormat::Compact);
            let mut config = LogConfig::new()
                .with_format(format)
                .with_color(false)
                .with_output(LogOutput::File(paths.log_file()));
            if global.verbose {
                config = config.with_level("debug");
            } else if let Some(level) = logging.level {
                config = config.with_level(level);
            }
            // A log file that cannot be opened must not break the protocol
            init_tracing_with_config(config).ok();
            return;
        }
    }

    if !global.quiet {
        let level = if global.verbose { "debug" } else { "warn" };
        init_tracing(LogFormat::Pretty, Some(level)).ok();
    }
}
