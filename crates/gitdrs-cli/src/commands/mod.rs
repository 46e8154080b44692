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

//! `git-drs` subcommands

pub mod add_url;
pub mod delete;
pub mod delete_project;
pub mod download;
pub mod install;
pub mod list;
pub mod ls_files;
pub mod pre_push;
pub mod pull;
pub mod push;
pub mod query;
pub mod remote;
pub mod transfer;

pub use add_url::AddUrlCmd;
pub use delete::DeleteCmd;
pub use delete_project::DeleteProjectCmd;
pub use download::DownloadCmd;
pub use install::InstallCmd;
pub use list::ListCmd;
pub use ls_files::LsFilesCmd;
pub use pre_push::PrePushCmd;
pub use pull::PullCmd;
pub use push::PushCmd;
pub use query::QueryCmd;
pub use remote::RemoteCmd;
pub use transfer::TransferCmd;

use crate::repo::{self, RepoPaths};
use anyhow::Result;
use std::path::PathBuf;

/// Options shared by every subcommand
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Repository given with `-C`, else the current directory
    pub repository: Option<PathBuf>,
    pub quiet: bool,
    pub verbose: bool,
}

impl GlobalArgs {
    pub fn repo(&self) -> Result<RepoPaths> {
        repo::find_repo(self.repository.as_deref())
    }
}
