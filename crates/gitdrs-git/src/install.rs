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

//! Repository setup
//!
//! Registers git-drs with Git LFS as a standalone custom transfer agent and
//! installs a `pre-push` hook that registers objects before LFS moves bytes.
//!
//! ```text
//! [lfs]
//!     standalonetransferagent = drs
//! [lfs "customtransfer.drs"]
//!     path = git-drs
//!     args = transfer
//!     concurrent = true
//! ```

use crate::error::{GitError, GitResult};
use git2::Repository;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the custom transfer agent in Git configuration
pub const AGENT_NAME: &str = "drs";

/// Marker identifying a hook written by us
const HOOK_MARKER: &str = "# installed by git-drs";

/// Installation settings
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Program Git LFS spawns for transfers
    pub program: String,

    /// Tell LFS it may send several requests before reading responses
    pub concurrent: bool,

    /// Replace a pre-push hook that was not written by git-drs
    pub force_hook: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            program: "git-drs".to_string(),
            concurrent: true,
            force_hook: false,
        }
    }
}

/// What [`install_agent`] changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub hook_path: PathBuf,

    /// False when an existing foreign hook was left untouched
    pub hook_written: bool,
}

/// Configure the transfer agent and pre-push hook in the repository at `repo_path`
pub fn install_agent(repo_path: &Path, options: &InstallOptions) -> GitResult<InstallReport> {
    info!("Installing git-drs transfer agent in repository: {:?}", repo_path);

    let repo = Repository::discover(repo_path).map_err(|e| {
        GitError::RepositoryNotFound(format!("{}: {}", repo_path.display(), e))
    })?;

    let mut config = repo.config()?.open_level(git2::ConfigLevel::Local)?;
    let section = format!("lfs.customtransfer.{}", AGENT_NAME);
    config.set_str(&format!("{}.path", section), &options.program)?;
    config.set_str(&format!("{}.args", section), "transfer")?;
    config.set_bool(&format!("{}.concurrent", section), options.concurrent)?;
    config.set_str("lfs.standalonetransferagent", AGENT_NAME)?;

    let hooks_dir = repo.path().join("hooks");
    let hook_path = hooks_dir.join("pre-push");
    let hook_written = write_pre_push_hook(&hook_path, &options.program, options.force_hook)?;

    info!("Transfer agent installed successfully");
    Ok(InstallReport {
        hook_path,
        hook_written,
    })
}

/// Whether the repository is already configured for git-drs
pub fn is_installed(repo_path: &Path) -> GitResult<bool> {
    let repo = Repository::discover(repo_path).map_err(|e| {
        GitError::RepositoryNotFound(format!("{}: {}", repo_path.display(), e))
    })?;
    let config = repo.config()?;
    let agent = config.get_string("lfs.standalonetransferagent").ok();
    Ok(agent.as_deref() == Some(AGENT_NAME))
}

fn pre_push_script(program: &str) -> String {
    format!(
        "#!/bin/sh\n{marker}\n\
         # Register large objects with the data repository before LFS uploads bytes.\n\
         command -v git-lfs >/dev/null 2>&1 || {{ echo >&2 \"git-lfs is required\"; exit 2; }}\n\
         input=$(cat)\n\
         printf '%s\\n' \"$input\" | {program} pre-push-prepare \"$@\" || exit $?\n\
         printf '%s\\n' \"$input\" | git lfs pre-push \"$@\"\n",
        marker = HOOK_MARKER,
        program = program,
    )
}

fn write_pre_push_hook(path: &Path, program: &str, force: bool) -> GitResult<bool> {
    if path.exists() && !force {
        let existing = fs::read_to_string(path)?;
        if !existing.contains(HOOK_MARKER) {
            debug!("leaving existing pre-push hook at {}", path.display());
            return Ok(false);
        }
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, pre_push_script(program))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_install_sets_config_and_hook() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();

        let report = install_agent(dir.path(), &InstallOptions::default()).unwrap();
        assert!(report.hook_written);
        assert!(is_installed(dir.path()).unwrap());

        let repo = Repository::open(dir.path()).unwrap();
        let config = repo.config().unwrap();
        assert_eq!(
            config.get_string("lfs.customtransfer.drs.path").unwrap(),
            "git-drs"
        );
        assert_eq!(
            config.get_string("lfs.customtransfer.drs.args").unwrap(),
            "transfer"
        );
        assert!(config.get_bool("lfs.customtransfer.drs.concurrent").unwrap());

        let hook = fs::read_to_string(&report.hook_path).unwrap();
        assert!(hook.contains("git-drs pre-push-prepare"));
        assert!(hook.contains("git lfs pre-push"));
    }

    #[test]
    fn test_foreign_hook_preserved_unless_forced() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let hook = repo.path().join("hooks").join("pre-push");
        fs::create_dir_all(hook.parent().unwrap()).unwrap();
        fs::write(&hook, "#!/bin/sh\necho mine\n").unwrap();

        let report = install_agent(dir.path(), &InstallOptions::default()).unwrap();
        assert!(!report.hook_written);
        assert_eq!(fs::read_to_string(&hook).unwrap(), "#!/bin/sh\necho mine\n");

        let forced = InstallOptions {
            force_hook: true,
            ..InstallOptions::default()
        };
        assert!(install_agent(dir.path(), &forced).unwrap().hook_written);
    }

    #[test]
    fn test_reinstall_overwrites_own_hook() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        install_agent(dir.path(), &InstallOptions::default()).unwrap();
        let again = install_agent(dir.path(), &InstallOptions::default()).unwrap();
        assert!(again.hook_written);
    }
}
