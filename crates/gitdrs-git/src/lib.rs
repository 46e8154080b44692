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

//! # git-drs Git integration layer
//!
//! Everything git-drs needs from the local repository, without a working tree.
//!
//! ## Architecture
//!
//! - **Content hashes** ([`Oid`]): SHA-256 identity of a large object
//! - **Pointer files** ([`PointerFile`]): the Git LFS text blobs committed in
//!   place of large content
//! - **Inventory** ([`InventoryScanner`]): enumerates pointers reachable from
//!   a set of refs straight from the object database, deduplicated by hash
//! - **Object store** ([`LfsObjectStore`]): the sharded `.git/lfs/objects`
//!   directory with temp-then-rename installs
//! - **Setup** ([`install_agent`]): custom transfer agent and pre-push hook
//!   registration
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gitdrs_git::InventoryScanner;
//!
//! let scanner = InventoryScanner::open(".")?;
//! let inventory = scanner.scan(&["main"])?;
//! for object in &inventory.objects {
//!     println!("{} {} present={}", object.oid, object.size, object.present);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod install;
pub mod inventory;
pub mod oid;
pub mod pointer;
pub mod store;

pub use error::{GitError, GitResult};
pub use install::{install_agent, is_installed, InstallOptions, InstallReport, AGENT_NAME};
pub use inventory::{
    ContentObject, Inventory, InventoryScanner, SkippedPointer, TrackedFile, DEFAULT_REF,
};
pub use oid::{ContentHasher, Oid, HASH_ALGORITHM};
pub use pointer::{PointerFile, MAX_POINTER_SIZE, POINTER_VERSION};
pub use store::LfsObjectStore;
