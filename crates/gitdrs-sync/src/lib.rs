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

//! # git-drs synchronization
//!
//! Reconciles the large objects referenced by Git LFS pointers with a
//! remote object directory.
//!
//! - **Push** ([`Reconciler::push`]): register every locally held object
//!   that has no record in the remote's project scope, then queue uploads
//! - **Pull** ([`Reconciler::pull`]): download, verify and install objects
//!   that are referenced but absent locally
//! - **Single objects** ([`Reconciler::upload_object`],
//!   [`Reconciler::materialize`]): the operations behind the transfer agent
//! - **Pre-push trigger** ([`trigger::run_pre_push`])
//!
//! Dependencies arrive through an explicit [`SyncContext`].
//!
//! ```rust,no_run
//! use gitdrs_sync::{Reconciler, SyncContext};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = Arc::new(SyncContext::load(Path::new(".")).await?);
//! let reconciler = Reconciler::connect(ctx, None).await?;
//! let report = reconciler.push(&["main"]).await?;
//! let uploads = reconciler.upload_pending(&report).await;
//! println!("registered {}, uploaded {}", report.registered.len(), uploads.uploaded.len());
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod error;
pub mod plan;
pub mod reconciler;
pub mod trigger;

pub use context::{ConfiguredRemotes, RemoteProvider, SingleRemote, SyncContext};
pub use error::{ObjectError, ObjectErrorKind, SyncError, SyncResult};
pub use plan::{
    DeleteReport, PullOutcome, PullReport, PushReport, SyncPlan, Unresolvable, UploadReport,
    UploadRequest,
};
pub use reconciler::{parse_filters, QueryResult, Reconciler, Registration};
pub use trigger::{run_pre_push, RefUpdate, TriggerOutcome};

pub use gitdrs_storage::RemoteRecord;
