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

//! Transfer session state machine: `AWAIT_INIT -> PROCESSING -> TERMINATED`.
//!
//! The read loop is single and sequential. Transfers run as tasks in a
//! `JoinSet`, bounded by a semaphore sized from `init`. Every response
//! goes through one mutex-guarded writer, one line per message, so
//! parallel completions never interleave.

use crate::error::{ProtocolError, ProtocolResult};
use crate::messages::{
    salvage_oid, CompleteResponse, Inbound, InitRequest, InitResponse, ProgressResponse,
    TransferRequest,
};
use gitdrs_git::Oid;
use gitdrs_sync::{ObjectError, Reconciler, SyncContext};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Code for requests the agent cannot interpret
const BAD_REQUEST: u16 = 400;

/// Serialized writer shared by the read loop and all transfer tasks
struct ResponseWriter<W> {
    inner: Mutex<W>,
}

impl<W: AsyncWrite + Unpin> ResponseWriter<W> {
    fn new(writer: W) -> Self {
        ResponseWriter {
            inner: Mutex::new(writer),
        }
    }

    async fn send<T: Serialize>(&self, message: &T) -> ProtocolResult<()> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');
        let mut writer = self.inner.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await?;
        Ok(())
    }
}

/// Counters reported when a session ends
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub operation: String,
    pub remote: String,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Default)]
struct Tally {
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

/// Git LFS custom transfer agent
pub struct TransferAgent {
    ctx: Arc<SyncContext>,
}

impl TransferAgent {
    pub fn new(ctx: Arc<SyncContext>) -> Self {
        TransferAgent { ctx }
    }

    /// Run one session until `terminate` or end of input
    ///
    /// Returns an error only for session-fatal conditions (missing, bad or
    /// failed `init`, broken streams). Per-object failures are answered on the
    /// stream and counted in the summary.
    pub async fn run<R, W>(self, reader: R, writer: W) -> ProtocolResult<SessionSummary>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let writer = Arc::new(ResponseWriter::new(writer));
        let mut lines = reader.lines();

        // AWAIT_INIT
        let init = loop {
            match lines.next_line().await? {
                None => {
                    error!("input closed before init");
                    writer
                        .send(&CompleteResponse::failure("", BAD_REQUEST, "missing init message"))
                        .await?;
                    return Err(ProtocolError::MissingInit);
                }
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => break line,
            }
        };
        let init = match serde_json::from_str::<Inbound>(&init) {
            Ok(Inbound::Init(init)) => init,
            _ => {
                error!("first message is not init: {}", init);
                writer
                    .send(&CompleteResponse::failure("", BAD_REQUEST, "expected init message"))
                    .await?;
                return Err(ProtocolError::ExpectedInit(init));
            }
        };

        let reconciler = match self.connect(&init).await {
            Ok(reconciler) => Arc::new(reconciler),
            Err(message) => {
                error!("init failed: {}", message);
                writer
                    .send(&CompleteResponse::failure("", BAD_REQUEST, message.clone()))
                    .await?;
                return Err(ProtocolError::Init(message));
            }
        };
        writer.send(&InitResponse::default()).await?;

        let workers = init.worker_count();
        info!(
            operation = %init.operation,
            remote = %reconciler.remote(),
            workers,
            "transfer session started"
        );

        // PROCESSING
        let semaphore = Arc::new(Semaphore::new(workers));
        let tally = Arc::new(Tally::default());
        let mut tasks = JoinSet::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let (request, is_upload) = match serde_json::from_str::<Inbound>(&line) {
                Ok(Inbound::Terminate) => {
                    debug!("terminate received");
                    break;
                }
                Ok(Inbound::Upload(request)) => (request, true),
                Ok(Inbound::Download(request)) => (request, false),
                Ok(Inbound::Init(_)) => {
                    warn!("ignoring repeated init");
                    continue;
                }
                Ok(Inbound::Unknown) => {
                    warn!("ignoring unknown event: {}", line);
                    continue;
                }
                Err(e) => {
                    warn!("unparseable request ({}): {}", e, line);
                    if let Some(oid) = salvage_oid(&line) {
                        tally.failed.fetch_add(1, Ordering::Relaxed);
                        let message = format!("malformed request: {}", e);
                        writer
                            .send(&CompleteResponse::failure(oid, BAD_REQUEST, message))
                            .await?;
                    }
                    continue;
                }
            };

            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| ProtocolError::Io(std::io::Error::other(e)))?;
            let reconciler = Arc::clone(&reconciler);
            let writer = Arc::clone(&writer);
            let tally = Arc::clone(&tally);
            tasks.spawn(async move {
                let _permit = permit;
                let response = if is_upload {
                    handle_upload(&reconciler, &request).await
                } else {
                    handle_download(&reconciler, &request, &writer).await
                };
                let counter = if response.is_error() {
                    &tally.failed
                } else {
                    &tally.succeeded
                };
                counter.fetch_add(1, Ordering::Relaxed);
                if let Err(e) = writer.send(&response).await {
                    error!(oid = %request.oid, "failed to write response: {}", e);
                }
            });

            while let Some(done) = tasks.try_join_next() {
                log_join(done);
            }
        }

        // TERMINATED: let in-flight transfers finish and answer
        while let Some(done) = tasks.join_next().await {
            log_join(done);
        }

        let summary = SessionSummary {
            operation: init.operation,
            remote: reconciler.remote().to_string(),
            succeeded: tally.succeeded.load(Ordering::Relaxed),
            failed: tally.failed.load(Ordering::Relaxed),
        };
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "transfer session finished"
        );
        Ok(summary)
    }

    async fn connect(&self, init: &InitRequest) -> Result<Reconciler, String> {
        if init.operation != "upload" && init.operation != "download" {
            return Err(format!("unsupported operation '{}'", init.operation));
        }
        // git-lfs reports the git remote; only honor it when it is also a DRS remote
        let remote = match init.remote.as_deref() {
            Some(name) if self.ctx.remotes.has_remote(name) => Some(name),
            Some(name) => {
                debug!(git_remote = name, "not a DRS remote; using the default");
                None
            }
            None => None,
        };
        Reconciler::connect(Arc::clone(&self.ctx), remote)
            .await
            .map_err(|e| e.to_string())
    }
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!("transfer task aborted: {}", e);
    }
}

fn parse_oid(request: &TransferRequest) -> Result<Oid, CompleteResponse> {
    Oid::from_hex(&request.oid).map_err(|e| {
        CompleteResponse::failure(&request.oid, BAD_REQUEST, format!("invalid oid: {}", e))
    })
}

fn failure(request: &TransferRequest, err: &ObjectError) -> CompleteResponse {
    warn!(oid = %request.oid, code = err.code(), "transfer failed: {}", err);
    CompleteResponse::failure(&request.oid, err.code(), err.to_string())
}

async fn handle_upload(reconciler: &Reconciler, request: &TransferRequest) -> CompleteResponse {
    let oid = match parse_oid(request) {
        Ok(oid) => oid,
        Err(response) => return response,
    };
    let Some(path) = request.path.as_deref() else {
        return CompleteResponse::failure(&request.oid, BAD_REQUEST, "upload request without path");
    };

    match reconciler.upload_object(oid, &PathBuf::from(path), request.size).await {
        Ok(registration) => {
            debug!(
                oid = %oid,
                id = %registration.record.id,
                created = registration.created,
                "upload complete"
            );
            CompleteResponse::success(&request.oid, None)
        }
        Err(e) => failure(request, &e),
    }
}

async fn handle_download<W: AsyncWrite + Unpin>(
    reconciler: &Reconciler,
    request: &TransferRequest,
    writer: &ResponseWriter<W>,
) -> CompleteResponse {
    let oid = match parse_oid(request) {
        Ok(oid) => oid,
        Err(response) => return response,
    };

    match reconciler.materialize(oid, request.size, None).await {
        Ok(path) => {
            let progress = ProgressResponse::new(&request.oid, request.size, request.size);
            if let Err(e) = writer.send(&progress).await {
                warn!(oid = %oid, "failed to write progress: {}", e);
            }
            CompleteResponse::success(&request.oid, Some(path.to_string_lossy().into_owned()))
        }
        Err(e) => failure(request, &e),
    }
}
