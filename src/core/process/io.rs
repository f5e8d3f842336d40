// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Feeding and draining a running child.
//!
//! ```text
//! run_child()
//!   stdout, stderr --> drain tasks (read_to_end)
//!   stdin          --> written while the drains run, then closed
//!   select! { wait | deadline --> kill | cancelled --> kill }
//! ```
//!
//! Draining concurrently with the stdin write keeps a child that answers
//! while it reads (`cat-file --batch`, `fast-import`) from filling a pipe
//! and stalling.

use crate::error::Result;
use anyhow::Context;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::builder::{ProcessBuilder, ProcessFlags, ProcessOutput};

fn drain<R>(stream: Option<R>) -> Option<JoinHandle<std::io::Result<Vec<u8>>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    stream.map(|mut stream| {
        tokio::spawn(async move {
            let mut buffer = Vec::new();
            stream.read_to_end(&mut buffer).await?;
            Ok(buffer)
        })
    })
}

async fn collect(handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>, name: &str, stream: &str) -> Vec<u8> {
    let Some(handle) = handle else {
        return Vec::new();
    };
    match handle.await {
        Ok(Ok(buffer)) => buffer,
        Ok(Err(e)) => {
            warn!(process = %name, stream, error = %e, "error reading stream");
            Vec::new()
        }
        Err(e) => {
            warn!(process = %name, stream, error = %e, "stream reader panicked");
            Vec::new()
        }
    }
}

async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

impl ProcessBuilder {
    /// Feeds stdin, waits for exit, timeout or cancellation, and collects
    /// both streams.
    pub(super) async fn run_child(
        &self,
        name: &str,
        child: &mut Child,
        token: Option<CancellationToken>,
    ) -> Result<ProcessOutput> {
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        self.write_stdin(name, child).await?;

        let mut interrupted = false;
        let mut timed_out = false;
        let status = tokio::select! {
            status = child.wait() => status?,
            () = deadline(self.timeout_duration()) => {
                warn!(process = %name, timeout = ?self.timeout_duration(), "process timed out");
                timed_out = true;
                child.kill().await.with_context(|| format!("failed to kill process {name}"))?;
                child.wait().await?
            }
            () = cancelled(token.as_ref()) => {
                warn!(process = %name, "cancellation requested, terminating process");
                interrupted = true;
                child.kill().await.ok();
                child.wait().await
                    .with_context(|| format!("failed waiting for process {name} to exit"))?
            }
        };

        let stdout = collect(stdout, name, "stdout").await;
        let stderr = String::from_utf8_lossy(&collect(stderr, name, "stderr").await)
            .trim_end()
            .to_string();
        if self.flags().contains(ProcessFlags::TRACE_STDERR) {
            for line in stderr.lines() {
                trace!(process = %name, line, "stderr");
            }
        }

        Ok(ProcessOutput::new(status.code().unwrap_or(-1), stdout, stderr)
            .with_timed_out(timed_out)
            .with_interrupted(interrupted))
    }

    /// A child that exits before reading all of its input closes the pipe;
    /// its exit status is what matters then, so a broken pipe is not an error.
    async fn write_stdin(&self, name: &str, child: &mut Child) -> Result<()> {
        let (Some(content), Some(mut stdin)) = (self.stdin_content(), child.stdin.take()) else {
            return Ok(());
        };
        match stdin.write_all(content).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                debug!(process = %name, "stdin closed early by child");
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("failed to write to stdin for process {name}")),
        }
    }
}
