// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Spawning and judging one process.
//!
//! ```text
//! run() / run_with_cancellation(token)
//!     token already cancelled? --> ProcessOutput::cancelled(), nothing spawned
//!              |
//!              v
//!     tokio Command: args, cwd, env_clear + env, piped stdio, kill_on_drop
//!              |
//!              v
//!     run_child()
//!              |
//!              v
//!    timed out    --> ProcessError::Timeout
//!    interrupted  --> returned as-is (caller decides)
//!    exit != 0    --> ProcessError::NonZeroExit unless ALLOW_FAILURE
//! ```

use crate::error::{ProcessError, Result};
use anyhow::Context;
use std::fmt::Write as _;
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::builder::{ProcessBuilder, ProcessFlags, ProcessOutput};

impl ProcessBuilder {
    /// Short name used in log fields: the program's file stem.
    pub(super) fn display_name(&self) -> String {
        self.program()
            .file_stem()
            .map_or_else(|| "process".to_string(), |s| s.to_string_lossy().into_owned())
    }

    /// The command line as one string, arguments with spaces quoted.
    pub(crate) fn command_line(&self) -> String {
        let mut cmd = self.program().display().to_string();
        for arg in self.args_slice() {
            if arg.contains(' ') {
                let _ = write!(cmd, " \"{arg}\"");
            } else {
                let _ = write!(cmd, " {arg}");
            }
        }
        cmd
    }

    /// Runs the process to completion.
    ///
    /// # Errors
    ///
    /// - `ProcessError::SpawnFailed` when the program cannot be started.
    /// - `ProcessError::Timeout` when the timeout elapses.
    /// - `ProcessError::NonZeroExit` for a failed exit without `ALLOW_FAILURE`.
    pub async fn run(self) -> Result<ProcessOutput> {
        self.execute(None).await
    }

    /// Runs the process, killing it when `token` is cancelled.
    ///
    /// A cancelled run comes back as output with `is_interrupted()` set and
    /// its exit code unchecked.
    ///
    /// # Errors
    ///
    /// Same as [`ProcessBuilder::run`].
    pub async fn run_with_cancellation(self, token: CancellationToken) -> Result<ProcessOutput> {
        if token.is_cancelled() {
            return Ok(ProcessOutput::cancelled());
        }
        self.execute(Some(token)).await
    }

    async fn execute(self, token: Option<CancellationToken>) -> Result<ProcessOutput> {
        let name = self.display_name();
        let cmd_line = self.command_line();
        debug!(
            cmd = %cmd_line,
            cwd = ?self.working_dir(),
            stdin = self.stdin_content().map(<[u8]>::len),
            "exec"
        );

        let mut child = self
            .build_command()
            .spawn()
            .map_err(|source| ProcessError::SpawnFailed {
                command: cmd_line.clone(),
                source,
            })?;
        trace!(process = %name, pid = ?child.id(), "spawned");

        let output = self
            .run_child(&name, &mut child, token)
            .await
            .with_context(|| format!("failed to run {cmd_line}"))?;

        if output.timed_out() {
            return Err(ProcessError::Timeout {
                command: cmd_line,
                timeout_secs: self.timeout_duration().map_or(0, |d| d.as_secs()),
            }
            .into());
        }
        if output.is_interrupted() {
            return Ok(output);
        }
        if output.exit_code() != 0 && !self.flags().contains(ProcessFlags::ALLOW_FAILURE) {
            debug!(process = %name, stderr = %output.stderr(), "process failed");
            return Err(ProcessError::NonZeroExit {
                command: cmd_line,
                code: output.exit_code(),
            }
            .into());
        }

        trace!(process = %name, exit_code = output.exit_code(), "completed");
        Ok(output)
    }

    fn build_command(&self) -> Command {
        let mut command = Command::new(self.program());
        command.args(self.args_slice());
        if let Some(cwd) = self.working_dir() {
            command.current_dir(cwd);
        }
        if let Some(env) = self.environment() {
            command.env_clear().envs(env.iter());
        }
        command
            .stdin(if self.stdin_content().is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}
