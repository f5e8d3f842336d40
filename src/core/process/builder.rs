// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Command description and captured output.
//!
//! ```text
//! ProcessBuilder::which("git")      PATH lookup, cached per name
//!   .args .cwd .env .stdin .timeout .flag
//!
//! ProcessFlags
//!   ALLOW_FAILURE   non-zero exit is returned, not an error
//!   TRACE_STDERR    stderr lines are also logged at trace level
//!
//! ProcessOutput { exit_code, stdout: bytes, stderr: text, interrupted, timed_out }
//! ```
//!
//! Both streams are always captured. Plumbing output is data (NUL separated
//! listings, raw blobs), never something to show a user.

use bitflags::bitflags;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::{OnceLock, PoisonError, RwLock};
use std::time::Duration;

use crate::core::env::container::Env;
use crate::error::ProcessError;

/// Resolved executables by the name they were asked for.
fn resolved() -> &'static RwLock<BTreeMap<String, PathBuf>> {
    static RESOLVED: OnceLock<RwLock<BTreeMap<String, PathBuf>>> = OnceLock::new();
    RESOLVED.get_or_init(RwLock::default)
}

bitflags! {
    /// Flags controlling how a process result is judged and logged.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ProcessFlags: u8 {
        /// Don't fail if the process exits with a non-zero status
        const ALLOW_FAILURE = 1;
        /// Forward stderr to the trace log
        const TRACE_STDERR = 1 << 1;
    }
}

/// Output from a completed process.
///
/// Stdout is kept as raw bytes: git emits NUL-separated listings and blob
/// content that must survive untouched.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    exit_code: i32,
    stdout: Vec<u8>,
    stderr: String,
    interrupted: bool,
    timed_out: bool,
}

impl ProcessOutput {
    pub(super) const fn new(exit_code: i32, stdout: Vec<u8>, stderr: String) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            interrupted: false,
            timed_out: false,
        }
    }

    /// Output of a process that never ran or was killed on cancellation.
    pub(super) const fn cancelled() -> Self {
        Self {
            exit_code: -1,
            stdout: Vec::new(),
            stderr: String::new(),
            interrupted: true,
            timed_out: false,
        }
    }

    pub(super) const fn with_timed_out(mut self, timed_out: bool) -> Self {
        self.timed_out = timed_out;
        self
    }

    pub(super) const fn with_interrupted(mut self, interrupted: bool) -> Self {
        self.interrupted = interrupted;
        self
    }

    /// Exit code; -1 when the process was killed by a signal.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Stdout decoded lossily as UTF-8.
    #[must_use]
    pub fn stdout(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    #[must_use]
    pub fn stdout_bytes(&self) -> &[u8] {
        &self.stdout
    }

    #[must_use]
    pub fn into_stdout_bytes(self) -> Vec<u8> {
        self.stdout
    }

    /// Stderr with trailing whitespace removed.
    #[must_use]
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// True when the process was stopped by cancellation.
    #[must_use]
    pub const fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    #[must_use]
    pub const fn timed_out(&self) -> bool {
        self.timed_out
    }

    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0 && !self.interrupted && !self.timed_out
    }
}

/// A command to run once.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: Option<Env>,
    flags: ProcessFlags,
    stdin: Option<Vec<u8>>,
    timeout: Option<Duration>,
}

impl ProcessBuilder {
    /// Command for `program`, resolved through `PATH` at spawn time when it
    /// is a bare name.
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            cwd: None,
            env: None,
            flags: ProcessFlags::empty(),
            stdin: None,
            timeout: None,
        }
    }

    /// Command for `program` after resolving it through `PATH`.
    ///
    /// Lookups are cached for the life of the process.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError::ExecutableNotFound` if nothing on `PATH` matches.
    pub fn which(program: &str) -> std::result::Result<Self, ProcessError> {
        if let Some(path) = resolved()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(program)
        {
            return Ok(Self::new(path));
        }

        let path = which::which(program).map_err(|_| ProcessError::ExecutableNotFound {
            name: program.to_string(),
        })?;
        resolved()
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(program.to_string(), path.clone());
        Ok(Self::new(path))
    }

    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_string_lossy().into_owned()));
        self
    }

    #[must_use]
    pub fn cwd(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Replaces the whole environment of the child.
    #[must_use]
    pub fn env(mut self, env: Env) -> Self {
        self.env = Some(env);
        self
    }

    #[must_use]
    pub fn flag(mut self, flag: ProcessFlags) -> Self {
        self.flags |= flag;
        self
    }

    /// Bytes written to the child's stdin; stdin is closed afterwards.
    #[must_use]
    pub fn stdin(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(content.into());
        self
    }

    /// Kills the child when it runs longer than `duration`.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    #[must_use]
    pub const fn program(&self) -> &PathBuf {
        &self.program
    }

    pub(super) fn args_slice(&self) -> &[String] {
        &self.args
    }

    pub(super) const fn working_dir(&self) -> Option<&PathBuf> {
        self.cwd.as_ref()
    }

    pub(super) const fn environment(&self) -> Option<&Env> {
        self.env.as_ref()
    }

    pub(super) const fn flags(&self) -> ProcessFlags {
        self.flags
    }

    pub(super) fn stdin_content(&self) -> Option<&[u8]> {
        self.stdin.as_deref()
    }

    pub(super) const fn timeout_duration(&self) -> Option<Duration> {
        self.timeout
    }
}
