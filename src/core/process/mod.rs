// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Async process spawning and management.
//!
//! ```text
//! ProcessBuilder::new("git")
//!   .args() .cwd() .env() .stdin() .timeout() .flag()
//!   .run() / .run_with_cancellation()
//!       --> tokio::process::Command (kill_on_drop)
//!           stdin writer, stdout/stderr reader tasks
//!           select! { exit | timeout | cancel }
//!       --> ProcessOutput { exit_code, stdout, stderr, interrupted, timed_out }
//! ```

pub mod builder;
mod io;
mod runner;
