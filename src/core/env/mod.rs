// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Environment variable management.
//!
//! # Architecture
//!
//! ```text
//! Env (copy-on-write BTreeMap<String, String>)
//! Sources: current_env(), git_env(), Env::new()
//! Ops: set/get/remove/extend
//! ```
//!
//! - **Copy-on-write**: Clones share data until modified
//! - **Explicit**: git identity travels in an `Env` handed to each subprocess;
//!   the engine never mutates its own process environment

pub mod container;


/// Captures the current process environment.
#[must_use]
pub fn current_env() -> container::Env {
    let vars = std::env::vars().collect();
    container::Env::from_map(vars)
}

/// Base environment for every git subprocess.
///
/// Inherits the process environment, disables interactive prompts and pins the
/// locale so stderr stays matchable.
#[must_use]
pub fn git_env() -> container::Env {
    let mut env = current_env();
    env.set("GIT_TERMINAL_PROMPT", "0")
        .set("GCM_INTERACTIVE", "never")
        .set("LC_ALL", "C")
        .set("LANGUAGE", "C");
    env
}
