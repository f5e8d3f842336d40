// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Command implementations.
//!
//! ```text
//! CLI args --> cmd::run_* handlers
//!   change, delete, patch, cherry-pick, preview --> files
//!   config, config-files                        --> config
//! ```

pub mod config;
pub mod files;
