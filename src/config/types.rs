// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration sections.
//!
//! ```text
//! Config
//!   [log]         console_level, file_level, file, json
//!   [git]         binary, timeout_secs, diff_timeout_secs, object_format, hook_env_prefix
//!   [lfs]         start_server, content_path
//!   [repository]  temp_path, fallback_encoding, app_url
//!   [diff]        max_lines, max_line_characters, max_files
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::git::object::ObjectFormat;
use crate::logging::LogLevel;

/// `[log]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSection {
    /// Level for stderr output (0-5).
    pub console_level: LogLevel,
    /// Level for the log file (0-5).
    pub file_level: LogLevel,
    /// Log file; no file logging when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Emit JSON lines instead of text.
    pub json: bool,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            console_level: LogLevel::INFO,
            file_level: LogLevel::DEBUG,
            file: None,
            json: false,
        }
    }
}

/// `[git]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitConfig {
    /// Git executable, looked up in `PATH` when not absolute.
    pub binary: String,
    /// Timeout for every git subprocess.
    pub timeout_secs: u64,
    /// Timeout for diff computation.
    pub diff_timeout_secs: u64,
    /// Object format used when initialising an empty repository.
    pub object_format: ObjectFormat,
    /// Prefix of the pusher variables handed to hooks.
    pub hook_env_prefix: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            binary: "git".to_string(),
            timeout_secs: 360,
            diff_timeout_secs: 60,
            object_format: ObjectFormat::Sha1,
            hook_env_prefix: "REPOFILES".to_string(),
        }
    }
}

/// `[lfs]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LfsConfig {
    /// Route `filter=lfs` paths through the content store.
    pub start_server: bool,
    /// Root of the content-addressed object store.
    pub content_path: PathBuf,
}

impl Default for LfsConfig {
    fn default() -> Self {
        Self {
            start_server: false,
            content_path: PathBuf::from("data/lfs"),
        }
    }
}

/// `[repository]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Parent directory of temporary upload repositories.
    pub temp_path: PathBuf,
    /// Charset assumed for existing files that are not UTF-8.
    pub fallback_encoding: String,
    /// Base URL used in responses.
    pub app_url: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            temp_path: std::env::temp_dir().join("repofiles-uploads"),
            fallback_encoding: "windows-1252".to_string(),
            app_url: "http://localhost:3000/".to_string(),
        }
    }
}

/// `[diff]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiffConfig {
    pub max_lines: usize,
    pub max_line_characters: usize,
    pub max_files: usize,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            max_lines: 1000,
            max_line_characters: 5000,
            max_files: 100,
        }
    }
}
