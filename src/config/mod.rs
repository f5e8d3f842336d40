// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Engine and CLI settings.
//!
//! # Configuration Hierarchy
//!
//! ```text
//! Priority (low → high)
//! 1. defaults
//! 2. ./repofiles.toml, unless --no-default-config
//! 3. --config files (in order)
//! 4. REPOFILES_* env vars
//! 5. --set overrides
//! ```
//!
//! # Environment Variable Mapping
//!
//! ```text
//! REPOFILES_GIT__TIMEOUT_SECS=30      → git.timeout_secs = 30
//! REPOFILES_LFS__START_SERVER=true    → lfs.start_server = true
//! REPOFILES_REPOSITORY__APP_URL=...   → repository.app_url = "..."
//! ```

pub mod loader;
pub mod types;

#[cfg(test)]
mod tests;

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::git::diff::DiffLimits;
use crate::utility::charset;

pub use loader::ConfigLoader;
pub use types::{DiffConfig, GitConfig, LfsConfig, LogSection, RepositoryConfig};

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub log: LogSection,
    pub git: GitConfig,
    pub lfs: LfsConfig,
    pub repository: RepositoryConfig,
    pub diff: DiffConfig,
}

impl Config {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use repofiles_rs::config::Config;
    ///
    /// let config = Config::builder()
    ///     .add_toml_file_optional("repofiles.toml")
    ///     .with_env_prefix("REPOFILES")
    ///     .build()?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    #[must_use]
    pub fn builder() -> ConfigLoader {
        ConfigLoader::new()
    }

    /// Load configuration from a single TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid TOML, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::builder().add_toml_file(path).build()
    }

    /// Load configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid TOML or fails validation.
    pub fn parse(content: &str) -> Result<Self> {
        Self::builder().add_toml_str(content).build()
    }

    /// Rejects values the engine cannot work with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first bad key.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let invalid = |section: &str, key: &str, message: &str| ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            message: message.to_string(),
        };

        if self.git.timeout_secs == 0 {
            return Err(invalid("git", "timeout_secs", "must be greater than 0"));
        }
        if self.git.diff_timeout_secs == 0 {
            return Err(invalid("git", "diff_timeout_secs", "must be greater than 0"));
        }
        if self.git.binary.trim().is_empty() {
            return Err(invalid("git", "binary", "must not be empty"));
        }
        for (key, value) in [
            ("max_lines", self.diff.max_lines),
            ("max_line_characters", self.diff.max_line_characters),
            ("max_files", self.diff.max_files),
        ] {
            if value == 0 {
                return Err(invalid("diff", key, "must be greater than 0"));
            }
        }
        if charset::encoding_for_label(&self.repository.fallback_encoding).is_none() {
            return Err(invalid(
                "repository",
                "fallback_encoding",
                &format!("unknown encoding '{}'", self.repository.fallback_encoding),
            ));
        }
        Ok(())
    }

    /// Limits for the diff preview parser.
    #[must_use]
    pub const fn diff_limits(&self) -> DiffLimits {
        DiffLimits {
            max_lines: self.diff.max_lines,
            max_line_characters: self.diff.max_line_characters,
            max_files: self.diff.max_files,
        }
    }

    /// Encoding named by `repository.fallback_encoding`, windows-1252 if unknown.
    #[must_use]
    pub fn fallback_encoding(&self) -> &'static Encoding {
        charset::encoding_for_label(&self.repository.fallback_encoding)
            .unwrap_or(encoding_rs::WINDOWS_1252)
    }

    /// Format configuration options for display.
    ///
    /// Output is deterministically ordered using `BTreeMap`.
    #[must_use]
    pub fn format_options(&self) -> Vec<String> {
        let mut options = BTreeMap::new();
        self.format_log_options(&mut options);
        self.format_git_options(&mut options);
        self.format_lfs_options(&mut options);
        self.format_repository_options(&mut options);
        self.format_diff_options(&mut options);

        let max_key_len = options.keys().map(String::len).max().unwrap_or(0);

        options
            .into_iter()
            .map(|(key, value)| format!("{key:<max_key_len$} = {value}"))
            .collect()
    }

    fn format_log_options(&self, options: &mut BTreeMap<String, String>) {
        options.insert(
            "log.console_level".into(),
            self.log.console_level.as_u8().to_string(),
        );
        options.insert(
            "log.file_level".into(),
            self.log.file_level.as_u8().to_string(),
        );
        if let Some(file) = &self.log.file {
            options.insert("log.file".into(), file.display().to_string());
        }
        options.insert("log.json".into(), self.log.json.to_string());
    }

    fn format_git_options(&self, options: &mut BTreeMap<String, String>) {
        options.insert("git.binary".into(), self.git.binary.clone());
        options.insert("git.timeout_secs".into(), self.git.timeout_secs.to_string());
        options.insert(
            "git.diff_timeout_secs".into(),
            self.git.diff_timeout_secs.to_string(),
        );
        options.insert(
            "git.object_format".into(),
            self.git.object_format.to_string(),
        );
        options.insert(
            "git.hook_env_prefix".into(),
            self.git.hook_env_prefix.clone(),
        );
    }

    fn format_lfs_options(&self, options: &mut BTreeMap<String, String>) {
        options.insert("lfs.start_server".into(), self.lfs.start_server.to_string());
        options.insert(
            "lfs.content_path".into(),
            self.lfs.content_path.display().to_string(),
        );
    }

    fn format_repository_options(&self, options: &mut BTreeMap<String, String>) {
        options.insert(
            "repository.temp_path".into(),
            self.repository.temp_path.display().to_string(),
        );
        options.insert(
            "repository.fallback_encoding".into(),
            self.repository.fallback_encoding.clone(),
        );
        options.insert("repository.app_url".into(), self.repository.app_url.clone());
    }

    fn format_diff_options(&self, options: &mut BTreeMap<String, String>) {
        options.insert("diff.max_lines".into(), self.diff.max_lines.to_string());
        options.insert(
            "diff.max_line_characters".into(),
            self.diff.max_line_characters.to_string(),
        );
        options.insert("diff.max_files".into(), self.diff.max_files.to_string());
    }
}
