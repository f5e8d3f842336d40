// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Layered configuration loading.
//!
//! ```text
//! lowest                                              highest
//! repofiles.toml (optional) < --config files < REPOFILES_* env < --set
//!
//! ConfigLoader --build()--> config::Config --try_deserialize--> Config
//!                                                    --validate--> Config
//! ```
//!
//! Every layer is remembered so `config-files` can show where a value may
//! have come from.

use std::fmt;
use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat};

use super::Config;
use crate::error::{ConfigError, Result};

/// One source feeding the merged configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Layer {
    File(PathBuf),
    OptionalFile(PathBuf),
    Inline,
    Environment(String),
    Assignment(String),
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "[file] {}", path.display()),
            Self::OptionalFile(path) => write!(f, "[optional] {}", path.display()),
            Self::Inline => f.write_str("[string] <string>"),
            Self::Environment(prefix) => write!(f, "[env] {prefix}_*"),
            Self::Assignment(assignment) => write!(f, "[set] {assignment}"),
        }
    }
}

/// Collects configuration layers and merges them into a [`Config`].
pub struct ConfigLoader {
    builder: ConfigBuilder<DefaultState>,
    env_prefix: Option<String>,
    layers: Vec<Layer>,
}

impl ConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            builder: config::Config::builder(),
            env_prefix: None,
            layers: Vec::new(),
        }
    }

    fn toml(mut self, path: &Path, required: bool) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path).format(FileFormat::Toml).required(required));
        self
    }

    /// Adds a TOML file that must exist when [`ConfigLoader::build`] runs.
    #[must_use]
    pub fn add_toml_file<P: AsRef<Path>>(self, path: P) -> Self {
        let path = path.as_ref();
        let mut loader = self.toml(path, true);
        loader.layers.push(Layer::File(path.to_path_buf()));
        loader
    }

    /// Adds a TOML file that is skipped when absent.
    #[must_use]
    pub fn add_toml_file_optional<P: AsRef<Path>>(self, path: P) -> Self {
        let path = path.as_ref();
        let mut loader = self.toml(path, false);
        if path.exists() {
            loader.layers.push(Layer::OptionalFile(path.to_path_buf()));
        }
        loader
    }

    #[must_use]
    pub fn add_toml_str(mut self, content: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(content, FileFormat::Toml));
        self.layers.push(Layer::Inline);
        self
    }

    /// Reads `PREFIX_SECTION__KEY` variables, applied after every file.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self.layers.push(Layer::Environment(prefix.to_string()));
        self
    }

    /// Overrides one dotted key, winning over every other layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the key path cannot be parsed.
    pub fn set<T: Into<config::Value>>(mut self, key: &str, value: T) -> Result<Self> {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Applies a `section.key=value` assignment as given to `--set`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when `assignment` has no `=` or no
    /// section, or an error if the key is rejected.
    pub fn set_assignment(self, assignment: &str) -> Result<Self> {
        let Some((key, value)) = assignment.split_once('=') else {
            return Err(invalid_assignment(assignment, "expected KEY=VALUE").into());
        };
        let key = key.trim();
        if !key.contains('.') {
            return Err(invalid_assignment(assignment, "expected section.key").into());
        }
        let mut loader = self.set(key, value.trim())?;
        loader.layers.push(Layer::Assignment(format!("{key}={}", value.trim())));
        Ok(loader)
    }

    /// Merges all layers and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if a required file is missing, a source is not valid
    /// TOML, the merged values do not fit [`Config`], or validation fails.
    pub fn build(self) -> Result<Config> {
        let mut builder = self.builder;
        if let Some(prefix) = &self.env_prefix {
            builder = builder.add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }
        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Numbered description of each layer, lowest precedence first.
    #[must_use]
    pub fn format_loaded_files(&self) -> Vec<String> {
        self.layers
            .iter()
            .enumerate()
            .map(|(i, layer)| format!("{}. {layer}", i + 1))
            .collect()
    }
}

fn invalid_assignment(assignment: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: "set".to_string(),
        key: assignment.to_string(),
        message: message.to_string(),
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
