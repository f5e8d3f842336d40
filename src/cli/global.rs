// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Global CLI options available for all commands.
//!
//! # Option Precedence
//!
//! ```text
//! --config FILE     ← Additional config files (can repeat)
//! --set KEY=VAL     ← Direct config override (section.key=value)
//! --log-level N     ← Console verbosity (0-5)
//! --log-file FILE   ← Also log to FILE
//! --json-log        ← JSON lines instead of text
//!
//! Precedence: CLI flags > --set > REPOFILES_* > --config > repofiles.toml > defaults
//! ```

use clap::Args;
use std::path::PathBuf;

/// Global options available for all commands.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalOptions {
    /// Path to additional TOML configuration file(s).
    /// Can be specified multiple times; later files win.
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        global = true,
        action = clap::ArgAction::Append
    )]
    pub configs: Vec<PathBuf>,

    /// Sets an option, such as 'git.timeout_secs=30'.
    /// Can be specified multiple times.
    #[arg(
        short = 's',
        long = "set",
        value_name = "KEY=VALUE",
        global = true,
        action = clap::ArgAction::Append
    )]
    pub options: Vec<String>,

    /// Console log level (0=silent, 1=errors, 2=warnings, 3=info, 4=debug, 5=trace).
    #[arg(
        short = 'l',
        long = "log-level",
        value_name = "LEVEL",
        global = true,
        value_parser = clap::value_parser!(u8).range(0..=5)
    )]
    pub log_level: Option<u8>,

    /// Path to log file.
    #[arg(long = "log-file", value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Emits logs as JSON lines.
    #[arg(long = "json-log", global = true)]
    pub json_log: bool,

    /// Ignores `repofiles.toml` in the current directory.
    #[arg(long = "no-default-config", global = true)]
    pub no_default_config: bool,
}

impl GlobalOptions {
    /// Converts command-line options to configuration overrides, in the
    /// order they are applied.
    #[must_use]
    pub fn to_config_overrides(&self) -> Vec<String> {
        let mut overrides = self.options.clone();

        if let Some(level) = self.log_level {
            overrides.push(format!("log.console_level={level}"));
        }

        if let Some(ref path) = self.log_file {
            overrides.push(format!("log.file={}", path.display()));
        }

        if self.json_log {
            overrides.push("log.json=true".to_string());
        }

        overrides
    }
}
