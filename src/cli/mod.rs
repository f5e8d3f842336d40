// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! CLI module for repofiles-rs using clap derive.
//!
//! # Command Structure
//!
//! ```text
//! repofiles [global options] <command>
//! change        apply a JSON change set as one commit
//! delete        delete one file
//! patch         apply a unified diff
//! cherry-pick   replay or revert one commit
//! preview       diff of a proposed edit, nothing is written
//! config        print the effective configuration
//! config-files  list the loaded configuration files
//! ```

pub mod files;
pub mod global;

#[cfg(test)]
mod tests;

use crate::cli::files::{ChangeArgs, CherryPickArgs, DeleteArgs, PatchArgs, PreviewArgs};
use crate::cli::global::GlobalOptions;
use clap::{Parser, Subcommand};

/// Repository file mutation engine.
///
/// Turns file operations into single commits on bare git repositories.
#[derive(Debug, Parser)]
#[command(
    name = "repofiles",
    author,
    version,
    about = "Repository file mutation engine",
    long_about = "repofiles-rs Copyright (C) 2026 Romeo Ahmed\n\
                  This program comes with ABSOLUTELY NO WARRANTY\n\
                  This is free software, and you are welcome to redistribute it\n\
                  under certain conditions; see LICENSE for details.\n\n\
                  Applies create, update, delete and rename operations, patches\n\
                  and cherry-picks to a bare repository, each as exactly one\n\
                  commit pushed to a branch. See `repofiles <command> --help`\n\
                  for more information about a command.",
    after_help = "CONFIGURATION:\n\n\
                  `repofiles.toml` in the current directory is loaded when it\n\
                  exists, followed by every --config file in order, REPOFILES_*\n\
                  environment variables (REPOFILES_GIT__TIMEOUT_SECS=30) and\n\
                  finally --set overrides. Use --no-default-config to skip\n\
                  `repofiles.toml`."
)]
pub struct Cli {
    /// Global options shared by all commands
    #[command(flatten)]
    pub global: GlobalOptions,

    /// Command to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Shows the version.
    Version,

    /// Applies a JSON change set as one commit.
    Change(ChangeArgs),

    /// Deletes one file.
    Delete(DeleteArgs),

    /// Applies a unified diff as one commit.
    Patch(PatchArgs),

    /// Cherry-picks or reverts one commit.
    #[command(name = "cherry-pick")]
    CherryPick(CherryPickArgs),

    /// Shows the diff a file edit would produce without committing it.
    Preview(PreviewArgs),

    /// Lists all options and their values.
    Config,

    /// Lists the configuration files that were loaded.
    #[command(name = "config-files")]
    ConfigFiles,
}

/// Parses command-line arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

/// Parses command-line arguments from an iterator.
pub fn parse_from<I, T>(iter: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::parse_from(iter)
}

/// Tries to parse command-line arguments, returning an error on failure.
///
/// # Errors
///
/// Returns a `clap::Error` if the arguments are invalid or if help/version information
/// was requested.
pub fn try_parse() -> Result<Cli, clap::Error> {
    Cli::try_parse()
}
