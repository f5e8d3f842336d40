// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Arguments of the file mutation commands.
//!
//! ```text
//! RepoArgs     --repo --owner --name --default-branch --repo-id
//! DoerArgs     --doer --doer-email --doer-id
//! change       RepoArgs DoerArgs --changes FILE
//! delete       RepoArgs DoerArgs --branch --path [--sha] [--message]
//! patch        RepoArgs DoerArgs --branch --patch FILE
//! cherry-pick  RepoArgs DoerArgs --branch --commit [--revert]
//! preview      RepoArgs --branch --path --content FILE
//! ```

use clap::Args;
use std::path::PathBuf;

/// Which repository to write to.
#[derive(Debug, Clone, Args)]
pub struct RepoArgs {
    /// Path of the bare repository.
    #[arg(id = "repo", short = 'r', long = "repo", value_name = "PATH")]
    pub path: PathBuf,

    /// Owner shown in response URLs; defaults to the parent directory name.
    #[arg(long, value_name = "OWNER")]
    pub owner: Option<String>,

    /// Repository name; defaults to the directory name without `.git`.
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Branch used when no branch is given.
    #[arg(long = "default-branch", value_name = "BRANCH", default_value = "main")]
    pub default_branch: String,

    /// Numeric id recorded with LFS objects.
    #[arg(id = "repo-id", long = "repo-id", value_name = "ID", default_value_t = 1)]
    pub id: i64,
}

/// The user the commit is made for.
#[derive(Debug, Clone, Args)]
pub struct DoerArgs {
    /// Login name of the acting user.
    #[arg(id = "doer", long = "doer", value_name = "NAME", env = "REPOFILES_DOER", default_value = "repofiles")]
    pub name: String,

    /// Email of the acting user.
    #[arg(
        long = "doer-email",
        value_name = "EMAIL",
        env = "REPOFILES_DOER_EMAIL",
        default_value = "repofiles@localhost"
    )]
    pub email: String,

    #[arg(id = "doer-id", long = "doer-id", value_name = "ID", default_value_t = 1)]
    pub id: i64,
}

/// Arguments for the `change` command.
#[derive(Debug, Clone, Args)]
pub struct ChangeArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    #[command(flatten)]
    pub doer: DoerArgs,

    /// JSON change set; `-` reads standard input.
    #[arg(long = "changes", value_name = "FILE")]
    pub changes: PathBuf,
}

/// Arguments for the `delete` command.
#[derive(Debug, Clone, Args)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    #[command(flatten)]
    pub doer: DoerArgs,

    /// Branch to delete from.
    #[arg(short = 'b', long, value_name = "BRANCH")]
    pub branch: Option<String>,

    /// Path of the file to delete.
    #[arg(short = 'p', long, value_name = "PATH")]
    pub path: String,

    /// Expected blob id of the file.
    #[arg(long, value_name = "SHA")]
    pub sha: Option<String>,

    /// Commit message; defaults to "Delete <path>".
    #[arg(short = 'm', long, value_name = "MESSAGE")]
    pub message: Option<String>,
}

/// Arguments for the `patch` command.
#[derive(Debug, Clone, Args)]
pub struct PatchArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    #[command(flatten)]
    pub doer: DoerArgs,

    /// Branch the patch is applied to.
    #[arg(short = 'b', long, value_name = "BRANCH")]
    pub branch: Option<String>,

    /// Push the result to this branch instead.
    #[arg(long = "new-branch", value_name = "BRANCH")]
    pub new_branch: Option<String>,

    /// Unified diff; `-` reads standard input.
    #[arg(long = "patch", value_name = "FILE")]
    pub patch: PathBuf,

    /// Commit message; defaults to "Apply patch".
    #[arg(short = 'm', long, value_name = "MESSAGE")]
    pub message: Option<String>,
}

/// Arguments for the `cherry-pick` command.
#[derive(Debug, Clone, Args)]
pub struct CherryPickArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    #[command(flatten)]
    pub doer: DoerArgs,

    /// Branch to pick onto.
    #[arg(short = 'b', long, value_name = "BRANCH")]
    pub branch: Option<String>,

    /// Push the result to this branch instead.
    #[arg(long = "new-branch", value_name = "BRANCH")]
    pub new_branch: Option<String>,

    /// Commit to pick.
    #[arg(long = "commit", value_name = "SHA")]
    pub commit: String,

    /// Undo the commit instead of replaying it.
    #[arg(long)]
    pub revert: bool,

    #[arg(short = 'm', long, value_name = "MESSAGE")]
    pub message: Option<String>,
}

/// Arguments for the `preview` command.
#[derive(Debug, Clone, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Branch to diff against; defaults to the default branch.
    #[arg(short = 'b', long, value_name = "BRANCH")]
    pub branch: Option<String>,

    /// Path of the edited file.
    #[arg(short = 'p', long, value_name = "PATH")]
    pub path: String,

    /// New content of the file; `-` reads standard input.
    #[arg(long = "content", value_name = "FILE")]
    pub content: PathBuf,
}
