// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Maps git stderr onto typed errors.
//!
//! ```text
//! (Failure, stderr) --classify--> GitError
//!
//!   Clone      "Remote branch X not found"            -> BranchNotFound
//!              "does not exist" / "not a git repo"    -> RepoNotFound
//!   Push       "non-fast-forward" / "fetch first"     -> PushOutOfDate
//!              "! [remote rejected]"                  -> PushRejected
//!   Index      "invalid path"                         -> InvalidPath
//!   FastImport "Not updating" / "does not contain"    -> PushOutOfDate
//!   *                                                 -> CommandFailed
//! ```
//!
//! Git runs with `LC_ALL=C`, so these strings are stable. Nothing outside the
//! shell backend inspects stderr.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::GitError;

/// What the failing command was doing.
#[derive(Debug, Clone, Copy)]
pub enum Failure<'a> {
    Clone { repo: &'a str, branch: &'a str },
    Push { repo: &'a str, branch: &'a str },
    Index { path: &'a str },
    FastImport { branch: &'a str },
    Other,
}

static REMOTE_REJECTED: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"! \[remote rejected\] \S+ -> \S+ \((?P<reason>[^)]*)\)").ok()
});

static FAST_IMPORT_REF: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"Not updating refs/heads/\S+").ok());

/// Turns a failed command into the most specific [`GitError`].
#[must_use]
pub fn classify(command: &str, failure: Failure<'_>, stderr: &str) -> GitError {
    let message = stderr.trim().to_string();

    match failure {
        Failure::Clone { repo, branch } => {
            if stderr.contains("Remote branch") && stderr.contains("not found") {
                return GitError::BranchNotFound {
                    branch: branch.to_string(),
                };
            }
            if is_missing_repo(stderr) {
                return GitError::RepoNotFound {
                    path: repo.to_string(),
                };
            }
        }
        Failure::Push { repo, branch } => {
            if let Some(caps) = REMOTE_REJECTED.as_ref().and_then(|re| re.captures(stderr)) {
                return GitError::PushRejected {
                    branch: branch.to_string(),
                    message: rejection_message(stderr, &caps["reason"]),
                };
            }
            if is_out_of_date(stderr) {
                return GitError::PushOutOfDate {
                    branch: branch.to_string(),
                    message,
                };
            }
            if is_missing_repo(stderr) {
                return GitError::RepoNotFound {
                    path: repo.to_string(),
                };
            }
        }
        Failure::Index { path } => {
            if stderr.to_ascii_lowercase().contains("invalid path") {
                return GitError::InvalidPath {
                    path: path.to_string(),
                    message,
                };
            }
        }
        Failure::FastImport { branch } => {
            let not_updating = FAST_IMPORT_REF.as_ref().is_some_and(|re| re.is_match(stderr));
            if not_updating || stderr.contains("does not contain") {
                return GitError::PushOutOfDate {
                    branch: branch.to_string(),
                    message,
                };
            }
        }
        Failure::Other => {}
    }

    GitError::CommandFailed {
        command: command.to_string(),
        message,
    }
}

fn is_missing_repo(stderr: &str) -> bool {
    (stderr.contains("repository '") && stderr.contains("does not exist"))
        || stderr.contains("does not appear to be a git repository")
}

fn is_out_of_date(stderr: &str) -> bool {
    ["non-fast-forward", "fetch first", "stale info", "[rejected]"]
        .iter()
        .any(|needle| stderr.contains(needle))
}

/// Hook output (`remote: ...` lines) explains a rejection better than the
/// one-word reason git prints.
fn rejection_message(stderr: &str, reason: &str) -> String {
    let hook_lines: Vec<&str> = stderr
        .lines()
        .filter_map(|line| line.strip_prefix("remote: "))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if hook_lines.is_empty() {
        reason.to_string()
    } else {
        hook_lines.join("\n")
    }
}
