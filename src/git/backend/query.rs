// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Pure Rust ref queries on the origin repository.
//!
//! ```text
//! GixQuery::is_empty       no refs/heads/*
//! GixQuery::branch_exists  refs/heads/<branch>
//! GixQuery::branch_commit  peeled id of refs/heads/<branch>
//! GixQuery::object_format  sha1 | sha256
//! ```
//!
//! No subprocess is spawned; these run before any scratch clone exists.

use std::path::Path;

use crate::error::{EngineResult, GitError, GixError};
use crate::git::object::ObjectFormat;

/// Read-only ref queries backed by gix.
pub struct GixQuery;

impl GixQuery {
    fn open(repo_path: &Path) -> EngineResult<gix::Repository> {
        if !repo_path.exists() {
            return Err(GitError::RepoNotFound {
                path: repo_path.display().to_string(),
            }
            .into());
        }
        gix::open(repo_path).map_err(|e| GitError::Gix(GixError::Open(Box::new(e))).into())
    }

    /// True when the repository has no local branches.
    ///
    /// # Errors
    ///
    /// Returns `GitError::RepoNotFound` if the path does not exist, or a gix
    /// error if references cannot be listed.
    pub fn is_empty(repo_path: &Path) -> EngineResult<bool> {
        let repo = Self::open(repo_path)?;
        let platform = repo
            .references()
            .map_err(|e| GitError::Gix(GixError::Iter(e.to_string())))?;
        let mut branches = platform
            .local_branches()
            .map_err(|e| GitError::Gix(GixError::Iter(e.to_string())))?;
        Ok(branches.next().is_none())
    }

    /// True when `refs/heads/<branch>` exists.
    ///
    /// # Errors
    ///
    /// Returns `GitError::RepoNotFound` if the path does not exist, or a gix
    /// error if the lookup fails for another reason.
    pub fn branch_exists(repo_path: &Path, branch: &str) -> EngineResult<bool> {
        Ok(Self::branch_commit(repo_path, branch)?.is_some())
    }

    /// Commit id `refs/heads/<branch>` points at.
    ///
    /// # Errors
    ///
    /// Returns `GitError::RepoNotFound` if the path does not exist, or a gix
    /// error if the lookup fails for another reason.
    pub fn branch_commit(repo_path: &Path, branch: &str) -> EngineResult<Option<String>> {
        let repo = Self::open(repo_path)?;
        let name = format!("refs/heads/{branch}");
        match repo.find_reference(name.as_str()) {
            Ok(reference) => Ok(reference.try_id().map(|id| id.to_string())),
            Err(gix::reference::find::existing::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(GitError::Gix(GixError::Reference(e)).into()),
        }
    }

    /// Hash algorithm of the object store.
    ///
    /// # Errors
    ///
    /// Returns `GitError::RepoNotFound` if the path does not exist.
    pub fn object_format(repo_path: &Path) -> EngineResult<ObjectFormat> {
        let repo = Self::open(repo_path)?;
        Ok(if repo.object_hash().len_in_hex() == ObjectFormat::Sha256.hex_len() {
            ObjectFormat::Sha256
        } else {
            ObjectFormat::Sha1
        })
    }
}
