// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Diff of a proposed edit, computed in a scratch clone that is never pushed.

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::FileEngine;
use super::paths::{clean_upload_file_name, is_valid_branch_name};
use super::protection::Signer;
use super::types::{FileContent, Repository};
use crate::error::{EngineResult, FileError};
use crate::git::backend::{GitBackend, ScratchRepository};
use crate::git::diff::{Diff, parse_patch};
use crate::git::object::FileMode;
use crate::lfs::MetaStore;

impl<B: GitBackend, M: MetaStore, S: Signer> FileEngine<B, M, S> {
    /// Diff between `branch` and the same tree with `tree_path` replaced by
    /// `content`, truncated by the configured diff limits.
    ///
    /// An empty `branch` means the default branch.
    ///
    /// # Errors
    ///
    /// - `FileError::FilenameInvalid` for an unusable path.
    /// - `GitError::BranchNotFound` when the branch does not exist.
    #[instrument(skip_all, fields(repo = %repo.full_name(), path = tree_path))]
    pub async fn get_diff_preview(
        &self,
        repo: &Repository,
        branch: &str,
        tree_path: &str,
        mut content: FileContent,
        token: &CancellationToken,
    ) -> EngineResult<Diff> {
        let branch = if branch.is_empty() {
            repo.default_branch.as_str()
        } else {
            branch
        };
        if !is_valid_branch_name(branch) {
            return Err(FileError::InvalidBranchName {
                branch: branch.to_string(),
            }
            .into());
        }
        let path = clean_upload_file_name(tree_path).ok_or_else(|| FileError::FilenameInvalid {
            path: tree_path.to_string(),
        })?;

        let mut scratch = self.backend.clone_scratch(&repo.path, branch, token).await?;
        let result = stage_for_preview(&mut scratch, &path, &mut content).await;
        scratch.close();
        parse_patch(&result?, self.settings.diff_limits, token)
    }
}

async fn stage_for_preview<X: ScratchRepository>(
    scratch: &mut X,
    path: &str,
    content: &mut FileContent,
) -> EngineResult<String> {
    scratch.set_default_index().await?;
    let bytes = content.read_all()?;
    let id = scratch.hash_object(&bytes).await?;
    scratch.add_object_to_index(FileMode::Regular, &id, path).await?;
    scratch.diff_index().await
}
