// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Single-file create, update and delete, as one-operation transactions.

use tokio_util::sync::CancellationToken;

use super::FileEngine;
use super::protection::Signer;
use super::response::FileResponse;
use super::types::{
    ChangeRepoFilesOptions, DeleteRepoFileOptions, FileOperation, Principal, Repository,
    UpdateRepoFileOptions,
};
use crate::error::{EngineResult, FileError};
use crate::git::backend::GitBackend;
use crate::lfs::MetaStore;

impl<B: GitBackend, M: MetaStore, S: Signer> FileEngine<B, M, S> {
    /// Creates `opts.tree_path`, or updates it (moving it from
    /// `opts.from_tree_path` when set).
    ///
    /// # Errors
    ///
    /// Same as [`FileEngine::change_repo_files`].
    pub async fn create_or_update_repo_file(
        &self,
        repo: &mut Repository,
        doer: &Principal,
        opts: UpdateRepoFileOptions,
        token: &CancellationToken,
    ) -> EngineResult<FileResponse> {
        let operation = if opts.is_new_file {
            FileOperation::create(opts.tree_path, opts.content)
        } else {
            FileOperation::Update {
                from: opts.from_tree_path,
                path: opts.tree_path,
                content: opts.content,
                sha: opts.sha,
            }
        };
        let change = ChangeRepoFilesOptions {
            last_commit_id: opts.last_commit_id,
            old_branch: opts.old_branch,
            new_branch: opts.new_branch,
            message: opts.message,
            files: vec![operation],
            authorship: opts.authorship,
            strategy: Default::default(),
        };
        let mut response = self.change_repo_files(repo, doer, change, token).await?;
        Ok(FileResponse {
            content: response.files.pop().flatten(),
            commit: response.commit,
        })
    }

    /// Deletes `opts.tree_path`.
    ///
    /// # Errors
    ///
    /// `FileError::EmptyPath` when no path is given, otherwise the same as
    /// [`FileEngine::change_repo_files`].
    pub async fn delete_repo_file(
        &self,
        repo: &mut Repository,
        doer: &Principal,
        opts: DeleteRepoFileOptions,
        token: &CancellationToken,
    ) -> EngineResult<FileResponse> {
        if opts.tree_path.is_empty() {
            return Err(FileError::EmptyPath {
                operation: "delete".to_string(),
            }
            .into());
        }
        let mut operation = FileOperation::delete(opts.tree_path);
        if let Some(sha) = opts.sha {
            operation = operation.with_sha(sha);
        }
        let change = ChangeRepoFilesOptions {
            last_commit_id: opts.last_commit_id,
            old_branch: opts.old_branch,
            new_branch: opts.new_branch,
            message: opts.message,
            files: vec![operation],
            authorship: opts.authorship,
            strategy: Default::default(),
        };
        let response = self.change_repo_files(repo, doer, change, token).await?;
        Ok(FileResponse {
            content: None,
            commit: response.commit,
        })
    }
}
