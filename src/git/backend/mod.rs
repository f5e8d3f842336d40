// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Git backend abstraction layer.
//!
//! ```text
//! GitBackend                       opens repositories
//!   .reader(repo)       --> RepoReader         (read-only, origin)
//!   .clone_scratch(repo) --> ScratchRepository (index + object writes)
//!   .init_scratch(repo)  --> ScratchRepository (empty repository)
//!   .fast_import(repo, stream)                 (direct ref update)
//!
//! ShellBackend  --> git CLI, TempDir-backed scratch clones
//! MemoryBackend --> HashMap trees, CAS on push
//! ```
//!
//! The traits use native `async fn` and are dispatched through generics, so
//! the orchestrator is monomorphised per backend.

pub mod classify;
pub mod memory;
pub mod query;
pub mod shell;

use std::collections::BTreeSet;
use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::core::env::container::Env;
use crate::error::EngineResult;
use crate::git::object::{CommitInfo, FileMode, ObjectFormat, Signature, TreeEntry};

pub use memory::MemoryBackend;
pub use query::GixQuery;
pub use shell::{ShellBackend, TemporaryUploadRepository};

// --- Options ---

/// Arguments for `commit-tree`.
#[derive(Debug, Clone)]
pub struct CommitTreeOptions {
    pub tree: String,
    pub parents: Vec<String>,
    /// Full message, already normalised and terminated by a newline.
    pub message: String,
    pub author: Signature,
    pub committer: Signature,
    /// `Some(key)` signs with `-S<key>`, `None` passes `--no-gpg-sign`.
    pub sign_key: Option<String>,
}

/// Who is pushing, exported to hooks through the environment.
#[derive(Debug, Clone, Default)]
pub struct PushEnv {
    /// Variable prefix, e.g. `GITEA` for `GITEA_PUSHER_ID`.
    pub prefix: String,
    pub pusher_id: i64,
    pub pusher_name: String,
    pub pusher_email: String,
    pub repo_owner: String,
    pub repo_name: String,
    pub repo_id: i64,
}

impl PushEnv {
    /// Environment for the push subprocess and its hooks.
    ///
    /// Git author and committer variables are set to the pusher so hooks see
    /// the doer, not whoever the commit names.
    #[must_use]
    pub fn to_env(&self) -> Env {
        let mut env = Env::new();
        let p = &self.prefix;
        env.set("GIT_AUTHOR_NAME", &self.pusher_name)
            .set("GIT_AUTHOR_EMAIL", &self.pusher_email)
            .set("GIT_COMMITTER_NAME", &self.pusher_name)
            .set("GIT_COMMITTER_EMAIL", &self.pusher_email)
            .set(format!("{p}_PUSHER_ID"), self.pusher_id.to_string())
            .set(format!("{p}_PUSHER_NAME"), &self.pusher_name)
            .set(format!("{p}_REPO_USER_NAME"), &self.repo_owner)
            .set(format!("{p}_REPO_NAME"), &self.repo_name)
            .set(format!("{p}_REPO_ID"), self.repo_id.to_string())
            .set(format!("{p}_IS_INTERNAL"), "true");
        env
    }
}

// --- Reader Trait (Read-only operations) ---

/// Read-only queries against a repository.
///
/// Implemented both by origin readers and by scratch repositories.
#[allow(async_fn_in_trait)]
pub trait RepoReader {
    /// Head commit of `branch`, or `None` when the branch does not exist.
    ///
    /// # Errors
    ///
    /// Returns a `GitError` if the lookup itself fails.
    async fn branch_commit(&self, branch: &str) -> EngineResult<Option<String>>;

    /// Resolves any revision to a full commit id.
    ///
    /// # Errors
    ///
    /// Returns a `GitError` if the lookup itself fails.
    async fn resolve_commit(&self, rev: &str) -> EngineResult<Option<String>>;

    /// Reads a commit object.
    ///
    /// # Errors
    ///
    /// Returns `GitError::CommitNotFound` if `commit` does not exist.
    async fn commit_info(&self, commit: &str) -> EngineResult<CommitInfo>;

    /// Entry at `path` in the tree of `commit`.
    ///
    /// # Errors
    ///
    /// Returns a `GitError` if the commit cannot be read.
    async fn tree_entry(&self, commit: &str, path: &str) -> EngineResult<Option<TreeEntry>>;

    /// True when any commit in `since..commit` touched `path`.
    ///
    /// # Errors
    ///
    /// Returns a `GitError` if history cannot be walked.
    async fn file_changed_since(&self, commit: &str, since: &str, path: &str)
    -> EngineResult<bool>;

    /// Blob content, truncated to `limit` bytes when given.
    ///
    /// # Errors
    ///
    /// Returns a `GitError` if the blob does not exist.
    async fn read_blob(&self, id: &str, limit: Option<usize>) -> EngineResult<Vec<u8>>;

    /// Subset of `paths` whose `filter` attribute is `lfs`.
    ///
    /// With `treeish` the attributes come from that tree, otherwise from the
    /// current index.
    ///
    /// # Errors
    ///
    /// Returns a `GitError` if attributes cannot be read.
    async fn lfs_tracked(
        &self,
        treeish: Option<&str>,
        paths: &[&str],
    ) -> EngineResult<BTreeSet<String>>;
}

// --- Scratch Trait (Index and object writes) ---

/// A private repository in which one commit is assembled.
///
/// Dropping the value removes its storage; [`ScratchRepository::close`] does
/// the same and reports cleanup failures.
#[allow(async_fn_in_trait)]
pub trait ScratchRepository: RepoReader {
    /// Location of the scratch repository.
    fn path(&self) -> &Path;

    /// Object format of the scratch repository.
    fn object_format(&self) -> ObjectFormat;

    /// Loads the tree of `HEAD` into the index.
    ///
    /// # Errors
    ///
    /// Returns a `GitError` if `read-tree` fails.
    async fn set_default_index(&mut self) -> EngineResult<()>;

    /// Which of `paths` are present in the index.
    ///
    /// # Errors
    ///
    /// Returns a `GitError` if `ls-files` fails.
    async fn ls_files(&self, paths: &[&str]) -> EngineResult<Vec<String>>;

    /// Drops `paths` from the index.
    ///
    /// # Errors
    ///
    /// Returns a `GitError` if `update-index` fails.
    async fn remove_files_from_index(&mut self, paths: &[&str]) -> EngineResult<()>;

    /// Writes `content` as a blob and returns its id.
    ///
    /// # Errors
    ///
    /// Returns a `GitError` if `hash-object` fails.
    async fn hash_object(&mut self, content: &[u8]) -> EngineResult<String>;

    /// Stages blob `id` at `path`, replacing whatever is there.
    ///
    /// # Errors
    ///
    /// Returns `GitError::InvalidPath` if git refuses the path.
    async fn add_object_to_index(&mut self, mode: FileMode, id: &str, path: &str)
    -> EngineResult<()>;

    /// Writes the index as a tree.
    ///
    /// # Errors
    ///
    /// Returns a `GitError` if `write-tree` fails.
    async fn write_tree(&mut self) -> EngineResult<String>;

    /// Creates a commit object.
    ///
    /// # Errors
    ///
    /// Returns `ProtectionError::SigningFailed` if signing was requested and
    /// failed, otherwise a `GitError`.
    async fn commit_tree(&mut self, options: &CommitTreeOptions) -> EngineResult<String>;

    /// Pushes `commit` to `branch` of the origin repository.
    ///
    /// # Errors
    ///
    /// Returns `GitError::PushOutOfDate` when the branch moved and
    /// `GitError::PushRejected` when a hook declined.
    async fn push(&mut self, commit: &str, branch: &str, env: &PushEnv) -> EngineResult<()>;

    /// Unified diff of the index against `HEAD`.
    ///
    /// # Errors
    ///
    /// Returns a `GitError` if `diff-index` fails.
    async fn diff_index(&self) -> EngineResult<String>;

    /// Every path whose index entry differs from `HEAD`, renames reported
    /// as a delete plus an add.
    ///
    /// # Errors
    ///
    /// Returns a `GitError` if `diff-index` fails.
    async fn changed_paths(&self) -> EngineResult<Vec<String>>;

    /// Applies a unified diff to the index.
    ///
    /// # Errors
    ///
    /// Returns `FileError::PatchDoesNotApply` when git rejects the patch.
    async fn apply_patch(&mut self, patch: &[u8]) -> EngineResult<()>;

    /// Three-way merges `theirs` into `ours` over `base`, leaving the result
    /// in the index.
    ///
    /// # Errors
    ///
    /// Returns `FileError::MergeConflict` when paths stay unmerged.
    async fn merge_trees(&mut self, base: &str, ours: &str, theirs: &str) -> EngineResult<()>;

    /// Removes the scratch storage, logging rather than failing on errors.
    fn close(self);
}

// --- Backend Trait ---

/// Entry point that opens readers and scratch repositories.
#[allow(async_fn_in_trait)]
pub trait GitBackend {
    type Reader: RepoReader;
    type Scratch: ScratchRepository;

    /// Read-only view of the origin repository.
    ///
    /// # Errors
    ///
    /// Returns `GitError::RepoNotFound` if `repo` does not exist.
    async fn reader(&self, repo: &Path, token: &CancellationToken) -> EngineResult<Self::Reader>;

    /// True when the repository has no branches.
    ///
    /// # Errors
    ///
    /// Returns `GitError::RepoNotFound` if `repo` does not exist.
    async fn is_empty(&self, repo: &Path) -> EngineResult<bool>;

    /// True when `refs/heads/<branch>` exists.
    ///
    /// # Errors
    ///
    /// Returns `GitError::RepoNotFound` if `repo` does not exist.
    async fn branch_exists(&self, repo: &Path, branch: &str) -> EngineResult<bool>;

    /// Shared bare clone of `branch` with an index ready for staging.
    ///
    /// # Errors
    ///
    /// Returns `GitError::BranchNotFound` or `GitError::RepoNotFound`.
    async fn clone_scratch(
        &self,
        repo: &Path,
        branch: &str,
        token: &CancellationToken,
    ) -> EngineResult<Self::Scratch>;

    /// Fresh scratch repository for a repository with no commits.
    ///
    /// # Errors
    ///
    /// Returns a `GitError` if initialisation fails.
    async fn init_scratch(
        &self,
        repo: &Path,
        format: ObjectFormat,
        token: &CancellationToken,
    ) -> EngineResult<Self::Scratch>;

    /// Feeds a fast-import stream into the origin repository.
    ///
    /// # Errors
    ///
    /// Returns `GitError::PushOutOfDate` when the branch moved past the
    /// stream's `from` commit.
    async fn fast_import(
        &self,
        repo: &Path,
        branch: &str,
        stream: Vec<u8>,
        env: &PushEnv,
        token: &CancellationToken,
    ) -> EngineResult<()>;
}

#[cfg(test)]
mod tests;
