// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Multi-file transactions.
//!
//! ```text
//! ChangeRepoFilesOptions
//!   | validate     paths cleaned and distinct, branches defaulted,
//!   |              message built
//!   v
//! Transaction
//!   | resolve      old branch exists (or repo empty), new branch free
//!   | authorize    branch protection on the new branch
//!   v
//!   +-- Scratch ---------------------------+-- FastImport --------------------+
//!   | clone old branch (init when empty)   | reader on the origin             |
//!   | check files against the clone        | check files against the origin   |
//!   | stage: ls-files, hash-object,        | stream: D / M per file           |
//!   |        update-index                  |                                  |
//!   | write-tree, commit-tree              |                                  |
//!   | record LFS metadata                  | record LFS metadata              |
//!   | push (rows removed if it fails)      | fast-import (same)               |
//!   +--------------------------------------+----------------------------------+
//!   v
//! FilesResponse    (repository marked non-empty after its first commit)
//! ```
//!
//! Per-file checks, against the head of the old branch:
//!
//! ```text
//! update/delete/rename  source must exist
//!                       sha given        --> must equal the source blob
//!                       last commit      --> source unchanged since then
//!                       neither (update) --> ShaOrCommitIdNotProvided
//! create/update/rename  every parent of the target is a directory,
//!                       the target is not a directory or symlink,
//!                       create and move never overwrite
//! ```

use std::collections::BTreeSet;
use std::io::{Cursor, Seek};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::commit::{self, CommitRequest};
use super::identity::{self, Identities};
use super::paths::{clean_upload_file_name, is_valid_branch_name};
use super::protection::{Signer, requires_signed_commits, verify_branch_protection};
use super::response::{self, FileResponse, FilesResponse, Urls};
use super::types::{
    ChangeRepoFilesOptions, CommitStrategy, FileContent, FileOperation, OperationKind, Principal,
    Repository,
};
use super::FileEngine;
use crate::error::{EngineResult, FileError, GitError, ProtectionError};
use crate::git::backend::{GitBackend, RepoReader, ScratchRepository};
use crate::git::fast_import::{CommitHeader, FastImportWriter, FromRef};
use crate::git::object::{FileMode, TreeEntry};
use crate::lfs::{MetaStore, Pointer};
use crate::utility::charset;

/// One operation after path cleaning.
#[derive(Debug)]
struct PreparedFile {
    kind: OperationKind,
    from_path: String,
    tree_path: String,
    sha: Option<String>,
    content: Option<FileContent>,
    executable: bool,
    /// Entry at `from_path` in the old branch head.
    source: Option<TreeEntry>,
}

impl PreparedFile {
    fn from_operation(operation: FileOperation) -> EngineResult<Self> {
        let kind = operation.kind();
        let (from, to, content, sha) = match operation {
            FileOperation::Create { path, content } => (None, path, Some(content), None),
            FileOperation::Update {
                from,
                path,
                content,
                sha,
            } => (from, path, Some(content), sha),
            FileOperation::Delete { path, sha } => (None, path, None, sha),
            FileOperation::Rename {
                from,
                path,
                content,
                sha,
            } => (Some(from), path, content, sha),
        };

        let raw_from = from.filter(|f| !f.is_empty()).unwrap_or_else(|| to.clone());
        let raw_to = if to.is_empty() { raw_from.clone() } else { to };
        let clean = |raw: &str| {
            clean_upload_file_name(raw).ok_or_else(|| FileError::FilenameInvalid {
                path: raw.to_string(),
            })
        };

        Ok(Self {
            kind,
            from_path: clean(&raw_from)?,
            tree_path: clean(&raw_to)?,
            sha: sha.filter(|s| !s.is_empty()),
            content,
            executable: false,
            source: None,
        })
    }

    fn moves(&self) -> bool {
        self.from_path != self.tree_path
    }
}

/// State handed from stage to stage.
#[derive(Debug)]
struct Transaction {
    old_branch: String,
    new_branch: String,
    message: String,
    /// Caller's expected head; replaced by the resolved id once checked.
    last_commit_id: Option<String>,
    files: Vec<PreparedFile>,
    identities: Identities,
    signoff: bool,
    strategy: CommitStrategy,
    /// The origin had no branches when the transaction started.
    repo_empty: bool,
}

impl Transaction {
    /// With no history to read from, only creates can be satisfied.
    fn require_only_creates(&self) -> EngineResult<()> {
        match self.files.iter().find(|f| f.kind != OperationKind::Create) {
            Some(file) => Err(FileError::NotFound {
                path: file.from_path.clone(),
            }
            .into()),
            None => Ok(()),
        }
    }

    /// Every path the commit touches, sources of moves included.
    fn touched_paths(&self) -> Vec<&str> {
        let mut paths = Vec::with_capacity(self.files.len());
        for file in &self.files {
            paths.push(file.tree_path.as_str());
            if file.moves() {
                paths.push(file.from_path.as_str());
            }
        }
        paths
    }
}

#[derive(Debug)]
struct Committed {
    txn: Transaction,
    commit: String,
}

/// Head of `branch`, which must equal the caller's last commit when given.
pub(super) async fn strict_head<R: RepoReader>(
    reader: &R,
    branch: &str,
    last_commit_id: Option<&str>,
) -> EngineResult<String> {
    let head = reader
        .branch_commit(branch)
        .await?
        .ok_or_else(|| GitError::BranchNotFound {
            branch: branch.to_string(),
        })?;
    if let Some(given) = last_commit_id.map(str::trim).filter(|id| !id.is_empty()) {
        let resolved = reader
            .resolve_commit(given)
            .await?
            .ok_or_else(|| FileError::InvalidCommitId {
                commit_id: given.to_string(),
            })?;
        if resolved != head {
            return Err(FileError::CommitIdDoesNotMatch {
                given: resolved,
                current: head,
            }
            .into());
        }
    }
    Ok(head)
}

/// Old and new branch with defaults applied, both valid ref names.
pub(super) fn default_branches(
    repo: &Repository,
    old_branch: Option<String>,
    new_branch: Option<String>,
) -> EngineResult<(String, String)> {
    let old = old_branch
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| repo.default_branch.clone());
    let new = new_branch.filter(|b| !b.is_empty()).unwrap_or_else(|| old.clone());
    for branch in [&old, &new] {
        if !is_valid_branch_name(branch) {
            return Err(FileError::InvalidBranchName {
                branch: branch.clone(),
            }
            .into());
        }
    }
    Ok((old, new))
}

/// Each path may be written, deleted or moved away by one operation only.
fn check_distinct_paths(files: &[PreparedFile]) -> EngineResult<()> {
    let mut seen = BTreeSet::new();
    let sources = files.iter().filter(|f| f.moves()).map(|f| &f.from_path);
    for path in files.iter().map(|f| &f.tree_path).chain(sources) {
        if !seen.insert(path) {
            return Err(FileError::DuplicatePath { path: path.clone() }.into());
        }
    }
    Ok(())
}

fn validate(repo: &Repository, doer: &Principal, opts: ChangeRepoFilesOptions) -> EngineResult<Transaction> {
    if opts.files.is_empty() {
        return Err(FileError::NoFiles.into());
    }
    let (old_branch, new_branch) = default_branches(repo, opts.old_branch, opts.new_branch)?;
    let files = opts
        .files
        .into_iter()
        .map(PreparedFile::from_operation)
        .collect::<EngineResult<Vec<_>>>()?;
    check_distinct_paths(&files)?;
    let summary: Vec<(OperationKind, &str)> = files.iter().map(|f| (f.kind, f.tree_path.as_str())).collect();
    let message = commit::normalize_message(&opts.message, &summary);

    Ok(Transaction {
        old_branch,
        new_branch,
        message,
        last_commit_id: opts
            .last_commit_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty()),
        identities: identity::resolve(doer, &opts.authorship)?,
        signoff: opts.authorship.signoff,
        strategy: opts.strategy,
        repo_empty: false,
        files,
    })
}

impl<B: GitBackend, M: MetaStore, S: Signer> FileEngine<B, M, S> {
    /// Commits every operation in `opts` as one commit on the new branch.
    ///
    /// On the first commit to an empty repository `repo` is updated in place:
    /// it stops being empty and its default branch becomes the new branch.
    ///
    /// # Errors
    ///
    /// - `FileError` for invalid input or a conflicting concurrent change.
    /// - `GitError` for missing or existing branches and failed pushes.
    /// - `ProtectionError` when branch protection forbids the commit.
    /// - `LfsError` when LFS content or metadata cannot be stored.
    #[instrument(skip_all, fields(repo = %repo.full_name(), doer = %doer.name))]
    pub async fn change_repo_files(
        &self,
        repo: &mut Repository,
        doer: &Principal,
        opts: ChangeRepoFilesOptions,
        token: &CancellationToken,
    ) -> EngineResult<FilesResponse> {
        let txn = validate(repo, doer, opts)?;
        let txn = self.resolve(repo, txn).await?;
        let txn = self.authorize(repo, doer, txn)?;
        debug!(
            old = %txn.old_branch,
            new = %txn.new_branch,
            files = txn.files.len(),
            strategy = ?txn.strategy,
            "transaction validated"
        );

        let committed = match txn.strategy {
            CommitStrategy::Scratch => self.commit_with_scratch(repo, doer, txn, token).await?,
            CommitStrategy::FastImport => self.commit_with_fast_import(repo, doer, txn, token).await?,
        };
        info!(commit = %committed.commit, branch = %committed.txn.new_branch, "files committed");

        if repo.is_empty {
            repo.is_empty = false;
            repo.default_branch.clone_from(&committed.txn.new_branch);
            debug!(branch = %repo.default_branch, "repository initialised");
        }
        self.respond(repo, &committed, token).await
    }

    async fn resolve(&self, repo: &Repository, mut txn: Transaction) -> EngineResult<Transaction> {
        txn.repo_empty = self.backend.is_empty(&repo.path).await?;
        if !txn.repo_empty && !self.backend.branch_exists(&repo.path, &txn.old_branch).await? {
            return Err(GitError::BranchNotFound {
                branch: txn.old_branch,
            }
            .into());
        }
        if txn.old_branch != txn.new_branch && self.backend.branch_exists(&repo.path, &txn.new_branch).await? {
            return Err(GitError::BranchAlreadyExists {
                branch: txn.new_branch,
            }
            .into());
        }
        Ok(txn)
    }

    fn authorize(&self, repo: &Repository, doer: &Principal, txn: Transaction) -> EngineResult<Transaction> {
        verify_branch_protection(repo, doer, &txn.new_branch, &txn.touched_paths(), &self.signer)?;
        if txn.strategy == CommitStrategy::FastImport && requires_signed_commits(repo, &txn.new_branch) {
            return Err(ProtectionError::SigningFailed {
                message: "fast-import commits cannot be signed".to_string(),
            }
            .into());
        }
        Ok(txn)
    }

    // --- Scratch strategy ---

    async fn commit_with_scratch(
        &self,
        repo: &Repository,
        doer: &Principal,
        mut txn: Transaction,
        token: &CancellationToken,
    ) -> EngineResult<Committed> {
        let (mut scratch, has_old_branch) = match self.backend.clone_scratch(&repo.path, &txn.old_branch, token).await
        {
            Ok(scratch) => (scratch, true),
            Err(err) => {
                let missing = matches!(err.as_git(), Some(GitError::BranchNotFound { .. }));
                if !missing || !txn.repo_empty {
                    return Err(err);
                }
                txn.require_only_creates()?;
                debug!(branch = %txn.old_branch, "repository is empty, starting from an empty index");
                txn.last_commit_id = None;
                let scratch = self.backend.init_scratch(&repo.path, repo.object_format, token).await?;
                (scratch, false)
            }
        };

        let result = self
            .assemble_in_scratch(repo, doer, &mut scratch, &mut txn, has_old_branch)
            .await;
        scratch.close();
        let commit = result?;
        Ok(Committed { txn, commit })
    }

    async fn assemble_in_scratch<X: ScratchRepository>(
        &self,
        repo: &Repository,
        doer: &Principal,
        scratch: &mut X,
        txn: &mut Transaction,
        has_old_branch: bool,
    ) -> EngineResult<String> {
        if has_old_branch {
            scratch.set_default_index().await?;
        }
        for file in txn.files.iter().filter(|f| f.kind == OperationKind::Delete) {
            let listed = scratch.ls_files(&[&file.from_path]).await?;
            if !listed.iter().any(|p| *p == file.from_path) {
                return Err(FileError::NotFound {
                    path: file.from_path.clone(),
                }
                .into());
            }
        }

        let head = if has_old_branch {
            let head = scratch
                .branch_commit(&txn.old_branch)
                .await?
                .ok_or_else(|| GitError::BranchNotFound {
                    branch: txn.old_branch.clone(),
                })?;
            self.check_files(&*scratch, repo, &head, txn).await?;
            Some(head)
        } else {
            None
        };

        let lfs_paths = self.lfs_paths(&*scratch, None, head.is_some(), txn).await?;
        let mut pointers = Vec::new();
        for file in &mut txn.files {
            self.stage_file(scratch, file, &lfs_paths, &mut pointers).await?;
        }

        let tree = scratch.write_tree().await?;
        let options = commit::tree_options(
            repo,
            doer,
            &self.signer,
            &txn.new_branch,
            CommitRequest {
                tree,
                parents: head.into_iter().collect(),
                message: &txn.message,
                identities: &txn.identities,
                signoff: txn.signoff,
            },
        );
        let commit = scratch.commit_tree(&options).await?;
        let env = commit::push_env(&self.settings, repo, doer);
        self.publish_with_lfs(repo.id, &pointers, scratch.push(&commit, &txn.new_branch, &env))
            .await?;
        Ok(commit)
    }

    async fn stage_file<X: ScratchRepository>(
        &self,
        scratch: &mut X,
        file: &mut PreparedFile,
        lfs_paths: &BTreeSet<String>,
        pointers: &mut Vec<Pointer>,
    ) -> EngineResult<()> {
        if file.kind == OperationKind::Delete {
            debug!(path = %file.from_path, "removing from index");
            return scratch.remove_files_from_index(&[&file.from_path]).await;
        }

        let listed = scratch.ls_files(&[&file.tree_path, &file.from_path]).await?;
        let in_index = |path: &str| listed.iter().any(|p| p == path);
        if file.kind == OperationKind::Create && in_index(&file.tree_path) {
            return Err(FileError::AlreadyExists {
                path: file.tree_path.clone(),
            }
            .into());
        }
        if file.moves() && in_index(&file.from_path) {
            scratch.remove_files_from_index(&[&file.from_path]).await?;
        }

        let (mode, id) = if let Some(content) = file.content.as_mut() {
            let bytes = self
                .blob_bytes(content, lfs_paths.contains(&file.tree_path), pointers)
                .await?;
            (FileMode::blob(file.executable), scratch.hash_object(&bytes).await?)
        } else {
            let source = file.source.as_ref().ok_or_else(|| FileError::NotFound {
                path: file.from_path.clone(),
            })?;
            (source.mode, source.id.clone())
        };
        debug!(path = %file.tree_path, mode = mode.as_octal(), id, "staging");
        scratch.add_object_to_index(mode, &id, &file.tree_path).await
    }

    /// Bytes to hash: the content itself, or its LFS pointer.
    async fn blob_bytes(
        &self,
        content: &mut FileContent,
        lfs_tracked: bool,
        pointers: &mut Vec<Pointer>,
    ) -> EngineResult<Vec<u8>> {
        if lfs_tracked && let Some(lfs) = &self.lfs {
            let (pointer, stored) = lfs.store_content(std::mem::take(content)).await?;
            *content = stored;
            debug!(oid = %pointer.oid, size = pointer.size, "content stored in lfs");
            let text = pointer.to_string().into_bytes();
            pointers.push(pointer);
            return Ok(text);
        }
        Ok(content.read_all()?)
    }

    // --- Fast-import strategy ---

    async fn commit_with_fast_import(
        &self,
        repo: &Repository,
        doer: &Principal,
        mut txn: Transaction,
        token: &CancellationToken,
    ) -> EngineResult<Committed> {
        let reader = self.backend.reader(&repo.path, token).await?;
        let head = reader.branch_commit(&txn.old_branch).await?;
        match &head {
            Some(head) => {
                for file in txn.files.iter().filter(|f| f.kind == OperationKind::Delete) {
                    let entry = reader.tree_entry(head, &file.from_path).await?;
                    if !entry.is_some_and(|e| !e.is_dir()) {
                        return Err(FileError::NotFound {
                            path: file.from_path.clone(),
                        }
                        .into());
                    }
                }
                self.check_files(&reader, repo, head, &mut txn).await?;
            }
            None if txn.repo_empty => {
                txn.require_only_creates()?;
                txn.last_commit_id = None;
            }
            None => {
                return Err(GitError::BranchNotFound {
                    branch: txn.old_branch,
                }
                .into());
            }
        }

        let lfs_paths = self.lfs_paths(&reader, head.as_deref(), head.is_some(), &txn).await?;
        let mut pointers = Vec::new();
        let message = commit::unsigned_message(&txn.message, &txn.identities.committer, txn.signoff);
        let mut writer = FastImportWriter::new(Vec::new());
        writer.commit(&CommitHeader {
            branch: &txn.new_branch,
            author: &txn.identities.author,
            committer: &txn.identities.committer,
            message: &message,
            from: head.clone().map(FromRef::Commit),
        })?;
        for file in &mut txn.files {
            self.write_file(&mut writer, file, &lfs_paths, &mut pointers).await?;
        }
        let stream = writer.finish()?;

        let env = commit::push_env(&self.settings, repo, doer);
        let import = self
            .backend
            .fast_import(&repo.path, &txn.new_branch, stream, &env, token);
        self.publish_with_lfs(repo.id, &pointers, import).await?;

        let commit = reader
            .branch_commit(&txn.new_branch)
            .await?
            .ok_or_else(|| GitError::BranchNotFound {
                branch: txn.new_branch.clone(),
            })?;
        Ok(Committed { txn, commit })
    }

    async fn write_file(
        &self,
        writer: &mut FastImportWriter<Vec<u8>>,
        file: &mut PreparedFile,
        lfs_paths: &BTreeSet<String>,
        pointers: &mut Vec<Pointer>,
    ) -> EngineResult<()> {
        if file.kind == OperationKind::Delete {
            writer.delete(&file.from_path)?;
            return Ok(());
        }
        if file.moves() {
            writer.delete(&file.from_path)?;
        }

        let mode = FileMode::blob(file.executable);
        match file.content.as_mut() {
            Some(content) if lfs_paths.contains(&file.tree_path) && self.lfs.is_some() => {
                let bytes = self.blob_bytes(content, true, pointers).await?;
                writer.modify(mode, &file.tree_path, &mut Cursor::new(bytes), None)?;
            }
            Some(content) => {
                let size = content.size();
                let reader = content.reader();
                reader.rewind()?;
                writer.modify(mode, &file.tree_path, reader, size)?;
            }
            None => {
                let source = file.source.as_ref().ok_or_else(|| FileError::NotFound {
                    path: file.from_path.clone(),
                })?;
                writer.modify_existing(source.mode, &source.id, &file.tree_path)?;
            }
        }
        Ok(())
    }

    // --- Shared by both strategies ---

    /// Resolves the caller's last commit and checks every file against `head`.
    async fn check_files<R: RepoReader>(
        &self,
        reader: &R,
        repo: &Repository,
        head: &str,
        txn: &mut Transaction,
    ) -> EngineResult<()> {
        let given = txn.last_commit_id.take();
        let last_commit = match given.as_deref() {
            Some(id) => reader
                .resolve_commit(id)
                .await?
                .ok_or_else(|| FileError::InvalidCommitId {
                    commit_id: id.to_string(),
                })?,
            None => head.to_string(),
        };
        let context = CheckContext {
            head,
            last_commit: &last_commit,
            last_commit_given: given.is_some(),
            same_branch: txn.old_branch == txn.new_branch,
        };
        for file in &mut txn.files {
            check_file(reader, &context, file).await?;
            self.preserve_charset(reader, repo, file).await?;
        }
        txn.last_commit_id = Some(last_commit);
        Ok(())
    }

    /// Re-encodes new content of an update into the charset of the old blob.
    async fn preserve_charset<R: RepoReader>(
        &self,
        reader: &R,
        repo: &Repository,
        file: &mut PreparedFile,
    ) -> EngineResult<()> {
        if file.kind != OperationKind::Update {
            return Ok(());
        }
        let (Some(source), Some(content)) = (&file.source, file.content.as_mut()) else {
            return Ok(());
        };
        if !matches!(source.mode, FileMode::Regular | FileMode::Executable) {
            return Ok(());
        }

        let mut prefix = reader.read_blob(&source.id, Some(charset::SNIFF_LEN)).await?;
        if let Some(lfs) = &self.lfs
            && let Some(stored) = lfs.resolve_prefix(repo.id, &prefix, charset::SNIFF_LEN).await?
        {
            prefix = stored;
        }
        let detected = charset::detect(&prefix, self.settings.fallback_encoding);
        if detected.is_plain_utf8() {
            return Ok(());
        }

        let text = content.read_all()?;
        let encoded = charset::encode(&text, detected, &file.tree_path).into_owned();
        debug!(
            path = %file.tree_path,
            encoding = detected.encoding.name(),
            bom = detected.bom,
            "keeping the existing charset"
        );
        *content = FileContent::from_bytes(encoded);
        Ok(())
    }

    async fn lfs_paths<R: RepoReader>(
        &self,
        reader: &R,
        treeish: Option<&str>,
        has_history: bool,
        txn: &Transaction,
    ) -> EngineResult<BTreeSet<String>> {
        if self.lfs.is_none() || !has_history {
            return Ok(BTreeSet::new());
        }
        let paths: Vec<&str> = txn
            .files
            .iter()
            .filter(|f| f.content.is_some())
            .map(|f| f.tree_path.as_str())
            .collect();
        if paths.is_empty() {
            return Ok(BTreeSet::new());
        }
        reader.lfs_tracked(treeish, &paths).await
    }

    /// Records meta rows for `pointers`, then runs `publish`. When either
    /// fails, the rows added here are removed again; older rows stay.
    async fn publish_with_lfs(
        &self,
        repo_id: i64,
        pointers: &[Pointer],
        publish: impl Future<Output = EngineResult<()>>,
    ) -> EngineResult<()> {
        let Some(lfs) = &self.lfs else {
            return publish.await;
        };
        let mut added = Vec::new();
        for pointer in pointers {
            match lfs.record_new(repo_id, pointer).await {
                Ok(true) => added.push(pointer.oid.clone()),
                Ok(false) => {}
                Err(e) => {
                    lfs.forget(repo_id, &added).await;
                    return Err(e);
                }
            }
        }
        if let Err(e) = publish.await {
            debug!(rows = added.len(), "publish failed, removing lfs meta objects");
            lfs.forget(repo_id, &added).await;
            return Err(e);
        }
        Ok(())
    }

    // --- Helpers for whole-tree writers (patch, cherry-pick) ---

    /// The old branch must exist; a distinct new branch must not.
    pub(super) async fn check_branches(&self, repo: &Repository, old: &str, new: &str) -> EngineResult<()> {
        if !self.backend.branch_exists(&repo.path, old).await? {
            return Err(GitError::BranchNotFound {
                branch: old.to_string(),
            }
            .into());
        }
        if old != new && self.backend.branch_exists(&repo.path, new).await? {
            return Err(GitError::BranchAlreadyExists {
                branch: new.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Signs (if the policy says so), commits the index tree and pushes it.
    pub(super) async fn commit_and_push<X: ScratchRepository>(
        &self,
        scratch: &mut X,
        repo: &Repository,
        doer: &Principal,
        branch: &str,
        request: CommitRequest<'_>,
    ) -> EngineResult<String> {
        let options = commit::tree_options(repo, doer, &self.signer, branch, request);
        let commit = scratch.commit_tree(&options).await?;
        scratch
            .push(&commit, branch, &commit::push_env(&self.settings, repo, doer))
            .await?;
        info!(commit, branch, "pushed");
        Ok(commit)
    }

    /// Response for a commit with no single file of interest.
    pub(super) async fn commit_only_response(
        &self,
        repo: &Repository,
        commit: &str,
        token: &CancellationToken,
    ) -> EngineResult<FileResponse> {
        let reader = self.backend.reader(&repo.path, token).await?;
        let info = reader.commit_info(commit).await?;
        let urls = Urls::new(&self.settings.app_url, repo);
        Ok(FileResponse {
            content: None,
            commit: response::commit_response(&urls, &info),
        })
    }

    async fn respond(
        &self,
        repo: &Repository,
        committed: &Committed,
        token: &CancellationToken,
    ) -> EngineResult<FilesResponse> {
        let reader = self.backend.reader(&repo.path, token).await?;
        let urls = Urls::new(&self.settings.app_url, repo);
        let info = reader.commit_info(&committed.commit).await?;

        let mut files = Vec::with_capacity(committed.txn.files.len());
        for file in &committed.txn.files {
            let content = if file.kind == OperationKind::Delete {
                None
            } else {
                response::contents_response(
                    &reader,
                    &urls,
                    &committed.txn.new_branch,
                    &committed.commit,
                    &file.tree_path,
                )
                .await?
            };
            files.push(content);
        }
        Ok(FilesResponse {
            files,
            commit: response::commit_response(&urls, &info),
        })
    }
}

struct CheckContext<'a> {
    head: &'a str,
    last_commit: &'a str,
    last_commit_given: bool,
    same_branch: bool,
}

async fn check_file<R: RepoReader>(
    reader: &R,
    context: &CheckContext<'_>,
    file: &mut PreparedFile,
) -> EngineResult<()> {
    if file.kind != OperationKind::Create {
        let source = reader
            .tree_entry(context.head, &file.from_path)
            .await?
            .ok_or_else(|| FileError::NotFound {
                path: file.from_path.clone(),
            })?;

        if let Some(sha) = &file.sha {
            if *sha != source.id {
                return Err(FileError::ShaDoesNotMatch {
                    path: file.tree_path.clone(),
                    given: sha.clone(),
                    current: source.id,
                }
                .into());
            }
        } else if context.last_commit_given {
            if context.last_commit != context.head
                && context.same_branch
                && reader
                    .file_changed_since(context.head, context.last_commit, &file.from_path)
                    .await?
            {
                return Err(FileError::CommitIdDoesNotMatch {
                    given: context.last_commit.to_string(),
                    current: context.head.to_string(),
                }
                .into());
            }
        } else if file.kind == OperationKind::Update {
            return Err(FileError::ShaOrCommitIdNotProvided.into());
        }

        file.executable = source.is_executable();
        file.source = Some(source);
    }

    if file.kind != OperationKind::Delete {
        check_target(reader, context.head, file).await?;
    }
    Ok(())
}

/// Walks the target path from the root, stopping at the first missing part.
async fn check_target<R: RepoReader>(reader: &R, head: &str, file: &PreparedFile) -> EngineResult<()> {
    let invalid = |message: String| FileError::FilePathInvalid {
        path: file.tree_path.clone(),
        message,
    };
    let parts: Vec<&str> = file.tree_path.split('/').collect();
    let mut sub = String::with_capacity(file.tree_path.len());
    for (index, part) in parts.iter().enumerate() {
        if !sub.is_empty() {
            sub.push('/');
        }
        sub.push_str(part);
        let Some(entry) = reader.tree_entry(head, &sub).await? else {
            break;
        };

        if index + 1 < parts.len() {
            if !entry.is_dir() {
                return Err(invalid(format!(
                    "a file exists where you're trying to create a subdirectory [path: {sub}]"
                ))
                .into());
            }
        } else if entry.is_link() {
            return Err(invalid(format!(
                "a symbolic link exists where you're trying to create a subdirectory [path: {sub}]"
            ))
            .into());
        } else if entry.is_dir() {
            return Err(invalid(format!(
                "a directory exists where you're trying to create a file [path: {sub}]"
            ))
            .into());
        } else if file.moves() || file.kind == OperationKind::Create {
            return Err(FileError::AlreadyExists {
                path: file.tree_path.clone(),
            }
            .into());
        }
    }
    Ok(())
}
