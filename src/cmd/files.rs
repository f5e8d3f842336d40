// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! File mutation commands: change, delete, patch, cherry-pick, preview.
//!
//! ```text
//! args + Config
//!   |
//!   v
//! ShellBackend::from_config --> FileEngine (+ Lfs when lfs.start_server)
//!   |
//!   v
//! engine operation --> response as pretty JSON on stdout
//! ```
//!
//! A change set is a JSON document:
//!
//! ```text
//! {
//!   "message": "Update docs",
//!   "old_branch": "main", "new_branch": "docs",
//!   "last_commit_id": "…", "strategy": "scratch" | "fast-import",
//!   "author": { "name": "…", "email": "…" }, "signoff": false,
//!   "files": [
//!     { "operation": "update", "path": "README.md", "content": "<base64>", "sha": "…" },
//!     { "operation": "rename", "from_path": "a.txt", "path": "b.txt" },
//!     { "operation": "delete", "path": "old.md" }
//!   ]
//! }
//! ```

use std::path::Path;

use anyhow::Context;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::files::{
    ChangeArgs, CherryPickArgs, DeleteArgs, DoerArgs, PatchArgs, PreviewArgs, RepoArgs,
};
use crate::config::Config;
use crate::error::{FileError, Result};
use crate::files::{
    ApplyDiffPatchOptions, Authorship, ChangeRepoFilesOptions, CherryPickOptions, CommitStrategy,
    DeleteRepoFileOptions, EngineSettings, FileContent, FileEngine, FileOperation, OperationKind,
    Principal, Repository,
};
use crate::git::backend::{GitBackend, ShellBackend};
use crate::lfs::{ContentStore, JsonMetaStore, Lfs};

/// File holding LFS metadata rows, inside `lfs.content_path`.
const LFS_META_FILE: &str = "meta.json";

/// A multi-file transaction as accepted by `repofiles change`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub old_branch: Option<String>,
    #[serde(default)]
    pub new_branch: Option<String>,
    #[serde(default)]
    pub last_commit_id: Option<String>,
    #[serde(default)]
    pub strategy: CommitStrategy,
    #[serde(flatten)]
    pub authorship: Authorship,
    pub files: Vec<ChangeFile>,
}

/// One entry of [`ChangeSet::files`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeFile {
    /// `create`, `update`, `delete` or `rename`.
    pub operation: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub from_path: Option<String>,
    /// Base64 encoded content.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub sha: Option<String>,
}

impl ChangeFile {
    /// Decodes the entry into an engine operation.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown operation, a missing path or content
    /// that is not valid base64.
    pub fn into_operation(self) -> Result<FileOperation> {
        let kind: OperationKind = self.operation.parse()?;
        let content = self
            .content
            .map(|encoded| {
                base64::engine::general_purpose::STANDARD
                    .decode(encoded.trim())
                    .with_context(|| format!("content of '{}' is not valid base64", self.path))
            })
            .transpose()?
            .map(FileContent::from_bytes);
        Ok(FileOperation::from_parts(
            kind,
            self.path,
            self.from_path,
            content,
            self.sha,
        )?)
    }
}

impl ChangeSet {
    /// Engine options for this change set.
    ///
    /// # Errors
    ///
    /// Returns the first entry that cannot be decoded.
    pub fn into_options(self) -> Result<ChangeRepoFilesOptions> {
        if self.files.is_empty() {
            return Err(FileError::NoFiles.into());
        }
        let files = self
            .files
            .into_iter()
            .map(ChangeFile::into_operation)
            .collect::<Result<Vec<_>>>()?;
        Ok(ChangeRepoFilesOptions::builder()
            .maybe_last_commit_id(self.last_commit_id)
            .maybe_old_branch(self.old_branch)
            .maybe_new_branch(self.new_branch)
            .message(self.message)
            .files(files)
            .authorship(self.authorship)
            .strategy(self.strategy)
            .build())
    }
}

/// Handler for `repofiles change`.
///
/// # Errors
///
/// Returns an error if the change set cannot be read or the engine rejects it.
pub async fn run_change_command(
    args: &ChangeArgs,
    config: &Config,
    token: &CancellationToken,
) -> Result<()> {
    let raw = read_input(&args.changes).await?;
    let change_set: ChangeSet = serde_json::from_slice(&raw)
        .with_context(|| format!("invalid change set {}", args.changes.display()))?;
    debug!(files = change_set.files.len(), "change set loaded");
    let opts = change_set.into_options()?;

    let backend = ShellBackend::from_config(config)?;
    let mut repo = repository(&args.repo, config, &backend).await?;
    let doer = principal(&args.doer);
    let engine = engine(backend, config);
    let response = engine
        .change_repo_files(&mut repo, &doer, opts, token)
        .await?;
    info!(commit = %response.commit.sha, files = response.files.len(), "changes committed");
    print_json(&response)
}

/// Handler for `repofiles delete`.
///
/// # Errors
///
/// Returns an error if the engine rejects the delete.
pub async fn run_delete_command(
    args: &DeleteArgs,
    config: &Config,
    token: &CancellationToken,
) -> Result<()> {
    let backend = ShellBackend::from_config(config)?;
    let mut repo = repository(&args.repo, config, &backend).await?;
    let doer = principal(&args.doer);
    let opts = DeleteRepoFileOptions::builder()
        .maybe_old_branch(args.branch.clone())
        .tree_path(args.path.clone())
        .maybe_sha(args.sha.clone())
        .message(args.message.clone().unwrap_or_default())
        .build();
    let response = engine(backend, config)
        .delete_repo_file(&mut repo, &doer, opts, token)
        .await?;
    info!(commit = %response.commit.sha, path = %args.path, "file deleted");
    print_json(&response)
}

/// Handler for `repofiles patch`.
///
/// # Errors
///
/// Returns an error if the patch cannot be read or does not apply.
pub async fn run_patch_command(
    args: &PatchArgs,
    config: &Config,
    token: &CancellationToken,
) -> Result<()> {
    let raw = read_input(&args.patch).await?;
    let content = String::from_utf8(raw)
        .with_context(|| format!("patch {} is not UTF-8", args.patch.display()))?;

    let backend = ShellBackend::from_config(config)?;
    let repo = repository(&args.repo, config, &backend).await?;
    let doer = principal(&args.doer);
    let opts = ApplyDiffPatchOptions::builder()
        .maybe_old_branch(args.branch.clone())
        .maybe_new_branch(args.new_branch.clone())
        .message(args.message.clone().unwrap_or_default())
        .content(content)
        .build();
    let response = engine(backend, config)
        .apply_diff_patch(&repo, &doer, opts, token)
        .await?;
    info!(commit = %response.commit.sha, "patch applied");
    print_json(&response)
}

/// Handler for `repofiles cherry-pick`.
///
/// # Errors
///
/// Returns an error if the commit is unknown or does not merge cleanly.
pub async fn run_cherry_pick_command(
    args: &CherryPickArgs,
    config: &Config,
    token: &CancellationToken,
) -> Result<()> {
    let backend = ShellBackend::from_config(config)?;
    let repo = repository(&args.repo, config, &backend).await?;
    let doer = principal(&args.doer);
    let opts = CherryPickOptions::builder()
        .maybe_old_branch(args.branch.clone())
        .maybe_new_branch(args.new_branch.clone())
        .message(args.message.clone().unwrap_or_default())
        .commit_id(args.commit.clone())
        .revert(args.revert)
        .build();
    let response = engine(backend, config)
        .cherry_pick(&repo, &doer, opts, token)
        .await?;
    info!(commit = %response.commit.sha, revert = args.revert, "commit picked");
    print_json(&response)
}

/// Handler for `repofiles preview`.
///
/// # Errors
///
/// Returns an error if the content cannot be read or the diff fails.
pub async fn run_preview_command(
    args: &PreviewArgs,
    config: &Config,
    token: &CancellationToken,
) -> Result<()> {
    let content = FileContent::from_bytes(read_input(&args.content).await?);
    let backend = ShellBackend::from_config(config)?;
    let repo = repository(&args.repo, config, &backend).await?;
    let diff = engine(backend, config)
        .get_diff_preview(
            &repo,
            args.branch.as_deref().unwrap_or_default(),
            &args.path,
            content,
            token,
        )
        .await?;
    print_json(&diff)
}

fn engine(backend: ShellBackend, config: &Config) -> FileEngine<ShellBackend, JsonMetaStore> {
    let lfs = config.lfs.start_server.then(|| {
        Lfs::new(
            ContentStore::new(&config.lfs.content_path),
            JsonMetaStore::new(config.lfs.content_path.join(LFS_META_FILE)),
        )
    });
    FileEngine::new(backend, EngineSettings::from_config(config)).with_optional_lfs(lfs)
}

/// Describes the repository at `args.path`.
async fn repository(
    args: &RepoArgs,
    config: &Config,
    backend: &ShellBackend,
) -> Result<Repository> {
    let is_empty = backend
        .is_empty(&args.path)
        .await
        .with_context(|| format!("cannot open repository {}", args.path.display()))?;
    let (owner, name) = repository_names(&args.path);
    Ok(Repository::builder()
        .id(args.id)
        .owner_name(args.owner.clone().unwrap_or(owner))
        .name(args.name.clone().unwrap_or(name))
        .path(args.path.clone())
        .default_branch(args.default_branch.clone())
        .is_empty(is_empty)
        .object_format(config.git.object_format)
        .build())
}

/// `(owner, name)` guessed from `<owner>/<name>.git`.
#[must_use]
pub fn repository_names(path: &Path) -> (String, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .map(|n| n.strip_suffix(".git").unwrap_or(&n).to_string())
        .unwrap_or_default();
    let owner = path
        .parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    (owner, name)
}

fn principal(args: &DoerArgs) -> Principal {
    Principal::new(args.id, args.name.as_str(), args.email.as_str())
}

async fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut buf)
            .await
            .context("failed to read standard input")?;
        return Ok(buf);
    }
    tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_set_decodes_operations() {
        let json = r#"{
            "message": "Tidy up",
            "new_branch": "tidy",
            "author": { "name": "Ann", "email": "ann@example.com" },
            "signoff": true,
            "strategy": "fast-import",
            "files": [
                { "operation": "create", "path": "a.txt", "content": "aGVsbG8=" },
                { "operation": "rename", "from_path": "b.txt", "path": "c.txt" },
                { "operation": "delete", "path": "d.txt", "sha": "1234" }
            ]
        }"#;
        let change_set: ChangeSet = serde_json::from_str(json).expect("parse");
        assert!(change_set.authorship.signoff);
        assert_eq!(
            change_set.authorship.author.as_ref().map(|a| a.name.as_str()),
            Some("Ann")
        );

        let opts = change_set.into_options().expect("options");
        assert_eq!(opts.strategy, CommitStrategy::FastImport);
        assert_eq!(opts.new_branch.as_deref(), Some("tidy"));
        assert_eq!(opts.old_branch, None);
        let kinds: Vec<_> = opts.files.iter().map(FileOperation::kind).collect();
        assert_eq!(
            kinds,
            [OperationKind::Create, OperationKind::Rename, OperationKind::Delete]
        );
        let mut files = opts.files.into_iter();
        let Some(FileOperation::Create { mut content, .. }) = files.next() else {
            panic!("expected create");
        };
        assert_eq!(content.read_all().expect("read"), b"hello");
    }

    #[test]
    fn test_change_set_rejects_unknown_operation() {
        let file = ChangeFile {
            operation: "copy".to_string(),
            path: "a.txt".to_string(),
            ..ChangeFile::default()
        };
        let err = file.into_operation().expect_err("unknown");
        insta::assert_snapshot!(err.to_string(), @"unknown file operation: copy");
    }

    #[test]
    fn test_change_set_rejects_bad_base64() {
        let file = ChangeFile {
            operation: "create".to_string(),
            path: "a.txt".to_string(),
            content: Some("***".to_string()),
            ..ChangeFile::default()
        };
        let err = file.into_operation().expect_err("bad base64");
        assert!(err.to_string().contains("not valid base64"));
    }

    #[test]
    fn test_empty_change_set() {
        let err = ChangeSet::default().into_options().expect_err("no files");
        assert!(matches!(err.downcast_ref::<FileError>(), Some(FileError::NoFiles)));
    }

    #[test]
    fn test_repository_names() {
        assert_eq!(
            repository_names(Path::new("/srv/git/octo/cat.git")),
            ("octo".to_string(), "cat".to_string())
        );
        assert_eq!(
            repository_names(Path::new("plain")),
            (String::new(), "plain".to_string())
        );
    }
}
