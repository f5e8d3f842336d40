// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Inputs of the file mutation engine.
//!
//! ```text
//! Repository   where to write (path, default branch, protection rules)
//! Principal    who is writing
//! FileOperation
//!   Create { path, content }
//!   Update { from?, path, content, sha? }
//!   Delete { path, sha? }
//!   Rename { from, path, content?, sha? }
//! ChangeRepoFilesOptions   ordered operations + branch pair + authorship
//! ```

use std::fmt;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::str::FromStr;

use bon::Builder;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::protection::ProtectedBranchRule;
use crate::error::FileError;
use crate::git::object::ObjectFormat;

// --- Repository and principal ---

/// Whose signatures a repository trusts; decides who ends up as committer
/// of a signed commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustModel {
    #[default]
    Default,
    Collaborator,
    Committer,
    CollaboratorCommitter,
}

impl TrustModel {
    /// True when a signed commit must name the signer as committer.
    #[must_use]
    pub const fn signer_commits(self) -> bool {
        matches!(self, Self::Committer | Self::CollaboratorCommitter)
    }
}

/// Repository being written to.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct Repository {
    pub id: i64,
    #[builder(into)]
    pub owner_name: String,
    #[builder(into)]
    pub name: String,
    /// Location of the bare repository on disk.
    #[builder(into)]
    pub path: PathBuf,
    #[builder(into, default = String::from("main"))]
    #[serde(default = "default_branch_name")]
    pub default_branch: String,
    #[builder(default)]
    #[serde(default)]
    pub is_empty: bool,
    #[builder(default)]
    #[serde(default)]
    pub object_format: ObjectFormat,
    #[builder(default)]
    #[serde(default)]
    pub trust_model: TrustModel,
    #[builder(default)]
    #[serde(default)]
    pub protected_branches: Vec<ProtectedBranchRule>,
}

fn default_branch_name() -> String {
    "main".to_string()
}

impl Repository {
    /// `owner/name`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner_name, self.name)
    }
}

/// The acting user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    pub email: String,
}

impl Principal {
    pub fn new(id: i64, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            full_name: String::new(),
            email: email.into(),
        }
    }

    /// Name used in git signatures: the full name when set.
    #[must_use]
    pub fn git_name(&self) -> &str {
        if self.full_name.is_empty() {
            &self.name
        } else {
            &self.full_name
        }
    }
}

// --- Authorship ---

/// Optional author or committer override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityOptions {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl IdentityOptions {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Explicit author and committer timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDateOptions {
    pub author: Option<DateTime<FixedOffset>>,
    pub committer: Option<DateTime<FixedOffset>>,
}

/// Who the commit names and how it is attributed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Authorship {
    pub author: Option<IdentityOptions>,
    pub committer: Option<IdentityOptions>,
    pub dates: CommitDateOptions,
    /// Append a `Signed-off-by` trailer for the committer.
    pub signoff: bool,
}

// --- File content ---

/// Any seekable byte source.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Content of a created or updated file.
///
/// The reader is rewound before every use, so the same content can be
/// hashed for LFS and then streamed into git.
pub struct FileContent {
    reader: Box<dyn ReadSeek>,
    size: Option<u64>,
}

impl FileContent {
    /// Content read from `reader`; its size is found by seeking.
    pub fn new(reader: impl ReadSeek + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            size: None,
        }
    }

    /// Content held in memory.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let size = bytes.len() as u64;
        Self {
            reader: Box::new(Cursor::new(bytes)),
            size: Some(size),
        }
    }

    /// Declares the size so it need not be computed.
    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Declared size, if any. A declared size of zero counts as unknown.
    #[must_use]
    pub fn size(&self) -> Option<u64> {
        self.size.filter(|s| *s > 0)
    }

    pub fn reader(&mut self) -> &mut dyn ReadSeek {
        self.reader.as_mut()
    }

    /// Rewinds and reads everything.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying reader.
    pub fn read_all(&mut self) -> io::Result<Vec<u8>> {
        self.reader.seek(SeekFrom::Start(0))?;
        let mut buf = Vec::new();
        self.reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl Default for FileContent {
    fn default() -> Self {
        Self::from_bytes(Vec::new())
    }
}

impl Read for FileContent {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Seek for FileContent {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.reader.seek(pos)
    }
}

impl fmt::Debug for FileContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileContent")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

// --- Operations ---

/// Name of a file operation as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
    Rename,
}

impl OperationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Rename => "rename",
        }
    }

    /// Verb used in default commit messages.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Create => "Add",
            Self::Update => "Update",
            Self::Delete => "Delete",
            Self::Rename => "Rename",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = FileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "rename" => Ok(Self::Rename),
            other => Err(FileError::UnknownOperation {
                operation: other.to_string(),
            }),
        }
    }
}

/// One logical change inside a transaction.
#[derive(Debug)]
pub enum FileOperation {
    Create {
        path: String,
        content: FileContent,
    },
    /// Replaces `from` (or `path` itself) with new content at `path`.
    Update {
        from: Option<String>,
        path: String,
        content: FileContent,
        sha: Option<String>,
    },
    Delete {
        path: String,
        sha: Option<String>,
    },
    /// Moves `from` to `path`, keeping the blob unless `content` is given.
    Rename {
        from: String,
        path: String,
        content: Option<FileContent>,
        sha: Option<String>,
    },
}

impl FileOperation {
    pub fn create(path: impl Into<String>, content: FileContent) -> Self {
        Self::Create {
            path: path.into(),
            content,
        }
    }

    pub fn update(path: impl Into<String>, content: FileContent) -> Self {
        Self::Update {
            from: None,
            path: path.into(),
            content,
            sha: None,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::Delete {
            path: path.into(),
            sha: None,
        }
    }

    pub fn rename(from: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Rename {
            from: from.into(),
            path: path.into(),
            content: None,
            sha: None,
        }
    }

    /// Builds an operation from its wire fields.
    ///
    /// A delete takes its path from `from_path` when `tree_path` is empty;
    /// content passed to a delete is ignored.
    ///
    /// # Errors
    ///
    /// Returns `FileError::EmptyPath` when the operation has no usable path.
    pub fn from_parts(
        kind: OperationKind,
        tree_path: String,
        from_path: Option<String>,
        content: Option<FileContent>,
        sha: Option<String>,
    ) -> Result<Self, FileError> {
        let from_path = from_path.filter(|p| !p.is_empty());
        let empty = || FileError::EmptyPath {
            operation: kind.to_string(),
        };
        match kind {
            OperationKind::Create => {
                if tree_path.is_empty() {
                    return Err(empty());
                }
                Ok(Self::Create {
                    path: tree_path,
                    content: content.unwrap_or_else(|| FileContent::from_bytes(Vec::new())),
                })
            }
            OperationKind::Update => {
                if tree_path.is_empty() {
                    return Err(empty());
                }
                Ok(Self::Update {
                    from: from_path,
                    path: tree_path,
                    content: content.unwrap_or_else(|| FileContent::from_bytes(Vec::new())),
                    sha,
                })
            }
            OperationKind::Delete => {
                let path = from_path
                    .filter(|_| tree_path.is_empty())
                    .unwrap_or(tree_path);
                if path.is_empty() {
                    return Err(empty());
                }
                Ok(Self::Delete { path, sha })
            }
            OperationKind::Rename => {
                let from = from_path.ok_or_else(empty)?;
                if tree_path.is_empty() {
                    return Err(empty());
                }
                Ok(Self::Rename {
                    from,
                    path: tree_path,
                    content,
                    sha,
                })
            }
        }
    }

    /// Sets the expected current blob id of the source path.
    #[must_use]
    pub fn with_sha(mut self, expected: impl Into<String>) -> Self {
        let expected = Some(expected.into());
        match &mut self {
            Self::Create { .. } => {}
            Self::Update { sha, .. } | Self::Delete { sha, .. } | Self::Rename { sha, .. } => {
                *sha = expected;
            }
        }
        self
    }

    /// Makes an update move its source from `from`.
    #[must_use]
    pub fn moved_from(mut self, source: impl Into<String>) -> Self {
        if let Self::Update { from, .. } = &mut self {
            *from = Some(source.into());
        }
        self
    }

    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::Update { .. } => OperationKind::Update,
            Self::Delete { .. } => OperationKind::Delete,
            Self::Rename { .. } => OperationKind::Rename,
        }
    }

    /// Destination path (the deleted path for a delete).
    #[must_use]
    pub fn tree_path(&self) -> &str {
        match self {
            Self::Create { path, .. }
            | Self::Update { path, .. }
            | Self::Delete { path, .. }
            | Self::Rename { path, .. } => path,
        }
    }
}

// --- Transaction options ---

/// How the commit is assembled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitStrategy {
    /// Temporary bare clone, index plumbing, push.
    #[default]
    Scratch,
    /// One `git fast-import` run against the repository.
    FastImport,
}

/// A multi-file transaction.
#[derive(Debug, Builder)]
pub struct ChangeRepoFilesOptions {
    /// Expected head of the old branch.
    #[builder(into)]
    pub last_commit_id: Option<String>,
    /// Defaults to the repository's default branch.
    #[builder(into)]
    pub old_branch: Option<String>,
    /// Defaults to the old branch.
    #[builder(into)]
    pub new_branch: Option<String>,
    #[builder(into, default)]
    pub message: String,
    pub files: Vec<FileOperation>,
    #[builder(default)]
    pub authorship: Authorship,
    #[builder(default)]
    pub strategy: CommitStrategy,
}

/// Single-file create or update.
#[derive(Debug, Builder)]
pub struct UpdateRepoFileOptions {
    #[builder(into)]
    pub last_commit_id: Option<String>,
    #[builder(into)]
    pub old_branch: Option<String>,
    #[builder(into)]
    pub new_branch: Option<String>,
    #[builder(into)]
    pub tree_path: String,
    /// Source path when the update also moves the file.
    #[builder(into)]
    pub from_tree_path: Option<String>,
    #[builder(into, default)]
    pub message: String,
    pub content: FileContent,
    #[builder(into)]
    pub sha: Option<String>,
    #[builder(default)]
    pub is_new_file: bool,
    #[builder(default)]
    pub authorship: Authorship,
}

/// Single-file delete.
#[derive(Debug, Clone, Builder)]
pub struct DeleteRepoFileOptions {
    #[builder(into)]
    pub last_commit_id: Option<String>,
    #[builder(into)]
    pub old_branch: Option<String>,
    #[builder(into)]
    pub new_branch: Option<String>,
    #[builder(into)]
    pub tree_path: String,
    #[builder(into, default)]
    pub message: String,
    #[builder(into)]
    pub sha: Option<String>,
    #[builder(default)]
    pub authorship: Authorship,
}

/// A unified diff applied on top of a branch.
#[derive(Debug, Clone, Builder)]
pub struct ApplyDiffPatchOptions {
    #[builder(into)]
    pub last_commit_id: Option<String>,
    #[builder(into)]
    pub old_branch: Option<String>,
    #[builder(into)]
    pub new_branch: Option<String>,
    #[builder(into, default)]
    pub message: String,
    /// The patch text.
    #[builder(into)]
    pub content: String,
    #[builder(default)]
    pub authorship: Authorship,
}

/// Cherry-pick or revert of one commit.
#[derive(Debug, Clone, Builder)]
pub struct CherryPickOptions {
    #[builder(into)]
    pub last_commit_id: Option<String>,
    #[builder(into)]
    pub old_branch: Option<String>,
    #[builder(into)]
    pub new_branch: Option<String>,
    /// Defaults to the picked commit's message, or a revert message.
    #[builder(into, default)]
    pub message: String,
    #[builder(into)]
    pub commit_id: String,
    #[builder(default)]
    pub revert: bool,
    #[builder(default)]
    pub authorship: Authorship,
}
