// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Error handling module.
//!
//! ```text
//!             EngineError (~24 bytes)
//!                     |
//!   +------+------+---+---+------+-----+----+---------+
//!   |      |      |       |      |     |    |         |
//!   v      v      v       v      v     v    v         v
//! File    Git  Protect   Lfs   Proc  Cfg   Io  Cancelled/Other
//!  Box    Box    Box     Box   Box   Box   Box     Box<str>
//!
//! Sub-errors (unboxed internally):
//!   File     FilenameInvalid, FilePathInvalid, AlreadyExists, ShaDoesNotMatch, ...
//!   Git      BranchNotFound, RepoNotFound, PushOutOfDate, PushRejected, CommandFailed
//!   Protect  UserCannotCommit, ProtectedFile, SigningFailed
//!   Lfs      SizeMismatch, HashMismatch, Store, MetaStore
//!   Process  SpawnFailed, NonZeroExit, Timeout
//!
//! EngineError::kind() folds everything into ErrorKind:
//!   InvalidArgument | PathInvalid | AlreadyExists | NotFound
//!   Conflict | Authorization | Transport | Infrastructure
//! ```

use thiserror::Error;

/// Convenience alias for `anyhow::Result`.
pub type Result<T> = anyhow::Result<T>;

/// Result type using [`EngineError`].
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Coarse classification of every engine failure.
///
/// API layers map these onto status codes; the engine never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    PathInvalid,
    AlreadyExists,
    NotFound,
    /// Optimistic concurrency check failed.
    Conflict,
    Authorization,
    /// Push was rejected or is out of date.
    Transport,
    Infrastructure,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::InvalidArgument => "invalid-argument",
            Self::PathInvalid => "path-invalid",
            Self::AlreadyExists => "already-exists",
            Self::NotFound => "not-found",
            Self::Conflict => "conflict",
            Self::Authorization => "authorization",
            Self::Transport => "transport",
            Self::Infrastructure => "infrastructure",
        };
        f.write_str(name)
    }
}

/// Top-level engine error type.
///
/// All sub-errors are boxed to keep this enum at ~24 bytes on the stack.
#[derive(Debug, Error)]
pub enum EngineError {
    /// File operation rejected.
    #[error("{0}")]
    File(#[from] Box<FileError>),

    /// Git operation failed.
    #[error("git error: {0}")]
    Git(#[from] Box<GitError>),

    /// Branch protection denied the write.
    #[error("{0}")]
    Protection(#[from] Box<ProtectionError>),

    /// LFS store failure.
    #[error("lfs error: {0}")]
    Lfs(#[from] Box<LfsError>),

    /// Process execution error.
    #[error("process error: {0}")]
    Process(#[from] Box<ProcessError>),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] Box<ConfigError>),

    /// I/O error.
    #[error("io error: {0}")]
    Io(Box<std::io::Error>),

    /// The caller cancelled the transaction.
    #[error("operation cancelled")]
    Cancelled,

    /// Generic error with message.
    #[error("{0}")]
    Other(Box<str>),
}

impl EngineError {
    /// Creates an [`EngineError::Other`] from a message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into().into_boxed_str())
    }

    /// Classifies this error into the engine taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::File(e) => e.kind(),
            Self::Git(e) => e.kind(),
            Self::Protection(e) => e.kind(),
            Self::Lfs(_)
            | Self::Process(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Cancelled
            | Self::Other(_) => ErrorKind::Infrastructure,
        }
    }

    /// Returns the git sub-error, if any.
    #[must_use]
    pub fn as_git(&self) -> Option<&GitError> {
        match self {
            Self::Git(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the file sub-error, if any.
    #[must_use]
    pub fn as_file(&self) -> Option<&FileError> {
        match self {
            Self::File(e) => Some(e),
            _ => None,
        }
    }
}

// --- From implementations for boxing ---

/// Macro to generate `From` implementations that box the source error.
macro_rules! impl_from_boxed {
    ($($error:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$error> for EngineError {
                fn from(err: $error) -> Self {
                    EngineError::$variant(Box::new(err))
                }
            }
        )+
    };
}

impl_from_boxed! {
    FileError => File,
    GitError => Git,
    ProtectionError => Protection,
    LfsError => Lfs,
    ProcessError => Process,
    ConfigError => Config,
    std::io::Error => Io,
}

// --- File Errors ---

/// Validation and conflict errors for file operations.
#[derive(Debug, Error)]
pub enum FileError {
    /// The transaction carries no file operations.
    #[error("no files to change")]
    NoFiles,

    /// A required path was empty.
    #[error("{operation}: path must not be empty")]
    EmptyPath { operation: String },

    /// Operation name not recognised.
    #[error("unknown file operation: {operation}")]
    UnknownOperation { operation: String },

    /// Author or committer name or email git cannot record.
    #[error("invalid {field} identity: {value:?}")]
    InvalidIdentity { field: String, value: String },

    /// Branch name git would refuse as a ref.
    #[error("invalid branch name: {branch:?}")]
    InvalidBranchName { branch: String },

    /// The same path is written, or written and removed, by two operations.
    #[error("path is changed more than once [path: {path}]")]
    DuplicatePath { path: String },

    /// Neither a blob SHA nor a last commit id was supplied for an update.
    #[error("a SHA or commit ID must be provided when updating a file")]
    ShaOrCommitIdNotProvided,

    /// The supplied last commit id does not resolve.
    #[error("invalid last commit ID: {commit_id}")]
    InvalidCommitId { commit_id: String },

    /// Path cleaned to nothing or contained a `.git` segment.
    #[error("file name is invalid: {path}")]
    FilenameInvalid { path: String },

    /// Path walks through a non-directory, a symlink or a directory leaf.
    #[error("{message}")]
    FilePathInvalid { path: String, message: String },

    /// Destination already tracked.
    #[error("repository file already exists [path: {path}]")]
    AlreadyExists { path: String },

    /// Source path absent.
    #[error("repository file does not exist [path: {path}]")]
    NotFound { path: String },

    /// Supplied blob SHA differs from the current entry.
    #[error("sha does not match [given: {given}, expected: {current}]")]
    ShaDoesNotMatch {
        path: String,
        given: String,
        current: String,
    },

    /// The path changed after the supplied last commit id.
    #[error("file changed since commit [given: {given}, current: {current}]")]
    CommitIdDoesNotMatch { given: String, current: String },

    /// `git apply` refused the patch.
    #[error("patch does not apply: {message}")]
    PatchDoesNotApply { message: String },

    /// Three-way merge left unmerged paths.
    #[error("merge conflict in {}", paths.join(", "))]
    MergeConflict { paths: Vec<String> },
}

impl FileError {
    /// Classifies this error into the engine taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NoFiles
            | Self::EmptyPath { .. }
            | Self::UnknownOperation { .. }
            | Self::InvalidIdentity { .. }
            | Self::InvalidBranchName { .. }
            | Self::DuplicatePath { .. }
            | Self::ShaOrCommitIdNotProvided
            | Self::InvalidCommitId { .. } => ErrorKind::InvalidArgument,
            Self::FilenameInvalid { .. } | Self::FilePathInvalid { .. } => ErrorKind::PathInvalid,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::ShaDoesNotMatch { .. }
            | Self::CommitIdDoesNotMatch { .. }
            | Self::PatchDoesNotApply { .. }
            | Self::MergeConflict { .. } => ErrorKind::Conflict,
        }
    }
}

// --- Gix Errors ---

/// Wrapper for gix-specific errors.
#[derive(Debug, Error)]
pub enum GixError {
    /// Failed to open repository.
    #[error("failed to open repository: {0}")]
    Open(#[from] Box<gix::open::Error>),

    /// Failed to look up a reference.
    #[error("failed to find reference: {0}")]
    Reference(#[from] gix::reference::find::existing::Error),

    /// Failed to iterate references.
    #[error("failed to iterate references: {0}")]
    Iter(String),
}

// --- Git Errors ---

/// Git operation errors.
#[derive(Debug, Error)]
pub enum GitError {
    /// Repository not found at the specified path.
    #[error("repository not found: {path}")]
    RepoNotFound { path: String },

    /// Branch not found.
    #[error("branch not found: {branch}")]
    BranchNotFound { branch: String },

    /// Branch exists but must not.
    #[error("branch already exists: {branch}")]
    BranchAlreadyExists { branch: String },

    /// Commit id does not resolve.
    #[error("commit not found: {commit}")]
    CommitNotFound { commit: String },

    /// Remote ref moved since it was read.
    #[error("push to {branch} is out of date: {message}")]
    PushOutOfDate { branch: String, message: String },

    /// Remote hook or protection declined the push.
    #[error("push to {branch} rejected: {message}")]
    PushRejected { branch: String, message: String },

    /// Git refused a path while staging.
    #[error("invalid path {path}: {message}")]
    InvalidPath { path: String, message: String },

    /// Git command execution failed.
    #[error("git command failed: {command} - {message}")]
    CommandFailed { command: String, message: String },

    /// Error from gix library.
    #[error("gix error: {0}")]
    Gix(#[from] GixError),

    /// The backend cannot perform this operation.
    #[error("operation not supported by this backend: {operation}")]
    Unsupported { operation: String },
}

impl GitError {
    /// Classifies this error into the engine taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::RepoNotFound { .. }
            | Self::BranchNotFound { .. }
            | Self::CommitNotFound { .. } => ErrorKind::NotFound,
            Self::BranchAlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::PushOutOfDate { .. } | Self::PushRejected { .. } => ErrorKind::Transport,
            Self::InvalidPath { .. } => ErrorKind::PathInvalid,
            Self::CommandFailed { .. } | Self::Gix(_) | Self::Unsupported { .. } => {
                ErrorKind::Infrastructure
            }
        }
    }
}

// --- Protection Errors ---

/// Branch protection denials.
#[derive(Debug, Error)]
pub enum ProtectionError {
    /// Principal may not push to the branch, or signing was impossible.
    #[error("user {user} cannot commit to branch {branch}")]
    UserCannotCommit { user: String, branch: String },

    /// A touched path matches a protected glob.
    #[error("file {path} is protected on branch {branch}")]
    ProtectedFile { path: String, branch: String },

    /// Signing infrastructure failed (not a policy decision).
    #[error("signing failed: {message}")]
    SigningFailed { message: String },
}

impl ProtectionError {
    /// Classifies this error into the engine taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UserCannotCommit { .. } | Self::ProtectedFile { .. } => ErrorKind::Authorization,
            Self::SigningFailed { .. } => ErrorKind::Infrastructure,
        }
    }
}

// --- LFS Errors ---

/// LFS content and metadata store errors.
#[derive(Debug, Error)]
pub enum LfsError {
    /// Written byte count differs from the pointer size.
    #[error("object {oid}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        oid: String,
        expected: u64,
        actual: u64,
    },

    /// Written bytes hash to a different oid.
    #[error("object {oid}: content hashes to {actual}")]
    HashMismatch { oid: String, actual: String },

    /// Content store I/O failure.
    #[error("content store failure for {oid}: {source}")]
    Store {
        oid: String,
        #[source]
        source: std::io::Error,
    },

    /// Metadata store failure.
    #[error("metadata store failure for {oid}: {message}")]
    MetaStore { oid: String, message: String },
}

// --- Config Errors ---

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse configuration.
    #[error("failed to parse config '{path}': {message}")]
    ParseError { path: String, message: String },

    /// Invalid configuration value.
    #[error("invalid value for '{key}' in section '[{section}]': {message}")]
    InvalidValue {
        section: String,
        key: String,
        message: String,
    },
}

// --- Process Errors ---

/// Process execution errors.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Executable not found in PATH.
    #[error("executable not found: '{name}' (not in PATH)")]
    ExecutableNotFound { name: String },

    /// Failed to spawn process.
    #[error("failed to spawn process '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Process exited with non-zero status.
    #[error("process '{command}' exited with code {code}")]
    NonZeroExit { command: String, code: i32 },

    /// Process timed out.
    #[error("process '{command}' timed out after {timeout_secs} seconds")]
    Timeout { command: String, timeout_secs: u64 },
}

#[cfg(test)]
mod tests;
