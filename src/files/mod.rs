// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Repository file mutation engine.
//!
//! ```text
//!                         FileEngine<B, M, S>
//!                                 |
//!   +------------+----------------+--------------+--------------+
//!   v            v                v              v              v
//! change_repo  create_or_update  apply_diff    cherry_pick   get_diff
//! _files       / delete_repo     _patch        (revert)      _preview
//!   |          _file (single)      |              |              |
//!   |            |                 |              |              |
//!   +------------+        scratch clone, apply / merge-tree      |
//!   v                              |                     scratch clone
//! validate -> resolve -> authorize |                     stage, diff-index
//!   |                              |                            |
//!   +-- Scratch:    clone, stage, commit-tree, push             v
//!   +-- FastImport: one stream into the origin                Diff
//!   v                              v
//! FilesResponse               FileResponse
//! ```
//!
//! `B` is the [`GitBackend`], `M` the LFS [`MetaStore`] and `S` the commit
//! [`Signer`]. Every write either moves the target branch by exactly one
//! commit or leaves the repository untouched.

pub mod cherry_pick;
pub(crate) mod commit;
pub mod identity;
pub mod patch;
pub mod paths;
pub mod preview;
pub mod protection;
pub mod response;
pub mod single;
pub mod types;
pub mod update;


use bon::Builder;
use encoding_rs::Encoding;

pub use identity::Identities;
pub use paths::clean_upload_file_name;
pub use protection::{KeySigner, NeverSign, ProtectedBranchRule, PushAccess, SignDecision, Signer};
pub use response::{ContentsResponse, FileCommitResponse, FileResponse, FilesResponse};
pub use types::{
    ApplyDiffPatchOptions, Authorship, ChangeRepoFilesOptions, CherryPickOptions, CommitDateOptions,
    CommitStrategy, DeleteRepoFileOptions, FileContent, FileOperation, IdentityOptions, OperationKind,
    Principal, Repository, TrustModel, UpdateRepoFileOptions,
};

use crate::config::Config;
use crate::git::backend::GitBackend;
use crate::git::diff::DiffLimits;
use crate::lfs::{Lfs, MemoryMetaStore, MetaStore};

/// Settings the engine reads on every operation.
#[derive(Debug, Clone, Builder)]
pub struct EngineSettings {
    /// Web root used to build response URLs.
    #[builder(into, default = String::from("http://localhost:3000/"))]
    pub app_url: String,
    /// Prefix of the pusher variables exported to hooks.
    #[builder(into, default = String::from("REPOFILES"))]
    pub hook_env_prefix: String,
    /// Charset assumed for existing files that are neither UTF-8 nor UTF-16.
    #[builder(default = encoding_rs::WINDOWS_1252)]
    pub fallback_encoding: &'static Encoding,
    #[builder(default)]
    pub diff_limits: DiffLimits,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EngineSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            app_url: config.repository.app_url.clone(),
            hook_env_prefix: config.git.hook_env_prefix.clone(),
            fallback_encoding: config.fallback_encoding(),
            diff_limits: config.diff_limits(),
        }
    }
}

/// The write path over one git backend.
///
/// # Example
///
/// ```no_run
/// use repofiles_rs::files::{EngineSettings, FileEngine};
/// use repofiles_rs::git::backend::ShellBackend;
///
/// let engine = FileEngine::new(ShellBackend::new("/tmp/uploads")?, EngineSettings::default());
/// # let _ = engine;
/// # Ok::<(), repofiles_rs::error::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileEngine<B, M = MemoryMetaStore, S = NeverSign> {
    backend: B,
    lfs: Option<Lfs<M>>,
    signer: S,
    settings: EngineSettings,
}

impl<B: GitBackend> FileEngine<B> {
    /// Engine without LFS that never signs.
    pub const fn new(backend: B, settings: EngineSettings) -> Self {
        Self {
            backend,
            lfs: None,
            signer: NeverSign,
            settings,
        }
    }
}

impl<B: GitBackend, M: MetaStore, S: Signer> FileEngine<B, M, S> {
    /// Routes `filter=lfs` paths through `lfs`.
    #[must_use]
    pub fn with_lfs<M2: MetaStore>(self, lfs: Lfs<M2>) -> FileEngine<B, M2, S> {
        self.with_optional_lfs(Some(lfs))
    }

    /// Like [`Self::with_lfs`], leaving LFS off for `None`.
    #[must_use]
    pub fn with_optional_lfs<M2: MetaStore>(self, lfs: Option<Lfs<M2>>) -> FileEngine<B, M2, S> {
        FileEngine {
            backend: self.backend,
            lfs,
            signer: self.signer,
            settings: self.settings,
        }
    }

    /// Replaces the signing policy.
    #[must_use]
    pub fn with_signer<S2: Signer>(self, signer: S2) -> FileEngine<B, M, S2> {
        FileEngine {
            backend: self.backend,
            lfs: self.lfs,
            signer,
            settings: self.settings,
        }
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }

    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub const fn lfs(&self) -> Option<&Lfs<M>> {
        self.lfs.as_ref()
    }
}
