// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Git operations module.
//!
//! ```text
//!            files::update / fast-import path
//!                 |                  |
//!                 v                  v
//!      ,-----------------------------------------,
//!      |            backend (traits)             |
//!      |  GitBackend -> ScratchRepository        |
//!      |             -> RepoReader               |
//!      '--+----------------+----------------+----'
//!         |                |                |
//!         v                v                v
//!    ShellBackend      GixQuery        MemoryBackend
//!   (git plumbing,   (origin refs,    (in-process fake
//!    temp clones)     empty check)     for tests)
//!
//!   object       ObjectFormat, FileMode, TreeEntry, Signature, CommitInfo
//!   fast_import  stream writer for `git fast-import`
//!   diff         unified diff parser with size limits
//! ```
//!
//! **`ShellBackend`** drives the git CLI; stderr matching stays inside it.
//! **`MemoryBackend`** mirrors the same contract over plain maps.

pub mod backend;
pub mod diff;
pub mod fast_import;
pub mod object;
