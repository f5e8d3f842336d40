// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Cherry-pick and revert through a three-way tree merge.
//!
//! ```text
//!               base            ours    theirs
//! cherry-pick   parent(C)       head    C
//! revert        C               head    parent(C)
//!
//! read-tree -m --aggressive base ours theirs
//!   unmerged entries left --> FileError::MergeConflict
//! ```
//!
//! A root commit's parent is the empty tree.

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::FileEngine;
use super::commit::CommitRequest;
use super::identity::{self, Identities};
use super::protection::{Signer, verify_branch_protection};
use super::response::FileResponse;
use super::types::{CherryPickOptions, Principal, Repository};
use super::update::{default_branches, strict_head};
use crate::error::{EngineResult, GitError};
use crate::git::backend::{GitBackend, RepoReader, ScratchRepository};
use crate::git::object::CommitInfo;
use crate::lfs::MetaStore;

/// Default message of a revert of `picked`.
fn revert_message(picked: &CommitInfo) -> String {
    format!("Revert \"{}\"\n\nThis reverts commit {}.", picked.summary(), picked.id)
}

/// `(base, theirs)` of the merge.
fn merge_sides(picked: &CommitInfo, revert: bool, empty_tree: &str) -> (String, String) {
    let parent = picked
        .parents
        .first()
        .cloned()
        .unwrap_or_else(|| empty_tree.to_string());
    if revert {
        (picked.id.clone(), parent)
    } else {
        (parent, picked.id.clone())
    }
}

impl<B: GitBackend, M: MetaStore, S: Signer> FileEngine<B, M, S> {
    /// Replays (or undoes) `opts.commit_id` on top of the old branch.
    ///
    /// # Errors
    ///
    /// - `GitError::CommitNotFound` when the commit does not resolve.
    /// - `FileError::MergeConflict` when the merge leaves unmerged paths.
    /// - `FileError::CommitIdDoesNotMatch` when the branch moved past
    ///   `opts.last_commit_id`.
    /// - `ProtectionError` when a changed path is protected.
    #[instrument(skip_all, fields(repo = %repo.full_name(), commit = %opts.commit_id, revert = opts.revert))]
    pub async fn cherry_pick(
        &self,
        repo: &Repository,
        doer: &Principal,
        opts: CherryPickOptions,
        token: &CancellationToken,
    ) -> EngineResult<FileResponse> {
        let (old_branch, new_branch) = default_branches(repo, opts.old_branch.clone(), opts.new_branch.clone())?;
        self.check_branches(repo, &old_branch, &new_branch).await?;

        let identities = identity::resolve(doer, &opts.authorship)?;
        let mut scratch = self.backend.clone_scratch(&repo.path, &old_branch, token).await?;
        let target = Target {
            old_branch: &old_branch,
            new_branch: &new_branch,
        };
        let result = self
            .pick_in_scratch(&mut scratch, repo, doer, target, &opts, &identities)
            .await;
        scratch.close();
        let commit = result?;
        self.commit_only_response(repo, &commit, token).await
    }

    #[allow(clippy::too_many_arguments)]
    async fn pick_in_scratch<X: ScratchRepository>(
        &self,
        scratch: &mut X,
        repo: &Repository,
        doer: &Principal,
        target: Target<'_>,
        opts: &CherryPickOptions,
        identities: &Identities,
    ) -> EngineResult<String> {
        scratch.set_default_index().await?;
        let head = strict_head(&*scratch, target.old_branch, opts.last_commit_id.as_deref()).await?;
        let picked_id = scratch
            .resolve_commit(&opts.commit_id)
            .await?
            .ok_or_else(|| GitError::CommitNotFound {
                commit: opts.commit_id.clone(),
            })?;
        let picked = scratch.commit_info(&picked_id).await?;

        let empty_tree = scratch.object_format().empty_tree();
        let (base, theirs) = merge_sides(&picked, opts.revert, empty_tree);
        debug!(base, ours = %head, theirs, "merging trees");
        scratch.merge_trees(&base, &head, &theirs).await?;

        // Protection applies to what the merge actually changed
        let changed = scratch.changed_paths().await?;
        let paths: Vec<&str> = changed.iter().map(String::as_str).collect();
        verify_branch_protection(repo, doer, target.new_branch, &paths, &self.signer)?;

        let tree = scratch.write_tree().await?;
        let default_message;
        let message = match opts.message.trim() {
            "" if opts.revert => {
                default_message = revert_message(&picked);
                default_message.as_str()
            }
            "" => picked.message.trim(),
            message => message,
        };
        let request = CommitRequest {
            tree,
            parents: vec![head],
            message,
            identities,
            signoff: opts.authorship.signoff,
        };
        self.commit_and_push(scratch, repo, doer, target.new_branch, request).await
    }
}

#[derive(Debug, Clone, Copy)]
struct Target<'a> {
    old_branch: &'a str,
    new_branch: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(parents: &[&str]) -> CommitInfo {
        let mut raw = String::from("tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n");
        for parent in parents {
            raw.push_str(&format!("parent {parent}\n"));
        }
        raw.push_str("author A <a@x> 1700000000 +0000\ncommitter A <a@x> 1700000000 +0000\n\nFix the parser\n\nLong body.\n");
        CommitInfo::parse("cccc", raw.as_bytes()).expect("commit")
    }

    #[test]
    fn test_merge_sides() {
        let picked = commit(&["pppp"]);
        assert_eq!(merge_sides(&picked, false, "empty"), ("pppp".to_string(), "cccc".to_string()));
        assert_eq!(merge_sides(&picked, true, "empty"), ("cccc".to_string(), "pppp".to_string()));
        let root = commit(&[]);
        assert_eq!(merge_sides(&root, false, "empty"), ("empty".to_string(), "cccc".to_string()));
    }

    #[test]
    fn test_revert_message() {
        insta::assert_snapshot!(revert_message(&commit(&["pppp"])), @r#"
        Revert "Fix the parser"

        This reverts commit cccc.
        "#);
    }
}
