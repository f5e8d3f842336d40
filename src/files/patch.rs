// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Unified diff application.
//!
//! ```text
//! patch text --parse--> touched paths --> branch protection
//!     |
//!     v
//! scratch clone: read-tree HEAD, apply --cached, write-tree
//!     |
//!     v
//! commit-tree (parent = head) --> push
//! ```

use std::collections::BTreeSet;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::FileEngine;
use super::commit::CommitRequest;
use super::identity::{self, Identities};
use super::protection::{Signer, verify_branch_protection};
use super::response::FileResponse;
use super::types::{ApplyDiffPatchOptions, Principal, Repository};
use super::update::{default_branches, strict_head};
use crate::error::EngineResult;
use crate::git::backend::{GitBackend, ScratchRepository};
use crate::git::diff::{Diff, DiffLimits, parse_patch};
use crate::lfs::MetaStore;

const DEFAULT_MESSAGE: &str = "Apply patch";

/// Every old and new name the patch mentions.
fn touched_paths(diff: &Diff) -> BTreeSet<&str> {
    diff.files
        .iter()
        .flat_map(|f| [f.name.as_str(), f.old_name.as_str()])
        .filter(|p| !p.is_empty())
        .collect()
}

impl<B: GitBackend, M: MetaStore, S: Signer> FileEngine<B, M, S> {
    /// Applies `opts.content` on top of the old branch as one commit.
    ///
    /// # Errors
    ///
    /// - `FileError::PatchDoesNotApply` when git rejects the patch.
    /// - `FileError::CommitIdDoesNotMatch` when the branch moved past
    ///   `opts.last_commit_id`.
    /// - `ProtectionError` when a path named by the patch or changed by
    ///   applying it is protected.
    #[instrument(skip_all, fields(repo = %repo.full_name(), doer = %doer.name))]
    pub async fn apply_diff_patch(
        &self,
        repo: &Repository,
        doer: &Principal,
        opts: ApplyDiffPatchOptions,
        token: &CancellationToken,
    ) -> EngineResult<FileResponse> {
        let (old_branch, new_branch) = default_branches(repo, opts.old_branch.clone(), opts.new_branch.clone())?;
        self.check_branches(repo, &old_branch, &new_branch).await?;

        let diff = parse_patch(&opts.content, DiffLimits::UNLIMITED, token)?;
        let paths: Vec<&str> = touched_paths(&diff).into_iter().collect();
        debug!(files = paths.len(), "patch parsed");
        verify_branch_protection(repo, doer, &new_branch, &paths, &self.signer)?;

        let identities = identity::resolve(doer, &opts.authorship)?;
        let mut scratch = self.backend.clone_scratch(&repo.path, &old_branch, token).await?;
        let result = self
            .apply_in_scratch(&mut scratch, repo, doer, &old_branch, &new_branch, &opts, &identities)
            .await;
        scratch.close();
        let commit = result?;
        self.commit_only_response(repo, &commit, token).await
    }

    #[allow(clippy::too_many_arguments)]
    async fn apply_in_scratch<X: ScratchRepository>(
        &self,
        scratch: &mut X,
        repo: &Repository,
        doer: &Principal,
        old_branch: &str,
        new_branch: &str,
        opts: &ApplyDiffPatchOptions,
        identities: &Identities,
    ) -> EngineResult<String> {
        scratch.set_default_index().await?;
        let head = strict_head(&*scratch, old_branch, opts.last_commit_id.as_deref()).await?;
        scratch.apply_patch(opts.content.as_bytes()).await?;

        // Git may touch paths the headers never named
        let applied = scratch.changed_paths().await?;
        let applied: Vec<&str> = applied.iter().map(String::as_str).collect();
        verify_branch_protection(repo, doer, new_branch, &applied, &self.signer)?;

        let tree = scratch.write_tree().await?;

        let message = match opts.message.trim() {
            "" => DEFAULT_MESSAGE,
            message => message,
        };
        let request = CommitRequest {
            tree,
            parents: vec![head],
            message,
            identities,
            signoff: opts.authorship.signoff,
        };
        self.commit_and_push(scratch, repo, doer, new_branch, request).await
    }
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::*;

    #[test]
    fn test_touched_paths_include_rename_sources() {
        let patch = "\
diff --git a/old.txt b/new.txt
similarity index 90%
rename from old.txt
rename to new.txt
diff --git a/src/lib.rs b/src/lib.rs
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1 +1 @@
-a
+b
";
        let diff = parse_patch(patch, DiffLimits::UNLIMITED, &CancellationToken::new()).expect("parse");
        let paths: Vec<&str> = touched_paths(&diff).into_iter().collect();
        assert_eq!(paths, ["new.txt", "old.txt", "src/lib.rs"]);
    }
}
