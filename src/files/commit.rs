// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Commit message and `commit-tree` arguments.
//!
//! ```text
//! <message>\n
//! [\nCo-authored-by: <author>\nCo-committed-by: <committer>\n]   signed, committer trust,
//!                                                                author != committer
//! [\nSigned-off-by: <committer>\n]                                signoff
//! ```

use tracing::warn;

use super::EngineSettings;
use super::identity::Identities;
use super::protection::{SignDecision, Signer};
use super::types::{OperationKind, Principal, Repository};
use crate::git::backend::{CommitTreeOptions, PushEnv};
use crate::git::object::Signature;

/// Trims the caller's message, or builds the default one.
pub(crate) fn normalize_message(message: &str, files: &[(OperationKind, &str)]) -> String {
    let trimmed = message.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    match files {
        [(kind, path)] => format!("{} '{path}'", kind.verb()),
        _ => "Update files".to_string(),
    }
}

/// What goes into one commit, before signing is decided.
#[derive(Debug)]
pub(crate) struct CommitRequest<'a> {
    pub(crate) tree: String,
    pub(crate) parents: Vec<String>,
    pub(crate) message: &'a str,
    pub(crate) identities: &'a Identities,
    pub(crate) signoff: bool,
}

/// Builds the full `commit-tree` request, asking `signer` whether to sign.
///
/// A failing signer is logged and the commit is made unsigned; branches that
/// demand signatures were already checked by branch protection.
pub(crate) fn tree_options<S: Signer + ?Sized>(
    repo: &Repository,
    doer: &Principal,
    signer: &S,
    branch: &str,
    request: CommitRequest<'_>,
) -> CommitTreeOptions {
    let decision = signer.decide(repo, doer, branch).unwrap_or_else(|e| {
        warn!(branch, error = %e, "signing decision failed, committing unsigned");
        SignDecision::Skip {
            reason: e.to_string(),
        }
    });

    let author = request.identities.author.clone();
    let mut committer = request.identities.committer.clone();
    let mut body = format!("{}\n", request.message);
    let sign_key = match decision {
        SignDecision::Sign { key, signer } => {
            if repo.trust_model.signer_commits() {
                if !author.same_identity(&committer) {
                    body.push_str(&format!(
                        "\nCo-authored-by: {}\nCo-committed-by: {}\n",
                        author.identity(),
                        committer.identity()
                    ));
                }
                committer = Signature::new(signer.name, signer.email, committer.when);
            }
            Some(key)
        }
        SignDecision::Skip { .. } => None,
    };
    if request.signoff {
        body.push_str(&signoff_trailer(&committer));
    }

    CommitTreeOptions {
        tree: request.tree,
        parents: request.parents,
        message: body,
        author,
        committer,
        sign_key,
    }
}

/// Message for commits that cannot be signed, such as fast-import ones.
pub(crate) fn unsigned_message(message: &str, committer: &Signature, signoff: bool) -> String {
    let mut body = format!("{message}\n");
    if signoff {
        body.push_str(&signoff_trailer(committer));
    }
    body
}

fn signoff_trailer(committer: &Signature) -> String {
    format!("\nSigned-off-by: {}\n", committer.identity())
}

/// Hook environment for a push by `doer`.
pub(crate) fn push_env(settings: &EngineSettings, repo: &Repository, doer: &Principal) -> PushEnv {
    PushEnv {
        prefix: settings.hook_env_prefix.clone(),
        pusher_id: doer.id,
        pusher_name: doer.name.clone(),
        pusher_email: doer.email.clone(),
        repo_owner: repo.owner_name.clone(),
        repo_name: repo.name.clone(),
        repo_id: repo.id,
    }
}
