// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Branch protection.
//!
//! ```text
//! rule = exact rule name == branch, else first glob rule matching branch
//!
//! for path in touched paths:
//!   !can_push(doer) && !unprotected(path)  --> UserCannotCommit
//!   protected(path)                        --> ProtectedFile
//! rule.require_signed_commits:
//!   signer says Skip   --> UserCannotCommit
//!   signer fails       --> error as returned
//! ```
//!
//! File patterns are `;`-separated globs matched against the lowercased
//! path.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;
use wax::{Glob, Program as _};

use super::types::{IdentityOptions, Principal, Repository};
use crate::error::{EngineResult, ProtectionError};

/// Who may push to a protected branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushAccess {
    Nobody,
    #[default]
    Everyone,
    /// Only these principal ids.
    Whitelist(BTreeSet<i64>),
}

/// One protection rule; `rule_name` is a branch name or a glob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectedBranchRule {
    pub rule_name: String,
    pub push: PushAccess,
    pub protected_file_patterns: String,
    pub unprotected_file_patterns: String,
    pub require_signed_commits: bool,
}

impl ProtectedBranchRule {
    pub fn new(rule_name: impl Into<String>) -> Self {
        Self {
            rule_name: rule_name.into(),
            ..Self::default()
        }
    }

    fn matches_branch(&self, branch: &str) -> bool {
        glob_match(&self.rule_name, branch)
    }

    #[must_use]
    pub fn can_push(&self, doer: &Principal) -> bool {
        match &self.push {
            PushAccess::Nobody => false,
            PushAccess::Everyone => true,
            PushAccess::Whitelist(ids) => ids.contains(&doer.id),
        }
    }

    #[must_use]
    pub fn is_protected_file(&self, path: &str) -> bool {
        matches_any(&self.protected_file_patterns, path)
    }

    #[must_use]
    pub fn is_unprotected_file(&self, path: &str) -> bool {
        matches_any(&self.unprotected_file_patterns, path)
    }
}

fn glob_match(pattern: &str, candidate: &str) -> bool {
    Glob::new(pattern).is_ok_and(|glob| glob.is_match(candidate))
}

fn matches_any(patterns: &str, path: &str) -> bool {
    let path = path.to_lowercase();
    patterns
        .split(';')
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .any(|p| glob_match(&p, &path))
}

/// First rule protecting `branch`: an exact name wins over globs.
#[must_use]
pub fn find_rule<'a>(rules: &'a [ProtectedBranchRule], branch: &str) -> Option<&'a ProtectedBranchRule> {
    rules
        .iter()
        .find(|r| r.rule_name == branch)
        .or_else(|| rules.iter().find(|r| r.matches_branch(branch)))
}

// --- Signing ---

/// Outcome of asking whether a commit can be signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignDecision {
    /// Sign with `key`; `signer` becomes committer under committer trust.
    Sign { key: String, signer: IdentityOptions },
    /// Policy declined to sign.
    Skip { reason: String },
}

/// Decides whether commits by `doer` on `branch` get signed.
///
/// Returning `Err` means the signing infrastructure itself failed.
pub trait Signer {
    /// # Errors
    ///
    /// Returns an error when the decision cannot be made.
    fn decide(&self, repo: &Repository, doer: &Principal, branch: &str) -> EngineResult<SignDecision>;
}

/// Signer for installations without signing keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverSign;

impl Signer for NeverSign {
    fn decide(&self, _repo: &Repository, _doer: &Principal, _branch: &str) -> EngineResult<SignDecision> {
        Ok(SignDecision::Skip {
            reason: "no signing key configured".to_string(),
        })
    }
}

/// Signs every commit with one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySigner {
    pub key: String,
    pub identity: IdentityOptions,
}

impl Signer for KeySigner {
    fn decide(&self, _repo: &Repository, _doer: &Principal, _branch: &str) -> EngineResult<SignDecision> {
        Ok(SignDecision::Sign {
            key: self.key.clone(),
            signer: self.identity.clone(),
        })
    }
}

// --- Verification ---

/// Checks that `doer` may commit `paths` to `branch`.
///
/// # Errors
///
/// Returns `ProtectionError::UserCannotCommit` or
/// `ProtectionError::ProtectedFile`, or whatever error the signer reports.
pub fn verify_branch_protection<S: Signer + ?Sized>(
    repo: &Repository,
    doer: &Principal,
    branch: &str,
    paths: &[&str],
    signer: &S,
) -> EngineResult<()> {
    let Some(rule) = find_rule(&repo.protected_branches, branch) else {
        return Ok(());
    };
    debug!(branch, rule = %rule.rule_name, "branch is protected");

    let can_push = rule.can_push(doer);
    for path in paths {
        if !can_push && !rule.is_unprotected_file(path) {
            return Err(cannot_commit(doer, branch));
        }
        if rule.is_protected_file(path) {
            return Err(ProtectionError::ProtectedFile {
                path: (*path).to_string(),
                branch: branch.to_string(),
            }
            .into());
        }
    }

    if rule.require_signed_commits {
        if let SignDecision::Skip { reason } = signer.decide(repo, doer, branch)? {
            debug!(branch, reason, "signed commits required but signer declined");
            return Err(cannot_commit(doer, branch));
        }
    }
    Ok(())
}

fn cannot_commit(doer: &Principal, branch: &str) -> crate::error::EngineError {
    ProtectionError::UserCannotCommit {
        user: doer.name.to_lowercase(),
        branch: branch.to_string(),
    }
    .into()
}

/// True when `branch` has a rule demanding signed commits.
#[must_use]
pub fn requires_signed_commits(repo: &Repository, branch: &str) -> bool {
    find_rule(&repo.protected_branches, branch).is_some_and(|r| r.require_signed_commits)
}
