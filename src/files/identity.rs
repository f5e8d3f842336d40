// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Author and committer resolution.
//!
//! ```text
//! identity.email == doer.email (any case) --> doer, name overridden if given
//! identity.email set                      --> the identity as given
//! author missing    --> committer, else doer
//! committer missing --> author
//!
//! names and emails with '<', '>' or control characters are refused:
//! they would end the identity early in a commit header or import stream
//! ```

use chrono::{DateTime, FixedOffset, Local};

use super::types::{Authorship, IdentityOptions, Principal};
use crate::error::{EngineResult, FileError};
use crate::git::object::Signature;

/// Concrete signatures for one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identities {
    pub author: Signature,
    pub committer: Signature,
}

#[derive(Debug, Clone)]
struct Person {
    name: String,
    email: String,
}

impl Person {
    fn check(&self, field: &str) -> EngineResult<()> {
        for value in [&self.name, &self.email] {
            if value.chars().any(|c| c == '<' || c == '>' || c.is_control()) {
                return Err(FileError::InvalidIdentity {
                    field: field.to_string(),
                    value: value.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn signature(&self, when: DateTime<FixedOffset>) -> Signature {
        Signature::new(&self.name, &self.email, when)
    }
}

fn person(doer: &Principal, identity: Option<&IdentityOptions>) -> Option<Person> {
    let identity = identity.filter(|i| !i.email.is_empty())?;
    if identity.email.eq_ignore_ascii_case(&doer.email) {
        let name = if identity.name.is_empty() {
            doer.git_name()
        } else {
            &identity.name
        };
        return Some(Person {
            name: name.to_string(),
            email: doer.email.clone(),
        });
    }
    Some(Person {
        name: identity.name.clone(),
        email: identity.email.clone(),
    })
}

/// Resolves the author and committer of a commit made by `doer`.
///
/// Timestamps come from `authorship.dates`, defaulting to one shared "now"
/// in the local zone.
///
/// # Errors
///
/// Returns `FileError::InvalidIdentity` when a resolved name or email holds
/// `<`, `>` or a control character.
pub fn resolve(doer: &Principal, authorship: &Authorship) -> EngineResult<Identities> {
    let committer = person(doer, authorship.committer.as_ref());
    let author = person(doer, authorship.author.as_ref())
        .or_else(|| committer.clone())
        .unwrap_or_else(|| Person {
            name: doer.git_name().to_string(),
            email: doer.email.clone(),
        });
    let committer = committer.unwrap_or_else(|| author.clone());
    author.check("author")?;
    committer.check("committer")?;

    let now = Local::now().fixed_offset();
    Ok(Identities {
        author: author.signature(authorship.dates.author.unwrap_or(now)),
        committer: committer.signature(authorship.dates.committer.unwrap_or(now)),
    })
}
