// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tree path normalisation and branch name checks.

/// Rebases `name` at the repository root and resolves `.` and `..`.
///
/// Returns `None` when nothing is left or when any segment is `.git`
/// (compared case-insensitively).
#[must_use]
pub fn clean_upload_file_name(name: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in name.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    let cleaned = parts.join("/");
    let cleaned = cleaned.trim_matches(|c| c == ' ' || c == '/');
    if cleaned.is_empty() {
        return None;
    }
    if cleaned
        .split('/')
        .any(|segment| segment.eq_ignore_ascii_case(".git"))
    {
        return None;
    }
    Some(cleaned.to_string())
}

/// True when `refs/heads/<name>` is a ref git would accept.
///
/// Follows `git check-ref-format --branch`: no control characters, space,
/// `~ ^ : ? * [ \`, no `..` or `@{`, no component starting with `.` or
/// ending in `.lock`, no leading `-`, no empty component, no trailing `.`.
#[must_use]
pub fn is_valid_branch_name(name: &str) -> bool {
    if name.is_empty() || name == "@" || name.starts_with('-') || name.ends_with('.') {
        return false;
    }
    if name.contains("..") || name.contains("@{") {
        return false;
    }
    let forbidden = |c: char| c.is_control() || matches!(c, ' ' | '~' | '^' | ':' | '?' | '*' | '[' | '\\');
    if name.chars().any(forbidden) {
        return false;
    }
    name.split('/')
        .all(|part| !part.is_empty() && !part.starts_with('.') && !part.ends_with(".lock"))
}
