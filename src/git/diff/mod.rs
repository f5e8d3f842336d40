// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Unified diff parser for previews.
//!
//! ```text
//! diff --git a/x b/x        --> DiffFile { name, old_name, kind, is_bin }
//! @@ -l,n +r,m @@ heading   --> DiffSection, first line kind = Section
//!  ctx / +add / -del        --> DiffLine { kind, left_index, right_index }
//!
//! Limits (from [diff]):
//!   max_files            further files dropped, Diff::is_incomplete
//!   max_lines            per file, rest of the file dropped, DiffFile::is_incomplete
//!   max_line_characters  line truncated, DiffFile::is_incomplete_line_too_long
//! ```

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::{EngineError, EngineResult};

/// Lines between cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 4096;

/// Size limits applied while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffLimits {
    pub max_lines: usize,
    pub max_line_characters: usize,
    pub max_files: usize,
}

impl DiffLimits {
    /// No truncation; used when every touched path must be seen.
    pub const UNLIMITED: Self = Self {
        max_lines: usize::MAX,
        max_line_characters: usize::MAX,
        max_files: usize::MAX,
    };
}

impl Default for DiffLimits {
    fn default() -> Self {
        Self {
            max_lines: 1000,
            max_line_characters: 5000,
            max_files: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffLineKind {
    Plain,
    Add,
    Del,
    /// The `@@` hunk header.
    Section,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    /// 1-based line in the old file; `None` for additions and headers.
    pub left_index: Option<u32>,
    /// 1-based line in the new file; `None` for deletions and headers.
    pub right_index: Option<u32>,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffSection {
    pub lines: Vec<DiffLine>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffFileKind {
    Add,
    #[default]
    Modify,
    Delete,
    Rename,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffFile {
    pub name: String,
    pub old_name: String,
    pub kind: DiffFileKind,
    pub is_bin: bool,
    pub additions: usize,
    pub deletions: usize,
    pub sections: Vec<DiffSection>,
    pub is_incomplete: bool,
    pub is_incomplete_line_too_long: bool,
}

impl DiffFile {
    fn line_count(&self) -> usize {
        self.sections.iter().map(|s| s.lines.len()).sum()
    }
}

/// Parsed diff of one or more files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diff {
    pub files: Vec<DiffFile>,
    pub total_additions: usize,
    pub total_deletions: usize,
    pub is_incomplete: bool,
}

/// Parses `git diff -p` output.
///
/// # Errors
///
/// Returns [`EngineError::Cancelled`] if `token` fires while parsing.
pub fn parse_patch(patch: &str, limits: DiffLimits, token: &CancellationToken) -> EngineResult<Diff> {
    let mut diff = Diff::default();
    let mut current: Option<DiffFile> = None;
    let mut left = 0u32;
    let mut right = 0u32;
    let mut skipping = false;

    for (n, line) in patch.lines().enumerate() {
        if n % CANCEL_CHECK_INTERVAL == 0 && token.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        if let Some(rest) = line.strip_prefix("diff --git ") {
            if let Some(file) = current.take() {
                finish_file(&mut diff, file);
            }
            if diff.files.len() >= limits.max_files {
                diff.is_incomplete = true;
                return Ok(diff);
            }
            let (old_name, name) = split_header_names(rest);
            current = Some(DiffFile {
                name,
                old_name,
                ..DiffFile::default()
            });
            skipping = false;
            continue;
        }

        let Some(file) = current.as_mut() else {
            continue;
        };

        if let Some(hunk) = line.strip_prefix("@@ ") {
            if skipping {
                continue;
            }
            let (l, r) = parse_hunk_start(hunk);
            left = l;
            right = r;
            file.sections.push(DiffSection {
                lines: vec![DiffLine {
                    kind: DiffLineKind::Section,
                    left_index: None,
                    right_index: None,
                    content: line.to_string(),
                }],
            });
            continue;
        }

        if file.sections.is_empty() {
            read_extended_header(file, line);
            continue;
        }
        if skipping {
            count_skipped(file, line);
            continue;
        }
        if file.line_count() >= limits.max_lines {
            file.is_incomplete = true;
            skipping = true;
            count_skipped(file, line);
            continue;
        }

        let (kind, left_index, right_index) = match line.as_bytes().first() {
            Some(b'+') => {
                file.additions += 1;
                right += 1;
                (DiffLineKind::Add, None, Some(right - 1))
            }
            Some(b'-') => {
                file.deletions += 1;
                left += 1;
                (DiffLineKind::Del, Some(left - 1), None)
            }
            Some(b'\\') => continue,
            _ => {
                left += 1;
                right += 1;
                (DiffLineKind::Plain, Some(left - 1), Some(right - 1))
            }
        };

        let mut content = line.to_string();
        if content.chars().count() > limits.max_line_characters {
            content = content.chars().take(limits.max_line_characters).collect();
            file.is_incomplete = true;
            file.is_incomplete_line_too_long = true;
        }
        if let Some(section) = file.sections.last_mut() {
            section.lines.push(DiffLine {
                kind,
                left_index,
                right_index,
                content,
            });
        }
    }

    if let Some(file) = current.take() {
        finish_file(&mut diff, file);
    }
    Ok(diff)
}

fn finish_file(diff: &mut Diff, file: DiffFile) {
    diff.total_additions += file.additions;
    diff.total_deletions += file.deletions;
    diff.files.push(file);
}

fn count_skipped(file: &mut DiffFile, line: &str) {
    match line.as_bytes().first() {
        Some(b'+') => file.additions += 1,
        Some(b'-') => file.deletions += 1,
        _ => {}
    }
}

fn read_extended_header(file: &mut DiffFile, line: &str) {
    if line.starts_with("new file mode") {
        file.kind = DiffFileKind::Add;
    } else if line.starts_with("deleted file mode") {
        file.kind = DiffFileKind::Delete;
    } else if let Some(from) = line.strip_prefix("rename from ") {
        file.kind = DiffFileKind::Rename;
        file.old_name = from.to_string();
    } else if let Some(to) = line.strip_prefix("rename to ") {
        file.kind = DiffFileKind::Rename;
        file.name = to.to_string();
    } else if line.starts_with("Binary files ") || line == "GIT binary patch" {
        file.is_bin = true;
    } else if let Some(old) = line.strip_prefix("--- ") {
        if let Some(name) = strip_side(old, "a/") {
            file.old_name = name;
        }
    } else if let Some(new) = line.strip_prefix("+++ ")
        && let Some(name) = strip_side(new, "b/")
    {
        file.name = name;
    }
}

fn strip_side(raw: &str, prefix: &str) -> Option<String> {
    if raw == "/dev/null" {
        return None;
    }
    Some(raw.strip_prefix(prefix).unwrap_or(raw).trim_end().to_string())
}

/// Splits `a/<old> b/<new>`, preferring the split where both sides agree.
fn split_header_names(rest: &str) -> (String, String) {
    let Some(rest) = rest.strip_prefix("a/") else {
        return (rest.to_string(), rest.to_string());
    };
    let candidates: Vec<usize> = rest.match_indices(" b/").map(|(i, _)| i).collect();
    let pick = candidates
        .iter()
        .copied()
        .find(|&i| rest[..i] == rest[i + 3..])
        .or_else(|| candidates.first().copied());
    match pick {
        Some(i) => (rest[..i].to_string(), rest[i + 3..].to_string()),
        None => (rest.to_string(), rest.to_string()),
    }
}

/// Starting line numbers from `-l,n +r,m @@`.
fn parse_hunk_start(hunk: &str) -> (u32, u32) {
    let mut left = 1;
    let mut right = 1;
    for part in hunk.split_whitespace().take(2) {
        let number = |s: &str| s.split(',').next().and_then(|n| n.parse::<u32>().ok());
        if let Some(l) = part.strip_prefix('-').and_then(number) {
            left = l.max(1);
        } else if let Some(r) = part.strip_prefix('+').and_then(number) {
            right = r.max(1);
        }
    }
    (left, right)
}

#[cfg(test)]
mod tests;
