// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Plain data types shared by every git backend.
//!
//! ```text
//! ObjectFormat  sha1 | sha256      (zero id, empty tree)
//! FileMode      100644 | 100755 | 120000 | 040000 | 160000
//! TreeEntry     path + mode + id + size
//! Signature     name <email> unix-ts ±HHMM
//! CommitInfo    id, tree, parents, author, committer, message
//! ```

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Hash algorithm of a repository's object store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectFormat {
    #[default]
    Sha1,
    Sha256,
}

impl ObjectFormat {
    /// Number of hex digits in an object id.
    #[must_use]
    pub const fn hex_len(self) -> usize {
        match self {
            Self::Sha1 => 40,
            Self::Sha256 => 64,
        }
    }

    /// The all-zero object id used by `update-index --index-info` removals.
    #[must_use]
    pub fn zero_id(self) -> String {
        "0".repeat(self.hex_len())
    }

    /// Id of the empty tree.
    #[must_use]
    pub const fn empty_tree(self) -> &'static str {
        match self {
            Self::Sha1 => "4b825dc642cb6eb9a060e54bf8d69288fbee4904",
            Self::Sha256 => "6ef19b41225c5369f1c104d45d8d85efa9b057b53b14b4b9b939dd74decc5321",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }
}

impl std::fmt::Display for ObjectFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ObjectFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            _ => Err(ConfigError::InvalidValue {
                section: "git".to_string(),
                key: "object_format".to_string(),
                message: format!("expected 'sha1' or 'sha256', got '{s}'"),
            }),
        }
    }
}

/// Mode of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileMode {
    Regular,
    Executable,
    Symlink,
    Tree,
    Submodule,
}

impl FileMode {
    /// Octal mode string as git prints it.
    #[must_use]
    pub const fn as_octal(self) -> &'static str {
        match self {
            Self::Regular => "100644",
            Self::Executable => "100755",
            Self::Symlink => "120000",
            Self::Tree => "040000",
            Self::Submodule => "160000",
        }
    }

    /// Parses an octal mode; trees may appear as `40000` or `040000`.
    #[must_use]
    pub fn from_octal(mode: &str) -> Option<Self> {
        match mode {
            "100644" | "100664" => Some(Self::Regular),
            "100755" => Some(Self::Executable),
            "120000" => Some(Self::Symlink),
            "40000" | "040000" => Some(Self::Tree),
            "160000" => Some(Self::Submodule),
            _ => None,
        }
    }

    /// Mode for a blob, keeping the executable bit.
    #[must_use]
    pub const fn blob(executable: bool) -> Self {
        if executable {
            Self::Executable
        } else {
            Self::Regular
        }
    }
}

/// One entry of a tree, addressed by its full path from the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub mode: FileMode,
    pub id: String,
    /// Blob size; `None` for trees and submodules.
    pub size: Option<u64>,
}

impl TreeEntry {
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.mode == FileMode::Tree
    }

    #[must_use]
    pub fn is_link(&self) -> bool {
        self.mode == FileMode::Symlink
    }

    #[must_use]
    pub fn is_executable(&self) -> bool {
        self.mode == FileMode::Executable
    }

    #[must_use]
    pub fn is_submodule(&self) -> bool {
        self.mode == FileMode::Submodule
    }

    /// Last path segment.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Author or committer identity with a timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub when: DateTime<FixedOffset>,
}

impl Signature {
    pub fn new(name: impl Into<String>, email: impl Into<String>, when: DateTime<FixedOffset>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            when,
        }
    }

    /// `<unix-ts> ±HHMM`, the raw date format git accepts everywhere.
    #[must_use]
    pub fn git_date(&self) -> String {
        format!("{} {}", self.when.timestamp(), self.when.format("%z"))
    }

    /// `Name <email>` without the date.
    #[must_use]
    pub fn identity(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }

    /// True when name and email match, ignoring the date.
    #[must_use]
    pub fn same_identity(&self, other: &Self) -> bool {
        self.name == other.name && self.email == other.email
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}> {}", self.name, self.email, self.git_date())
    }
}

/// Parsed commit object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub id: String,
    pub tree: String,
    pub parents: Vec<String>,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
}

impl CommitInfo {
    /// First line of the message.
    #[must_use]
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

impl Signature {
    /// Parses `Name <email> <unix-ts> ±HHMM` as found in commit headers.
    #[must_use]
    pub fn parse_raw(line: &str) -> Option<Self> {
        let open = line.rfind('<')?;
        let close = open + line[open..].find('>')?;
        let name = line[..open].trim_end();
        let email = &line[open + 1..close];
        let mut date = line[close + 1..].split_whitespace();
        let seconds: i64 = date.next()?.parse().ok()?;
        let offset = parse_offset(date.next().unwrap_or("+0000"))?;
        let when = DateTime::from_timestamp(seconds, 0)?.with_timezone(&offset);
        Some(Self::new(name, email, when))
    }
}

fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let (sign, digits) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

impl CommitInfo {
    /// Parses a raw commit object as printed by `git cat-file commit`.
    ///
    /// Unknown headers such as `gpgsig` are skipped, including their
    /// continuation lines.
    #[must_use]
    pub fn parse(id: &str, raw: &[u8]) -> Option<Self> {
        let text = String::from_utf8_lossy(raw);
        let (headers, message) = text.split_once("\n\n").unwrap_or((&text, ""));

        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;
        for line in headers.lines() {
            if line.starts_with(' ') {
                continue;
            }
            let Some((key, value)) = line.split_once(' ') else {
                continue;
            };
            match key {
                "tree" => tree = Some(value.to_string()),
                "parent" => parents.push(value.to_string()),
                "author" => author = Signature::parse_raw(value),
                "committer" => committer = Signature::parse_raw(value),
                _ => {}
            }
        }

        Some(Self {
            id: id.to_string(),
            tree: tree?,
            parents,
            author: author?,
            committer: committer?,
            message: message.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_format_ids() {
        assert_eq!(ObjectFormat::Sha1.zero_id().len(), 40);
        assert_eq!(ObjectFormat::Sha256.empty_tree().len(), 64);
        assert_eq!("SHA256".parse::<ObjectFormat>().ok(), Some(ObjectFormat::Sha256));
        assert!("md5".parse::<ObjectFormat>().is_err());
    }

    #[test]
    fn test_file_mode_octal() {
        assert_eq!(FileMode::from_octal("40000"), Some(FileMode::Tree));
        assert_eq!(FileMode::from_octal("100755"), Some(FileMode::Executable));
        assert_eq!(FileMode::blob(false).as_octal(), "100644");
        assert_eq!(FileMode::from_octal("777"), None);
    }

    #[test]
    fn test_signature_roundtrip_through_raw() {
        let sig = Signature::parse_raw("Jane Doe <jane@example.com> 1700000000 -0530")
            .expect("valid signature line");
        assert_eq!(sig.name, "Jane Doe");
        assert_eq!(sig.email, "jane@example.com");
        insta::assert_snapshot!(sig.to_string(), @"Jane Doe <jane@example.com> 1700000000 -0530");
    }

    #[test]
    fn test_malformed_offsets_are_rejected() {
        assert!(Signature::parse_raw("A <a@x> 1700000000 +1\u{e9}1").is_none());
        assert!(Signature::parse_raw("A <a@x> 1700000000 ++100").is_none());
        assert!(Signature::parse_raw("A <a@x> 1700000000 +01").is_none());
        assert!(Signature::parse_raw("A <a@x> 1700000000 +0100").is_some());
    }

    #[test]
    fn test_commit_parse_skips_signature_block() {
        let raw = b"tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
parent 1111111111111111111111111111111111111111\n\
author A <a@x> 1700000000 +0000\n\
committer C <c@x> 1700000100 +0100\n\
gpgsig -----BEGIN PGP SIGNATURE-----\n \n -----END PGP SIGNATURE-----\n\
\n\
Subject line\n\nBody\n";
        let info = CommitInfo::parse("abc", raw).expect("commit should parse");
        assert_eq!(info.parents.len(), 1);
        assert_eq!(info.committer.name, "C");
        assert_eq!(info.summary(), "Subject line");
        assert_eq!(info.message, "Subject line\n\nBody\n");
    }

    #[test]
    fn test_tree_entry_name() {
        let entry = TreeEntry {
            path: "dir/sub/file.txt".to_string(),
            mode: FileMode::Regular,
            id: "0".repeat(40),
            size: Some(3),
        };
        assert_eq!(entry.name(), "file.txt");
        assert!(!entry.is_dir());
    }
}
