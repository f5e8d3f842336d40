// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! LFS pointer files.
//!
//! ```text
//! version https://git-lfs.github.com/spec/v1
//! oid sha256:<64 hex>
//! size <bytes>
//! ```

use std::fmt;
use std::io::{self, Read};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// First line of every pointer file.
pub const POINTER_VERSION: &str = "version https://git-lfs.github.com/spec/v1";

/// Pointer files are never larger than this; bigger blobs are real content.
pub const BLOB_SIZE_CUTOFF: usize = 1024;

const OID_PREFIX: &str = "sha256:";

/// Content address of an LFS object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pointer {
    pub oid: String,
    pub size: u64,
}

impl Pointer {
    /// Hashes `reader` to the end and returns its pointer.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if reading fails.
    pub fn generate<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 8192];
        let mut size = 0u64;
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            size += n as u64;
        }
        Ok(Self {
            oid: hex::encode(hasher.finalize()),
            size,
        })
    }

    /// Pointer of an in-memory buffer.
    #[must_use]
    pub fn from_content(content: &[u8]) -> Self {
        Self {
            oid: hex::encode(Sha256::digest(content)),
            size: content.len() as u64,
        }
    }

    /// Parses pointer file text; `None` when `buf` is not a pointer.
    #[must_use]
    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() > BLOB_SIZE_CUTOFF {
            return None;
        }
        let text = std::str::from_utf8(buf).ok()?;
        let mut lines = text.lines();
        if lines.next()? != POINTER_VERSION {
            return None;
        }

        let mut oid = None;
        let mut size = None;
        for line in lines {
            if let Some(value) = line.strip_prefix("oid ") {
                oid = Some(value.strip_prefix(OID_PREFIX)?.to_string());
            } else if let Some(value) = line.strip_prefix("size ") {
                size = Some(value.trim().parse().ok()?);
            }
        }

        let pointer = Self {
            oid: oid?,
            size: size?,
        };
        pointer.is_valid().then_some(pointer)
    }

    /// True when the oid is 64 lowercase hex digits.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.oid.len() == 64 && self.oid.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Storage path relative to the content store root: `ab/cd/abcd...`.
    #[must_use]
    pub fn relative_path(&self) -> PathBuf {
        if self.oid.len() < 5 {
            return PathBuf::from(&self.oid);
        }
        [&self.oid[0..2], &self.oid[2..4], self.oid.as_str()]
            .iter()
            .collect()
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{POINTER_VERSION}\noid {OID_PREFIX}{}\nsize {}\n",
            self.oid, self.size
        )
    }
}
