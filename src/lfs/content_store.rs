// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Content-addressed LFS object store on the local filesystem.
//!
//! ```text
//! put(pointer, reader)
//!   exists?  --yes--> done (same oid, same bytes)
//!      | no
//!      v
//!   <base>/ab/cd/.tmpXXXX   <-- copy + sha256
//!      |  size and hash verified
//!      v
//!   persist -> <base>/ab/cd/abcd...
//! ```
//!
//! Writes go through a temporary file in the destination directory, so a
//! reader never observes a partial object and concurrent writers of the same
//! oid both end with an identical file.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::debug;

use super::pointer::Pointer;
use crate::error::{EngineResult, LfsError};

#[derive(Debug, Clone)]
pub struct ContentStore {
    base: PathBuf,
}

impl ContentStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Absolute path of the object for `pointer`.
    #[must_use]
    pub fn object_path(&self, pointer: &Pointer) -> PathBuf {
        self.base.join(pointer.relative_path())
    }

    /// True when the object is stored with the expected size.
    ///
    /// # Errors
    ///
    /// Returns `LfsError::Store` on I/O errors other than not-found.
    pub fn exists(&self, pointer: &Pointer) -> EngineResult<bool> {
        match fs::metadata(self.object_path(pointer)) {
            Ok(meta) => Ok(meta.is_file() && meta.len() == pointer.size),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(store_error(pointer, source)),
        }
    }

    /// Stores the bytes of `reader` under `pointer`, verifying size and hash.
    ///
    /// Storing an oid that is already present is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `LfsError::SizeMismatch` or `LfsError::HashMismatch` when the
    /// content does not match the pointer, `LfsError::Store` on I/O errors.
    pub fn put<R: Read + ?Sized>(&self, pointer: &Pointer, reader: &mut R) -> EngineResult<()> {
        if self.exists(pointer)? {
            debug!(oid = %pointer.oid, "lfs object already stored");
            return Ok(());
        }

        let path = self.object_path(pointer);
        let dir = path.parent().unwrap_or(&self.base);
        fs::create_dir_all(dir).map_err(|e| store_error(pointer, e))?;

        let mut temp = NamedTempFile::new_in(dir).map_err(|e| store_error(pointer, e))?;
        let mut hasher = Sha256::new();
        let mut written = 0u64;
        let mut buf = [0u8; 8192];
        loop {
            let n = reader.read(&mut buf).map_err(|e| store_error(pointer, e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            temp.write_all(&buf[..n]).map_err(|e| store_error(pointer, e))?;
            written += n as u64;
        }

        if written != pointer.size {
            return Err(LfsError::SizeMismatch {
                oid: pointer.oid.clone(),
                expected: pointer.size,
                actual: written,
            }
            .into());
        }
        let actual = hex::encode(hasher.finalize());
        if actual != pointer.oid {
            return Err(LfsError::HashMismatch {
                oid: pointer.oid.clone(),
                actual,
            }
            .into());
        }

        temp.as_file().sync_all().map_err(|e| store_error(pointer, e))?;
        temp.persist(&path).map_err(|e| store_error(pointer, e.error))?;
        debug!(oid = %pointer.oid, size = pointer.size, "lfs object stored");
        Ok(())
    }

    /// Opens the stored object for reading.
    ///
    /// # Errors
    ///
    /// Returns `LfsError::Store` if the object is missing or unreadable.
    pub fn open(&self, pointer: &Pointer) -> EngineResult<File> {
        File::open(self.object_path(pointer)).map_err(|e| store_error(pointer, e))
    }
}

fn store_error(pointer: &Pointer, source: io::Error) -> crate::error::EngineError {
    LfsError::Store {
        oid: pointer.oid.clone(),
        source,
    }
    .into()
}
