// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Git LFS support for the write path.
//!
//! ```text
//! path has filter=lfs?
//!   |
//!   v
//! Lfs::store_content   content --sha256--> Pointer, bytes --> ContentStore
//!   |
//!   v
//! hash_object(pointer text)      staged instead of the content
//!   |
//!   v  (after commit, before push)
//! Lfs::record_new      MetaStore row for (repository, oid)
//!   |
//!   v  push failed?
//! Lfs::forget          rows this commit added are removed again
//! ```
//!
//! The blob is stored before any metadata exists, so a failed store leaves
//! nothing to roll back and a failed metadata write leaves only an
//! unreferenced content-addressed object. Hashing and file writes run on
//! the blocking pool.

pub mod content_store;
pub mod meta;
pub mod pointer;

use std::io::{self, Read, Seek, SeekFrom};

use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

pub use content_store::ContentStore;
pub use meta::{JsonMetaStore, MemoryMetaStore, MetaObject, MetaStore};
pub use pointer::Pointer;

use crate::error::{EngineResult, LfsError};

/// Content store plus metadata store, present only when LFS is enabled.
#[derive(Debug, Clone)]
pub struct Lfs<M> {
    pub store: ContentStore,
    pub meta: M,
}

impl<M: MetaStore> Lfs<M> {
    pub const fn new(store: ContentStore, meta: M) -> Self {
        Self { store, meta }
    }

    /// Hashes `content`, stores it and returns its pointer together with
    /// the content, rewound.
    ///
    /// # Errors
    ///
    /// Returns an `LfsError` if reading or storing fails.
    pub async fn store_content<R>(&self, mut content: R) -> EngineResult<(Pointer, R)>
    where
        R: Read + Seek + Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || {
            let pointer = store_blocking(&store, &mut content)?;
            Ok((pointer, content))
        })
        .await
        .map_err(|e| LfsError::Store {
            oid: String::new(),
            source: io::Error::other(format!("lfs store task failed: {e}")),
        })?
    }

    /// Records that `repository_id` references `pointer`.
    ///
    /// # Errors
    ///
    /// Returns `LfsError::MetaStore` if the row cannot be written.
    pub async fn record(&self, repository_id: i64, pointer: &Pointer) -> EngineResult<MetaObject> {
        let object = self
            .meta
            .create(MetaObject {
                pointer: pointer.clone(),
                repository_id,
            })
            .await?;
        debug!(oid = %pointer.oid, repository_id, "lfs meta object recorded");
        Ok(object)
    }

    /// Records `pointer` unless `repository_id` already references it;
    /// true when a row was added.
    ///
    /// # Errors
    ///
    /// Returns `LfsError::MetaStore` if the store cannot be read or written.
    pub async fn record_new(&self, repository_id: i64, pointer: &Pointer) -> EngineResult<bool> {
        if self.meta.get(repository_id, &pointer.oid).await?.is_some() {
            return Ok(false);
        }
        self.record(repository_id, pointer).await?;
        Ok(true)
    }

    /// Removes the rows for `oids`. Failures are logged, not returned.
    pub async fn forget(&self, repository_id: i64, oids: &[String]) {
        for oid in oids {
            match self.meta.remove(repository_id, oid).await {
                Ok(_) => debug!(oid, repository_id, "lfs meta object removed"),
                Err(e) => warn!(oid, repository_id, error = %e, "failed to remove lfs meta object"),
            }
        }
    }

    /// If `blob` is a pointer known to `repository_id`, the first `limit`
    /// bytes of the real content.
    ///
    /// # Errors
    ///
    /// Returns an `LfsError` if the metadata or the content cannot be read.
    pub async fn resolve_prefix(
        &self,
        repository_id: i64,
        blob: &[u8],
        limit: usize,
    ) -> EngineResult<Option<Vec<u8>>> {
        let Some(pointer) = Pointer::parse(blob) else {
            return Ok(None);
        };
        if self.meta.get(repository_id, &pointer.oid).await?.is_none() {
            return Ok(None);
        }
        let read = async {
            let file = tokio::fs::File::open(self.store.object_path(&pointer)).await?;
            let mut prefix = Vec::with_capacity(limit);
            file.take(limit as u64).read_to_end(&mut prefix).await?;
            Ok::<_, io::Error>(prefix)
        };
        let prefix = read.await.map_err(|source| LfsError::Store {
            oid: pointer.oid.clone(),
            source,
        })?;
        Ok(Some(prefix))
    }
}

/// Rewinds, hashes, stores and rewinds `content` again.
fn store_blocking<R: Read + Seek + ?Sized>(store: &ContentStore, content: &mut R) -> EngineResult<Pointer> {
    let rewind = |content: &mut R| {
        content.seek(SeekFrom::Start(0)).map_err(|source| LfsError::Store {
            oid: String::new(),
            source,
        })
    };
    rewind(content)?;
    let pointer = Pointer::generate(content).map_err(|source| LfsError::Store {
        oid: String::new(),
        source,
    })?;
    rewind(content)?;
    store.put(&pointer, content)?;
    rewind(content)?;
    Ok(pointer)
}

#[cfg(test)]
mod tests;
