// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! LFS metadata records: which repository references which object.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use super::pointer::Pointer;
use crate::error::{EngineResult, LfsError};

/// An object referenced by a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaObject {
    pub pointer: Pointer,
    pub repository_id: i64,
}

/// Persistence for [`MetaObject`] rows.
#[allow(async_fn_in_trait)]
pub trait MetaStore {
    /// Looks up the record of `oid` in `repository_id`.
    ///
    /// # Errors
    ///
    /// Returns `LfsError::MetaStore` if the store cannot be queried.
    async fn get(&self, repository_id: i64, oid: &str) -> EngineResult<Option<MetaObject>>;

    /// Inserts a record, returning the existing one if already present.
    ///
    /// # Errors
    ///
    /// Returns `LfsError::MetaStore` if the record cannot be written.
    async fn create(&self, object: MetaObject) -> EngineResult<MetaObject>;

    /// Deletes a record; returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns `LfsError::MetaStore` if the record cannot be removed.
    async fn remove(&self, repository_id: i64, oid: &str) -> EngineResult<bool>;
}

/// Process-local [`MetaStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryMetaStore {
    inner: Arc<Mutex<MemoryMetaInner>>,
}

#[derive(Debug, Default)]
struct MemoryMetaInner {
    rows: BTreeMap<(i64, String), MetaObject>,
    fail_create: Option<String>,
}

impl MemoryMetaStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following `create` fail with `message`.
    pub fn fail_creates(&self, message: impl Into<String>) {
        self.lock().fail_create = Some(message.into());
    }

    /// All records, ordered by repository and oid.
    #[must_use]
    pub fn objects(&self) -> Vec<MetaObject> {
        self.lock().rows.values().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryMetaInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MetaStore for MemoryMetaStore {
    async fn get(&self, repository_id: i64, oid: &str) -> EngineResult<Option<MetaObject>> {
        Ok(self.lock().rows.get(&(repository_id, oid.to_string())).cloned())
    }

    async fn create(&self, object: MetaObject) -> EngineResult<MetaObject> {
        let mut inner = self.lock();
        if let Some(message) = &inner.fail_create {
            return Err(LfsError::MetaStore {
                oid: object.pointer.oid.clone(),
                message: message.clone(),
            }
            .into());
        }
        let key = (object.repository_id, object.pointer.oid.clone());
        Ok(inner.rows.entry(key).or_insert(object).clone())
    }

    async fn remove(&self, repository_id: i64, oid: &str) -> EngineResult<bool> {
        Ok(self
            .lock()
            .rows
            .remove(&(repository_id, oid.to_string()))
            .is_some())
    }
}

/// [`MetaStore`] kept as one JSON array in a file.
///
/// Writes replace the file through a temporary sibling, so a crash leaves
/// either the old or the new rows. Only one process may write at a time.
#[derive(Debug, Clone)]
pub struct JsonMetaStore {
    path: PathBuf,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl JsonMetaStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::default(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn failure(&self, oid: &str, message: impl std::fmt::Display) -> LfsError {
        LfsError::MetaStore {
            oid: oid.to_string(),
            message: format!("{}: {message}", self.path.display()),
        }
    }

    async fn load(&self, oid: &str) -> EngineResult<Vec<MetaObject>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes).map_err(|e| self.failure(oid, e))?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(self.failure(oid, e).into()),
        }
    }

    async fn save(&self, oid: &str, rows: &[MetaObject]) -> EngineResult<()> {
        let bytes = serde_json::to_vec_pretty(rows).map_err(|e| self.failure(oid, e))?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.failure(oid, e))?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| self.failure(oid, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.failure(oid, e))?;
        Ok(())
    }
}

impl MetaStore for JsonMetaStore {
    async fn get(&self, repository_id: i64, oid: &str) -> EngineResult<Option<MetaObject>> {
        let _guard = self.lock.lock().await;
        Ok(self
            .load(oid)
            .await?
            .into_iter()
            .find(|row| row.repository_id == repository_id && row.pointer.oid == oid))
    }

    async fn create(&self, object: MetaObject) -> EngineResult<MetaObject> {
        let _guard = self.lock.lock().await;
        let oid = object.pointer.oid.clone();
        let mut rows = self.load(&oid).await?;
        if let Some(existing) = rows
            .iter()
            .find(|row| row.repository_id == object.repository_id && row.pointer.oid == oid)
        {
            return Ok(existing.clone());
        }
        rows.push(object.clone());
        self.save(&oid, &rows).await?;
        Ok(object)
    }

    async fn remove(&self, repository_id: i64, oid: &str) -> EngineResult<bool> {
        let _guard = self.lock.lock().await;
        let mut rows = self.load(oid).await?;
        let before = rows.len();
        rows.retain(|row| !(row.repository_id == repository_id && row.pointer.oid == oid));
        if rows.len() == before {
            return Ok(false);
        }
        self.save(oid, &rows).await?;
        Ok(true)
    }
}
