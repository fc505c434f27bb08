// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Content-addressed blob storage.
//!
//! Blobs are keyed by the lowercase hex SHA-256 of their content. Storing
//! the same bytes twice yields the same key and a single stored copy.
//! [`BlobFacade`] adds the persistent `blobs` index on top of a
//! [`BlobStore`] so uploads can be deduplicated before touching the store.
//!
//! Content is only removed while nothing in `blob_refs` points at it. The
//! reference check and the index removal share one write transaction, and
//! the facade lock keeps uploads from re-indexing a hash while its content
//! is being removed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, RwLock};
use utoipa::ToSchema;
use uuid::Uuid;

use super::database::{DbError, RegistryDatabase, TableRead, BLOBS, BLOB_REFS};
use super::StoragePaths;

/// Error type for blob operations.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("store returned {returned} for content hashed as {expected}")]
    HashMismatch { expected: String, returned: String },

    #[error("blob i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blob index error: {0}")]
    Index(#[from] DbError),
}

pub type BlobResult<T> = Result<T, BlobError>;

/// Lowercase hex SHA-256 of `content`.
pub fn content_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Metadata about a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BlobRecord {
    pub cid: String,
    /// Gateway URL the blob can be fetched from.
    pub uri: String,
    /// File extension without the dot, e.g. `pt` or `h5`.
    pub extension: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

/// Key-value blob store keyed by content hash.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Store `content` and return its content hash. Idempotent.
    async fn add(&self, content: &[u8]) -> BlobResult<String>;

    /// Fetch stored content.
    async fn get(&self, cid: &str) -> BlobResult<Vec<u8>>;

    /// Unpin content. Returns whether anything was removed.
    async fn remove(&self, cid: &str) -> BlobResult<bool>;
}

// =============================================================================
// Filesystem store
// =============================================================================

/// Blobs as files under `{data_dir}/blobs/{shard}/{cid}`.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    paths: StoragePaths,
}

impl FsBlobStore {
    pub fn new(paths: StoragePaths) -> Self {
        Self { paths }
    }

    fn path(&self, cid: &str) -> BlobResult<PathBuf> {
        if cid.is_empty() || !cid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(BlobError::NotFound(cid.to_string()));
        }
        Ok(self.paths.blob(cid))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn add(&self, content: &[u8]) -> BlobResult<String> {
        let cid = content_hash(content);
        let path = self.path(&cid)?;
        if tokio::fs::try_exists(&path).await? {
            return Ok(cid);
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write to a unique temp file first, then rename for atomicity
        let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&temp_path, content).await?;
        tokio::fs::rename(&temp_path, &path).await?;

        Ok(cid)
    }

    async fn get(&self, cid: &str) -> BlobResult<Vec<u8>> {
        let path = self.path(cid)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(cid.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, cid: &str) -> BlobResult<bool> {
        let path = self.path(cid)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// In-process store. Counts physical writes so dedup can be observed.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    writes: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times content was physically stored.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn contains(&self, cid: &str) -> bool {
        self.blobs.read().await.contains_key(cid)
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn add(&self, content: &[u8]) -> BlobResult<String> {
        let cid = content_hash(content);
        let mut blobs = self.blobs.write().await;
        if !blobs.contains_key(&cid) {
            blobs.insert(cid.clone(), content.to_vec());
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(cid)
    }

    async fn get(&self, cid: &str) -> BlobResult<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(cid)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(cid.to_string()))
    }

    async fn remove(&self, cid: &str) -> BlobResult<bool> {
        Ok(self.blobs.write().await.remove(cid).is_some())
    }
}

// =============================================================================
// Facade
// =============================================================================

/// Deduplicating front for a [`BlobStore`].
#[derive(Clone)]
pub struct BlobFacade {
    store: Arc<dyn BlobStore>,
    gateway_url: String,
    lock: Arc<Mutex<()>>,
}

impl BlobFacade {
    pub fn new(store: Arc<dyn BlobStore>, gateway_url: impl Into<String>) -> Self {
        Self {
            store,
            gateway_url: gateway_url.into().trim_end_matches('/').to_string(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Public fetch URL for a content hash.
    pub fn url_for(&self, cid: &str) -> String {
        format!("{}/{cid}", self.gateway_url)
    }

    /// Look up an indexed blob.
    pub fn record(&self, db: &RegistryDatabase, cid: &str) -> BlobResult<Option<BlobRecord>> {
        Ok(db.read(|tx| tx.get(BLOBS, cid))?)
    }

    /// Store `content` unless a blob with the same hash is already indexed.
    pub async fn upload(
        &self,
        db: &RegistryDatabase,
        content: &[u8],
        extension: &str,
        now: DateTime<Utc>,
    ) -> BlobResult<BlobRecord> {
        let cid = content_hash(content);
        let _guard = self.lock.lock().await;
        if let Some(existing) = self.record(db, &cid)? {
            tracing::debug!(cid = %cid, "Blob already stored, skipping upload");
            return Ok(existing);
        }

        let returned = self.store.add(content).await?;
        if returned != cid {
            return Err(BlobError::HashMismatch {
                expected: cid,
                returned,
            });
        }

        let record = BlobRecord {
            uri: self.url_for(&cid),
            cid,
            extension: extension.trim_start_matches('.').to_string(),
            size: content.len() as u64,
            created_at: now,
        };
        db.write(|tx| tx.put(BLOBS, &record.cid, &record))?;
        tracing::info!(cid = %record.cid, size = record.size, "Stored blob");
        Ok(record)
    }

    pub async fn fetch(&self, cid: &str) -> BlobResult<Vec<u8>> {
        self.store.get(cid).await
    }

    /// Remove content that no holder references any more.
    ///
    /// Returns `false` without touching the store while `blob_refs` still
    /// lists a holder for `cid`. Otherwise the index entry is dropped and
    /// the result says whether the store had the content.
    pub async fn unpin_unreferenced(&self, db: &RegistryDatabase, cid: &str) -> BlobResult<bool> {
        let _guard = self.lock.lock().await;
        let unreferenced = db.write(|tx| -> Result<bool, DbError> {
            let holders: Vec<(String, String)> = tx.scan(BLOB_REFS, cid)?;
            if !holders.is_empty() {
                return Ok(false);
            }
            tx.remove(BLOBS, cid)?;
            Ok(true)
        })?;
        if !unreferenced {
            tracing::debug!(cid = %cid, "Blob still referenced, keeping it");
            return Ok(false);
        }

        let removed = self.store.remove(cid).await?;
        tracing::info!(cid = %cid, removed, "Unpinned blob");
        Ok(removed)
    }
}
