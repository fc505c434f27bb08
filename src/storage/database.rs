// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded registry database backed by redb (pure Rust, ACID).
//!
//! Every table maps a string key to a JSON-serialized value. Secondary
//! indexes use composite `parent/child` keys so that all children of a
//! parent are one prefix range scan away.
//!
//! ## Table Layout
//!
//! - `users`: wallet → User
//! - `usernames`: username → wallet
//! - `repositories`: repo_hash → Repository
//! - `repo_names`: `owner/name` → repo_hash
//! - `branches`: branch_hash → Branch
//! - `repo_branches`: `repo_hash/branch_name` → branch_hash
//! - `commits`: commit_hash → Commit
//! - `branch_commits`: `branch_hash/{sequence:020}` → commit_hash
//! - `blob_refs`: `cid/holder` → holder (blob reference count; the holder is
//!   the repository, commit or branch hash referencing the content)
//! - `blobs`: cid → BlobRecord
//!
//! A write closure runs inside one redb write transaction. redb serializes
//! writers, so a read-check-write sequence inside one closure is atomic.

use std::path::Path;
use std::sync::Arc;

use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;

/// Table keyed by string with a JSON value.
pub type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;

// =============================================================================
// Table Definitions
// =============================================================================

pub const USERS: JsonTable = TableDefinition::new("users");
pub const USERNAMES: JsonTable = TableDefinition::new("usernames");
pub const REPOSITORIES: JsonTable = TableDefinition::new("repositories");
pub const REPO_NAMES: JsonTable = TableDefinition::new("repo_names");
pub const BRANCHES: JsonTable = TableDefinition::new("branches");
pub const REPO_BRANCHES: JsonTable = TableDefinition::new("repo_branches");
pub const COMMITS: JsonTable = TableDefinition::new("commits");
pub const BRANCH_COMMITS: JsonTable = TableDefinition::new("branch_commits");
pub const BLOB_REFS: JsonTable = TableDefinition::new("blob_refs");
pub const BLOBS: JsonTable = TableDefinition::new("blobs");

const ALL_TABLES: [JsonTable; 10] = [
    USERS,
    USERNAMES,
    REPOSITORIES,
    REPO_NAMES,
    BRANCHES,
    REPO_BRANCHES,
    COMMITS,
    BRANCH_COMMITS,
    BLOB_REFS,
    BLOBS,
];

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Key Helpers
// =============================================================================

/// Build a composite `parent/child` key.
pub fn composite_key(parent: &str, child: &str) -> String {
    format!("{parent}/{child}")
}

/// Key of a commit in the `branch_commits` index. Zero-padded so that
/// lexicographic order equals sequence order.
pub fn sequence_key(branch_hash: &str, sequence: u64) -> String {
    format!("{branch_hash}/{sequence:020}")
}

/// Exclusive upper bound for all keys starting with `parent/`.
fn prefix_bounds(parent: &str) -> (String, String) {
    // '0' is the byte after '/'
    (format!("{parent}/"), format!("{parent}0"))
}

fn get_json<T, V>(table: &T, key: &str) -> DbResult<Option<V>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
    V: DeserializeOwned,
{
    match table.get(key)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

fn scan_json<T, V>(table: &T, parent: &str) -> DbResult<Vec<(String, V)>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
    V: DeserializeOwned,
{
    let (start, end) = prefix_bounds(parent);
    let mut out = Vec::new();
    for entry in table.range(start.as_str()..end.as_str())? {
        let (key, value) = entry?;
        out.push((key.value().to_string(), serde_json::from_slice(value.value())?));
    }
    Ok(out)
}

// =============================================================================
// RegistryDatabase
// =============================================================================

/// Embedded ACID registry database. Clones share the same handle.
#[derive(Clone)]
pub struct RegistryDatabase {
    db: Arc<Database>,
}

impl std::fmt::Debug for RegistryDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryDatabase").finish_non_exhaustive()
    }
}

impl RegistryDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        for table in ALL_TABLES {
            let _ = write_txn.open_table(table)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Run `f` against a consistent snapshot.
    pub fn read<T, E>(&self, f: impl FnOnce(&ReadCtx) -> Result<T, E>) -> Result<T, E>
    where
        E: From<DbError>,
    {
        let txn = self.db.begin_read().map_err(DbError::from)?;
        f(&ReadCtx { txn })
    }

    /// Run `f` inside one write transaction.
    ///
    /// The transaction commits only when `f` returns `Ok`; on `Err` every
    /// write made by `f` is discarded.
    pub fn write<T, E>(&self, f: impl FnOnce(&WriteCtx) -> Result<T, E>) -> Result<T, E>
    where
        E: From<DbError>,
    {
        let txn = self.db.begin_write().map_err(DbError::from)?;
        let value = f(&WriteCtx { txn: &txn })?;
        txn.commit().map_err(DbError::from)?;
        Ok(value)
    }

    /// Open a read transaction and touch a table.
    pub fn health_check(&self) -> DbResult<()> {
        self.read(|tx| tx.contains(USERS, "").map(|_| ()))
    }
}

/// Lookups shared by read and write transactions.
pub trait TableRead {
    /// Look up a single value.
    fn get<V: DeserializeOwned>(&self, table: JsonTable, key: &str) -> DbResult<Option<V>>;

    /// All `(key, value)` pairs whose key starts with `parent/`, in key order.
    fn scan<V: DeserializeOwned>(&self, table: JsonTable, parent: &str)
        -> DbResult<Vec<(String, V)>>;

    fn contains(&self, table: JsonTable, key: &str) -> DbResult<bool> {
        Ok(self.get::<IgnoredAny>(table, key)?.is_some())
    }
}

/// Read-only view inside [`RegistryDatabase::read`].
pub struct ReadCtx {
    txn: ReadTransaction,
}

impl TableRead for ReadCtx {
    fn get<V: DeserializeOwned>(&self, table: JsonTable, key: &str) -> DbResult<Option<V>> {
        let table = self.txn.open_table(table)?;
        get_json(&table, key)
    }

    fn scan<V: DeserializeOwned>(
        &self,
        table: JsonTable,
        parent: &str,
    ) -> DbResult<Vec<(String, V)>> {
        let table = self.txn.open_table(table)?;
        scan_json(&table, parent)
    }
}

/// Read-write view inside [`RegistryDatabase::write`]. Reads observe
/// earlier writes of the same transaction.
pub struct WriteCtx<'t> {
    txn: &'t WriteTransaction,
}

impl TableRead for WriteCtx<'_> {
    fn get<V: DeserializeOwned>(&self, table: JsonTable, key: &str) -> DbResult<Option<V>> {
        let table = self.txn.open_table(table)?;
        get_json(&table, key)
    }

    fn scan<V: DeserializeOwned>(
        &self,
        table: JsonTable,
        parent: &str,
    ) -> DbResult<Vec<(String, V)>> {
        let table = self.txn.open_table(table)?;
        scan_json(&table, parent)
    }
}

impl WriteCtx<'_> {
    /// Insert or overwrite a value.
    pub fn put<V: Serialize>(&self, table: JsonTable, key: &str, value: &V) -> DbResult<()> {
        let json = serde_json::to_vec(value)?;
        let mut table = self.txn.open_table(table)?;
        table.insert(key, json.as_slice())?;
        Ok(())
    }

    /// Remove a key. Returns whether it was present.
    pub fn remove(&self, table: JsonTable, key: &str) -> DbResult<bool> {
        let mut table = self.txn.open_table(table)?;
        let removed = table.remove(key)?.is_some();
        Ok(removed)
    }
}

// =============================================================================
// Tests
// =============================================================================
