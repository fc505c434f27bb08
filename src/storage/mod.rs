// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent state for the registry lives in two places under the data
//! directory:
//!
//! ```text
//! {DATA_DIR}/
//!   registry.redb         # Users, repositories, branches, commits, indexes
//!   blobs/{shard}/{cid}   # Content-addressed model artifacts
//! ```
//!
//! The database is the source of truth for which blobs exist and who
//! references them. Blob content is only ever added or removed through
//! [`BlobFacade`].

pub mod blobs;
pub mod database;
pub mod paths;

pub use blobs::{
    content_hash, BlobError, BlobFacade, BlobRecord, BlobStore, FsBlobStore, MemoryBlobStore,
};
pub use database::{DbError, DbResult, RegistryDatabase, TableRead};
pub use paths::StoragePaths;
