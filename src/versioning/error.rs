// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use crate::storage::{BlobError, DbError};

use super::nft::MintError;

/// Errors from registry operations.
///
/// Invariant violations are detected before any write and reported as
/// conflicts; infrastructure failures wrap their source.
#[derive(Debug, thiserror::Error)]
pub enum VersioningError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("not authorized: {0}")]
    NotAuthorized(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("base model is already in use by commits in this repository")]
    ModelAlreadyExists,

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Database(#[from] DbError),

    #[error("blob storage error: {0}")]
    Blob(#[from] BlobError),

    #[error("NFT mint failed: {0}")]
    Mint(#[from] MintError),
}

pub type VersioningResult<T> = Result<T, VersioningError>;
