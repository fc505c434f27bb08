// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! NFT minting collaborator.
//!
//! Minting is opaque to the registry: it hands over the content hash of a
//! commit's parameters and records the signature it gets back.

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum MintError {
    #[error("NFT minting is not configured")]
    Unconfigured,

    #[error("{0}")]
    Failed(String),
}

#[async_trait]
pub trait NftMinter: Send + Sync + 'static {
    /// Mint an NFT for `content_hash` and return the mint transaction signature.
    async fn mint(&self, content_hash: &str) -> Result<String, MintError>;
}

/// Minter used when no minting backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredMinter;

#[async_trait]
impl NftMinter for UnconfiguredMinter {
    async fn mint(&self, _content_hash: &str) -> Result<String, MintError> {
        Err(MintError::Unconfigured)
    }
}
