// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies that exist only on the wire. Registry records
//! (`Repository`, `Branch`, `Commit`, ...) are serialized directly from
//! [`crate::versioning::model`].
//!
//! ## Binary Payloads
//!
//! Model parameters, base models and ZKML artifacts travel as standard
//! base64 strings inside JSON. They are decoded before reaching the
//! registry, so an undecodable payload is a `400` and never touches storage.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::{AuthScheme, ChallengeMessage};
use crate::error::ApiError;
use crate::versioning::model::{BaseModelRemoval, CommitStatus, Metrics, NewCommit, ZkmlBundle};

fn decode_base64(field: &str, value: &str) -> Result<Vec<u8>, ApiError> {
    STANDARD
        .decode(value.trim())
        .map_err(|_| ApiError::bad_request(format!("{field} is not valid base64")))
}

// =============================================================================
// Auth
// =============================================================================

/// Challenge for a wallet to sign.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChallengeResponse {
    /// Structured fields (usable as a SIWS input).
    pub message: ChallengeMessage,
    /// Exact text to sign for the general scheme.
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ChallengeQuery {
    /// Action to bind into the challenge. Defaults to `signin`.
    pub action: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignInResponse {
    /// Always `true`; failures are error responses.
    pub success: bool,
    pub wallet: String,
    pub scheme: AuthScheme,
}

// =============================================================================
// Repositories and roles
// =============================================================================

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct RepositoryListQuery {
    /// Owner wallet. Defaults to the caller.
    pub owner: Option<String>,
}

/// Wallet to add to or remove from a role set.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleTargetRequest {
    pub wallet: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteRepositoryResponse {
    pub repo_hash: String,
    /// Present when the repository had a base model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_model: Option<BaseModelRemoval>,
}

// =============================================================================
// Branches
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateBranchRequest {
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ForkBranchRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// =============================================================================
// Commits
// =============================================================================

/// ZKML artifacts, base64 encoded.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ZkmlRequest {
    pub proof: String,
    pub settings: String,
    pub verification_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateCommitRequest {
    pub message: String,
    /// Model parameters, base64 encoded.
    pub params: String,
    /// File extension recorded with the parameters (e.g. `pt`).
    pub params_extension: String,
    /// Parent commit. Defaults to the branch's latest commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_commit_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zkml: Option<ZkmlRequest>,
}

impl CreateCommitRequest {
    pub fn into_new_commit(self) -> Result<NewCommit, ApiError> {
        let zkml = match self.zkml {
            Some(z) => Some(ZkmlBundle {
                proof: decode_base64("zkml.proof", &z.proof)?,
                settings: decode_base64("zkml.settings", &z.settings)?,
                verification_key: decode_base64("zkml.verification_key", &z.verification_key)?,
            }),
            None => None,
        };
        Ok(NewCommit {
            message: self.message,
            params: decode_base64("params", &self.params)?,
            params_extension: self.params_extension,
            previous_commit_hash: self.previous_commit_hash,
            metrics: self.metrics,
            zkml,
        })
    }
}

/// Merge or reject a pending commit.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DecisionRequest {
    /// `MERGED` or `REJECTED`.
    pub status: CommitStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_message: Option<String>,
}

// =============================================================================
// Base model
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadBaseModelRequest {
    /// Model file, base64 encoded.
    pub content: String,
    pub extension: String,
}

impl UploadBaseModelRequest {
    pub fn decode(&self) -> Result<Vec<u8>, ApiError> {
        decode_base64("content", &self.content)
    }
}
