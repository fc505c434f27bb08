// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registry entities as stored in the database and returned by the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::BlobRecord;

/// Parent hash of the first commit on a branch.
pub const GENESIS_COMMIT: &str = "_GENESIS_COMMIT_";

// =============================================================================
// Users
// =============================================================================

/// Optional profile fields. Updates merge per key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl UserMetadata {
    /// Shallow merge: every field set in `patch` replaces the current value.
    pub fn merge(&mut self, patch: UserMetadata) {
        let UserMetadata {
            name,
            email,
            display_text,
            profile_image,
            bio,
        } = patch;
        if name.is_some() {
            self.name = name;
        }
        if email.is_some() {
            self.email = email;
        }
        if display_text.is_some() {
            self.display_text = display_text;
        }
        if profile_image.is_some() {
            self.profile_image = profile_image;
        }
        if bio.is_some() {
            self.bio = bio;
        }
    }
}

/// A wallet known to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// Base58 public key.
    pub wallet: String,
    pub username: Option<String>,
    pub metadata: UserMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(wallet: &str, now: DateTime<Utc>) -> Self {
        Self {
            wallet: wallet.to_string(),
            username: None,
            metadata: UserMetadata::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// Repositories
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Framework {
    PyTorch,
    TensorFlow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RepositoryMetadata {
    pub name: String,
    pub description: Option<String>,
    pub use_case: Option<String>,
    /// Wallet that created the repository.
    pub creator: String,
    pub framework: Framework,
    pub model_uri: Option<String>,
}

/// Partial metadata update. `name` and `creator` are not editable here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RepositoryMetadataPatch {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub use_case: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<Framework>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_uri: Option<String>,
}

impl RepositoryMetadata {
    /// Shallow merge: every field set in `patch` replaces the current value.
    pub fn merge(&mut self, patch: RepositoryMetadataPatch) {
        if patch.description.is_some() {
            self.description = patch.description;
        }
        if patch.use_case.is_some() {
            self.use_case = patch.use_case;
        }
        if let Some(framework) = patch.framework {
            self.framework = framework;
        }
        if patch.model_uri.is_some() {
            self.model_uri = patch.model_uri;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Repository {
    pub repo_hash: String,
    pub name: String,
    pub owner: String,
    pub metadata: RepositoryMetadata,
    pub admins: Vec<String>,
    pub writers: Vec<String>,
    pub contributors: Vec<String>,
    /// Content hash of the base model, once uploaded.
    pub base_model: Option<String>,
    pub default_branch: Option<String>,
    /// Commits across all branches. Bumped by every commit creation; the
    /// base model is frozen once it is non-zero.
    pub commit_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Branches
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Branch {
    pub branch_hash: String,
    pub repo_hash: String,
    pub name: String,
    pub description: Option<String>,
    /// Content hash of the newest parameters. `None` means the base model.
    pub latest_params: Option<String>,
    pub commit_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Commits
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommitStatus {
    Pending,
    Merged,
    Rejected,
    MergerCommit,
}

impl CommitStatus {
    /// Whether `self -> next` is an allowed decision.
    pub fn can_transition_to(self, next: CommitStatus) -> bool {
        matches!(
            (self, next),
            (CommitStatus::Pending, CommitStatus::Merged)
                | (CommitStatus::Pending, CommitStatus::Rejected)
        )
    }
}

impl std::fmt::Display for CommitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommitStatus::Pending => write!(f, "PENDING"),
            CommitStatus::Merged => write!(f, "MERGED"),
            CommitStatus::Rejected => write!(f, "REJECTED"),
            CommitStatus::MergerCommit => write!(f, "MERGERCOMMIT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommittedBy {
    User,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Metrics {
    pub accuracy: f64,
    pub loss: f64,
}

/// ZKML proof bundle attached to a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ZkmlProof {
    pub proof: BlobRecord,
    pub settings: BlobRecord,
    pub verification_key: BlobRecord,
}

/// Back-reference to the NFT minted for a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NftReference {
    pub mint_signature: String,
    pub minted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Commit {
    pub commit_hash: String,
    pub branch_hash: String,
    pub repo_hash: String,
    /// Position on the branch, starting at 1.
    pub sequence: u64,
    pub committer: String,
    pub committed_by: CommittedBy,
    pub message: String,
    pub status: CommitStatus,
    pub params: BlobRecord,
    /// Parent commit hash, or [`GENESIS_COMMIT`].
    pub previous_commit_hash: String,
    pub metrics: Option<Metrics>,
    pub zkml_proof: Option<ZkmlProof>,
    pub nft: Option<NftReference>,
    pub rejection_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Commit {
    /// Content hashes this commit references, without duplicates.
    pub fn blob_cids(&self) -> Vec<String> {
        let mut cids = vec![self.params.cid.clone()];
        if let Some(zkml) = &self.zkml_proof {
            for record in [&zkml.proof, &zkml.settings, &zkml.verification_key] {
                if !cids.contains(&record.cid) {
                    cids.push(record.cid.clone());
                }
            }
        }
        cids
    }
}

/// A merger commit and the ordinary commits it closes.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MergerCommitGroup {
    /// `None` for commits after the last merger commit.
    pub merger_commit: Option<Commit>,
    pub commits: Vec<Commit>,
}

// =============================================================================
// Derived views
// =============================================================================

/// Role sets of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RoleSummary {
    pub owner: String,
    pub admins: Vec<String>,
    pub writers: Vec<String>,
    pub contributors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BranchSnapshot {
    pub branch: Branch,
    pub latest_commit: Option<Commit>,
    pub is_default: bool,
}

/// Everything a client needs to check out a repository.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CloneView {
    pub repository: Repository,
    pub base_model: Option<BlobRecord>,
    pub branches: Vec<BranchSnapshot>,
}

// =============================================================================
// Operation inputs
// =============================================================================

/// Profile edit. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, ToSchema)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub metadata: Option<UserMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NewRepository {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_case: Option<String>,
    /// Required; kept optional here so a missing value is reported as
    /// invalid input rather than a deserialization failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<Framework>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_uri: Option<String>,
}

/// Additions and removals applied to one role set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, ToSchema)]
pub struct RoleChanges {
    #[serde(default)]
    pub add: Vec<String>,
    #[serde(default)]
    pub remove: Vec<String>,
}

impl RoleChanges {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, ToSchema)]
pub struct RepositoryUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: Option<RepositoryMetadataPatch>,
    #[serde(default)]
    pub admins: RoleChanges,
    #[serde(default)]
    pub writers: RoleChanges,
    #[serde(default)]
    pub contributors: RoleChanges,
}

impl RepositoryUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.metadata.is_none()
            && self.admins.is_empty()
            && self.writers.is_empty()
            && self.contributors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NewBranch {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Branch to start from. Required unless this is the first branch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_branch: Option<String>,
}

/// Raw ZKML artifacts uploaded with a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZkmlBundle {
    pub proof: Vec<u8>,
    pub settings: Vec<u8>,
    pub verification_key: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCommit {
    pub message: String,
    pub params: Vec<u8>,
    pub params_extension: String,
    /// Explicit parent. Defaults to the branch's latest commit.
    pub previous_commit_hash: Option<String>,
    pub metrics: Option<Metrics>,
    pub zkml: Option<ZkmlBundle>,
}

/// Result of removing a base-model reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BaseModelRemoval {
    pub cid: String,
    /// Whether the content was removed from storage because no repository
    /// references it any more.
    pub unpinned: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_metadata_merge_is_shallow_per_key() {
        let mut current = UserMetadata {
            name: Some("Ada".into()),
            bio: Some("old".into()),
            ..Default::default()
        };
        current.merge(UserMetadata {
            bio: Some("new".into()),
            email: Some("ada@example.com".into()),
            ..Default::default()
        });
        assert_eq!(current.name.as_deref(), Some("Ada"));
        assert_eq!(current.bio.as_deref(), Some("new"));
        assert_eq!(current.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn repository_metadata_merge_keeps_unset_fields() {
        let mut metadata = RepositoryMetadata {
            name: "mnist".into(),
            description: Some("digits".into()),
            use_case: None,
            creator: "w".into(),
            framework: Framework::PyTorch,
            model_uri: None,
        };
        metadata.merge(RepositoryMetadataPatch {
            framework: Some(Framework::TensorFlow),
            ..Default::default()
        });
        assert_eq!(metadata.framework, Framework::TensorFlow);
        assert_eq!(metadata.description.as_deref(), Some("digits"));
    }

    #[test]
    fn only_pending_commits_can_be_decided() {
        use CommitStatus::*;
        assert!(Pending.can_transition_to(Merged));
        assert!(Pending.can_transition_to(Rejected));
        for from in [Merged, Rejected, MergerCommit] {
            for to in [Pending, Merged, Rejected, MergerCommit] {
                assert!(!from.can_transition_to(to));
            }
        }
        assert!(!Pending.can_transition_to(MergerCommit));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn enums_use_uppercase_wire_names() {
        assert_eq!(
            serde_json::to_value(CommitStatus::MergerCommit).unwrap(),
            "MERGERCOMMIT"
        );
        assert_eq!(serde_json::to_value(Framework::PyTorch).unwrap(), "PYTORCH");
        assert_eq!(serde_json::to_value(CommittedBy::System).unwrap(), "SYSTEM");
    }
}
