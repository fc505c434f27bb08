// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Commit operations.
//!
//! ## Commit Lifecycle
//!
//! ```text
//! create (writer) ──► PENDING ──decide (admin)──► MERGED | REJECTED
//! create merger (admin) ──► MERGERCOMMIT
//! ```
//!
//! Parameters are uploaded through the blob facade before the transaction
//! that records the commit. That transaction registers the commit as a
//! holder of every blob it references; when it fails, freshly uploaded
//! content nobody else holds is unpinned again.

use uuid::Uuid;

use crate::storage::database::{sequence_key, BRANCHES, BRANCH_COMMITS, COMMITS, REPOSITORIES};
use crate::storage::TableRead;

use super::error::{VersioningError, VersioningResult};
use super::grouping::{group_commits, pending_since_last_merge};
use super::model::{
    Commit, CommitStatus, CommittedBy, MergerCommitGroup, NewCommit, NftReference, ZkmlBundle,
    ZkmlProof, GENESIS_COMMIT,
};
use super::roles::Permission;
use super::service::{
    branch_commits, hold_blob, latest_commit_of, load_branch, load_commit, load_repo,
    set_latest_params, VersioningService,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommitKind {
    /// Ordinary contribution by a writer, starts `PENDING`.
    Contribution,
    /// Aggregation by an admin, recorded as a system commit.
    Merger,
}

impl CommitKind {
    fn permission(self) -> Permission {
        match self {
            CommitKind::Contribution => Permission::Write,
            CommitKind::Merger => Permission::Administer,
        }
    }
}

impl VersioningService {
    pub async fn create_commit(
        &self,
        wallet: &str,
        repo_hash: &str,
        branch_hash: &str,
        input: NewCommit,
    ) -> VersioningResult<Commit> {
        self.append_commit(wallet, repo_hash, branch_hash, input, CommitKind::Contribution)
            .await
    }

    /// Record an aggregation of the branch's contributions. The merger
    /// parameters become the branch's latest parameters.
    pub async fn create_merger_commit(
        &self,
        wallet: &str,
        repo_hash: &str,
        branch_hash: &str,
        input: NewCommit,
    ) -> VersioningResult<Commit> {
        self.append_commit(wallet, repo_hash, branch_hash, input, CommitKind::Merger)
            .await
    }

    async fn append_commit(
        &self,
        wallet: &str,
        repo_hash: &str,
        branch_hash: &str,
        input: NewCommit,
        kind: CommitKind,
    ) -> VersioningResult<Commit> {
        if input.message.trim().is_empty() {
            return Err(VersioningError::InvalidInput("commit message is empty".into()));
        }
        if input.params.is_empty() {
            return Err(VersioningError::InvalidInput("parameters are empty".into()));
        }

        // Reject before touching storage.
        self.db.read(|tx| -> VersioningResult<()> {
            let repo = load_repo(tx, repo_hash)?;
            repo.authorize(wallet, kind.permission())?;
            if repo.base_model.is_none() {
                return Err(VersioningError::InvalidInput(
                    "repository has no base model".into(),
                ));
            }
            load_branch(tx, repo_hash, branch_hash)?;
            Ok(())
        })?;

        let now = self.now();
        let params = self
            .blobs
            .upload(&self.db, &input.params, &input.params_extension, now)
            .await?;
        let zkml_proof = match &input.zkml {
            Some(bundle) => match self.upload_zkml(bundle).await {
                Ok(proof) => Some(proof),
                Err(e) => {
                    self.unpin_quietly(&params.cid).await;
                    return Err(e);
                }
            },
            None => None,
        };
        let mut uploaded = vec![params.cid.clone()];
        if let Some(zkml) = &zkml_proof {
            uploaded.extend(
                [&zkml.proof, &zkml.settings, &zkml.verification_key]
                    .map(|record| record.cid.clone()),
            );
        }

        let recorded = self.db.write(|tx| -> VersioningResult<(Commit, Option<String>)> {
            let mut repo = load_repo(tx, repo_hash)?;
            repo.authorize(wallet, kind.permission())?;
            let mut branch = load_branch(tx, repo_hash, branch_hash)?;

            let previous_commit_hash = match input.previous_commit_hash {
                Some(parent) => {
                    let found = tx
                        .get::<Commit>(COMMITS, &parent)?
                        .filter(|c| c.branch_hash == branch_hash);
                    if found.is_none() {
                        return Err(VersioningError::NotFound(format!("commit {parent}")));
                    }
                    parent
                }
                None => latest_commit_of(tx, branch_hash)?
                    .map(|c| c.commit_hash)
                    .unwrap_or_else(|| GENESIS_COMMIT.to_string()),
            };

            let (status, committed_by) = match kind {
                CommitKind::Contribution => (CommitStatus::Pending, CommittedBy::User),
                CommitKind::Merger => (CommitStatus::MergerCommit, CommittedBy::System),
            };
            let commit = Commit {
                commit_hash: Uuid::new_v4().to_string(),
                branch_hash: branch_hash.to_string(),
                repo_hash: repo_hash.to_string(),
                sequence: branch.commit_count + 1,
                committer: wallet.to_string(),
                committed_by,
                message: input.message,
                status,
                params,
                previous_commit_hash,
                metrics: input.metrics,
                zkml_proof,
                nft: None,
                rejection_message: None,
                created_at: now,
                updated_at: now,
            };
            for cid in commit.blob_cids() {
                hold_blob(tx, &cid, &commit.commit_hash)?;
            }
            tx.put(COMMITS, &commit.commit_hash, &commit)?;
            tx.put(
                BRANCH_COMMITS,
                &sequence_key(branch_hash, commit.sequence),
                &commit.commit_hash,
            )?;

            branch.commit_count = commit.sequence;
            let released = match kind {
                CommitKind::Merger => set_latest_params(tx, &mut branch, &commit.params.cid)?,
                CommitKind::Contribution => None,
            };
            branch.updated_at = now;
            tx.put(BRANCHES, &branch.branch_hash, &branch)?;

            repo.commit_count += 1;
            repo.note_contributor(wallet);
            repo.updated_at = now;
            tx.put(REPOSITORIES, &repo.repo_hash, &repo)?;
            Ok((commit, released))
        });
        let (commit, released) = match recorded {
            Ok(recorded) => recorded,
            Err(e) => {
                self.unpin_all(&uploaded).await;
                return Err(e);
            }
        };
        if let Some(cid) = released {
            self.unpin_quietly(&cid).await;
        }

        tracing::info!(
            repo = %repo_hash,
            branch = %branch_hash,
            commit = %commit.commit_hash,
            sequence = commit.sequence,
            status = %commit.status,
            "Created commit"
        );
        Ok(commit)
    }

    async fn upload_zkml(&self, bundle: &ZkmlBundle) -> VersioningResult<ZkmlProof> {
        let now = self.now();
        let proof = self.blobs.upload(&self.db, &bundle.proof, "json", now).await?;
        let settings = self
            .blobs
            .upload(&self.db, &bundle.settings, "json", now)
            .await?;
        let verification_key = self
            .blobs
            .upload(&self.db, &bundle.verification_key, "key", now)
            .await?;
        Ok(ZkmlProof {
            proof,
            settings,
            verification_key,
        })
    }

    /// Commits of a branch, oldest first.
    pub fn list_commits(&self, repo_hash: &str, branch_hash: &str) -> VersioningResult<Vec<Commit>> {
        self.db.read(|tx| -> VersioningResult<Vec<Commit>> {
            load_branch(tx, repo_hash, branch_hash)?;
            branch_commits(tx, branch_hash)
        })
    }

    pub fn get_commit(&self, commit_hash: &str) -> VersioningResult<Commit> {
        self.db
            .read(|tx| -> VersioningResult<Commit> { load_commit(tx, commit_hash) })
    }

    pub fn latest_commit(&self, repo_hash: &str, branch_hash: &str) -> VersioningResult<Commit> {
        self.db.read(|tx| -> VersioningResult<Commit> {
            load_branch(tx, repo_hash, branch_hash)?;
            latest_commit_of(tx, branch_hash)?.ok_or_else(|| {
                VersioningError::NotFound(format!("commits on branch {branch_hash}"))
            })
        })
    }

    /// `PENDING` commits since the latest merger commit.
    pub fn pending_commits(
        &self,
        repo_hash: &str,
        branch_hash: &str,
    ) -> VersioningResult<Vec<Commit>> {
        let commits = self.list_commits(repo_hash, branch_hash)?;
        Ok(pending_since_last_merge(&commits))
    }

    pub fn commit_groups(
        &self,
        repo_hash: &str,
        branch_hash: &str,
    ) -> VersioningResult<Vec<MergerCommitGroup>> {
        Ok(group_commits(self.list_commits(repo_hash, branch_hash)?))
    }

    /// Merge or reject a pending commit. Owner or admin only.
    ///
    /// A merged commit's parameters become the branch's latest parameters.
    pub async fn decide_commit(
        &self,
        wallet: &str,
        commit_hash: &str,
        decision: CommitStatus,
        rejection_message: Option<String>,
    ) -> VersioningResult<Commit> {
        let now = self.now();
        let (commit, released) = self.db.write(|tx| -> VersioningResult<_> {
            let mut commit = load_commit(tx, commit_hash)?;
            load_repo(tx, &commit.repo_hash)?.authorize(wallet, Permission::Administer)?;

            if !commit.status.can_transition_to(decision) {
                return Err(VersioningError::InvalidTransition(format!(
                    "{} -> {decision}",
                    commit.status
                )));
            }

            commit.status = decision;
            if decision == CommitStatus::Rejected {
                commit.rejection_message = rejection_message;
            }
            commit.updated_at = now;
            tx.put(COMMITS, &commit.commit_hash, &commit)?;

            let mut released = None;
            if decision == CommitStatus::Merged {
                let mut branch = load_branch(tx, &commit.repo_hash, &commit.branch_hash)?;
                released = set_latest_params(tx, &mut branch, &commit.params.cid)?;
                branch.updated_at = now;
                tx.put(BRANCHES, &branch.branch_hash, &branch)?;
            }
            Ok((commit, released))
        })?;

        if let Some(cid) = released {
            self.unpin_quietly(&cid).await;
        }

        tracing::info!(commit = %commit_hash, status = %commit.status, wallet = %wallet, "Decided commit");
        Ok(commit)
    }

    /// Mint an NFT for a commit's parameters and record the signature.
    ///
    /// Allowed for repository admins and the committer, on any status.
    pub async fn mint_commit_nft(&self, wallet: &str, commit_hash: &str) -> VersioningResult<Commit> {
        let commit = self.db.read(|tx| -> VersioningResult<Commit> {
            let commit = load_commit(tx, commit_hash)?;
            check_mint_allowed(tx, &commit, wallet)?;
            Ok(commit)
        })?;

        let mint_signature = self.minter.mint(&commit.params.cid).await?;
        let now = self.now();

        let commit = self.db.write(|tx| -> VersioningResult<Commit> {
            let mut commit = load_commit(tx, commit_hash)?;
            check_mint_allowed(tx, &commit, wallet)?;
            commit.nft = Some(NftReference {
                mint_signature,
                minted_at: now,
            });
            commit.updated_at = now;
            tx.put(COMMITS, &commit.commit_hash, &commit)?;
            Ok(commit)
        })?;

        tracing::info!(commit = %commit_hash, wallet = %wallet, "Minted commit NFT");
        Ok(commit)
    }
}

fn check_mint_allowed(tx: &impl TableRead, commit: &Commit, wallet: &str) -> VersioningResult<()> {
    if commit.committer != wallet {
        load_repo(tx, &commit.repo_hash)?.authorize(wallet, Permission::Administer)?;
    }
    if commit.nft.is_some() {
        return Err(VersioningError::AlreadyExists(format!(
            "NFT for commit {}",
            commit.commit_hash
        )));
    }
    Ok(())
}
