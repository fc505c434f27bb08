// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Branch operations.
//!
//! A repository needs a base model before its first branch. The first
//! branch starts from the base model; every later branch (and every fork)
//! names a source branch and inherits its latest parameters.

use uuid::Uuid;

use crate::storage::database::{composite_key, BRANCHES, REPOSITORIES, REPO_BRANCHES};
use crate::storage::TableRead;

use super::error::{VersioningError, VersioningResult};
use super::model::{Branch, NewBranch};
use super::roles::Permission;
use super::service::{
    delete_branch_records, hold_blob, list_repo_branches, load_branch, load_repo,
    validate_name, VersioningService,
};

impl VersioningService {
    pub fn create_branch(
        &self,
        wallet: &str,
        repo_hash: &str,
        input: NewBranch,
    ) -> VersioningResult<Branch> {
        validate_name("branch name", &input.name)?;

        let now = self.now();
        let branch = self.db.write(|tx| -> VersioningResult<Branch> {
            let mut repo = load_repo(tx, repo_hash)?;
            repo.authorize(wallet, Permission::Write)?;
            if repo.base_model.is_none() {
                return Err(VersioningError::InvalidInput(
                    "upload a base model before creating branches".into(),
                ));
            }

            let name_key = composite_key(repo_hash, &input.name);
            if tx.contains(REPO_BRANCHES, &name_key)? {
                return Err(VersioningError::AlreadyExists(format!(
                    "branch {}",
                    input.name
                )));
            }

            let latest_params = match &input.source_branch {
                Some(source) => load_branch(tx, repo_hash, source)?.latest_params,
                None => {
                    let existing: Vec<(String, String)> = tx.scan(REPO_BRANCHES, repo_hash)?;
                    if !existing.is_empty() {
                        return Err(VersioningError::InvalidInput(
                            "source branch is required once the repository has branches"
                                .into(),
                        ));
                    }
                    None
                }
            };

            let branch = Branch {
                branch_hash: Uuid::new_v4().to_string(),
                repo_hash: repo_hash.to_string(),
                name: input.name,
                description: input.description,
                latest_params,
                commit_count: 0,
                created_at: now,
                updated_at: now,
            };
            if let Some(cid) = &branch.latest_params {
                hold_blob(tx, cid, &branch.branch_hash)?;
            }
            tx.put(BRANCHES, &branch.branch_hash, &branch)?;
            tx.put(REPO_BRANCHES, &name_key, &branch.branch_hash)?;

            if repo.default_branch.is_none() {
                repo.default_branch = Some(branch.branch_hash.clone());
                repo.updated_at = now;
                tx.put(REPOSITORIES, &repo.repo_hash, &repo)?;
            }
            Ok(branch)
        })?;

        tracing::info!(
            repo = %repo_hash,
            branch = %branch.branch_hash,
            name = %branch.name,
            "Created branch"
        );
        Ok(branch)
    }

    /// New branch starting from `source_hash`.
    pub fn fork_branch(
        &self,
        wallet: &str,
        repo_hash: &str,
        source_hash: &str,
        name: String,
        description: Option<String>,
    ) -> VersioningResult<Branch> {
        self.create_branch(
            wallet,
            repo_hash,
            NewBranch {
                name,
                description,
                source_branch: Some(source_hash.to_string()),
            },
        )
    }

    pub fn get_branch(&self, repo_hash: &str, branch_hash: &str) -> VersioningResult<Branch> {
        self.db
            .read(|tx| -> VersioningResult<Branch> { load_branch(tx, repo_hash, branch_hash) })
    }

    pub fn list_branches(&self, repo_hash: &str) -> VersioningResult<Vec<Branch>> {
        self.db.read(|tx| -> VersioningResult<Vec<Branch>> {
            load_repo(tx, repo_hash)?;
            list_repo_branches(tx, repo_hash)
        })
    }

    pub fn update_branch(
        &self,
        wallet: &str,
        repo_hash: &str,
        branch_hash: &str,
        description: Option<String>,
    ) -> VersioningResult<Branch> {
        let now = self.now();
        self.db.write(|tx| -> VersioningResult<Branch> {
            load_repo(tx, repo_hash)?.authorize(wallet, Permission::Write)?;
            let mut branch = load_branch(tx, repo_hash, branch_hash)?;
            branch.description = description;
            branch.updated_at = now;
            tx.put(BRANCHES, &branch.branch_hash, &branch)?;
            Ok(branch)
        })
    }

    /// Delete a branch and its commits.
    ///
    /// The repository commit count drops by the commits removed, so deleting
    /// every branch with commits unfreezes the base model again. Content
    /// only this branch held is unpinned.
    pub async fn delete_branch(
        &self,
        wallet: &str,
        repo_hash: &str,
        branch_hash: &str,
    ) -> VersioningResult<()> {
        let now = self.now();
        let orphans = self.db.write(|tx| -> VersioningResult<Vec<String>> {
            let mut repo = load_repo(tx, repo_hash)?;
            repo.authorize(wallet, Permission::Administer)?;
            let branch = load_branch(tx, repo_hash, branch_hash)?;

            let deleted = delete_branch_records(tx, branch_hash)?;
            tx.remove(REPO_BRANCHES, &composite_key(repo_hash, &branch.name))?;

            repo.commit_count = repo.commit_count.saturating_sub(deleted.commits);
            if repo.default_branch.as_deref() == Some(branch_hash) {
                repo.default_branch = list_repo_branches(tx, repo_hash)?
                    .into_iter()
                    .next()
                    .map(|b| b.branch_hash);
            }
            repo.updated_at = now;
            tx.put(REPOSITORIES, &repo.repo_hash, &repo)?;
            Ok(deleted.orphans)
        })?;

        tracing::info!(repo = %repo_hash, branch = %branch_hash, wallet = %wallet, "Deleted branch");
        self.unpin_all(&orphans).await;
        Ok(())
    }
}
