// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registry operations on users, repositories and roles.
//!
//! Branch, commit and base-model operations live in sibling modules as
//! further `impl VersioningService` blocks. Every mutation runs in a single
//! database write transaction: authorization and invariant checks are made
//! against the state read inside that transaction, so a rejected request
//! never leaves a partial write behind.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::clock::SharedClock;
use crate::storage::database::{
    composite_key, WriteCtx, BLOBS, BLOB_REFS, BRANCHES, BRANCH_COMMITS, COMMITS, REPOSITORIES,
    REPO_BRANCHES, REPO_NAMES, USERNAMES, USERS,
};
use crate::storage::{BlobError, BlobFacade, BlobRecord, RegistryDatabase, TableRead};

use super::error::{VersioningError, VersioningResult};
use super::model::{
    BaseModelRemoval, Branch, BranchSnapshot, CloneView, Commit, NewRepository, ProfileUpdate,
    Repository, RepositoryMetadata, RepositoryUpdate, RoleSummary, User,
};
use super::nft::NftMinter;
use super::roles::{apply_set_changes, Permission};

/// Entry point for all registry operations.
#[derive(Clone)]
pub struct VersioningService {
    pub(super) db: RegistryDatabase,
    pub(super) blobs: BlobFacade,
    pub(super) minter: Arc<dyn NftMinter>,
    pub(super) clock: SharedClock,
}

impl std::fmt::Debug for VersioningService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersioningService").finish_non_exhaustive()
    }
}

impl VersioningService {
    pub fn new(
        db: RegistryDatabase,
        blobs: BlobFacade,
        minter: Arc<dyn NftMinter>,
        clock: SharedClock,
    ) -> Self {
        Self {
            db,
            blobs,
            minter,
            clock,
        }
    }

    pub fn database(&self) -> &RegistryDatabase {
        &self.db
    }

    pub fn blobs(&self) -> &BlobFacade {
        &self.blobs
    }

    pub(super) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Create the user record for `wallet` unless it exists.
    ///
    /// Returns `true` when a record was created.
    pub fn ensure_user(&self, wallet: &str) -> VersioningResult<bool> {
        if self.db.read(|tx| tx.contains(USERS, wallet))? {
            return Ok(false);
        }
        let now = self.now();
        let created = self
            .db
            .write(|tx| -> VersioningResult<bool> { upsert_user(tx, wallet, now) })?;
        if created {
            tracing::info!(wallet = %wallet, "Provisioned user");
        }
        Ok(created)
    }

    pub fn get_user(&self, wallet: &str) -> VersioningResult<User> {
        self.db.read(|tx| -> VersioningResult<User> {
            tx.get(USERS, wallet)?
                .ok_or_else(|| VersioningError::NotFound(format!("user {wallet}")))
        })
    }

    pub fn find_user_by_username(&self, username: &str) -> VersioningResult<User> {
        self.db.read(|tx| -> VersioningResult<User> {
            let wallet: String = tx
                .get(USERNAMES, username)?
                .ok_or_else(|| VersioningError::NotFound(format!("user {username}")))?;
            tx.get(USERS, &wallet)?
                .ok_or_else(|| VersioningError::NotFound(format!("user {username}")))
        })
    }

    /// Change username and/or merge profile metadata.
    pub fn update_profile(&self, wallet: &str, update: ProfileUpdate) -> VersioningResult<User> {
        if update.username.is_none() && update.metadata.is_none() {
            return Err(VersioningError::InvalidInput("nothing to update".into()));
        }
        if let Some(username) = &update.username {
            validate_name("username", username)?;
        }

        let now = self.now();
        self.db.write(|tx| -> VersioningResult<User> {
            upsert_user(tx, wallet, now)?;
            let mut user: User = tx
                .get(USERS, wallet)?
                .ok_or_else(|| VersioningError::NotFound(format!("user {wallet}")))?;

            if let Some(username) = update.username {
                if user.username.as_deref() != Some(username.as_str()) {
                    let holder: Option<String> = tx.get(USERNAMES, &username)?;
                    if holder.is_some_and(|h| h != wallet) {
                        return Err(VersioningError::AlreadyExists(format!(
                            "username {username}"
                        )));
                    }
                    if let Some(old) = &user.username {
                        tx.remove(USERNAMES, old)?;
                    }
                    tx.put(USERNAMES, &username, &wallet.to_string())?;
                    user.username = Some(username);
                }
            }
            if let Some(metadata) = update.metadata {
                user.metadata.merge(metadata);
            }

            user.updated_at = now;
            tx.put(USERS, wallet, &user)?;
            Ok(user)
        })
    }

    // =========================================================================
    // Repositories
    // =========================================================================

    pub fn create_repository(
        &self,
        owner: &str,
        input: NewRepository,
    ) -> VersioningResult<Repository> {
        validate_name("repository name", &input.name)?;
        let framework = input
            .framework
            .ok_or_else(|| VersioningError::InvalidInput("framework is required".into()))?;

        let now = self.now();
        let repo = self.db.write(|tx| -> VersioningResult<Repository> {
            upsert_user(tx, owner, now)?;

            let name_key = composite_key(owner, &input.name);
            if tx.contains(REPO_NAMES, &name_key)? {
                return Err(VersioningError::AlreadyExists(format!(
                    "repository {owner}/{}",
                    input.name
                )));
            }

            let repo = Repository {
                repo_hash: Uuid::new_v4().to_string(),
                name: input.name.clone(),
                owner: owner.to_string(),
                metadata: RepositoryMetadata {
                    name: input.name,
                    description: input.description,
                    use_case: input.use_case,
                    creator: owner.to_string(),
                    framework,
                    model_uri: input.model_uri,
                },
                admins: vec![owner.to_string()],
                writers: vec![owner.to_string()],
                contributors: vec![owner.to_string()],
                base_model: None,
                default_branch: None,
                commit_count: 0,
                created_at: now,
                updated_at: now,
            };
            tx.put(REPOSITORIES, &repo.repo_hash, &repo)?;
            tx.put(REPO_NAMES, &name_key, &repo.repo_hash)?;
            Ok(repo)
        })?;

        tracing::info!(repo = %repo.repo_hash, owner = %owner, name = %repo.name, "Created repository");
        Ok(repo)
    }

    pub fn get_repository(&self, repo_hash: &str) -> VersioningResult<Repository> {
        self.db
            .read(|tx| -> VersioningResult<Repository> { load_repo(tx, repo_hash) })
    }

    pub fn find_repository(&self, owner: &str, name: &str) -> VersioningResult<Repository> {
        self.db.read(|tx| -> VersioningResult<Repository> {
            let repo_hash: String = tx
                .get(REPO_NAMES, &composite_key(owner, name))?
                .ok_or_else(|| VersioningError::NotFound(format!("repository {owner}/{name}")))?;
            load_repo(tx, &repo_hash)
        })
    }

    /// Repositories owned by `owner`, ordered by name.
    pub fn list_repositories(&self, owner: &str) -> VersioningResult<Vec<Repository>> {
        self.db.read(|tx| -> VersioningResult<Vec<Repository>> {
            let entries: Vec<(String, String)> = tx.scan(REPO_NAMES, owner)?;
            entries
                .iter()
                .map(|(_, repo_hash)| load_repo(tx, repo_hash))
                .collect()
        })
    }

    /// Rename, merge metadata and apply bulk role changes.
    ///
    /// Requires owner or admin. Changing the admin set requires the owner.
    pub fn update_repository(
        &self,
        wallet: &str,
        repo_hash: &str,
        update: RepositoryUpdate,
    ) -> VersioningResult<Repository> {
        if update.is_empty() {
            return Err(VersioningError::InvalidInput("nothing to update".into()));
        }
        if let Some(name) = &update.name {
            validate_name("repository name", name)?;
        }

        let now = self.now();
        self.db.write(|tx| -> VersioningResult<Repository> {
            let mut repo = load_repo(tx, repo_hash)?;
            repo.authorize(wallet, Permission::Administer)?;
            if !update.admins.is_empty() {
                repo.authorize(wallet, Permission::ManageAdmins)?;
            }

            if let Some(name) = update.name.filter(|n| *n != repo.name) {
                let new_key = composite_key(&repo.owner, &name);
                if tx.contains(REPO_NAMES, &new_key)? {
                    return Err(VersioningError::AlreadyExists(format!(
                        "repository {}/{name}",
                        repo.owner
                    )));
                }
                tx.remove(REPO_NAMES, &composite_key(&repo.owner, &repo.name))?;
                tx.put(REPO_NAMES, &new_key, &repo.repo_hash)?;
                repo.metadata.name = name.clone();
                repo.name = name;
            }
            if let Some(patch) = update.metadata {
                repo.metadata.merge(patch);
            }

            let owner = repo.owner.clone();
            for (set, changes) in [
                (&mut repo.admins, &update.admins),
                (&mut repo.writers, &update.writers),
                (&mut repo.contributors, &update.contributors),
            ] {
                apply_set_changes(set, &changes.add, &changes.remove, &owner);
            }

            repo.updated_at = now;
            tx.put(REPOSITORIES, &repo.repo_hash, &repo)?;
            Ok(repo)
        })
    }

    /// Delete a repository with all its branches and commits.
    ///
    /// Content the repository was the last holder of is unpinned, the base
    /// model included.
    pub async fn delete_repository(
        &self,
        wallet: &str,
        repo_hash: &str,
    ) -> VersioningResult<Option<BaseModelRemoval>> {
        let (base_model, orphans) = self.db.write(|tx| -> VersioningResult<_> {
            let repo = load_repo(tx, repo_hash)?;
            repo.authorize(wallet, Permission::Administer)?;

            let mut orphans = Vec::new();
            let branches: Vec<(String, String)> = tx.scan(REPO_BRANCHES, repo_hash)?;
            for (key, branch_hash) in &branches {
                orphans.extend(delete_branch_records(tx, branch_hash)?.orphans);
                tx.remove(REPO_BRANCHES, key)?;
            }

            tx.remove(REPO_NAMES, &composite_key(&repo.owner, &repo.name))?;
            tx.remove(REPOSITORIES, repo_hash)?;

            let base_model = match repo.base_model {
                Some(cid) => {
                    let last = release_blob(tx, &cid, repo_hash)?;
                    Some((cid, last))
                }
                None => None,
            };
            Ok((base_model, orphans))
        })?;

        tracing::info!(repo = %repo_hash, wallet = %wallet, "Deleted repository");

        self.unpin_all(&orphans).await;
        match base_model {
            Some((cid, last_ref)) => {
                let unpinned = last_ref && self.unpin_quietly(&cid).await;
                Ok(Some(BaseModelRemoval { cid, unpinned }))
            }
            None => Ok(None),
        }
    }

    /// Repository with its base model and every branch's latest commit.
    pub fn clone_repository(&self, repo_hash: &str) -> VersioningResult<CloneView> {
        self.db.read(|tx| -> VersioningResult<CloneView> {
            let repository = load_repo(tx, repo_hash)?;
            let base_model = match &repository.base_model {
                Some(cid) => tx.get::<BlobRecord>(BLOBS, cid)?,
                None => None,
            };

            let mut branches = Vec::new();
            for branch in list_repo_branches(tx, repo_hash)? {
                let latest_commit = latest_commit_of(tx, &branch.branch_hash)?;
                let is_default =
                    repository.default_branch.as_deref() == Some(branch.branch_hash.as_str());
                branches.push(BranchSnapshot {
                    branch,
                    latest_commit,
                    is_default,
                });
            }

            Ok(CloneView {
                repository,
                base_model,
                branches,
            })
        })
    }

    // =========================================================================
    // Roles
    // =========================================================================

    pub fn list_roles(&self, repo_hash: &str) -> VersioningResult<RoleSummary> {
        Ok(self.get_repository(repo_hash)?.roles())
    }

    pub fn add_admin(
        &self,
        wallet: &str,
        repo_hash: &str,
        target: &str,
    ) -> VersioningResult<RoleSummary> {
        self.change_roles(wallet, repo_hash, Permission::ManageAdmins, |repo| {
            repo.add_admin(target)
        })
    }

    pub fn remove_admin(
        &self,
        wallet: &str,
        repo_hash: &str,
        target: &str,
    ) -> VersioningResult<RoleSummary> {
        self.change_roles(wallet, repo_hash, Permission::ManageAdmins, |repo| {
            repo.remove_admin(target)
        })
    }

    pub fn add_writer(
        &self,
        wallet: &str,
        repo_hash: &str,
        target: &str,
    ) -> VersioningResult<RoleSummary> {
        self.change_roles(wallet, repo_hash, Permission::Administer, |repo| {
            repo.add_writer(target)
        })
    }

    pub fn revoke_writer(
        &self,
        wallet: &str,
        repo_hash: &str,
        target: &str,
    ) -> VersioningResult<RoleSummary> {
        self.change_roles(wallet, repo_hash, Permission::Administer, |repo| {
            repo.revoke_writer(target)
        })
    }

    fn change_roles(
        &self,
        wallet: &str,
        repo_hash: &str,
        permission: Permission,
        change: impl FnOnce(&mut Repository) -> VersioningResult<()>,
    ) -> VersioningResult<RoleSummary> {
        let now = self.now();
        let roles = self.db.write(|tx| -> VersioningResult<RoleSummary> {
            let mut repo = load_repo(tx, repo_hash)?;
            repo.authorize(wallet, permission)?;
            change(&mut repo)?;
            repo.updated_at = now;
            tx.put(REPOSITORIES, &repo.repo_hash, &repo)?;
            Ok(repo.roles())
        })?;
        tracing::info!(repo = %repo_hash, wallet = %wallet, "Updated repository roles");
        Ok(roles)
    }

    /// Remove unreferenced content. Failures are logged and reported as
    /// `false`; the reference itself is already gone at this point.
    pub(super) async fn unpin_quietly(&self, cid: &str) -> bool {
        match self.blobs.unpin_unreferenced(&self.db, cid).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(cid = %cid, error = %e, "Failed to unpin unreferenced blob");
                false
            }
        }
    }

    pub(super) async fn unpin_all(&self, cids: &[String]) {
        for cid in cids {
            self.unpin_quietly(cid).await;
        }
    }

    /// Indexed record and stored content of a blob.
    pub async fn fetch_blob(&self, cid: &str) -> VersioningResult<(BlobRecord, Vec<u8>)> {
        let not_found = || VersioningError::NotFound(format!("blob {cid}"));
        let record = self.blobs.record(&self.db, cid)?.ok_or_else(not_found)?;
        match self.blobs.fetch(cid).await {
            Ok(content) => Ok((record, content)),
            Err(BlobError::NotFound(_)) => Err(not_found()),
            Err(e) => Err(e.into()),
        }
    }

    /// Number of repositories, commits and branches referencing `cid`.
    pub fn blob_references(&self, cid: &str) -> VersioningResult<usize> {
        self.db.read(|tx| -> VersioningResult<usize> {
            let refs: Vec<(String, String)> = tx.scan(BLOB_REFS, cid)?;
            Ok(refs.len())
        })
    }
}

// =============================================================================
// Transaction helpers
// =============================================================================

/// Names may not be empty or contain whitespace or `/`.
pub(super) fn validate_name(kind: &str, name: &str) -> VersioningResult<()> {
    if name.is_empty() {
        return Err(VersioningError::InvalidInput(format!("{kind} is empty")));
    }
    if name.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(VersioningError::InvalidInput(format!(
            "{kind} may not contain spaces or '/'"
        )));
    }
    Ok(())
}

fn upsert_user(tx: &WriteCtx, wallet: &str, now: DateTime<Utc>) -> VersioningResult<bool> {
    if tx.contains(USERS, wallet)? {
        return Ok(false);
    }
    tx.put(USERS, wallet, &User::new(wallet, now))?;
    Ok(true)
}

pub(super) fn load_repo(tx: &impl TableRead, repo_hash: &str) -> VersioningResult<Repository> {
    tx.get(REPOSITORIES, repo_hash)?
        .ok_or_else(|| VersioningError::NotFound(format!("repository {repo_hash}")))
}

/// Load a branch and check that it belongs to `repo_hash`.
pub(super) fn load_branch(
    tx: &impl TableRead,
    repo_hash: &str,
    branch_hash: &str,
) -> VersioningResult<Branch> {
    tx.get::<Branch>(BRANCHES, branch_hash)?
        .filter(|b| b.repo_hash == repo_hash)
        .ok_or_else(|| VersioningError::NotFound(format!("branch {branch_hash}")))
}

pub(super) fn load_commit(tx: &impl TableRead, commit_hash: &str) -> VersioningResult<Commit> {
    tx.get(COMMITS, commit_hash)?
        .ok_or_else(|| VersioningError::NotFound(format!("commit {commit_hash}")))
}

/// Branches of a repository, ordered by name.
pub(super) fn list_repo_branches(
    tx: &impl TableRead,
    repo_hash: &str,
) -> VersioningResult<Vec<Branch>> {
    let entries: Vec<(String, String)> = tx.scan(REPO_BRANCHES, repo_hash)?;
    entries
        .iter()
        .map(|(_, branch_hash)| load_branch(tx, repo_hash, branch_hash))
        .collect()
}

/// Commits of a branch, oldest first.
pub(super) fn branch_commits(
    tx: &impl TableRead,
    branch_hash: &str,
) -> VersioningResult<Vec<Commit>> {
    let entries: Vec<(String, String)> = tx.scan(BRANCH_COMMITS, branch_hash)?;
    entries
        .iter()
        .map(|(_, commit_hash)| load_commit(tx, commit_hash))
        .collect()
}

pub(super) fn latest_commit_of(
    tx: &impl TableRead,
    branch_hash: &str,
) -> VersioningResult<Option<Commit>> {
    let entries: Vec<(String, String)> = tx.scan(BRANCH_COMMITS, branch_hash)?;
    match entries.last() {
        Some((_, commit_hash)) => Ok(Some(load_commit(tx, commit_hash)?)),
        None => Ok(None),
    }
}

/// What [`delete_branch_records`] removed.
pub(super) struct DeletedBranch {
    pub commits: u64,
    /// Content no longer held by anything.
    pub orphans: Vec<String>,
}

/// Remove a branch record and all of its commits, releasing the content
/// they hold. The `repo_branches` entry is left to the caller.
pub(super) fn delete_branch_records(
    tx: &WriteCtx,
    branch_hash: &str,
) -> VersioningResult<DeletedBranch> {
    let mut orphans = Vec::new();
    let entries: Vec<(String, String)> = tx.scan(BRANCH_COMMITS, branch_hash)?;
    for (key, commit_hash) in &entries {
        if let Some(commit) = tx.get::<Commit>(COMMITS, commit_hash)? {
            for cid in commit.blob_cids() {
                if release_blob(tx, &cid, commit_hash)? {
                    orphans.push(cid);
                }
            }
        }
        tx.remove(COMMITS, commit_hash)?;
        tx.remove(BRANCH_COMMITS, key)?;
    }

    if let Some(branch) = tx.get::<Branch>(BRANCHES, branch_hash)? {
        if let Some(cid) = branch.latest_params {
            if release_blob(tx, &cid, branch_hash)? {
                orphans.push(cid);
            }
        }
    }
    tx.remove(BRANCHES, branch_hash)?;

    orphans.sort();
    orphans.dedup();
    Ok(DeletedBranch {
        commits: entries.len() as u64,
        orphans,
    })
}

/// Record that `holder` references `cid`.
///
/// Fails when the content was unpinned between its upload and this
/// transaction; the caller may retry.
pub(super) fn hold_blob(tx: &WriteCtx, cid: &str, holder: &str) -> VersioningResult<()> {
    if !tx.contains(BLOBS, cid)? {
        return Err(VersioningError::InvalidTransition(format!(
            "content {cid} was removed concurrently, retry the request"
        )));
    }
    tx.put(BLOB_REFS, &composite_key(cid, holder), &holder.to_string())?;
    Ok(())
}

/// Point `branch` at new latest parameters and move its hold over. Returns
/// the previous content when nothing references it any more.
pub(super) fn set_latest_params(
    tx: &WriteCtx,
    branch: &mut Branch,
    cid: &str,
) -> VersioningResult<Option<String>> {
    hold_blob(tx, cid, &branch.branch_hash)?;
    match branch.latest_params.replace(cid.to_string()) {
        Some(previous) if previous != cid => {
            Ok(release_blob(tx, &previous, &branch.branch_hash)?.then_some(previous))
        }
        _ => Ok(None),
    }
}

/// Drop the reference `holder` has on `cid`. Returns `true` when nothing
/// references the content any more.
pub(super) fn release_blob(tx: &WriteCtx, cid: &str, holder: &str) -> VersioningResult<bool> {
    tx.remove(BLOB_REFS, &composite_key(cid, holder))?;
    let remaining: Vec<(String, String)> = tx.scan(BLOB_REFS, cid)?;
    Ok(remaining.is_empty())
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::versioning::model::{RepositoryMetadataPatch, RoleChanges, UserMetadata};

    #[test]
    fn ensure_user_is_idempotent() {
        let fx = fixture();
        assert!(fx.service.ensure_user(OWNER).unwrap());
        assert!(!fx.service.ensure_user(OWNER).unwrap());
        assert_eq!(fx.service.get_user(OWNER).unwrap().wallet, OWNER);
    }

    #[test]
    fn usernames_are_unique() {
        let fx = fixture();
        let update = |name: &str| ProfileUpdate {
            username: Some(name.to_string()),
            metadata: None,
        };
        fx.service.update_profile(OWNER, update("ada")).unwrap();
        assert!(matches!(
            fx.service.update_profile(WRITER, update("ada")),
            Err(VersioningError::AlreadyExists(_))
        ));

        // Renaming frees the old name.
        fx.service.update_profile(OWNER, update("lovelace")).unwrap();
        fx.service.update_profile(WRITER, update("ada")).unwrap();
        assert_eq!(fx.service.find_user_by_username("ada").unwrap().wallet, WRITER);
        assert_eq!(
            fx.service.find_user_by_username("lovelace").unwrap().wallet,
            OWNER
        );
    }

    #[test]
    fn profile_metadata_merges() {
        let fx = fixture();
        fx.service
            .update_profile(
                OWNER,
                ProfileUpdate {
                    username: None,
                    metadata: Some(UserMetadata {
                        name: Some("Ada".into()),
                        ..Default::default()
                    }),
                },
            )
            .unwrap();
        let user = fx
            .service
            .update_profile(
                OWNER,
                ProfileUpdate {
                    username: None,
                    metadata: Some(UserMetadata {
                        bio: Some("models".into()),
                        ..Default::default()
                    }),
                },
            )
            .unwrap();
        assert_eq!(user.metadata.name.as_deref(), Some("Ada"));
        assert_eq!(user.metadata.bio.as_deref(), Some("models"));
    }

    #[test]
    fn create_repository_validates_input() {
        let fx = fixture();
        assert!(matches!(
            fx.service.create_repository(OWNER, new_repo("has space")),
            Err(VersioningError::InvalidInput(_))
        ));
        assert!(matches!(
            fx.service.create_repository(OWNER, new_repo("a/b")),
            Err(VersioningError::InvalidInput(_))
        ));
        let mut input = new_repo("mnist");
        input.framework = None;
        assert!(matches!(
            fx.service.create_repository(OWNER, input),
            Err(VersioningError::InvalidInput(_))
        ));
    }

    #[test]
    fn create_repository_provisions_owner_and_seeds_roles() {
        let fx = fixture();
        let repo = fx.service.create_repository(OWNER, new_repo("mnist")).unwrap();

        assert!(fx.service.get_user(OWNER).is_ok());
        assert_eq!(repo.admins, vec![OWNER.to_string()]);
        assert_eq!(repo.writers, vec![OWNER.to_string()]);
        assert_eq!(repo.contributors, vec![OWNER.to_string()]);
        assert_eq!(repo.metadata.creator, OWNER);
        assert_eq!(
            fx.service.find_repository(OWNER, "mnist").unwrap().repo_hash,
            repo.repo_hash
        );
    }

    #[test]
    fn repository_names_are_unique_per_owner() {
        let fx = fixture();
        fx.service.create_repository(OWNER, new_repo("mnist")).unwrap();
        assert!(matches!(
            fx.service.create_repository(OWNER, new_repo("mnist")),
            Err(VersioningError::AlreadyExists(_))
        ));
        fx.service.create_repository(WRITER, new_repo("mnist")).unwrap();
        assert_eq!(fx.service.list_repositories(OWNER).unwrap().len(), 1);
    }

    #[test]
    fn update_renames_and_merges() {
        let fx = fixture();
        let repo = fx.repo_with_roles("mnist");

        let updated = fx
            .service
            .update_repository(
                ADMIN,
                &repo.repo_hash,
                RepositoryUpdate {
                    name: Some("mnist-v2".into()),
                    metadata: Some(RepositoryMetadataPatch {
                        use_case: Some("ocr".into()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.name, "mnist-v2");
        assert_eq!(updated.metadata.name, "mnist-v2");
        assert_eq!(updated.metadata.use_case.as_deref(), Some("ocr"));
        assert_eq!(updated.metadata.description.as_deref(), Some("digit classifier"));
        assert!(fx.service.find_repository(OWNER, "mnist").is_err());
        assert!(fx.service.find_repository(OWNER, "mnist-v2").is_ok());
    }

    #[test]
    fn bulk_admin_changes_require_owner() {
        let fx = fixture();
        let repo = fx.repo_with_roles("mnist");
        let update = RepositoryUpdate {
            admins: RoleChanges {
                add: vec![WRITER.to_string()],
                remove: vec![OWNER.to_string()],
            },
            ..Default::default()
        };

        assert!(matches!(
            fx.service.update_repository(ADMIN, &repo.repo_hash, update.clone()),
            Err(VersioningError::NotAuthorized(_))
        ));
        let updated = fx
            .service
            .update_repository(OWNER, &repo.repo_hash, update)
            .unwrap();
        assert!(updated.admins.contains(&OWNER.to_string()));
        assert!(updated.admins.contains(&WRITER.to_string()));
    }

    #[test]
    fn role_management_is_gated() {
        let fx = fixture();
        let repo = fx.repo_with_roles("mnist");

        assert!(matches!(
            fx.service.add_admin(ADMIN, &repo.repo_hash, STRANGER),
            Err(VersioningError::NotAuthorized(_))
        ));
        assert!(matches!(
            fx.service.add_writer(WRITER, &repo.repo_hash, STRANGER),
            Err(VersioningError::NotAuthorized(_))
        ));
        let roles = fx.service.add_writer(ADMIN, &repo.repo_hash, STRANGER).unwrap();
        assert!(roles.writers.contains(&STRANGER.to_string()));

        assert!(matches!(
            fx.service.remove_admin(OWNER, &repo.repo_hash, OWNER),
            Err(VersioningError::InvalidInput(_))
        ));
        let roles = fx.service.remove_admin(OWNER, &repo.repo_hash, ADMIN).unwrap();
        assert_eq!(roles.admins, vec![OWNER.to_string()]);
    }

    #[tokio::test]
    async fn delete_repository_requires_admin() {
        let fx = fixture();
        let repo = fx.repo_with_roles("mnist");
        assert!(matches!(
            fx.service.delete_repository(WRITER, &repo.repo_hash).await,
            Err(VersioningError::NotAuthorized(_))
        ));
        assert!(fx
            .service
            .delete_repository(ADMIN, &repo.repo_hash)
            .await
            .unwrap()
            .is_none());
        assert!(matches!(
            fx.service.get_repository(&repo.repo_hash),
            Err(VersioningError::NotFound(_))
        ));
        assert!(fx.service.list_repositories(OWNER).unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_repository_unpins_commit_content() {
        let fx = fixture();
        let repo = fx.repo_with_roles("mnist");
        fx.service
            .upload_base_model(OWNER, &repo.repo_hash, b"base", "pt")
            .await
            .unwrap();
        let branch = fx
            .service
            .create_branch(
                OWNER,
                &repo.repo_hash,
                crate::versioning::model::NewBranch {
                    name: "main".into(),
                    description: None,
                    source_branch: None,
                },
            )
            .unwrap();
        let commit = fx
            .service
            .create_commit(WRITER, &repo.repo_hash, &branch.branch_hash, new_commit("c", b"p1"))
            .await
            .unwrap();
        let merger = fx
            .service
            .create_merger_commit(ADMIN, &repo.repo_hash, &branch.branch_hash, new_commit("m", b"m1"))
            .await
            .unwrap();
        assert_eq!(fx.store.len().await, 3);

        let removal = fx
            .service
            .delete_repository(OWNER, &repo.repo_hash)
            .await
            .unwrap()
            .unwrap();
        assert!(removal.unpinned);
        assert_eq!(fx.store.len().await, 0);
        for cid in [&commit.params.cid, &merger.params.cid, &removal.cid] {
            assert_eq!(fx.service.blob_references(cid).unwrap(), 0);
        }
    }

    #[tokio::test]
    async fn holding_unpinned_content_fails() {
        let fx = fixture();
        let db = fx.service.database();
        let record = fx
            .service
            .blobs()
            .upload(db, b"p1", "pt", Utc::now())
            .await
            .unwrap();
        assert!(fx.service.blobs().unpin_unreferenced(db, &record.cid).await.unwrap());

        let result = db.write(|tx| hold_blob(tx, &record.cid, "commit-1"));
        assert!(matches!(result, Err(VersioningError::InvalidTransition(_))));
        assert_eq!(fx.service.blob_references(&record.cid).unwrap(), 0);
    }
}
