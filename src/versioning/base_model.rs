// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Base-model management.
//!
//! A repository's base model can be replaced or removed only while the
//! repository has no commits. The check and the attach happen in the same
//! write transaction, so a commit created concurrently either lands before
//! the guard (and the upload is rejected) or after the attach.
//!
//! Content is shared by hash. The repository holds its base model in
//! `blob_refs` alongside commits and branches, and content is unpinned when
//! the last holder lets go.

use crate::storage::database::REPOSITORIES;
use crate::storage::BlobRecord;

use super::error::{VersioningError, VersioningResult};
use super::model::{BaseModelRemoval, Repository};
use super::roles::Permission;
use super::service::{hold_blob, load_repo, release_blob, VersioningService};

/// Fail when the base model is frozen by existing commits.
fn check_base_model_mutable(repo: &Repository) -> VersioningResult<()> {
    if repo.base_model.is_some() && repo.commit_count > 0 {
        return Err(VersioningError::ModelAlreadyExists);
    }
    Ok(())
}

impl VersioningService {
    /// Upload and attach a base model. Owner or admin only.
    pub async fn upload_base_model(
        &self,
        wallet: &str,
        repo_hash: &str,
        content: &[u8],
        extension: &str,
    ) -> VersioningResult<BlobRecord> {
        if content.is_empty() {
            return Err(VersioningError::InvalidInput("base model is empty".into()));
        }

        self.db.read(|tx| -> VersioningResult<()> {
            let repo = load_repo(tx, repo_hash)?;
            repo.authorize(wallet, Permission::Administer)?;
            check_base_model_mutable(&repo)
        })?;

        let now = self.now();
        let record = self.blobs.upload(&self.db, content, extension, now).await?;

        let attached = self.db.write(|tx| -> VersioningResult<Option<String>> {
            let mut repo = load_repo(tx, repo_hash)?;
            repo.authorize(wallet, Permission::Administer)?;
            check_base_model_mutable(&repo)?;

            hold_blob(tx, &record.cid, repo_hash)?;
            let orphaned = match repo.base_model.replace(record.cid.clone()) {
                Some(previous) if previous != record.cid => {
                    release_blob(tx, &previous, repo_hash)?.then_some(previous)
                }
                _ => None,
            };
            repo.updated_at = now;
            tx.put(REPOSITORIES, &repo.repo_hash, &repo)?;
            Ok(orphaned)
        });
        let replaced = match attached {
            Ok(replaced) => replaced,
            Err(e) => {
                // Lost a race with a commit or a role change after the upload.
                self.unpin_quietly(&record.cid).await;
                return Err(e);
            }
        };

        tracing::info!(repo = %repo_hash, cid = %record.cid, "Attached base model");

        if let Some(previous) = replaced {
            self.unpin_quietly(&previous).await;
        }
        Ok(record)
    }

    /// Stored record of the base model, including its fetch URL.
    pub fn base_model(&self, repo_hash: &str) -> VersioningResult<BlobRecord> {
        let cid = self
            .get_repository(repo_hash)?
            .base_model
            .ok_or_else(|| VersioningError::NotFound("base model".into()))?;
        Ok(self
            .blobs
            .record(&self.db, &cid)?
            .unwrap_or_else(|| BlobRecord {
                uri: self.blobs.url_for(&cid),
                cid,
                extension: String::new(),
                size: 0,
                created_at: self.now(),
            }))
    }

    /// Detach the base model. Owner or admin only, and only while the
    /// repository has no commits.
    pub async fn delete_base_model(
        &self,
        wallet: &str,
        repo_hash: &str,
    ) -> VersioningResult<BaseModelRemoval> {
        let now = self.now();
        let (cid, last_ref) = self.db.write(|tx| -> VersioningResult<(String, bool)> {
            let mut repo = load_repo(tx, repo_hash)?;
            repo.authorize(wallet, Permission::Administer)?;
            check_base_model_mutable(&repo)?;

            let cid = repo
                .base_model
                .take()
                .ok_or_else(|| VersioningError::NotFound("base model".into()))?;
            let last_ref = release_blob(tx, &cid, repo_hash)?;
            repo.updated_at = now;
            tx.put(REPOSITORIES, &repo.repo_hash, &repo)?;
            Ok((cid, last_ref))
        })?;

        let unpinned = last_ref && self.unpin_quietly(&cid).await;
        tracing::info!(repo = %repo_hash, cid = %cid, unpinned, "Removed base model");
        Ok(BaseModelRemoval { cid, unpinned })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::content_hash;
    use crate::versioning::model::NewBranch;
    use crate::versioning::service::testing::*;

    fn main_branch() -> NewBranch {
        NewBranch {
            name: "main".into(),
            description: None,
            source_branch: None,
        }
    }

    #[tokio::test]
    async fn identical_uploads_are_stored_once() {
        let fx = fixture();
        let a = fx.service.create_repository(OWNER, new_repo("a")).unwrap();
        let b = fx.service.create_repository(OWNER, new_repo("b")).unwrap();

        let first = fx
            .service
            .upload_base_model(OWNER, &a.repo_hash, b"resnet", "pt")
            .await
            .unwrap();
        let second = fx
            .service
            .upload_base_model(OWNER, &b.repo_hash, b"resnet", "pt")
            .await
            .unwrap();

        assert_eq!(first.cid, content_hash(b"resnet"));
        assert_eq!(first.cid, second.cid);
        assert_eq!(fx.store.writes(), 1);
        assert_eq!(fx.service.blob_references(&first.cid).unwrap(), 2);
    }

    #[tokio::test]
    async fn shared_content_is_unpinned_with_last_reference() {
        let fx = fixture();
        let a = fx.service.create_repository(OWNER, new_repo("a")).unwrap();
        let b = fx.service.create_repository(OWNER, new_repo("b")).unwrap();
        let record = fx
            .service
            .upload_base_model(OWNER, &a.repo_hash, b"resnet", "pt")
            .await
            .unwrap();
        fx.service
            .upload_base_model(OWNER, &b.repo_hash, b"resnet", "pt")
            .await
            .unwrap();

        let removal = fx.service.delete_base_model(OWNER, &a.repo_hash).await.unwrap();
        assert!(!removal.unpinned);
        assert!(fx.store.contains(&record.cid).await);
        assert_eq!(fx.service.base_model(&b.repo_hash).unwrap().cid, record.cid);

        let removal = fx
            .service
            .delete_repository(OWNER, &b.repo_hash)
            .await
            .unwrap()
            .unwrap();
        assert!(removal.unpinned);
        assert!(!fx.store.contains(&record.cid).await);
        assert_eq!(fx.service.blob_references(&record.cid).unwrap(), 0);
    }

    #[tokio::test]
    async fn removing_a_base_model_keeps_content_held_by_commits() {
        let fx = fixture();
        let a = fx.service.create_repository(OWNER, new_repo("a")).unwrap();
        let b = fx.service.create_repository(OWNER, new_repo("b")).unwrap();
        fx.service
            .upload_base_model(OWNER, &a.repo_hash, b"base", "pt")
            .await
            .unwrap();
        let branch = fx
            .service
            .create_branch(OWNER, &a.repo_hash, main_branch())
            .unwrap();
        let commit = fx
            .service
            .create_commit(OWNER, &a.repo_hash, &branch.branch_hash, new_commit("c", b"weights"))
            .await
            .unwrap();

        let shared = fx
            .service
            .upload_base_model(OWNER, &b.repo_hash, b"weights", "pt")
            .await
            .unwrap();
        assert_eq!(shared.cid, commit.params.cid);
        assert_eq!(fx.service.blob_references(&shared.cid).unwrap(), 2);

        let removal = fx.service.delete_base_model(OWNER, &b.repo_hash).await.unwrap();
        assert!(!removal.unpinned);
        assert!(fx.store.contains(&shared.cid).await);
        assert!(fx.service.blobs().record(fx.service.database(), &shared.cid).unwrap().is_some());
        assert_eq!(fx.service.blob_references(&shared.cid).unwrap(), 1);
    }

    #[tokio::test]
    async fn base_model_freezes_after_first_commit() {
        let fx = fixture();
        let repo = fx.repo_with_roles("mnist");
        fx.service
            .upload_base_model(ADMIN, &repo.repo_hash, b"v1", "pt")
            .await
            .unwrap();

        // Replacing before any commit is allowed and releases the old content.
        let v2 = fx
            .service
            .upload_base_model(ADMIN, &repo.repo_hash, b"v2", "pt")
            .await
            .unwrap();
        assert!(!fx.store.contains(&content_hash(b"v1")).await);

        let branch = fx
            .service
            .create_branch(OWNER, &repo.repo_hash, main_branch())
            .unwrap();
        fx.service
            .create_commit(WRITER, &repo.repo_hash, &branch.branch_hash, new_commit("c", b"p"))
            .await
            .unwrap();

        let writes_before = fx.store.writes();
        assert!(matches!(
            fx.service
                .upload_base_model(OWNER, &repo.repo_hash, b"v3", "pt")
                .await,
            Err(VersioningError::ModelAlreadyExists)
        ));
        assert_eq!(fx.store.writes(), writes_before);
        assert!(matches!(
            fx.service.delete_base_model(OWNER, &repo.repo_hash).await,
            Err(VersioningError::ModelAlreadyExists)
        ));
        assert_eq!(fx.service.base_model(&repo.repo_hash).unwrap().cid, v2.cid);
    }

    #[tokio::test]
    async fn writers_cannot_manage_base_model() {
        let fx = fixture();
        let repo = fx.repo_with_roles("mnist");
        assert!(matches!(
            fx.service
                .upload_base_model(WRITER, &repo.repo_hash, b"v1", "pt")
                .await,
            Err(VersioningError::NotAuthorized(_))
        ));
        assert_eq!(fx.store.writes(), 0);
    }

    #[tokio::test]
    async fn missing_base_model_is_not_found() {
        let fx = fixture();
        let repo = fx.repo_with_roles("mnist");
        assert!(matches!(
            fx.service.base_model(&repo.repo_hash),
            Err(VersioningError::NotFound(_))
        ));
        assert!(matches!(
            fx.service.delete_base_model(OWNER, &repo.repo_hash).await,
            Err(VersioningError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn base_model_record_has_gateway_url() {
        let fx = fixture();
        let repo = fx.repo_with_roles("mnist");
        let record = fx
            .service
            .upload_base_model(OWNER, &repo.repo_hash, b"v1", ".h5")
            .await
            .unwrap();
        let fetched = fx.service.base_model(&repo.repo_hash).unwrap();
        assert_eq!(fetched, record);
        assert_eq!(fetched.extension, "h5");
        assert_eq!(fetched.uri, format!("https://flair.example/v1/blobs/{}", record.cid));
    }
}
