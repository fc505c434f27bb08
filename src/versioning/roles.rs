// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository roles and the permission checks built on them.
//!
//! ## Role Sets
//!
//! - owner: a single wallet, member of every set, never removable
//! - admins: decide commits, create merger commits, delete branches and the
//!   repository, manage the base model and writers
//! - writers: create branches and commits
//! - contributors: informational, no permissions of their own

use super::error::{VersioningError, VersioningResult};
use super::model::{Repository, RoleSummary};

/// What an operation requires of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Create branches and commits, edit branch descriptions.
    Write,
    /// Owner or admin.
    Administer,
    /// Owner only.
    ManageAdmins,
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Permission::Write => write!(f, "owner or writer"),
            Permission::Administer => write!(f, "owner or admin"),
            Permission::ManageAdmins => write!(f, "owner"),
        }
    }
}

impl Repository {
    pub fn is_owner(&self, wallet: &str) -> bool {
        self.owner == wallet
    }

    pub fn is_admin(&self, wallet: &str) -> bool {
        self.is_owner(wallet) || self.admins.iter().any(|a| a == wallet)
    }

    pub fn is_writer(&self, wallet: &str) -> bool {
        self.is_owner(wallet) || self.writers.iter().any(|w| w == wallet)
    }

    pub fn allows(&self, wallet: &str, permission: Permission) -> bool {
        match permission {
            Permission::Write => self.is_writer(wallet),
            Permission::Administer => self.is_admin(wallet),
            Permission::ManageAdmins => self.is_owner(wallet),
        }
    }

    /// Fail with `NotAuthorized` unless `wallet` holds `permission`.
    pub fn authorize(&self, wallet: &str, permission: Permission) -> VersioningResult<()> {
        if self.allows(wallet, permission) {
            Ok(())
        } else {
            Err(VersioningError::NotAuthorized(format!(
                "requires {permission} of repository {}",
                self.repo_hash
            )))
        }
    }

    pub fn roles(&self) -> RoleSummary {
        RoleSummary {
            owner: self.owner.clone(),
            admins: self.admins.clone(),
            writers: self.writers.clone(),
            contributors: self.contributors.clone(),
        }
    }

    pub fn add_admin(&mut self, wallet: &str) -> VersioningResult<()> {
        if self.admins.iter().any(|a| a == wallet) {
            return Err(VersioningError::AlreadyExists(format!("admin {wallet}")));
        }
        self.admins.push(wallet.to_string());
        Ok(())
    }

    pub fn remove_admin(&mut self, wallet: &str) -> VersioningResult<()> {
        if self.is_owner(wallet) {
            return Err(VersioningError::InvalidInput(
                "the owner cannot be removed from admins".into(),
            ));
        }
        if !remove_member(&mut self.admins, wallet) {
            return Err(VersioningError::NotFound(format!("admin {wallet}")));
        }
        Ok(())
    }

    pub fn add_writer(&mut self, wallet: &str) -> VersioningResult<()> {
        if self.writers.iter().any(|w| w == wallet) {
            return Err(VersioningError::AlreadyExists(format!("writer {wallet}")));
        }
        self.writers.push(wallet.to_string());
        Ok(())
    }

    /// Owner and admins keep write access.
    pub fn revoke_writer(&mut self, wallet: &str) -> VersioningResult<()> {
        if self.is_admin(wallet) {
            return Err(VersioningError::InvalidInput(
                "cannot revoke write access of the owner or an admin".into(),
            ));
        }
        if !remove_member(&mut self.writers, wallet) {
            return Err(VersioningError::NotFound(format!("writer {wallet}")));
        }
        Ok(())
    }

    /// Record `wallet` as a contributor if it is not one yet.
    pub fn note_contributor(&mut self, wallet: &str) {
        if !self.contributors.iter().any(|c| c == wallet) {
            self.contributors.push(wallet.to_string());
        }
    }
}

fn remove_member(set: &mut Vec<String>, wallet: &str) -> bool {
    let before = set.len();
    set.retain(|m| m != wallet);
    set.len() != before
}

/// Apply bulk additions then removals to a role set, keeping order and
/// dropping duplicates. `protected` members are never removed.
pub fn apply_set_changes(
    set: &mut Vec<String>,
    add: &[String],
    remove: &[String],
    protected: &str,
) {
    for wallet in add {
        if !set.contains(wallet) {
            set.push(wallet.clone());
        }
    }
    set.retain(|m| m == protected || !remove.contains(m));
}
