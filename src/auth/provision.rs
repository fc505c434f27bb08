// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity provisioning after a successful authentication.
//!
//! Provisioning is fire-and-forget: the request that authenticated does not
//! wait for it, and a failure is logged rather than surfaced. Operations that
//! need the user record create it themselves inside their own transaction.

use std::sync::Arc;

use crate::versioning::{VersioningResult, VersioningService};

/// Creates the identity record for a wallet if it does not exist.
pub trait IdentityProvisioner: Send + Sync + 'static {
    /// Returns `true` when a new identity was created.
    fn ensure_identity(&self, wallet: &str) -> VersioningResult<bool>;
}

impl IdentityProvisioner for VersioningService {
    fn ensure_identity(&self, wallet: &str) -> VersioningResult<bool> {
        self.ensure_user(wallet)
    }
}

/// Provision `wallet` in the background.
///
/// Runs on the blocking pool when called inside a Tokio runtime and inline
/// otherwise.
pub fn spawn_provisioning(provisioner: Arc<dyn IdentityProvisioner>, wallet: String) {
    let run = move || {
        if let Err(e) = provisioner.ensure_identity(&wallet) {
            tracing::warn!(wallet = %wallet, error = %e, "Failed to provision identity");
        }
    };

    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn_blocking(run);
        }
        Err(_) => run(),
    }
}
