// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::Authenticator;
use crate::versioning::VersioningService;

/// Shared handler state. Cloning is cheap; every field is reference counted.
#[derive(Clone, Debug)]
pub struct AppState {
    pub registry: VersioningService,
    pub auth: Authenticator,
    /// Root of the database and blob store, checked by `/health`.
    pub data_dir: PathBuf,
}

impl AppState {
    /// Wire the authenticator to provision identities in `registry`.
    pub fn new(registry: VersioningService, auth: Authenticator, data_dir: PathBuf) -> Self {
        let auth = auth.with_provisioner(Arc::new(registry.clone()));
        Self {
            registry,
            auth,
            data_dir,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;
    use url::Url;

    use super::*;
    use crate::auth::AuthSettings;
    use crate::clock::FixedClock;
    use crate::storage::{BlobFacade, MemoryBlobStore, RegistryDatabase};
    use crate::versioning::nft::testing::RecordingMinter;

    pub fn test_settings() -> AuthSettings {
        AuthSettings {
            public_url: Url::parse("https://flair.example").unwrap(),
            chain_id: "mainnet".into(),
            issued_at_threshold: Duration::minutes(10),
            challenge_expiry: Duration::minutes(10),
        }
    }

    /// State over a temporary database, in-memory blobs and a pinned clock.
    pub fn test_state() -> (AppState, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = RegistryDatabase::open(&dir.path().join("registry.redb")).unwrap();
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        ));
        let registry = VersioningService::new(
            db,
            BlobFacade::new(
                Arc::new(MemoryBlobStore::new()),
                "https://flair.example/v1/blobs",
            ),
            Arc::new(RecordingMinter::default()),
            clock.clone(),
        );
        let auth = Authenticator::new(test_settings(), clock);
        let state = AppState::new(registry, auth, dir.path().to_path_buf());
        (state, dir)
    }
}
