// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tracing::{error, info};

use flair_registry::{
    api::router,
    auth::Authenticator,
    clock::{SharedClock, SystemClock},
    config::{AppConfig, TlsPaths},
    logging::{init_tracing, LogFormat},
    state::AppState,
    storage::{BlobFacade, FsBlobStore, RegistryDatabase, StoragePaths},
    versioning::{UnconfiguredMinter, VersioningService},
};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(LogFormat::default());
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };
    init_tracing(config.log_format);

    if let Err(e) = run(config).await {
        error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let paths = StoragePaths::new(&config.data_dir);
    let db = RegistryDatabase::open(&paths.database_file())?;
    let blobs = BlobFacade::new(
        Arc::new(FsBlobStore::new(paths.clone())),
        config.gateway_url.as_str(),
    );
    let clock: SharedClock = Arc::new(SystemClock);

    let registry = VersioningService::new(db, blobs, Arc::new(UnconfiguredMinter), clock.clone());
    let auth = Authenticator::new(config.auth_settings(), clock);
    let state = AppState::new(registry, auth, config.data_dir.clone());
    let app = router(state);

    let handle = Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        info!("Received shutdown signal");
        shutdown.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    let addr = config.bind_addr;
    match &config.tls {
        Some(TlsPaths { cert, key }) => {
            // ring must be the process-wide provider before any TLS config is built
            let _ = rustls::crypto::ring::default_provider().install_default();
            let tls = RustlsConfig::from_pem_file(cert, key).await?;
            info!(%addr, data_dir = %config.data_dir.display(), "Flair registry listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            info!(%addr, data_dir = %config.data_dir.display(), "Flair registry listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }

    info!("Server stopped");
    Ok(())
}
