// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Flair Registry - Wallet-Authenticated Model Versioning Service
//!
//! Solana wallets sign in with detached ed25519 signatures and then manage
//! Git-like repositories of collaboratively trained ML models.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Wallet sign-in (general signed-message tokens and SIWS)
//! - `client` - Registry HTTP client with a local signing key
//! - `storage` - redb database and content-addressed blobs
//! - `versioning` - Repositories, branches, commits and base models

pub mod api;
pub mod auth;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod state;
pub mod storage;
pub mod versioning;
