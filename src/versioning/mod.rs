// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Versioning Module
//!
//! Git-like history for ML model repositories.
//!
//! ```text
//! Repository ──< Branch ──< Commit
//!     │                       │
//!     └── base model (cid)    └── params (cid), zkml proof, nft
//! ```
//!
//! All operations go through [`VersioningService`]. Authorization is
//! decided by the repository role sets (see [`roles`]); the wallet comes
//! from the authenticated request.

pub mod base_model;
pub mod branches;
pub mod commits;
pub mod error;
pub mod grouping;
pub mod model;
pub mod nft;
pub mod roles;
pub mod service;

pub use error::{VersioningError, VersioningResult};
pub use nft::{MintError, NftMinter, UnconfiguredMinter};
pub use roles::Permission;
pub use service::VersioningService;
