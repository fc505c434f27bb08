// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Wallet-signature authentication for the registry API.
//!
//! ## Auth Flow
//!
//! 1. Client requests a challenge: `GET /v1/auth/signin/{address}`
//! 2. Wallet signs the encoded challenge (ed25519 over the UTF-8 text)
//! 3. Client presents one of:
//!    - general token `base58(pubkey).base58(message).base58(signature)`
//!    - a SIWS input/output pair (Sign-In-With-Solana)
//! 4. Server:
//!    - verifies the signature and expiry (general) or the SIWS fields
//!    - checks the signed action against the route's [`AuthContext`]
//!    - provisions the wallet's identity in the background
//!
//! ## Security
//!
//! - Every token is bound to one action; read routes also accept `skip`
//! - SIWS input carries no action, so SIWS credentials only open sign-in
//!   and read routes
//! - Timestamps are checked against an injectable clock

pub mod context;
pub mod credentials;
pub mod error;
pub mod extractor;
pub mod general;
pub mod message;
pub mod middleware;
pub mod provision;
pub mod signature;
pub mod siws;

pub use context::{actions, AuthContext, AuthScheme, AuthSettings, AuthenticatedWallet};
pub use credentials::{Authenticator, Credentials};
pub use error::AuthError;
pub use extractor::Auth;
pub use message::ChallengeMessage;
pub use middleware::{require_auth, AuthGate};
pub use provision::IdentityProvisioner;
