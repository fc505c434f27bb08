// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the authenticated wallet.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(caller): Auth) -> impl IntoResponse {
//!     // caller.wallet is the base58 public key
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::context::{AuthContext, AuthenticatedWallet};
use super::middleware::authenticate_headers;
use super::AuthError;
use crate::state::AppState;

/// Wallet resolved by [`require_auth`](super::middleware::require_auth).
///
/// Routes without an auth gate fall back to verifying the header for a
/// read context.
pub struct Auth(pub AuthenticatedWallet);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(wallet) = parts.extensions.get::<AuthenticatedWallet>().cloned() {
            return Ok(Auth(wallet));
        }

        let wallet = authenticate_headers(&parts.headers, &state.auth, &AuthContext::read())?;
        Ok(Auth(wallet))
    }
}
