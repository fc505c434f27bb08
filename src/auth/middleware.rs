// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-route authentication middleware for Axum.
//!
//! Each protected route is wrapped with its own [`AuthGate`], which carries
//! the action the route requires. On success the resolved
//! [`AuthenticatedWallet`] is inserted into the request extensions, where
//! the [`Auth`](super::Auth) extractor picks it up.
//!
//! ```rust,ignore
//! let gate = AuthGate::new(state.auth.clone(), AuthContext::action(actions::CREATE_COMMIT));
//! let route = post(create_commit)
//!     .route_layer(axum::middleware::from_fn_with_state(gate, require_auth));
//! ```

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::context::{AuthContext, AuthenticatedWallet};
use super::credentials::{Authenticator, Credentials};
use super::AuthError;

/// Middleware state: who verifies and what the route requires.
#[derive(Debug, Clone)]
pub struct AuthGate {
    pub authenticator: Authenticator,
    pub ctx: AuthContext,
}

impl AuthGate {
    pub fn new(authenticator: Authenticator, ctx: AuthContext) -> Self {
        Self { authenticator, ctx }
    }
}

/// Parse the `Authorization` header and authenticate it for `ctx`.
pub fn authenticate_headers(
    headers: &HeaderMap,
    authenticator: &Authenticator,
    ctx: &AuthContext,
) -> Result<AuthenticatedWallet, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;
    let credentials = Credentials::from_authorization_header(value)?;
    authenticator.authenticate(&credentials, ctx)
}

/// Authentication middleware function.
pub async fn require_auth(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate_headers(request.headers(), &gate.authenticator, &gate.ctx) {
        Ok(wallet) => {
            tracing::debug!(
                wallet = %wallet.wallet,
                action = %gate.ctx.action,
                "Authenticated request"
            );
            request.extensions_mut().insert(wallet);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}
