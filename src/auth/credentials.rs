// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credentials presented by callers and the authenticator that resolves them.
//!
//! ## Authorization Header
//!
//! ```text
//! Authorization: Bearer <pubkey>.<message>.<signature>   general scheme (base58)
//! Authorization: Bearer siws <base64(json SiwsCredential)> SIWS
//! ```
//!
//! The sign-in endpoint takes the same union as a JSON body tagged by
//! `scheme`.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::clock::SharedClock;

use super::context::{AuthContext, AuthScheme, AuthSettings, AuthenticatedWallet};
use super::message::ChallengeMessage;
use super::provision::{spawn_provisioning, IdentityProvisioner};
use super::signature::decode_address;
use super::{general, siws, AuthError};

/// Prefix that marks a SIWS credential inside a bearer token:
/// `Bearer siws<base64(json)>`. A space after the prefix is tolerated.
pub const SIWS_TOKEN_PREFIX: &str = "siws";

/// Tagged union over the supported schemes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum Credentials {
    General { token: String },
    Siws(siws::SiwsCredential),
}

impl Credentials {
    pub fn scheme(&self) -> AuthScheme {
        match self {
            Credentials::General { .. } => AuthScheme::General,
            Credentials::Siws(_) => AuthScheme::Siws,
        }
    }

    /// Parse the value of an `Authorization` header.
    pub fn from_authorization_header(value: &str) -> Result<Self, AuthError> {
        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::InvalidAuthHeader)?;

        // General tokens always contain '.', which base64 never does.
        match token
            .strip_prefix(SIWS_TOKEN_PREFIX)
            .filter(|rest| !rest.contains('.'))
        {
            Some(encoded) => {
                let json = STANDARD
                    .decode(encoded.trim())
                    .map_err(|_| AuthError::MalformedToken)?;
                let credential =
                    serde_json::from_slice(&json).map_err(|_| AuthError::MalformedToken)?;
                Ok(Credentials::Siws(credential))
            }
            None => Ok(Credentials::General {
                token: token.to_string(),
            }),
        }
    }

    /// Render as an `Authorization` header value.
    pub fn to_authorization_header(&self) -> Result<String, AuthError> {
        match self {
            Credentials::General { token } => Ok(format!("Bearer {token}")),
            Credentials::Siws(credential) => {
                let json = serde_json::to_vec(credential)
                    .map_err(|e| AuthError::InternalError(e.to_string()))?;
                Ok(format!("Bearer {SIWS_TOKEN_PREFIX}{}", STANDARD.encode(json)))
            }
        }
    }
}

/// Verifies credentials against the server's settings and clock.
#[derive(Clone)]
pub struct Authenticator {
    settings: Arc<AuthSettings>,
    clock: SharedClock,
    provisioner: Option<Arc<dyn IdentityProvisioner>>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("settings", &self.settings)
            .field("provisioning", &self.provisioner.is_some())
            .finish()
    }
}

impl Authenticator {
    pub fn new(settings: AuthSettings, clock: SharedClock) -> Self {
        Self {
            settings: Arc::new(settings),
            clock,
            provisioner: None,
        }
    }

    /// Provision an identity after every successful authentication.
    pub fn with_provisioner(mut self, provisioner: Arc<dyn IdentityProvisioner>) -> Self {
        self.provisioner = Some(provisioner);
        self
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// Fresh challenge for `address` bound to `action`.
    pub fn challenge(&self, address: &str, action: &str) -> Result<ChallengeMessage, AuthError> {
        decode_address(address)?;
        Ok(general::issue(
            &self.settings,
            self.clock.now(),
            address,
            action,
            self.settings.challenge_expiry,
        ))
    }

    /// Resolve the caller's wallet for `ctx`.
    pub fn authenticate(
        &self,
        credentials: &Credentials,
        ctx: &AuthContext,
    ) -> Result<AuthenticatedWallet, AuthError> {
        let now = self.clock.now();
        let result = match credentials {
            Credentials::General { token } => general::verify(token, ctx, now),
            Credentials::Siws(credential) => {
                siws::authenticate(credential, &self.settings, ctx, now)
            }
        };

        let wallet = match result {
            Ok(wallet) => wallet,
            Err(e) => {
                tracing::debug!(
                    scheme = ?credentials.scheme(),
                    action = %ctx.action,
                    error_code = e.error_code(),
                    "Authentication rejected"
                );
                return Err(e);
            }
        };

        if let Some(provisioner) = &self.provisioner {
            spawn_provisioning(provisioner.clone(), wallet.clone());
        }

        Ok(AuthenticatedWallet {
            wallet,
            scheme: credentials.scheme(),
        })
    }
}
