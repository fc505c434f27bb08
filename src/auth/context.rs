// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-route authentication context and server-side expectations.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

use super::AuthError;

/// Signed action that read-only routes accept in place of their own.
pub const SKIP_ACTION: &str = "skip";

/// Action names bound into signed challenges.
pub mod actions {
    pub const SIGNIN: &str = "signin";
    pub const UPDATE_PROFILE: &str = "update_profile";
    pub const CREATE_REPOSITORY: &str = "create_repository";
    pub const UPDATE_REPOSITORY: &str = "update_repository";
    pub const DELETE_REPOSITORY: &str = "delete_repository";
    pub const MANAGE_ROLES: &str = "manage_roles";
    pub const CREATE_BRANCH: &str = "create_branch";
    pub const UPDATE_BRANCH: &str = "update_branch";
    pub const DELETE_BRANCH: &str = "delete_branch";
    pub const CREATE_COMMIT: &str = "create_commit";
    pub const MERGE_COMMITS: &str = "merge_commits";
    pub const MINT_NFT: &str = "mint_nft";
    pub const UPLOAD_MODEL: &str = "upload_model";
    pub const DELETE_MODEL: &str = "delete_model";
}

/// What a protected route requires of the presented credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub action: String,
    /// Accept a credential signed for [`SKIP_ACTION`].
    pub allow_skip_check: bool,
}

impl AuthContext {
    /// Context for a mutating operation: the signed action must match exactly.
    pub fn action(action: &str) -> Self {
        Self {
            action: action.to_string(),
            allow_skip_check: false,
        }
    }

    /// Context for read-only routes: `signin` or `skip` tokens are accepted.
    pub fn read() -> Self {
        Self {
            action: actions::SIGNIN.to_string(),
            allow_skip_check: true,
        }
    }

    /// Check a signed action against this context.
    pub fn check_action(&self, signed: &str) -> Result<(), AuthError> {
        let signed = signed.trim();
        if self.allow_skip_check && signed == SKIP_ACTION {
            return Ok(());
        }
        if signed != self.action {
            return Err(AuthError::ActionMismatch {
                expected: self.action.clone(),
                found: signed.to_string(),
            });
        }
        Ok(())
    }
}

/// Which scheme resolved the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    General,
    Siws,
}

/// Caller identity attached to the request after authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedWallet {
    /// Base58 public key.
    pub wallet: String,
    pub scheme: AuthScheme,
}

/// Server-side values challenges are issued with and checked against.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Public URL of this service. Its host is the SIWS domain.
    pub public_url: Url,
    pub chain_id: String,
    pub issued_at_threshold: Duration,
    pub challenge_expiry: Duration,
}

impl AuthSettings {
    /// Host of the public URL, with the port when it is not the default.
    pub fn domain(&self) -> String {
        url_host(&self.public_url).unwrap_or_default()
    }

    pub fn origin(&self) -> String {
        self.public_url.origin().ascii_serialization()
    }
}

/// `host[:port]` as browsers report `URL.host`.
pub fn url_host(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_action_passes() {
        let ctx = AuthContext::action(actions::CREATE_COMMIT);
        assert!(ctx.check_action("create_commit").is_ok());
        assert!(ctx.check_action("  create_commit \n").is_ok());
    }

    #[test]
    fn skip_requires_allow_skip_check() {
        let strict = AuthContext::action(actions::CREATE_COMMIT);
        assert_eq!(
            strict.check_action("skip"),
            Err(AuthError::ActionMismatch {
                expected: "create_commit".into(),
                found: "skip".into(),
            })
        );
        assert!(AuthContext::read().check_action("skip").is_ok());
    }

    #[test]
    fn read_context_rejects_other_actions() {
        let ctx = AuthContext::read();
        assert!(ctx.check_action("signin").is_ok());
        assert!(matches!(
            ctx.check_action("delete_repository"),
            Err(AuthError::ActionMismatch { .. })
        ));
    }

    #[test]
    fn domain_includes_non_default_port() {
        let settings = AuthSettings {
            public_url: Url::parse("http://localhost:8080/app").unwrap(),
            chain_id: "mainnet".into(),
            issued_at_threshold: Duration::minutes(10),
            challenge_expiry: Duration::minutes(10),
        };
        assert_eq!(settings.domain(), "localhost:8080");
        assert_eq!(settings.origin(), "http://localhost:8080");

        let https = Url::parse("https://flair.example:443/").unwrap();
        assert_eq!(url_host(&https).as_deref(), Some("flair.example"));
    }
}
