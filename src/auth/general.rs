// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! General signed-message scheme.
//!
//! A bearer token is `base58(pubkey).base58(message).base58(signature)` where
//! `message` is an encoded [`ChallengeMessage`] carrying the authorized
//! `Action` and an `Expiration Time`. Tokens are self-contained: the server
//! keeps no session state.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::context::{AuthContext, AuthSettings};
use super::message::{format_timestamp, parse_timestamp, ChallengeMessage};
use super::signature::{decode_address, decode_base58, verify_ed25519};
use super::AuthError;

/// Statement shown to the user by the wallet.
pub const SIGN_IN_STATEMENT: &str = "Clicking Sign or Approve only means you have proved this wallet is owned by you. This request will not trigger any blockchain transaction or cost any gas fee.";

/// Build a fresh challenge for `address` to sign.
pub fn issue(
    settings: &AuthSettings,
    now: DateTime<Utc>,
    address: &str,
    action: &str,
    expiry: Duration,
) -> ChallengeMessage {
    ChallengeMessage {
        domain: settings.domain(),
        address: address.to_string(),
        statement: Some(SIGN_IN_STATEMENT.to_string()),
        action: Some(action.to_string()),
        uri: Some(settings.public_url.to_string()),
        version: Some("1".to_string()),
        chain_id: Some(settings.chain_id.clone()),
        nonce: Some(Uuid::new_v4().to_string()),
        issued_at: Some(format_timestamp(now)),
        expiration_time: Some(format_timestamp(now + expiry)),
        not_before: None,
        request_id: None,
        resources: Vec::new(),
    }
}

/// Verify a general-scheme token and return the signer's address.
///
/// An elapsed `Expiration Time` is reported as [`AuthError::Expired`] even
/// when the signature is also bad.
pub fn verify(token: &str, ctx: &AuthContext, now: DateTime<Utc>) -> Result<String, AuthError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    let [pk, msg, sig] = segments.as_slice() else {
        return Err(AuthError::MalformedToken);
    };

    let public_key = decode_address(pk)?;
    let message_bytes = decode_base58(msg)?;
    let signature = decode_base58(sig)?;

    let text = String::from_utf8(message_bytes).map_err(|_| AuthError::MalformedToken)?;
    let message = ChallengeMessage::decode(&text);

    let expiration = message
        .expiration_time
        .as_deref()
        .map(|value| parse_timestamp(value).ok_or(AuthError::MalformedToken))
        .transpose()?;
    if expiration.is_some_and(|exp| now > exp) {
        return Err(AuthError::Expired);
    }

    if !verify_ed25519(&public_key, text.as_bytes(), &signature) {
        return Err(AuthError::InvalidSignature);
    }

    let (Some(action), Some(_)) = (message.action.as_deref(), expiration) else {
        return Err(AuthError::MissingFields);
    };
    ctx.check_action(action)?;

    Ok(pk.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::context::actions;
    use crate::auth::signature::testing::TestWallet;
    use chrono::TimeZone;
    use url::Url;

    fn settings() -> AuthSettings {
        AuthSettings {
            public_url: Url::parse("https://flair.example").unwrap(),
            chain_id: "mainnet".into(),
            issued_at_threshold: Duration::minutes(10),
            challenge_expiry: Duration::minutes(10),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap()
    }

    fn token(wallet: &TestWallet, action: &str) -> String {
        let message = issue(&settings(), now(), &wallet.address(), action, Duration::minutes(10));
        wallet.token_for(&message)
    }

    #[test]
    fn issue_stamps_fields() {
        let message = issue(&settings(), now(), "addr", "signin", Duration::minutes(5));
        assert_eq!(message.domain, "flair.example");
        assert_eq!(message.action.as_deref(), Some("signin"));
        assert_eq!(message.issued_at.as_deref(), Some("2026-05-01T09:00:00.000Z"));
        assert_eq!(message.expiration_time.as_deref(), Some("2026-05-01T09:05:00.000Z"));
        assert_eq!(message.chain_id.as_deref(), Some("mainnet"));
    }

    #[test]
    fn nonces_are_unique() {
        let a = issue(&settings(), now(), "addr", "signin", Duration::minutes(5));
        let b = issue(&settings(), now(), "addr", "signin", Duration::minutes(5));
        assert_ne!(a.nonce, b.nonce);
    }

    #[test]
    fn valid_token_returns_address() {
        let wallet = TestWallet::generate();
        let token = token(&wallet, actions::CREATE_REPOSITORY);
        let ctx = AuthContext::action(actions::CREATE_REPOSITORY);
        assert_eq!(verify(&token, &ctx, now()).unwrap(), wallet.address());
    }

    #[test]
    fn wrong_segment_count_is_malformed() {
        let ctx = AuthContext::read();
        assert_eq!(verify("a.b", &ctx, now()), Err(AuthError::MalformedToken));
        assert_eq!(verify("a.b.c.d", &ctx, now()), Err(AuthError::MalformedToken));
        assert_eq!(verify("", &ctx, now()), Err(AuthError::MalformedToken));
    }

    #[test]
    fn bad_base58_is_malformed() {
        let ctx = AuthContext::read();
        assert_eq!(verify("0OIl.abc.abc", &ctx, now()), Err(AuthError::MalformedToken));
    }

    #[test]
    fn key_segment_must_be_a_public_key() {
        let wallet = TestWallet::generate();
        let good = token(&wallet, "signin");
        let short_key = bs58::encode([7u8; 16]).into_string();
        let forged = good.replacen(&wallet.address(), &short_key, 1);
        assert_eq!(
            verify(&forged, &AuthContext::read(), now()),
            Err(AuthError::MalformedToken)
        );
    }

    #[test]
    fn tampered_signature_is_invalid() {
        let wallet = TestWallet::generate();
        let message = issue(&settings(), now(), &wallet.address(), "signin", Duration::minutes(10));
        let text = message.encode();
        let mut signature = wallet.sign(text.as_bytes());
        signature[0] ^= 0xff;
        let token = format!(
            "{}.{}.{}",
            wallet.address(),
            bs58::encode(text.as_bytes()).into_string(),
            bs58::encode(signature).into_string()
        );
        assert_eq!(
            verify(&token, &AuthContext::read(), now()),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn other_signer_is_invalid() {
        let wallet = TestWallet::generate();
        let other = TestWallet::generate();
        let good = token(&wallet, "signin");
        let forged = good.replacen(&wallet.address(), &other.address(), 1);
        assert_eq!(
            verify(&forged, &AuthContext::read(), now()),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn expired_token_fails_even_with_bad_signature() {
        let wallet = TestWallet::generate();
        let token = token(&wallet, "signin");
        let later = now() + Duration::minutes(11);
        assert_eq!(verify(&token, &AuthContext::read(), later), Err(AuthError::Expired));

        let other = TestWallet::generate();
        let forged = token.replacen(&wallet.address(), &other.address(), 1);
        assert_eq!(verify(&forged, &AuthContext::read(), later), Err(AuthError::Expired));
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let wallet = TestWallet::generate();
        let token = token(&wallet, "signin");
        let at_expiry = now() + Duration::minutes(10);
        assert!(verify(&token, &AuthContext::read(), at_expiry).is_ok());
    }

    #[test]
    fn missing_action_or_expiry_fails() {
        let wallet = TestWallet::generate();
        let mut message = issue(&settings(), now(), &wallet.address(), "signin", Duration::minutes(10));
        message.action = None;
        assert_eq!(
            verify(&wallet.token_for(&message), &AuthContext::read(), now()),
            Err(AuthError::MissingFields)
        );

        let mut message = issue(&settings(), now(), &wallet.address(), "signin", Duration::minutes(10));
        message.expiration_time = None;
        assert_eq!(
            verify(&wallet.token_for(&message), &AuthContext::read(), now()),
            Err(AuthError::MissingFields)
        );
    }

    #[test]
    fn unparsable_expiry_is_malformed() {
        let wallet = TestWallet::generate();
        let mut message = issue(&settings(), now(), &wallet.address(), "signin", Duration::minutes(10));
        message.expiration_time = Some("tomorrow".into());
        assert_eq!(
            verify(&wallet.token_for(&message), &AuthContext::read(), now()),
            Err(AuthError::MalformedToken)
        );
    }

    #[test]
    fn action_mismatch_unless_skip_allowed() {
        let wallet = TestWallet::generate();
        let commit_ctx = AuthContext::action(actions::CREATE_COMMIT);

        let wrong = token(&wallet, actions::DELETE_BRANCH);
        assert!(matches!(
            verify(&wrong, &commit_ctx, now()),
            Err(AuthError::ActionMismatch { .. })
        ));

        let skip = token(&wallet, "skip");
        assert!(matches!(
            verify(&skip, &commit_ctx, now()),
            Err(AuthError::ActionMismatch { .. })
        ));
        assert!(verify(&skip, &AuthContext::read(), now()).is_ok());
    }
}
