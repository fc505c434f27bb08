// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sign-In-With-Solana scheme.
//!
//! The wallet signs the canonical SIWS text built from a sign-in input. The
//! server rebuilds that text from the input it receives, requires it to be
//! byte-identical to the signed message, and checks every input field
//! against its own expectations. All field mismatches are reported together.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;
use utoipa::ToSchema;

use super::context::{actions, url_host, AuthContext, AuthSettings};
use super::message::{parse_timestamp, ChallengeMessage};
use super::signature::{decode_address, verify_ed25519};
use super::AuthError;

/// A single SIWS field check that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SiwsMismatch {
    AddressMismatch,
    DomainMismatch,
    UriMismatch,
    ChainIdMismatch,
    IssuedTooFarInThePast,
    IssuedTooFarInTheFuture,
    Expired,
    ExpiresBeforeIssuance,
    ValidAfterExpiration,
}

impl SiwsMismatch {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiwsMismatch::AddressMismatch => "ADDRESS_MISMATCH",
            SiwsMismatch::DomainMismatch => "DOMAIN_MISMATCH",
            SiwsMismatch::UriMismatch => "URI_MISMATCH",
            SiwsMismatch::ChainIdMismatch => "CHAIN_ID_MISMATCH",
            SiwsMismatch::IssuedTooFarInThePast => "ISSUED_TOO_FAR_IN_THE_PAST",
            SiwsMismatch::IssuedTooFarInTheFuture => "ISSUED_TOO_FAR_IN_THE_FUTURE",
            SiwsMismatch::Expired => "EXPIRED",
            SiwsMismatch::ExpiresBeforeIssuance => "EXPIRES_BEFORE_ISSUANCE",
            SiwsMismatch::ValidAfterExpiration => "VALID_AFTER_EXPIRATION",
        }
    }
}

/// Account that produced a SIWS signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SiwsAccount {
    /// Base58 address.
    pub address: String,
    /// Raw 32-byte public key.
    pub public_key: Vec<u8>,
}

/// What the wallet returned from `signIn`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SiwsOutput {
    pub account: SiwsAccount,
    pub signature: Vec<u8>,
    pub signed_message: Vec<u8>,
}

/// Input/output pair presented by the caller.
///
/// `action` is not covered by the signature; it can only narrow what the
/// credential is accepted for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SiwsCredential {
    pub input: ChallengeMessage,
    pub output: SiwsOutput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// Server-side expectations for [`check_fields`].
#[derive(Debug, Clone)]
pub struct SiwsOptions {
    pub expected_address: String,
    pub expected_url: Url,
    pub expected_chain_id: String,
    pub issued_at_threshold: Duration,
}

impl SiwsOptions {
    pub fn new(settings: &AuthSettings, expected_address: &str) -> Self {
        Self {
            expected_address: expected_address.to_string(),
            expected_url: settings.public_url.clone(),
            expected_chain_id: settings.chain_id.clone(),
            issued_at_threshold: settings.issued_at_threshold,
        }
    }
}

fn timestamp(value: Option<&str>) -> Result<Option<DateTime<Utc>>, AuthError> {
    value
        .map(|v| parse_timestamp(v).ok_or(AuthError::MalformedToken))
        .transpose()
}

/// Compare every input field with the expected values.
///
/// `uri` and `chainId` are only compared when the input carries them.
/// Unparsable timestamps are a malformed credential, not a mismatch.
pub fn check_fields(
    input: &ChallengeMessage,
    opts: &SiwsOptions,
    now: DateTime<Utc>,
) -> Result<Vec<SiwsMismatch>, AuthError> {
    let mut mismatches = Vec::new();

    if input.address != opts.expected_address {
        mismatches.push(SiwsMismatch::AddressMismatch);
    }
    if Some(input.domain.as_str()) != url_host(&opts.expected_url).as_deref() {
        mismatches.push(SiwsMismatch::DomainMismatch);
    }
    if let Some(uri) = &input.uri {
        let same_origin = Url::parse(uri)
            .map(|u| u.origin() == opts.expected_url.origin())
            .unwrap_or(false);
        if !same_origin {
            mismatches.push(SiwsMismatch::UriMismatch);
        }
    }
    if let Some(chain_id) = &input.chain_id {
        if *chain_id != opts.expected_chain_id {
            mismatches.push(SiwsMismatch::ChainIdMismatch);
        }
    }

    let issued_at = timestamp(input.issued_at.as_deref())?;
    let expiration = timestamp(input.expiration_time.as_deref())?;
    let not_before = timestamp(input.not_before.as_deref())?;

    if let Some(iat) = issued_at {
        if (iat - now).abs() > opts.issued_at_threshold {
            if iat < now {
                mismatches.push(SiwsMismatch::IssuedTooFarInThePast);
            } else {
                mismatches.push(SiwsMismatch::IssuedTooFarInTheFuture);
            }
        }
    }

    if let Some(exp) = expiration {
        if exp <= now {
            mismatches.push(SiwsMismatch::Expired);
        }
        if issued_at.is_some_and(|iat| exp < iat) {
            mismatches.push(SiwsMismatch::ExpiresBeforeIssuance);
        }
        if not_before.is_some_and(|nbf| nbf > exp) {
            mismatches.push(SiwsMismatch::ValidAfterExpiration);
        }
    }

    Ok(mismatches)
}

/// Check that `output` is a signature over the canonical text of `input`.
pub fn verify_sign_in(input: &ChallengeMessage, output: &SiwsOutput) -> bool {
    let mut canonical = input.without_action();
    if canonical.address.is_empty() {
        canonical.address = output.account.address.clone();
    }
    if canonical.encode().as_bytes() != output.signed_message.as_slice() {
        debug!("SIWS signed message does not match the input");
        return false;
    }

    match decode_address(&output.account.address) {
        Ok(key) if key.as_slice() == output.account.public_key.as_slice() => {}
        _ => return false,
    }

    verify_ed25519(
        &output.account.public_key,
        &output.signed_message,
        &output.signature,
    )
}

/// Authenticate a SIWS credential for `ctx`, returning the account address.
///
/// Nothing in the signed text names an operation, so a SIWS credential only
/// satisfies sign-in and read contexts.
pub fn authenticate(
    credential: &SiwsCredential,
    settings: &AuthSettings,
    ctx: &AuthContext,
    now: DateTime<Utc>,
) -> Result<String, AuthError> {
    let address = &credential.output.account.address;
    let mut input = credential.input.clone();
    if input.address.is_empty() {
        input.address = address.clone();
    }

    let mismatches = check_fields(&input, &SiwsOptions::new(settings, address), now)?;
    if !mismatches.is_empty() {
        return Err(AuthError::SiwsMismatch(mismatches));
    }

    if !verify_sign_in(&input, &credential.output) {
        return Err(AuthError::InvalidSignature);
    }

    if !ctx.allow_skip_check && ctx.action != actions::SIGNIN {
        return Err(AuthError::ActionMismatch {
            expected: ctx.action.clone(),
            found: actions::SIGNIN.to_string(),
        });
    }
    if let Some(action) = &credential.action {
        ctx.check_action(action)?;
    }

    Ok(address.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::general::issue;
    use crate::auth::signature::testing::TestWallet;
    use chrono::TimeZone;

    fn settings() -> AuthSettings {
        AuthSettings {
            public_url: Url::parse("https://flair.example/app").unwrap(),
            chain_id: "mainnet".into(),
            issued_at_threshold: Duration::minutes(10),
            challenge_expiry: Duration::minutes(10),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap()
    }

    fn input_for(address: &str) -> ChallengeMessage {
        issue(&settings(), now(), address, "signin", Duration::minutes(10)).without_action()
    }

    fn credential(wallet: &TestWallet, input: ChallengeMessage) -> SiwsCredential {
        let text = input.encode();
        SiwsCredential {
            output: SiwsOutput {
                account: SiwsAccount {
                    address: wallet.address(),
                    public_key: wallet.public_key().to_vec(),
                },
                signature: wallet.sign(text.as_bytes()).to_vec(),
                signed_message: text.into_bytes(),
            },
            input,
            action: None,
        }
    }

    fn opts(address: &str) -> SiwsOptions {
        SiwsOptions::new(&settings(), address)
    }

    #[test]
    fn matching_input_has_no_mismatches() {
        let input = input_for("addr");
        assert!(check_fields(&input, &opts("addr"), now()).unwrap().is_empty());
    }

    #[test]
    fn each_violation_is_reported_independently() {
        let mut input = input_for("addr");
        input.domain = "evil.example".into();
        input.chain_id = Some("devnet".into());

        let mismatches = check_fields(&input, &opts("addr"), now()).unwrap();
        assert_eq!(
            mismatches,
            vec![SiwsMismatch::DomainMismatch, SiwsMismatch::ChainIdMismatch]
        );
    }

    #[test]
    fn address_and_uri_mismatch() {
        let mut input = input_for("someone-else");
        input.uri = Some("https://flair.example:8443/app".into());

        let mismatches = check_fields(&input, &opts("addr"), now()).unwrap();
        assert_eq!(
            mismatches,
            vec![SiwsMismatch::AddressMismatch, SiwsMismatch::UriMismatch]
        );
    }

    #[test]
    fn absent_uri_and_chain_are_not_compared() {
        let mut input = input_for("addr");
        input.uri = None;
        input.chain_id = None;
        assert!(check_fields(&input, &opts("addr"), now()).unwrap().is_empty());
    }

    #[test]
    fn issued_at_window_direction() {
        let input = input_for("addr");
        let late = now() + Duration::minutes(11);
        let early = now() - Duration::minutes(11);

        let past = check_fields(&input, &opts("addr"), late).unwrap();
        assert!(past.contains(&SiwsMismatch::IssuedTooFarInThePast));

        let future = check_fields(&input, &opts("addr"), early).unwrap();
        assert_eq!(future, vec![SiwsMismatch::IssuedTooFarInTheFuture]);
    }

    #[test]
    fn expiration_ordering() {
        let mut input = input_for("addr");
        input.expiration_time = Some("2026-05-01T08:59:00.000Z".into());
        input.not_before = Some("2026-05-01T09:30:00.000Z".into());

        let mismatches = check_fields(&input, &opts("addr"), now()).unwrap();
        assert_eq!(
            mismatches,
            vec![
                SiwsMismatch::Expired,
                SiwsMismatch::ExpiresBeforeIssuance,
                SiwsMismatch::ValidAfterExpiration,
            ]
        );
    }

    #[test]
    fn bad_timestamp_is_malformed() {
        let mut input = input_for("addr");
        input.issued_at = Some("yesterday".into());
        assert_eq!(
            check_fields(&input, &opts("addr"), now()),
            Err(AuthError::MalformedToken)
        );
    }

    #[test]
    fn signed_input_authenticates() {
        let wallet = TestWallet::generate();
        let credential = credential(&wallet, input_for(&wallet.address()));
        let address = authenticate(&credential, &settings(), &AuthContext::read(), now()).unwrap();
        assert_eq!(address, wallet.address());
    }

    #[test]
    fn omitted_address_defaults_to_account() {
        let wallet = TestWallet::generate();
        let mut credential = credential(&wallet, input_for(&wallet.address()));
        credential.input.address = String::new();
        assert!(authenticate(&credential, &settings(), &AuthContext::read(), now()).is_ok());
    }

    #[test]
    fn altered_input_fails_reconstruction() {
        let wallet = TestWallet::generate();
        let mut credential = credential(&wallet, input_for(&wallet.address()));
        credential.input.nonce = Some("different".into());
        assert_eq!(
            authenticate(&credential, &settings(), &AuthContext::read(), now()),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn public_key_must_match_address() {
        let wallet = TestWallet::generate();
        let other = TestWallet::generate();
        let mut credential = credential(&wallet, input_for(&wallet.address()));
        credential.output.account.public_key = other.public_key().to_vec();
        assert!(!verify_sign_in(&credential.input, &credential.output));
    }

    #[test]
    fn bad_signature_fails() {
        let wallet = TestWallet::generate();
        let mut credential = credential(&wallet, input_for(&wallet.address()));
        credential.output.signature[10] ^= 0x01;
        assert!(!verify_sign_in(&credential.input, &credential.output));
    }

    #[test]
    fn mismatches_win_over_signature() {
        let wallet = TestWallet::generate();
        let mut input = input_for(&wallet.address());
        input.domain = "evil.example".into();
        let credential = credential(&wallet, input);
        assert_eq!(
            authenticate(&credential, &settings(), &AuthContext::read(), now()),
            Err(AuthError::SiwsMismatch(vec![SiwsMismatch::DomainMismatch]))
        );
    }

    #[test]
    fn siws_cannot_authorize_mutations() {
        let wallet = TestWallet::generate();
        let mut credential = credential(&wallet, input_for(&wallet.address()));
        credential.action = Some(actions::CREATE_REPOSITORY.into());
        let ctx = AuthContext::action(actions::CREATE_REPOSITORY);
        assert!(matches!(
            authenticate(&credential, &settings(), &ctx, now()),
            Err(AuthError::ActionMismatch { .. })
        ));
    }

    #[test]
    fn output_bytes_are_json_arrays() {
        let wallet = TestWallet::generate();
        let credential = credential(&wallet, input_for(&wallet.address()));
        let json = serde_json::to_value(&credential).unwrap();
        assert!(json["output"]["signedMessage"].is_array());
        assert!(json["input"]["chainId"].is_string());
        let back: SiwsCredential = serde_json::from_value(json).unwrap();
        assert_eq!(back, credential);
    }
}
