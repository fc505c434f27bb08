// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Challenge and sign-in endpoints.
//!
//! Neither route is gated: the challenge is public, and sign-in verifies the
//! credential in its body for the `signin` action.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    auth::{actions, AuthContext, AuthError, Credentials},
    error::ApiError,
    models::{ChallengeQuery, ChallengeResponse, SignInResponse},
    state::AppState,
};

/// Issue a challenge for `address` to sign.
///
/// The challenge is bound to `action` (default `signin`) and expires after
/// the configured challenge lifetime.
#[utoipa::path(
    get,
    path = "/v1/auth/signin/{address}",
    tag = "Auth",
    params(
        ("address" = String, Path, description = "Base58 wallet public key"),
        ChallengeQuery
    ),
    responses(
        (status = 200, description = "Challenge to sign", body = ChallengeResponse),
        (status = 400, description = "Address is not a base58 ed25519 public key")
    )
)]
pub async fn challenge(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<ChallengeQuery>,
) -> Result<Json<ChallengeResponse>, ApiError> {
    let action = query.action.as_deref().unwrap_or(actions::SIGNIN);
    let message = state
        .auth
        .challenge(&address, action)
        .map_err(|_| ApiError::bad_request("address is not a base58 ed25519 public key"))?;

    Ok(Json(ChallengeResponse {
        text: message.encode(),
        message,
    }))
}

/// Verify a signed challenge and provision the wallet's identity.
#[utoipa::path(
    post,
    path = "/v1/auth/signin",
    tag = "Auth",
    request_body = Credentials,
    responses(
        (status = 200, description = "Signed in", body = SignInResponse),
        (status = 401, description = "Credential rejected")
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<SignInResponse>, AuthError> {
    let resolved = state
        .auth
        .authenticate(&credentials, &AuthContext::action(actions::SIGNIN))?;

    tracing::info!(wallet = %resolved.wallet, scheme = ?resolved.scheme, "Wallet signed in");

    Ok(Json(SignInResponse {
        success: true,
        wallet: resolved.wallet,
        scheme: resolved.scheme,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::api::testing::TestApp;
    use crate::auth::signature::testing::TestWallet;
    use crate::auth::{actions, ChallengeMessage, Credentials};

    fn siws_credentials(app: &TestApp, wallet: &TestWallet) -> Credentials {
        let message = app
            .state
            .auth
            .challenge(&wallet.address(), actions::SIGNIN)
            .unwrap();
        Credentials::Siws(wallet.siws_for(&message))
    }

    #[tokio::test]
    async fn challenge_carries_action_and_text() {
        let app = TestApp::new();
        let wallet = TestWallet::generate();
        let (status, body) = app
            .send(
                Method::GET,
                &format!("/v1/auth/signin/{}?action=create_commit", wallet.address()),
                None,
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"]["action"], "create_commit");
        assert_eq!(body["message"]["domain"], "flair.example");

        let message: ChallengeMessage = serde_json::from_value(body["message"].clone()).unwrap();
        assert_eq!(body["text"], message.encode());
    }

    #[tokio::test]
    async fn challenge_rejects_bad_address() {
        let app = TestApp::new();
        let (status, _) = app
            .send(Method::GET, "/v1/auth/signin/not-a-key", None, None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn general_sign_in_round_trip() {
        let app = TestApp::new();
        let wallet = TestWallet::generate();
        let (_, challenge) = app
            .send(
                Method::GET,
                &format!("/v1/auth/signin/{}", wallet.address()),
                None,
                None,
            )
            .await;
        let message: ChallengeMessage =
            serde_json::from_value(challenge["message"].clone()).unwrap();

        let (status, body) = app
            .send(
                Method::POST,
                "/v1/auth/signin",
                None,
                Some(json!({ "scheme": "general", "token": wallet.token_for(&message) })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["wallet"], wallet.address());
        assert_eq!(body["scheme"], "general");
    }

    #[tokio::test]
    async fn siws_sign_in_round_trip() {
        let app = TestApp::new();
        let wallet = TestWallet::generate();
        let credentials = siws_credentials(&app, &wallet);

        let (status, body) = app
            .send(
                Method::POST,
                "/v1/auth/signin",
                None,
                Some(serde_json::to_value(&credentials).unwrap()),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["success"], true);
        assert_eq!(body["wallet"], wallet.address());
        assert_eq!(body["scheme"], "siws");
    }

    #[tokio::test]
    async fn siws_bearer_reaches_read_routes_only() {
        let app = TestApp::new();
        let wallet = TestWallet::generate();
        let bearer = siws_credentials(&app, &wallet)
            .to_authorization_header()
            .unwrap();
        assert!(bearer.starts_with("Bearer siws"));

        let (status, body) = app
            .send(Method::GET, "/v1/users/me", Some(bearer.clone()), None)
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["wallet"], wallet.address());

        let spaced = bearer.replacen("Bearer siws", "Bearer siws ", 1);
        let (status, _) = app
            .send(Method::GET, "/v1/users/me", Some(spaced), None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app
            .send(
                Method::POST,
                "/v1/repos",
                Some(bearer),
                Some(json!({ "name": "mnist" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "action_mismatch");
    }

    #[tokio::test]
    async fn siws_sign_in_reports_field_mismatches() {
        let app = TestApp::new();
        let wallet = TestWallet::generate();
        let mut message = app
            .state
            .auth
            .challenge(&wallet.address(), actions::SIGNIN)
            .unwrap();
        message.domain = "evil.example".to_string();
        let credentials = Credentials::Siws(wallet.siws_for(&message));

        let (status, body) = app
            .send(
                Method::POST,
                "/v1/auth/signin",
                None,
                Some(serde_json::to_value(&credentials).unwrap()),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "siws_mismatch");
    }

    #[tokio::test]
    async fn sign_in_rejects_tampered_token() {
        let app = TestApp::new();
        let wallet = TestWallet::generate();
        let other = TestWallet::generate();
        let message = app
            .state
            .auth
            .challenge(&wallet.address(), actions::SIGNIN)
            .unwrap();
        let token = wallet.token_for(&message);
        let forged = format!(
            "{}{}",
            other.address(),
            &token[token.find('.').unwrap()..]
        );

        let (status, body) = app
            .send(
                Method::POST,
                "/v1/auth/signin",
                None,
                Some(json!({ "scheme": "general", "token": forged })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "invalid_signature");
    }
}
