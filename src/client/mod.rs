// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client for the registry API.
//!
//! Signs challenges with a local ed25519 key. The sign-in token is kept in a
//! [`TokenSession`] and used for read routes; every mutation signs a fresh
//! challenge for its own action.

pub mod session;

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::{Signer, SigningKey};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::auth::actions;
use crate::auth::message::parse_timestamp;
use crate::clock::SharedClock;
use crate::models::{ChallengeResponse, CreateCommitRequest, SignInResponse, UploadBaseModelRequest};
use crate::storage::BlobRecord;
use crate::versioning::model::{Branch, Commit, NewBranch, NewRepository, Repository, User};

pub use session::{SessionToken, TokenSession};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("{method} {path} returned {status}: {body}")]
    Status {
        method: Method,
        path: String,
        status: u16,
        body: String,
    },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("not signed in or session expired")]
    NotSignedIn,
}

impl ClientError {
    /// HTTP status when the server answered with an error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Build a general-scheme token: `base58(pubkey).base58(text).base58(signature)`.
pub fn signed_token(key: &SigningKey, text: &str) -> String {
    let signature = key.sign(text.as_bytes());
    format!(
        "{}.{}.{}",
        bs58::encode(key.verifying_key().to_bytes()).into_string(),
        bs58::encode(text.as_bytes()).into_string(),
        bs58::encode(signature.to_bytes()).into_string()
    )
}

pub struct RegistryClient {
    base_url: String,
    http: Client,
    key: SigningKey,
    session: TokenSession,
}

impl std::fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient")
            .field("base_url", &self.base_url)
            .field("wallet", &self.wallet())
            .field("session", &self.session)
            .finish()
    }
}

impl RegistryClient {
    pub fn new(base_url: &str, key: SigningKey, clock: SharedClock) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            key,
            session: TokenSession::new(clock),
        })
    }

    /// Base58 address of the signing key.
    pub fn wallet(&self) -> String {
        bs58::encode(self.key.verifying_key().to_bytes()).into_string()
    }

    pub fn session(&self) -> &TokenSession {
        &self.session
    }

    /// Fetch a challenge for `action` addressed to this client's wallet.
    pub async fn challenge(&self, action: &str) -> Result<ChallengeResponse, ClientError> {
        let path = format!("/v1/auth/signin/{}?action={action}", self.wallet());
        self.send(self.http.get(self.url(&path)), Method::GET, &path)
            .await
    }

    /// Sign in and store the resulting token, replacing any earlier session.
    pub async fn sign_in(&self) -> Result<SignInResponse, ClientError> {
        let challenge = self.challenge(actions::SIGNIN).await?;
        let expires_at = challenge
            .message
            .expiration_time
            .as_deref()
            .and_then(parse_timestamp)
            .ok_or_else(|| ClientError::InvalidResponse("challenge has no expiration".into()))?;
        let token = signed_token(&self.key, &challenge.text);

        let path = "/v1/auth/signin";
        let response: SignInResponse = self
            .send(
                self.http
                    .post(self.url(path))
                    .json(&json!({ "scheme": "general", "token": token })),
                Method::POST,
                path,
            )
            .await?;

        self.session.store(SessionToken {
            wallet: response.wallet.clone(),
            token,
            expires_at,
        });
        debug!(wallet = %response.wallet, %expires_at, "signed in");
        Ok(response)
    }

    pub fn sign_out(&self) {
        self.session.clear();
    }

    /// `Authorization` value for `action`.
    ///
    /// Read routes reuse the session token; other actions sign a fresh
    /// challenge.
    pub async fn authorization_for(&self, action: &str) -> Result<String, ClientError> {
        if action == actions::SIGNIN {
            let session = self.session.active().ok_or(ClientError::NotSignedIn)?;
            return Ok(format!("Bearer {}", session.token));
        }
        let challenge = self.challenge(action).await?;
        Ok(format!("Bearer {}", signed_token(&self.key, &challenge.text)))
    }

    pub async fn me(&self) -> Result<User, ClientError> {
        self.authorized(Method::GET, "/v1/users/me", actions::SIGNIN, None::<&()>)
            .await
    }

    pub async fn list_repositories(&self) -> Result<Vec<Repository>, ClientError> {
        self.authorized(Method::GET, "/v1/repos", actions::SIGNIN, None::<&()>)
            .await
    }

    pub async fn get_repository(&self, repo_hash: &str) -> Result<Repository, ClientError> {
        let path = format!("/v1/repos/{repo_hash}");
        self.authorized(Method::GET, &path, actions::SIGNIN, None::<&()>)
            .await
    }

    pub async fn create_repository(&self, input: &NewRepository) -> Result<Repository, ClientError> {
        self.authorized(
            Method::POST,
            "/v1/repos",
            actions::CREATE_REPOSITORY,
            Some(input),
        )
        .await
    }

    pub async fn upload_base_model(
        &self,
        repo_hash: &str,
        content: &[u8],
        extension: &str,
    ) -> Result<BlobRecord, ClientError> {
        let path = format!("/v1/repos/{repo_hash}/basemodel");
        let body = UploadBaseModelRequest {
            content: STANDARD.encode(content),
            extension: extension.to_string(),
        };
        self.authorized(Method::POST, &path, actions::UPLOAD_MODEL, Some(&body))
            .await
    }

    pub async fn create_branch(
        &self,
        repo_hash: &str,
        input: &NewBranch,
    ) -> Result<Branch, ClientError> {
        let path = format!("/v1/repos/{repo_hash}/branches");
        self.authorized(Method::POST, &path, actions::CREATE_BRANCH, Some(input))
            .await
    }

    pub async fn create_commit(
        &self,
        repo_hash: &str,
        branch_hash: &str,
        request: &CreateCommitRequest,
    ) -> Result<Commit, ClientError> {
        let path = format!("/v1/repos/{repo_hash}/branches/{branch_hash}/commits");
        self.authorized(Method::POST, &path, actions::CREATE_COMMIT, Some(request))
            .await
    }

    pub async fn list_commits(
        &self,
        repo_hash: &str,
        branch_hash: &str,
    ) -> Result<Vec<Commit>, ClientError> {
        let path = format!("/v1/repos/{repo_hash}/branches/{branch_hash}/commits");
        self.authorized(Method::GET, &path, actions::SIGNIN, None::<&()>)
            .await
    }

    /// Raw content of a stored blob, fetched from this registry.
    pub async fn download_blob(&self, cid: &str) -> Result<Vec<u8>, ClientError> {
        let path = format!("/v1/blobs/{cid}");
        let authorization = self.authorization_for(actions::SIGNIN).await?;
        let builder = self
            .http
            .get(self.url(&path))
            .header("Authorization", authorization);
        let response = self.execute(builder, Method::GET, &path).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("GET {path} body: {e}")))?;
        Ok(bytes.to_vec())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn authorized<B, T>(
        &self,
        method: Method,
        path: &str,
        action: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let authorization = self.authorization_for(action).await?;
        let mut builder = self
            .http
            .request(method.clone(), self.url(path))
            .header("Authorization", authorization);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.send(builder, method, path).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        method: Method,
        path: &str,
    ) -> Result<T, ClientError> {
        let response = self.execute(builder, method.clone(), path).await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("{method} {path} invalid JSON: {e}")))
    }

    async fn execute(
        &self,
        builder: RequestBuilder,
        method: Method,
        path: &str,
    ) -> Result<Response, ClientError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Request(format!("{method} {path} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                method,
                path: path.to_string(),
                status,
                body,
            });
        }
        Ok(response)
    }
}
