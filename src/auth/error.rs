// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::siws::SiwsMismatch;

/// Authentication error type.
///
/// Every variant is terminal: the middleware turns it into a response before
/// any handler runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// Authorization header is not `Bearer <credential>`
    InvalidAuthHeader,
    /// Token or credential could not be parsed
    MalformedToken,
    /// Signature does not verify against the claimed public key
    InvalidSignature,
    /// Signed message lacks `Action` or `Expiration Time`
    MissingFields,
    /// Signed message has expired
    Expired,
    /// Signed action does not match the operation
    ActionMismatch { expected: String, found: String },
    /// One or more SIWS fields do not match the server's expectations
    SiwsMismatch(Vec<SiwsMismatch>),
    /// Internal error
    InternalError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    mismatches: Option<Vec<SiwsMismatch>>,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::MissingFields => "missing_fields",
            AuthError::Expired => "expired",
            AuthError::ActionMismatch { .. } => "action_mismatch",
            AuthError::SiwsMismatch(_) => "siws_mismatch",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::MalformedToken => write!(f, "Token is malformed"),
            AuthError::InvalidSignature => write!(f, "Token signature is invalid"),
            AuthError::MissingFields => {
                write!(f, "Signed message must contain Action and Expiration Time")
            }
            AuthError::Expired => write!(f, "Token has expired"),
            AuthError::ActionMismatch { expected, found } => {
                write!(f, "Token authorizes '{found}', but this operation requires '{expected}'")
            }
            AuthError::SiwsMismatch(mismatches) => {
                let codes: Vec<&str> = mismatches.iter().map(|m| m.as_str()).collect();
                write!(f, "Sign-in input does not match: {}", codes.join(", "))
            }
            AuthError::InternalError(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mismatches = match &self {
            AuthError::SiwsMismatch(m) => Some(m.clone()),
            _ => None,
        };
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
            mismatches,
        });
        (status, body).into_response()
    }
}
