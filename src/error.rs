// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::AuthError;
use crate::versioning::VersioningError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<VersioningError> for ApiError {
    fn from(err: VersioningError) -> Self {
        match err {
            VersioningError::NotFound(_) => Self::not_found(err.to_string()),
            VersioningError::NotAuthorized(_) => Self::forbidden(err.to_string()),
            VersioningError::AlreadyExists(_)
            | VersioningError::ModelAlreadyExists
            | VersioningError::InvalidTransition(_) => Self::conflict(err.to_string()),
            VersioningError::InvalidInput(_) => Self::bad_request(err.to_string()),
            VersioningError::Mint(_) => {
                tracing::warn!(error = %err, "NFT minting failed");
                Self::new(StatusCode::BAD_GATEWAY, err.to_string())
            }
            VersioningError::Database(_) | VersioningError::Blob(_) => {
                tracing::error!(error = %err, "Registry operation failed");
                Self::internal("Internal server error")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::new(err.status_code(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BlobError;
    use crate::versioning::MintError;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);

        let conflict = ApiError::conflict("taken");
        assert_eq!(conflict.status, StatusCode::CONFLICT);
    }

    #[test]
    fn versioning_errors_map_to_statuses() {
        let status = |e: VersioningError| ApiError::from(e).status;
        assert_eq!(status(VersioningError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(VersioningError::NotAuthorized("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(status(VersioningError::AlreadyExists("x".into())), StatusCode::CONFLICT);
        assert_eq!(status(VersioningError::ModelAlreadyExists), StatusCode::CONFLICT);
        assert_eq!(status(VersioningError::InvalidTransition("x".into())), StatusCode::CONFLICT);
        assert_eq!(status(VersioningError::InvalidInput("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(VersioningError::Mint(MintError::Unconfigured)), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn infrastructure_errors_are_not_leaked() {
        let err = ApiError::from(VersioningError::Blob(BlobError::NotFound("abc".into())));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Internal server error");
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }
}
