// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Base model endpoints.
//!
//! The base model can be replaced or removed only until the repository's
//! first commit.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::Auth,
    error::ApiError,
    models::UploadBaseModelRequest,
    state::AppState,
    storage::BlobRecord,
    versioning::model::BaseModelRemoval,
};

/// Stored record of the base model, including its fetch URL.
#[utoipa::path(
    get,
    path = "/v1/repos/{repo_hash}/basemodel",
    tag = "Base Model",
    security(("bearer_auth" = [])),
    params(("repo_hash" = String, Path, description = "Repository hash")),
    responses(
        (status = 200, description = "Base model record", body = BlobRecord),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Repository or base model not found")
    )
)]
pub async fn get_base_model(
    Auth(_caller): Auth,
    State(state): State<AppState>,
    Path(repo_hash): Path<String>,
) -> Result<Json<BlobRecord>, ApiError> {
    Ok(Json(state.registry.base_model(&repo_hash)?))
}

/// Upload and attach a base model. Identical content is stored once.
#[utoipa::path(
    post,
    path = "/v1/repos/{repo_hash}/basemodel",
    tag = "Base Model",
    security(("bearer_auth" = [])),
    params(("repo_hash" = String, Path, description = "Repository hash")),
    request_body = UploadBaseModelRequest,
    responses(
        (status = 201, description = "Base model attached", body = BlobRecord),
        (status = 400, description = "Empty or undecodable content"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not owner or admin"),
        (status = 404, description = "Repository not found"),
        (status = 409, description = "Repository already has commits")
    )
)]
pub async fn upload_base_model(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(repo_hash): Path<String>,
    Json(request): Json<UploadBaseModelRequest>,
) -> Result<(StatusCode, Json<BlobRecord>), ApiError> {
    let content = request.decode()?;
    let record = state
        .registry
        .upload_base_model(&caller.wallet, &repo_hash, &content, &request.extension)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Detach the base model, unpinning it when no other repository uses it.
#[utoipa::path(
    delete,
    path = "/v1/repos/{repo_hash}/basemodel",
    tag = "Base Model",
    security(("bearer_auth" = [])),
    params(("repo_hash" = String, Path, description = "Repository hash")),
    responses(
        (status = 200, description = "Base model removed", body = BaseModelRemoval),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not owner or admin"),
        (status = 404, description = "Repository or base model not found"),
        (status = 409, description = "Repository already has commits")
    )
)]
pub async fn delete_base_model(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(repo_hash): Path<String>,
) -> Result<Json<BaseModelRemoval>, ApiError> {
    Ok(Json(
        state
            .registry
            .delete_base_model(&caller.wallet, &repo_hash)
            .await?,
    ))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde_json::json;

    use crate::api::testing::TestApp;
    use crate::auth::actions;
    use crate::auth::signature::testing::TestWallet;
    use crate::storage::content_hash;

    #[tokio::test]
    async fn shared_model_is_unpinned_with_last_reference() {
        let app = TestApp::new();
        let owner = TestWallet::generate();
        let first = app.repo_with_model(&owner, "first").await;
        let second = app.repo_with_model(&owner, "second").await;

        let (status, record) = app
            .send(
                Method::GET,
                &format!("/v1/repos/{first}/basemodel"),
                Some(app.bearer(&owner, actions::SIGNIN)),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["cid"], content_hash(b"base weights"));

        let (status, removal) = app
            .send(
                Method::DELETE,
                &format!("/v1/repos/{first}/basemodel"),
                Some(app.bearer(&owner, actions::DELETE_MODEL)),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(removal["unpinned"], false);

        let (_, removal) = app
            .send(
                Method::DELETE,
                &format!("/v1/repos/{second}/basemodel"),
                Some(app.bearer(&owner, actions::DELETE_MODEL)),
                None,
            )
            .await;
        assert_eq!(removal["unpinned"], true);
    }

    #[tokio::test]
    async fn model_is_frozen_after_first_commit() {
        let app = TestApp::new();
        let owner = TestWallet::generate();
        let repo_hash = app.repo_with_model(&owner, "mnist").await;
        let (_, branch) = app
            .send(
                Method::POST,
                &format!("/v1/repos/{repo_hash}/branches"),
                Some(app.bearer(&owner, actions::CREATE_BRANCH)),
                Some(json!({ "name": "main" })),
            )
            .await;
        let (status, _) = app
            .send(
                Method::POST,
                &format!(
                    "/v1/repos/{repo_hash}/branches/{}/commits",
                    branch["branch_hash"].as_str().unwrap()
                ),
                Some(app.bearer(&owner, actions::CREATE_COMMIT)),
                Some(json!({
                    "message": "round 1",
                    "params": STANDARD.encode(b"w1"),
                    "params_extension": "pt"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = app
            .send(
                Method::POST,
                &format!("/v1/repos/{repo_hash}/basemodel"),
                Some(app.bearer(&owner, actions::UPLOAD_MODEL)),
                Some(json!({ "content": STANDARD.encode(b"other"), "extension": "pt" })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = app
            .send(
                Method::DELETE,
                &format!("/v1/repos/{repo_hash}/basemodel"),
                Some(app.bearer(&owner, actions::DELETE_MODEL)),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
