// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Branch endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{ForkBranchRequest, UpdateBranchRequest},
    state::AppState,
    versioning::model::{Branch, NewBranch},
};

#[utoipa::path(
    get,
    path = "/v1/repos/{repo_hash}/branches",
    tag = "Branches",
    security(("bearer_auth" = [])),
    params(("repo_hash" = String, Path, description = "Repository hash")),
    responses(
        (status = 200, description = "Branches ordered by name", body = Vec<Branch>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Repository not found")
    )
)]
pub async fn list_branches(
    Auth(_caller): Auth,
    State(state): State<AppState>,
    Path(repo_hash): Path<String>,
) -> Result<Json<Vec<Branch>>, ApiError> {
    Ok(Json(state.registry.list_branches(&repo_hash)?))
}

/// Create a branch. Requires a base model; every branch after the first
/// names the branch it starts from.
#[utoipa::path(
    post,
    path = "/v1/repos/{repo_hash}/branches",
    tag = "Branches",
    security(("bearer_auth" = [])),
    params(("repo_hash" = String, Path, description = "Repository hash")),
    request_body = NewBranch,
    responses(
        (status = 201, description = "Branch created", body = Branch),
        (status = 400, description = "Invalid name, no base model or missing source branch"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller cannot write to this repository"),
        (status = 409, description = "Branch name taken")
    )
)]
pub async fn create_branch(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(repo_hash): Path<String>,
    Json(input): Json<NewBranch>,
) -> Result<(StatusCode, Json<Branch>), ApiError> {
    let branch = state
        .registry
        .create_branch(&caller.wallet, &repo_hash, input)?;
    Ok((StatusCode::CREATED, Json(branch)))
}

#[utoipa::path(
    get,
    path = "/v1/repos/{repo_hash}/branches/{branch_hash}",
    tag = "Branches",
    security(("bearer_auth" = [])),
    params(
        ("repo_hash" = String, Path, description = "Repository hash"),
        ("branch_hash" = String, Path, description = "Branch hash")
    ),
    responses(
        (status = 200, description = "Branch", body = Branch),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Branch not found in this repository")
    )
)]
pub async fn get_branch(
    Auth(_caller): Auth,
    State(state): State<AppState>,
    Path((repo_hash, branch_hash)): Path<(String, String)>,
) -> Result<Json<Branch>, ApiError> {
    Ok(Json(state.registry.get_branch(&repo_hash, &branch_hash)?))
}

#[utoipa::path(
    put,
    path = "/v1/repos/{repo_hash}/branches/{branch_hash}",
    tag = "Branches",
    security(("bearer_auth" = [])),
    params(
        ("repo_hash" = String, Path, description = "Repository hash"),
        ("branch_hash" = String, Path, description = "Branch hash")
    ),
    request_body = UpdateBranchRequest,
    responses(
        (status = 200, description = "Updated branch", body = Branch),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller cannot write to this repository"),
        (status = 404, description = "Branch not found in this repository")
    )
)]
pub async fn update_branch(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path((repo_hash, branch_hash)): Path<(String, String)>,
    Json(request): Json<UpdateBranchRequest>,
) -> Result<Json<Branch>, ApiError> {
    Ok(Json(state.registry.update_branch(
        &caller.wallet,
        &repo_hash,
        &branch_hash,
        request.description,
    )?))
}

/// Delete a branch and its commits. Owner or admin.
#[utoipa::path(
    delete,
    path = "/v1/repos/{repo_hash}/branches/{branch_hash}",
    tag = "Branches",
    security(("bearer_auth" = [])),
    params(
        ("repo_hash" = String, Path, description = "Repository hash"),
        ("branch_hash" = String, Path, description = "Branch hash")
    ),
    responses(
        (status = 204, description = "Branch deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not owner or admin"),
        (status = 404, description = "Branch not found in this repository")
    )
)]
pub async fn delete_branch(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path((repo_hash, branch_hash)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .registry
        .delete_branch(&caller.wallet, &repo_hash, &branch_hash)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Start a new branch from this one, inheriting its latest parameters.
#[utoipa::path(
    post,
    path = "/v1/repos/{repo_hash}/branches/{branch_hash}/fork",
    tag = "Branches",
    security(("bearer_auth" = [])),
    params(
        ("repo_hash" = String, Path, description = "Repository hash"),
        ("branch_hash" = String, Path, description = "Source branch hash")
    ),
    request_body = ForkBranchRequest,
    responses(
        (status = 201, description = "Branch created", body = Branch),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller cannot write to this repository"),
        (status = 404, description = "Source branch not found"),
        (status = 409, description = "Branch name taken")
    )
)]
pub async fn fork_branch(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path((repo_hash, branch_hash)): Path<(String, String)>,
    Json(request): Json<ForkBranchRequest>,
) -> Result<(StatusCode, Json<Branch>), ApiError> {
    let branch = state.registry.fork_branch(
        &caller.wallet,
        &repo_hash,
        &branch_hash,
        request.name,
        request.description,
    )?;
    Ok((StatusCode::CREATED, Json(branch)))
}
