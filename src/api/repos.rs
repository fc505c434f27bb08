// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository and role management endpoints.
//!
//! Authorization beyond the signed action is decided by the repository's
//! role sets: owner and admins administer, admins are managed by the owner.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{DeleteRepositoryResponse, RepositoryListQuery, RoleTargetRequest},
    state::AppState,
    versioning::model::{CloneView, NewRepository, Repository, RepositoryUpdate, RoleSummary},
};

/// List repositories of an owner (the caller by default), ordered by name.
#[utoipa::path(
    get,
    path = "/v1/repos",
    tag = "Repositories",
    security(("bearer_auth" = [])),
    params(RepositoryListQuery),
    responses(
        (status = 200, description = "Repositories", body = Vec<Repository>),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_repositories(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Query(query): Query<RepositoryListQuery>,
) -> Result<Json<Vec<Repository>>, ApiError> {
    let owner = query.owner.unwrap_or(caller.wallet);
    Ok(Json(state.registry.list_repositories(&owner)?))
}

/// Create a repository owned by the caller.
#[utoipa::path(
    post,
    path = "/v1/repos",
    tag = "Repositories",
    security(("bearer_auth" = [])),
    request_body = NewRepository,
    responses(
        (status = 201, description = "Repository created", body = Repository),
        (status = 400, description = "Invalid name or missing framework"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Caller already owns a repository with this name")
    )
)]
pub async fn create_repository(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Json(input): Json<NewRepository>,
) -> Result<(StatusCode, Json<Repository>), ApiError> {
    let repo = state.registry.create_repository(&caller.wallet, input)?;
    Ok((StatusCode::CREATED, Json(repo)))
}

/// Look up a repository by owner and name.
#[utoipa::path(
    get,
    path = "/v1/users/{wallet}/repos/{name}",
    tag = "Repositories",
    security(("bearer_auth" = [])),
    params(
        ("wallet" = String, Path, description = "Owner wallet address"),
        ("name" = String, Path, description = "Repository name")
    ),
    responses(
        (status = 200, description = "Repository", body = Repository),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Repository not found")
    )
)]
pub async fn find_repository(
    Auth(_caller): Auth,
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
) -> Result<Json<Repository>, ApiError> {
    Ok(Json(state.registry.find_repository(&owner, &name)?))
}

#[utoipa::path(
    get,
    path = "/v1/repos/{repo_hash}",
    tag = "Repositories",
    security(("bearer_auth" = [])),
    params(("repo_hash" = String, Path, description = "Repository hash")),
    responses(
        (status = 200, description = "Repository", body = Repository),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Repository not found")
    )
)]
pub async fn get_repository(
    Auth(_caller): Auth,
    State(state): State<AppState>,
    Path(repo_hash): Path<String>,
) -> Result<Json<Repository>, ApiError> {
    Ok(Json(state.registry.get_repository(&repo_hash)?))
}

/// Rename, merge metadata and apply bulk role changes.
#[utoipa::path(
    put,
    path = "/v1/repos/{repo_hash}",
    tag = "Repositories",
    security(("bearer_auth" = [])),
    params(("repo_hash" = String, Path, description = "Repository hash")),
    request_body = RepositoryUpdate,
    responses(
        (status = 200, description = "Updated repository", body = Repository),
        (status = 400, description = "Nothing to update or invalid name"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not owner or admin"),
        (status = 404, description = "Repository not found"),
        (status = 409, description = "Name already taken")
    )
)]
pub async fn update_repository(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(repo_hash): Path<String>,
    Json(update): Json<RepositoryUpdate>,
) -> Result<Json<Repository>, ApiError> {
    Ok(Json(
        state
            .registry
            .update_repository(&caller.wallet, &repo_hash, update)?,
    ))
}

/// Delete a repository with its branches and commits.
#[utoipa::path(
    delete,
    path = "/v1/repos/{repo_hash}",
    tag = "Repositories",
    security(("bearer_auth" = [])),
    params(("repo_hash" = String, Path, description = "Repository hash")),
    responses(
        (status = 200, description = "Repository deleted", body = DeleteRepositoryResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not owner or admin"),
        (status = 404, description = "Repository not found")
    )
)]
pub async fn delete_repository(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(repo_hash): Path<String>,
) -> Result<Json<DeleteRepositoryResponse>, ApiError> {
    let base_model = state
        .registry
        .delete_repository(&caller.wallet, &repo_hash)
        .await?;
    Ok(Json(DeleteRepositoryResponse {
        repo_hash,
        base_model,
    }))
}

/// Everything needed to check out a repository.
#[utoipa::path(
    get,
    path = "/v1/repos/{repo_hash}/clone",
    tag = "Repositories",
    security(("bearer_auth" = [])),
    params(("repo_hash" = String, Path, description = "Repository hash")),
    responses(
        (status = 200, description = "Repository with branches and base model", body = CloneView),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Repository not found")
    )
)]
pub async fn clone_repository(
    Auth(_caller): Auth,
    State(state): State<AppState>,
    Path(repo_hash): Path<String>,
) -> Result<Json<CloneView>, ApiError> {
    Ok(Json(state.registry.clone_repository(&repo_hash)?))
}

#[utoipa::path(
    get,
    path = "/v1/repos/{repo_hash}/roles",
    tag = "Repositories",
    security(("bearer_auth" = [])),
    params(("repo_hash" = String, Path, description = "Repository hash")),
    responses(
        (status = 200, description = "Role sets", body = RoleSummary),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Repository not found")
    )
)]
pub async fn list_roles(
    Auth(_caller): Auth,
    State(state): State<AppState>,
    Path(repo_hash): Path<String>,
) -> Result<Json<RoleSummary>, ApiError> {
    Ok(Json(state.registry.list_roles(&repo_hash)?))
}

/// Add an admin. Owner only.
#[utoipa::path(
    post,
    path = "/v1/repos/{repo_hash}/admins",
    tag = "Repositories",
    security(("bearer_auth" = [])),
    params(("repo_hash" = String, Path, description = "Repository hash")),
    request_body = RoleTargetRequest,
    responses(
        (status = 200, description = "Updated role sets", body = RoleSummary),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not the owner"),
        (status = 404, description = "Repository not found")
    )
)]
pub async fn add_admin(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(repo_hash): Path<String>,
    Json(target): Json<RoleTargetRequest>,
) -> Result<Json<RoleSummary>, ApiError> {
    Ok(Json(state.registry.add_admin(
        &caller.wallet,
        &repo_hash,
        &target.wallet,
    )?))
}

/// Remove an admin. Owner only; the owner cannot be removed.
#[utoipa::path(
    delete,
    path = "/v1/repos/{repo_hash}/admins",
    tag = "Repositories",
    security(("bearer_auth" = [])),
    params(("repo_hash" = String, Path, description = "Repository hash")),
    request_body = RoleTargetRequest,
    responses(
        (status = 200, description = "Updated role sets", body = RoleSummary),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not the owner"),
        (status = 404, description = "Repository not found")
    )
)]
pub async fn remove_admin(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(repo_hash): Path<String>,
    Json(target): Json<RoleTargetRequest>,
) -> Result<Json<RoleSummary>, ApiError> {
    Ok(Json(state.registry.remove_admin(
        &caller.wallet,
        &repo_hash,
        &target.wallet,
    )?))
}

/// Grant write access. Owner or admin.
#[utoipa::path(
    post,
    path = "/v1/repos/{repo_hash}/writers",
    tag = "Repositories",
    security(("bearer_auth" = [])),
    params(("repo_hash" = String, Path, description = "Repository hash")),
    request_body = RoleTargetRequest,
    responses(
        (status = 200, description = "Updated role sets", body = RoleSummary),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not owner or admin"),
        (status = 404, description = "Repository not found")
    )
)]
pub async fn add_writer(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(repo_hash): Path<String>,
    Json(target): Json<RoleTargetRequest>,
) -> Result<Json<RoleSummary>, ApiError> {
    Ok(Json(state.registry.add_writer(
        &caller.wallet,
        &repo_hash,
        &target.wallet,
    )?))
}

/// Revoke write access. Owner or admin; owner and admins keep theirs.
#[utoipa::path(
    delete,
    path = "/v1/repos/{repo_hash}/writers",
    tag = "Repositories",
    security(("bearer_auth" = [])),
    params(("repo_hash" = String, Path, description = "Repository hash")),
    request_body = RoleTargetRequest,
    responses(
        (status = 200, description = "Updated role sets", body = RoleSummary),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not owner or admin"),
        (status = 404, description = "Repository not found")
    )
)]
pub async fn revoke_writer(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(repo_hash): Path<String>,
    Json(target): Json<RoleTargetRequest>,
) -> Result<Json<RoleSummary>, ApiError> {
    Ok(Json(state.registry.revoke_writer(
        &caller.wallet,
        &repo_hash,
        &target.wallet,
    )?))
}
