// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Commit endpoints: contributions, merge decisions, merger commits and NFTs.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{CreateCommitRequest, DecisionRequest},
    state::AppState,
    versioning::model::{Commit, MergerCommitGroup},
};

/// Commits of a branch, oldest first.
#[utoipa::path(
    get,
    path = "/v1/repos/{repo_hash}/branches/{branch_hash}/commits",
    tag = "Commits",
    security(("bearer_auth" = [])),
    params(
        ("repo_hash" = String, Path, description = "Repository hash"),
        ("branch_hash" = String, Path, description = "Branch hash")
    ),
    responses(
        (status = 200, description = "Commits in sequence order", body = Vec<Commit>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Branch not found in this repository")
    )
)]
pub async fn list_commits(
    Auth(_caller): Auth,
    State(state): State<AppState>,
    Path((repo_hash, branch_hash)): Path<(String, String)>,
) -> Result<Json<Vec<Commit>>, ApiError> {
    Ok(Json(state.registry.list_commits(&repo_hash, &branch_hash)?))
}

/// Contribute parameters to a branch. The commit starts `PENDING`.
#[utoipa::path(
    post,
    path = "/v1/repos/{repo_hash}/branches/{branch_hash}/commits",
    tag = "Commits",
    security(("bearer_auth" = [])),
    params(
        ("repo_hash" = String, Path, description = "Repository hash"),
        ("branch_hash" = String, Path, description = "Branch hash")
    ),
    request_body = CreateCommitRequest,
    responses(
        (status = 201, description = "Commit created", body = Commit),
        (status = 400, description = "Empty message or parameters, bad base64, or no base model"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller cannot write to this repository"),
        (status = 404, description = "Branch or parent commit not found")
    )
)]
pub async fn create_commit(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path((repo_hash, branch_hash)): Path<(String, String)>,
    Json(request): Json<CreateCommitRequest>,
) -> Result<(StatusCode, Json<Commit>), ApiError> {
    let commit = state
        .registry
        .create_commit(
            &caller.wallet,
            &repo_hash,
            &branch_hash,
            request.into_new_commit()?,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(commit)))
}

#[utoipa::path(
    get,
    path = "/v1/repos/{repo_hash}/branches/{branch_hash}/commits/latest",
    tag = "Commits",
    security(("bearer_auth" = [])),
    params(
        ("repo_hash" = String, Path, description = "Repository hash"),
        ("branch_hash" = String, Path, description = "Branch hash")
    ),
    responses(
        (status = 200, description = "Most recent commit", body = Commit),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Branch not found or has no commits")
    )
)]
pub async fn latest_commit(
    Auth(_caller): Auth,
    State(state): State<AppState>,
    Path((repo_hash, branch_hash)): Path<(String, String)>,
) -> Result<Json<Commit>, ApiError> {
    Ok(Json(state.registry.latest_commit(&repo_hash, &branch_hash)?))
}

/// `PENDING` commits made since the latest merger commit.
#[utoipa::path(
    get,
    path = "/v1/repos/{repo_hash}/branches/{branch_hash}/commits/pending",
    tag = "Commits",
    security(("bearer_auth" = [])),
    params(
        ("repo_hash" = String, Path, description = "Repository hash"),
        ("branch_hash" = String, Path, description = "Branch hash")
    ),
    responses(
        (status = 200, description = "Pending commits", body = Vec<Commit>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Branch not found in this repository")
    )
)]
pub async fn pending_commits(
    Auth(_caller): Auth,
    State(state): State<AppState>,
    Path((repo_hash, branch_hash)): Path<(String, String)>,
) -> Result<Json<Vec<Commit>>, ApiError> {
    Ok(Json(state.registry.pending_commits(&repo_hash, &branch_hash)?))
}

/// Commits grouped by the merger commit that closed them.
#[utoipa::path(
    get,
    path = "/v1/repos/{repo_hash}/branches/{branch_hash}/commits/groups",
    tag = "Commits",
    security(("bearer_auth" = [])),
    params(
        ("repo_hash" = String, Path, description = "Repository hash"),
        ("branch_hash" = String, Path, description = "Branch hash")
    ),
    responses(
        (status = 200, description = "Merger commit groups", body = Vec<MergerCommitGroup>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Branch not found in this repository")
    )
)]
pub async fn commit_groups(
    Auth(_caller): Auth,
    State(state): State<AppState>,
    Path((repo_hash, branch_hash)): Path<(String, String)>,
) -> Result<Json<Vec<MergerCommitGroup>>, ApiError> {
    Ok(Json(state.registry.commit_groups(&repo_hash, &branch_hash)?))
}

/// Record an aggregation of the branch's contributions. Owner or admin.
#[utoipa::path(
    post,
    path = "/v1/repos/{repo_hash}/branches/{branch_hash}/commits/merger",
    tag = "Commits",
    security(("bearer_auth" = [])),
    params(
        ("repo_hash" = String, Path, description = "Repository hash"),
        ("branch_hash" = String, Path, description = "Branch hash")
    ),
    request_body = CreateCommitRequest,
    responses(
        (status = 201, description = "Merger commit created", body = Commit),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not owner or admin"),
        (status = 404, description = "Branch not found")
    )
)]
pub async fn create_merger_commit(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path((repo_hash, branch_hash)): Path<(String, String)>,
    Json(request): Json<CreateCommitRequest>,
) -> Result<(StatusCode, Json<Commit>), ApiError> {
    let commit = state
        .registry
        .create_merger_commit(
            &caller.wallet,
            &repo_hash,
            &branch_hash,
            request.into_new_commit()?,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(commit)))
}

#[utoipa::path(
    get,
    path = "/v1/commits/{commit_hash}",
    tag = "Commits",
    security(("bearer_auth" = [])),
    params(("commit_hash" = String, Path, description = "Commit hash")),
    responses(
        (status = 200, description = "Commit", body = Commit),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Commit not found")
    )
)]
pub async fn get_commit(
    Auth(_caller): Auth,
    State(state): State<AppState>,
    Path(commit_hash): Path<String>,
) -> Result<Json<Commit>, ApiError> {
    Ok(Json(state.registry.get_commit(&commit_hash)?))
}

/// Merge or reject a `PENDING` commit. Owner or admin.
#[utoipa::path(
    post,
    path = "/v1/commits/{commit_hash}/decision",
    tag = "Commits",
    security(("bearer_auth" = [])),
    params(("commit_hash" = String, Path, description = "Commit hash")),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Decided commit", body = Commit),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not owner or admin"),
        (status = 404, description = "Commit not found"),
        (status = 409, description = "Commit is not pending or the status is not a decision")
    )
)]
pub async fn decide_commit(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(commit_hash): Path<String>,
    Json(decision): Json<DecisionRequest>,
) -> Result<Json<Commit>, ApiError> {
    let commit = state
        .registry
        .decide_commit(
            &caller.wallet,
            &commit_hash,
            decision.status,
            decision.rejection_message,
        )
        .await?;
    Ok(Json(commit))
}

/// Mint an NFT for the commit's parameters. Committer, owner or admin.
#[utoipa::path(
    post,
    path = "/v1/commits/{commit_hash}/nft",
    tag = "Commits",
    security(("bearer_auth" = [])),
    params(("commit_hash" = String, Path, description = "Commit hash")),
    responses(
        (status = 200, description = "Commit with NFT reference", body = Commit),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller may not mint this commit"),
        (status = 404, description = "Commit not found"),
        (status = 409, description = "Already minted"),
        (status = 502, description = "Minting backend failed")
    )
)]
pub async fn mint_nft(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(commit_hash): Path<String>,
) -> Result<Json<Commit>, ApiError> {
    Ok(Json(
        state
            .registry
            .mint_commit_nft(&caller.wallet, &commit_hash)
            .await?,
    ))
}
