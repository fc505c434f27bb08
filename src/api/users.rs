// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User profile endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    auth::Auth,
    error::ApiError,
    state::AppState,
    versioning::{
        model::{ProfileUpdate, User},
        VersioningError,
    },
};

/// Get the caller's profile.
///
/// Creates the profile if background provisioning has not finished yet.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's profile", body = User),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_me(
    Auth(caller): Auth,
    State(state): State<AppState>,
) -> Result<Json<User>, ApiError> {
    state.registry.ensure_user(&caller.wallet)?;
    Ok(Json(state.registry.get_user(&caller.wallet)?))
}

/// Set the caller's username and merge profile metadata.
#[utoipa::path(
    put,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Updated profile", body = User),
        (status = 400, description = "Nothing to update or invalid username"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Username taken")
    )
)]
pub async fn update_me(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.registry.update_profile(&caller.wallet, update)?))
}

/// Look up a user by wallet address, or by username when no wallet matches.
#[utoipa::path(
    get,
    path = "/v1/users/{wallet}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(
        ("wallet" = String, Path, description = "Wallet address or username")
    ),
    responses(
        (status = 200, description = "User profile", body = User),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    Auth(_caller): Auth,
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> Result<Json<User>, ApiError> {
    let user = match state.registry.get_user(&wallet) {
        Err(VersioningError::NotFound(_)) => state.registry.find_user_by_username(&wallet)?,
        other => other?,
    };
    Ok(Json(user))
}
