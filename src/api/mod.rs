// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # HTTP API
//!
//! Every protected route carries its own auth gate: the middleware checks
//! the credential against the action the route requires before the handler
//! runs. Read routes accept `signin` or `skip` tokens.

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put, MethodRouter},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{actions, require_auth, AuthContext, AuthGate, AuthScheme, ChallengeMessage, Credentials},
    models::{
        ChallengeResponse, CreateCommitRequest, DecisionRequest, DeleteRepositoryResponse,
        ForkBranchRequest, RoleTargetRequest, SignInResponse, UpdateBranchRequest,
        UploadBaseModelRequest, ZkmlRequest,
    },
    state::AppState,
    storage::BlobRecord,
    versioning::model::{
        BaseModelRemoval, Branch, BranchSnapshot, CloneView, Commit, CommitStatus, CommittedBy,
        Framework, MergerCommitGroup, Metrics, NewBranch, NewRepository, NftReference,
        ProfileUpdate, Repository, RepositoryMetadata, RepositoryMetadataPatch, RepositoryUpdate,
        RoleChanges, RoleSummary, User, UserMetadata, ZkmlProof,
    },
};

pub mod auth;
pub mod basemodel;
pub mod blobs;
pub mod branches;
pub mod commits;
pub mod health;
pub mod repos;
pub mod users;

/// Request bodies carry base64 model files.
const MAX_BODY_BYTES: usize = 512 * 1024 * 1024;

fn guard(route: MethodRouter<AppState>, state: &AppState, ctx: AuthContext) -> MethodRouter<AppState> {
    route.route_layer(from_fn_with_state(
        AuthGate::new(state.auth.clone(), ctx),
        require_auth,
    ))
}

fn read(route: MethodRouter<AppState>, state: &AppState) -> MethodRouter<AppState> {
    guard(route, state, AuthContext::read())
}

fn action(route: MethodRouter<AppState>, state: &AppState, name: &str) -> MethodRouter<AppState> {
    guard(route, state, AuthContext::action(name))
}

pub fn router(state: AppState) -> Router {
    let s = &state;
    let v1_routes = Router::new()
        .route("/auth/signin/{address}", get(auth::challenge))
        .route("/auth/signin", post(auth::sign_in))
        .route(
            "/users/me",
            read(get(users::get_me), s).merge(action(
                put(users::update_me),
                s,
                actions::UPDATE_PROFILE,
            )),
        )
        .route("/users/{wallet}", read(get(users::get_user), s))
        .route(
            "/users/{wallet}/repos/{name}",
            read(get(repos::find_repository), s),
        )
        .route(
            "/repos",
            read(get(repos::list_repositories), s).merge(action(
                post(repos::create_repository),
                s,
                actions::CREATE_REPOSITORY,
            )),
        )
        .route(
            "/repos/{repo_hash}",
            read(get(repos::get_repository), s)
                .merge(action(
                    put(repos::update_repository),
                    s,
                    actions::UPDATE_REPOSITORY,
                ))
                .merge(action(
                    delete(repos::delete_repository),
                    s,
                    actions::DELETE_REPOSITORY,
                )),
        )
        .route(
            "/repos/{repo_hash}/clone",
            read(get(repos::clone_repository), s),
        )
        .route("/repos/{repo_hash}/roles", read(get(repos::list_roles), s))
        .route(
            "/repos/{repo_hash}/admins",
            action(
                post(repos::add_admin).delete(repos::remove_admin),
                s,
                actions::MANAGE_ROLES,
            ),
        )
        .route(
            "/repos/{repo_hash}/writers",
            action(
                post(repos::add_writer).delete(repos::revoke_writer),
                s,
                actions::MANAGE_ROLES,
            ),
        )
        .route(
            "/repos/{repo_hash}/branches",
            read(get(branches::list_branches), s).merge(action(
                post(branches::create_branch),
                s,
                actions::CREATE_BRANCH,
            )),
        )
        .route(
            "/repos/{repo_hash}/branches/{branch_hash}",
            read(get(branches::get_branch), s)
                .merge(action(
                    put(branches::update_branch),
                    s,
                    actions::UPDATE_BRANCH,
                ))
                .merge(action(
                    delete(branches::delete_branch),
                    s,
                    actions::DELETE_BRANCH,
                )),
        )
        .route(
            "/repos/{repo_hash}/branches/{branch_hash}/fork",
            action(post(branches::fork_branch), s, actions::CREATE_BRANCH),
        )
        .route(
            "/repos/{repo_hash}/branches/{branch_hash}/commits",
            read(get(commits::list_commits), s).merge(action(
                post(commits::create_commit),
                s,
                actions::CREATE_COMMIT,
            )),
        )
        .route(
            "/repos/{repo_hash}/branches/{branch_hash}/commits/latest",
            read(get(commits::latest_commit), s),
        )
        .route(
            "/repos/{repo_hash}/branches/{branch_hash}/commits/pending",
            read(get(commits::pending_commits), s),
        )
        .route(
            "/repos/{repo_hash}/branches/{branch_hash}/commits/groups",
            read(get(commits::commit_groups), s),
        )
        .route(
            "/repos/{repo_hash}/branches/{branch_hash}/commits/merger",
            action(post(commits::create_merger_commit), s, actions::MERGE_COMMITS),
        )
        .route("/commits/{commit_hash}", read(get(commits::get_commit), s))
        .route(
            "/commits/{commit_hash}/decision",
            action(post(commits::decide_commit), s, actions::MERGE_COMMITS),
        )
        .route(
            "/commits/{commit_hash}/nft",
            action(post(commits::mint_nft), s, actions::MINT_NFT),
        )
        .route(
            "/repos/{repo_hash}/basemodel",
            read(get(basemodel::get_base_model), s)
                .merge(action(
                    post(basemodel::upload_base_model),
                    s,
                    actions::UPLOAD_MODEL,
                ))
                .merge(action(
                    delete(basemodel::delete_base_model),
                    s,
                    actions::DELETE_MODEL,
                )),
        )
        .route("/blobs/{cid}", read(get(blobs::get_blob), s))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .with_state(state)
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        auth::challenge,
        auth::sign_in,
        users::get_me,
        users::update_me,
        users::get_user,
        repos::list_repositories,
        repos::create_repository,
        repos::find_repository,
        repos::get_repository,
        repos::update_repository,
        repos::delete_repository,
        repos::clone_repository,
        repos::list_roles,
        repos::add_admin,
        repos::remove_admin,
        repos::add_writer,
        repos::revoke_writer,
        branches::list_branches,
        branches::create_branch,
        branches::get_branch,
        branches::update_branch,
        branches::delete_branch,
        branches::fork_branch,
        commits::list_commits,
        commits::create_commit,
        commits::latest_commit,
        commits::pending_commits,
        commits::commit_groups,
        commits::create_merger_commit,
        commits::get_commit,
        commits::decide_commit,
        commits::mint_nft,
        basemodel::get_base_model,
        basemodel::upload_base_model,
        basemodel::delete_base_model,
        blobs::get_blob
    ),
    components(
        schemas(
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks,
            ChallengeMessage,
            ChallengeResponse,
            Credentials,
            AuthScheme,
            SignInResponse,
            User,
            UserMetadata,
            ProfileUpdate,
            Framework,
            Repository,
            RepositoryMetadata,
            RepositoryMetadataPatch,
            NewRepository,
            RepositoryUpdate,
            RoleChanges,
            RoleSummary,
            RoleTargetRequest,
            DeleteRepositoryResponse,
            CloneView,
            BranchSnapshot,
            Branch,
            NewBranch,
            UpdateBranchRequest,
            ForkBranchRequest,
            Commit,
            CommitStatus,
            CommittedBy,
            Metrics,
            ZkmlProof,
            NftReference,
            MergerCommitGroup,
            CreateCommitRequest,
            ZkmlRequest,
            DecisionRequest,
            BlobRecord,
            UploadBaseModelRequest,
            BaseModelRemoval
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "Auth", description = "Wallet challenges and sign-in"),
        (name = "Users", description = "Profiles"),
        (name = "Repositories", description = "Repositories and roles"),
        (name = "Branches", description = "Branch management"),
        (name = "Commits", description = "Commits, merge decisions and NFTs"),
        (name = "Base Model", description = "Base model upload and removal"),
        (name = "Blobs", description = "Content download by hash")
    )
)]
pub struct ApiDoc;
