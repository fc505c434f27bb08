// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blob download. Record URIs point here unless `GATEWAY_URL` names an
//! external gateway.

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};

use crate::{auth::Auth, error::ApiError, state::AppState};

/// Download stored content by hash.
#[utoipa::path(
    get,
    path = "/v1/blobs/{cid}",
    tag = "Blobs",
    security(("bearer_auth" = [])),
    params(("cid" = String, Path, description = "Hex SHA-256 of the content")),
    responses(
        (status = 200, description = "Raw content", content_type = "application/octet-stream", body = Vec<u8>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No blob with this hash")
    )
)]
pub async fn get_blob(
    Auth(_caller): Auth,
    State(state): State<AppState>,
    Path(cid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (record, content) = state.registry.fetch_blob(&cid).await?;
    let filename = if record.extension.is_empty() {
        record.cid
    } else {
        format!("{}.{}", record.cid, record.extension)
    };

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        content,
    ))
}
