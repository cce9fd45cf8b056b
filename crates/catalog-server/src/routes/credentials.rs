//! Client registration endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use catalog_core::{Client, ClientDto};
use tracing::info;
use uuid::Uuid;

use super::run_blocking;
use crate::error::ApiResult;
use crate::state::AppState;

/// Register a client for an application.
/// POST /credentials/create
pub async fn create_client(
    State(state): State<AppState>,
    body: Result<Json<ClientDto>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Client>)> {
    let Json(request) = body?;
    info!(application = %request.application, "Register client");

    let credentials = state.credentials;
    let client = run_blocking(move || credentials.create(request)).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

/// GET /credentials/:id
pub async fn get_client(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Client>> {
    let Path(id) = path?;

    let credentials = state.credentials;
    let client = run_blocking(move || credentials.get(id)).await?;
    Ok(Json(client))
}
