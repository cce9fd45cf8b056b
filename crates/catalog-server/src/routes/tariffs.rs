//! Tariff endpoints. Mutations are verified against the auth service when
//! one is configured.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    Json,
};
use catalog_core::{TariffCreateDto, TariffDto, TariffFields};
use tracing::info;
use uuid::Uuid;

use super::audit::{revert, RevertQuery};
use super::run_blocking;
use crate::error::ApiResult;
use crate::middleware::authorize;
use crate::state::AppState;

/// Create a tariff.
/// POST /tariff/create
pub async fn create_tariff(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<TariffCreateDto>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TariffDto>)> {
    let Json(mut request) = body?;
    if let Some(principal) = authorize(&state, &headers).await? {
        request.author.get_or_insert(principal.user_id);
    }
    info!(name = %request.name, "Create tariff");

    let tariffs = state.tariffs;
    let tariff = run_blocking(move || tariffs.create(request)).await?;
    Ok((StatusCode::CREATED, Json(tariff)))
}

/// Replace a tariff's fields.
/// PUT /tariff/update/:id
pub async fn update_tariff(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<TariffCreateDto>, JsonRejection>,
) -> ApiResult<Json<TariffDto>> {
    let Path(id) = path?;
    let Json(mut request) = body?;
    if let Some(principal) = authorize(&state, &headers).await? {
        request.author.get_or_insert(principal.user_id);
    }
    info!(tariff_id = %id, "Update tariff");

    let tariffs = state.tariffs;
    let tariff = run_blocking(move || tariffs.update(id, request)).await?;
    Ok(Json(tariff))
}

/// Remove a tariff with its whole history.
/// DELETE /tariff/remove/:id
pub async fn remove_tariff(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = path?;
    authorize(&state, &headers).await?;
    info!(tariff_id = %id, "Remove tariff");

    let tariffs = state.tariffs;
    run_blocking(move || tariffs.remove(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get the current tariff.
/// GET /tariff/:id
pub async fn get_tariff(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<TariffDto>> {
    let Path(id) = path?;

    let tariffs = state.tariffs;
    let tariff = run_blocking(move || tariffs.get(id)).await?;
    Ok(Json(tariff))
}

/// Revert a tariff to an earlier version.
/// PUT /tariff/audit/revert/:id?version=N
pub async fn revert_tariff_version(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<RevertQuery>, QueryRejection>,
) -> ApiResult<Json<TariffDto>> {
    let Path(id) = path?;
    let Query(query) = query?;
    authorize(&state, &headers).await?;
    revert::<TariffFields, _>(state.tariff_audit, id, query).await
}
