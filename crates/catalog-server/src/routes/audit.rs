//! Version history endpoints for products and tariffs.

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use catalog_core::{
    AuditService, EntityVersion, ProductDto, ProductFields, TariffDto, TariffFields,
    VersionedEntity,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::run_blocking;
use crate::error::ApiResult;
use crate::state::AppState;

/// Query string for period lookups.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodQuery {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
}

/// Query string for reverts.
#[derive(Debug, Deserialize)]
pub struct RevertQuery {
    pub version: u32,
}

pub(crate) async fn actual<T, D>(audit: AuditService<T>, id: Uuid) -> ApiResult<Json<D>>
where
    T: VersionedEntity,
    D: From<EntityVersion<T>> + Serialize + Send + 'static,
{
    info!(entity = T::ENTITY_NAME, entity_id = %id, "Find actual version");
    let version = run_blocking(move || audit.get_actual_version(id)).await?;
    Ok(Json(version.into()))
}

pub(crate) async fn previous<T, D>(audit: AuditService<T>, id: Uuid) -> ApiResult<Json<Vec<D>>>
where
    T: VersionedEntity,
    D: From<EntityVersion<T>> + Serialize + Send + 'static,
{
    info!(entity = T::ENTITY_NAME, entity_id = %id, "Find previous versions");
    let versions = run_blocking(move || audit.get_previous_versions(id)).await?;
    Ok(Json(versions.into_iter().map(Into::into).collect()))
}

pub(crate) async fn period<T, D>(
    audit: AuditService<T>,
    id: Uuid,
    query: PeriodQuery,
) -> ApiResult<Json<Vec<D>>>
where
    T: VersionedEntity,
    D: From<EntityVersion<T>> + Serialize + Send + 'static,
{
    info!(
        entity = T::ENTITY_NAME,
        entity_id = %id,
        from = %query.from_date,
        to = %query.to_date,
        "Find versions by period"
    );
    let versions = run_blocking(move || {
        audit.get_versions_by_period(query.from_date, query.to_date, id)
    })
    .await?;
    Ok(Json(versions.into_iter().map(Into::into).collect()))
}

pub(crate) async fn revert<T, D>(
    audit: AuditService<T>,
    id: Uuid,
    query: RevertQuery,
) -> ApiResult<Json<D>>
where
    T: VersionedEntity,
    D: From<EntityVersion<T>> + Serialize + Send + 'static,
{
    info!(entity = T::ENTITY_NAME, entity_id = %id, version = query.version, "Revert version");
    let reverted = run_blocking(move || audit.revert_version(id, query.version)).await?;
    Ok(Json(reverted.into()))
}

/// GET /audit/find/actual/:id
pub async fn get_actual_product_version(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<ProductDto>> {
    let Path(id) = path?;
    actual::<ProductFields, _>(state.product_audit, id).await
}

/// GET /audit/find/previous/:id
pub async fn get_previous_product_versions(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Vec<ProductDto>>> {
    let Path(id) = path?;
    previous::<ProductFields, _>(state.product_audit, id).await
}

/// GET /audit/find/period/:id?fromDate=..&toDate=..
pub async fn get_product_versions_by_period(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<PeriodQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<ProductDto>>> {
    let Path(id) = path?;
    let Query(query) = query?;
    period::<ProductFields, _>(state.product_audit, id, query).await
}

/// PUT /audit/revert/:id?version=N
pub async fn revert_product_version(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<RevertQuery>, QueryRejection>,
) -> ApiResult<Json<ProductDto>> {
    let Path(id) = path?;
    let Query(query) = query?;
    revert::<ProductFields, _>(state.product_audit, id, query).await
}

/// GET /tariff/audit/actual/:id
pub async fn get_actual_tariff_version(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<TariffDto>> {
    let Path(id) = path?;
    actual::<TariffFields, _>(state.tariff_audit, id).await
}

/// GET /tariff/audit/previous/:id
pub async fn get_previous_tariff_versions(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Vec<TariffDto>>> {
    let Path(id) = path?;
    previous::<TariffFields, _>(state.tariff_audit, id).await
}

/// GET /tariff/audit/period/:id?fromDate=..&toDate=..
pub async fn get_tariff_versions_by_period(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<PeriodQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<TariffDto>>> {
    let Path(id) = path?;
    let Query(query) = query?;
    period::<TariffFields, _>(state.tariff_audit, id, query).await
}
