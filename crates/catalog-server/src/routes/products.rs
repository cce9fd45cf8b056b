//! Product CRUD endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use catalog_core::{CreateProductDto, ProductDto, UpdateProductDto};
use tracing::info;
use uuid::Uuid;

use super::run_blocking;
use crate::error::ApiResult;
use crate::state::AppState;

/// Create a product.
/// POST /product/create
pub async fn create_product(
    State(state): State<AppState>,
    body: Result<Json<CreateProductDto>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ProductDto>)> {
    let Json(request) = body?;
    info!(name = %request.name, "Create product");

    let products = state.products;
    let product = run_blocking(move || products.create(request)).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Update a product. Absent fields keep their current value.
/// PUT /product/update/:id
pub async fn update_product(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateProductDto>, JsonRejection>,
) -> ApiResult<Json<ProductDto>> {
    let Path(id) = path?;
    let Json(request) = body?;
    info!(product_id = %id, "Update product");

    let products = state.products;
    let product = run_blocking(move || products.update(id, request)).await?;
    Ok(Json(product))
}

/// Remove a product with its whole history.
/// DELETE /product/remove/:id
pub async fn remove_product(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = path?;
    info!(product_id = %id, "Remove product");

    let products = state.products;
    run_blocking(move || products.remove(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get the current product.
/// GET /product/:id
pub async fn get_product(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<ProductDto>> {
    let Path(id) = path?;

    let products = state.products;
    let product = run_blocking(move || products.get(id)).await?;
    Ok(Json(product))
}
