//! Route definitions for the REST API.

mod audit;
mod credentials;
mod health;
mod products;
mod tariffs;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use catalog_core::{CatalogError, CatalogResult};

use crate::error::ApiResult;
use crate::state::AppState;

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Product audit
        .route("/audit/find/actual/:id", get(audit::get_actual_product_version))
        .route("/audit/find/previous/:id", get(audit::get_previous_product_versions))
        .route("/audit/find/period/:id", get(audit::get_product_versions_by_period))
        .route("/audit/revert/:id", put(audit::revert_product_version))
        // Products
        .route("/product/create", post(products::create_product))
        .route("/product/update/:id", put(products::update_product))
        .route("/product/remove/:id", delete(products::remove_product))
        .route("/product/:id", get(products::get_product))
        // Tariffs
        .route("/tariff/create", post(tariffs::create_tariff))
        .route("/tariff/update/:id", put(tariffs::update_tariff))
        .route("/tariff/remove/:id", delete(tariffs::remove_tariff))
        .route("/tariff/:id", get(tariffs::get_tariff))
        .route("/tariff/audit/actual/:id", get(audit::get_actual_tariff_version))
        .route("/tariff/audit/previous/:id", get(audit::get_previous_tariff_versions))
        .route("/tariff/audit/period/:id", get(audit::get_tariff_versions_by_period))
        .route("/tariff/audit/revert/:id", put(tariffs::revert_tariff_version))
        // Credentials
        .route("/credentials/create", post(credentials::create_client))
        .route("/credentials/:id", get(credentials::get_client))
        // Attach state
        .with_state(state)
}

/// Run a blocking store operation off the async workers.
pub(crate) async fn run_blocking<F, T>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> CatalogResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CatalogError::Internal(format!("blocking task failed: {}", e)))?
        .map_err(Into::into)
}

pub use audit::*;
pub use credentials::*;
pub use health::*;
pub use products::*;
pub use tariffs::*;
