//! Server state management.

use std::path::Path;
use std::sync::Arc;

use catalog_client::AuthClient;
use catalog_core::{
    open_connection, AuditService, CatalogConfig, CatalogResult, CredentialsService,
    ProductFields, ProductService, SharedConnection, SqliteClientStore, SqliteVersionStore,
    TariffFields, TariffService,
};
use tracing::info;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub products: ProductService,
    pub product_audit: AuditService<ProductFields>,
    pub tariffs: TariffService,
    pub tariff_audit: AuditService<TariffFields>,
    pub credentials: CredentialsService,
    /// Verifies callers of tariff mutations when set.
    pub auth: Option<Arc<AuthClient>>,
}

impl AppState {
    /// Build every service on one database connection.
    pub fn with_connection(conn: SharedConnection) -> CatalogResult<Self> {
        let product_store = Arc::new(SqliteVersionStore::<ProductFields>::with_connection(
            conn.clone(),
        )?);
        let tariff_store = Arc::new(SqliteVersionStore::<TariffFields>::with_connection(
            conn.clone(),
        )?);
        let client_store = Arc::new(SqliteClientStore::with_connection(conn)?);

        Ok(Self {
            products: ProductService::new(product_store.clone()),
            product_audit: AuditService::new(product_store),
            tariffs: TariffService::new(tariff_store.clone()),
            tariff_audit: AuditService::new(tariff_store),
            credentials: CredentialsService::new(client_store),
            auth: None,
        })
    }

    /// Open the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> CatalogResult<Self> {
        Self::with_connection(open_connection(path)?)
    }

    /// State backed by a private in-memory database.
    pub fn in_memory() -> CatalogResult<Self> {
        Self::open(":memory:")
    }

    /// Build state from configuration, including the auth client if configured.
    pub fn from_config(config: &CatalogConfig) -> CatalogResult<Self> {
        info!(path = %config.database_path.display(), "Opening catalog database");
        let mut state = Self::open(&config.database_path)?;
        if let Some(auth) = &config.auth {
            info!(url = %auth.base_url, "Tariff mutations require auth verification");
            state.auth = Some(Arc::new(AuthClient::from_config(auth)?));
        }
        Ok(state)
    }

    /// Attach an auth client.
    pub fn with_auth(mut self, client: AuthClient) -> Self {
        self.auth = Some(Arc::new(client));
        self
    }
}
