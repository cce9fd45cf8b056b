//! catalog-core - Core library for catalog.
//!
//! This crate provides the versioned entity store, audit and revert
//! services, input validation, configuration and the product, tariff and
//! credentials services behind the catalog REST API.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use catalog_core::{AuditService, ProductFields, ProductService, SqliteVersionStore};
//!
//! let store = Arc::new(SqliteVersionStore::<ProductFields>::in_memory()?);
//! let products = ProductService::new(store.clone());
//! let audit = AuditService::new(store);
//!
//! let product = products.create(request)?;
//! let reverted = audit.revert_version(product.id, 0)?;
//! ```

pub mod audit;
pub mod config;
pub mod credentials;
pub mod error;
pub mod product;
pub mod tariff;
pub mod validation;
pub mod versioning;

// Re-export commonly used types
pub use audit::{system_clock, AuditService, Clock};
pub use config::{AuthServiceConfig, CatalogConfig, ServerConfig};
pub use credentials::{
    Application, Client, ClientDto, ClientStore, CredentialsService, SqliteClientStore,
};
pub use error::{decode_downstream_status, CatalogError, CatalogResult, ErrorKind, Violation};
pub use product::{CreateProductDto, ProductDto, ProductFields, ProductService, UpdateProductDto};
pub use tariff::{TariffCreateDto, TariffDto, TariffFields, TariffService};
pub use validation::{Validate, Validator};
pub use versioning::{
    open_connection, ChangeKind, EntityVersion, SharedConnection, SqliteVersionStore,
    VersionStore, VersionedEntity,
};
