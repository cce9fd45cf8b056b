//! catalog-client - Typed clients for downstream services.
//!
//! Each remote call is one method; non-success responses are decoded into
//! [`catalog_core::CatalogError`] with
//! [`catalog_core::decode_downstream_status`].
//!
//! # Example
//!
//! ```ignore
//! use catalog_client::AuthClient;
//!
//! let client = AuthClient::new("http://auth:8081")?;
//! let principal = client.verify_token("eyJhbGciOi...").await?;
//! ```

mod auth;

pub use auth::{AuthClient, Principal};
