//! Client for the authorization service.

use std::time::Duration;

use catalog_core::config::AuthServiceConfig;
use catalog_core::{decode_downstream_status, CatalogError, CatalogResult};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

const SERVICE_NAME: &str = "Auth";

/// Identity the auth service vouches for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: Uuid,
    pub login: String,
}

/// Client for the authorization service.
#[derive(Debug, Clone)]
pub struct AuthClient {
    client: Client,
    base_url: Url,
}

impl AuthClient {
    /// Create a client with the default timeout.
    pub fn new(base_url: &str) -> CatalogResult<Self> {
        Self::from_config(&AuthServiceConfig::new(base_url))
    }

    /// Create a client from configuration.
    pub fn from_config(config: &AuthServiceConfig) -> CatalogResult<Self> {
        // Without a trailing slash `Url::join` would drop the last segment.
        let mut base = config.base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base).map_err(|e| {
            CatalogError::Configuration(format!(
                "invalid auth service url '{}': {}",
                config.base_url, e
            ))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CatalogError::Configuration(format!("failed to build http client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    /// Base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> CatalogResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| CatalogError::Internal(format!("invalid auth endpoint '{}': {}", path, e)))
    }

    /// Turn a non-success response into a typed error.
    async fn decode_error(response: Response) -> CatalogError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        warn!(status, body = %body, "Auth service rejected request");
        decode_downstream_status(SERVICE_NAME, status, &body)
    }

    /// Check a bearer token.
    /// GET /auth/verify
    pub async fn verify_token(&self, token: &str) -> CatalogResult<Principal> {
        let url = self.endpoint("auth/verify")?;
        debug!(url = %url, "Verifying token with auth service");

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| CatalogError::Network(format!("Failed to reach auth service: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }

        response
            .json::<Principal>()
            .await
            .map_err(|e| CatalogError::Network(format!("Failed to parse auth response: {}", e)))
    }
}
