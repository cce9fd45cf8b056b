//! Middleware and request guards for the REST API server.

use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use catalog_client::Principal;
use catalog_core::CatalogError;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::error::ApiResult;
use crate::state::AppState;

/// Create CORS middleware.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Request logging middleware.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    info!(
        method = %method,
        uri = %uri,
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        "Request completed"
    );

    response
}

/// Extract a bearer token from the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Verify the caller with the auth service, if one is configured.
///
/// Returns `None` when the server runs without an auth service.
pub async fn authorize(state: &AppState, headers: &HeaderMap) -> ApiResult<Option<Principal>> {
    let Some(auth) = &state.auth else {
        return Ok(None);
    };

    let token = bearer_token(headers)
        .ok_or_else(|| CatalogError::Authorization("Missing bearer token".to_string()))?;
    let principal = auth.verify_token(token).await?;
    info!(user_id = %principal.user_id, login = %principal.login, "Caller verified");
    Ok(Some(principal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Token abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[tokio::test]
    async fn test_authorize_without_auth_service() {
        let state = AppState::in_memory().unwrap();
        assert_eq!(authorize(&state, &HeaderMap::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_authorize_requires_token() {
        let state = AppState::in_memory()
            .unwrap()
            .with_auth(catalog_client::AuthClient::new("http://127.0.0.1:1").unwrap());
        let err = authorize(&state, &HeaderMap::new()).await.unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::CONFLICT);
    }
}
