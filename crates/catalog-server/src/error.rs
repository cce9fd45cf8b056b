//! Error handling for the REST API server.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use catalog_core::{CatalogError, ErrorKind, Violation};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, warn};

/// Error response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorBody {
    /// Field-level validation failures.
    Violations { violations: Vec<Violation> },
    /// Everything else.
    Problem { title: String, detail: String },
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody::Problem {
                title: title.into(),
                detail: detail.into(),
            },
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ErrorKind::ValidationError.title(),
            detail,
        )
    }

    pub fn violations(violations: Vec<Violation>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody::Violations { violations },
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            ErrorBody::Problem { title, detail } => {
                write!(f, "[{}] {}: {}", self.status, title, detail)
            }
            ErrorBody::Violations { violations } => {
                write!(f, "[{}] {} violation(s)", self.status, violations.len())
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// Convert from catalog-core errors
impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        let kind = err.kind();
        let status =
            StatusCode::from_u16(kind.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if kind == ErrorKind::UnexpectedError {
            error!(error = %err, "Request failed");
        } else {
            warn!(kind = %kind, error = %err, "Request rejected");
        }

        if let Some(violations) = err.field_violations() {
            return ApiError {
                status,
                body: ErrorBody::Violations {
                    violations: violations.to_vec(),
                },
            };
        }

        ApiError::new(status, kind.title(), err.detail())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(status = %rejection.status(), error = %rejection.body_text(), "Malformed request body");
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        warn!(error = %rejection.body_text(), "Malformed path parameter");
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        warn!(error = %rejection.body_text(), "Malformed query string");
        ApiError::bad_request(rejection.body_text())
    }
}

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
