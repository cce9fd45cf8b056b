//! Error types for catalog operations.
//!
//! The error set is closed: every failure a service can produce is one of the
//! [`CatalogError`] variants, and every variant maps onto exactly one
//! [`ErrorKind`], which in turn carries the HTTP status used at the edge.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// A single failed input rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Name of the offending field, as it appears in the request body.
    pub field: String,
    /// Human readable description of the broken rule.
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Main error type for all catalog operations.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        violations: Vec<Violation>,
    },

    /// Entity not found.
    #[error("Not found: {message}")]
    NotFound { message: String, entity_id: Option<String> },

    /// Caller is not allowed to use the resource.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Token or principal failed verification.
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Client credentials are present but unusable.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Database operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network error talking to a downstream service.
    #[error("Network error: {0}")]
    Network(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of errors, one per HTTP outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ValidationError,
    NotFound,
    AccessDenied,
    AuthorizationError,
    InvalidCredentials,
    UnexpectedError,
}

impl ErrorKind {
    /// HTTP status code surfaced to callers.
    pub fn status(&self) -> u16 {
        match self {
            ErrorKind::ValidationError => 400,
            ErrorKind::AccessDenied => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::AuthorizationError => 409,
            ErrorKind::InvalidCredentials => 409,
            ErrorKind::UnexpectedError => 500,
        }
    }

    /// Short title used in `{title, detail}` error bodies.
    pub fn title(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "Validation error",
            ErrorKind::NotFound => "Input data error",
            ErrorKind::AccessDenied => "Input data error",
            ErrorKind::AuthorizationError => "Authorization error",
            ErrorKind::InvalidCredentials => "Validation error",
            ErrorKind::UnexpectedError => "Unexpected error",
        }
    }
}

impl CatalogError {
    /// Create a validation error without field-level detail.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            violations: Vec::new(),
        }
    }

    /// Create a validation error from a list of violations.
    pub fn violations(violations: Vec<Violation>) -> Self {
        let message = violations
            .iter()
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect::<Vec<_>>()
            .join("; ");
        Self::Validation {
            message,
            violations,
        }
    }

    /// Create a not found error for an entity.
    pub fn not_found(entity: &str, entity_id: impl ToString) -> Self {
        let id = entity_id.to_string();
        Self::NotFound {
            message: format!("{} with id '{}' not found", entity, id),
            entity_id: Some(id),
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            source: None,
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::ValidationError,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AccessDenied(_) => ErrorKind::AccessDenied,
            Self::Authorization(_) => ErrorKind::AuthorizationError,
            Self::InvalidCredentials(_) => ErrorKind::InvalidCredentials,
            _ => ErrorKind::UnexpectedError,
        }
    }

    /// Field violations, if this is a validation error that carries any.
    pub fn field_violations(&self) -> Option<&[Violation]> {
        match self {
            Self::Validation { violations, .. } if !violations.is_empty() => Some(violations),
            _ => None,
        }
    }

    /// Message without the variant prefix added by `Display`.
    pub fn detail(&self) -> String {
        match self {
            Self::Validation { message, .. } => message.clone(),
            Self::NotFound { message, .. } => message.clone(),
            Self::AccessDenied(msg)
            | Self::Authorization(msg)
            | Self::InvalidCredentials(msg)
            | Self::Configuration(msg)
            | Self::Network(msg)
            | Self::Internal(msg) => msg.clone(),
            Self::Database { message, .. } => message.clone(),
            Self::Io(e) => e.to_string(),
            Self::Serialization(e) => e.to_string(),
        }
    }
}

/// Translate a status code returned by a downstream service into a local error.
///
/// `service` labels the origin in the message, e.g. `"Auth"`.
pub fn decode_downstream_status(service: &str, status: u16, body: &str) -> CatalogError {
    let suffix = if body.trim().is_empty() {
        String::new()
    } else {
        format!(" ({})", body.trim())
    };

    match status {
        400 => CatalogError::validation(format!("{} - request data rejected{}", service, suffix)),
        403 => CatalogError::AccessDenied(format!("{} - access denied{}", service, suffix)),
        404 => CatalogError::NotFound {
            message: format!("{} - user not found{}", service, suffix),
            entity_id: None,
        },
        409 => CatalogError::Authorization(format!(
            "{} - token failed verification{}",
            service, suffix
        )),
        other => CatalogError::Internal(format!(
            "{} - unexpected status {}{}",
            service, other, suffix
        )),
    }
}

impl From<rusqlite::Error> for CatalogError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}
