//! Configuration system for catalog.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{CatalogError, CatalogResult};

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Location of the downstream authorization service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthServiceConfig {
    /// Base URL, e.g. `http://auth:8081`.
    pub base_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_auth_timeout")]
    pub timeout_secs: u64,
}

fn default_auth_timeout() -> u64 {
    5
}

impl AuthServiceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: default_auth_timeout(),
        }
    }
}

/// Main catalog configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Path to the SQLite database holding all stores.
    pub database_path: PathBuf,
    /// Listener configuration.
    pub server: ServerConfig,
    /// Authorization service; tariff mutations are unchecked when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthServiceConfig>,
    /// Emit logs as JSON lines.
    pub log_json: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        let catalog_dir = dirs::home_dir()
            .map(|h| h.join(".catalog"))
            .unwrap_or_else(|| PathBuf::from(".catalog"));

        Self {
            database_path: catalog_dir.join("catalog.db"),
            server: ServerConfig::default(),
            auth: None,
            log_json: false,
        }
    }
}

impl CatalogConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> CatalogResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| CatalogError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| CatalogError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| CatalogError::Configuration(e.to_string())),
            _ => Err(CatalogError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> CatalogResult<Self> {
        Self::default().apply_env(|key| std::env::var(key).ok())
    }

    /// Overlay values from a variable lookup on top of `self`.
    pub fn apply_env<F>(mut self, lookup: F) -> CatalogResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("CATALOG_DB_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(host) = lookup("CATALOG_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("CATALOG_PORT") {
            self.server.port = port.parse().map_err(|_| {
                CatalogError::Configuration(format!(
                    "CATALOG_PORT must be a valid port number, got '{}'",
                    port
                ))
            })?;
        }
        if let Some(url) = lookup("CATALOG_AUTH_URL") {
            let mut auth = AuthServiceConfig::new(url);
            if let Some(timeout) = lookup("CATALOG_AUTH_TIMEOUT_SECS") {
                auth.timeout_secs = timeout.parse().map_err(|_| {
                    CatalogError::Configuration(format!(
                        "CATALOG_AUTH_TIMEOUT_SECS must be a number of seconds, got '{}'",
                        timeout
                    ))
                })?;
            }
            self.auth = Some(auth);
        }
        if let Some(flag) = lookup("CATALOG_LOG_JSON") {
            self.log_json = matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(self)
    }

    /// Listener address as `host:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> CatalogConfigBuilder {
        CatalogConfigBuilder::default()
    }
}

/// Builder for CatalogConfig.
#[derive(Default)]
pub struct CatalogConfigBuilder {
    config: CatalogConfig,
}

impl CatalogConfigBuilder {
    /// Set database path.
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = path.into();
        self
    }

    /// Set listener host and port.
    pub fn listen(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.server = ServerConfig {
            host: host.into(),
            port,
        };
        self
    }

    /// Set authorization service.
    pub fn auth(mut self, auth: AuthServiceConfig) -> Self {
        self.config.auth = Some(auth);
        self
    }

    /// Enable JSON log output.
    pub fn log_json(mut self, enabled: bool) -> Self {
        self.config.log_json = enabled;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> CatalogConfig {
        self.config
    }
}
