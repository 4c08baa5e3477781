//! Document backend configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::validation::{
    validate_non_zero, validate_positive, validate_required_string, validate_uri_scheme,
    Validatable,
};

const SUPPORTED_SCHEMES: &[&str] = &["memory", "mongodb", "mongodb+srv"];

/// Which store implementation a URI selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    MongoDb,
}

impl BackendKind {
    /// Select the backend from the URI scheme
    pub fn from_uri(uri: &str) -> ConfigResult<Self> {
        let scheme = uri
            .split_once("://")
            .map(|(scheme, _)| scheme.to_lowercase())
            .ok_or_else(|| ConfigError::ValidationError(format!("Invalid backend URI: {}", uri)))?;

        match scheme.as_str() {
            "memory" => Ok(BackendKind::Memory),
            "mongodb" | "mongodb+srv" => Ok(BackendKind::MongoDb),
            other => Err(ConfigError::ValidationError(format!(
                "Unsupported backend scheme '{}'. Valid schemes: {}",
                other,
                SUPPORTED_SCHEMES.join(", ")
            ))),
        }
    }
}

/// Document backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Connection string (`memory://`, `mongodb://`, `mongodb+srv://`)
    pub uri: String,

    /// Database holding the tenant collections
    pub database: String,

    /// Driver connection pool size
    pub max_pool_size: u32,

    /// Deadline for establishing the connection
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Deadline for the startup health check
    #[serde(with = "humantime_serde")]
    pub ping_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "orderdb".to_string(),
            max_pool_size: 300,
            connect_timeout: Duration::from_secs(15),
            ping_timeout: Duration::from_secs(5),
        }
    }
}

impl BackendConfig {
    /// In-memory backend, mostly for tests and dry runs
    pub fn memory() -> Self {
        Self {
            uri: "memory://".to_string(),
            ..Default::default()
        }
    }

    pub fn kind(&self) -> ConfigResult<BackendKind> {
        BackendKind::from_uri(&self.uri)
    }
}

impl Validatable for BackendConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_uri_scheme(&self.uri, SUPPORTED_SCHEMES, "uri", self.domain_name())?;
        validate_required_string(&self.database, "database", self.domain_name())?;
        validate_positive(self.max_pool_size, "max_pool_size", self.domain_name())?;
        validate_non_zero(self.connect_timeout, "connect_timeout", self.domain_name())?;
        validate_non_zero(self.ping_timeout, "ping_timeout", self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "backend"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backend() {
        let config = BackendConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.kind().unwrap(), BackendKind::MongoDb);
        assert_eq!(config.max_pool_size, 300);
        assert_eq!(config.database, "orderdb");
    }

    #[test]
    fn test_backend_kind_from_uri() {
        assert_eq!(BackendKind::from_uri("memory://").unwrap(), BackendKind::Memory);
        assert_eq!(
            BackendKind::from_uri("mongodb+srv://u:p@cluster.example.net/?appName=x").unwrap(),
            BackendKind::MongoDb
        );
        assert!(BackendKind::from_uri("redis://localhost").is_err());
        assert!(BackendKind::from_uri("localhost:27017").is_err());
    }

    #[test]
    fn test_invalid_backend() {
        let mut config = BackendConfig::memory();
        assert!(config.validate().is_ok());

        config.max_pool_size = 0;
        assert!(config.validate().is_err());

        config = BackendConfig {
            uri: "ftp://example.com".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
