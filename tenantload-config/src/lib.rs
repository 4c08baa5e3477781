//! Domain-driven configuration management for tenantload
//!
//! Configuration is split by functional domain (tenants, backend, workload,
//! relay, logging), loaded once at startup from defaults, an optional YAML
//! file and the environment, validated, and then passed around immutably.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    backend::{BackendConfig, BackendKind},
    logging::{LogFormat, LogLevel, LoggingConfig},
    relay::RelayConfig,
    tenants::{PacingSpec, Rate, TenantsConfig, MAX_INTERVAL, MIN_INTERVAL},
    workload::WorkloadConfig,
    LoadConfig,
};
