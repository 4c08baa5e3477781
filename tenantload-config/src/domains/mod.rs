//! Domain-specific configuration modules

pub mod backend;
pub mod logging;
pub mod relay;
pub mod tenants;
pub mod utils;
pub mod workload;

use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;
use crate::validation::Validatable;
use tenantload_core::RunConfig;

/// Complete configuration of one tenantload process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoadConfig {
    /// Tenant population and pacing
    pub tenants: tenants::TenantsConfig,

    /// Document backend
    pub backend: backend::BackendConfig,

    /// Workload tuning
    pub workload: workload::WorkloadConfig,

    /// Broker relay and producer
    pub relay: relay::RelayConfig,

    /// Logging
    pub logging: logging::LoggingConfig,
}

impl LoadConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.tenants.validate()?;
        self.backend.validate()?;
        self.workload.validate()?;
        self.relay.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Per-tenant run parameters; fails when no tenant is configured
    pub fn run_plan(&self) -> ConfigResult<Vec<RunConfig>> {
        self.tenants.resolve()
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let mut config = LoadConfig::default();
        config.tenants.tenants = vec!["T1001".to_string(), "T1002".to_string()];
        config.tenants.users_map.insert("T1001".to_string(), 2);
        config.tenants.rate_map.insert(
            "T1002".to_string(),
            tenants::PacingSpec::Named(tenants::Rate::High),
        );
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(LoadConfig::default().validate_all().is_ok());
    }

    #[test]
    fn test_sample_parses_back() {
        let sample = LoadConfig::generate_sample();
        let parsed: LoadConfig = serde_yaml::from_str(&sample).unwrap();
        assert!(parsed.validate_all().is_ok());

        let plan = parsed.run_plan().unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].user_count, 2);
        assert_eq!(plan[1].pacing_interval, std::time::Duration::from_secs(10));
    }

    #[test]
    fn test_run_plan_requires_tenants() {
        assert!(LoadConfig::default().run_plan().is_err());
    }
}
