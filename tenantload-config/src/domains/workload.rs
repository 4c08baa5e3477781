//! Workload tuning: retry budget, deadlines and pacing jitter

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigResult;
use crate::validation::{validate_fraction, validate_non_zero, validate_positive, Validatable};

/// Workload tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Attempts for the top-products aggregation
    pub aggregation_attempts: u32,

    /// Deadline per aggregation attempt
    #[serde(with = "humantime_serde")]
    pub aggregation_timeout: Duration,

    /// Cursor batch size for the aggregation
    pub aggregation_batch_size: u32,

    /// Number of products kept by the aggregation
    pub top_products: u32,

    /// Linear backoff step between aggregation attempts
    #[serde(with = "humantime_serde")]
    pub retry_backoff_step: Duration,

    /// Deadline for every write and for the customer/inventory scans
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,

    /// Deadline for the startup seed-data check
    #[serde(with = "humantime_serde")]
    pub seed_check_timeout: Duration,

    /// Hard limit for draining workers after cancellation
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,

    /// Pacing jitter fraction
    pub jitter: f64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            aggregation_attempts: 3,
            aggregation_timeout: Duration::from_secs(60),
            aggregation_batch_size: 50,
            top_products: 5,
            retry_backoff_step: Duration::from_millis(500),
            write_timeout: Duration::from_secs(10),
            seed_check_timeout: Duration::from_secs(8),
            shutdown_timeout: Duration::from_secs(20),
            jitter: 0.25,
        }
    }
}

impl Validatable for WorkloadConfig {
    fn validate(&self) -> ConfigResult<()> {
        let domain = self.domain_name();
        validate_positive(self.aggregation_attempts, "aggregation_attempts", domain)?;
        validate_positive(self.aggregation_batch_size, "aggregation_batch_size", domain)?;
        validate_positive(self.top_products, "top_products", domain)?;
        validate_non_zero(self.aggregation_timeout, "aggregation_timeout", domain)?;
        validate_non_zero(self.write_timeout, "write_timeout", domain)?;
        validate_non_zero(self.seed_check_timeout, "seed_check_timeout", domain)?;
        validate_non_zero(self.shutdown_timeout, "shutdown_timeout", domain)?;
        validate_fraction(self.jitter, "jitter", domain)?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "workload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkloadConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.aggregation_attempts, 3);
        assert_eq!(config.aggregation_timeout, Duration::from_secs(60));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_invalid_values() {
        let mut config = WorkloadConfig {
            aggregation_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.aggregation_attempts = 3;
        config.jitter = 1.5;
        assert!(config.validate().is_err());

        config.jitter = 0.25;
        config.write_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_humantime_fields() {
        let config: WorkloadConfig =
            serde_yaml::from_str("aggregation_timeout: 30s\nretry_backoff_step: 250ms\n").unwrap();
        assert_eq!(config.aggregation_timeout, Duration::from_secs(30));
        assert_eq!(config.retry_backoff_step, Duration::from_millis(250));
        assert_eq!(config.aggregation_attempts, 3);
    }
}
