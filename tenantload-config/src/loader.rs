//! Configuration loading and environment variable handling

use log::debug;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::domains::tenants::{PacingSpec, MAX_INTERVAL, MIN_INTERVAL};
use crate::domains::utils::{parse_duration, parse_list, parse_map, parse_positive};
use crate::domains::LoadConfig;
use crate::error::{ConfigError, ConfigResult};

/// Configuration loader with environment variable support.
///
/// Without a prefix the loader reads the bare variable names (`TENANTS`,
/// `USERS_MAP`, `MONGO_URI`, ...). With a prefix `P` it reads `P_TENANTS` etc.
/// Empty variables count as unset.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: Option<String>,
}

impl ConfigLoader {
    /// Create a loader reading unprefixed variables
    pub fn new() -> Self {
        Self { prefix: None }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<LoadConfig> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());

        let content = std::fs::read_to_string(path)?;
        let mut config: LoadConfig = serde_yaml::from_str(&content)?;

        // Apply environment variable overrides
        self.apply_env_overrides(&mut config)?;

        // Validate all domains
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<LoadConfig> {
        let mut config = LoadConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<LoadConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut LoadConfig) -> ConfigResult<()> {
        self.apply_tenant_overrides(&mut config.tenants)?;
        self.apply_backend_overrides(&mut config.backend)?;
        self.apply_workload_overrides(&mut config.workload)?;
        self.apply_relay_overrides(&mut config.relay)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    /// Apply tenant population and pacing overrides
    fn apply_tenant_overrides(
        &self,
        config: &mut crate::domains::tenants::TenantsConfig,
    ) -> ConfigResult<()> {
        if let Some(tenants) = self.get_env_var("TENANTS") {
            config.tenants = parse_list(&tenants);
        }

        if let Some(users) = self.get_env_var("USERS") {
            config.users = parse_positive(&users, &self.var_name("USERS"))?;
        }

        if let Some(users_map) = self.get_env_var("USERS_MAP") {
            let source = self.var_name("USERS_MAP");
            config.users_map = parse_map(&users_map, &source)?
                .into_iter()
                .map(|(tenant, users)| -> ConfigResult<(String, usize)> {
                    let users = parse_positive(&users, &format!("{}[{}]", source, tenant))?;
                    Ok((tenant, users))
                })
                .collect::<ConfigResult<_>>()?;
        }

        if let Some(rate) = self.get_env_var("RATE") {
            config.rate = PacingSpec::from_str(&rate).map_err(|e| {
                ConfigError::EnvError(format!("Invalid {}: {}", self.var_name("RATE"), e))
            })?;
        }

        if let Some(rate_map) = self.get_env_var("RATE_MAP") {
            let source = self.var_name("RATE_MAP");
            config.rate_map = parse_map(&rate_map, &source)?
                .into_iter()
                .map(|(tenant, rate)| -> ConfigResult<(String, PacingSpec)> {
                    let spec = PacingSpec::from_str(&rate).map_err(|e| {
                        ConfigError::EnvError(format!("Invalid {}[{}]: {}", source, tenant, e))
                    })?;
                    Ok((tenant, spec))
                })
                .collect::<ConfigResult<_>>()?;
        }

        if let Some(interval) = self.get_env_var("INGEST_INTERVAL") {
            let name = self.var_name("INGEST_INTERVAL");
            let interval = parse_duration(&interval, &name)?;
            if !(MIN_INTERVAL..=MAX_INTERVAL).contains(&interval) {
                return Err(ConfigError::EnvError(format!(
                    "{} must be between 1s and 50s",
                    name
                )));
            }
            config.ingest_interval = Some(interval);
        }

        Ok(())
    }

    /// Apply document backend overrides
    fn apply_backend_overrides(
        &self,
        config: &mut crate::domains::backend::BackendConfig,
    ) -> ConfigResult<()> {
        if let Some(uri) = self.get_env_var("MONGO_URI") {
            config.uri = uri;
        }

        if let Some(database) = self.get_env_var("MONGO_DATABASE") {
            config.database = database;
        }

        if let Some(pool) = self.get_env_var("MAX_POOL_SIZE") {
            config.max_pool_size = self.parse_var("MAX_POOL_SIZE", &pool)?;
        }

        if let Some(timeout) = self.get_env_var("CONNECT_TIMEOUT") {
            config.connect_timeout = self.duration_var("CONNECT_TIMEOUT", &timeout)?;
        }

        Ok(())
    }

    /// Apply workload tuning overrides
    fn apply_workload_overrides(
        &self,
        config: &mut crate::domains::workload::WorkloadConfig,
    ) -> ConfigResult<()> {
        if let Some(timeout) = self.get_env_var("SHUTDOWN_TIMEOUT") {
            config.shutdown_timeout = self.duration_var("SHUTDOWN_TIMEOUT", &timeout)?;
        }

        if let Some(attempts) = self.get_env_var("AGGREGATION_ATTEMPTS") {
            config.aggregation_attempts = self.parse_var("AGGREGATION_ATTEMPTS", &attempts)?;
        }

        if let Some(timeout) = self.get_env_var("AGGREGATION_TIMEOUT") {
            config.aggregation_timeout = self.duration_var("AGGREGATION_TIMEOUT", &timeout)?;
        }

        if let Some(timeout) = self.get_env_var("WRITE_TIMEOUT") {
            config.write_timeout = self.duration_var("WRITE_TIMEOUT", &timeout)?;
        }

        Ok(())
    }

    /// Apply broker relay and producer overrides
    fn apply_relay_overrides(
        &self,
        config: &mut crate::domains::relay::RelayConfig,
    ) -> ConfigResult<()> {
        if let Some(brokers) = self.get_env_var("KAFKA_BROKERS") {
            config.brokers = parse_list(&brokers);
        }

        if let Some(topic) = self.get_env_var("KAFKA_TOPIC") {
            config.topic = topic;
        }

        if let Some(group) = self.get_env_var("KAFKA_GROUP_ID") {
            config.group_id = Some(group);
        }

        if let Some(batch) = self.get_env_var("BATCH_SIZE") {
            config.batch_size = parse_positive(&batch, &self.var_name("BATCH_SIZE"))?;
        }

        if let Some(interval) = self.get_env_var("FLUSH_INTERVAL") {
            config.flush_interval = self.duration_var("FLUSH_INTERVAL", &interval)?;
        }

        if let Some(collection) = self.get_env_var("TARGET_COLLECTION") {
            config.target_collection = Some(collection);
        }

        if let Some(database) = self.get_env_var("RELAY_DATABASE") {
            config.database = database;
        }

        if let Some(interval) = self.get_env_var("PRODUCE_INTERVAL") {
            config.produce_interval = self.duration_var("PRODUCE_INTERVAL", &interval)?;
        }

        if let Some(topics) = self.get_env_var("PRODUCER_TOPICS") {
            config.producer_topics = parse_list(&topics);
        }

        Ok(())
    }

    /// Apply logging config overrides
    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Some(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Some(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    fn parse_var<T>(&self, name: &str, value: &str) -> ConfigResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        value.trim().parse().map_err(|e| {
            ConfigError::EnvError(format!("Invalid {}: {}", self.var_name(name), e))
        })
    }

    fn duration_var(&self, name: &str, value: &str) -> ConfigResult<Duration> {
        parse_duration(value, &self.var_name(name))
    }

    /// Full variable name including the prefix
    fn var_name(&self, name: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, name),
            None => name.to_string(),
        }
    }

    /// Get a non-empty environment variable
    fn get_env_var(&self, name: &str) -> Option<String> {
        std::env::var(self.var_name(name))
            .ok()
            .filter(|value| !value.trim().is_empty())
    }
}
