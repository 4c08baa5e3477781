//! Broker relay and producer configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigResult;
use crate::validation::{
    validate_non_zero, validate_positive, validate_required_string, Validatable,
};

/// Broker relay and producer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Bootstrap brokers
    pub brokers: Vec<String>,

    /// Topic the relay consumes
    pub topic: String,

    /// Consumer group; defaults to `bulk-consumer-{topic}`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,

    /// Documents per bulk insert
    pub batch_size: usize,

    /// Flush when this long has passed since the previous flush
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,

    /// Destination collection; when unset each topic goes to a collection of its own name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_collection: Option<String>,

    /// Destination database
    pub database: String,

    /// Pause after a broker read error
    #[serde(with = "humantime_serde")]
    pub read_error_backoff: Duration,

    /// Producer tick
    #[serde(with = "humantime_serde")]
    pub produce_interval: Duration,

    /// Deadline per producer write
    #[serde(with = "humantime_serde")]
    pub produce_timeout: Duration,

    /// Topics the producer publishes to
    pub producer_topics: Vec<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:9092".to_string()],
            topic: "events".to_string(),
            group_id: None,
            batch_size: 1000,
            flush_interval: Duration::from_secs(2),
            target_collection: Some("events".to_string()),
            database: "benchdb".to_string(),
            read_error_backoff: Duration::from_millis(500),
            produce_interval: Duration::from_secs(1),
            produce_timeout: Duration::from_secs(5),
            producer_topics: ["customers", "inventory", "orders", "payments", "shipments"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

impl RelayConfig {
    /// Effective consumer group
    pub fn group_id(&self) -> String {
        self.group_id
            .clone()
            .unwrap_or_else(|| format!("bulk-consumer-{}", self.topic))
    }

    /// Collection a message from `topic` is written to
    pub fn collection_for<'a>(&'a self, topic: &'a str) -> &'a str {
        self.target_collection.as_deref().unwrap_or(topic)
    }
}

impl Validatable for RelayConfig {
    fn validate(&self) -> ConfigResult<()> {
        let domain = self.domain_name();
        if self.brokers.iter().all(|b| b.trim().is_empty()) {
            return Err(self.validation_error("at least one broker is required"));
        }
        validate_required_string(&self.topic, "topic", domain)?;
        validate_required_string(&self.database, "database", domain)?;
        validate_positive(self.batch_size, "batch_size", domain)?;
        validate_non_zero(self.flush_interval, "flush_interval", domain)?;
        validate_non_zero(self.produce_interval, "produce_interval", domain)?;
        validate_non_zero(self.produce_timeout, "produce_timeout", domain)?;
        if let Some(collection) = &self.target_collection {
            validate_required_string(collection, "target_collection", domain)?;
        }
        if self.producer_topics.is_empty() {
            return Err(self.validation_error("producer_topics cannot be empty"));
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "relay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.group_id(), "bulk-consumer-events");
        assert_eq!(config.collection_for("orders"), "events");
        assert_eq!(config.producer_topics.len(), 5);
    }

    #[test]
    fn test_per_topic_collections() {
        let config = RelayConfig {
            target_collection: None,
            group_id: Some("burst".to_string()),
            ..Default::default()
        };
        assert_eq!(config.collection_for("orders"), "orders");
        assert_eq!(config.group_id(), "burst");
    }

    #[test]
    fn test_invalid_relay() {
        let config = RelayConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RelayConfig {
            brokers: vec![" ".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
