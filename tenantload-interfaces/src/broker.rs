//! Message broker interfaces

use async_trait::async_trait;
use std::time::Duration;

/// A message read from the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    pub topic: String,
    pub key: Option<String>,
    pub payload: Vec<u8>,
}

impl BrokerMessage {
    pub fn new(topic: impl Into<String>, key: Option<String>, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            key,
            payload,
        }
    }
}

/// Broker error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BrokerError {
    #[error("Broker write timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Broker transport error: {message}")]
    Transport { message: String },

    /// The broker will not deliver any more messages
    #[error("Broker connection closed")]
    Closed,
}

impl BrokerError {
    pub fn transport(message: impl Into<String>) -> Self {
        BrokerError::Transport {
            message: message.into(),
        }
    }
}

/// Publishes payloads to topics
#[async_trait]
pub trait MessageProducer: Send + Sync {
    /// Write one message, giving up after `timeout`
    async fn send(
        &self,
        topic: &str,
        key: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<(), BrokerError>;
}

/// Reads messages from a subscribed topic.
///
/// `recv` must be cancel safe: dropping its future before completion must not
/// lose a message, because the relay races it against its flush timer.
#[async_trait]
pub trait MessageConsumer: Send {
    async fn recv(&mut self) -> Result<BrokerMessage, BrokerError>;
}
