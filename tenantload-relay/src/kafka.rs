//! Kafka broker built on rdkafka

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::Message;
use std::time::Duration;
use tracing::info;

use tenantload_config::RelayConfig;
use tenantload_interfaces::{BrokerError, BrokerMessage, MessageConsumer, MessageProducer};

fn transport(err: KafkaError) -> BrokerError {
    BrokerError::transport(err.to_string())
}

fn bootstrap(brokers: &[String]) -> String {
    brokers
        .iter()
        .map(|b| b.trim())
        .filter(|b| !b.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Keyed producer with single-ack delivery
pub struct KafkaProducer {
    producer: FutureProducer,
}

impl KafkaProducer {
    pub fn new(config: &RelayConfig) -> Result<Self, BrokerError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap(&config.brokers))
            .set("acks", "1")
            .set("linger.ms", "10")
            .set(
                "message.timeout.ms",
                config.produce_timeout.as_millis().to_string(),
            )
            .create()
            .map_err(transport)?;
        info!(brokers = ?config.brokers, "Kafka producer created");
        Ok(Self { producer })
    }
}

#[async_trait]
impl MessageProducer for KafkaProducer {
    async fn send(
        &self,
        topic: &str,
        key: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<(), BrokerError> {
        let record = FutureRecord::to(topic).key(key).payload(&payload);
        match tokio::time::timeout(timeout, self.producer.send(record, timeout)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err((err, _))) => Err(transport(err)),
            Err(_) => Err(BrokerError::Timeout { timeout }),
        }
    }
}

/// Group consumer subscribed to the relay topic
pub struct KafkaConsumer {
    consumer: StreamConsumer,
}

impl KafkaConsumer {
    pub fn new(config: &RelayConfig) -> Result<Self, BrokerError> {
        let group = config.group_id();
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap(&config.brokers))
            .set("group.id", &group)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "earliest")
            .set("fetch.min.bytes", "1000000")
            .create()
            .map_err(transport)?;
        consumer
            .subscribe(&[config.topic.as_str()])
            .map_err(transport)?;
        info!(topic = %config.topic, group = %group, "Kafka consumer subscribed");
        Ok(Self { consumer })
    }
}

#[async_trait]
impl MessageConsumer for KafkaConsumer {
    async fn recv(&mut self) -> Result<BrokerMessage, BrokerError> {
        let message = self.consumer.recv().await.map_err(transport)?;
        Ok(BrokerMessage::new(
            message.topic(),
            message
                .key()
                .map(|k| String::from_utf8_lossy(k).into_owned()),
            message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        ))
    }
}
