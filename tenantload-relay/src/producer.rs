//! Synthetic event producer
//!
//! Every tick picks the next tenant round-robin and publishes one document
//! per configured topic, keyed by tenant. Payments and shipments reference
//! the order produced in the same round.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tenantload_config::RelayConfig;
use tenantload_core::{fixtures, TenantId};
use tenantload_interfaces::MessageProducer;

/// Characters in the payload of a generic event
pub const EVENT_PAYLOAD_LEN: usize = 128;

/// Counters of a producer run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerReport {
    pub rounds: u64,
    pub sent: u64,
    pub failed: u64,
}

pub struct EventProducer {
    tenants: Vec<TenantId>,
    topics: Vec<String>,
    producer: Arc<dyn MessageProducer>,
    interval: Duration,
    send_timeout: Duration,
    seq: u64,
    report: ProducerReport,
}

impl EventProducer {
    pub fn new(
        tenants: Vec<TenantId>,
        topics: Vec<String>,
        producer: Arc<dyn MessageProducer>,
        interval: Duration,
        send_timeout: Duration,
    ) -> Self {
        Self {
            tenants,
            topics,
            producer,
            interval,
            send_timeout,
            seq: 0,
            report: ProducerReport::default(),
        }
    }

    pub fn from_config(
        tenants: Vec<TenantId>,
        config: &RelayConfig,
        producer: Arc<dyn MessageProducer>,
    ) -> Self {
        Self::new(
            tenants,
            config.producer_topics.clone(),
            producer,
            config.produce_interval,
            config.produce_timeout,
        )
    }

    pub fn report(&self) -> ProducerReport {
        self.report
    }

    fn encode_round(&self, tenant: &TenantId, seq: u64) -> Vec<(String, Vec<u8>)> {
        let mut rng = rand::thread_rng();
        let order = fixtures::synthetic_order(&mut rng, tenant, seq);
        let index = seq as usize;

        let mut encoded = Vec::with_capacity(self.topics.len());
        for topic in &self.topics {
            let payload = match topic.as_str() {
                "customers" => serde_json::to_vec(&fixtures::customer(tenant, index)),
                "inventory" => serde_json::to_vec(&fixtures::inventory_item(tenant, index)),
                "orders" => serde_json::to_vec(&order),
                "payments" => serde_json::to_vec(&fixtures::synthetic_payment(&order)),
                "shipments" => serde_json::to_vec(&fixtures::synthetic_shipment(&order)),
                _ => serde_json::to_vec(&fixtures::event(&mut rng, tenant, EVENT_PAYLOAD_LEN)),
            };
            match payload {
                Ok(payload) => encoded.push((topic.clone(), payload)),
                Err(e) => warn!(topic = %topic, error = %e, "Encoding failed"),
            }
        }
        encoded
    }

    /// Publish one document per topic for the next tenant; returns messages sent
    pub async fn produce_round(&mut self) -> usize {
        let Some(index) = (self.seq as usize).checked_rem(self.tenants.len()) else {
            return 0;
        };
        let tenant = self.tenants[index].clone();
        self.seq += 1;

        let mut sent = 0;
        for (topic, payload) in self.encode_round(&tenant, self.seq) {
            match self
                .producer
                .send(&topic, tenant.as_str(), payload, self.send_timeout)
                .await
            {
                Ok(()) => sent += 1,
                Err(e) => {
                    self.report.failed += 1;
                    warn!(topic = %topic, tenant = %tenant, error = %e, "Broker write failed");
                }
            }
        }

        self.report.rounds += 1;
        self.report.sent += sent as u64;
        info!(tenant = %tenant, total = self.report.sent, "Produced messages");
        sent
    }

    /// Produce on every tick until cancelled
    pub async fn run(mut self, cancel: CancellationToken) -> ProducerReport {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            tenants = self.tenants.len(),
            topics = ?self.topics,
            interval = ?self.interval,
            "Producer started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.produce_round().await;
                }
            }
        }

        info!(rounds = self.report.rounds, sent = self.report.sent, "Producer stopped");
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBroker;
    use async_trait::async_trait;
    use tenantload_interfaces::{BrokerError, MessageConsumer};

    const TOPICS: [&str; 5] = ["customers", "inventory", "orders", "payments", "shipments"];

    fn producer(broker: &MemoryBroker, tenants: &[&str]) -> EventProducer {
        EventProducer::new(
            tenants.iter().map(|t| TenantId::from(*t)).collect(),
            TOPICS.iter().map(|t| t.to_string()).collect(),
            Arc::new(broker.clone()),
            Duration::from_secs(1),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_round_robin_over_tenants() {
        let broker = MemoryBroker::new();
        let mut orders = broker.subscribe(&["orders"]);
        let mut producer = producer(&broker, &["T1", "T2"]);

        assert_eq!(producer.produce_round().await, 5);
        assert_eq!(producer.produce_round().await, 5);
        assert_eq!(producer.produce_round().await, 5);

        let keys: Vec<Option<String>> = vec![
            orders.recv().await.unwrap().key,
            orders.recv().await.unwrap().key,
            orders.recv().await.unwrap().key,
        ];
        assert_eq!(
            keys,
            vec![Some("T1".to_string()), Some("T2".to_string()), Some("T1".to_string())]
        );
        for topic in TOPICS {
            assert_eq!(broker.published(topic), 3);
        }
    }

    #[tokio::test]
    async fn test_payment_and_shipment_reference_the_order() {
        let broker = MemoryBroker::new();
        let mut consumer = broker.subscribe(&["orders", "payments", "shipments"]);
        let mut producer = producer(&broker, &["T1"]);
        producer.produce_round().await;

        let decode = |payload: Vec<u8>| -> serde_json::Value {
            serde_json::from_slice(&payload).unwrap()
        };
        let order = decode(consumer.recv().await.unwrap().payload);
        let payment = decode(consumer.recv().await.unwrap().payload);
        let shipment = decode(consumer.recv().await.unwrap().payload);

        assert_eq!(order["tenantId"], "T1");
        assert_eq!(payment["orderId"], order["orderId"]);
        assert_eq!(payment["amount"], order["totalAmount"]);
        assert_eq!(shipment["orderId"], order["orderId"]);
    }

    struct FailingProducer;

    #[async_trait]
    impl MessageProducer for FailingProducer {
        async fn send(
            &self,
            _topic: &str,
            _key: &str,
            _payload: Vec<u8>,
            timeout: Duration,
        ) -> Result<(), BrokerError> {
            Err(BrokerError::Timeout { timeout })
        }
    }

    #[tokio::test]
    async fn test_failed_writes_are_counted_and_skipped() {
        let mut producer = EventProducer::new(
            vec![TenantId::from("T1")],
            vec!["orders".to_string(), "audit".to_string()],
            Arc::new(FailingProducer),
            Duration::from_secs(1),
            Duration::from_secs(5),
        );

        assert_eq!(producer.produce_round().await, 0);
        let report = producer.report();
        assert_eq!(report.rounds, 1);
        assert_eq!(report.failed, 2);
    }

    #[tokio::test]
    async fn test_no_tenants_produces_nothing() {
        let broker = MemoryBroker::new();
        let mut producer = producer(&broker, &[]);
        assert_eq!(producer.produce_round().await, 0);
        assert_eq!(producer.report().rounds, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_until_cancelled() {
        let broker = MemoryBroker::new();
        let producer = producer(&broker, &["T1", "T2"]);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(producer.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(3500)).await;
        cancel.cancel();

        let report = handle.await.unwrap();
        assert_eq!(report.rounds, 3);
        assert_eq!(report.sent, 15);
        assert_eq!(broker.published("shipments"), 3);
    }
}
