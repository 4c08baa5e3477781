//! In-process broker on tokio channels

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use tenantload_interfaces::{BrokerError, BrokerMessage, MessageConsumer, MessageProducer};

#[derive(Default)]
struct BrokerInner {
    subscribers: Mutex<HashMap<String, Vec<mpsc::UnboundedSender<BrokerMessage>>>>,
    published: Mutex<HashMap<String, u64>>,
}

/// Topic fan-out broker living in one process.
///
/// Every subscriber of a topic receives every message published to it after
/// it subscribed. Messages published to a topic nobody listens on are counted
/// and dropped.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<BrokerInner>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumer receiving everything published to `topics` from now on
    pub fn subscribe(&self, topics: &[&str]) -> MemoryConsumer {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscribers = self.inner.subscribers.lock();
        for topic in topics {
            subscribers
                .entry(topic.to_string())
                .or_default()
                .push(tx.clone());
        }
        MemoryConsumer { rx }
    }

    /// Deliver a message to the current subscribers of its topic
    pub fn publish(&self, message: BrokerMessage) {
        *self
            .inner
            .published
            .lock()
            .entry(message.topic.clone())
            .or_default() += 1;

        let mut subscribers = self.inner.subscribers.lock();
        if let Some(senders) = subscribers.get_mut(&message.topic) {
            senders.retain(|tx| tx.send(message.clone()).is_ok());
        }
    }

    /// Messages published to `topic` so far
    pub fn published(&self, topic: &str) -> u64 {
        self.inner
            .published
            .lock()
            .get(topic)
            .copied()
            .unwrap_or(0)
    }

    /// Drop every subscription; consumers see [`BrokerError::Closed`] once drained
    pub fn close(&self) {
        self.inner.subscribers.lock().clear();
    }
}

#[async_trait]
impl MessageProducer for MemoryBroker {
    async fn send(
        &self,
        topic: &str,
        key: &str,
        payload: Vec<u8>,
        _timeout: Duration,
    ) -> Result<(), BrokerError> {
        self.publish(BrokerMessage::new(topic, Some(key.to_string()), payload));
        Ok(())
    }
}

/// Receiving end of a [`MemoryBroker`] subscription
pub struct MemoryConsumer {
    rx: mpsc::UnboundedReceiver<BrokerMessage>,
}

#[async_trait]
impl MessageConsumer for MemoryConsumer {
    async fn recv(&mut self) -> Result<BrokerMessage, BrokerError> {
        self.rx.recv().await.ok_or(BrokerError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fan_out_to_subscribers() {
        let broker = MemoryBroker::new();
        let mut orders = broker.subscribe(&["orders"]);
        let mut all = broker.subscribe(&["orders", "payments"]);

        broker
            .send("orders", "T1", b"{}".to_vec(), Duration::from_secs(5))
            .await
            .unwrap();
        broker
            .send("payments", "T1", b"[]".to_vec(), Duration::from_secs(5))
            .await
            .unwrap();

        let msg = orders.recv().await.unwrap();
        assert_eq!(msg.topic, "orders");
        assert_eq!(msg.key.as_deref(), Some("T1"));
        assert_eq!(all.recv().await.unwrap().topic, "orders");
        assert_eq!(all.recv().await.unwrap().topic, "payments");
        assert_eq!(broker.published("orders"), 1);
        assert_eq!(broker.published("shipments"), 0);
    }

    #[tokio::test]
    async fn test_close_ends_consumers() {
        let broker = MemoryBroker::new();
        let mut consumer = broker.subscribe(&["events"]);
        broker.publish(BrokerMessage::new("events", None, b"{}".to_vec()));
        broker.close();

        assert!(consumer.recv().await.is_ok());
        assert_eq!(consumer.recv().await.unwrap_err(), BrokerError::Closed);
    }
}
