//! Broker to document-store batch relay
//!
//! Messages are decoded as JSON objects and buffered per destination
//! collection. The buffer is written with one unordered bulk insert per
//! collection when it reaches the batch size, when the flush interval has
//! passed since the previous flush, and once more on shutdown.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tenantload_config::RelayConfig;
use tenantload_interfaces::{
    with_deadline, BrokerError, BrokerMessage, Document, DocumentStore, MessageConsumer,
};

/// Deadline for one bulk insert
pub const DEFAULT_INSERT_TIMEOUT: Duration = Duration::from_secs(10);

/// Relay tunables
#[derive(Debug, Clone, PartialEq)]
pub struct RelaySettings {
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub read_error_backoff: Duration,
    pub insert_timeout: Duration,
    /// `None` writes each topic to a collection of the same name
    pub target_collection: Option<String>,
}

impl RelaySettings {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            flush_interval: config.flush_interval,
            read_error_backoff: config.read_error_backoff,
            insert_timeout: DEFAULT_INSERT_TIMEOUT,
            target_collection: config.target_collection.clone(),
        }
    }

    pub fn with_insert_timeout(mut self, timeout: Duration) -> Self {
        self.insert_timeout = timeout;
        self
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self::from_config(&RelayConfig::default())
    }
}

/// Counters of a relay run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayReport {
    pub received: u64,
    pub malformed: u64,
    pub read_errors: u64,
    pub batches_flushed: u64,
    pub documents_inserted: u64,
    pub batches_failed: u64,
    pub documents_dropped: u64,
}

/// Consume, buffer and bulk-insert broker messages
pub struct BatchRelay<C> {
    consumer: C,
    store: Arc<dyn DocumentStore>,
    settings: RelaySettings,
    buffer: BTreeMap<String, Vec<Document>>,
    buffered: usize,
    last_flush: Instant,
    report: RelayReport,
}

impl<C: MessageConsumer> BatchRelay<C> {
    pub fn new(consumer: C, store: Arc<dyn DocumentStore>, settings: RelaySettings) -> Self {
        let capacity = settings.batch_size;
        let mut buffer = BTreeMap::new();
        if let Some(target) = &settings.target_collection {
            buffer.insert(target.clone(), Vec::with_capacity(capacity));
        }
        Self {
            consumer,
            store,
            settings,
            buffer,
            buffered: 0,
            last_flush: Instant::now(),
            report: RelayReport::default(),
        }
    }

    /// Documents waiting for the next flush
    pub fn buffered(&self) -> usize {
        self.buffered
    }

    pub fn report(&self) -> RelayReport {
        self.report
    }

    /// Relay until cancelled or until the broker closes, flushing what is left
    pub async fn run(mut self, cancel: CancellationToken) -> RelayReport {
        info!(
            batch_size = self.settings.batch_size,
            flush_interval = ?self.settings.flush_interval,
            target = self.settings.target_collection.as_deref().unwrap_or("<topic>"),
            "Relay started"
        );
        self.last_flush = Instant::now();

        loop {
            let deadline = self.last_flush + self.settings.flush_interval;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = sleep_until(deadline) => self.flush().await,
                received = self.consumer.recv() => match received {
                    Ok(message) => {
                        self.accept(message);
                        if self.buffered >= self.settings.batch_size {
                            self.flush().await;
                        }
                    }
                    Err(BrokerError::Closed) => {
                        info!("Broker closed the subscription");
                        break;
                    }
                    Err(e) => {
                        self.report.read_errors += 1;
                        warn!(error = %e, "Broker read failed");
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = sleep(self.settings.read_error_backoff) => {}
                        }
                    }
                },
            }
        }

        self.flush().await;
        info!(
            received = self.report.received,
            inserted = self.report.documents_inserted,
            dropped = self.report.documents_dropped,
            "Relay stopped"
        );
        self.report
    }

    /// Decode one message into the buffer; malformed payloads are skipped
    pub fn accept(&mut self, message: BrokerMessage) {
        self.report.received += 1;
        let doc = match serde_json::from_slice::<Document>(&message.payload) {
            Ok(doc) if doc.is_object() => doc,
            Ok(_) => {
                self.report.malformed += 1;
                debug!(topic = %message.topic, "Skipping non-object payload");
                return;
            }
            Err(e) => {
                self.report.malformed += 1;
                debug!(topic = %message.topic, error = %e, "Skipping undecodable payload");
                return;
            }
        };

        let collection = match &self.settings.target_collection {
            Some(target) => target.clone(),
            None => message.topic,
        };
        self.buffer.entry(collection).or_default().push(doc);
        self.buffered += 1;
    }

    /// Write everything buffered. A failed insert drops its batch.
    pub async fn flush(&mut self) {
        self.last_flush = Instant::now();
        if self.buffered == 0 {
            return;
        }
        self.buffered = 0;

        for (collection, docs) in self.buffer.iter_mut() {
            if docs.is_empty() {
                continue;
            }
            let batch = std::mem::take(docs);
            let count = batch.len();
            let handle = self.store.collection(collection);

            match with_deadline(self.settings.insert_timeout, handle.insert_many(batch, false))
                .await
            {
                Ok(written) => {
                    self.report.batches_flushed += 1;
                    self.report.documents_inserted += written as u64;
                    info!(collection = %collection, count = written, "Inserted batch");
                }
                Err(e) => {
                    self.report.batches_failed += 1;
                    self.report.documents_dropped += count as u64;
                    warn!(collection = %collection, count, error = %e, "Bulk insert failed, batch dropped");
                }
            }
        }
    }
}
