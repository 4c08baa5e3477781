//! Broker variant of tenantload
//!
//! [`BatchRelay`] drains a broker subscription into a document store with
//! unordered bulk inserts; [`EventProducer`] feeds the broker with synthetic
//! tenant documents. [`MemoryBroker`] wires both together in one process,
//! and the `kafka` feature adds an rdkafka-backed broker.

#[cfg(feature = "kafka")]
pub mod kafka;
pub mod memory;
pub mod producer;
pub mod relay;

// Re-export commonly used types
#[cfg(feature = "kafka")]
pub use kafka::{KafkaConsumer, KafkaProducer};
pub use memory::{MemoryBroker, MemoryConsumer};
pub use producer::{EventProducer, ProducerReport, EVENT_PAYLOAD_LEN};
pub use relay::{BatchRelay, RelayReport, RelaySettings, DEFAULT_INSERT_TIMEOUT};
