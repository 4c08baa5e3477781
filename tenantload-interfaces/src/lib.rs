//! # tenantload interfaces
//!
//! Contracts for the collaborators the load engine drives but does not own.
//!
//! ## Main Interfaces
//!
//! - [`DocumentStore`] / [`DocumentCollection`] - the document backend
//! - [`MessageProducer`] / [`MessageConsumer`] - the message broker
//! - [`BackendError`] - failures classified as transient or permanent

pub mod broker;
pub mod database;

// Re-export commonly used types
pub use broker::{BrokerError, BrokerMessage, MessageConsumer, MessageProducer};
pub use database::{
    retry_failure, with_deadline, BackendError, Document, DocumentCollection, DocumentStore,
};
