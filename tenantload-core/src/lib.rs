//! Core domain models and types for tenantload
//!
//! This crate contains the tenant, document and run-configuration types shared
//! by every other crate, the synthetic fixture generators, and the error
//! taxonomy used from startup through steady-state load generation.

pub mod documents;
pub mod error;
pub mod fixtures;
pub mod ids;
pub mod types;

// Re-export commonly used types at the crate root
pub use documents::{
    CustomerDoc, EventDoc, InventoryDoc, OrderDoc, OrderItem, OrderStatus, PaymentDoc, ShipmentDoc,
};
pub use error::{LoadError, Result};
pub use ids::OrderIdGenerator;
pub use types::{CollectionKind, RunConfig, TenantId};
