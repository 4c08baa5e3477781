//! Document store backends for tenantload
//!
//! [`MemoryStore`] keeps collections in process memory and understands the
//! filters and aggregation stages the workload issues; it also carries a
//! [`FaultInjector`] for failure scenarios. The MongoDB store is compiled with
//! the `mongodb` feature. [`connect`] picks a backend from the URI scheme.

pub mod connect;
pub mod error;
pub mod faults;
pub mod memory;
pub mod query;
pub mod seed;

#[cfg(feature = "mongodb")]
pub mod mongo;

// Re-export core types for convenience
pub use connect::{connect, connect_database};
pub use error::{StorageError, StorageResult};
pub use faults::{Fault, FaultInjector, FaultRule, Operation};
pub use memory::{MemoryCollection, MemoryStore};
pub use seed::{check_seed_data, seed_tenant, SeedPlan, SeedReport, SeedStatus};

#[cfg(feature = "mongodb")]
pub use mongo::{MongoCollection, MongoStore};
