//! Runtime components for tenantload
//!
//! This crate drives the load itself: the per-tenant workload operations, the
//! simulated users that call them on a jittered cadence, the pools that fan
//! those users out per tenant, and the orchestrator that checks the backend,
//! starts every pool and coordinates shutdown.

pub mod orchestrator;
pub mod pool;
pub mod simulator;
pub mod stats;
pub mod workload;

// Re-export commonly used types
pub use orchestrator::{LoadOrchestrator, RunSummary, TenantSummary};
pub use pool::{PoolReport, TenantWorkerPool};
pub use simulator::{SimulatorReport, SimulatorState, UserSimulator, WorkloadMode};
pub use stats::{StatsSnapshot, TenantStats};
pub use workload::{aggregation_pipeline, TenantCollections, TenantWorkload, WorkloadSettings};
