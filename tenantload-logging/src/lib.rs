//! Logging setup for tenantload
//!
//! Library crates log through `tracing` (and `log`, bridged by the subscriber).
//! Binaries call [`init_logging_from_config`] once at startup.

pub mod init;
pub mod spans;

pub use init::{build_env_filter, init_logging_from_config, init_simple_tracing};
pub use spans::{relay_span, tenant_span, user_span};
