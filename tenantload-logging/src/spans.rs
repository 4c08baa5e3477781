//! Spans carrying the tenant/user context of a log line

use tracing::{info_span, Span};

/// Span for a tenant worker pool
pub fn tenant_span(tenant: &str) -> Span {
    info_span!("tenant", tenant = %tenant)
}

/// Span for one simulated user of a tenant
pub fn user_span(tenant: &str, user: usize) -> Span {
    info_span!("user", tenant = %tenant, user = user)
}

/// Span for the broker relay of a topic
pub fn relay_span(topic: &str) -> Span {
    info_span!("relay", topic = %topic)
}
