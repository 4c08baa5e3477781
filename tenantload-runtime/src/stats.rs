//! Per-tenant workload counters

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters shared by every simulator of one tenant
#[derive(Debug, Default)]
pub struct TenantStats {
    cycles: AtomicU64,
    order_attempts: AtomicU64,
    orders_created: AtomicU64,
    precondition_misses: AtomicU64,
    order_failures: AtomicU64,
    shipments_created: AtomicU64,
    shipment_failures: AtomicU64,
    payments_created: AtomicU64,
    payment_failures: AtomicU64,
    aggregations_ok: AtomicU64,
    aggregation_failures: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl TenantStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle(&self) {
        bump(&self.cycles);
    }

    pub fn record_order_attempt(&self) {
        bump(&self.order_attempts);
    }

    pub fn record_order_created(&self) {
        bump(&self.orders_created);
    }

    pub fn record_precondition_miss(&self) {
        bump(&self.precondition_misses);
    }

    pub fn record_order_failure(&self) {
        bump(&self.order_failures);
    }

    pub fn record_shipment(&self, ok: bool) {
        bump(if ok {
            &self.shipments_created
        } else {
            &self.shipment_failures
        });
    }

    pub fn record_payment(&self, ok: bool) {
        bump(if ok {
            &self.payments_created
        } else {
            &self.payment_failures
        });
    }

    pub fn record_aggregation(&self, ok: bool) {
        bump(if ok {
            &self.aggregations_ok
        } else {
            &self.aggregation_failures
        });
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            cycles: load(&self.cycles),
            order_attempts: load(&self.order_attempts),
            orders_created: load(&self.orders_created),
            precondition_misses: load(&self.precondition_misses),
            order_failures: load(&self.order_failures),
            shipments_created: load(&self.shipments_created),
            shipment_failures: load(&self.shipment_failures),
            payments_created: load(&self.payments_created),
            payment_failures: load(&self.payment_failures),
            aggregations_ok: load(&self.aggregations_ok),
            aggregation_failures: load(&self.aggregation_failures),
        }
    }
}

/// Serialisable counter values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub cycles: u64,
    pub order_attempts: u64,
    pub orders_created: u64,
    pub precondition_misses: u64,
    pub order_failures: u64,
    pub shipments_created: u64,
    pub shipment_failures: u64,
    pub payments_created: u64,
    pub payment_failures: u64,
    pub aggregations_ok: u64,
    pub aggregation_failures: u64,
}
