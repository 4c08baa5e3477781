//! Simulated user loop
//!
//! A simulator is `Running` until it observes cancellation at the top of an
//! iteration, then `Stopped` for good. An iteration that is already under way
//! finishes its backend calls; only the pacing pause is cut short.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tenantload_core::LoadError;
use tenantload_resilience::JitteredScheduler;

use crate::stats::TenantStats;
use crate::workload::TenantWorkload;

/// Lifecycle of a simulated user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulatorState {
    Running,
    Stopped,
}

/// Which operations an iteration performs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadMode {
    /// Order, shipment and payment writes followed by the aggregation
    #[default]
    Full,
    /// Aggregation only
    ReadOnly,
}

/// Final state of a simulator that has exited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorReport {
    pub user: usize,
    pub cycles: u64,
    pub state: SimulatorState,
}

/// One logical user of a tenant
pub struct UserSimulator {
    user: usize,
    workload: Arc<TenantWorkload>,
    stats: Arc<TenantStats>,
    scheduler: JitteredScheduler,
    interval: Duration,
    mode: WorkloadMode,
    state: SimulatorState,
    cycles: u64,
}

impl UserSimulator {
    pub fn new(
        user: usize,
        workload: Arc<TenantWorkload>,
        stats: Arc<TenantStats>,
        interval: Duration,
    ) -> Self {
        Self {
            user,
            workload,
            stats,
            scheduler: JitteredScheduler::default(),
            interval,
            mode: WorkloadMode::Full,
            state: SimulatorState::Running,
            cycles: 0,
        }
    }

    pub fn with_mode(mut self, mode: WorkloadMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_scheduler(mut self, scheduler: JitteredScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn user(&self) -> usize {
        self.user
    }

    pub fn state(&self) -> SimulatorState {
        self.state
    }

    /// Completed iterations
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run one iteration unless cancellation has fired, then pause
    pub async fn step(&mut self, cancel: &CancellationToken) -> SimulatorState {
        if self.state == SimulatorState::Stopped {
            return self.state;
        }
        if cancel.is_cancelled() {
            self.state = SimulatorState::Stopped;
            return self.state;
        }

        self.stats.record_cycle();
        if self.mode == WorkloadMode::Full {
            self.write_phase().await;
        }
        self.read_phase(cancel).await;
        self.cycles += 1;

        self.scheduler.pause(self.interval, cancel).await;
        self.state
    }

    async fn write_phase(&self) {
        self.stats.record_order_attempt();

        let order = match self.workload.create_order().await {
            Ok(order) => order,
            Err(e) if e.is_precondition_missing() => {
                self.stats.record_precondition_miss();
                warn!(error = %e, "CreateOrder skipped");
                return;
            }
            Err(e) => {
                self.stats.record_order_failure();
                warn!(error = %e, code = e.code(), "CreateOrder error");
                return;
            }
        };
        self.stats.record_order_created();

        let shipment = self.workload.create_shipment(&order.order_id).await;
        if let Err(e) = &shipment {
            warn!(order_id = %order.order_id, error = %e, "CreateShipment error");
        }
        self.stats.record_shipment(shipment.is_ok());

        let payment = self
            .workload
            .create_payment(&order.order_id, order.total_amount)
            .await;
        if let Err(e) = &payment {
            warn!(order_id = %order.order_id, error = %e, "CreatePayment error");
        }
        self.stats.record_payment(payment.is_ok());

        info!(
            order_id = %order.order_id,
            total = format_args!("{:.2}", order.total_amount),
            "Order created"
        );
    }

    async fn read_phase(&self, cancel: &CancellationToken) {
        match self.workload.run_aggregation(cancel).await {
            Ok(rows) => {
                self.stats.record_aggregation(true);
                debug!(rows, "Aggregation drained");
            }
            Err(LoadError::Cancelled) => {
                debug!("Aggregation abandoned during shutdown");
            }
            Err(e) => {
                self.stats.record_aggregation(false);
                warn!(error = %e, code = e.code(), "Aggregation error");
            }
        }
    }

    /// Loop until cancellation is observed
    pub async fn run(mut self, cancel: CancellationToken) -> SimulatorReport {
        debug!(interval = ?self.interval, mode = ?self.mode, "User started");
        while self.step(&cancel).await == SimulatorState::Running {}
        debug!(cycles = self.cycles, "User stopped");

        SimulatorReport {
            user: self.user,
            cycles: self.cycles,
            state: self.state,
        }
    }
}
