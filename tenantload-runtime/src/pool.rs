//! Tenant worker pool: fans out the simulated users of one tenant

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Instrument};

use tenantload_core::{RunConfig, TenantId};
use tenantload_logging::user_span;
use tenantload_resilience::JitteredScheduler;

use crate::simulator::{SimulatorState, UserSimulator, WorkloadMode};
use crate::stats::TenantStats;
use crate::workload::TenantWorkload;

/// Outcome of a pool once every user has exited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolReport {
    pub tenant: TenantId,
    pub users_started: usize,
    pub users_stopped: usize,
    pub cycles: u64,
}

/// `user_count` simulators sharing one tenant's workload and pacing
pub struct TenantWorkerPool {
    run: RunConfig,
    workload: Arc<TenantWorkload>,
    stats: Arc<TenantStats>,
    scheduler: JitteredScheduler,
    mode: WorkloadMode,
}

impl TenantWorkerPool {
    pub fn new(run: RunConfig, workload: Arc<TenantWorkload>) -> Self {
        Self {
            run,
            workload,
            stats: Arc::new(TenantStats::new()),
            scheduler: JitteredScheduler::default(),
            mode: WorkloadMode::Full,
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

    pub fn run_config(&self) -> &RunConfig {
        &self.run
    }

    /// Counters shared by this pool's simulators
    pub fn stats(&self) -> Arc<TenantStats> {
        self.stats.clone()
    }

    /// Spawn every simulator and wait until all of them have exited
    pub async fn run(self, cancel: CancellationToken) -> PoolReport {
        let tenant = self.run.tenant.clone();
        info!(
            users = self.run.user_count,
            interval = ?self.run.pacing_interval,
            mode = ?self.mode,
            "Starting tenant users"
        );

        let mut users = JoinSet::new();
        for user in 1..=self.run.user_count {
            let simulator = UserSimulator::new(
                user,
                self.workload.clone(),
                self.stats.clone(),
                self.run.pacing_interval,
            )
            .with_mode(self.mode)
            .with_scheduler(self.scheduler);

            users.spawn(
                simulator
                    .run(cancel.clone())
                    .instrument(user_span(tenant.as_str(), user)),
            );
        }

        let mut report = PoolReport {
            tenant,
            users_started: users.len(),
            users_stopped: 0,
            cycles: 0,
        };

        while let Some(joined) = users.join_next().await {
            match joined {
                Ok(user) => {
                    if user.state == SimulatorState::Stopped {
                        report.users_stopped += 1;
                    }
                    report.cycles += user.cycles;
                }
                Err(e) => error!(error = %e, "User task failed"),
            }
        }

        info!(
            users_stopped = report.users_stopped,
            cycles = report.cycles,
            "All users exited"
        );
        report
    }
}
