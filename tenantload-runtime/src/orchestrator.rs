//! Load-test orchestration: startup checks, pool launch and coordinated shutdown

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{error, info, warn, Instrument};

use tenantload_config::LoadConfig;
use tenantload_core::{LoadError, OrderIdGenerator, RunConfig, TenantId};
use tenantload_interfaces::{with_deadline, DocumentStore};
use tenantload_logging::tenant_span;
use tenantload_resilience::{
    JitteredScheduler, ShutdownCoordinator, ShutdownError, ShutdownOutcome, TerminationListener,
};
use tenantload_storage::{check_seed_data, connect, SeedStatus};

use crate::pool::{PoolReport, TenantWorkerPool};
use crate::simulator::WorkloadMode;
use crate::stats::{StatsSnapshot, TenantStats};
use crate::workload::{TenantCollections, TenantWorkload, WorkloadSettings};

/// Per-tenant result of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantSummary {
    pub tenant: TenantId,
    pub users: usize,
    #[serde(with = "serde_millis")]
    pub pacing_interval: Duration,
    pub users_stopped: usize,
    pub stats: StatsSnapshot,
}

/// Result of a whole run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub tenants: Vec<TenantSummary>,
    pub outcome: ShutdownOutcome,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn is_clean(&self) -> bool {
        self.outcome.is_clean()
    }

    pub fn tenant(&self, tenant: &str) -> Option<&TenantSummary> {
        self.tenants.iter().find(|t| t.tenant.as_str() == tenant)
    }

    /// Log one line per tenant
    pub fn log(&self) {
        for tenant in &self.tenants {
            info!(
                tenant = %tenant.tenant,
                users = tenant.users,
                users_stopped = tenant.users_stopped,
                cycles = tenant.stats.cycles,
                orders = tenant.stats.orders_created,
                order_failures = tenant.stats.order_failures,
                precondition_misses = tenant.stats.precondition_misses,
                aggregations = tenant.stats.aggregations_ok,
                aggregation_failures = tenant.stats.aggregation_failures,
                "Tenant summary"
            );
        }
    }
}

mod serde_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Drives one load test from startup checks to shutdown
pub struct LoadOrchestrator {
    config: LoadConfig,
    store: Arc<dyn DocumentStore>,
    mode: WorkloadMode,
    ids: Arc<OrderIdGenerator>,
}

impl LoadOrchestrator {
    pub fn new(config: LoadConfig, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            config,
            store,
            mode: WorkloadMode::Full,
            ids: Arc::new(OrderIdGenerator::new()),
        }
    }

    /// Connect to the configured backend within its connect deadline.
    ///
    /// The tenant plan is resolved first, so a missing or malformed tenant
    /// list fails as a configuration error without touching the backend.
    pub async fn connect(config: LoadConfig) -> Result<Self, LoadError> {
        config.tenants.resolve()?;

        let deadline = config.backend.connect_timeout;
        let store = tokio::time::timeout(deadline, connect(&config.backend))
            .await
            .map_err(|_| {
                LoadError::BackendUnavailable(format!(
                    "no connection to {} within {:?}",
                    config.backend.uri, deadline
                ))
            })??;
        Ok(Self::new(config, store))
    }

    pub fn with_mode(mut self, mode: WorkloadMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        self.store.clone()
    }

    /// Resolve the per-tenant run configuration
    pub fn plan(&self) -> Result<Vec<RunConfig>, LoadError> {
        Ok(self.config.tenants.resolve()?)
    }

    /// Health-check the backend and verify every tenant's seed data.
    ///
    /// One unseeded tenant fails the whole run.
    pub async fn preflight(&self, plan: &[RunConfig]) -> Result<Vec<SeedStatus>, LoadError> {
        with_deadline(self.config.backend.ping_timeout, self.store.ping())
            .await
            .map_err(|e| LoadError::BackendUnavailable(e.to_string()))?;

        let mut statuses = Vec::with_capacity(plan.len());
        for run in plan {
            let status = check_seed_data(
                self.store.as_ref(),
                &run.tenant,
                self.config.workload.seed_check_timeout,
            )
            .await
            .map_err(|e| {
                LoadError::BackendUnavailable(format!(
                    "seed check for tenant {} failed: {}",
                    run.tenant, e
                ))
            })?;
            statuses.push(status.require_ready()?);
        }
        Ok(statuses)
    }

    /// Run until `shutdown` completes, then cancel and drain every pool
    pub async fn run_until<F>(&self, shutdown: F) -> Result<RunSummary, LoadError>
    where
        F: Future<Output = ()>,
    {
        let plan = self.plan()?;
        self.preflight(&plan).await?;

        let coordinator = ShutdownCoordinator::new(self.config.workload.shutdown_timeout);
        let settings = WorkloadSettings::from_config(&self.config.workload);
        let scheduler = JitteredScheduler::new(self.config.workload.jitter);
        let started = Instant::now();

        let mut pools = JoinSet::new();
        let mut tenants: Vec<(RunConfig, Arc<TenantStats>)> = Vec::with_capacity(plan.len());
        for run in plan {
            let collections = TenantCollections::new(self.store.as_ref(), run.tenant.clone());
            let workload = Arc::new(TenantWorkload::new(
                collections,
                settings.clone(),
                self.ids.clone(),
            ));
            let pool = TenantWorkerPool::new(run.clone(), workload)
                .with_mode(self.mode)
                .with_scheduler(scheduler);

            tenants.push((run.clone(), pool.stats()));
            pools.spawn(
                pool.run(coordinator.token())
                    .instrument(tenant_span(run.tenant.as_str())),
            );
        }
        info!(
            tenants = tenants.len(),
            backend = self.store.backend_name(),
            mode = ?self.mode,
            "Load generation started"
        );

        shutdown.await;
        info!("Shutdown requested, stopping all tenant workers");

        let mut reports: Vec<PoolReport> = Vec::with_capacity(tenants.len());
        let outcome = coordinator
            .shutdown(async {
                while let Some(joined) = pools.join_next().await {
                    match joined {
                        Ok(report) => reports.push(report),
                        Err(e) => error!(error = %e, "Tenant pool failed"),
                    }
                }
            })
            .await;

        match outcome {
            ShutdownOutcome::Clean { .. } => info!("All tenants stopped cleanly"),
            ShutdownOutcome::Forced { .. } => {
                warn!(remaining = pools.len(), "Forced shutdown after timeout");
                pools.abort_all();
            }
        }

        let summary = RunSummary {
            tenants: tenants
                .into_iter()
                .map(|(run, stats)| {
                    let users_stopped = reports
                        .iter()
                        .find(|r| r.tenant == run.tenant)
                        .map(|r| r.users_stopped)
                        .unwrap_or(0);
                    TenantSummary {
                        tenant: run.tenant,
                        users: run.user_count,
                        pacing_interval: run.pacing_interval,
                        users_stopped,
                        stats: stats.snapshot(),
                    }
                })
                .collect(),
            outcome,
            elapsed: started.elapsed(),
        };
        summary.log();
        Ok(summary)
    }

    /// Run until SIGINT or SIGTERM.
    ///
    /// The handlers are installed before the startup checks; a signal that
    /// arrives while they run stops the load as soon as it has started.
    pub async fn run(&self) -> Result<RunSummary, LoadError> {
        let mut listener = TerminationListener::install().map_err(|e| match e {
            ShutdownError::SignalHandler(io) => LoadError::Io(io),
        })?;

        self.run_until(async move {
            match listener.recv().await {
                Ok(signal) => info!(%signal, "Termination signal received"),
                Err(e) => error!(error = %e, "Signal handler failed, shutting down"),
            }
        })
        .await
    }
}
