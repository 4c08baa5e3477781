//! End-to-end load scenarios against the in-memory backend
//!
//! Every test runs on paused tokio time, so a "five second" run completes
//! instantly while pacing, jitter and shutdown still follow virtual time.

use anyhow::Result;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

use tenantload_config::{ConfigLoader, LoadConfig};
use tenantload_core::TenantId;
use tenantload_runtime::{LoadOrchestrator, WorkloadMode};
use tenantload_storage::{seed_tenant, MemoryStore, SeedPlan};

const TWO_TENANTS: &str = r#"
tenants:
  tenants: [T1, T2]
  users_map:
    T1: 2
  rate_map:
    T1: 1s
    T2: 2s
backend:
  uri: "memory://"
"#;

fn two_tenant_config() -> Result<LoadConfig> {
    let mut file = NamedTempFile::new()?;
    file.write_all(TWO_TENANTS.as_bytes())?;
    // Host TENANTS/RATE variables must not reach the run
    Ok(ConfigLoader::with_prefix("TENANTLOAD_SCENARIO").from_file(file.path())?)
}

async fn seeded_store(tenants: &[&str]) -> Result<MemoryStore> {
    let store = MemoryStore::new();
    for tenant in tenants {
        seed_tenant(
            &store,
            &TenantId::from(*tenant),
            &SeedPlan::default(),
            Duration::from_secs(8),
        )
        .await?;
    }
    Ok(store)
}

/// T1 runs two users every ~1s, T2 one user every ~2s, for five seconds
#[tokio::test(start_paused = true)]
async fn test_two_tenant_run_then_shutdown() -> Result<()> {
    let config = two_tenant_config()?;
    let store = seeded_store(&["T1", "T2"]).await?;
    let orchestrator = LoadOrchestrator::new(config, Arc::new(store.clone()));

    let summary = orchestrator
        .run_until(tokio::time::sleep(Duration::from_secs(5)))
        .await?;

    assert!(summary.is_clean());
    assert!(summary.elapsed < Duration::from_secs(25));

    let t1 = summary.tenant("T1").expect("T1 summary");
    assert_eq!(t1.users, 2);
    assert_eq!(t1.users_stopped, 2);
    assert_eq!(t1.pacing_interval, Duration::from_secs(1));
    assert!(
        (8..=14).contains(&t1.stats.order_attempts),
        "T1 attempts: {}",
        t1.stats.order_attempts
    );

    let t2 = summary.tenant("T2").expect("T2 summary");
    assert_eq!(t2.users_stopped, 1);
    assert!(
        (2..=4).contains(&t2.stats.order_attempts),
        "T2 attempts: {}",
        t2.stats.order_attempts
    );

    for tenant in [t1, t2] {
        let name = tenant.tenant.as_str();
        assert_eq!(tenant.stats.orders_created, tenant.stats.order_attempts);
        assert_eq!(
            store.document_count(&format!("{}_orders", name)) as u64,
            tenant.stats.orders_created
        );
        assert_eq!(
            store.document_count(&format!("{}_shipments", name)) as u64,
            tenant.stats.shipments_created
        );
        assert_eq!(
            store.document_count(&format!("{}_payments", name)) as u64,
            tenant.stats.payments_created
        );
        assert_eq!(tenant.stats.aggregations_ok, tenant.stats.cycles);
    }

    // Orders stay inside their tenant
    for order in store.documents("T2_orders") {
        assert_eq!(order["tenantId"], "T2");
        assert!(order["customerId"].as_str().unwrap_or("").starts_with("T2-CUST-"));
    }
    Ok(())
}

/// Emptying one tenant's inventory stops its orders but not its reads
#[tokio::test(start_paused = true)]
async fn test_inventory_emptied_mid_run() -> Result<()> {
    let config = two_tenant_config()?;
    let store = seeded_store(&["T1", "T2"]).await?;
    let orchestrator = LoadOrchestrator::new(config, Arc::new(store.clone()));

    let chaos = store.clone();
    let summary = orchestrator
        .run_until(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            chaos.clear_collection("T1_inventory");
            tokio::time::sleep(Duration::from_secs(3)).await;
        })
        .await?;

    let t1 = summary.tenant("T1").expect("T1 summary");
    assert!(t1.stats.precondition_misses >= 4, "{:?}", t1.stats);
    assert!(t1.stats.orders_created <= 6, "{:?}", t1.stats);
    assert_eq!(t1.stats.order_failures, 0);
    assert_eq!(t1.stats.shipments_created, t1.stats.orders_created);
    assert_eq!(t1.stats.payments_created, t1.stats.orders_created);
    assert_eq!(t1.stats.aggregations_ok, t1.stats.cycles);
    assert_eq!(t1.stats.aggregation_failures, 0);

    let t2 = summary.tenant("T2").expect("T2 summary");
    assert_eq!(t2.stats.precondition_misses, 0);
    assert_eq!(t2.stats.orders_created, t2.stats.order_attempts);
    Ok(())
}

/// Read-only mode aggregates without writing anything
#[tokio::test(start_paused = true)]
async fn test_read_only_run() -> Result<()> {
    let config = two_tenant_config()?;
    let store = seeded_store(&["T1", "T2"]).await?;
    let orchestrator =
        LoadOrchestrator::new(config, Arc::new(store.clone())).with_mode(WorkloadMode::ReadOnly);

    let summary = orchestrator
        .run_until(tokio::time::sleep(Duration::from_secs(3)))
        .await?;

    assert!(summary.is_clean());
    for tenant in &summary.tenants {
        assert_eq!(tenant.stats.order_attempts, 0);
        assert!(tenant.stats.aggregations_ok >= 1);
    }
    assert_eq!(store.document_count("T1_orders"), 0);
    assert_eq!(store.document_count("T2_orders"), 0);
    Ok(())
}
