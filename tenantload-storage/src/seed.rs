//! Tenant seed data: population and precondition checks

use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

use tenantload_core::{
    documents::to_document,
    fixtures::{self, DEFAULT_SEED_CUSTOMERS, DEFAULT_SEED_INVENTORY},
    CollectionKind, LoadError, TenantId,
};
use tenantload_interfaces::{with_deadline, BackendError, Document, DocumentStore};

use crate::error::{StorageError, StorageResult};

/// How many records to seed per tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedPlan {
    pub customers: usize,
    pub inventory: usize,
}

impl Default for SeedPlan {
    fn default() -> Self {
        Self {
            customers: DEFAULT_SEED_CUSTOMERS,
            inventory: DEFAULT_SEED_INVENTORY,
        }
    }
}

/// What a seeding run wrote for one tenant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub tenant: TenantId,
    pub customers: usize,
    pub inventory: usize,
}

/// Seed record counts observed for one tenant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedStatus {
    pub tenant: TenantId,
    pub customers: u64,
    pub inventory: u64,
}

impl SeedStatus {
    /// Both customers and inventory are present
    pub fn is_ready(&self) -> bool {
        self.customers > 0 && self.inventory > 0
    }

    /// `Ok` when ready, otherwise the startup error for this tenant
    pub fn require_ready(self) -> Result<Self, LoadError> {
        if self.is_ready() {
            Ok(self)
        } else {
            Err(LoadError::SeedDataMissing {
                tenant: self.tenant.to_string(),
                customers: self.customers,
                inventory: self.inventory,
            })
        }
    }
}

fn tenant_filter(tenant: &TenantId) -> Document {
    json!({ "tenantId": tenant.as_str() })
}

async fn insert_seed(
    store: &dyn DocumentStore,
    collection: &str,
    docs: Vec<Document>,
    timeout: Duration,
) -> StorageResult<usize> {
    if docs.is_empty() {
        return Ok(0);
    }
    let handle = store.collection(collection);
    with_deadline(timeout, handle.insert_many(docs, true))
        .await
        .map_err(|source| StorageError::SeedFailed {
            collection: collection.to_string(),
            source,
        })
}

/// Insert the customer and inventory seed sets for `tenant`.
///
/// Each collection is written with a single ordered `insert_many` bounded by
/// `timeout`. Lookup indexes are requested afterwards; an index failure is
/// logged and does not fail the seed.
pub async fn seed_tenant(
    store: &dyn DocumentStore,
    tenant: &TenantId,
    plan: &SeedPlan,
    timeout: Duration,
) -> StorageResult<SeedReport> {
    info!(tenant = %tenant, customers = plan.customers, inventory = plan.inventory, "Seeding tenant");

    let customers_name = tenant.collection_name(CollectionKind::Customers);
    let customers = (1..=plan.customers)
        .map(|i| to_document(&fixtures::customer(tenant, i)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(BackendError::from)?;
    let customers = insert_seed(store, &customers_name, customers, timeout).await?;

    let inventory_name = tenant.collection_name(CollectionKind::Inventory);
    let inventory = (1..=plan.inventory)
        .map(|i| to_document(&fixtures::inventory_item(tenant, i)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(BackendError::from)?;
    let inventory = insert_seed(store, &inventory_name, inventory, timeout).await?;

    let indexes = [
        (customers_name, json!({ "tenantId": 1, "customerId": 1 })),
        (inventory_name, json!({ "tenantId": 1, "skuId": 1 })),
    ];
    for (collection, keys) in indexes {
        let handle = store.collection(&collection);
        if let Err(e) = with_deadline(timeout, handle.create_index(keys)).await {
            warn!(collection = %collection, error = %e, "Index creation failed");
        }
    }

    info!(tenant = %tenant, customers, inventory, "Tenant seeded successfully");
    Ok(SeedReport {
        tenant: tenant.clone(),
        customers,
        inventory,
    })
}

/// Count `tenant`'s customers and inventory, both under one `timeout`
pub async fn check_seed_data(
    store: &dyn DocumentStore,
    tenant: &TenantId,
    timeout: Duration,
) -> Result<SeedStatus, BackendError> {
    let customers = store.collection(&tenant.collection_name(CollectionKind::Customers));
    let inventory = store.collection(&tenant.collection_name(CollectionKind::Inventory));

    let status = with_deadline(timeout, async {
        let customers = customers.count(tenant_filter(tenant)).await?;
        let inventory = inventory.count(tenant_filter(tenant)).await?;
        Ok(SeedStatus {
            tenant: tenant.clone(),
            customers,
            inventory,
        })
    })
    .await?;

    debug!(
        tenant = %tenant,
        customers = status.customers,
        inventory = status.inventory,
        "Seed data checked"
    );
    Ok(status)
}
