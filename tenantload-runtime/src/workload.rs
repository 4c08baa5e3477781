//! Workload operations against one tenant's collections
//!
//! Writes (order, shipment, payment) are single attempts bounded by the write
//! deadline; retrying a non-idempotent insert could duplicate business
//! records. The top-products aggregation is idempotent and goes through the
//! retry executor.

use rand::seq::SliceRandom;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use tenantload_config::WorkloadConfig;
use tenantload_core::{
    documents::to_document, fixtures, CollectionKind, LoadError, OrderDoc, OrderIdGenerator,
    PaymentDoc, ShipmentDoc, TenantId,
};
use tenantload_interfaces::{
    retry_failure, with_deadline, BackendError, Document, DocumentCollection, DocumentStore,
};
use tenantload_resilience::{RetryExecutor, RetryPolicy};

/// Deadlines and retry budget of the workload operations
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadSettings {
    pub write_timeout: Duration,
    pub aggregation_policy: RetryPolicy,
    pub aggregation_batch_size: u32,
    pub top_products: u32,
}

impl WorkloadSettings {
    pub fn from_config(config: &WorkloadConfig) -> Self {
        Self {
            write_timeout: config.write_timeout,
            aggregation_policy: RetryPolicy::linear(
                config.aggregation_attempts,
                config.retry_backoff_step,
            )
            .with_attempt_timeout(config.aggregation_timeout),
            aggregation_batch_size: config.aggregation_batch_size,
            top_products: config.top_products,
        }
    }
}

impl Default for WorkloadSettings {
    fn default() -> Self {
        Self::from_config(&WorkloadConfig::default())
    }
}

/// One tenant bound to its five collections
#[derive(Clone)]
pub struct TenantCollections {
    pub tenant: TenantId,
    pub customers: Arc<dyn DocumentCollection>,
    pub inventory: Arc<dyn DocumentCollection>,
    pub orders: Arc<dyn DocumentCollection>,
    pub shipments: Arc<dyn DocumentCollection>,
    pub payments: Arc<dyn DocumentCollection>,
}

impl TenantCollections {
    pub fn new(store: &dyn DocumentStore, tenant: TenantId) -> Self {
        let open = |kind| store.collection(&tenant.collection_name(kind));
        Self {
            customers: open(CollectionKind::Customers),
            inventory: open(CollectionKind::Inventory),
            orders: open(CollectionKind::Orders),
            shipments: open(CollectionKind::Shipments),
            payments: open(CollectionKind::Payments),
            tenant,
        }
    }
}

/// The fixed top-products pipeline for `tenant`
pub fn aggregation_pipeline(tenant: &TenantId, top: u32) -> Vec<Document> {
    vec![
        json!({ "$match": { "tenantId": tenant.as_str() } }),
        json!({ "$unwind": "$items" }),
        json!({ "$group": {
            "_id": "$items.productId",
            "total": { "$sum": "$items.quantity" }
        }}),
        json!({ "$sort": { "total": -1 } }),
        json!({ "$limit": top }),
    ]
}

struct InventoryPick {
    product_id: String,
    sku_id: String,
}

/// Workload operations shared by every simulator of one tenant
pub struct TenantWorkload {
    collections: TenantCollections,
    settings: WorkloadSettings,
    retry: RetryExecutor,
    ids: Arc<OrderIdGenerator>,
}

impl TenantWorkload {
    pub fn new(
        collections: TenantCollections,
        settings: WorkloadSettings,
        ids: Arc<OrderIdGenerator>,
    ) -> Self {
        let retry = RetryExecutor::new(settings.aggregation_policy.clone());
        Self {
            collections,
            settings,
            retry,
            ids,
        }
    }

    pub fn tenant(&self) -> &TenantId {
        &self.collections.tenant
    }

    pub fn collections(&self) -> &TenantCollections {
        &self.collections
    }

    fn missing(&self, what: &'static str) -> LoadError {
        LoadError::PreconditionMissing {
            tenant: self.tenant().to_string(),
            what,
        }
    }

    async fn scan(&self, collection: &Arc<dyn DocumentCollection>) -> Result<Vec<Value>, BackendError> {
        with_deadline(self.settings.write_timeout, collection.find(json!({}))).await
    }

    async fn random_customer(&self) -> Result<String, LoadError> {
        let docs = self.scan(&self.collections.customers).await?;
        let ids: Vec<&str> = docs
            .iter()
            .filter_map(|doc| doc.get("customerId").and_then(Value::as_str))
            .collect();

        ids.choose(&mut rand::thread_rng())
            .map(|id| id.to_string())
            .ok_or_else(|| self.missing("customer"))
    }

    async fn random_inventory_item(&self) -> Result<InventoryPick, LoadError> {
        let docs = self.scan(&self.collections.inventory).await?;
        let items: Vec<(&str, &str)> = docs
            .iter()
            .filter_map(|doc| {
                let product = doc.get("productId").and_then(Value::as_str)?;
                let sku = doc.get("skuId").and_then(Value::as_str)?;
                Some((product, sku))
            })
            .collect();

        items
            .choose(&mut rand::thread_rng())
            .map(|(product, sku)| InventoryPick {
                product_id: product.to_string(),
                sku_id: sku.to_string(),
            })
            .ok_or_else(|| self.missing("inventory item"))
    }

    async fn insert(
        &self,
        collection: &Arc<dyn DocumentCollection>,
        doc: Document,
    ) -> Result<(), LoadError> {
        with_deadline(self.settings.write_timeout, collection.insert_one(doc)).await?;
        Ok(())
    }

    /// Place an order for a random seeded customer and inventory item
    pub async fn create_order(&self) -> Result<OrderDoc, LoadError> {
        let customer = self.random_customer().await?;
        let item = self.random_inventory_item().await?;

        let line = fixtures::order_line(&mut rand::thread_rng(), &item.product_id, &item.sku_id);
        let order = OrderDoc::placed(
            self.tenant().clone(),
            self.ids.next_id(self.tenant()),
            customer,
            vec![line],
        );

        let doc = to_document(&order).map_err(BackendError::from)?;
        self.insert(&self.collections.orders, doc).await?;
        Ok(order)
    }

    pub async fn create_shipment(&self, order_id: &str) -> Result<(), LoadError> {
        let shipment = ShipmentDoc::for_order(self.tenant().clone(), order_id);
        let doc = to_document(&shipment).map_err(BackendError::from)?;
        self.insert(&self.collections.shipments, doc).await
    }

    pub async fn create_payment(&self, order_id: &str, amount: f64) -> Result<(), LoadError> {
        let payment = PaymentDoc::for_order(self.tenant().clone(), order_id, amount);
        let doc = to_document(&payment).map_err(BackendError::from)?;
        self.insert(&self.collections.payments, doc).await
    }

    /// Run the top-products aggregation, draining and discarding the cursor.
    ///
    /// Returns the number of rows read.
    pub async fn run_aggregation(&self, cancel: &CancellationToken) -> Result<usize, LoadError> {
        let pipeline = aggregation_pipeline(self.tenant(), self.settings.top_products);
        let orders = &self.collections.orders;
        let batch_size = self.settings.aggregation_batch_size;

        self.retry
            .execute(cancel, |attempt| {
                let pipeline = pipeline.clone();
                async move {
                    debug!(attempt, "Running top-products aggregation");
                    orders
                        .aggregate(pipeline, batch_size)
                        .await
                        .map(|rows| rows.len())
                }
            })
            .await
            .map_err(retry_failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenantload_storage::{seed_tenant, FaultRule, MemoryStore, Operation, SeedPlan};

    const TIMEOUT: Duration = Duration::from_secs(8);

    async fn seeded(tenant: &str, plan: SeedPlan) -> (MemoryStore, TenantWorkload) {
        let store = MemoryStore::new();
        let tenant = TenantId::from(tenant);
        seed_tenant(&store, &tenant, &plan, TIMEOUT).await.unwrap();
        let workload = TenantWorkload::new(
            TenantCollections::new(&store, tenant),
            WorkloadSettings::default(),
            Arc::new(OrderIdGenerator::with_instance("test0001")),
        );
        (store, workload)
    }

    #[tokio::test]
    async fn test_create_order_uses_seeded_records() {
        let (store, workload) = seeded("T1", SeedPlan::default()).await;

        let order = workload.create_order().await.unwrap();
        assert!(order.customer_id.starts_with("T1-CUST-"));
        assert!(order.items[0].product_id.starts_with("T1-PROD-"));
        assert!(order.order_id.starts_with("T1-ORD-"));
        assert_eq!(order.total_amount, order.items[0].line_total());

        let stored = store.documents("T1_orders");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["orderId"], order.order_id.as_str());
    }

    #[tokio::test]
    async fn test_shipment_and_payment_reference_the_order() {
        let (store, workload) = seeded("T1", SeedPlan::default()).await;
        let order = workload.create_order().await.unwrap();

        workload.create_shipment(&order.order_id).await.unwrap();
        workload
            .create_payment(&order.order_id, order.total_amount)
            .await
            .unwrap();

        assert_eq!(store.documents("T1_shipments")[0]["orderId"], order.order_id.as_str());
        assert_eq!(store.documents("T1_payments")[0]["amount"], order.total_amount);
    }

    #[tokio::test]
    async fn test_missing_seed_data_is_a_precondition_error() {
        let (store, workload) = seeded(
            "T1",
            SeedPlan {
                customers: 3,
                inventory: 0,
            },
        )
        .await;

        let err = workload.create_order().await.unwrap_err();
        assert!(matches!(
            err,
            LoadError::PreconditionMissing {
                what: "inventory item",
                ..
            }
        ));

        store.clear_collection("T1_customers");
        let err = workload.create_order().await.unwrap_err();
        assert!(matches!(
            err,
            LoadError::PreconditionMissing { what: "customer", .. }
        ));
        assert_eq!(store.document_count("T1_orders"), 0);
    }

    #[tokio::test]
    async fn test_failed_insert_is_not_retried() {
        let (store, workload) = seeded("T1", SeedPlan::default()).await;
        store.faults().inject(
            FaultRule::fail(BackendError::network("reset"))
                .on_collection("T1_orders")
                .on_operation(Operation::InsertOne),
        );

        let err = workload.create_order().await.unwrap_err();
        assert!(matches!(err, LoadError::TransientBackend(_)));
        assert_eq!(store.call_count("T1_orders", Operation::InsertOne), 1);
    }

    #[tokio::test]
    async fn test_aggregation_is_scoped_to_tenant() {
        let (store, workload) = seeded("T1", SeedPlan::default()).await;
        for _ in 0..3 {
            workload.create_order().await.unwrap();
        }
        store
            .collection("T1_orders")
            .insert_one(json!({"tenantId": "T2", "items": [{"productId": "X", "quantity": 1}]}))
            .await
            .unwrap();

        let rows = workload
            .run_aggregation(&CancellationToken::new())
            .await
            .unwrap();
        assert!((1..=3).contains(&rows));
    }

    #[tokio::test(start_paused = true)]
    async fn test_aggregation_retries_transient_failures() {
        let (store, workload) = seeded("T1", SeedPlan::default()).await;
        store.faults().inject(
            FaultRule::fail(BackendError::network("reset"))
                .on_operation(Operation::Aggregate)
                .times(2),
        );

        let rows = workload
            .run_aggregation(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(rows, 0);
        assert_eq!(store.call_count("T1_orders", Operation::Aggregate), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_aggregation_gives_up_after_three_attempts() {
        let (store, workload) = seeded("T1", SeedPlan::default()).await;
        store
            .faults()
            .inject(FaultRule::fail(BackendError::network("down")).on_operation(Operation::Aggregate));

        let err = workload
            .run_aggregation(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::TransientBackend(_)));
        assert_eq!(store.call_count("T1_orders", Operation::Aggregate), 3);
    }

    #[tokio::test]
    async fn test_permanent_aggregation_failure_is_not_retried() {
        let (store, workload) = seeded("T1", SeedPlan::default()).await;
        store.faults().inject(
            FaultRule::fail(BackendError::rejected("bad pipeline"))
                .on_operation(Operation::Aggregate),
        );

        let err = workload
            .run_aggregation(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::PermanentOperation(_)));
        assert_eq!(store.call_count("T1_orders", Operation::Aggregate), 1);
    }

    #[test]
    fn test_pipeline_shape() {
        let pipeline = aggregation_pipeline(&TenantId::from("T7"), 5);
        assert_eq!(pipeline.len(), 5);
        assert_eq!(pipeline[0]["$match"]["tenantId"], "T7");
        assert_eq!(pipeline[2]["$group"]["total"]["$sum"], "$items.quantity");
        assert_eq!(pipeline[4]["$limit"], 5);
    }
}
