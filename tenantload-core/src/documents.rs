//! Business documents written and read by the workload
//!
//! Field names follow the camelCase layout of the tenant collections
//! (`tenantId`, `orderId`, `totalAmount`, ...), so a document serialised here
//! can be inserted as-is into any document store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::TenantId;

/// Lifecycle status recorded on an order when it is placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Placed,
    Shipped,
    Delivered,
    Cancelled,
}

/// One line item of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub sku_id: String,
    pub quantity: u32,
    pub price: f64,
}

impl OrderItem {
    pub fn line_total(&self) -> f64 {
        f64::from(self.quantity) * self.price
    }
}

/// An order; never mutated after insert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDoc {
    pub tenant_id: TenantId,
    pub order_id: String,
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    #[serde(rename = "orderStatus")]
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl OrderDoc {
    /// Build a placed order, computing the total from its items
    pub fn placed(
        tenant_id: TenantId,
        order_id: String,
        customer_id: String,
        items: Vec<OrderItem>,
    ) -> Self {
        let total_amount = items.iter().map(OrderItem::line_total).sum();
        Self {
            tenant_id,
            order_id,
            customer_id,
            items,
            total_amount,
            status: OrderStatus::Placed,
            created_at: Utc::now(),
        }
    }
}

/// Shipment created right after the order it references
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentDoc {
    pub tenant_id: TenantId,
    pub order_id: String,
    pub carrier: String,
    pub tracking_number: String,
    pub status: String,
    pub shipped_date: DateTime<Utc>,
}

impl ShipmentDoc {
    pub fn for_order(tenant_id: TenantId, order_id: &str) -> Self {
        Self {
            tenant_id,
            order_id: order_id.to_string(),
            carrier: "DHL".to_string(),
            tracking_number: format!("TRK-{}", order_id),
            status: "Packed".to_string(),
            shipped_date: Utc::now(),
        }
    }
}

/// Payment created right after the order it references
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDoc {
    pub tenant_id: TenantId,
    pub order_id: String,
    pub payment_mode: String,
    pub transaction_id: String,
    pub amount: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl PaymentDoc {
    pub fn for_order(tenant_id: TenantId, order_id: &str, amount: f64) -> Self {
        Self {
            tenant_id,
            order_id: order_id.to_string(),
            payment_mode: "CreditCard".to_string(),
            transaction_id: format!("TXN-{}", order_id),
            amount,
            status: "Success".to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Seeded customer record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDoc {
    pub tenant_id: TenantId,
    pub customer_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Seeded inventory record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryDoc {
    pub tenant_id: TenantId,
    pub product_id: String,
    pub sku_id: String,
    pub price: f64,
    pub stock: i64,
    pub created_at: DateTime<Utc>,
}

/// Generic event relayed from the broker into the event collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDoc {
    pub tenant_id: TenantId,
    pub event_id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

/// Serialise any document into its store representation
pub fn to_document<T: Serialize>(doc: &T) -> serde_json::Result<serde_json::Value> {
    serde_json::to_value(doc)
}
