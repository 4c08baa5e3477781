//! Synthetic fixture generation
//!
//! Pure, stateless builders for seed records and synthetic business documents.
//! Nothing here touches a backend.

use chrono::Utc;
use rand::Rng;

use crate::documents::{
    CustomerDoc, EventDoc, InventoryDoc, OrderDoc, OrderItem, PaymentDoc, ShipmentDoc,
};
use crate::types::TenantId;

/// Customers seeded per tenant by default
pub const DEFAULT_SEED_CUSTOMERS: usize = 100;

/// Inventory items seeded per tenant by default
pub const DEFAULT_SEED_INVENTORY: usize = 200;

const PAYLOAD_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Seed customer number `index` (1-based) of `tenant`
pub fn customer(tenant: &TenantId, index: usize) -> CustomerDoc {
    CustomerDoc {
        tenant_id: tenant.clone(),
        customer_id: format!("{}-CUST-{:03}", tenant, index),
        name: format!("Customer {}", index),
        created_at: Utc::now(),
    }
}

/// Seed inventory item number `index` (1-based) of `tenant`
pub fn inventory_item(tenant: &TenantId, index: usize) -> InventoryDoc {
    InventoryDoc {
        tenant_id: tenant.clone(),
        product_id: format!("{}-PROD-{:03}", tenant, index),
        sku_id: format!("{}-SKU-{:03}", tenant, index),
        price: 100.0 + index as f64,
        stock: 1000,
        created_at: Utc::now(),
    }
}

/// Order quantity in `1..=3`
pub fn random_quantity<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.gen_range(1..=3)
}

/// Unit price in `100.0..500.0`, whole currency units
pub fn random_price<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    100.0 + f64::from(rng.gen_range(0u32..400))
}

/// Build a single-line order for an existing customer and inventory item
pub fn order_line<R: Rng + ?Sized>(rng: &mut R, product_id: &str, sku_id: &str) -> OrderItem {
    OrderItem {
        product_id: product_id.to_string(),
        sku_id: sku_id.to_string(),
        quantity: random_quantity(rng),
        price: random_price(rng),
    }
}

/// Synthetic order for the producer path; customer and product are derived
/// from `seq` so they stay inside the default seed ranges.
pub fn synthetic_order<R: Rng + ?Sized>(rng: &mut R, tenant: &TenantId, seq: u64) -> OrderDoc {
    let customer_index = (seq as usize % DEFAULT_SEED_CUSTOMERS) + 1;
    let product_index = (seq as usize % DEFAULT_SEED_INVENTORY) + 1;
    let item = order_line(
        rng,
        &format!("{}-PROD-{:03}", tenant, product_index),
        &format!("{}-SKU-{:03}", tenant, product_index),
    );

    OrderDoc::placed(
        tenant.clone(),
        format!("{}-ORD-{}-{}", tenant, Utc::now().timestamp_millis(), seq),
        format!("{}-CUST-{:03}", tenant, customer_index),
        vec![item],
    )
}

/// Shipment for a synthetic order
pub fn synthetic_shipment(order: &OrderDoc) -> ShipmentDoc {
    ShipmentDoc::for_order(order.tenant_id.clone(), &order.order_id)
}

/// Payment for a synthetic order
pub fn synthetic_payment(order: &OrderDoc) -> PaymentDoc {
    PaymentDoc::for_order(order.tenant_id.clone(), &order.order_id, order.total_amount)
}

/// Generic event with a random payload of `payload_len` characters
pub fn event<R: Rng + ?Sized>(rng: &mut R, tenant: &TenantId, payload_len: usize) -> EventDoc {
    let now = Utc::now();
    EventDoc {
        tenant_id: tenant.clone(),
        event_id: format!(
            "{}-{}",
            tenant,
            now.timestamp_nanos_opt().unwrap_or_else(|| now.timestamp_micros() * 1000)
        ),
        event_type: "load_test".to_string(),
        payload: random_string(rng, payload_len),
        created_at: now,
    }
}

fn random_string<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| PAYLOAD_ALPHABET[rng.gen_range(0..PAYLOAD_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_seed_identifiers() {
        let tenant = TenantId::from("T1001");
        let c = customer(&tenant, 7);
        let i = inventory_item(&tenant, 42);

        assert_eq!(c.customer_id, "T1001-CUST-007");
        assert_eq!(i.product_id, "T1001-PROD-042");
        assert_eq!(i.sku_id, "T1001-SKU-042");
        assert_eq!(i.price, 142.0);
        assert_eq!(i.stock, 1000);
    }

    #[test]
    fn test_random_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let q = random_quantity(&mut rng);
            assert!((1..=3).contains(&q));
            let p = random_price(&mut rng);
            assert!((100.0..500.0).contains(&p));
            assert_eq!(p.fract(), 0.0);
        }
    }

    #[test]
    fn test_synthetic_order_stays_in_seed_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let tenant = TenantId::from("T2");
        let order = synthetic_order(&mut rng, &tenant, 250);

        assert_eq!(order.customer_id, "T2-CUST-051");
        assert_eq!(order.items[0].product_id, "T2-PROD-051");
        assert_eq!(order.total_amount, order.items[0].line_total());

        let payment = synthetic_payment(&order);
        assert_eq!(payment.amount, order.total_amount);
        assert_eq!(synthetic_shipment(&order).order_id, order.order_id);
    }

    #[test]
    fn test_event_payload() {
        let mut rng = StdRng::seed_from_u64(3);
        let event = event(&mut rng, &TenantId::from("T3"), 128);
        assert_eq!(event.payload.len(), 128);
        assert!(event.payload.bytes().all(|b| PAYLOAD_ALPHABET.contains(&b)));
        assert!(event.event_id.starts_with("T3-"));
    }
}
