//! Shared setup for the engine scenarios.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use souq_commerce::catalog::{AdjustInventoryRequest, InventoryRecord};
use souq_commerce::prelude::*;
use souq_db::{ensure_store_front, seed_reference_data, MemoryStore};

pub const ADMIN: AdminId = AdminId::new(1);

pub struct Fixture {
    pub store: Arc<dyn Store>,
    pub store_front: StoreFront,
    pub catalog: CatalogService,
    pub inventory: InventoryService,
    pub orders: OrderEngine,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_lock_timeout(Duration::from_secs(2)).await
    }

    pub async fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self::with_timeouts(lock_timeout, DEFAULT_TX_TIMEOUT).await
    }

    /// Row lock wait and whole-transaction deadline set independently.
    pub async fn with_timeouts(lock_timeout: Duration, tx_timeout: Duration) -> Self {
        let memory = MemoryStore::with_lock_timeout(lock_timeout);
        seed_reference_data(&memory).await.unwrap();
        let store_front = ensure_store_front(&memory, "Main", "main", "shop.example.com")
            .await
            .unwrap();

        let store: Arc<dyn Store> = Arc::new(memory);
        let runner = TxRunner::new(store.clone(), tx_timeout);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self {
            store,
            store_front,
            catalog: CatalogService::new(runner.clone(), clock.clone()),
            inventory: InventoryService::new(runner.clone(), clock.clone()),
            orders: OrderEngine::new(runner, clock),
        }
    }

    /// A second storefront.
    pub async fn other_store_front(&self) -> StoreFront {
        ensure_store_front(self.store.as_ref(), "Outlet", "outlet", "outlet.example.com")
            .await
            .unwrap()
    }

    /// A draft simple product with one active variant priced at `price`
    /// major units, assigned to the main storefront with an empty stock row.
    pub async fn product(&self, name: &str, sku: &str, price: i64) -> (ProductId, VariantId) {
        let detail = self
            .catalog
            .create_product(
                ProductInput {
                    name_en: name.to_string(),
                    name_ar: format!("{} (ar)", name),
                    store_front_ids: vec![self.store_front.id],
                    variants: vec![variant_input(sku, price)],
                    ..Default::default()
                },
                ADMIN,
            )
            .await
            .unwrap();
        (detail.product.id, detail.variants[0].id)
    }

    pub async fn stock(&self, variant: VariantId, delta: i64) {
        self.inventory
            .adjust(
                AdjustInventoryRequest {
                    product_variant_id: variant,
                    store_front_id: self.store_front.id,
                    adjustment: delta,
                    reason: AdjustmentReason::Restock,
                    notes: String::new(),
                },
                ADMIN,
            )
            .await
            .unwrap();
    }

    pub async fn record(&self, variant: VariantId) -> InventoryRecord {
        self.inventory
            .get(StockKey::new(variant, self.store_front.id))
            .await
            .unwrap()
            .record
    }

    /// (quantity, reserved) of a variant in the main storefront.
    pub async fn balance(&self, variant: VariantId) -> (i64, i64) {
        let record = self.record(variant).await;
        (record.quantity, record.reserved)
    }

    pub fn order_request(&self, lines: &[(VariantId, i64)]) -> CreateOrderRequest {
        CreateOrderRequest {
            store_front_id: self.store_front.id,
            items: lines
                .iter()
                .map(|(variant, quantity)| CreateOrderItem {
                    product_variant_id: *variant,
                    quantity: *quantity,
                })
                .collect(),
            customer_name: "Sara Ahmed".to_string(),
            customer_email: "sara@example.com".to_string(),
            customer_phone: "+966500000000".to_string(),
            shipping_amount: Money::zero(),
            tax_amount: Money::zero(),
            discount_amount: Money::zero(),
            notes: String::new(),
        }
    }
}

pub fn variant_input(sku: &str, price: i64) -> VariantInput {
    VariantInput {
        sku: sku.to_string(),
        price: Some(Money::from_major(price)),
        is_active: true,
        ..Default::default()
    }
}
