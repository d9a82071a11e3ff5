//! Inventory, order and activation scenarios run against the in-memory engine.

mod common;

use common::{Fixture, ADMIN};
use souq_commerce::catalog::{
    AdjustInventoryRequest, BulkInventoryItem, BulkInventoryRequest, ThresholdRequest,
};
use souq_commerce::orders::OrderMeta;
use souq_commerce::prelude::*;

fn adjust(fx: &Fixture, variant: VariantId, delta: i64, reason: AdjustmentReason) -> AdjustInventoryRequest {
    AdjustInventoryRequest {
        product_variant_id: variant,
        store_front_id: fx.store_front.id,
        adjustment: delta,
        reason,
        notes: "cycle count".to_string(),
    }
}

#[tokio::test]
async fn test_restock_creates_row_lazily_and_audits() {
    let fx = Fixture::new().await;
    let (_, variant) = fx.product("Oud Oil", "OUD-1", 100).await;
    let outlet = fx.other_store_front().await;
    let key = StockKey::new(variant, outlet.id);

    let missing = fx.inventory.get(key).await.unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);

    let outcome = fx
        .inventory
        .adjust(
            AdjustInventoryRequest {
                product_variant_id: variant,
                store_front_id: outlet.id,
                adjustment: 10,
                reason: AdjustmentReason::Restock,
                notes: String::new(),
            },
            ADMIN,
        )
        .await
        .unwrap();
    assert_eq!(outcome.inventory.record.quantity, 10);
    assert_eq!(outcome.inventory.record.reserved, 0);

    let history = fx.inventory.history(outcome.inventory.record.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].previous_quantity, 0);
    assert_eq!(history[0].new_quantity, 10);
    assert_eq!(history[0].delta, 10);
    assert_eq!(history[0].adjusted_by, ADMIN);
}

#[tokio::test]
async fn test_negative_stock_is_rejected_without_audit() {
    let fx = Fixture::new().await;
    let (_, variant) = fx.product("Oud Oil", "OUD-1", 100).await;
    fx.stock(variant, 5).await;

    let err = fx
        .inventory
        .adjust(adjust(&fx, variant, -10, AdjustmentReason::Correction), ADMIN)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NegativeStock);
    assert_eq!(fx.balance(variant).await, (5, 0));

    let record = fx.record(variant).await;
    assert_eq!(fx.inventory.history(record.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_adjust_below_reserved_is_negative_stock() {
    let fx = Fixture::new().await;
    let (_, variant) = fx.product("Oud Oil", "OUD-1", 100).await;
    fx.stock(variant, 5).await;
    fx.orders.create(fx.order_request(&[(variant, 4)]), ADMIN).await.unwrap();

    let err = fx
        .inventory
        .adjust(adjust(&fx, variant, -2, AdjustmentReason::Correction), ADMIN)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NegativeStock);
    assert_eq!(fx.balance(variant).await, (5, 4));

    let record = fx.record(variant).await;
    assert_eq!(fx.inventory.history(record.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_zero_adjustment_is_audited() {
    let fx = Fixture::new().await;
    let (_, variant) = fx.product("Oud Oil", "OUD-1", 100).await;
    fx.stock(variant, 4).await;

    fx.inventory
        .adjust(adjust(&fx, variant, 0, AdjustmentReason::Correction), ADMIN)
        .await
        .unwrap();
    let record = fx.record(variant).await;
    let history = fx.inventory.history(record.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].delta, 0);
    assert_eq!(history[0].previous_quantity, 4);
    assert_eq!(history[0].new_quantity, 4);
}

#[tokio::test]
async fn test_create_order_reserves_stock() {
    let fx = Fixture::new().await;
    let (_, variant) = fx.product("Oud Oil", "OUD-1", 100).await;
    fx.stock(variant, 10).await;

    let detail = fx.orders.create(fx.order_request(&[(variant, 3)]), ADMIN).await.unwrap();
    assert_eq!(fx.balance(variant).await, (10, 3));
    assert_eq!(detail.order.subtotal, Money::from_major(300));
    assert_eq!(detail.order.total_amount, Money::from_major(300));
    assert_eq!(detail.order.order_status, OrderStatus::PendingPayment);
    assert_eq!(detail.order.payment_status, PaymentStatus::Unpaid);
    assert_eq!(detail.order.fulfillment_status, FulfillmentStatus::Unfulfilled);
    assert!(detail.order.order_number.starts_with("ORD-"));
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].unit_price, Money::from_major(100));
    assert_eq!(detail.items[0].sku, "OUD-1");

    let stored = fx.orders.get(detail.order.id).await.unwrap();
    assert_eq!(stored, detail);
}

#[tokio::test]
async fn test_create_order_totals_include_charges() {
    let fx = Fixture::new().await;
    let (_, variant) = fx.product("Oud Oil", "OUD-1", 100).await;
    fx.stock(variant, 10).await;

    let mut request = fx.order_request(&[(variant, 2)]);
    request.shipping_amount = Money::from_major(25);
    request.tax_amount = Money::from_major(30);
    request.discount_amount = Money::from_major(5);
    let detail = fx.orders.create(request, ADMIN).await.unwrap();
    assert_eq!(detail.order.subtotal, Money::from_major(200));
    assert_eq!(detail.order.total_amount, Money::from_major(250));
}

#[tokio::test]
async fn test_insufficient_stock_rolls_back_every_line() {
    let fx = Fixture::new().await;
    let (_, first) = fx.product("Oud Oil", "OUD-1", 100).await;
    let (_, second) = fx.product("Musk", "MUSK-1", 40).await;
    fx.stock(first, 10).await;
    fx.stock(second, 1).await;

    let err = fx
        .orders
        .create(fx.order_request(&[(first, 3), (second, 2)]), ADMIN)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientStock);
    assert_eq!(fx.balance(first).await, (10, 0));
    assert_eq!(fx.balance(second).await, (1, 0));
    assert!(fx.orders.list(OrderFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancel_releases_and_is_idempotent() {
    let fx = Fixture::new().await;
    let (_, variant) = fx.product("Oud Oil", "OUD-1", 100).await;
    fx.stock(variant, 10).await;
    let order = fx.orders.create(fx.order_request(&[(variant, 3)]), ADMIN).await.unwrap();

    let cancelled = fx.orders.cancel(order.order.id, ADMIN).await.unwrap();
    assert_eq!(cancelled.order.order_status, OrderStatus::Cancelled);
    assert_eq!(fx.balance(variant).await, (10, 0));

    let again = fx.orders.cancel(order.order.id, ADMIN).await.unwrap();
    assert_eq!(again.order.order_status, OrderStatus::Cancelled);
    assert_eq!(fx.balance(variant).await, (10, 0));
}

#[tokio::test]
async fn test_confirm_deducts_and_blocks_cancel() {
    let fx = Fixture::new().await;
    let (_, variant) = fx.product("Oud Oil", "OUD-1", 100).await;
    fx.stock(variant, 10).await;
    let order = fx.orders.create(fx.order_request(&[(variant, 3)]), ADMIN).await.unwrap();

    let confirmed = fx.orders.confirm(order.order.id, ADMIN).await.unwrap();
    assert_eq!(confirmed.order.order_status, OrderStatus::Confirmed);
    assert_eq!(fx.balance(variant).await, (7, 0));

    let record = fx.record(variant).await;
    let history = fx.inventory.history(record.id).await.unwrap();
    assert_eq!(history[0].reason, AdjustmentReason::Sale);
    assert_eq!(history[0].delta, -3);
    assert_eq!(history[0].previous_quantity, 10);
    assert_eq!(history[0].new_quantity, 7);

    let err = fx.orders.cancel(order.order.id, ADMIN).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalTransition);
    assert_eq!(fx.balance(variant).await, (7, 0));
}

#[tokio::test]
async fn test_reconfirm_is_a_noop() {
    let fx = Fixture::new().await;
    let (_, variant) = fx.product("Oud Oil", "OUD-1", 100).await;
    fx.stock(variant, 10).await;
    let order = fx.orders.create(fx.order_request(&[(variant, 3)]), ADMIN).await.unwrap();

    fx.orders.confirm(order.order.id, ADMIN).await.unwrap();
    let again = fx.orders.confirm(order.order.id, ADMIN).await.unwrap();
    assert_eq!(again.order.order_status, OrderStatus::Confirmed);
    assert_eq!(fx.balance(variant).await, (7, 0));

    let record = fx.record(variant).await;
    let sales = fx
        .inventory
        .history(record.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|a| a.reason == AdjustmentReason::Sale)
        .count();
    assert_eq!(sales, 1);
}

#[tokio::test]
async fn test_confirm_cancelled_order_is_illegal() {
    let fx = Fixture::new().await;
    let (_, variant) = fx.product("Oud Oil", "OUD-1", 100).await;
    fx.stock(variant, 10).await;
    let order = fx.orders.create(fx.order_request(&[(variant, 3)]), ADMIN).await.unwrap();
    fx.orders.cancel(order.order.id, ADMIN).await.unwrap();

    let err = fx.orders.confirm(order.order.id, ADMIN).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalTransition);
    assert_eq!(fx.balance(variant).await, (10, 0));
}

#[tokio::test]
async fn test_update_resizes_line_without_repricing() {
    let fx = Fixture::new().await;
    let (product, variant) = fx.product("Oud Oil", "OUD-1", 100).await;
    fx.stock(variant, 10).await;
    let order = fx.orders.create(fx.order_request(&[(variant, 3)]), ADMIN).await.unwrap();
    let line = order.items[0].id;

    // A later price change must not leak into the existing line.
    let detail = fx.catalog.get_product(product).await.unwrap();
    let mut repriced = common::variant_input("OUD-1", 150);
    repriced.id = Some(variant);
    fx.catalog
        .update_variant(detail.product.id, variant, repriced)
        .await
        .unwrap();

    let widened = fx
        .orders
        .update(
            order.order.id,
            UpdateOrderRequest {
                items: vec![OrderItemUpdate {
                    id: line,
                    product_variant_id: variant,
                    quantity: 5,
                    is_removed: false,
                }],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(fx.balance(variant).await, (10, 5));
    assert_eq!(widened.order.subtotal, Money::from_major(500));
    assert_eq!(widened.items[0].unit_price, Money::from_major(100));

    let shrunk = fx
        .orders
        .update(
            order.order.id,
            UpdateOrderRequest {
                items: vec![OrderItemUpdate {
                    id: line,
                    product_variant_id: variant,
                    quantity: 1,
                    is_removed: false,
                }],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(fx.balance(variant).await, (10, 1));
    assert_eq!(shrunk.order.subtotal, Money::from_major(100));
}

#[tokio::test]
async fn test_update_adds_and_removes_lines() {
    let fx = Fixture::new().await;
    let (_, first) = fx.product("Oud Oil", "OUD-1", 100).await;
    let (_, second) = fx.product("Musk", "MUSK-1", 40).await;
    fx.stock(first, 10).await;
    fx.stock(second, 10).await;
    let order = fx.orders.create(fx.order_request(&[(first, 2)]), ADMIN).await.unwrap();
    let first_line = order.items[0].id;

    let detail = fx
        .orders
        .update(
            order.order.id,
            UpdateOrderRequest {
                notes: Some("gift wrap".to_string()),
                shipping_amount: Some(Money::from_major(20)),
                items: vec![
                    OrderItemUpdate {
                        id: OrderItemId::default(),
                        product_variant_id: second,
                        quantity: 4,
                        is_removed: false,
                    },
                    OrderItemUpdate {
                        id: first_line,
                        product_variant_id: first,
                        quantity: 2,
                        is_removed: true,
                    },
                ],
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(fx.balance(first).await, (10, 0));
    assert_eq!(fx.balance(second).await, (10, 4));
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].variant_id, second);
    assert_eq!(detail.order.subtotal, Money::from_major(160));
    assert_eq!(detail.order.total_amount, Money::from_major(180));
    assert_eq!(detail.order.notes, "gift wrap");
}

#[tokio::test]
async fn test_update_cannot_empty_order() {
    let fx = Fixture::new().await;
    let (_, variant) = fx.product("Oud Oil", "OUD-1", 100).await;
    fx.stock(variant, 10).await;
    let order = fx.orders.create(fx.order_request(&[(variant, 2)]), ADMIN).await.unwrap();

    let err = fx
        .orders
        .update(
            order.order.id,
            UpdateOrderRequest {
                items: vec![OrderItemUpdate {
                    id: order.items[0].id,
                    product_variant_id: variant,
                    quantity: 2,
                    is_removed: true,
                }],
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(fx.balance(variant).await, (10, 2));
}

#[tokio::test]
async fn test_update_rejected_after_confirm() {
    let fx = Fixture::new().await;
    let (_, variant) = fx.product("Oud Oil", "OUD-1", 100).await;
    fx.stock(variant, 10).await;
    let order = fx.orders.create(fx.order_request(&[(variant, 2)]), ADMIN).await.unwrap();
    fx.orders.confirm(order.order.id, ADMIN).await.unwrap();

    let err = fx
        .orders
        .update(
            order.order.id,
            UpdateOrderRequest {
                notes: Some("late edit".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalTransition);
}

#[tokio::test]
async fn test_full_lifecycle_to_completed() {
    let fx = Fixture::new().await;
    let (_, variant) = fx.product("Oud Oil", "OUD-1", 100).await;
    fx.stock(variant, 10).await;
    let order = fx.orders.create(fx.order_request(&[(variant, 2)]), ADMIN).await.unwrap();
    let id = order.order.id;

    let paid = fx.orders.mark_paid(id, ADMIN).await.unwrap();
    assert_eq!(paid.order.order_status, OrderStatus::Paid);
    assert_eq!(paid.order.payment_status, PaymentStatus::Paid);
    assert_eq!(fx.balance(variant).await, (10, 2));

    fx.orders.confirm(id, ADMIN).await.unwrap();
    let shipped = fx.orders.mark_out_for_delivery(id, ADMIN).await.unwrap();
    assert_eq!(shipped.order.fulfillment_status, FulfillmentStatus::OutForDelivery);
    let again = fx.orders.mark_out_for_delivery(id, ADMIN).await.unwrap_err();
    assert_eq!(again.kind(), ErrorKind::IllegalTransition);

    let fulfilled = fx.orders.fulfill(id, ADMIN).await.unwrap();
    assert_eq!(fulfilled.order.order_status, OrderStatus::Fulfilled);

    let completed = fx.orders.complete(id, ADMIN).await.unwrap();
    assert_eq!(completed.order.order_status, OrderStatus::Completed);
    assert_eq!(completed.order.payment_status, PaymentStatus::Paid);
    assert_eq!(completed.order.fulfillment_status, FulfillmentStatus::Fulfilled);
    fx.orders.complete(id, ADMIN).await.unwrap();

    assert_eq!(fx.balance(variant).await, (8, 0));
}

#[tokio::test]
async fn test_list_orders_filters() {
    let fx = Fixture::new().await;
    let (_, variant) = fx.product("Oud Oil", "OUD-1", 100).await;
    fx.stock(variant, 10).await;

    let first = fx.orders.create(fx.order_request(&[(variant, 1)]), ADMIN).await.unwrap();
    let mut request = fx.order_request(&[(variant, 1)]);
    request.customer_name = "Khalid Omar".to_string();
    let second = fx.orders.create(request, ADMIN).await.unwrap();
    fx.orders.cancel(first.order.id, ADMIN).await.unwrap();

    let all = fx.orders.list(OrderFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);

    let cancelled = fx
        .orders
        .list(OrderFilter {
            status: Some("cancelled".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].id, first.order.id);

    let searched = fx
        .orders
        .list(OrderFilter {
            search: Some("khalid".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(searched.len(), 1);
    assert_eq!(searched[0].id, second.order.id);
}

#[tokio::test]
async fn test_order_meta_lists_reference_data() {
    let fx = Fixture::new().await;
    let OrderMeta {
        order_statuses,
        payment_statuses,
        fulfillment_statuses,
        currencies,
    } = fx.orders.meta().await.unwrap();
    assert_eq!(order_statuses.len(), OrderStatus::ALL.len());
    assert_eq!(payment_statuses.len(), PaymentStatus::ALL.len());
    assert_eq!(fulfillment_statuses.len(), FulfillmentStatus::ALL.len());
    assert!(currencies.iter().any(|c| c.code == "SAR"));
}

#[tokio::test]
async fn test_activation_requires_inventory() {
    let fx = Fixture::new().await;
    let (product, variant) = fx.product("Oud Oil", "OUD-1", 100).await;

    let err = fx
        .catalog
        .change_status(product, ProductStatus::Active)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalTransition);
    assert!(err.to_string().contains("requires inventory"));

    fx.stock(variant, 1).await;
    let active = fx.catalog.change_status(product, ProductStatus::Active).await.unwrap();
    assert_eq!(active.status, ProductStatus::Active);
    assert!(active.is_published);

    let listed = fx.catalog.storefront_products(fx.store_front.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    let by_slug = fx
        .catalog
        .storefront_product(fx.store_front.id, "oud-oil")
        .await
        .unwrap();
    assert_eq!(by_slug.product.id, product);

    let hidden = fx.catalog.change_status(product, ProductStatus::Inactive).await.unwrap();
    assert!(!hidden.is_published);
    assert!(fx.catalog.storefront_products(fx.store_front.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_activation_requires_active_variant() {
    let fx = Fixture::new().await;
    let (product, variant) = fx.product("Oud Oil", "OUD-1", 100).await;
    fx.stock(variant, 3).await;
    let mut input = common::variant_input("OUD-1", 100);
    input.is_active = false;
    fx.catalog.update_variant(product, variant, input).await.unwrap();

    let err = fx
        .catalog
        .change_status(product, ProductStatus::Active)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("active variant"));
}

#[tokio::test]
async fn test_slug_is_unique_per_storefront() {
    let fx = Fixture::new().await;
    fx.product("Oud Oil", "OUD-1", 100).await;
    let outlet = fx.other_store_front().await;

    let clash = fx
        .catalog
        .create_product(
            ProductInput {
                name_en: "Oud  oil".to_string(),
                name_ar: "عود".to_string(),
                store_front_ids: vec![fx.store_front.id],
                ..Default::default()
            },
            ADMIN,
        )
        .await
        .unwrap_err();
    assert_eq!(clash.kind(), ErrorKind::Duplicate);

    let elsewhere = fx
        .catalog
        .create_product(
            ProductInput {
                name_en: "Oud Oil".to_string(),
                name_ar: "عود".to_string(),
                store_front_ids: vec![outlet.id],
                ..Default::default()
            },
            ADMIN,
        )
        .await
        .unwrap();
    assert_eq!(elsewhere.product.slug, "oud-oil");
}

#[tokio::test]
async fn test_deleted_product_frees_slug_and_sku() {
    let fx = Fixture::new().await;
    let (product, _) = fx.product("Oud Oil", "OUD-1", 100).await;
    fx.catalog.delete_product(product).await.unwrap();

    let err = fx.catalog.get_product(product).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let (again, _) = fx.product("Oud Oil", "OUD-1", 100).await;
    assert_ne!(again, product);
}

#[tokio::test]
async fn test_duplicate_sku_rejected() {
    let fx = Fixture::new().await;
    let (product, _) = fx.product("Oud Oil", "OUD-1", 100).await;
    let err = fx
        .catalog
        .create_variant(product, common::variant_input("OUD-1", 90), ADMIN)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Duplicate);
}

#[tokio::test]
async fn test_create_variant_with_initial_stock_is_audited() {
    let fx = Fixture::new().await;
    let (product, _) = fx.product("Oud Oil", "OUD-1", 100).await;
    let mut input = common::variant_input("OUD-2", 120);
    input.stock = Some(6);
    let variant = fx.catalog.create_variant(product, input, ADMIN).await.unwrap();

    assert_eq!(fx.balance(variant.id).await, (6, 0));
    let record = fx.record(variant.id).await;
    let history = fx.inventory.history(record.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].reason, AdjustmentReason::Restock);
}

#[tokio::test]
async fn test_bulk_set_skips_unchanged_rows() {
    let fx = Fixture::new().await;
    let (_, first) = fx.product("Oud Oil", "OUD-1", 100).await;
    let (_, second) = fx.product("Musk", "MUSK-1", 40).await;
    fx.stock(first, 5).await;
    fx.stock(second, 5).await;
    let first_row = fx.record(first).await;
    let second_row = fx.record(second).await;

    let out = fx
        .inventory
        .bulk_set(
            BulkInventoryRequest {
                items: vec![
                    BulkInventoryItem {
                        inventory_id: first_row.id,
                        new_quantity: 12,
                        reason: AdjustmentReason::Correction,
                        notes: String::new(),
                    },
                    BulkInventoryItem {
                        inventory_id: second_row.id,
                        new_quantity: 5,
                        reason: AdjustmentReason::Correction,
                        notes: String::new(),
                    },
                ],
            },
            ADMIN,
        )
        .await
        .unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(fx.balance(first).await, (12, 0));
    assert_eq!(fx.inventory.history(first_row.id).await.unwrap().len(), 2);
    assert_eq!(fx.inventory.history(second_row.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_bulk_set_below_reserved_rolls_back() {
    let fx = Fixture::new().await;
    let (_, first) = fx.product("Oud Oil", "OUD-1", 100).await;
    let (_, second) = fx.product("Musk", "MUSK-1", 40).await;
    fx.stock(first, 5).await;
    fx.stock(second, 5).await;
    fx.orders.create(fx.order_request(&[(second, 4)]), ADMIN).await.unwrap();
    let first_row = fx.record(first).await;
    let second_row = fx.record(second).await;

    let err = fx
        .inventory
        .bulk_set(
            BulkInventoryRequest {
                items: vec![
                    BulkInventoryItem {
                        inventory_id: first_row.id,
                        new_quantity: 9,
                        reason: AdjustmentReason::Correction,
                        notes: String::new(),
                    },
                    BulkInventoryItem {
                        inventory_id: second_row.id,
                        new_quantity: 2,
                        reason: AdjustmentReason::Correction,
                        notes: String::new(),
                    },
                ],
            },
            ADMIN,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NegativeStock);
    assert_eq!(fx.balance(first).await, (5, 0));
    assert_eq!(fx.balance(second).await, (5, 4));
}

#[tokio::test]
async fn test_threshold_drives_low_stock_view() {
    let fx = Fixture::new().await;
    let (_, first) = fx.product("Oud Oil", "OUD-1", 100).await;
    let (_, second) = fx.product("Musk", "MUSK-1", 40).await;
    fx.stock(first, 20).await;
    fx.stock(second, 20).await;

    assert!(fx.inventory.low_stock(fx.store_front.id).await.unwrap().is_empty());

    let status = fx
        .inventory
        .set_threshold(ThresholdRequest {
            product_variant_id: second,
            store_front_id: fx.store_front.id,
            low_stock_threshold: 25,
        })
        .await
        .unwrap();
    assert!(status.is_low_stock);

    let low = fx.inventory.low_stock(fx.store_front.id).await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].record.variant_id, second);
    assert_eq!(fx.inventory.list(fx.store_front.id, false).await.unwrap().len(), 2);

    let record = fx.record(second).await;
    assert_eq!(fx.inventory.history(record.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_restock_keeps_reservations() {
    let fx = Fixture::new().await;
    let (product, variant) = fx.product("Oud Oil", "OUD-1", 100).await;
    fx.stock(variant, 5).await;
    fx.orders.create(fx.order_request(&[(variant, 2)]), ADMIN).await.unwrap();

    let key = StockKey::new(variant, fx.store_front.id);
    let mut tx = fx.store.begin().await.unwrap();
    let record = InventoryLedger::restock(tx.as_mut(), key, 3, ADMIN, "customer return", chrono::Utc::now())
        .await
        .unwrap();
    assert!(InventoryLedger::has_any_stock(tx.as_mut(), product).await.unwrap());
    tx.commit().await.unwrap();

    assert_eq!((record.quantity, record.reserved), (8, 2));
    assert_eq!(fx.balance(variant).await, (8, 2));
    let history = fx.inventory.history(record.id).await.unwrap();
    assert_eq!(history[0].reason, AdjustmentReason::Return);
    assert_eq!(history[0].delta, 3);
}

fn oud_input(fx: &Fixture, attribute_type: Option<&str>, variants: Vec<VariantInput>) -> ProductInput {
    ProductInput {
        name_en: "Oud Oil".to_string(),
        name_ar: "عود".to_string(),
        attribute_type: attribute_type.map(str::to_string),
        store_front_ids: vec![fx.store_front.id],
        variants,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_simple_product_cannot_turn_typed_under_plain_variants() {
    let fx = Fixture::new().await;
    let (product, variant) = fx.product("Oud Oil", "OUD-1", 100).await;

    let err = fx
        .catalog
        .update_product(product, oud_input(&fx, Some("size"), vec![]), ADMIN)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let detail = fx.catalog.get_product(product).await.unwrap();
    assert_eq!(detail.product.attribute_type, None);
    assert_eq!(detail.variants[0].attribute_value, "");

    let mut resized = common::variant_input("OUD-1", 100);
    resized.id = Some(variant);
    resized.attribute_value = "50ml".to_string();
    let typed = fx
        .catalog
        .update_product(product, oud_input(&fx, Some("size"), vec![resized]), ADMIN)
        .await
        .unwrap();
    assert_eq!(typed.product.attribute_type.as_deref(), Some("size"));
    assert_eq!(typed.variants[0].attribute_value, "50ml");
}

#[tokio::test]
async fn test_typed_product_cannot_turn_simple_under_valued_variants() {
    let fx = Fixture::new().await;
    let mut sized = common::variant_input("OUD-50", 100);
    sized.attribute_value = "50ml".to_string();
    let created = fx
        .catalog
        .create_product(oud_input(&fx, Some("size"), vec![sized]), ADMIN)
        .await
        .unwrap();

    let err = fx
        .catalog
        .update_product(created.product.id, oud_input(&fx, None, vec![]), ADMIN)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let detail = fx.catalog.get_product(created.product.id).await.unwrap();
    assert_eq!(detail.product.attribute_type.as_deref(), Some("size"));
}
