//! Property-based tests for order money arithmetic.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use super::order::{Order, OrderItem};
use super::status::{FulfillmentStatus, OrderStatus, PaymentStatus};
use crate::ids::{AdminId, CurrencyId, OrderId, OrderItemId, ProductId, StoreFrontId, VariantId};
use crate::money::Money;

fn order(shipping: i64, tax: i64, discount: i64) -> Order {
    let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    Order {
        id: OrderId::new(1),
        store_front_id: StoreFrontId::new(1),
        order_number: "ORD-1".into(),
        order_status: OrderStatus::PendingPayment,
        payment_status: PaymentStatus::Unpaid,
        fulfillment_status: FulfillmentStatus::Unfulfilled,
        currency_id: CurrencyId::new(1),
        customer_name: "Sara Ali".into(),
        customer_email: "sara@example.com".into(),
        customer_phone: "0500000000".into(),
        subtotal: Money::zero(),
        discount_amount: Money::from_minor(discount),
        tax_amount: Money::from_minor(tax),
        shipping_amount: Money::from_minor(shipping),
        total_amount: Money::zero(),
        notes: String::new(),
        created_by_id: AdminId::new(1),
        created_at: at,
        updated_at: at,
        deleted_at: None,
    }
}

fn line(n: usize, unit: i64, quantity: i64) -> OrderItem {
    OrderItem {
        id: OrderItemId::new(n as i64 + 1),
        order_id: OrderId::new(1),
        product_id: ProductId::new(1),
        variant_id: VariantId::new(n as i64 + 1),
        sku: format!("SKU-{n}"),
        product_name_snapshot_en: "Oud".into(),
        product_name_snapshot_ar: "عود".into(),
        unit_price: Money::from_minor(unit),
        cost_price: Money::zero(),
        quantity,
        total_price: Money::from_minor(unit * quantity),
    }
}

fn check_totals(order: &Order, items: &[OrderItem]) -> Result<(), TestCaseError> {
    let mut sum = 0i64;
    for item in items {
        prop_assert_eq!(Some(item.total_price), item.unit_price.checked_mul(item.quantity));
        sum += item.total_price.minor();
    }
    prop_assert_eq!(order.subtotal.minor(), sum);
    prop_assert_eq!(
        order.total_amount.minor(),
        order.subtotal.minor() + order.shipping_amount.minor() + order.tax_amount.minor()
            - order.discount_amount.minor()
    );
    Ok(())
}

proptest! {
    /// Totals stay balanced after the first recompute and after every resize.
    #[test]
    fn prop_totals_hold_across_resizes(
        lines in prop::collection::vec((0i64..1_000_000, 1i64..100), 1..8),
        shipping in 0i64..100_000,
        tax in 0i64..100_000,
        discount in 0i64..100_000,
        resizes in prop::collection::vec((any::<prop::sample::Index>(), 1i64..100), 0..20),
    ) {
        let mut items: Vec<OrderItem> = lines
            .iter()
            .enumerate()
            .map(|(n, &(unit, qty))| line(n, unit, qty))
            .collect();
        let mut order = order(shipping, tax, discount);
        order.recompute_totals(&items).unwrap();
        check_totals(&order, &items)?;

        for (index, quantity) in &resizes {
            let i = index.index(items.len());
            let unit = items[i].unit_price;
            items[i].resize(*quantity).unwrap();
            prop_assert_eq!(items[i].unit_price, unit);
            prop_assert_eq!(items[i].quantity, *quantity);
            order.recompute_totals(&items).unwrap();
            check_totals(&order, &items)?;
        }
    }

    /// A discount larger than everything else yields a negative total, never a wrap.
    #[test]
    fn prop_total_tracks_discount(unit in 0i64..10_000, qty in 1i64..10, discount in 0i64..1_000_000) {
        let items = vec![line(0, unit, qty)];
        let mut order = order(0, 0, discount);
        order.recompute_totals(&items).unwrap();
        prop_assert_eq!(order.total_amount.minor(), unit * qty - discount);
    }
}
