//! Order and order item types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{Product, Variant};
use crate::error::{CommerceError, FieldErrors};
use crate::ids::{AdminId, CurrencyId, OrderId, OrderItemId, ProductId, StoreFrontId, VariantId};
use crate::money::{Currency, Money};
use crate::orders::status::{FulfillmentStatus, OrderStatus, PaymentStatus, StatusRecord};

/// An order header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub store_front_id: StoreFrontId,
    /// Opaque, globally unique.
    pub order_number: String,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub currency_id: CurrencyId,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub tax_amount: Money,
    pub shipping_amount: Money,
    pub total_amount: Money,
    pub notes: String,
    pub created_by_id: AdminId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Order {
    /// `subtotal + shipping + tax - discount`.
    pub fn compute_total(&self) -> Result<Money, CommerceError> {
        self.subtotal
            .checked_add(self.shipping_amount)
            .and_then(|m| m.checked_add(self.tax_amount))
            .and_then(|m| m.checked_sub(self.discount_amount))
            .ok_or_else(|| CommerceError::validation("order total out of range"))
    }

    /// Recompute `subtotal` from `items` and `total` from the money components.
    pub fn recompute_totals(&mut self, items: &[OrderItem]) -> Result<(), CommerceError> {
        let mut subtotal = Money::zero();
        for item in items {
            subtotal = subtotal
                .checked_add(item.total_price)
                .ok_or_else(|| CommerceError::validation("order subtotal out of range"))?;
        }
        self.subtotal = subtotal;
        self.total_amount = self.compute_total()?;
        Ok(())
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// An order line: a frozen snapshot of the variant when the line was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    #[serde(rename = "product_variant_id")]
    pub variant_id: VariantId,
    pub sku: String,
    pub product_name_snapshot_en: String,
    pub product_name_snapshot_ar: String,
    pub unit_price: Money,
    pub cost_price: Money,
    pub quantity: i64,
    pub total_price: Money,
}

impl OrderItem {
    /// Snapshot a line for `variant` of `product` (ids assigned later).
    pub fn snapshot(
        product: &Product,
        variant: &Variant,
        quantity: i64,
    ) -> Result<Self, CommerceError> {
        let unit_price = variant.unit_price(product);
        Ok(Self {
            id: OrderItemId::default(),
            order_id: OrderId::default(),
            product_id: product.id,
            variant_id: variant.id,
            sku: variant.sku.clone(),
            product_name_snapshot_en: product.name_en.clone(),
            product_name_snapshot_ar: product.name_ar.clone(),
            unit_price,
            cost_price: variant.unit_cost(),
            quantity,
            total_price: line_total(unit_price, quantity)?,
        })
    }

    /// Change the quantity, keeping the stored unit price.
    pub fn resize(&mut self, quantity: i64) -> Result<(), CommerceError> {
        self.total_price = line_total(self.unit_price, quantity)?;
        self.quantity = quantity;
        Ok(())
    }
}

fn line_total(unit_price: Money, quantity: i64) -> Result<Money, CommerceError> {
    unit_price
        .checked_mul(quantity)
        .ok_or_else(|| CommerceError::invalid_field("quantity", "line total out of range"))
}

/// An order with its lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// One requested line of a new order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateOrderItem {
    pub product_variant_id: VariantId,
    pub quantity: i64,
}

/// Admin request to place an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateOrderRequest {
    pub store_front_id: StoreFrontId,
    pub items: Vec<CreateOrderItem>,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub shipping_amount: Money,
    #[serde(default)]
    pub tax_amount: Money,
    #[serde(default)]
    pub discount_amount: Money,
    #[serde(default)]
    pub notes: String,
}

impl CreateOrderRequest {
    pub fn validate(&self) -> Result<(), CommerceError> {
        let mut errors = FieldErrors::new();
        errors.check(self.store_front_id.get() <= 0, "store_front_id", "is required");
        errors.check(self.items.is_empty(), "items", "must contain at least one item");
        errors.check(
            self.items.iter().any(|item| item.quantity < 1),
            "quantity",
            "must be at least 1",
        );
        errors.check(
            self.items.iter().any(|item| item.product_variant_id.get() <= 0),
            "product_variant_id",
            "is required",
        );
        check_money(&mut errors, "shipping_amount", Some(self.shipping_amount));
        check_money(&mut errors, "tax_amount", Some(self.tax_amount));
        check_money(&mut errors, "discount_amount", Some(self.discount_amount));
        errors.into_result()
    }
}

fn check_money(errors: &mut FieldErrors, field: &str, amount: Option<Money>) {
    errors.check(
        amount.map(|m| m.is_negative()).unwrap_or(false),
        field,
        "must not be negative",
    );
}

/// One line of an order edit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrderItemUpdate {
    /// Existing line id, or 0 for a new line.
    #[serde(default)]
    pub id: OrderItemId,
    #[serde(default)]
    pub product_variant_id: VariantId,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub is_removed: bool,
}

/// Admin request to edit an order before confirmation.
///
/// Absent fields are left as they are. Lines not mentioned in `items` are
/// untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub shipping_amount: Option<Money>,
    #[serde(default)]
    pub tax_amount: Option<Money>,
    #[serde(default)]
    pub discount_amount: Option<Money>,
    #[serde(default)]
    pub items: Vec<OrderItemUpdate>,
}

impl UpdateOrderRequest {
    pub fn validate(&self) -> Result<(), CommerceError> {
        let mut errors = FieldErrors::new();
        check_money(&mut errors, "shipping_amount", self.shipping_amount);
        check_money(&mut errors, "tax_amount", self.tax_amount);
        check_money(&mut errors, "discount_amount", self.discount_amount);
        errors.into_result()
    }

    /// Copy the header fields present in the request onto `order`.
    pub fn apply_header(&self, order: &mut Order) {
        if let Some(name) = &self.customer_name {
            order.customer_name = name.clone();
        }
        if let Some(email) = &self.customer_email {
            order.customer_email = email.clone();
        }
        if let Some(phone) = &self.customer_phone {
            order.customer_phone = phone.clone();
        }
        if let Some(notes) = &self.notes {
            order.notes = notes.clone();
        }
        if let Some(amount) = self.shipping_amount {
            order.shipping_amount = amount;
        }
        if let Some(amount) = self.tax_amount {
            order.tax_amount = amount;
        }
        if let Some(amount) = self.discount_amount {
            order.discount_amount = amount;
        }
    }
}

/// Filters for listing orders. Empty fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrderFilter {
    #[serde(default)]
    pub store_front_id: Option<StoreFrontId>,
    /// Order status slug.
    #[serde(default)]
    pub status: Option<String>,
    /// Payment status slug.
    #[serde(default)]
    pub payment_status: Option<String>,
    /// Matched against order number and customer name, email and phone.
    #[serde(default)]
    pub search: Option<String>,
}

impl OrderFilter {
    /// Whether `order` passes every filter. Soft-deleted orders never do.
    pub fn matches(&self, order: &Order) -> bool {
        if order.is_deleted() {
            return false;
        }
        if let Some(store) = self.store_front_id {
            if order.store_front_id != store {
                return false;
            }
        }
        if let Some(slug) = non_empty(&self.status) {
            if order.order_status.as_str() != slug {
                return false;
            }
        }
        if let Some(slug) = non_empty(&self.payment_status) {
            if order.payment_status.as_str() != slug {
                return false;
            }
        }
        if let Some(term) = non_empty(&self.search) {
            let term = term.to_lowercase();
            let hit = [
                &order.order_number,
                &order.customer_name,
                &order.customer_email,
                &order.customer_phone,
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }
        true
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Reference data used by order forms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderMeta {
    pub order_statuses: Vec<StatusRecord>,
    pub payment_statuses: Vec<StatusRecord>,
    pub fulfillment_statuses: Vec<StatusRecord>,
    pub currencies: Vec<Currency>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_at(subtotal: i64) -> Order {
        let now = Utc::now();
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
            subtotal: Money::from_major(subtotal),
            discount_amount: Money::zero(),
            tax_amount: Money::zero(),
            shipping_amount: Money::zero(),
            total_amount: Money::from_major(subtotal),
            notes: String::new(),
            created_by_id: AdminId::new(1),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn item(unit: i64, qty: i64) -> OrderItem {
        OrderItem {
            id: OrderItemId::new(1),
            order_id: OrderId::new(1),
            product_id: ProductId::new(1),
            variant_id: VariantId::new(1),
            sku: "SKU".into(),
            product_name_snapshot_en: "Shirt".into(),
            product_name_snapshot_ar: "قميص".into(),
            unit_price: Money::from_major(unit),
            cost_price: Money::zero(),
            quantity: qty,
            total_price: Money::from_major(unit * qty),
        }
    }

    #[test]
    fn test_recompute_totals() {
        let mut order = order_at(0);
        order.shipping_amount = Money::from_major(20);
        order.tax_amount = Money::from_major(15);
        order.discount_amount = Money::from_major(10);
        order.recompute_totals(&[item(100, 3), item(50, 1)]).unwrap();
        assert_eq!(order.subtotal, Money::from_major(350));
        assert_eq!(order.total_amount, Money::from_major(375));
    }

    #[test]
    fn test_resize_keeps_unit_price() {
        let mut line = item(100, 3);
        line.resize(5).unwrap();
        assert_eq!(line.unit_price, Money::from_major(100));
        assert_eq!(line.total_price, Money::from_major(500));
    }

    #[test]
    fn test_create_request_validation() {
        let req: CreateOrderRequest = serde_json::from_str(
            r#"{"store_front_id":1,"items":[{"product_variant_id":2,"quantity":0}],"discount_amount":-1}"#,
        )
        .unwrap();
        let err = req.validate().unwrap_err();
        let fields = err.field_errors().unwrap();
        assert!(fields.contains_key("quantity"));
        assert!(fields.contains_key("discount_amount"));
    }

    #[test]
    fn test_empty_items_rejected() {
        let req = CreateOrderRequest {
            store_front_id: StoreFrontId::new(1),
            items: vec![],
            customer_name: String::new(),
            customer_email: String::new(),
            customer_phone: String::new(),
            shipping_amount: Money::zero(),
            tax_amount: Money::zero(),
            discount_amount: Money::zero(),
            notes: String::new(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_update_header_only_overwrites_present_fields() {
        let mut order = order_at(100);
        let req = UpdateOrderRequest {
            customer_name: Some("Omar".into()),
            shipping_amount: Some(Money::from_major(5)),
            ..Default::default()
        };
        req.apply_header(&mut order);
        assert_eq!(order.customer_name, "Omar");
        assert_eq!(order.customer_email, "sara@example.com");
        assert_eq!(order.shipping_amount, Money::from_major(5));
    }

    #[test]
    fn test_filter_matches() {
        let order = order_at(100);
        assert!(OrderFilter::default().matches(&order));
        let by_search = OrderFilter { search: Some("SARA@".into()), ..Default::default() };
        assert!(by_search.matches(&order));
        let by_status = OrderFilter { status: Some("paid".into()), ..Default::default() };
        assert!(!by_status.matches(&order));
        let by_store = OrderFilter {
            store_front_id: Some(StoreFrontId::new(2)),
            ..Default::default()
        };
        assert!(!by_store.matches(&order));

        let mut deleted = order_at(100);
        deleted.deleted_at = Some(Utc::now());
        assert!(!OrderFilter::default().matches(&deleted));
    }
}
