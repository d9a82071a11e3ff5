//! The order lifecycle engine.
//!
//! Each operation is one transaction that couples the order's status change
//! with the inventory movements it implies. Rows touched by an operation are
//! locked in ascending key order before any of them is changed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::catalog::{StockKey, StoreFront};
use crate::clock::Clock;
use crate::error::CommerceError;
use crate::ids::{AdminId, OrderId, VariantId};
use crate::money::{Currency, Money, DEFAULT_CURRENCY_CODE};
use crate::orders::{
    plan_line_changes, CreateOrderRequest, LineChange, Order, OrderDetail, OrderEvent,
    OrderFilter, OrderItem, OrderMeta, OrderNumberGenerator, Plan, StatusKind, StockEffect,
    UpdateOrderRequest,
};
use crate::orders::{FulfillmentStatus, OrderStatus, PaymentStatus};
use crate::services::{InventoryLedger, TxRunner};
use crate::store::StoreTx;

/// Attempts at drawing an unused order number before giving up.
const ORDER_NUMBER_ATTEMPTS: usize = 5;

/// Creates, edits and transitions orders.
#[derive(Clone)]
pub struct OrderEngine {
    runner: TxRunner,
    clock: Arc<dyn Clock>,
    numbers: Arc<OrderNumberGenerator>,
}

impl OrderEngine {
    pub fn new(runner: TxRunner, clock: Arc<dyn Clock>) -> Self {
        Self {
            runner,
            clock,
            numbers: Arc::new(OrderNumberGenerator::new()),
        }
    }

    /// Place an order, reserving stock for every line.
    pub async fn create(
        &self,
        req: CreateOrderRequest,
        actor: AdminId,
    ) -> Result<OrderDetail, CommerceError> {
        req.validate()?;
        let now = self.clock.now();
        let detail = transaction!(self.runner, "create_order", |tx| {
            let store = tx
                .store_front(req.store_front_id)
                .await?
                .ok_or_else(|| CommerceError::not_found("store front", req.store_front_id))?;
            require_status(tx, StatusKind::Order, OrderStatus::PendingPayment.as_str()).await?;
            require_status(tx, StatusKind::Payment, PaymentStatus::Unpaid.as_str()).await?;
            require_status(tx, StatusKind::Fulfillment, FulfillmentStatus::Unfulfilled.as_str())
                .await?;
            let currency = resolve_currency(tx, &store).await?;

            let mut items = Vec::with_capacity(req.items.len());
            for line in &req.items {
                items.push(snapshot_line(tx, line.product_variant_id, line.quantity).await?);
            }

            InventoryLedger::lock_all(
                tx,
                items.iter().map(|item| StockKey::new(item.variant_id, store.id)),
                now,
            )
            .await?;
            for item in &items {
                InventoryLedger::reserve(tx, StockKey::new(item.variant_id, store.id), item.quantity, now)
                    .await?;
            }

            let order_number = self.allocate_number(tx, now).await?;
            let mut order = Order {
                id: OrderId::default(),
                store_front_id: store.id,
                order_number,
                order_status: OrderStatus::PendingPayment,
                payment_status: PaymentStatus::Unpaid,
                fulfillment_status: FulfillmentStatus::Unfulfilled,
                currency_id: currency.id,
                customer_name: req.customer_name.clone(),
                customer_email: req.customer_email.clone(),
                customer_phone: req.customer_phone.clone(),
                subtotal: Money::zero(),
                discount_amount: req.discount_amount,
                tax_amount: req.tax_amount,
                shipping_amount: req.shipping_amount,
                total_amount: Money::zero(),
                notes: req.notes.clone(),
                created_by_id: actor,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            order.recompute_totals(&items)?;

            let order = tx.insert_order(order).await?;
            for item in &mut items {
                item.order_id = order.id;
            }
            let items = tx.insert_order_items(items).await?;
            Ok(OrderDetail { order, items })
        })?;
        info!(
            order_id = %detail.order.id,
            order_number = %detail.order.order_number,
            store_front_id = %detail.order.store_front_id,
            lines = detail.items.len(),
            total = %detail.order.total_amount,
            "order created"
        );
        Ok(detail)
    }

    /// Edit an order before confirmation.
    pub async fn update(
        &self,
        id: OrderId,
        req: UpdateOrderRequest,
    ) -> Result<OrderDetail, CommerceError> {
        req.validate()?;
        let now = self.clock.now();
        let detail = transaction!(self.runner, "update_order", |tx| {
            let mut order = lock_order(tx, id).await?;
            if !order.order_status.is_editable() {
                return Err(CommerceError::IllegalTransition(format!(
                    "cannot update order with status {}",
                    order.order_status.as_str()
                )));
            }
            let existing = tx.order_items(id).await?;
            let changes = plan_line_changes(&existing, &req.items)?;
            let store = order.store_front_id;

            InventoryLedger::lock_all(
                tx,
                changes.iter().map(|c| StockKey::new(c.variant_id(), store)),
                now,
            )
            .await?;

            for change in &changes {
                let key = StockKey::new(change.variant_id(), store);
                match change {
                    LineChange::Insert { variant_id, quantity } => {
                        let mut item = snapshot_line(tx, *variant_id, *quantity).await?;
                        InventoryLedger::reserve(tx, key, *quantity, now).await?;
                        item.order_id = id;
                        tx.insert_order_items(vec![item]).await?;
                    }
                    LineChange::Remove { item_id, quantity, .. } => {
                        InventoryLedger::release(tx, key, *quantity, now).await?;
                        tx.delete_order_item(*item_id).await?;
                    }
                    LineChange::Resize { item_id, to, .. } => {
                        let delta = change.reservation_delta();
                        if delta > 0 {
                            InventoryLedger::reserve(tx, key, delta, now).await?;
                        } else {
                            InventoryLedger::release(tx, key, -delta, now).await?;
                        }
                        let mut item = existing
                            .iter()
                            .find(|item| item.id == *item_id)
                            .cloned()
                            .ok_or_else(|| CommerceError::not_found("order item", item_id))?;
                        item.resize(*to)?;
                        tx.update_order_item(&item).await?;
                    }
                }
            }

            req.apply_header(&mut order);
            let items = tx.order_items(id).await?;
            order.recompute_totals(&items)?;
            order.updated_at = now;
            tx.update_order(&order).await?;
            debug!(order_id = %id, changes = changes.len(), "order lines updated");
            Ok(OrderDetail { order, items })
        })?;
        info!(order_id = %id, subtotal = %detail.order.subtotal, total = %detail.order.total_amount, "order updated");
        Ok(detail)
    }

    /// Deduct reserved stock. A no-op on already confirmed orders.
    pub async fn confirm(&self, id: OrderId, actor: AdminId) -> Result<OrderDetail, CommerceError> {
        self.transition(id, OrderEvent::Confirm, actor).await
    }

    /// Release reserved stock. A no-op on cancelled orders.
    pub async fn cancel(&self, id: OrderId, actor: AdminId) -> Result<OrderDetail, CommerceError> {
        self.transition(id, OrderEvent::Cancel, actor).await
    }

    pub async fn mark_paid(&self, id: OrderId, actor: AdminId) -> Result<OrderDetail, CommerceError> {
        self.transition(id, OrderEvent::MarkPaid, actor).await
    }

    pub async fn mark_out_for_delivery(
        &self,
        id: OrderId,
        actor: AdminId,
    ) -> Result<OrderDetail, CommerceError> {
        self.transition(id, OrderEvent::MarkOutForDelivery, actor).await
    }

    pub async fn fulfill(&self, id: OrderId, actor: AdminId) -> Result<OrderDetail, CommerceError> {
        self.transition(id, OrderEvent::Fulfill, actor).await
    }

    pub async fn complete(&self, id: OrderId, actor: AdminId) -> Result<OrderDetail, CommerceError> {
        self.transition(id, OrderEvent::Complete, actor).await
    }

    pub async fn get(&self, id: OrderId) -> Result<OrderDetail, CommerceError> {
        transaction!(self.runner, "get_order", |tx| {
            let order = tx
                .order(id)
                .await?
                .ok_or_else(|| CommerceError::not_found("order", id))?;
            let items = tx.order_items(id).await?;
            Ok(OrderDetail { order, items })
        })
    }

    /// Orders matching `filter`, newest first.
    pub async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, CommerceError> {
        transaction!(self.runner, "list_orders", |tx| { Ok(tx.orders(&filter).await?) })
    }

    /// Status reference lists and currencies.
    pub async fn meta(&self) -> Result<OrderMeta, CommerceError> {
        transaction!(self.runner, "order_meta", |tx| {
            Ok(OrderMeta {
                order_statuses: tx.statuses(StatusKind::Order).await?,
                payment_statuses: tx.statuses(StatusKind::Payment).await?,
                fulfillment_statuses: tx.statuses(StatusKind::Fulfillment).await?,
                currencies: tx.currencies().await?,
            })
        })
    }

    async fn transition(
        &self,
        id: OrderId,
        event: OrderEvent,
        actor: AdminId,
    ) -> Result<OrderDetail, CommerceError> {
        let now = self.clock.now();
        let (detail, applied) = transaction!(self.runner, "order_transition", |tx| {
            let mut order = lock_order(tx, id).await?;
            let items = tx.order_items(id).await?;
            let transition = match event.plan(order.order_status, order.fulfillment_status)? {
                Plan::NoOp => return Ok((OrderDetail { order, items }, false)),
                Plan::Apply(transition) => transition,
            };

            if transition.stock != StockEffect::None {
                let store = order.store_front_id;
                InventoryLedger::lock_all(
                    tx,
                    items.iter().map(|item| StockKey::new(item.variant_id, store)),
                    now,
                )
                .await?;
                let notes = format!("order {}", order.order_number);
                for item in &items {
                    let key = StockKey::new(item.variant_id, store);
                    match transition.stock {
                        StockEffect::Release => {
                            InventoryLedger::release(tx, key, item.quantity, now).await?;
                        }
                        StockEffect::Deduct => {
                            InventoryLedger::confirm_deduct(tx, key, item.quantity, actor, &notes, now)
                                .await?;
                        }
                        StockEffect::None => {}
                    }
                }
            }

            if let Some(status) = transition.order_status {
                require_status(tx, StatusKind::Order, status.as_str()).await?;
                order.order_status = status;
            }
            if let Some(status) = transition.payment_status {
                require_status(tx, StatusKind::Payment, status.as_str()).await?;
                order.payment_status = status;
            }
            if let Some(status) = transition.fulfillment_status {
                require_status(tx, StatusKind::Fulfillment, status.as_str()).await?;
                order.fulfillment_status = status;
            }
            order.updated_at = now;
            tx.update_order(&order).await?;
            Ok((OrderDetail { order, items }, true))
        })?;

        if applied {
            info!(
                order_id = %id,
                event = event.as_str(),
                status = detail.order.order_status.as_str(),
                payment = detail.order.payment_status.as_str(),
                fulfillment = detail.order.fulfillment_status.as_str(),
                "order transitioned"
            );
        } else {
            debug!(order_id = %id, event = event.as_str(), "order already in target state");
        }
        Ok(detail)
    }

    async fn allocate_number(
        &self,
        tx: &mut dyn StoreTx,
        now: DateTime<Utc>,
    ) -> Result<String, CommerceError> {
        for _ in 0..ORDER_NUMBER_ATTEMPTS {
            let number = self.numbers.next(now);
            if !tx.order_number_in_use(&number).await? {
                return Ok(number);
            }
            debug!(order_number = %number, "order number collision, retrying");
        }
        Err(CommerceError::Conflict("could not allocate a unique order number".into()))
    }
}

async fn lock_order(tx: &mut dyn StoreTx, id: OrderId) -> Result<Order, CommerceError> {
    tx.lock_order(id)
        .await?
        .ok_or_else(|| CommerceError::not_found("order", id))
}

async fn require_status(
    tx: &mut dyn StoreTx,
    kind: StatusKind,
    slug: &str,
) -> Result<(), CommerceError> {
    if tx.status(kind, slug).await?.is_none() {
        return Err(CommerceError::NotFound(format!("{} status {}", kind.as_str(), slug)));
    }
    Ok(())
}

/// Storefront currency, else the default currency.
async fn resolve_currency(
    tx: &mut dyn StoreTx,
    store: &StoreFront,
) -> Result<Currency, CommerceError> {
    for code in store.currency_candidates() {
        if let Some(currency) = tx.currency_by_code(code).await? {
            return Ok(currency);
        }
    }
    Err(CommerceError::NotFound(format!("currency {}", DEFAULT_CURRENCY_CODE)))
}

async fn snapshot_line(
    tx: &mut dyn StoreTx,
    variant_id: VariantId,
    quantity: i64,
) -> Result<OrderItem, CommerceError> {
    let variant = tx
        .variant(variant_id)
        .await?
        .ok_or_else(|| CommerceError::not_found("variant", variant_id))?;
    let product = tx
        .product(variant.product_id)
        .await?
        .ok_or_else(|| CommerceError::not_found("product", variant.product_id))?;
    OrderItem::snapshot(&product, &variant, quantity)
}
