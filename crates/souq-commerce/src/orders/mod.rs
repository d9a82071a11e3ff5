//! Orders module.
//!
//! Order and line types, the status lifecycle table and line-item diffing.
//! The transactional engine that drives them lives in
//! [`crate::services::OrderEngine`].

mod edit;
mod number;
mod order;
#[cfg(test)]
mod proptest_totals;
mod status;

pub use edit::{plan_line_changes, LineChange};
pub use number::{OrderNumberGenerator, ORDER_NUMBER_PREFIX};
pub use order::{
    CreateOrderItem, CreateOrderRequest, Order, OrderDetail, OrderFilter, OrderItem,
    OrderItemUpdate, OrderMeta, UpdateOrderRequest,
};
pub use status::{
    FulfillmentStatus, OrderEvent, OrderStatus, PaymentStatus, Plan, StatusKind, StatusRecord,
    StockEffect, Transition,
};
