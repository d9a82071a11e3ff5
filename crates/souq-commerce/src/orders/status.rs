//! Order, payment and fulfillment statuses and the lifecycle table.

use serde::{Deserialize, Serialize};

use crate::error::CommerceError;
use crate::ids::StatusId;

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    /// Initial status of a created order.
    #[default]
    PendingPayment,
    Paid,
    /// Stock has been deducted.
    Confirmed,
    Fulfilled,
    Completed,
    Cancelled,
    Returned,
    Refunded,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 9] = [
        OrderStatus::Draft,
        OrderStatus::PendingPayment,
        OrderStatus::Paid,
        OrderStatus::Confirmed,
        OrderStatus::Fulfilled,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
        OrderStatus::Returned,
        OrderStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::Paid => "paid",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Fulfilled => "fulfilled",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Returned => "returned",
            OrderStatus::Refunded => "refunded",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "Draft",
            OrderStatus::PendingPayment => "Pending Payment",
            OrderStatus::Paid => "Paid",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Fulfilled => "Fulfilled",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Returned => "Returned",
            OrderStatus::Refunded => "Refunded",
        }
    }

    /// Check if order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed
                | OrderStatus::Cancelled
                | OrderStatus::Returned
                | OrderStatus::Refunded
        )
    }

    /// Statuses in which stock is still held as a reservation.
    pub fn holds_reservation(&self) -> bool {
        matches!(
            self,
            OrderStatus::Draft | OrderStatus::PendingPayment | OrderStatus::Paid
        )
    }

    /// Lines and money fields may only change before confirmation.
    pub fn is_editable(&self) -> bool {
        self.holds_reservation()
    }
}

/// Payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Pending,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 4] = [
        PaymentStatus::Unpaid,
        PaymentStatus::Pending,
        PaymentStatus::Paid,
        PaymentStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

/// Fulfillment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    #[default]
    Unfulfilled,
    OutForDelivery,
    Fulfilled,
}

impl FulfillmentStatus {
    pub const ALL: [FulfillmentStatus; 3] = [
        FulfillmentStatus::Unfulfilled,
        FulfillmentStatus::OutForDelivery,
        FulfillmentStatus::Fulfilled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStatus::Unfulfilled => "unfulfilled",
            FulfillmentStatus::OutForDelivery => "out_for_delivery",
            FulfillmentStatus::Fulfilled => "fulfilled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            FulfillmentStatus::Unfulfilled => "Unfulfilled",
            FulfillmentStatus::OutForDelivery => "Out for Delivery",
            FulfillmentStatus::Fulfilled => "Fulfilled",
        }
    }
}

/// Which status reference table a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Order,
    Payment,
    Fulfillment,
}

impl StatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Order => "order",
            StatusKind::Payment => "payment",
            StatusKind::Fulfillment => "fulfillment",
        }
    }

    /// Backing table name.
    pub fn table(&self) -> &'static str {
        match self {
            StatusKind::Order => "order_statuses",
            StatusKind::Payment => "payment_statuses",
            StatusKind::Fulfillment => "fulfillment_statuses",
        }
    }
}

/// A row of one of the status reference tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub id: StatusId,
    pub slug: String,
    pub name_en: String,
    pub name_ar: String,
}

/// An order lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderEvent {
    Confirm,
    Cancel,
    MarkPaid,
    MarkOutForDelivery,
    Fulfill,
    Complete,
}

/// What an event does to the stock behind an order's lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockEffect {
    None,
    /// Release every line's reservation.
    Release,
    /// Turn every line's reservation into a deduction.
    Deduct,
}

/// Outcome of planning an event against the current statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// Apply the transition.
    Apply(Transition),
    /// Already in the target state; succeed without writing.
    NoOp,
}

/// Status writes and stock effect of an applied event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub order_status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub fulfillment_status: Option<FulfillmentStatus>,
    pub stock: StockEffect,
}

impl Transition {
    fn order(to: OrderStatus, stock: StockEffect) -> Self {
        Self {
            order_status: Some(to),
            payment_status: None,
            fulfillment_status: None,
            stock,
        }
    }
}

fn illegal(message: impl Into<String>) -> CommerceError {
    CommerceError::IllegalTransition(message.into())
}

impl OrderEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderEvent::Confirm => "confirm",
            OrderEvent::Cancel => "cancel",
            OrderEvent::MarkPaid => "pay",
            OrderEvent::MarkOutForDelivery => "out_for_delivery",
            OrderEvent::Fulfill => "fulfill",
            OrderEvent::Complete => "complete",
        }
    }

    /// Decide what this event does to an order in `status`/`fulfillment`.
    pub fn plan(
        self,
        status: OrderStatus,
        fulfillment: FulfillmentStatus,
    ) -> Result<Plan, CommerceError> {
        use OrderStatus::*;
        match self {
            OrderEvent::Confirm => match status {
                Draft | PendingPayment | Paid => {
                    Ok(Plan::Apply(Transition::order(Confirmed, StockEffect::Deduct)))
                }
                Confirmed | Fulfilled | Completed => Ok(Plan::NoOp),
                Cancelled | Returned | Refunded => {
                    Err(illegal(format!("cannot confirm {} order", status.as_str())))
                }
            },
            OrderEvent::Cancel => match status {
                Draft | PendingPayment | Paid => {
                    Ok(Plan::Apply(Transition::order(Cancelled, StockEffect::Release)))
                }
                Cancelled => Ok(Plan::NoOp),
                Confirmed => Err(illegal(
                    "cancellation of confirmed orders requires restocking, which is not supported",
                )),
                Fulfilled | Completed => Err(illegal("cannot cancel fulfilled/completed order")),
                Returned | Refunded => {
                    Err(illegal(format!("cannot cancel {} order", status.as_str())))
                }
            },
            OrderEvent::MarkPaid => match status {
                PendingPayment => Ok(Plan::Apply(Transition {
                    payment_status: Some(PaymentStatus::Paid),
                    ..Transition::order(Paid, StockEffect::None)
                })),
                Paid => Ok(Plan::NoOp),
                _ => Err(illegal(format!(
                    "cannot mark {} order as paid",
                    status.as_str()
                ))),
            },
            OrderEvent::MarkOutForDelivery => {
                if status == Cancelled {
                    return Err(illegal("cannot update cancelled order"));
                }
                if status != Confirmed {
                    return Err(illegal(
                        "order must be confirmed before marking out for delivery",
                    ));
                }
                if matches!(
                    fulfillment,
                    FulfillmentStatus::OutForDelivery | FulfillmentStatus::Fulfilled
                ) {
                    return Err(illegal(format!(
                        "order is already {}",
                        fulfillment.display_name()
                    )));
                }
                Ok(Plan::Apply(Transition {
                    order_status: None,
                    payment_status: None,
                    fulfillment_status: Some(FulfillmentStatus::OutForDelivery),
                    stock: StockEffect::None,
                }))
            }
            OrderEvent::Fulfill => match status {
                Confirmed => Ok(Plan::Apply(Transition {
                    fulfillment_status: Some(FulfillmentStatus::Fulfilled),
                    ..Transition::order(Fulfilled, StockEffect::None)
                })),
                Fulfilled => Ok(Plan::NoOp),
                _ => Err(illegal("order must be confirmed before fulfilling")),
            },
            OrderEvent::Complete => match status {
                Confirmed | Fulfilled => Ok(Plan::Apply(Transition {
                    order_status: Some(Completed),
                    payment_status: Some(PaymentStatus::Paid),
                    fulfillment_status: Some(FulfillmentStatus::Fulfilled),
                    stock: StockEffect::None,
                })),
                Completed => Ok(Plan::NoOp),
                Cancelled => Err(illegal("cannot complete cancelled order")),
                _ => Err(illegal("order must be confirmed before completing")),
            },
        }
    }
}
