//! Line-item diffing for order edits.

use std::collections::{HashMap, HashSet};

use crate::error::CommerceError;
use crate::ids::{OrderItemId, VariantId};
use crate::orders::order::{OrderItem, OrderItemUpdate};

/// One change to an order's lines, with the stock movement it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineChange {
    /// New line: reserve `quantity`.
    Insert { variant_id: VariantId, quantity: i64 },
    /// Drop an existing line: release its whole quantity.
    Remove {
        item_id: OrderItemId,
        variant_id: VariantId,
        quantity: i64,
    },
    /// Change an existing line's quantity: reserve or release the difference.
    Resize {
        item_id: OrderItemId,
        variant_id: VariantId,
        from: i64,
        to: i64,
    },
}

impl LineChange {
    /// Signed reservation delta: positive reserves, negative releases.
    pub fn reservation_delta(&self) -> i64 {
        match self {
            LineChange::Insert { quantity, .. } => *quantity,
            LineChange::Remove { quantity, .. } => -*quantity,
            LineChange::Resize { from, to, .. } => to - from,
        }
    }

    pub fn variant_id(&self) -> VariantId {
        match self {
            LineChange::Insert { variant_id, .. }
            | LineChange::Remove { variant_id, .. }
            | LineChange::Resize { variant_id, .. } => *variant_id,
        }
    }
}

/// Diff the requested `updates` against the persisted `existing` lines.
///
/// Lines not mentioned are untouched. An existing line keeps its variant;
/// only its quantity can change. Changes come back in request order.
pub fn plan_line_changes(
    existing: &[OrderItem],
    updates: &[OrderItemUpdate],
) -> Result<Vec<LineChange>, CommerceError> {
    let by_id: HashMap<OrderItemId, &OrderItem> =
        existing.iter().map(|item| (item.id, item)).collect();
    let mut seen = HashSet::new();
    let mut changes = Vec::with_capacity(updates.len());
    let mut removed = 0usize;
    let mut inserted = 0usize;

    for update in updates {
        if update.id.is_unset() {
            if update.is_removed {
                continue;
            }
            if update.product_variant_id.get() <= 0 {
                return Err(CommerceError::invalid_field("product_variant_id", "is required"));
            }
            require_quantity(update.quantity)?;
            changes.push(LineChange::Insert {
                variant_id: update.product_variant_id,
                quantity: update.quantity,
            });
            inserted += 1;
            continue;
        }

        if !seen.insert(update.id) {
            return Err(CommerceError::invalid_field(
                "items",
                format!("item id {} appears more than once", update.id),
            ));
        }
        let current = by_id
            .get(&update.id)
            .ok_or_else(|| CommerceError::NotFound(format!("item id {} in order", update.id)))?;

        if update.is_removed {
            changes.push(LineChange::Remove {
                item_id: current.id,
                variant_id: current.variant_id,
                quantity: current.quantity,
            });
            removed += 1;
            continue;
        }

        require_quantity(update.quantity)?;
        if update.quantity != current.quantity {
            changes.push(LineChange::Resize {
                item_id: current.id,
                variant_id: current.variant_id,
                from: current.quantity,
                to: update.quantity,
            });
        }
    }

    if existing.len() + inserted == removed {
        return Err(CommerceError::invalid_field(
            "items",
            "order must keep at least one item",
        ));
    }
    Ok(changes)
}

fn require_quantity(quantity: i64) -> Result<(), CommerceError> {
    if quantity < 1 {
        return Err(CommerceError::invalid_field("quantity", "must be at least 1"));
    }
    Ok(())
}
