//! Inventory ledger types.
//!
//! One [`InventoryRecord`] exists per (variant, storefront) pair. The
//! arithmetic here is pure: each mutator validates the ledger invariants
//! (`0 <= reserved <= quantity`) before touching the record and leaves it
//! untouched on error. Locking and audit rows are the ledger service's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CommerceError, FieldErrors};
use crate::ids::{AdjustmentId, AdminId, InventoryId, StoreFrontId, VariantId};

/// Threshold given to lazily created records.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// The (variant, storefront) key of an inventory row.
///
/// Ordered by variant then storefront; multi-row operations lock in this
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StockKey {
    pub variant_id: VariantId,
    pub store_front_id: StoreFrontId,
}

impl StockKey {
    pub const fn new(variant_id: VariantId, store_front_id: StoreFrontId) -> Self {
        Self {
            variant_id,
            store_front_id,
        }
    }
}

impl std::fmt::Display for StockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "variant {} in store {}", self.variant_id, self.store_front_id)
    }
}

/// Stock balance of one variant in one storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: InventoryId,
    #[serde(rename = "product_variant_id")]
    pub variant_id: VariantId,
    pub store_front_id: StoreFrontId,
    pub quantity: i64,
    #[serde(rename = "reserved_quantity")]
    pub reserved: i64,
    pub low_stock_threshold: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    /// An empty record for `key` (id assigned by the store).
    pub fn empty(key: StockKey, at: DateTime<Utc>) -> Self {
        Self {
            id: InventoryId::default(),
            variant_id: key.variant_id,
            store_front_id: key.store_front_id,
            quantity: 0,
            reserved: 0,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            created_at: at,
            updated_at: at,
        }
    }

    pub fn key(&self) -> StockKey {
        StockKey::new(self.variant_id, self.store_front_id)
    }

    /// Sellable quantity.
    pub fn available(&self) -> i64 {
        self.quantity - self.reserved
    }

    /// At or below the alert threshold.
    pub fn is_low_stock(&self) -> bool {
        self.available() <= self.low_stock_threshold
    }

    /// Whether both ledger invariants hold.
    pub fn is_consistent(&self) -> bool {
        self.quantity >= 0 && self.reserved >= 0 && self.reserved <= self.quantity
    }

    /// Apply a signed quantity change. Returns the previous quantity.
    ///
    /// Fails with `NegativeStock` if the quantity would drop below zero or
    /// below the reserved count.
    pub fn adjust(&mut self, delta: i64) -> Result<i64, CommerceError> {
        let previous = self.quantity;
        let next = previous.checked_add(delta).ok_or_else(|| {
            CommerceError::invalid_field("adjustment", "out of range")
        })?;
        if next < 0 || next < self.reserved {
            return Err(CommerceError::NegativeStock {
                current: previous,
                adjustment: delta,
            });
        }
        self.quantity = next;
        Ok(previous)
    }

    /// Move `qty` from available into the reserved bucket.
    pub fn reserve(&mut self, qty: i64) -> Result<(), CommerceError> {
        require_positive(qty)?;
        if self.available() < qty {
            return Err(CommerceError::InsufficientStock {
                variant_id: self.variant_id,
                store_front_id: self.store_front_id,
                requested: qty,
                available: self.available(),
            });
        }
        self.reserved += qty;
        Ok(())
    }

    /// Return `qty` from the reserved bucket to available.
    pub fn release(&mut self, qty: i64) -> Result<(), CommerceError> {
        require_positive(qty)?;
        if self.reserved < qty {
            return Err(CommerceError::InvariantViolation(format!(
                "cannot release {} from reserved {} for {}",
                qty,
                self.reserved,
                self.key()
            )));
        }
        self.reserved -= qty;
        Ok(())
    }

    /// Turn a reservation of `qty` into a permanent deduction.
    /// Returns the previous quantity.
    pub fn confirm_deduct(&mut self, qty: i64) -> Result<i64, CommerceError> {
        require_positive(qty)?;
        if self.reserved < qty || self.quantity < qty {
            return Err(CommerceError::InvariantViolation(format!(
                "stock inconsistency: qty {}, reserved {}, deducting {}",
                self.quantity, self.reserved, qty
            )));
        }
        let previous = self.quantity;
        self.reserved -= qty;
        self.quantity -= qty;
        Ok(previous)
    }

    /// Add `qty` to the quantity without touching reservations.
    /// Returns the previous quantity.
    pub fn restock(&mut self, qty: i64) -> Result<i64, CommerceError> {
        require_positive(qty)?;
        let previous = self.quantity;
        self.quantity = previous
            .checked_add(qty)
            .ok_or_else(|| CommerceError::invalid_field("quantity", "out of range"))?;
        Ok(previous)
    }
}

fn require_positive(qty: i64) -> Result<(), CommerceError> {
    if qty <= 0 {
        return Err(CommerceError::invalid_field("quantity", "must be at least 1"));
    }
    Ok(())
}

/// Why an inventory quantity changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentReason {
    /// Received from a supplier.
    Restock,
    /// Manual count correction.
    Correction,
    /// Sold and deducted at order confirmation.
    Sale,
    /// Returned by a customer.
    Return,
    /// Moved to another location.
    Transfer,
    /// Generic adjustment.
    Adjustment,
}

impl AdjustmentReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentReason::Restock => "restock",
            AdjustmentReason::Correction => "correction",
            AdjustmentReason::Sale => "sale",
            AdjustmentReason::Return => "return",
            AdjustmentReason::Transfer => "transfer",
            AdjustmentReason::Adjustment => "adjustment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "restock" => Some(AdjustmentReason::Restock),
            "correction" => Some(AdjustmentReason::Correction),
            "sale" => Some(AdjustmentReason::Sale),
            "return" => Some(AdjustmentReason::Return),
            "transfer" => Some(AdjustmentReason::Transfer),
            "adjustment" => Some(AdjustmentReason::Adjustment),
            _ => None,
        }
    }
}

/// Immutable audit row for one quantity change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryAdjustment {
    pub id: AdjustmentId,
    #[serde(rename = "variant_inventory_id")]
    pub inventory_id: InventoryId,
    pub adjusted_by: AdminId,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    #[serde(rename = "adjustment_amount")]
    pub delta: i64,
    pub reason: AdjustmentReason,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl InventoryAdjustment {
    /// Audit row for a change from `previous` by `delta` (id assigned by the store).
    pub fn record(
        inventory_id: InventoryId,
        actor: AdminId,
        previous: i64,
        delta: i64,
        reason: AdjustmentReason,
        notes: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AdjustmentId::default(),
            inventory_id,
            adjusted_by: actor,
            previous_quantity: previous,
            new_quantity: previous + delta,
            delta,
            reason,
            notes: notes.into(),
            created_at: at,
        }
    }
}

/// Admin request to change stock by a signed amount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdjustInventoryRequest {
    pub product_variant_id: VariantId,
    pub store_front_id: StoreFrontId,
    pub adjustment: i64,
    pub reason: AdjustmentReason,
    #[serde(default)]
    pub notes: String,
}

impl AdjustInventoryRequest {
    pub fn validate(&self) -> Result<(), CommerceError> {
        let mut errors = FieldErrors::new();
        errors.check(self.product_variant_id.get() <= 0, "product_variant_id", "is required");
        errors.check(self.store_front_id.get() <= 0, "store_front_id", "is required");
        errors.check(
            self.reason == AdjustmentReason::Adjustment,
            "reason",
            "must be one of restock, correction, sale, return, transfer",
        );
        errors.into_result()
    }

    pub fn key(&self) -> StockKey {
        StockKey::new(self.product_variant_id, self.store_front_id)
    }
}

/// One absolute quantity in a bulk update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkInventoryItem {
    #[serde(alias = "variant_inventory_id")]
    pub inventory_id: InventoryId,
    pub new_quantity: i64,
    pub reason: AdjustmentReason,
    #[serde(default)]
    pub notes: String,
}

/// Admin request to set several absolute quantities atomically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkInventoryRequest {
    pub items: Vec<BulkInventoryItem>,
}

impl BulkInventoryRequest {
    pub fn validate(&self) -> Result<(), CommerceError> {
        if self.items.is_empty() {
            return Err(CommerceError::invalid_field("items", "must not be empty"));
        }
        for item in &self.items {
            if item.new_quantity < 0 {
                return Err(CommerceError::invalid_field(
                    "new_quantity",
                    format!("negative quantity not allowed for inventory ID {}", item.inventory_id),
                ));
            }
        }
        Ok(())
    }
}

/// Admin request to change a low-stock threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThresholdRequest {
    pub product_variant_id: VariantId,
    pub store_front_id: StoreFrontId,
    pub low_stock_threshold: i64,
}

impl ThresholdRequest {
    pub fn validate(&self) -> Result<(), CommerceError> {
        let mut errors = FieldErrors::new();
        errors.check(
            self.low_stock_threshold < 0,
            "low_stock_threshold",
            "must not be negative",
        );
        errors.into_result()
    }
}

/// Read view of a record with its derived values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryStatus {
    #[serde(flatten)]
    pub record: InventoryRecord,
    pub available_quantity: i64,
    pub is_low_stock: bool,
}

impl From<InventoryRecord> for InventoryStatus {
    fn from(record: InventoryRecord) -> Self {
        Self {
            available_quantity: record.available(),
            is_low_stock: record.is_low_stock(),
            record,
        }
    }
}

/// Result of a successful adjustment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjustmentOutcome {
    #[serde(flatten)]
    pub inventory: InventoryStatus,
    pub adjustment: InventoryAdjustment,
}
