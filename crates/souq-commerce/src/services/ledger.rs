//! The inventory ledger.
//!
//! Every mutation runs inside a caller's transaction and follows the same
//! protocol: lock the (variant, storefront) row, read it, compute the new
//! values, validate the invariants, write the row and append the audit row.
//! Nothing computed before the lock is trusted.

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::catalog::{
    AdjustmentOutcome, AdjustmentReason, InventoryAdjustment, InventoryRecord, StockKey,
};
use crate::error::CommerceError;
use crate::ids::{AdminId, ProductId};
use crate::store::StoreTx;

/// Stateless ledger operations over an open transaction.
pub struct InventoryLedger;

impl InventoryLedger {
    /// Lock the row for `key`, creating an empty one if it is missing.
    ///
    /// Fails with `NotFound` if the variant or storefront does not exist.
    pub async fn ensure(
        tx: &mut dyn StoreTx,
        key: StockKey,
        at: DateTime<Utc>,
    ) -> Result<InventoryRecord, CommerceError> {
        if let Some(record) = tx.lock_inventory(key).await? {
            return Ok(record);
        }
        if tx.variant(key.variant_id).await?.is_none() {
            return Err(CommerceError::not_found("variant", key.variant_id));
        }
        if tx.store_front(key.store_front_id).await?.is_none() {
            return Err(CommerceError::not_found("store front", key.store_front_id));
        }
        let record = tx.insert_inventory(InventoryRecord::empty(key, at)).await?;
        debug!(variant_id = %key.variant_id, store_front_id = %key.store_front_id, inventory_id = %record.id, "inventory record created");
        Ok(record)
    }

    /// Lock every key up front in ascending order, creating missing rows.
    ///
    /// Operations touching several rows call this first so that concurrent
    /// transactions acquire overlapping rows in the same order.
    pub async fn lock_all(
        tx: &mut dyn StoreTx,
        keys: impl IntoIterator<Item = StockKey>,
        at: DateTime<Utc>,
    ) -> Result<(), CommerceError> {
        let mut keys: Vec<StockKey> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();
        for key in keys {
            Self::ensure(tx, key, at).await?;
        }
        Ok(())
    }

    /// Apply a signed quantity change and append its audit row.
    ///
    /// A zero delta leaves the balance as it is but is still audited.
    #[instrument(skip(tx, notes, at), fields(variant_id = %key.variant_id, store_front_id = %key.store_front_id))]
    pub async fn adjust(
        tx: &mut dyn StoreTx,
        key: StockKey,
        delta: i64,
        reason: AdjustmentReason,
        actor: AdminId,
        notes: &str,
        at: DateTime<Utc>,
    ) -> Result<AdjustmentOutcome, CommerceError> {
        let mut record = Self::ensure(tx, key, at).await?;
        let previous = record.adjust(delta)?;
        record.updated_at = at;
        tx.update_inventory(&record).await?;
        let adjustment = tx
            .insert_adjustment(InventoryAdjustment::record(
                record.id, actor, previous, delta, reason, notes, at,
            ))
            .await?;
        debug!(previous, quantity = record.quantity, reason = reason.as_str(), "inventory adjusted");
        Ok(AdjustmentOutcome {
            inventory: record.into(),
            adjustment,
        })
    }

    /// Reserve `qty` for an order line.
    pub async fn reserve(
        tx: &mut dyn StoreTx,
        key: StockKey,
        qty: i64,
        at: DateTime<Utc>,
    ) -> Result<InventoryRecord, CommerceError> {
        let mut record = Self::ensure(tx, key, at).await?;
        record.reserve(qty)?;
        record.updated_at = at;
        tx.update_inventory(&record).await?;
        debug!(variant_id = %key.variant_id, store_front_id = %key.store_front_id, qty, reserved = record.reserved, "stock reserved");
        Ok(record)
    }

    /// Release `qty` of an existing reservation.
    pub async fn release(
        tx: &mut dyn StoreTx,
        key: StockKey,
        qty: i64,
        at: DateTime<Utc>,
    ) -> Result<InventoryRecord, CommerceError> {
        let mut record = Self::locked_existing(tx, key).await?;
        record.release(qty)?;
        record.updated_at = at;
        tx.update_inventory(&record).await?;
        debug!(variant_id = %key.variant_id, store_front_id = %key.store_front_id, qty, reserved = record.reserved, "stock released");
        Ok(record)
    }

    /// Turn a reservation into a deduction. Audited as a sale.
    pub async fn confirm_deduct(
        tx: &mut dyn StoreTx,
        key: StockKey,
        qty: i64,
        actor: AdminId,
        notes: &str,
        at: DateTime<Utc>,
    ) -> Result<InventoryRecord, CommerceError> {
        let mut record = Self::locked_existing(tx, key).await?;
        let previous = record.confirm_deduct(qty)?;
        record.updated_at = at;
        tx.update_inventory(&record).await?;
        tx.insert_adjustment(InventoryAdjustment::record(
            record.id,
            actor,
            previous,
            -qty,
            AdjustmentReason::Sale,
            notes,
            at,
        ))
        .await?;
        debug!(variant_id = %key.variant_id, store_front_id = %key.store_front_id, qty, quantity = record.quantity, "stock deducted");
        Ok(record)
    }

    /// Add `qty` back to the quantity. Audited as a return.
    pub async fn restock(
        tx: &mut dyn StoreTx,
        key: StockKey,
        qty: i64,
        actor: AdminId,
        notes: &str,
        at: DateTime<Utc>,
    ) -> Result<InventoryRecord, CommerceError> {
        let mut record = Self::ensure(tx, key, at).await?;
        let previous = record.restock(qty)?;
        record.updated_at = at;
        tx.update_inventory(&record).await?;
        tx.insert_adjustment(InventoryAdjustment::record(
            record.id,
            actor,
            previous,
            qty,
            AdjustmentReason::Return,
            notes,
            at,
        ))
        .await?;
        Ok(record)
    }

    /// Whether any live variant of `product` has stock in any storefront.
    pub async fn has_any_stock(
        tx: &mut dyn StoreTx,
        product: ProductId,
    ) -> Result<bool, CommerceError> {
        Ok(tx.product_has_stock(product).await?)
    }

    pub fn is_low_stock(record: &InventoryRecord) -> bool {
        record.is_low_stock()
    }

    async fn locked_existing(
        tx: &mut dyn StoreTx,
        key: StockKey,
    ) -> Result<InventoryRecord, CommerceError> {
        tx.lock_inventory(key).await?.ok_or_else(|| {
            CommerceError::InvariantViolation(format!("no inventory record for {}", key))
        })
    }
}
