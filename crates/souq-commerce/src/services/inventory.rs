//! Admin inventory operations.

use std::sync::Arc;

use tracing::info;

use crate::catalog::{
    AdjustInventoryRequest, AdjustmentOutcome, BulkInventoryRequest, InventoryAdjustment,
    InventoryStatus, StockKey, ThresholdRequest,
};
use crate::clock::Clock;
use crate::error::CommerceError;
use crate::ids::{AdminId, InventoryId, StoreFrontId};
use crate::services::{InventoryLedger, TxRunner};

/// Stock adjustments, thresholds and inventory reads.
#[derive(Clone)]
pub struct InventoryService {
    runner: TxRunner,
    clock: Arc<dyn Clock>,
}

impl InventoryService {
    pub fn new(runner: TxRunner, clock: Arc<dyn Clock>) -> Self {
        Self { runner, clock }
    }

    /// Change a balance by a signed amount and audit it.
    pub async fn adjust(
        &self,
        req: AdjustInventoryRequest,
        actor: AdminId,
    ) -> Result<AdjustmentOutcome, CommerceError> {
        req.validate()?;
        let now = self.clock.now();
        let outcome = transaction!(self.runner, "adjust_inventory", |tx| {
            InventoryLedger::adjust(
                tx,
                req.key(),
                req.adjustment,
                req.reason,
                actor,
                &req.notes,
                now,
            )
            .await
        })?;
        info!(
            variant_id = %req.product_variant_id,
            store_front_id = %req.store_front_id,
            delta = req.adjustment,
            quantity = outcome.inventory.record.quantity,
            "inventory adjusted"
        );
        Ok(outcome)
    }

    /// Set absolute quantities for several records in one transaction.
    ///
    /// Rows whose quantity does not change are skipped and not audited.
    pub async fn bulk_set(
        &self,
        req: BulkInventoryRequest,
        actor: AdminId,
    ) -> Result<Vec<InventoryStatus>, CommerceError> {
        req.validate()?;
        let now = self.clock.now();
        transaction!(self.runner, "bulk_set_inventory", |tx| {
            let mut ids: Vec<InventoryId> = req.items.iter().map(|item| item.inventory_id).collect();
            ids.sort();
            ids.dedup();
            for id in &ids {
                if tx.lock_inventory_by_id(*id).await?.is_none() {
                    return Err(CommerceError::not_found("inventory", id));
                }
            }

            let mut changed = 0usize;
            for item in &req.items {
                let mut record = tx
                    .lock_inventory_by_id(item.inventory_id)
                    .await?
                    .ok_or_else(|| CommerceError::not_found("inventory", item.inventory_id))?;
                let delta = item.new_quantity - record.quantity;
                if delta == 0 {
                    continue;
                }
                let previous = record.adjust(delta)?;
                record.updated_at = now;
                tx.update_inventory(&record).await?;
                tx.insert_adjustment(InventoryAdjustment::record(
                    record.id,
                    actor,
                    previous,
                    delta,
                    item.reason,
                    item.notes.clone(),
                    now,
                ))
                .await?;
                changed += 1;
            }
            info!(items = req.items.len(), changed, "bulk inventory update");

            let mut out = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(record) = tx.inventory_by_id(id).await? {
                    out.push(record.into());
                }
            }
            Ok(out)
        })
    }

    /// Change a record's low-stock threshold. Not audited.
    pub async fn set_threshold(&self, req: ThresholdRequest) -> Result<InventoryStatus, CommerceError> {
        req.validate()?;
        let now = self.clock.now();
        transaction!(self.runner, "set_low_stock_threshold", |tx| {
            let key = StockKey::new(req.product_variant_id, req.store_front_id);
            let mut record = InventoryLedger::ensure(tx, key, now).await?;
            record.low_stock_threshold = req.low_stock_threshold;
            record.updated_at = now;
            tx.update_inventory(&record).await?;
            Ok(record.into())
        })
    }

    pub async fn get(&self, key: StockKey) -> Result<InventoryStatus, CommerceError> {
        transaction!(self.runner, "get_inventory", |tx| {
            tx.inventory(key)
                .await?
                .map(InventoryStatus::from)
                .ok_or_else(|| CommerceError::NotFound(format!("inventory for {}", key)))
        })
    }

    /// Records of a storefront, optionally only those at or below their threshold.
    pub async fn list(
        &self,
        store: StoreFrontId,
        low_stock_only: bool,
    ) -> Result<Vec<InventoryStatus>, CommerceError> {
        transaction!(self.runner, "list_inventory", |tx| {
            if tx.store_front(store).await?.is_none() {
                return Err(CommerceError::not_found("store front", store));
            }
            let records = tx.store_inventory(store).await?;
            Ok(records
                .into_iter()
                .filter(|r| !low_stock_only || InventoryLedger::is_low_stock(r))
                .map(InventoryStatus::from)
                .collect())
        })
    }

    pub async fn low_stock(&self, store: StoreFrontId) -> Result<Vec<InventoryStatus>, CommerceError> {
        self.list(store, true).await
    }

    /// Audit trail of a record, newest first.
    pub async fn history(
        &self,
        id: InventoryId,
    ) -> Result<Vec<InventoryAdjustment>, CommerceError> {
        transaction!(self.runner, "inventory_history", |tx| {
            if tx.inventory_by_id(id).await?.is_none() {
                return Err(CommerceError::not_found("inventory", id));
            }
            Ok(tx.adjustments(id).await?)
        })
    }
}
