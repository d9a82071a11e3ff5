//! Product status gate.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::catalog::{Product, ProductStatus};
use crate::error::CommerceError;
use crate::ids::{ProductId, StoreFrontId};
use crate::services::InventoryLedger;
use crate::store::StoreTx;

/// Enforces the product status machine and the publication preconditions.
pub struct ActivationGate;

impl ActivationGate {
    /// Move a product to `to` inside the caller's transaction.
    ///
    /// Activation needs at least one active variant and stock for at least
    /// one variant somewhere. The publication flag follows the new status.
    pub async fn change_status(
        tx: &mut dyn StoreTx,
        id: ProductId,
        to: ProductStatus,
        at: DateTime<Utc>,
    ) -> Result<Product, CommerceError> {
        let mut product = tx
            .lock_product(id)
            .await?
            .ok_or_else(|| CommerceError::not_found("product", id))?;
        let from = product.status;
        from.check_transition(to)?;

        if to == ProductStatus::Active {
            if tx.count_active_variants(id).await? == 0 {
                return Err(CommerceError::IllegalTransition(
                    "Cannot activate product: requires at least 1 active variant".into(),
                ));
            }
            if !InventoryLedger::has_any_stock(tx, id).await? {
                return Err(CommerceError::IllegalTransition(
                    "Cannot activate product: requires inventory for at least 1 variant".into(),
                ));
            }
        }

        product.set_status(to, at);
        tx.update_product(&product).await?;
        info!(product_id = %id, from = from.as_str(), to = to.as_str(), "product status changed");
        Ok(product)
    }

    /// Fail with `Duplicate` if `slug` is taken in any of `stores` by another
    /// product.
    pub async fn check_slug(
        tx: &mut dyn StoreTx,
        slug: &str,
        stores: &[StoreFrontId],
        exclude: Option<ProductId>,
    ) -> Result<(), CommerceError> {
        if slug.is_empty() {
            return Err(CommerceError::invalid_field(
                "name_en",
                "Could not generate slug from name_en",
            ));
        }
        for store in stores {
            if tx.slug_in_use(slug, *store, exclude).await? {
                return Err(CommerceError::Duplicate(format!(
                    "Slug '{}' already exists in store {}",
                    slug, store
                )));
            }
        }
        Ok(())
    }
}
