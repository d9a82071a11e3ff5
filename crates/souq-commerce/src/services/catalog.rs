//! Catalog writes and storefront reads.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::catalog::{
    slugify, validate_attribute_rule, AdjustmentReason, Product, ProductDetail, ProductInput,
    ProductStatus, StockKey, StoreFront, Variant, VariantInput,
};
use crate::clock::Clock;
use crate::error::CommerceError;
use crate::ids::{AdminId, ProductId, StoreFrontId, VariantId};
use crate::services::{ActivationGate, InventoryLedger, TxRunner};
use crate::store::StoreTx;

/// Products, variants and their status.
#[derive(Clone)]
pub struct CatalogService {
    runner: TxRunner,
    clock: Arc<dyn Clock>,
}

impl CatalogService {
    pub fn new(runner: TxRunner, clock: Arc<dyn Clock>) -> Self {
        Self { runner, clock }
    }

    /// Create a draft product with its storefront assignment and variants.
    pub async fn create_product(
        &self,
        input: ProductInput,
        actor: AdminId,
    ) -> Result<ProductDetail, CommerceError> {
        input.validate()?;
        let now = self.clock.now();
        transaction!(self.runner, "create_product", |tx| {
            let stores = input.store_fronts();
            require_store_fronts(tx, &stores).await?;
            let slug = slugify(&input.name_en);
            ActivationGate::check_slug(tx, &slug, &stores, None).await?;

            let product = tx.insert_product(input.to_product(slug, now)).await?;
            tx.set_product_store_fronts(product.id, &stores).await?;
            for variant in &input.variants {
                insert_variant(tx, &product, &stores, variant, actor, now).await?;
            }
            info!(product_id = %product.id, slug = %product.slug, "product created");
            load_detail(tx, product.id).await
        })
    }

    /// Overwrite a product's fields, reassign storefronts and upsert variants.
    pub async fn update_product(
        &self,
        id: ProductId,
        input: ProductInput,
        actor: AdminId,
    ) -> Result<ProductDetail, CommerceError> {
        input.validate()?;
        let now = self.clock.now();
        transaction!(self.runner, "update_product", |tx| {
            let mut product = tx
                .lock_product(id)
                .await?
                .ok_or_else(|| CommerceError::not_found("product", id))?;
            let stores = input.store_fronts();
            require_store_fronts(tx, &stores).await?;
            let slug = slugify(&input.name_en);
            ActivationGate::check_slug(tx, &slug, &stores, Some(id)).await?;

            input.apply_to(&mut product, slug, now);
            tx.update_product(&product).await?;
            tx.set_product_store_fronts(id, &stores).await?;

            for variant in &input.variants {
                match variant.id.filter(|v| !v.is_unset()) {
                    Some(variant_id) => {
                        update_variant(tx, &product, variant_id, variant, now).await?;
                    }
                    None => {
                        insert_variant(tx, &product, &stores, variant, actor, now).await?;
                    }
                }
            }
            for variant in tx.product_variants(id).await? {
                validate_attribute_rule(product.attribute_type.as_deref(), &variant.attribute_value)?;
            }
            info!(product_id = %id, "product updated");
            load_detail(tx, id).await
        })
    }

    /// Apply a status transition through the activation gate.
    pub async fn change_status(
        &self,
        id: ProductId,
        status: ProductStatus,
    ) -> Result<Product, CommerceError> {
        let now = self.clock.now();
        transaction!(self.runner, "change_product_status", |tx| {
            ActivationGate::change_status(tx, id, status, now).await
        })
    }

    /// Add a variant, materialising inventory in every assigned storefront.
    pub async fn create_variant(
        &self,
        product_id: ProductId,
        input: VariantInput,
        actor: AdminId,
    ) -> Result<Variant, CommerceError> {
        input.validate()?;
        let now = self.clock.now();
        transaction!(self.runner, "create_variant", |tx| {
            let product = tx
                .lock_product(product_id)
                .await?
                .ok_or_else(|| CommerceError::not_found("product", product_id))?;
            let stores = tx.product_store_fronts(product_id).await?;
            insert_variant(tx, &product, &stores, &input, actor, now).await
        })
    }

    pub async fn update_variant(
        &self,
        product_id: ProductId,
        variant_id: VariantId,
        input: VariantInput,
    ) -> Result<Variant, CommerceError> {
        input.validate()?;
        let now = self.clock.now();
        transaction!(self.runner, "update_variant", |tx| {
            let product = tx
                .lock_product(product_id)
                .await?
                .ok_or_else(|| CommerceError::not_found("product", product_id))?;
            update_variant(tx, &product, variant_id, &input, now).await
        })
    }

    /// Soft delete a product and its variants.
    pub async fn delete_product(&self, id: ProductId) -> Result<(), CommerceError> {
        let now = self.clock.now();
        transaction!(self.runner, "delete_product", |tx| {
            if tx.lock_product(id).await?.is_none() {
                return Err(CommerceError::not_found("product", id));
            }
            tx.soft_delete_product(id, now).await?;
            info!(product_id = %id, "product deleted");
            Ok(())
        })
    }

    pub async fn get_product(&self, id: ProductId) -> Result<ProductDetail, CommerceError> {
        transaction!(self.runner, "get_product", |tx| { load_detail(tx, id).await })
    }

    /// Active storefront serving `domain`.
    pub async fn resolve_storefront(&self, domain: &str) -> Result<StoreFront, CommerceError> {
        transaction!(self.runner, "resolve_storefront", |tx| {
            tx.store_front_by_domain(domain)
                .await?
                .ok_or_else(|| CommerceError::NotFound(format!("store front for domain {}", domain)))
        })
    }

    /// Published products of a storefront.
    pub async fn storefront_products(
        &self,
        store: StoreFrontId,
    ) -> Result<Vec<Product>, CommerceError> {
        transaction!(self.runner, "storefront_products", |tx| {
            Ok(tx.published_products(store).await?)
        })
    }

    /// One published product of a storefront, with its active variants.
    pub async fn storefront_product(
        &self,
        store: StoreFrontId,
        slug: &str,
    ) -> Result<ProductDetail, CommerceError> {
        transaction!(self.runner, "storefront_product", |tx| {
            let product = tx
                .published_product_by_slug(store, slug)
                .await?
                .ok_or_else(|| CommerceError::not_found("product", slug))?;
            let mut detail = load_detail(tx, product.id).await?;
            detail.variants.retain(|v| v.is_active);
            Ok(detail)
        })
    }
}

async fn require_store_fronts(
    tx: &mut dyn StoreTx,
    stores: &[StoreFrontId],
) -> Result<(), CommerceError> {
    for store in stores {
        if tx.store_front(*store).await?.is_none() {
            return Err(CommerceError::not_found("store front", store));
        }
    }
    Ok(())
}

async fn require_sku_free(
    tx: &mut dyn StoreTx,
    sku: &str,
    exclude: Option<VariantId>,
) -> Result<(), CommerceError> {
    if tx.sku_in_use(sku, exclude).await? {
        return Err(CommerceError::Duplicate(format!("SKU '{}' is already taken", sku)));
    }
    Ok(())
}

async fn insert_variant(
    tx: &mut dyn StoreTx,
    product: &Product,
    stores: &[StoreFrontId],
    input: &VariantInput,
    actor: AdminId,
    at: DateTime<Utc>,
) -> Result<Variant, CommerceError> {
    input.validate()?;
    let row = input.to_variant(product.id, at);
    validate_attribute_rule(product.attribute_type.as_deref(), &row.attribute_value)?;
    require_sku_free(tx, &row.sku, None).await?;
    let variant = tx.insert_variant(row).await?;

    let stock = input.stock.unwrap_or(0);
    for store in stores {
        let key = StockKey::new(variant.id, *store);
        if stock > 0 {
            InventoryLedger::adjust(tx, key, stock, AdjustmentReason::Restock, actor, "initial stock", at)
                .await?;
        } else {
            InventoryLedger::ensure(tx, key, at).await?;
        }
    }
    info!(variant_id = %variant.id, product_id = %product.id, sku = %variant.sku, "variant created");
    Ok(variant)
}

async fn update_variant(
    tx: &mut dyn StoreTx,
    product: &Product,
    variant_id: VariantId,
    input: &VariantInput,
    at: DateTime<Utc>,
) -> Result<Variant, CommerceError> {
    input.validate()?;
    let mut variant = tx
        .variant(variant_id)
        .await?
        .filter(|v| v.product_id == product.id)
        .ok_or_else(|| CommerceError::NotFound(format!("variant {} for product", variant_id)))?;
    input.apply_to(&mut variant, at);
    validate_attribute_rule(product.attribute_type.as_deref(), &variant.attribute_value)?;
    require_sku_free(tx, &variant.sku, Some(variant_id)).await?;
    tx.update_variant(&variant).await?;
    Ok(variant)
}

async fn load_detail(tx: &mut dyn StoreTx, id: ProductId) -> Result<ProductDetail, CommerceError> {
    let product = tx
        .product(id)
        .await?
        .ok_or_else(|| CommerceError::not_found("product", id))?;
    let store_front_ids = tx.product_store_fronts(id).await?;
    let variants = tx.product_variants(id).await?;
    Ok(ProductDetail {
        product,
        store_front_ids,
        variants,
    })
}
