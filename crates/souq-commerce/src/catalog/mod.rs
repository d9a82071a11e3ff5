//! Catalog module.
//!
//! Contains types for storefronts, products, variants and inventory.

mod inventory;
mod product;
mod slug;
mod storefront;

#[cfg(test)]
mod proptest_ledger;

pub use inventory::{
    AdjustInventoryRequest, AdjustmentOutcome, AdjustmentReason, BulkInventoryItem,
    BulkInventoryRequest, InventoryAdjustment, InventoryRecord, InventoryStatus, StockKey,
    ThresholdRequest, DEFAULT_LOW_STOCK_THRESHOLD,
};
pub use product::{
    validate_attribute_rule, Product, ProductDetail, ProductInput, ProductStatus, Variant,
    VariantInput,
};
pub use slug::slugify;
pub use storefront::{normalize_domain, StoreFront};
