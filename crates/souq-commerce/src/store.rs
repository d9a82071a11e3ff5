//! The relational store port.
//!
//! Services never talk to a database directly. They open a [`StoreTx`]
//! through a [`Store`], run every read and write of one logical operation
//! through it, and commit or roll back at the end. Engines live in the
//! `souq-db` crate.
//!
//! Reads never return soft-deleted rows. `lock_*` methods take an exclusive
//! row lock that is held until the transaction ends; a wait that exceeds the
//! engine's lock timeout fails with [`StoreError::LockTimeout`]. Dropping a
//! transaction without committing rolls it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::access::{Permission, Role};
use crate::catalog::{
    InventoryAdjustment, InventoryRecord, Product, StockKey, StoreFront, Variant,
};
use crate::ids::{
    InventoryId, OrderId, OrderItemId, PermissionId, ProductId, RoleId, StoreFrontId, VariantId,
};
use crate::money::Currency;
use crate::orders::{Order, OrderFilter, OrderItem, StatusKind, StatusRecord};

/// Port-level failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A row lock could not be acquired in time.
    #[error("lock wait timeout on {0}")]
    LockTimeout(String),

    #[error("deadlock detected")]
    Deadlock,

    #[error("could not serialize access")]
    SerializationFailure,

    /// An update targeted a row that does not exist.
    #[error("row not found: {0}")]
    RowNotFound(String),

    /// The backend cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A handle that opens transactions.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Begin a transaction.
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;

    /// Engine name for logs.
    fn engine(&self) -> &'static str;
}

/// One open transaction.
///
/// Insert methods take a row whose id is the unset placeholder and return
/// it with the assigned id.
#[async_trait]
pub trait StoreTx: Send {
    // Reference data

    async fn store_front(&mut self, id: StoreFrontId) -> StoreResult<Option<StoreFront>>;

    /// Active storefront whose domain matches exactly.
    async fn store_front_by_domain(&mut self, domain: &str) -> StoreResult<Option<StoreFront>>;

    async fn insert_store_front(&mut self, store: StoreFront) -> StoreResult<StoreFront>;

    async fn currency_by_code(&mut self, code: &str) -> StoreResult<Option<Currency>>;

    async fn currencies(&mut self) -> StoreResult<Vec<Currency>>;

    async fn insert_currency(&mut self, currency: Currency) -> StoreResult<Currency>;

    async fn status(&mut self, kind: StatusKind, slug: &str) -> StoreResult<Option<StatusRecord>>;

    async fn statuses(&mut self, kind: StatusKind) -> StoreResult<Vec<StatusRecord>>;

    async fn insert_status(
        &mut self,
        kind: StatusKind,
        status: StatusRecord,
    ) -> StoreResult<StatusRecord>;

    // Catalog

    async fn product(&mut self, id: ProductId) -> StoreResult<Option<Product>>;

    async fn lock_product(&mut self, id: ProductId) -> StoreResult<Option<Product>>;

    async fn insert_product(&mut self, product: Product) -> StoreResult<Product>;

    async fn update_product(&mut self, product: &Product) -> StoreResult<()>;

    /// Storefronts the product is assigned to, ascending.
    async fn product_store_fronts(&mut self, id: ProductId) -> StoreResult<Vec<StoreFrontId>>;

    /// Replace the product's storefront assignment.
    async fn set_product_store_fronts(
        &mut self,
        id: ProductId,
        stores: &[StoreFrontId],
    ) -> StoreResult<()>;

    /// Whether another live product assigned to `store` uses `slug`.
    async fn slug_in_use(
        &mut self,
        slug: &str,
        store: StoreFrontId,
        exclude: Option<ProductId>,
    ) -> StoreResult<bool>;

    async fn variant(&mut self, id: VariantId) -> StoreResult<Option<Variant>>;

    /// Live variants of a product, ascending by id.
    async fn product_variants(&mut self, product: ProductId) -> StoreResult<Vec<Variant>>;

    async fn insert_variant(&mut self, variant: Variant) -> StoreResult<Variant>;

    async fn update_variant(&mut self, variant: &Variant) -> StoreResult<()>;

    /// Whether another live variant uses `sku`.
    async fn sku_in_use(&mut self, sku: &str, exclude: Option<VariantId>) -> StoreResult<bool>;

    async fn count_active_variants(&mut self, product: ProductId) -> StoreResult<i64>;

    /// Soft delete the product and its variants.
    async fn soft_delete_product(&mut self, id: ProductId, at: DateTime<Utc>) -> StoreResult<()>;

    /// Visible products assigned to `store`, ascending by id.
    async fn published_products(&mut self, store: StoreFrontId) -> StoreResult<Vec<Product>>;

    async fn published_product_by_slug(
        &mut self,
        store: StoreFrontId,
        slug: &str,
    ) -> StoreResult<Option<Product>>;

    // Inventory

    /// Lock and return the record for `key`, or `None` when no row exists.
    /// A `None` result holds no lock an engine must honour; callers create
    /// the row with [`StoreTx::insert_inventory`], which returns it locked.
    async fn lock_inventory(&mut self, key: StockKey) -> StoreResult<Option<InventoryRecord>>;

    async fn lock_inventory_by_id(&mut self, id: InventoryId)
        -> StoreResult<Option<InventoryRecord>>;

    /// Insert `record`, or return the row a concurrent transaction already
    /// created for the same key. The returned row is locked.
    async fn insert_inventory(&mut self, record: InventoryRecord) -> StoreResult<InventoryRecord>;

    async fn update_inventory(&mut self, record: &InventoryRecord) -> StoreResult<()>;

    async fn inventory(&mut self, key: StockKey) -> StoreResult<Option<InventoryRecord>>;

    async fn inventory_by_id(&mut self, id: InventoryId) -> StoreResult<Option<InventoryRecord>>;

    /// Records of a storefront, ascending by id.
    async fn store_inventory(&mut self, store: StoreFrontId) -> StoreResult<Vec<InventoryRecord>>;

    /// Whether any live variant of the product has `quantity > 0` anywhere.
    async fn product_has_stock(&mut self, product: ProductId) -> StoreResult<bool>;

    async fn insert_adjustment(
        &mut self,
        adjustment: InventoryAdjustment,
    ) -> StoreResult<InventoryAdjustment>;

    /// Audit rows of a record, newest first.
    async fn adjustments(&mut self, inventory: InventoryId)
        -> StoreResult<Vec<InventoryAdjustment>>;

    // Orders

    async fn order_number_in_use(&mut self, number: &str) -> StoreResult<bool>;

    async fn insert_order(&mut self, order: Order) -> StoreResult<Order>;

    async fn insert_order_items(&mut self, items: Vec<OrderItem>) -> StoreResult<Vec<OrderItem>>;

    async fn order(&mut self, id: OrderId) -> StoreResult<Option<Order>>;

    async fn lock_order(&mut self, id: OrderId) -> StoreResult<Option<Order>>;

    /// Lines of an order, ascending by id.
    async fn order_items(&mut self, order: OrderId) -> StoreResult<Vec<OrderItem>>;

    async fn update_order(&mut self, order: &Order) -> StoreResult<()>;

    async fn update_order_item(&mut self, item: &OrderItem) -> StoreResult<()>;

    async fn delete_order_item(&mut self, id: OrderItemId) -> StoreResult<()>;

    /// Orders passing `filter`, newest first.
    async fn orders(&mut self, filter: &OrderFilter) -> StoreResult<Vec<Order>>;

    // Roles and permissions

    async fn permissions(&mut self) -> StoreResult<Vec<Permission>>;

    async fn insert_permissions(
        &mut self,
        permissions: Vec<Permission>,
    ) -> StoreResult<Vec<Permission>>;

    async fn role(&mut self, id: RoleId) -> StoreResult<Option<Role>>;

    async fn role_by_name(&mut self, name: &str) -> StoreResult<Option<Role>>;

    async fn insert_role(&mut self, role: Role) -> StoreResult<Role>;

    /// Grant permissions to a role; already granted ones are skipped.
    async fn grant_permissions(
        &mut self,
        role: RoleId,
        permissions: &[PermissionId],
    ) -> StoreResult<()>;

    async fn role_has_permission(&mut self, role: RoleId, permission: &str) -> StoreResult<bool>;

    // Transaction control

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
