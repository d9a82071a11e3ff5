//! PostgreSQL store engine.
//!
//! Each transaction owns one pooled connection. Row locks are `FOR UPDATE`
//! locks bounded by `SET LOCAL lock_timeout`. Money columns hold minor units.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use tokio_postgres::types::{FromSql, ToSql};
use tokio_postgres::{NoTls, Row};
use tracing::{debug, info, warn};

use souq_commerce::access::{Permission, Role};
use souq_commerce::catalog::{
    AdjustmentReason, InventoryAdjustment, InventoryRecord, Product, ProductStatus, StockKey,
    StoreFront, Variant,
};
use souq_commerce::ids::{
    AdjustmentId, AdminId, BrandId, CategoryId, CurrencyId, InventoryId, OrderId, OrderItemId,
    PermissionId, ProductId, RoleId, StatusId, StoreFrontId, SupplierId, VariantId,
};
use souq_commerce::money::{Currency, Money};
use souq_commerce::orders::{
    FulfillmentStatus, Order, OrderFilter, OrderItem, OrderStatus, PaymentStatus, StatusKind,
    StatusRecord,
};
use souq_commerce::store::{Store, StoreError, StoreResult, StoreTx};

use crate::error::{classify, DbError};

const SCHEMA: &str = include_str!("../sql/schema.sql");

const PRODUCT_COLUMNS: &str = "id, name_en, name_ar, slug, description_en, description_ar, \
    brand_id, category_id, supplier_id, is_internal_supplier, attribute_type, status, \
    is_published, is_featured, is_new, is_best_seller, price, created_at, updated_at, deleted_at";

const VARIANT_COLUMNS: &str = "id, product_id, sku, attribute_value, price, compare_at_price, \
    cost_price, barcode, weight, length, width, height, is_active, created_at, updated_at, \
    deleted_at";

const INVENTORY_COLUMNS: &str = "id, product_variant_id, store_front_id, quantity, \
    reserved_quantity, low_stock_threshold, created_at, updated_at";

const ADJUSTMENT_COLUMNS: &str = "id, variant_inventory_id, adjusted_by, previous_quantity, \
    new_quantity, adjustment_amount, reason, notes, created_at";

const ORDER_SELECT: &str = "SELECT o.id, o.store_front_id, o.order_number, \
    os.slug AS order_status, ps.slug AS payment_status, fs.slug AS fulfillment_status, \
    o.currency_id, o.customer_name, o.customer_email, o.customer_phone, o.subtotal, \
    o.discount_amount, o.tax_amount, o.shipping_amount, o.total_amount, o.notes, \
    o.created_by_id, o.created_at, o.updated_at, o.deleted_at \
    FROM orders o \
    JOIN order_statuses os ON os.id = o.order_status_id \
    JOIN payment_statuses ps ON ps.id = o.payment_status_id \
    JOIN fulfillment_statuses fs ON fs.id = o.fulfillment_status_id";

const ORDER_ITEM_COLUMNS: &str = "id, order_id, product_id, product_variant_id, sku, \
    product_name_snapshot_en, product_name_snapshot_ar, unit_price, cost_price, quantity, \
    total_price";

/// Connection settings for [`PgStore`].
#[derive(Debug, Clone)]
pub struct PgOptions {
    pub max_connections: usize,
    pub lock_timeout: Duration,
}

impl Default for PgOptions {
    fn default() -> Self {
        Self {
            max_connections: 16,
            lock_timeout: Duration::from_secs(5),
        }
    }
}

/// A pooled PostgreSQL store.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
    lock_timeout: Duration,
}

impl PgStore {
    /// Build a pool for `url`. Connections are opened lazily.
    pub fn connect(url: &str, options: &PgOptions) -> Result<Self, DbError> {
        let config: tokio_postgres::Config = url
            .parse()
            .map_err(|e: tokio_postgres::Error| DbError::Config(e.to_string()))?;
        let manager = Manager::from_config(
            config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let pool = Pool::builder(manager)
            .max_size(options.max_connections)
            .build()
            .map_err(|e| DbError::OpenError(e.to_string()))?;
        Ok(Self {
            pool,
            lock_timeout: options.lock_timeout,
        })
    }

    /// Create missing tables and indexes.
    pub async fn migrate(&self) -> Result<(), DbError> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| DbError::OpenError(e.to_string()))?;
        client
            .batch_execute(SCHEMA)
            .await
            .map_err(|e| DbError::Schema(e.to_string()))?;
        info!("schema applied");
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        client
            .batch_execute(&format!(
                "BEGIN; SET LOCAL lock_timeout = '{}ms'",
                self.lock_timeout.as_millis()
            ))
            .await
            .map_err(pg_error)?;
        Ok(Box::new(PgTx {
            client: Some(client),
        }))
    }

    fn engine(&self) -> &'static str {
        "postgres"
    }
}

fn pg_error(e: tokio_postgres::Error) -> StoreError {
    if let Some(db) = e.as_db_error() {
        return classify(db.code().code(), db.message());
    }
    if e.is_closed() {
        return StoreError::Unavailable(e.to_string());
    }
    StoreError::Backend(e.to_string())
}

fn get<'a, T: FromSql<'a>>(row: &'a Row, column: &str) -> StoreResult<T> {
    row.try_get(column).map_err(pg_error)
}

fn money(row: &Row, column: &str) -> StoreResult<Money> {
    Ok(Money::from_minor(get(row, column)?))
}

fn opt_money(row: &Row, column: &str) -> StoreResult<Option<Money>> {
    Ok(get::<Option<i64>>(row, column)?.map(Money::from_minor))
}

fn decode<T>(value: Option<T>, column: &str, raw: &str) -> StoreResult<T> {
    value.ok_or_else(|| StoreError::Backend(format!("unexpected {} value '{}'", column, raw)))
}

fn store_front_from(row: &Row) -> StoreResult<StoreFront> {
    Ok(StoreFront {
        id: StoreFrontId::new(get(row, "id")?),
        name: get(row, "name")?,
        slug: get(row, "slug")?,
        domain: get(row, "domain")?,
        currency: get(row, "currency")?,
        default_language: get(row, "default_language")?,
        is_active: get(row, "is_active")?,
    })
}

fn currency_from(row: &Row) -> StoreResult<Currency> {
    Ok(Currency {
        id: CurrencyId::new(get(row, "id")?),
        code: get(row, "code")?,
        symbol: get(row, "symbol")?,
        name_en: get(row, "name_en")?,
        name_ar: get(row, "name_ar")?,
    })
}

fn status_from(row: &Row) -> StoreResult<StatusRecord> {
    Ok(StatusRecord {
        id: StatusId::new(get(row, "id")?),
        slug: get(row, "slug")?,
        name_en: get(row, "name_en")?,
        name_ar: get(row, "name_ar")?,
    })
}

fn product_from(row: &Row) -> StoreResult<Product> {
    let status: String = get(row, "status")?;
    Ok(Product {
        id: ProductId::new(get(row, "id")?),
        name_en: get(row, "name_en")?,
        name_ar: get(row, "name_ar")?,
        slug: get(row, "slug")?,
        description_en: get(row, "description_en")?,
        description_ar: get(row, "description_ar")?,
        brand_id: get::<Option<i64>>(row, "brand_id")?.map(BrandId::new),
        category_id: get::<Option<i64>>(row, "category_id")?.map(CategoryId::new),
        supplier_id: get::<Option<i64>>(row, "supplier_id")?.map(SupplierId::new),
        is_internal_supplier: get(row, "is_internal_supplier")?,
        attribute_type: get(row, "attribute_type")?,
        status: decode(ProductStatus::from_str(&status), "status", &status)?,
        is_published: get(row, "is_published")?,
        is_featured: get(row, "is_featured")?,
        is_new: get(row, "is_new")?,
        is_best_seller: get(row, "is_best_seller")?,
        price: money(row, "price")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
        deleted_at: get(row, "deleted_at")?,
    })
}

fn variant_from(row: &Row) -> StoreResult<Variant> {
    Ok(Variant {
        id: VariantId::new(get(row, "id")?),
        product_id: ProductId::new(get(row, "product_id")?),
        sku: get(row, "sku")?,
        attribute_value: get(row, "attribute_value")?,
        price: opt_money(row, "price")?,
        compare_at_price: opt_money(row, "compare_at_price")?,
        cost_price: opt_money(row, "cost_price")?,
        barcode: get(row, "barcode")?,
        weight: get(row, "weight")?,
        length: get(row, "length")?,
        width: get(row, "width")?,
        height: get(row, "height")?,
        is_active: get(row, "is_active")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
        deleted_at: get(row, "deleted_at")?,
    })
}

fn inventory_from(row: &Row) -> StoreResult<InventoryRecord> {
    Ok(InventoryRecord {
        id: InventoryId::new(get(row, "id")?),
        variant_id: VariantId::new(get(row, "product_variant_id")?),
        store_front_id: StoreFrontId::new(get(row, "store_front_id")?),
        quantity: get(row, "quantity")?,
        reserved: get(row, "reserved_quantity")?,
        low_stock_threshold: get(row, "low_stock_threshold")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

fn adjustment_from(row: &Row) -> StoreResult<InventoryAdjustment> {
    let reason: String = get(row, "reason")?;
    Ok(InventoryAdjustment {
        id: AdjustmentId::new(get(row, "id")?),
        inventory_id: InventoryId::new(get(row, "variant_inventory_id")?),
        adjusted_by: AdminId::new(get(row, "adjusted_by")?),
        previous_quantity: get(row, "previous_quantity")?,
        new_quantity: get(row, "new_quantity")?,
        delta: get(row, "adjustment_amount")?,
        reason: decode(AdjustmentReason::from_str(&reason), "reason", &reason)?,
        notes: get(row, "notes")?,
        created_at: get(row, "created_at")?,
    })
}

fn order_from(row: &Row) -> StoreResult<Order> {
    let order_status: String = get(row, "order_status")?;
    let payment_status: String = get(row, "payment_status")?;
    let fulfillment_status: String = get(row, "fulfillment_status")?;
    Ok(Order {
        id: OrderId::new(get(row, "id")?),
        store_front_id: StoreFrontId::new(get(row, "store_front_id")?),
        order_number: get(row, "order_number")?,
        order_status: decode(OrderStatus::from_str(&order_status), "order_status", &order_status)?,
        payment_status: decode(
            PaymentStatus::from_str(&payment_status),
            "payment_status",
            &payment_status,
        )?,
        fulfillment_status: decode(
            FulfillmentStatus::from_str(&fulfillment_status),
            "fulfillment_status",
            &fulfillment_status,
        )?,
        currency_id: CurrencyId::new(get(row, "currency_id")?),
        customer_name: get(row, "customer_name")?,
        customer_email: get(row, "customer_email")?,
        customer_phone: get(row, "customer_phone")?,
        subtotal: money(row, "subtotal")?,
        discount_amount: money(row, "discount_amount")?,
        tax_amount: money(row, "tax_amount")?,
        shipping_amount: money(row, "shipping_amount")?,
        total_amount: money(row, "total_amount")?,
        notes: get(row, "notes")?,
        created_by_id: AdminId::new(get(row, "created_by_id")?),
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
        deleted_at: get(row, "deleted_at")?,
    })
}

fn order_item_from(row: &Row) -> StoreResult<OrderItem> {
    Ok(OrderItem {
        id: OrderItemId::new(get(row, "id")?),
        order_id: OrderId::new(get(row, "order_id")?),
        product_id: ProductId::new(get(row, "product_id")?),
        variant_id: VariantId::new(get(row, "product_variant_id")?),
        sku: get(row, "sku")?,
        product_name_snapshot_en: get(row, "product_name_snapshot_en")?,
        product_name_snapshot_ar: get(row, "product_name_snapshot_ar")?,
        unit_price: money(row, "unit_price")?,
        cost_price: money(row, "cost_price")?,
        quantity: get(row, "quantity")?,
        total_price: money(row, "total_price")?,
    })
}

fn permission_from(row: &Row) -> StoreResult<Permission> {
    Ok(Permission {
        id: PermissionId::new(get(row, "id")?),
        name: get(row, "name")?,
        description: get(row, "description")?,
    })
}

fn role_from(row: &Row) -> StoreResult<Role> {
    Ok(Role {
        id: RoleId::new(get(row, "id")?),
        name: get(row, "name")?,
        description: get(row, "description")?,
    })
}

fn collect<T>(rows: Vec<Row>, map: fn(&Row) -> StoreResult<T>) -> StoreResult<Vec<T>> {
    rows.iter().map(map).collect()
}

fn opt_money_minor(value: Option<Money>) -> Option<i64> {
    value.map(|m| m.minor())
}

/// An open PostgreSQL transaction.
pub struct PgTx {
    client: Option<Object>,
}

type Params<'a> = &'a [&'a (dyn ToSql + Sync)];

impl PgTx {
    fn conn(&self) -> StoreResult<&Object> {
        self.client
            .as_ref()
            .ok_or_else(|| StoreError::Backend("transaction already finished".into()))
    }

    async fn query(&self, sql: &str, params: Params<'_>) -> StoreResult<Vec<Row>> {
        self.conn()?.query(sql, params).await.map_err(pg_error)
    }

    async fn query_opt(&self, sql: &str, params: Params<'_>) -> StoreResult<Option<Row>> {
        self.conn()?.query_opt(sql, params).await.map_err(pg_error)
    }

    async fn query_one(&self, sql: &str, params: Params<'_>) -> StoreResult<Row> {
        self.conn()?.query_one(sql, params).await.map_err(pg_error)
    }

    async fn execute(&self, sql: &str, params: Params<'_>) -> StoreResult<u64> {
        self.conn()?.execute(sql, params).await.map_err(pg_error)
    }

    /// Execute an update that must touch exactly one row.
    async fn update_one(&self, what: String, sql: &str, params: Params<'_>) -> StoreResult<()> {
        match self.execute(sql, params).await? {
            0 => Err(StoreError::RowNotFound(what)),
            _ => Ok(()),
        }
    }

    async fn end(&mut self, statement: &str) -> StoreResult<()> {
        let client = self
            .client
            .take()
            .ok_or_else(|| StoreError::Backend("transaction already finished".into()))?;
        client.batch_execute(statement).await.map_err(pg_error)
    }
}

impl Drop for PgTx {
    fn drop(&mut self) {
        let Some(client) = self.client.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = client.batch_execute("ROLLBACK").await {
                        warn!(error = %e, "rollback of abandoned transaction failed");
                    }
                });
            }
            Err(_) => warn!("transaction dropped outside a runtime; connection discarded"),
        }
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn store_front(&mut self, id: StoreFrontId) -> StoreResult<Option<StoreFront>> {
        self.query_opt("SELECT * FROM store_fronts WHERE id = $1", &[&id.get()])
            .await?
            .as_ref()
            .map(store_front_from)
            .transpose()
    }

    async fn store_front_by_domain(&mut self, domain: &str) -> StoreResult<Option<StoreFront>> {
        self.query_opt(
            "SELECT * FROM store_fronts WHERE lower(domain) = lower($1) AND is_active",
            &[&domain],
        )
        .await?
        .as_ref()
        .map(store_front_from)
        .transpose()
    }

    async fn insert_store_front(&mut self, mut store: StoreFront) -> StoreResult<StoreFront> {
        let row = self
            .query_one(
                "INSERT INTO store_fronts (name, slug, domain, currency, default_language, is_active) \
                 VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
                &[
                    &store.name,
                    &store.slug,
                    &store.domain,
                    &store.currency,
                    &store.default_language,
                    &store.is_active,
                ],
            )
            .await?;
        store.id = StoreFrontId::new(get(&row, "id")?);
        Ok(store)
    }

    async fn currency_by_code(&mut self, code: &str) -> StoreResult<Option<Currency>> {
        self.query_opt("SELECT * FROM currencies WHERE upper(code) = upper($1)", &[&code])
            .await?
            .as_ref()
            .map(currency_from)
            .transpose()
    }

    async fn currencies(&mut self) -> StoreResult<Vec<Currency>> {
        let rows = self.query("SELECT * FROM currencies ORDER BY id", &[]).await?;
        collect(rows, currency_from)
    }

    async fn insert_currency(&mut self, mut currency: Currency) -> StoreResult<Currency> {
        let row = self
            .query_one(
                "INSERT INTO currencies (code, symbol, name_en, name_ar) VALUES ($1, $2, $3, $4) \
                 RETURNING id",
                &[&currency.code, &currency.symbol, &currency.name_en, &currency.name_ar],
            )
            .await?;
        currency.id = CurrencyId::new(get(&row, "id")?);
        Ok(currency)
    }

    async fn status(&mut self, kind: StatusKind, slug: &str) -> StoreResult<Option<StatusRecord>> {
        let sql = format!("SELECT * FROM {} WHERE slug = $1", kind.table());
        self.query_opt(&sql, &[&slug])
            .await?
            .as_ref()
            .map(status_from)
            .transpose()
    }

    async fn statuses(&mut self, kind: StatusKind) -> StoreResult<Vec<StatusRecord>> {
        let sql = format!("SELECT * FROM {} ORDER BY id", kind.table());
        let rows = self.query(&sql, &[]).await?;
        collect(rows, status_from)
    }

    async fn insert_status(
        &mut self,
        kind: StatusKind,
        mut status: StatusRecord,
    ) -> StoreResult<StatusRecord> {
        let sql = format!(
            "INSERT INTO {} (slug, name_en, name_ar) VALUES ($1, $2, $3) RETURNING id",
            kind.table()
        );
        let row = self
            .query_one(&sql, &[&status.slug, &status.name_en, &status.name_ar])
            .await?;
        status.id = StatusId::new(get(&row, "id")?);
        Ok(status)
    }

    async fn product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE id = $1 AND deleted_at IS NULL",
            PRODUCT_COLUMNS
        );
        self.query_opt(&sql, &[&id.get()])
            .await?
            .as_ref()
            .map(product_from)
            .transpose()
    }

    async fn lock_product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
            PRODUCT_COLUMNS
        );
        self.query_opt(&sql, &[&id.get()])
            .await?
            .as_ref()
            .map(product_from)
            .transpose()
    }

    async fn insert_product(&mut self, mut product: Product) -> StoreResult<Product> {
        let row = self
            .query_one(
                "INSERT INTO products (name_en, name_ar, slug, description_en, description_ar, \
                 brand_id, category_id, supplier_id, is_internal_supplier, attribute_type, status, \
                 is_published, is_featured, is_new, is_best_seller, price, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
                 RETURNING id",
                &[
                    &product.name_en,
                    &product.name_ar,
                    &product.slug,
                    &product.description_en,
                    &product.description_ar,
                    &product.brand_id.map(BrandId::get),
                    &product.category_id.map(CategoryId::get),
                    &product.supplier_id.map(SupplierId::get),
                    &product.is_internal_supplier,
                    &product.attribute_type,
                    &product.status.as_str(),
                    &product.is_published,
                    &product.is_featured,
                    &product.is_new,
                    &product.is_best_seller,
                    &product.price.minor(),
                    &product.created_at,
                    &product.updated_at,
                ],
            )
            .await?;
        product.id = ProductId::new(get(&row, "id")?);
        Ok(product)
    }

    async fn update_product(&mut self, product: &Product) -> StoreResult<()> {
        self.update_one(
            format!("product {}", product.id),
            "UPDATE products SET name_en = $2, name_ar = $3, slug = $4, description_en = $5, \
             description_ar = $6, brand_id = $7, category_id = $8, supplier_id = $9, \
             is_internal_supplier = $10, attribute_type = $11, status = $12, is_published = $13, \
             is_featured = $14, is_new = $15, is_best_seller = $16, price = $17, updated_at = $18, \
             deleted_at = $19 WHERE id = $1",
            &[
                &product.id.get(),
                &product.name_en,
                &product.name_ar,
                &product.slug,
                &product.description_en,
                &product.description_ar,
                &product.brand_id.map(BrandId::get),
                &product.category_id.map(CategoryId::get),
                &product.supplier_id.map(SupplierId::get),
                &product.is_internal_supplier,
                &product.attribute_type,
                &product.status.as_str(),
                &product.is_published,
                &product.is_featured,
                &product.is_new,
                &product.is_best_seller,
                &product.price.minor(),
                &product.updated_at,
                &product.deleted_at,
            ],
        )
        .await
    }

    async fn product_store_fronts(&mut self, id: ProductId) -> StoreResult<Vec<StoreFrontId>> {
        let rows = self
            .query(
                "SELECT store_front_id FROM product_store_fronts WHERE product_id = $1 \
                 ORDER BY store_front_id",
                &[&id.get()],
            )
            .await?;
        rows.iter()
            .map(|row| get(row, "store_front_id").map(StoreFrontId::new))
            .collect()
    }

    async fn set_product_store_fronts(
        &mut self,
        id: ProductId,
        stores: &[StoreFrontId],
    ) -> StoreResult<()> {
        let ids: Vec<i64> = stores.iter().map(|s| s.get()).collect();
        self.execute("DELETE FROM product_store_fronts WHERE product_id = $1", &[&id.get()])
            .await?;
        self.execute(
            "INSERT INTO product_store_fronts (product_id, store_front_id) \
             SELECT $1, unnest($2::BIGINT[]) ON CONFLICT DO NOTHING",
            &[&id.get(), &ids],
        )
        .await?;
        Ok(())
    }

    async fn slug_in_use(
        &mut self,
        slug: &str,
        store: StoreFrontId,
        exclude: Option<ProductId>,
    ) -> StoreResult<bool> {
        let row = self
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM products p \
                 JOIN product_store_fronts ps ON ps.product_id = p.id \
                 WHERE p.slug = $1 AND ps.store_front_id = $2 AND p.deleted_at IS NULL \
                 AND ($3::BIGINT IS NULL OR p.id <> $3)) AS taken",
                &[&slug, &store.get(), &exclude.map(ProductId::get)],
            )
            .await?;
        get(&row, "taken")
    }

    async fn variant(&mut self, id: VariantId) -> StoreResult<Option<Variant>> {
        let sql = format!(
            "SELECT {} FROM product_variants WHERE id = $1 AND deleted_at IS NULL",
            VARIANT_COLUMNS
        );
        self.query_opt(&sql, &[&id.get()])
            .await?
            .as_ref()
            .map(variant_from)
            .transpose()
    }

    async fn product_variants(&mut self, product: ProductId) -> StoreResult<Vec<Variant>> {
        let sql = format!(
            "SELECT {} FROM product_variants WHERE product_id = $1 AND deleted_at IS NULL \
             ORDER BY id",
            VARIANT_COLUMNS
        );
        let rows = self.query(&sql, &[&product.get()]).await?;
        collect(rows, variant_from)
    }

    async fn insert_variant(&mut self, mut variant: Variant) -> StoreResult<Variant> {
        let row = self
            .query_one(
                "INSERT INTO product_variants (product_id, sku, attribute_value, price, \
                 compare_at_price, cost_price, barcode, weight, length, width, height, is_active, \
                 created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) RETURNING id",
                &[
                    &variant.product_id.get(),
                    &variant.sku,
                    &variant.attribute_value,
                    &opt_money_minor(variant.price),
                    &opt_money_minor(variant.compare_at_price),
                    &opt_money_minor(variant.cost_price),
                    &variant.barcode,
                    &variant.weight,
                    &variant.length,
                    &variant.width,
                    &variant.height,
                    &variant.is_active,
                    &variant.created_at,
                    &variant.updated_at,
                ],
            )
            .await?;
        variant.id = VariantId::new(get(&row, "id")?);
        Ok(variant)
    }

    async fn update_variant(&mut self, variant: &Variant) -> StoreResult<()> {
        self.update_one(
            format!("variant {}", variant.id),
            "UPDATE product_variants SET sku = $2, attribute_value = $3, price = $4, \
             compare_at_price = $5, cost_price = $6, barcode = $7, weight = $8, length = $9, \
             width = $10, height = $11, is_active = $12, updated_at = $13, deleted_at = $14 \
             WHERE id = $1",
            &[
                &variant.id.get(),
                &variant.sku,
                &variant.attribute_value,
                &opt_money_minor(variant.price),
                &opt_money_minor(variant.compare_at_price),
                &opt_money_minor(variant.cost_price),
                &variant.barcode,
                &variant.weight,
                &variant.length,
                &variant.width,
                &variant.height,
                &variant.is_active,
                &variant.updated_at,
                &variant.deleted_at,
            ],
        )
        .await
    }

    async fn sku_in_use(&mut self, sku: &str, exclude: Option<VariantId>) -> StoreResult<bool> {
        let row = self
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM product_variants WHERE sku = $1 \
                 AND deleted_at IS NULL AND ($2::BIGINT IS NULL OR id <> $2)) AS taken",
                &[&sku, &exclude.map(VariantId::get)],
            )
            .await?;
        get(&row, "taken")
    }

    async fn count_active_variants(&mut self, product: ProductId) -> StoreResult<i64> {
        let row = self
            .query_one(
                "SELECT COUNT(*) AS active FROM product_variants \
                 WHERE product_id = $1 AND is_active AND deleted_at IS NULL",
                &[&product.get()],
            )
            .await?;
        get(&row, "active")
    }

    async fn soft_delete_product(&mut self, id: ProductId, at: DateTime<Utc>) -> StoreResult<()> {
        self.update_one(
            format!("product {}", id),
            "UPDATE products SET deleted_at = $2, updated_at = $2 \
             WHERE id = $1 AND deleted_at IS NULL",
            &[&id.get(), &at],
        )
        .await?;
        self.execute(
            "UPDATE product_variants SET deleted_at = $2, updated_at = $2 \
             WHERE product_id = $1 AND deleted_at IS NULL",
            &[&id.get(), &at],
        )
        .await?;
        Ok(())
    }

    async fn published_products(&mut self, store: StoreFrontId) -> StoreResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE status = 'active' AND is_published \
             AND deleted_at IS NULL \
             AND id IN (SELECT product_id FROM product_store_fronts WHERE store_front_id = $1) \
             ORDER BY id",
            PRODUCT_COLUMNS
        );
        let rows = self.query(&sql, &[&store.get()]).await?;
        collect(rows, product_from)
    }

    async fn published_product_by_slug(
        &mut self,
        store: StoreFrontId,
        slug: &str,
    ) -> StoreResult<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE slug = $2 AND status = 'active' AND is_published \
             AND deleted_at IS NULL \
             AND id IN (SELECT product_id FROM product_store_fronts WHERE store_front_id = $1) \
             ORDER BY id LIMIT 1",
            PRODUCT_COLUMNS
        );
        self.query_opt(&sql, &[&store.get(), &slug])
            .await?
            .as_ref()
            .map(product_from)
            .transpose()
    }

    async fn lock_inventory(&mut self, key: StockKey) -> StoreResult<Option<InventoryRecord>> {
        let sql = format!(
            "SELECT {} FROM variant_inventories \
             WHERE product_variant_id = $1 AND store_front_id = $2 FOR UPDATE",
            INVENTORY_COLUMNS
        );
        self.query_opt(&sql, &[&key.variant_id.get(), &key.store_front_id.get()])
            .await?
            .as_ref()
            .map(inventory_from)
            .transpose()
    }

    async fn lock_inventory_by_id(
        &mut self,
        id: InventoryId,
    ) -> StoreResult<Option<InventoryRecord>> {
        let sql = format!(
            "SELECT {} FROM variant_inventories WHERE id = $1 FOR UPDATE",
            INVENTORY_COLUMNS
        );
        self.query_opt(&sql, &[&id.get()])
            .await?
            .as_ref()
            .map(inventory_from)
            .transpose()
    }

    async fn insert_inventory(&mut self, record: InventoryRecord) -> StoreResult<InventoryRecord> {
        let inserted = self
            .execute(
                "INSERT INTO variant_inventories (product_variant_id, store_front_id, quantity, \
                 reserved_quantity, low_stock_threshold, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 ON CONFLICT (product_variant_id, store_front_id) DO NOTHING",
                &[
                    &record.variant_id.get(),
                    &record.store_front_id.get(),
                    &record.quantity,
                    &record.reserved,
                    &record.low_stock_threshold,
                    &record.created_at,
                    &record.updated_at,
                ],
            )
            .await?;
        if inserted == 0 {
            debug!(key = %record.key(), "inventory row created concurrently");
        }
        self.lock_inventory(record.key())
            .await?
            .ok_or_else(|| StoreError::RowNotFound(format!("inventory of {}", record.key())))
    }

    async fn update_inventory(&mut self, record: &InventoryRecord) -> StoreResult<()> {
        self.update_one(
            format!("inventory {}", record.id),
            "UPDATE variant_inventories SET quantity = $2, reserved_quantity = $3, \
             low_stock_threshold = $4, updated_at = $5 WHERE id = $1",
            &[
                &record.id.get(),
                &record.quantity,
                &record.reserved,
                &record.low_stock_threshold,
                &record.updated_at,
            ],
        )
        .await
    }

    async fn inventory(&mut self, key: StockKey) -> StoreResult<Option<InventoryRecord>> {
        let sql = format!(
            "SELECT {} FROM variant_inventories WHERE product_variant_id = $1 AND store_front_id = $2",
            INVENTORY_COLUMNS
        );
        self.query_opt(&sql, &[&key.variant_id.get(), &key.store_front_id.get()])
            .await?
            .as_ref()
            .map(inventory_from)
            .transpose()
    }

    async fn inventory_by_id(&mut self, id: InventoryId) -> StoreResult<Option<InventoryRecord>> {
        let sql = format!("SELECT {} FROM variant_inventories WHERE id = $1", INVENTORY_COLUMNS);
        self.query_opt(&sql, &[&id.get()])
            .await?
            .as_ref()
            .map(inventory_from)
            .transpose()
    }

    async fn store_inventory(&mut self, store: StoreFrontId) -> StoreResult<Vec<InventoryRecord>> {
        let sql = format!(
            "SELECT {} FROM variant_inventories WHERE store_front_id = $1 ORDER BY id",
            INVENTORY_COLUMNS
        );
        let rows = self.query(&sql, &[&store.get()]).await?;
        collect(rows, inventory_from)
    }

    async fn product_has_stock(&mut self, product: ProductId) -> StoreResult<bool> {
        let row = self
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM variant_inventories vi \
                 JOIN product_variants pv ON pv.id = vi.product_variant_id \
                 WHERE pv.product_id = $1 AND pv.deleted_at IS NULL AND vi.quantity > 0) AS stocked",
                &[&product.get()],
            )
            .await?;
        get(&row, "stocked")
    }

    async fn insert_adjustment(
        &mut self,
        mut adjustment: InventoryAdjustment,
    ) -> StoreResult<InventoryAdjustment> {
        let row = self
            .query_one(
                "INSERT INTO inventory_adjustments (variant_inventory_id, adjusted_by, \
                 previous_quantity, new_quantity, adjustment_amount, reason, notes, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
                &[
                    &adjustment.inventory_id.get(),
                    &adjustment.adjusted_by.get(),
                    &adjustment.previous_quantity,
                    &adjustment.new_quantity,
                    &adjustment.delta,
                    &adjustment.reason.as_str(),
                    &adjustment.notes,
                    &adjustment.created_at,
                ],
            )
            .await?;
        adjustment.id = AdjustmentId::new(get(&row, "id")?);
        Ok(adjustment)
    }

    async fn adjustments(
        &mut self,
        inventory: InventoryId,
    ) -> StoreResult<Vec<InventoryAdjustment>> {
        let sql = format!(
            "SELECT {} FROM inventory_adjustments WHERE variant_inventory_id = $1 \
             ORDER BY created_at DESC, id DESC",
            ADJUSTMENT_COLUMNS
        );
        let rows = self.query(&sql, &[&inventory.get()]).await?;
        collect(rows, adjustment_from)
    }

    async fn order_number_in_use(&mut self, number: &str) -> StoreResult<bool> {
        let row = self
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM orders WHERE order_number = $1) AS taken",
                &[&number],
            )
            .await?;
        get(&row, "taken")
    }

    async fn insert_order(&mut self, mut order: Order) -> StoreResult<Order> {
        let row = self
            .query_one(
                "INSERT INTO orders (store_front_id, order_number, order_status_id, \
                 payment_status_id, fulfillment_status_id, currency_id, customer_name, \
                 customer_email, customer_phone, subtotal, discount_amount, tax_amount, \
                 shipping_amount, total_amount, notes, created_by_id, created_at, updated_at) \
                 VALUES ($1, $2, \
                 (SELECT id FROM order_statuses WHERE slug = $3), \
                 (SELECT id FROM payment_statuses WHERE slug = $4), \
                 (SELECT id FROM fulfillment_statuses WHERE slug = $5), \
                 $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) RETURNING id",
                &[
                    &order.store_front_id.get(),
                    &order.order_number,
                    &order.order_status.as_str(),
                    &order.payment_status.as_str(),
                    &order.fulfillment_status.as_str(),
                    &order.currency_id.get(),
                    &order.customer_name,
                    &order.customer_email,
                    &order.customer_phone,
                    &order.subtotal.minor(),
                    &order.discount_amount.minor(),
                    &order.tax_amount.minor(),
                    &order.shipping_amount.minor(),
                    &order.total_amount.minor(),
                    &order.notes,
                    &order.created_by_id.get(),
                    &order.created_at,
                    &order.updated_at,
                ],
            )
            .await?;
        order.id = OrderId::new(get(&row, "id")?);
        Ok(order)
    }

    async fn insert_order_items(&mut self, items: Vec<OrderItem>) -> StoreResult<Vec<OrderItem>> {
        let mut out = Vec::with_capacity(items.len());
        for mut item in items {
            let row = self
                .query_one(
                    "INSERT INTO order_items (order_id, product_id, product_variant_id, sku, \
                     product_name_snapshot_en, product_name_snapshot_ar, unit_price, cost_price, \
                     quantity, total_price) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
                    &[
                        &item.order_id.get(),
                        &item.product_id.get(),
                        &item.variant_id.get(),
                        &item.sku,
                        &item.product_name_snapshot_en,
                        &item.product_name_snapshot_ar,
                        &item.unit_price.minor(),
                        &item.cost_price.minor(),
                        &item.quantity,
                        &item.total_price.minor(),
                    ],
                )
                .await?;
            item.id = OrderItemId::new(get(&row, "id")?);
            out.push(item);
        }
        Ok(out)
    }

    async fn order(&mut self, id: OrderId) -> StoreResult<Option<Order>> {
        let sql = format!("{} WHERE o.id = $1 AND o.deleted_at IS NULL", ORDER_SELECT);
        self.query_opt(&sql, &[&id.get()])
            .await?
            .as_ref()
            .map(order_from)
            .transpose()
    }

    async fn lock_order(&mut self, id: OrderId) -> StoreResult<Option<Order>> {
        let sql = format!(
            "{} WHERE o.id = $1 AND o.deleted_at IS NULL FOR UPDATE OF o",
            ORDER_SELECT
        );
        self.query_opt(&sql, &[&id.get()])
            .await?
            .as_ref()
            .map(order_from)
            .transpose()
    }

    async fn order_items(&mut self, order: OrderId) -> StoreResult<Vec<OrderItem>> {
        let sql = format!(
            "SELECT {} FROM order_items WHERE order_id = $1 ORDER BY id",
            ORDER_ITEM_COLUMNS
        );
        let rows = self.query(&sql, &[&order.get()]).await?;
        collect(rows, order_item_from)
    }

    async fn update_order(&mut self, order: &Order) -> StoreResult<()> {
        self.update_one(
            format!("order {}", order.id),
            "UPDATE orders SET \
             order_status_id = (SELECT id FROM order_statuses WHERE slug = $2), \
             payment_status_id = (SELECT id FROM payment_statuses WHERE slug = $3), \
             fulfillment_status_id = (SELECT id FROM fulfillment_statuses WHERE slug = $4), \
             customer_name = $5, customer_email = $6, customer_phone = $7, subtotal = $8, \
             discount_amount = $9, tax_amount = $10, shipping_amount = $11, total_amount = $12, \
             notes = $13, updated_at = $14, deleted_at = $15 WHERE id = $1",
            &[
                &order.id.get(),
                &order.order_status.as_str(),
                &order.payment_status.as_str(),
                &order.fulfillment_status.as_str(),
                &order.customer_name,
                &order.customer_email,
                &order.customer_phone,
                &order.subtotal.minor(),
                &order.discount_amount.minor(),
                &order.tax_amount.minor(),
                &order.shipping_amount.minor(),
                &order.total_amount.minor(),
                &order.notes,
                &order.updated_at,
                &order.deleted_at,
            ],
        )
        .await
    }

    async fn update_order_item(&mut self, item: &OrderItem) -> StoreResult<()> {
        self.update_one(
            format!("order item {}", item.id),
            "UPDATE order_items SET quantity = $2, unit_price = $3, total_price = $4 WHERE id = $1",
            &[
                &item.id.get(),
                &item.quantity,
                &item.unit_price.minor(),
                &item.total_price.minor(),
            ],
        )
        .await
    }

    async fn delete_order_item(&mut self, id: OrderItemId) -> StoreResult<()> {
        self.update_one(
            format!("order item {}", id),
            "DELETE FROM order_items WHERE id = $1",
            &[&id.get()],
        )
        .await
    }

    async fn orders(&mut self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let sql = format!(
            "{} WHERE o.deleted_at IS NULL \
             AND ($1::BIGINT IS NULL OR o.store_front_id = $1) \
             AND ($2::TEXT IS NULL OR os.slug = $2) \
             AND ($3::TEXT IS NULL OR ps.slug = $3) \
             AND ($4::TEXT IS NULL OR o.order_number ILIKE $4 OR o.customer_name ILIKE $4 \
                  OR o.customer_email ILIKE $4 OR o.customer_phone ILIKE $4) \
             ORDER BY o.created_at DESC, o.id DESC",
            ORDER_SELECT
        );
        let trimmed = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let search = trimmed(&filter.search).map(|term| {
            let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
            format!("%{}%", escaped)
        });
        let rows = self
            .query(
                &sql,
                &[
                    &filter.store_front_id.map(StoreFrontId::get),
                    &trimmed(&filter.status),
                    &trimmed(&filter.payment_status),
                    &search,
                ],
            )
            .await?;
        collect(rows, order_from)
    }

    async fn permissions(&mut self) -> StoreResult<Vec<Permission>> {
        let rows = self.query("SELECT * FROM permissions ORDER BY id", &[]).await?;
        collect(rows, permission_from)
    }

    async fn insert_permissions(
        &mut self,
        permissions: Vec<Permission>,
    ) -> StoreResult<Vec<Permission>> {
        let mut out = Vec::with_capacity(permissions.len());
        for mut permission in permissions {
            let row = self
                .query_one(
                    "INSERT INTO permissions (name, description) VALUES ($1, $2) RETURNING id",
                    &[&permission.name, &permission.description],
                )
                .await?;
            permission.id = PermissionId::new(get(&row, "id")?);
            out.push(permission);
        }
        Ok(out)
    }

    async fn role(&mut self, id: RoleId) -> StoreResult<Option<Role>> {
        self.query_opt("SELECT * FROM roles WHERE id = $1", &[&id.get()])
            .await?
            .as_ref()
            .map(role_from)
            .transpose()
    }

    async fn role_by_name(&mut self, name: &str) -> StoreResult<Option<Role>> {
        self.query_opt("SELECT * FROM roles WHERE name = $1", &[&name])
            .await?
            .as_ref()
            .map(role_from)
            .transpose()
    }

    async fn insert_role(&mut self, mut role: Role) -> StoreResult<Role> {
        let row = self
            .query_one(
                "INSERT INTO roles (name, description) VALUES ($1, $2) RETURNING id",
                &[&role.name, &role.description],
            )
            .await?;
        role.id = RoleId::new(get(&row, "id")?);
        Ok(role)
    }

    async fn grant_permissions(
        &mut self,
        role: RoleId,
        permissions: &[PermissionId],
    ) -> StoreResult<()> {
        let ids: Vec<i64> = permissions.iter().map(|p| p.get()).collect();
        self.execute(
            "INSERT INTO role_permissions (role_id, permission_id) \
             SELECT $1, unnest($2::BIGINT[]) ON CONFLICT DO NOTHING",
            &[&role.get(), &ids],
        )
        .await?;
        Ok(())
    }

    async fn role_has_permission(&mut self, role: RoleId, permission: &str) -> StoreResult<bool> {
        let row = self
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM role_permissions rp \
                 JOIN permissions p ON p.id = rp.permission_id \
                 WHERE rp.role_id = $1 AND p.name = $2) AS granted",
                &[&role.get(), &permission],
            )
            .await?;
        get(&row, "granted")
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut tx = self;
        tx.end("COMMIT").await
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        let mut tx = self;
        tx.end("ROLLBACK").await
    }
}
