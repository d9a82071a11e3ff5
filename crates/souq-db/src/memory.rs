//! In-memory store engine.
//!
//! Reads see the latest committed rows overlaid with the transaction's own
//! writes, the same read-committed view PostgreSQL gives. Row locks are async
//! mutexes keyed by row identity and held until the transaction ends. Commit
//! checks unique constraints and publishes the write set atomically; dropping
//! a transaction discards it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, trace};

use souq_commerce::access::{Permission, Role};
use souq_commerce::catalog::{
    InventoryAdjustment, InventoryRecord, Product, StockKey, StoreFront, Variant,
};
use souq_commerce::ids::{
    AdjustmentId, CurrencyId, InventoryId, OrderId, OrderItemId, PermissionId, ProductId, RoleId,
    StatusId, StoreFrontId, VariantId,
};
use souq_commerce::money::Currency;
use souq_commerce::orders::{Order, OrderFilter, OrderItem, StatusKind, StatusRecord};
use souq_commerce::store::{Store, StoreError, StoreResult, StoreTx};

/// How long a transaction waits for a row lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Identity of a lockable row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum LockKey {
    Stock(StockKey),
    Product(ProductId),
    Order(OrderId),
    Role(RoleId),
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKey::Stock(key) => write!(f, "inventory of {}", key),
            LockKey::Product(id) => write!(f, "product {}", id),
            LockKey::Order(id) => write!(f, "order {}", id),
            LockKey::Role(id) => write!(f, "role {}", id),
        }
    }
}

#[derive(Default)]
struct Tables {
    store_fronts: BTreeMap<StoreFrontId, StoreFront>,
    currencies: BTreeMap<CurrencyId, Currency>,
    statuses: BTreeMap<(StatusKind, StatusId), StatusRecord>,
    products: BTreeMap<ProductId, Product>,
    assignments: BTreeMap<ProductId, BTreeSet<StoreFrontId>>,
    variants: BTreeMap<VariantId, Variant>,
    inventory: BTreeMap<InventoryId, InventoryRecord>,
    adjustments: BTreeMap<AdjustmentId, InventoryAdjustment>,
    orders: BTreeMap<OrderId, Order>,
    order_items: BTreeMap<OrderItemId, OrderItem>,
    permissions: BTreeMap<PermissionId, Permission>,
    roles: BTreeMap<RoleId, Role>,
    grants: BTreeMap<RoleId, BTreeSet<PermissionId>>,
}

/// Id sequences. Like database sequences they are not rolled back.
#[derive(Default)]
struct Sequences {
    store_front: AtomicI64,
    currency: AtomicI64,
    status: AtomicI64,
    product: AtomicI64,
    variant: AtomicI64,
    inventory: AtomicI64,
    adjustment: AtomicI64,
    order: AtomicI64,
    order_item: AtomicI64,
    permission: AtomicI64,
    role: AtomicI64,
}

fn next(seq: &AtomicI64) -> i64 {
    seq.fetch_add(1, Ordering::Relaxed) + 1
}

struct Shared {
    committed: Mutex<Tables>,
    locks: Mutex<HashMap<LockKey, Arc<tokio::sync::Mutex<()>>>>,
    seq: Sequences,
    lock_timeout: Duration,
}

impl Shared {
    /// Forget lock entries nobody holds or waits on.
    fn prune_locks(&self, keys: impl IntoIterator<Item = LockKey>) {
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        for key in keys {
            if locks.get(&key).is_some_and(|mutex| Arc::strong_count(mutex) == 1) {
                locks.remove(&key);
            }
        }
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("memory store state poisoned".into())
}

/// A process-local store for development and tests.
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                committed: Mutex::new(Tables::default()),
                locks: Mutex::new(HashMap::new()),
                seq: Sequences::default(),
                lock_timeout,
            }),
        }
    }
}

#[cfg(test)]
impl MemoryStore {
    fn lock_entries(&self) -> usize {
        self.shared.locks.lock().map(|locks| locks.len()).unwrap_or_default()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        Ok(Box::new(MemoryTx {
            shared: Arc::clone(&self.shared),
            local: Tables::default(),
            removed_items: BTreeSet::new(),
            held: HashMap::new(),
        }))
    }

    fn engine(&self) -> &'static str {
        "memory"
    }
}

/// Committed rows with a transaction's writes on top.
#[derive(Clone, Copy)]
struct View<'a> {
    base: &'a Tables,
    local: &'a Tables,
    removed_items: &'a BTreeSet<OrderItemId>,
}

/// Entries of `base` not shadowed by `local`, then those of `local`.
fn entries<'a, K: Ord, V>(
    base: &'a BTreeMap<K, V>,
    local: &'a BTreeMap<K, V>,
) -> impl Iterator<Item = (&'a K, &'a V)> + 'a {
    base.iter()
        .filter(move |(k, _)| !local.contains_key(*k))
        .chain(local.iter())
}

fn rows<'a, K: Ord, V>(
    base: &'a BTreeMap<K, V>,
    local: &'a BTreeMap<K, V>,
) -> impl Iterator<Item = &'a V> + 'a {
    entries(base, local).map(|(_, v)| v)
}

fn row<'a, K: Ord, V>(base: &'a BTreeMap<K, V>, local: &'a BTreeMap<K, V>, key: &K) -> Option<&'a V> {
    local.get(key).or_else(|| base.get(key))
}

impl<'a> View<'a> {
    fn store_fronts(self) -> impl Iterator<Item = &'a StoreFront> + 'a {
        rows(&self.base.store_fronts, &self.local.store_fronts)
    }

    fn currencies(self) -> impl Iterator<Item = &'a Currency> + 'a {
        rows(&self.base.currencies, &self.local.currencies)
    }

    fn statuses(self) -> impl Iterator<Item = (&'a (StatusKind, StatusId), &'a StatusRecord)> + 'a {
        entries(&self.base.statuses, &self.local.statuses)
    }

    fn product(self, id: ProductId) -> Option<&'a Product> {
        row(&self.base.products, &self.local.products, &id).filter(|p| !p.is_deleted())
    }

    fn products(self) -> impl Iterator<Item = &'a Product> + 'a {
        rows(&self.base.products, &self.local.products).filter(|p| !p.is_deleted())
    }

    fn assignment(self, id: ProductId) -> Option<&'a BTreeSet<StoreFrontId>> {
        row(&self.base.assignments, &self.local.assignments, &id)
    }

    fn assigned(self, id: ProductId, store: StoreFrontId) -> bool {
        self.assignment(id).is_some_and(|stores| stores.contains(&store))
    }

    fn variant(self, id: VariantId) -> Option<&'a Variant> {
        row(&self.base.variants, &self.local.variants, &id).filter(|v| !v.is_deleted())
    }

    fn variants(self) -> impl Iterator<Item = &'a Variant> + 'a {
        rows(&self.base.variants, &self.local.variants).filter(|v| !v.is_deleted())
    }

    fn inventory_by_id(self, id: InventoryId) -> Option<&'a InventoryRecord> {
        row(&self.base.inventory, &self.local.inventory, &id)
    }

    fn inventory(self) -> impl Iterator<Item = &'a InventoryRecord> + 'a {
        rows(&self.base.inventory, &self.local.inventory)
    }

    fn inventory_for(self, key: StockKey) -> Option<&'a InventoryRecord> {
        self.inventory().find(|r| r.key() == key)
    }

    fn adjustments(self) -> impl Iterator<Item = &'a InventoryAdjustment> + 'a {
        rows(&self.base.adjustments, &self.local.adjustments)
    }

    fn order(self, id: OrderId) -> Option<&'a Order> {
        row(&self.base.orders, &self.local.orders, &id).filter(|o| !o.is_deleted())
    }

    fn orders(self) -> impl Iterator<Item = &'a Order> + 'a {
        rows(&self.base.orders, &self.local.orders)
    }

    fn order_items(self) -> impl Iterator<Item = &'a OrderItem> + 'a {
        let removed = self.removed_items;
        rows(&self.base.order_items, &self.local.order_items).filter(move |i| !removed.contains(&i.id))
    }

    fn permissions(self) -> impl Iterator<Item = &'a Permission> + 'a {
        rows(&self.base.permissions, &self.local.permissions)
    }

    fn roles(self) -> impl Iterator<Item = &'a Role> + 'a {
        rows(&self.base.roles, &self.local.roles)
    }

    fn grants(self, role: RoleId) -> Option<&'a BTreeSet<PermissionId>> {
        row(&self.base.grants, &self.local.grants, &role)
    }
}

fn require(found: bool, what: impl FnOnce() -> String) -> StoreResult<()> {
    if found {
        Ok(())
    } else {
        Err(StoreError::RowNotFound(what()))
    }
}

fn sorted_by_id<T, K: Ord>(items: impl Iterator<Item = T>, key: impl Fn(&T) -> K) -> Vec<T> {
    let mut out: Vec<T> = items.collect();
    out.sort_by_key(|item| key(item));
    out
}

/// Fail if a row written by the transaction collides with another row on a
/// unique column. `column` returns `None` for rows the constraint skips.
fn check_unique<K: Ord, V>(
    base: &BTreeMap<K, V>,
    local: &BTreeMap<K, V>,
    what: &str,
    column: impl Fn(&K, &V) -> Option<String>,
) -> StoreResult<()> {
    for (key, written) in local {
        let Some(value) = column(key, written) else {
            continue;
        };
        let clash = entries(base, local)
            .any(|(other, row)| other != key && column(other, row).as_deref() == Some(value.as_str()));
        if clash {
            return Err(StoreError::UniqueViolation(format!("{} '{}'", what, value)));
        }
    }
    Ok(())
}

fn check_constraints(base: &Tables, local: &Tables) -> StoreResult<()> {
    check_unique(&base.store_fronts, &local.store_fronts, "store front slug", |_, s| {
        Some(s.slug.clone())
    })?;
    check_unique(&base.store_fronts, &local.store_fronts, "store front domain", |_, s| {
        (!s.domain.is_empty()).then(|| s.domain.to_ascii_lowercase())
    })?;
    check_unique(&base.currencies, &local.currencies, "currency", |_, c| {
        Some(c.code.to_ascii_uppercase())
    })?;
    check_unique(&base.statuses, &local.statuses, "status", |(kind, _), s| {
        Some(format!("{}:{}", kind.as_str(), s.slug))
    })?;
    check_unique(&base.variants, &local.variants, "sku", |_, v| {
        (!v.is_deleted()).then(|| v.sku.clone())
    })?;
    check_unique(&base.inventory, &local.inventory, "inventory", |_, r| {
        Some(r.key().to_string())
    })?;
    check_unique(&base.orders, &local.orders, "order number", |_, o| {
        Some(o.order_number.clone())
    })?;
    check_unique(&base.permissions, &local.permissions, "permission", |_, p| {
        Some(p.name.clone())
    })?;
    check_unique(&base.roles, &local.roles, "role", |_, r| Some(r.name.clone()))?;
    Ok(())
}

fn publish(base: &mut Tables, local: Tables, removed_items: BTreeSet<OrderItemId>) {
    base.store_fronts.extend(local.store_fronts);
    base.currencies.extend(local.currencies);
    base.statuses.extend(local.statuses);
    base.products.extend(local.products);
    base.assignments.extend(local.assignments);
    base.variants.extend(local.variants);
    base.inventory.extend(local.inventory);
    base.adjustments.extend(local.adjustments);
    base.orders.extend(local.orders);
    base.order_items.extend(local.order_items);
    for id in removed_items {
        base.order_items.remove(&id);
    }
    base.permissions.extend(local.permissions);
    base.roles.extend(local.roles);
    base.grants.extend(local.grants);
}

/// An open in-memory transaction.
pub struct MemoryTx {
    shared: Arc<Shared>,
    local: Tables,
    removed_items: BTreeSet<OrderItemId>,
    held: HashMap<LockKey, OwnedMutexGuard<()>>,
}

impl MemoryTx {
    fn read<T>(&self, f: impl FnOnce(View<'_>) -> T) -> StoreResult<T> {
        let base = self.shared.committed.lock().map_err(|_| poisoned())?;
        Ok(f(View {
            base: &base,
            local: &self.local,
            removed_items: &self.removed_items,
        }))
    }

    async fn lock(&mut self, key: LockKey) -> StoreResult<()> {
        if self.held.contains_key(&key) {
            return Ok(());
        }
        let mutex = {
            let mut locks = self.shared.locks.lock().map_err(|_| poisoned())?;
            Arc::clone(locks.entry(key).or_default())
        };
        let guard = match tokio::time::timeout(self.shared.lock_timeout, mutex.lock_owned()).await {
            Ok(guard) => guard,
            Err(_) => {
                self.shared.prune_locks([key]);
                return Err(StoreError::LockTimeout(key.to_string()));
            }
        };
        trace!(lock = %key, "row lock acquired");
        self.held.insert(key, guard);
        Ok(())
    }

    fn finish(mut self) -> StoreResult<()> {
        let local = std::mem::take(&mut self.local);
        let removed_items = std::mem::take(&mut self.removed_items);
        {
            let mut base = self.shared.committed.lock().map_err(|_| poisoned())?;
            check_constraints(&base, &local)?;
            publish(&mut base, local, removed_items);
        }
        debug!(locks = self.held.len(), "memory transaction committed");
        Ok(())
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        let keys: Vec<LockKey> = self.held.drain().map(|(key, _guard)| key).collect();
        self.shared.prune_locks(keys);
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn store_front(&mut self, id: StoreFrontId) -> StoreResult<Option<StoreFront>> {
        self.read(|v| row(&v.base.store_fronts, &v.local.store_fronts, &id).cloned())
    }

    async fn store_front_by_domain(&mut self, domain: &str) -> StoreResult<Option<StoreFront>> {
        self.read(|v| {
            v.store_fronts()
                .find(|s| s.is_active && s.domain.eq_ignore_ascii_case(domain))
                .cloned()
        })
    }

    async fn insert_store_front(&mut self, mut store: StoreFront) -> StoreResult<StoreFront> {
        store.id = StoreFrontId::new(next(&self.shared.seq.store_front));
        self.local.store_fronts.insert(store.id, store.clone());
        Ok(store)
    }

    async fn currency_by_code(&mut self, code: &str) -> StoreResult<Option<Currency>> {
        self.read(|v| v.currencies().find(|c| c.code.eq_ignore_ascii_case(code)).cloned())
    }

    async fn currencies(&mut self) -> StoreResult<Vec<Currency>> {
        self.read(|v| sorted_by_id(v.currencies().cloned(), |c| c.id))
    }

    async fn insert_currency(&mut self, mut currency: Currency) -> StoreResult<Currency> {
        currency.id = CurrencyId::new(next(&self.shared.seq.currency));
        self.local.currencies.insert(currency.id, currency.clone());
        Ok(currency)
    }

    async fn status(&mut self, kind: StatusKind, slug: &str) -> StoreResult<Option<StatusRecord>> {
        self.read(|v| {
            v.statuses()
                .find(|((k, _), s)| *k == kind && s.slug == slug)
                .map(|(_, s)| s.clone())
        })
    }

    async fn statuses(&mut self, kind: StatusKind) -> StoreResult<Vec<StatusRecord>> {
        self.read(|v| {
            sorted_by_id(
                v.statuses().filter(|((k, _), _)| *k == kind).map(|(_, s)| s.clone()),
                |s| s.id,
            )
        })
    }

    async fn insert_status(
        &mut self,
        kind: StatusKind,
        mut status: StatusRecord,
    ) -> StoreResult<StatusRecord> {
        status.id = StatusId::new(next(&self.shared.seq.status));
        self.local.statuses.insert((kind, status.id), status.clone());
        Ok(status)
    }

    async fn product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        self.read(|v| v.product(id).cloned())
    }

    async fn lock_product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        self.lock(LockKey::Product(id)).await?;
        self.read(|v| v.product(id).cloned())
    }

    async fn insert_product(&mut self, mut product: Product) -> StoreResult<Product> {
        product.id = ProductId::new(next(&self.shared.seq.product));
        self.local.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(&mut self, product: &Product) -> StoreResult<()> {
        let id = product.id;
        let found = self.read(|v| row(&v.base.products, &v.local.products, &id).is_some())?;
        require(found, || format!("product {}", id))?;
        self.local.products.insert(id, product.clone());
        Ok(())
    }

    async fn product_store_fronts(&mut self, id: ProductId) -> StoreResult<Vec<StoreFrontId>> {
        self.read(|v| {
            v.assignment(id)
                .map(|stores| stores.iter().copied().collect())
                .unwrap_or_default()
        })
    }

    async fn set_product_store_fronts(
        &mut self,
        id: ProductId,
        stores: &[StoreFrontId],
    ) -> StoreResult<()> {
        self.local
            .assignments
            .insert(id, stores.iter().copied().collect());
        Ok(())
    }

    async fn slug_in_use(
        &mut self,
        slug: &str,
        store: StoreFrontId,
        exclude: Option<ProductId>,
    ) -> StoreResult<bool> {
        self.read(|v| {
            v.products()
                .any(|p| p.slug == slug && Some(p.id) != exclude && v.assigned(p.id, store))
        })
    }

    async fn variant(&mut self, id: VariantId) -> StoreResult<Option<Variant>> {
        self.read(|v| v.variant(id).cloned())
    }

    async fn product_variants(&mut self, product: ProductId) -> StoreResult<Vec<Variant>> {
        self.read(|v| {
            sorted_by_id(
                v.variants().filter(|x| x.product_id == product).cloned(),
                |x| x.id,
            )
        })
    }

    async fn insert_variant(&mut self, mut variant: Variant) -> StoreResult<Variant> {
        variant.id = VariantId::new(next(&self.shared.seq.variant));
        self.local.variants.insert(variant.id, variant.clone());
        Ok(variant)
    }

    async fn update_variant(&mut self, variant: &Variant) -> StoreResult<()> {
        let id = variant.id;
        let found = self.read(|v| row(&v.base.variants, &v.local.variants, &id).is_some())?;
        require(found, || format!("variant {}", id))?;
        self.local.variants.insert(id, variant.clone());
        Ok(())
    }

    async fn sku_in_use(&mut self, sku: &str, exclude: Option<VariantId>) -> StoreResult<bool> {
        self.read(|v| v.variants().any(|x| x.sku == sku && Some(x.id) != exclude))
    }

    async fn count_active_variants(&mut self, product: ProductId) -> StoreResult<i64> {
        self.read(|v| {
            v.variants()
                .filter(|x| x.product_id == product && x.is_active)
                .count() as i64
        })
    }

    async fn soft_delete_product(&mut self, id: ProductId, at: DateTime<Utc>) -> StoreResult<()> {
        let (product, variants) = self.read(|v| {
            let product = v.product(id).cloned();
            let variants: Vec<Variant> = v.variants().filter(|x| x.product_id == id).cloned().collect();
            (product, variants)
        })?;
        let mut product = product.ok_or_else(|| StoreError::RowNotFound(format!("product {}", id)))?;
        product.deleted_at = Some(at);
        product.updated_at = at;
        self.local.products.insert(id, product);
        for mut variant in variants {
            variant.deleted_at = Some(at);
            variant.updated_at = at;
            self.local.variants.insert(variant.id, variant);
        }
        Ok(())
    }

    async fn published_products(&mut self, store: StoreFrontId) -> StoreResult<Vec<Product>> {
        self.read(|v| {
            sorted_by_id(
                v.products()
                    .filter(|p| p.is_visible() && v.assigned(p.id, store))
                    .cloned(),
                |p| p.id,
            )
        })
    }

    async fn published_product_by_slug(
        &mut self,
        store: StoreFrontId,
        slug: &str,
    ) -> StoreResult<Option<Product>> {
        self.read(|v| {
            v.products()
                .find(|p| p.slug == slug && p.is_visible() && v.assigned(p.id, store))
                .cloned()
        })
    }

    async fn lock_inventory(&mut self, key: StockKey) -> StoreResult<Option<InventoryRecord>> {
        self.lock(LockKey::Stock(key)).await?;
        self.read(|v| v.inventory_for(key).cloned())
    }

    async fn lock_inventory_by_id(
        &mut self,
        id: InventoryId,
    ) -> StoreResult<Option<InventoryRecord>> {
        let Some(key) = self.read(|v| v.inventory_by_id(id).map(InventoryRecord::key))? else {
            return Ok(None);
        };
        self.lock(LockKey::Stock(key)).await?;
        self.read(|v| v.inventory_by_id(id).cloned())
    }

    async fn insert_inventory(&mut self, mut record: InventoryRecord) -> StoreResult<InventoryRecord> {
        let key = record.key();
        self.lock(LockKey::Stock(key)).await?;
        if let Some(existing) = self.read(|v| v.inventory_for(key).cloned())? {
            return Ok(existing);
        }
        record.id = InventoryId::new(next(&self.shared.seq.inventory));
        self.local.inventory.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_inventory(&mut self, record: &InventoryRecord) -> StoreResult<()> {
        let id = record.id;
        let found = self.read(|v| v.inventory_by_id(id).is_some())?;
        require(found, || format!("inventory {}", id))?;
        self.local.inventory.insert(id, record.clone());
        Ok(())
    }

    async fn inventory(&mut self, key: StockKey) -> StoreResult<Option<InventoryRecord>> {
        self.read(|v| v.inventory_for(key).cloned())
    }

    async fn inventory_by_id(&mut self, id: InventoryId) -> StoreResult<Option<InventoryRecord>> {
        self.read(|v| v.inventory_by_id(id).cloned())
    }

    async fn store_inventory(&mut self, store: StoreFrontId) -> StoreResult<Vec<InventoryRecord>> {
        self.read(|v| {
            sorted_by_id(
                v.inventory().filter(|r| r.store_front_id == store).cloned(),
                |r| r.id,
            )
        })
    }

    async fn product_has_stock(&mut self, product: ProductId) -> StoreResult<bool> {
        self.read(|v| {
            let variants: BTreeSet<VariantId> = v
                .variants()
                .filter(|x| x.product_id == product)
                .map(|x| x.id)
                .collect();
            v.inventory()
                .any(|r| r.quantity > 0 && variants.contains(&r.variant_id))
        })
    }

    async fn insert_adjustment(
        &mut self,
        mut adjustment: InventoryAdjustment,
    ) -> StoreResult<InventoryAdjustment> {
        adjustment.id = AdjustmentId::new(next(&self.shared.seq.adjustment));
        self.local.adjustments.insert(adjustment.id, adjustment.clone());
        Ok(adjustment)
    }

    async fn adjustments(
        &mut self,
        inventory: InventoryId,
    ) -> StoreResult<Vec<InventoryAdjustment>> {
        self.read(|v| {
            let mut out: Vec<InventoryAdjustment> = v
                .adjustments()
                .filter(|a| a.inventory_id == inventory)
                .cloned()
                .collect();
            out.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
            out
        })
    }

    async fn order_number_in_use(&mut self, number: &str) -> StoreResult<bool> {
        self.read(|v| v.orders().any(|o| o.order_number == number))
    }

    async fn insert_order(&mut self, mut order: Order) -> StoreResult<Order> {
        order.id = OrderId::new(next(&self.shared.seq.order));
        self.local.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn insert_order_items(&mut self, items: Vec<OrderItem>) -> StoreResult<Vec<OrderItem>> {
        let mut out = Vec::with_capacity(items.len());
        for mut item in items {
            item.id = OrderItemId::new(next(&self.shared.seq.order_item));
            self.local.order_items.insert(item.id, item.clone());
            out.push(item);
        }
        Ok(out)
    }

    async fn order(&mut self, id: OrderId) -> StoreResult<Option<Order>> {
        self.read(|v| v.order(id).cloned())
    }

    async fn lock_order(&mut self, id: OrderId) -> StoreResult<Option<Order>> {
        self.lock(LockKey::Order(id)).await?;
        self.read(|v| v.order(id).cloned())
    }

    async fn order_items(&mut self, order: OrderId) -> StoreResult<Vec<OrderItem>> {
        self.read(|v| {
            sorted_by_id(
                v.order_items().filter(|i| i.order_id == order).cloned(),
                |i| i.id,
            )
        })
    }

    async fn update_order(&mut self, order: &Order) -> StoreResult<()> {
        let id = order.id;
        let found = self.read(|v| row(&v.base.orders, &v.local.orders, &id).is_some())?;
        require(found, || format!("order {}", id))?;
        self.local.orders.insert(id, order.clone());
        Ok(())
    }

    async fn update_order_item(&mut self, item: &OrderItem) -> StoreResult<()> {
        let id = item.id;
        let found = self.read(|v| v.order_items().any(|i| i.id == id))?;
        require(found, || format!("order item {}", id))?;
        self.local.order_items.insert(id, item.clone());
        Ok(())
    }

    async fn delete_order_item(&mut self, id: OrderItemId) -> StoreResult<()> {
        let found = self.read(|v| v.order_items().any(|i| i.id == id))?;
        require(found, || format!("order item {}", id))?;
        self.local.order_items.remove(&id);
        self.removed_items.insert(id);
        Ok(())
    }

    async fn orders(&mut self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        self.read(|v| {
            let mut out: Vec<Order> = v.orders().filter(|o| filter.matches(o)).cloned().collect();
            out.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
            out
        })
    }

    async fn permissions(&mut self) -> StoreResult<Vec<Permission>> {
        self.read(|v| sorted_by_id(v.permissions().cloned(), |p| p.id))
    }

    async fn insert_permissions(
        &mut self,
        permissions: Vec<Permission>,
    ) -> StoreResult<Vec<Permission>> {
        let mut out = Vec::with_capacity(permissions.len());
        for mut permission in permissions {
            permission.id = PermissionId::new(next(&self.shared.seq.permission));
            self.local.permissions.insert(permission.id, permission.clone());
            out.push(permission);
        }
        Ok(out)
    }

    async fn role(&mut self, id: RoleId) -> StoreResult<Option<Role>> {
        self.read(|v| row(&v.base.roles, &v.local.roles, &id).cloned())
    }

    async fn role_by_name(&mut self, name: &str) -> StoreResult<Option<Role>> {
        self.read(|v| v.roles().find(|r| r.name == name).cloned())
    }

    async fn insert_role(&mut self, mut role: Role) -> StoreResult<Role> {
        role.id = RoleId::new(next(&self.shared.seq.role));
        self.local.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn grant_permissions(
        &mut self,
        role: RoleId,
        permissions: &[PermissionId],
    ) -> StoreResult<()> {
        self.lock(LockKey::Role(role)).await?;
        let mut granted = self.read(|v| v.grants(role).cloned().unwrap_or_default())?;
        granted.extend(permissions.iter().copied());
        self.local.grants.insert(role, granted);
        Ok(())
    }

    async fn role_has_permission(&mut self, role: RoleId, permission: &str) -> StoreResult<bool> {
        self.read(|v| {
            let Some(id) = v.permissions().find(|p| p.name == permission).map(|p| p.id) else {
                return false;
            };
            v.grants(role).is_some_and(|granted| granted.contains(&id))
        })
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        (*self).finish()
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        trace!(locks = self.held.len(), "memory transaction rolled back");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use souq_commerce::catalog::DEFAULT_LOW_STOCK_THRESHOLD;

    fn key() -> StockKey {
        StockKey::new(VariantId::new(1), StoreFrontId::new(1))
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_inventory(InventoryRecord::empty(key(), Utc::now()))
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.inventory(key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let record = tx
            .insert_inventory(InventoryRecord::empty(key(), Utc::now()))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let found = tx.inventory_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(found.low_stock_threshold, DEFAULT_LOW_STOCK_THRESHOLD);
    }

    #[tokio::test]
    async fn test_insert_inventory_returns_existing_row() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let first = tx
            .insert_inventory(InventoryRecord::empty(key(), Utc::now()))
            .await
            .unwrap();
        let second = tx
            .insert_inventory(InventoryRecord::empty(key(), Utc::now()))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_lock_wait_times_out() {
        let store = MemoryStore::with_lock_timeout(Duration::from_millis(50));
        let mut holder = store.begin().await.unwrap();
        holder.lock_inventory(key()).await.unwrap();

        let mut waiter = store.begin().await.unwrap();
        let err = waiter.lock_inventory(key()).await.unwrap_err();
        assert!(matches!(err, StoreError::LockTimeout(_)));

        drop(holder);
        assert!(waiter.lock_inventory(key()).await.is_ok());
    }

    #[tokio::test]
    async fn test_released_locks_are_forgotten() {
        let store = MemoryStore::with_lock_timeout(Duration::from_millis(50));
        let mut holder = store.begin().await.unwrap();
        holder.lock_inventory(key()).await.unwrap();
        holder.lock_order(OrderId::new(7)).await.unwrap();
        assert_eq!(store.lock_entries(), 2);

        let mut waiter = store.begin().await.unwrap();
        assert!(waiter.lock_inventory(key()).await.is_err());
        assert_eq!(store.lock_entries(), 2);

        holder.commit().await.unwrap();
        assert_eq!(store.lock_entries(), 0);

        waiter.lock_inventory(key()).await.unwrap();
        assert_eq!(store.lock_entries(), 1);
        waiter.rollback().await.unwrap();
        assert_eq!(store.lock_entries(), 0);
    }

    #[tokio::test]
    async fn test_lock_is_reentrant() {
        let store = MemoryStore::with_lock_timeout(Duration::from_millis(50));
        let mut tx = store.begin().await.unwrap();
        tx.lock_order(OrderId::new(7)).await.unwrap();
        assert!(tx.lock_order(OrderId::new(7)).await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_permission_rejected_at_commit() {
        let store = MemoryStore::new();
        let mut a = store.begin().await.unwrap();
        let mut b = store.begin().await.unwrap();
        a.insert_permissions(vec![Permission::new("orders.view", "")])
            .await
            .unwrap();
        b.insert_permissions(vec![Permission::new("orders.view", "")])
            .await
            .unwrap();
        a.commit().await.unwrap();
        let err = b.commit().await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn test_reads_see_own_writes_and_committed_rows() {
        let store = MemoryStore::new();
        let mut reader = store.begin().await.unwrap();
        assert!(reader.role_by_name("Super Admin").await.unwrap().is_none());

        let mut writer = store.begin().await.unwrap();
        let role = writer
            .insert_role(Role {
                id: RoleId::default(),
                name: "Super Admin".into(),
                description: String::new(),
            })
            .await
            .unwrap();
        assert!(writer.role(role.id).await.unwrap().is_some());
        writer.commit().await.unwrap();

        assert!(reader.role_by_name("Super Admin").await.unwrap().is_some());
    }
}
