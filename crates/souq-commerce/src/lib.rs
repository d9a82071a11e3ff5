//! Transactional commerce core for the souq storefront API.
//!
//! - **Catalog**: products, variants, storefronts and the per-storefront
//!   inventory ledger
//! - **Orders**: order headers, line items and the lifecycle engine that
//!   couples status changes with stock movements
//! - **Access**: permission and role records used by the admin API
//!
//! Services run every operation in one store transaction. The store itself
//! is a port ([`store::Store`]) implemented by the `souq-db` crate.
//!
//! # Example
//!
//! ```rust,ignore
//! use souq_commerce::prelude::*;
//!
//! let runner = TxRunner::new(store, DEFAULT_TX_TIMEOUT);
//! let orders = OrderEngine::new(runner.clone(), Arc::new(SystemClock));
//!
//! let order = orders.create(request, admin).await?;
//! let order = orders.confirm(order.order.id, admin).await?;
//! ```

pub mod access;
pub mod catalog;
pub mod clock;
pub mod error;
pub mod ids;
pub mod money;
pub mod orders;
pub mod services;
pub mod store;

pub use error::{CommerceError, ErrorKind};
pub use ids::*;
pub use money::{Currency, Money};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{CommerceError, ErrorKind};
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Catalog
    pub use crate::catalog::{
        AdjustmentReason, InventoryAdjustment, InventoryRecord, InventoryStatus, Product,
        ProductDetail, ProductInput, ProductStatus, StockKey, StoreFront, Variant, VariantInput,
    };

    // Orders
    pub use crate::orders::{
        CreateOrderItem, CreateOrderRequest, FulfillmentStatus, Order, OrderDetail, OrderFilter,
        OrderItem, OrderItemUpdate, OrderStatus, PaymentStatus, UpdateOrderRequest,
    };

    // Access
    pub use crate::access::{Permission, Role, SUPER_ADMIN_ROLE};

    // Services
    pub use crate::clock::{Clock, SystemClock};
    pub use crate::services::{
        ActivationGate, CatalogService, InventoryLedger, InventoryService, OrderEngine, TxRunner,
        DEFAULT_TX_TIMEOUT,
    };
    pub use crate::store::{Store, StoreError, StoreResult, StoreTx};
}
