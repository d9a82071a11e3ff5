//! The route table and its handlers.
//!
//! [`ROUTES`] is the single declaration of the HTTP surface. The router is
//! built from it, the access middleware looks requests up in it and the
//! permission reconciler derives the required permission set from it.

use axum::routing::{delete, get, patch, post, put, MethodRouter};
use axum::Router;
use tracing::error;

use souq_auth::{Access, RouteSpec};

use crate::handlers::{health, inventory, orders, products, storefront};
use crate::state::AppState;

use souq_auth::Access::{Permission as Perm, Public, Storefront};
use souq_auth::RouteMethod::{Delete, Get, Patch, Post, Put};

/// Every route the API serves.
pub const ROUTES: &[RouteSpec] = &[
    RouteSpec::new(Get, "/api/health", Public),
    // Orders
    RouteSpec::new(Get, "/api/admin/orders", Perm("orders.view")),
    RouteSpec::new(Post, "/api/admin/orders", Perm("orders.create")),
    RouteSpec::new(Get, "/api/admin/orders/meta", Perm("orders.view")),
    RouteSpec::new(Get, "/api/admin/orders/:id", Perm("orders.view")),
    RouteSpec::new(Put, "/api/admin/orders/:id", Perm("orders.edit")),
    RouteSpec::new(Post, "/api/admin/orders/:id/confirm", Perm("orders.confirm")),
    RouteSpec::new(Post, "/api/admin/orders/:id/cancel", Perm("orders.cancel")),
    RouteSpec::new(Post, "/api/admin/orders/:id/pay", Perm("orders.pay")),
    RouteSpec::new(Post, "/api/admin/orders/:id/out-for-delivery", Perm("orders.fulfill")),
    RouteSpec::new(Post, "/api/admin/orders/:id/fulfill", Perm("orders.fulfill")),
    RouteSpec::new(Post, "/api/admin/orders/:id/complete", Perm("orders.complete")),
    // Inventory
    RouteSpec::new(Post, "/api/admin/inventory/adjust", Perm("inventory.adjust")),
    RouteSpec::new(Post, "/api/admin/inventory/bulk", Perm("inventory.adjust")),
    RouteSpec::new(Put, "/api/admin/inventory/threshold", Perm("inventory.adjust")),
    RouteSpec::new(Get, "/api/admin/inventory/store/:storeFrontId", Perm("inventory.view")),
    RouteSpec::new(
        Get,
        "/api/admin/inventory/variant/:variantId/store/:storeFrontId",
        Perm("inventory.view"),
    ),
    RouteSpec::new(Get, "/api/admin/inventory/low-stock/:storeFrontId", Perm("inventory.view")),
    RouteSpec::new(Get, "/api/admin/inventory/:inventoryId/history", Perm("inventory.view")),
    // Products
    RouteSpec::new(Post, "/api/admin/products/v2", Perm("products.create")),
    RouteSpec::new(Get, "/api/admin/products/v2/:id", Perm("products.view")),
    RouteSpec::new(Put, "/api/admin/products/v2/:id", Perm("products.update")),
    RouteSpec::new(Delete, "/api/admin/products/v2/:id", Perm("products.delete")),
    RouteSpec::new(Patch, "/api/admin/products/v2/:id/status", Perm("products.update")),
    RouteSpec::new(Post, "/api/admin/products/v2/:id/variants", Perm("products.update")),
    RouteSpec::new(
        Put,
        "/api/admin/products/v2/:id/variants/:variantId",
        Perm("products.update"),
    ),
    // Storefront
    RouteSpec::new(Get, "/api/storefront/products", Storefront),
    RouteSpec::new(Get, "/api/storefront/products/:slug", Storefront),
];

/// Handler bound to a declared route.
pub(crate) fn endpoint(route: &RouteSpec) -> Option<MethodRouter<AppState>> {
    let handler = match (route.method, route.path) {
        (Get, "/api/health") => get(health::health),

        (Get, "/api/admin/orders") => get(orders::list),
        (Post, "/api/admin/orders") => post(orders::create),
        (Get, "/api/admin/orders/meta") => get(orders::meta),
        (Get, "/api/admin/orders/:id") => get(orders::show),
        (Put, "/api/admin/orders/:id") => put(orders::update),
        (Post, "/api/admin/orders/:id/confirm") => post(orders::confirm),
        (Post, "/api/admin/orders/:id/cancel") => post(orders::cancel),
        (Post, "/api/admin/orders/:id/pay") => post(orders::pay),
        (Post, "/api/admin/orders/:id/out-for-delivery") => post(orders::out_for_delivery),
        (Post, "/api/admin/orders/:id/fulfill") => post(orders::fulfill),
        (Post, "/api/admin/orders/:id/complete") => post(orders::complete),

        (Post, "/api/admin/inventory/adjust") => post(inventory::adjust),
        (Post, "/api/admin/inventory/bulk") => post(inventory::bulk),
        (Put, "/api/admin/inventory/threshold") => put(inventory::threshold),
        (Get, "/api/admin/inventory/store/:storeFrontId") => get(inventory::by_store),
        (Get, "/api/admin/inventory/variant/:variantId/store/:storeFrontId") => {
            get(inventory::by_variant)
        }
        (Get, "/api/admin/inventory/low-stock/:storeFrontId") => get(inventory::low_stock),
        (Get, "/api/admin/inventory/:inventoryId/history") => get(inventory::history),

        (Post, "/api/admin/products/v2") => post(products::create),
        (Get, "/api/admin/products/v2/:id") => get(products::show),
        (Put, "/api/admin/products/v2/:id") => put(products::update),
        (Delete, "/api/admin/products/v2/:id") => delete(products::destroy),
        (Patch, "/api/admin/products/v2/:id/status") => patch(products::change_status),
        (Post, "/api/admin/products/v2/:id/variants") => post(products::create_variant),
        (Put, "/api/admin/products/v2/:id/variants/:variantId") => put(products::update_variant),

        (Get, "/api/storefront/products") => get(storefront::products),
        (Get, "/api/storefront/products/:slug") => get(storefront::product),

        _ => return None,
    };
    Some(handler)
}

/// Router with one handler per declared route.
pub(crate) fn router(routes: &[RouteSpec]) -> Router<AppState> {
    routes.iter().fold(Router::new(), |router, route| match endpoint(route) {
        Some(handler) => router.route(route.path, handler),
        None => {
            error!(method = %route.method, path = route.path, "route declared without a handler");
            router
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_route_has_a_handler() {
        for route in ROUTES {
            assert!(endpoint(route).is_some(), "{} {}", route.method, route.path);
        }
    }

    #[test]
    fn test_routes_are_unique() {
        let mut seen = HashSet::new();
        for route in ROUTES {
            assert!(seen.insert((route.method, route.path)), "{} {}", route.method, route.path);
        }
    }

    #[test]
    fn test_admin_routes_require_permissions() {
        for route in ROUTES {
            if route.path.starts_with("/api/admin/") {
                assert!(route.permission().is_some(), "{}", route.path);
            }
            if route.path.starts_with("/api/storefront/") {
                assert_eq!(route.access, Access::Storefront);
            }
        }
    }
}
