//! Reconciler and permission checks against the in-memory engine.

use souq_auth::{Access, AuthError, Caller, PermissionReconciler, RouteMethod, RouteSpec, TokenSigner};
use souq_commerce::access::SUPER_ADMIN_ROLE;
use souq_commerce::ids::{AdminId, RoleId};
use souq_commerce::store::Store;
use souq_db::{seed_reference_data, MemoryStore};

const ROUTES: &[RouteSpec] = &[
    RouteSpec::new(RouteMethod::Post, "/api/admin/orders/:id/confirm", Access::Permission("orders.confirm")),
    RouteSpec::new(RouteMethod::Get, "/api/admin/reports", Access::Permission("reports.export")),
    RouteSpec::new(RouteMethod::Get, "/api/storefront/products", Access::Storefront),
];

async fn super_admin(store: &dyn Store) -> RoleId {
    let mut tx = store.begin().await.unwrap();
    let role = tx.role_by_name(SUPER_ADMIN_ROLE).await.unwrap().unwrap();
    tx.rollback().await.unwrap();
    role.id
}

#[tokio::test]
async fn test_sync_inserts_and_grants_once() {
    let store = MemoryStore::new();
    seed_reference_data(&store).await.unwrap();
    let reconciler = PermissionReconciler::new(ROUTES);

    let first = reconciler.sync(&store).await.unwrap();
    assert_eq!(first.inserted.len(), first.required);
    assert_eq!(first.granted, first.required);
    assert!(first.inserted.contains(&"reports.export".to_string()));

    let second = reconciler.sync(&store).await.unwrap();
    assert!(second.inserted.is_empty());
    assert_eq!(second.granted, 0);

    let role = super_admin(&store).await;
    let mut tx = store.begin().await.unwrap();
    assert!(tx.role_has_permission(role, "orders.confirm").await.unwrap());
    assert!(tx.role_has_permission(role, "reports.export").await.unwrap());
    assert_eq!(tx.permissions().await.unwrap().len(), first.required);
    tx.rollback().await.unwrap();
}

#[tokio::test]
async fn test_sync_only_adds_new_permissions() {
    let store = MemoryStore::new();
    seed_reference_data(&store).await.unwrap();
    PermissionReconciler::new(&ROUTES[..1]).sync(&store).await.unwrap();

    let report = PermissionReconciler::new(ROUTES).sync(&store).await.unwrap();
    assert_eq!(report.inserted, vec!["reports.export".to_string(), "reports.view".to_string()]);
    assert_eq!(report.granted, 2);
}

#[tokio::test]
async fn test_sync_without_super_admin_leaves_grants() {
    let store = MemoryStore::new();
    let report = PermissionReconciler::new(ROUTES).sync(&store).await.unwrap();
    assert!(!report.inserted.is_empty());
    assert_eq!(report.granted, 0);
}

#[tokio::test]
async fn test_authorize_checks_role_grants() {
    let store = MemoryStore::new();
    seed_reference_data(&store).await.unwrap();
    PermissionReconciler::new(ROUTES).sync(&store).await.unwrap();
    let role = super_admin(&store).await;

    let signer = TokenSigner::new("secret").unwrap();
    let token = signer.issue_admin_access(AdminId::new(1), Some(role), 60).unwrap();
    let header = format!("Bearer {}", token);
    let caller = Caller::from_authorization(Some(&header), &signer).unwrap();
    caller.authorize(&store, "orders.confirm").await.unwrap();

    let err = caller.authorize(&store, "orders.teleport").await.unwrap_err();
    assert_eq!(err, AuthError::InsufficientPermission("orders.teleport".into()));

    let roleless = Caller {
        admin_id: AdminId::new(2),
        role_id: None,
    };
    assert_eq!(roleless.authorize(&store, "orders.confirm").await.unwrap_err(), AuthError::NoRole);
}
