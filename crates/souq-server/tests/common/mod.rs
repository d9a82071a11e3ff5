//! In-process server over the in-memory engine.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use souq_auth::{PermissionReconciler, TokenSigner};
use souq_commerce::prelude::*;
use souq_db::{ensure_store_front, seed_reference_data, MemoryStore};
use souq_server::{build_app, AppState, ROUTES};

pub const SECRET: &str = "e2e-secret";
pub const DOMAIN: &str = "shop.example.com";

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub store_front: StoreFront,
    pub super_admin: RoleId,
    /// Super admin access token.
    pub token: String,
}

pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
    pub request_id: Option<String>,
}

impl Reply {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }
}

impl TestApp {
    pub async fn new() -> Self {
        let memory = MemoryStore::with_lock_timeout(Duration::from_secs(2));
        seed_reference_data(&memory).await.unwrap();
        let store_front = ensure_store_front(&memory, "Main", "main", DOMAIN).await.unwrap();
        let store: Arc<dyn Store> = Arc::new(memory);
        PermissionReconciler::new(ROUTES).sync(store.as_ref()).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let super_admin = tx.role_by_name(SUPER_ADMIN_ROLE).await.unwrap().unwrap().id;
        tx.rollback().await.unwrap();

        let signer = TokenSigner::new(SECRET).unwrap();
        let token = signer
            .issue_admin_access(AdminId::new(1), Some(super_admin), 3600)
            .unwrap();
        let state = AppState::new(store, signer, DEFAULT_TX_TIMEOUT);
        let app = build_app(state.clone(), Duration::from_secs(10));
        Self {
            app,
            state,
            store_front,
            super_admin,
            token,
        }
    }

    /// A role holding only `permissions`, and a token for an admin carrying it.
    pub async fn token_with(&self, permissions: &[&str]) -> String {
        let mut tx = self.state.store.begin().await.unwrap();
        let role = tx
            .insert_role(Role {
                id: RoleId::default(),
                name: format!("role-{}", permissions.join("-")),
                description: String::new(),
            })
            .await
            .unwrap();
        let all = tx.permissions().await.unwrap();
        let ids: Vec<_> = all
            .iter()
            .filter(|p| permissions.contains(&p.name.as_str()))
            .map(|p| p.id)
            .collect();
        tx.grant_permissions(role.id, &ids).await.unwrap();
        tx.commit().await.unwrap();
        self.state
            .signer
            .issue_admin_access(AdminId::new(2), Some(role.id), 3600)
            .unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Reply {
            status,
            body,
            request_id,
        }
    }

    pub async fn call_as(&self, token: Option<&str>, method: Method, uri: &str, body: Option<Value>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri).header(header::HOST, DOMAIN);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    /// Call as the super admin.
    pub async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> Reply {
        let token = self.token.clone();
        self.call_as(Some(&token), method, uri, body).await
    }

    /// Create a simple product with one active variant priced at `price`.
    /// Returns `(product_id, variant_id)`.
    pub async fn product(&self, name: &str, sku: &str, price: f64) -> (i64, i64) {
        let reply = self
            .call(
                Method::POST,
                "/api/admin/products/v2",
                Some(json!({
                    "name_en": name,
                    "name_ar": format!("{} (ar)", name),
                    "store_front_ids": [self.store_front.id],
                    "variants": [{ "sku": sku, "price": price }],
                })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        let product = reply.data()["id"].as_i64().unwrap();
        let variant = reply.data()["variants"][0]["id"].as_i64().unwrap();
        (product, variant)
    }

    pub async fn adjust(&self, variant: i64, delta: i64, reason: &str) -> Reply {
        self.call(
            Method::POST,
            "/api/admin/inventory/adjust",
            Some(json!({
                "product_variant_id": variant,
                "store_front_id": self.store_front.id,
                "adjustment": delta,
                "reason": reason,
            })),
        )
        .await
    }

    pub async fn inventory(&self, variant: i64) -> Reply {
        self.call(
            Method::GET,
            &format!(
                "/api/admin/inventory/variant/{}/store/{}",
                variant, self.store_front.id
            ),
            None,
        )
        .await
    }

    /// `(quantity, reserved_quantity)` of a variant in the main storefront.
    pub async fn balance(&self, variant: i64) -> (i64, i64) {
        let reply = self.inventory(variant).await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
        (
            reply.data()["quantity"].as_i64().unwrap(),
            reply.data()["reserved_quantity"].as_i64().unwrap(),
        )
    }

    pub async fn create_order(&self, lines: &[(i64, i64)]) -> Reply {
        let items: Vec<Value> = lines
            .iter()
            .map(|(variant, qty)| json!({ "product_variant_id": variant, "quantity": qty }))
            .collect();
        self.call(
            Method::POST,
            "/api/admin/orders",
            Some(json!({
                "store_front_id": self.store_front.id,
                "items": items,
                "customer_name": "Layla",
                "customer_email": "layla@example.com",
            })),
        )
        .await
    }
}
