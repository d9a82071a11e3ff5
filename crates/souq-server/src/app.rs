//! Router assembly and the boot sequence.

use std::time::Duration;

use anyhow::Context;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use souq_auth::{PermissionReconciler, ReconcileReport, TokenSigner};
use souq_db::{ensure_store_front, seed_reference_data};

use crate::config::ServerConfig;
use crate::middleware;
use crate::routes::{self, ROUTES};
use crate::state::AppState;

/// The complete HTTP application.
pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    let layers = ServiceBuilder::new()
        .layer(middleware::set_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(middleware::trace_span))
        .layer(middleware::propagate_request_id())
        .layer(CorsLayer::permissive())
        .layer(middleware::request_timeout(request_timeout));

    routes::router(state.routes)
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::access))
        .layer(layers)
        .with_state(state)
}

/// Open the store, seed it when it is in-memory, create configured
/// storefronts and reconcile permissions.
pub async fn bootstrap(config: &ServerConfig) -> anyhow::Result<(AppState, ReconcileReport)> {
    let signer = TokenSigner::new(&config.auth.jwt_secret).context("invalid auth.jwt_secret")?;
    let store = souq_db::open(&config.database.url, &config.database.store_options())
        .await
        .with_context(|| format!("failed to open store {}", souq_db::redact(&config.database.url)))?;

    if config.database.is_memory() {
        seed_reference_data(store.as_ref())
            .await
            .context("failed to seed reference data")?;
    }
    for front in &config.store_fronts {
        ensure_store_front(store.as_ref(), &front.name, &front.slug, &front.domain)
            .await
            .with_context(|| format!("failed to create store front {}", front.domain))?;
    }

    let report = PermissionReconciler::new(ROUTES)
        .sync(store.as_ref())
        .await
        .context("permission reconciliation failed")?;

    let state = AppState::new(store, signer, config.database.tx_timeout());
    Ok((state, report))
}

/// Boot and serve until ctrl-c.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    let (state, report) = bootstrap(&config).await?;
    let engine = state.store.engine();
    let app = build_app(state, config.request_timeout());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(
        %addr,
        routes = ROUTES.len(),
        permissions = report.required,
        engine,
        "souq server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("souq server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
