//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use souq_auth::{RouteSpec, TokenSigner};
use souq_commerce::prelude::*;

use crate::routes::ROUTES;

/// Everything a handler needs. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub catalog: CatalogService,
    pub inventory: InventoryService,
    pub orders: OrderEngine,
    pub signer: TokenSigner,
    pub routes: &'static [RouteSpec],
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, signer: TokenSigner, tx_timeout: Duration) -> Self {
        Self::with_clock(store, signer, tx_timeout, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn Store>,
        signer: TokenSigner,
        tx_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let runner = TxRunner::new(store.clone(), tx_timeout);
        Self {
            catalog: CatalogService::new(runner.clone(), clock.clone()),
            inventory: InventoryService::new(runner.clone(), clock.clone()),
            orders: OrderEngine::new(runner, clock),
            store,
            signer,
            routes: ROUTES,
        }
    }
}
