//! Transactional services.
//!
//! Every public operation runs as one store transaction under a deadline:
//! it commits when the work succeeds and rolls back on any error, including
//! deadline expiry.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::CommerceError;
use crate::store::{Store, StoreTx};

/// Run a block as one transaction: `transaction!(runner, "op", |tx| { ... })`.
///
/// The block sees `tx: &mut dyn StoreTx` and evaluates to a
/// `Result<T, CommerceError>`.
macro_rules! transaction {
    ($runner:expr, $operation:literal, |$tx:ident| $body:block) => {{
        let runner = &$runner;
        runner
            .deadline($operation, async {
                let mut owned = runner.begin().await?;
                let result: Result<_, $crate::error::CommerceError> = async {
                    let $tx: &mut dyn $crate::store::StoreTx = owned.as_mut();
                    $body
                }
                .await;
                runner.finish(owned, result).await
            })
            .await
    }};
}

pub(crate) use transaction;

mod activation;
mod catalog;
mod inventory;
mod ledger;
mod orders;

pub use activation::ActivationGate;
pub use catalog::CatalogService;
pub use inventory::InventoryService;
pub use ledger::InventoryLedger;
pub use orders::OrderEngine;

/// Default transaction deadline.
pub const DEFAULT_TX_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens, finishes and bounds store transactions.
#[derive(Clone)]
pub struct TxRunner {
    store: Arc<dyn Store>,
    tx_timeout: Duration,
}

impl TxRunner {
    pub fn new(store: Arc<dyn Store>, tx_timeout: Duration) -> Self {
        Self { store, tx_timeout }
    }

    pub async fn begin(&self) -> Result<Box<dyn StoreTx>, CommerceError> {
        Ok(self.store.begin().await?)
    }

    /// Commit on success, roll back on failure.
    pub async fn finish<T>(
        &self,
        tx: Box<dyn StoreTx>,
        result: Result<T, CommerceError>,
    ) -> Result<T, CommerceError> {
        match result {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                debug!(kind = %err.kind(), error = %err, "rolling back");
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Run `work` under the transaction deadline. On expiry the future is
    /// dropped, which rolls back any transaction it holds.
    pub async fn deadline<T, F>(&self, operation: &'static str, work: F) -> Result<T, CommerceError>
    where
        F: Future<Output = Result<T, CommerceError>>,
    {
        match tokio::time::timeout(self.tx_timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout_ms = self.tx_timeout.as_millis() as u64, "transaction deadline expired");
                Err(CommerceError::Timeout)
            }
        }
    }
}
