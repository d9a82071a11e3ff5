//! Store engines for souq.
//!
//! Two engines implement the [`souq_commerce::store::Store`] port:
//!
//! - [`MemoryStore`]: process-local, for development and tests
//! - `PgStore`: PostgreSQL through a connection pool (feature `postgres`)
//!
//! # Example
//!
//! ```rust,ignore
//! use souq_db::{open, seed_reference_data, StoreOptions};
//!
//! let store = open("memory://", &StoreOptions::default()).await?;
//! seed_reference_data(store.as_ref()).await?;
//! ```

mod error;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;
mod seed;

use std::sync::Arc;
use std::time::Duration;

use souq_commerce::store::Store;
use tracing::info;

pub use error::DbError;
pub use memory::{MemoryStore, MemoryTx, DEFAULT_LOCK_TIMEOUT};
#[cfg(feature = "postgres")]
pub use postgres::{PgOptions, PgStore, PgTx};
pub use seed::{ensure_store_front, seed_reference_data, SeedReport};

/// URL that selects the in-memory engine.
pub const MEMORY_URL: &str = "memory://";

/// Engine-independent settings.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub max_connections: usize,
    pub lock_timeout: Duration,
    /// Apply the schema on open (PostgreSQL only).
    pub migrate: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_connections: 16,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            migrate: true,
        }
    }
}

/// Open the engine named by `url`: `memory://` or `postgres://...`.
pub async fn open(url: &str, options: &StoreOptions) -> Result<Arc<dyn Store>, DbError> {
    if url == MEMORY_URL || url == "memory" {
        info!(engine = "memory", "store opened");
        return Ok(Arc::new(MemoryStore::with_lock_timeout(options.lock_timeout)));
    }
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        return open_postgres(url, options).await;
    }
    Err(DbError::UnsupportedUrl(redact(url)))
}

#[cfg(feature = "postgres")]
async fn open_postgres(url: &str, options: &StoreOptions) -> Result<Arc<dyn Store>, DbError> {
    let store = PgStore::connect(
        url,
        &PgOptions {
            max_connections: options.max_connections,
            lock_timeout: options.lock_timeout,
        },
    )?;
    if options.migrate {
        store.migrate().await?;
    }
    info!(engine = "postgres", url = %redact(url), "store opened");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "postgres"))]
async fn open_postgres(url: &str, _options: &StoreOptions) -> Result<Arc<dyn Store>, DbError> {
    Err(DbError::UnsupportedUrl(format!(
        "{} (built without the postgres feature)",
        redact(url)
    )))
}

/// Strip credentials from a connection URL for logs.
pub fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => {
            format!("{}://***@{}", &url[..scheme], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_hides_credentials() {
        assert_eq!(
            redact("postgres://souq:secret@db:5432/souq"),
            "postgres://***@db:5432/souq"
        );
        assert_eq!(redact("memory://"), "memory://");
    }

    #[tokio::test]
    async fn test_open_memory() {
        let store = open(MEMORY_URL, &StoreOptions::default()).await.unwrap();
        assert_eq!(store.engine(), "memory");
    }

    #[tokio::test]
    async fn test_open_rejects_unknown_scheme() {
        let err = open("mysql://localhost", &StoreOptions::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DbError::UnsupportedUrl(_)));
    }
}
