//! Database error types.

use souq_commerce::store::StoreError;
use thiserror::Error;

/// Errors raised while opening or preparing a store.
#[derive(Error, Debug)]
pub enum DbError {
    /// The store URL names no known engine.
    #[error("Unsupported store URL: {0}")]
    UnsupportedUrl(String),

    /// Failed to parse connection settings.
    #[error("Invalid store configuration: {0}")]
    Config(String),

    /// Failed to open the connection pool.
    #[error("Failed to open store: {0}")]
    OpenError(String),

    /// Failed to apply the schema or seed data.
    #[error("Schema setup failed: {0}")]
    Schema(String),

    /// A store operation failed during setup.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// SQLSTATE codes that map onto typed store errors.
pub(crate) mod sqlstate {
    pub const UNIQUE_VIOLATION: &str = "23505";
    pub const LOCK_NOT_AVAILABLE: &str = "55P03";
    pub const DEADLOCK_DETECTED: &str = "40P01";
    pub const SERIALIZATION_FAILURE: &str = "40001";
    pub const QUERY_CANCELED: &str = "57014";
}

/// Classify a SQLSTATE code plus server message.
pub(crate) fn classify(code: &str, message: &str) -> StoreError {
    match code {
        sqlstate::UNIQUE_VIOLATION => StoreError::UniqueViolation(message.to_string()),
        sqlstate::LOCK_NOT_AVAILABLE | sqlstate::QUERY_CANCELED => {
            StoreError::LockTimeout(message.to_string())
        }
        sqlstate::DEADLOCK_DETECTED => StoreError::Deadlock,
        sqlstate::SERIALIZATION_FAILURE => StoreError::SerializationFailure,
        _ => StoreError::Backend(format!("{} ({})", message, code)),
    }
}
