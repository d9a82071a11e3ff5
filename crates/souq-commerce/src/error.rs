//! Commerce error types.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::ids::{StoreFrontId, VariantId};
use crate::store::StoreError;

/// Errors surfaced by the order, inventory and catalog core.
///
/// Every error raised inside a transactional scope aborts that transaction;
/// none are swallowed. The HTTP layer maps [`CommerceError::kind`] to a status
/// code.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommerceError {
    /// Malformed input. `fields` maps a field name to the reason it was rejected.
    #[error("{message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, String>,
    },

    /// Referenced entity is missing or soft-deleted.
    #[error("{0} not found")]
    NotFound(String),

    /// A reservation would make `available` negative.
    #[error(
        "insufficient stock for variant {variant_id} in store {store_front_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        variant_id: VariantId,
        store_front_id: StoreFrontId,
        requested: i64,
        available: i64,
    },

    /// An adjustment would make `quantity` negative or drop it below `reserved`.
    #[error("adjustment would result in negative stock (current: {current}, adjustment: {adjustment})")]
    NegativeStock { current: i64, adjustment: i64 },

    /// A release or deduction would break `0 <= reserved <= quantity`.
    #[error("inventory invariant violated: {0}")]
    InvariantViolation(String),

    /// The entity's current status does not allow the requested change.
    #[error("{0}")]
    IllegalTransition(String),

    /// Lock wait timeout, deadlock or serialization failure.
    #[error("conflicting concurrent update: {0}")]
    Conflict(String),

    /// Unique key collision (slug, SKU, domain).
    #[error("{0}")]
    Duplicate(String),

    /// The transaction deadline expired and the work was rolled back.
    #[error("operation timed out")]
    Timeout,

    /// Opaque storage failure. The message is logged, never shown to clients.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Coarse error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InsufficientStock,
    NegativeStock,
    InvariantViolation,
    IllegalTransition,
    Conflict,
    Duplicate,
    Timeout,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::NegativeStock => "negative_stock",
            ErrorKind::InvariantViolation => "invariant_violation",
            ErrorKind::IllegalTransition => "illegal_transition",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Storage => "storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CommerceError {
    /// A validation error without field detail.
    pub fn validation(message: impl Into<String>) -> Self {
        CommerceError::Validation {
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    /// A validation error for a single field.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let field = field.into();
        let reason = reason.into();
        let mut fields = BTreeMap::new();
        fields.insert(field.clone(), reason.clone());
        CommerceError::Validation {
            message: format!("{}: {}", field, reason),
            fields,
        }
    }

    /// Entity `what` with key `id` is missing.
    pub fn not_found(what: &str, id: impl fmt::Display) -> Self {
        CommerceError::NotFound(format!("{} {}", what, id))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CommerceError::Validation { .. } => ErrorKind::Validation,
            CommerceError::NotFound(_) => ErrorKind::NotFound,
            CommerceError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CommerceError::NegativeStock { .. } => ErrorKind::NegativeStock,
            CommerceError::InvariantViolation(_) => ErrorKind::InvariantViolation,
            CommerceError::IllegalTransition(_) => ErrorKind::IllegalTransition,
            CommerceError::Conflict(_) => ErrorKind::Conflict,
            CommerceError::Duplicate(_) => ErrorKind::Duplicate,
            CommerceError::Timeout => ErrorKind::Timeout,
            CommerceError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Field-level detail for validation errors.
    pub fn field_errors(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            CommerceError::Validation { fields, .. } if !fields.is_empty() => Some(fields),
            _ => None,
        }
    }
}

impl From<StoreError> for CommerceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::LockTimeout(what) => CommerceError::Conflict(format!("lock wait timeout on {}", what)),
            StoreError::Deadlock => CommerceError::Conflict("deadlock detected".into()),
            StoreError::SerializationFailure => {
                CommerceError::Conflict("could not serialize access".into())
            }
            StoreError::UniqueViolation(what) => CommerceError::Duplicate(format!("{} already exists", what)),
            other => CommerceError::Storage(other.to_string()),
        }
    }
}

/// Accumulates field errors before failing a request.
#[derive(Debug, Default)]
pub struct FieldErrors {
    fields: BTreeMap<String, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for `field`. The first reason recorded wins.
    pub fn add(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.fields.entry(field.into()).or_insert_with(|| reason.into());
    }

    /// Record a failure when `failed` holds.
    pub fn check(&mut self, failed: bool, field: &str, reason: &str) {
        if failed {
            self.add(field, reason);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fail with a [`CommerceError::Validation`] if anything was recorded.
    pub fn into_result(self) -> Result<(), CommerceError> {
        if self.fields.is_empty() {
            return Ok(());
        }
        let message = match self.fields.iter().next() {
            Some((field, reason)) if self.fields.len() == 1 => format!("{}: {}", field, reason),
            _ => "validation failed".to_string(),
        };
        Err(CommerceError::Validation {
            message,
            fields: self.fields,
        })
    }
}
