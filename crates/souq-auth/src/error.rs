//! Authentication errors.

use souq_commerce::store::StoreError;
use thiserror::Error;

/// Authentication and authorization error type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    /// No `Authorization` header.
    #[error("Authorization header required")]
    MissingToken,

    /// Header present but not `Bearer <token>`.
    #[error("Invalid authorization header format")]
    MalformedHeader,

    /// Bad signature, bad encoding or wrong algorithm.
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid or expired token")]
    TokenExpired,

    /// A refresh token where an access token is needed.
    #[error("invalid token type")]
    WrongTokenType,

    /// The token belongs to a shopper, not an admin.
    #[error("Admin access required")]
    AdminRequired,

    /// The admin carries no role.
    #[error("No role assigned")]
    NoRole,

    /// The role lacks the named permission.
    #[error("Insufficient permissions")]
    InsufficientPermission(String),

    /// Token signing secret is unusable.
    #[error("invalid signing key: {0}")]
    Key(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Whether the caller failed to prove who they are (401).
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            AuthError::MissingToken
                | AuthError::MalformedHeader
                | AuthError::InvalidToken
                | AuthError::TokenExpired
                | AuthError::WrongTokenType
                | AuthError::AdminRequired
        )
    }

    /// Whether the caller is known but not allowed (403).
    pub fn is_permission_error(&self) -> bool {
        matches!(self, AuthError::NoRole | AuthError::InsufficientPermission(_))
    }

    /// The permission a request was denied for, if any.
    pub fn required_permission(&self) -> Option<&str> {
        match self {
            AuthError::InsufficientPermission(name) => Some(name),
            _ => None,
        }
    }
}
