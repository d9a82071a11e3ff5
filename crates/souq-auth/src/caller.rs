//! Authenticated callers and permission checks.

use tracing::debug;

use souq_commerce::ids::{AdminId, RoleId};
use souq_commerce::store::Store;

use crate::token::{EntityType, TokenSigner, TokenType};
use crate::AuthError;

/// An authenticated admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub admin_id: AdminId,
    pub role_id: Option<RoleId>,
}

impl Caller {
    /// Authenticate an `Authorization` header value.
    ///
    /// Only `Bearer` access tokens issued to admins are accepted.
    pub fn from_authorization(header: Option<&str>, signer: &TokenSigner) -> Result<Self, AuthError> {
        let header = header.ok_or(AuthError::MissingToken)?;
        let token = bearer_token(header)?;
        let claims = signer.verify(token, TokenType::Access)?;
        if claims.entity_type != EntityType::Admin {
            return Err(AuthError::AdminRequired);
        }
        Ok(Self {
            admin_id: AdminId::new(claims.entity_id),
            role_id: claims.role_id,
        })
    }

    /// Fail unless the caller's role holds `permission`.
    pub async fn authorize(&self, store: &dyn Store, permission: &str) -> Result<(), AuthError> {
        let role = self.role_id.ok_or(AuthError::NoRole)?;
        let mut tx = store.begin().await?;
        let granted = tx.role_has_permission(role, permission).await;
        tx.rollback().await?;
        if !granted? {
            debug!(admin_id = %self.admin_id, role_id = %role, permission, "permission denied");
            return Err(AuthError::InsufficientPermission(permission.to_string()));
        }
        Ok(())
    }
}

/// Extract the token from `Bearer <token>`.
pub fn bearer_token(header: &str) -> Result<&str, AuthError> {
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::MalformedHeader),
    }
}
