//! Bearer access tokens.
//!
//! Tokens are compact HS256 JWTs: `base64url(header).base64url(claims).base64url(mac)`.
//! Only the signing side needed by the admin API is implemented here; refresh
//! flows and login live outside the core.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use souq_commerce::ids::{AdminId, RoleId};

use crate::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Default lifetime of a development access token: 24 hours.
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Token purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Who the token was issued to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    User,
    Admin,
}

/// Signed claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub entity_id: i64,
    pub entity_type: EntityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<RoleId>,
    pub token_type: TokenType,
    /// Issued at, unix seconds.
    pub iat: i64,
    /// Expires at, unix seconds.
    pub exp: i64,
}

impl Claims {
    /// Access claims for an admin, valid for `ttl_secs` from `now`.
    pub fn admin_access(admin: AdminId, role: Option<RoleId>, now: i64, ttl_secs: i64) -> Self {
        Self {
            entity_id: admin.get(),
            entity_type: EntityType::Admin,
            role_id: role,
            token_type: TokenType::Access,
            iat: now,
            exp: now.saturating_add(ttl_secs),
        }
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}

/// Signs and verifies tokens with one shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").field("secret", &"***").finish()
    }
}

impl TokenSigner {
    /// Create a signer. An empty secret is rejected.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, AuthError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(AuthError::Key("secret must not be empty".into()));
        }
        Ok(Self {
            secret: secret.to_vec(),
        })
    }

    fn mac(&self) -> Result<HmacSha256, AuthError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|e| AuthError::Key(e.to_string()))
    }

    /// Encode and sign `claims`.
    pub fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        let header = Header {
            alg: "HS256".into(),
            typ: "JWT".into(),
        };
        let header = serde_json::to_vec(&header).map_err(|e| AuthError::Serialization(e.to_string()))?;
        let payload = serde_json::to_vec(claims).map_err(|e| AuthError::Serialization(e.to_string()))?;
        let signing_input = format!("{}.{}", URL_SAFE_NO_PAD.encode(header), URL_SAFE_NO_PAD.encode(payload));

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Issue an admin access token valid for `ttl_secs`.
    pub fn issue_admin_access(
        &self,
        admin: AdminId,
        role: Option<RoleId>,
        ttl_secs: i64,
    ) -> Result<String, AuthError> {
        self.sign(&Claims::admin_access(admin, role, Utc::now().timestamp(), ttl_secs))
    }

    /// Verify signature, expiry and token type against the current time.
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, AuthError> {
        self.verify_at(token, expected, Utc::now().timestamp())
    }

    /// Verify signature, expiry and token type at `now`.
    pub fn verify_at(&self, token: &str, expected: TokenType, now: i64) -> Result<Claims, AuthError> {
        let mut parts = token.split('.');
        let (Some(header_part), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::InvalidToken);
        };

        let header: Header = decode_json(header_part)?;
        if header.alg != "HS256" {
            return Err(AuthError::InvalidToken);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::InvalidToken)?;
        let mut mac = self.mac()?;
        mac.update(header_part.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).map_err(|_| AuthError::InvalidToken)?;

        let claims: Claims = decode_json(payload)?;
        if claims.is_expired_at(now) {
            return Err(AuthError::TokenExpired);
        }
        if claims.token_type != expected {
            return Err(AuthError::WrongTokenType);
        }
        Ok(claims)
    }
}

fn decode_json<T: for<'de> Deserialize<'de>>(part: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD.decode(part).map_err(|_| AuthError::InvalidToken)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::InvalidToken)
}
