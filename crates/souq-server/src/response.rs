//! Response envelope and error mapping.
//!
//! Every body has the shape `{ success, message, data?, errors?, meta? }`.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use souq_auth::AuthError;
use souq_commerce::{CommerceError, ErrorKind};

/// JSON envelope.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// A successful reply.
pub struct ApiResponse<T: Serialize> {
    status: StatusCode,
    envelope: Envelope<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::OK, message, data)
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::CREATED, message, data)
    }

    fn with_status(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        Self {
            status,
            envelope: Envelope {
                success: true,
                message: message.into(),
                data: Some(data),
                errors: None,
                meta: None,
            },
        }
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.envelope.meta = Some(meta);
        self
    }
}

impl ApiResponse<()> {
    /// A reply with a message and no data.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            envelope: Envelope {
                success: true,
                message: message.into(),
                data: None,
                errors: None,
                meta: None,
            },
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}

/// Handler error: a status, a short message and optional field detail.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub errors: Option<BTreeMap<String, String>>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            errors: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

/// Status code for a core error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation
        | ErrorKind::NegativeStock
        | ErrorKind::IllegalTransition
        | ErrorKind::Duplicate => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InsufficientStock | ErrorKind::InvariantViolation | ErrorKind::Conflict => {
            StatusCode::CONFLICT
        }
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<CommerceError> for ApiError {
    fn from(err: CommerceError) -> Self {
        let kind = err.kind();
        let status = status_for(kind);
        let message = match kind {
            ErrorKind::Storage => {
                error!(error = %err, "storage failure");
                "Internal server error".to_string()
            }
            ErrorKind::InvariantViolation => {
                error!(error = %err, "inventory invariant violated");
                err.to_string()
            }
            ErrorKind::Conflict | ErrorKind::Timeout => {
                warn!(kind = %kind, error = %err, "request aborted");
                err.to_string()
            }
            _ => err.to_string(),
        };
        Self {
            status,
            message,
            errors: err.field_errors().cloned(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if err.is_auth_failure() {
            return Self::new(StatusCode::UNAUTHORIZED, err.to_string());
        }
        if err.is_permission_error() {
            let mut api = Self::new(StatusCode::FORBIDDEN, err.to_string());
            if let Some(permission) = err.required_permission() {
                let mut fields = BTreeMap::new();
                fields.insert("required_permission".to_string(), permission.to_string());
                api.errors = Some(fields);
            }
            return api;
        }
        error!(error = %err, "authorization failure");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope: Envelope<()> = Envelope {
            success: false,
            message: self.message,
            data: None,
            errors: self.errors,
            meta: None,
        };
        (self.status, Json(envelope)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ErrorKind::Validation, 400),
            (ErrorKind::NegativeStock, 400),
            (ErrorKind::IllegalTransition, 400),
            (ErrorKind::Duplicate, 400),
            (ErrorKind::NotFound, 404),
            (ErrorKind::InsufficientStock, 409),
            (ErrorKind::InvariantViolation, 409),
            (ErrorKind::Conflict, 409),
            (ErrorKind::Timeout, 504),
            (ErrorKind::Storage, 500),
        ];
        for (kind, code) in cases {
            assert_eq!(status_for(kind).as_u16(), code, "{}", kind);
        }
    }

    #[test]
    fn test_storage_message_is_generic() {
        let api = ApiError::from(CommerceError::Storage("relation \"orders\" does not exist".into()));
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.message, "Internal server error");
    }

    #[test]
    fn test_validation_carries_fields() {
        let api = ApiError::from(CommerceError::invalid_field("items", "must not be empty"));
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.errors.unwrap()["items"], "must not be empty");
    }

    #[test]
    fn test_auth_statuses() {
        assert_eq!(ApiError::from(AuthError::MissingToken).status, StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(AuthError::NoRole).status, StatusCode::FORBIDDEN);
        let denied = ApiError::from(AuthError::InsufficientPermission("orders.confirm".into()));
        assert_eq!(denied.status, StatusCode::FORBIDDEN);
        assert_eq!(denied.errors.unwrap()["required_permission"], "orders.confirm");
    }

    #[test]
    fn test_envelope_skips_empty_parts() {
        let envelope = Envelope {
            success: true,
            message: "ok".into(),
            data: Some(1),
            errors: None,
            meta: None,
        };
        let json = serde_json::to_value(envelope).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "message": "ok", "data": 1}));
    }
}
