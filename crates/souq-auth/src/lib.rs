//! Authentication and authorization for the souq admin API.
//!
//! - [`TokenSigner`]: HS256 bearer access tokens
//! - [`Caller`]: the authenticated admin and its permission check
//! - [`RouteSpec`]: the route table format shared with the HTTP layer
//! - [`PermissionReconciler`]: keeps the stored permission catalogue in step
//!   with the routes

mod caller;
mod error;
mod reconciler;
mod routes;
mod token;

pub use caller::{bearer_token, Caller};
pub use error::AuthError;
pub use reconciler::{describe, PermissionReconciler, ReconcileReport, PREDEFINED_PERMISSIONS};
pub use routes::{derive_permission, match_route, route_permissions, Access, RouteMethod, RouteSpec};
pub use token::{Claims, EntityType, TokenSigner, TokenType, DEFAULT_ACCESS_TTL_SECS};
