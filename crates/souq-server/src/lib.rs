//! HTTP surface for the souq storefront API.
//!
//! Everything lives under `/api`. [`routes::ROUTES`] declares each route with
//! its access rule; the router, the access middleware and the permission
//! reconciler are all driven by it.
//!
//! # Example
//!
//! ```rust,ignore
//! use souq_server::{serve, ServerConfig};
//!
//! let config = ServerConfig::resolve(None, &std::env::current_dir()?)?;
//! souq_server::init_tracing(&config.log)?;
//! serve(config).await?;
//! ```

mod app;
pub mod config;
mod extract;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
mod state;
mod telemetry;

pub use app::{bootstrap, build_app, serve};
pub use config::{ConfigError, LogFormat, ServerConfig};
pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use response::{ApiError, ApiResponse, ApiResult, Envelope};
pub use routes::ROUTES;
pub use state::AppState;
pub use telemetry::init_tracing;
