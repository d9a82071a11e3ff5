use axum::extract::State;
use chrono::Utc;
use serde::Serialize;

use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub engine: &'static str,
    pub version: &'static str,
    pub time: chrono::DateTime<Utc>,
}

pub async fn health(State(state): State<AppState>) -> ApiResponse<Health> {
    ApiResponse::ok(
        "Service is healthy",
        Health {
            status: "ok",
            engine: state.store.engine(),
            version: env!("CARGO_PKG_VERSION"),
            time: Utc::now(),
        },
    )
}
