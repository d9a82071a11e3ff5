//! Admin inventory endpoints.

use axum::extract::State;
use axum::Extension;
use serde::Deserialize;
use serde_json::json;

use souq_auth::Caller;
use souq_commerce::catalog::{
    AdjustInventoryRequest, AdjustmentOutcome, BulkInventoryRequest, ThresholdRequest,
};
use souq_commerce::prelude::*;

use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::response::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub low_stock: bool,
}

pub async fn adjust(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiJson(req): ApiJson<AdjustInventoryRequest>,
) -> ApiResult<AdjustmentOutcome> {
    let outcome = state.inventory.adjust(req, caller.admin_id).await?;
    Ok(ApiResponse::ok("Inventory adjusted successfully", outcome))
}

pub async fn bulk(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiJson(req): ApiJson<BulkInventoryRequest>,
) -> ApiResult<Vec<InventoryStatus>> {
    let updated = state.inventory.bulk_set(req, caller.admin_id).await?;
    let meta = json!({ "updated": updated.len() });
    Ok(ApiResponse::ok("Inventory updated successfully", updated).with_meta(meta))
}

pub async fn threshold(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ThresholdRequest>,
) -> ApiResult<InventoryStatus> {
    let status = state.inventory.set_threshold(req).await?;
    Ok(ApiResponse::ok("Low stock threshold updated successfully", status))
}

pub async fn by_store(
    State(state): State<AppState>,
    ApiPath(store): ApiPath<StoreFrontId>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Vec<InventoryStatus>> {
    let records = state.inventory.list(store, query.low_stock).await?;
    let meta = json!({ "total": records.len() });
    Ok(ApiResponse::ok("Inventory retrieved successfully", records).with_meta(meta))
}

pub async fn by_variant(
    State(state): State<AppState>,
    ApiPath((variant, store)): ApiPath<(VariantId, StoreFrontId)>,
) -> ApiResult<InventoryStatus> {
    let status = state.inventory.get(StockKey::new(variant, store)).await?;
    Ok(ApiResponse::ok("Inventory retrieved successfully", status))
}

pub async fn low_stock(
    State(state): State<AppState>,
    ApiPath(store): ApiPath<StoreFrontId>,
) -> ApiResult<Vec<InventoryStatus>> {
    let records = state.inventory.low_stock(store).await?;
    let meta = json!({ "total": records.len() });
    Ok(ApiResponse::ok("Low stock items retrieved successfully", records).with_meta(meta))
}

pub async fn history(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<InventoryId>,
) -> ApiResult<Vec<InventoryAdjustment>> {
    let history = state.inventory.history(id).await?;
    Ok(ApiResponse::ok("Adjustment history retrieved successfully", history))
}
