//! Admin order endpoints.

use axum::extract::State;
use axum::Extension;
use serde_json::json;

use souq_auth::Caller;
use souq_commerce::orders::OrderMeta;
use souq_commerce::prelude::*;

use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::response::{ApiResponse, ApiResult};
use crate::state::AppState;

pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiJson(req): ApiJson<CreateOrderRequest>,
) -> ApiResult<OrderDetail> {
    let order = state.orders.create(req, caller.admin_id).await?;
    Ok(ApiResponse::created("Order created successfully", order))
}

pub async fn list(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<OrderFilter>,
) -> ApiResult<Vec<Order>> {
    let orders = state.orders.list(filter).await?;
    let meta = json!({ "total": orders.len() });
    Ok(ApiResponse::ok("Orders retrieved successfully", orders).with_meta(meta))
}

pub async fn meta(State(state): State<AppState>) -> ApiResult<OrderMeta> {
    let meta = state.orders.meta().await?;
    Ok(ApiResponse::ok("Order metadata retrieved successfully", meta))
}

pub async fn show(State(state): State<AppState>, ApiPath(id): ApiPath<OrderId>) -> ApiResult<OrderDetail> {
    let order = state.orders.get(id).await?;
    Ok(ApiResponse::ok("Order retrieved successfully", order))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(_caller): Extension<Caller>,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(req): ApiJson<UpdateOrderRequest>,
) -> ApiResult<OrderDetail> {
    let order = state.orders.update(id, req).await?;
    Ok(ApiResponse::ok("Order updated successfully", order))
}

pub async fn confirm(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<OrderId>,
) -> ApiResult<OrderDetail> {
    let order = state.orders.confirm(id, caller.admin_id).await?;
    Ok(ApiResponse::ok("Order confirmed successfully", order))
}

pub async fn cancel(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<OrderId>,
) -> ApiResult<OrderDetail> {
    let order = state.orders.cancel(id, caller.admin_id).await?;
    Ok(ApiResponse::ok("Order cancelled successfully", order))
}

pub async fn pay(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<OrderId>,
) -> ApiResult<OrderDetail> {
    let order = state.orders.mark_paid(id, caller.admin_id).await?;
    Ok(ApiResponse::ok("Order marked as paid", order))
}

pub async fn out_for_delivery(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<OrderId>,
) -> ApiResult<OrderDetail> {
    let order = state.orders.mark_out_for_delivery(id, caller.admin_id).await?;
    Ok(ApiResponse::ok("Order marked as out for delivery", order))
}

pub async fn fulfill(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<OrderId>,
) -> ApiResult<OrderDetail> {
    let order = state.orders.fulfill(id, caller.admin_id).await?;
    Ok(ApiResponse::ok("Order fulfilled successfully", order))
}

pub async fn complete(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<OrderId>,
) -> ApiResult<OrderDetail> {
    let order = state.orders.complete(id, caller.admin_id).await?;
    Ok(ApiResponse::ok("Order completed successfully", order))
}
