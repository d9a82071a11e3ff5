//! Admin product endpoints (v2).

use axum::extract::State;
use axum::Extension;
use serde::Deserialize;

use souq_auth::Caller;
use souq_commerce::prelude::*;

use crate::extract::{ApiJson, ApiPath};
use crate::response::{ApiError, ApiResponse, ApiResult};
use crate::state::AppState;

/// Body of a status change.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

impl StatusRequest {
    fn parse(&self) -> Result<ProductStatus, ApiError> {
        ProductStatus::from_str(self.status.trim()).ok_or_else(|| {
            CommerceError::invalid_field("status", "must be one of draft, active, inactive, archived").into()
        })
    }
}

pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiJson(input): ApiJson<ProductInput>,
) -> ApiResult<ProductDetail> {
    let product = state.catalog.create_product(input, caller.admin_id).await?;
    Ok(ApiResponse::created("Product created successfully", product))
}

pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> ApiResult<ProductDetail> {
    let product = state.catalog.get_product(id).await?;
    Ok(ApiResponse::ok("Product retrieved successfully", product))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(input): ApiJson<ProductInput>,
) -> ApiResult<ProductDetail> {
    let product = state.catalog.update_product(id, input, caller.admin_id).await?;
    Ok(ApiResponse::ok("Product updated successfully", product))
}

pub async fn destroy(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> ApiResult<()> {
    state.catalog.delete_product(id).await?;
    Ok(ApiResponse::message("Product deleted successfully"))
}

pub async fn change_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> ApiResult<Product> {
    let status = req.parse()?;
    let product = state.catalog.change_status(id, status).await?;
    Ok(ApiResponse::ok("Product status updated successfully", product))
}

pub async fn create_variant(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(input): ApiJson<VariantInput>,
) -> ApiResult<Variant> {
    let variant = state.catalog.create_variant(id, input, caller.admin_id).await?;
    Ok(ApiResponse::created("Variant created successfully", variant))
}

pub async fn update_variant(
    State(state): State<AppState>,
    ApiPath((id, variant_id)): ApiPath<(ProductId, VariantId)>,
    ApiJson(input): ApiJson<VariantInput>,
) -> ApiResult<Variant> {
    let variant = state.catalog.update_variant(id, variant_id, input).await?;
    Ok(ApiResponse::ok("Variant updated successfully", variant))
}
