//! Public storefront endpoints. The storefront is resolved by the access
//! middleware from the request domain.

use axum::extract::State;
use axum::Extension;
use serde_json::json;

use souq_commerce::prelude::*;

use crate::extract::ApiPath;
use crate::response::{ApiResponse, ApiResult};
use crate::state::AppState;

pub async fn products(
    State(state): State<AppState>,
    Extension(store): Extension<StoreFront>,
) -> ApiResult<Vec<Product>> {
    let products = state.catalog.storefront_products(store.id).await?;
    let meta = json!({ "store_front": store.slug, "total": products.len() });
    Ok(ApiResponse::ok("Products retrieved successfully", products).with_meta(meta))
}

pub async fn product(
    State(state): State<AppState>,
    Extension(store): Extension<StoreFront>,
    ApiPath(slug): ApiPath<String>,
) -> ApiResult<ProductDetail> {
    let product = state.catalog.storefront_product(store.id, &slug).await?;
    Ok(ApiResponse::ok("Product retrieved successfully", product))
}
