//! Request middleware: access control and storefront resolution.

use std::collections::HashMap;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Query, Request, State};
use axum::http::{header, HeaderName};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tracing::{debug, Span};

use souq_auth::{match_route, Access, Caller, RouteMethod};
use souq_commerce::catalog::{normalize_domain, StoreFront};

use crate::response::ApiError;
use crate::state::AppState;

/// Header carrying the request id.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Query parameter that overrides the `Host` header for storefront routes.
pub const STORE_DOMAIN_PARAM: &str = "store_domain";

pub fn set_request_id() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid)
}

pub fn propagate_request_id() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(REQUEST_ID_HEADER)
}

pub fn request_timeout(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::new(timeout)
}

/// Span per request, tagged with the request id.
pub fn trace_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id,
    )
}

fn route_method(method: &axum::http::Method) -> Option<RouteMethod> {
    match method.as_str() {
        "GET" => Some(RouteMethod::Get),
        "POST" => Some(RouteMethod::Post),
        "PUT" => Some(RouteMethod::Put),
        "PATCH" => Some(RouteMethod::Patch),
        "DELETE" => Some(RouteMethod::Delete),
        _ => None,
    }
}

/// Enforce the access rule declared for the matched route.
///
/// Permission routes get a [`Caller`] extension, storefront routes a
/// [`StoreFront`] extension. Requests matching no declared route pass
/// through to the router's fallback.
pub async fn access(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let Some(method) = route_method(request.method()) else {
        return next.run(request).await;
    };
    let Some(route) = match_route(state.routes, method, request.uri().path()) else {
        return next.run(request).await;
    };

    match route.access {
        Access::Public => {}
        Access::Permission(permission) => {
            let authorization = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let caller = match authenticate(&state, authorization.as_deref(), permission).await {
                Ok(caller) => caller,
                Err(err) => return err.into_response(),
            };
            request.extensions_mut().insert(caller);
        }
        Access::Storefront => {
            let domain = request_domain(&request);
            let store = match resolve_storefront(&state, domain).await {
                Ok(store) => store,
                Err(err) => return err.into_response(),
            };
            request.extensions_mut().insert(store);
        }
    }
    next.run(request).await
}

async fn authenticate(state: &AppState, header: Option<&str>, permission: &str) -> Result<Caller, ApiError> {
    let caller = Caller::from_authorization(header, &state.signer)?;
    caller.authorize(state.store.as_ref(), permission).await?;
    debug!(admin_id = %caller.admin_id, permission, "access granted");
    Ok(caller)
}

/// Domain to resolve: the `store_domain` query parameter wins over `Host`.
pub fn request_domain(request: &Request) -> Option<String> {
    let from_query = Query::<HashMap<String, String>>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(params)| params.get(STORE_DOMAIN_PARAM).cloned())
        .and_then(|domain| normalize_domain(&domain));
    from_query.or_else(|| {
        request
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .and_then(normalize_domain)
    })
}

async fn resolve_storefront(state: &AppState, domain: Option<String>) -> Result<StoreFront, ApiError> {
    let domain = domain.ok_or_else(|| ApiError::bad_request("Store domain is required"))?;
    match state.catalog.resolve_storefront(&domain).await {
        Ok(store) => Ok(store),
        Err(err) if err.kind() == souq_commerce::ErrorKind::NotFound => {
            Err(ApiError::not_found(format!("Store not found for domain: {}", domain)))
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str, host: Option<&str>) -> Request {
        let mut builder = Request::builder().uri(uri);
        if let Some(host) = host {
            builder = builder.header(header::HOST, host);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_query_domain_wins_over_host() {
        let req = request("/api/storefront/products?store_domain=Outlet.example.com", Some("shop.example.com"));
        assert_eq!(request_domain(&req).as_deref(), Some("outlet.example.com"));
    }

    #[test]
    fn test_host_port_is_stripped() {
        let req = request("/api/storefront/products", Some("shop.example.com:8080"));
        assert_eq!(request_domain(&req).as_deref(), Some("shop.example.com"));
    }

    #[test]
    fn test_no_domain() {
        let req = request("/api/storefront/products?store_domain=", None);
        assert_eq!(request_domain(&req), None);
    }

    #[test]
    fn test_route_method() {
        assert_eq!(route_method(&axum::http::Method::PATCH), Some(RouteMethod::Patch));
        assert_eq!(route_method(&axum::http::Method::OPTIONS), None);
    }
}
