//! Declarative route descriptions shared by the router, the permission
//! middleware and the reconciler.

use std::fmt;

use serde::Serialize;

/// HTTP methods the API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RouteMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl RouteMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMethod::Get => "GET",
            RouteMethod::Post => "POST",
            RouteMethod::Put => "PUT",
            RouteMethod::Patch => "PATCH",
            RouteMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who may call a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "permission", rename_all = "snake_case")]
pub enum Access {
    /// Anyone.
    Public,
    /// Anyone, scoped to the storefront resolved from the request domain.
    Storefront,
    /// An admin whose role holds the named permission.
    Permission(&'static str),
}

/// One route: method, path pattern and access rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RouteSpec {
    pub method: RouteMethod,
    /// Path pattern with `:param` segments.
    pub path: &'static str,
    pub access: Access,
}

impl RouteSpec {
    pub const fn new(method: RouteMethod, path: &'static str, access: Access) -> Self {
        Self { method, path, access }
    }

    pub fn permission(&self) -> Option<&'static str> {
        match self.access {
            Access::Permission(name) => Some(name),
            _ => None,
        }
    }
}

/// Find the route declared for `method` and a concrete `path`.
///
/// `:param` segments match any single non-empty segment. Literal segments
/// win over parameters, so `/orders/meta` is not taken for `/orders/:id`.
pub fn match_route<'a>(routes: &'a [RouteSpec], method: RouteMethod, path: &str) -> Option<&'a RouteSpec> {
    let segments: Vec<&str> = split(path).collect();
    routes
        .iter()
        .filter(|route| route.method == method)
        .filter_map(|route| {
            let pattern: Vec<&str> = split(route.path).collect();
            if pattern.len() != segments.len() {
                return None;
            }
            let mut literals = 0usize;
            for (want, got) in pattern.iter().zip(&segments) {
                if want.starts_with(':') {
                    if got.is_empty() {
                        return None;
                    }
                } else if want == got {
                    literals += 1;
                } else {
                    return None;
                }
            }
            Some((literals, route))
        })
        .max_by_key(|(literals, _)| *literals)
        .map(|(_, route)| route)
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.trim_matches('/').split('/')
}

/// Path fragments that never carry a permission.
const UNGUARDED: &[&str] = &["/login", "/register", "/refresh", "/health"];

/// Trailing segments that name an action on the module before them.
const ACTION_SUFFIXES: &[&str] = &["deleted", "archived", "recover", "restore", "activate", "deactivate"];

/// Infer `<module>.<action>` from a route's method and path.
///
/// The module is the last path segment, stepping back past action suffixes
/// and a trailing `:param`. Non-API and auth/health paths yield nothing.
pub fn derive_permission(method: RouteMethod, path: &str) -> Option<String> {
    if !path.starts_with("/api/") || UNGUARDED.iter().any(|s| path.contains(s)) {
        return None;
    }
    let parts: Vec<&str> = split(path).collect();
    if parts.len() < 2 || parts[0] != "api" {
        return None;
    }

    let mut back = if ACTION_SUFFIXES.iter().any(|s| path.ends_with(s)) { 2 } else { 1 };
    let mut module = parts[parts.len().checked_sub(back)?];
    if module.starts_with(':') && parts.len() >= 3 {
        back += 1;
        module = parts[parts.len().checked_sub(back)?];
    }
    if module.starts_with(':') {
        return None;
    }

    let action = match method {
        RouteMethod::Get => "view",
        RouteMethod::Post => "create",
        RouteMethod::Put | RouteMethod::Patch => "update",
        RouteMethod::Delete => "delete",
    };
    Some(format!("{}.{}", module, action))
}

/// Distinct permission names named by `routes`, in declaration order.
pub fn route_permissions(routes: &[RouteSpec]) -> Vec<&'static str> {
    let mut out: Vec<&'static str> = Vec::new();
    for name in routes.iter().filter_map(RouteSpec::permission) {
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}
