//! Storefronts: the tenant scope for inventory, pricing context and orders.

use serde::{Deserialize, Serialize};

use crate::ids::StoreFrontId;
use crate::money::DEFAULT_CURRENCY_CODE;

/// A storefront, resolved for public requests by its domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreFront {
    pub id: StoreFrontId,
    pub name: String,
    /// Unique slug.
    pub slug: String,
    /// Unique domain, matched against the request host.
    pub domain: String,
    /// Currency code; empty means the default currency.
    pub currency: String,
    pub default_language: String,
    pub is_active: bool,
}

impl StoreFront {
    /// Currency codes to try when pricing an order, in order of preference.
    pub fn currency_candidates(&self) -> Vec<&str> {
        let code = self.currency.trim();
        if code.is_empty() || code.eq_ignore_ascii_case(DEFAULT_CURRENCY_CODE) {
            vec![DEFAULT_CURRENCY_CODE]
        } else {
            vec![code, DEFAULT_CURRENCY_CODE]
        }
    }
}

/// Reduce a `Host` header value to a bare domain.
///
/// Strips the port and surrounding whitespace; returns `None` when nothing
/// is left.
pub fn normalize_domain(host: &str) -> Option<String> {
    let host = host.trim();
    let bare = match host.find(':') {
        Some(idx) => &host[..idx],
        None => host,
    };
    if bare.is_empty() {
        None
    } else {
        Some(bare.to_ascii_lowercase())
    }
}
