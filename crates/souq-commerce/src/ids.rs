//! Newtype IDs for type-safe identifiers.
//!
//! Every entity is keyed by a database surrogate key. Wrapping the raw
//! `i64` prevents passing a `VariantId` where a `StoreFrontId` is expected,
//! which matters a lot in the inventory ledger where both appear side by side.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Macro to generate newtype ID structs.
macro_rules! define_id {
    ($name:ident) => {
        /// A surrogate key.
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw key.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the raw key.
            pub const fn get(self) -> i64 {
                self.0
            }

            /// Whether this is the zero placeholder used before the store
            /// assigns a key.
            pub const fn is_unset(self) -> bool {
                self.0 == 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<i64>().map(Self)
            }
        }
    };
}

// Catalog
define_id!(ProductId);
define_id!(VariantId);
define_id!(BrandId);
define_id!(CategoryId);
define_id!(SupplierId);
define_id!(StoreFrontId);
define_id!(CurrencyId);

// Ledger
define_id!(InventoryId);
define_id!(AdjustmentId);

// Orders
define_id!(OrderId);
define_id!(OrderItemId);
define_id!(StatusId);

// Access control
define_id!(AdminId);
define_id!(RoleId);
define_id!(PermissionId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip_through_str() {
        let id: OrderId = "42".parse().unwrap();
        assert_eq!(id, OrderId::new(42));
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_id_rejects_garbage() {
        assert!("abc".parse::<VariantId>().is_err());
    }

    #[test]
    fn test_unset_placeholder() {
        assert!(OrderItemId::default().is_unset());
        assert!(!OrderItemId::new(7).is_unset());
    }

    #[test]
    fn test_id_serializes_as_bare_number() {
        let json = serde_json::to_string(&StoreFrontId::new(3)).unwrap();
        assert_eq!(json, "3");
        let back: StoreFrontId = serde_json::from_str("3").unwrap();
        assert_eq!(back.get(), 3);
    }
}
