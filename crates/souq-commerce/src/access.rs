//! Role and permission catalogue rows.

use serde::{Deserialize, Serialize};

use crate::ids::{PermissionId, RoleId};

/// Role that receives every newly reconciled permission.
pub const SUPER_ADMIN_ROLE: &str = "Super Admin";

/// A permission, named `<module>.<action>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    /// Unique dotted name, e.g. `orders.confirm`.
    pub name: String,
    pub description: String,
}

impl Permission {
    /// A permission row not yet stored.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: PermissionId::default(),
            name: name.into(),
            description: description.into(),
        }
    }

    /// The module half of the name.
    pub fn module(&self) -> &str {
        self.name.split_once('.').map(|(m, _)| m).unwrap_or(&self.name)
    }

    /// The action half of the name.
    pub fn action(&self) -> &str {
        self.name.split_once('.').map(|(_, a)| a).unwrap_or("")
    }
}

/// A role. Admins carry exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: String,
}
