//! Permission reconciliation.
//!
//! At startup the set of permissions the API needs (a predefined list plus
//! every permission named in the route table) is compared with the stored
//! catalogue. Missing permissions are inserted and granted to the super
//! admin role. Existing rows are never changed or removed.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{info, warn};

use souq_commerce::access::{Permission, SUPER_ADMIN_ROLE};
use souq_commerce::store::{Store, StoreTx};

use crate::routes::{derive_permission, route_permissions, RouteSpec};
use crate::AuthError;

/// Permissions every deployment carries, whether or not a route names them.
pub const PREDEFINED_PERMISSIONS: &[(&str, &str)] = &[
    ("admins.view", "View and list admins"),
    ("admins.create", "Create new admins"),
    ("admins.update", "Update existing admins"),
    ("admins.delete", "Delete existing admins"),
    ("users.view", "View and list users"),
    ("users.create", "Create new users"),
    ("users.update", "Update existing users"),
    ("users.delete", "Delete existing users"),
    ("roles.view", "View and list roles"),
    ("roles.create", "Create new roles"),
    ("roles.update", "Update existing roles"),
    ("roles.delete", "Delete existing roles"),
    ("permissions.view", "View and list permissions"),
    ("permissions.create", "Create new permissions"),
    ("permissions.update", "Update existing permissions"),
    ("permissions.delete", "Delete existing permissions"),
    ("files.view", "View and list files"),
    ("files.create", "Upload new files"),
    ("files.update", "Update existing files"),
    ("files.delete", "Delete existing files"),
    ("products.view", "View and list products"),
    ("products.create", "Create new products"),
    ("products.update", "Update existing products"),
    ("products.delete", "Delete existing products"),
    ("inventory.adjust", "Adjust product inventory quantities"),
    ("inventory.view", "View inventory levels"),
    ("storefronts.manage", "Manage store fronts (CRUD)"),
    ("seo.manage", "Manage product SEO metadata"),
    ("orders.view", "View and list orders"),
    ("orders.create", "Create new orders"),
    ("orders.edit", "Edit pending orders"),
    ("orders.confirm", "Confirm orders and deduct stock"),
    ("orders.cancel", "Cancel orders and release stock"),
    ("orders.pay", "Mark orders as paid"),
    ("orders.fulfill", "Mark orders out for delivery or fulfilled"),
    ("orders.complete", "Complete orders"),
];

/// Description for a permission discovered only through a route.
pub fn describe(name: &str) -> String {
    let (module, action) = name.split_once('.').unwrap_or(("system", name));
    let verb = match action {
        "view" => "View and read".to_string(),
        "create" => "Create new".to_string(),
        "update" => "Update existing".to_string(),
        "delete" => "Delete existing".to_string(),
        other => capitalize(other),
    };
    format!("{} {}", verb, module)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Outcome of a reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Number of permissions the API needs.
    pub required: usize,
    /// Names inserted by this run, sorted.
    pub inserted: Vec<String>,
    /// Number of inserted permissions granted to the super admin role.
    pub granted: usize,
}

/// Computes required permissions and syncs them into a store.
#[derive(Debug, Clone)]
pub struct PermissionReconciler {
    required: BTreeMap<String, String>,
}

impl PermissionReconciler {
    /// Required set: the predefined list, every permission a route names and
    /// every permission inferred from a route's method and path.
    pub fn new(routes: &[RouteSpec]) -> Self {
        let mut required: BTreeMap<String, String> = PREDEFINED_PERMISSIONS
            .iter()
            .map(|(name, description)| (name.to_string(), description.to_string()))
            .collect();
        for name in route_permissions(routes) {
            required
                .entry(name.to_string())
                .or_insert_with(|| describe(name));
        }
        for name in routes.iter().filter_map(|r| derive_permission(r.method, r.path)) {
            let description = describe(&name);
            required.entry(name).or_insert(description);
        }
        Self { required }
    }

    /// Add a permission outside the route table.
    pub fn with_permission(mut self, name: &str, description: &str) -> Self {
        self.required.insert(name.to_string(), description.to_string());
        self
    }

    /// Required permissions, sorted by name.
    pub fn required(&self) -> Vec<Permission> {
        self.required
            .iter()
            .map(|(name, description)| Permission::new(name.clone(), description.clone()))
            .collect()
    }

    /// Insert missing permissions and grant them to the super admin role,
    /// in one transaction.
    pub async fn sync(&self, store: &dyn Store) -> Result<ReconcileReport, AuthError> {
        let mut tx = store.begin().await?;
        match self.sync_in(tx.as_mut()).await {
            Ok(report) => {
                tx.commit().await?;
                if report.inserted.is_empty() {
                    info!(required = report.required, "permissions up to date");
                } else {
                    info!(
                        required = report.required,
                        inserted = report.inserted.len(),
                        granted = report.granted,
                        "permissions reconciled"
                    );
                }
                Ok(report)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn sync_in(&self, tx: &mut dyn StoreTx) -> Result<ReconcileReport, AuthError> {
        let existing: BTreeSet<String> = tx.permissions().await?.into_iter().map(|p| p.name).collect();
        let missing: Vec<Permission> = self
            .required()
            .into_iter()
            .filter(|p| !existing.contains(&p.name))
            .collect();

        let mut report = ReconcileReport {
            required: self.required.len(),
            ..Default::default()
        };
        if missing.is_empty() {
            return Ok(report);
        }

        let inserted = tx.insert_permissions(missing).await?;
        report.inserted = inserted.iter().map(|p| p.name.clone()).collect();

        match tx.role_by_name(SUPER_ADMIN_ROLE).await? {
            Some(role) => {
                let ids: Vec<_> = inserted.iter().map(|p| p.id).collect();
                tx.grant_permissions(role.id, &ids).await?;
                report.granted = ids.len();
            }
            None => warn!(role = SUPER_ADMIN_ROLE, "role not found, new permissions left ungranted"),
        }
        Ok(report)
    }
}
