//! Permission Registry
//!
//! Static role to permission mapping for the desk. Every query is a total
//! function: an unknown or missing role simply has no permissions, because
//! views ask before the session has finished loading.

use super::Role;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Capabilities that can be granted to a role
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    /// See the customers tab
    ViewCustomersTab,
    /// See the packages tab
    ViewPackagesTab,
    /// See the deliveries tab
    ViewDeliveriesTab,
    /// Announce an incoming package
    CreatePreAlert,
    /// Confirm a pre-alert against a received package
    ConfirmPreAlert,
    CreatePackage,
    ChangePackageStatus,
    ManageDeliveries,
    /// Move packages between branches
    ManageTransfers,
    ProcessPayments,
    ManageCustomers,
    ManageStaff,
    ViewReports,
    AccessAdminDashboard,
    AccessSuperAdmin,
}

impl Permission {
    pub const ALL: [Permission; 15] = [
        Permission::ViewCustomersTab,
        Permission::ViewPackagesTab,
        Permission::ViewDeliveriesTab,
        Permission::CreatePreAlert,
        Permission::ConfirmPreAlert,
        Permission::CreatePackage,
        Permission::ChangePackageStatus,
        Permission::ManageDeliveries,
        Permission::ManageTransfers,
        Permission::ProcessPayments,
        Permission::ManageCustomers,
        Permission::ManageStaff,
        Permission::ViewReports,
        Permission::AccessAdminDashboard,
        Permission::AccessSuperAdmin,
    ];
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Permission::ViewCustomersTab => "view_customers_tab",
            Permission::ViewPackagesTab => "view_packages_tab",
            Permission::ViewDeliveriesTab => "view_deliveries_tab",
            Permission::CreatePreAlert => "create_pre_alert",
            Permission::ConfirmPreAlert => "confirm_pre_alert",
            Permission::CreatePackage => "create_package",
            Permission::ChangePackageStatus => "change_package_status",
            Permission::ManageDeliveries => "manage_deliveries",
            Permission::ManageTransfers => "manage_transfers",
            Permission::ProcessPayments => "process_payments",
            Permission::ManageCustomers => "manage_customers",
            Permission::ManageStaff => "manage_staff",
            Permission::ViewReports => "view_reports",
            Permission::AccessAdminDashboard => "access_admin_dashboard",
            Permission::AccessSuperAdmin => "access_super_admin",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_lowercase();
        Permission::ALL
            .into_iter()
            .find(|permission| permission.to_string() == wanted)
            .ok_or_else(|| format!("Unknown permission: {}", s))
    }
}

/// Top-level desk tabs
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabId {
    Customers,
    Packages,
    Deliveries,
}

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TabId::Customers => write!(f, "customers"),
            TabId::Packages => write!(f, "packages"),
            TabId::Deliveries => write!(f, "deliveries"),
        }
    }
}

/// Tab shown when a role can see none of the gated tabs
pub const FALLBACK_TAB: TabId = TabId::Customers;

/// Tab gates in menu order; the first passing entry is the default tab.
pub const TAB_GATES: [(TabId, Permission); 3] = [
    (TabId::Customers, Permission::ViewCustomersTab),
    (TabId::Packages, Permission::ViewPackagesTab),
    (TabId::Deliveries, Permission::ViewDeliveriesTab),
];

/// Display name for a missing role
pub const UNKNOWN_ROLE_NAME: &str = "Unknown Role";

static STANDARD: LazyLock<PermissionRegistry> = LazyLock::new(PermissionRegistry::standard);

/// Role to permission mapping
#[derive(Debug, Clone)]
pub struct PermissionRegistry {
    grants: HashMap<Role, HashSet<Permission>>,
}

impl PermissionRegistry {
    /// Build a registry from an explicit mapping. Roles missing from the map
    /// have no permissions.
    pub fn new(grants: HashMap<Role, HashSet<Permission>>) -> Self {
        Self { grants }
    }

    /// The mapping compiled into the desk client
    pub fn standard() -> Self {
        use Permission::*;

        let admin: HashSet<Permission> = Permission::ALL
            .into_iter()
            .filter(|permission| *permission != AccessSuperAdmin)
            .collect();

        let grants = HashMap::from([
            (Role::Customer, [CreatePreAlert].into_iter().collect()),
            (Role::Admin, admin),
            (Role::SuperAdmin, Permission::ALL.into_iter().collect()),
            (
                Role::Cashier,
                [
                    ViewCustomersTab,
                    ViewPackagesTab,
                    ViewDeliveriesTab,
                    ProcessPayments,
                ]
                .into_iter()
                .collect(),
            ),
            (
                Role::PackageHandler,
                [
                    ViewPackagesTab,
                    ConfirmPreAlert,
                    CreatePackage,
                    ChangePackageStatus,
                ]
                .into_iter()
                .collect(),
            ),
            (
                Role::TransferPersonnel,
                [ViewPackagesTab, ChangePackageStatus, ManageTransfers]
                    .into_iter()
                    .collect(),
            ),
            (
                Role::FrontDesk,
                [
                    ViewCustomersTab,
                    ViewPackagesTab,
                    ViewDeliveriesTab,
                    ConfirmPreAlert,
                    ManageDeliveries,
                    ManageCustomers,
                ]
                .into_iter()
                .collect(),
            ),
        ]);

        Self { grants }
    }

    /// Shared instance of [`PermissionRegistry::standard`]
    pub fn global() -> &'static PermissionRegistry {
        &STANDARD
    }

    fn grants_for(&self, role: Option<Role>) -> Option<&HashSet<Permission>> {
        role.and_then(|role| self.grants.get(&role))
    }

    pub fn has_permission(&self, role: impl Into<Option<Role>>, permission: Permission) -> bool {
        self.grants_for(role.into())
            .is_some_and(|grants| grants.contains(&permission))
    }

    pub fn has_any_permission(
        &self,
        role: impl Into<Option<Role>>,
        permissions: &[Permission],
    ) -> bool {
        let role = role.into();
        permissions.iter().any(|p| self.has_permission(role, *p))
    }

    /// True iff every listed permission holds. An empty list is satisfied by
    /// any known role.
    pub fn has_all_permissions(
        &self,
        role: impl Into<Option<Role>>,
        permissions: &[Permission],
    ) -> bool {
        match self.grants_for(role.into()) {
            Some(grants) => permissions.iter().all(|p| grants.contains(p)),
            None => false,
        }
    }

    pub fn permissions(&self, role: impl Into<Option<Role>>) -> HashSet<Permission> {
        self.grants_for(role.into()).cloned().unwrap_or_default()
    }

    /// Tabs the role may open, in menu order
    pub fn available_tabs(&self, role: impl Into<Option<Role>>) -> Vec<TabId> {
        let role = role.into();
        TAB_GATES
            .iter()
            .filter(|(_, required)| self.has_permission(role, *required))
            .map(|(tab, _)| *tab)
            .collect()
    }

    pub fn default_tab(&self, role: impl Into<Option<Role>>) -> TabId {
        self.available_tabs(role)
            .first()
            .copied()
            .unwrap_or(FALLBACK_TAB)
    }
}

impl Default for PermissionRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

pub fn has_permission(role: impl Into<Option<Role>>, permission: Permission) -> bool {
    PermissionRegistry::global().has_permission(role, permission)
}

pub fn has_any_permission(role: impl Into<Option<Role>>, permissions: &[Permission]) -> bool {
    PermissionRegistry::global().has_any_permission(role, permissions)
}

pub fn has_all_permissions(role: impl Into<Option<Role>>, permissions: &[Permission]) -> bool {
    PermissionRegistry::global().has_all_permissions(role, permissions)
}

pub fn permissions(role: impl Into<Option<Role>>) -> HashSet<Permission> {
    PermissionRegistry::global().permissions(role)
}

pub fn available_tabs(role: impl Into<Option<Role>>) -> Vec<TabId> {
    PermissionRegistry::global().available_tabs(role)
}

pub fn default_tab(role: impl Into<Option<Role>>) -> TabId {
    PermissionRegistry::global().default_tab(role)
}

pub fn is_staff_role(role: impl Into<Option<Role>>) -> bool {
    role.into().is_some_and(|role| role.is_staff())
}

pub fn role_display_name(role: impl Into<Option<Role>>) -> &'static str {
    role.into()
        .map(|role| role.display_name())
        .unwrap_or(UNKNOWN_ROLE_NAME)
}
