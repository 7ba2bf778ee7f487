//! Access Context
//!
//! Snapshot of "who is looking" handed to view code. It may be built before
//! the session finished loading, in which case every check fails closed.

use super::{permissions, Permission, PermissionRegistry, Role, TabId};

/// View-facing snapshot of the current actor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessContext {
    /// Role of the logged-in user, if any
    pub role: Option<Role>,
    /// Backend user id, if any
    pub user_id: Option<String>,
}

impl AccessContext {
    pub fn new(role: Option<Role>, user_id: Option<String>) -> Self {
        Self { role, user_id }
    }

    /// Context for nobody logged in
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        PermissionRegistry::global().has_permission(self.role, permission)
    }

    pub fn has_any_permission(&self, permissions: &[Permission]) -> bool {
        PermissionRegistry::global().has_any_permission(self.role, permissions)
    }

    pub fn has_all_permissions(&self, permissions: &[Permission]) -> bool {
        PermissionRegistry::global().has_all_permissions(self.role, permissions)
    }

    pub fn available_tabs(&self) -> Vec<TabId> {
        PermissionRegistry::global().available_tabs(self.role)
    }

    pub fn default_tab(&self) -> TabId {
        PermissionRegistry::global().default_tab(self.role)
    }

    /// Whether `tab` may be opened; used to reject deep links
    pub fn can_open(&self, tab: TabId) -> bool {
        self.available_tabs().contains(&tab)
    }

    pub fn is_staff(&self) -> bool {
        permissions::is_staff_role(self.role)
    }

    pub fn is_anonymous(&self) -> bool {
        self.role.is_none()
    }

    pub fn role_display_name(&self) -> &'static str {
        permissions::role_display_name(self.role)
    }

    /// Create a summary string for logging
    pub fn summary(&self) -> String {
        let user = self.user_id.as_deref().unwrap_or("anonymous");
        let role = self
            .role
            .map(|role| role.to_string())
            .unwrap_or_else(|| "none".to_string());

        format!(
            "AccessContext[user={}, role={}, tabs={}]",
            user,
            role,
            self.available_tabs().len()
        )
    }
}
