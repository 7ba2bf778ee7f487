//! Authorization Module
//!
//! Roles, the permission registry and the view-facing access context.
//! Nothing here performs I/O or fails: unknown roles are simply denied.

pub mod context;
pub mod permissions;
pub mod role;

pub use context::AccessContext;
pub use permissions::{
    available_tabs, default_tab, has_all_permissions, has_any_permission, has_permission,
    is_staff_role, role_display_name, Permission, PermissionRegistry, TabId, FALLBACK_TAB,
    TAB_GATES, UNKNOWN_ROLE_NAME,
};
pub use role::Role;
