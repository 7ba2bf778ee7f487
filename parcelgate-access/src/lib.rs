//! parcelgate access - role permissions and session lifecycle
//!
//! Two cooperating pieces consumed by the desk client:
//! - [`auth`]: the static role to permission registry and the access context
//!   views consult before rendering
//! - [`session`]: the login, activity and expiry state machine that decides
//!   when a session is renewed and when it is over
//!
//! Neither depends on the other's state; the session only hands out
//! [`AccessContext`] snapshots built from its current user.

pub mod auth;
pub mod session;

pub use auth::{AccessContext, Permission, PermissionRegistry, Role, TabId};
pub use session::{
    ActivityEvent, ActivityKind, ActivityMonitor, AuthBackend, BackendError,
    BroadcastActivityMonitor, Clock, Credentials, FileSessionStore, HttpAuthBackend,
    LogoutHandler, ManualClock, MemorySessionStore, MonitorHandle, Session, SessionEvent,
    SessionLifecycle, SessionPolicy, SessionState, SessionStore, SystemClock,
    TerminationReason, UserRecord,
};

use parcelgate_core::{log_operation_error, ParcelError};
use thiserror::Error;

/// Error type for access operations
#[derive(Error, Debug)]
pub enum AccessError {
    /// Storage or configuration failure from the shared layer
    #[error(transparent)]
    Core(#[from] ParcelError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("No active session")]
    NoSession,
}

pub type AccessResult<T> = Result<T, AccessError>;

impl AccessError {
    /// The backend definitively rejected the credentials or token
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AccessError::Backend(e) if e.is_unauthorized())
    }

    /// Worth retrying on the next tick without user intervention
    pub fn is_transient(&self) -> bool {
        match self {
            AccessError::Backend(e) => !e.is_unauthorized(),
            AccessError::Core(e) => e.is_recoverable(),
            AccessError::NoSession => false,
        }
    }

    /// Log at the level the failure deserves
    pub fn log(&self, operation: &str) {
        match self {
            AccessError::Core(e) => e.log(),
            e if e.is_transient() => {
                tracing::warn!(operation, error = %e, "Operation failed, will retry")
            }
            e => log_operation_error!(operation, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let unauthorized = AccessError::from(BackendError::Unauthorized);
        assert!(unauthorized.is_unauthorized());
        assert!(!unauthorized.is_transient());

        let network = AccessError::from(BackendError::Network("reset".to_string()));
        assert!(!network.is_unauthorized());
        assert!(network.is_transient());

        assert!(!AccessError::NoSession.is_transient());

        let storage = AccessError::from(parcelgate_core::storage_error!("disk full", "save"));
        assert!(storage.is_transient());
        assert_eq!(storage.to_string(), "Storage error: disk full");
    }
}
