//! Session Types and Structures

use crate::auth::{role, AccessContext, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Login form input
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// User record returned by the backend and kept in storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// `None` when the backend sent a role code this client does not know
    #[serde(default, deserialize_with = "role::deserialize_lenient")]
    pub role: Option<Role>,
}

/// Successful authentication
#[derive(Debug, Clone, Deserialize)]
pub struct AuthGrant {
    pub token: String,
    pub user: UserRecord,
}

/// What survives a reload: the token, the user and the login time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub token: String,
    pub user: UserRecord,
    #[serde(rename = "loginTime", with = "chrono::serde::ts_milliseconds")]
    pub login_time: DateTime<Utc>,
}

/// The authenticated actor, owned by the session lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: UserRecord,
    /// Set at login and reset by a successful renewal
    pub login_at: DateTime<Utc>,
    /// Last accepted qualifying input
    pub last_activity_at: DateTime<Utc>,
    /// Last known activity level; refreshed by every tick and activity event
    pub is_active: bool,
}

impl Session {
    /// Fresh session at login time
    pub fn start(grant: AuthGrant, now: DateTime<Utc>) -> Self {
        Self {
            token: grant.token,
            user: grant.user,
            login_at: now,
            last_activity_at: now,
            is_active: true,
        }
    }

    /// Rebuild a session from storage. Activity is unknown after a reload, so
    /// the restore time counts as the last activity.
    pub fn restore(persisted: PersistedSession, now: DateTime<Utc>) -> Self {
        Self {
            token: persisted.token,
            user: persisted.user,
            login_at: persisted.login_time,
            last_activity_at: now,
            is_active: true,
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.user.role
    }

    pub fn elapsed_since_login(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.login_at
    }

    pub fn idle_for(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_activity_at
    }

    pub fn to_persisted(&self) -> PersistedSession {
        PersistedSession {
            token: self.token.clone(),
            user: self.user.clone(),
            login_time: self.login_at,
        }
    }

    pub fn access_context(&self) -> AccessContext {
        AccessContext::new(self.user.role, Some(self.user.id.clone()))
    }
}

/// Observable lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NoSession,
    Active,
    Idle,
    /// Inside the renewal window or past nominal expiry, still honored
    Expiring,
    Terminated,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::NoSession => write!(f, "no_session"),
            SessionState::Active => write!(f, "active"),
            SessionState::Idle => write!(f, "idle"),
            SessionState::Expiring => write!(f, "expiring"),
            SessionState::Terminated => write!(f, "terminated"),
        }
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The user logged out
    Logout,
    /// The backend rejected the token
    Unauthorized,
    /// Past lifetime plus grace, regardless of activity
    HardExpiry,
    /// Past lifetime while idle
    IdleExpiry,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::Logout => write!(f, "logout"),
            TerminationReason::Unauthorized => write!(f, "unauthorized"),
            TerminationReason::HardExpiry => write!(f, "hard_expiry"),
            TerminationReason::IdleExpiry => write!(f, "idle_expiry"),
        }
    }
}

/// Lifecycle notifications broadcast to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { role: Option<Role> },
    BecameIdle,
    BecameActive,
    Renewed { login_at: DateTime<Utc> },
    /// Revalidation failed for a transient reason; retried next tick
    RevalidationFailed { message: String },
    Terminated { reason: TerminationReason },
}
