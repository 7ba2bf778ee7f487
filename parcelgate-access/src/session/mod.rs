//! Session Management Module
//!
//! Tracks who is logged in, since when, and whether they are still present.
//! [`SessionLifecycle`] owns the session; the surrounding traits
//! ([`SessionStore`], [`AuthBackend`], [`ActivityMonitor`], [`Clock`]) are the
//! seams to storage, the REST service, platform input and time.

pub mod activity;
pub mod backend;
pub mod clock;
pub mod lifecycle;
pub mod policy;
pub mod storage;
pub mod types;

pub use activity::{
    should_record, ActivityCallback, ActivityEvent, ActivityKind, ActivityMonitor,
    BroadcastActivityMonitor,
};
pub use backend::{AuthBackend, BackendError, HttpAuthBackend};
pub use clock::{Clock, ManualClock, SystemClock};
pub use lifecycle::{LogoutHandler, MonitorHandle, SessionLifecycle};
pub use policy::{ExpiryDecision, SessionPolicy};
pub use storage::{FileSessionStore, MemorySessionStore, SessionStore};
pub use types::*;
