//! Expiry policy
//!
//! Pure decisions over session timestamps. The lifecycle owns the side effects;
//! this module only answers "what should happen now".

use super::{Session, SessionState, TerminationReason};
use crate::auth::Role;
use chrono::{DateTime, Duration, Utc};
use parcelgate_core::{LifetimeConfig, SessionTimings};

/// Outcome of one expiry evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryDecision {
    /// Nothing to do
    Continue,
    /// Active and close to expiry: revalidate and reset the login clock
    Renew,
    Terminate(TerminationReason),
}

#[derive(Debug, Clone, Default)]
pub struct SessionPolicy {
    pub timings: SessionTimings,
    pub lifetimes: LifetimeConfig,
}

impl SessionPolicy {
    pub fn new(timings: SessionTimings, lifetimes: LifetimeConfig) -> Self {
        Self { timings, lifetimes }
    }

    /// Lifetime of a login. Sessions without a recognised role fall into the
    /// default class.
    pub fn token_lifetime(&self, role: Option<Role>) -> Duration {
        match role {
            Some(role) => role.token_lifetime(&self.lifetimes),
            None => Duration::hours(i64::from(self.lifetimes.default_hours)),
        }
    }

    /// Activity happened within the inactivity window
    pub fn is_active(&self, session: &Session, now: DateTime<Utc>) -> bool {
        session.idle_for(now) < self.timings.inactivity_window()
    }

    pub fn evaluate(&self, session: &Session, now: DateTime<Utc>) -> ExpiryDecision {
        let lifetime = self.token_lifetime(session.role());
        let elapsed = session.elapsed_since_login(now);
        let active = self.is_active(session, now);

        // Hard expiry applies regardless of activity.
        if elapsed > lifetime + self.timings.grace_period() {
            return ExpiryDecision::Terminate(TerminationReason::HardExpiry);
        }

        // Idle sessions get no grace period.
        if !active && elapsed > lifetime {
            return ExpiryDecision::Terminate(TerminationReason::IdleExpiry);
        }

        if active && elapsed >= lifetime - self.timings.renewal_window() {
            return ExpiryDecision::Renew;
        }

        ExpiryDecision::Continue
    }

    /// Observable state of a live session
    pub fn state(&self, session: &Session, now: DateTime<Utc>) -> SessionState {
        let lifetime = self.token_lifetime(session.role());
        if session.elapsed_since_login(now) >= lifetime - self.timings.renewal_window() {
            SessionState::Expiring
        } else if self.is_active(session, now) {
            SessionState::Active
        } else {
            SessionState::Idle
        }
    }
}
