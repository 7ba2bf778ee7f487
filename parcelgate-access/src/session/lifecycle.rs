//! Session Lifecycle - login, activity and expiry state machine
//!
//! Owns the single [`Session`] value. Everything else reads snapshots.

use super::{
    activity, ActivityEvent, ActivityMonitor, AuthBackend, Clock, Credentials, ExpiryDecision,
    Session, SessionEvent, SessionPolicy, SessionState, SessionStore, SystemClock,
    TerminationReason,
};
use crate::auth::{AccessContext, Role};
use crate::{AccessError, AccessResult};
use parcelgate_core::ParcelConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Invoked once for every session that ends
pub trait LogoutHandler: Send + Sync {
    fn on_logout(&self, reason: TerminationReason);
}

impl<F> LogoutHandler for F
where
    F: Fn(TerminationReason) + Send + Sync,
{
    fn on_logout(&self, reason: TerminationReason) {
        self(reason)
    }
}

#[derive(Debug, Default)]
struct LifecycleState {
    session: Option<Session>,
    terminated: bool,
}

pub struct SessionLifecycle {
    state: RwLock<LifecycleState>,
    /// Bumped on every login so monitors of earlier logins stop
    generation: AtomicU64,
    policy: SessionPolicy,
    store: Arc<dyn SessionStore>,
    backend: Arc<dyn AuthBackend>,
    clock: Arc<dyn Clock>,
    logout_handler: Option<Arc<dyn LogoutHandler>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionLifecycle {
    pub fn new(
        policy: SessionPolicy,
        store: Arc<dyn SessionStore>,
        backend: Arc<dyn AuthBackend>,
    ) -> Self {
        let (events, _) = broadcast::channel(64);

        Self {
            state: RwLock::new(LifecycleState::default()),
            generation: AtomicU64::new(0),
            policy,
            store,
            backend,
            clock: Arc::new(SystemClock),
            logout_handler: None,
            events,
        }
    }

    /// Lifecycle with timings and lifetimes taken from configuration
    pub fn from_config(
        config: &ParcelConfig,
        store: Arc<dyn SessionStore>,
        backend: Arc<dyn AuthBackend>,
    ) -> Self {
        let policy = SessionPolicy::new(config.session.clone(), config.lifetimes.clone());
        Self::new(policy, store, backend)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_logout_handler(mut self, handler: Arc<dyn LogoutHandler>) -> Self {
        self.logout_handler = Some(handler);
        self
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn begin(&self, state: &mut LifecycleState, session: Session) {
        let role = session.role();
        state.session = Some(session);
        state.terminated = false;
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.emit(SessionEvent::LoggedIn { role });
    }

    /// Pick up a login persisted by an earlier run.
    ///
    /// A stored login already past hard expiry, or one that cannot be read,
    /// is cleared and reported as no session.
    pub async fn restore(&self) -> AccessResult<SessionState> {
        let persisted = match self.store.load() {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable stored session");
                self.store.clear()?;
                None
            }
        };

        let Some(persisted) = persisted else {
            return Ok(SessionState::NoSession);
        };

        let now = self.clock.now();
        let session = Session::restore(persisted, now);

        if let ExpiryDecision::Terminate(reason) = self.policy.evaluate(&session, now) {
            info!(user_id = %session.user.id, %reason, "Stored session already expired");
            self.store.clear()?;
            return Ok(SessionState::NoSession);
        }

        info!(
            user_id = %session.user.id,
            login_at = %session.login_at,
            "Restored session"
        );

        let state = self.policy.state(&session, now);
        let mut guard = self.state.write().await;
        self.begin(&mut guard, session);
        Ok(state)
    }

    /// Authenticate and start a fresh session, replacing any current one
    pub async fn login(&self, credentials: &Credentials) -> AccessResult<AccessContext> {
        let grant = self.backend.authenticate(credentials).await?;
        let session = Session::start(grant, self.clock.now());

        self.store.save(&session.to_persisted())?;

        let context = session.access_context();
        info!(summary = %context.summary(), "Logged in");

        let replaced = {
            let mut guard = self.state.write().await;
            let replaced = guard.session.take();
            self.begin(&mut guard, session);
            replaced
        };

        // The replaced token is revoked best effort; the new login stands
        // either way.
        if let Some(old) = replaced {
            debug!(user_id = %old.user.id, "Revoking token of replaced session");
            if let Err(e) = self.backend.logout(&old.token).await {
                warn!(error = %e, "Backend logout of replaced session failed");
            }
        }

        Ok(context)
    }

    /// Apply a user input event. Returns whether it moved the activity clock.
    pub async fn record_activity(&self, event: ActivityEvent) -> bool {
        let mut guard = self.state.write().await;
        let Some(session) = guard.session.as_mut() else {
            return false;
        };

        if !activity::should_record(
            &event,
            Some(session.last_activity_at),
            self.policy.timings.activity_debounce(),
        ) {
            return false;
        }

        // Idle may have set in since the last tick without being observed.
        let was_active = session.is_active && self.policy.is_active(session, event.at);
        session.last_activity_at = event.at;
        if !was_active {
            session.is_active = true;
            debug!(kind = ?event.kind, "Session active again");
            self.emit(SessionEvent::BecameActive);
        }
        true
    }

    /// One periodic evaluation: idle detection, renewal and expiry
    pub async fn tick(&self) -> AccessResult<SessionState> {
        let now = self.clock.now();

        let (snapshot, generation) = {
            let mut guard = self.state.write().await;
            let generation = self.generation.load(Ordering::SeqCst);
            let Some(session) = guard.session.as_mut() else {
                return Ok(Self::empty_state(&guard));
            };

            let active = self.policy.is_active(session, now);
            if active != session.is_active {
                session.is_active = active;
                if active {
                    self.emit(SessionEvent::BecameActive);
                } else {
                    info!(user_id = %session.user.id, "Session idle");
                    self.emit(SessionEvent::BecameIdle);
                }
            }
            (session.clone(), generation)
        };

        match self.policy.evaluate(&snapshot, now) {
            ExpiryDecision::Continue => {}
            ExpiryDecision::Renew => self.renew(&snapshot, generation).await?,
            ExpiryDecision::Terminate(reason) => self.terminate(reason, generation).await?,
        }

        Ok(self.state().await)
    }

    async fn renew(&self, snapshot: &Session, generation: u64) -> AccessResult<()> {
        debug!(user_id = %snapshot.user.id, "Revalidating session");

        match self.backend.revalidate(&snapshot.token).await {
            Ok(()) => {
                let mut guard = self.state.write().await;
                let current = self.generation.load(Ordering::SeqCst) == generation;
                let Some(session) = guard.session.as_mut().filter(|_| current) else {
                    debug!("Session changed during revalidation, ignoring result");
                    return Ok(());
                };

                session.login_at = self.clock.now();
                self.store.save(&session.to_persisted())?;

                info!(user_id = %session.user.id, login_at = %session.login_at, "Session renewed");
                self.emit(SessionEvent::Renewed {
                    login_at: session.login_at,
                });
                Ok(())
            }
            Err(e) if e.is_unauthorized() => {
                warn!(user_id = %snapshot.user.id, "Token rejected during revalidation");
                self.terminate(TerminationReason::Unauthorized, generation)
                    .await
            }
            Err(e) => {
                warn!(error = %e, "Revalidation failed, keeping session");
                self.emit(SessionEvent::RevalidationFailed {
                    message: e.to_string(),
                });
                Ok(())
            }
        }
    }

    /// Explicit logout. Backend failures are logged; the local session ends
    /// either way.
    pub async fn logout(&self) -> AccessResult<()> {
        let current = {
            let guard = self.state.read().await;
            let generation = self.generation.load(Ordering::SeqCst);
            guard.session.as_ref().map(|s| (s.token.clone(), generation))
        };

        let Some((token, generation)) = current else {
            return Err(AccessError::NoSession);
        };

        if let Err(e) = self.backend.logout(&token).await {
            warn!(error = %e, "Backend logout failed");
        }

        self.terminate(TerminationReason::Logout, generation).await
    }

    /// End the session started as `generation`. A newer login is left alone.
    async fn terminate(&self, reason: TerminationReason, generation: u64) -> AccessResult<()> {
        let ended = {
            let mut guard = self.state.write().await;
            if self.generation.load(Ordering::SeqCst) != generation {
                debug!(%reason, "Session replaced before termination, ignoring");
                return Ok(());
            }
            let ended = guard.session.take();
            if ended.is_some() {
                guard.terminated = true;
            }
            ended
        };

        let Some(ended) = ended else {
            return Ok(());
        };

        let cleared = self.store.clear();
        if let Err(e) = &cleared {
            e.log("clear_session_store");
        }

        info!(user_id = %ended.user.id, %reason, "Session terminated");
        if let Some(handler) = &self.logout_handler {
            handler.on_logout(reason);
        }
        self.emit(SessionEvent::Terminated { reason });

        cleared
    }

    fn empty_state(state: &LifecycleState) -> SessionState {
        if state.terminated {
            SessionState::Terminated
        } else {
            SessionState::NoSession
        }
    }

    pub async fn state(&self) -> SessionState {
        let guard = self.state.read().await;
        match &guard.session {
            Some(session) => self.policy.state(session, self.clock.now()),
            None => Self::empty_state(&guard),
        }
    }

    /// Activity occurred within the inactivity window
    pub async fn is_active(&self) -> bool {
        let guard = self.state.read().await;
        guard
            .session
            .as_ref()
            .is_some_and(|session| self.policy.is_active(session, self.clock.now()))
    }

    pub async fn session(&self) -> Option<Session> {
        self.state.read().await.session.clone()
    }

    pub async fn role(&self) -> Option<Role> {
        self.state.read().await.session.as_ref().and_then(Session::role)
    }

    pub async fn access_context(&self) -> AccessContext {
        self.state
            .read()
            .await
            .session
            .as_ref()
            .map(Session::access_context)
            .unwrap_or_default()
    }

    async fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
            && self.state.read().await.session.is_some()
    }

    /// Run the periodic check and feed activity from `monitor` for the
    /// current login.
    ///
    /// The loop ends when that session terminates or a new login replaces it;
    /// call after [`login`](Self::login) or [`restore`](Self::restore).
    pub fn spawn_monitor(self: &Arc<Self>, monitor: Arc<dyn ActivityMonitor>) -> MonitorHandle {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        monitor.on_activity(Box::new(move |event| {
            let _ = sender.send(event);
        }));

        // Lifecycle events wake the loop so it notices termination at once.
        let mut events = self.subscribe();
        let lifecycle = Arc::clone(self);
        let generation = self.generation.load(Ordering::SeqCst);
        let period = self.policy.timings.revalidation_interval();
        let task_monitor = Arc::clone(&monitor);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            while lifecycle.is_current(generation).await {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = lifecycle.tick().await {
                            e.log("session_tick");
                        }
                    }
                    Some(event) = receiver.recv() => {
                        lifecycle.record_activity(event).await;
                    }
                    _ = events.recv() => {}
                }
            }

            task_monitor.dispose();
            debug!(generation, "Session monitor stopped");
        });

        MonitorHandle {
            task: Some(task),
            monitor,
        }
    }
}

/// Owns the monitor loop; dropping it stops the loop and detaches listeners
pub struct MonitorHandle {
    task: Option<JoinHandle<()>>,
    monitor: Arc<dyn ActivityMonitor>,
}

impl MonitorHandle {
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the loop to end on its own (session terminated or replaced)
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.monitor.dispose();
    }
}
