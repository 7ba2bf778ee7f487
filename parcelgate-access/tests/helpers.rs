//! Shared fixtures for the session lifecycle integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parcelgate_access::session::{AuthGrant, PersistedSession};
use parcelgate_access::{
    AccessResult, AuthBackend, BackendError, Credentials, ManualClock, MemorySessionStore, Role,
    SessionLifecycle, SessionPolicy, SessionStore, TerminationReason, UserRecord,
};
use parcelgate_core::storage_error;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, Mutex};
use tokio::sync::Notify;

// Install tracing only once per test binary
static TRACING: LazyLock<()> = LazyLock::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(std::io::sink)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
});

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
}

pub fn at(hours: i64, minutes: i64) -> DateTime<Utc> {
    t0() + Duration::hours(hours) + Duration::minutes(minutes)
}

pub fn user(role: Role) -> UserRecord {
    UserRecord {
        id: format!("{}-1", role),
        name: format!("Test {}", role.display_name()),
        email: None,
        role: Some(role),
    }
}

pub fn credentials() -> Credentials {
    Credentials::new("desk@example.com", "secret")
}

/// Backend whose revalidation answers are queued up front. An empty queue
/// answers success.
pub struct ScriptedBackend {
    pub role: Role,
    pub revalidations: Mutex<VecDeque<Result<(), BackendError>>>,
    pub revalidate_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub reject_login: bool,
    /// When set, each revalidation waits for a permit before answering
    pub gate: Option<Arc<Notify>>,
}

impl ScriptedBackend {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            revalidations: Mutex::new(VecDeque::new()),
            revalidate_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            reject_login: false,
            gate: None,
        }
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn rejecting_login(mut self) -> Self {
        self.reject_login = true;
        self
    }

    pub fn queue_revalidation(&self, answer: Result<(), BackendError>) {
        self.revalidations.lock().unwrap().push_back(answer);
    }

    pub fn revalidate_calls(&self) -> usize {
        self.revalidate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthBackend for ScriptedBackend {
    async fn authenticate(&self, _credentials: &Credentials) -> Result<AuthGrant, BackendError> {
        if self.reject_login {
            return Err(BackendError::Unauthorized);
        }
        Ok(AuthGrant {
            token: "token-1".to_string(),
            user: user(self.role),
        })
    }

    async fn revalidate(&self, _token: &str) -> Result<(), BackendError> {
        self.revalidate_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.revalidations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn logout(&self, _token: &str) -> Result<(), BackendError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        Err(BackendError::Network("offline".to_string()))
    }
}

/// Memory store whose writes can be switched to fail
#[derive(Default)]
pub struct FlakyStore {
    inner: MemorySessionStore,
    pub failing: AtomicBool,
}

impl FlakyStore {
    fn check(&self, operation: &str) -> AccessResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(storage_error!("disk full", operation).into());
        }
        Ok(())
    }
}

impl SessionStore for FlakyStore {
    fn load(&self) -> AccessResult<Option<PersistedSession>> {
        self.inner.load()
    }

    fn save(&self, session: &PersistedSession) -> AccessResult<()> {
        self.check("save")?;
        self.inner.save(session)
    }

    fn clear(&self) -> AccessResult<()> {
        self.check("clear")?;
        self.inner.clear()
    }
}

/// Records every logout notification
#[derive(Default)]
pub struct LogoutLog(pub Mutex<Vec<TerminationReason>>);

impl LogoutLog {
    pub fn reasons(&self) -> Vec<TerminationReason> {
        self.0.lock().unwrap().clone()
    }
}

pub struct TestDesk {
    pub lifecycle: Arc<SessionLifecycle>,
    pub backend: Arc<ScriptedBackend>,
    pub store: Arc<MemorySessionStore>,
    pub clock: ManualClock,
    pub logouts: Arc<LogoutLog>,
}

pub fn desk(backend: ScriptedBackend) -> TestDesk {
    desk_with(backend, SessionPolicy::default(), MemorySessionStore::new())
}

pub fn desk_with(
    backend: ScriptedBackend,
    policy: SessionPolicy,
    store: MemorySessionStore,
) -> TestDesk {
    LazyLock::force(&TRACING);

    let backend = Arc::new(backend);
    let store = Arc::new(store);
    let clock = ManualClock::new(t0());
    let logouts = Arc::new(LogoutLog::default());

    let log = logouts.clone();
    let lifecycle = SessionLifecycle::new(policy, store.clone(), backend.clone())
        .with_clock(Arc::new(clock.clone()))
        .with_logout_handler(Arc::new(move |reason: TerminationReason| {
            log.0.lock().unwrap().push(reason);
        }));

    TestDesk {
        lifecycle: Arc::new(lifecycle),
        backend,
        store,
        clock,
        logouts,
    }
}
