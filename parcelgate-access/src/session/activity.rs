//! Activity tracking
//!
//! Platform input is reduced to [`ActivityEvent`]s. The monitor trait hides
//! the event source; coalescing is a pure function so it can be tested
//! without any listeners attached.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

/// Kinds of input the platform reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    Pointer,
    Key,
    Touch,
    Scroll,
    Focus,
    /// The page or app came back to the foreground
    VisibilityVisible,
    /// The page or app went to the background
    VisibilityHidden,
}

impl ActivityKind {
    /// Evidence that the user is present
    pub fn is_qualifying(&self) -> bool {
        !matches!(self, ActivityKind::VisibilityHidden)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityEvent {
    pub kind: ActivityKind,
    pub at: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn new(kind: ActivityKind, at: DateTime<Utc>) -> Self {
        Self { kind, at }
    }
}

/// Whether an event should update the activity clock.
///
/// At most one update is accepted per `window`; non-qualifying events never
/// are.
pub fn should_record(
    event: &ActivityEvent,
    last_update: Option<DateTime<Utc>>,
    window: Duration,
) -> bool {
    if !event.kind.is_qualifying() {
        return false;
    }

    match last_update {
        Some(last) => event.at - last >= window,
        None => true,
    }
}

pub type ActivityCallback = Box<dyn Fn(ActivityEvent) + Send + Sync>;

/// Source of user activity events
pub trait ActivityMonitor: Send + Sync {
    /// Register a callback for every event the source produces
    fn on_activity(&self, callback: ActivityCallback);

    /// Detach all callbacks; no callback runs after this returns
    fn dispose(&self);
}

/// Activity monitor fed by the embedding platform through [`emit`].
///
/// Requires a running tokio runtime when callbacks are registered.
///
/// [`emit`]: BroadcastActivityMonitor::emit
pub struct BroadcastActivityMonitor {
    sender: broadcast::Sender<ActivityEvent>,
    listeners: Mutex<Vec<JoinHandle<()>>>,
}

impl BroadcastActivityMonitor {
    pub fn new(capacity: usize) -> Arc<Self> {
        let (sender, _) = broadcast::channel(capacity);
        Arc::new(Self {
            sender,
            listeners: Mutex::new(Vec::new()),
        })
    }

    /// Publish an event; returns how many listeners received it
    pub fn emit(&self, event: ActivityEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .map(|listeners| listeners.iter().filter(|h| !h.is_finished()).count())
            .unwrap_or(0)
    }
}

impl ActivityMonitor for BroadcastActivityMonitor {
    fn on_activity(&self, callback: ActivityCallback) {
        let mut receiver = self.sender.subscribe();
        let handle = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => callback(event),
                    // Dropped events are fine: a later one refreshes the clock.
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Activity listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(handle);
        }
    }

    fn dispose(&self) {
        if let Ok(mut listeners) = self.listeners.lock() {
            for handle in listeners.drain(..) {
                handle.abort();
            }
        }
    }
}

impl Drop for BroadcastActivityMonitor {
    fn drop(&mut self) {
        self.dispose();
    }
}
