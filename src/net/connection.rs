//! Connection state machine and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Track open connections so a server can wait for them to drain
//! - Track per-connection request activity for idle timeouts

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Tracks open connections for graceful shutdown.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active_count: Arc<AtomicU64>,
    drained: Arc<Notify>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new open connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            drained: Arc::clone(&self.drained),
            id: ConnectionId::new(),
        }
    }

    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Wait until every tracked connection has closed.
    pub async fn wait_for_drain(&self) {
        loop {
            let notified = self.drained.notified();
            if self.active_count() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements active count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    drained: Arc<Notify>,
    id: ConnectionId,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.active_count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}

/// Request activity on a single connection.
///
/// A connection is idle while it has no request in flight; it becomes
/// eligible for closing once it stays idle for the configured timeout.
#[derive(Debug, Clone)]
pub struct ConnectionActivity {
    inner: Arc<ActivityInner>,
}

#[derive(Debug)]
struct ActivityInner {
    opened: Instant,
    in_flight: AtomicUsize,
    /// Milliseconds since `opened` of the last request start or finish.
    last_active_ms: AtomicU64,
    /// Signalled when the last in-flight request finishes.
    quiet: Notify,
}

impl ConnectionActivity {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ActivityInner {
                opened: Instant::now(),
                in_flight: AtomicUsize::new(0),
                last_active_ms: AtomicU64::new(0),
                quiet: Notify::new(),
            }),
        }
    }

    /// Mark a request as started. The request is finished when the guard drops.
    pub fn begin(&self) -> RequestGuard {
        self.touch();
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        RequestGuard {
            activity: self.clone(),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        let elapsed = self.inner.opened.elapsed().as_millis() as u64;
        self.inner.last_active_ms.store(elapsed, Ordering::SeqCst);
    }

    fn last_active(&self) -> Instant {
        self.inner.opened + Duration::from_millis(self.inner.last_active_ms.load(Ordering::SeqCst))
    }

    /// Resolve once the connection has been idle for `timeout`.
    pub async fn idle_for(&self, timeout: Duration) {
        loop {
            let quiet = self.inner.quiet.notified();
            if self.in_flight() > 0 {
                quiet.await;
                continue;
            }
            let deadline = self.last_active() + timeout;
            if Instant::now() >= deadline {
                return;
            }
            tokio::time::sleep_until(deadline).await;
        }
    }
}

impl Default for ConnectionActivity {
    fn default() -> Self {
        Self::new()
    }
}

/// Marks one in-flight request.
#[derive(Debug)]
pub struct RequestGuard {
    activity: ConnectionActivity,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.activity.touch();
        if self.activity.inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.activity.inner.quiet.notify_waiters();
        }
    }
}
