//! Per-actor throttling for admin commands

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

struct ActorWindow {
    count: u32,
    window_start: Instant,
}

/// Fixed-window counter keyed by actor id. Owned by whoever handles
/// requests; there is no process-wide instance.
#[derive(Clone)]
pub struct ActionRateLimiter {
    inner: Arc<Mutex<HashMap<String, ActorWindow>>>,
    max_actions: u32,
    window: Duration,
}

impl ActionRateLimiter {
    pub fn new(max_actions: u32, window: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            max_actions,
            window,
        }
    }

    /// Returns `true` if the action is allowed, `false` if rate-limited.
    pub async fn check(&self, actor: &str) -> bool {
        self.check_at(actor, Instant::now()).await
    }

    async fn check_at(&self, actor: &str, now: Instant) -> bool {
        let mut map = self.inner.lock().await;

        let entry = map.entry(actor.to_owned()).or_insert_with(|| ActorWindow {
            count: 0,
            window_start: now,
        });

        // Reset window if expired
        if now.saturating_duration_since(entry.window_start) >= self.window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;
        let allowed = entry.count <= self.max_actions;
        if !allowed {
            tracing::debug!(actor = actor, count = entry.count, "Admin action over limit");
        }
        allowed
    }

    /// Drop windows that have expired.
    pub async fn cleanup(&self) {
        self.cleanup_at(Instant::now()).await;
    }

    async fn cleanup_at(&self, now: Instant) {
        let mut map = self.inner.lock().await;
        let window = self.window;
        map.retain(|_, entry| now.saturating_duration_since(entry.window_start) < window);
    }

    /// Run `cleanup` on a fixed interval until the returned task is aborted.
    pub fn spawn_cleanup(&self, every: Duration) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                limiter.cleanup().await;
            }
        })
    }

    pub async fn tracked_actors(&self) -> usize {
        self.inner.lock().await.len()
    }
}
