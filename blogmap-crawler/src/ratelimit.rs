use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Per-domain politeness delay. Tracks the last request slot for every
/// domain and makes callers wait until the minimum interval has elapsed.
///
/// The map is process-lifetime only and is never checkpointed, so the
/// first request to a domain after a restart is never penalized.
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(HashMap::new()),
        }
    }

    /// Wait until at least `min_interval` has passed since the previous
    /// request to `domain`, then claim the new slot.
    ///
    /// The slot is reserved while the map lock is held, so two concurrent
    /// callers for the same domain queue up behind each other instead of
    /// both reading a stale timestamp and racing past the limit.
    pub async fn acquire(&self, domain: &str) {
        if domain.is_empty() {
            return;
        }

        let slot = {
            let mut last = self.last_request.lock().await;
            let now = Instant::now();
            let slot = match last.get(domain) {
                Some(prev) => {
                    let earliest = *prev + self.min_interval;
                    if earliest > now { earliest } else { now }
                }
                None => now,
            };
            last.insert(domain.to_string(), slot);
            slot
        };

        let now = Instant::now();
        if slot > now {
            debug!(domain, wait_ms = (slot - now).as_millis() as u64, "rate limiting");
            tokio::time::sleep_until(slot).await;
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}
