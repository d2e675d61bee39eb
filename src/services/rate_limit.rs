//! Per-client spacing of outbound source fetches.
//!
//! The timestamp map is process-local, so spacing is best-effort per worker
//! process; exact global limiting across processes is a documented
//! limitation, not something to work around here. Each client gets its own
//! async mutex so two in-flight requests for the same client never compute
//! overlapping wait windows.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

pub struct RateLimiter {
    spacing: Duration,
    clients: Mutex<HashMap<String, Arc<Mutex<Option<Instant>>>>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Waits until at least the configured spacing has passed since this
    /// client's previous fetch, then records the new fetch time.
    pub async fn wait(&self, client: &str) {
        let slot = {
            let mut clients = self.clients.lock().await;
            Arc::clone(
                clients
                    .entry(client.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(None))),
            )
        };

        let mut last = slot.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.spacing {
                let pause = self.spacing - elapsed;
                trace!(client, ?pause, "Rate limiting outbound fetch");
                tokio::time::sleep(pause).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn spaces_consecutive_requests_for_one_client() {
        let limiter = RateLimiter::new(Duration::from_millis(500));

        let start = Instant::now();
        limiter.wait("1.2.3.4").await;
        limiter.wait("1.2.3.4").await;

        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_clients_do_not_wait_on_each_other() {
        let limiter = RateLimiter::new(Duration::from_secs(10));

        let start = Instant::now();
        limiter.wait("1.2.3.4").await;
        limiter.wait("5.6.7.8").await;

        assert!(start.elapsed() < Duration::from_secs(10));
    }
}
