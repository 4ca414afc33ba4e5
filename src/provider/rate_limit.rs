use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crate::provider::clock::{Clock, Sleeper, SystemClock, TokioSleeper};

/// Process-wide per-provider rate limiting. One instance is shared by
/// every fetcher call for a provider; the mutex keeps recorded
/// timestamps from interleaving when syncs overlap.
pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    last_call: Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_parts(Arc::new(SystemClock), Arc::new(TokioSleeper))
    }

    pub fn with_parts(clock: Arc<dyn Clock>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            clock,
            sleeper,
            last_call: Mutex::new(HashMap::new()),
        }
    }

    /// Block until at least `min_interval` has passed since the
    /// provider's last permitted call, then record now as the new
    /// last-call time. The lock is held across the sleep so two
    /// callers cannot both be admitted inside one interval.
    pub async fn wait_if_needed(&self, provider: &str, min_interval: Duration) {
        let mut last_call = self.last_call.lock().await;

        if let Some(last) = last_call.get(provider) {
            let elapsed = self.clock.now().duration_since(*last);
            if elapsed < min_interval {
                let wait = min_interval - elapsed;
                debug!("Rate limiting {}: waiting {:?}", provider, wait);
                self.sleeper.sleep(wait).await;
            }
        }

        last_call.insert(provider.to_string(), self.clock.now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
