use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::provider::rate_limit::RateLimiter;
use crate::provider::clock::Sleeper;
use crate::provider::FetchError;

pub const MAX_ATTEMPTS: u32 = 3;
pub const BASE_BACKOFF: Duration = Duration::from_secs(30);

/// Run a provider call with bounded retry on throttling. The rate
/// limiter is consulted before every attempt, retries included; the
/// backoff doubles each time (30s, 60s, 120s). Any error other than a
/// throttle fails immediately.
pub async fn with_throttle_retry<T, F, Fut>(
    limiter: &RateLimiter,
    sleeper: &dyn Sleeper,
    provider: &str,
    min_interval: Duration,
    mut op: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    for attempt in 0..MAX_ATTEMPTS {
        limiter.wait_if_needed(provider, min_interval).await;

        match op().await {
            Ok(value) => return Ok(value),
            Err(FetchError::Throttled) => {
                let backoff = BASE_BACKOFF * 2u32.pow(attempt);
                warn!(
                    "{} throttled (attempt {}/{}), backing off {:?}",
                    provider,
                    attempt + 1,
                    MAX_ATTEMPTS,
                    backoff
                );
                sleeper.sleep(backoff).await;
            }
            Err(e) => return Err(e),
        }
    }

    Err(FetchError::Throttled)
}
