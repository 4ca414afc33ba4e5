pub mod blockchain_info;
pub mod blockchair;
pub mod clock;
pub mod rate_limit;
pub mod retry;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;
use crate::models::{AddressInfo, TxRecord};

pub use clock::{Clock, Sleeper, SystemClock, TokioSleeper};
pub use rate_limit::RateLimiter;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider throttled the request")]
    Throttled,

    #[error("unexpected status: {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// One block-explorer backend. Implementations absorb HTTP-level
/// failures: balance fetch degrades to `None`, a page fetch to an
/// empty list, both logged rather than raised.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Recommended minimum interval between calls to this provider.
    fn min_interval(&self) -> Duration;

    async fn fetch_balance_and_count(&self, address: &str) -> Option<AddressInfo>;

    async fn fetch_page(&self, address: &str, limit: u32, offset: u32) -> Vec<TxRecord>;
}

/// One input or output of a provider-reported transaction, reduced to
/// what classification needs.
#[derive(Debug, Clone)]
pub struct TxLeg {
    pub recipient: Option<String>,
    pub value: i64,
}

/// Exact satoshi-to-BTC conversion (scale 8, no floating point).
pub fn satoshis_to_btc(satoshis: i64) -> Decimal {
    Decimal::new(satoshis, 8)
}

/// Classify a transaction relative to the tracked address. Sending if
/// the address appears among the inputs; the amount is then the
/// negative sum of its input values and outputs are ignored.
/// Otherwise receiving, with the positive sum of matching output
/// values (zero when the address appears in neither).
pub fn classify(address: &str, inputs: &[TxLeg], outputs: &[TxLeg]) -> (Decimal, bool) {
    let matches = |leg: &&TxLeg| leg.recipient.as_deref() == Some(address);

    if inputs.iter().any(|leg| matches(&leg)) {
        let spent: i64 = inputs.iter().filter(matches).map(|leg| leg.value).sum();
        return (-satoshis_to_btc(spent), true);
    }

    let received: i64 = outputs.iter().filter(matches).map(|leg| leg.value).sum();
    (satoshis_to_btc(received), false)
}

/// Build the provider named in the configuration, with its own HTTP
/// client and a fresh process-wide rate limiter.
pub fn build(config: &Config) -> Result<Arc<dyn Provider>, reqwest::Error> {
    let limiter = Arc::new(RateLimiter::new());
    let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);

    match config.provider.as_str() {
        "blockchair" => Ok(Arc::new(blockchair::Blockchair::new(
            config.http_timeout,
            config.blockchair_api_key.clone(),
            limiter,
            sleeper,
        )?)),
        _ => Ok(Arc::new(blockchain_info::BlockchainInfo::new(
            config.http_timeout,
            limiter,
            sleeper,
        )?)),
    }
}
