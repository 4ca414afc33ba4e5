use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::models::{AddressInfo, TxRecord};
use crate::provider::clock::Sleeper;
use crate::provider::rate_limit::RateLimiter;
use crate::provider::retry::with_throttle_retry;
use crate::provider::{classify, satoshis_to_btc, FetchError, Provider, TxLeg};

const BASE_URL: &str = "https://blockchain.info";
const MIN_INTERVAL: Duration = Duration::from_secs(10);

pub struct BlockchainInfo {
    http: reqwest::Client,
    limiter: Arc<RateLimiter>,
    sleeper: Arc<dyn Sleeper>,
}

#[derive(Deserialize)]
pub(crate) struct RawAddr {
    pub(crate) final_balance: i64,
    pub(crate) n_tx: i64,
    #[serde(default)]
    pub(crate) txs: Vec<RawTx>,
}

#[derive(Deserialize)]
pub(crate) struct RawTx {
    hash: String,
    time: i64,
    #[serde(default)]
    confirmations: i64,
    #[serde(default)]
    inputs: Vec<RawInput>,
    #[serde(default, rename = "out")]
    outputs: Vec<RawOut>,
}

#[derive(Deserialize)]
pub(crate) struct RawInput {
    prev_out: Option<RawOut>,
}

#[derive(Deserialize)]
pub(crate) struct RawOut {
    addr: Option<String>,
    #[serde(default)]
    value: i64,
}

impl BlockchainInfo {
    pub fn new(
        timeout: Duration,
        limiter: Arc<RateLimiter>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            limiter,
            sleeper,
        })
    }

    async fn get_rawaddr(
        &self,
        address: &str,
        limit: u32,
        offset: u32,
    ) -> Result<RawAddr, FetchError> {
        let url = format!("{}/rawaddr/{}", BASE_URL, address);
        let response = self
            .http
            .get(&url)
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let body = response.text().await?;
                parse_rawaddr(&body)
            }
            StatusCode::TOO_MANY_REQUESTS => Err(FetchError::Throttled),
            status => Err(FetchError::Status(status.as_u16())),
        }
    }
}

pub(crate) fn parse_rawaddr(body: &str) -> Result<RawAddr, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))
}

pub(crate) fn to_records(address: &str, raw: &RawAddr) -> Result<Vec<TxRecord>, FetchError> {
    raw.txs
        .iter()
        .map(|tx| {
            let timestamp = DateTime::<Utc>::from_timestamp(tx.time, 0)
                .ok_or_else(|| FetchError::Malformed(format!("bad tx time: {}", tx.time)))?;

            let inputs: Vec<TxLeg> = tx
                .inputs
                .iter()
                .filter_map(|input| input.prev_out.as_ref())
                .map(|out| TxLeg {
                    recipient: out.addr.clone(),
                    value: out.value,
                })
                .collect();
            let outputs: Vec<TxLeg> = tx
                .outputs
                .iter()
                .map(|out| TxLeg {
                    recipient: out.addr.clone(),
                    value: out.value,
                })
                .collect();

            let (amount, is_sending) = classify(address, &inputs, &outputs);

            Ok(TxRecord {
                hash: tx.hash.clone(),
                amount,
                timestamp,
                confirmations: tx.confirmations,
                is_sending,
            })
        })
        .collect()
}

#[async_trait]
impl Provider for BlockchainInfo {
    fn name(&self) -> &'static str {
        "blockchain.info"
    }

    fn min_interval(&self) -> Duration {
        MIN_INTERVAL
    }

    async fn fetch_balance_and_count(&self, address: &str) -> Option<AddressInfo> {
        self.limiter.wait_if_needed(self.name(), MIN_INTERVAL).await;

        // limit=0 skips the transaction list entirely
        match self.get_rawaddr(address, 0, 0).await {
            Ok(raw) => {
                let info = AddressInfo {
                    balance: satoshis_to_btc(raw.final_balance),
                    tx_count: raw.n_tx,
                };
                info!(
                    "{}: {} has balance {} BTC over {} transactions",
                    self.name(),
                    address,
                    info.balance,
                    info.tx_count
                );
                Some(info)
            }
            Err(e) => {
                warn!("{}: address info failed for {}: {}", self.name(), address, e);
                None
            }
        }
    }

    async fn fetch_page(&self, address: &str, limit: u32, offset: u32) -> Vec<TxRecord> {
        let result = with_throttle_retry(
            &self.limiter,
            self.sleeper.as_ref(),
            self.name(),
            MIN_INTERVAL,
            || self.get_rawaddr(address, limit, offset),
        )
        .await
        .and_then(|raw| to_records(address, &raw));

        match result {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    "{}: page fetch failed for {} (offset={}): {}",
                    self.name(),
                    address,
                    offset,
                    e
                );
                Vec::new()
            }
        }
    }
}
