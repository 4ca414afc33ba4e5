use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::models::{AddressInfo, TxRecord};
use crate::provider::clock::Sleeper;
use crate::provider::rate_limit::RateLimiter;
use crate::provider::retry::with_throttle_retry;
use crate::provider::{classify, satoshis_to_btc, FetchError, Provider, TxLeg};

const BASE_URL: &str = "https://api.blockchair.com/bitcoin";
const MIN_INTERVAL: Duration = Duration::from_secs(5);

// Blockchair signals limits with more than plain 429
const THROTTLE_STATUSES: [u16; 4] = [402, 429, 430, 435];

pub struct Blockchair {
    http: reqwest::Client,
    api_key: Option<String>,
    limiter: Arc<RateLimiter>,
    sleeper: Arc<dyn Sleeper>,
}

#[derive(Deserialize)]
pub(crate) struct DashboardResponse {
    pub(crate) data: HashMap<String, DashboardEntry>,
}

#[derive(Deserialize)]
pub(crate) struct DashboardEntry {
    pub(crate) address: AddressSummary,
    #[serde(default)]
    pub(crate) transactions: Vec<ChairTx>,
}

#[derive(Deserialize)]
pub(crate) struct AddressSummary {
    pub(crate) balance: i64,
    pub(crate) transaction_count: i64,
}

#[derive(Deserialize)]
pub(crate) struct ChairTx {
    hash: String,
    time: String,
    #[serde(default)]
    confirmation_count: i64,
    #[serde(default)]
    inputs: Vec<ChairLeg>,
    #[serde(default)]
    outputs: Vec<ChairLeg>,
}

#[derive(Deserialize)]
struct ChairLeg {
    recipient: Option<String>,
    #[serde(default)]
    value: i64,
}

impl Blockchair {
    pub fn new(
        timeout: Duration,
        api_key: Option<String>,
        limiter: Arc<RateLimiter>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key,
            limiter,
            sleeper,
        })
    }

    async fn get_dashboard(
        &self,
        address: &str,
        query: &[(&str, String)],
    ) -> Result<DashboardEntry, FetchError> {
        let url = format!("{}/dashboards/address/{}", BASE_URL, address);
        let mut request = self.http.get(&url).query(query);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key)]);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        if THROTTLE_STATUSES.contains(&status) {
            return Err(FetchError::Throttled);
        }
        if status != 200 {
            return Err(FetchError::Status(status));
        }

        let body = response.text().await?;
        let parsed: DashboardResponse = parse_dashboard(&body)?;
        parsed
            .data
            .into_iter()
            .find(|(key, _)| key == address)
            .map(|(_, entry)| entry)
            .ok_or_else(|| FetchError::Malformed(format!("no data entry for {}", address)))
    }
}

pub(crate) fn parse_dashboard(body: &str) -> Result<DashboardResponse, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))
}

/// Blockchair reports times as ISO-8601, sometimes with a `T`
/// separator and offset, sometimes as a plain UTC "date time" string.
pub(crate) fn parse_utc_time(text: &str) -> Result<DateTime<Utc>, FetchError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|_| FetchError::Malformed(format!("unparseable time: {}", text)))
}

pub(crate) fn to_records(address: &str, txs: &[ChairTx]) -> Result<Vec<TxRecord>, FetchError> {
    txs.iter()
        .map(|tx| {
            let timestamp = parse_utc_time(&tx.time)?;

            let inputs: Vec<TxLeg> = tx
                .inputs
                .iter()
                .map(|leg| TxLeg {
                    recipient: leg.recipient.clone(),
                    value: leg.value,
                })
                .collect();
            let outputs: Vec<TxLeg> = tx
                .outputs
                .iter()
                .map(|leg| TxLeg {
                    recipient: leg.recipient.clone(),
                    value: leg.value,
                })
                .collect();

            let (amount, is_sending) = classify(address, &inputs, &outputs);

            Ok(TxRecord {
                hash: tx.hash.clone(),
                amount,
                timestamp,
                confirmations: tx.confirmation_count,
                is_sending,
            })
        })
        .collect()
}

#[async_trait]
impl Provider for Blockchair {
    fn name(&self) -> &'static str {
        "blockchair"
    }

    fn min_interval(&self) -> Duration {
        MIN_INTERVAL
    }

    async fn fetch_balance_and_count(&self, address: &str) -> Option<AddressInfo> {
        self.limiter.wait_if_needed(self.name(), MIN_INTERVAL).await;

        match self.get_dashboard(address, &[("limit", "0".to_string())]).await {
            Ok(entry) => {
                let info = AddressInfo {
                    balance: satoshis_to_btc(entry.address.balance),
                    tx_count: entry.address.transaction_count,
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
        let query = [
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ];

        let result = with_throttle_retry(
            &self.limiter,
            self.sleeper.as_ref(),
            self.name(),
            MIN_INTERVAL,
            || self.get_dashboard(address, &query),
        )
        .await
        .and_then(|entry| to_records(address, &entry.transactions));

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
