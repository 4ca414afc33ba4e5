// Database-facing records plus the provider-neutral shapes the
// fetchers hand to the sync orchestrator.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A Bitcoin address tracked for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedAddress {
    pub id: i64,
    pub user_id: i64,
    pub address: String,
    pub label: String,
    /// Current balance in BTC, exact to 8 fractional digits.
    pub balance: Decimal,
    /// Transaction count as last reported by the provider.
    pub tx_count: i64,
    /// Next page index to fetch when resuming a paginated sync.
    pub last_fetched_page: i64,
    pub last_synced: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A stored transaction row. Immutable once written except for the
/// confirmation count, which later syncs may refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub id: i64,
    pub address_id: i64,
    pub tx_hash: String,
    /// Signed BTC amount: negative when funds leave the address.
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    pub confirmations: i64,
    pub is_sending: bool,
}

/// Balance and transaction count for one address as reported by a
/// provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressInfo {
    pub balance: Decimal,
    pub tx_count: i64,
}

/// One transaction from a provider page, already classified and with
/// its timestamp normalized to UTC.
#[derive(Debug, Clone, PartialEq)]
pub struct TxRecord {
    pub hash: String,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    pub confirmations: i64,
    pub is_sending: bool,
}
