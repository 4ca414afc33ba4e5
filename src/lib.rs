pub mod config;
pub mod db;
pub mod models;
pub mod provider;
pub mod sync;
pub mod validation;

#[cfg(test)]
mod tests;

pub use config::Config;
pub use models::{AddressInfo, StoredTransaction, TrackedAddress, TxRecord};
pub use provider::{FetchError, Provider, RateLimiter};
pub use sync::{refresh_balance_only, refresh_full, SyncContext, SyncError, SyncOptions};
pub use validation::{validate_bitcoin_address, validate_label, ValidationError};
