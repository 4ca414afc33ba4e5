pub mod address;
pub mod connection;
pub mod transaction;

pub const INIT_SCHEMA: &str = r#"
-- Tracked Bitcoin addresses, one owner each
CREATE TABLE IF NOT EXISTS addresses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    address TEXT NOT NULL UNIQUE,
    label TEXT NOT NULL DEFAULT '',
    balance TEXT NOT NULL DEFAULT '0',
    tx_count INTEGER NOT NULL DEFAULT 0,
    last_fetched_page INTEGER NOT NULL DEFAULT 0,
    last_synced INTEGER,
    created_at INTEGER NOT NULL
);

-- Transactions per address, deduplicated on (address_id, tx_hash)
CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    address_id INTEGER NOT NULL,
    tx_hash TEXT NOT NULL,
    amount TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    confirmations INTEGER NOT NULL DEFAULT 0,
    is_sending INTEGER NOT NULL,
    UNIQUE(address_id, tx_hash),
    FOREIGN KEY (address_id) REFERENCES addresses(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_transactions_address_time ON transactions(address_id, timestamp);
CREATE INDEX IF NOT EXISTS idx_addresses_user ON addresses(user_id);
"#;
