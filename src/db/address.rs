use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};

use crate::models::TrackedAddress;

fn decode_decimal(text: &str) -> Result<Decimal, sqlx::Error> {
    text.parse::<Decimal>()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn decode_timestamp(secs: i64) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| sqlx::Error::Decode(format!("timestamp out of range: {}", secs).into()))
}

fn row_to_address(row: &SqliteRow) -> Result<TrackedAddress, sqlx::Error> {
    let last_synced = match row.get::<Option<i64>, _>("last_synced") {
        Some(secs) => Some(decode_timestamp(secs)?),
        None => None,
    };

    Ok(TrackedAddress {
        id: row.get("id"),
        user_id: row.get("user_id"),
        address: row.get("address"),
        label: row.get("label"),
        balance: decode_decimal(row.get("balance"))?,
        tx_count: row.get("tx_count"),
        last_fetched_page: row.get("last_fetched_page"),
        last_synced,
        created_at: decode_timestamp(row.get("created_at"))?,
    })
}

/// Register an address for a user. Returns the new row id.
pub async fn add_address(
    pool: &Pool<Sqlite>,
    user_id: i64,
    address: &str,
    label: &str,
) -> Result<i64, sqlx::Error> {
    let now = Utc::now().timestamp();

    let result = sqlx::query(
        "INSERT INTO addresses (user_id, address, label, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(address)
    .bind(label)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn get_address(
    pool: &Pool<Sqlite>,
    id: i64,
) -> Result<Option<TrackedAddress>, sqlx::Error> {
    let row = sqlx::query("SELECT * FROM addresses WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_address).transpose()
}

pub async fn get_all_addresses(pool: &Pool<Sqlite>) -> Result<Vec<TrackedAddress>, sqlx::Error> {
    let rows = sqlx::query("SELECT * FROM addresses ORDER BY id")
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_address).collect()
}

pub async fn list_addresses_for_user(
    pool: &Pool<Sqlite>,
    user_id: i64,
) -> Result<Vec<TrackedAddress>, sqlx::Error> {
    let rows = sqlx::query("SELECT * FROM addresses WHERE user_id = ? ORDER BY id")
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_address).collect()
}

pub async fn update_label(
    pool: &Pool<Sqlite>,
    id: i64,
    label: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE addresses SET label = ? WHERE id = ?")
        .bind(label)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Delete an address; its transactions go with it via the FK cascade.
pub async fn remove_address(pool: &Pool<Sqlite>, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM addresses WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Persist a balance update immediately so a later failure in the
/// transaction phase cannot lose it.
pub async fn update_balance_and_count(
    pool: &Pool<Sqlite>,
    id: i64,
    balance: Decimal,
    tx_count: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE addresses SET balance = ?, tx_count = ? WHERE id = ?")
        .bind(balance.to_string())
        .bind(tx_count)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Checkpoint write is last-write-wins; it only affects where the next
/// sync resumes pagination.
pub async fn update_checkpoint(
    pool: &Pool<Sqlite>,
    id: i64,
    page: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE addresses SET last_fetched_page = ? WHERE id = ?")
        .bind(page)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn touch_last_synced(
    pool: &Pool<Sqlite>,
    id: i64,
    when: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE addresses SET last_synced = ? WHERE id = ?")
        .bind(when.timestamp())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}
