use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Pool, Row, Sqlite};

use crate::models::{StoredTransaction, TxRecord};

/// Insert a fetched transaction if its hash is not already stored for
/// this address; otherwise refresh the confirmation count when it
/// changed. Returns true when a new row was created.
pub async fn upsert_transaction(
    pool: &Pool<Sqlite>,
    address_id: i64,
    record: &TxRecord,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO transactions (address_id, tx_hash, amount, timestamp, confirmations, is_sending)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(address_id, tx_hash) DO NOTHING
        "#,
    )
    .bind(address_id)
    .bind(&record.hash)
    .bind(record.amount.to_string())
    .bind(record.timestamp.timestamp())
    .bind(record.confirmations)
    .bind(record.is_sending as i32)
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        return Ok(true);
    }

    sqlx::query(
        "UPDATE transactions SET confirmations = ?
         WHERE address_id = ? AND tx_hash = ? AND confirmations != ?",
    )
    .bind(record.confirmations)
    .bind(address_id)
    .bind(&record.hash)
    .bind(record.confirmations)
    .execute(pool)
    .await?;

    Ok(false)
}

pub async fn count_for_address(pool: &Pool<Sqlite>, address_id: i64) -> Result<i64, sqlx::Error> {
    let count = sqlx::query("SELECT COUNT(*) FROM transactions WHERE address_id = ?")
        .bind(address_id)
        .fetch_one(pool)
        .await?
        .get::<i64, _>(0);

    Ok(count)
}

pub async fn get_transactions(
    pool: &Pool<Sqlite>,
    address_id: i64,
    offset: i64,
    limit: i64,
) -> Result<Vec<StoredTransaction>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT id, address_id, tx_hash, amount, timestamp, confirmations, is_sending
           FROM transactions
           WHERE address_id = ?
           ORDER BY timestamp DESC
           LIMIT ? OFFSET ?"#,
    )
    .bind(address_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let amount = row
                .get::<String, _>("amount")
                .parse::<Decimal>()
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
            let timestamp = DateTime::<Utc>::from_timestamp(row.get("timestamp"), 0)
                .ok_or_else(|| sqlx::Error::Decode("timestamp out of range".into()))?;

            Ok(StoredTransaction {
                id: row.get("id"),
                address_id: row.get("address_id"),
                tx_hash: row.get("tx_hash"),
                amount,
                timestamp,
                confirmations: row.get("confirmations"),
                is_sending: row.get::<i32, _>("is_sending") != 0,
            })
        })
        .collect()
}
