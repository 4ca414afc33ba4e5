use sqlx::{migrate::MigrateDatabase, Pool, Sqlite, SqlitePool};

use crate::db::INIT_SCHEMA;

pub async fn establish_connection(database_url: &str) -> Result<Pool<Sqlite>, sqlx::Error> {
    // Create database if it doesn't exist
    if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
        Sqlite::create_database(database_url).await?;
    }

    let pool = SqlitePool::connect(database_url).await?;

    // WAL mode for better concurrency; FKs for the cascade delete
    sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
    sqlx::query("PRAGMA foreign_keys=ON").execute(&pool).await?;

    init_schema(&pool).await?;

    Ok(pool)
}

pub async fn init_schema(pool: &Pool<Sqlite>) -> Result<(), sqlx::Error> {
    // One batch: the script mixes comments and multi-statement DDL
    sqlx::raw_sql(INIT_SCHEMA).execute(pool).await?;

    Ok(())
}
