// The per-address sync pass: refresh the balance, then optionally walk
// paginated transaction history from the stored checkpoint.

pub mod dispatcher;

use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::{address, transaction};
use crate::models::TrackedAddress;
use crate::provider::{Provider, Sleeper};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("address {0} not found")]
    AddressNotFound(i64),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Everything a sync invocation needs, shared across workers.
pub struct SyncContext {
    pub pool: SqlitePool,
    pub provider: Arc<dyn Provider>,
    pub sleeper: Arc<dyn Sleeper>,
    pub page_size: u32,
    pub max_pages: u32,
    pub inter_page_delay: Duration,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub fetch_transactions: bool,
    pub reset_page: bool,
}

pub async fn refresh_balance_only(
    ctx: &SyncContext,
    address_id: i64,
) -> Result<String, SyncError> {
    sync_address(ctx, address_id, SyncOptions::default()).await
}

pub async fn refresh_full(
    ctx: &SyncContext,
    address_id: i64,
    reset_page: bool,
) -> Result<String, SyncError> {
    sync_address(
        ctx,
        address_id,
        SyncOptions {
            fetch_transactions: true,
            reset_page,
        },
    )
    .await
}

/// One sync invocation. Provider failures degrade the pass (balance
/// kept stale, fewer pages stored) but never abort it; `last_synced`
/// is always stamped. Database errors do abort and propagate to the
/// dispatcher.
pub async fn sync_address(
    ctx: &SyncContext,
    address_id: i64,
    options: SyncOptions,
) -> Result<String, SyncError> {
    let addr = address::get_address(&ctx.pool, address_id)
        .await?
        .ok_or(SyncError::AddressNotFound(address_id))?;

    info!("Starting synchronization for address {}", addr.address);

    // Persist the balance before touching transactions, so a failure
    // later in the pass cannot lose it.
    let mut tx_count = addr.tx_count;
    match ctx.provider.fetch_balance_and_count(&addr.address).await {
        Some(fetched) => {
            address::update_balance_and_count(&ctx.pool, address_id, fetched.balance, fetched.tx_count)
                .await?;
            tx_count = fetched.tx_count;
            info!(
                "Updated balance for {}: {} BTC, {} transactions",
                addr.address, fetched.balance, fetched.tx_count
            );
        }
        None => {
            warn!("No address info for {} this cycle, keeping stored balance", addr.address);
        }
    }

    if options.fetch_transactions {
        fetch_transaction_pages(ctx, &addr, tx_count, options.reset_page).await?;
    } else {
        debug!("Transaction fetch not requested for {}", addr.address);
    }

    address::touch_last_synced(&ctx.pool, address_id, Utc::now()).await?;
    info!("Completed synchronization for address {}", addr.address);

    Ok(format!("Synchronized {}", addr.address))
}

async fn fetch_transaction_pages(
    ctx: &SyncContext,
    addr: &TrackedAddress,
    tx_count: i64,
    reset_page: bool,
) -> Result<(), SyncError> {
    let stored = transaction::count_for_address(&ctx.pool, addr.id).await?;

    // Start over when asked to, or when stored rows already cover the
    // provider-reported count; otherwise resume from the checkpoint.
    let start_page = if reset_page || tx_count <= stored {
        debug!(
            "Starting {} from the first page (reset={}, stored={}, reported={})",
            addr.address, reset_page, stored, tx_count
        );
        if addr.last_fetched_page != 0 {
            address::update_checkpoint(&ctx.pool, addr.id, 0).await?;
        }
        0
    } else {
        debug!("Resuming {} from page {}", addr.address, addr.last_fetched_page);
        addr.last_fetched_page
    };

    let mut total_fetched = 0usize;
    let mut new_rows = 0usize;

    for page_index in 0..ctx.max_pages as i64 {
        let page = start_page + page_index;
        let offset = page * ctx.page_size as i64;
        debug!(
            "Fetching page {} for {} (offset={}, limit={})",
            page, addr.address, offset, ctx.page_size
        );

        let records = ctx
            .provider
            .fetch_page(&addr.address, ctx.page_size, offset as u32)
            .await;

        // Empty means end of data or a failure the fetcher already
        // logged; either way stop rather than loop.
        if records.is_empty() {
            debug!("No transactions returned for {} at page {}", addr.address, page);
            break;
        }

        total_fetched += records.len();
        for record in &records {
            if transaction::upsert_transaction(&ctx.pool, addr.id, record).await? {
                new_rows += 1;
                debug!("Added new transaction {}", record.hash);
            }
        }

        // Checkpoint after every page so a crash mid-loop keeps progress
        address::update_checkpoint(&ctx.pool, addr.id, page + 1).await?;

        if records.len() < ctx.page_size as usize {
            debug!("Reached end of transactions for {} at page {}", addr.address, page);
            break;
        }

        if page_index < ctx.max_pages as i64 - 1 {
            debug!(
                "Waiting {:?} before fetching the next page for {}",
                ctx.inter_page_delay, addr.address
            );
            ctx.sleeper.sleep(ctx.inter_page_delay).await;
        }
    }

    info!(
        "Fetched {} transactions for {}, {} new",
        total_fetched, addr.address, new_rows
    );

    Ok(())
}
