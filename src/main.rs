use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use btc_tracker_service::config::Config;
use btc_tracker_service::provider::{self, Sleeper, TokioSleeper};
use btc_tracker_service::sync::dispatcher::Dispatcher;
use btc_tracker_service::sync::SyncContext;
use btc_tracker_service::db;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting btc-tracker-service");

    let config = Config::from_env();
    info!("Configuration loaded: {:?}", config);

    let db_pool = db::connection::establish_connection(&config.database_url).await?;
    info!("Database connection established");

    let provider = provider::build(&config)?;
    info!("Using provider {}", provider.name());

    let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);
    let ctx = Arc::new(SyncContext {
        pool: db_pool.clone(),
        provider,
        sleeper,
        page_size: config.page_size,
        max_pages: config.max_pages,
        inter_page_delay: config.inter_page_delay,
    });

    let shutdown = CancellationToken::new();
    let dispatcher = Dispatcher::new(ctx.clone(), config.worker_count, shutdown.clone());
    info!("Started {} sync workers", config.worker_count);

    // Periodically refresh the balance of every tracked address.
    // Transaction backfills are enqueued on demand by collaborators
    // through the dispatcher.
    let mut ticker = tokio::time::interval(config.sync_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match db::address::get_all_addresses(&db_pool).await {
                    Ok(addresses) => {
                        info!("Enqueueing balance refresh for {} addresses", addresses.len());
                        for addr in addresses {
                            dispatcher.enqueue(addr.id, false, false);
                        }
                    }
                    Err(e) => error!("Failed to list tracked addresses: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                shutdown.cancel();
                break;
            }
        }
    }

    dispatcher.join().await;
    info!("btc-tracker-service stopped");

    Ok(())
}
