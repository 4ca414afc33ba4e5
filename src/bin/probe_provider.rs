// Manual harness: fetch address info and the first transaction page
// from the configured provider for one address given on the command
// line. Useful for eyeballing provider behavior and rate limits.
//
//   cargo run --bin probe_provider -- <address> [page_size]

use btc_tracker_service::config::Config;
use btc_tracker_service::provider;
use btc_tracker_service::validation::validate_bitcoin_address;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let address = match args.next() {
        Some(addr) => addr,
        None => {
            eprintln!("usage: probe_provider <address> [page_size]");
            std::process::exit(1);
        }
    };
    let page_size: u32 = args.next().and_then(|v| v.parse().ok()).unwrap_or(5);

    if let Err(e) = validate_bitcoin_address(&address) {
        eprintln!("rejected: {}", e);
        std::process::exit(1);
    }

    let config = Config::from_env();
    let provider = provider::build(&config)?;

    println!("=== {} info for {} ===", provider.name(), address);
    match provider.fetch_balance_and_count(&address).await {
        Some(info) => {
            println!("Balance: {} BTC", info.balance);
            println!("Transaction count: {}", info.tx_count);
        }
        None => println!("No address info returned"),
    }

    println!("\n=== first page (limit={}) ===", page_size);
    let records = provider.fetch_page(&address, page_size, 0).await;
    if records.is_empty() {
        println!("No transactions returned");
    } else {
        for (i, tx) in records.iter().enumerate() {
            println!("\nTransaction {}:", i + 1);
            println!("  Hash: {}", tx.hash);
            println!("  Amount: {} BTC", tx.amount);
            println!("  Timestamp: {}", tx.timestamp);
            println!("  Confirmations: {}", tx.confirmations);
            println!("  Sending: {}", tx.is_sending);
        }
    }

    Ok(())
}
