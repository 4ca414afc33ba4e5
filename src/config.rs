use dotenv::dotenv;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Which block-explorer backend to use: "blockchain_info" or "blockchair".
    pub provider: String,
    pub blockchair_api_key: Option<String>,
    pub http_timeout: Duration,
    /// How many transactions to request per page.
    pub page_size: u32,
    /// Page budget for a single sync invocation.
    pub max_pages: u32,
    /// Pause between transaction pages, on top of the per-call rate limit.
    pub inter_page_delay: Duration,
    /// How often the daemon enqueues a balance refresh for every address.
    pub sync_interval: Duration,
    pub worker_count: usize,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:tracker.db".to_string());
        let provider =
            env::var("PROVIDER").unwrap_or_else(|_| "blockchain_info".to_string());
        let blockchair_api_key = env::var("BLOCKCHAIR_API_KEY").ok();
        let http_timeout = env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));
        let page_size = env::var("PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20);
        let max_pages = env::var("MAX_PAGES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);
        let inter_page_delay = env::var("INTER_PAGE_DELAY_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));
        let sync_interval = env::var("SYNC_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(600));
        let worker_count = env::var("WORKER_COUNT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);

        Self {
            database_url,
            provider,
            blockchair_api_key,
            http_timeout,
            page_size,
            max_pages,
            inter_page_delay,
            sync_interval,
            worker_count,
        }
    }
}
