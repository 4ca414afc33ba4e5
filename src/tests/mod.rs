mod provider_tests;

pub(crate) mod support {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;
    use std::time::{Duration, Instant};

    use crate::db::connection;
    use crate::models::{AddressInfo, TxRecord};
    use crate::provider::{Clock, Provider, Sleeper};
    use crate::sync::SyncContext;

    pub async fn setup_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to open in-memory database");

        sqlx::query("PRAGMA foreign_keys=ON")
            .execute(&pool)
            .await
            .unwrap();
        connection::init_schema(&pool).await.unwrap();

        pool
    }

    /// Manually advanced clock. The recording sleeper advances it by
    /// whatever it "sleeps" so rate-limit math stays consistent.
    pub struct FakeClock {
        base: Instant,
        offset: StdMutex<Duration>,
    }

    impl FakeClock {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                base: Instant::now(),
                offset: StdMutex::new(Duration::ZERO),
            })
        }

        pub fn advance(&self, by: Duration) {
            *self.offset.lock().unwrap() += by;
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.base + *self.offset.lock().unwrap()
        }
    }

    pub struct RecordingSleeper {
        slept: StdMutex<Vec<Duration>>,
        clock: Option<Arc<FakeClock>>,
    }

    impl RecordingSleeper {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                slept: StdMutex::new(Vec::new()),
                clock: None,
            })
        }

        pub fn with_clock(clock: Arc<FakeClock>) -> Arc<Self> {
            Arc::new(Self {
                slept: StdMutex::new(Vec::new()),
                clock: Some(clock),
            })
        }

        pub fn slept(&self) -> Vec<Duration> {
            self.slept.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
            if let Some(clock) = &self.clock {
                clock.advance(duration);
            }
        }
    }

    /// Scripted provider: pages are keyed by offset, and every page
    /// call is recorded as (limit, offset).
    pub struct MockProvider {
        pub info: Option<AddressInfo>,
        pub pages: HashMap<u32, Vec<TxRecord>>,
        pub page_calls: StdMutex<Vec<(u32, u32)>>,
    }

    impl MockProvider {
        pub fn new(info: Option<AddressInfo>) -> Self {
            Self {
                info,
                pages: HashMap::new(),
                page_calls: StdMutex::new(Vec::new()),
            }
        }

        pub fn with_page(mut self, offset: u32, records: Vec<TxRecord>) -> Self {
            self.pages.insert(offset, records);
            self
        }

        pub fn page_calls(&self) -> Vec<(u32, u32)> {
            self.page_calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn min_interval(&self) -> Duration {
            Duration::ZERO
        }

        async fn fetch_balance_and_count(&self, _address: &str) -> Option<AddressInfo> {
            self.info.clone()
        }

        async fn fetch_page(&self, _address: &str, limit: u32, offset: u32) -> Vec<TxRecord> {
            self.page_calls.lock().unwrap().push((limit, offset));
            self.pages.get(&offset).cloned().unwrap_or_default()
        }
    }

    pub fn tx_record(hash: &str, amount: Decimal, is_sending: bool) -> TxRecord {
        TxRecord {
            hash: hash.to_string(),
            amount,
            timestamp: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
            confirmations: 1,
            is_sending,
        }
    }

    pub fn test_ctx(
        pool: SqlitePool,
        provider: Arc<dyn Provider>,
        sleeper: Arc<dyn Sleeper>,
    ) -> SyncContext {
        SyncContext {
            pool,
            provider,
            sleeper,
            page_size: 2,
            max_pages: 5,
            inter_page_delay: Duration::from_secs(30),
        }
    }
}
