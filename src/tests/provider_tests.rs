use chrono::{DateTime, Utc};
use rust_decimal::dec;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::provider::rate_limit::RateLimiter;
use crate::provider::retry::{with_throttle_retry, BASE_BACKOFF};
use crate::provider::{blockchain_info, blockchair, classify, satoshis_to_btc, FetchError, TxLeg};
use crate::tests::support::{FakeClock, RecordingSleeper};

fn leg(recipient: &str, value: i64) -> TxLeg {
    TxLeg {
        recipient: Some(recipient.to_string()),
        value,
    }
}

#[test]
fn satoshi_conversion_is_exact() {
    assert_eq!(satoshis_to_btc(123_456_789).to_string(), "1.23456789");
    assert_eq!(satoshis_to_btc(1).to_string(), "0.00000001");
    assert_eq!(satoshis_to_btc(100_000_000), dec!(1));
    assert_eq!(satoshis_to_btc(0), dec!(0));
}

#[test]
fn output_only_transaction_is_receiving() {
    let (amount, is_sending) = classify("addr1", &[], &[leg("addr1", 50_000_000)]);
    assert_eq!(amount, dec!(0.5));
    assert!(!is_sending);
}

#[test]
fn input_only_transaction_is_sending() {
    let (amount, is_sending) = classify("addr1", &[leg("addr1", 30_000_000)], &[]);
    assert_eq!(amount, dec!(-0.3));
    assert!(is_sending);
}

#[test]
fn inputs_win_over_outputs() {
    // Change going back to the same address does not flip the sign
    let (amount, is_sending) = classify(
        "addr1",
        &[leg("addr1", 30_000_000)],
        &[leg("addr1", 10_000_000), leg("other", 19_000_000)],
    );
    assert_eq!(amount, dec!(-0.3));
    assert!(is_sending);
}

#[test]
fn unrelated_transaction_is_zero_receiving() {
    let (amount, is_sending) = classify("addr1", &[leg("a", 1)], &[leg("b", 2)]);
    assert_eq!(amount, dec!(0));
    assert!(!is_sending);
}

#[tokio::test]
async fn throttle_gives_up_after_three_attempts() {
    let clock = FakeClock::new();
    let limiter_sleeper = RecordingSleeper::with_clock(clock.clone());
    let limiter = RateLimiter::with_parts(clock, limiter_sleeper);
    let backoff_sleeper = RecordingSleeper::new();

    let attempts = AtomicU32::new(0);
    let result: Result<(), FetchError> = with_throttle_retry(
        &limiter,
        backoff_sleeper.as_ref(),
        "test",
        Duration::ZERO,
        || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::Throttled)
        },
    )
    .await;

    assert!(matches!(result, Err(FetchError::Throttled)));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(
        backoff_sleeper.slept(),
        vec![BASE_BACKOFF, BASE_BACKOFF * 2, BASE_BACKOFF * 4]
    );
}

#[tokio::test]
async fn success_needs_no_backoff() {
    let clock = FakeClock::new();
    let limiter = RateLimiter::with_parts(clock.clone(), RecordingSleeper::with_clock(clock));
    let backoff_sleeper = RecordingSleeper::new();

    let result = with_throttle_retry(
        &limiter,
        backoff_sleeper.as_ref(),
        "test",
        Duration::ZERO,
        || async { Ok::<_, FetchError>(7) },
    )
    .await;

    assert_eq!(result.unwrap(), 7);
    assert!(backoff_sleeper.slept().is_empty());
}

#[tokio::test]
async fn non_throttle_errors_fail_immediately() {
    let clock = FakeClock::new();
    let limiter = RateLimiter::with_parts(clock.clone(), RecordingSleeper::with_clock(clock));
    let backoff_sleeper = RecordingSleeper::new();

    let attempts = AtomicU32::new(0);
    let result: Result<(), FetchError> = with_throttle_retry(
        &limiter,
        backoff_sleeper.as_ref(),
        "test",
        Duration::ZERO,
        || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::Status(500))
        },
    )
    .await;

    assert!(matches!(result, Err(FetchError::Status(500))));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert!(backoff_sleeper.slept().is_empty());
}

#[tokio::test]
async fn rate_limiter_enforces_min_interval() {
    let clock = FakeClock::new();
    let sleeper = RecordingSleeper::with_clock(clock.clone());
    let limiter = RateLimiter::with_parts(clock.clone(), sleeper.clone());
    let interval = Duration::from_secs(10);

    // First call goes straight through
    limiter.wait_if_needed("p", interval).await;
    assert!(sleeper.slept().is_empty());

    // Back-to-back call waits the full interval
    limiter.wait_if_needed("p", interval).await;
    assert_eq!(sleeper.slept(), vec![interval]);

    // After enough wall time, no wait
    clock.advance(Duration::from_secs(15));
    limiter.wait_if_needed("p", interval).await;
    assert_eq!(sleeper.slept(), vec![interval]);
}

#[tokio::test]
async fn rate_limiter_tracks_providers_independently() {
    let clock = FakeClock::new();
    let sleeper = RecordingSleeper::with_clock(clock.clone());
    let limiter = RateLimiter::with_parts(clock, sleeper.clone());
    let interval = Duration::from_secs(10);

    limiter.wait_if_needed("a", interval).await;
    limiter.wait_if_needed("b", interval).await;
    assert!(sleeper.slept().is_empty());
}

#[test]
fn blockchain_info_body_parses_and_classifies() {
    let body = r#"{
        "final_balance": 123456789,
        "n_tx": 2,
        "txs": [
            {
                "hash": "h1",
                "time": 1700000000,
                "confirmations": 6,
                "inputs": [{"prev_out": {"addr": "other", "value": 70000000}}],
                "out": [{"addr": "addr1", "value": 50000000}]
            },
            {
                "hash": "h2",
                "time": 1700000100,
                "inputs": [{"prev_out": {"addr": "addr1", "value": 30000000}}],
                "out": [{"addr": "other", "value": 29000000}]
            }
        ]
    }"#;

    let raw = blockchain_info::parse_rawaddr(body).unwrap();
    assert_eq!(raw.final_balance, 123_456_789);
    assert_eq!(raw.n_tx, 2);

    let records = blockchain_info::to_records("addr1", &raw).unwrap();
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].hash, "h1");
    assert_eq!(records[0].amount, dec!(0.5));
    assert!(!records[0].is_sending);
    assert_eq!(records[0].confirmations, 6);
    assert_eq!(
        records[0].timestamp,
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
    );

    assert_eq!(records[1].amount, dec!(-0.3));
    assert!(records[1].is_sending);
    assert_eq!(records[1].confirmations, 0);
}

#[test]
fn blockchain_info_rejects_malformed_body() {
    assert!(matches!(
        blockchain_info::parse_rawaddr("{\"wrong\": true}"),
        Err(FetchError::Malformed(_))
    ));
}

#[test]
fn blockchair_dashboard_parses_and_classifies() {
    let body = r#"{
        "data": {
            "addr1": {
                "address": {"balance": 50000000, "transaction_count": 1},
                "transactions": [
                    {
                        "hash": "h1",
                        "time": "2023-11-14 22:13:20",
                        "confirmation_count": 3,
                        "inputs": [{"recipient": "other", "value": 60000000}],
                        "outputs": [{"recipient": "addr1", "value": 50000000}]
                    }
                ]
            }
        }
    }"#;

    let parsed = blockchair::parse_dashboard(body).unwrap();
    let entry = parsed.data.get("addr1").unwrap();
    assert_eq!(entry.address.balance, 50_000_000);
    assert_eq!(entry.address.transaction_count, 1);

    let records = blockchair::to_records("addr1", &entry.transactions).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].amount, dec!(0.5));
    assert!(!records[0].is_sending);
    assert_eq!(records[0].confirmations, 3);
    assert_eq!(records[0].timestamp.to_rfc3339(), "2023-11-14T22:13:20+00:00");
}

#[test]
fn blockchair_times_normalize_to_utc() {
    let from_space = blockchair::parse_utc_time("2023-01-01 12:34:56").unwrap();
    let from_rfc3339 = blockchair::parse_utc_time("2023-01-01T12:34:56Z").unwrap();
    assert_eq!(from_space, from_rfc3339);

    let with_offset = blockchair::parse_utc_time("2023-01-01T14:34:56+02:00").unwrap();
    assert_eq!(with_offset, from_rfc3339);

    assert!(matches!(
        blockchair::parse_utc_time("not a time"),
        Err(FetchError::Malformed(_))
    ));
}
