//! Offline end-to-end tests against the recorded testdata directory
//!
//! A client built over `ReplayHttpClient` runs the same code paths as a live
//! client, with bodies served from `crates/alphavantage-core/testdata`.

use std::path::PathBuf;

use alphavantage_core::catalogue::{GlobalQuoteQuery, MarketStatusQuery, OverviewQuery, TimeSeriesDailyQuery};
use alphavantage_core::{
    CancellationToken, Client, Error, HttpErrorKind, ReplayHttpClient, TestdataIndex,
};
use time::macros::datetime;

fn testdata_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn replay_client() -> Client {
    let replay = ReplayHttpClient::open(&testdata_dir()).expect("testdata index loads");
    Client::builder().http_client(replay).api_key("demo").build()
}

// =============================================================================
// Replay: Recorded Responses
// =============================================================================

#[test]
fn index_lists_every_recorded_body() {
    let index = TestdataIndex::load(&testdata_dir()).expect("index");
    assert!(index.entries().len() >= 4);
    for entry in index.entries() {
        assert!(
            testdata_dir().join(&entry.path).is_file(),
            "{} has no body at {}",
            entry.id,
            entry.path
        );
    }
}

#[tokio::test]
async fn recorded_quote_decodes_into_a_record() {
    // Given: A client replaying recorded bodies
    let client = replay_client();

    // When: The quote is fetched through the generated record helper
    let quotes = client
        .global_quote_records(&CancellationToken::new(), GlobalQuoteQuery::new("IBM"), None)
        .await
        .expect("recorded quote");

    // Then: The recorded row is returned
    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0].symbol, "IBM");
    assert_eq!(quotes[0].price, 225.43);
    assert_eq!(quotes[0].volume, 3_210_577);
    assert_eq!(quotes[0].latest_day, datetime!(2024-11-01 0:00 UTC));
}

#[tokio::test]
async fn recorded_daily_series_decodes_every_row() {
    let bars = replay_client()
        .time_series_daily_records(&CancellationToken::new(), TimeSeriesDailyQuery::new("IBM"), None)
        .await
        .expect("recorded series");

    assert_eq!(bars.len(), 3);
    assert_eq!(bars[0].timestamp, datetime!(2024-11-01 0:00 UTC));
    assert_eq!(bars[0].close, 208.25);
    assert!(bars.windows(2).all(|pair| pair[0].timestamp > pair[1].timestamp));
}

#[tokio::test]
async fn recorded_json_is_returned_verbatim() {
    let value = replay_client()
        .json_value(&CancellationToken::new(), &MarketStatusQuery::new())
        .await
        .expect("recorded market status");

    assert_eq!(value["markets"][0]["region"], "United States");
}

#[tokio::test]
async fn recorded_demo_key_notice_is_a_service_error() {
    let error = replay_client()
        .execute(&CancellationToken::new(), &OverviewQuery::new("IBM"))
        .await
        .expect_err("demo notice");

    match error {
        Error::Service(service) => {
            assert_eq!(service.key, "Information");
            assert!(service.message.contains("demo"));
        }
        other => panic!("expected service error, got {other}"),
    }
}

#[tokio::test]
async fn unrecorded_request_is_a_transport_error() {
    let error = replay_client()
        .execute(&CancellationToken::new(), &OverviewQuery::new("MSFT"))
        .await
        .expect_err("nothing recorded for MSFT");

    assert!(matches!(
        error,
        Error::Transport(ref http)
            if http.kind() == HttpErrorKind::Other && http.message().contains("no recorded response")
    ));
}
