//! Integration tests for complete runs
//!
//! These tests use wiremock to stand in for the listing site and exercise
//! the full session: CSV items in, checkpoint, CSV results out.

use listing_pacer::config::{parse_config, Config};
use listing_pacer::crawler::{run_session, SessionSummary};
use listing_pacer::storage::{open_checkpoint, CheckpointStore, RunStatus};
use listing_pacer::CancellationSignal;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ITEMS_CSV: &str = "brand,model,buy price\n\
                         Nike,Air,\"4 500\"\n\
                         Adidas,Ultra,\n\
                         Puma,Suede,3200\n";

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, checkpoint: &Path, retry_failed: bool) -> Config {
    let toml = format!(
        r#"
[client]
base-url = "{}/search"
timeout-seconds = 5
user-agent = "TestAgent/1.0"

[rate]
requests-per-minute = 6000
burst = 10

[retry]
max-attempts = 1

[run]
checkpoint-path = "{}"
retry-failed = {}
"#,
        base_url,
        checkpoint.display(),
        retry_failed
    );
    parse_config(&toml).expect("test config is valid")
}

fn write_items(dir: &TempDir) -> PathBuf {
    let items = dir.path().join("shoes.csv");
    std::fs::write(&items, ITEMS_CSV).unwrap();
    items
}

async fn mount_listing(server: &MockServer, query: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", query))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

/// Runs one uncancelled session and expects it to succeed
async fn run_to_end(
    config: &Config,
    config_hash: &str,
    items: &Path,
    fresh: bool,
) -> SessionSummary {
    run_session(config, config_hash, items, fresh, CancellationSignal::new(), |_, _, _| {})
        .await
        .expect("session succeeds")
}

fn read_rows(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect()
}

#[tokio::test]
async fn test_full_session_and_resume() {
    let dir = TempDir::new().unwrap();
    let items = write_items(&dir);
    let checkpoint = dir.path().join("checkpoint.db");

    let mock_server = MockServer::start().await;
    mount_listing(
        &mock_server,
        "Nike Air",
        200,
        "<html><head><title>Nike Air</title></head><body>4 990 ₽</body></html>",
    )
    .await;
    mount_listing(&mock_server, "Adidas Ultra", 200, "<title>Adidas</title>").await;
    mount_listing(&mock_server, "Puma Suede", 404, "gone").await;

    let config = create_test_config(&mock_server.uri(), &checkpoint, false);
    let summary = run_to_end(&config, "hash-1", &items, false).await;

    let report = &summary.report;
    assert!(!report.cancelled);
    assert_eq!(report.total, 3);
    assert_eq!(report.processed, 3);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(summary.exported, 3);
    assert_eq!(summary.output_path, dir.path().join("shoes_analyzed.csv"));

    let rows = read_rows(&summary.output_path);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0][0], "0");
    assert_eq!(rows[0][1], "Nike Air");
    assert_eq!(rows[0][2], "true");
    assert_eq!(rows[2][3], "404");
    assert_eq!(rows[2][4], "http");

    let store = open_checkpoint(&checkpoint).unwrap();
    assert_eq!(store.load_done_ids(false).unwrap(), HashSet::from([0, 1, 2]));
    let run = store.get_run(summary.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "hash-1");
    drop(store);

    // Second pass over the same checkpoint fetches nothing
    mock_server.reset().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let again = run_to_end(&config, "hash-1", &items, false).await;

    assert!(again.report.results.is_empty());
    assert_eq!(again.report.skipped, 3);
    assert_eq!(again.exported, 3);
    assert_eq!(again.output_path, dir.path().join("shoes_analyzed (1).csv"));
}

#[tokio::test]
async fn test_retry_failed_refetches_only_failures() {
    let dir = TempDir::new().unwrap();
    let items = write_items(&dir);
    let checkpoint = dir.path().join("checkpoint.db");

    let mock_server = MockServer::start().await;
    mount_listing(&mock_server, "Nike Air", 200, "<title>Nike</title>").await;
    mount_listing(&mock_server, "Adidas Ultra", 200, "<title>Adidas</title>").await;
    mount_listing(&mock_server, "Puma Suede", 403, "").await;

    let config = create_test_config(&mock_server.uri(), &checkpoint, false);
    run_to_end(&config, "h", &items, false).await;

    mock_server.reset().await;
    mount_listing(&mock_server, "Puma Suede", 200, "<title>Puma</title>").await;

    let retry_config = create_test_config(&mock_server.uri(), &checkpoint, true);
    let summary = run_to_end(&retry_config, "h", &items, false).await;

    assert_eq!(summary.report.skipped, 2);
    assert_eq!(summary.report.results.len(), 1);
    assert!(summary.report.results[0].ok);

    let store = open_checkpoint(&checkpoint).unwrap();
    assert_eq!(store.load_done_ids(true).unwrap(), HashSet::from([0, 1, 2]));
}

#[tokio::test]
async fn test_fresh_run_discards_checkpoint() {
    let dir = TempDir::new().unwrap();
    let items = write_items(&dir);
    let checkpoint = dir.path().join("checkpoint.db");

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<title>ok</title>"))
        .expect(6)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &checkpoint, false);
    run_to_end(&config, "h", &items, false).await;
    let summary = run_to_end(&config, "h", &items, true).await;

    assert_eq!(summary.report.skipped, 0);
    assert_eq!(summary.report.results.len(), 3);
}

#[tokio::test]
async fn test_cancelled_session_is_marked_interrupted() {
    let dir = TempDir::new().unwrap();
    let items = write_items(&dir);
    let checkpoint = dir.path().join("checkpoint.db");

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let cancel = CancellationSignal::new();
    cancel.cancel();

    let config = create_test_config(&mock_server.uri(), &checkpoint, false);
    let summary = run_session(&config, "h", &items, false, cancel, |_, _, _| {})
        .await
        .unwrap();

    assert!(summary.report.cancelled);
    assert_eq!(summary.exported, 0);

    let store = open_checkpoint(&checkpoint).unwrap();
    assert_eq!(
        store.get_run(summary.run_id).unwrap().status,
        RunStatus::Interrupted
    );
}

#[tokio::test]
async fn test_missing_items_file_fails_before_fetching() {
    let dir = TempDir::new().unwrap();
    let checkpoint = dir.path().join("checkpoint.db");
    let config = create_test_config("http://127.0.0.1:9", &checkpoint, false);

    let result = run_session(
        &config,
        "h",
        &dir.path().join("missing.csv"),
        false,
        CancellationSignal::new(),
        |_, _, _| {},
    )
    .await;

    assert!(result.is_err());
    assert!(!checkpoint.exists());
}
