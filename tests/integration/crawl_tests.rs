//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the listing, detail and
//! extraction endpoints and run the full crawl against a temporary store.

use serde_json::{json, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tidemark::config::{Config, Credential};
use tidemark::store::schema::COLUMNS;
use tidemark::store::{
    CsvStore, DedupStore, PostingRecord, StoreError, StoreResult, StoredRow, NO_DESCRIPTION,
};
use tidemark::{run_crawl, CrawlReport, Orchestrator, StopReason};
use wiremock::matchers::{body_partial_json, body_string_contains, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING_PATH: &str = "/api/jobsearch/v5/search";
const DETAIL_PATH: &str = "/graphql";

/// Creates a test configuration pointing every endpoint at the mock server
fn create_test_config(server: &MockServer, store_path: &Path) -> Config {
    let base_url = server.uri();
    let mut config = Config::default();

    config.output.store_path = store_path.display().to_string();
    config.search.listing_url = format!("{}{}", base_url, LISTING_PATH);
    config.detail.url = format!("{}{}", base_url, DETAIL_PATH);
    config.extraction.endpoint = format!("{}/v1beta", base_url);

    // No pacing, fast retries
    config.crawl.detail_delay_ms = 0;
    config.crawl.extraction_delay_ms = 0;
    config.crawl.page_delay_ms = 0;
    config.retry.max_attempts = 3;
    config.retry.base_delay_ms = 1;

    config
}

fn credential() -> Credential {
    Credential::new("test-key").unwrap()
}

fn store_path(dir: &TempDir) -> PathBuf {
    dir.path().join("postings.csv")
}

fn listing_body(ids: &[&str]) -> Value {
    let data: Vec<Value> = ids
        .iter()
        .map(|id| json!({ "id": id, "title": format!("Role {}", id), "advertiser": { "description": "Acme" } }))
        .collect();
    json!({ "data": data, "totalCount": ids.len() })
}

fn detail_body(content: &str) -> Value {
    json!({ "data": { "jobDetails": { "job": { "id": "x", "title": "t", "content": content } } } })
}

fn signals(months: u32) -> Value {
    json!({
        "durationSpecified": months > 0,
        "durationMonths": months,
        "renewalMentioned": false,
        "startSpecified": true,
        "startIso": "2025-02-03",
        "startDescriptor": "ASAP"
    })
}

fn candidate_body(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

async fn mount_listing(server: &MockServer, page: u32, ids: &[&str]) {
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_body(ids)))
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, job_id: &str, content: &str, expected: u64) {
    Mock::given(method("POST"))
        .and(path(DETAIL_PATH))
        .and(body_partial_json(json!({ "operationName": "jobDetails", "variables": { "jobId": job_id } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail_body(content)))
        .expect(expected)
        .mount(server)
        .await;
}

/// Answers extraction requests whose prompt contains `marker`
async fn mount_extraction(server: &MockServer, marker: &str, text: &str) {
    Mock::given(method("POST"))
        .and(path_regex(r":generateContent$"))
        .and(body_string_contains(marker))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body(text)))
        .mount(server)
        .await;
}

/// Posting `id` with a description mentioning it, extracted as `months`
async fn mount_posting(server: &MockServer, id: &str, months: u32) {
    let marker = format!("Posting {} description", id);
    mount_detail(server, id, &format!("<p>{}</p><ul><li>{}&nbsp;month contract</li></ul>", marker, months), 1)
        .await;
    mount_extraction(server, &marker, &signals(months).to_string()).await;
}

fn stored_rows(path: &Path) -> Vec<StoredRow> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader.deserialize().map(|row| row.unwrap()).collect()
}

fn stored_ids(path: &Path) -> Vec<String> {
    stored_rows(path).into_iter().map(|row| row.job_id).collect()
}

async fn crawl(config: &Config) -> CrawlReport {
    run_crawl(config, &credential()).await.expect("crawl failed to start")
}

#[tokio::test]
async fn test_new_postings_are_recorded() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &store_path(&dir));

    mount_listing(&server, 1, &["A", "B"]).await;
    mount_listing(&server, 2, &[]).await;
    mount_posting(&server, "A", 6).await;
    mount_posting(&server, "B", 12).await;

    let report = crawl(&config).await;

    assert_eq!(report.processed, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.stop_reason, Some(StopReason::Exhausted { page: 2 }));

    let rows = stored_rows(&store_path(&dir));
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].job_id, "A");
    assert_eq!(rows[0].duration_months, Some(6));
    assert_eq!(rows[1].job_id, "B");
    assert_eq!(rows[1].start_descriptor.as_deref(), Some("ASAP"));
    assert!(rows[0].crawl_time.ends_with('Z'));
}

#[tokio::test]
async fn test_known_posting_stops_at_frontier() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &store_path(&dir));

    let mut store = CsvStore::open(store_path(&dir)).unwrap();
    store
        .append(&PostingRecord::empty_description("A", chrono::Utc::now()))
        .unwrap();
    drop(store);

    mount_listing(&server, 1, &["A"]).await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_body(&["Z"])))
        .expect(0)
        .mount(&server)
        .await;
    mount_detail(&server, "A", "<p>unused</p>", 0).await;

    let report = crawl(&config).await;

    assert_eq!(report.processed, 0);
    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.stop_reason, Some(StopReason::FrontierReached { page: 1 }));
    assert_eq!(stored_ids(&store_path(&dir)), vec!["A"]);
}

#[tokio::test]
async fn test_invalid_extraction_is_skipped() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &store_path(&dir));

    mount_listing(&server, 1, &["C", "E"]).await;
    mount_listing(&server, 2, &[]).await;
    mount_detail(&server, "C", "<p>Posting C description</p>", 1).await;
    // A rejected answer is final for the posting, so it is asked exactly once
    Mock::given(method("POST"))
        .and(path_regex(r":generateContent$"))
        .and(body_string_contains("Posting C description"))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body(r#"{"durationSpecified":"maybe"}"#)))
        .expect(1)
        .mount(&server)
        .await;
    mount_posting(&server, "E", 3).await;

    let report = crawl(&config).await;

    assert_eq!(report.processed, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(stored_ids(&store_path(&dir)), vec!["E"]);
}

#[tokio::test]
async fn test_blocked_extraction_is_skipped() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &store_path(&dir));

    mount_listing(&server, 1, &["F"]).await;
    mount_listing(&server, 2, &[]).await;
    mount_detail(&server, "F", "<p>Posting F description</p>", 1).await;
    Mock::given(method("POST"))
        .and(path_regex(r":generateContent$"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "promptFeedback": { "blockReason": "SAFETY" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let report = crawl(&config).await;

    assert_eq!(report.processed, 0);
    assert_eq!(report.failed, 1);
    assert!(stored_ids(&store_path(&dir)).is_empty());
}

#[tokio::test]
async fn test_empty_description_skips_extraction() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &store_path(&dir));

    mount_listing(&server, 1, &["D"]).await;
    mount_listing(&server, 2, &[]).await;
    // Not stored, so the second run fetches it again
    mount_detail(&server, "D", "", 2).await;
    Mock::given(method("POST"))
        .and(path_regex(r":generateContent$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body("{}")))
        .expect(0)
        .mount(&server)
        .await;

    let first = crawl(&config).await;
    assert_eq!(first.processed, 0);
    assert_eq!(first.skipped_empty, 1);
    assert!(stored_ids(&store_path(&dir)).is_empty());

    let second = crawl(&config).await;
    assert_eq!(second.skipped_empty, 1);
}

#[tokio::test]
async fn test_empty_description_sentinel() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &store_path(&dir));
    config.output.record_empty_descriptions = true;

    mount_listing(&server, 1, &["D"]).await;
    mount_listing(&server, 2, &[]).await;
    mount_detail(&server, "D", "<p> </p>", 1).await;

    let first = crawl(&config).await;
    assert_eq!(first.skipped_empty, 1);

    let rows = stored_rows(&store_path(&dir));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].start_descriptor.as_deref(), Some(NO_DESCRIPTION));

    let second = crawl(&config).await;
    assert_eq!(second.skipped_empty, 0);
    assert_eq!(second.stop_reason, Some(StopReason::FrontierReached { page: 1 }));
}

#[tokio::test]
async fn test_detail_query_errors_are_skipped() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &store_path(&dir));

    mount_listing(&server, 1, &["G", "H"]).await;
    mount_listing(&server, 2, &[]).await;
    Mock::given(method("POST"))
        .and(path(DETAIL_PATH))
        .and(body_partial_json(json!({ "variables": { "jobId": "G" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "errors": [{ "message": "not found" }] })))
        .mount(&server)
        .await;
    mount_posting(&server, "H", 0).await;

    let report = crawl(&config).await;

    assert_eq!(report.failed, 1);
    assert_eq!(report.processed, 1);
    assert_eq!(stored_ids(&store_path(&dir)), vec!["H"]);
}

#[tokio::test]
async fn test_max_pages_halts() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &store_path(&dir));
    config.crawl.max_pages = 1;

    mount_listing(&server, 1, &["A"]).await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_body(&["B"])))
        .expect(0)
        .mount(&server)
        .await;
    mount_posting(&server, "A", 6).await;

    let report = crawl(&config).await;

    assert_eq!(report.processed, 1);
    assert_eq!(report.stop_reason, Some(StopReason::MaxPages { page: 1 }));
}

#[tokio::test]
async fn test_empty_listing_stops() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &store_path(&dir));

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "totalCount": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    let report = crawl(&config).await;

    assert_eq!(report.processed, 0);
    assert_eq!(report.stop_reason, Some(StopReason::Exhausted { page: 1 }));
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &store_path(&dir));

    mount_listing(&server, 1, &["A", "B"]).await;
    mount_listing(&server, 2, &[]).await;
    mount_posting(&server, "A", 6).await;
    mount_posting(&server, "B", 12).await;

    let first = crawl(&config).await;
    let second = crawl(&config).await;

    assert_eq!(first.processed, 2);
    assert_eq!(second.processed, 0);
    assert_eq!(second.stop_reason, Some(StopReason::FrontierReached { page: 1 }));
    assert_eq!(stored_ids(&store_path(&dir)), vec!["A", "B"]);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &store_path(&dir));

    // Mounted first, so each answers once before the healthy mocks
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r":generateContent$"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    mount_listing(&server, 1, &["A"]).await;
    mount_listing(&server, 2, &[]).await;
    mount_posting(&server, "A", 6).await;

    let report = crawl(&config).await;

    assert_eq!(report.processed, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(stored_ids(&store_path(&dir)), vec!["A"]);
}

#[tokio::test]
async fn test_unavailable_listing_ends_run() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &store_path(&dir));

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let report = crawl(&config).await;

    assert_eq!(report.processed, 0);
    assert_eq!(report.pages_fetched, 0);
    assert_eq!(report.stop_reason, Some(StopReason::ListingUnavailable { page: 1 }));
}

#[tokio::test]
async fn test_legacy_store_is_migrated_before_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);
    let config = create_test_config(&server, &path);

    fs::write(
        &path,
        format!(
            "{}\n2024-12-01T00:00:00Z,A,true,6,false\n",
            COLUMNS[..5].join(",")
        ),
    )
    .unwrap();

    mount_listing(&server, 1, &["A", "B"]).await;
    mount_listing(&server, 2, &[]).await;
    mount_detail(&server, "A", "<p>unused</p>", 0).await;
    mount_posting(&server, "B", 12).await;

    let report = crawl(&config).await;
    assert_eq!(report.processed, 1);

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], COLUMNS.join(","));
    assert_eq!(lines[1], "2024-12-01T00:00:00Z,A,true,6,false,,,");
    assert_eq!(lines.len(), 3);
    assert!(lines[2].contains(",B,true,12,false,true,2025-02-03,ASAP"), "{}", lines[2]);
}

#[tokio::test]
async fn test_orchestrator_over_opened_store() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &store_path(&dir));

    mount_listing(&server, 1, &["A", "A", "B"]).await;
    mount_listing(&server, 2, &[]).await;
    mount_posting(&server, "A", 6).await;
    mount_posting(&server, "B", 12).await;

    let store = CsvStore::open(store_path(&dir)).unwrap();
    let mut orchestrator = Orchestrator::new(&config, &credential(), store).unwrap();
    let report = orchestrator.run().await;

    assert_eq!(report.processed, 2);
    assert!(orchestrator.phase().is_terminal());
    assert!(orchestrator.store().contains("A"));
    assert_eq!(orchestrator.store().len(), 2);
}

/// CSV store whose append fails for one identifier
struct FailingStore {
    inner: CsvStore,
    fail_for: &'static str,
}

impl DedupStore for FailingStore {
    fn contains(&self, job_id: &str) -> bool {
        self.inner.contains(job_id)
    }

    fn append(&mut self, record: &PostingRecord) -> StoreResult<()> {
        if record.job_id == self.fail_for {
            return Err(StoreError::Io(io::Error::new(io::ErrorKind::Other, "disk full")));
        }
        self.inner.append(record)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

#[tokio::test]
async fn test_append_failure_moves_to_next_posting() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &store_path(&dir));

    mount_listing(&server, 1, &["A", "B", "C"]).await;
    mount_listing(&server, 2, &[]).await;
    mount_posting(&server, "A", 6).await;
    mount_posting(&server, "B", 12).await;
    mount_posting(&server, "C", 3).await;

    let store = FailingStore {
        inner: CsvStore::open(store_path(&dir)).unwrap(),
        fail_for: "B",
    };
    let mut orchestrator = Orchestrator::new(&config, &credential(), store).unwrap();
    let report = orchestrator.run().await;

    assert_eq!(report.processed, 2);
    assert_eq!(report.failed, 1);
    assert!(!orchestrator.store().contains("B"));
    assert_eq!(stored_ids(&store_path(&dir)), vec!["A", "C"]);
}

#[test]
fn test_missing_credential_is_fatal() {
    let err = Credential::from_env("TIDEMARK_TEST_UNSET_CREDENTIAL").unwrap_err();
    assert!(err.to_string().contains("TIDEMARK_TEST_UNSET_CREDENTIAL"));
}
