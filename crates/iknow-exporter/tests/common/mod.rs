//! Shared helpers for the exporter integration tests
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use iknow_exporter::exporter::ExporterOptions;
use iknow_exporter::Exporter;
use iknow_exporter::IknowClient;
use iknow_exporter::IknowMetrics;
use serde_json::json;
use serde_json::Value;
use wiremock::matchers::header;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::matchers::query_param;
use wiremock::Mock;
use wiremock::MockBuilder;
use wiremock::MockServer;

pub const API_TOKEN: &str = "test-token";
pub const CUMULATIVE_PATH: &str = "/api/v2/statistics/learning_engine/cumulative";
pub const AGGREGATE_PATH: &str = "/api/v2/goals/enrolled/memories/aggregate";

pub fn api_base_url(server: &MockServer) -> String {
    format!("{}/api/v2", server.uri())
}

/// Matches an authenticated cumulative stats request
pub fn cumulative_request() -> MockBuilder {
    Mock::given(method("GET"))
        .and(path(CUMULATIVE_PATH))
        .and(query_param("application_domains[]", "items"))
        .and(header("authorization", format!("Bearer {API_TOKEN}").as_str()))
}

/// Matches an authenticated aggregate stats request
pub fn aggregate_request() -> MockBuilder {
    Mock::given(method("GET"))
        .and(path(AGGREGATE_PATH))
        .and(header("authorization", format!("Bearer {API_TOKEN}").as_str()))
}

pub fn cumulative_body(started: u64) -> Value {
    json!({
        "items": {
            "cumulative_items_started": started,
            "cumulative_items_study_time_millis": 0,
            "cumulative_total_log_halflife_millis": 0,
            "cumulative_items_reached_checkpoint_1": 0,
            "cumulative_items_reached_checkpoint_2": 0,
            "cumulative_items_reached_checkpoint_3": 0
        }
    })
}

pub fn aggregate_body(eligible: u64) -> Value {
    json!({
        "goals": [{
            "goal_id": 42,
            "items": {
                "eligible_items_count": eligible,
                "skipped_items_count": 1,
                "studied_items_count": 4
            }
        }],
        "groupings": [{
            "grouping": { "cue_language_code": "ja" },
            "items": {
                "eligible_items_count": 10,
                "skipped_items_count": 2,
                "studied_items_count": 8
            }
        }]
    })
}

pub fn exporter_for(server: &MockServer, options: ExporterOptions) -> (Arc<Exporter>, Arc<IknowMetrics>) {
    let client =
        IknowClient::new(API_TOKEN, api_base_url(server)).expect("should build API client");
    exporter_with_client(client, options)
}

/// Exporter whose requests give up after `timeout`
pub fn exporter_with_timeout(
    server: &MockServer,
    timeout: Duration,
) -> (Arc<Exporter>, Arc<IknowMetrics>) {
    let http = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("should build reqwest client");
    let client = IknowClient::with_http_client(http, API_TOKEN, api_base_url(server));
    exporter_with_client(client, ExporterOptions::default())
}

fn exporter_with_client(
    client: IknowClient,
    options: ExporterOptions,
) -> (Arc<Exporter>, Arc<IknowMetrics>) {
    let metrics = Arc::new(IknowMetrics::new().expect("should register gauges"));
    let exporter = Arc::new(Exporter::new(client, metrics.clone(), options));
    (exporter, metrics)
}

/// Number of requests the mock server received for `request_path`
pub async fn requests_to(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == request_path)
        .count()
}

/// Poll until `request_path` was requested at least `count` times
pub async fn wait_for_requests(server: &MockServer, request_path: &str, count: usize) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while requests_to(server, request_path).await < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("expected {count} requests to {request_path}"));
}
