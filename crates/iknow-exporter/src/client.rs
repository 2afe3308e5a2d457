//! Authenticated client for the iKnow REST API
//!
//! Every request is a plain `GET` carrying `Authorization: Bearer <secret>`.
//! Only `200 OK` is accepted; any other status, transport failure or
//! undecodable body is surfaced to the caller without retrying.

use core::error::Error;
use core::fmt;

use api_types::AggregateStats;
use api_types::CumulativeStats;
use derive_more::Display;
use error_stack::Report;
use error_stack::ResultExt;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

/// Default API root, endpoint paths are appended to it
pub const DEFAULT_API_BASE_URL: &str = "https://iknow.jp/api/v2";

const CUMULATIVE_STATS_PATH: &str =
    "/statistics/learning_engine/cumulative?application_domains[]=items";
const AGGREGATE_STATS_PATH: &str = "/goals/enrolled/memories/aggregate";

/// Result type for API client operations.
pub type ClientResult<T> = Result<T, Report<ClientError>>;

/// Errors that can occur while fetching statistics
#[derive(Debug, Display)]
pub enum ClientError {
    /// Connection, TLS or body transfer failure
    #[display("Transport error requesting {url}")]
    Transport { url: String },

    /// Upstream answered with anything but `200 OK`
    #[display("API returned non-200 response: {status}")]
    UpstreamStatus { status: u16 },

    /// Body does not match the expected JSON shape
    #[display("Failed to decode response body from {url}")]
    Decode { url: String },

    /// The HTTP client could not be constructed
    #[display("Configuration error: {message}")]
    Configuration { message: String },
}

impl Error for ClientError {}

/// iKnow API client sharing one connection pool across requests
#[derive(Clone)]
pub struct IknowClient {
    http: reqwest::Client,
    secret: String,
    base_url: String,
}

impl fmt::Debug for IknowClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IknowClient")
            .field("base_url", &self.base_url)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl IknowClient {
    /// Create a client for `base_url` authenticating with the bearer `secret`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Configuration`] if the HTTP client cannot be built
    pub fn new(secret: impl Into<String>, base_url: impl Into<String>) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .change_context(ClientError::Configuration {
                message: "Failed to create HTTP client".into(),
            })?;

        Ok(Self::with_http_client(http, secret, base_url))
    }

    /// Build on an already configured `reqwest::Client`
    pub fn with_http_client(
        http: reqwest::Client,
        secret: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            http,
            secret: secret.into(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cumulative_stats_url(&self) -> String {
        format!("{}{}", self.base_url, CUMULATIVE_STATS_PATH)
    }

    pub fn aggregate_stats_url(&self) -> String {
        format!("{}{}", self.base_url, AGGREGATE_STATS_PATH)
    }

    /// Fetch `url` and decode the JSON body into `T`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Transport`] if the request or body transfer fails
    /// - [`ClientError::UpstreamStatus`] if the status is not `200 OK`
    /// - [`ClientError::Decode`] if the body cannot be decoded into `T`
    pub async fn fetch<T: DeserializeOwned>(&self, url: &str) -> ClientResult<T> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.secret)
            .send()
            .await
            .change_context_lazy(|| ClientError::Transport { url: url.into() })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Report::new(ClientError::UpstreamStatus {
                status: status.as_u16(),
            }));
        }

        let body = response
            .bytes()
            .await
            .change_context_lazy(|| ClientError::Transport { url: url.into() })?;

        serde_json::from_slice(&body)
            .change_context_lazy(|| ClientError::Decode { url: url.into() })
    }

    pub async fn cumulative_stats(&self) -> ClientResult<CumulativeStats> {
        self.fetch(&self.cumulative_stats_url()).await
    }

    pub async fn aggregate_stats(&self) -> ClientResult<AggregateStats> {
        self.fetch(&self.aggregate_stats_url()).await
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener as StdTcpListener;
    use std::time::Duration;

    use similar_asserts::assert_eq;
    use wiremock::matchers::header;
    use wiremock::matchers::method;
    use wiremock::matchers::path;
    use wiremock::matchers::query_param;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;

    use super::*;

    fn client_for(mock_server: &MockServer) -> IknowClient {
        IknowClient::new("test-secret", format!("{}/api/v2", mock_server.uri()))
            .expect("should create client")
    }

    #[test]
    fn endpoint_urls_are_built_from_base() {
        let client =
            IknowClient::new("s", "https://example.test/api/v2/").expect("should create client");

        assert_eq!(client.base_url(), "https://example.test/api/v2");
        assert_eq!(
            client.cumulative_stats_url(),
            "https://example.test/api/v2/statistics/learning_engine/cumulative?application_domains[]=items"
        );
        assert_eq!(
            client.aggregate_stats_url(),
            "https://example.test/api/v2/goals/enrolled/memories/aggregate"
        );
    }

    #[test]
    fn debug_output_redacts_secret() {
        let client = IknowClient::new("super-secret", DEFAULT_API_BASE_URL)
            .expect("should create client");

        let debug = format!("{client:?}");

        assert!(!debug.contains("super-secret"), "secret leaked: {debug}");
        assert!(debug.contains("<redacted>"));
    }

    #[tokio::test]
    async fn fetch_sends_bearer_token_and_decodes_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/statistics/learning_engine/cumulative"))
            .and(query_param("application_domains[]", "items"))
            .and(header("Authorization", "Bearer test-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"items": {"cumulative_items_started": 7}}"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let stats = client
            .cumulative_stats()
            .await
            .expect("should fetch cumulative stats");

        assert_eq!(stats["items"].started, 7);
    }

    #[tokio::test]
    async fn non_200_status_is_upstream_status_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/goals/enrolled/memories/aggregate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let report = client
            .aggregate_stats()
            .await
            .expect_err("500 should fail");

        assert!(matches!(
            report.current_context(),
            ClientError::UpstreamStatus { status: 500 }
        ));
    }

    #[tokio::test]
    async fn other_success_codes_are_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let report = client
            .aggregate_stats()
            .await
            .expect_err("only 200 is accepted");

        assert!(matches!(
            report.current_context(),
            ClientError::UpstreamStatus { status: 204 }
        ));
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let report = client
            .cumulative_stats()
            .await
            .expect_err("malformed JSON should fail");

        assert!(matches!(
            report.current_context(),
            ClientError::Decode { .. }
        ));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        // bind then release a port so nothing is listening on it
        let listener = StdTcpListener::bind("127.0.0.1:0").expect("bind std listener");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);

        let client = IknowClient::new("s", format!("http://127.0.0.1:{port}/api/v2"))
            .expect("should create client");
        let report = client
            .cumulative_stats()
            .await
            .expect_err("connection should be refused");

        assert!(matches!(
            report.current_context(),
            ClientError::Transport { .. }
        ));
    }

    #[tokio::test]
    async fn slow_response_is_transport_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{}")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&mock_server)
            .await;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("should build reqwest client");
        let client =
            IknowClient::with_http_client(http, "s", format!("{}/api/v2", mock_server.uri()));
        let report = client
            .cumulative_stats()
            .await
            .expect_err("request should time out");

        assert!(matches!(
            report.current_context(),
            ClientError::Transport { .. }
        ));
    }

    #[test]
    fn client_error_display_formatting() {
        assert_eq!(
            ClientError::UpstreamStatus { status: 503 }.to_string(),
            "API returned non-200 response: 503"
        );
        assert_eq!(
            ClientError::Transport {
                url: "http://x/y".into()
            }
            .to_string(),
            "Transport error requesting http://x/y"
        );
        assert_eq!(
            ClientError::Decode {
                url: "http://x/y".into()
            }
            .to_string(),
            "Failed to decode response body from http://x/y"
        );
    }
}
