//! Client for the Splunk health details API.

use reqwest::{Client, Request, StatusCode};
use splunk_metrics::HistogramExt;
use url::Url;

use std::fmt;

use crate::{
    error::ScrapeError,
    health::HealthStatus,
    metrics::{ApiCallStatus, ExporterMetrics},
    payload,
};

/// Path to the health details API relative to the Splunk management URL.
pub const HEALTH_DETAILS_PATH: &str = "services/server/health/splunkd/details?output_mode=json";

/// Basic auth credentials for the Splunk API.
#[derive(Clone, Default)]
pub struct Credentials {
    username: String,
    password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"_")
            .finish()
    }
}

impl Credentials {
    /// Creates credentials with the specified username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Client querying the health of a single Splunk server.
#[derive(Debug, Clone)]
pub struct SplunkClient {
    http: Client,
    base_url: Url,
    credentials: Credentials,
}

impl SplunkClient {
    /// Creates a client. TLS settings and timeouts are taken from the provided HTTP client.
    /// `base_url` is the Splunk management URL, such as `https://localhost:8089`.
    pub fn new(http: Client, mut base_url: Url, credentials: Credentials) -> Self {
        // Otherwise, the last path segment would be replaced when joining the API path.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            http,
            base_url,
            credentials,
        }
    }

    /// Returns the base URL of the Splunk API.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn build_request(&self) -> Result<Request, ScrapeError> {
        let url = self
            .base_url
            .join(HEALTH_DETAILS_PATH)
            .map_err(|err| ScrapeError::RequestBuild {
                url: format!("{}{HEALTH_DETAILS_PATH}", self.base_url),
                source: err.into(),
            })?;
        self.http
            .get(url.clone())
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .build()
            .map_err(|err| ScrapeError::RequestBuild {
                url: url.to_string(),
                source: err.into(),
            })
    }

    /// Fetches the health of the Splunk server. Outcomes of the API call are reported to `metrics`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be performed, Splunk responds with a non-200 status,
    /// or the response cannot be parsed.
    pub async fn fetch_health(
        &self,
        metrics: &ExporterMetrics,
    ) -> Result<HealthStatus, ScrapeError> {
        metrics.record_api_call(ApiCallStatus::Attempted);
        let request = self.build_request().inspect_err(|_| {
            metrics.record_api_call(ApiCallStatus::Errored);
        })?;
        let url = request.url().to_string();

        let latency = metrics.api_request_time.start();
        let response = match self.http.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                metrics.record_api_call(ApiCallStatus::Errored);
                return Err(ScrapeError::Transport { url, source: err });
            }
        };
        let latency = latency.observe();
        let status = response.status();
        tracing::debug!(
            latency_sec = latency.as_secs_f64(),
            %status,
            %url,
            "Received response from Splunk API"
        );

        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                metrics.record_api_call(ApiCallStatus::Errored);
                return Err(ScrapeError::Transport { url, source: err });
            }
        };
        if status != StatusCode::OK {
            return Err(ScrapeError::UpstreamStatus { status, body });
        }
        metrics.record_api_call(ApiCallStatus::Succeeded);

        let payload: serde_json::Value = serde_json::from_str(&body)
            .map_err(|source| ScrapeError::MalformedPayload { url, source })?;
        let health = payload::extract_health(&payload)?;
        Ok(HealthStatus::parse(health))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use splunk_metrics::GlobalRegistry;

    use std::net::{Ipv4Addr, SocketAddr, TcpListener};

    use super::*;
    use crate::{
        payload::{PayloadSegment, PayloadShapeError, ShapeProblem},
        testonly::{start_truncating_server, MockSplunk},
    };

    fn test_client(base_url: &str) -> SplunkClient {
        let base_url = base_url.parse().unwrap();
        SplunkClient::new(
            Client::new(),
            base_url,
            Credentials::new("admin", "changeme"),
        )
    }

    fn assert_api_calls(metrics: &ExporterMetrics, attempted: u64, succeeded: u64, errored: u64) {
        assert_eq!(metrics.api_calls(ApiCallStatus::Attempted), attempted);
        assert_eq!(metrics.api_calls(ApiCallStatus::Succeeded), succeeded);
        assert_eq!(metrics.api_calls(ApiCallStatus::Errored), errored);
    }

    #[test]
    fn base_url_path_is_preserved() {
        let client = test_client("https://splunk.example.com:8089/proxy");
        let url = client.base_url().join(HEALTH_DETAILS_PATH).unwrap();
        assert_eq!(
            url.as_str(),
            "https://splunk.example.com:8089/proxy/services/server/health/splunkd/details?output_mode=json"
        );
    }

    #[test]
    fn credentials_are_redacted() {
        let credentials = Credentials::new("admin", "changeme");
        let debug_str = format!("{credentials:?}");
        assert!(debug_str.contains("admin"), "{debug_str}");
        assert!(!debug_str.contains("changeme"), "{debug_str}");
    }

    #[tokio::test]
    async fn fetching_health() {
        let mock = MockSplunk::ok(r#"{"entry":[{"content":{"health":"yellow"}}]}"#).await;
        let registry = GlobalRegistry::default();
        let metrics = ExporterMetrics::initialize(&registry).unwrap();

        let client = test_client(&mock.url());
        let health = client.fetch_health(&metrics).await.unwrap();
        assert_eq!(health, HealthStatus::Yellow);
        assert_api_calls(&metrics, 1, 1, 0);

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(
            request.path_and_query,
            "/services/server/health/splunkd/details?output_mode=json"
        );
        // `admin:changeme` in Base64
        assert_eq!(
            request.authorization.as_deref(),
            Some("Basic YWRtaW46Y2hhbmdlbWU=")
        );
    }

    #[tokio::test]
    async fn error_status_from_splunk() {
        let mock = MockSplunk::new(StatusCode::UNAUTHORIZED, "Login failed: bad credentials").await;
        let registry = GlobalRegistry::default();
        let metrics = ExporterMetrics::initialize(&registry).unwrap();

        let err = test_client(&mock.url())
            .fetch_health(&metrics)
            .await
            .unwrap_err();
        assert_matches!(
            &err,
            ScrapeError::UpstreamStatus { status: StatusCode::UNAUTHORIZED, body }
                if body == "Login failed: bad credentials"
        );
        assert!(
            err.to_string().contains("Login failed: bad credentials"),
            "{err}"
        );
        // Neither success nor error is recorded for non-200 responses.
        assert_api_calls(&metrics, 1, 0, 0);
    }

    #[tokio::test]
    async fn malformed_payloads() {
        let registry = GlobalRegistry::default();
        let metrics = ExporterMetrics::initialize(&registry).unwrap();

        let mock = MockSplunk::ok("<html>Not JSON</html>").await;
        let err = test_client(&mock.url())
            .fetch_health(&metrics)
            .await
            .unwrap_err();
        assert_matches!(&err, ScrapeError::MalformedPayload { url, .. } if url.starts_with(&mock.url()));

        let mock = MockSplunk::ok(r#"{"entry":[]}"#).await;
        let err = test_client(&mock.url())
            .fetch_health(&metrics)
            .await
            .unwrap_err();
        assert_matches!(
            err,
            ScrapeError::PayloadShape(PayloadShapeError {
                segment: PayloadSegment::FirstEntry,
                problem: ShapeProblem::Missing,
            })
        );
        assert_api_calls(&metrics, 2, 2, 0);
    }

    #[tokio::test]
    async fn unrecognized_health_is_returned_as_is() {
        let mock = MockSplunk::ok(r#"{"entry":[{"content":{"health":"purple"}}]}"#).await;
        let registry = GlobalRegistry::default();
        let metrics = ExporterMetrics::initialize(&registry).unwrap();

        let health = test_client(&mock.url())
            .fetch_health(&metrics)
            .await
            .unwrap();
        assert_eq!(health, HealthStatus::Unrecognized("purple".to_owned()));
    }

    #[tokio::test]
    async fn unreachable_splunk() {
        // Bind and immediately drop a listener to get a port nobody listens on.
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        drop(listener);

        let registry = GlobalRegistry::default();
        let metrics = ExporterMetrics::initialize(&registry).unwrap();
        let err = test_client(&format!("http://{addr}"))
            .fetch_health(&metrics)
            .await
            .unwrap_err();
        assert_matches!(&err, ScrapeError::Transport { url, .. } if url.contains(&addr.to_string()));
        assert_api_calls(&metrics, 1, 0, 1);
    }

    #[tokio::test]
    async fn request_build_error() {
        let registry = GlobalRegistry::default();
        let metrics = ExporterMetrics::initialize(&registry).unwrap();
        let err = test_client("file:///tmp/splunk")
            .fetch_health(&metrics)
            .await
            .unwrap_err();

        assert_matches!(
            &err,
            ScrapeError::RequestBuild { url, .. } if url.starts_with("file:///tmp/splunk/services/")
        );
        assert_api_calls(&metrics, 1, 0, 1);
    }

    #[tokio::test]
    async fn truncated_response_body() {
        let addr = start_truncating_server(r#"{"entry":[{"content":"#).await;
        let registry = GlobalRegistry::default();
        let metrics = ExporterMetrics::initialize(&registry).unwrap();

        let err = test_client(&format!("http://{addr}"))
            .fetch_health(&metrics)
            .await
            .unwrap_err();
        assert_matches!(&err, ScrapeError::Transport { url, .. } if url.contains(&addr.to_string()));
        assert_api_calls(&metrics, 1, 0, 1);
    }
}
