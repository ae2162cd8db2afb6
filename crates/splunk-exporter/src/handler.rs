//! HTTP handlers for metrics exposition and Splunk scraping.

use hyper::{header, HeaderMap, Request, Response, StatusCode};
use splunk_metrics::{Format, HistogramExt, Registry};

use std::{fmt, sync::Arc};

use crate::{
    client::SplunkClient,
    collector::TargetCollector,
    metrics::{ExporterMetrics, HandlerMetrics},
};

pub(crate) fn plain_text_response(status: StatusCode, body: String) -> Response<String> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Handler rendering metrics in the format negotiated with the client.
/// The handler instruments itself with [`HandlerMetrics`].
#[derive(Debug, Clone)]
pub struct ExpositionHandler {
    metrics: HandlerMetrics,
}

impl ExpositionHandler {
    /// Creates a handler.
    pub fn new(metrics: HandlerMetrics) -> Self {
        Self { metrics }
    }

    /// Returns metrics of this handler.
    pub fn metrics(&self) -> &HandlerMetrics {
        &self.metrics
    }

    /// Serves metrics written by `encode` in the format negotiated based on request `headers`.
    pub fn serve<F>(&self, headers: &HeaderMap, encode: F) -> Response<String>
    where
        F: FnOnce(&mut String, Format) -> fmt::Result,
    {
        let _in_flight = self.metrics.track_in_flight();
        let accept = headers
            .get(header::ACCEPT)
            .and_then(|value| value.to_str().ok());
        let format = Format::negotiate(accept);

        let mut buffer = String::with_capacity(1_024);
        let response = if encode(&mut buffer, format).is_ok() {
            let mut response = Response::new(buffer);
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                header::HeaderValue::from_static(format.content_type()),
            );
            response
        } else {
            tracing::warn!(?format, "Error encoding metrics");
            plain_text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "error encoding metrics".to_owned(),
            )
        };
        self.metrics.record_response(response.status());
        response
    }
}

/// Handler scraping Splunk health on each request.
///
/// For each request, the handler creates a [`TargetCollector`] and a fresh [`Registry`]
/// containing only this collector, and serves the registry using [`ExpositionHandler`].
#[derive(Debug, Clone)]
pub struct ScrapeHandler {
    client: Arc<SplunkClient>,
    metrics: ExporterMetrics,
    exposition: ExpositionHandler,
    observe_failed_scrapes: bool,
}

impl ScrapeHandler {
    /// Creates a handler.
    pub fn new(client: SplunkClient, metrics: ExporterMetrics, exposition: ExpositionHandler) -> Self {
        Self {
            client: Arc::new(client),
            metrics,
            exposition,
            observe_failed_scrapes: false,
        }
    }

    /// Sets whether scrape latency should be observed for scrapes failed on the Splunk side.
    /// By default, such scrapes are not timed.
    #[must_use]
    pub fn with_failed_scrape_timing(mut self, observe: bool) -> Self {
        self.observe_failed_scrapes = observe;
        self
    }

    /// Handles a scrape request.
    pub async fn handle<B>(&self, request: Request<B>) -> Response<String> {
        let (parts, _) = request.into_parts();
        let latency = self.metrics.scrape_time.start();

        let collector = match TargetCollector::scrape(&self.client, &self.metrics).await {
            Ok(collector) => collector,
            Err(err) => {
                tracing::warn!(%err, "Error scraping Splunk health");
                let exposition_metrics = self.exposition.metrics();
                exposition_metrics.record_response(StatusCode::INTERNAL_SERVER_ERROR);
                if self.observe_failed_scrapes {
                    latency.observe();
                }
                return plain_text_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string());
            }
        };

        let mut registry = Registry::empty();
        let response = match registry.register_collector(collector) {
            Ok(()) => self
                .exposition
                .serve(&parts.headers, |buffer, format| registry.encode(buffer, format)),
            Err(err) => {
                tracing::warn!(%err, "Error registering Splunk health collector");
                let exposition_metrics = self.exposition.metrics();
                exposition_metrics.record_response(StatusCode::INTERNAL_SERVER_ERROR);
                plain_text_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        let latency = latency.observe();
        tracing::debug!(
            latency_sec = latency.as_secs_f64(),
            status = %response.status(),
            "Served Splunk scrape in {latency:?}"
        );
        response
    }
}
