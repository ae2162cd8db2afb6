//! Prometheus exporter for the health of a Splunk server process.
//!
//! On each request to the scrape path, the exporter queries the Splunk health details API
//! (`/services/server/health/splunkd/details`), maps the reported health (`green`, `yellow` or `red`)
//! to a number and serves it as the `splunk_health` gauge. Each scrape uses a fresh request-scoped
//! [`Registry`](splunk_metrics::Registry) containing a single [`TargetCollector`].
//!
//! The exporter also tracks its own behavior in a [`GlobalRegistry`](splunk_metrics::GlobalRegistry)
//! served on the metrics path:
//!
//! - `splunk_api_calls_total{status}`: Splunk API calls by outcome (`attempted`, `succeeded`
//!   or `errored`)
//! - `splunk_api_request_time`: Splunk API request latency
//! - `splunk_scrape_time`: latency of the entire scrape
//! - `promhttp_metric_handler_requests_total{code}` and `promhttp_metric_handler_requests_in_flight`:
//!   scrape requests by the response status code, and scrape requests being served
//!
//! # Examples
//!
//! ```no_run
//! use splunk_exporter::{Credentials, Exporter, SplunkClient};
//! use splunk_metrics::GlobalRegistry;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let client = SplunkClient::new(
//!     reqwest::Client::new(),
//!     "https://localhost:8089".parse()?,
//!     Credentials::new("admin", "changeme"),
//! );
//! let exporter = Exporter::new(client, Arc::clone(GlobalRegistry::global()))?;
//! exporter.start("0.0.0.0:9042".parse()?).await?;
//! # Ok(())
//! # }
//! ```

// Linter settings.
#![warn(missing_debug_implementations, missing_docs, bare_trait_objects)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::must_use_candidate, clippy::module_name_repetitions)]

pub use crate::{
    client::{Credentials, SplunkClient, HEALTH_DETAILS_PATH},
    collector::{TargetCollector, HEALTH_METRIC_NAME},
    config::{Config, ConfigError},
    error::ScrapeError,
    handler::{ExpositionHandler, ScrapeHandler},
    health::{map_health, HealthScore, HealthStatus},
    metrics::{ApiCallStatus, ExporterMetrics, HandlerMetrics},
    payload::{extract_health, PayloadSegment, PayloadShapeError, ShapeProblem},
    server::{Exporter, ExporterServer, DEFAULT_METRICS_PATH, DEFAULT_SCRAPE_PATH},
};

mod client;
mod collector;
mod config;
mod error;
mod handler;
mod health;
mod metrics;
mod payload;
mod server;
#[cfg(test)]
mod testonly;
