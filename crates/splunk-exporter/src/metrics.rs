//! Self-observability metrics of the exporter.

use hyper::StatusCode;
use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue, LabelValueEncoder};
use splunk_metrics::{
    Buckets, Counter, Family, Gauge, GlobalRegistry, Histogram, RegistrationError,
};

use std::fmt::{self, Write as _};

/// Outcome of a Splunk API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiCallStatus {
    /// The call was started.
    Attempted,
    /// The call received a successful response.
    Succeeded,
    /// The call failed before receiving a response.
    Errored,
}

impl ApiCallStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Attempted => "attempted",
            Self::Succeeded => "succeeded",
            Self::Errored => "errored",
        }
    }
}

impl fmt::Display for ApiCallStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl EncodeLabelValue for ApiCallStatus {
    fn encode(&self, encoder: &mut LabelValueEncoder<'_>) -> fmt::Result {
        encoder.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, EncodeLabelSet)]
struct ApiCallLabels {
    status: ApiCallStatus,
}

/// Metrics tracking interaction of the exporter with the Splunk API. Metrics are registered
/// in a [`GlobalRegistry`] and are shared among all clones of this struct.
#[derive(Debug, Clone)]
pub struct ExporterMetrics {
    api_calls: Family<ApiCallLabels, Counter>,
    /// Latency of Splunk API requests.
    pub api_request_time: Histogram,
    /// Latency of the entire scrape request.
    pub scrape_time: Histogram,
}

impl ExporterMetrics {
    /// Gets or registers exporter metrics in the provided registry. Can be called any number of times;
    /// all returned instances share the same metrics.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry contains metrics with the same names but other types.
    pub fn initialize(registry: &GlobalRegistry) -> Result<Self, RegistrationError> {
        Ok(Self {
            api_calls: registry.get_or_register(
                "splunk_api_calls",
                "API requests made to Splunk",
                Family::default,
            )?,
            api_request_time: registry.get_or_register(
                "splunk_api_request_time",
                "API request time",
                || Buckets::LATENCIES.histogram(),
            )?,
            scrape_time: registry.get_or_register(
                "splunk_scrape_time",
                "Total Splunk scrape request time",
                || Buckets::LATENCIES.histogram(),
            )?,
        })
    }

    /// Records an API call outcome.
    pub fn record_api_call(&self, status: ApiCallStatus) {
        self.api_calls.get_or_create(&ApiCallLabels { status }).inc();
    }

    /// Returns the number of API calls with the specified outcome.
    pub fn api_calls(&self, status: ApiCallStatus) -> u64 {
        self.api_calls.get_or_create(&ApiCallLabels { status }).get()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, EncodeLabelSet)]
struct CodeLabels {
    code: String,
}

/// Instrumentation of metrics exposition handlers.
#[derive(Debug, Clone)]
pub struct HandlerMetrics {
    requests: Family<CodeLabels, Counter>,
    in_flight: Gauge,
}

impl HandlerMetrics {
    /// Gets or registers handler metrics in the provided registry. Can be called any number of times;
    /// all returned instances share the same metrics.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry contains metrics with the same names but other types.
    pub fn initialize(registry: &GlobalRegistry) -> Result<Self, RegistrationError> {
        Ok(Self {
            requests: registry.get_or_register(
                "promhttp_metric_handler_requests",
                "Total number of scrapes by HTTP status code",
                Family::default,
            )?,
            in_flight: registry.get_or_register(
                "promhttp_metric_handler_requests_in_flight",
                "Current number of scrapes being served",
                Gauge::default,
            )?,
        })
    }

    /// Records a response with the specified status code.
    pub fn record_response(&self, status: StatusCode) {
        self.requests.get_or_create(&Self::code_labels(status)).inc();
    }

    /// Returns the number of responses with the specified status code.
    pub fn responses(&self, status: StatusCode) -> u64 {
        self.requests.get_or_create(&Self::code_labels(status)).get()
    }

    fn code_labels(status: StatusCode) -> CodeLabels {
        CodeLabels {
            code: status.as_u16().to_string(),
        }
    }

    /// Returns the number of requests currently being served.
    pub fn in_flight(&self) -> i64 {
        self.in_flight.get()
    }

    pub(crate) fn track_in_flight(&self) -> InFlightGuard<'_> {
        self.in_flight.inc();
        InFlightGuard {
            gauge: &self.in_flight,
        }
    }
}

/// Decrements the in-flight gauge on drop.
#[derive(Debug)]
pub(crate) struct InFlightGuard<'a> {
    gauge: &'a Gauge,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}
