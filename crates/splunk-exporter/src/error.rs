//! Scrape errors.

use reqwest::StatusCode;

use std::error;

use crate::payload::PayloadShapeError;

/// Errors that can occur when scraping the health of a Splunk server.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ScrapeError {
    /// Error building the HTTP request to the Splunk API.
    #[error("error creating HTTP request to scrape URL {url}: {source}")]
    RequestBuild {
        /// Request URL.
        url: String,
        /// Underlying error.
        #[source]
        source: Box<dyn error::Error + Send + Sync>,
    },
    /// Error sending the request or receiving the response.
    #[error("error scraping URL {url}: {source}")]
    Transport {
        /// Request URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// Splunk API responded with a non-200 status.
    #[error("error from Splunk ({status}): {body}")]
    UpstreamStatus {
        /// Response status.
        status: StatusCode,
        /// Response body.
        body: String,
    },
    /// Splunk API responded with invalid JSON.
    #[error("error parsing JSON from URL {url}: {source}")]
    MalformedPayload {
        /// Request URL.
        url: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// Splunk API responded with JSON of an unexpected shape.
    #[error("unexpected Splunk response: {0}")]
    PayloadShape(#[from] PayloadShapeError),
    /// Health string in the Splunk response is not recognized.
    #[error("unknown health string in Splunk response: {0}")]
    UnrecognizedHealth(String),
}
