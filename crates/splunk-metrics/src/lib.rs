//! Metrics registries for the Splunk exporter, based on the `prometheus-client` crate.
//!
//! # Overview
//!
//! - Metrics are represented by [`Counter`]s, [`Gauge`]s and [`Histogram`]s, optionally grouped
//!   into a [`Family`] keyed by a set of labels. Latency histograms are created from [`Buckets`]
//!   and observed via [`HistogramExt`].
//! - Long-lived metrics are registered in the process-wide [`GlobalRegistry`]. Registration
//!   is idempotent: registering a metric with the same name and type returns a handle to the existing
//!   metric, so that components can initialize their metrics any number of times.
//! - Metrics computed outside the registry are provided by [`Collect`] implementations emitting
//!   [`ConstMetric`]s. Collectors are registered in a short-lived [`Registry`], e.g. one created
//!   for a single scrape request.
//! - Both registries can be encoded in one of supported exposition [`Format`]s.
//!
//! # Examples
//!
//! ```
//! use splunk_metrics::{Buckets, Counter, Format, GlobalRegistry, Histogram, HistogramExt};
//!
//! let registry = GlobalRegistry::default();
//! let requests: Counter = registry.get_or_register("requests", "Requests served", Counter::default)?;
//! let latency: Histogram =
//!     registry.get_or_register("latency", "Request latency", || Buckets::LATENCIES.histogram())?;
//!
//! let observer = latency.start();
//! // Serve the request...
//! requests.inc();
//! observer.observe();
//!
//! let mut buffer = String::new();
//! registry.encode(&mut buffer, Format::Prometheus)?;
//! assert!(buffer.contains("requests_total 1"));
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```

// Linter settings.
#![warn(missing_debug_implementations, missing_docs, bare_trait_objects)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::must_use_candidate, clippy::module_name_repetitions)]

pub use prometheus_client::metrics::{
    counter::Counter, family::Family, gauge::Gauge, histogram::Histogram,
};

pub use crate::{
    buckets::Buckets,
    collector::{Collect, ConstMetric},
    descriptors::{MetricDescriptor, MetricKind},
    format::Format,
    latency::{HistogramExt, LatencyObserver},
    registry::{GlobalRegistry, RegistrationError, Registry},
};

mod buckets;
mod collector;
mod descriptors;
mod format;
mod latency;
mod registry;
