//! Metric descriptors.

use prometheus_client::metrics::MetricType;

/// Kind of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum MetricKind {
    /// Monotonically non-decreasing cumulative total.
    Counter,
    /// Point-in-time value that can arbitrarily go up or down.
    Gauge,
}

impl MetricKind {
    pub(crate) fn metric_type(self) -> MetricType {
        match self {
            Self::Counter => MetricType::Counter,
            Self::Gauge => MetricType::Gauge,
        }
    }
}

/// Descriptor for a single metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    /// Name of the metric. For counters, this **excludes** the `_total` suffix which is added
    /// to reported values during encoding.
    pub name: &'static str,
    /// Help for the metric exported to Prometheus.
    pub help: &'static str,
    /// Kind of the metric.
    pub kind: MetricKind,
}

impl MetricDescriptor {
    /// Creates a gauge descriptor.
    pub const fn gauge(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            kind: MetricKind::Gauge,
        }
    }

    /// Creates a counter descriptor.
    pub const fn counter(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            kind: MetricKind::Counter,
        }
    }
}
