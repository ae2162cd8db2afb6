//! Collectors producing metrics computed outside the registry.

use prometheus_client::{
    collector::Collector,
    encoding::{DescriptorEncoder, EncodeMetric, MetricEncoder},
    metrics::{counter::ConstCounter, gauge::ConstGauge},
};

use std::fmt;

use crate::descriptors::{MetricDescriptor, MetricKind};

/// Source of metrics computed outside the registry (e.g., a snapshot taken for a single scrape).
///
/// A registry calls [`Self::describe()`] when the collector is registered and on each encoding,
/// followed by [`Self::collect()`]. Both methods may be called any number of times in any order,
/// so implementations should be side-effect-free.
pub trait Collect: fmt::Debug + Send + Sync + 'static {
    /// Enumerates descriptors of all metrics produced by this collector. Descriptor names
    /// must be unique.
    fn describe(&self) -> Box<dyn Iterator<Item = &MetricDescriptor> + '_>;

    /// Enumerates metrics produced by this collector. Each metric must have a descriptor
    /// returned from [`Self::describe()`]; other metrics are not encoded. Only the first unlabeled
    /// metric for each descriptor is encoded.
    fn collect(&self) -> Box<dyn Iterator<Item = &ConstMetric> + '_>;
}

/// Immutable metric: a descriptor together with a label set and a value.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstMetric {
    descriptor: MetricDescriptor,
    labels: Vec<(String, String)>,
    value: f64,
}

impl ConstMetric {
    /// Creates an unlabeled gauge.
    pub fn gauge(name: &'static str, help: &'static str, value: f64) -> Self {
        Self {
            descriptor: MetricDescriptor::gauge(name, help),
            labels: vec![],
            value,
        }
    }

    #[cfg(test)]
    pub(crate) fn counter(name: &'static str, help: &'static str, value: f64) -> Self {
        Self {
            descriptor: MetricDescriptor::counter(name, help),
            labels: vec![],
            value,
        }
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((name.into(), value.into()));
        self
    }

    /// Returns the descriptor of this metric.
    pub fn descriptor(&self) -> &MetricDescriptor {
        &self.descriptor
    }

    /// Returns labels of this metric.
    pub fn labels(&self) -> &[(String, String)] {
        &self.labels
    }

    /// Returns the value of this metric.
    pub fn value(&self) -> f64 {
        self.value
    }

    fn encode_sample(&self, encoder: MetricEncoder<'_>) -> fmt::Result {
        match self.descriptor.kind {
            MetricKind::Counter => ConstCounter::new(self.value).encode(encoder),
            MetricKind::Gauge => ConstGauge::new(self.value).encode(encoder),
        }
    }
}

/// Adapter of [`Collect`] to the `prometheus-client` collector interface.
#[derive(Debug)]
pub(crate) struct CollectorAdapter<C>(pub C);

impl<C: Collect> Collector for CollectorAdapter<C> {
    fn encode(&self, mut encoder: DescriptorEncoder<'_>) -> fmt::Result {
        for descriptor in self.0.describe() {
            let mut metric_encoder = encoder.encode_descriptor(
                descriptor.name,
                descriptor.help,
                None,
                descriptor.kind.metric_type(),
            )?;
            let metrics = self
                .0
                .collect()
                .filter(|metric| metric.descriptor.name == descriptor.name);

            let mut unlabeled = None;
            for metric in metrics {
                if metric.labels.is_empty() {
                    // An unlabeled sample consumes the encoder, so only the first one is encoded.
                    unlabeled.get_or_insert(metric);
                } else {
                    let family_encoder = metric_encoder.encode_family(&metric.labels)?;
                    metric.encode_sample(family_encoder)?;
                }
            }
            if let Some(metric) = unlabeled {
                metric.encode_sample(metric_encoder)?;
            }
        }
        Ok(())
    }
}
