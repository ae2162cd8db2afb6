//! Latency observation for histograms.

use prometheus_client::metrics::histogram::Histogram;

use std::time::{Duration, Instant};

/// Extension trait for [`Histogram`]s measuring latencies in seconds.
pub trait HistogramExt {
    /// Observes the specified latency.
    fn observe_latency(&self, latency: Duration);

    /// Starts latency observation for the metric. When the observation is finished,
    /// call [`LatencyObserver::observe()`].
    fn start(&self) -> LatencyObserver<'_>;
}

impl HistogramExt for Histogram {
    fn observe_latency(&self, latency: Duration) {
        self.observe(latency.as_secs_f64());
    }

    fn start(&self) -> LatencyObserver<'_> {
        LatencyObserver {
            start: Instant::now(),
            histogram: self,
        }
    }
}

/// Observer of latency for a [`Histogram`].
///
/// Dropping an observer without calling [`Self::observe()`] discards the measurement.
#[must_use = "`LatencyObserver` should be `observe()`d"]
#[derive(Debug)]
pub struct LatencyObserver<'a> {
    start: Instant,
    histogram: &'a Histogram,
}

impl LatencyObserver<'_> {
    /// Returns the latency passed since this observer was created without observing it.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Observes and returns the latency passed since this observer was created.
    pub fn observe(self) -> Duration {
        let elapsed = self.start.elapsed();
        self.histogram.observe_latency(elapsed);
        elapsed
    }
}
