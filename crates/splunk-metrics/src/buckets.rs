//! Histogram buckets.

use prometheus_client::metrics::histogram::Histogram;

/// Buckets configuration for a latency [`Histogram`].
#[derive(Debug, Clone, Copy)]
pub struct Buckets(&'static [f64]);

impl Buckets {
    /// Default buckets configuration for latencies, in seconds.
    pub const LATENCIES: Self =
        Self::values(&[0.001, 0.005, 0.025, 0.1, 0.25, 1.0, 5.0, 30.0, 120.0]);

    /// Creates buckets based on the provided `values`.
    ///
    /// # Panics
    ///
    /// Panics if `values` are empty or are not monotonically increasing.
    pub const fn values(values: &'static [f64]) -> Self {
        assert!(!values.is_empty(), "Values cannot be empty");

        let mut i = 1;
        while i < values.len() {
            assert!(
                values[i] > values[i - 1],
                "Values must be monotonically increasing"
            );
            i += 1;
        }
        Self(values)
    }

    /// Returns bucket upper bounds in the increasing order.
    pub fn iter(self) -> impl Iterator<Item = f64> {
        self.0.iter().copied()
    }

    /// Creates a histogram with these buckets.
    pub fn histogram(self) -> Histogram {
        Histogram::new(self.iter())
    }
}
