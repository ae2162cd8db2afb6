//! Collector of Splunk health for a single scrape.

use splunk_metrics::{Collect, ConstMetric, MetricDescriptor};

use std::iter;

use crate::{
    client::SplunkClient, error::ScrapeError, health::HealthScore, metrics::ExporterMetrics,
};

/// Name of the health gauge.
pub const HEALTH_METRIC_NAME: &str = "splunk_health";
const HEALTH_METRIC_HELP: &str = "Splunk process health";

/// Collector wrapping a snapshot of Splunk health taken for a single scrape request.
#[derive(Debug, Clone)]
pub struct TargetCollector {
    health: ConstMetric,
}

impl TargetCollector {
    /// Scrapes Splunk health using the provided client.
    ///
    /// # Errors
    ///
    /// Proxies client errors, and returns an error if the health string is not recognized.
    pub async fn scrape(
        client: &SplunkClient,
        metrics: &ExporterMetrics,
    ) -> Result<Self, ScrapeError> {
        let status = client.fetch_health(metrics).await?;
        let score = status.score()?;
        tracing::debug!(%status, score = score.value(), "Scraped Splunk health");
        Ok(Self::from_score(score))
    }

    /// Creates a collector from a known health score.
    pub fn from_score(score: HealthScore) -> Self {
        Self {
            health: ConstMetric::gauge(HEALTH_METRIC_NAME, HEALTH_METRIC_HELP, score.value()),
        }
    }

    /// Returns the health metric produced by this collector.
    pub fn health(&self) -> &ConstMetric {
        &self.health
    }
}

impl Collect for TargetCollector {
    fn describe(&self) -> Box<dyn Iterator<Item = &MetricDescriptor> + '_> {
        Box::new(iter::once(self.health.descriptor()))
    }

    fn collect(&self) -> Box<dyn Iterator<Item = &ConstMetric> + '_> {
        Box::new(iter::once(&self.health))
    }
}
