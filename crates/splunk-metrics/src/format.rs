//! Support for metrics exposition formats and content negotiation.

use std::{fmt, mem};

/// Metrics exposition format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Format {
    /// [OpenMetrics text format][om]. This is the original format produced by [`prometheus-client`].
    ///
    /// [om]: https://github.com/OpenObservability/OpenMetrics/blob/main/specification/OpenMetrics.md
    /// [`prometheus-client`]: https://docs.rs/prometheus-client/
    OpenMetrics,
    /// [Prometheus text format][prom], version 0.0.4. It's obtained by a streaming transform
    /// of OpenMetrics-encoded metrics that names counter families with the `_total` suffix
    /// (so that sample names are the same in both formats), and removes `# UNIT` lines
    /// and the `# EOF` terminator.
    ///
    /// [prom]: https://prometheus.io/docs/instrumenting/exposition_formats/
    Prometheus,
}

impl Format {
    /// Content type for the OpenMetrics text format.
    pub const OPEN_METRICS_CONTENT_TYPE: &'static str =
        "application/openmetrics-text; version=1.0.0; charset=utf-8";
    /// Content type for the Prometheus text format.
    pub const PROMETHEUS_CONTENT_TYPE: &'static str = "text/plain; version=0.0.4; charset=utf-8";

    const OPEN_METRICS_MEDIA_TYPE: &'static str = "application/openmetrics-text";

    /// Returns the content type of responses in this format.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::OpenMetrics => Self::OPEN_METRICS_CONTENT_TYPE,
            Self::Prometheus => Self::PROMETHEUS_CONTENT_TYPE,
        }
    }

    /// Chooses the format based on the value of the `Accept` HTTP header. OpenMetrics is chosen
    /// if the client accepts it; otherwise, or if the header is absent, the Prometheus text format
    /// is used.
    pub fn negotiate(accept: Option<&str>) -> Self {
        let Some(accept) = accept else {
            return Self::Prometheus;
        };

        let accepts_open_metrics = accept.split(',').any(|media_range| {
            let mut parts = media_range.split(';').map(str::trim);
            let media_type = parts.next().unwrap_or_default();
            if !media_type.eq_ignore_ascii_case(Self::OPEN_METRICS_MEDIA_TYPE) {
                return false;
            }
            // `q=0` explicitly marks the media type as not acceptable.
            !parts.any(|param| {
                param
                    .strip_prefix("q=")
                    .and_then(|quality| quality.parse::<f64>().ok())
                    .is_some_and(|quality| quality <= 0.0)
            })
        });

        if accepts_open_metrics {
            Self::OpenMetrics
        } else {
            Self::Prometheus
        }
    }
}

/// Transforms the OpenMetrics text format into the Prometheus one line by line.
#[must_use = "Must be `flush()`ed to not lose the last line"]
#[derive(Debug)]
pub(crate) struct PrometheusWrapper<'a, W> {
    writer: &'a mut W,
    pending_help: Option<String>,
    last_line: String,
}

impl<'a, W: fmt::Write> PrometheusWrapper<'a, W> {
    pub(crate) fn new(writer: &'a mut W) -> Self {
        Self {
            writer,
            pending_help: None,
            last_line: String::new(),
        }
    }

    fn handle_line(&mut self) -> fmt::Result {
        let line = mem::take(&mut self.last_line);
        if line == "# EOF" || line.starts_with("# UNIT ") {
            return Ok(());
        }
        if line.starts_with("# HELP ") {
            // `HELP` precedes `TYPE`, so we can only decide on its metric name after seeing the type.
            self.flush_pending_help()?;
            self.pending_help = Some(line);
            return Ok(());
        }

        if let Some(type_def) = line.strip_prefix("# TYPE ") {
            let (name, ty) = type_def
                .trim()
                .split_once(|ch: char| ch.is_ascii_whitespace())
                .ok_or(fmt::Error)?;
            if ty == "counter" && !name.ends_with("_total") {
                if let Some(help) = self.pending_help.take() {
                    let help_text = help
                        .strip_prefix("# HELP ")
                        .and_then(|rest| rest.strip_prefix(name))
                        .ok_or(fmt::Error)?;
                    writeln!(self.writer, "# HELP {name}_total{help_text}")?;
                }
                return writeln!(self.writer, "# TYPE {name}_total {ty}");
            }
        }

        self.flush_pending_help()?;
        writeln!(self.writer, "{line}")
    }

    fn flush_pending_help(&mut self) -> fmt::Result {
        if let Some(help) = self.pending_help.take() {
            writeln!(self.writer, "{help}")?;
        }
        Ok(())
    }

    pub(crate) fn flush(mut self) -> fmt::Result {
        if !self.last_line.is_empty() {
            self.handle_line()?;
        }
        self.flush_pending_help()
    }
}

impl<W: fmt::Write> fmt::Write for PrometheusWrapper<'_, W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let lines: Vec<_> = s.lines().collect();
        for (i, line) in lines.iter().enumerate() {
            self.last_line.push_str(line);
            if i + 1 < lines.len() || s.ends_with('\n') {
                self.handle_line()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Write as _;

    use super::*;

    #[test]
    fn translating_split_writes() {
        let mut buffer = String::new();
        let mut wrapper = PrometheusWrapper::new(&mut buffer);

        // Emulating breaking line into multiple write instructions
        write!(wrapper, "# HELP ").unwrap();
        write!(wrapper, "http_requests").unwrap();
        write!(wrapper, " ").unwrap();
        writeln!(wrapper, "Number of HTTP requests.").unwrap();

        write!(wrapper, "# TYPE ").unwrap();
        write!(wrapper, "http_requests").unwrap();
        write!(wrapper, " ").unwrap();
        writeln!(wrapper, "counter").unwrap();

        write!(wrapper, "http_requests").unwrap();
        write!(wrapper, "_total").unwrap();
        write!(wrapper, "{{").unwrap();
        write!(wrapper, "method=\"").unwrap();
        write!(wrapper, "call").unwrap();
        write!(wrapper, "\"}} ").unwrap();
        writeln!(wrapper, "42").unwrap();

        writeln!(wrapper, "# EOF").unwrap();

        wrapper.flush().unwrap();
        let lines: Vec<_> = buffer.lines().collect();
        assert_eq!(
            lines,
            [
                "# HELP http_requests_total Number of HTTP requests.",
                "# TYPE http_requests_total counter",
                "http_requests_total{method=\"call\"} 42",
            ]
        );
    }

    #[test]
    fn translating_sample() {
        let input = "\
            # HELP splunk_api_calls API requests made to Splunk.\n\
            # TYPE splunk_api_calls counter\n\
            splunk_api_calls_total{status=\"attempted\"} 3\n\
            # TYPE splunk_health gauge\n\
            # UNIT splunk_health ratio\n\
            splunk_health 0.5\n\
            # HELP splunk_scrape_time Total Splunk scrape request time.\n\
            # TYPE splunk_scrape_time histogram\n\
            splunk_scrape_time_count 1\n\
            # EOF";
        let expected = "\
            # HELP splunk_api_calls_total API requests made to Splunk.\n\
            # TYPE splunk_api_calls_total counter\n\
            splunk_api_calls_total{status=\"attempted\"} 3\n\
            # TYPE splunk_health gauge\n\
            splunk_health 0.5\n\
            # HELP splunk_scrape_time Total Splunk scrape request time.\n\
            # TYPE splunk_scrape_time histogram\n\
            splunk_scrape_time_count 1\n";

        let mut buffer = String::new();
        let mut wrapper = PrometheusWrapper::new(&mut buffer);
        wrapper.write_str(input).unwrap();
        wrapper.flush().unwrap();

        assert_eq!(buffer, expected);
    }

    #[test]
    fn negotiating_format() {
        assert_eq!(Format::negotiate(None), Format::Prometheus);
        assert_eq!(Format::negotiate(Some("*/*")), Format::Prometheus);
        assert_eq!(Format::negotiate(Some("text/plain")), Format::Prometheus);

        let prometheus_accept = "application/openmetrics-text;version=1.0.0;q=0.5,\
            application/openmetrics-text;version=0.0.1;q=0.4,text/plain;version=0.0.4;q=0.3,*/*;q=0.1";
        assert_eq!(
            Format::negotiate(Some(prometheus_accept)),
            Format::OpenMetrics
        );
        assert_eq!(
            Format::negotiate(Some("application/openmetrics-text;q=0, text/plain")),
            Format::Prometheus
        );
        assert_eq!(
            Format::negotiate(Some("Application/OpenMetrics-Text")),
            Format::OpenMetrics
        );
    }

    #[test]
    fn content_types() {
        assert!(Format::OpenMetrics
            .content_type()
            .starts_with("application/openmetrics-text"));
        assert!(Format::Prometheus.content_type().starts_with("text/plain"));
    }
}
