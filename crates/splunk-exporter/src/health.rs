//! Splunk health statuses and their numeric projection.

use std::fmt;

use crate::error::ScrapeError;

/// Health of the Splunk server process as reported by the health details API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// The process is healthy.
    Green,
    /// The process is degraded.
    Yellow,
    /// The process is unhealthy.
    Red,
    /// Health string not recognized by the exporter.
    Unrecognized(String),
}

impl HealthStatus {
    /// Parses a raw health string. Parsing is case-sensitive; the upstream API only uses lowercase
    /// codes.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "green" => Self::Green,
            "yellow" => Self::Yellow,
            "red" => Self::Red,
            _ => Self::Unrecognized(raw.to_owned()),
        }
    }

    /// Projects this status to a numeric score.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::UnrecognizedHealth`] for an unrecognized status.
    pub fn score(&self) -> Result<HealthScore, ScrapeError> {
        match self {
            Self::Green => Ok(HealthScore::GREEN),
            Self::Yellow => Ok(HealthScore::YELLOW),
            Self::Red => Ok(HealthScore::RED),
            Self::Unrecognized(raw) => Err(ScrapeError::UnrecognizedHealth(raw.clone())),
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
            Self::Unrecognized(raw) => raw,
        })
    }
}

/// Numeric projection of a [`HealthStatus`] in the `[0, 1]` range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthScore(f64);

impl HealthScore {
    /// Score for [`HealthStatus::Green`].
    pub const GREEN: Self = Self(1.0);
    /// Score for [`HealthStatus::Yellow`].
    pub const YELLOW: Self = Self(0.5);
    /// Score for [`HealthStatus::Red`].
    pub const RED: Self = Self(0.0);

    /// Returns the numeric value of this score.
    pub fn value(self) -> f64 {
        self.0
    }
}

/// Maps a raw health string to a numeric score.
///
/// # Errors
///
/// Returns [`ScrapeError::UnrecognizedHealth`] carrying `raw` if it's not one of `green`, `yellow`
/// or `red`.
pub fn map_health(raw: &str) -> Result<HealthScore, ScrapeError> {
    HealthStatus::parse(raw).score()
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn mapping_known_statuses() {
        assert_eq!(map_health("green").unwrap().value(), 1.0);
        assert_eq!(map_health("yellow").unwrap().value(), 0.5);
        assert_eq!(map_health("red").unwrap().value(), 0.0);
    }

    #[test]
    fn mapping_unknown_statuses() {
        for raw in ["", "Green", "RED", "unknown", " green"] {
            let err = map_health(raw).unwrap_err();
            assert_matches!(&err, ScrapeError::UnrecognizedHealth(value) if value == raw);
        }
    }

    #[test]
    fn unrecognized_status_is_displayed_verbatim() {
        let status = HealthStatus::parse("purple");
        assert_eq!(status, HealthStatus::Unrecognized("purple".to_owned()));
        assert_eq!(status.to_string(), "purple");
        let err = status.score().unwrap_err();
        assert!(err.to_string().contains("purple"), "{err}");
    }
}
