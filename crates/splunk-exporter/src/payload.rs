//! Navigation of the health details JSON payload.

use serde_json::Value;

use std::{error, fmt};

/// Segment of the path to the health string in the health details payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadSegment {
    /// Top-level `entry` array.
    Entry,
    /// First element of the `entry` array.
    FirstEntry,
    /// `content` object in the first entry.
    Content,
    /// `health` string in the content.
    Health,
}

impl PayloadSegment {
    fn path(self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::FirstEntry => "entry[0]",
            Self::Content => "entry[0].content",
            Self::Health => "entry[0].content.health",
        }
    }

    fn expected_type(self) -> &'static str {
        match self {
            Self::Entry => "array",
            Self::FirstEntry | Self::Content => "object",
            Self::Health => "string",
        }
    }
}

/// Problem with a [`PayloadSegment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeProblem {
    /// Segment is absent.
    Missing,
    /// Segment has an unexpected JSON type.
    WrongType,
}

/// Error navigating the health details payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadShapeError {
    /// Segment that cannot be navigated.
    pub segment: PayloadSegment,
    /// What is wrong with the segment.
    pub problem: ShapeProblem,
}

impl fmt::Display for PayloadShapeError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.segment.path();
        match self.problem {
            ShapeProblem::Missing => write!(formatter, "`{path}` is missing"),
            ShapeProblem::WrongType => write!(
                formatter,
                "`{path}` has unexpected type (expected {})",
                self.segment.expected_type()
            ),
        }
    }
}

impl error::Error for PayloadShapeError {}

impl PayloadShapeError {
    fn missing(segment: PayloadSegment) -> Self {
        Self {
            segment,
            problem: ShapeProblem::Missing,
        }
    }

    fn wrong_type(segment: PayloadSegment) -> Self {
        Self {
            segment,
            problem: ShapeProblem::WrongType,
        }
    }
}

/// Extracts the health string from the health details payload, i.e. `entry[0].content.health`.
/// Other entries are ignored.
///
/// # Errors
///
/// Returns an error if any segment on the path is missing or has an unexpected type.
pub fn extract_health(payload: &Value) -> Result<&str, PayloadShapeError> {
    let entries = payload
        .get("entry")
        .ok_or(PayloadShapeError::missing(PayloadSegment::Entry))?
        .as_array()
        .ok_or(PayloadShapeError::wrong_type(PayloadSegment::Entry))?;
    tracing::debug!(len = entries.len(), "Got entries from Splunk payload");

    let first_entry = entries
        .first()
        .ok_or(PayloadShapeError::missing(PayloadSegment::FirstEntry))?
        .as_object()
        .ok_or(PayloadShapeError::wrong_type(PayloadSegment::FirstEntry))?;

    let content = first_entry
        .get("content")
        .ok_or(PayloadShapeError::missing(PayloadSegment::Content))?
        .as_object()
        .ok_or(PayloadShapeError::wrong_type(PayloadSegment::Content))?;
    tracing::debug!(?content, "Got health content from Splunk payload");

    let health = content
        .get("health")
        .ok_or(PayloadShapeError::missing(PayloadSegment::Health))?
        .as_str()
        .ok_or(PayloadShapeError::wrong_type(PayloadSegment::Health))?;
    tracing::debug!(health, "Got health from Splunk payload");
    Ok(health)
}
