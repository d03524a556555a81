//! Unified error handling for the journey analytics engine.
//!
//! Missing data is normally handled by exclusion (a record without coordinates
//! simply drops out of the spatial view). The variants here cover the cases
//! where a caller asks for something that cannot be produced, or where a
//! defect in upstream data has to be reported rather than coerced.

use thiserror::Error;

use crate::{LocationId, TrackerId};

/// Unified error type for journey analytics operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JourneyError {
    /// A spatial operation was requested on a record without coordinates
    #[error("Location {record_id} has no coordinates")]
    MissingCoordinate { record_id: LocationId },

    /// A temporal operation was requested on a record without a capture time
    #[error("Location {record_id} has no capture timestamp")]
    MissingTimestamp { record_id: LocationId },

    /// Zero eligible records for the requested result
    #[error("Nothing to compute: {context}")]
    EmptyInput { context: String },

    /// Non-finite or out-of-range coordinate reached the distance calculator
    #[error("Invalid coordinate '{value}': {reason}")]
    InvalidCoordinate { value: String, reason: String },

    /// A raw record from the data store could not be converted
    #[error("Malformed location record{}: {message}", format_record_id(.record_id))]
    MalformedRecord {
        record_id: Option<LocationId>,
        message: String,
    },

    /// A tracker id was not part of the snapshot
    #[error("Tracker {tracker_id} is not part of this investigation")]
    UnknownTracker { tracker_id: TrackerId },

    /// The data-access collaborator failed to produce a snapshot
    #[error("Data source error: {message}")]
    DataSource { message: String },

    /// Writing the export artifact failed
    #[error("Export failed: {message}")]
    Export { message: String },
}

fn format_record_id(record_id: &Option<LocationId>) -> String {
    match record_id {
        Some(id) => format!(" {}", id),
        None => String::new(),
    }
}

impl From<csv::Error> for JourneyError {
    fn from(err: csv::Error) -> Self {
        JourneyError::Export {
            message: err.to_string(),
        }
    }
}

/// Result type alias for journey analytics operations.
pub type Result<T> = std::result::Result<T, JourneyError>;

/// Extension trait for converting Option to JourneyError.
pub trait OptionExt<T> {
    /// Convert Option to Result with an empty input error.
    fn ok_or_empty_input(self, context: &str) -> Result<T>;

    /// Convert Option to Result with a missing coordinate error.
    fn ok_or_missing_coordinate(self, record_id: LocationId) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_empty_input(self, context: &str) -> Result<T> {
        self.ok_or_else(|| JourneyError::EmptyInput {
            context: context.to_string(),
        })
    }

    fn ok_or_missing_coordinate(self, record_id: LocationId) -> Result<T> {
        self.ok_or(JourneyError::MissingCoordinate { record_id })
    }
}
