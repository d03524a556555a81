//! # Tracker Journeys
//!
//! Journey analytics for tracked objects within an investigation.
//!
//! This library turns unordered, user-submitted location observations into:
//! - Chronological journey paths per tracker
//! - Per-tracker travel statistics (segments, distance, time span, time gaps)
//! - Cross-tracker campaign statistics with caller-controlled visibility
//! - Final destination breakdowns by category and state
//! - Flat CSV exports of a journey or a whole investigation
//!
//! Every computation is a pure function over an already-materialized snapshot
//! of records. Nothing is cached and nothing is persisted.
//!
//! ## Features
//!
//! - **`parallel`** - Compute per-tracker journeys in parallel with rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use tracker_journeys::{analyze_journey, LocationRecord};
//!
//! let records = vec![
//!     LocationRecord::new(1, 10, "Store")
//!         .with_coordinates(40.7128, -74.0060)
//!         .with_timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()),
//!     LocationRecord::new(2, 10, "Transfer station")
//!         .with_coordinates(40.7306, -73.9352)
//!         .with_timestamp(Utc.with_ymd_and_hms(2024, 3, 2, 14, 0, 0).unwrap()),
//! ];
//!
//! let journey = analyze_journey(&records).unwrap();
//! assert_eq!(journey.segments.len(), 1);
//! println!("Travelled {:.2} mi", journey.total_distance_miles());
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{JourneyError, OptionExt, Result};

// Geographic utilities (haversine distance, unit conversion, bounds)
pub mod geo_utils;
pub use geo_utils::{haversine_distance, meters_to_miles, Bounds, METERS_TO_MILES};

// Chronological ordering of a tracker's records
pub mod sequence;
pub use sequence::{final_destination, sequence_records};

// Per-tracker journey statistics
pub mod journey;
pub use journey::{analyze_journey, ElapsedTime, JourneyStats, Segment, TimeGap, TimeSpan};

// Cross-tracker campaign statistics
pub mod campaign;
pub use campaign::{
    analyze_campaign, distinct_uploaders, CampaignConfig, CampaignStats, FurthestTracker,
    TieBreak, TrackerDistance, TrackerRecords, Visibility,
};

// Final destination classification and investigation summary
pub mod summary;
pub use summary::{
    final_destinations, summarize_investigation, CategoryCount, FinalDestination,
    InvestigationSummary, StateCount, StateOrder, SummaryConfig, TrackerSummary,
};

// Presentation metadata for location categories
pub mod categories;
pub use categories::{display_for, CategoryDisplay};

// CSV export
pub mod export;
pub use export::{
    export_investigation_csv, export_tracker_csv, investigation_export_filename,
    tracker_export_filename, ExportConfig,
};

// Validated parse step for records coming from the data store
pub mod ingest;
pub use ingest::{parse_records_json, RawCoordinate, RawLocationRecord};

// Data-access collaborator and immutable investigation snapshot
pub mod snapshot;
pub use snapshot::{InvestigationSnapshot, LocationSource};

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of a single location observation.
pub type LocationId = i64;
/// Identifier of a tracker.
pub type TrackerId = i64;
/// Identifier of an investigation.
pub type InvestigationId = i64;
/// Identifier of the user who uploaded an observation.
pub type UserId = i64;

// ============================================================================
// Core Types
// ============================================================================

/// A geographic coordinate in decimal degrees.
///
/// # Example
/// ```
/// use tracker_journeys::GeoPoint;
/// let point = GeoPoint::new(40.7128, -74.0060); // New York
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has finite, in-range coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Classification of the place a record was observed at.
///
/// Serializes as its snake_case tag. Tags outside the known set are kept
/// verbatim in [`LocationCategory::Other`] so new categories can flow through
/// aggregation untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LocationCategory {
    StartingPoint,
    Transit,
    WasteTransferStation,
    /// Materials recovery facility
    Mrf,
    Incinerator,
    Landfill,
    #[default]
    Unknown,
    Other(String),
}

impl LocationCategory {
    /// All categories with a fixed tag, in display order.
    pub const KNOWN: [LocationCategory; 7] = [
        LocationCategory::StartingPoint,
        LocationCategory::Transit,
        LocationCategory::WasteTransferStation,
        LocationCategory::Mrf,
        LocationCategory::Incinerator,
        LocationCategory::Landfill,
        LocationCategory::Unknown,
    ];

    /// The tag string for this category.
    pub fn as_str(&self) -> &str {
        match self {
            LocationCategory::StartingPoint => "starting_point",
            LocationCategory::Transit => "transit",
            LocationCategory::WasteTransferStation => "waste_transfer_station",
            LocationCategory::Mrf => "mrf",
            LocationCategory::Incinerator => "incinerator",
            LocationCategory::Landfill => "landfill",
            LocationCategory::Unknown => "unknown",
            LocationCategory::Other(tag) => tag,
        }
    }

    /// Parse a tag; blank tags are `Unknown`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "" | "unknown" => LocationCategory::Unknown,
            "starting_point" => LocationCategory::StartingPoint,
            "transit" => LocationCategory::Transit,
            "waste_transfer_station" => LocationCategory::WasteTransferStation,
            "mrf" => LocationCategory::Mrf,
            "incinerator" => LocationCategory::Incinerator,
            "landfill" => LocationCategory::Landfill,
            other => LocationCategory::Other(other.to_string()),
        }
    }
}

impl fmt::Display for LocationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocationCategory {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from_tag(s))
    }
}

impl From<String> for LocationCategory {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<LocationCategory> for String {
    fn from(category: LocationCategory) -> Self {
        category.as_str().to_string()
    }
}

/// One observation of a tracker's position.
///
/// Records are immutable snapshots produced upstream. Coordinates are absent
/// until the record is geocoded and the timestamp is absent when it could not
/// be derived from the source observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub id: LocationId,
    pub tracker_id: TrackerId,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Free-text address as captured
    pub address: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    /// Capture time of the source observation
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category: LocationCategory,
    pub uploaded_by: Option<UserId>,
}

impl LocationRecord {
    /// Create an ungeocoded, untimestamped record.
    pub fn new(id: LocationId, tracker_id: TrackerId, address: &str) -> Self {
        Self {
            id,
            tracker_id,
            latitude: None,
            longitude: None,
            address: address.to_string(),
            city: None,
            state: None,
            postal_code: None,
            timestamp: None,
            category: LocationCategory::Unknown,
            uploaded_by: None,
        }
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_category(mut self, category: LocationCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_place(mut self, city: &str, state: &str, postal_code: &str) -> Self {
        self.city = Some(city.to_string());
        self.state = Some(state.to_string());
        self.postal_code = Some(postal_code.to_string());
        self
    }

    pub fn with_uploader(mut self, user_id: UserId) -> Self {
        self.uploaded_by = Some(user_id);
        self
    }

    /// Both latitude and longitude are present.
    pub fn is_geocoded(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// A capture time is present.
    pub fn is_timestamped(&self) -> bool {
        self.timestamp.is_some()
    }

    /// The record's position, if geocoded.
    pub fn point(&self) -> Option<GeoPoint> {
        Some(GeoPoint::new(self.latitude?, self.longitude?))
    }

    /// The record's position, or `MissingCoordinate`.
    pub fn require_point(&self) -> Result<GeoPoint> {
        self.point().ok_or_missing_coordinate(self.id)
    }

    /// The record's capture time, or `MissingTimestamp`.
    pub fn require_timestamp(&self) -> Result<DateTime<Utc>> {
        self.timestamp
            .ok_or(JourneyError::MissingTimestamp { record_id: self.id })
    }

    /// The state, if present and not blank.
    pub fn state_name(&self) -> Option<&str> {
        self.state
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// A single tracked object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracker {
    pub id: TrackerId,
    pub investigation_id: InvestigationId,
    /// Display name, unique within an investigation
    pub name: String,
    pub emoji: Option<String>,
    /// Source system that produced the observations (e.g. "apple", "google")
    pub platform: String,
}

impl Tracker {
    pub fn new(
        id: TrackerId,
        investigation_id: InvestigationId,
        name: &str,
        platform: &str,
    ) -> Self {
        Self {
            id,
            investigation_id,
            name: name.to_string(),
            emoji: None,
            platform: platform.to_string(),
        }
    }

    pub fn with_emoji(mut self, emoji: &str) -> Self {
        self.emoji = Some(emoji.to_string());
        self
    }
}

/// Scoping boundary for all aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investigation {
    pub id: InvestigationId,
    pub name: String,
    /// Brand under study
    pub brand: String,
    pub description: Option<String>,
}

impl Investigation {
    pub fn new(id: InvestigationId, name: &str, brand: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            brand: brand.to_string(),
            description: None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
