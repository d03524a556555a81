//! Validated conversion of raw data-store records.
//!
//! The data store hands out coordinates as decimal strings (or sometimes
//! numbers), timestamps as ISO-8601 strings and categories as free tags. All
//! of that is parsed exactly once here, so the analytics modules only ever see
//! typed values or an explicit "absent".

use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{JourneyError, LocationCategory, LocationId, LocationRecord, Result, TrackerId, UserId};

/// A coordinate as it appears in the data store's JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCoordinate {
    Number(f64),
    Text(String),
}

/// A location record as returned by the data store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLocationRecord {
    pub id: LocationId,
    pub tracker_id: TrackerId,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub latitude: Option<RawCoordinate>,
    #[serde(default)]
    pub longitude: Option<RawCoordinate>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub location_type: Option<String>,
    #[serde(default)]
    pub screenshot_timestamp: Option<String>,
    #[serde(default)]
    pub uploaded_by: Option<UserId>,
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    fn name(self) -> &'static str {
        match self {
            Axis::Latitude => "latitude",
            Axis::Longitude => "longitude",
        }
    }

    fn limit(self) -> f64 {
        match self {
            Axis::Latitude => 90.0,
            Axis::Longitude => 180.0,
        }
    }
}

fn parse_coordinate(raw: Option<&RawCoordinate>, axis: Axis) -> Result<Option<f64>> {
    let value = match raw {
        None => return Ok(None),
        Some(RawCoordinate::Number(n)) => *n,
        Some(RawCoordinate::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse::<f64>()
                .map_err(|_| JourneyError::InvalidCoordinate {
                    value: text.to_string(),
                    reason: format!("{} is not a number", axis.name()),
                })?
        }
    };

    if !value.is_finite() || value.abs() > axis.limit() {
        return Err(JourneyError::InvalidCoordinate {
            value: value.to_string(),
            reason: format!("{} outside ±{}", axis.name(), axis.limit()),
        });
    }
    Ok(Some(value))
}

fn parse_timestamp(raw: Option<&str>, record_id: LocationId) -> Result<Option<DateTime<Utc>>> {
    let text = match raw.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(text) => text,
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    // Naive timestamps are stored in UTC
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(|e| JourneyError::MalformedRecord {
            record_id: Some(record_id),
            message: format!("timestamp '{}': {}", text, e),
        })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TryFrom<RawLocationRecord> for LocationRecord {
    type Error = JourneyError;

    fn try_from(raw: RawLocationRecord) -> Result<Self> {
        let latitude = parse_coordinate(raw.latitude.as_ref(), Axis::Latitude)?;
        let longitude = parse_coordinate(raw.longitude.as_ref(), Axis::Longitude)?;

        // Half a coordinate pair is not a position
        let (latitude, longitude) = match (latitude, longitude) {
            (Some(lat), Some(lng)) => (Some(lat), Some(lng)),
            (None, None) => (None, None),
            _ => {
                warn!(
                    "[Ingest] location {} has only one coordinate, treating as ungeocoded",
                    raw.id
                );
                (None, None)
            }
        };

        Ok(LocationRecord {
            id: raw.id,
            tracker_id: raw.tracker_id,
            latitude,
            longitude,
            address: raw.address,
            city: non_blank(raw.city),
            state: non_blank(raw.state),
            postal_code: non_blank(raw.postal_code),
            timestamp: parse_timestamp(raw.screenshot_timestamp.as_deref(), raw.id)?,
            category: raw
                .location_type
                .as_deref()
                .map(LocationCategory::from_tag)
                .unwrap_or_default(),
            uploaded_by: raw.uploaded_by,
        })
    }
}

/// Parse a JSON array of raw data-store records into typed records.
pub fn parse_records_json(json: &str) -> Result<Vec<LocationRecord>> {
    let raw: Vec<RawLocationRecord> =
        serde_json::from_str(json).map_err(|e| JourneyError::MalformedRecord {
            record_id: None,
            message: e.to_string(),
        })?;

    let records = raw
        .into_iter()
        .map(LocationRecord::try_from)
        .collect::<Result<Vec<_>>>()?;

    debug!("[Ingest] parsed {} location records", records.len());
    Ok(records)
}
