//! Per-tracker journey statistics.
//!
//! The journey path is the chronological sequence of records that are both
//! timestamped and geocoded. Segments join consecutive path entries; an
//! ungeocoded record never breaks the chain, it is simply skipped for spatial
//! purposes while still contributing to the time gap view.
//!
//! "No data" is always represented as `None` rather than zero: a tracker with
//! one observation has a `total_distance` of 0 but no average segment
//! distance, so callers can tell "nothing travelled" from "nothing known".

use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::geo_utils::{format_miles, meters_to_miles, record_distance, Bounds};
use crate::sequence::{journey_path, timestamped_path};
use crate::{GeoPoint, LocationId, LocationRecord, Result};

const MS_PER_MINUTE: i64 = 60 * 1000;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Elapsed time decomposed into whole days, remaining hours and minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElapsedTime {
    pub days: i64,
    /// Hours remaining after whole days (0-23)
    pub hours: i64,
    /// Minutes remaining after whole hours (0-59)
    pub minutes: i64,
    /// Total elapsed milliseconds
    pub total_ms: i64,
}

impl ElapsedTime {
    pub fn from_duration(duration: Duration) -> Self {
        let total_ms = duration.num_milliseconds();
        Self {
            days: total_ms / MS_PER_DAY,
            hours: (total_ms % MS_PER_DAY) / MS_PER_HOUR,
            minutes: (total_ms % MS_PER_HOUR) / MS_PER_MINUTE,
            total_ms,
        }
    }

    /// Elapsed time between two timestamped records.
    pub fn between(from: &LocationRecord, to: &LocationRecord) -> Result<Self> {
        Ok(Self::from_duration(
            to.require_timestamp()? - from.require_timestamp()?,
        ))
    }

    /// Short human description, e.g. "2 days 3 hours" or "45 min".
    ///
    /// Minutes only appear when there are no whole days or hours.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if self.days > 0 {
            parts.push(pluralize(self.days, "day"));
        }
        if self.hours > 0 {
            parts.push(pluralize(self.hours, "hour"));
        }
        if parts.is_empty() {
            parts.push(format!("{} min", self.minutes));
        }
        parts.join(" ")
    }
}

fn pluralize(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("{} {}", count, unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

/// Distance between two consecutive records on the journey path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub from_id: LocationId,
    pub to_id: LocationId,
    pub from_address: String,
    pub to_address: String,
    /// Great-circle distance in meters
    pub distance_meters: f64,
}

impl Segment {
    pub fn distance_miles(&self) -> f64 {
        meters_to_miles(self.distance_meters)
    }
}

/// Earliest and latest capture time over the timestamped records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
    pub elapsed: ElapsedTime,
}

/// Time between two consecutive timestamped records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeGap {
    pub from_id: LocationId,
    pub to_id: LocationId,
    pub elapsed: ElapsedTime,
    /// Present only when both endpoints are geocoded
    pub distance_meters: Option<f64>,
}

impl TimeGap {
    /// Narrative form, e.g. "1 day 4 hours later, 6.21 mi away".
    pub fn narrative(&self) -> String {
        match self.distance_meters {
            Some(meters) => format!(
                "{} later, {} mi away",
                self.elapsed.describe(),
                format_miles(meters, 2)
            ),
            None => format!("{} later", self.elapsed.describe()),
        }
    }
}

/// Travel statistics for one tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyStats {
    /// All records supplied
    pub record_count: usize,
    pub geocoded_count: usize,
    pub timestamped_count: usize,
    /// Ids of the journey path (timestamped and geocoded), in order
    pub path: Vec<LocationId>,
    pub segments: Vec<Segment>,
    /// Sum of segment distances in meters; 0 with fewer than two path records
    pub total_distance: f64,
    /// `None` when there are no segments
    pub average_segment_distance: Option<f64>,
    /// `None` with fewer than two timestamped records
    pub time_span: Option<TimeSpan>,
    pub time_gaps: Vec<TimeGap>,
    /// Bounds over every geocoded record, for map fitting
    pub bounds: Option<Bounds>,
}

impl JourneyStats {
    pub fn total_distance_miles(&self) -> f64 {
        meters_to_miles(self.total_distance)
    }

    pub fn average_segment_distance_miles(&self) -> Option<f64> {
        self.average_segment_distance.map(meters_to_miles)
    }

    /// True when the path has at least one segment.
    pub fn has_movement_data(&self) -> bool {
        !self.segments.is_empty()
    }
}

/// Compute journey statistics for one tracker's records.
///
/// Records may be supplied in any order; they are sequenced first, and
/// sequencing is idempotent so an already ordered list is left untouched.
///
/// Fails only when a geocoded record carries an invalid coordinate.
pub fn analyze_journey<'a, I>(records: I) -> Result<JourneyStats>
where
    I: IntoIterator<Item = &'a LocationRecord>,
{
    let records: Vec<&LocationRecord> = records.into_iter().collect();

    let path = journey_path(records.iter().copied());
    let segments = build_segments(&path)?;
    // f64 `sum` starts from -0.0; a journey without segments must report +0.0
    let total_distance = segments.iter().fold(0.0, |acc, s| acc + s.distance_meters);
    let average_segment_distance = if segments.is_empty() {
        None
    } else {
        Some(total_distance / segments.len() as f64)
    };

    let timeline = timestamped_path(records.iter().copied());
    let time_span = build_time_span(&timeline);
    let time_gaps = build_time_gaps(&timeline)?;

    let points: Vec<GeoPoint> = records.iter().filter_map(|r| r.point()).collect();
    let bounds = Bounds::from_points(&points);

    debug!(
        "[Journey] {} records, {} path stops, {} segments, {:.0}m total",
        records.len(),
        path.len(),
        segments.len(),
        total_distance
    );

    Ok(JourneyStats {
        record_count: records.len(),
        geocoded_count: points.len(),
        timestamped_count: timeline.len(),
        path: path.iter().map(|r| r.id).collect(),
        segments,
        total_distance,
        average_segment_distance,
        time_span,
        time_gaps,
        bounds,
    })
}

fn build_segments(path: &[&LocationRecord]) -> Result<Vec<Segment>> {
    path.windows(2)
        .map(|pair| {
            let (from, to) = (pair[0], pair[1]);
            Ok(Segment {
                from_id: from.id,
                to_id: to.id,
                from_address: from.address.clone(),
                to_address: to.address.clone(),
                distance_meters: record_distance(from, to)?,
            })
        })
        .collect()
}

fn build_time_span(timeline: &[&LocationRecord]) -> Option<TimeSpan> {
    if timeline.len() < 2 {
        return None;
    }
    let earliest = timeline.first()?.timestamp?;
    let latest = timeline.last()?.timestamp?;

    Some(TimeSpan {
        earliest,
        latest,
        elapsed: ElapsedTime::from_duration(latest - earliest),
    })
}

fn build_time_gaps(timeline: &[&LocationRecord]) -> Result<Vec<TimeGap>> {
    timeline
        .windows(2)
        .map(|pair| {
            let (from, to) = (pair[0], pair[1]);
            let distance_meters = if from.is_geocoded() && to.is_geocoded() {
                Some(record_distance(from, to)?)
            } else {
                None
            };
            Ok(TimeGap {
                from_id: from.id,
                to_id: to.id,
                elapsed: ElapsedTime::between(from, to)?,
                distance_meters,
            })
        })
        .collect()
}
