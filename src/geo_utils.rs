//! Geographic utilities: great-circle distance, unit conversion and bounds.
//!
//! Distances are always produced in meters. Conversion to miles is a
//! presentation concern and only happens through [`meters_to_miles`].

use geo::{BoundingRect, Distance, Haversine, MultiPoint, Point};
use serde::{Deserialize, Serialize};

use crate::{GeoPoint, JourneyError, LocationRecord, Result};

/// Miles per meter.
pub const METERS_TO_MILES: f64 = 0.000621371;

/// Haversine distance between two points in meters.
///
/// Uses a spherical Earth of mean radius. Fails with `InvalidCoordinate` when
/// either point is non-finite or out of range; it never returns a silent zero
/// for bad input.
///
/// # Example
/// ```
/// use tracker_journeys::{haversine_distance, GeoPoint};
///
/// let a = GeoPoint::new(0.0, 0.0);
/// let b = GeoPoint::new(0.0, 1.0);
/// let meters = haversine_distance(&a, &b).unwrap();
/// assert!((meters - 111_195.0).abs() < 100.0);
/// ```
pub fn haversine_distance(from: &GeoPoint, to: &GeoPoint) -> Result<f64> {
    validate_point(from)?;
    validate_point(to)?;

    let origin = Point::new(from.longitude, from.latitude);
    let destination = Point::new(to.longitude, to.latitude);
    Ok(Haversine::distance(origin, destination))
}

/// Distance between two records in meters.
///
/// Both records must be geocoded.
pub fn record_distance(from: &LocationRecord, to: &LocationRecord) -> Result<f64> {
    haversine_distance(&from.require_point()?, &to.require_point()?)
}

fn validate_point(point: &GeoPoint) -> Result<()> {
    validate_axis(point.latitude, "latitude", 90.0)?;
    validate_axis(point.longitude, "longitude", 180.0)
}

fn validate_axis(value: f64, axis: &str, limit: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(JourneyError::InvalidCoordinate {
            value: value.to_string(),
            reason: format!("{} is not finite", axis),
        });
    }
    if value.abs() > limit {
        return Err(JourneyError::InvalidCoordinate {
            value: value.to_string(),
            reason: format!("{} outside ±{}", axis, limit),
        });
    }
    Ok(())
}

/// Convert meters to miles.
pub fn meters_to_miles(meters: f64) -> f64 {
    meters * METERS_TO_MILES
}

/// Format a distance in meters as miles with a fixed number of decimals.
pub fn format_miles(meters: f64, precision: usize) -> String {
    format!("{:.*}", precision, meters_to_miles(meters))
}

/// Bounding box over a set of points, for fitting a map view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Bounds of the given points, or `None` for an empty slice.
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        let multi: MultiPoint<f64> = points
            .iter()
            .map(|p| Point::new(p.longitude, p.latitude))
            .collect();
        let rect = multi.bounding_rect()?;

        Some(Self {
            min_lat: rect.min().y,
            max_lat: rect.max().y,
            min_lng: rect.min().x,
            max_lng: rect.max().x,
        })
    }

    /// Center of the bounds.
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}
