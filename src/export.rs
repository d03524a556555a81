//! CSV export of journeys.
//!
//! Output is a pure function of its input: no clock reads, no locale, so the
//! same records always produce byte-identical text. Every non-numeric field
//! is quoted with embedded quotes doubled; numeric fields are written bare.
//!
//! An export with nothing to write is an `EmptyInput` error rather than a
//! header-only document, so callers never create empty files.

use std::fmt::Write;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use csv::{QuoteStyle, WriterBuilder};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::campaign::TrackerRecords;
use crate::geo_utils::meters_to_miles;
use crate::journey::JourneyStats;
use crate::sequence::{final_destination, geocoded_listing, journey_path, sequence_records};
use crate::{JourneyError, LocationId, LocationRecord, OptionExt, Result, Tracker};

const TRACKER_HEADERS: [&str; 12] = [
    "Stop Number",
    "Tracker Name",
    "Platform",
    "Address",
    "City",
    "State",
    "Postal Code",
    "Latitude",
    "Longitude",
    "Timestamp",
    "Distance to Next (miles)",
    "Total Distance (miles)",
];

const INVESTIGATION_HEADERS: [&str; 12] = [
    "Tracker Name",
    "Emoji",
    "Platform",
    "Address",
    "City",
    "State",
    "Postal Code",
    "Latitude",
    "Longitude",
    "Location Type",
    "Timestamp",
    "Is Final Destination",
];

/// Configuration for CSV export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// chrono format string for the per-tracker timestamp column.
    /// Default: "%Y-%m-%d %H:%M:%S"
    pub timestamp_format: String,

    /// Decimals for latitude/longitude.
    /// Default: 6
    pub coordinate_precision: usize,

    /// Decimals for distances in miles.
    /// Default: 2
    pub distance_precision: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            timestamp_format: "%Y-%m-%d %H:%M:%S".to_string(),
            coordinate_precision: 6,
            distance_precision: 2,
        }
    }
}

/// Export one tracker's journey as CSV, one row per geocoded record.
///
/// Rows follow the journey path (timestamped and geocoded records) with the
/// distance to the next stop taken from `journey.segments`; the last path stop
/// leaves that column empty. The cumulative column is the distance travelled
/// once the stop has been left, so the final stop carries the journey total.
/// Geocoded records without a timestamp are listed after the path with an
/// empty timestamp and distance, and the cumulative total unchanged.
///
/// `journey` must have been computed from the same records.
pub fn export_tracker_csv(
    tracker: &Tracker,
    records: &[LocationRecord],
    journey: &JourneyStats,
    config: &ExportConfig,
) -> Result<String> {
    let listing = geocoded_listing(records);
    listing.first().ok_or_empty_input(&format!(
        "tracker '{}' has no geocoded locations to export",
        tracker.name
    ))?;

    let path = journey_path(records);
    let path_ids: Vec<LocationId> = path.iter().map(|r| r.id).collect();
    if path_ids != journey.path {
        return Err(JourneyError::Export {
            message: format!(
                "journey statistics do not match the records of tracker '{}'",
                tracker.name
            ),
        });
    }

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::NonNumeric)
        .from_writer(Vec::new());
    writer.write_record(TRACKER_HEADERS)?;

    let unsequenced = listing.iter().filter(|r| !r.is_timestamped());
    let mut cumulative = 0.0;
    for (index, record) in path.iter().chain(unsequenced).enumerate() {
        let distance_to_next = match (index < path.len(), journey.segments.get(index)) {
            (true, Some(segment)) => {
                cumulative += segment.distance_meters;
                format_distance(segment.distance_meters, config)
            }
            _ => String::new(),
        };

        let point = record.require_point()?;
        writer.write_record([
            (index + 1).to_string(),
            tracker.name.clone(),
            tracker.platform.clone(),
            record.address.clone(),
            record.city.clone().unwrap_or_default(),
            record.state.clone().unwrap_or_default(),
            record.postal_code.clone().unwrap_or_default(),
            format!("{:.*}", config.coordinate_precision, point.latitude),
            format!("{:.*}", config.coordinate_precision, point.longitude),
            record
                .timestamp
                .map(|t| format_timestamp(t, &config.timestamp_format))
                .transpose()?
                .unwrap_or_default(),
            distance_to_next,
            format_distance(cumulative, config),
        ])?;
    }

    debug!(
        "[Export] tracker '{}': {} rows ({} on path)",
        tracker.name,
        listing.len(),
        path.len()
    );
    finish(writer)
}

/// Export every record of every tracker as CSV.
///
/// Trackers are ordered by name, records chronologically with untimestamped
/// ones last. Ungeocoded records are included with empty coordinates.
pub fn export_investigation_csv(trackers: &[TrackerRecords<'_>]) -> Result<String> {
    let mut ordered: Vec<&TrackerRecords> = trackers.iter().collect();
    ordered.sort_by(|a, b| a.tracker.name.cmp(&b.tracker.name));

    let total: usize = ordered.iter().map(|t| t.records.len()).sum();
    if total == 0 {
        return Err(JourneyError::EmptyInput {
            context: "investigation has no locations to export".to_string(),
        });
    }

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::NonNumeric)
        .from_writer(Vec::new());
    writer.write_record(INVESTIGATION_HEADERS)?;

    for entry in ordered {
        let tracker = entry.tracker;
        let final_id = final_destination(entry.records).map(|r| r.id);
        for record in sequence_records(entry.records) {
            writer.write_record([
                tracker.name.clone(),
                tracker.emoji.clone().unwrap_or_default(),
                tracker.platform.clone(),
                record.address.clone(),
                record.city.clone().unwrap_or_default(),
                record.state.clone().unwrap_or_default(),
                record.postal_code.clone().unwrap_or_default(),
                record.latitude.map(|v| v.to_string()).unwrap_or_default(),
                record.longitude.map(|v| v.to_string()).unwrap_or_default(),
                record.category.to_string(),
                record.timestamp.map(rfc3339).unwrap_or_default(),
                (if final_id == Some(record.id) { "Yes" } else { "No" }).to_string(),
            ])?;
        }
    }

    debug!("[Export] investigation: {} rows", total);
    finish(writer)
}

fn format_timestamp(timestamp: DateTime<Utc>, format: &str) -> Result<String> {
    let mut out = String::new();
    write!(out, "{}", timestamp.format(format)).map_err(|_| JourneyError::Export {
        message: format!("invalid timestamp format '{}'", format),
    })?;
    Ok(out)
}

fn rfc3339(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn format_distance(meters: f64, config: &ExportConfig) -> String {
    format!("{:.*}", config.distance_precision, meters_to_miles(meters))
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer.into_inner().map_err(|e| JourneyError::Export {
        message: e.to_string(),
    })?;
    String::from_utf8(bytes).map_err(|e| JourneyError::Export {
        message: e.to_string(),
    })
}

/// Suggested filename for a tracker export:
/// `{name}_locations_{YYYY-MM-DD}.csv`, non-alphanumerics replaced by `_`.
pub fn tracker_export_filename(tracker_name: &str, date: NaiveDate) -> String {
    let sanitized: String = tracker_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}_locations_{}.csv", sanitized, date.format("%Y-%m-%d"))
}

/// Suggested filename for an investigation export:
/// `{brand}_{name}_export.csv` with spaces replaced by `_`.
pub fn investigation_export_filename(brand: &str, name: &str) -> String {
    format!("{}_{}_export.csv", brand, name).replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journey::analyze_journey;
    use chrono::TimeZone;

    fn tracker() -> Tracker {
        Tracker::new(1, 1, "Cup #1", "apple").with_emoji("☕")
    }

    fn stop(id: i64, lng: f64, hour: u32) -> LocationRecord {
        LocationRecord::new(id, 1, &format!("{} Main St", id))
            .with_coordinates(0.0, lng)
            .with_timestamp(Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap())
            .with_place("Newark", "NJ", "07102")
    }

    fn parse(csv_text: &str) -> Vec<Vec<String>> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(csv_text.as_bytes())
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_tracker_export_rows() {
        let records = vec![stop(2, 0.1, 12), stop(1, 0.0, 8), stop(3, 0.2, 18)];
        let journey = analyze_journey(&records).unwrap();
        let text =
            export_tracker_csv(&tracker(), &records, &journey, &ExportConfig::default()).unwrap();
        let rows = parse(&text);

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], TRACKER_HEADERS.map(str::to_string).to_vec());

        assert_eq!(rows[1][0], "1");
        assert_eq!(rows[1][1], "Cup #1");
        assert_eq!(rows[1][3], "1 Main St");
        assert_eq!(rows[1][7], "0.000000");
        assert_eq!(rows[1][8], "0.000000");
        assert_eq!(rows[1][9], "2024-06-01 08:00:00");
        // 0.1 degree on the equator: 11.12 km = 6.91 mi
        assert_eq!(rows[1][10], "6.91");
        assert_eq!(rows[1][11], "6.91");

        assert_eq!(rows[2][10], "6.91");
        assert_eq!(rows[2][11], "13.82");

        assert_eq!(rows[3][0], "3");
        assert_eq!(rows[3][10], "");
        assert_eq!(rows[3][11], "13.82");
    }

    #[test]
    fn test_address_quotes_are_doubled() {
        let mut record = stop(1, 0.0, 8);
        record.address = "12 \"Old\" Mill Rd, Unit 4".to_string();
        let records = vec![record];
        let journey = analyze_journey(&records).unwrap();
        let text =
            export_tracker_csv(&tracker(), &records, &journey, &ExportConfig::default()).unwrap();

        assert!(text.contains("\"12 \"\"Old\"\" Mill Rd, Unit 4\""));
        assert_eq!(parse(&text)[1][3], "12 \"Old\" Mill Rd, Unit 4");
    }

    #[test]
    fn test_untimestamped_rows_follow_the_path() {
        let loose = LocationRecord::new(9, 1, "Somewhere").with_coordinates(1.0, 1.0);
        let ungeocoded = LocationRecord::new(8, 1, "Nowhere");
        let records = vec![loose, stop(1, 0.0, 8), ungeocoded, stop(2, 0.1, 9)];
        let journey = analyze_journey(&records).unwrap();
        let text =
            export_tracker_csv(&tracker(), &records, &journey, &ExportConfig::default()).unwrap();
        let rows = parse(&text);

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3][3], "Somewhere");
        assert_eq!(rows[3][9], "");
        assert_eq!(rows[3][10], "");
        assert_eq!(rows[3][11], rows[2][11]);
    }

    #[test]
    fn test_export_is_deterministic() {
        let records = vec![stop(1, 0.0, 8), stop(2, 0.05, 9)];
        let journey = analyze_journey(&records).unwrap();
        let config = ExportConfig::default();
        let first = export_tracker_csv(&tracker(), &records, &journey, &config).unwrap();
        let second = export_tracker_csv(&tracker(), &records, &journey, &config).unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn test_nothing_to_export() {
        let records = vec![LocationRecord::new(1, 1, "No coordinates")];
        let journey = analyze_journey(&records).unwrap();
        assert!(matches!(
            export_tracker_csv(&tracker(), &records, &journey, &ExportConfig::default()),
            Err(JourneyError::EmptyInput { .. })
        ));
    }

    #[test]
    fn test_invalid_timestamp_format() {
        let records = vec![stop(1, 0.0, 8)];
        let journey = analyze_journey(&records).unwrap();
        let config = ExportConfig {
            timestamp_format: "%Q".to_string(),
            ..ExportConfig::default()
        };
        assert!(matches!(
            export_tracker_csv(&tracker(), &records, &journey, &config),
            Err(JourneyError::Export { .. })
        ));
    }

    #[test]
    fn test_mismatched_journey_is_rejected() {
        let records = vec![stop(1, 0.0, 8), stop(2, 0.1, 9)];
        let other = vec![stop(5, 0.0, 8), stop(6, 0.1, 9)];
        let journey = analyze_journey(&other).unwrap();
        assert!(matches!(
            export_tracker_csv(&tracker(), &records, &journey, &ExportConfig::default()),
            Err(JourneyError::Export { .. })
        ));
    }

    #[test]
    fn test_investigation_export() {
        let zed = Tracker::new(2, 1, "Zed", "google");
        let alpha = tracker();
        let zed_records = vec![stop(5, 0.0, 8)];
        let alpha_records = vec![
            stop(2, 0.1, 12),
            LocationRecord::new(4, 1, "Pending"),
            stop(1, 0.0, 8),
        ];
        let entries = vec![
            TrackerRecords::new(&zed, &zed_records),
            TrackerRecords::new(&alpha, &alpha_records),
        ];

        let rows = parse(&export_investigation_csv(&entries).unwrap());
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0][0], "Tracker Name");
        assert_eq!(rows[1][0], "Cup #1");
        assert_eq!(rows[1][1], "☕");
        assert_eq!(rows[1][10], "2024-06-01T08:00:00+00:00");
        assert_eq!(rows[1][11], "No");
        assert_eq!(rows[2][11], "Yes");
        assert_eq!(rows[3][3], "Pending");
        assert_eq!(rows[3][7], "");
        assert_eq!(rows[3][9], "unknown");
        assert_eq!(rows[4][0], "Zed");
        assert_eq!(rows[4][11], "Yes");

        assert!(matches!(
            export_investigation_csv(&[]),
            Err(JourneyError::EmptyInput { .. })
        ));
    }

    #[test]
    fn test_filenames() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(
            tracker_export_filename("Cup #1 (NYC)", date),
            "Cup__1__NYC__locations_2024-06-01.csv"
        );
        assert_eq!(
            investigation_export_filename("Coffee Co", "Spring study"),
            "Coffee_Co_Spring_study_export.csv"
        );
    }
}
