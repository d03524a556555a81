//! Chronological ordering of a tracker's records.
//!
//! Ordering policy: timestamped records ascend by capture time, untimestamped
//! records follow all timestamped ones, and ties (equal timestamps, or two
//! untimestamped records) keep their input order. The trailing position of
//! untimestamped records is a listing convention, not something derivable
//! from the data; temporal views drop them entirely via [`timestamped_path`].

use std::cmp::Ordering;

use crate::LocationRecord;

/// Order records by capture time, untimestamped last, stable on ties.
///
/// Idempotent: sequencing an already sequenced list returns the same order.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use tracker_journeys::{sequence_records, LocationRecord};
///
/// let records = vec![
///     LocationRecord::new(1, 1, "later").with_timestamp(Utc.timestamp_opt(200, 0).unwrap()),
///     LocationRecord::new(2, 1, "no time"),
///     LocationRecord::new(3, 1, "earlier").with_timestamp(Utc.timestamp_opt(100, 0).unwrap()),
/// ];
/// let ids: Vec<i64> = sequence_records(&records).iter().map(|r| r.id).collect();
/// assert_eq!(ids, vec![3, 1, 2]);
/// ```
pub fn sequence_records<'a, I>(records: I) -> Vec<&'a LocationRecord>
where
    I: IntoIterator<Item = &'a LocationRecord>,
{
    let mut ordered: Vec<&LocationRecord> = records.into_iter().collect();
    // sort_by is stable, which preserves input order on ties
    ordered.sort_by(|a, b| compare_capture_time(a, b));
    ordered
}

fn compare_capture_time(a: &LocationRecord, b: &LocationRecord) -> Ordering {
    match (a.timestamp, b.timestamp) {
        (Some(ta), Some(tb)) => ta.cmp(&tb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Timestamped records only, in chronological order.
pub fn timestamped_path<'a, I>(records: I) -> Vec<&'a LocationRecord>
where
    I: IntoIterator<Item = &'a LocationRecord>,
{
    sequence_records(records.into_iter().filter(|r| r.is_timestamped()))
}

/// Records that are both timestamped and geocoded, in chronological order.
///
/// This is the spatial journey path: consecutive entries form segments.
pub fn journey_path<'a, I>(records: I) -> Vec<&'a LocationRecord>
where
    I: IntoIterator<Item = &'a LocationRecord>,
{
    sequence_records(
        records
            .into_iter()
            .filter(|r| r.is_timestamped() && r.is_geocoded()),
    )
}

/// Geocoded records for listing: journey path first, then untimestamped ones.
pub fn geocoded_listing<'a, I>(records: I) -> Vec<&'a LocationRecord>
where
    I: IntoIterator<Item = &'a LocationRecord>,
{
    sequence_records(records.into_iter().filter(|r| r.is_geocoded()))
}

/// The chronologically last timestamped record.
///
/// Among records sharing the latest timestamp, the one supplied last wins.
/// Returns `None` when no record is timestamped.
pub fn final_destination<'a, I>(records: I) -> Option<&'a LocationRecord>
where
    I: IntoIterator<Item = &'a LocationRecord>,
{
    timestamped_path(records).last().copied()
}
