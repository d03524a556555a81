//! Cross-tracker campaign statistics.
//!
//! Visibility is an explicit argument: the caller decides which trackers are
//! included on every call. Nothing here reads or remembers UI state.
//!
//! ## Example
//! ```rust
//! use tracker_journeys::{
//!     analyze_campaign, CampaignConfig, LocationRecord, Tracker, TrackerRecords, Visibility,
//! };
//!
//! let tracker = Tracker::new(1, 1, "Cup A", "apple");
//! let records = vec![LocationRecord::new(1, 1, "Store").with_coordinates(40.0, -74.0)];
//! let trackers = vec![TrackerRecords::new(&tracker, &records)];
//!
//! let stats = analyze_campaign(&trackers, &Visibility::All, &CampaignConfig::default()).unwrap();
//! assert_eq!(stats.active_tracker_count, 1);
//! assert!(stats.furthest_tracker.is_none());
//!
//! // Hiding every tracker leaves nothing to report
//! let none = analyze_campaign(&trackers, &Visibility::hiding([1]), &CampaignConfig::default());
//! assert!(none.is_err());
//! ```

use std::collections::HashSet;

use log::debug;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::geo_utils::meters_to_miles;
use crate::journey::{analyze_journey, JourneyStats};
use crate::{JourneyError, LocationRecord, Result, Tracker, TrackerId, UserId};

/// A tracker together with its records, borrowed from a snapshot.
#[derive(Debug, Clone, Copy)]
pub struct TrackerRecords<'a> {
    pub tracker: &'a Tracker,
    pub records: &'a [LocationRecord],
}

impl<'a> TrackerRecords<'a> {
    pub fn new(tracker: &'a Tracker, records: &'a [LocationRecord]) -> Self {
        Self { tracker, records }
    }

    /// Records, optionally restricted to one uploader.
    pub fn scoped_records(&self, uploader: Option<UserId>) -> Vec<&'a LocationRecord> {
        self.records
            .iter()
            .filter(|r| uploader.map_or(true, |u| r.uploaded_by == Some(u)))
            .collect()
    }
}

/// Which trackers take part in a campaign computation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Visibility {
    #[default]
    All,
    /// Only the listed trackers
    Only(HashSet<TrackerId>),
    /// Every tracker except the listed ones
    Hidden(HashSet<TrackerId>),
}

impl Visibility {
    pub fn is_visible(&self, tracker_id: TrackerId) -> bool {
        match self {
            Visibility::All => true,
            Visibility::Only(ids) => ids.contains(&tracker_id),
            Visibility::Hidden(ids) => !ids.contains(&tracker_id),
        }
    }

    /// Visibility of exactly the given trackers.
    pub fn only<I: IntoIterator<Item = TrackerId>>(ids: I) -> Self {
        Visibility::Only(ids.into_iter().collect())
    }

    /// Visibility of everything but the given trackers.
    pub fn hiding<I: IntoIterator<Item = TrackerId>>(ids: I) -> Self {
        Visibility::Hidden(ids.into_iter().collect())
    }
}

/// How to choose between trackers with exactly equal distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Lowest tracker id wins (stable across input order)
    #[default]
    LowestTrackerId,
    /// First tracker in the supplied order wins
    FirstSeen,
}

/// Configuration for campaign aggregation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Tie-break for the furthest tracker.
    /// Default: lowest tracker id
    #[serde(default)]
    pub tie_break: TieBreak,

    /// Restrict every statistic to records uploaded by this user.
    /// Default: None (all uploaders)
    #[serde(default)]
    pub uploader: Option<UserId>,
}

impl CampaignConfig {
    pub fn for_uploader(uploader: UserId) -> Self {
        Self {
            uploader: Some(uploader),
            ..Self::default()
        }
    }
}

/// Distance travelled by one visible tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerDistance {
    pub tracker_id: TrackerId,
    /// Meters
    pub distance: f64,
    /// Geocoded records counted for this tracker
    pub location_count: usize,
}

/// The visible tracker that travelled furthest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FurthestTracker {
    pub tracker_id: TrackerId,
    pub name: String,
    pub emoji: Option<String>,
    /// Meters
    pub distance: f64,
}

impl FurthestTracker {
    pub fn distance_miles(&self) -> f64 {
        meters_to_miles(self.distance)
    }
}

/// Campaign-wide statistics over the visible trackers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignStats {
    /// Sum of visible trackers' journey distances in meters
    pub total_distance: f64,
    pub active_tracker_count: usize,
    /// Geocoded records across visible trackers
    pub total_location_count: usize,
    /// `None` when no visible tracker has a segment
    pub furthest_tracker: Option<FurthestTracker>,
    /// Per-tracker distances, in supplied order
    pub tracker_distances: Vec<TrackerDistance>,
    /// Uploader scope the statistics were computed under
    pub uploader: Option<UserId>,
}

impl CampaignStats {
    pub fn total_distance_miles(&self) -> f64 {
        meters_to_miles(self.total_distance)
    }

    pub fn distance_for(&self, tracker_id: TrackerId) -> Option<f64> {
        self.tracker_distances
            .iter()
            .find(|d| d.tracker_id == tracker_id)
            .map(|d| d.distance)
    }
}

/// Compute campaign statistics over the visible trackers.
///
/// When `config.uploader` is set, each tracker's records are first restricted
/// to that uploader, producing a scoped variant of the same statistics.
///
/// Fails with `EmptyInput` when the visible, uploader-scoped records contain
/// no geocoded location. Only a tracker that actually moved (more than 0 m)
/// can be the furthest tracker.
pub fn analyze_campaign(
    trackers: &[TrackerRecords<'_>],
    visibility: &Visibility,
    config: &CampaignConfig,
) -> Result<CampaignStats> {
    let visible: Vec<&TrackerRecords> = trackers
        .iter()
        .filter(|t| visibility.is_visible(t.tracker.id))
        .collect();

    let journeys = compute_journeys(&visible, config.uploader)?;

    let mut total_distance = 0.0;
    let mut total_location_count = 0;
    let mut tracker_distances = Vec::with_capacity(visible.len());
    let mut furthest: Option<(&Tracker, f64)> = None;

    for (entry, journey) in visible.iter().zip(journeys.iter()) {
        total_distance += journey.total_distance;
        total_location_count += journey.geocoded_count;
        tracker_distances.push(TrackerDistance {
            tracker_id: entry.tracker.id,
            distance: journey.total_distance,
            location_count: journey.geocoded_count,
        });

        if journey.total_distance <= 0.0 {
            continue;
        }
        let candidate = (entry.tracker, journey.total_distance);
        furthest = match furthest {
            Some(best) if !beats(&candidate, &best, config.tie_break) => Some(best),
            _ => Some(candidate),
        };
    }

    if total_location_count == 0 {
        return Err(JourneyError::EmptyInput {
            context: match config.uploader {
                Some(user) => format!(
                    "no geocoded locations from uploader {} on visible trackers",
                    user
                ),
                None => "no geocoded locations on visible trackers".to_string(),
            },
        });
    }

    debug!(
        "[Campaign] {} of {} trackers visible, {:.0}m total, uploader={:?}",
        visible.len(),
        trackers.len(),
        total_distance,
        config.uploader
    );

    Ok(CampaignStats {
        total_distance,
        active_tracker_count: visible.len(),
        total_location_count,
        furthest_tracker: furthest.map(|(tracker, distance)| FurthestTracker {
            tracker_id: tracker.id,
            name: tracker.name.clone(),
            emoji: tracker.emoji.clone(),
            distance,
        }),
        tracker_distances,
        uploader: config.uploader,
    })
}

/// Whether `candidate` replaces `best` as the furthest tracker.
fn beats(candidate: &(&Tracker, f64), best: &(&Tracker, f64), tie_break: TieBreak) -> bool {
    if candidate.1 > best.1 {
        return true;
    }
    if candidate.1 < best.1 {
        return false;
    }
    match tie_break {
        TieBreak::LowestTrackerId => candidate.0.id < best.0.id,
        TieBreak::FirstSeen => false,
    }
}

#[cfg(not(feature = "parallel"))]
fn compute_journeys(
    visible: &[&TrackerRecords<'_>],
    uploader: Option<UserId>,
) -> Result<Vec<JourneyStats>> {
    visible
        .iter()
        .map(|t| analyze_journey(t.scoped_records(uploader)))
        .collect()
}

#[cfg(feature = "parallel")]
fn compute_journeys(
    visible: &[&TrackerRecords<'_>],
    uploader: Option<UserId>,
) -> Result<Vec<JourneyStats>> {
    visible
        .par_iter()
        .map(|t| analyze_journey(t.scoped_records(uploader)))
        .collect()
}

/// Distinct uploader ids across all trackers, in first-seen order.
pub fn distinct_uploaders(trackers: &[TrackerRecords<'_>]) -> Vec<UserId> {
    let mut seen = HashSet::new();
    trackers
        .iter()
        .flat_map(|t| t.records.iter())
        .filter_map(|r| r.uploaded_by)
        .filter(|user| seen.insert(*user))
        .collect()
}
