//! Final destination classification and investigation summary.
//!
//! A tracker's final destination is its chronologically last timestamped
//! record. Trackers without one drop out of the destination breakdown, but
//! percentages are still taken over the whole fleet, so they read as "share
//! of all trackers that ended at X" and may sum to less than 100.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::campaign::TrackerRecords;
use crate::sequence::final_destination;
use crate::{Investigation, LocationCategory, LocationId, TrackerId};

/// Ordering of the state breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateOrder {
    /// Order of first occurrence in tracker order
    #[default]
    FirstSeen,
    /// Highest tracker count first, ties in first-seen order
    CountDescending,
}

/// Configuration for investigation summaries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Default: first-seen order
    #[serde(default)]
    pub state_order: StateOrder,
}

/// Where a tracker's journey ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalDestination {
    pub location_id: LocationId,
    pub address: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub category: LocationCategory,
}

/// Per-tracker line of the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerSummary {
    pub tracker_id: TrackerId,
    pub name: String,
    pub emoji: Option<String>,
    pub platform: String,
    pub location_count: usize,
    pub final_destination: Option<FinalDestination>,
}

/// Trackers whose final destination carries a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: LocationCategory,
    pub count: usize,
    /// round(count / total trackers × 100)
    pub percentage: u32,
}

/// Trackers whose final destination lies in a state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateCount {
    pub state: String,
    pub tracker_count: usize,
}

/// Investigation-wide destination summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationSummary {
    pub investigation: Investigation,
    pub total_trackers: usize,
    pub total_locations: usize,
    pub trackers_with_destination: usize,
    /// Highest count first, ties in first-seen order
    pub destination_breakdown: Vec<CategoryCount>,
    pub state_breakdown: Vec<StateCount>,
    pub trackers: Vec<TrackerSummary>,
}

impl InvestigationSummary {
    pub fn states_reached(&self) -> usize {
        self.state_breakdown.len()
    }

    pub fn count_for(&self, category: &LocationCategory) -> usize {
        self.destination_breakdown
            .iter()
            .find(|c| &c.category == category)
            .map_or(0, |c| c.count)
    }

    pub fn percentage_for(&self, category: &LocationCategory) -> u32 {
        self.destination_breakdown
            .iter()
            .find(|c| &c.category == category)
            .map_or(0, |c| c.percentage)
    }
}

/// Record id chosen as final destination for each tracker that has one.
pub fn final_destinations(trackers: &[TrackerRecords<'_>]) -> Vec<(TrackerId, LocationId)> {
    trackers
        .iter()
        .filter_map(|t| final_destination(t.records).map(|r| (t.tracker.id, r.id)))
        .collect()
}

/// Summarize final destinations across an investigation's trackers.
pub fn summarize_investigation(
    investigation: &Investigation,
    trackers: &[TrackerRecords<'_>],
    config: &SummaryConfig,
) -> InvestigationSummary {
    let tracker_summaries: Vec<TrackerSummary> = trackers.iter().map(summarize_tracker).collect();
    let destinations: Vec<&FinalDestination> = tracker_summaries
        .iter()
        .filter_map(|t| t.final_destination.as_ref())
        .collect();

    let total_trackers = trackers.len();
    let destination_breakdown = count_categories(&destinations, total_trackers);
    let state_breakdown = count_states(&destinations, config.state_order);

    debug!(
        "[Summary] investigation {}: {} trackers, {} with a final destination, {} states",
        investigation.id,
        total_trackers,
        destinations.len(),
        state_breakdown.len()
    );

    InvestigationSummary {
        investigation: investigation.clone(),
        total_trackers,
        total_locations: trackers.iter().map(|t| t.records.len()).sum(),
        trackers_with_destination: destinations.len(),
        destination_breakdown,
        state_breakdown,
        trackers: tracker_summaries,
    }
}

fn summarize_tracker(entry: &TrackerRecords<'_>) -> TrackerSummary {
    let destination = final_destination(entry.records).map(|r| FinalDestination {
        location_id: r.id,
        address: r.address.clone(),
        city: r.city.clone(),
        state: r.state_name().map(str::to_string),
        category: r.category.clone(),
    });

    TrackerSummary {
        tracker_id: entry.tracker.id,
        name: entry.tracker.name.clone(),
        emoji: entry.tracker.emoji.clone(),
        platform: entry.tracker.platform.clone(),
        location_count: entry.records.len(),
        final_destination: destination,
    }
}

fn percentage(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (count as f64 / total as f64 * 100.0).round() as u32
}

fn count_categories(
    destinations: &[&FinalDestination],
    total_trackers: usize,
) -> Vec<CategoryCount> {
    let mut order: Vec<LocationCategory> = Vec::new();
    let mut counts: HashMap<LocationCategory, usize> = HashMap::new();
    for destination in destinations {
        let count = counts.entry(destination.category.clone()).or_insert(0);
        if *count == 0 {
            order.push(destination.category.clone());
        }
        *count += 1;
    }

    let mut breakdown: Vec<CategoryCount> = order
        .into_iter()
        .map(|category| {
            let count = counts[&category];
            CategoryCount {
                percentage: percentage(count, total_trackers),
                category,
                count,
            }
        })
        .collect();
    // Stable: equal counts keep first-seen order
    breakdown.sort_by(|a, b| b.count.cmp(&a.count));
    breakdown
}

fn count_states(destinations: &[&FinalDestination], order: StateOrder) -> Vec<StateCount> {
    let mut breakdown: Vec<StateCount> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for state in destinations.iter().filter_map(|d| d.state.as_deref()) {
        match index.get(state) {
            Some(&i) => breakdown[i].tracker_count += 1,
            None => {
                index.insert(state, breakdown.len());
                breakdown.push(StateCount {
                    state: state.to_string(),
                    tracker_count: 1,
                });
            }
        }
    }

    if order == StateOrder::CountDescending {
        breakdown.sort_by(|a, b| b.tracker_count.cmp(&a.tracker_count));
    }
    breakdown
}
