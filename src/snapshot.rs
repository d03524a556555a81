//! Immutable investigation snapshots.
//!
//! Fetching trackers and locations belongs to a data-access collaborator
//! behind [`LocationSource`]. A snapshot is loaded once and every statistic is
//! then recomputed from it on demand; nothing derived is stored.
//!
//! ## Example
//!
//! ```rust
//! use tracker_journeys::{
//!     CampaignConfig, Investigation, InvestigationSnapshot, LocationRecord, Tracker, Visibility,
//! };
//!
//! let investigation = Investigation::new(1, "Cup Trail", "Acme");
//! let trackers = vec![Tracker::new(10, 1, "Cup #1", "airtag")];
//! let records = vec![
//!     LocationRecord::new(100, 10, "Store").with_coordinates(40.0, -74.0),
//! ];
//!
//! let snapshot = InvestigationSnapshot::from_parts(investigation, trackers, records).unwrap();
//! let stats = snapshot.campaign(&Visibility::All, &CampaignConfig::default()).unwrap();
//! assert_eq!(stats.active_tracker_count, 1);
//! ```

use std::collections::HashMap;

use log::{info, warn};

use crate::campaign::{
    analyze_campaign, distinct_uploaders, CampaignConfig, CampaignStats, TrackerRecords, Visibility,
};
use crate::export::{export_investigation_csv, export_tracker_csv, ExportConfig};
use crate::journey::{analyze_journey, JourneyStats};
use crate::summary::{summarize_investigation, InvestigationSummary, SummaryConfig};
use crate::{
    Investigation, InvestigationId, JourneyError, LocationRecord, Result, Tracker, TrackerId,
    UserId,
};

/// Data-access collaborator supplying complete, validated collections.
///
/// Implementations own all I/O, retries and authorization. Failures should be
/// reported as [`JourneyError::DataSource`].
pub trait LocationSource {
    fn investigation(&self, investigation_id: InvestigationId) -> Result<Investigation>;

    /// All trackers owned by an investigation.
    fn trackers(&self, investigation_id: InvestigationId) -> Result<Vec<Tracker>>;

    /// All location records owned by a tracker.
    fn locations(&self, tracker_id: TrackerId) -> Result<Vec<LocationRecord>>;
}

/// One consistent, read-only view of an investigation and its records.
#[derive(Debug, Clone)]
pub struct InvestigationSnapshot {
    investigation: Investigation,
    /// Trackers in source order, each with its own records
    entries: Vec<(Tracker, Vec<LocationRecord>)>,
}

impl InvestigationSnapshot {
    /// Materialize a snapshot from a data source.
    pub fn load<S: LocationSource + ?Sized>(
        source: &S,
        investigation_id: InvestigationId,
    ) -> Result<Self> {
        let investigation = source.investigation(investigation_id)?;
        let trackers = source.trackers(investigation_id)?;

        let mut records = Vec::new();
        for tracker in &trackers {
            records.extend(source.locations(tracker.id)?);
        }

        let snapshot = Self::from_parts(investigation, trackers, records)?;
        info!(
            "[Snapshot] loaded investigation {} with {} trackers and {} locations",
            investigation_id,
            snapshot.entries.len(),
            snapshot.location_count()
        );
        Ok(snapshot)
    }

    /// Build a snapshot from already-fetched collections.
    ///
    /// Records are assigned to trackers by `tracker_id`, keeping their input
    /// order. Trackers belonging to another investigation are skipped. A record
    /// naming a tracker that is not part of the snapshot is an error.
    pub fn from_parts(
        investigation: Investigation,
        trackers: Vec<Tracker>,
        records: Vec<LocationRecord>,
    ) -> Result<Self> {
        let mut entries: Vec<(Tracker, Vec<LocationRecord>)> = Vec::with_capacity(trackers.len());
        let mut index: HashMap<TrackerId, usize> = HashMap::with_capacity(trackers.len());

        for tracker in trackers {
            if tracker.investigation_id != investigation.id {
                warn!(
                    "[Snapshot] tracker {} belongs to investigation {}, not {}; skipping",
                    tracker.id, tracker.investigation_id, investigation.id
                );
                continue;
            }
            if index.contains_key(&tracker.id) {
                warn!("[Snapshot] duplicate tracker {}; keeping the first", tracker.id);
                continue;
            }
            index.insert(tracker.id, entries.len());
            entries.push((tracker, Vec::new()));
        }

        for record in records {
            let slot = *index.get(&record.tracker_id).ok_or(JourneyError::UnknownTracker {
                tracker_id: record.tracker_id,
            })?;
            entries[slot].1.push(record);
        }

        Ok(Self {
            investigation,
            entries,
        })
    }

    pub fn investigation(&self) -> &Investigation {
        &self.investigation
    }

    /// Trackers in source order.
    pub fn trackers(&self) -> impl Iterator<Item = &Tracker> {
        self.entries.iter().map(|(tracker, _)| tracker)
    }

    pub fn location_count(&self) -> usize {
        self.entries.iter().map(|(_, records)| records.len()).sum()
    }

    /// Borrowed per-tracker views for the aggregation functions.
    pub fn tracker_records(&self) -> Vec<TrackerRecords<'_>> {
        self.entries
            .iter()
            .map(|(tracker, records)| TrackerRecords::new(tracker, records))
            .collect()
    }

    /// Records of one tracker.
    pub fn records_for(&self, tracker_id: TrackerId) -> Result<&[LocationRecord]> {
        self.entry(tracker_id).map(|(_, records)| records.as_slice())
    }

    /// Journey statistics for one tracker.
    pub fn journey(&self, tracker_id: TrackerId) -> Result<JourneyStats> {
        let (_, records) = self.entry(tracker_id)?;
        analyze_journey(records)
    }

    /// Campaign statistics across the visible trackers.
    pub fn campaign(
        &self,
        visibility: &Visibility,
        config: &CampaignConfig,
    ) -> Result<CampaignStats> {
        analyze_campaign(&self.tracker_records(), visibility, config)
    }

    /// Final destination summary for the whole investigation.
    pub fn summary(&self, config: &SummaryConfig) -> InvestigationSummary {
        summarize_investigation(&self.investigation, &self.tracker_records(), config)
    }

    /// CSV export of one tracker's journey.
    pub fn export_tracker(&self, tracker_id: TrackerId, config: &ExportConfig) -> Result<String> {
        let (tracker, records) = self.entry(tracker_id)?;
        let journey = analyze_journey(records)?;
        export_tracker_csv(tracker, records, &journey, config)
    }

    /// CSV export of every tracker in the investigation.
    pub fn export_all(&self) -> Result<String> {
        export_investigation_csv(&self.tracker_records())
    }

    /// Distinct uploaders across the investigation, first-seen order.
    pub fn uploaders(&self) -> Vec<UserId> {
        distinct_uploaders(&self.tracker_records())
    }

    fn entry(&self, tracker_id: TrackerId) -> Result<&(Tracker, Vec<LocationRecord>)> {
        self.entries
            .iter()
            .find(|(tracker, _)| tracker.id == tracker_id)
            .ok_or(JourneyError::UnknownTracker { tracker_id })
    }
}
