//! End-to-end journey scenarios through the public API.

use chrono::{DateTime, Duration, TimeZone, Utc};
use tracker_journeys::{
    analyze_campaign, analyze_journey, export_tracker_csv, haversine_distance, parse_records_json,
    sequence_records, summarize_investigation, CampaignConfig, ExportConfig, GeoPoint,
    Investigation, InvestigationSnapshot, JourneyError, LocationCategory, LocationRecord,
    SummaryConfig, Tracker, TrackerRecords, Visibility,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap() + Duration::days(n)
}

/// Degrees of latitude spanning roughly `meters` on the mean-radius sphere.
fn lat_offset(meters: f64) -> f64 {
    meters / 111_195.08
}

fn walk(tracker_id: i64, stops: usize) -> Vec<LocationRecord> {
    (0..stops)
        .map(|i| {
            LocationRecord::new(tracker_id * 1000 + i as i64, tracker_id, "stop")
                .with_coordinates(35.0 + i as f64 * 0.05 * tracker_id as f64, -80.0)
                .with_timestamp(day(i as i64))
        })
        .collect()
}

#[test]
fn test_same_coordinates_have_zero_distance() {
    let a = GeoPoint::new(47.6062, -122.3321);
    assert_eq!(haversine_distance(&a, &a).unwrap(), 0.0);
}

#[test]
fn test_one_degree_on_equator() {
    let d = haversine_distance(&GeoPoint::new(0.0, 0.0), &GeoPoint::new(0.0, 1.0)).unwrap();
    assert!((d - 111_195.08).abs() / 111_195.08 < 0.001, "got {}", d);
}

#[test]
fn test_invalid_coordinate_fails_loudly() {
    let result = haversine_distance(&GeoPoint::new(f64::NAN, 0.0), &GeoPoint::new(0.0, 0.0));
    assert!(matches!(result, Err(JourneyError::InvalidCoordinate { .. })));
}

#[test]
fn test_sequencing_is_idempotent_and_stable() {
    let records = vec![
        LocationRecord::new(1, 1, "no time a"),
        LocationRecord::new(2, 1, "late").with_timestamp(day(5)),
        LocationRecord::new(3, 1, "no time b"),
        LocationRecord::new(4, 1, "early").with_timestamp(day(1)),
    ];

    let once: Vec<LocationRecord> = sequence_records(&records).into_iter().cloned().collect();
    let ids: Vec<i64> = once.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![4, 2, 1, 3]);

    let twice: Vec<i64> = sequence_records(&once).iter().map(|r| r.id).collect();
    assert_eq!(twice, ids);
}

#[test]
fn test_untimestamped_record_scenario() {
    init_logging();
    let b = lat_offset(10_000.0);
    let records = vec![
        LocationRecord::new(3, 1, "C").with_coordinates(41.0, 1.0),
        LocationRecord::new(2, 1, "B")
            .with_coordinates(b, 0.0)
            .with_timestamp(day(1)),
        LocationRecord::new(1, 1, "A")
            .with_coordinates(0.0, 0.0)
            .with_timestamp(day(0)),
    ];

    let journey = analyze_journey(&records).unwrap();
    assert_eq!(journey.path, vec![1, 2]);
    assert_eq!(journey.segments.len(), 1);
    assert!((journey.total_distance - 10_000.0).abs() < 1.0);

    let span = journey.time_span.as_ref().unwrap();
    assert_eq!(span.elapsed.days, 1);
    assert_eq!(span.elapsed.hours, 0);

    // C still counts for the map
    assert_eq!(journey.geocoded_count, 3);
}

#[test]
fn test_total_distance_is_sum_of_segments() {
    let mut records = walk(3, 6);
    // Ungeocoded stop in the middle is skipped spatially but kept in time gaps
    records.insert(
        2,
        LocationRecord::new(9, 3, "pending").with_timestamp(day(1) + Duration::hours(6)),
    );

    let journey = analyze_journey(&records).unwrap();
    let sum: f64 = journey.segments.iter().map(|s| s.distance_meters).sum();
    assert_eq!(journey.total_distance, sum);
    assert_eq!(journey.segments.len(), 5);
    assert_eq!(journey.time_gaps.len(), 6);
    assert!(journey.time_gaps.iter().any(|g| g.distance_meters.is_none()));
}

#[test]
fn test_no_movement_is_distinct_from_zero() {
    let single = vec![LocationRecord::new(1, 1, "only")
        .with_coordinates(10.0, 10.0)
        .with_timestamp(day(0))];
    let journey = analyze_journey(&single).unwrap();
    assert_eq!(journey.total_distance, 0.0);
    assert_eq!(journey.average_segment_distance, None);
    assert!(journey.time_span.is_none());
    assert!(!journey.has_movement_data());

    let standing_still = vec![
        LocationRecord::new(1, 1, "here")
            .with_coordinates(10.0, 10.0)
            .with_timestamp(day(0)),
        LocationRecord::new(2, 1, "here")
            .with_coordinates(10.0, 10.0)
            .with_timestamp(day(1)),
    ];
    let journey = analyze_journey(&standing_still).unwrap();
    assert_eq!(journey.average_segment_distance, Some(0.0));
}

#[test]
fn test_visibility_changes_total_by_one_contribution() {
    init_logging();
    let trackers = vec![
        Tracker::new(1, 1, "one", "apple"),
        Tracker::new(2, 1, "two", "apple"),
        Tracker::new(3, 1, "three", "google"),
    ];
    let records: Vec<Vec<LocationRecord>> = trackers.iter().map(|t| walk(t.id, 4)).collect();
    let entries: Vec<TrackerRecords> = trackers
        .iter()
        .zip(records.iter())
        .map(|(t, r)| TrackerRecords::new(t, r))
        .collect();

    let config = CampaignConfig::default();
    let all = analyze_campaign(&entries, &Visibility::All, &config).unwrap();
    let without_two = analyze_campaign(&entries, &Visibility::hiding([2]), &config).unwrap();

    let two = analyze_journey(&records[1]).unwrap().total_distance;
    assert!((all.total_distance - without_two.total_distance - two).abs() < 1e-6);
    assert_eq!(all.active_tracker_count, 3);
    assert_eq!(without_two.active_tracker_count, 2);

    let journeys_sum: f64 = records
        .iter()
        .map(|r| analyze_journey(r).unwrap().total_distance)
        .sum();
    assert!((all.total_distance - journeys_sum).abs() < 1e-6);

    // Step size grows with the tracker id
    assert_eq!(all.furthest_tracker.as_ref().map(|f| f.tracker_id), Some(3));
}

#[test]
fn test_destination_breakdown_scenario() {
    let investigation = Investigation::new(1, "Bottle Trail", "Acme");
    let trackers = vec![
        Tracker::new(1, 1, "A", "apple"),
        Tracker::new(2, 1, "B", "apple"),
        Tracker::new(3, 1, "C", "apple"),
    ];
    let landfill = |id: i64, tracker_id: i64, state: &str| {
        LocationRecord::new(id, tracker_id, "Landfill Rd")
            .with_coordinates(40.0, -75.0)
            .with_timestamp(day(3))
            .with_category(LocationCategory::Landfill)
            .with_place("Town", state, "00000")
    };
    let records = vec![
        vec![
            LocationRecord::new(10, 1, "Store").with_timestamp(day(0)),
            landfill(11, 1, "PA"),
        ],
        vec![landfill(20, 2, "NJ")],
        vec![LocationRecord::new(30, 3, "Store").with_coordinates(40.0, -74.0)],
    ];
    let entries: Vec<TrackerRecords> = trackers
        .iter()
        .zip(records.iter())
        .map(|(t, r)| TrackerRecords::new(t, r))
        .collect();

    let summary = summarize_investigation(&investigation, &entries, &SummaryConfig::default());
    assert_eq!(summary.total_trackers, 3);
    assert_eq!(summary.trackers_with_destination, 2);
    assert_eq!(summary.destination_breakdown.len(), 1);
    assert_eq!(summary.count_for(&LocationCategory::Landfill), 2);
    assert_eq!(summary.percentage_for(&LocationCategory::Landfill), 67);

    let counted: usize = summary.destination_breakdown.iter().map(|c| c.count).sum();
    assert_eq!(counted, summary.trackers_with_destination);
    assert_eq!(summary.states_reached(), 2);
}

#[test]
fn test_export_is_byte_deterministic() {
    let tracker = Tracker::new(5, 1, "Cup \"5\"", "apple");
    let records = walk(5, 4);
    let journey = analyze_journey(&records).unwrap();
    let config = ExportConfig::default();

    let first = export_tracker_csv(&tracker, &records, &journey, &config).unwrap();
    let second = export_tracker_csv(&tracker, &records, &journey, &config).unwrap();
    assert_eq!(first.as_bytes(), second.as_bytes());
    assert_eq!(first.lines().count(), 5);
}

#[test]
fn test_statistics_serialize_to_json() {
    let records = walk(2, 3);
    let journey = analyze_journey(&records).unwrap();
    let value = serde_json::to_value(&journey).unwrap();

    assert_eq!(value["segments"].as_array().map(Vec::len), Some(2));
    assert!(value["total_distance"].as_f64().unwrap() > 0.0);
    assert_eq!(value["time_span"]["elapsed"]["days"], 2);

    let landfill = serde_json::to_value(LocationCategory::Landfill).unwrap();
    assert_eq!(landfill, serde_json::json!("landfill"));
}

#[test]
fn test_json_ingest_to_snapshot() {
    init_logging();
    let json = r#"[
        {"id": 1, "tracker_id": 7, "address": "Store", "latitude": "39.95", "longitude": "-75.16",
         "screenshot_timestamp": "2024-04-01T08:00:00Z", "location_type": "starting_point", "uploaded_by": 2},
        {"id": 2, "tracker_id": 7, "address": "MRF", "latitude": "40.05", "longitude": "-75.10",
         "state": "PA", "screenshot_timestamp": "2024-04-03T17:30:00Z", "location_type": "mrf", "uploaded_by": 2},
        {"id": 3, "tracker_id": 7, "address": "Unknown lot", "latitude": "", "longitude": ""}
    ]"#;
    let records = parse_records_json(json).unwrap();

    let snapshot = InvestigationSnapshot::from_parts(
        Investigation::new(4, "Cups", "Acme"),
        vec![Tracker::new(7, 4, "Cup #7", "apple")],
        records,
    )
    .unwrap();

    let journey = snapshot.journey(7).unwrap();
    assert_eq!(journey.record_count, 3);
    assert_eq!(journey.segments.len(), 1);
    let gap = &journey.time_gaps[0];
    assert_eq!((gap.elapsed.days, gap.elapsed.hours), (2, 9));
    assert!(gap.narrative().starts_with("2 days 9 hours later, "));

    let summary = snapshot.summary(&SummaryConfig::default());
    assert_eq!(summary.percentage_for(&LocationCategory::Mrf), 100);
    assert_eq!(snapshot.uploaders(), vec![2]);
}
