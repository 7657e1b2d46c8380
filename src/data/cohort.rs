//! Temporal classification of readings into cohorts.
//!
//! Readings are classified per calendar day, in each reading's stored
//! offset. The morning cohort holds the earliest reading of each day
//! whose time of day falls in the 04:00-12:00 window (both ends
//! inclusive); the evening cohort holds the latest reading of each day
//! taken at or after 18:00. A day can contribute one reading to each
//! cohort; days without a qualifying reading contribute nothing.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};

use super::reading::Reading;

/// The three cohorts derived from a set of readings.
#[derive(Debug, Clone)]
pub struct Cohorts {
    /// All readings in the requested range, ascending by timestamp.
    pub complete: Vec<Reading>,
    /// Per day, the earliest reading in the morning window.
    pub morning: Vec<Reading>,
    /// Per day, the latest reading in the evening window.
    pub evening: Vec<Reading>,
}

impl Cohorts {
    /// Sort, filter, and classify readings in one pass.
    pub fn classify(
        readings: Vec<Reading>,
        start: Option<DateTime<FixedOffset>>,
        end: Option<DateTime<FixedOffset>>,
    ) -> Self {
        let complete = filter_range(sort_by_time(readings), start, end);
        let morning = morning_readings(&complete);
        let evening = evening_readings(&complete);

        Self {
            complete,
            morning,
            evening,
        }
    }
}

/// Sort readings ascending by timestamp.
///
/// The sort is stable: readings with equal timestamps keep their input
/// order. Sorting an already sorted list is a no-op.
pub fn sort_by_time(mut readings: Vec<Reading>) -> Vec<Reading> {
    readings.sort_by_key(|r| r.timestamp);
    readings
}

/// Keep readings within the inclusive `[start, end]` range.
///
/// A `None` bound leaves that side unbounded; with both bounds `None`
/// the input is returned unchanged.
pub fn filter_range(
    readings: Vec<Reading>,
    start: Option<DateTime<FixedOffset>>,
    end: Option<DateTime<FixedOffset>>,
) -> Vec<Reading> {
    readings
        .into_iter()
        .filter(|r| {
            start.map_or(true, |s| r.timestamp >= s) && end.map_or(true, |e| r.timestamp <= e)
        })
        .collect()
}

/// Select the first reading of each day taken between 04:00 and 12:00
/// (inclusive). Output is ascending by date.
pub fn morning_readings(readings: &[Reading]) -> Vec<Reading> {
    let mut picks = Vec::new();

    for entries in group_by_date(readings).values_mut() {
        entries.sort_by_key(|r| r.timestamp);
        if let Some(first) = entries.iter().find(|r| in_morning_window(r.time())) {
            picks.push(first.clone());
        }
    }

    picks
}

/// Select the last reading of each day taken at or after 18:00.
/// Output is ascending by date.
pub fn evening_readings(readings: &[Reading]) -> Vec<Reading> {
    let mut picks = Vec::new();

    for entries in group_by_date(readings).values_mut() {
        entries.sort_by_key(|r| r.timestamp);
        if let Some(last) = entries.iter().rev().find(|r| in_evening_window(r.time())) {
            picks.push(last.clone());
        }
    }

    picks
}

/// Group readings by calendar date, preserving input order per day.
fn group_by_date(readings: &[Reading]) -> BTreeMap<NaiveDate, Vec<Reading>> {
    let mut by_day: BTreeMap<NaiveDate, Vec<Reading>> = BTreeMap::new();
    for reading in readings {
        by_day.entry(reading.date()).or_default().push(reading.clone());
    }
    by_day
}

fn in_morning_window(t: NaiveTime) -> bool {
    let start = NaiveTime::from_hms_opt(4, 0, 0).expect("valid time");
    let end = NaiveTime::from_hms_opt(12, 0, 0).expect("valid time");
    t >= start && t <= end
}

fn in_evening_window(t: NaiveTime) -> bool {
    let start = NaiveTime::from_hms_opt(18, 0, 0).expect("valid time");
    t >= start
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::reading::{parse_timestamp, parse_utc_offset};

    fn reading(ts: &str, systolic: i32) -> Reading {
        let offset = parse_utc_offset("+02:00").unwrap();
        Reading::new(parse_timestamp(ts, offset).unwrap(), systolic, 80, 60)
    }

    #[test]
    fn test_morning_picks_first_in_window() {
        let readings = vec![
            reading("2024-03-15 03:00:00", 110),
            reading("2024-03-15 05:30:00", 120),
            reading("2024-03-15 09:00:00", 130),
            reading("2024-03-15 14:00:00", 140),
        ];

        let morning = morning_readings(&readings);
        assert_eq!(morning.len(), 1);
        assert_eq!(morning[0].systolic, 120);
    }

    #[test]
    fn test_evening_picks_last_in_window() {
        let readings = vec![
            reading("2024-03-15 17:00:00", 110),
            reading("2024-03-15 19:00:00", 120),
            reading("2024-03-15 21:45:00", 130),
        ];

        let evening = evening_readings(&readings);
        assert_eq!(evening.len(), 1);
        assert_eq!(evening[0].systolic, 130);
    }

    #[test]
    fn test_day_without_window_contributes_nothing() {
        let readings = vec![
            reading("2024-03-15 13:00:00", 110),
            reading("2024-03-15 14:30:00", 120),
        ];

        assert!(morning_readings(&readings).is_empty());
        assert!(evening_readings(&readings).is_empty());
    }

    #[test]
    fn test_window_boundaries_are_inclusive() {
        let readings = vec![
            reading("2024-03-15 04:00:00", 110),
            reading("2024-03-16 12:00:00", 120),
            reading("2024-03-17 18:00:00", 130),
        ];

        let morning = morning_readings(&readings);
        assert_eq!(morning.len(), 2);
        assert_eq!(morning[0].systolic, 110);
        assert_eq!(morning[1].systolic, 120);

        let evening = evening_readings(&readings);
        assert_eq!(evening.len(), 1);
        assert_eq!(evening[0].systolic, 130);
    }

    #[test]
    fn test_morning_just_outside_window() {
        let readings = vec![
            reading("2024-03-15 03:59:59", 110),
            reading("2024-03-15 12:00:01", 120),
        ];

        assert!(morning_readings(&readings).is_empty());
    }

    #[test]
    fn test_cohorts_cover_multiple_days() {
        let readings = vec![
            reading("2024-03-15 07:30:00", 121),
            reading("2024-03-15 21:00:00", 131),
            reading("2024-03-16 08:00:00", 122),
            reading("2024-03-16 22:15:00", 132),
        ];

        let cohorts = Cohorts::classify(readings, None, None);
        assert_eq!(cohorts.complete.len(), 4);
        assert_eq!(cohorts.morning.len(), 2);
        assert_eq!(cohorts.evening.len(), 2);
        assert_eq!(cohorts.morning[0].systolic, 121);
        assert_eq!(cohorts.morning[1].systolic, 122);
        assert_eq!(cohorts.evening[0].systolic, 131);
        assert_eq!(cohorts.evening[1].systolic, 132);
    }

    #[test]
    fn test_filter_unbounded_is_identity() {
        let readings = vec![
            reading("2024-03-15 07:30:00", 121),
            reading("2024-03-16 08:00:00", 122),
        ];

        let filtered = filter_range(readings.clone(), None, None);
        assert_eq!(filtered, readings);
    }

    #[test]
    fn test_filter_bounds_are_inclusive() {
        let offset = parse_utc_offset("+02:00").unwrap();
        let start = parse_timestamp("2024-03-15 07:30:00", offset).unwrap();
        let end = parse_timestamp("2024-03-16 08:00:00", offset).unwrap();

        let readings = vec![
            reading("2024-03-15 07:29:59", 110),
            reading("2024-03-15 07:30:00", 120),
            reading("2024-03-16 08:00:00", 130),
            reading("2024-03-16 08:00:01", 140),
        ];

        let filtered = filter_range(readings, Some(start), Some(end));
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].systolic, 120);
        assert_eq!(filtered[1].systolic, 130);
    }

    #[test]
    fn test_sort_is_idempotent_and_stable() {
        let readings = vec![
            reading("2024-03-16 08:00:00", 130),
            reading("2024-03-15 07:30:00", 110),
            // Same timestamp twice, distinguished by systolic value
            reading("2024-03-15 07:30:00", 120),
        ];

        let sorted = sort_by_time(readings);
        assert_eq!(sorted[0].systolic, 110);
        assert_eq!(sorted[1].systolic, 120);
        assert_eq!(sorted[2].systolic, 130);

        let resorted = sort_by_time(sorted.clone());
        assert_eq!(resorted, sorted);
    }

    #[test]
    fn test_empty_input_produces_empty_cohorts() {
        let cohorts = Cohorts::classify(Vec::new(), None, None);
        assert!(cohorts.complete.is_empty());
        assert!(cohorts.morning.is_empty());
        assert!(cohorts.evening.is_empty());
    }

    #[test]
    fn test_classification_does_not_alter_values() {
        let readings = vec![reading("2024-03-15 07:30:00", 142)];
        let cohorts = Cohorts::classify(readings, None, None);

        assert_eq!(cohorts.morning[0].systolic, 142);
        assert_eq!(cohorts.morning[0].diastolic, 80);
        assert_eq!(cohorts.morning[0].pulse, 60);
    }
}
