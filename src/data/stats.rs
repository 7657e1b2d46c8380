//! Mean and spread statistics per measurement channel.

use super::reading::Reading;

/// Mean and population standard deviation for one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStats {
    pub mean: f64,
    pub std_dev: f64,
}

impl ChannelStats {
    /// Compute stats over raw channel values.
    ///
    /// Returns `None` for an empty slice. The standard deviation is
    /// the population form: squared deviations divided by the count,
    /// so a single value yields a deviation of zero.
    pub fn compute(values: &[i32]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let count = values.len() as f64;
        let mean = values.iter().map(|v| f64::from(*v)).sum::<f64>() / count;
        let variance = values
            .iter()
            .map(|v| {
                let delta = f64::from(*v) - mean;
                delta * delta
            })
            .sum::<f64>()
            / count;

        Some(Self {
            mean,
            std_dev: variance.sqrt(),
        })
    }
}

/// Per-channel statistics for one cohort.
#[derive(Debug, Clone)]
pub struct CohortSummary {
    /// Display name of the cohort.
    pub label: String,
    /// Number of readings summarized.
    pub count: usize,
    pub systolic: ChannelStats,
    pub diastolic: ChannelStats,
    pub pulse: ChannelStats,
}

impl CohortSummary {
    /// Summarize a cohort. Returns `None` when the cohort is empty, so
    /// callers never render aggregates built from no data.
    pub fn compute(label: &str, readings: &[Reading]) -> Option<Self> {
        let systolic: Vec<i32> = readings.iter().map(|r| r.systolic).collect();
        let diastolic: Vec<i32> = readings.iter().map(|r| r.diastolic).collect();
        let pulse: Vec<i32> = readings.iter().map(|r| r.pulse).collect();

        Some(Self {
            label: label.to_string(),
            count: readings.len(),
            systolic: ChannelStats::compute(&systolic)?,
            diastolic: ChannelStats::compute(&diastolic)?,
            pulse: ChannelStats::compute(&pulse)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::reading::{parse_timestamp, parse_utc_offset};

    fn reading(ts: &str, systolic: i32, diastolic: i32, pulse: i32) -> Reading {
        let offset = parse_utc_offset("+02:00").unwrap();
        Reading::new(parse_timestamp(ts, offset).unwrap(), systolic, diastolic, pulse)
    }

    #[test]
    fn test_channel_stats_reference_values() {
        let stats = ChannelStats::compute(&[120, 130, 140]).unwrap();
        assert!((stats.mean - 130.0).abs() < 1e-9);
        assert!((stats.std_dev - 8.16496580927726).abs() < 1e-9);
    }

    #[test]
    fn test_channel_stats_single_value() {
        let stats = ChannelStats::compute(&[125]).unwrap();
        assert!((stats.mean - 125.0).abs() < 1e-9);
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn test_channel_stats_empty() {
        assert!(ChannelStats::compute(&[]).is_none());
    }

    #[test]
    fn test_cohort_summary() {
        let readings = vec![
            reading("2024-03-15 07:30:00", 120, 80, 60),
            reading("2024-03-16 07:30:00", 130, 85, 65),
            reading("2024-03-17 07:30:00", 140, 90, 70),
        ];

        let summary = CohortSummary::compute("Morgens", &readings).unwrap();
        assert_eq!(summary.label, "Morgens");
        assert_eq!(summary.count, 3);
        assert!((summary.systolic.mean - 130.0).abs() < 1e-9);
        assert!((summary.diastolic.mean - 85.0).abs() < 1e-9);
        assert!((summary.pulse.mean - 65.0).abs() < 1e-9);
        assert!((summary.systolic.std_dev - 8.16496580927726).abs() < 1e-9);
    }

    #[test]
    fn test_cohort_summary_empty_cohort() {
        assert!(CohortSummary::compute("Abends", &[]).is_none());
    }

    #[test]
    fn test_pulse_zero_flows_into_stats() {
        let readings = vec![
            reading("2024-03-15 07:30:00", 120, 80, 0),
            reading("2024-03-16 07:30:00", 120, 80, 60),
        ];

        let summary = CohortSummary::compute("Komplett", &readings).unwrap();
        assert!((summary.pulse.mean - 30.0).abs() < 1e-9);
    }
}
