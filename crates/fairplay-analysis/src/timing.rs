//! Move-timing profile of one player in one game.

use serde::{Deserialize, Serialize};

use crate::probes;

/// Coefficient of variation under which timing looks machine-like.
pub const CONSISTENT_CV: f64 = 0.3;
/// Moves faster than this are "rapid responses".
pub const RAPID_SECONDS: f64 = 1.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimePattern {
    pub avg_time: f64,
    pub median_time: f64,
    pub std_dev: f64,
    /// std_dev / mean; 0 without at least two times
    pub time_coefficient_variation: f64,
    pub suspicious_consistency: bool,
    pub rapid_responses: usize,
}

impl TimePattern {
    /// Empty input leaves every field at its default.
    pub fn from_times(times: &[f64]) -> Self {
        let Some(avg_time) = probes::mean(times) else {
            return Self::default();
        };

        let std_dev = probes::sample_stdev(times);
        let cv = if times.len() > 1 && avg_time > 0.0 {
            std_dev / avg_time
        } else {
            0.0
        };

        Self {
            avg_time,
            median_time: probes::median(times).unwrap_or(0.0),
            std_dev,
            time_coefficient_variation: cv,
            suspicious_consistency: cv < CONSISTENT_CV,
            rapid_responses: times.iter().filter(|t| **t < RAPID_SECONDS).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_times_is_default() {
        let pattern = TimePattern::from_times(&[]);
        assert_eq!(pattern, TimePattern::default());
        assert!(!pattern.suspicious_consistency);
    }

    #[test]
    fn steady_times_look_consistent() {
        let pattern = TimePattern::from_times(&[2.0, 2.0, 2.0, 0.5]);
        assert_eq!(pattern.median_time, 2.0);
        assert_eq!(pattern.rapid_responses, 1);
        assert!(pattern.time_coefficient_variation > 0.0);

        let flat = TimePattern::from_times(&[3.0, 3.0, 3.0]);
        assert_eq!(flat.time_coefficient_variation, 0.0);
        assert!(flat.suspicious_consistency);
    }

    #[test]
    fn erratic_times_are_not_consistent() {
        let pattern = TimePattern::from_times(&[1.0, 30.0, 2.0, 60.0]);
        assert!(pattern.time_coefficient_variation > CONSISTENT_CV);
        assert!(!pattern.suspicious_consistency);
    }
}
