//! Statistical probes, pure functions only.
//! No engine, network or disk access.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Average CPL reported when nothing could be measured.
pub const NO_CPL: f64 = 999.0;

/// Starting point and step of the rating-progression estimate.
const ESTIMATE_START: f64 = 1600.0;
const ESTIMATE_STEP: f64 = 32.0;
const RATING_JUMP: f64 = 50.0;

/// Bucket width for move-time grouping, in seconds.
const TIME_BUCKET: f64 = 0.2;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation; 0 for fewer than two values.
pub fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Accuracy from an average CPL. Flat 50 from 200 upward, so the mapping is
/// not monotonic.
pub fn accuracy_from_cpl(avg_cpl: f64) -> f64 {
    let accuracy = if avg_cpl < 200.0 {
        100.0 - (avg_cpl / 2.0).min(100.0)
    } else {
        50.0
    };
    accuracy.clamp(0.0, 100.0)
}

/// Accuracy of a group of positions: mean absolute score through
/// [`accuracy_from_cpl`]. Positions without a score are ignored.
pub fn phase_accuracy(scores: impl IntoIterator<Item = Option<i32>>) -> f64 {
    let abs: Vec<f64> = scores
        .into_iter()
        .flatten()
        .map(|s| f64::from(s.abs()))
        .collect();
    match mean(&abs) {
        Some(avg) => accuracy_from_cpl(avg),
        None => 0.0,
    }
}

/// How concentrated move times are in one 0.2s bucket, 0-100.
pub fn move_time_consistency(times: &[f64]) -> f64 {
    if times.len() < 5 {
        return 0.0;
    }
    let mut buckets: HashMap<i64, usize> = HashMap::new();
    for t in times {
        *buckets.entry((t / TIME_BUCKET).round_ties_even() as i64).or_default() += 1;
    }
    let largest = buckets.values().copied().max().unwrap_or(0);
    let consistency = largest as f64 / times.len() as f64 * 100.0;
    (consistency - 40.0).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MoveTimePattern {
    pub mean_time: f64,
    pub stdev_time: f64,
    /// Percent
    pub coefficient_variation: f64,
    pub most_common_time: f64,
    pub common_time_percentage: f64,
    pub is_suspicious: bool,
}

/// Distribution of move times grouped to 0.1s.
pub fn move_time_pattern(times: &[f64]) -> Option<MoveTimePattern> {
    let mean_time = mean(times)?;
    let stdev_time = sample_stdev(times);
    let cv = if mean_time > 0.0 {
        stdev_time / mean_time * 100.0
    } else {
        0.0
    };

    let mut groups: HashMap<i64, usize> = HashMap::new();
    for t in times {
        *groups.entry((t * 10.0).round_ties_even() as i64).or_default() += 1;
    }
    let (tenths, count) = groups
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .unwrap_or((0, 0));
    let common_time_percentage = count as f64 / times.len() as f64 * 100.0;

    Some(MoveTimePattern {
        mean_time,
        stdev_time,
        coefficient_variation: cv,
        most_common_time: tenths as f64 / 10.0,
        common_time_percentage,
        is_suspicious: common_time_percentage > 30.0 && cv < 20.0,
    })
}

/// Suspicion from timing: the share of identical move times when the
/// distribution is flagged, else 0.
pub fn move_time_suspicion(times: &[f64]) -> f64 {
    match move_time_pattern(times) {
        Some(p) if p.is_suspicious => p.common_time_percentage.min(100.0),
        _ => 0.0,
    }
}

/// Likelihood-style score for finding the engine move this often.
pub fn probability_correlation(engine_correlation: f64, positions: usize, critical: usize) -> f64 {
    if positions == 0 {
        return 0.0;
    }
    let critical_share = critical as f64 / positions as f64 * 100.0;

    let mut score = 0.0;
    if engine_correlation > 90.0 {
        score = ((engine_correlation - 90.0) * 5.0).min(100.0);
    }
    if critical_share > 95.0 && critical > 3 {
        score += 20.0;
    }
    score.min(100.0)
}

/// Points for master-level accuracy in each phase, capped at 100.
pub fn superhuman_indicator(
    opening: f64,
    middlegame: f64,
    endgame: f64,
    critical: f64,
    engine_correlation: f64,
) -> f64 {
    let mut score: f64 = 0.0;

    if middlegame > 95.0 {
        score += 30.0;
    } else if middlegame > 90.0 {
        score += 15.0;
    }

    if critical > 95.0 {
        score += 25.0;
    } else if critical > 90.0 {
        score += 12.0;
    }

    if endgame > 95.0 {
        score += 20.0;
    } else if endgame > 90.0 {
        score += 10.0;
    }

    if opening > 95.0 {
        score += 15.0;
    }

    if engine_correlation > 92.0 {
        score += 15.0;
    }

    score.min(100.0)
}

/// Perfect openings count 100, strong ones their accuracy, the rest 0.
pub fn opening_preparation(opening_accuracies: &[f64]) -> f64 {
    let scores: Vec<f64> = opening_accuracies
        .iter()
        .map(|&acc| {
            if acc > 95.0 {
                100.0
            } else if acc > 85.0 {
                acc
            } else {
                0.0
            }
        })
        .collect();
    mean(&scores).map(|m| m.min(100.0)).unwrap_or(0.0)
}

/// Jumps above 50 points in a running estimate that moves +/-32 per decisive
/// result. The fixed step means this never fires; kept as fixed behavior.
pub fn rating_jumps(results: &[&str]) -> Vec<f64> {
    if results.len() < 2 {
        return Vec::new();
    }

    let mut estimate = ESTIMATE_START;
    let mut history = Vec::with_capacity(results.len());
    for result in results {
        match *result {
            "1-0" => estimate += ESTIMATE_STEP,
            "0-1" => estimate -= ESTIMATE_STEP,
            _ => {}
        }
        history.push(estimate);
    }

    history
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .filter(|jump| *jump > RATING_JUMP)
        .collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WinRateAnalysis {
    pub win_rate: f64,
    pub expected_win_rate: f64,
    pub anomaly_score: f64,
    pub avg_player_rating: f64,
    pub avg_opponent_rating: f64,
}

/// Score against the Elo expectation. The player is taken to be White and
/// missing ratings count as 1600.
pub fn win_rate_analysis(games: &[(&str, Option<i32>, Option<i32>)]) -> WinRateAnalysis {
    let (mut wins, mut losses, mut draws) = (0usize, 0usize, 0usize);
    let mut player = Vec::with_capacity(games.len());
    let mut opponent = Vec::with_capacity(games.len());

    for (result, white_elo, black_elo) in games {
        player.push(f64::from(white_elo.unwrap_or(1600)));
        opponent.push(f64::from(black_elo.unwrap_or(1600)));
        match *result {
            "1-0" => wins += 1,
            "0-1" => losses += 1,
            "1/2-1/2" => draws += 1,
            _ => {}
        }
    }

    let total = wins + losses + draws;
    if total == 0 {
        return WinRateAnalysis::default();
    }

    let win_rate = (wins as f64 + draws as f64 * 0.5) / total as f64 * 100.0;
    let avg_player_rating = mean(&player).unwrap_or(1600.0);
    let avg_opponent_rating = mean(&opponent).unwrap_or(1600.0);
    let diff = avg_player_rating - avg_opponent_rating;
    let expected_win_rate = 1.0 / (1.0 + 10f64.powf(-diff / 400.0)) * 100.0;

    WinRateAnalysis {
        win_rate,
        expected_win_rate,
        anomaly_score: (win_rate - expected_win_rate).max(0.0),
        avg_player_rating,
        avg_opponent_rating,
    }
}

pub fn endgame_mastery(avg_endgame: f64, avg_middlegame: f64) -> f64 {
    ((avg_endgame - avg_middlegame) * 10.0).clamp(0.0, 100.0)
}

/// Blunders against an expectation of two per game.
pub fn blunder_avoidance(total_blunders: usize, games: usize) -> f64 {
    let expected = (games * 2).max(1) as f64;
    (100.0 - total_blunders as f64 / expected * 100.0).max(0.0)
}

/// Tournament-style performance rating, clamped to +/-800 at the extremes.
pub fn performance_rating(wins: usize, draws: usize, losses: usize, avg_opponent: f64) -> f64 {
    let total = wins + draws + losses;
    if total == 0 {
        return 0.0;
    }
    let pct = (wins as f64 + draws as f64 * 0.5) / total as f64;
    let diff = if pct >= 0.99 {
        800.0
    } else if pct <= 0.01 {
        -800.0
    } else {
        -400.0 * (1.0 / pct - 1.0).log10()
    };
    avg_opponent + diff
}

/// (mean, lower, upper) at 90, 95 or 99 percent; other levels use 95.
pub fn confidence_interval(values: &[f64], confidence: f64) -> (f64, f64, f64) {
    match values.len() {
        0 => (0.0, 0.0, 0.0),
        1 => (values[0], values[0], values[0]),
        n => {
            let m = values.iter().sum::<f64>() / n as f64;
            let z = if (confidence - 0.90).abs() < 1e-9 {
                1.645
            } else if (confidence - 0.99).abs() < 1e-9 {
                2.576
            } else {
                1.960
            };
            let margin = z * sample_stdev(values) / (n as f64).sqrt();
            (m, m - margin, m + margin)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_mapping_is_flat_above_200() {
        assert_eq!(accuracy_from_cpl(0.0), 100.0);
        assert_eq!(accuracy_from_cpl(40.0), 80.0);
        assert_eq!(accuracy_from_cpl(199.0), 0.5);
        assert_eq!(accuracy_from_cpl(200.0), 50.0);
        assert_eq!(accuracy_from_cpl(NO_CPL), 50.0);
    }

    #[test]
    fn phase_accuracy_ignores_missing_scores() {
        assert_eq!(phase_accuracy(vec![]), 0.0);
        assert_eq!(phase_accuracy(vec![None, None]), 0.0);
        assert_eq!(phase_accuracy(vec![Some(20), Some(-20), None]), 90.0);
    }

    #[test]
    fn move_time_consistency_buckets() {
        assert_eq!(move_time_consistency(&[1.0, 1.0, 1.0, 1.0]), 0.0);
        // 8 of 10 in the 2.0s bucket: 80% - 40
        let times = [2.0, 2.05, 1.95, 2.0, 2.0, 2.0, 2.0, 2.0, 7.0, 12.0];
        assert!((move_time_consistency(&times) - 40.0).abs() < 1e-9);
        // Spread out
        let spread = [1.0, 3.0, 5.0, 7.0, 9.0];
        assert_eq!(move_time_consistency(&spread), 0.0);
    }

    #[test]
    fn move_time_pattern_flags_uniform_times() {
        let uniform = [3.0; 10];
        let pattern = move_time_pattern(&uniform).unwrap();
        assert!(pattern.is_suspicious);
        assert_eq!(move_time_suspicion(&uniform), 100.0);
        assert_eq!(move_time_suspicion(&[1.0, 10.0, 30.0, 2.0]), 0.0);
        assert!(move_time_pattern(&[]).is_none());
    }

    #[test]
    fn probability_correlation_rules() {
        assert_eq!(probability_correlation(99.0, 0, 0), 0.0);
        assert_eq!(probability_correlation(90.0, 40, 0), 0.0);
        assert_eq!(probability_correlation(94.0, 40, 2), 20.0);
        // every position critical and more than three of them
        assert_eq!(probability_correlation(50.0, 5, 5), 20.0);
        assert_eq!(probability_correlation(100.0, 10, 10), 70.0);
    }

    #[test]
    fn superhuman_caps_at_100() {
        assert_eq!(superhuman_indicator(96.0, 96.0, 96.0, 96.0, 93.0), 100.0);
        assert_eq!(superhuman_indicator(0.0, 91.0, 91.0, 91.0, 0.0), 37.0);
    }

    #[test]
    fn opening_preparation_tiers() {
        assert_eq!(opening_preparation(&[]), 0.0);
        assert_eq!(opening_preparation(&[96.0, 90.0, 50.0]), (100.0 + 90.0) / 3.0);
    }

    #[test]
    fn rating_jumps_never_fire_with_fixed_step() {
        assert!(rating_jumps(&["1-0"]).is_empty());
        assert!(rating_jumps(&["1-0", "1-0", "0-1", "1/2-1/2", "0-1"]).is_empty());
    }

    #[test]
    fn win_rate_against_expectation() {
        let games = [("1-0", Some(1600), Some(1600)), ("1-0", None, None), ("1/2-1/2", None, None), ("0-1", None, None)];
        let analysis = win_rate_analysis(&games);
        assert!((analysis.win_rate - 62.5).abs() < 1e-9);
        assert!((analysis.expected_win_rate - 50.0).abs() < 1e-9);
        assert!((analysis.anomaly_score - 12.5).abs() < 1e-9);

        assert_eq!(win_rate_analysis(&[("*", None, None)]), WinRateAnalysis::default());
    }

    #[test]
    fn blunder_and_mastery_scales() {
        assert_eq!(blunder_avoidance(0, 5), 100.0);
        assert_eq!(blunder_avoidance(5, 5), 50.0);
        assert_eq!(blunder_avoidance(30, 5), 0.0);
        assert_eq!(endgame_mastery(80.0, 75.0), 50.0);
        assert_eq!(endgame_mastery(60.0, 75.0), 0.0);
    }

    #[test]
    fn performance_rating_extremes() {
        assert_eq!(performance_rating(0, 0, 0, 1500.0), 0.0);
        assert_eq!(performance_rating(10, 0, 0, 1500.0), 2300.0);
        assert_eq!(performance_rating(0, 0, 10, 1500.0), 700.0);
        assert!((performance_rating(5, 0, 5, 1500.0) - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn confidence_interval_widths() {
        assert_eq!(confidence_interval(&[], 0.95), (0.0, 0.0, 0.0));
        assert_eq!(confidence_interval(&[4.0], 0.95), (4.0, 4.0, 4.0));
        let (m, lo, hi) = confidence_interval(&[1.0, 3.0], 0.95);
        assert_eq!(m, 2.0);
        assert!(lo < m && hi > m);
        assert!((hi - m - 1.96 * 2f64.sqrt() / 2f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn stats_helpers() {
        assert_eq!(mean(&[]), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(sample_stdev(&[5.0]), 0.0);
        assert!((sample_stdev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]) - 2.138089935).abs() < 1e-6);
    }
}
