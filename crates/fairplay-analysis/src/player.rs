//! Aggregation of per-game analyses into a player verdict.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GameFailure;
use crate::game::GameAnalysis;
use crate::probes::{self, WinRateAnalysis, NO_CPL};

/// Games above this engine correlation count as "extremely accurate".
pub const EXTREME_CORRELATION: f64 = 97.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "MINIMAL")]
    Minimal,
    #[serde(rename = "LOW")]
    Low,
    #[serde(rename = "MODERATE")]
    Moderate,
    #[serde(rename = "HIGH")]
    High,
    #[serde(rename = "VERY HIGH")]
    VeryHigh,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            RiskLevel::VeryHigh
        } else if score >= 60.0 {
            RiskLevel::High
        } else if score >= 40.0 {
            RiskLevel::Moderate
        } else if score >= 20.0 {
            RiskLevel::Low
        } else {
            RiskLevel::Minimal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Minimal => "MINIMAL",
            RiskLevel::Low => "LOW",
            RiskLevel::Moderate => "MODERATE",
            RiskLevel::High => "HIGH",
            RiskLevel::VeryHigh => "VERY HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeControlPerformance {
    pub game_count: usize,
    pub avg_engine_correlation: f64,
    pub avg_cpl: f64,
    /// Sample stdev of per-game accuracy
    pub consistency: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerAnalysis {
    pub username: String,
    pub games_analyzed: usize,
    pub total_games_fetched: usize,
    pub game_analyses: Vec<GameAnalysis>,
    pub failures: Vec<GameFailure>,

    pub avg_engine_correlation: f64,
    pub avg_centipawn_loss: f64,
    /// Sample stdev of accuracy across games
    pub accuracy_consistency: f64,
    pub suspicious_game_count: usize,
    pub extremely_accurate_games: usize,
    pub performance_by_tc: BTreeMap<String, TimeControlPerformance>,

    pub opening_preparation_score: f64,
    pub endgame_mastery_score: f64,
    pub critical_position_handling: f64,
    pub blunder_avoidance_score: f64,
    pub win_rate_anomaly: f64,
    pub move_time_suspicion: f64,
    pub rating_jump_detection: Vec<f64>,
    pub win_rate_data: WinRateAnalysis,

    pub avg_move_time_consistency: f64,
    pub avg_probability_correlation: f64,
    pub avg_win_rate: f64,
    pub avg_draw_rate: f64,
    pub avg_loss_rate: f64,
    pub avg_superhuman_score: f64,
    pub avg_time_scramble_accuracy: f64,
}

/// `weight * clamp((value - threshold) / range, 0, 1)`; a negative range
/// rewards values below the threshold.
fn weighted(value: f64, threshold: f64, range: f64, weight: f64) -> f64 {
    weight * ((value - threshold) / range).clamp(0.0, 1.0)
}

impl PlayerAnalysis {
    /// Hand-tuned weighted sum, 0-100.
    pub fn suspicion_score(&self) -> f64 {
        if self.games_analyzed == 0 {
            return 0.0;
        }

        let extreme_ratio = self.extremely_accurate_games as f64 / self.games_analyzed.max(1) as f64;
        let jump_score = self.rating_jump_detection.len() as f64 * 20.0;

        let score = weighted(self.avg_engine_correlation, 90.0, 10.0, 22.0)
            + weighted(self.avg_centipawn_loss, 20.0, -20.0, 16.0)
            + weighted(self.accuracy_consistency, 15.0, -15.0, 10.0)
            + weighted(self.avg_probability_correlation, 80.0, 20.0, 15.0)
            + weighted(self.avg_move_time_consistency, 70.0, 30.0, 12.0)
            + weighted(extreme_ratio, 0.0, 1.0, 8.0)
            + weighted(self.critical_position_handling, 95.0, 5.0, 8.0)
            + weighted(self.avg_superhuman_score, 60.0, 40.0, 6.0)
            + weighted(self.opening_preparation_score, 85.0, 15.0, 5.0)
            + weighted(self.win_rate_anomaly, 0.0, 50.0, 3.0)
            + weighted(jump_score, 0.0, 100.0, 2.0)
            + weighted(self.move_time_suspicion, 0.0, 100.0, 2.0);

        score.min(100.0)
    }

    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_score(self.suspicion_score())
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    /// No games came back from the fetch, as opposed to games that failed.
    pub fn nothing_fetched(&self) -> bool {
        self.total_games_fetched == 0
    }
}

fn mean_of(analyses: &[GameAnalysis], f: impl Fn(&GameAnalysis) -> f64) -> Option<f64> {
    let values: Vec<f64> = analyses.iter().map(f).collect();
    probes::mean(&values)
}

pub fn performance_by_time_control(analyses: &[GameAnalysis]) -> BTreeMap<String, TimeControlPerformance> {
    let mut groups: BTreeMap<String, Vec<&GameAnalysis>> = BTreeMap::new();
    for ga in analyses {
        groups.entry(ga.time_controls.time_class.clone()).or_default().push(ga);
    }

    groups
        .into_iter()
        .map(|(tc, games)| {
            let corr: Vec<f64> = games.iter().map(|g| g.engine_correlation).collect();
            let cpl: Vec<f64> = games.iter().map(|g| g.avg_centipawn_loss).collect();
            let acc: Vec<f64> = games.iter().map(|g| g.accuracy_score).collect();
            let perf = TimeControlPerformance {
                game_count: games.len(),
                avg_engine_correlation: probes::mean(&corr).unwrap_or(0.0),
                avg_cpl: probes::mean(&cpl).unwrap_or(NO_CPL),
                consistency: probes::sample_stdev(&acc),
            };
            (tc, perf)
        })
        .collect()
}

/// Combine per-game analyses. `total_fetched` counts every game handed to the
/// pipeline, including those listed in `failures`.
pub fn aggregate(
    username: &str,
    total_fetched: usize,
    analyses: Vec<GameAnalysis>,
    failures: Vec<GameFailure>,
) -> PlayerAnalysis {
    let n = analyses.len();

    let correlations: Vec<f64> = analyses.iter().map(|g| g.engine_correlation).collect();
    let accuracies: Vec<f64> = analyses.iter().map(|g| g.accuracy_score).collect();
    let opening_accuracies: Vec<f64> = analyses.iter().map(|g| g.opening_accuracy).collect();

    let avg_endgame = mean_of(&analyses, |g| g.endgame_accuracy).unwrap_or(0.0);
    let avg_middlegame = mean_of(&analyses, |g| g.middlegame_accuracy).unwrap_or(0.0);
    let total_blunders: usize = analyses.iter().map(|g| g.blunder_count).sum();

    let results: Vec<&str> = analyses.iter().map(|g| g.result.as_str()).collect();
    let win_rate_input: Vec<(&str, Option<i32>, Option<i32>)> = analyses
        .iter()
        .map(|g| (g.result.as_str(), g.white_elo, g.black_elo))
        .collect();
    let win_rate_data = probes::win_rate_analysis(&win_rate_input);

    let pooled_times: Vec<f64> = analyses.iter().flat_map(|g| g.move_times.iter().copied()).collect();

    let rate = |count: usize| if n > 0 { count as f64 / n as f64 * 100.0 } else { 0.0 };
    let wins = analyses.iter().filter(|g| g.win_rate == 1.0).count();
    let draws = analyses.iter().filter(|g| g.draw_rate == 1.0).count();
    let losses = analyses.iter().filter(|g| g.loss_rate == 1.0).count();

    PlayerAnalysis {
        username: username.to_string(),
        games_analyzed: n,
        total_games_fetched: total_fetched,
        avg_engine_correlation: probes::mean(&correlations).unwrap_or(0.0),
        avg_centipawn_loss: mean_of(&analyses, |g| g.avg_centipawn_loss).unwrap_or(NO_CPL),
        accuracy_consistency: probes::sample_stdev(&accuracies),
        suspicious_game_count: analyses.iter().filter(|g| g.is_suspicious()).count(),
        extremely_accurate_games: correlations.iter().filter(|c| **c > EXTREME_CORRELATION).count(),
        performance_by_tc: performance_by_time_control(&analyses),
        opening_preparation_score: probes::opening_preparation(&opening_accuracies),
        endgame_mastery_score: probes::endgame_mastery(avg_endgame, avg_middlegame),
        critical_position_handling: mean_of(&analyses, |g| g.critical_move_accuracy).unwrap_or(0.0),
        blunder_avoidance_score: probes::blunder_avoidance(total_blunders, n),
        win_rate_anomaly: win_rate_data.anomaly_score,
        move_time_suspicion: probes::move_time_suspicion(&pooled_times),
        rating_jump_detection: probes::rating_jumps(&results),
        win_rate_data,
        avg_move_time_consistency: probes::move_time_consistency(&pooled_times),
        avg_probability_correlation: mean_of(&analyses, |g| g.probability_correlation).unwrap_or(0.0),
        avg_win_rate: rate(wins),
        avg_draw_rate: rate(draws),
        avg_loss_rate: rate(losses),
        avg_superhuman_score: mean_of(&analyses, |g| g.superhuman_score).unwrap_or(0.0),
        avg_time_scramble_accuracy: mean_of(&analyses, |g| g.time_pressure_accuracy).unwrap_or(0.0),
        game_analyses: analyses,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_steps() {
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Minimal);
        assert_eq!(RiskLevel::from_score(19.99), RiskLevel::Minimal);
        assert_eq!(RiskLevel::from_score(20.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(40.0), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(60.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(80.0), RiskLevel::VeryHigh);
        assert_eq!(RiskLevel::VeryHigh.to_string(), "VERY HIGH");
        assert_eq!(serde_json::to_string(&RiskLevel::VeryHigh).unwrap(), "\"VERY HIGH\"");
    }

    #[test]
    fn weighted_terms_clamp() {
        assert_eq!(weighted(95.0, 90.0, 10.0, 22.0), 11.0);
        assert_eq!(weighted(120.0, 90.0, 10.0, 22.0), 22.0);
        assert_eq!(weighted(80.0, 90.0, 10.0, 22.0), 0.0);
        // lower is worse for CPL
        assert_eq!(weighted(10.0, 20.0, -20.0, 16.0), 8.0);
        assert_eq!(weighted(0.0, 20.0, -20.0, 16.0), 16.0);
        assert_eq!(weighted(NO_CPL, 20.0, -20.0, 16.0), 0.0);
    }

    #[test]
    fn empty_aggregate_is_minimal() {
        let player = aggregate("nobody", 0, Vec::new(), Vec::new());
        assert_eq!(player.games_analyzed, 0);
        assert_eq!(player.avg_centipawn_loss, NO_CPL);
        assert_eq!(player.suspicion_score(), 0.0);
        assert_eq!(player.risk_level(), RiskLevel::Minimal);
        assert!(player.nothing_fetched());
    }
}
