//! Move-quality metrics of the enhanced analyzer.
//!
//! Everything here works on consecutive evaluation pairs rather than on
//! engine best-move matches, so cloud and heuristic evaluations feed it too.

use std::collections::BTreeMap;

use chess_core::{GameData, Platform};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::GameFailure;
use crate::evaluator::PositionEvaluation;
use crate::probes;
use crate::timing::TimePattern;

pub const ENGINE_MATCH_THRESHOLD: f64 = 92.0;
/// Eval swing that counts as a blunder in the enhanced metrics.
pub const BLUNDER_LOSS: i32 = 50;
pub const CRITICAL_LOSS: i32 = 200;
/// Per-game score above which a game is flagged.
pub const SUSPICIOUS_GAME_SCORE: f64 = 60.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnginePattern {
    pub top_1_match_rate: f64,
    pub top_3_match_rate: f64,
    pub top_5_match_rate: f64,
    pub is_suspicious: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BlunderAnalysis {
    pub total_blunders: usize,
    pub blunder_rate: f64,
    pub critical_blunders: usize,
    pub average_blunder_cost: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AccuracyMetrics {
    pub opening_accuracy: f64,
    pub middlegame_accuracy: f64,
    pub endgame_accuracy: f64,
    pub overall_accuracy: f64,
    pub consistency_std_dev: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameAnalysisV3 {
    /// SHA-256 of the PGN text
    pub game_id: String,
    pub white: String,
    pub black: String,
    pub result: String,
    pub player_color: String,
    pub platform: Platform,
    pub link: Option<String>,

    pub time_pattern: TimePattern,
    pub engine_pattern: EnginePattern,
    pub blunder_analysis: BlunderAnalysis,
    pub accuracy: AccuracyMetrics,

    pub opponent_elo: i32,
    pub time_control: String,
    pub move_count: usize,

    pub is_suspicious: bool,
    pub suspicion_score: f64,
}

/// Quality 0-100 of each move from the eval change across it (White's view).
/// Pairs with a missing score get a neutral 50.
pub fn move_scores(evaluations: &[PositionEvaluation]) -> Vec<f64> {
    evaluations
        .windows(2)
        .map(|pair| match (pair[0].score_cp, pair[1].score_cp) {
            (Some(before), Some(after)) => match before - after {
                c if c >= 100 => 100.0,
                c if c >= 50 => 90.0,
                c if c >= 25 => 80.0,
                c if c >= 0 => 70.0,
                c if c >= -25 => 55.0,
                c if c >= -50 => 40.0,
                c if c >= -100 => 20.0,
                _ => 5.0,
            },
            _ => 50.0,
        })
        .collect()
}

pub fn engine_pattern(evaluations: &[PositionEvaluation]) -> EnginePattern {
    if evaluations.len() < 2 {
        return EnginePattern::default();
    }
    let scores = move_scores(evaluations);
    let total = scores.len() as f64;
    let share = |min: f64| scores.iter().filter(|s| **s >= min).count() as f64;

    let excellent = share(90.0);
    let good = share(80.0);
    let okay = share(70.0);

    let top_1_match_rate = excellent / total * 100.0;
    EnginePattern {
        top_1_match_rate,
        top_3_match_rate: ((excellent + good) / total * 100.0).min(100.0),
        top_5_match_rate: ((excellent + good + okay) / total * 100.0).min(100.0),
        is_suspicious: top_1_match_rate > ENGINE_MATCH_THRESHOLD,
    }
}

/// Losses over the pairs starting at even indices, for either colour.
pub fn blunder_analysis(evaluations: &[PositionEvaluation]) -> BlunderAnalysis {
    let mut analysis = BlunderAnalysis::default();
    if evaluations.is_empty() {
        return analysis;
    }

    let mut costs = Vec::new();
    for i in (0..evaluations.len().saturating_sub(1)).step_by(2) {
        let (Some(before), Some(after)) = (evaluations[i].score_cp, evaluations[i + 1].score_cp) else {
            continue;
        };
        let loss = after - before;
        if loss > BLUNDER_LOSS {
            analysis.total_blunders += 1;
            costs.push(f64::from(loss));
            if loss > CRITICAL_LOSS {
                analysis.critical_blunders += 1;
            }
        }
    }

    let player_moves = evaluations.len() / 2;
    if player_moves > 0 {
        analysis.blunder_rate = analysis.total_blunders as f64 / player_moves as f64 * 100.0;
    }
    analysis.average_blunder_cost = probes::mean(&costs).unwrap_or(0.0);
    analysis
}

pub fn accuracy_metrics(evaluations: &[PositionEvaluation], move_count: usize) -> AccuracyMetrics {
    if evaluations.len() < 3 {
        return AccuracyMetrics::default();
    }
    let scores = move_scores(evaluations);

    let moves = move_count.min(evaluations.len() - 1);
    let opening_end = (moves / 3).max(5).min(20).min(scores.len());
    let endgame_start = (moves * 2 / 3).max(40).max(opening_end).min(scores.len());

    let mean = |slice: &[f64]| probes::mean(slice).unwrap_or(0.0);
    AccuracyMetrics {
        opening_accuracy: mean(&scores[..opening_end]),
        middlegame_accuracy: mean(&scores[opening_end..endgame_start]),
        endgame_accuracy: mean(&scores[endgame_start..]),
        overall_accuracy: mean(&scores),
        consistency_std_dev: probes::sample_stdev(&scores),
    }
}

/// Additive per-game score and whether it crosses the flag line.
pub fn score_suspicion(analysis: &GameAnalysisV3) -> (bool, f64) {
    let mut score = 0.0;

    let top1 = analysis.engine_pattern.top_1_match_rate;
    if top1 > ENGINE_MATCH_THRESHOLD {
        score += 30.0;
    } else if top1 > 85.0 {
        score += 15.0;
    }

    if analysis.time_pattern.suspicious_consistency {
        score += 15.0;
    }
    // Also applies when no clock data exists (cv stays 0)
    if analysis.time_pattern.time_coefficient_variation < 0.2 {
        score += 10.0;
    }

    if analysis.blunder_analysis.blunder_rate < 2.0 {
        score += 10.0;
    }
    if analysis.blunder_analysis.critical_blunders == 0 {
        score += 10.0;
    }

    if analysis.accuracy.consistency_std_dev < 5.0 {
        score += 10.0;
    }

    if analysis.opponent_elo > 2400 && analysis.accuracy.overall_accuracy > 88.0 {
        score += 10.0;
    }

    (score > SUSPICIOUS_GAME_SCORE, score)
}

/// Enhanced metrics for one game from the player's point of view.
pub fn analyze_game_v3(
    game: &GameData,
    username: &str,
    game_id: String,
    evaluations: &[PositionEvaluation],
) -> GameAnalysisV3 {
    let meta = &game.metadata;
    let is_white = meta.white.to_lowercase() == username.to_lowercase();
    let opponent_elo = if is_white { meta.black_elo } else { meta.white_elo }.unwrap_or(0);
    let move_count = game.moves.len();

    let mut analysis = GameAnalysisV3 {
        game_id,
        white: meta.white.to_lowercase(),
        black: meta.black.to_lowercase(),
        result: meta.result.clone(),
        player_color: if is_white { "White" } else { "Black" }.to_string(),
        platform: game.source_platform(),
        link: meta.link.clone().or_else(|| meta.site.clone()),
        time_pattern: TimePattern::from_times(&game.move_times_for(is_white)),
        engine_pattern: engine_pattern(evaluations),
        blunder_analysis: blunder_analysis(evaluations),
        accuracy: accuracy_metrics(evaluations, move_count),
        opponent_elo,
        time_control: meta.time_control.clone().unwrap_or_default(),
        move_count,
        ..Default::default()
    };

    let (is_suspicious, score) = score_suspicion(&analysis);
    analysis.is_suspicious = is_suspicious;
    analysis.suspicion_score = score;
    analysis
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnhancedResult {
    pub username: String,
    pub games_analyzed: usize,
    pub suspicious_games: usize,
    pub suspicion_score: f64,
    pub avg_engine_match_rate: f64,
    pub avg_blunder_rate: f64,
    pub avg_accuracy: f64,
    pub avg_time_consistency: f64,
    pub platform_breakdown: BTreeMap<String, usize>,
    pub game_analyses: Vec<GameAnalysisV3>,
    #[serde(default)]
    pub failures: Vec<GameFailure>,
    pub analysis_timestamp: Option<DateTime<Local>>,
}

impl EnhancedResult {
    pub fn compile(username: &str, analyses: Vec<GameAnalysisV3>) -> Self {
        if analyses.is_empty() {
            return Self {
                username: username.to_string(),
                ..Default::default()
            };
        }

        let collect = |f: fn(&GameAnalysisV3) -> f64| analyses.iter().map(f).collect::<Vec<f64>>();
        let positive = |values: Vec<f64>| values.into_iter().filter(|v| *v > 0.0).collect::<Vec<f64>>();

        let mut platform_breakdown = BTreeMap::new();
        for a in &analyses {
            *platform_breakdown.entry(a.platform.to_string()).or_insert(0) += 1;
        }

        Self {
            username: username.to_string(),
            games_analyzed: analyses.len(),
            suspicious_games: analyses.iter().filter(|a| a.is_suspicious).count(),
            suspicion_score: probes::mean(&collect(|a| a.suspicion_score)).unwrap_or(0.0),
            avg_engine_match_rate: probes::mean(&collect(|a| a.engine_pattern.top_1_match_rate))
                .unwrap_or(0.0),
            avg_blunder_rate: probes::mean(&collect(|a| a.blunder_analysis.blunder_rate)).unwrap_or(0.0),
            avg_accuracy: probes::mean(&positive(collect(|a| a.accuracy.overall_accuracy))).unwrap_or(0.0),
            avg_time_consistency: probes::mean(&positive(collect(|a| {
                a.time_pattern.time_coefficient_variation
            })))
            .unwrap_or(0.0),
            platform_breakdown,
            analysis_timestamp: Some(Local::now()),
            game_analyses: analyses,
            failures: Vec::new(),
        }
    }

    pub fn suspicious(&self) -> impl Iterator<Item = &GameAnalysisV3> {
        self.game_analyses.iter().filter(|a| a.is_suspicious)
    }
}
