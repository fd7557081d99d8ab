//! Report model shared by every renderer.

use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::config::Thresholds;
use crate::error::GameFailure;
use crate::player::{PlayerAnalysis, RiskLevel, TimeControlPerformance};
use crate::probes;

/// Games listed individually in a report.
pub const MAX_GAME_DETAILS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuspiciousPattern {
    pub pattern: String,
    pub description: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_games_fetched: usize,
    pub games_analyzed: usize,
    pub games_failed: usize,
    pub suspicion_score: f64,
    pub risk_level: RiskLevel,
    pub avg_engine_correlation: f64,
    pub avg_centipawn_loss: f64,
    pub accuracy_consistency: f64,
    pub suspicious_games: usize,
    pub extremely_accurate_games: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameDetail {
    pub game_number: usize,
    pub players: String,
    pub result: String,
    pub engine_correlation: f64,
    pub avg_cpl: f64,
    pub accuracy: f64,
    pub time_control: String,
    pub is_suspicious: bool,
    pub suspicious_moves_count: usize,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedReport {
    pub generated_at: DateTime<Local>,
    pub username: String,
    pub summary: ReportSummary,
    pub thresholds: Thresholds,
    pub performance_by_time_control: BTreeMap<String, TimeControlPerformance>,
    pub game_details: Vec<GameDetail>,
    pub suspicious_patterns: Vec<SuspiciousPattern>,
    pub recommendations: Vec<String>,
    pub failures: Vec<GameFailure>,
}

impl DetailedReport {
    pub fn build(player: &PlayerAnalysis, thresholds: &Thresholds) -> Self {
        let game_details = player
            .game_analyses
            .iter()
            .take(MAX_GAME_DETAILS)
            .enumerate()
            .map(|(i, ga)| GameDetail {
                game_number: i + 1,
                players: ga.players(),
                result: ga.result.clone(),
                engine_correlation: ga.engine_correlation,
                avg_cpl: ga.avg_centipawn_loss,
                accuracy: ga.accuracy_score,
                time_control: ga.time_controls.time_class.clone(),
                is_suspicious: ga.is_suspicious(),
                suspicious_moves_count: ga.suspicious_moves.len(),
                link: ga.link.clone(),
            })
            .collect();

        Self {
            generated_at: Local::now(),
            username: player.username.clone(),
            summary: ReportSummary {
                total_games_fetched: player.total_games_fetched,
                games_analyzed: player.games_analyzed,
                games_failed: player.failed_count(),
                suspicion_score: player.suspicion_score(),
                risk_level: player.risk_level(),
                avg_engine_correlation: player.avg_engine_correlation,
                avg_centipawn_loss: player.avg_centipawn_loss,
                accuracy_consistency: player.accuracy_consistency,
                suspicious_games: player.suspicious_game_count,
                extremely_accurate_games: player.extremely_accurate_games,
            },
            thresholds: thresholds.clone(),
            performance_by_time_control: player.performance_by_tc.clone(),
            game_details,
            suspicious_patterns: detect_patterns(player, thresholds),
            recommendations: recommendations(player),
            failures: player.failures.clone(),
        }
    }
}

pub fn detect_patterns(player: &PlayerAnalysis, thresholds: &Thresholds) -> Vec<SuspiciousPattern> {
    let mut patterns = Vec::new();
    let games = &player.game_analyses;

    if player.games_analyzed >= 10 && games.len() >= 10 {
        let first: Vec<f64> = games[..5].iter().map(|g| g.engine_correlation).collect();
        let last: Vec<f64> = games[games.len() - 5..].iter().map(|g| g.engine_correlation).collect();
        let first_avg = probes::mean(&first).unwrap_or(0.0);
        let last_avg = probes::mean(&last).unwrap_or(0.0);

        if last_avg - first_avg > 20.0 {
            patterns.push(SuspiciousPattern {
                pattern: "sudden_improvement".to_string(),
                description: format!("Engine correlation improved from {first_avg:.1}% to {last_avg:.1}%"),
                severity: Severity::High,
            });
        }
    }

    let limit = thresholds.engine_correlation_red_flag;
    let perfect = games.iter().filter(|g| g.engine_correlation > limit).count();
    if perfect as f64 > player.games_analyzed as f64 * 0.3 {
        patterns.push(SuspiciousPattern {
            pattern: "excessive_perfect_games".to_string(),
            description: format!("{perfect}/{} games >{limit}% engine correlation", player.games_analyzed),
            severity: Severity::High,
        });
    }

    patterns
}

pub fn recommendations(player: &PlayerAnalysis) -> Vec<String> {
    if player.games_analyzed == 0 {
        return vec!["⚠️ No games could be analyzed.".to_string()];
    }

    let mut recs = Vec::new();
    let score = player.suspicion_score();
    if score >= 70.0 {
        recs.push("⚠️ HIGH RISK: Player shows multiple strong indicators of potential assistance.".to_string());
        recs.push("Recommend detailed manual review of games with >95% engine correlation.".to_string());
    } else if score >= 40.0 {
        recs.push("⚠️ MODERATE RISK: Some suspicious patterns detected.".to_string());
        recs.push("Review games with highest engine correlation individually.".to_string());
    } else {
        recs.push("✅ LOW RISK: No strong indicators detected.".to_string());
    }

    if player.avg_centipawn_loss < 15.0 {
        recs.push(format!("Note: Very low average CPL ({:.1})", player.avg_centipawn_loss));
    }
    if player.extremely_accurate_games > 0 {
        recs.push(format!(
            "Found {} games with >97% engine correlation.",
            player.extremely_accurate_games
        ));
    }
    if player.critical_position_handling > 95.0 {
        recs.push(format!(
            "Critical position handling: {:.1}% (suspiciously high)",
            player.critical_position_handling
        ));
    }
    if player.opening_preparation_score > 90.0 {
        recs.push(format!(
            "Opening preparation appears unusually strong: {:.1}%",
            player.opening_preparation_score
        ));
    }

    recs
}

/// Games worth a closer look, in fetch order.
pub fn suspicious_game_indices(player: &PlayerAnalysis) -> Vec<usize> {
    player
        .game_analyses
        .iter()
        .enumerate()
        .filter(|(_, g)| g.is_suspicious())
        .map(|(i, _)| i)
        .collect()
}
