//! Per-game statistics from a list of position evaluations.

use chess_core::GameData;
use serde::{Deserialize, Serialize};

use crate::evaluator::PositionEvaluation;
use crate::probes::{self, NO_CPL};

/// Single-move loss that counts as a blunder.
pub const BLUNDER_CPL: f64 = 200.0;
/// Positions this far from equal are "critical".
pub const CRITICAL_SCORE: i32 = 300;
/// Engine moves found in positions closer than this are worth listing.
pub const QUIET_SCORE: i32 = 200;
pub const MAX_SUSPICIOUS_MOVES: usize = 10;
/// Plies counted as opening regardless of material.
pub const OPENING_PLIES: usize = 10;
/// Pawns + minor pieces + rooks at or below which the game is an endgame.
pub const ENDGAME_PIECES: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Opening,
    Middlegame,
    Endgame,
}

impl Phase {
    pub fn of(eval: &PositionEvaluation) -> Self {
        if eval.move_number <= OPENING_PLIES {
            Phase::Opening
        } else if eval.minor_major_count <= ENDGAME_PIECES {
            Phase::Endgame
        } else {
            Phase::Middlegame
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuspiciousMove {
    pub move_number: usize,
    #[serde(rename = "move")]
    pub played: String,
    pub best_move: Option<String>,
    pub score_cp: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeControlInfo {
    pub time_class: String,
    pub time_control: String,
    pub rated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameAnalysis {
    pub white: String,
    pub black: String,
    pub result: String,
    pub white_elo: Option<i32>,
    pub black_elo: Option<i32>,
    pub link: Option<String>,
    pub move_count: usize,
    pub time_controls: TimeControlInfo,

    pub positions_evaluated: usize,
    pub engine_correlation: f64,
    pub avg_centipawn_loss: f64,
    pub accuracy_score: f64,
    pub opening_accuracy: f64,
    pub middlegame_accuracy: f64,
    pub endgame_accuracy: f64,
    pub critical_move_accuracy: f64,
    pub time_pressure_accuracy: f64,
    pub blunder_count: usize,
    pub suspicious_moves: Vec<SuspiciousMove>,

    /// Seconds per ply from clock comments, both colours
    pub move_times: Vec<f64>,
    pub move_time_consistency: f64,
    pub probability_correlation: f64,
    pub win_rate: f64,
    pub draw_rate: f64,
    pub loss_rate: f64,
    pub superhuman_score: f64,
    pub analysis_time_secs: f64,
}

impl GameAnalysis {
    pub fn is_suspicious(&self) -> bool {
        self.engine_correlation > 95.0
            || self.avg_centipawn_loss < 10.0
            || self.suspicious_moves.len() > 5
            || self.critical_move_accuracy > 98.0
            || self.opening_accuracy > 99.0
            || self.move_time_consistency > 85.0
            || self.probability_correlation > 94.0
    }

    pub fn players(&self) -> String {
        format!("{} vs {}", self.white, self.black)
    }
}

/// Share of evaluated positions where the played move was the engine's choice.
pub fn engine_correlation(evaluations: &[PositionEvaluation]) -> f64 {
    if evaluations.is_empty() {
        return 0.0;
    }
    let matched = evaluations.iter().filter(|e| e.matched).count();
    matched as f64 / evaluations.len() as f64 * 100.0
}

/// Per-move losses: each score is compared with the previous score negated.
pub fn centipawn_losses(evaluations: &[PositionEvaluation]) -> Vec<f64> {
    let mut losses = Vec::new();
    let mut previous: Option<i32> = None;
    for score in evaluations.iter().filter_map(|e| e.score_cp) {
        if let Some(prev) = previous {
            losses.push(f64::from((score - prev).abs()));
        }
        previous = Some(-score);
    }
    losses
}

/// Build the per-game statistics.
pub fn analyze_game(game: &GameData, evaluations: &[PositionEvaluation]) -> GameAnalysis {
    let engine_correlation = engine_correlation(evaluations);

    let losses = centipawn_losses(evaluations);
    let avg_centipawn_loss = probes::mean(&losses).unwrap_or(NO_CPL);
    let blunder_count = losses.iter().filter(|l| **l > BLUNDER_CPL).count();
    let accuracy_score = probes::accuracy_from_cpl(avg_centipawn_loss);

    let phase_scores = |phase: Phase| {
        evaluations
            .iter()
            .filter(move |e| Phase::of(e) == phase)
            .map(|e| e.score_cp)
    };
    let opening_accuracy = probes::phase_accuracy(phase_scores(Phase::Opening));
    let middlegame_accuracy = probes::phase_accuracy(phase_scores(Phase::Middlegame));
    let endgame_accuracy = probes::phase_accuracy(phase_scores(Phase::Endgame));

    let critical: Vec<&PositionEvaluation> = evaluations
        .iter()
        .filter(|e| e.score_cp.is_some_and(|s| s.abs() > CRITICAL_SCORE))
        .collect();
    let critical_move_accuracy = probes::phase_accuracy(critical.iter().map(|e| e.score_cp));

    let suspicious_moves: Vec<SuspiciousMove> = evaluations
        .iter()
        .filter(|e| e.matched)
        .filter_map(|e| {
            let score = e.score_cp?;
            (score.abs() < QUIET_SCORE).then(|| SuspiciousMove {
                move_number: e.move_number,
                played: e.played.clone(),
                best_move: e.best_move.clone(),
                score_cp: score,
            })
        })
        .take(MAX_SUSPICIOUS_MOVES)
        .collect();

    let move_times = game.move_times();
    let move_time_consistency = probes::move_time_consistency(&move_times);
    let probability_correlation =
        probes::probability_correlation(engine_correlation, evaluations.len(), critical.len());

    let meta = &game.metadata;
    let superhuman_score = probes::superhuman_indicator(
        opening_accuracy,
        middlegame_accuracy,
        endgame_accuracy,
        critical_move_accuracy,
        engine_correlation,
    );

    GameAnalysis {
        white: meta.white.clone(),
        black: meta.black.clone(),
        result: meta.result.clone(),
        white_elo: meta.white_elo,
        black_elo: meta.black_elo,
        link: meta.link.clone().or_else(|| meta.site.clone()),
        move_count: game.moves.len(),
        time_controls: TimeControlInfo {
            time_class: meta.time_class.clone().unwrap_or_else(|| "unknown".to_string()),
            time_control: meta.time_control.clone().unwrap_or_else(|| "unknown".to_string()),
            rated: game.header("Rated") == Some("true"),
        },
        positions_evaluated: evaluations.len(),
        engine_correlation,
        avg_centipawn_loss,
        accuracy_score,
        opening_accuracy,
        middlegame_accuracy,
        endgame_accuracy,
        critical_move_accuracy,
        // Endgame accuracy stands in for play under time pressure
        time_pressure_accuracy: endgame_accuracy,
        blunder_count,
        suspicious_moves,
        move_times,
        move_time_consistency,
        probability_correlation,
        win_rate: if meta.is_white_win() {
            1.0
        } else if meta.is_draw() {
            0.5
        } else {
            0.0
        },
        draw_rate: if meta.is_draw() { 1.0 } else { 0.0 },
        loss_rate: if meta.is_black_win() { 1.0 } else { 0.0 },
        superhuman_score,
        analysis_time_secs: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::pgn::parse_pgn;

    fn eval(n: usize, score: Option<i32>, matched: bool, pieces: u32) -> PositionEvaluation {
        PositionEvaluation {
            move_number: n,
            played: format!("m{n}"),
            best_move: Some(if matched { format!("m{n}") } else { "other".to_string() }),
            score_cp: score,
            matched,
            minor_major_count: pieces,
            ..Default::default()
        }
    }

    fn sample_game() -> GameData {
        parse_pgn("[White \"w\"]\n[Black \"b\"]\n[Result \"1-0\"]\n\n1. e4 e5 2. Nf3 Nc6 1-0").unwrap()
    }

    #[test]
    fn empty_evaluations_use_sentinel_cpl() {
        let analysis = analyze_game(&sample_game(), &[]);
        assert_eq!(analysis.avg_centipawn_loss, 999.0);
        assert_eq!(analysis.engine_correlation, 0.0);
        assert_eq!(analysis.accuracy_score, 50.0);
        assert_eq!(analysis.probability_correlation, 0.0);
    }

    #[test]
    fn cpl_flips_previous_score() {
        let evals = vec![
            eval(1, Some(30), false, 28),
            eval(2, Some(-30), false, 28),
            eval(3, None, false, 28),
            eval(4, Some(-270), false, 28),
        ];
        assert_eq!(centipawn_losses(&evals), vec![0.0, 300.0]);
        let analysis = analyze_game(&sample_game(), &evals);
        assert_eq!(analysis.avg_centipawn_loss, 150.0);
        assert_eq!(analysis.blunder_count, 1);
    }

    #[test]
    fn phases_follow_ply_and_material() {
        let evals = vec![
            eval(10, Some(0), false, 28),
            eval(11, Some(100), false, 20),
            eval(12, Some(40), false, 6),
        ];
        assert_eq!(Phase::of(&evals[0]), Phase::Opening);
        assert_eq!(Phase::of(&evals[1]), Phase::Middlegame);
        assert_eq!(Phase::of(&evals[2]), Phase::Endgame);

        let analysis = analyze_game(&sample_game(), &evals);
        assert_eq!(analysis.opening_accuracy, 100.0);
        assert_eq!(analysis.middlegame_accuracy, 50.0);
        assert_eq!(analysis.endgame_accuracy, 80.0);
        assert_eq!(analysis.time_pressure_accuracy, 80.0);
    }

    #[test]
    fn perfect_game_is_suspicious() {
        let evals: Vec<_> = (1..=30).map(|n| eval(n, Some(0), true, 20)).collect();
        let analysis = analyze_game(&sample_game(), &evals);
        assert_eq!(analysis.engine_correlation, 100.0);
        assert_eq!(analysis.avg_centipawn_loss, 0.0);
        assert_eq!(analysis.suspicious_moves.len(), MAX_SUSPICIOUS_MOVES);
        assert_eq!(analysis.probability_correlation, 50.0);
        assert!(analysis.is_suspicious());
    }

    #[test]
    fn critical_positions_and_quiet_engine_moves() {
        let evals = vec![
            eval(1, Some(350), true, 28),
            eval(2, Some(-400), false, 28),
            eval(3, Some(150), true, 28),
            eval(4, None, true, 28),
        ];
        let analysis = analyze_game(&sample_game(), &evals);
        // mean |score| of the two critical positions is 375
        assert_eq!(analysis.critical_move_accuracy, 50.0);
        assert_eq!(analysis.suspicious_moves.len(), 1);
        assert_eq!(analysis.suspicious_moves[0].move_number, 3);
        assert_eq!(analysis.win_rate, 1.0);
        assert_eq!(analysis.loss_rate, 0.0);
    }
}
