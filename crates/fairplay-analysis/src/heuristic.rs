//! Engine-free fallback: material balance with a small development bonus.

use async_trait::async_trait;
use chess_core::ReplayedGame;

use crate::error::AnalysisError;
use crate::evaluator::{EvalSource, Evaluator, PositionEvaluation};

/// Plies during which vacating b1/g1 counts as development.
const DEVELOPMENT_PLIES: usize = 20;
const DEVELOPMENT_BONUS: i32 = 20;
const CHECK_PENALTY: i32 = 50;

#[derive(Debug, Clone, Copy, Default)]
pub struct MaterialHeuristic;

#[async_trait]
impl Evaluator for MaterialHeuristic {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    async fn evaluate_game(
        &self,
        game: &ReplayedGame,
        max_plies: Option<usize>,
    ) -> Result<Vec<PositionEvaluation>, AnalysisError> {
        let evaluations = game
            .plies
            .iter()
            .take(max_plies.unwrap_or(usize::MAX))
            .map(|ply| {
                let mut score = ply.material_after;
                if ply.number < DEVELOPMENT_PLIES {
                    if ply.b1_empty_after {
                        score += DEVELOPMENT_BONUS;
                    }
                    if ply.g1_empty_after {
                        score += DEVELOPMENT_BONUS;
                    }
                }
                if ply.gives_check {
                    score -= CHECK_PENALTY;
                }
                PositionEvaluation {
                    move_number: ply.number,
                    played: ply.uci.clone(),
                    score_cp: Some(score),
                    minor_major_count: ply.minor_major_count,
                    source: EvalSource::Heuristic,
                    ..Default::default()
                }
            })
            .collect();
        Ok(evaluations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::pgn::parse_pgn;
    use chess_core::replay_game;

    #[tokio::test]
    async fn development_and_check_adjust_material() {
        let game = parse_pgn("1. Nf3 d5 2. Nc3 e5 3. Nxd5 Bb4 4. Nxe5 Bxd2+ *").unwrap();
        let replayed = replay_game(&game).unwrap();
        let evals = MaterialHeuristic.evaluate_game(&replayed, None).await.unwrap();

        // 1. Nf3: g1 vacated
        assert_eq!(evals[0].score_cp, Some(20));
        // 2. Nc3: both knights out
        assert_eq!(evals[2].score_cp, Some(40));
        // 3. Nxd5: pawn up
        assert_eq!(evals[4].score_cp, Some(140));
        // 4... Bxd2+: one pawn up, white in check
        assert_eq!(evals[7].score_cp, Some(100 + 40 - 50));
    }

    #[tokio::test]
    async fn respects_ply_cap() {
        let game = parse_pgn("1. e4 e5 2. Nf3 Nc6 *").unwrap();
        let replayed = replay_game(&game).unwrap();
        let evals = MaterialHeuristic.evaluate_game(&replayed, Some(3)).await.unwrap();
        assert_eq!(evals.len(), 3);
    }
}
