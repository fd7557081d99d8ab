//! Standard pipeline: evaluate every position of every game, one game at a time.

use std::sync::Arc;
use std::time::Instant;

use chess_core::{replay_game, GameData};
use tracing::{info, warn};

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, GameFailure};
use crate::evaluator::{Evaluator, LocalEngine};
use crate::game::{analyze_game, GameAnalysis};
use crate::player::{aggregate, PlayerAnalysis};

pub struct ChessAnalyzer<E: Evaluator> {
    evaluator: E,
    max_plies: Option<usize>,
}

impl ChessAnalyzer<Arc<LocalEngine>> {
    /// Analyzer backed by a single local Stockfish.
    pub async fn with_stockfish(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        let path = config.resolve_engine_path()?;
        let engine = LocalEngine::spawn(&path, config.engine_options(), config.search_limit(), 1).await?;
        Ok(Self::new(Arc::new(engine)))
    }

    pub async fn shutdown(&self) {
        self.evaluator.shutdown().await;
    }
}

impl<E: Evaluator> ChessAnalyzer<E> {
    pub fn new(evaluator: E) -> Self {
        Self {
            evaluator,
            max_plies: None,
        }
    }

    /// Cap the plies evaluated per game.
    pub fn with_max_plies(mut self, max_plies: usize) -> Self {
        self.max_plies = Some(max_plies);
        self
    }

    pub async fn analyze_single(&self, game: &GameData) -> Result<GameAnalysis, AnalysisError> {
        let started = Instant::now();
        let replayed = replay_game(game)?;
        let evaluations = self.evaluator.evaluate_game(&replayed, self.max_plies).await?;
        if evaluations.is_empty() {
            return Err(AnalysisError::NoEvaluations);
        }

        let mut analysis = analyze_game(game, &evaluations);
        analysis.analysis_time_secs = started.elapsed().as_secs_f64();
        Ok(analysis)
    }

    /// Analyze games in order. A failing game is recorded and skipped.
    pub async fn analyze_games(&self, username: &str, games: &[GameData]) -> PlayerAnalysis {
        let mut analyses = Vec::with_capacity(games.len());
        let mut failures = Vec::new();

        for (i, game) in games.iter().enumerate() {
            match self.analyze_single(game).await {
                Ok(analysis) => {
                    info!(
                        game = i + 1,
                        total = games.len(),
                        correlation = %format!("{:.1}", analysis.engine_correlation),
                        cpl = %format!("{:.1}", analysis.avg_centipawn_loss),
                        "Game analyzed"
                    );
                    analyses.push(analysis);
                }
                Err(e) => {
                    warn!(game = i + 1, error = %e, evaluator = self.evaluator.name(), "Game analysis failed");
                    failures.push(GameFailure::new(i + 1, &e));
                }
            }
        }

        aggregate(username, games.len(), analyses, failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::heuristic::MaterialHeuristic;
    use chess_core::pgn::parse_pgn;

    #[tokio::test]
    async fn bad_game_is_recorded_not_fatal() {
        let good = parse_pgn("[White \"me\"]\n[Black \"you\"]\n[Result \"1-0\"]\n\n1. e4 e5 2. Qh5 Nc6 3. Bc4 Nf6 4. Qxf7# 1-0").unwrap();
        let bad = parse_pgn("1. e4 e5 2. Ke3 *").unwrap();

        let analyzer = ChessAnalyzer::new(MaterialHeuristic);
        let player = analyzer.analyze_games("me", &[good, bad]).await;

        assert_eq!(player.total_games_fetched, 2);
        assert_eq!(player.games_analyzed, 1);
        assert_eq!(player.failures.len(), 1);
        assert_eq!(player.failures[0].index, 2);
        assert_eq!(player.failures[0].kind, FailureKind::Parse);
        assert!((0.0..=100.0).contains(&player.suspicion_score()));
    }
}
