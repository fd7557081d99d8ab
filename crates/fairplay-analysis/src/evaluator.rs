//! Per-move evaluation: the `Evaluator` seam and its engine-backed implementations.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chess_core::ReplayedGame;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cloud::LichessCloud;
use crate::error::AnalysisError;
use crate::heuristic::MaterialHeuristic;
use crate::stockfish::{EngineOptions, SearchLimit, StockfishEngine, UciEngine};

/// Centipawn value of a forced mate, before subtracting the distance.
pub const MATE_SCORE: i32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EvalSource {
    #[default]
    Engine,
    Cloud,
    Heuristic,
}

/// Evaluation of the position a half-move was played from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PositionEvaluation {
    /// 1-based ply
    pub move_number: usize,
    /// Played move in UCI notation
    pub played: String,
    pub best_move: Option<String>,
    /// White's perspective, mates mapped to +/-(10000 - distance)
    pub score_cp: Option<i32>,
    pub depth: u32,
    /// Played move equals the engine's first choice
    pub matched: bool,
    /// Pawns, knights, bishops and rooks on the board before the move
    pub minor_major_count: u32,
    pub source: EvalSource,
    /// Set when the engine could not evaluate this position
    pub error: Option<String>,
}

#[async_trait]
pub trait Evaluator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Evaluate up to `max_plies` half-moves (all when `None`).
    async fn evaluate_game(
        &self,
        game: &ReplayedGame,
        max_plies: Option<usize>,
    ) -> Result<Vec<PositionEvaluation>, AnalysisError>;
}

#[async_trait]
impl<T: Evaluator + ?Sized> Evaluator for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn evaluate_game(
        &self,
        game: &ReplayedGame,
        max_plies: Option<usize>,
    ) -> Result<Vec<PositionEvaluation>, AnalysisError> {
        (**self).evaluate_game(game, max_plies).await
    }
}

/// Convert a side-to-move score into White's perspective.
pub fn to_white_cp(cp: Option<i32>, mate: Option<i32>, white_to_move: bool) -> Option<i32> {
    let score = match (mate, cp) {
        (Some(m), _) if m > 0 => MATE_SCORE - m,
        (Some(m), _) if m < 0 => -MATE_SCORE - m,
        // "mate 0": side to move is already mated
        (Some(_), _) => -MATE_SCORE,
        (None, Some(c)) => c,
        (None, None) => return None,
    };
    Some(if white_to_move { score } else { -score })
}

/// Local engine processes shared round-robin between games.
pub struct LocalEngine<E = StockfishEngine> {
    engines: Vec<Arc<Mutex<E>>>,
    next: AtomicUsize,
    limit: SearchLimit,
}

impl LocalEngine<StockfishEngine> {
    /// Spawn `count` Stockfish processes up front.
    pub async fn spawn(
        path: &Path,
        options: EngineOptions,
        limit: SearchLimit,
        count: usize,
    ) -> Result<Self, AnalysisError> {
        let count = count.max(1);
        let mut engines = Vec::with_capacity(count);
        for i in 0..count {
            let engine = StockfishEngine::new(path, options).await?;
            info!(engine_id = i, "Stockfish engine ready");
            engines.push(engine);
        }
        Ok(Self::from_engines(engines, limit))
    }
}

impl<E: UciEngine> LocalEngine<E> {
    /// Pool already started engines. An empty list evaluates nothing.
    pub fn from_engines(engines: Vec<E>, limit: SearchLimit) -> Self {
        Self {
            engines: engines.into_iter().map(|e| Arc::new(Mutex::new(e))).collect(),
            next: AtomicUsize::new(0),
            limit,
        }
    }

    pub fn limit(&self) -> SearchLimit {
        self.limit
    }

    pub async fn shutdown(&self) {
        for engine in &self.engines {
            engine.lock().await.quit().await;
        }
    }
}

#[async_trait]
impl<E: UciEngine + 'static> Evaluator for LocalEngine<E> {
    fn name(&self) -> &'static str {
        "stockfish"
    }

    async fn evaluate_game(
        &self,
        game: &ReplayedGame,
        max_plies: Option<usize>,
    ) -> Result<Vec<PositionEvaluation>, AnalysisError> {
        if self.engines.is_empty() {
            return Err(AnalysisError::Engine("no engine processes".into()));
        }
        let slot = self.next.fetch_add(1, Ordering::Relaxed) % self.engines.len();
        let mut engine = self.engines[slot].lock().await;

        let limit = max_plies.unwrap_or(usize::MAX);
        let mut evaluations = Vec::with_capacity(game.len().min(limit));
        let mut engine_dead = false;

        for ply in game.plies.iter().take(limit) {
            let mut eval = PositionEvaluation {
                move_number: ply.number,
                played: ply.uci.clone(),
                minor_major_count: ply.minor_major_count,
                source: EvalSource::Engine,
                ..Default::default()
            };

            if engine_dead {
                eval.error = Some("engine unavailable".to_string());
                evaluations.push(eval);
                continue;
            }

            let result = match engine.evaluate(&ply.fen_before, self.limit).await {
                Ok(result) => Ok(result),
                Err(e) => {
                    warn!(ply = ply.number, error = %e, "Engine failed, restarting");
                    match engine.restart().await {
                        Ok(()) => engine.evaluate(&ply.fen_before, self.limit).await,
                        Err(restart_err) => {
                            engine_dead = true;
                            Err(restart_err)
                        }
                    }
                }
            };

            match result {
                Ok(result) => {
                    eval.score_cp = to_white_cp(result.cp, result.mate, ply.white_to_move);
                    eval.matched = result.best_move.as_deref() == Some(ply.uci.as_str());
                    eval.best_move = result.best_move;
                    eval.depth = result.depth;
                }
                Err(e) => {
                    warn!(ply = ply.number, error = %e, "Position left unevaluated");
                    eval.error = Some(e.to_string());
                }
            }
            evaluations.push(eval);
        }

        debug!(plies = evaluations.len(), "Local evaluation finished");
        Ok(evaluations)
    }
}

/// Cloud analysis first, then the local engine, then the material heuristic.
pub struct EvaluationChain {
    cloud: Option<LichessCloud>,
    local: Option<Arc<dyn Evaluator>>,
    heuristic: MaterialHeuristic,
}

/// Local results below this count are treated as no result.
const MIN_LOCAL_EVALS: usize = 3;

impl EvaluationChain {
    pub fn new(cloud: Option<LichessCloud>, local: Option<Arc<dyn Evaluator>>) -> Self {
        Self {
            cloud,
            local,
            heuristic: MaterialHeuristic,
        }
    }
}

#[async_trait]
impl Evaluator for EvaluationChain {
    fn name(&self) -> &'static str {
        "chain"
    }

    async fn evaluate_game(
        &self,
        game: &ReplayedGame,
        max_plies: Option<usize>,
    ) -> Result<Vec<PositionEvaluation>, AnalysisError> {
        let considered = game.len().min(max_plies.unwrap_or(usize::MAX));

        let mut evaluations = match &self.cloud {
            Some(cloud) => cloud.evaluate_game(game, max_plies).await.unwrap_or_else(|e| {
                debug!(error = %e, "Cloud evaluation unavailable");
                Vec::new()
            }),
            None => Vec::new(),
        };

        // Need at least a quarter of the plies covered
        if evaluations.is_empty() || evaluations.len() * 4 < considered {
            evaluations = match &self.local {
                Some(local) => match local.evaluate_game(game, max_plies).await {
                    Ok(evals) if evals.iter().filter(|e| e.score_cp.is_some()).count() >= MIN_LOCAL_EVALS => {
                        evals
                    }
                    Ok(_) => Vec::new(),
                    Err(e) => {
                        warn!(error = %e, "Local evaluation failed");
                        Vec::new()
                    }
                },
                None => Vec::new(),
            };
        }

        if evaluations.is_empty() {
            evaluations = self.heuristic.evaluate_game(game, max_plies).await?;
        }

        if evaluations.is_empty() {
            return Err(AnalysisError::NoEvaluations);
        }
        Ok(evaluations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cp_scores_flip_for_black() {
        assert_eq!(to_white_cp(Some(35), None, true), Some(35));
        assert_eq!(to_white_cp(Some(35), None, false), Some(-35));
        assert_eq!(to_white_cp(None, None, true), None);
    }

    #[test]
    fn mate_scores_use_distance() {
        assert_eq!(to_white_cp(None, Some(3), true), Some(9997));
        assert_eq!(to_white_cp(None, Some(-2), true), Some(-9998));
        assert_eq!(to_white_cp(None, Some(3), false), Some(-9997));
        assert_eq!(to_white_cp(Some(50), Some(0), true), Some(-10000));
    }

    /// Answers every position until call `fail_from`, then errors.
    struct CrashingEngine {
        calls: usize,
        fail_from: usize,
        restart_ok: bool,
    }

    #[async_trait]
    impl UciEngine for CrashingEngine {
        async fn evaluate(&mut self, _fen: &str, _limit: SearchLimit) -> Result<crate::stockfish::EvalResult, AnalysisError> {
            self.calls += 1;
            if self.calls > self.fail_from {
                return Err(AnalysisError::Engine("Stockfish terminated unexpectedly".into()));
            }
            Ok(crate::stockfish::EvalResult {
                cp: Some(20),
                mate: None,
                best_move: Some("e2e4".into()),
                depth: 12,
            })
        }

        async fn restart(&mut self) -> Result<(), AnalysisError> {
            if self.restart_ok {
                self.fail_from = usize::MAX;
                Ok(())
            } else {
                Err(AnalysisError::Engine("failed to respawn".into()))
            }
        }

        async fn quit(&mut self) {}
    }

    fn opening() -> ReplayedGame {
        let game = chess_core::pgn::parse_pgn("1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 *").unwrap();
        chess_core::replay_game(&game).unwrap()
    }

    fn local(fail_from: usize, restart_ok: bool) -> LocalEngine<CrashingEngine> {
        let engine = CrashingEngine {
            calls: 0,
            fail_from,
            restart_ok,
        };
        LocalEngine::from_engines(vec![engine], SearchLimit::Depth(12))
    }

    #[tokio::test]
    async fn dead_engine_marks_remaining_plies() {
        let evals = local(2, false).evaluate_game(&opening(), None).await.unwrap();

        assert_eq!(evals.len(), 6);
        assert!(evals[..2].iter().all(|e| e.score_cp.is_some() && e.error.is_none()));
        assert_eq!(evals[0].score_cp, Some(20));
        assert_eq!(evals[1].score_cp, Some(-20));
        assert!(evals[0].matched);
        assert!(evals[2].score_cp.is_none());
        assert!(evals[2].error.as_deref().unwrap().contains("failed to respawn"));
        assert!(evals[3..]
            .iter()
            .all(|e| e.score_cp.is_none() && e.error.as_deref() == Some("engine unavailable")));
        let plies: Vec<usize> = evals.iter().map(|e| e.move_number).collect();
        assert_eq!(plies, [1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn restarted_engine_retries_the_ply() {
        let evals = local(2, true).evaluate_game(&opening(), None).await.unwrap();
        assert_eq!(evals.len(), 6);
        assert!(evals.iter().all(|e| e.score_cp.is_some() && e.error.is_none()));
    }

    #[tokio::test]
    async fn chain_drops_sparse_local_results() {
        let sparse: Arc<dyn Evaluator> = Arc::new(local(2, false));
        let evals = EvaluationChain::new(None, Some(sparse))
            .evaluate_game(&opening(), None)
            .await
            .unwrap();
        assert_eq!(evals.len(), 6);
        assert!(evals.iter().all(|e| e.source == EvalSource::Heuristic && e.error.is_none()));

        let healthy: Arc<dyn Evaluator> = Arc::new(local(usize::MAX, false));
        let evals = EvaluationChain::new(None, Some(healthy))
            .evaluate_game(&opening(), None)
            .await
            .unwrap();
        assert!(evals.iter().all(|e| e.source == EvalSource::Engine));
    }

    #[tokio::test]
    async fn chain_without_engines_uses_heuristic() {
        let game = chess_core::pgn::parse_pgn("1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 *").unwrap();
        let replayed = chess_core::replay_game(&game).unwrap();
        let chain = EvaluationChain::new(None, None);
        let evals = chain.evaluate_game(&replayed, Some(100)).await.unwrap();
        assert_eq!(evals.len(), 6);
        assert!(evals.iter().all(|e| e.source == EvalSource::Heuristic));
    }
}
