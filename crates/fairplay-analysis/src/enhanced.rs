//! Enhanced pipeline: games fan out over a bounded pool of tasks, results are
//! cached per player and PGN hash.

use std::sync::Arc;
use std::time::Instant;

use chess_core::{replay_game, GameData};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::analysis_cache::{game_hash, AnalysisCache};
use crate::cloud::LichessCloud;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, GameFailure};
use crate::evaluator::{Evaluator, EvaluationChain, LocalEngine};
use crate::quality::{analyze_game_v3, EnhancedResult, GameAnalysisV3};

pub struct EnhancedPlayerAnalyzer {
    evaluator: Arc<dyn Evaluator>,
    local: Option<Arc<LocalEngine>>,
    cache: Arc<Mutex<AnalysisCache>>,
    workers: usize,
    max_plies: usize,
}

impl EnhancedPlayerAnalyzer {
    /// Build the cloud → local → heuristic chain. A missing Stockfish is not an
    /// error: the chain just skips that step.
    pub async fn new(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        let workers = config.effective_workers();
        if config.oversubscribed() {
            warn!(workers, cpus = num_cpus::get(), "More analysis workers than CPUs");
        }

        let cloud = if config.use_cloud {
            Some(LichessCloud::new()?)
        } else {
            None
        };

        let local = match config.resolve_engine_path() {
            Ok(path) => {
                match LocalEngine::spawn(&path, config.engine_options(), config.enhanced_search_limit(), workers).await {
                    Ok(engine) => Some(Arc::new(engine)),
                    Err(e) => {
                        warn!(error = %e, "Stockfish failed to start, continuing without local engine");
                        None
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "No local engine, using cloud and heuristic evaluations");
                None
            }
        };

        let chain = EvaluationChain::new(cloud, local.clone().map(|l| l as Arc<dyn Evaluator>));
        let cache = AnalysisCache::open(&config.cache_dir);

        info!(workers, cached = cache.len(), local_engine = local.is_some(), "Enhanced analyzer ready");

        Ok(Self {
            evaluator: Arc::new(chain),
            local,
            cache: Arc::new(Mutex::new(cache)),
            workers,
            max_plies: config.max_plies,
        })
    }

    /// Use a specific evaluator, e.g. the material heuristic alone.
    pub fn with_evaluator(evaluator: Arc<dyn Evaluator>, cache: AnalysisCache, workers: usize, max_plies: usize) -> Self {
        Self {
            evaluator,
            local: None,
            cache: Arc::new(Mutex::new(cache)),
            workers: workers.max(1),
            max_plies,
        }
    }

    pub async fn shutdown(&self) {
        if let Some(local) = &self.local {
            local.shutdown().await;
        }
    }

    /// Analyze all games, at most `workers` at a time. Results arrive in
    /// completion order; failures are returned alongside.
    pub async fn analyze_games(&self, games: Vec<GameData>, username: &str) -> EnhancedResult {
        let started = Instant::now();
        let total = games.len();
        info!(games = total, workers = self.workers, "Starting enhanced analysis");

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();

        for (i, game) in games.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let evaluator = self.evaluator.clone();
            let cache = self.cache.clone();
            let username = username.to_string();
            let max_plies = self.max_plies;

            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return (i, Err(AnalysisError::Task(e.to_string()))),
                };
                let result = analyze_one(&game, &username, evaluator.as_ref(), &cache, max_plies).await;
                (i, result)
            });
        }

        let mut analyses = Vec::with_capacity(total);
        let mut failures = Vec::new();
        let mut completed = 0usize;

        while let Some(joined) = tasks.join_next().await {
            completed += 1;
            match joined {
                Ok((_, Ok(analysis))) => {
                    debug!(completed, total, score = analysis.suspicion_score, "Game done");
                    analyses.push(analysis);
                }
                Ok((i, Err(e))) => {
                    warn!(game = i + 1, error = %e, "Game analysis failed");
                    failures.push(GameFailure::new(i + 1, &e));
                }
                Err(e) => {
                    error!(error = %e, "Analysis task panicked");
                    failures.push(GameFailure::new(0, &AnalysisError::Task(e.to_string())));
                }
            }
        }

        self.cache.lock().await.flush();

        failures.sort_by_key(|f| f.index);
        let mut result = EnhancedResult::compile(username, analyses);
        result.failures = failures;

        info!(
            analyzed = result.games_analyzed,
            failed = result.failures.len(),
            elapsed_secs = %format!("{:.1}", started.elapsed().as_secs_f64()),
            "Enhanced analysis complete"
        );
        result
    }
}

async fn analyze_one(
    game: &GameData,
    username: &str,
    evaluator: &dyn Evaluator,
    cache: &Mutex<AnalysisCache>,
    max_plies: usize,
) -> Result<GameAnalysisV3, AnalysisError> {
    let hash = game_hash(&game.pgn, username);
    if let Some(cached) = cache.lock().await.get(&hash) {
        debug!(game_id = %hash, "Analysis cache hit");
        return Ok(cached.clone());
    }

    let replayed = replay_game(game)?;
    let evaluations = evaluator.evaluate_game(&replayed, Some(max_plies)).await?;
    let analysis = analyze_game_v3(game, username, hash, &evaluations);

    cache.lock().await.insert(analysis.clone());
    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristic::MaterialHeuristic;
    use chess_core::pgn::parse_pgn;

    #[tokio::test]
    async fn heuristic_pool_analyzes_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let games = vec![
            parse_pgn("[White \"Me\"]\n[Black \"b\"]\n[Result \"1-0\"]\n\n1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 1-0").unwrap(),
            parse_pgn("[White \"a\"]\n[Black \"me\"]\n[Result \"0-1\"]\n\n1. d4 d5 2. c4 e6 0-1").unwrap(),
            parse_pgn("[White \"me\"]\n[Black \"c\"]\n[Result \"*\"]\n\n1. e4 e5 2. Ke3 *").unwrap(),
        ];

        let analyzer = EnhancedPlayerAnalyzer::with_evaluator(
            Arc::new(MaterialHeuristic),
            AnalysisCache::open(dir.path()),
            2,
            100,
        );
        let result = analyzer.analyze_games(games.clone(), "me").await;

        assert_eq!(result.games_analyzed, 2);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].index, 3);
        let colors: Vec<&str> = result.game_analyses.iter().map(|a| a.player_color.as_str()).collect();
        assert!(colors.contains(&"White") && colors.contains(&"Black"));

        let reopened = AnalysisCache::open(dir.path());
        assert_eq!(reopened.len(), 2);
        assert!(reopened.get(&game_hash(&games[0].pgn, "me")).is_some());
    }

    #[tokio::test]
    async fn same_game_cached_separately_per_player() {
        let dir = tempfile::tempdir().unwrap();
        let game =
            parse_pgn("[White \"alice\"]\n[Black \"bob\"]\n[Result \"1-0\"]\n\n1. e4 e5 2. Nf3 Nc6 1-0").unwrap();
        let analyzer = EnhancedPlayerAnalyzer::with_evaluator(
            Arc::new(MaterialHeuristic),
            AnalysisCache::open(dir.path()),
            1,
            100,
        );

        let white = analyzer.analyze_games(vec![game.clone()], "alice").await;
        let black = analyzer.analyze_games(vec![game], "bob").await;
        assert_eq!(white.game_analyses[0].player_color, "White");
        assert_eq!(black.game_analyses[0].player_color, "Black");
        assert_ne!(white.game_analyses[0].game_id, black.game_analyses[0].game_id);
        assert_eq!(AnalysisCache::open(dir.path()).len(), 2);
    }
}
