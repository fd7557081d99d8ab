//! Disk caches: fetched games and enhanced analyses.

mod common;

use std::sync::Arc;

use fairplay_analysis::analysis_cache::{game_hash, AnalysisCache};
use fairplay_analysis::heuristic::MaterialHeuristic;
use fairplay_analysis::EnhancedPlayerAnalyzer;
use game_fetcher::GameCache;

#[test]
fn cached_games_reload_identically() {
    let dir = tempfile::tempdir().unwrap();
    let cache = GameCache::new(dir.path());

    let games = vec![
        common::game(common::SCHOLARS_MATE),
        common::game("[White \"a\"]\n[Black \"Tester\"]\n[Result \"0-1\"]\n\n1. f3 e5 2. g4 Qh4# 0-1"),
    ];
    cache.store("Tester", "chess.com", &games).unwrap();

    let reloaded = cache.load("tester", "chess.com", 2).expect("fresh cache hit");
    assert_eq!(reloaded.len(), 2);
    for (before, after) in games.iter().zip(&reloaded) {
        assert_eq!(before.moves, after.moves);
        assert_eq!(before.headers, after.headers);
        assert_eq!(before.clocks, after.clocks);
    }

    // asking for more than is cached misses
    assert!(cache.load("tester", "chess.com", 3).is_none());
    assert_eq!(cache.clear().unwrap(), 1);
    assert!(cache.load("tester", "chess.com", 1).is_none());
}

#[tokio::test]
async fn enhanced_results_are_served_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let games = vec![common::game(common::SCHOLARS_MATE)];

    let first = EnhancedPlayerAnalyzer::with_evaluator(
        Arc::new(MaterialHeuristic),
        AnalysisCache::open(dir.path()),
        1,
        100,
    )
    .analyze_games(games.clone(), "Tester")
    .await;
    assert_eq!(first.games_analyzed, 1);
    assert_eq!(first.game_analyses[0].player_color, "White");

    let cache = AnalysisCache::open(dir.path());
    let cached = cache.get(&game_hash(&games[0].pgn, "Tester")).expect("analysis cached");
    assert_eq!(cached, &first.game_analyses[0]);

    let second = EnhancedPlayerAnalyzer::with_evaluator(Arc::new(MaterialHeuristic), cache, 1, 100)
        .analyze_games(games, "Tester")
        .await;
    assert_eq!(second.game_analyses, first.game_analyses);
}
