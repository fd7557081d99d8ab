//! Operations shared by the command line and the menu.

use std::path::PathBuf;

use fairplay_analysis::report::DetailedReport;
use fairplay_analysis::{ChessAnalyzer, EnhancedPlayerAnalyzer, EnhancedResult, StockfishEngine};
use game_fetcher::{FetchedGames, GameFetcher, Source};
use tracing::info;

use crate::config::AppConfig;
use crate::error::CliError;

pub const FORMATS: &str = "Available output formats:
  html  - Self-contained HTML report (recommended)
  text  - Plain text summary for quick review
  json  - Machine-readable JSON data
  all   - Generate all formats";

#[derive(Debug, Clone)]
pub struct StockfishStatus {
    pub path: PathBuf,
    pub name: Option<String>,
}

/// Resolve, start and handshake with Stockfish, then shut it down.
pub async fn check_stockfish(config: &AppConfig) -> Result<StockfishStatus, CliError> {
    let path = config.analysis.resolve_engine_path()?;
    let mut engine = StockfishEngine::new(&path, config.analysis.engine_options()).await?;
    let name = engine.name().map(str::to_string);
    engine.quit().await;
    Ok(StockfishStatus { path, name })
}

pub fn print_stockfish_status(result: &Result<StockfishStatus, CliError>) {
    match result {
        Ok(status) => {
            println!("Stockfish found at: {}", status.path.display());
            println!("Engine: {}", status.name.as_deref().unwrap_or("unknown"));
        }
        Err(e) => {
            println!("Stockfish not available: {e}");
            println!();
            println!("Installation options:");
            println!("  1. Download from https://stockfishchess.org/download/");
            println!("  2. Place the binary in ./stockfish/ or on PATH");
            println!("  3. Set engine_path in config.json or STOCKFISH_PATH");
        }
    }
}

/// Fetch games; an empty result is an error so callers never analyze nothing.
pub async fn fetch_games(
    config: &AppConfig,
    username: &str,
    source: Source,
    max_games: usize,
) -> Result<FetchedGames, CliError> {
    let fetcher = GameFetcher::new(config.fetcher_config())?;
    let fetched = fetcher.fetch(username, source, max_games).await?;
    if fetched.games.is_empty() {
        return Err(CliError::NoGames(username.to_string()));
    }
    for (platform, count) in &fetched.per_platform {
        info!(username, %platform, count, "Fetched games");
    }
    Ok(fetched)
}

pub fn print_fetch_summary(fetched: &FetchedGames, requested: usize) {
    let mut line = format!("Retrieved {} games", fetched.games.len());
    if fetched.games.len() < requested {
        line.push_str(&format!(" (player has fewer than {requested} available)"));
    }
    if fetched.from_cache {
        line.push_str(" [cached]");
    }
    println!("{line}");
    if fetched.per_platform.len() > 1 {
        for (platform, count) in &fetched.per_platform {
            println!("  {platform}: {count}");
        }
    }
}

/// Sequential Stockfish analysis of every game into a detailed report.
pub async fn run_standard(
    config: &AppConfig,
    username: &str,
    games: &[chess_core::GameData],
) -> Result<DetailedReport, CliError> {
    let analyzer = ChessAnalyzer::with_stockfish(&config.analysis).await?;
    let player = analyzer.analyze_games(username, games).await;
    analyzer.shutdown().await;

    if player.nothing_fetched() {
        return Err(CliError::NoGames(username.to_string()));
    }
    Ok(DetailedReport::build(&player, &config.analysis.thresholds))
}

pub async fn run_enhanced(
    config: &AppConfig,
    username: &str,
    games: Vec<chess_core::GameData>,
) -> Result<EnhancedResult, CliError> {
    let analyzer = EnhancedPlayerAnalyzer::new(&config.analysis).await?;
    let result = analyzer.analyze_games(games, username).await;
    analyzer.shutdown().await;
    Ok(result)
}

pub fn print_report_summary(report: &DetailedReport) {
    let s = &report.summary;
    println!("{}", "=".repeat(50));
    println!("ANALYSIS RESULTS for {}", report.username);
    println!("{}", "=".repeat(50));
    println!("Games analyzed: {}/{}", s.games_analyzed, s.total_games_fetched);
    if s.games_failed > 0 {
        println!("Games failed: {}", s.games_failed);
    }
    if s.games_analyzed > 0 {
        println!("Suspicion score: {:.1}/100", s.suspicion_score);
        println!("Risk level: {}", s.risk_level);
        println!("Engine correlation: {:.1}%", s.avg_engine_correlation);
        println!("Avg centipawn loss: {:.1}", s.avg_centipawn_loss);
        println!("Suspicious games: {}", s.suspicious_games);
    }
    println!("{}", "=".repeat(50));
}

pub fn print_enhanced_summary(result: &EnhancedResult) {
    println!("{}", "=".repeat(50));
    println!("ENHANCED ANALYSIS for {}", result.username);
    println!("{}", "=".repeat(50));
    println!("Games analyzed: {}", result.games_analyzed);
    if !result.failures.is_empty() {
        println!("Games failed: {}", result.failures.len());
    }
    println!("Suspicious games: {}", result.suspicious_games);
    println!("Suspicion score: {:.1}/100", result.suspicion_score);
    println!("Engine match rate: {:.1}%", result.avg_engine_match_rate);
    println!("Blunder rate: {:.1}%", result.avg_blunder_rate);
    println!("Accuracy: {:.1}%", result.avg_accuracy);
    for (platform, count) in &result.platform_breakdown {
        println!("  {platform}: {count} games");
    }
    println!("{}", "=".repeat(50));
}
