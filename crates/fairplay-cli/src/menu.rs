//! Numbered text menu over the same operations as the command line.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use chess_core::GameData;
use clap::ValueEnum;
use fairplay_analysis::analysis_cache::AnalysisCache;
use fairplay_analysis::comparison::compare;
use fairplay_analysis::fatigue::fatigue_report;
use game_fetcher::{GameCache, Source};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::warn;

use crate::cli::{PlatformArg, ReportFormat};
use crate::commands;
use crate::config::AppConfig;
use crate::error::CliError;
use crate::export;
use crate::report;

const ITEMS: [&str; 11] = [
    "Analyze Player (Detect Suspicious Activity)",
    "Enhanced Analysis (Parallel, Cached)",
    "Download Games (PGN + CSV Export)",
    "Export Suspicious Games",
    "Multi-Player Comparison",
    "Fatigue Detection",
    "View Reports",
    "Settings",
    "Check Stockfish",
    "Clear Cache",
    "Exit",
];

pub struct Menu {
    config: AppConfig,
    config_path: PathBuf,
    input: Lines<BufReader<Stdin>>,
}

impl Menu {
    pub fn new(config: AppConfig, config_path: PathBuf) -> Self {
        Self {
            config,
            config_path,
            input: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Read one trimmed line. `None` on end of input.
    async fn prompt(&mut self, message: &str) -> Result<Option<String>, CliError> {
        print!("{message}");
        std::io::stdout().flush()?;
        Ok(self.input.next_line().await?.map(|l| l.trim().to_string()))
    }

    async fn prompt_or(&mut self, message: &str, default: &str) -> Result<String, CliError> {
        Ok(self
            .prompt(message)
            .await?
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| default.to_string()))
    }

    async fn prompt_number(&mut self, message: &str, default: usize) -> Result<usize, CliError> {
        let answer = self.prompt_or(message, &default.to_string()).await?;
        Ok(answer.parse().unwrap_or(default))
    }

    async fn confirm(&mut self, message: &str) -> Result<bool, CliError> {
        Ok(self
            .prompt(message)
            .await?
            .is_some_and(|a| a.eq_ignore_ascii_case("y")))
    }

    async fn prompt_player(&mut self) -> Result<Option<(String, Source, usize)>, CliError> {
        let Some(username) = self.prompt("Enter username: ").await?.filter(|u| !u.is_empty()) else {
            return Ok(None);
        };
        let default_games = self.config.chess_com.max_games;
        let games = self
            .prompt_number(&format!("Games to analyze (default {default_games}): "), default_games)
            .await?;
        let platform = self
            .prompt_or("Platform (chess-com/lichess/both, default chess-com): ", "chess-com")
            .await?;
        let source = PlatformArg::from_str(&platform, true)
            .map(Source::from)
            .unwrap_or_default();
        Ok(Some((username, source, games)))
    }

    async fn fetch(&mut self, username: &str, source: Source, games: usize) -> Result<Vec<GameData>, CliError> {
        println!("\nFetching up to {games} games for {username} from {source}...");
        let fetched = commands::fetch_games(&self.config, username, source, games).await?;
        commands::print_fetch_summary(&fetched, games);
        Ok(fetched.games)
    }

    pub async fn run(&mut self) -> Result<(), CliError> {
        println!("\n{}", "=".repeat(60));
        println!("   CHESS FAIRPLAY ANALYZER");
        println!("   Forensic analysis of player behaviour");
        println!("{}", "=".repeat(60));

        loop {
            println!("\nMAIN MENU");
            println!("{}", "=".repeat(50));
            for (i, item) in ITEMS.iter().enumerate() {
                println!("{}. {item}", i + 1);
            }
            println!("{}", "=".repeat(50));

            let Some(choice) = self.prompt(&format!("Select option (1-{}): ", ITEMS.len())).await? else {
                return Ok(());
            };

            let outcome = match choice.as_str() {
                "1" => self.analyze_player().await,
                "2" => self.enhanced_analysis(false).await,
                "3" => self.download_games().await,
                "4" => self.enhanced_analysis(true).await,
                "5" => self.compare_players().await,
                "6" => self.fatigue_detection().await,
                "7" => self.view_reports(),
                "8" => self.settings().await,
                "9" => {
                    commands::print_stockfish_status(&commands::check_stockfish(&self.config).await);
                    Ok(())
                }
                "10" => self.clear_cache(),
                "11" => {
                    println!("\nGoodbye!\n");
                    return Ok(());
                }
                _ => {
                    println!("\nInvalid option!");
                    Ok(())
                }
            };

            if let Err(e) = outcome {
                println!("Error: {e}");
                warn!(error = %e, option = %choice, "Menu action failed");
            }
        }
    }

    async fn save_prompt(&mut self) -> Result<Option<ReportFormat>, CliError> {
        if !self.confirm("\nSave report? (y/n): ").await? {
            return Ok(None);
        }
        let default = self.config.report.default_format.clone();
        let answer = self
            .prompt_or(&format!("Format (html/text/json/all, default {default}): "), &default)
            .await?;
        Ok(Some(ReportFormat::parse(&answer).unwrap_or(ReportFormat::Html)))
    }

    fn print_saved(paths: &[PathBuf]) {
        for path in paths {
            println!("Report saved: {}", path.display());
        }
    }

    async fn analyze_player(&mut self) -> Result<(), CliError> {
        println!("\n{}\nANALYZE PLAYER\n{}", "-".repeat(50), "-".repeat(50));
        let Some((username, source, games)) = self.prompt_player().await? else {
            return Ok(());
        };
        let games = self.fetch(&username, source, games).await?;

        println!("\nAnalyzing with Stockfish (depth {})...", self.config.analysis.engine_depth);
        let detailed = commands::run_standard(&self.config, &username, &games).await?;
        commands::print_report_summary(&detailed);

        if let Some(format) = self.save_prompt().await? {
            let paths = report::write_reports(&detailed, format, &self.config.report.output_dir, None)?;
            Self::print_saved(&paths);
        }
        Ok(())
    }

    async fn enhanced_analysis(&mut self, export_only: bool) -> Result<(), CliError> {
        let title = if export_only { "EXPORT SUSPICIOUS GAMES" } else { "ENHANCED ANALYSIS" };
        println!("\n{}\n{title}\n{}", "-".repeat(50), "-".repeat(50));
        let Some((username, source, games)) = self.prompt_player().await? else {
            return Ok(());
        };
        let games = self.fetch(&username, source, games).await?;

        println!("\nAnalyzing with {} workers...", self.config.analysis.effective_workers());
        let result = commands::run_enhanced(&self.config, &username, games.clone()).await?;
        commands::print_enhanced_summary(&result);

        if !export_only {
            if let Some(format) = self.save_prompt().await? {
                let paths =
                    report::write_enhanced_reports(&result, format, &self.config.report.output_dir, None)?;
                Self::print_saved(&paths);
            }
        }

        let flagged = export::suspicious_games(&result, &games).len();
        if flagged == 0 {
            if export_only {
                println!("No suspicious games to export.");
            }
            return Ok(());
        }
        if export_only || self.confirm(&format!("\nExport {flagged} suspicious games? (y/n): ")).await? {
            if let Some(paths) = export::export_suspicious(&self.config.report.export_dir, &result, &games)? {
                println!("Exported {} games to {} and {}", paths.games, paths.pgn.display(), paths.csv.display());
            }
        }
        Ok(())
    }

    async fn download_games(&mut self) -> Result<(), CliError> {
        println!("\n{}\nDOWNLOAD GAMES\n{}", "-".repeat(50), "-".repeat(50));
        let Some((username, source, games)) = self.prompt_player().await? else {
            return Ok(());
        };
        let mut games = self.fetch(&username, source, games).await?;
        let order = self.prompt_or("Order: 1. Most recent first  2. Oldest first (default 1): ", "1").await?;
        if order == "2" {
            games.reverse();
        }
        let paths = export::export_games(&self.config.report.export_dir, &username, &games)?;
        println!("Exported {} games to {} and {}", paths.games, paths.pgn.display(), paths.csv.display());
        Ok(())
    }

    async fn compare_players(&mut self) -> Result<(), CliError> {
        println!("\n{}\nMULTI-PLAYER COMPARISON\n{}", "-".repeat(50), "-".repeat(50));
        let Some(names) = self.prompt("Usernames (comma separated): ").await? else {
            return Ok(());
        };
        let names: Vec<String> = names
            .split(',')
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        if names.len() < 2 {
            println!("Enter at least two usernames.");
            return Ok(());
        }
        let games = self.prompt_number("Games per player (default 50): ", 50).await?;

        let mut players = Vec::new();
        for name in names {
            match self.fetch(&name, Source::ChessCom, games).await {
                Ok(fetched) => players.push((name, fetched)),
                Err(e) => println!("Skipping {name}: {e}"),
            }
        }
        if players.is_empty() {
            return Ok(());
        }

        let summary = compare(&players);
        println!(
            "\n{:<20} {:>6} {:>8} {:>8} {:>12} {:>10} {:>10}",
            "Player", "Games", "Rating", "Win %", "Primary TC", "Volatility", "Openings %"
        );
        println!("{}", "-".repeat(80));
        for p in &summary.players {
            let rating = p.rating.as_ref().map(|r| format!("{:.0}", r.avg_rating)).unwrap_or_else(|| "-".into());
            let win = p.win_rate.as_ref().map(|w| format!("{:.1}", w.win_rate)).unwrap_or_else(|| "-".into());
            let tc = p
                .time_control
                .as_ref()
                .map(|t| t.primary_time_control.clone())
                .unwrap_or_else(|| "-".into());
            let volatility = p
                .volatility
                .as_ref()
                .map(|v| format!("{:.1}", v.volatility_score))
                .unwrap_or_else(|| "-".into());
            let openings = p.openings.as_ref().map(|o| format!("{:.1}", o.diversity)).unwrap_or_else(|| "-".into());
            println!(
                "{:<20} {:>6} {:>8} {:>8} {:>12} {:>10} {:>10}",
                p.username, p.games, rating, win, tc, volatility, openings
            );
        }

        println!("\nAnomalies:");
        for (player, anomalies) in &summary.anomalies {
            for a in anomalies {
                println!("  {player}: {} ({:.1})", a.label, a.magnitude);
            }
        }
        Ok(())
    }

    async fn fatigue_detection(&mut self) -> Result<(), CliError> {
        println!("\n{}\nFATIGUE DETECTION\n{}", "-".repeat(50), "-".repeat(50));
        let Some((username, source, games)) = self.prompt_player().await? else {
            return Ok(());
        };
        let games = self.fetch(&username, source, games).await?;
        let report = fatigue_report(&games, &username);

        println!("\nGames: {}  Sessions: {}", report.total_games, report.total_sessions);
        for s in &report.sessions {
            println!(
                "  Session {}: {} games, early {:.1} / late {:.1} moves, {:+.1}%{}",
                s.session + 1,
                s.games_in_session,
                s.early_avg_moves,
                s.late_avg_moves,
                -s.degradation_percent,
                if s.is_fatigued { "  FATIGUED" } else { "" }
            );
        }
        if let Some(p) = &report.progression {
            println!(
                "Quarter averages: {:.1} / {:.1} / {:.1} / {:.1}, trend {:+.1}% ({:?})",
                p.quarter_avgs[0], p.quarter_avgs[1], p.quarter_avgs[2], p.quarter_avgs[3], p.overall_trend, p.trend_direction
            );
        }
        if let Some(c) = &report.consistency {
            println!("Consistency drops: {} ({:.1}% of games)", c.drops.len(), c.drop_rate);
        }
        Ok(())
    }

    fn view_reports(&self) -> Result<(), CliError> {
        let reports = list_reports(&self.config.report.output_dir)?;
        if reports.is_empty() {
            println!("No reports in {}", self.config.report.output_dir.display());
        }
        for path in reports {
            println!("  {}", path.display());
        }
        Ok(())
    }

    async fn settings(&mut self) -> Result<(), CliError> {
        println!("\n{}", serde_json::to_string_pretty(&self.config)?);
        println!("\n1. Engine depth\n2. Workers\n3. Default game count\n4. Default report format\n5. Back");
        let choice = self.prompt_or("Choose (1-5): ", "5").await?;
        match choice.as_str() {
            "1" => {
                let current = self.config.analysis.engine_depth as usize;
                self.config.analysis.engine_depth =
                    self.prompt_number(&format!("Engine depth ({current}): "), current).await? as u32;
            }
            "2" => {
                let current = self.config.analysis.workers;
                self.config.analysis.workers = self.prompt_number(&format!("Workers ({current}): "), current).await?;
            }
            "3" => {
                let current = self.config.chess_com.max_games;
                self.config.chess_com.max_games = self.prompt_number(&format!("Games ({current}): "), current).await?;
            }
            "4" => {
                let current = self.config.report.default_format.clone();
                let answer = self.prompt_or(&format!("Format ({current}): "), &current).await?;
                if ReportFormat::parse(&answer).is_some() {
                    self.config.report.default_format = answer.to_lowercase();
                } else {
                    println!("Unknown format: {answer}");
                }
            }
            _ => return Ok(()),
        }
        self.config.save(&self.config_path)?;
        println!("Saved to {}", self.config_path.display());
        Ok(())
    }

    fn clear_cache(&self) -> Result<(), CliError> {
        let games = GameCache::new(self.config.chess_com.cache_dir.clone()).clear()?;
        let analyses = AnalysisCache::open(&self.config.analysis.cache_dir).clear()?;
        println!("Removed {games} cached game files and {analyses} cached analyses");
        Ok(())
    }
}

/// Saved reports, newest first.
pub fn list_reports(dir: &Path) -> Result<Vec<PathBuf>, CliError> {
    let mut found = Vec::new();
    for ext in ["html", "txt", "json"] {
        let pattern = dir.join(format!("*.{ext}"));
        for path in glob::glob(&pattern.to_string_lossy())?.flatten() {
            found.push(path);
        }
    }
    found.sort_by_key(|p| std::cmp::Reverse(std::fs::metadata(p).and_then(|m| m.modified()).ok()));
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_report_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.html", "b.txt", "c.json", "notes.md"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        let reports = list_reports(dir.path()).unwrap();
        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(|p| p.extension().is_some_and(|e| e != "md")));
    }
}
