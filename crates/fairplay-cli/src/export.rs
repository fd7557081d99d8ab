//! Game exports: PGN collections and per-game CSV rows.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chess_core::GameData;
use chrono::Local;
use fairplay_analysis::analysis_cache::game_hash;
use fairplay_analysis::EnhancedResult;
use tracing::info;

use crate::error::CliError;

/// v3 score above which a game is exported even when not flagged.
pub const EXPORT_SCORE: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub pgn: PathBuf,
    pub csv: PathBuf,
    pub games: usize,
}

fn ensure_dir(dir: &Path) -> Result<(), CliError> {
    std::fs::create_dir_all(dir)?;
    Ok(())
}

fn stamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Games joined by a blank line.
pub fn write_pgn(path: &Path, games: &[&GameData]) -> Result<(), CliError> {
    let text = games
        .iter()
        .map(|g| g.pgn.trim())
        .collect::<Vec<_>>()
        .join("\n\n");
    std::fs::write(path, format!("{text}\n"))?;
    Ok(())
}

pub fn write_games_csv(path: &Path, games: &[&GameData]) -> Result<(), CliError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Date", "White", "Black", "Result", "Time Control", "Moves", "Platform", "URL"])?;
    for game in games {
        let m = &game.metadata;
        let moves = game.moves.len().to_string();
        writer.write_record([
            m.date.as_deref().unwrap_or("?"),
            m.white.as_str(),
            m.black.as_str(),
            m.result.as_str(),
            m.time_control.as_deref().unwrap_or("?"),
            moves.as_str(),
            game.source_platform().as_str(),
            m.link.as_deref().unwrap_or(""),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Full game history as `{username}_games_{stamp}.pgn` and `.csv`.
pub fn export_games(dir: &Path, username: &str, games: &[GameData]) -> Result<ExportPaths, CliError> {
    ensure_dir(dir)?;
    let base = format!("{username}_games_{}", stamp());
    let refs: Vec<&GameData> = games.iter().collect();

    let paths = ExportPaths {
        pgn: dir.join(format!("{base}.pgn")),
        csv: dir.join(format!("{base}.csv")),
        games: refs.len(),
    };
    write_pgn(&paths.pgn, &refs)?;
    write_games_csv(&paths.csv, &refs)?;
    info!(username, games = paths.games, dir = %dir.display(), "Exported games");
    Ok(paths)
}

/// Games flagged by the enhanced analyzer or scoring above [`EXPORT_SCORE`].
pub fn suspicious_games<'a>(result: &EnhancedResult, games: &'a [GameData]) -> Vec<&'a GameData> {
    let ids: HashSet<&str> = result
        .game_analyses
        .iter()
        .filter(|a| a.is_suspicious || a.suspicion_score > EXPORT_SCORE)
        .map(|a| a.game_id.as_str())
        .collect();
    games
        .iter()
        .filter(|g| ids.contains(game_hash(&g.pgn, &result.username).as_str()))
        .collect()
}

/// Suspicious games as PGN plus a CSV carrying their enhanced metrics.
/// Returns `None` when nothing qualifies.
pub fn export_suspicious(
    dir: &Path,
    result: &EnhancedResult,
    games: &[GameData],
) -> Result<Option<ExportPaths>, CliError> {
    let selected = suspicious_games(result, games);
    if selected.is_empty() {
        return Ok(None);
    }
    ensure_dir(dir)?;
    let base = format!("{}_suspicious_games_{}", result.username, stamp());
    let paths = ExportPaths {
        pgn: dir.join(format!("{base}.pgn")),
        csv: dir.join(format!("{base}.csv")),
        games: selected.len(),
    };
    write_pgn(&paths.pgn, &selected)?;

    let mut writer = csv::Writer::from_path(&paths.csv)?;
    writer.write_record([
        "Game ID",
        "White",
        "Black",
        "Result",
        "Colour",
        "Platform",
        "Suspicion Score",
        "Engine Match %",
        "Blunder Rate %",
        "Accuracy %",
        "URL",
    ])?;
    for a in result
        .game_analyses
        .iter()
        .filter(|a| a.is_suspicious || a.suspicion_score > EXPORT_SCORE)
    {
        let score = format!("{:.1}", a.suspicion_score);
        let engine = format!("{:.1}", a.engine_pattern.top_1_match_rate);
        let blunders = format!("{:.1}", a.blunder_analysis.blunder_rate);
        let accuracy = format!("{:.1}", a.accuracy.overall_accuracy);
        writer.write_record([
            a.game_id.as_str(),
            a.white.as_str(),
            a.black.as_str(),
            a.result.as_str(),
            a.player_color.as_str(),
            a.platform.as_str(),
            score.as_str(),
            engine.as_str(),
            blunders.as_str(),
            accuracy.as_str(),
            a.link.as_deref().unwrap_or(""),
        ])?;
    }
    writer.flush()?;

    info!(username = %result.username, games = paths.games, "Exported suspicious games");
    Ok(Some(paths))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::pgn::parse_pgn;
    use fairplay_analysis::GameAnalysisV3;

    fn games() -> Vec<GameData> {
        vec![
            parse_pgn("[White \"a\"]\n[Black \"b\"]\n[Result \"1-0\"]\n[Link \"https://www.chess.com/game/live/1\"]\n\n1. e4 e5 1-0").unwrap(),
            parse_pgn("[White \"c\"]\n[Black \"a\"]\n[Result \"0-1\"]\n\n1. d4 d5 0-1").unwrap(),
        ]
    }

    #[test]
    fn csv_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let games = games();
        let paths = export_games(dir.path(), "a", &games).unwrap();
        assert_eq!(paths.games, 2);

        let mut reader = csv::Reader::from_path(&paths.csv).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][1], "a");
        assert_eq!(&rows[0][5], "2");
        assert_eq!(&rows[0][6], "chess.com");

        let pgn = std::fs::read_to_string(&paths.pgn).unwrap();
        assert_eq!(chess_core::pgn::split_games(&pgn).len(), 2);
    }

    #[test]
    fn selects_flagged_or_high_scoring() {
        let games = games();
        let analysis = |pgn: &str, flagged: bool, score: f64| GameAnalysisV3 {
            game_id: game_hash(pgn, "a"),
            is_suspicious: flagged,
            suspicion_score: score,
            ..Default::default()
        };
        let result = EnhancedResult {
            username: "a".into(),
            game_analyses: vec![analysis(&games[0].pgn, false, 55.0), analysis(&games[1].pgn, false, 20.0)],
            ..Default::default()
        };
        let picked = suspicious_games(&result, &games);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].metadata.white, "a");

        let dir = tempfile::tempdir().unwrap();
        let quiet = EnhancedResult {
            username: "a".into(),
            game_analyses: vec![analysis(&games[1].pgn, false, 10.0)],
            ..Default::default()
        };
        assert!(export_suspicious(dir.path(), &quiet, &games).unwrap().is_none());
    }
}
