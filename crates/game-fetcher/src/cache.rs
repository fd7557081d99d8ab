//! On-disk cache of fetched games, one JSON file per username and source.

use std::fs;
use std::path::{Path, PathBuf};

use chess_core::GameData;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::FetchError;

pub const CACHE_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheFile {
    pub username: String,
    pub source: String,
    pub fetched_at: DateTime<Utc>,
    pub game_count: usize,
    pub games: Vec<GameData>,
}

#[derive(Debug, Clone)]
pub struct GameCache {
    dir: PathBuf,
    ttl: Duration,
}

impl GameCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ttl: Duration::hours(CACHE_TTL_HOURS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, username: &str, source: &str) -> PathBuf {
        self.dir
            .join(format!("{}_{}_games.json", username.to_lowercase(), source))
    }

    /// Cached games when the file is fresh and holds at least `min_games`.
    pub fn load(&self, username: &str, source: &str, min_games: usize) -> Option<Vec<GameData>> {
        let path = self.path_for(username, source);
        let text = fs::read_to_string(&path).ok()?;
        let file: CacheFile = match serde_json::from_str(&text) {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring corrupt game cache");
                return None;
            }
        };

        let age = Utc::now() - file.fetched_at;
        if age > self.ttl {
            debug!(username, age_hours = age.num_hours(), "Game cache expired");
            return None;
        }
        if file.games.len() < min_games {
            debug!(username, cached = file.games.len(), min_games, "Game cache too small");
            return None;
        }

        Some(file.games.into_iter().take(min_games).collect())
    }

    pub fn store(&self, username: &str, source: &str, games: &[GameData]) -> Result<PathBuf, FetchError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(username, source);
        let file = CacheFile {
            username: username.to_string(),
            source: source.to_string(),
            fetched_at: Utc::now(),
            game_count: games.len(),
            games: games.to_vec(),
        };
        fs::write(&path, serde_json::to_string_pretty(&file)?)?;
        debug!(path = %path.display(), count = games.len(), "Game cache written");
        Ok(path)
    }

    /// Delete every cached game file. Returns how many were removed.
    pub fn clear(&self) -> Result<usize, FetchError> {
        if !self.dir.exists() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_game_file = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with("_games.json"));
            if is_game_file {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::pgn::parse_pgn;

    fn sample_games() -> Vec<GameData> {
        vec![
            parse_pgn("[White \"a\"]\n[Black \"b\"]\n\n1. e4 e5 2. Nf3 1-0").unwrap(),
            parse_pgn("[White \"b\"]\n[Black \"a\"]\n\n1. d4 d5 0-1").unwrap(),
        ]
    }

    #[test]
    fn expired_cache_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = GameCache::new(dir.path()).with_ttl(Duration::hours(-1));
        cache.store("Someone", "chess.com", &sample_games()).unwrap();
        assert!(cache.load("someone", "chess.com", 1).is_none());
    }

    #[test]
    fn small_cache_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = GameCache::new(dir.path());
        cache.store("someone", "lichess", &sample_games()).unwrap();
        assert!(cache.load("someone", "lichess", 5).is_none());
        assert_eq!(cache.load("someone", "lichess", 1).map(|g| g.len()), Some(1));
    }

    #[test]
    fn clear_removes_only_game_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = GameCache::new(dir.path());
        cache.store("a", "lichess", &sample_games()).unwrap();
        cache.store("b", "chess.com", &sample_games()).unwrap();
        fs::write(dir.path().join("notes.txt"), "keep").unwrap();
        assert_eq!(cache.clear().unwrap(), 2);
        assert!(dir.path().join("notes.txt").exists());
    }
}
