use std::time::Duration;

use chess_core::pgn::parse_pgn;
use chess_core::{GameData, Platform};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::FetchError;

const API_BASE: &str = "https://api.chess.com/pub/player";

/// Subset of `/pub/player/{username}` we surface.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerProfile {
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub joined: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
}

pub struct ChessComClient {
    client: Client,
    archive_client: Client,
    request_delay: Duration,
}

impl ChessComClient {
    pub fn new(request_delay: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent("FairPlayAnalyzer/1.0")
            .timeout(Duration::from_secs(15))
            .build()?;
        let archive_client = Client::builder()
            .user_agent("FairPlayAnalyzer/1.0")
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self {
            client,
            archive_client,
            request_delay,
        })
    }

    pub async fn fetch_player(&self, username: &str) -> Result<PlayerProfile, FetchError> {
        let url = format!("{API_BASE}/{username}");
        let resp = self.client.get(&url).send().await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(FetchError::PlayerNotFound {
                platform: "chess.com",
                username: username.to_string(),
            });
        }
        if !resp.status().is_success() {
            return Err(FetchError::Status {
                status: resp.status().as_u16(),
                url,
            });
        }
        Ok(resp.json().await?)
    }

    /// Monthly archive URLs, newest first.
    pub async fn fetch_archives(&self, username: &str) -> Result<Vec<String>, FetchError> {
        let url = format!("{API_BASE}/{username}/games/archives");
        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(FetchError::Status {
                status: resp.status().as_u16(),
                url,
            });
        }

        let data: Value = resp.json().await?;
        let mut archives: Vec<String> = data["archives"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();

        // URLs end in /YYYY/MM, so lexical order is chronological
        archives.sort_by(|a, b| b.cmp(a));
        Ok(archives)
    }

    /// Standard-rules games from one monthly archive, newest first.
    pub async fn fetch_archive(&self, archive_url: &str) -> Result<Vec<GameData>, FetchError> {
        let resp = self.archive_client.get(archive_url).send().await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(vec![]);
        }
        if !resp.status().is_success() {
            return Err(FetchError::Status {
                status: resp.status().as_u16(),
                url: archive_url.to_string(),
            });
        }

        let data: Value = resp.json().await?;
        let mut games: Vec<GameData> = data["games"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .iter()
            .filter_map(game_from_archive_entry)
            .collect();
        games.reverse();
        Ok(games)
    }

    /// Walk archives newest-first until `max_games` standard games are collected.
    pub async fn fetch_recent_games(
        &self,
        username: &str,
        max_games: usize,
    ) -> Result<Vec<GameData>, FetchError> {
        let profile = self.fetch_player(username).await?;
        debug!(username = %profile.username, title = ?profile.title, "Chess.com profile found");
        tokio::time::sleep(self.request_delay).await;

        let archives = self.fetch_archives(username).await?;
        info!(username, archives = archives.len(), "Chess.com archives listed");

        let mut games = Vec::new();
        for archive_url in &archives {
            if games.len() >= max_games {
                break;
            }
            tokio::time::sleep(self.request_delay).await;

            match self.fetch_archive(archive_url).await {
                Ok(month) => {
                    debug!(archive = %archive_url, count = month.len(), "Fetched archive");
                    let remaining = max_games - games.len();
                    games.extend(month.into_iter().take(remaining));
                }
                Err(e) => {
                    warn!(archive = %archive_url, error = %e, "Skipping archive");
                }
            }
        }

        info!(username, count = games.len(), "Chess.com games fetched");
        Ok(games)
    }
}

/// Parse one archive entry and merge the API fields into the PGN headers.
fn game_from_archive_entry(entry: &Value) -> Option<GameData> {
    let rules = entry.get("rules").and_then(|v| v.as_str()).unwrap_or("chess");
    if rules != "chess" {
        return None;
    }

    let pgn = entry.get("pgn").and_then(|v| v.as_str())?;
    let mut game = match parse_pgn(pgn) {
        Ok(game) => game,
        Err(e) => {
            debug!(error = %e, "Skipping unparsable archive game");
            return None;
        }
    };
    game.platform = Platform::ChessCom;

    if let Some(tc) = entry.get("time_control").and_then(|v| v.as_str()) {
        game.set_header("TimeControl", tc);
    }
    if let Some(class) = entry.get("time_class").and_then(|v| v.as_str()) {
        game.set_header("TimeClass", class);
    }
    if let Some(rated) = entry.get("rated").and_then(|v| v.as_bool()) {
        game.set_header("Rated", rated.to_string());
    }
    if let Some(end) = entry.get("end_time").and_then(|v| v.as_i64()) {
        game.set_header("EndTime", end.to_string());
    }
    if let Some(url) = entry.get("url").and_then(|v| v.as_str()) {
        game.set_header("Link", url);
    }
    if let Some(rating) = entry["white"].get("rating").and_then(|v| v.as_i64()) {
        game.set_header("WhiteElo", rating.to_string());
    }
    if let Some(rating) = entry["black"].get("rating").and_then(|v| v.as_i64()) {
        game.set_header("BlackElo", rating.to_string());
    }

    Some(game)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn archive_entry_merges_api_fields() {
        let entry = json!({
            "url": "https://www.chess.com/game/live/42",
            "pgn": "[White \"a\"]\n[Black \"b\"]\n[Result \"1-0\"]\n\n1. e4 e5 1-0",
            "time_control": "180+2",
            "time_class": "blitz",
            "rated": true,
            "end_time": 1700000000,
            "rules": "chess",
            "white": { "rating": 1850 },
            "black": { "rating": 1790 }
        });

        let game = game_from_archive_entry(&entry).unwrap();
        assert_eq!(game.platform, Platform::ChessCom);
        assert_eq!(game.metadata.time_class.as_deref(), Some("blitz"));
        assert_eq!(game.metadata.white_elo, Some(1850));
        assert_eq!(game.metadata.black_elo, Some(1790));
        assert_eq!(game.header("Rated"), Some("true"));
        assert_eq!(game.metadata.link.as_deref(), Some("https://www.chess.com/game/live/42"));
    }

    #[test]
    fn variant_games_are_dropped() {
        let entry = json!({
            "pgn": "1. e4 e5 *",
            "rules": "chess960"
        });
        assert!(game_from_archive_entry(&entry).is_none());
    }
}
