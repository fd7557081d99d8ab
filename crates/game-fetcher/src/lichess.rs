use std::time::Duration;

use chess_core::pgn::parse_pgn;
use chess_core::{GameData, Platform};
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::FetchError;

/// Lichess refuses larger exports for anonymous requests.
pub const MAX_EXPORT: usize = 300;

pub struct LichessClient {
    client: Client,
    token: Option<String>,
}

impl LichessClient {
    pub fn new(token: Option<String>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent("FairPlayAnalyzer/1.0")
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self { client, token })
    }

    /// Fetch the most recent games for a user, streamed as NDJSON.
    pub async fn fetch_user_games(
        &self,
        username: &str,
        max_games: usize,
    ) -> Result<Vec<GameData>, FetchError> {
        let max = max_games.min(MAX_EXPORT);
        let url = format!("https://lichess.org/api/games/user/{username}");

        let params = [
            ("max", max.to_string()),
            ("sort", "dateDesc".to_string()),
            ("pgnInJson", "true".to_string()),
            ("clocks", "true".to_string()),
            ("opening", "true".to_string()),
        ];

        let mut request = self
            .client
            .get(&url)
            .query(&params)
            .header("Accept", "application/x-ndjson");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(FetchError::PlayerNotFound {
                platform: "lichess",
                username: username.to_string(),
            });
        }
        if !resp.status().is_success() {
            return Err(FetchError::Status {
                status: resp.status().as_u16(),
                url,
            });
        }

        let mut games = Vec::new();
        let mut buffer: Vec<u8> = Vec::new();
        let mut stream = resp.bytes_stream();

        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);
            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                if let Some(game) = parse_ndjson_line(&line) {
                    games.push(game);
                }
            }
            if games.len() >= max {
                break;
            }
        }
        if games.len() < max {
            if let Some(game) = parse_ndjson_line(&buffer) {
                games.push(game);
            }
        }
        games.truncate(max);

        info!(username, count = games.len(), "Lichess games fetched");
        Ok(games)
    }
}

/// One exported game: `{"id", "speed", "rated", "pgn", ...}`.
fn parse_ndjson_line(line: &[u8]) -> Option<GameData> {
    let text = std::str::from_utf8(line).ok()?.trim();
    if text.is_empty() {
        return None;
    }

    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            warn!("Failed to parse Lichess game JSON: {e}");
            return None;
        }
    };

    let pgn = value.get("pgn").and_then(|v| v.as_str()).filter(|p| !p.is_empty())?;
    let mut game = match parse_pgn(pgn) {
        Ok(game) => game,
        Err(e) => {
            debug!(error = %e, "Skipping unparsable Lichess game");
            return None;
        }
    };
    game.platform = Platform::Lichess;

    if let Some(id) = value.get("id").and_then(|v| v.as_str()) {
        game.set_header("Link", format!("https://lichess.org/{id}"));
    }
    if let Some(speed) = value.get("speed").and_then(|v| v.as_str()) {
        game.set_header("TimeClass", speed);
    }
    if let Some(rated) = value.get("rated").and_then(|v| v.as_bool()) {
        game.set_header("Rated", rated.to_string());
    }

    Some(game)
}
