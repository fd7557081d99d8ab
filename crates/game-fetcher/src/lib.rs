//! Game retrieval from Chess.com and Lichess with a local JSON cache.

pub mod cache;
pub mod chess_com;
pub mod error;
pub mod lichess;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chess_core::{GameData, Platform};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use cache::GameCache;
pub use chess_com::{ChessComClient, PlayerProfile};
pub use error::FetchError;
pub use lichess::LichessClient;

/// Which platforms to pull games from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    #[default]
    ChessCom,
    Lichess,
    Both,
}

impl Source {
    pub fn platforms(&self) -> Vec<Platform> {
        match self {
            Source::ChessCom => vec![Platform::ChessCom],
            Source::Lichess => vec![Platform::Lichess],
            Source::Both => vec![Platform::ChessCom, Platform::Lichess],
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::ChessCom => f.write_str("chess.com"),
            Source::Lichess => f.write_str("lichess"),
            Source::Both => f.write_str("both"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub request_delay: Duration,
    pub cache_dir: Option<PathBuf>,
    pub lichess_token: Option<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            request_delay: Duration::from_millis(1000),
            cache_dir: Some(PathBuf::from("cache")),
            lichess_token: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FetchedGames {
    pub games: Vec<GameData>,
    /// Games contributed by each platform, in request order.
    pub per_platform: Vec<(Platform, usize)>,
    pub from_cache: bool,
}

pub struct GameFetcher {
    chess_com: ChessComClient,
    lichess: LichessClient,
    cache: Option<GameCache>,
}

impl GameFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        Ok(Self {
            chess_com: ChessComClient::new(config.request_delay)?,
            lichess: LichessClient::new(config.lichess_token)?,
            cache: config.cache_dir.map(GameCache::new),
        })
    }

    pub fn cache(&self) -> Option<&GameCache> {
        self.cache.as_ref()
    }

    pub fn chess_com(&self) -> &ChessComClient {
        &self.chess_com
    }

    /// Fetch up to `max_games` recent games from the selected platforms.
    ///
    /// With [`Source::Both`] the quota is split evenly and the remainder goes to
    /// Chess.com. A platform that fails is skipped as long as another one
    /// answered; the error surfaces only when every platform failed.
    pub async fn fetch(
        &self,
        username: &str,
        source: Source,
        max_games: usize,
    ) -> Result<FetchedGames, FetchError> {
        validate_username(username)?;

        if let Some(games) = self
            .cache
            .as_ref()
            .and_then(|c| c.load(username, &source.to_string(), max_games))
        {
            info!(username, count = games.len(), %source, "Using cached games");
            let per_platform = count_by_platform(&games, &source.platforms());
            return Ok(FetchedGames {
                games,
                per_platform,
                from_cache: true,
            });
        }

        let platforms = source.platforms();
        let quotas = split_quota(max_games, platforms.len());

        let mut fetched = FetchedGames::default();
        let mut last_error = None;
        let mut any_succeeded = false;

        for (platform, quota) in platforms.iter().zip(quotas) {
            if quota == 0 {
                fetched.per_platform.push((*platform, 0));
                continue;
            }
            let result = match platform {
                Platform::ChessCom => self.chess_com.fetch_recent_games(username, quota).await,
                Platform::Lichess => self.lichess.fetch_user_games(username, quota).await,
                Platform::Unknown => Ok(vec![]),
            };
            match result {
                Ok(games) => {
                    any_succeeded = true;
                    fetched.per_platform.push((*platform, games.len()));
                    fetched.games.extend(games);
                }
                Err(e) => {
                    warn!(username, %platform, error = %e, "Platform fetch failed");
                    fetched.per_platform.push((*platform, 0));
                    last_error = Some(e);
                }
            }
        }

        if !any_succeeded {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        if let Some(cache) = &self.cache {
            if !fetched.games.is_empty() {
                if let Err(e) = cache.store(username, &source.to_string(), &fetched.games) {
                    warn!(username, error = %e, "Failed to write game cache");
                }
            }
        }

        Ok(fetched)
    }
}

/// Chess.com and Lichess usernames: 1-50 characters of `[A-Za-z0-9_-]`.
pub fn validate_username(username: &str) -> Result<(), FetchError> {
    let valid = !username.is_empty()
        && username.len() <= 50
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(FetchError::InvalidUsername(username.to_string()))
    }
}

/// Even split of `total` across `parts`; the first part takes the remainder.
pub fn split_quota(total: usize, parts: usize) -> Vec<usize> {
    if parts == 0 {
        return vec![];
    }
    let base = total / parts;
    let mut quotas = vec![base; parts];
    quotas[0] += total % parts;
    quotas
}

fn count_by_platform(games: &[GameData], platforms: &[Platform]) -> Vec<(Platform, usize)> {
    platforms
        .iter()
        .map(|p| (*p, games.iter().filter(|g| g.source_platform() == *p).count()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert!(validate_username("Hikaru").is_ok());
        assert!(validate_username("magnus_carlsen-2").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username("../etc").is_err());
        assert!(validate_username(&"x".repeat(51)).is_err());
    }

    #[test]
    fn quota_remainder_goes_first() {
        assert_eq!(split_quota(51, 2), vec![26, 25]);
        assert_eq!(split_quota(50, 1), vec![50]);
        assert_eq!(split_quota(1, 2), vec![1, 0]);
    }
}
