use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a game was played. Derived from the `Link`/`Site` headers when the
/// fetcher didn't tag it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    ChessCom,
    Lichess,
    #[default]
    Unknown,
}

impl Platform {
    /// Guess the platform from a game URL or `Site` header.
    pub fn detect(link_or_site: &str) -> Self {
        let lower = link_or_site.to_ascii_lowercase();
        if lower.contains("lichess.org") {
            Platform::Lichess
        } else if lower.contains("chess.com") {
            Platform::ChessCom
        } else {
            Platform::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::ChessCom => "chess.com",
            Platform::Lichess => "lichess",
            Platform::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GameMetadata {
    pub white: String,
    pub black: String,
    pub result: String, // "1-0", "0-1", "1/2-1/2"
    pub date: Option<String>,
    pub time_control: Option<String>,
    pub time_class: Option<String>,
    pub eco: Option<String>,
    pub event: Option<String>,
    pub site: Option<String>,
    pub link: Option<String>,
    pub white_elo: Option<i32>,
    pub black_elo: Option<i32>,
    pub utc_date: Option<String>,
    pub utc_time: Option<String>,
}

impl GameMetadata {
    pub fn is_white_win(&self) -> bool {
        self.result == "1-0"
    }

    pub fn is_black_win(&self) -> bool {
        self.result == "0-1"
    }

    pub fn is_draw(&self) -> bool {
        self.result == "1/2-1/2"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameData {
    pub metadata: GameMetadata,
    /// Every header in PGN order, including ones without a typed field.
    pub headers: Vec<(String, String)>,
    pub moves: Vec<String>, // SAN notation
    /// Remaining clock in seconds after each ply, from `[%clk]` comments.
    pub clocks: Vec<Option<f64>>,
    pub pgn: String,
    #[serde(default)]
    pub platform: Platform,
}

impl GameData {
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Insert or replace a header, keeping the typed metadata in sync for
    /// the fields the fetchers fill in after parsing.
    pub fn set_header(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match key {
            "WhiteElo" => self.metadata.white_elo = value.parse().ok(),
            "BlackElo" => self.metadata.black_elo = value.parse().ok(),
            "TimeControl" => self.metadata.time_control = Some(value.clone()),
            "TimeClass" => self.metadata.time_class = Some(value.clone()),
            "Link" => self.metadata.link = Some(value.clone()),
            _ => {}
        }
        if let Some(slot) = self.headers.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
        } else {
            self.headers.push((key.to_string(), value));
        }
    }

    /// Platform tag if set, otherwise detection from `Link` then `Site`.
    pub fn source_platform(&self) -> Platform {
        if self.platform != Platform::Unknown {
            return self.platform;
        }
        let from_link = self
            .metadata
            .link
            .as_deref()
            .map(Platform::detect)
            .unwrap_or_default();
        if from_link != Platform::Unknown {
            return from_link;
        }
        self.metadata
            .site
            .as_deref()
            .map(Platform::detect)
            .unwrap_or_default()
    }

    /// Lichess game id taken from a `https://lichess.org/<id>` URL.
    pub fn lichess_id(&self) -> Option<String> {
        let url = self
            .metadata
            .link
            .as_deref()
            .filter(|l| l.contains("lichess.org"))
            .or_else(|| self.metadata.site.as_deref().filter(|s| s.contains("lichess.org")))?;
        let id = url.trim_end_matches('/').rsplit('/').next()?;
        // Links may carry a colour suffix: /abcd1234/black
        let id = if id == "white" || id == "black" {
            url.trim_end_matches('/').rsplit('/').nth(1)?
        } else {
            id
        };
        let id: String = id.chars().take(8).collect();
        if id.len() == 8 && id.chars().all(|c| c.is_ascii_alphanumeric()) {
            Some(id)
        } else {
            None
        }
    }

    /// Increment in seconds from a `base+inc` TimeControl, 0 when absent.
    pub fn increment_secs(&self) -> f64 {
        self.metadata
            .time_control
            .as_deref()
            .and_then(|tc| tc.split('+').nth(1))
            .and_then(|inc| inc.parse::<f64>().ok())
            .unwrap_or(0.0)
    }

    /// Time spent on ply `i` (0-based): same side's previous clock minus this
    /// one, plus the increment.
    fn spent_on(&self, i: usize, increment: f64) -> Option<f64> {
        match (self.clocks[i - 2], self.clocks[i]) {
            (Some(before), Some(after)) => Some((before - after + increment).max(0.0)),
            _ => None,
        }
    }

    /// Seconds spent on each ply, derived from consecutive clock readings of
    /// the same side plus the increment. Plies without two readings are skipped.
    pub fn move_times(&self) -> Vec<f64> {
        let increment = self.increment_secs();
        (2..self.clocks.len()).filter_map(|i| self.spent_on(i, increment)).collect()
    }

    /// Per-ply time spent, only for one colour (white = even plies).
    pub fn move_times_for(&self, white: bool) -> Vec<f64> {
        let increment = self.increment_secs();
        let start = if white { 2 } else { 3 };
        (start..self.clocks.len())
            .step_by(2)
            .filter_map(|i| self.spent_on(i, increment))
            .collect()
    }
}
