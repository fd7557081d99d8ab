//! PGN parsing utilities: a lightweight regex-based parser.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::PgnError;
use crate::game_data::{GameData, GameMetadata, Platform};

const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[(\w+)\s+"([^"]*)"\]"#).expect("header regex"));

static HEADER_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*\[\w+\s+"[^"]*"\]\s*$"#).expect("header line regex"));

/// Comments, variations and SAN moves, in the order they appear.
static MOVETEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\{(?P<comment>[^}]*)\}|\([^)]*\)|(?P<san>[KQRBN]?[a-h]?[1-8]?x?[a-h][1-8](?:=[QRBN])?[+#]?|O-O-O[+#]?|O-O[+#]?)",
    )
    .expect("movetext regex")
});

static CLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%clk\s+(\d+):(\d{1,2}):(\d{1,2}(?:\.\d+)?)").expect("clock regex")
});

/// Parse a single-game PGN string into a GameData struct.
pub fn parse_pgn(pgn: &str) -> Result<GameData, PgnError> {
    let headers: Vec<(String, String)> = HEADER_RE
        .captures_iter(pgn)
        .map(|cap| (cap[1].to_string(), cap[2].to_string()))
        .collect();

    let get = |key: &str| -> Option<String> {
        headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .filter(|v| !v.is_empty() && v != "?")
    };

    // Filter non-standard positions
    if get("SetUp").as_deref() == Some("1") {
        if let Some(fen) = get("FEN") {
            if fen != STANDARD_START_FEN {
                return Err(PgnError::NonStandardStart);
            }
        }
    }

    let time_control = get("TimeControl");
    let time_class = get("TimeClass").or_else(|| {
        time_control
            .as_deref()
            .map(|tc| classify_time_control(tc).to_string())
    });

    let metadata = GameMetadata {
        white: get("White").unwrap_or_else(|| "Unknown".to_string()),
        black: get("Black").unwrap_or_else(|| "Unknown".to_string()),
        result: get("Result").unwrap_or_else(|| "*".to_string()),
        date: get("Date"),
        time_control,
        time_class,
        eco: get("ECO"),
        event: get("Event"),
        site: get("Site"),
        link: get("Link"),
        white_elo: get("WhiteElo").and_then(|v| v.parse().ok()),
        black_elo: get("BlackElo").and_then(|v| v.parse().ok()),
        utc_date: get("UTCDate"),
        utc_time: get("UTCTime"),
    };

    let (moves, clocks) = extract_moves(pgn);
    if moves.is_empty() {
        return Err(PgnError::NoMoves);
    }

    let platform = metadata
        .link
        .as_deref()
        .or(metadata.site.as_deref())
        .map(Platform::detect)
        .unwrap_or_default();

    Ok(GameData {
        metadata,
        headers,
        moves,
        clocks,
        pgn: pgn.trim().to_string(),
        platform,
    })
}

/// Extract SAN moves and per-ply clock readings from PGN text.
/// Headers are stripped first; variations are skipped.
fn extract_moves(pgn: &str) -> (Vec<String>, Vec<Option<f64>>) {
    let movetext = HEADER_LINE_RE.replace_all(pgn, "");

    let mut moves = Vec::new();
    let mut clocks: Vec<Option<f64>> = Vec::new();

    for cap in MOVETEXT_RE.captures_iter(&movetext) {
        if let Some(san) = cap.name("san") {
            moves.push(san.as_str().to_string());
            clocks.push(None);
        } else if let Some(comment) = cap.name("comment") {
            if let (Some(slot), Some(secs)) = (clocks.last_mut(), parse_clock(comment.as_str())) {
                *slot = Some(secs);
            }
        }
    }

    (moves, clocks)
}

/// Parse a `[%clk h:mm:ss(.f)]` annotation into seconds.
pub fn parse_clock(comment: &str) -> Option<f64> {
    let cap = CLOCK_RE.captures(comment)?;
    let hours: f64 = cap[1].parse().ok()?;
    let minutes: f64 = cap[2].parse().ok()?;
    let seconds: f64 = cap[3].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Split a multi-game PGN file into single-game chunks.
pub fn split_games(text: &str) -> Vec<String> {
    let mut games = Vec::new();
    let mut current = String::new();
    let mut seen_movetext = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && seen_movetext {
            games.push(std::mem::take(&mut current).trim().to_string());
            seen_movetext = false;
        }
        if !trimmed.is_empty() && !trimmed.starts_with('[') {
            seen_movetext = true;
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.trim().is_empty() {
        games.push(current.trim().to_string());
    }
    games
}

/// Rough speed bucket from a `base+increment` TimeControl header,
/// estimated over 40 moves.
pub fn classify_time_control(tc: &str) -> &'static str {
    if tc.contains('/') || tc == "-" {
        return "daily";
    }
    let mut parts = tc.split('+');
    let base: u32 = parts.next().and_then(|b| b.parse().ok()).unwrap_or(0);
    let inc: u32 = parts.next().and_then(|i| i.parse().ok()).unwrap_or(0);
    match base + 40 * inc {
        0 => "unknown",
        t if t < 180 => "bullet",
        t if t < 480 => "blitz",
        t if t < 1500 => "rapid",
        _ => "classical",
    }
}

/// Extract a string value from a PGN header (e.g. WhiteTitle, BlackTitle).
pub fn extract_header(pgn: &str, header_name: &str) -> Option<String> {
    let pattern = format!(r#"\[{}\s+"([^"]*)"\]"#, regex::escape(header_name));
    let re = Regex::new(&pattern).ok()?;
    let value = re.captures(pgn)?.get(1)?.as_str().to_string();
    if value.is_empty() { None } else { Some(value) }
}

/// Extract an integer value from a PGN header.
pub fn extract_header_int(pgn: &str, header_name: &str) -> Option<i32> {
    let pattern = format!(r#"\[{}\s+"(\d+)"\]"#, regex::escape(header_name));
    let re = Regex::new(&pattern).ok()?;
    re.captures(pgn)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}
