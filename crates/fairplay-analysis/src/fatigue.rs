//! Session fatigue: does game length drop off late in a sitting?
//!
//! Move count stands in for effort; no engine data is needed.

use chess_core::GameData;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::probes;

/// Gap that starts a new session, in hours.
const SESSION_GAP_HOURS: f64 = 2.0;
const FATIGUED_DEGRADATION: f64 = 15.0;
const ROLLING_WINDOW: usize = 5;
const DROP_PERCENT: f64 = 20.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionFatigue {
    /// 0-based position among all sessions
    pub session: usize,
    pub games_in_session: usize,
    pub early_avg_moves: f64,
    pub late_avg_moves: f64,
    pub degradation_percent: f64,
    /// Sum of base times from `TimeControl`, seconds
    pub total_time_spent: u64,
    pub is_fatigued: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Declining,
    Stable,
    Improving,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FatigueProgression {
    pub quarter_avgs: [f64; 4],
    pub overall_trend: f64,
    pub trend_direction: TrendDirection,
    pub is_fatigued: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsistencyDrops {
    /// Indices into the non-empty games, in input order
    pub drops: Vec<usize>,
    pub drop_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FatigueReport {
    pub player: String,
    pub total_games: usize,
    pub total_sessions: usize,
    pub sessions: Vec<SessionFatigue>,
    /// `None` with fewer than 5 games
    pub progression: Option<FatigueProgression>,
    /// `None` with fewer than 10 games
    pub consistency: Option<ConsistencyDrops>,
}

/// Start time from `UTCDate`/`UTCTime`, else `Date`/`StartTime`.
pub fn game_start(game: &GameData) -> Option<NaiveDateTime> {
    let pairs = [("UTCDate", "UTCTime"), ("Date", "StartTime")];
    pairs.iter().find_map(|(d, t)| {
        let date = game.header(d)?;
        let time = game.header(t).unwrap_or("00:00:00");
        NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y.%m.%d %H:%M:%S").ok()
    })
}

/// Group games played less than two hours apart. Games without a usable
/// timestamp are left out.
pub fn sessions(games: &[GameData]) -> Vec<Vec<&GameData>> {
    let mut timed: Vec<(NaiveDateTime, &GameData)> =
        games.iter().filter_map(|g| game_start(g).map(|t| (t, g))).collect();
    timed.sort_by_key(|(t, _)| *t);

    let mut sessions: Vec<Vec<&GameData>> = Vec::new();
    let mut last: Option<NaiveDateTime> = None;
    for (time, game) in timed {
        let new_session = match last {
            Some(prev) => (time - prev).num_seconds() as f64 / 3600.0 >= SESSION_GAP_HOURS,
            None => true,
        };
        if new_session {
            sessions.push(vec![game]);
        } else if let Some(current) = sessions.last_mut() {
            current.push(game);
        }
        last = Some(time);
    }
    sessions
}

fn base_seconds(game: &GameData) -> Option<u64> {
    game.metadata.time_control.as_deref()?.split('+').next()?.parse().ok()
}

pub fn session_fatigue(index: usize, session: &[&GameData]) -> Option<SessionFatigue> {
    if session.len() < 2 {
        return None;
    }
    let move_counts: Vec<f64> = session
        .iter()
        .map(|g| g.moves.len())
        .filter(|n| *n > 0)
        .map(|n| n as f64)
        .collect();
    if move_counts.is_empty() {
        return None;
    }

    let (early_avg, late_avg) = if move_counts.len() > 1 {
        let half = move_counts.len() / 2;
        (
            probes::mean(&move_counts[..half]).unwrap_or(0.0),
            probes::mean(&move_counts[half..]).unwrap_or(0.0),
        )
    } else {
        (0.0, 0.0)
    };
    let degradation = if early_avg > 0.0 {
        (early_avg - late_avg) / early_avg * 100.0
    } else {
        0.0
    };

    Some(SessionFatigue {
        session: index,
        games_in_session: session.len(),
        early_avg_moves: early_avg,
        late_avg_moves: late_avg,
        degradation_percent: degradation,
        total_time_spent: session.iter().filter_map(|g| base_seconds(g)).sum(),
        is_fatigued: degradation > FATIGUED_DEGRADATION,
    })
}

fn move_counts(games: &[GameData]) -> Vec<f64> {
    games
        .iter()
        .map(|g| g.moves.len())
        .filter(|n| *n > 0)
        .map(|n| n as f64)
        .collect()
}

/// Average move count per quarter of the game list and its trend.
pub fn progression(games: &[GameData]) -> Option<FatigueProgression> {
    let counts = move_counts(games);
    if games.len() < 5 || counts.len() < 5 {
        return None;
    }

    let q = (counts.len() / 4).max(1);
    let bounds = [(0, q), (q, 2 * q), (2 * q, 3 * q), (3 * q, counts.len())];
    let quarter_avgs = bounds.map(|(a, b)| probes::mean(&counts[a..b]).unwrap_or(0.0));

    let changes: Vec<f64> = quarter_avgs
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] - w[0]) / w[0] * 100.0)
        .collect();
    let trend = probes::mean(&changes).unwrap_or(0.0);

    let trend_direction = if trend < -5.0 {
        TrendDirection::Declining
    } else if trend.abs() <= 5.0 {
        TrendDirection::Stable
    } else {
        TrendDirection::Improving
    };

    Some(FatigueProgression {
        quarter_avgs,
        overall_trend: trend,
        trend_direction,
        is_fatigued: trend < -10.0,
    })
}

/// Games more than 20% shorter than the average of the five before them.
pub fn consistency_drops(games: &[GameData]) -> Option<ConsistencyDrops> {
    let counts = move_counts(games);
    if games.len() < 10 || counts.len() < 10 {
        return None;
    }

    let drops: Vec<usize> = (ROLLING_WINDOW..counts.len())
        .filter(|&i| {
            let before = probes::mean(&counts[i - ROLLING_WINDOW..i]).unwrap_or(0.0);
            before > 0.0 && (before - counts[i]) / before * 100.0 > DROP_PERCENT
        })
        .collect();

    Some(ConsistencyDrops {
        drop_rate: drops.len() as f64 / counts.len() as f64 * 100.0,
        drops,
    })
}

pub fn fatigue_report(games: &[GameData], username: &str) -> FatigueReport {
    let grouped = sessions(games);
    FatigueReport {
        player: username.to_lowercase(),
        total_games: games.len(),
        total_sessions: grouped.len(),
        sessions: grouped
            .iter()
            .enumerate()
            .filter_map(|(i, s)| session_fatigue(i, s))
            .collect(),
        progression: progression(games),
        consistency: consistency_drops(games),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::pgn::parse_pgn;

    fn game(date: &str, time: &str, plies: usize) -> GameData {
        let moves: Vec<&str> = ["Nf3", "Nf6", "Ng1", "Ng8"].iter().cycle().take(plies).copied().collect();
        let pgn = format!(
            "[UTCDate \"{date}\"]\n[UTCTime \"{time}\"]\n[TimeControl \"180+2\"]\n\n{} *",
            moves.join(" ")
        );
        parse_pgn(&pgn).unwrap()
    }

    #[test]
    fn sessions_split_on_two_hour_gap() {
        let games = vec![
            game("2024.03.01", "10:00:00", 40),
            game("2024.03.01", "10:30:00", 20),
            game("2024.03.01", "14:00:00", 30),
        ];
        let grouped = sessions(&games);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].len(), 2);

        let report = fatigue_report(&games, "Someone");
        assert_eq!(report.total_sessions, 2);
        assert_eq!(report.sessions.len(), 1);
        let s = &report.sessions[0];
        assert_eq!(s.early_avg_moves, 40.0);
        assert_eq!(s.late_avg_moves, 20.0);
        assert_eq!(s.degradation_percent, 50.0);
        assert_eq!(s.total_time_spent, 360);
        assert!(s.is_fatigued);
        assert!(report.progression.is_none());
    }

    #[test]
    fn progression_detects_decline() {
        let games: Vec<GameData> = [80, 80, 60, 60, 40, 40, 20, 20]
            .iter()
            .enumerate()
            .map(|(i, n)| game("2024.03.01", &format!("{:02}:00:00", i), *n))
            .collect();
        let p = progression(&games).unwrap();
        assert_eq!(p.quarter_avgs, [80.0, 60.0, 40.0, 20.0]);
        assert_eq!(p.trend_direction, TrendDirection::Declining);
        assert!(p.is_fatigued);
        assert!(consistency_drops(&games).is_none());
    }

    #[test]
    fn drops_against_rolling_window() {
        let mut plies = vec![40; 10];
        plies[7] = 20;
        let games: Vec<GameData> = plies
            .iter()
            .enumerate()
            .map(|(i, n)| game("2024.03.02", &format!("{:02}:00:00", i), *n))
            .collect();
        let drops = consistency_drops(&games).unwrap();
        assert_eq!(drops.drops, vec![7]);
        assert_eq!(drops.drop_rate, 10.0);
    }
}
