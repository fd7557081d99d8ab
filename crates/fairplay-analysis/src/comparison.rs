//! Side-by-side statistics for several players and the outliers among them.

use std::collections::{BTreeMap, HashMap};

use chess_core::GameData;
use serde::{Deserialize, Serialize};

use crate::fatigue::game_start;
use crate::probes;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatingStats {
    pub avg_rating: f64,
    pub min_rating: i32,
    pub max_rating: i32,
    pub games_with_rating: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WinRateStats {
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
    pub total_games: usize,
    pub win_rate: f64,
    pub draw_rate: f64,
    pub loss_rate: f64,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeControlFocus {
    pub primary_time_control: String,
    pub primary_percentage: f64,
    pub time_controls_played: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatingVolatility {
    /// Percentage the latest rating sits below the peak, 0-100
    pub volatility_score: f64,
    pub std_deviation: f64,
    /// "Rising", "Falling" or "Stable"
    pub trend_direction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpeningVariety {
    pub num_openings: usize,
    /// Distinct openings per game with a known opening, as a percentage
    pub diversity: f64,
    /// "Diverse", "Balanced" or "Narrow"
    pub repertoire_type: String,
    pub most_played: String,
    pub most_played_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Anomaly {
    pub label: String,
    pub magnitude: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerStats {
    pub username: String,
    pub games: usize,
    pub rating: Option<RatingStats>,
    pub win_rate: Option<WinRateStats>,
    pub time_control: Option<TimeControlFocus>,
    pub volatility: Option<RatingVolatility>,
    pub openings: Option<OpeningVariety>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub players: Vec<PlayerStats>,
    /// Outliers per player, largest first
    pub anomalies: BTreeMap<String, Vec<Anomaly>>,
}

/// Rating change between the first and last game that counts as a trend.
const TREND_POINTS: i32 = 25;

fn plays_white(game: &GameData, username: &str) -> bool {
    game.metadata.white.eq_ignore_ascii_case(username)
}

fn own_rating(game: &GameData, username: &str) -> Option<i32> {
    if plays_white(game, username) {
        game.metadata.white_elo
    } else {
        game.metadata.black_elo
    }
}

pub fn rating_stats(games: &[GameData], username: &str) -> Option<RatingStats> {
    let ratings: Vec<i32> = games.iter().filter_map(|g| own_rating(g, username)).collect();
    let values: Vec<f64> = ratings.iter().map(|r| f64::from(*r)).collect();
    Some(RatingStats {
        avg_rating: probes::mean(&values)?,
        min_rating: *ratings.iter().min()?,
        max_rating: *ratings.iter().max()?,
        games_with_rating: ratings.len(),
    })
}

/// Results from the player's side. Anything that is not a decisive result
/// counts as a draw.
pub fn win_rate_stats(games: &[GameData], username: &str) -> Option<WinRateStats> {
    if games.is_empty() {
        return None;
    }
    let (mut wins, mut draws, mut losses) = (0, 0, 0);
    for game in games {
        let white = plays_white(game, username);
        match game.metadata.result.as_str() {
            "1-0" if white => wins += 1,
            "1-0" => losses += 1,
            "0-1" if white => losses += 1,
            "0-1" => wins += 1,
            _ => draws += 1,
        }
    }
    let total = wins + draws + losses;
    let pct = |n: usize| n as f64 / total as f64 * 100.0;
    Some(WinRateStats {
        wins,
        draws,
        losses,
        total_games: total,
        win_rate: pct(wins),
        draw_rate: pct(draws),
        loss_rate: pct(losses),
        score: wins as f64 + draws as f64 * 0.5,
    })
}

pub fn time_control_focus(games: &[GameData]) -> Option<TimeControlFocus> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for game in games {
        let class = game.metadata.time_class.as_deref().unwrap_or("unknown");
        *counts.entry(class).or_default() += 1;
    }
    let (primary, count) = counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
        .map(|(k, v)| (k.to_string(), *v))?;
    Some(TimeControlFocus {
        primary_time_control: primary,
        primary_percentage: count as f64 / games.len() as f64 * 100.0,
        time_controls_played: counts.len(),
    })
}

/// Player's own ratings oldest first. Games without a start time sort ahead
/// of timed ones and otherwise keep their order.
fn chronological_ratings(games: &[GameData], username: &str) -> Vec<i32> {
    let mut dated: Vec<_> = games
        .iter()
        .filter_map(|g| own_rating(g, username).map(|r| (game_start(g), r)))
        .collect();
    dated.sort_by_key(|(start, _)| *start);
    dated.into_iter().map(|(_, r)| r).collect()
}

/// How far the latest rating has fallen from the peak, plus spread and trend.
/// Needs at least two rated games.
pub fn rating_volatility(games: &[GameData], username: &str) -> Option<RatingVolatility> {
    let ratings = chronological_ratings(games, username);
    if ratings.len() < 2 {
        return None;
    }
    let peak = *ratings.iter().max()?;
    let first = *ratings.first()?;
    let latest = *ratings.last()?;

    let volatility_score = if peak > 0 {
        (f64::from(peak - latest) / f64::from(peak) * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };
    let values: Vec<f64> = ratings.iter().map(|r| f64::from(*r)).collect();
    let trend_direction = match latest - first {
        d if d > TREND_POINTS => "Rising",
        d if d < -TREND_POINTS => "Falling",
        _ => "Stable",
    };

    Some(RatingVolatility {
        volatility_score,
        std_deviation: probes::sample_stdev(&values),
        trend_direction: trend_direction.to_string(),
    })
}

/// Opening name from the `Opening` header, falling back to the ECO code.
fn opening_name(game: &GameData) -> Option<&str> {
    ["Opening", "ECO"]
        .iter()
        .filter_map(|key| game.header(key))
        .map(str::trim)
        .find(|v| !v.is_empty() && *v != "?")
}

pub fn opening_variety(games: &[GameData]) -> Option<OpeningVariety> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut known = 0usize;
    for name in games.iter().filter_map(opening_name) {
        *counts.entry(name).or_default() += 1;
        known += 1;
    }
    let (most_played, most_count) = counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
        .map(|(k, v)| (k.to_string(), *v))?;

    let diversity = counts.len() as f64 / known as f64 * 100.0;
    let repertoire_type = if diversity >= 60.0 {
        "Diverse"
    } else if diversity >= 30.0 {
        "Balanced"
    } else {
        "Narrow"
    };
    Some(OpeningVariety {
        num_openings: counts.len(),
        diversity,
        repertoire_type: repertoire_type.to_string(),
        most_played,
        most_played_pct: most_count as f64 / known as f64 * 100.0,
    })
}

pub fn player_stats(username: &str, games: &[GameData]) -> PlayerStats {
    PlayerStats {
        username: username.to_string(),
        games: games.len(),
        rating: rating_stats(games, username),
        win_rate: win_rate_stats(games, username),
        time_control: time_control_focus(games),
        volatility: rating_volatility(games, username),
        openings: opening_variety(games),
    }
}

/// Flag players far from the group. Each player's list is sorted largest
/// magnitude first.
pub fn detect_anomalies(players: &[PlayerStats]) -> BTreeMap<String, Vec<Anomaly>> {
    let ratings: Vec<f64> = players.iter().filter_map(|p| p.rating.as_ref()).map(|r| r.avg_rating).collect();
    let win_rates: Vec<f64> = players.iter().filter_map(|p| p.win_rate.as_ref()).map(|w| w.win_rate).collect();
    let volatilities: Vec<f64> = players
        .iter()
        .filter_map(|p| p.volatility.as_ref())
        .map(|v| v.volatility_score)
        .collect();
    let diversities: Vec<f64> = players.iter().filter_map(|p| p.openings.as_ref()).map(|o| o.diversity).collect();

    let avg_rating = probes::mean(&ratings).unwrap_or(0.0);
    let avg_win_rate = probes::mean(&win_rates).unwrap_or(50.0);
    let avg_volatility = probes::mean(&volatilities).unwrap_or(0.0);
    let avg_diversity = probes::mean(&diversities).unwrap_or(50.0);
    let rating_std = if ratings.len() > 1 {
        probes::sample_stdev(&ratings)
    } else {
        100.0
    };

    let mut anomalies = BTreeMap::new();
    for player in players {
        let mut found = Vec::new();

        if let Some(rating) = &player.rating {
            let diff = (rating.avg_rating - avg_rating).abs();
            if rating_std > 0.0 && diff > 2.0 * rating_std {
                found.push(Anomaly { label: "Extreme Rating Difference".into(), magnitude: diff });
            } else if diff > 150.0 {
                found.push(Anomaly { label: "Unusual Rating".into(), magnitude: diff });
            }
        }

        if let Some(win_rate) = &player.win_rate {
            let diff = (win_rate.win_rate - avg_win_rate).abs();
            if diff > 15.0 {
                let severity = if diff > 25.0 { "CRITICAL" } else { "HIGH" };
                found.push(Anomaly { label: format!("Extreme Win Rate [{severity}]"), magnitude: diff });
            } else if diff > 10.0 {
                found.push(Anomaly { label: "Unusual Win Rate".into(), magnitude: diff });
            }
        }

        if let Some(volatility) = &player.volatility {
            let diff = (volatility.volatility_score - avg_volatility).abs();
            let label = if diff > 30.0 {
                Some("CRITICAL Volatility")
            } else if diff > 20.0 {
                Some("High Volatility")
            } else {
                None
            };
            if let Some(label) = label {
                found.push(Anomaly { label: label.into(), magnitude: volatility.volatility_score });
            }
        }

        if let Some(openings) = &player.openings {
            if (openings.diversity - avg_diversity).abs() > 30.0 {
                found.push(Anomaly {
                    label: "Unusual Opening Diversity".into(),
                    magnitude: openings.diversity,
                });
            }
        }

        if let Some(tc) = &player.time_control {
            if tc.primary_percentage > 70.0 {
                found.push(Anomaly {
                    label: "Extreme Time Control Focus".into(),
                    magnitude: tc.primary_percentage,
                });
            }
        }

        found.sort_by(|a, b| b.magnitude.total_cmp(&a.magnitude));
        anomalies.insert(player.username.clone(), found);
    }
    anomalies
}

pub fn compare(players: &[(String, Vec<GameData>)]) -> ComparisonSummary {
    let stats: Vec<PlayerStats> = players.iter().map(|(name, games)| player_stats(name, games)).collect();
    ComparisonSummary {
        anomalies: detect_anomalies(&stats),
        players: stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::pgn::parse_pgn;

    fn game(white: &str, black: &str, result: &str, white_elo: i32, black_elo: i32, class: &str) -> GameData {
        parse_pgn(&format!(
            "[White \"{white}\"]\n[Black \"{black}\"]\n[Result \"{result}\"]\n[WhiteElo \"{white_elo}\"]\n[BlackElo \"{black_elo}\"]\n[TimeClass \"{class}\"]\n\n1. e4 e5 {result}"
        ))
        .unwrap()
    }

    #[test]
    fn stats_from_player_side() {
        let games = vec![
            game("Alice", "x", "1-0", 1500, 1400, "blitz"),
            game("y", "alice", "1-0", 1450, 1520, "blitz"),
            game("alice", "z", "1/2-1/2", 1510, 1500, "rapid"),
        ];
        let stats = player_stats("alice", &games);
        let rating = stats.rating.unwrap();
        assert_eq!(rating.min_rating, 1500);
        assert_eq!(rating.max_rating, 1520);
        assert_eq!(rating.avg_rating, 1510.0);

        let wr = stats.win_rate.unwrap();
        assert_eq!((wr.wins, wr.draws, wr.losses), (1, 1, 1));
        assert_eq!(wr.score, 1.5);

        let tc = stats.time_control.unwrap();
        assert_eq!(tc.primary_time_control, "blitz");
        assert_eq!(tc.time_controls_played, 2);
    }

    #[test]
    fn outlier_win_rate_is_flagged() {
        let winner: Vec<GameData> = (0..4).map(|_| game("w", "o", "1-0", 1500, 1500, "blitz")).collect();
        let loser: Vec<GameData> = (0..4).map(|_| game("l", "o", "0-1", 1500, 1500, "blitz")).collect();
        let summary = compare(&[("w".to_string(), winner), ("l".to_string(), loser)]);

        // averages to 50, each player is 50 away
        let w = &summary.anomalies["w"];
        assert!(w.iter().any(|a| a.label == "Extreme Win Rate [CRITICAL]" && a.magnitude == 50.0));
        // all blitz
        assert!(w.iter().any(|a| a.label == "Extreme Time Control Focus"));
        assert!(w[0].magnitude >= w[w.len() - 1].magnitude);
    }

    fn rated(white: &str, elo: i32, date: &str, opening: &str) -> GameData {
        parse_pgn(&format!(
            "[White \"{white}\"]\n[Black \"o\"]\n[Result \"1-0\"]\n[WhiteElo \"{elo}\"]\n[BlackElo \"1500\"]\n[UTCDate \"{date}\"]\n[UTCTime \"12:00:00\"]\n[Opening \"{opening}\"]\n\n1. e4 e5 1-0"
        ))
        .unwrap()
    }

    #[test]
    fn volatility_measures_drop_from_peak() {
        // supplied newest first, sorted by date internally
        let games = vec![
            rated("p", 1600, "2024.03.03", "Sicilian Defense"),
            rated("p", 2000, "2024.03.02", "Sicilian Defense"),
            rated("p", 1700, "2024.03.01", "French Defense"),
        ];
        let v = rating_volatility(&games, "p").unwrap();
        assert_eq!(v.volatility_score, 20.0);
        assert_eq!(v.trend_direction, "Falling");
        assert!(v.std_deviation > 200.0);

        assert!(rating_volatility(&games[..1], "p").is_none());
    }

    #[test]
    fn opening_variety_counts_distinct_names() {
        let games = vec![
            rated("p", 1500, "2024.03.01", "Sicilian Defense"),
            rated("p", 1500, "2024.03.02", "Sicilian Defense"),
            rated("p", 1500, "2024.03.03", "Sicilian Defense"),
            rated("p", 1500, "2024.03.04", "French Defense"),
        ];
        let o = opening_variety(&games).unwrap();
        assert_eq!(o.num_openings, 2);
        assert_eq!(o.diversity, 50.0);
        assert_eq!(o.repertoire_type, "Balanced");
        assert_eq!(o.most_played, "Sicilian Defense");
        assert_eq!(o.most_played_pct, 75.0);

        assert!(opening_variety(&[game("a", "b", "1-0", 1500, 1500, "blitz")]).is_none());
    }

    #[test]
    fn volatility_and_opening_outliers_are_flagged_and_sorted() {
        let stats = |name: &str, volatility: f64, diversity: f64| PlayerStats {
            username: name.to_string(),
            volatility: Some(RatingVolatility {
                volatility_score: volatility,
                std_deviation: 0.0,
                trend_direction: "Stable".into(),
            }),
            openings: Some(OpeningVariety {
                num_openings: 1,
                diversity,
                repertoire_type: "Narrow".into(),
                most_played: "x".into(),
                most_played_pct: 100.0,
            }),
            ..Default::default()
        };
        // group means: volatility 25, diversity 45
        let players = vec![stats("steady", 0.0, 10.0), stats("swingy", 75.0, 90.0), stats("mid", 0.0, 35.0)];
        let anomalies = detect_anomalies(&players);

        let swingy = &anomalies["swingy"];
        assert_eq!(swingy.len(), 2);
        assert_eq!(swingy[0], Anomaly { label: "Unusual Opening Diversity".into(), magnitude: 90.0 });
        assert_eq!(swingy[1], Anomaly { label: "CRITICAL Volatility".into(), magnitude: 75.0 });

        let steady = &anomalies["steady"];
        assert_eq!(steady.len(), 2);
        assert_eq!(steady[0].label, "Unusual Opening Diversity");
        assert_eq!(steady[1], Anomaly { label: "High Volatility".into(), magnitude: 0.0 });

        assert!(anomalies["mid"].iter().all(|a| a.label == "High Volatility"));
    }
}
