#![allow(dead_code)]

use chess_core::pgn::parse_pgn;
use chess_core::GameData;
use fairplay_analysis::{analyze_game, GameAnalysis, PositionEvaluation};

pub const SCHOLARS_MATE: &str = r#"[Event "Live Chess"]
[Site "Chess.com"]
[Date "2024.03.01"]
[White "Tester"]
[Black "Opponent"]
[Result "1-0"]
[WhiteElo "1500"]
[BlackElo "1480"]
[TimeControl "180+2"]
[Link "https://www.chess.com/game/live/101"]

1. e4 {[%clk 0:03:00]} e5 {[%clk 0:03:00]} 2. Qh5 {[%clk 0:02:58]} Nc6 {[%clk 0:02:57]} 3. Bc4 {[%clk 0:02:55]} Nf6 {[%clk 0:02:50]} 4. Qxf7# {[%clk 0:02:53]} 1-0"#;

pub fn game(pgn: &str) -> GameData {
    parse_pgn(pgn).expect("fixture PGN parses")
}

/// `total` evaluations at a level score, the first `matched` of them on the
/// engine's first choice.
pub fn evaluations(matched: usize, total: usize) -> Vec<PositionEvaluation> {
    (0..total)
        .map(|i| PositionEvaluation {
            move_number: i + 1,
            played: "e2e4".to_string(),
            best_move: Some(if i < matched { "e2e4" } else { "d2d4" }.to_string()),
            score_cp: Some(0),
            depth: 18,
            matched: i < matched,
            minor_major_count: 30,
            ..Default::default()
        })
        .collect()
}

/// Per-game analysis of the fixture game with the given match rate over 20 plies.
pub fn analysis_with_correlation(percent: usize) -> GameAnalysis {
    let matched = percent * 20 / 100;
    analyze_game(&game(SCHOLARS_MATE), &evaluations(matched, 20))
}
