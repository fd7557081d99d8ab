//! SAN replay: turns a parsed move list into per-ply positions.

use serde::{Deserialize, Serialize};
use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Position, Role, Square};

use crate::error::PgnError;
use crate::game_data::GameData;

/// Piece values used by material counts (pawn = 100).
pub const PIECE_VALUES: [(Role, i32); 5] = [
    (Role::Pawn, 100),
    (Role::Knight, 320),
    (Role::Bishop, 330),
    (Role::Rook, 500),
    (Role::Queen, 900),
];

/// One half-move with the position it was played from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ply {
    /// 1-based half-move index.
    pub number: usize,
    pub san: String,
    pub uci: String,
    pub fen_before: String,
    pub fen_after: String,
    pub white_to_move: bool,
    /// Pawns, knights, bishops and rooks of both colours before the move.
    pub minor_major_count: u32,
    /// White material minus black material after the move, in centipawns.
    pub material_after: i32,
    pub gives_check: bool,
    /// Whether b1 and g1 are vacated after the move.
    pub b1_empty_after: bool,
    pub g1_empty_after: bool,
}

#[derive(Debug, Clone)]
pub struct ReplayedGame {
    pub game: GameData,
    pub plies: Vec<Ply>,
}

impl ReplayedGame {
    pub fn len(&self) -> usize {
        self.plies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plies.is_empty()
    }
}

/// Replay every SAN move from the standard start position.
pub fn replay_game(game: &GameData) -> Result<ReplayedGame, PgnError> {
    if game.moves.is_empty() {
        return Err(PgnError::NoMoves);
    }

    let mut pos = Chess::default();
    let mut plies = Vec::with_capacity(game.moves.len());

    for (i, san_str) in game.moves.iter().enumerate() {
        let illegal = || PgnError::IllegalMove {
            ply: i + 1,
            san: san_str.clone(),
        };
        let san: SanPlus = san_str.parse().map_err(|_| illegal())?;
        let mv = san.san.to_move(&pos).map_err(|_| illegal())?;

        let fen_before = Fen::from_position(&pos, EnPassantMode::Legal).to_string();
        let white_to_move = pos.turn() == Color::White;
        let minor_major_count = minor_major_count(&pos);
        let uci = mv.to_uci(CastlingMode::Standard).to_string();

        pos.play_unchecked(mv);

        plies.push(Ply {
            number: i + 1,
            san: san_str.clone(),
            uci,
            fen_before,
            fen_after: Fen::from_position(&pos, EnPassantMode::Legal).to_string(),
            white_to_move,
            minor_major_count,
            material_after: material_balance(&pos),
            gives_check: pos.is_check(),
            b1_empty_after: pos.board().piece_at(Square::B1).is_none(),
            g1_empty_after: pos.board().piece_at(Square::G1).is_none(),
        });
    }

    Ok(ReplayedGame {
        game: game.clone(),
        plies,
    })
}

/// Count of pawns, knights, bishops and rooks on the board (both colours).
pub fn minor_major_count(pos: &Chess) -> u32 {
    let board = pos.board();
    (board.pawns().count() + board.knights().count() + board.bishops().count() + board.rooks().count())
        as u32
}

/// White material minus black material, in centipawns.
pub fn material_balance(pos: &Chess) -> i32 {
    let board = pos.board();
    PIECE_VALUES
        .iter()
        .map(|(role, value)| {
            let white = (board.by_role(*role) & board.by_color(Color::White)).count() as i32;
            let black = (board.by_role(*role) & board.by_color(Color::Black)).count() as i32;
            (white - black) * value
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pgn::parse_pgn;

    #[test]
    fn replays_scholars_mate() {
        let game = parse_pgn("1. e4 e5 2. Bc4 Nc6 3. Qh5 Nf6 4. Qxf7# 1-0").unwrap();
        let replayed = replay_game(&game).unwrap();
        assert_eq!(replayed.len(), 7);
        assert_eq!(replayed.plies[0].uci, "e2e4");
        assert_eq!(replayed.plies[0].minor_major_count, 28);
        assert!(replayed.plies[0].white_to_move);
        assert!(!replayed.plies[1].white_to_move);
        let last = replayed.plies.last().unwrap();
        assert_eq!(last.uci, "h5f7");
        assert!(last.gives_check);
        assert_eq!(last.material_after, 100);
    }

    #[test]
    fn starting_position_has_twenty_eight_counted_pieces() {
        assert_eq!(minor_major_count(&Chess::default()), 28);
        assert_eq!(material_balance(&Chess::default()), 0);
    }

    #[test]
    fn castling_uses_standard_uci() {
        let game = parse_pgn("1. e4 e5 2. Nf3 Nc6 3. Bc4 Bc5 4. O-O *").unwrap();
        let replayed = replay_game(&game).unwrap();
        assert_eq!(replayed.plies[6].uci, "e1g1");
        assert!(!replayed.plies[6].g1_empty_after);
    }

    #[test]
    fn illegal_move_reports_ply() {
        let game = parse_pgn("1. e4 e5 2. Ke3 *").unwrap();
        match replay_game(&game) {
            Err(PgnError::IllegalMove { ply, san }) => {
                assert_eq!(ply, 3);
                assert_eq!(san, "Ke3");
            }
            other => panic!("expected illegal move, got {other:?}"),
        }
    }
}
