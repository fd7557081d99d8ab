//! Shared chess data model: PGN parsing, game metadata and SAN replay.

pub mod error;
pub mod game_data;
pub mod pgn;
pub mod replay;

pub use error::PgnError;
pub use game_data::{GameData, GameMetadata, Platform};
pub use replay::{replay_game, Ply, ReplayedGame};
