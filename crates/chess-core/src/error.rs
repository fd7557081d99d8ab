use thiserror::Error;

#[derive(Error, Debug)]
pub enum PgnError {
    #[error("PGN contains no moves")]
    NoMoves,

    #[error("Non-standard starting position")]
    NonStandardStart,

    #[error("Illegal or unparsable move {san} at ply {ply}")]
    IllegalMove { ply: usize, san: String },
}
